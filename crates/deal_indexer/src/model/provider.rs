use crate::model::{OfferSummary, Revenue};
use serde::{Deserialize, Serialize};

/// Listing projection of a provider, with its offers inlined.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSummary {
    pub id: String,
    pub name: String,
    pub created_at: i64,
    pub total_compute_units: u64,
    pub free_compute_units: u64,
    pub is_approved: bool,
    pub offers: Vec<OfferSummary>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    pub id: String,
    pub name: String,
    pub created_at: i64,
    pub total_compute_units: u64,
    pub free_compute_units: u64,
    pub is_approved: bool,
    pub peer_count: u64,
    pub effector_count: u64,
    pub revenue: Vec<Revenue>,
}
