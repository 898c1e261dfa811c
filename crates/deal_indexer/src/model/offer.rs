use crate::model::{Effector, PaymentToken, Peer};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferSummary {
    pub id: String,
    pub provider_id: String,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub min_price_per_worker_epoch: f64,
    pub max_collateral_per_worker: f64,
    pub payment_token: PaymentToken,
    pub total_compute_units: u64,
    pub free_compute_units: u64,
    pub effectors: Vec<Effector>,
}

/// Full offer view: the summary fields plus the peers backing it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    #[serde(flatten)]
    pub summary: OfferSummary,
    pub peers: Vec<Peer>,
}

impl Offer {
    pub fn compute_units(&self) -> impl Iterator<Item = &crate::model::ComputeUnit> {
        self.peers.iter().flat_map(|p| p.compute_units.iter())
    }
}
