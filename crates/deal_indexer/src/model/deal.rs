use crate::model::{ComputeUnit, DealStatus, Effector, PaymentToken};
use serde::{Deserialize, Serialize};

/// Listing projection of a deal. Used by both the global deal listing and
/// the per-provider listing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealSummary {
    pub id: String,
    /// Offer the deal was matched with, if any yet.
    pub offer_id: Option<String>,
    pub owner: String,
    pub payment_token: PaymentToken,
    pub created_at: i64,
    pub min_workers: u32,
    pub target_workers: u32,
    pub matched_workers: u32,
    pub registered_workers: u32,
    pub balance: f64,
    pub status: DealStatus,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    pub id: String,
    pub app_cid: String,
    pub owner: String,
    pub created_at: i64,
    /// Last indexer update; equals `created_at` when never updated.
    pub updated_at: i64,
    pub min_workers: u32,
    pub target_workers: u32,
    pub matched_workers: u32,
    pub registered_workers: u32,
    pub payment_token: PaymentToken,
    pub price_per_worker_epoch: f64,
    pub collateral_per_worker: f64,
    pub compute_units: Vec<ComputeUnit>,
    /// Provider addresses allowed to serve the deal; empty means any.
    pub whitelist: Vec<String>,
    pub blacklist: Vec<String>,
    pub effectors: Vec<Effector>,
    pub total_paid_amount: f64,
    pub status: DealStatus,
}
