//! Indexer payload shapes as they arrive on the wire.
//!
//! Nested collections are optional here; the mapper turns absence into an
//! empty `Vec`. Timestamps and amounts stay as raw JSON until normalized.

use serde::Deserialize;
use serde_json::Value;

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPaymentToken {
    pub address: String,
    pub symbol: String,
    pub decimals: Option<u8>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RawEffector {
    pub cid: String,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawComputeUnit {
    pub id: String,
    #[serde(default)]
    pub collateral: Value,
    pub worker_id: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPeer {
    pub id: String,
    pub offer_id: Option<String>,
    pub transaction_hash: Option<String>,
    #[serde(default)]
    pub worker_slots: u32,
    pub compute_units: Option<Vec<RawComputeUnit>>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOffer {
    pub id: String,
    pub provider_id: String,
    pub name: Option<String>,
    #[serde(default)]
    pub created_at: Value,
    pub updated_at: Option<Value>,
    #[serde(default)]
    pub min_price_per_worker_epoch: Value,
    #[serde(default)]
    pub max_collateral_per_worker: Value,
    pub payment_token: RawPaymentToken,
    pub total_compute_units: u64,
    pub free_compute_units: u64,
    pub effectors: Option<Vec<RawEffector>>,
    pub peers: Option<Vec<RawPeer>>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProvider {
    pub id: String,
    pub name: Option<String>,
    #[serde(default)]
    pub created_at: Value,
    pub total_compute_units: u64,
    pub free_compute_units: u64,
    #[serde(default)]
    pub approved: bool,
    pub peer_count: Option<u64>,
    pub effector_count: Option<u64>,
    pub offers: Option<Vec<RawOffer>>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDeal {
    pub id: String,
    pub offer_id: Option<String>,
    pub owner: String,
    pub app_cid: Option<String>,
    #[serde(default)]
    pub created_at: Value,
    pub updated_at: Option<Value>,
    #[serde(default)]
    pub min_workers: u32,
    #[serde(default)]
    pub target_workers: u32,
    #[serde(default)]
    pub matched_workers: u32,
    #[serde(default)]
    pub registered_workers: u32,
    pub payment_token: RawPaymentToken,
    pub price_per_worker_epoch: Option<Value>,
    pub collateral_per_worker: Option<Value>,
    pub balance: Option<Value>,
    pub total_paid_amount: Option<Value>,
    pub status: String,
    pub compute_units: Option<Vec<RawComputeUnit>>,
    pub whitelist: Option<Vec<String>>,
    pub blacklist: Option<Vec<String>>,
    pub effectors: Option<Vec<RawEffector>>,
}

/// One provider's earnings in one token on one day.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRevenueRow {
    pub payment_token: RawPaymentToken,
    pub day: Value,
    pub value: Value,
}
