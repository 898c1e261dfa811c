//! Building blocks shared by providers, offers, and deals.

use serde::{Deserialize, Serialize};

/// Settlement currency of an offer or deal.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentToken {
    pub address: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Content-addressed capability an offer provides or a deal requires.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Effector {
    pub cid: String,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeUnit {
    pub id: String,
    pub collateral: f64,
    pub worker_id: Option<String>,
}

impl ComputeUnit {
    pub fn is_bound(&self) -> bool {
        self.worker_id.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Peer {
    pub id: String,
    pub offer_id: String,
    pub transaction_hash: String,
    pub worker_slots: u32,
    pub compute_units: Vec<ComputeUnit>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueByDay {
    /// Start of the UTC day, epoch seconds.
    pub time: i64,
    pub value: f64,
}

/// Provider earnings in one payment token.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Revenue {
    pub total: f64,
    pub payment_token: PaymentToken,
    pub by_days: Vec<RevenueByDay>,
}

/// Deal lifecycle as observed on chain. Transitions happen upstream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealStatus {
    Inactive,
    Active,
    Ended,
}
