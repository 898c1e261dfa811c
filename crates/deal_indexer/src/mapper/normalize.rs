//! Normalization of indexer scalars: timestamps to epoch seconds, amounts to
//! whole token units, status strings to [`DealStatus`], ids to lowercase hex.

use crate::model::DealStatus;
use alloy::primitives::{hex, Address, B256, U256};
use serde_json::Value;
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("invalid time: {0}")]
    InvalidTime(String),
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("invalid status: {0}")]
    InvalidStatus(String),
    #[error("invalid {kind} id {raw:?}")]
    InvalidId { kind: IdKind, raw: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdKind {
    /// 20-byte account address (providers, deals, owners, tokens).
    Address,
    /// 32-byte identifier (offers, peers, compute units, workers).
    Bytes32,
}

impl std::fmt::Display for IdKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdKind::Address => f.write_str("20-byte"),
            IdKind::Bytes32 => f.write_str("32-byte"),
        }
    }
}

/// Lowercase, `0x`-prefixed hex of the width `kind` requires.
pub fn hex_id(raw: &str, kind: IdKind) -> Result<String, NormalizeError> {
    let s = raw.trim();
    let invalid = || NormalizeError::InvalidId {
        kind,
        raw: raw.to_string(),
    };
    match kind {
        IdKind::Address => s
            .parse::<Address>()
            .map(hex::encode_prefixed)
            .map_err(|_| invalid()),
        IdKind::Bytes32 => s
            .parse::<B256>()
            .map(hex::encode_prefixed)
            .map_err(|_| invalid()),
    }
}

/// Parse RFC3339 timestamp and return Unix timestamp for normalization.
pub fn parse_time_rfc3339(s: &str) -> Result<i64, NormalizeError> {
    let dt = OffsetDateTime::parse(s.trim(), &Rfc3339)
        .map_err(|e| NormalizeError::InvalidTime(e.to_string()))?;
    Ok(dt.unix_timestamp())
}

/// Accepts integer seconds (JSON number or decimal string) or RFC3339.
pub fn timestamp_secs(v: &Value) -> Result<i64, NormalizeError> {
    match v {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            match n.as_f64() {
                Some(f) if f.is_finite() && f >= 0.0 && f < i64::MAX as f64 => Ok(f.trunc() as i64),
                _ => Err(NormalizeError::InvalidTime(n.to_string())),
            }
        }
        Value::String(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                return Ok(i);
            }
            parse_time_rfc3339(s)
        }
        other => Err(NormalizeError::InvalidTime(other.to_string())),
    }
}

/// Accepts a JSON number or decimal string in whole token units.
pub fn amount(v: &Value) -> Result<f64, NormalizeError> {
    let parsed = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(f) if f.is_finite() && f >= 0.0 => Ok(f),
        _ => Err(NormalizeError::InvalidAmount(v.to_string())),
    }
}

/// Amount when present, zero when the indexer leaves it out.
pub fn amount_or_zero(v: Option<&Value>) -> Result<f64, NormalizeError> {
    match v {
        None | Some(Value::Null) => Ok(0.0),
        Some(v) => amount(v),
    }
}

/// Base units (as stored on chain) to whole token units.
pub fn base_units_to_tokens(raw: U256, decimals: u8) -> f64 {
    let limb_base = 2f64.powi(64);
    let base = raw
        .as_limbs()
        .iter()
        .rev()
        .fold(0.0, |acc, limb| acc * limb_base + *limb as f64);
    base / 10f64.powi(i32::from(decimals))
}

pub fn deal_status(s: &str) -> Result<DealStatus, NormalizeError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "inactive" => Ok(DealStatus::Inactive),
        "active" => Ok(DealStatus::Active),
        "ended" => Ok(DealStatus::Ended),
        _ => Err(NormalizeError::InvalidStatus(s.to_string())),
    }
}

/// Start of the UTC day containing `ts`.
pub fn day_start(ts: i64) -> i64 {
    ts - ts.rem_euclid(SECONDS_PER_DAY)
}
