//! Cross-checking indexer compute units against chain state.

use crate::chain::OnchainComputeUnit;
use crate::mapper::normalize::base_units_to_tokens;
use crate::mapper::IntegrityError;
use crate::model::ComputeUnit;
use std::collections::HashMap;
use tracing::{error, warn};

/// How recently the indexer touched the entity owning the units.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Freshness {
    pub updated_at: i64,
    pub now: i64,
    pub window_secs: u64,
}

impl Freshness {
    /// Inside the window the indexer may lag the chain, so the chain wins.
    fn indexer_may_lag(&self) -> bool {
        let window = i64::try_from(self.window_secs).unwrap_or(i64::MAX);
        self.window_secs > 0 && self.now.saturating_sub(self.updated_at) <= window
    }
}

fn same_amount(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

fn mismatch(unit: &str, field: &'static str, indexer: String, chain: String) -> IntegrityError {
    error!(%unit, field, %indexer, %chain, "indexer disagrees with chain");
    IntegrityError::SourceMismatch {
        unit: unit.to_string(),
        field,
        indexer,
        chain,
    }
}

/// Confirm every unit against `chain` (keyed by unit id). Disagreement is an
/// integrity error unless the owner is fresh, in which case the chain value
/// replaces the indexer's.
pub(crate) fn reconcile_units(
    units: &mut [ComputeUnit],
    chain: &HashMap<String, OnchainComputeUnit>,
    decimals: u8,
    freshness: Freshness,
) -> Result<(), IntegrityError> {
    let lenient = freshness.indexer_may_lag();
    for unit in units.iter_mut() {
        let Some(onchain) = chain.get(&unit.id) else {
            continue;
        };
        if unit.worker_id != onchain.worker_id {
            let indexer = unit.worker_id.clone().unwrap_or_else(|| "none".to_string());
            let on_chain = onchain.worker_id.clone().unwrap_or_else(|| "none".to_string());
            if !lenient {
                return Err(mismatch(&unit.id, "workerId", indexer, on_chain));
            }
            warn!(unit = %unit.id, %indexer, chain = %on_chain, "indexer worker binding is stale");
            unit.worker_id = onchain.worker_id.clone();
        }
        let collateral = base_units_to_tokens(onchain.collateral, decimals);
        if !same_amount(unit.collateral, collateral) {
            if !lenient {
                return Err(mismatch(
                    &unit.id,
                    "collateral",
                    unit.collateral.to_string(),
                    collateral.to_string(),
                ));
            }
            warn!(unit = %unit.id, indexer = unit.collateral, chain = collateral, "indexer collateral is stale");
            unit.collateral = collateral;
        }
    }
    Ok(())
}
