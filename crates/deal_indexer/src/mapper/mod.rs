//! Mapping from indexer payloads to the public entity shapes.
//!
//! Everything that leaves this module has been normalized and checked:
//! timestamps are epoch seconds, amounts are whole token units, and
//! capacity counters are consistent.

mod convert;
pub mod normalize;
pub(crate) mod raw;
mod reconcile;

pub use normalize::NormalizeError;
use thiserror::Error;

pub(crate) use convert::{deal, deal_summary, offer, offer_summary, provider, provider_summary};
pub(crate) use reconcile::{reconcile_units, Freshness};

/// The backing sources returned data that violates an entity invariant, or
/// the indexer and the chain disagree.
#[derive(Error, Debug)]
pub enum IntegrityError {
    #[error("{entity} {id}: free compute units {free} exceed total {total}")]
    ComputeUnits {
        entity: &'static str,
        id: String,
        free: u64,
        total: u64,
    },
    #[error("{entity} {id}: {source}")]
    Field {
        entity: &'static str,
        id: String,
        source: NormalizeError,
    },
    #[error("compute unit {unit}: indexer {field} {indexer} disagrees with chain {chain}")]
    SourceMismatch {
        unit: String,
        field: &'static str,
        indexer: String,
        chain: String,
    },
}
