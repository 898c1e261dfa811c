//! Public entity shapes returned by the client.
//!
//! All entities are read-only snapshots. Timestamps are Unix epoch seconds,
//! monetary values are whole token units.

mod common;
mod deal;
mod offer;
mod provider;

pub use common::{ComputeUnit, DealStatus, Effector, PaymentToken, Peer, Revenue, RevenueByDay};
pub use deal::{Deal, DealSummary};
pub use offer::{Offer, OfferSummary};
pub use provider::{Provider, ProviderSummary};
