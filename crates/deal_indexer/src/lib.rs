//! deal_indexer: read-only client for a compute marketplace.
//!
//! Lists and inspects providers, offers and deals by querying an indexer
//! service, optionally confirming compute unit state against the market
//! contract over chain RPC. Never signs or submits transactions.

pub mod chain;
pub mod client;
pub mod config;
pub mod error;
pub mod mapper;
pub mod model;
pub mod query;

pub use alloy::primitives::Address;
pub use chain::{FetchError, OnchainComputeUnit};
pub use client::DealIndexerClient;
pub use config::{ClientConfig, ClientConfigFile};
pub use error::{ClientError, Result};
pub use mapper::{IntegrityError, NormalizeError};
pub use model::{
    ComputeUnit, Deal, DealStatus, DealSummary, Effector, Offer, OfferSummary, PaymentToken, Peer,
    Provider, ProviderSummary, Revenue, RevenueByDay,
};
pub use query::{
    Bounds, DealFilter, IndexerQuery, ListingOrder, OfferFilter, Page, ProviderOrder,
    ProviderSearch, StatusFilter, MAX_PAGE_SIZE,
};
pub use tokio_util::sync::CancellationToken;
