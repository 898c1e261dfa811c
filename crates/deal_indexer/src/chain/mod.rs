//! Backing-source access: the indexer query service and the chain RPC node.

pub(crate) mod fetch;
mod indexer;
mod rpc;

pub use fetch::FetchError;
pub(crate) use fetch::Fetcher;
pub(crate) use indexer::IndexerClient;
pub(crate) use rpc::ChainRpc;
pub use rpc::{compute_unit_calldata, OnchainComputeUnit};
