//! Typed listing parameters and the indexer query builder.

pub mod builder;
mod params;

pub use builder::{Collection, IndexerQuery, SortDirection, SortKey};
pub(crate) use crate::mapper::normalize::IdKind;
pub(crate) use params::normalize_hex_id;
pub use params::{
    Bounds, DealFilter, ListingOrder, OfferFilter, Page, ProviderOrder, ProviderSearch,
    SearchTerm, StatusFilter, MAX_PAGE_SIZE,
};
