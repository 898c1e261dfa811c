//! Deterministic translation of validated parameters into indexer queries.
//!
//! A query is a pure function of its inputs: filters live in a `BTreeMap`,
//! list-valued filters arrive pre-sorted from validation, and every ordering
//! ends with `id` ascending so equal sort keys page stably.

use crate::query::params::{
    Bounds, DealFilter, ListingOrder, OfferFilter, Page, ProviderOrder, SearchTerm, StatusFilter,
};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Collection {
    Providers,
    Offers,
    Deals,
    /// Per-provider, per-token, per-day earnings rows.
    Revenue,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Providers => "providers",
            Collection::Offers => "offers",
            Collection::Deals => "deals",
            Collection::Revenue => "revenue",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SortKey {
    pub field: &'static str,
    pub direction: SortDirection,
}

impl SortKey {
    fn asc(field: &'static str) -> Self {
        Self {
            field,
            direction: SortDirection::Asc,
        }
    }

    fn desc(field: &'static str) -> Self {
        Self {
            field,
            direction: SortDirection::Desc,
        }
    }
}

/// Request body for `POST {indexer}/query/{collection}`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IndexerQuery {
    #[serde(skip)]
    pub collection: Collection,
    #[serde(rename = "where", skip_serializing_if = "BTreeMap::is_empty")]
    pub filters: BTreeMap<&'static str, Value>,
    #[serde(rename = "orderBy")]
    pub order_by: Vec<SortKey>,
    pub skip: u64,
    pub first: u32,
}

impl IndexerQuery {
    fn new(collection: Collection, mut order_by: Vec<SortKey>, page: Page) -> Self {
        order_by.push(SortKey::asc("id"));
        Self {
            collection,
            filters: BTreeMap::new(),
            order_by,
            skip: page.skip,
            first: page.take,
        }
    }

    fn filter(&mut self, key: &'static str, value: impl Into<Value>) {
        self.filters.insert(key, value.into());
    }

    fn filter_opt(&mut self, key: &'static str, value: Option<impl Into<Value>>) {
        if let Some(v) = value {
            self.filter(key, v);
        }
    }

    fn range<T: Into<Value> + Copy>(
        &mut self,
        gte: &'static str,
        lte: &'static str,
        bounds: &Bounds<T>,
    ) {
        self.filter_opt(gte, bounds.min);
        self.filter_opt(lte, bounds.max);
    }

    fn status(&mut self, status: StatusFilter) {
        match status {
            StatusFilter::All => {}
            StatusFilter::Active => self.filter("status_eq", "active"),
            StatusFilter::Inactive => self.filter("status_not", "active"),
        }
    }

    pub fn page(&self) -> Page {
        Page {
            skip: self.skip,
            take: self.first,
        }
    }

    /// Same query, different window.
    pub fn with_page(&self, page: Page) -> Self {
        Self {
            skip: page.skip,
            first: page.take,
            ..self.clone()
        }
    }

    /// SHA-256 over collection and canonical body. Stable across processes,
    /// suitable as a key for caller-side response caches.
    pub fn fingerprint(&self) -> String {
        let canonical = serde_json::json!({
            "collection": self.collection.as_str(),
            "query": self,
        })
        .to_string();
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        hex::encode(hasher.finalize())
    }
}

pub fn providers_query(
    search: Option<&SearchTerm>,
    order: ProviderOrder,
    page: Page,
) -> IndexerQuery {
    let key = match order {
        ProviderOrder::TotalComputeUnits => "totalComputeUnits",
        ProviderOrder::CreatedAt => "createdAt",
    };
    let mut q = IndexerQuery::new(Collection::Providers, vec![SortKey::desc(key)], page);
    match search {
        None => {}
        Some(SearchTerm::Id(id)) => q.filter("id_eq", id.as_str()),
        Some(SearchTerm::Name(name)) => q.filter("name_contains_nocase", name.as_str()),
        Some(SearchTerm::EffectorIds(ids)) => q.filter("effectorIds_containsAny", ids.clone()),
    }
    q
}

fn offer_sort(order: ListingOrder) -> SortKey {
    match order {
        ListingOrder::CreatedAt => SortKey::desc("createdAt"),
        ListingOrder::UpdatedAt => SortKey::desc("updatedAt"),
        ListingOrder::PricePerWorkerEpoch => SortKey::asc("minPricePerWorkerEpoch"),
        ListingOrder::MaxCollateralPerWorker => SortKey::asc("maxCollateralPerWorker"),
    }
}

fn deal_sort(order: ListingOrder) -> SortKey {
    match order {
        ListingOrder::CreatedAt => SortKey::desc("createdAt"),
        ListingOrder::UpdatedAt => SortKey::desc("updatedAt"),
        ListingOrder::PricePerWorkerEpoch => SortKey::asc("pricePerWorkerEpoch"),
        ListingOrder::MaxCollateralPerWorker => SortKey::asc("collateralPerWorker"),
    }
}

fn market_terms(
    q: &mut IndexerQuery,
    f: &OfferFilter,
    price: [&'static str; 2],
    collateral: [&'static str; 2],
) {
    q.filter_opt("effectorIds_containsAll", f.effector_ids.clone());
    q.filter_opt("paymentToken_eq", f.payment_token.clone());
    q.range(price[0], price[1], &f.price_per_worker_epoch);
    q.range(collateral[0], collateral[1], &f.collateral_per_worker);
    if f.only_approved {
        q.filter("providerApproved_eq", true);
    }
}

pub fn offers_query(filter: &OfferFilter, order: ListingOrder, page: Page) -> IndexerQuery {
    let mut q = IndexerQuery::new(Collection::Offers, vec![offer_sort(order)], page);
    market_terms(
        &mut q,
        filter,
        ["minPricePerWorkerEpoch_gte", "minPricePerWorkerEpoch_lte"],
        ["maxCollateralPerWorker_gte", "maxCollateralPerWorker_lte"],
    );
    q
}

pub fn deals_query(filter: &DealFilter, order: ListingOrder, page: Page) -> IndexerQuery {
    let mut q = IndexerQuery::new(Collection::Deals, vec![deal_sort(order)], page);
    market_terms(
        &mut q,
        &filter.terms,
        ["pricePerWorkerEpoch_gte", "pricePerWorkerEpoch_lte"],
        ["collateralPerWorker_gte", "collateralPerWorker_lte"],
    );
    q.range("createdAt_gte", "createdAt_lte", &filter.created_at);
    q
}

/// Offers or deals belonging to one provider, newest first.
pub fn by_provider_query(
    collection: Collection,
    provider_id: &str,
    status: StatusFilter,
    page: Page,
) -> IndexerQuery {
    let mut q = IndexerQuery::new(collection, vec![SortKey::desc("createdAt")], page);
    q.filter("provider_eq", provider_id);
    q.status(status);
    q
}

pub fn revenue_query(provider_id: &str, page: Page) -> IndexerQuery {
    let mut q = IndexerQuery::new(
        Collection::Revenue,
        vec![SortKey::asc("paymentToken"), SortKey::asc("day")],
        page,
    );
    q.filter("provider_eq", provider_id);
    q
}
