//! Caller-facing parameter types and their validation.
//!
//! Validation runs before any network call and produces normalized copies
//! (trimmed, lowercased hex, sorted effector ids) so the query builder only
//! ever sees canonical input.

use crate::error::{ClientError, Result};
use crate::mapper::normalize::{self, IdKind};

/// Largest page a listing operation may request.
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProviderSearch {
    None,
    Id,
    Name,
    EffectorIds,
}

/// Provider listing sort key. Always descending.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProviderOrder {
    TotalComputeUnits,
    CreatedAt,
}

/// Sort key shared by offer and deal listings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ListingOrder {
    CreatedAt,
    PricePerWorkerEpoch,
    MaxCollateralPerWorker,
    UpdatedAt,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Inactive,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Page {
    pub skip: u64,
    pub take: u32,
}

impl Page {
    pub fn new(skip: u64, take: u32) -> Result<Self> {
        if take == 0 || take > MAX_PAGE_SIZE {
            return Err(ClientError::validation(format!(
                "take must be in [1, {MAX_PAGE_SIZE}], got {take}"
            )));
        }
        Ok(Self { skip, take })
    }

    pub(crate) fn first() -> Self {
        Self {
            skip: 0,
            take: MAX_PAGE_SIZE,
        }
    }

    pub(crate) fn next(self) -> Self {
        Self {
            skip: self.skip + u64::from(self.take),
            take: self.take,
        }
    }
}

/// Optional inclusive bounds. Either side may be absent.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Bounds<T> {
    pub min: Option<T>,
    pub max: Option<T>,
}

impl<T> Bounds<T> {
    pub fn new(min: Option<T>, max: Option<T>) -> Self {
        Self { min, max }
    }
}

impl<T: PartialOrd + std::fmt::Display + Copy> Bounds<T> {
    fn check_order(&self, name: &str) -> Result<()> {
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(ClientError::validation(format!(
                    "{name}: min {min} is greater than max {max}"
                )));
            }
        }
        Ok(())
    }
}

impl Bounds<f64> {
    fn validate_amount(&self, name: &str) -> Result<()> {
        for v in [self.min, self.max].into_iter().flatten() {
            if !v.is_finite() || v < 0.0 {
                return Err(ClientError::validation(format!(
                    "{name}: {v} is not a non-negative amount"
                )));
            }
        }
        self.check_order(name)
    }
}

/// Filters for the offer listing. `Default` means "no preference".
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OfferFilter {
    /// Offer must provide every listed effector.
    pub effector_ids: Option<Vec<String>>,
    pub payment_token: Option<String>,
    pub price_per_worker_epoch: Bounds<f64>,
    pub collateral_per_worker: Bounds<f64>,
    pub only_approved: bool,
}

impl OfferFilter {
    pub fn validated(&self) -> Result<Self> {
        self.price_per_worker_epoch
            .validate_amount("price per worker epoch")?;
        self.collateral_per_worker
            .validate_amount("collateral per worker")?;
        let effector_ids = self
            .effector_ids
            .as_deref()
            .map(normalize_effector_ids)
            .transpose()?;
        let payment_token = self
            .payment_token
            .as_deref()
            .map(|t| normalize_hex_id(t, IdKind::Address))
            .transpose()?;
        Ok(Self {
            effector_ids,
            payment_token,
            price_per_worker_epoch: self.price_per_worker_epoch,
            collateral_per_worker: self.collateral_per_worker,
            only_approved: self.only_approved,
        })
    }
}

/// Filters for the deal listing: the offer filter shape plus a creation window.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DealFilter {
    pub terms: OfferFilter,
    /// Inclusive creation window, epoch seconds.
    pub created_at: Bounds<i64>,
}

impl DealFilter {
    pub fn validated(&self) -> Result<Self> {
        let terms = self.terms.validated()?;
        for v in [self.created_at.min, self.created_at.max]
            .into_iter()
            .flatten()
        {
            if v < 0 {
                return Err(ClientError::validation(format!(
                    "created at: {v} is before the epoch"
                )));
            }
        }
        self.created_at.check_order("created at")?;
        Ok(Self {
            terms,
            created_at: self.created_at,
        })
    }
}

/// A validated provider search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchTerm {
    Id(String),
    Name(String),
    EffectorIds(Vec<String>),
}

impl SearchTerm {
    pub fn parse(search: ProviderSearch, value: Option<&str>) -> Result<Option<Self>> {
        let term = match search {
            ProviderSearch::None => return Ok(None),
            ProviderSearch::Id => {
                Self::Id(normalize_hex_id(required_value(search, value)?, IdKind::Address)?)
            }
            ProviderSearch::Name => Self::Name(required_value(search, value)?.to_string()),
            ProviderSearch::EffectorIds => {
                let ids: Vec<String> = required_value(search, value)?
                    .split(',')
                    .map(str::to_string)
                    .collect();
                Self::EffectorIds(normalize_effector_ids(&ids)?)
            }
        };
        Ok(Some(term))
    }
}

fn required_value(search: ProviderSearch, value: Option<&str>) -> Result<&str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ClientError::validation(format!(
            "search {search:?} requires a non-empty search value"
        ))),
    }
}

/// Caller-supplied id, validated before any request is made.
pub(crate) fn normalize_hex_id(raw: &str, kind: IdKind) -> Result<String> {
    normalize::hex_id(raw, kind).map_err(|e| ClientError::validation(e.to_string()))
}

fn normalize_effector_ids(ids: &[String]) -> Result<Vec<String>> {
    let mut out: Vec<String> = ids
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if out.is_empty() {
        return Err(ClientError::validation("effector id list is empty"));
    }
    out.sort();
    out.dedup();
    Ok(out)
}
