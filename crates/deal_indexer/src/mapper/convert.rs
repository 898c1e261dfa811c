use crate::mapper::normalize::{self, IdKind, NormalizeError};
use crate::mapper::raw::{
    RawComputeUnit, RawDeal, RawEffector, RawOffer, RawPaymentToken, RawPeer, RawProvider,
    RawRevenueRow,
};
use crate::mapper::IntegrityError;
use crate::model::{
    ComputeUnit, Deal, DealSummary, Effector, Offer, OfferSummary, PaymentToken, Peer, Provider,
    ProviderSummary, Revenue, RevenueByDay,
};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::error;

const DEFAULT_DECIMALS: u8 = 18;

/// The entity a field belongs to, so failures name what was being mapped.
struct Scope<'a> {
    entity: &'static str,
    id: &'a str,
}

impl Scope<'_> {
    fn check<T>(&self, r: Result<T, NormalizeError>) -> Result<T, IntegrityError> {
        r.map_err(|source| IntegrityError::Field {
            entity: self.entity,
            id: self.id.to_string(),
            source,
        })
    }

    fn capacity(&self, free: u64, total: u64) -> Result<(), IntegrityError> {
        if free > total {
            error!(
                entity = self.entity,
                id = %self.id,
                free,
                total,
                "free compute units exceed total"
            );
            return Err(IntegrityError::ComputeUnits {
                entity: self.entity,
                id: self.id.to_string(),
                free,
                total,
            });
        }
        Ok(())
    }

    fn timestamp(&self, v: &Value) -> Result<i64, IntegrityError> {
        self.check(normalize::timestamp_secs(v))
    }

    fn id(&self, raw: &str, kind: IdKind) -> Result<String, IntegrityError> {
        self.check(normalize::hex_id(raw, kind))
    }

    fn ids(&self, raw: Option<Vec<String>>, kind: IdKind) -> Result<Vec<String>, IntegrityError> {
        raw.unwrap_or_default()
            .iter()
            .map(|id| self.id(id, kind))
            .collect()
    }

    fn token(&self, raw: RawPaymentToken) -> Result<PaymentToken, IntegrityError> {
        Ok(PaymentToken {
            address: self.id(&raw.address, IdKind::Address)?,
            symbol: raw.symbol,
            decimals: raw.decimals.unwrap_or(DEFAULT_DECIMALS),
        })
    }

    /// `updated` when the indexer has one, else `created`.
    fn updated_at(&self, updated: Option<&Value>, created: i64) -> Result<i64, IntegrityError> {
        match updated {
            None | Some(Value::Null) => Ok(created),
            Some(v) => self.timestamp(v),
        }
    }
}

fn effectors(raw: Option<Vec<RawEffector>>) -> Vec<Effector> {
    raw.unwrap_or_default()
        .into_iter()
        .map(|e| Effector {
            cid: e.cid,
            description: e.description.unwrap_or_default(),
        })
        .collect()
}

fn compute_units(raw: Option<Vec<RawComputeUnit>>) -> Result<Vec<ComputeUnit>, IntegrityError> {
    raw.unwrap_or_default()
        .into_iter()
        .map(|cu| {
            let scope = Scope {
                entity: "compute unit",
                id: &cu.id,
            };
            let id = scope.id(&cu.id, IdKind::Bytes32)?;
            let collateral = scope.check(normalize::amount(&cu.collateral))?;
            let worker_id = match cu.worker_id.as_deref().map(str::trim) {
                None | Some("") => None,
                Some(w) => Some(scope.id(w, IdKind::Bytes32)?).filter(|w| !is_zero_id(w)),
            };
            Ok(ComputeUnit {
                id,
                collateral,
                worker_id,
            })
        })
        .collect()
}

fn peers(raw: Option<Vec<RawPeer>>, offer_id: &str) -> Result<Vec<Peer>, IntegrityError> {
    raw.unwrap_or_default()
        .into_iter()
        .map(|p| {
            let scope = Scope {
                entity: "peer",
                id: &p.id,
            };
            Ok(Peer {
                id: scope.id(&p.id, IdKind::Bytes32)?,
                offer_id: match p.offer_id.as_deref() {
                    Some(id) => scope.id(id, IdKind::Bytes32)?,
                    None => offer_id.to_string(),
                },
                transaction_hash: p.transaction_hash.unwrap_or_default(),
                worker_slots: p.worker_slots,
                compute_units: compute_units(p.compute_units)?,
            })
        })
        .collect()
}

fn is_zero_id(id: &str) -> bool {
    id.trim_start_matches("0x").bytes().all(|b| b == b'0')
}

pub(crate) fn offer_summary(raw: RawOffer) -> Result<OfferSummary, IntegrityError> {
    Ok(split_offer(raw)?.0)
}

pub(crate) fn offer(raw: RawOffer) -> Result<Offer, IntegrityError> {
    let (summary, raw_peers) = split_offer(raw)?;
    let peers = peers(raw_peers, &summary.id)?;
    Ok(Offer { summary, peers })
}

fn split_offer(raw: RawOffer) -> Result<(OfferSummary, Option<Vec<RawPeer>>), IntegrityError> {
    let scope = Scope {
        entity: "offer",
        id: &raw.id,
    };
    scope.capacity(raw.free_compute_units, raw.total_compute_units)?;
    let created_at = scope.timestamp(&raw.created_at)?;
    let updated_at = scope.updated_at(raw.updated_at.as_ref(), created_at)?;
    let min_price_per_worker_epoch =
        scope.check(normalize::amount(&raw.min_price_per_worker_epoch))?;
    let max_collateral_per_worker =
        scope.check(normalize::amount(&raw.max_collateral_per_worker))?;
    let summary = OfferSummary {
        id: scope.id(&raw.id, IdKind::Bytes32)?,
        provider_id: scope.id(&raw.provider_id, IdKind::Address)?,
        name: raw.name.unwrap_or_default(),
        created_at,
        updated_at,
        min_price_per_worker_epoch,
        max_collateral_per_worker,
        payment_token: scope.token(raw.payment_token)?,
        total_compute_units: raw.total_compute_units,
        free_compute_units: raw.free_compute_units,
        effectors: effectors(raw.effectors),
    };
    Ok((summary, raw.peers))
}

pub(crate) fn provider_summary(raw: RawProvider) -> Result<ProviderSummary, IntegrityError> {
    let scope = Scope {
        entity: "provider",
        id: &raw.id,
    };
    scope.capacity(raw.free_compute_units, raw.total_compute_units)?;
    let created_at = scope.timestamp(&raw.created_at)?;
    let offers = raw
        .offers
        .unwrap_or_default()
        .into_iter()
        .map(offer_summary)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ProviderSummary {
        id: scope.id(&raw.id, IdKind::Address)?,
        name: raw.name.unwrap_or_default(),
        created_at,
        total_compute_units: raw.total_compute_units,
        free_compute_units: raw.free_compute_units,
        is_approved: raw.approved,
        offers,
    })
}

pub(crate) fn provider(
    raw: RawProvider,
    revenue_rows: Vec<RawRevenueRow>,
) -> Result<Provider, IntegrityError> {
    let scope = Scope {
        entity: "provider",
        id: &raw.id,
    };
    scope.capacity(raw.free_compute_units, raw.total_compute_units)?;
    let created_at = scope.timestamp(&raw.created_at)?;
    let revenue = revenue(&scope, revenue_rows)?;
    Ok(Provider {
        id: scope.id(&raw.id, IdKind::Address)?,
        name: raw.name.unwrap_or_default(),
        created_at,
        total_compute_units: raw.total_compute_units,
        free_compute_units: raw.free_compute_units,
        is_approved: raw.approved,
        peer_count: raw.peer_count.unwrap_or(0),
        effector_count: raw.effector_count.unwrap_or(0),
        revenue,
    })
}

/// One `Revenue` per payment token, ordered by token address; days ascending,
/// with rows falling on the same UTC day summed.
fn revenue(scope: &Scope<'_>, rows: Vec<RawRevenueRow>) -> Result<Vec<Revenue>, IntegrityError> {
    let mut by_token: BTreeMap<String, (PaymentToken, BTreeMap<i64, f64>)> = BTreeMap::new();
    for row in rows {
        let day = normalize::day_start(scope.timestamp(&row.day)?);
        let value = scope.check(normalize::amount(&row.value))?;
        let token = scope.token(row.payment_token)?;
        let entry = by_token
            .entry(token.address.clone())
            .or_insert_with(|| (token, BTreeMap::new()));
        *entry.1.entry(day).or_insert(0.0) += value;
    }
    Ok(by_token
        .into_values()
        .map(|(payment_token, days)| Revenue {
            total: days.values().sum(),
            payment_token,
            by_days: days
                .into_iter()
                .map(|(time, value)| RevenueByDay { time, value })
                .collect(),
        })
        .collect())
}

pub(crate) fn deal_summary(raw: RawDeal) -> Result<DealSummary, IntegrityError> {
    let scope = Scope {
        entity: "deal",
        id: &raw.id,
    };
    let created_at = scope.timestamp(&raw.created_at)?;
    let balance = scope.check(normalize::amount_or_zero(raw.balance.as_ref()))?;
    let status = scope.check(normalize::deal_status(&raw.status))?;
    Ok(DealSummary {
        id: scope.id(&raw.id, IdKind::Address)?,
        offer_id: raw
            .offer_id
            .as_deref()
            .map(|id| scope.id(id, IdKind::Bytes32))
            .transpose()?,
        owner: scope.id(&raw.owner, IdKind::Address)?,
        payment_token: scope.token(raw.payment_token)?,
        created_at,
        min_workers: raw.min_workers,
        target_workers: raw.target_workers,
        matched_workers: raw.matched_workers,
        registered_workers: raw.registered_workers,
        balance,
        status,
    })
}

pub(crate) fn deal(raw: RawDeal) -> Result<Deal, IntegrityError> {
    let scope = Scope {
        entity: "deal",
        id: &raw.id,
    };
    let created_at = scope.timestamp(&raw.created_at)?;
    let updated_at = scope.updated_at(raw.updated_at.as_ref(), created_at)?;
    let price_per_worker_epoch =
        scope.check(normalize::amount_or_zero(raw.price_per_worker_epoch.as_ref()))?;
    let collateral_per_worker =
        scope.check(normalize::amount_or_zero(raw.collateral_per_worker.as_ref()))?;
    let total_paid_amount =
        scope.check(normalize::amount_or_zero(raw.total_paid_amount.as_ref()))?;
    let status = scope.check(normalize::deal_status(&raw.status))?;
    Ok(Deal {
        id: scope.id(&raw.id, IdKind::Address)?,
        app_cid: raw.app_cid.unwrap_or_default(),
        owner: scope.id(&raw.owner, IdKind::Address)?,
        created_at,
        updated_at,
        min_workers: raw.min_workers,
        target_workers: raw.target_workers,
        matched_workers: raw.matched_workers,
        registered_workers: raw.registered_workers,
        payment_token: scope.token(raw.payment_token)?,
        price_per_worker_epoch,
        collateral_per_worker,
        compute_units: compute_units(raw.compute_units)?,
        whitelist: scope.ids(raw.whitelist, IdKind::Address)?,
        blacklist: scope.ids(raw.blacklist, IdKind::Address)?,
        effectors: effectors(raw.effectors),
        total_paid_amount,
        status,
    })
}
