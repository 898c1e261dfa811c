//! The public read API over the indexer and the chain.

use crate::chain::{ChainRpc, Fetcher, IndexerClient, OnchainComputeUnit};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::mapper::raw::{RawDeal, RawOffer, RawProvider, RawRevenueRow};
use crate::mapper::{self, Freshness};
use crate::model::{
    ComputeUnit, Deal, DealSummary, Offer, OfferSummary, Provider, ProviderSummary,
};
use crate::query::builder::{
    by_provider_query, deals_query, offers_query, providers_query, revenue_query,
};
use crate::query::{
    normalize_hex_id, Collection, DealFilter, IdKind, ListingOrder, OfferFilter, Page,
    ProviderOrder, ProviderSearch, SearchTerm, StatusFilter,
};
use futures::future::{try_join, try_join_all};
use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Read-only client for providers, offers and deals.
///
/// Every operation validates its input, then races the backing requests
/// against the caller's [`CancellationToken`]. Validation failures never touch
/// the network; an already-cancelled token yields [`ClientError::Cancelled`]
/// without issuing any request.
pub struct DealIndexerClient {
    config: ClientConfig,
    indexer: IndexerClient,
    chain: Option<ChainRpc>,
}

impl DealIndexerClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let indexer = IndexerClient::new(config.indexer_url.clone(), http(&config)?);
        let chain = match config.market_address {
            Some(market) => Some(ChainRpc::new(
                config.chain_rpc_url.clone(),
                market,
                http(&config)?,
            )),
            None => None,
        };
        debug!(
            indexer = %config.indexer_url,
            chain = %config.chain_rpc_url,
            reconcile = config.reconciles_with_chain(),
            "client ready"
        );
        Ok(Self {
            config,
            indexer,
            chain,
        })
    }

    /// HTTP attempts issued so far across both sources, retries included.
    pub fn request_count(&self) -> u64 {
        self.indexer.request_count() + self.chain.as_ref().map_or(0, ChainRpc::request_count)
    }

    pub async fn list_providers(
        &self,
        search: ProviderSearch,
        search_value: Option<&str>,
        order: ProviderOrder,
        skip: u64,
        take: u32,
        cancel: &CancellationToken,
    ) -> Result<Vec<ProviderSummary>> {
        let term = SearchTerm::parse(search, search_value)?;
        let page = Page::new(skip, take)?;
        let query = providers_query(term.as_ref(), order, page);
        guarded(cancel, async {
            let raw: Vec<RawProvider> = self.indexer.query(&query).await?;
            map_all(raw, mapper::provider_summary)
        })
        .await
    }

    /// Provider details with revenue per payment token.
    pub async fn get_provider(&self, id: &str, cancel: &CancellationToken) -> Result<Provider> {
        let id = normalize_hex_id(id, IdKind::Address)?;
        let revenue = revenue_query(&id, Page::first());
        guarded(cancel, async {
            let (raw, rows) = try_join(
                self.indexer.lookup::<RawProvider>(Collection::Providers, &id),
                self.indexer.query_all::<RawRevenueRow>(&revenue),
            )
            .await?;
            let raw = raw.ok_or_else(|| not_found("provider", &id))?;
            Ok(mapper::provider(raw, rows)?)
        })
        .await
    }

    /// All offers of one provider, newest first. Unknown providers have none.
    pub async fn list_offers_by_provider(
        &self,
        provider_id: &str,
        status: StatusFilter,
        cancel: &CancellationToken,
    ) -> Result<Vec<OfferSummary>> {
        let id = normalize_hex_id(provider_id, IdKind::Address)?;
        let query = by_provider_query(Collection::Offers, &id, status, Page::first());
        guarded(cancel, async {
            let raw: Vec<RawOffer> = self.indexer.query_all(&query).await?;
            map_all(raw, mapper::offer_summary)
        })
        .await
    }

    /// All deals served by one provider, newest first. Unknown providers have none.
    pub async fn list_deals_by_provider(
        &self,
        provider_id: &str,
        status: StatusFilter,
        cancel: &CancellationToken,
    ) -> Result<Vec<DealSummary>> {
        let id = normalize_hex_id(provider_id, IdKind::Address)?;
        let query = by_provider_query(Collection::Deals, &id, status, Page::first());
        guarded(cancel, async {
            let raw: Vec<RawDeal> = self.indexer.query_all(&query).await?;
            map_all(raw, mapper::deal_summary)
        })
        .await
    }

    pub async fn list_offers(
        &self,
        filter: &OfferFilter,
        skip: u64,
        take: u32,
        order: ListingOrder,
        cancel: &CancellationToken,
    ) -> Result<Vec<OfferSummary>> {
        let filter = filter.validated()?;
        let page = Page::new(skip, take)?;
        let query = offers_query(&filter, order, page);
        guarded(cancel, async {
            let raw: Vec<RawOffer> = self.indexer.query(&query).await?;
            map_all(raw, mapper::offer_summary)
        })
        .await
    }

    /// Offer with its peers. Compute units are confirmed on chain when a
    /// market contract is configured.
    pub async fn get_offer(&self, id: &str, cancel: &CancellationToken) -> Result<Offer> {
        let id = normalize_hex_id(id, IdKind::Bytes32)?;
        guarded(cancel, async {
            let raw = self
                .indexer
                .lookup::<RawOffer>(Collection::Offers, &id)
                .await?
                .ok_or_else(|| not_found("offer", &id))?;
            let mut offer = mapper::offer(raw)?;
            if let Some(chain) = &self.chain {
                let onchain = onchain_units(chain, offer.compute_units()).await?;
                let freshness = self.freshness(offer.summary.updated_at);
                let decimals = offer.summary.payment_token.decimals;
                for peer in &mut offer.peers {
                    mapper::reconcile_units(&mut peer.compute_units, &onchain, decimals, freshness)?;
                }
            }
            Ok(offer)
        })
        .await
    }

    pub async fn list_deals(
        &self,
        filter: &DealFilter,
        skip: u64,
        take: u32,
        order: ListingOrder,
        cancel: &CancellationToken,
    ) -> Result<Vec<DealSummary>> {
        let filter = filter.validated()?;
        let page = Page::new(skip, take)?;
        let query = deals_query(&filter, order, page);
        guarded(cancel, async {
            let raw: Vec<RawDeal> = self.indexer.query(&query).await?;
            map_all(raw, mapper::deal_summary)
        })
        .await
    }

    /// Deal details. Compute units are confirmed on chain when a market
    /// contract is configured.
    pub async fn get_deal(&self, id: &str, cancel: &CancellationToken) -> Result<Deal> {
        let id = normalize_hex_id(id, IdKind::Address)?;
        guarded(cancel, async {
            let raw = self
                .indexer
                .lookup::<RawDeal>(Collection::Deals, &id)
                .await?
                .ok_or_else(|| not_found("deal", &id))?;
            let mut deal = mapper::deal(raw)?;
            if let Some(chain) = &self.chain {
                let onchain = onchain_units(chain, deal.compute_units.iter()).await?;
                let freshness = self.freshness(deal.updated_at);
                let decimals = deal.payment_token.decimals;
                mapper::reconcile_units(&mut deal.compute_units, &onchain, decimals, freshness)?;
            }
            Ok(deal)
        })
        .await
    }

    fn freshness(&self, updated_at: i64) -> Freshness {
        Freshness {
            updated_at,
            now: OffsetDateTime::now_utc().unix_timestamp(),
            window_secs: self.config.staleness_window_secs,
        }
    }
}

/// Race `fut` against cancellation. Cancellation is checked first, so a
/// token that is already cancelled never polls `fut`.
async fn guarded<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => {
            debug!("operation cancelled");
            Err(ClientError::Cancelled)
        }
        r = fut => r,
    }
}

/// One connection pool per backing source.
fn http(config: &ClientConfig) -> Result<Fetcher> {
    Fetcher::new(config).map_err(|e| ClientError::Configuration(format!("http client: {e}")))
}

fn not_found(entity: &'static str, id: &str) -> ClientError {
    ClientError::NotFound {
        entity,
        id: id.to_string(),
    }
}

fn map_all<R, T>(
    raw: Vec<R>,
    f: impl Fn(R) -> std::result::Result<T, mapper::IntegrityError>,
) -> Result<Vec<T>> {
    Ok(raw.into_iter().map(f).collect::<std::result::Result<Vec<_>, _>>()?)
}

/// One chain lookup per distinct unit id, issued concurrently.
async fn onchain_units<'a>(
    chain: &ChainRpc,
    units: impl Iterator<Item = &'a ComputeUnit>,
) -> Result<HashMap<String, OnchainComputeUnit>> {
    let ids: BTreeSet<&str> = units.map(|u| u.id.as_str()).collect();
    let lookups = ids.into_iter().map(|id| async move {
        let unit = chain.compute_unit(id).await?;
        Ok::<_, ClientError>((id.to_string(), unit))
    });
    Ok(try_join_all(lookups).await?.into_iter().collect())
}
