//! deal-indexer CLI: list and inspect providers, offers, and deals.

use clap::{Args, Parser, Subcommand, ValueEnum};
use deal_indexer::{
    Bounds, CancellationToken, ClientConfig, DealFilter, DealIndexerClient, ListingOrder,
    OfferFilter, ProviderOrder, ProviderSearch, StatusFilter,
};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

const CONFIG_PATH_ENV: &str = "DEAL_INDEXER_CONFIG_PATH";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();
    let config = resolve_config(&cli.endpoints)?;
    let client = DealIndexerClient::new(config)?;
    let rt = tokio::runtime::Runtime::new()?;
    let output = rt.block_on(async {
        let cancel = CancellationToken::new();
        watch_for_cancellation(cancel.clone(), cli.endpoints.timeout_secs);
        run(&client, cli.command, &cancel).await
    })?;
    info!(requests = client.request_count(), "done");
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[derive(Parser)]
#[command(name = "deal-indexer")]
#[command(author = "gorusys <goru.connector@outlook.com>")]
#[command(about = "Read-only explorer for compute marketplace providers, offers and deals")]
struct Cli {
    #[command(flatten)]
    endpoints: Endpoints,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct Endpoints {
    /// JSON config file; falls back to $DEAL_INDEXER_CONFIG_PATH.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    rpc_url: Option<String>,
    #[arg(long, global = true)]
    indexer_url: Option<String>,
    /// Market contract; enables on-chain confirmation of compute units.
    #[arg(long, global = true)]
    market_address: Option<String>,
    #[arg(long, global = true)]
    staleness_window_secs: Option<u64>,
    /// Cancel the operation after this many seconds.
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// List providers.
    Providers(ProvidersArgs),
    /// Show one provider with its revenue.
    Provider(IdArgs),
    /// List every offer of a provider.
    ProviderOffers(ProviderListingArgs),
    /// List every deal served by a provider.
    ProviderDeals(ProviderListingArgs),
    /// List offers.
    Offers(OffersArgs),
    /// Show one offer with its peers.
    Offer(IdArgs),
    /// List deals.
    Deals(DealsArgs),
    /// Show one deal.
    Deal(IdArgs),
}

#[derive(Args)]
struct IdArgs {
    #[arg(long)]
    id: String,
}

#[derive(Args)]
struct PageArgs {
    #[arg(long, default_value_t = 0)]
    skip: u64,
    #[arg(long, default_value_t = 20)]
    take: u32,
}

#[derive(Args)]
struct ProvidersArgs {
    #[arg(long, value_enum, default_value_t = SearchArg::None)]
    search: SearchArg,
    /// Search value; comma-separated for effector ids.
    #[arg(long)]
    value: Option<String>,
    #[arg(long, value_enum, default_value_t = ProviderOrderArg::TotalComputeUnits)]
    order: ProviderOrderArg,
    #[command(flatten)]
    page: PageArgs,
}

#[derive(Args)]
struct ProviderListingArgs {
    #[arg(long)]
    id: String,
    #[arg(long, value_enum, default_value_t = StatusArg::All)]
    status: StatusArg,
}

#[derive(Args)]
struct TermsArgs {
    /// Required effector cid; repeat for several.
    #[arg(long = "effector")]
    effectors: Vec<String>,
    #[arg(long)]
    payment_token: Option<String>,
    #[arg(long)]
    min_price: Option<f64>,
    #[arg(long)]
    max_price: Option<f64>,
    #[arg(long)]
    min_collateral: Option<f64>,
    #[arg(long)]
    max_collateral: Option<f64>,
    #[arg(long)]
    only_approved: bool,
    #[arg(long, value_enum, default_value_t = OrderArg::CreatedAt)]
    order: OrderArg,
}

impl TermsArgs {
    fn filter(&self) -> OfferFilter {
        OfferFilter {
            effector_ids: (!self.effectors.is_empty()).then(|| self.effectors.clone()),
            payment_token: self.payment_token.clone(),
            price_per_worker_epoch: Bounds::new(self.min_price, self.max_price),
            collateral_per_worker: Bounds::new(self.min_collateral, self.max_collateral),
            only_approved: self.only_approved,
        }
    }
}

#[derive(Args)]
struct OffersArgs {
    #[command(flatten)]
    terms: TermsArgs,
    #[command(flatten)]
    page: PageArgs,
}

#[derive(Args)]
struct DealsArgs {
    #[command(flatten)]
    terms: TermsArgs,
    /// Created at or after, epoch seconds.
    #[arg(long)]
    created_from: Option<i64>,
    /// Created at or before, epoch seconds.
    #[arg(long)]
    created_to: Option<i64>,
    #[command(flatten)]
    page: PageArgs,
}

#[derive(Clone, Copy, ValueEnum)]
enum SearchArg {
    None,
    Id,
    Name,
    EffectorIds,
}

impl From<SearchArg> for ProviderSearch {
    fn from(a: SearchArg) -> Self {
        match a {
            SearchArg::None => ProviderSearch::None,
            SearchArg::Id => ProviderSearch::Id,
            SearchArg::Name => ProviderSearch::Name,
            SearchArg::EffectorIds => ProviderSearch::EffectorIds,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ProviderOrderArg {
    TotalComputeUnits,
    CreatedAt,
}

impl From<ProviderOrderArg> for ProviderOrder {
    fn from(a: ProviderOrderArg) -> Self {
        match a {
            ProviderOrderArg::TotalComputeUnits => ProviderOrder::TotalComputeUnits,
            ProviderOrderArg::CreatedAt => ProviderOrder::CreatedAt,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OrderArg {
    CreatedAt,
    UpdatedAt,
    Price,
    Collateral,
}

impl From<OrderArg> for ListingOrder {
    fn from(a: OrderArg) -> Self {
        match a {
            OrderArg::CreatedAt => ListingOrder::CreatedAt,
            OrderArg::UpdatedAt => ListingOrder::UpdatedAt,
            OrderArg::Price => ListingOrder::PricePerWorkerEpoch,
            OrderArg::Collateral => ListingOrder::MaxCollateralPerWorker,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum StatusArg {
    All,
    Active,
    Inactive,
}

impl From<StatusArg> for StatusFilter {
    fn from(a: StatusArg) -> Self {
        match a {
            StatusArg::All => StatusFilter::All,
            StatusArg::Active => StatusFilter::Active,
            StatusArg::Inactive => StatusFilter::Inactive,
        }
    }
}

/// `--config`, then `$DEAL_INDEXER_CONFIG_PATH`, then the URL flags.
/// Flags given alongside a file override its values.
fn resolve_config(args: &Endpoints) -> Result<ClientConfig, Box<dyn std::error::Error>> {
    let path = args
        .config
        .clone()
        .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));
    let mut config = match (path, &args.rpc_url, &args.indexer_url) {
        (Some(path), _, _) => {
            info!(path = %path.display(), "loading config");
            let mut config = ClientConfig::from_file(&path)?;
            if args.rpc_url.is_some() || args.indexer_url.is_some() {
                let rpc = args.rpc_url.clone().unwrap_or_else(|| config.chain_rpc_url.to_string());
                let indexer = args
                    .indexer_url
                    .clone()
                    .unwrap_or_else(|| config.indexer_url.to_string());
                let fresh = ClientConfig::new(&rpc, &indexer)?;
                config.chain_rpc_url = fresh.chain_rpc_url;
                config.indexer_url = fresh.indexer_url;
            }
            config
        }
        (None, Some(rpc), Some(indexer)) => ClientConfig::new(rpc, indexer)?,
        (None, _, _) => {
            return Err(format!(
                "no endpoints: pass --config, set {CONFIG_PATH_ENV}, or give --rpc-url and --indexer-url"
            )
            .into())
        }
    };
    if let Some(market) = &args.market_address {
        config = config.with_market_address(market)?;
    }
    if let Some(window) = args.staleness_window_secs {
        config.staleness_window_secs = window;
    }
    Ok(config)
}

/// Ctrl-C, or the timeout when one is set, cancels the running operation.
fn watch_for_cancellation(cancel: CancellationToken, timeout_secs: Option<u64>) {
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted");
            on_signal.cancel();
        }
    });
    if let Some(secs) = timeout_secs {
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            warn!(secs, "timed out");
            cancel.cancel();
        });
    }
}

async fn run(
    client: &DealIndexerClient,
    command: Command,
    cancel: &CancellationToken,
) -> Result<Value, Box<dyn std::error::Error>> {
    let value = match command {
        Command::Providers(a) => serde_json::to_value(
            client
                .list_providers(
                    a.search.into(),
                    a.value.as_deref(),
                    a.order.into(),
                    a.page.skip,
                    a.page.take,
                    cancel,
                )
                .await?,
        )?,
        Command::Provider(a) => serde_json::to_value(client.get_provider(&a.id, cancel).await?)?,
        Command::ProviderOffers(a) => serde_json::to_value(
            client
                .list_offers_by_provider(&a.id, a.status.into(), cancel)
                .await?,
        )?,
        Command::ProviderDeals(a) => serde_json::to_value(
            client
                .list_deals_by_provider(&a.id, a.status.into(), cancel)
                .await?,
        )?,
        Command::Offers(a) => serde_json::to_value(
            client
                .list_offers(
                    &a.terms.filter(),
                    a.page.skip,
                    a.page.take,
                    a.terms.order.into(),
                    cancel,
                )
                .await?,
        )?,
        Command::Offer(a) => serde_json::to_value(client.get_offer(&a.id, cancel).await?)?,
        Command::Deals(a) => {
            let filter = DealFilter {
                terms: a.terms.filter(),
                created_at: Bounds::new(a.created_from, a.created_to),
            };
            serde_json::to_value(
                client
                    .list_deals(
                        &filter,
                        a.page.skip,
                        a.page.take,
                        a.terms.order.into(),
                        cancel,
                    )
                    .await?,
            )?
        }
        Command::Deal(a) => serde_json::to_value(client.get_deal(&a.id, cancel).await?)?,
    };
    Ok(value)
}
