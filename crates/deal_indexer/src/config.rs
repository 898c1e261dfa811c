//! Client configuration: the two backing endpoints plus transport tunables.
//!
//! Only the chain RPC and indexer URLs are required. Everything else has a
//! default that works against a public deployment. A JSON file with the same
//! field names can be loaded with [`ClientConfig::from_file`].

use crate::error::ClientError;
use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

const MAX_ATTEMPTS: u32 = 3;
/// Upper bound accepted for `max_attempts`.
pub const MAX_ATTEMPTS_LIMIT: u32 = 10;
const RETRY_BACKOFF_MS: u64 = 250;
const REQUEST_TIMEOUT_MS: u64 = 30_000;

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub chain_rpc_url: Url,
    pub indexer_url: Url,
    /// Market contract queried for on-chain compute unit state.
    /// When `None`, results come from the indexer alone.
    pub market_address: Option<Address>,
    /// Total attempts for an idempotent read, first try included.
    /// Must lie in `1..=MAX_ATTEMPTS_LIMIT`.
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
    pub request_timeout_ms: u64,
    /// How long after an indexer update a chain/indexer disagreement is
    /// attributed to indexer lag instead of reported as an integrity error.
    pub staleness_window_secs: u64,
}

/// On-disk shape of [`ClientConfig`]; URLs are validated on conversion.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientConfigFile {
    pub chain_rpc_url: String,
    pub indexer_url: String,
    #[serde(default)]
    pub market_address: Option<String>,
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub retry_backoff_ms: Option<u64>,
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
    #[serde(default)]
    pub staleness_window_secs: Option<u64>,
}

impl ClientConfig {
    /// Build a config with default tunables. Fails with
    /// [`ClientError::Configuration`] when either URL is malformed.
    pub fn new(chain_rpc_url: &str, indexer_url: &str) -> Result<Self, ClientError> {
        Ok(Self {
            chain_rpc_url: parse_endpoint("chain rpc", chain_rpc_url)?,
            indexer_url: parse_endpoint("indexer", indexer_url)?,
            market_address: None,
            max_attempts: MAX_ATTEMPTS,
            retry_backoff_ms: RETRY_BACKOFF_MS,
            request_timeout_ms: REQUEST_TIMEOUT_MS,
            staleness_window_secs: 0,
        })
    }

    pub fn with_market_address(mut self, address: &str) -> Result<Self, ClientError> {
        let parsed: Address = address.trim().parse().map_err(|e| {
            ClientError::Configuration(format!("market address {address:?}: {e}"))
        })?;
        self.market_address = Some(parsed);
        Ok(self)
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Result<Self, ClientError> {
        if !(1..=MAX_ATTEMPTS_LIMIT).contains(&attempts) {
            return Err(ClientError::Configuration(format!(
                "max_attempts must be in [1, {MAX_ATTEMPTS_LIMIT}], got {attempts}"
            )));
        }
        self.max_attempts = attempts;
        Ok(self)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ClientError::Configuration(format!("read {}: {e}", path.display())))?;
        let file: ClientConfigFile = serde_json::from_str(&content)
            .map_err(|e| ClientError::Configuration(format!("parse {}: {e}", path.display())))?;
        Self::try_from(file)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub(crate) fn reconciles_with_chain(&self) -> bool {
        self.market_address.is_some()
    }
}

impl TryFrom<ClientConfigFile> for ClientConfig {
    type Error = ClientError;

    fn try_from(file: ClientConfigFile) -> Result<Self, Self::Error> {
        let mut config = Self::new(&file.chain_rpc_url, &file.indexer_url)?;
        if let Some(address) = file.market_address.as_deref() {
            config = config.with_market_address(address)?;
        }
        if let Some(attempts) = file.max_attempts {
            config = config.with_max_attempts(attempts)?;
        }
        if let Some(ms) = file.retry_backoff_ms {
            config.retry_backoff_ms = ms;
        }
        if let Some(ms) = file.request_timeout_ms {
            config.request_timeout_ms = ms;
        }
        if let Some(secs) = file.staleness_window_secs {
            config.staleness_window_secs = secs;
        }
        Ok(config)
    }
}

fn parse_endpoint(name: &str, raw: &str) -> Result<Url, ClientError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ClientError::Configuration(format!("{name} url {raw:?}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ClientError::Configuration(format!(
            "{name} url {raw:?}: scheme must be http or https"
        )));
    }
    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(ClientError::Configuration(format!(
            "{name} url {raw:?}: missing host"
        ))),
    }
}
