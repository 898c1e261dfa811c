//! Chain RPC client: reads finality-sensitive compute unit state from the
//! market contract with `eth_call`.
//!
//! A zero worker id in the `getComputeUnit` return means the unit is not
//! bound to a worker.

use crate::chain::fetch::{FetchError, Fetcher};
use alloy::primitives::{hex, Address, B256, U256};
use alloy::sol;
use alloy::sol_types::SolCall;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

sol! {
    function getComputeUnit(bytes32 id) external view returns (bytes32 workerId, uint256 collateral);
}

/// Compute unit state as recorded on chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OnchainComputeUnit {
    /// Lowercase `0x` hex, `None` when unbound.
    pub worker_id: Option<String>,
    /// Collateral in the payment token's base units.
    pub collateral: U256,
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

pub(crate) struct ChainRpc {
    url: Url,
    market_address: Address,
    fetcher: Fetcher,
}

impl ChainRpc {
    pub(crate) fn new(url: Url, market_address: Address, fetcher: Fetcher) -> Self {
        Self {
            url,
            market_address,
            fetcher,
        }
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, FetchError> {
        let req = RpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };
        let body = self
            .fetcher
            .post_json(&self.url, &serde_json::to_value(&req)?)
            .await?;
        let resp: RpcResponse = serde_json::from_str(&body)?;
        if let Some(err) = resp.error {
            return Err(FetchError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        resp.result
            .ok_or_else(|| FetchError::Malformed(format!("{method}: neither result nor error")))
    }

    /// `unit_id` is a 32-byte hex id.
    pub(crate) async fn compute_unit(&self, unit_id: &str) -> Result<OnchainComputeUnit, FetchError> {
        let data = compute_unit_calldata(unit_id)?;
        let params = serde_json::json!([
            { "to": hex::encode_prefixed(self.market_address), "data": data },
            "latest"
        ]);
        let result = self.call("eth_call", params).await?;
        let hex_str = result
            .as_str()
            .ok_or_else(|| FetchError::Malformed(format!("eth_call result is not a string: {result}")))?;
        let unit = decode_compute_unit(hex_str)?;
        debug!(unit = %unit_id, bound = unit.worker_id.is_some(), "on-chain compute unit");
        Ok(unit)
    }

    pub(crate) fn request_count(&self) -> u64 {
        self.fetcher.request_count()
    }
}

/// ABI-encoded `getComputeUnit(unit_id)` call data, `0x`-prefixed.
pub fn compute_unit_calldata(unit_id: &str) -> Result<String, FetchError> {
    let id: B256 = unit_id
        .trim()
        .parse()
        .map_err(|e| FetchError::Malformed(format!("compute unit id {unit_id}: {e}")))?;
    Ok(hex::encode_prefixed(getComputeUnitCall { id }.abi_encode()))
}

fn decode_compute_unit(result: &str) -> Result<OnchainComputeUnit, FetchError> {
    let bytes =
        hex::decode(result).map_err(|e| FetchError::Malformed(format!("eth_call result: {e}")))?;
    let ret = getComputeUnitCall::abi_decode_returns(&bytes)
        .map_err(|e| FetchError::Malformed(format!("getComputeUnit return: {e}")))?;
    let worker_id = (!ret.workerId.is_zero()).then(|| hex::encode_prefixed(ret.workerId));
    Ok(OnchainComputeUnit {
        worker_id,
        collateral: ret.collateral,
    })
}
