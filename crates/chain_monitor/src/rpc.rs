use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::trace;
use url::Url;

use crate::error::MonitorError;

const RPC_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// Raw log entry as returned by `eth_getLogs`.
#[derive(Debug, Clone, Deserialize)]
pub struct LogEntry {
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
    #[serde(rename = "blockNumber")]
    pub block_number: String,
    #[serde(rename = "transactionHash")]
    pub transaction_hash: String,
    #[serde(default)]
    pub removed: bool,
}

/// Minimal JSON-RPC client for the subset of the Ethereum API the monitor
/// needs.
#[derive(Debug, Clone)]
pub struct JsonRpcClient {
    url: Url,
    client: Client,
}

impl JsonRpcClient {
    pub fn new(url: Url) -> Result<Self, MonitorError> {
        let client = Client::builder()
            .timeout(RPC_TIMEOUT)
            .build()
            .map_err(|e| MonitorError::Rpc(e.to_string()))?;
        Ok(Self { url, client })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, MonitorError> {
        trace!(%method, "rpc call");
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };
        let response = self
            .client
            .post(self.url.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| MonitorError::Rpc(e.to_string()))?;
        let body: RpcResponse<T> = response.json().await.map_err(|e| MonitorError::Rpc(e.to_string()))?;
        if let Some(error) = body.error {
            return Err(MonitorError::RpcResponse {
                code: error.code,
                message: error.message,
            });
        }
        body.result
            .ok_or_else(|| MonitorError::MalformedResponse("response carries neither result nor error".into()))
    }

    pub async fn block_number(&self) -> Result<u64, MonitorError> {
        let raw: String = self.call("eth_blockNumber", json!([])).await?;
        parse_quantity(&raw)
    }

    pub async fn get_logs(
        &self,
        address: &str,
        topic0: &str,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<LogEntry>, MonitorError> {
        self.call(
            "eth_getLogs",
            json!([{
                "address": address,
                "topics": [topic0],
                "fromBlock": format!("{:#x}", from_block),
                "toBlock": format!("{:#x}", to_block),
            }]),
        )
        .await
    }
}

/// Parses an `0x`-prefixed hex quantity.
pub fn parse_quantity(raw: &str) -> Result<u64, MonitorError> {
    u64::from_str_radix(raw.trim_start_matches("0x"), 16)
        .map_err(|e| MonitorError::MalformedResponse(format!("bad quantity {raw:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_parsing() {
        assert_eq!(parse_quantity("0x0").unwrap(), 0);
        assert_eq!(parse_quantity("0x10").unwrap(), 16);
        assert_eq!(parse_quantity("0x112a880").unwrap(), 18_000_000);
        assert!(parse_quantity("nope").is_err());
    }
}
