//! JSON-RPC chain client over HTTP.
//!
//! Speaks standard `eth_getTransactionByHash` / `eth_getTransactionReceipt`
//! to any Ethereum JSON-RPC endpoint. Every request carries a bounded
//! timeout; transport failures, timeouts and undecodable responses all
//! surface as the retryable `ServiceUnavailable` condition.

use crate::chain::{ChainClient, ChainTransaction, ReceiptStatus, TransactionReceipt};
use crate::config::ChainConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use primitive_types::U256;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// JSON-RPC client for an Ethereum node.
pub struct RpcChainClient {
    client: reqwest::Client,
    url: String,
}

impl RpcChainClient {
    /// Create a client for the given endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(url: &str, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("agora-verifier/", env!("CARGO_PKG_VERSION")))
            .timeout(request_timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    /// Create a client from chain configuration.
    ///
    /// Returns `Ok(None)` when no RPC URL is configured; the caller then
    /// runs without chain access and purchases report unavailable.
    ///
    /// # Errors
    ///
    /// Returns an error if a URL is configured but the client cannot be
    /// built.
    pub fn from_config(config: &ChainConfig) -> Result<Option<Self>> {
        match &config.rpc_url {
            Some(url) => Ok(Some(Self::new(
                url,
                Duration::from_secs(config.request_timeout_secs),
            )?)),
            None => Ok(None),
        }
    }

    async fn call(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value> {
        debug!("Chain query {} to {}", method, self.url);

        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::ServiceUnavailable(format!("{method} request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::ServiceUnavailable(format!(
                "{method} returned HTTP {}",
                response.status()
            )));
        }

        let envelope: RpcEnvelope = response
            .json()
            .await
            .map_err(|e| Error::ServiceUnavailable(format!("{method} response invalid: {e}")))?;

        if let Some(rpc_error) = envelope.error {
            return Err(Error::ServiceUnavailable(format!(
                "{method} error {}: {}",
                rpc_error.code, rpc_error.message
            )));
        }

        Ok(envelope.result.unwrap_or(serde_json::Value::Null))
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn transaction_by_hash(&self, hash: &str) -> Result<Option<ChainTransaction>> {
        let result = self
            .call("eth_getTransactionByHash", json!([hash]))
            .await?;
        if result.is_null() {
            return Ok(None);
        }

        let wire: WireTransaction = serde_json::from_value(result).map_err(|e| {
            Error::ServiceUnavailable(format!("unparseable transaction object: {e}"))
        })?;
        Ok(Some(wire.try_into()?))
    }

    async fn transaction_receipt(&self, hash: &str) -> Result<Option<TransactionReceipt>> {
        let result = self
            .call("eth_getTransactionReceipt", json!([hash]))
            .await?;
        if result.is_null() {
            return Ok(None);
        }

        let wire: WireReceipt = serde_json::from_value(result)
            .map_err(|e| Error::ServiceUnavailable(format!("unparseable receipt object: {e}")))?;
        Ok(Some(wire.try_into()?))
    }
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    result: Option<serde_json::Value>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// Transaction object as the node serializes it.
#[derive(Debug, Deserialize)]
struct WireTransaction {
    hash: String,
    from: String,
    to: Option<String>,
    value: String,
}

impl TryFrom<WireTransaction> for ChainTransaction {
    type Error = Error;

    fn try_from(wire: WireTransaction) -> Result<ChainTransaction> {
        Ok(ChainTransaction {
            hash: wire.hash.to_lowercase(),
            from: wire.from.to_lowercase(),
            to: wire.to.map(|t| t.to_lowercase()),
            value: parse_quantity(&wire.value)?,
        })
    }
}

/// Receipt object as the node serializes it.
#[derive(Debug, Deserialize)]
struct WireReceipt {
    status: Option<String>,
}

impl TryFrom<WireReceipt> for TransactionReceipt {
    type Error = Error;

    fn try_from(wire: WireReceipt) -> Result<TransactionReceipt> {
        // Pre-Byzantium receipts have no status field; fail closed.
        let status = wire.status.ok_or_else(|| {
            Error::ServiceUnavailable("receipt has no status field".to_string())
        })?;
        let status = match parse_quantity(&status)? {
            v if v == U256::one() => ReceiptStatus::Success,
            v if v.is_zero() => ReceiptStatus::Failed,
            other => {
                return Err(Error::ServiceUnavailable(format!(
                    "unexpected receipt status {other}"
                )))
            }
        };
        Ok(TransactionReceipt { status })
    }
}

/// Parse a 0x-prefixed hex quantity.
fn parse_quantity(value: &str) -> Result<U256> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .ok_or_else(|| Error::ServiceUnavailable(format!("quantity without 0x prefix: {value}")))?;
    if digits.is_empty() {
        return Err(Error::ServiceUnavailable(format!(
            "empty hex quantity: {value}"
        )));
    }
    U256::from_str_radix(digits, 16)
        .map_err(|e| Error::ServiceUnavailable(format!("invalid hex quantity {value}: {e}")))
}
