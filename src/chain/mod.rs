//! Chain access boundary for purchase verification.
//!
//! On-chain transaction and receipt objects cross into the crate as
//! explicit typed values; anything the node returns that cannot be
//! parsed into them fails closed instead of leaking loosely-typed data
//! into the verification logic.

mod cache;
mod rpc;

pub use cache::VerifiedCache;
pub use rpc::RpcChainClient;

use crate::error::Result;
use async_trait::async_trait;
use primitive_types::U256;

/// A transaction as recorded on chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainTransaction {
    /// Transaction hash (0x-prefixed, lowercase).
    pub hash: String,
    /// Sender address (0x-prefixed, lowercase).
    pub from: String,
    /// Recipient address (0x-prefixed, lowercase). Absent for contract
    /// creation transactions, which can never be valid purchases.
    pub to: Option<String>,
    /// Native-currency value in wei.
    pub value: U256,
}

/// Execution outcome recorded in a transaction receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    /// Transaction executed successfully.
    Success,
    /// Transaction was mined but its execution failed.
    Failed,
}

/// A transaction receipt, reduced to what verification needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionReceipt {
    /// Execution outcome.
    pub status: ReceiptStatus,
}

/// Read access to the external chain.
///
/// `Ok(None)` means the chain answered and the object does not exist;
/// transport and decode failures are errors so callers can distinguish
/// "not there" from "could not ask".
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Fetch a transaction by hash.
    async fn transaction_by_hash(&self, hash: &str) -> Result<Option<ChainTransaction>>;

    /// Fetch the receipt for a transaction.
    async fn transaction_receipt(&self, hash: &str) -> Result<Option<TransactionReceipt>>;
}
