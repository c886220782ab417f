//! On-chain transaction verification.
//!
//! The client can claim any transaction hash, any amount and any
//! sender; nothing it submits is trusted. This module fetches the
//! claimed transaction from the chain and checks it actually pays the
//! expected amount, to the expected recipient, from the expected
//! sender, and finalized successfully. Checks run cheapest-first so a
//! bad claim never costs a network round trip it does not need.

use crate::amount::{format_eth, wei_from_u256, within_tolerance};
use crate::chain::{ChainClient, ReceiptStatus, VerifiedCache};
use crate::error::{Error, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Details of a transfer that passed every check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedTransfer {
    /// Transaction hash, lowercase.
    pub hash: String,
    /// Sender address, lowercase.
    pub from: String,
    /// Recipient address, lowercase.
    pub to: String,
    /// Transferred value in wei.
    pub value_wei: u128,
}

/// Verifies claimed transactions against the external chain.
pub struct TransactionVerifier {
    /// Chain access, absent when no RPC endpoint is configured.
    client: Option<Arc<dyn ChainClient>>,
    /// In-process memo of verified hashes. Best effort only; the
    /// durable replay guard lives in the ledger.
    memo: VerifiedCache,
    /// Absolute value-comparison tolerance in wei.
    tolerance_wei: u128,
}

impl TransactionVerifier {
    /// Create a verifier.
    ///
    /// Passing `None` for the client produces a verifier whose every
    /// call reports `ServiceUnavailable` - the platform runs with
    /// purchases disabled rather than crashing.
    #[must_use]
    pub fn new(
        client: Option<Arc<dyn ChainClient>>,
        cache_capacity: usize,
        tolerance_wei: u128,
    ) -> Self {
        if client.is_none() {
            warn!("No chain client configured, purchases will be unavailable");
        }
        Self {
            client,
            memo: VerifiedCache::with_capacity(cache_capacity),
            tolerance_wei,
        }
    }

    /// Whether on-chain verification is possible at all.
    #[must_use]
    pub fn chain_available(&self) -> bool {
        self.client.is_some()
    }

    /// Number of hashes in the in-process memo.
    #[must_use]
    pub fn memo_len(&self) -> usize {
        self.memo.len()
    }

    /// Verify that `tx_hash` pays `expected_wei` from `expected_sender`
    /// to `expected_recipient` and has finalized successfully.
    ///
    /// Expected addresses must be lowercase-normalized. Local checks
    /// (format, memo) run before any network call.
    ///
    /// # Errors
    ///
    /// Retryable: [`Error::ServiceUnavailable`], [`Error::NotFound`],
    /// [`Error::NotConfirmed`]. Permanent: [`Error::MalformedHash`],
    /// [`Error::AlreadyVerified`], [`Error::ExecutionFailed`],
    /// [`Error::RecipientMismatch`], [`Error::SenderMismatch`],
    /// [`Error::AmountMismatch`].
    pub async fn verify(
        &self,
        tx_hash: &str,
        expected_wei: u128,
        expected_recipient: &str,
        expected_sender: &str,
    ) -> Result<VerifiedTransfer> {
        let client = self.client.as_ref().ok_or_else(|| {
            Error::ServiceUnavailable("no chain client configured".to_string())
        })?;

        let tx_hash = normalize_tx_hash(tx_hash)?;

        if self.memo.contains(&tx_hash) {
            debug!("Transaction {} found in verified memo", tx_hash);
            return Err(Error::AlreadyVerified(tx_hash));
        }

        let tx = client
            .transaction_by_hash(&tx_hash)
            .await?
            .ok_or_else(|| Error::NotFound(tx_hash.clone()))?;

        let receipt = client
            .transaction_receipt(&tx_hash)
            .await?
            .ok_or_else(|| Error::NotConfirmed(tx_hash.clone()))?;

        if receipt.status == ReceiptStatus::Failed {
            return Err(Error::ExecutionFailed(tx_hash));
        }

        // Recipient first, then sender. The sender check is the
        // anti-spoofing core: transaction hashes are public, so anyone
        // could submit a stranger's valid payment to the platform
        // address and try to have it credited to their own account.
        match tx.to.as_deref() {
            Some(to) if to.eq_ignore_ascii_case(expected_recipient) => {}
            _ => {
                debug!(
                    "Transaction {} pays {:?}, expected {}",
                    tx_hash, tx.to, expected_recipient
                );
                return Err(Error::RecipientMismatch);
            }
        }

        if !tx.from.eq_ignore_ascii_case(expected_sender) {
            debug!(
                "Transaction {} sent by {}, expected {}",
                tx_hash, tx.from, expected_sender
            );
            return Err(Error::SenderMismatch);
        }

        let value_wei = wei_from_u256(tx.value).ok_or_else(|| Error::AmountMismatch {
            actual: tx.value.to_string(),
            expected: format_eth(expected_wei),
        })?;
        if !within_tolerance(value_wei, expected_wei, self.tolerance_wei) {
            return Err(Error::AmountMismatch {
                actual: format_eth(value_wei),
                expected: format_eth(expected_wei),
            });
        }

        self.memo.insert(&tx_hash);
        info!(
            "Verified transaction {} paying {} ETH from {}",
            tx_hash,
            format_eth(value_wei),
            tx.from
        );

        Ok(VerifiedTransfer {
            hash: tx_hash,
            from: tx.from,
            to: expected_recipient.to_string(),
            value_wei,
        })
    }
}

/// Validate a transaction hash (0x + 64 hex) and lowercase it.
///
/// # Errors
///
/// Returns [`Error::MalformedHash`] if the format is wrong.
pub fn normalize_tx_hash(hash: &str) -> Result<String> {
    let digits = hash
        .strip_prefix("0x")
        .or_else(|| hash.strip_prefix("0X"))
        .ok_or_else(|| Error::MalformedHash(hash.to_string()))?;
    if digits.len() != 64 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::MalformedHash(hash.to_string()));
    }
    Ok(format!("0x{}", digits.to_lowercase()))
}
