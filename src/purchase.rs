//! Purchase orchestration.
//!
//! Sequences parameter validation, account resolution, wallet
//! confirmation, on-chain verification, the durable replay check and
//! the atomic commit. The pipeline is linear: any failure rejects the
//! claim with its typed reason and nothing is written; a rejected
//! purchase requires a fresh client-initiated retry.

use crate::account::{LedgerEntry, PlatformStore};
use crate::error::{Error, Result};
use crate::policy::PurchasePolicy;
use crate::verifier::TransactionVerifier;
use std::sync::Arc;
use tracing::{debug, info};

/// The client's unverified assertion that it paid for tokens.
#[derive(Debug, Clone)]
pub struct PurchaseClaim {
    /// Account to credit (from the caller's session, not client data).
    pub account_id: String,
    /// Desired token units.
    pub units: u64,
    /// Claimed total price as a decimal ETH string.
    pub claimed_price_eth: String,
    /// Claimed transaction hash (0x + 64 hex).
    pub tx_hash: String,
}

/// Outcome of an accepted purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseReceipt {
    /// New purchased-token balance.
    pub new_balance: u64,
    /// The audit entry that was committed.
    pub entry: LedgerEntry,
}

/// Orchestrates the purchase pipeline.
pub struct PurchaseProcessor<S> {
    store: Arc<S>,
    verifier: TransactionVerifier,
    policy: PurchasePolicy,
    /// Platform address purchases must pay into, lowercase.
    receiving_address: String,
}

impl<S: PlatformStore> PurchaseProcessor<S> {
    /// Create a processor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedAddress`] if the receiving address is
    /// not a valid wallet address.
    pub fn new(
        store: Arc<S>,
        verifier: TransactionVerifier,
        policy: PurchasePolicy,
        receiving_address: &str,
    ) -> Result<Self> {
        let receiving_address = crate::linkage::normalize_address(receiving_address)?;
        Ok(Self {
            store,
            verifier,
            policy,
            receiving_address,
        })
    }

    /// The purchase policy in force.
    #[must_use]
    pub fn policy(&self) -> &PurchasePolicy {
        &self.policy
    }

    /// Process a purchase claim end to end.
    ///
    /// On success the purchased balance has been credited and exactly
    /// one ledger entry with the transaction hash as correlation id has
    /// been committed, atomically.
    ///
    /// # Errors
    ///
    /// Propagates every rejection from the parameter validator and the
    /// transaction verifier unmodified, plus [`Error::UnknownAccount`],
    /// [`Error::WalletNotLinked`] and [`Error::DuplicateTransaction`].
    pub async fn process(&self, claim: &PurchaseClaim) -> Result<PurchaseReceipt> {
        debug!(
            "Purchase claim from account {}: {} units via {}",
            claim.account_id, claim.units, claim.tx_hash
        );

        // Local checks first; nothing below touches the network until
        // the claim is internally consistent and the account qualifies.
        let expected_wei = self.policy.validate(claim.units, &claim.claimed_price_eth)?;

        let account = self
            .store
            .account(&claim.account_id)
            .await?
            .ok_or_else(|| Error::UnknownAccount(claim.account_id.clone()))?;

        // Purchases are only accepted from accounts that already proved
        // control of their wallet; the transaction's sender is checked
        // against that wallet, never against anything client-supplied.
        let wallet = account
            .wallet
            .as_deref()
            .ok_or_else(|| Error::WalletNotLinked(claim.account_id.clone()))?;

        let transfer = match self
            .verifier
            .verify(&claim.tx_hash, expected_wei, &self.receiving_address, wallet)
            .await
        {
            Ok(transfer) => transfer,
            // A memo hit means this process verified the hash before.
            // When the ledger confirms the purchase was credited, report
            // the replay as a duplicate; otherwise (verified but never
            // committed) the memo rejection stands on its own.
            Err(Error::AlreadyVerified(hash)) => {
                if self.store.purchase_recorded(&hash).await? {
                    return Err(Error::DuplicateTransaction(hash));
                }
                return Err(Error::AlreadyVerified(hash));
            }
            Err(e) => return Err(e),
        };

        // Durable replay check. The verifier's memo already rejected
        // process-local repeats, but it does not survive restarts and
        // is not shared across instances; the ledger is authoritative.
        if self.store.purchase_recorded(&transfer.hash).await? {
            return Err(Error::DuplicateTransaction(transfer.hash));
        }

        let entry = LedgerEntry::purchase(&claim.account_id, claim.units, &transfer.hash);
        let new_balance = self.store.commit_purchase(entry.clone()).await?;

        info!(
            "Credited {} tokens to account {} for transaction {} (balance {})",
            claim.units, claim.account_id, transfer.hash, new_balance
        );

        Ok(PurchaseReceipt { new_balance, entry })
    }
}
