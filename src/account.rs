//! Accounts, point balances and the append-only ledger.
//!
//! The verification core does not own user management; it consumes a
//! store seam ([`PlatformStore`]) that the platform's persistence layer
//! implements. [`MemoryStore`] is the in-process implementation used by
//! tests and single-node deployments. Its commit path holds one write
//! lock across the duplicate check, the balance bump and the ledger
//! append, so a purchase is credited exactly once even under concurrent
//! requests.

use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

/// The three point categories an account holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PointKind {
    /// Platform credit bought with ETH ("TA tokens").
    Purchased,
    /// Points earned through platform participation.
    Participation,
    /// Points spendable on supporting proposals.
    Support,
}

/// Per-category point balances. Non-negative by construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balances {
    /// Purchased token balance.
    pub purchased: u64,
    /// Participation point balance.
    pub participation: u64,
    /// Support point balance.
    pub support: u64,
}

impl Balances {
    /// Get the balance for a point category.
    #[must_use]
    pub fn get(&self, kind: PointKind) -> u64 {
        match kind {
            PointKind::Purchased => self.purchased,
            PointKind::Participation => self.participation,
            PointKind::Support => self.support,
        }
    }

    fn get_mut(&mut self, kind: PointKind) -> &mut u64 {
        match kind {
            PointKind::Purchased => &mut self.purchased,
            PointKind::Participation => &mut self.participation,
            PointKind::Support => &mut self.support,
        }
    }
}

/// A registered user identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Platform account id.
    pub id: String,
    /// Linked wallet address, lowercase-normalized. Set at most once.
    pub wallet: Option<String>,
    /// Point balances.
    pub balances: Balances,
}

impl Account {
    /// Create a fresh account with no wallet and zero balances.
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            wallet: None,
            balances: Balances::default(),
        }
    }
}

/// Ledger entry category tags.
pub mod category {
    /// Tokens bought with ETH.
    pub const PURCHASED: &str = "purchased";
    /// Points awarded for platform participation.
    pub const EARNED_PARTICIPATION: &str = "earned-participation";
    /// Points spent supporting a proposal.
    pub const SPENT_SUPPORT: &str = "spent-support";
}

/// An immutable audit record of a balance change.
///
/// For purchases the correlation id is the transaction hash; the store
/// refuses a second purchased entry with the same correlation id, which
/// is the durable replay guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Entry id.
    pub id: Uuid,
    /// Account the entry belongs to.
    pub account_id: String,
    /// Point category affected.
    pub kind: PointKind,
    /// Signed delta: positive = credited, negative = debited.
    pub delta: i64,
    /// Category tag (see [`category`]).
    pub category: String,
    /// Human-readable description.
    pub description: String,
    /// Correlation id; the transaction hash for purchase entries.
    pub correlation_id: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Build the single entry recording a completed purchase.
    #[must_use]
    pub fn purchase(account_id: &str, units: u64, tx_hash: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id: account_id.to_string(),
            kind: PointKind::Purchased,
            delta: i64::try_from(units).unwrap_or(i64::MAX),
            category: category::PURCHASED.to_string(),
            description: format!("Purchased {units} tokens"),
            correlation_id: Some(tx_hash.to_string()),
            created_at: Utc::now(),
        }
    }
}

/// Storage seam between the verification core and the platform.
///
/// Implementations must make [`Self::commit_purchase`] atomic: the
/// duplicate check, the balance change and the ledger append happen
/// together or not at all.
#[async_trait]
pub trait PlatformStore: Send + Sync {
    /// Look up an account by id.
    async fn account(&self, id: &str) -> Result<Option<Account>>;

    /// Register a new account with zero balances and no wallet.
    async fn create_account(&self, id: &str) -> Result<Account>;

    /// Attach a verified wallet address to an account.
    ///
    /// The address must already be lowercase-normalized. Fails with
    /// [`Error::WalletAlreadyLinked`] if any account (including this
    /// one) already has the address, closing the race between
    /// concurrent linkage attempts at commit time.
    async fn link_wallet(&self, account_id: &str, address: &str) -> Result<()>;

    /// Whether a purchased-category entry with this correlation id
    /// already exists. This is the authoritative replay check.
    async fn purchase_recorded(&self, tx_hash: &str) -> Result<bool>;

    /// Atomically credit purchased tokens and append the audit entry.
    ///
    /// Returns the new purchased balance. Fails with
    /// [`Error::DuplicateTransaction`] if an entry with the same
    /// correlation id was committed concurrently.
    async fn commit_purchase(&self, entry: LedgerEntry) -> Result<u64>;

    /// Append a non-purchase entry (award/spend collaborators) and
    /// apply its delta. Debits that would take a balance negative fail.
    async fn record_entry(&self, entry: LedgerEntry) -> Result<u64>;

    /// All ledger entries for an account, oldest first.
    async fn entries(&self, account_id: &str) -> Result<Vec<LedgerEntry>>;
}

#[derive(Default)]
struct StoreState {
    accounts: HashMap<String, Account>,
    /// Normalized wallet address -> owning account id.
    wallets: HashMap<String, String>,
    ledger: Vec<LedgerEntry>,
}

impl StoreState {
    fn purchase_exists(&self, tx_hash: &str) -> bool {
        self.ledger.iter().any(|e| {
            e.category == category::PURCHASED && e.correlation_id.as_deref() == Some(tx_hash)
        })
    }

    fn apply_delta(&mut self, entry: &LedgerEntry) -> Result<u64> {
        let account = self
            .accounts
            .get_mut(&entry.account_id)
            .ok_or_else(|| Error::UnknownAccount(entry.account_id.clone()))?;
        let balance = account.balances.get_mut(entry.kind);
        let updated = if entry.delta >= 0 {
            balance
                .checked_add(entry.delta.unsigned_abs())
                .ok_or_else(|| Error::Storage("balance overflow".to_string()))?
        } else {
            balance.checked_sub(entry.delta.unsigned_abs()).ok_or_else(|| {
                Error::Storage(format!(
                    "insufficient {:?} balance for account {}",
                    entry.kind, entry.account_id
                ))
            })?
        };
        *balance = updated;
        Ok(updated)
    }
}

/// In-memory [`PlatformStore`] implementation.
pub struct MemoryStore {
    state: parking_lot::RwLock<StoreState>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: parking_lot::RwLock::new(StoreState::default()),
        }
    }

    /// Number of ledger entries (test/audit convenience).
    #[must_use]
    pub fn ledger_len(&self) -> usize {
        self.state.read().ledger.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlatformStore for MemoryStore {
    async fn account(&self, id: &str) -> Result<Option<Account>> {
        Ok(self.state.read().accounts.get(id).cloned())
    }

    async fn create_account(&self, id: &str) -> Result<Account> {
        let mut state = self.state.write();
        if state.accounts.contains_key(id) {
            return Err(Error::Storage(format!("account {id} already exists")));
        }
        let account = Account::new(id);
        state.accounts.insert(id.to_string(), account.clone());
        debug!("Created account {}", id);
        Ok(account)
    }

    async fn link_wallet(&self, account_id: &str, address: &str) -> Result<()> {
        let mut state = self.state.write();
        if state.wallets.contains_key(address) {
            return Err(Error::WalletAlreadyLinked(address.to_string()));
        }
        let account = state
            .accounts
            .get_mut(account_id)
            .ok_or_else(|| Error::UnknownAccount(account_id.to_string()))?;
        if account.wallet.is_some() {
            // Link-once: relinking is not supported.
            return Err(Error::WalletAlreadyLinked(address.to_string()));
        }
        account.wallet = Some(address.to_string());
        state
            .wallets
            .insert(address.to_string(), account_id.to_string());
        info!("Linked wallet {} to account {}", address, account_id);
        Ok(())
    }

    async fn purchase_recorded(&self, tx_hash: &str) -> Result<bool> {
        Ok(self.state.read().purchase_exists(tx_hash))
    }

    async fn commit_purchase(&self, entry: LedgerEntry) -> Result<u64> {
        let mut state = self.state.write();
        let tx_hash = entry
            .correlation_id
            .clone()
            .ok_or_else(|| Error::Storage("purchase entry without correlation id".to_string()))?;
        // Re-checked under the write lock: this is the enforcement point
        // for exactly-once crediting per transaction hash.
        if state.purchase_exists(&tx_hash) {
            return Err(Error::DuplicateTransaction(tx_hash));
        }
        let new_balance = state.apply_delta(&entry)?;
        state.ledger.push(entry);
        Ok(new_balance)
    }

    async fn record_entry(&self, entry: LedgerEntry) -> Result<u64> {
        if entry.category == category::PURCHASED {
            return Err(Error::Storage(
                "purchase entries must go through commit_purchase".to_string(),
            ));
        }
        let mut state = self.state.write();
        let new_balance = state.apply_delta(&entry)?;
        state.ledger.push(entry);
        Ok(new_balance)
    }

    async fn entries(&self, account_id: &str) -> Result<Vec<LedgerEntry>> {
        Ok(self
            .state
            .read()
            .ledger
            .iter()
            .filter(|e| e.account_id == account_id)
            .cloned()
            .collect())
    }
}
