//! # agora-verifier
//!
//! Blockchain purchase verification core for the Agora civic engagement
//! platform.
//!
//! Users buy platform credit ("TA tokens") by sending ETH on a testnet.
//! The client's claim - an amount, a price and a transaction hash - is
//! adversarial input: this crate independently verifies the claim
//! before a single token is credited.
//!
//! ## Pipeline
//!
//! 1. [`WalletLinker`] - an account proves control of its wallet by
//!    signing a challenge message bound to its account id.
//! 2. [`PurchasePolicy`] - pure validation of the claimed amount and
//!    price against the platform's purchase policy.
//! 3. [`TransactionVerifier`] - fetches the claimed transaction from
//!    the chain and checks recipient, sender, value and finality.
//! 4. [`PurchaseProcessor`] - sequences the above, enforces exactly-once
//!    crediting per transaction hash and commits the balance change
//!    together with its audit [`LedgerEntry`].
//!
//! Everything around the pipeline (user management, HTTP routing, UI)
//! lives outside this crate; the [`PlatformStore`] and [`ChainClient`]
//! traits are the seams.
//!
//! ## Example
//!
//! ```rust,no_run
//! use agora_verifier::{
//!     MemoryStore, PlatformStore, PurchaseClaim, PurchasePolicy, PurchaseProcessor,
//!     RpcChainClient, TransactionVerifier, VerifierConfig,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = VerifierConfig::testnet(
//!         "https://sepolia.example/rpc",
//!         "0x742d35cc6634c0532925a3b844bc9e7595916da2",
//!     );
//!     let store = Arc::new(MemoryStore::new());
//!     store.create_account("acct-1").await?;
//!
//!     let client = RpcChainClient::from_config(&config.chain)?
//!         .map(|c| Arc::new(c) as Arc<dyn agora_verifier::ChainClient>);
//!     let verifier = TransactionVerifier::new(
//!         client,
//!         config.cache_capacity,
//!         PurchasePolicy::from_config(&config.policy)?.tolerance_wei,
//!     );
//!     let processor = PurchaseProcessor::new(
//!         store,
//!         verifier,
//!         PurchasePolicy::from_config(&config.policy)?,
//!         config.chain.receiving_address.as_deref().unwrap_or_default(),
//!     )?;
//!
//!     let receipt = processor
//!         .process(&PurchaseClaim {
//!             account_id: "acct-1".to_string(),
//!             units: 100,
//!             claimed_price_eth: "0.1".to_string(),
//!             tx_hash: "0x...".to_string(),
//!         })
//!         .await?;
//!     println!("new balance: {}", receipt.new_balance);
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod account;
pub mod amount;
pub mod chain;
pub mod config;
pub mod error;
pub mod linkage;
pub mod policy;
pub mod purchase;
pub mod verifier;

pub use account::{
    category, Account, Balances, LedgerEntry, MemoryStore, PlatformStore, PointKind,
};
pub use chain::{
    ChainClient, ChainTransaction, ReceiptStatus, RpcChainClient, TransactionReceipt,
    VerifiedCache,
};
pub use config::{ChainConfig, EthNetworkConfig, PolicyConfig, VerifierConfig};
pub use error::{Error, Result};
pub use linkage::{
    challenge_message, is_valid_address, normalize_address, recover_signer, LinkRequest,
    WalletLinker,
};
pub use policy::PurchasePolicy;
pub use purchase::{PurchaseClaim, PurchaseProcessor, PurchaseReceipt};
pub use verifier::{normalize_tx_hash, TransactionVerifier, VerifiedTransfer};
