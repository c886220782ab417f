//! End-to-end purchase flow scenarios.
//!
//! Exercises the full public pipeline - account registration, wallet
//! linkage with a real secp256k1 signature, on-chain verification over
//! a mock chain, crediting and replay rejection - the way the platform
//! glues it together.

#![allow(clippy::expect_used)]

use agora_verifier::{
    category, challenge_message, ChainClient, ChainTransaction, Error, LedgerEntry, LinkRequest,
    MemoryStore, PlatformStore, PointKind, PurchaseClaim, PurchasePolicy, PurchaseProcessor,
    ReceiptStatus, Result, TransactionReceipt, TransactionVerifier, VerifierConfig, WalletLinker,
};
use async_trait::async_trait;
use k256::ecdsa::SigningKey;
use primitive_types::U256;
use sha3::{Digest, Keccak256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const PLATFORM: &str = "0xffffffffffffffffffffffffffffffffffffffff";
const TENTH_ETH: u128 = 100_000_000_000_000_000;

/// In-memory chain with a network-call counter.
#[derive(Default)]
struct MockChain {
    transactions: parking_lot::RwLock<HashMap<String, ChainTransaction>>,
    receipts: parking_lot::RwLock<HashMap<String, TransactionReceipt>>,
    calls: AtomicUsize,
}

impl MockChain {
    fn add_transfer(&self, hash: &str, from: &str, to: &str, value_wei: u128) {
        self.transactions.write().insert(
            hash.to_string(),
            ChainTransaction {
                hash: hash.to_string(),
                from: from.to_string(),
                to: Some(to.to_string()),
                value: U256::from(value_wei),
            },
        );
        self.receipts.write().insert(
            hash.to_string(),
            TransactionReceipt {
                status: ReceiptStatus::Success,
            },
        );
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn transaction_by_hash(&self, hash: &str) -> Result<Option<ChainTransaction>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.transactions.read().get(hash).cloned())
    }

    async fn transaction_receipt(&self, hash: &str) -> Result<Option<TransactionReceipt>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.receipts.read().get(hash).copied())
    }
}

fn wallet_key(seed: u8) -> SigningKey {
    let mut bytes = [0u8; 32];
    bytes[31] = seed;
    SigningKey::from_slice(&bytes).expect("valid key")
}

fn wallet_address(key: &SigningKey) -> String {
    let point = key.verifying_key().to_encoded_point(false);
    let digest = Keccak256::digest(&point.as_bytes()[1..]);
    format!("0x{}", hex::encode(&digest[12..]))
}

fn personal_sign(key: &SigningKey, message: &str) -> String {
    let mut hasher = Keccak256::new();
    hasher.update(format!("\x19Ethereum Signed Message:\n{}", message.len()));
    hasher.update(message.as_bytes());
    let digest: [u8; 32] = hasher.finalize().into();
    let (signature, recovery_id) = key
        .sign_prehash_recoverable(&digest)
        .expect("signing succeeds");
    let mut bytes = signature.to_bytes().to_vec();
    bytes.push(recovery_id.to_byte() + 27);
    format!("0x{}", hex::encode(bytes))
}

fn tx_hash(seed: u8) -> String {
    format!("0x{}", hex::encode([seed; 32]))
}

struct Platform {
    store: Arc<MemoryStore>,
    chain: Arc<MockChain>,
    linker: WalletLinker<MemoryStore>,
    processor: PurchaseProcessor<MemoryStore>,
}

/// Wire the pipeline together the way the platform does at startup.
fn build_platform() -> Platform {
    let config = VerifierConfig::testnet("https://sepolia.example/rpc", PLATFORM);
    let policy = PurchasePolicy::from_config(&config.policy).expect("valid policy");

    let store = Arc::new(MemoryStore::new());
    let chain = Arc::new(MockChain::default());
    let verifier = TransactionVerifier::new(
        Some(Arc::clone(&chain) as Arc<dyn ChainClient>),
        config.cache_capacity,
        policy.tolerance_wei,
    );
    let processor = PurchaseProcessor::new(Arc::clone(&store), verifier, policy, PLATFORM)
        .expect("valid processor");
    let linker = WalletLinker::new(Arc::clone(&store));

    Platform {
        store,
        chain,
        linker,
        processor,
    }
}

async fn register_and_link(platform: &Platform, account_id: &str, key: &SigningKey) -> String {
    platform
        .store
        .create_account(account_id)
        .await
        .expect("create account");
    let address = wallet_address(key);
    let message = challenge_message(account_id, &address);
    platform
        .linker
        .link(&LinkRequest {
            account_id: account_id.to_string(),
            wallet_address: address.clone(),
            message: message.clone(),
            signature: personal_sign(key, &message),
        })
        .await
        .expect("link wallet")
}

#[tokio::test]
async fn purchase_credits_balance_and_writes_audit_entry() {
    let platform = build_platform();
    let key = wallet_key(1);
    let wallet = register_and_link(&platform, "acct-1", &key).await;

    let hash = tx_hash(1);
    platform.chain.add_transfer(&hash, &wallet, PLATFORM, TENTH_ETH);

    let receipt = platform
        .processor
        .process(&PurchaseClaim {
            account_id: "acct-1".to_string(),
            units: 100,
            claimed_price_eth: "0.100000".to_string(),
            tx_hash: hash.clone(),
        })
        .await
        .expect("purchase accepted");

    assert_eq!(receipt.new_balance, 100);
    assert_eq!(receipt.entry.category, category::PURCHASED);
    assert_eq!(receipt.entry.kind, PointKind::Purchased);
    assert_eq!(receipt.entry.correlation_id.as_deref(), Some(hash.as_str()));

    let account = platform
        .store
        .account("acct-1")
        .await
        .expect("query")
        .expect("exists");
    assert_eq!(account.balances.purchased, 100);
    assert_eq!(account.balances.participation, 0);

    let entries = platform.store.entries("acct-1").await.expect("entries");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].delta, 100);
}

#[tokio::test]
async fn replaying_the_same_hash_credits_exactly_once() {
    let platform = build_platform();
    let key = wallet_key(1);
    let wallet = register_and_link(&platform, "acct-1", &key).await;

    let hash = tx_hash(1);
    platform.chain.add_transfer(&hash, &wallet, PLATFORM, TENTH_ETH);

    let claim = PurchaseClaim {
        account_id: "acct-1".to_string(),
        units: 100,
        claimed_price_eth: "0.1".to_string(),
        tx_hash: hash.clone(),
    };

    platform.processor.process(&claim).await.expect("first accepted");
    let result = platform.processor.process(&claim).await;
    assert_eq!(result, Err(Error::DuplicateTransaction(hash)));

    let account = platform
        .store
        .account("acct-1")
        .await
        .expect("query")
        .expect("exists");
    assert_eq!(account.balances.purchased, 100);
    assert_eq!(platform.store.entries("acct-1").await.expect("entries").len(), 1);
}

#[tokio::test]
async fn unlinked_account_is_rejected_without_network_calls() {
    let platform = build_platform();
    platform
        .store
        .create_account("acct-1")
        .await
        .expect("create account");

    let result = platform
        .processor
        .process(&PurchaseClaim {
            account_id: "acct-1".to_string(),
            units: 100,
            claimed_price_eth: "0.1".to_string(),
            tx_hash: tx_hash(1),
        })
        .await;

    assert_eq!(result, Err(Error::WalletNotLinked("acct-1".to_string())));
    assert_eq!(platform.chain.call_count(), 0);
}

#[tokio::test]
async fn below_minimum_is_rejected_without_network_calls() {
    let platform = build_platform();
    let key = wallet_key(1);
    register_and_link(&platform, "acct-1", &key).await;

    // Default policy has min_purchase = 1; rebuild with min = 10 to
    // exercise the bound.
    let mut config = VerifierConfig::testnet("https://sepolia.example/rpc", PLATFORM);
    config.policy.min_purchase = 10;
    let policy = PurchasePolicy::from_config(&config.policy).expect("valid policy");
    let verifier = TransactionVerifier::new(
        Some(Arc::clone(&platform.chain) as Arc<dyn ChainClient>),
        config.cache_capacity,
        policy.tolerance_wei,
    );
    let processor =
        PurchaseProcessor::new(Arc::clone(&platform.store), verifier, policy, PLATFORM)
            .expect("valid processor");

    let result = processor
        .process(&PurchaseClaim {
            account_id: "acct-1".to_string(),
            units: 5,
            claimed_price_eth: "0.005".to_string(),
            tx_hash: tx_hash(1),
        })
        .await;

    assert_eq!(result, Err(Error::BelowMinimum { amount: 5, min: 10 }));
    assert_eq!(platform.chain.call_count(), 0);
}

#[tokio::test]
async fn anothers_payment_cannot_be_claimed() {
    let platform = build_platform();
    let key_a = wallet_key(1);
    let key_c = wallet_key(3);
    register_and_link(&platform, "acct-1", &key_a).await;

    // A real, correct payment to the platform - but sent by wallet C.
    let hash = tx_hash(1);
    platform
        .chain
        .add_transfer(&hash, &wallet_address(&key_c), PLATFORM, TENTH_ETH);

    let result = platform
        .processor
        .process(&PurchaseClaim {
            account_id: "acct-1".to_string(),
            units: 100,
            claimed_price_eth: "0.1".to_string(),
            tx_hash: hash,
        })
        .await;

    assert_eq!(result, Err(Error::SenderMismatch));
    let account = platform
        .store
        .account("acct-1")
        .await
        .expect("query")
        .expect("exists");
    assert_eq!(account.balances.purchased, 0);
}

#[tokio::test]
async fn one_wallet_cannot_serve_two_accounts() {
    let platform = build_platform();
    let key = wallet_key(1);
    register_and_link(&platform, "acct-1", &key).await;

    platform
        .store
        .create_account("acct-2")
        .await
        .expect("create account");
    let address = wallet_address(&key);
    let message = challenge_message("acct-2", &address);
    let result = platform
        .linker
        .link(&LinkRequest {
            account_id: "acct-2".to_string(),
            wallet_address: address.clone(),
            message: message.clone(),
            signature: personal_sign(&key, &message),
        })
        .await;

    assert_eq!(result, Err(Error::WalletAlreadyLinked(address)));
}

#[tokio::test]
async fn pending_transaction_is_retryable_then_succeeds() {
    let platform = build_platform();
    let key = wallet_key(1);
    let wallet = register_and_link(&platform, "acct-1", &key).await;

    let hash = tx_hash(1);
    let claim = PurchaseClaim {
        account_id: "acct-1".to_string(),
        units: 100,
        claimed_price_eth: "0.1".to_string(),
        tx_hash: hash.clone(),
    };

    // Not on chain yet: retryable rejection, nothing committed.
    let result = platform.processor.process(&claim).await;
    assert!(matches!(result, Err(Error::NotFound(_))));
    assert!(result.expect_err("not found").is_retryable());

    // The transaction lands; the same claim now succeeds.
    platform.chain.add_transfer(&hash, &wallet, PLATFORM, TENTH_ETH);
    let receipt = platform.processor.process(&claim).await.expect("accepted");
    assert_eq!(receipt.new_balance, 100);
}

#[tokio::test]
async fn purchases_mix_with_award_and_spend_entries() {
    let platform = build_platform();
    let key = wallet_key(1);
    let wallet = register_and_link(&platform, "acct-1", &key).await;

    let hash = tx_hash(1);
    platform.chain.add_transfer(&hash, &wallet, PLATFORM, TENTH_ETH);
    platform
        .processor
        .process(&PurchaseClaim {
            account_id: "acct-1".to_string(),
            units: 100,
            claimed_price_eth: "0.1".to_string(),
            tx_hash: hash,
        })
        .await
        .expect("purchase accepted");

    // External collaborators record their own ledger entries.
    let award = LedgerEntry {
        id: uuid::Uuid::new_v4(),
        account_id: "acct-1".to_string(),
        kind: PointKind::Participation,
        delta: 7,
        category: category::EARNED_PARTICIPATION.to_string(),
        description: "Created a proposal".to_string(),
        correlation_id: None,
        created_at: chrono::Utc::now(),
    };
    let balance = platform.store.record_entry(award).await.expect("award");
    assert_eq!(balance, 7);

    let account = platform
        .store
        .account("acct-1")
        .await
        .expect("query")
        .expect("exists");
    assert_eq!(account.balances.purchased, 100);
    assert_eq!(account.balances.participation, 7);
    assert_eq!(platform.store.entries("acct-1").await.expect("entries").len(), 2);
}
