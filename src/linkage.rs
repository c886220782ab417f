//! Wallet linkage verification.
//!
//! Before an account may purchase tokens it must prove control of the
//! wallet it will pay from. The client signs a challenge message with
//! the wallet's key; the server recovers the signing address from the
//! signature and only links the wallet if the recovered address matches
//! the claimed one and the signed text is bound to the requesting
//! account. Typing in an address is never enough.

use crate::account::PlatformStore;
use crate::error::{Error, Result};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use sha3::{Digest, Keccak256};
use std::sync::Arc;
use tracing::{debug, info};

/// Application name placed at the top of challenge messages.
pub const APP_NAME: &str = "Agora";

/// A wallet linkage request as submitted by the client.
#[derive(Debug, Clone)]
pub struct LinkRequest {
    /// Account requesting the linkage.
    pub account_id: String,
    /// Wallet address the account claims to control.
    pub wallet_address: String,
    /// Challenge message that was signed, containing `User: <accountId>`.
    pub message: String,
    /// Hex-encoded 65-byte signature (r || s || v) over the message.
    pub signature: String,
}

/// Verifies linkage requests and persists successful links.
pub struct WalletLinker<S> {
    store: Arc<S>,
}

impl<S: PlatformStore> WalletLinker<S> {
    /// Create a linker over the platform store.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Verify a linkage request and attach the wallet to the account.
    ///
    /// Returns the lowercase-normalized address that was linked.
    ///
    /// # Errors
    ///
    /// * [`Error::MalformedAddress`] - claimed address is not 0x + 40 hex
    /// * [`Error::InvalidSignature`] - recovery failed or the recovered
    ///   address differs from the claimed one
    /// * [`Error::MessageAccountMismatch`] - signed text does not name
    ///   the requesting account (defeats cross-account signature replay)
    /// * [`Error::WalletAlreadyLinked`] - address is taken, or the
    ///   account already linked a wallet (link-once)
    pub async fn link(&self, request: &LinkRequest) -> Result<String> {
        let address = normalize_address(&request.wallet_address)?;

        let recovered = recover_signer(&request.message, &request.signature)?;
        if recovered != address {
            debug!(
                "Linkage signature for account {} recovered {} instead of {}",
                request.account_id, recovered, address
            );
            return Err(Error::InvalidSignature);
        }

        // The signed text must be bound to this account, otherwise a
        // signature captured from one account could link the same wallet
        // to another. The whole `User:` line is compared so an account id
        // that is a prefix of another ("acct-1" vs "acct-12") cannot
        // satisfy the check.
        if !message_names_account(&request.message, &request.account_id) {
            return Err(Error::MessageAccountMismatch(request.account_id.clone()));
        }

        self.store.link_wallet(&request.account_id, &address).await?;

        info!(
            "Account {} proved control of wallet {}",
            request.account_id, address
        );
        Ok(address)
    }
}

/// Build the recommended challenge message for a linkage attempt.
///
/// The server only pattern-matches the `User:` line; the rest gives the
/// signer human-readable context in the wallet prompt.
#[must_use]
pub fn challenge_message(account_id: &str, wallet_address: &str) -> String {
    format!(
        "{APP_NAME}\nUser: {account_id}\nWallet: {wallet_address}\nDate: {}",
        chrono::Utc::now().to_rfc3339()
    )
}

/// Whether the challenge message's `User:` line names exactly this
/// account id.
fn message_names_account(message: &str, account_id: &str) -> bool {
    message
        .lines()
        .any(|line| line.strip_prefix("User: ").map(str::trim_end) == Some(account_id))
}

/// Check that an address is a 0x-prefixed 40-hex-digit string.
#[must_use]
pub fn is_valid_address(address: &str) -> bool {
    normalize_address(address).is_ok()
}

/// Validate an address and normalize it to lowercase.
///
/// # Errors
///
/// Returns [`Error::MalformedAddress`] if the format is wrong.
pub fn normalize_address(address: &str) -> Result<String> {
    let digits = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .ok_or_else(|| Error::MalformedAddress(address.to_string()))?;
    if digits.len() != 40 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::MalformedAddress(address.to_string()));
    }
    Ok(format!("0x{}", digits.to_lowercase()))
}

/// Recover the lowercase signer address from a personal-sign signature.
///
/// The signature is the standard 65-byte `r || s || v` form produced by
/// wallet `personal_sign`, hex-encoded with or without a 0x prefix.
///
/// # Errors
///
/// Returns [`Error::InvalidSignature`] if the signature cannot be
/// decoded or no public key can be recovered.
pub fn recover_signer(message: &str, signature: &str) -> Result<String> {
    let raw = signature.strip_prefix("0x").unwrap_or(signature);
    let bytes = hex::decode(raw).map_err(|_| Error::InvalidSignature)?;
    if bytes.len() != 65 {
        return Err(Error::InvalidSignature);
    }

    let recovery_id = parse_recovery_id(bytes[64])?;
    let signature = Signature::from_slice(&bytes[..64]).map_err(|_| Error::InvalidSignature)?;

    let digest = personal_message_hash(message);
    let key = VerifyingKey::recover_from_prehash(&digest, &signature, recovery_id)
        .map_err(|_| Error::InvalidSignature)?;

    Ok(address_of(&key))
}

/// EIP-191 hash of a personal-sign message.
///
/// `keccak256("\x19Ethereum Signed Message:\n" + len(msg) + msg)` -
/// the prefix wallets prepend so signed chat text can never double as a
/// signed transaction.
#[must_use]
pub fn personal_message_hash(message: &str) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(format!("\x19Ethereum Signed Message:\n{}", message.len()));
    hasher.update(message.as_bytes());
    hasher.finalize().into()
}

/// Derive the lowercase 0x address of a secp256k1 public key.
///
/// Keccak-256 of the uncompressed key without its 0x04 prefix, last 20
/// bytes.
#[must_use]
pub fn address_of(key: &VerifyingKey) -> String {
    let point = key.to_encoded_point(false);
    let digest = Keccak256::digest(&point.as_bytes()[1..]);
    format!("0x{}", hex::encode(&digest[12..]))
}

/// Parse a recovery id from the signature's v byte (0, 1, 27 or 28).
fn parse_recovery_id(v: u8) -> Result<RecoveryId> {
    let id = match v {
        0 | 27 => 0,
        1 | 28 => 1,
        _ => return Err(Error::InvalidSignature),
    };
    RecoveryId::try_from(id).map_err(|_| Error::InvalidSignature)
}
