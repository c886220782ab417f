//! Error types for agora-verifier.
//!
//! Every rejection a verification component can produce is a distinct
//! variant, so callers can branch on the reason while the `Display`
//! output stays suitable for a user-facing message. No failure here is
//! ever fatal to the process.

use thiserror::Error;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in agora-verifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // --- wallet linkage ---
    /// Wallet address is not a 0x-prefixed 40-hex-digit string.
    #[error("malformed wallet address: {0}")]
    MalformedAddress(String),

    /// Signature recovery failed or recovered a different address.
    #[error("signature does not match the claimed wallet address")]
    InvalidSignature,

    /// The signed challenge message is bound to a different account.
    #[error("challenge message does not reference account {0}")]
    MessageAccountMismatch(String),

    /// The wallet address is already linked to an account.
    #[error("wallet {0} is already linked to an account")]
    WalletAlreadyLinked(String),

    // --- purchase parameters ---
    /// Requested unit amount is zero or not a positive integer.
    #[error("token amount must be a positive integer")]
    NotAPositiveInteger,

    /// Requested unit amount is below the minimum purchase.
    #[error("token amount {amount} is below the minimum purchase of {min}")]
    BelowMinimum {
        /// Requested amount.
        amount: u64,
        /// Policy minimum.
        min: u64,
    },

    /// Requested unit amount is above the maximum purchase.
    #[error("token amount {amount} is above the maximum purchase of {max}")]
    AboveMaximum {
        /// Requested amount.
        amount: u64,
        /// Policy maximum.
        max: u64,
    },

    /// Claimed price does not match amount x unit price.
    #[error("claimed price {claimed} ETH does not match expected {expected} ETH")]
    PriceMismatch {
        /// Price claimed by the client.
        claimed: String,
        /// Price computed from the policy.
        expected: String,
    },

    // --- transaction verification ---
    /// Chain access failed or no chain client is configured.
    #[error("blockchain verification service is unavailable: {0}")]
    ServiceUnavailable(String),

    /// Transaction hash is not a 0x-prefixed 64-hex-digit string.
    #[error("malformed transaction hash: {0}")]
    MalformedHash(String),

    /// Transaction hash was already verified during this process lifetime.
    #[error("transaction {0} has already been verified")]
    AlreadyVerified(String),

    /// Transaction does not exist on the chain (yet).
    #[error("transaction {0} was not found on chain, it may still be propagating")]
    NotFound(String),

    /// Transaction exists but has no receipt yet.
    #[error("transaction {0} is not confirmed yet, try again later")]
    NotConfirmed(String),

    /// Transaction was mined but its execution failed.
    #[error("transaction {0} failed on chain")]
    ExecutionFailed(String),

    /// Transaction pays a different recipient than the platform address.
    #[error("transaction recipient does not match the platform address")]
    RecipientMismatch,

    /// Transaction was sent from a wallet other than the expected one.
    #[error("transaction sender does not match the linked wallet")]
    SenderMismatch,

    /// Transaction value differs from the expected price.
    #[error("transaction value {actual} ETH does not match expected {expected} ETH")]
    AmountMismatch {
        /// Value recorded on chain.
        actual: String,
        /// Value the claim requires.
        expected: String,
    },

    // --- purchase orchestration ---
    /// No account exists with the given id.
    #[error("unknown account: {0}")]
    UnknownAccount(String),

    /// The account has not completed wallet linkage.
    #[error("account {0} has no linked wallet, link a wallet before purchasing")]
    WalletNotLinked(String),

    /// A purchase with this transaction hash was already credited.
    #[error("transaction {0} was already used for a purchase")]
    DuplicateTransaction(String),

    // --- ambient ---
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Malformed decimal amount string.
    #[error("malformed amount: {0}")]
    Amount(String),
}

impl Error {
    /// Whether the caller may retry the same claim later.
    ///
    /// Transient conditions (service down, transaction still propagating
    /// or unconfirmed) resolve on their own; everything else is a
    /// permanent rejection of this specific input.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ServiceUnavailable(_) | Self::NotFound(_) | Self::NotConfirmed(_)
        )
    }
}
