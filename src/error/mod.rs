//! Error handling for the ledger and its consensus engines
//!
//! Every failure in this crate is recoverable. Engines report problems through
//! these variants and the caller decides how to surface them.

use std::fmt;

/// Result type alias for ledger and consensus operations
pub type Result<T> = std::result::Result<T, BlockchainError>;

/// Error types for ledger and consensus operations
#[derive(Debug, Clone, PartialEq)]
pub enum BlockchainError {
    /// Block failed a structural or consensus validation check
    InvalidBlock(String),
    /// Transaction refused before it reached the pending pool
    InvalidTransaction(String),
    /// Ledger refused the block (stale tail or hash mismatch); retry against the new tail
    Rejected(String),
    /// BFT step invoked without the state it needs
    Protocol(String),
    /// Not enough approvals to commit a BFT block
    ConsensusFailure {
        proposer: String,
        approvals: usize,
        threshold: usize,
    },
    /// Explicitly supplied validator does not hold enough stake
    IneligibleValidator(String),
    /// Stake-weighted selection found nobody at or above the minimum stake
    NoEligibleValidator,
    /// Stake amount or percentage rejected before touching state
    InvalidStake(String),
    /// Entry point belongs to an engine that is not the active one
    WrongMode { expected: String, active: String },
    /// Nonce search aborted
    Mining(String),
    /// Cryptographic operation errors
    Crypto(String),
    /// Serialization/deserialization errors
    Serialization(String),
    /// Configuration errors
    Config(String),
    /// File I/O errors
    Io(String),
}

impl BlockchainError {
    /// Structural rejections can be fixed by rebuilding the block on the current tail.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BlockchainError::Rejected(_))
    }
}

impl fmt::Display for BlockchainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockchainError::InvalidBlock(msg) => write!(f, "Invalid block: {msg}"),
            BlockchainError::InvalidTransaction(msg) => write!(f, "Invalid transaction: {msg}"),
            BlockchainError::Rejected(msg) => write!(f, "Block rejected by ledger: {msg}"),
            BlockchainError::Protocol(msg) => write!(f, "Protocol error: {msg}"),
            BlockchainError::ConsensusFailure {
                proposer,
                approvals,
                threshold,
            } => write!(
                f,
                "Consensus not reached for block proposed by {proposer}: {approvals} approvals, {threshold} required"
            ),
            BlockchainError::IneligibleValidator(addr) => {
                write!(f, "Address {addr} is not an eligible validator")
            }
            BlockchainError::NoEligibleValidator => {
                write!(f, "No validator holds the minimum stake")
            }
            BlockchainError::InvalidStake(msg) => write!(f, "Invalid stake operation: {msg}"),
            BlockchainError::WrongMode { expected, active } => write!(
                f,
                "Operation requires {expected} mode but consensus mode is {active}"
            ),
            BlockchainError::Mining(msg) => write!(f, "Mining error: {msg}"),
            BlockchainError::Crypto(msg) => write!(f, "Cryptographic error: {msg}"),
            BlockchainError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            BlockchainError::Config(msg) => write!(f, "Configuration error: {msg}"),
            BlockchainError::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for BlockchainError {}

impl From<std::io::Error> for BlockchainError {
    fn from(err: std::io::Error) -> Self {
        BlockchainError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for BlockchainError {
    fn from(err: serde_json::Error) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for BlockchainError {
    fn from(err: toml::de::Error) -> Self {
        BlockchainError::Config(err.to_string())
    }
}
