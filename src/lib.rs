//! # Triad Chain - one ledger, three ways to extend it
//!
//! An in-memory chain that can be extended by proof-of-work mining, by a
//! round-based BFT propose/vote/commit protocol, or by stake-weighted
//! proof-of-stake selection with slashing. One engine is active at a time.
//!
//! ## How the code is organized
//! - `core/`: transactions, blocks, the ledger and the proof-of-work miner
//! - `consensus/`: BFT rounds, the stake ledger and proof-of-stake
//! - `node/`: the session that owns the ledger, the engines and the mode switch
//! - `wallet/`: the ECDSA P-256 key used to sign submitted transactions
//! - `config/`: defaults, TOML file and environment overrides
//! - `utils/`: hashing, signing, time and canonical JSON
//! - `cli/`: command-line interface for running simulations
//!
//! ## Ground rules
//! - `Ledger::add_block` is the only way onto the chain; all engines use it
//! - a block hash is SHA-256 over the key-sorted JSON of every other field
//! - transaction signatures are checked on request, never during block validation

pub mod cli;
pub mod config;
pub mod consensus;
pub mod core;
pub mod error;
pub mod node;
pub mod utils;
pub mod wallet;

// Re-export commonly used types for convenience
pub use cli::{Command, Opt, StakeArg};
pub use config::Config;
pub use consensus::{
    quorum_threshold, BftEngine, ConsensusMode, FaultyVoter, HonestVoter, ProofOfStake, Proposal,
    RoundState, ScriptedVoter, StakeManager, Vote, VoteDecider, MIN_STAKE,
};
pub use crate::core::{
    Block, ConsensusMethod, Ledger, ProofOfWork, Transaction, TransactionSigner, TxSignature,
    NETWORK_SENDER,
};
pub use error::{BlockchainError, Result};
pub use node::Session;
pub use utils::{current_timestamp, sha256_digest, sha256_hex, to_canonical_json};
pub use wallet::Wallet;
