//! Core ledger functionality
//!
//! Transactions, blocks, the in-memory ledger and the proof-of-work miner.

pub mod block;
pub mod ledger;
pub mod proof_of_work;
pub mod transaction;

pub use block::{Block, ConsensusMethod, GENESIS_PREVIOUS_HASH};
pub use ledger::Ledger;
pub use proof_of_work::{ProofOfWork, DEFAULT_DIFFICULTY, DEFAULT_MINING_REWARD};
pub use transaction::{Transaction, TransactionSigner, TxSignature, NETWORK_SENDER};
