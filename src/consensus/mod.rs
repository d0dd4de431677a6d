//! Consensus engines
//!
//! Three interchangeable ways to extend the ledger: proof-of-work lives in
//! `core`, BFT rounds and proof-of-stake live here together with the stake
//! ledger. Exactly one engine is active at a time, chosen by [`ConsensusMode`].

pub mod bft;
pub mod pos;
pub mod stake;

pub use bft::{
    quorum_threshold, BftEngine, FaultyVoter, HonestVoter, Proposal, RoundState, ScriptedVoter,
    Vote, VoteDecider, MAX_BLOCK_SIZE, MAX_TIMESTAMP_DRIFT_SECS,
};
pub use pos::{ProofOfStake, MAX_STAKING_REWARD};
pub use stake::{StakeManager, DEFAULT_SLASH_PERCENTAGE, MIN_STAKE};

use crate::error::BlockchainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Runtime switch selecting the engine allowed to produce blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsensusMode {
    #[default]
    Pow,
    Bft,
    Pos,
}

impl FromStr for ConsensusMode {
    type Err = BlockchainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pow" => Ok(ConsensusMode::Pow),
            "bft" => Ok(ConsensusMode::Bft),
            "pos" => Ok(ConsensusMode::Pos),
            _ => Err(BlockchainError::Config(format!(
                "Invalid consensus mode: {s}. Valid options: pow, bft, pos"
            ))),
        }
    }
}

impl fmt::Display for ConsensusMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsensusMode::Pow => write!(f, "pow"),
            ConsensusMode::Bft => write!(f, "bft"),
            ConsensusMode::Pos => write!(f, "pos"),
        }
    }
}
