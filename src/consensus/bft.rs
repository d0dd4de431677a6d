//! Round-based BFT block production
//!
//! A round moves through propose -> vote -> commit. The round state is a
//! single slot: proposing again discards whatever was open, and a commit
//! attempt of any outcome closes the round and hands the proposer role to the
//! next validator.

use crate::core::{Block, ConsensusMethod, Ledger};
use crate::error::{BlockchainError, Result};
use crate::utils::current_timestamp;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Largest serialized block a validator will approve
pub const MAX_BLOCK_SIZE: usize = 1024 * 1024;
/// Allowed distance between a block timestamp and the validator's clock
pub const MAX_TIMESTAMP_DRIFT_SECS: f64 = 300.0;

/// Approvals needed to commit: strictly more than two thirds of `validator_count`
pub fn quorum_threshold(validator_count: usize) -> usize {
    (2 * validator_count) / 3 + 1
}

#[derive(Debug, Clone, PartialEq)]
pub struct Vote {
    pub validator: String,
    pub approve: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Proposal {
    pub block: Block,
    pub proposer: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum RoundState {
    #[default]
    Idle,
    Proposed {
        block: Block,
        proposer: String,
    },
    Voted {
        block: Block,
        proposer: String,
        votes: Vec<Vote>,
    },
}

impl RoundState {
    pub fn is_idle(&self) -> bool {
        matches!(self, RoundState::Idle)
    }
}

/// Decides how a validator votes given the outcome of its own validation.
/// Lets callers script faulty or adversarial validators.
pub trait VoteDecider {
    fn decide(&mut self, validator: &str, verdict: &Result<()>) -> bool;
}

/// Votes exactly as validation says
#[derive(Debug, Clone, Copy, Default)]
pub struct HonestVoter;

impl VoteDecider for HonestVoter {
    fn decide(&mut self, _validator: &str, verdict: &Result<()>) -> bool {
        verdict.is_ok()
    }
}

/// Fixed yes/no per validator; unlisted validators vote honestly
#[derive(Debug, Clone, Default)]
pub struct ScriptedVoter {
    overrides: HashMap<String, bool>,
}

impl ScriptedVoter {
    pub fn new() -> ScriptedVoter {
        ScriptedVoter::default()
    }

    pub fn with_vote(mut self, validator: &str, approve: bool) -> ScriptedVoter {
        self.overrides.insert(validator.to_string(), approve);
        self
    }
}

impl VoteDecider for ScriptedVoter {
    fn decide(&mut self, validator: &str, verdict: &Result<()>) -> bool {
        match self.overrides.get(validator) {
            Some(approve) => *approve,
            None => verdict.is_ok(),
        }
    }
}

/// Honest validators that withhold approval with probability `fault_rate`,
/// drawn from a seeded generator so runs are reproducible
#[derive(Debug, Clone)]
pub struct FaultyVoter {
    fault_rate: f64,
    rng: StdRng,
}

impl FaultyVoter {
    pub fn new(fault_rate: f64, seed: u64) -> Result<FaultyVoter> {
        if !(0.0..=1.0).contains(&fault_rate) {
            return Err(BlockchainError::Config(format!(
                "fault rate must be within [0, 1], got {fault_rate}"
            )));
        }
        Ok(FaultyVoter {
            fault_rate,
            rng: StdRng::seed_from_u64(seed),
        })
    }
}

impl VoteDecider for FaultyVoter {
    fn decide(&mut self, validator: &str, verdict: &Result<()>) -> bool {
        let faulty = self.rng.gen::<f64>() < self.fault_rate;
        if faulty {
            debug!("Validator {validator} withholds its vote");
        }
        verdict.is_ok() && !faulty
    }
}

pub struct BftEngine {
    validators: Vec<String>,
    round_robin_index: usize,
    state: RoundState,
    decider: Box<dyn VoteDecider>,
}

impl fmt::Debug for BftEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BftEngine")
            .field("validators", &self.validators)
            .field("round_robin_index", &self.round_robin_index)
            .field("state", &self.state)
            .finish()
    }
}

impl BftEngine {
    pub fn new(validators: Vec<String>) -> Result<BftEngine> {
        Self::with_decider(validators, Box::new(HonestVoter))
    }

    pub fn with_decider(
        validators: Vec<String>,
        decider: Box<dyn VoteDecider>,
    ) -> Result<BftEngine> {
        if validators.is_empty() {
            return Err(BlockchainError::Config(
                "BFT needs at least one validator".to_string(),
            ));
        }
        let unique: HashSet<&String> = validators.iter().collect();
        if unique.len() != validators.len() {
            return Err(BlockchainError::Config(
                "BFT validator identifiers must be unique".to_string(),
            ));
        }

        Ok(BftEngine {
            validators,
            round_robin_index: 0,
            state: RoundState::Idle,
            decider,
        })
    }

    pub fn set_decider(&mut self, decider: Box<dyn VoteDecider>) {
        self.decider = decider;
    }

    pub fn get_validators(&self) -> &[String] {
        self.validators.as_slice()
    }

    pub fn get_round_robin_index(&self) -> usize {
        self.round_robin_index
    }

    pub fn get_round_state(&self) -> &RoundState {
        &self.state
    }

    pub fn threshold(&self) -> usize {
        quorum_threshold(self.validators.len())
    }

    /// Validator whose turn it is to propose
    pub fn current_proposer(&self) -> &str {
        self.validators[self.round_robin_index].as_str()
    }

    /// Drafts a block over the pending pool. Leaves the ledger untouched and
    /// replaces any round that is still open.
    pub fn propose(&mut self, ledger: &Ledger) -> Result<Proposal> {
        let proposer = self.current_proposer().to_string();
        let mut block = Block::new(
            ledger.len() as u64,
            ledger.pending().to_vec(),
            current_timestamp()?,
            ledger.last_hash().to_string(),
            ConsensusMethod::Bft,
        );
        block.seal()?;

        if !self.state.is_idle() {
            debug!("Discarding open round in favour of a new proposal from {proposer}");
        }
        info!(
            "Validator {proposer} proposed block {} with {} transactions",
            block.get_index(),
            block.get_transactions().len()
        );

        self.state = RoundState::Proposed {
            block: block.clone(),
            proposer: proposer.clone(),
        };
        Ok(Proposal { block, proposer })
    }

    /// Structural acceptance check each validator runs before voting.
    /// The error names the first failing check.
    pub fn validate(&self, ledger: &Ledger, block: &Block, proposer: &str) -> Result<()> {
        let expected_index = ledger.len() as u64;
        if block.get_index() != expected_index {
            return Err(BlockchainError::InvalidBlock(format!(
                "invalid block index: expected {expected_index}, got {}",
                block.get_index()
            )));
        }

        if block.get_previous_hash() != ledger.last_hash() {
            return Err(BlockchainError::InvalidBlock(
                "previous hash does not match the chain tail".to_string(),
            ));
        }

        let drift = (current_timestamp()? - block.get_timestamp()).abs();
        if drift > MAX_TIMESTAMP_DRIFT_SECS {
            return Err(BlockchainError::InvalidBlock(format!(
                "timestamp is {drift:.0}s away from local time"
            )));
        }

        let expected_proposer = self.current_proposer();
        if proposer != expected_proposer {
            return Err(BlockchainError::InvalidBlock(format!(
                "invalid proposer: expected {expected_proposer}, got {proposer}"
            )));
        }

        let size = block.serialized_size()?;
        if size > MAX_BLOCK_SIZE {
            return Err(BlockchainError::InvalidBlock(format!(
                "block size {size} exceeds limit of {MAX_BLOCK_SIZE} bytes"
            )));
        }

        let mut seen = HashSet::new();
        for tx in block.get_transactions().iter().filter(|tx| !tx.is_reward()) {
            if !seen.insert(tx.canonical_hash()?) {
                return Err(BlockchainError::InvalidBlock(
                    "duplicate transaction in block".to_string(),
                ));
            }
        }

        if !block.has_valid_hash()? {
            return Err(BlockchainError::InvalidBlock(
                "block hash does not match its contents".to_string(),
            ));
        }

        Ok(())
    }

    /// Every validator validates the open proposal and records yes/no
    pub fn vote(&mut self, ledger: &Ledger) -> Result<Vec<Vote>> {
        let (block, proposer) = match std::mem::take(&mut self.state) {
            RoundState::Proposed { block, proposer }
            | RoundState::Voted {
                block, proposer, ..
            } => (block, proposer),
            RoundState::Idle => {
                return Err(BlockchainError::Protocol(
                    "no active proposal to vote on".to_string(),
                ));
            }
        };

        let mut votes = Vec::with_capacity(self.validators.len());
        for validator in &self.validators {
            let verdict = self.validate(ledger, &block, &proposer);
            if let Err(e) = &verdict {
                debug!("Validator {validator} found proposal invalid: {e}");
            }
            let approve = self.decider.decide(validator, &verdict);
            votes.push(Vote {
                validator: validator.clone(),
                approve,
            });
        }

        let approvals = votes.iter().filter(|v| v.approve).count();
        info!(
            "Votes on block {} from {proposer}: {approvals}/{} approve",
            block.get_index(),
            votes.len()
        );

        self.state = RoundState::Voted {
            block,
            proposer,
            votes: votes.clone(),
        };
        Ok(votes)
    }

    /// Tallies votes and appends the block on quorum. Any attempt closes the
    /// round and advances the proposer; calling without votes changes nothing.
    pub fn commit(&mut self, ledger: &mut Ledger) -> Result<Block> {
        let (block, proposer, votes) = match std::mem::take(&mut self.state) {
            RoundState::Voted {
                block,
                proposer,
                votes,
            } => (block, proposer, votes),
            other => {
                self.state = other;
                return Err(BlockchainError::Protocol(
                    "missing proposal or votes".to_string(),
                ));
            }
        };

        let outcome = self.finalize(ledger, block, &proposer, &votes);
        self.advance_round();
        outcome
    }

    fn finalize(
        &self,
        ledger: &mut Ledger,
        mut block: Block,
        proposer: &str,
        votes: &[Vote],
    ) -> Result<Block> {
        let approvers: Vec<String> = votes
            .iter()
            .filter(|v| v.approve)
            .map(|v| v.validator.clone())
            .collect();
        let threshold = self.threshold();

        if approvers.len() < threshold {
            warn!(
                "Block {} from {proposer} failed consensus: {} of {threshold} approvals",
                block.get_index(),
                approvers.len()
            );
            return Err(BlockchainError::ConsensusFailure {
                proposer: proposer.to_string(),
                approvals: approvers.len(),
                threshold,
            });
        }

        block.set_signatures(approvers);
        block.seal()?;
        ledger.add_block(block.clone())?;
        ledger.clear_pending();

        info!(
            "Block {} committed by proposer {proposer}",
            block.get_index()
        );
        Ok(block)
    }

    fn advance_round(&mut self) {
        self.round_robin_index = (self.round_robin_index + 1) % self.validators.len();
    }

    /// Propose, vote and commit in one call
    pub fn run_round(&mut self, ledger: &mut Ledger) -> Result<Block> {
        self.propose(ledger)?;
        self.vote(ledger)?;
        self.commit(ledger)
    }
}
