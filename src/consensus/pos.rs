use crate::consensus::stake::{StakeManager, DEFAULT_SLASH_PERCENTAGE};
use crate::core::{Block, ConsensusMethod, Ledger, Transaction};
use crate::error::{BlockchainError, Result};
use crate::utils::current_timestamp;
use log::{info, warn};

/// Reward ceiling for a forged block
pub const MAX_STAKING_REWARD: f64 = 1.0;
// reward = stake / STAKE_REWARD_DIVISOR, capped at MAX_STAKING_REWARD
const STAKE_REWARD_DIVISOR: f64 = 100.0;

/// Proof-of-stake block production over a stake ledger
#[derive(Debug, Clone, Default)]
pub struct ProofOfStake {
    stakes: StakeManager,
}

impl ProofOfStake {
    pub fn new(stakes: StakeManager) -> ProofOfStake {
        ProofOfStake { stakes }
    }

    pub fn stakes(&self) -> &StakeManager {
        &self.stakes
    }

    pub fn stakes_mut(&mut self) -> &mut StakeManager {
        &mut self.stakes
    }

    pub fn staking_reward(stake: f64) -> f64 {
        (stake / STAKE_REWARD_DIVISOR).min(MAX_STAKING_REWARD)
    }

    /// Forges the next block. Without an explicit validator, one is drawn by
    /// stake using the tail hash as seed, so the pick is fixed for a given chain.
    pub fn create_block(&self, ledger: &mut Ledger, validator: Option<&str>) -> Result<Block> {
        let (validator, stake) = match validator {
            Some(address) => {
                if !self.stakes.is_validator(address) {
                    return Err(BlockchainError::IneligibleValidator(address.to_string()));
                }
                (address.to_string(), self.stakes.get_stake(address))
            }
            None => {
                let seed = ledger.last_hash().as_bytes().to_vec();
                self.stakes
                    .select_validator(Some(seed.as_slice()))
                    .ok_or(BlockchainError::NoEligibleValidator)?
            }
        };

        let mut transactions = ledger.pending().to_vec();
        transactions.push(Transaction::new_reward(
            &validator,
            Self::staking_reward(stake),
        ));

        let mut block = Block::new(
            ledger.len() as u64,
            transactions,
            current_timestamp()?,
            ledger.last_hash().to_string(),
            ConsensusMethod::Pos,
        );
        block.seal()?;

        ledger.add_block(block.clone())?;
        ledger.clear_pending();

        info!(
            "Block {} created by validator {validator} (stake {stake})",
            block.get_index()
        );
        Ok(block)
    }

    /// Slashes the validator by the default percentage; returns the amount burned.
    /// There is no misbehaviour proof, the caller's word is taken as is.
    pub fn handle_malicious_attempt(&mut self, validator: &str) -> Result<f64> {
        warn!("Malicious behaviour reported for {validator}");
        self.stakes.slash_stake(validator, DEFAULT_SLASH_PERCENTAGE)
    }
}
