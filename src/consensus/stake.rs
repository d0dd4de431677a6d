//! Stake ledger backing proof-of-stake
//!
//! Validators lock stake here; selection is a stake-weighted draw over the
//! eligible set. Any entry that falls below [`MIN_STAKE`] is removed outright.

use crate::error::{BlockchainError, Result};
use crate::utils::sha256_digest;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

/// Minimum stake for a validator to be eligible
pub const MIN_STAKE: f64 = 10.0;
/// Fraction of stake removed by a slash when no percentage is given
pub const DEFAULT_SLASH_PERCENTAGE: f64 = 0.1;

#[derive(Debug, Clone, Default)]
pub struct StakeManager {
    stakes: BTreeMap<String, f64>,
    stake_timestamps: BTreeMap<String, f64>,
}

impl StakeManager {
    pub fn new() -> StakeManager {
        StakeManager::default()
    }

    pub fn add_stake(&mut self, validator: &str, amount: f64, timestamp: f64) -> Result<()> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(BlockchainError::InvalidStake(format!(
                "stake amount must be positive, got {amount}"
            )));
        }

        let updated = self.get_stake(validator) + amount;
        let total = self.total_stake() + amount;
        if !updated.is_finite() || !total.is_finite() {
            return Err(BlockchainError::InvalidStake(format!(
                "staking {amount} for {validator} overflows the stake ledger"
            )));
        }

        self.stakes.insert(validator.to_string(), updated);
        self.stake_timestamps.insert(validator.to_string(), timestamp);

        info!(
            "Validator {validator} staked {amount}; total stake {}",
            self.get_stake(validator)
        );
        Ok(())
    }

    pub fn remove_stake(&mut self, validator: &str, amount: f64) -> Result<()> {
        let current = self.stakes.get(validator).copied().ok_or_else(|| {
            BlockchainError::InvalidStake(format!("{validator} has no stake to withdraw"))
        })?;

        if !amount.is_finite() || amount <= 0.0 {
            return Err(BlockchainError::InvalidStake(format!(
                "withdrawal amount must be positive, got {amount}"
            )));
        }
        if amount > current {
            return Err(BlockchainError::InvalidStake(format!(
                "cannot withdraw {amount} from {validator}, only {current} staked"
            )));
        }

        self.stakes.insert(validator.to_string(), current - amount);
        self.drop_if_below_minimum(validator);
        Ok(())
    }

    /// Stake-weighted draw over eligible validators.
    /// The same seed over the same stake snapshot always picks the same validator.
    pub fn select_validator(&self, seed: Option<&[u8]>) -> Option<(String, f64)> {
        let eligible: Vec<(&String, f64)> = self
            .stakes
            .iter()
            .filter(|(_, stake)| **stake >= MIN_STAKE)
            .map(|(validator, stake)| (validator, *stake))
            .collect();
        if eligible.is_empty() {
            return None;
        }

        let total: f64 = eligible.iter().map(|(_, stake)| stake).sum();
        if !total.is_finite() || total <= 0.0 {
            warn!("Eligible stake total {total} cannot be sampled");
            return None;
        }
        let point = match seed {
            Some(seed) => Self::seeded_rng(seed).gen_range(0.0..total),
            None => rand::thread_rng().gen_range(0.0..total),
        };

        let mut cumulative = 0.0;
        for (validator, stake) in &eligible {
            cumulative += stake;
            if cumulative >= point {
                return Some(((*validator).clone(), *stake));
            }
        }

        // Only reachable through float rounding; the point lies in the last bucket
        eligible
            .last()
            .map(|(validator, stake)| ((*validator).clone(), *stake))
    }

    fn seeded_rng(seed: &[u8]) -> StdRng {
        let mut key = [0u8; 32];
        key.copy_from_slice(&sha256_digest(seed));
        StdRng::from_seed(key)
    }

    /// Burns `percentage` of the validator's stake and returns the amount burned
    pub fn slash_stake(&mut self, validator: &str, percentage: f64) -> Result<f64> {
        let current = self.stakes.get(validator).copied().ok_or_else(|| {
            BlockchainError::InvalidStake(format!("{validator} has no stake to slash"))
        })?;

        if !(percentage > 0.0 && percentage <= 1.0) {
            return Err(BlockchainError::InvalidStake(format!(
                "slash percentage must be in (0, 1], got {percentage}"
            )));
        }

        let slashed = current * percentage;
        let remaining = current - slashed;
        self.stakes.insert(validator.to_string(), remaining);
        warn!("Slashed {slashed:.2} from {validator}. New stake: {remaining:.2}");

        self.drop_if_below_minimum(validator);
        Ok(slashed)
    }

    fn drop_if_below_minimum(&mut self, validator: &str) {
        if self.get_stake(validator) < MIN_STAKE {
            info!("Validator {validator} fell below minimum stake; removing");
            self.stakes.remove(validator);
            self.stake_timestamps.remove(validator);
        }
    }

    pub fn get_stake(&self, validator: &str) -> f64 {
        self.stakes.get(validator).copied().unwrap_or(0.0)
    }

    pub fn get_all_stakes(&self) -> BTreeMap<String, f64> {
        self.stakes.clone()
    }

    pub fn get_validators(&self) -> Vec<String> {
        self.stakes
            .iter()
            .filter(|(_, stake)| **stake >= MIN_STAKE)
            .map(|(validator, _)| validator.clone())
            .collect()
    }

    pub fn is_validator(&self, address: &str) -> bool {
        self.stakes
            .get(address)
            .is_some_and(|stake| *stake >= MIN_STAKE)
    }

    pub fn total_stake(&self) -> f64 {
        self.stakes.values().sum()
    }

    /// When the validator's stake last changed through `add_stake`
    pub fn stake_timestamp(&self, validator: &str) -> Option<f64> {
        self.stake_timestamps.get(validator).copied()
    }
}
