use crate::consensus::ConsensusMode;
use crate::core::{DEFAULT_DIFFICULTY, DEFAULT_MINING_REWARD};
use crate::error::{BlockchainError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;

const CONSENSUS_MODE_KEY: &str = "CONSENSUS_MODE";
const POW_DIFFICULTY_KEY: &str = "POW_DIFFICULTY";
const MINING_ADDRESS_KEY: &str = "MINING_ADDRESS";
const BFT_VALIDATORS_KEY: &str = "BFT_VALIDATORS";

static DEFAULT_MINING_ADDR: &str = "miner_node";
static DEFAULT_VALIDATORS: [&str; 3] = ["valA", "valB", "valC"];

// A SHA-256 hex digest has 64 characters
const MAX_DIFFICULTY: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub consensus_mode: ConsensusMode,
    pub pow_difficulty: usize,
    pub mining_reward: f64,
    pub mining_address: String,
    pub bft_validators: Vec<String>,
    /// Stakes registered with the PoS engine at startup
    pub initial_stakes: BTreeMap<String, f64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            consensus_mode: ConsensusMode::default(),
            pow_difficulty: DEFAULT_DIFFICULTY,
            mining_reward: DEFAULT_MINING_REWARD,
            mining_address: String::from(DEFAULT_MINING_ADDR),
            bft_validators: DEFAULT_VALIDATORS.iter().map(|v| v.to_string()).collect(),
            initial_stakes: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Defaults overridden by process environment variables
    pub fn from_env() -> Result<Config> {
        let mut config = Config::default();
        config.apply_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    /// TOML file, then environment overrides on top
    pub fn load(path: &Path) -> Result<Config> {
        let contents = fs::read_to_string(path)?;
        let mut config = Config::from_toml_str(&contents)?;
        config.apply_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Config> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(mode) = lookup(CONSENSUS_MODE_KEY) {
            self.consensus_mode = mode.parse()?;
        }
        if let Some(difficulty) = lookup(POW_DIFFICULTY_KEY) {
            self.pow_difficulty = difficulty.trim().parse().map_err(|e| {
                BlockchainError::Config(format!("Invalid {POW_DIFFICULTY_KEY} '{difficulty}': {e}"))
            })?;
        }
        if let Some(addr) = lookup(MINING_ADDRESS_KEY) {
            self.mining_address = addr;
        }
        if let Some(validators) = lookup(BFT_VALIDATORS_KEY) {
            self.bft_validators = validators
                .split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
                .collect();
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if self.pow_difficulty > MAX_DIFFICULTY {
            return Err(BlockchainError::Config(format!(
                "PoW difficulty {} exceeds the {MAX_DIFFICULTY} hex digits of a hash",
                self.pow_difficulty
            )));
        }
        if !self.mining_reward.is_finite() || self.mining_reward < 0.0 {
            return Err(BlockchainError::Config(format!(
                "Mining reward must be a non-negative number, got {}",
                self.mining_reward
            )));
        }
        if self.bft_validators.is_empty() {
            return Err(BlockchainError::Config(
                "At least one BFT validator is required".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.consensus_mode, ConsensusMode::Pow);
        assert_eq!(config.pow_difficulty, DEFAULT_DIFFICULTY);
        assert_eq!(config.bft_validators, vec!["valA", "valB", "valC"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(lookup_from(&[
                ("CONSENSUS_MODE", "bft"),
                ("POW_DIFFICULTY", "2"),
                ("BFT_VALIDATORS", "n1, n2,,n3,n4"),
                ("MINING_ADDRESS", "me"),
            ]))
            .unwrap();
        assert_eq!(config.consensus_mode, ConsensusMode::Bft);
        assert_eq!(config.pow_difficulty, 2);
        assert_eq!(config.bft_validators, vec!["n1", "n2", "n3", "n4"]);
        assert_eq!(config.mining_address, "me");
    }

    #[test]
    fn test_bad_overrides_are_rejected() {
        let mut config = Config::default();
        assert!(config
            .apply_overrides(lookup_from(&[("CONSENSUS_MODE", "raft")]))
            .is_err());
        assert!(config
            .apply_overrides(lookup_from(&[("POW_DIFFICULTY", "many")]))
            .is_err());

        let mut config = Config::default();
        assert!(config
            .apply_overrides(lookup_from(&[("BFT_VALIDATORS", " , ")]))
            .is_err());
    }

    #[test]
    fn test_toml_with_partial_fields() {
        let config = Config::from_toml_str(
            r#"
            consensus_mode = "pos"
            pow_difficulty = 3

            [initial_stakes]
            alice = 50.0
            bob = 25.5
            "#,
        )
        .unwrap();
        assert_eq!(config.consensus_mode, ConsensusMode::Pos);
        assert_eq!(config.pow_difficulty, 3);
        assert_eq!(config.mining_address, DEFAULT_MINING_ADDR);
        assert_eq!(config.initial_stakes.get("bob"), Some(&25.5));
    }

    #[test]
    fn test_toml_rejects_invalid_values() {
        assert!(Config::from_toml_str("pow_difficulty = 65").is_err());
        assert!(Config::from_toml_str("consensus_mode = \"raft\"").is_err());
        assert!(Config::from_toml_str("bft_validators = []").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "mining_reward = 2.5").unwrap();
        writeln!(file, "[initial_stakes]").unwrap();
        writeln!(file, "alice = 40.0").unwrap();
        file.flush().unwrap();

        // Neither field has an environment override, so the file values survive
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.mining_reward, 2.5);
        assert_eq!(config.initial_stakes.get("alice"), Some(&40.0));

        assert!(Config::load(Path::new("/nonexistent/triad.toml")).is_err());
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "mining_reward = -1.0").unwrap();
        file.flush().unwrap();
        assert!(matches!(
            Config::load(file.path()),
            Err(BlockchainError::Config(_))
        ));
    }
}
