use crate::core::Transaction;
use crate::error::Result;
use crate::utils::{current_timestamp, sha256_hex, to_canonical_json};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Previous-hash marker carried by the genesis block
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// Which engine produced a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsensusMethod {
    Genesis,
    Pow,
    Bft,
    Pos,
}

impl fmt::Display for ConsensusMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsensusMethod::Genesis => write!(f, "genesis"),
            ConsensusMethod::Pow => write!(f, "pow"),
            ConsensusMethod::Bft => write!(f, "bft"),
            ConsensusMethod::Pos => write!(f, "pos"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    index: u64,
    transactions: Vec<Transaction>,
    timestamp: f64,
    previous_hash: String,
    nonce: u64,
    signatures: Vec<String>,
    consensus_method: ConsensusMethod,
    hash: Option<String>,
}

// Everything except `hash`; the hash is derived from this view
#[derive(Serialize)]
struct HashInput<'a> {
    index: u64,
    transactions: &'a [Transaction],
    timestamp: f64,
    previous_hash: &'a str,
    nonce: u64,
    signatures: &'a [String],
    consensus_method: ConsensusMethod,
}

impl Block {
    /// Unsealed block: nonce 0, no signatures, no hash
    pub fn new(
        index: u64,
        transactions: Vec<Transaction>,
        timestamp: f64,
        previous_hash: String,
        consensus_method: ConsensusMethod,
    ) -> Block {
        Block {
            index,
            transactions,
            timestamp,
            previous_hash,
            nonce: 0,
            signatures: Vec::new(),
            consensus_method,
            hash: None,
        }
    }

    pub fn generate_genesis_block() -> Result<Block> {
        let mut block = Block::new(
            0,
            Vec::new(),
            current_timestamp()?,
            GENESIS_PREVIOUS_HASH.to_string(),
            ConsensusMethod::Genesis,
        );
        block.seal()?;
        Ok(block)
    }

    /// SHA-256 hex digest of the key-sorted JSON of every field but `hash`
    pub fn compute_hash(&self) -> Result<String> {
        let input = HashInput {
            index: self.index,
            transactions: &self.transactions,
            timestamp: self.timestamp,
            previous_hash: &self.previous_hash,
            nonce: self.nonce,
            signatures: &self.signatures,
            consensus_method: self.consensus_method,
        };
        let json = to_canonical_json(&input)?;
        Ok(sha256_hex(json.as_bytes()))
    }

    /// Stores the freshly computed hash and returns it
    pub fn seal(&mut self) -> Result<String> {
        let hash = self.compute_hash()?;
        self.hash = Some(hash.clone());
        Ok(hash)
    }

    /// True when a hash is stored and matches the current contents
    pub fn has_valid_hash(&self) -> Result<bool> {
        match self.hash.as_deref() {
            Some(stored) => Ok(self.compute_hash()? == stored),
            None => Ok(false),
        }
    }

    /// Length of the full JSON representation, hash included
    pub fn serialized_size(&self) -> Result<usize> {
        Ok(to_canonical_json(self)?.len())
    }

    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn get_index(&self) -> u64 {
        self.index
    }

    pub fn get_transactions(&self) -> &[Transaction] {
        self.transactions.as_slice()
    }

    pub fn get_timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn get_previous_hash(&self) -> &str {
        self.previous_hash.as_str()
    }

    pub fn get_nonce(&self) -> u64 {
        self.nonce
    }

    pub fn get_signatures(&self) -> &[String] {
        self.signatures.as_slice()
    }

    pub fn get_consensus_method(&self) -> ConsensusMethod {
        self.consensus_method
    }

    pub fn get_hash(&self) -> Option<&str> {
        self.hash.as_deref()
    }

    pub(crate) fn set_nonce(&mut self, nonce: u64) {
        self.nonce = nonce;
    }

    pub(crate) fn set_signatures(&mut self, signatures: Vec<String>) {
        self.signatures = signatures;
    }

    pub(crate) fn set_hash(&mut self, hash: String) {
        self.hash = Some(hash);
    }

    #[cfg(test)]
    pub(crate) fn transactions_mut(&mut self) -> &mut Vec<Transaction> {
        &mut self.transactions
    }

    #[cfg(test)]
    pub(crate) fn set_timestamp(&mut self, timestamp: f64) {
        self.timestamp = timestamp;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_block() -> Block {
        Block::new(
            1,
            vec![
                Transaction::new("alice", "bob", 5.0),
                Transaction::new_reward("miner", 1.0),
            ],
            1_700_000_000.5,
            "abc".to_string(),
            ConsensusMethod::Pow,
        )
    }

    #[test]
    fn test_genesis_block_shape() {
        let genesis = Block::generate_genesis_block().unwrap();
        assert_eq!(genesis.get_index(), 0);
        assert!(genesis.get_transactions().is_empty());
        assert_eq!(genesis.get_previous_hash(), GENESIS_PREVIOUS_HASH);
        assert_eq!(genesis.get_nonce(), 0);
        assert!(genesis.has_valid_hash().unwrap());
    }

    #[test]
    fn test_hash_is_deterministic_and_excludes_hash_field() {
        let mut block = sample_block();
        let first = block.compute_hash().unwrap();
        block.seal().unwrap();
        assert_eq!(block.compute_hash().unwrap(), first);
        assert_eq!(first.len(), 64);
    }

    #[test]
    fn test_every_field_feeds_the_hash() {
        let base = sample_block().compute_hash().unwrap();

        let mut block = sample_block();
        block.set_nonce(7);
        assert_ne!(block.compute_hash().unwrap(), base);

        let mut block = sample_block();
        block.set_signatures(vec!["valA".to_string()]);
        assert_ne!(block.compute_hash().unwrap(), base);

        let mut block = sample_block();
        block.transactions_mut()[0].set_amount(6.0);
        assert_ne!(block.compute_hash().unwrap(), base);

        let mut block = sample_block();
        block.consensus_method = ConsensusMethod::Bft;
        assert_ne!(block.compute_hash().unwrap(), base);
    }

    #[test]
    fn test_unsealed_block_has_no_valid_hash() {
        let block = sample_block();
        assert!(block.get_hash().is_none());
        assert!(!block.has_valid_hash().unwrap());
    }

    #[test]
    fn test_external_projection() {
        let mut block = sample_block();
        block.seal().unwrap();
        let value = block.to_json().unwrap();
        for key in [
            "index",
            "transactions",
            "timestamp",
            "previous_hash",
            "nonce",
            "signatures",
            "hash",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert_eq!(value["consensus_method"], "pow");
        assert_eq!(value["transactions"][1]["sender"], "NETWORK");
    }
}
