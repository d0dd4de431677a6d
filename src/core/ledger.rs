// The in-memory chain and its pending-transaction pool.
// add_block is the only way blocks get onto the chain; every engine goes through it.

use crate::core::{Block, Transaction};
use crate::error::{BlockchainError, Result};
use log::{debug, info, warn};
use serde_json::json;

#[derive(Debug, Clone)]
pub struct Ledger {
    chain: Vec<Block>,             // never empty, starts at genesis
    pending: Vec<Transaction>,     // insertion-ordered pool awaiting inclusion
}

impl Ledger {
    pub fn new() -> Result<Ledger> {
        let genesis = Block::generate_genesis_block()?;
        info!(
            "Created ledger with genesis block {}",
            genesis.get_hash().unwrap_or_default()
        );
        Ok(Ledger {
            chain: vec![genesis],
            pending: Vec::new(),
        })
    }

    pub fn last_block(&self) -> &Block {
        // chain always holds the genesis block
        &self.chain[self.chain.len() - 1]
    }

    /// Hash of the chain tail; blocks built on this ledger link to it
    pub fn last_hash(&self) -> &str {
        self.last_block().get_hash().unwrap_or_default()
    }

    /// Number of blocks, which is also the index the next block must carry
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn blocks(&self) -> &[Block] {
        self.chain.as_slice()
    }

    pub fn get_block(&self, index: u64) -> Option<&Block> {
        self.chain.get(usize::try_from(index).ok()?)
    }

    pub fn pending(&self) -> &[Transaction] {
        self.pending.as_slice()
    }

    /// Queues a transaction. Non-finite amounts are refused; everything else
    /// is left to the engines.
    pub fn append_transaction(&mut self, transaction: Transaction) -> Result<()> {
        if !transaction.get_amount().is_finite() {
            return Err(BlockchainError::InvalidTransaction(format!(
                "amount must be finite, got {}",
                transaction.get_amount()
            )));
        }
        debug!(
            "Queued transaction {} -> {} ({})",
            transaction.get_sender(),
            transaction.get_recipient(),
            transaction.get_amount()
        );
        self.pending.push(transaction);
        Ok(())
    }

    pub fn add_block(&mut self, block: Block) -> Result<()> {
        let tail_hash = self.last_hash();
        if block.get_previous_hash() != tail_hash {
            warn!(
                "Rejecting block {}: previous hash {} does not match tail {}",
                block.get_index(),
                block.get_previous_hash(),
                tail_hash
            );
            return Err(BlockchainError::Rejected(format!(
                "previous hash {} does not match chain tail {}",
                block.get_previous_hash(),
                tail_hash
            )));
        }

        if !self.is_valid_block(&block)? {
            warn!("Rejecting block {}: hash mismatch", block.get_index());
            return Err(BlockchainError::Rejected(
                "block hash does not match its contents".to_string(),
            ));
        }

        info!(
            "Appended {} block {} ({} transactions): {}",
            block.get_consensus_method(),
            block.get_index(),
            block.get_transactions().len(),
            block.get_hash().unwrap_or_default()
        );
        self.chain.push(block);
        Ok(())
    }

    /// Recomputes the block hash and compares it with the stored one
    pub fn is_valid_block(&self, block: &Block) -> Result<bool> {
        block.has_valid_hash()
    }

    /// Full audit: every non-genesis block links to its predecessor and hashes correctly
    pub fn is_valid_chain(&self) -> bool {
        for pair in self.chain.windows(2) {
            let (previous, current) = (&pair[0], &pair[1]);

            if previous.get_hash() != Some(current.get_previous_hash()) {
                return false;
            }

            match current.has_valid_hash() {
                Ok(true) => {}
                Ok(false) => return false,
                Err(e) => {
                    log::error!("Failed to hash block {}: {e}", current.get_index());
                    return false;
                }
            }
        }
        true
    }

    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }

    /// Chain export: `{chain, length}`
    pub fn to_json(&self) -> Result<serde_json::Value> {
        let chain = self
            .chain
            .iter()
            .map(Block::to_json)
            .collect::<Result<Vec<_>>>()?;
        Ok(json!({
            "chain": chain,
            "length": self.chain.len(),
        }))
    }

    #[cfg(test)]
    pub(crate) fn blocks_mut(&mut self) -> &mut Vec<Block> {
        &mut self.chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ConsensusMethod;
    use crate::utils::current_timestamp;

    fn next_block(ledger: &Ledger, transactions: Vec<Transaction>) -> Block {
        let mut block = Block::new(
            ledger.len() as u64,
            transactions,
            current_timestamp().unwrap(),
            ledger.last_hash().to_string(),
            ConsensusMethod::Pos,
        );
        block.seal().unwrap();
        block
    }

    #[test]
    fn test_new_ledger_holds_only_genesis() {
        let ledger = Ledger::new().unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.last_block().get_index(), 0);
        assert!(ledger.pending().is_empty());
        assert!(ledger.is_valid_chain());
    }

    #[test]
    fn test_append_transaction_preserves_order() {
        let mut ledger = Ledger::new().unwrap();
        ledger.append_transaction(Transaction::new("a", "b", 1.0)).unwrap();
        ledger.append_transaction(Transaction::new("c", "d", 2.0)).unwrap();
        assert_eq!(ledger.pending().len(), 2);
        assert_eq!(ledger.pending()[0].get_sender(), "a");
        assert_eq!(ledger.pending()[1].get_sender(), "c");

        ledger.clear_pending();
        assert!(ledger.pending().is_empty());
    }

    #[test]
    fn test_add_block_links_to_tail() {
        let mut ledger = Ledger::new().unwrap();
        let block = next_block(&ledger, vec![Transaction::new("a", "b", 1.0)]);
        let hash = block.get_hash().unwrap().to_string();

        ledger.add_block(block).unwrap();
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.last_hash(), hash);
        assert!(ledger.is_valid_chain());
    }

    #[test]
    fn test_add_block_rejects_stale_previous_hash() {
        let mut ledger = Ledger::new().unwrap();
        let stale = next_block(&ledger, vec![]);
        let winner = next_block(&ledger, vec![Transaction::new("a", "b", 1.0)]);
        ledger.add_block(winner).unwrap();

        let err = ledger.add_block(stale).unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_add_block_rejects_hash_mismatch() {
        let mut ledger = Ledger::new().unwrap();
        let mut block = next_block(&ledger, vec![]);
        block.set_hash("f".repeat(64));
        assert!(matches!(
            ledger.add_block(block),
            Err(BlockchainError::Rejected(_))
        ));

        let unsealed = Block::new(
            1,
            vec![],
            0.0,
            ledger.last_hash().to_string(),
            ConsensusMethod::Pow,
        );
        assert!(ledger.add_block(unsealed).is_err());
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_tampered_transaction_invalidates_chain() {
        let mut ledger = Ledger::new().unwrap();
        let block = next_block(&ledger, vec![Transaction::new("a", "b", 1.0)]);
        ledger.add_block(block).unwrap();
        let block = next_block(&ledger, vec![Transaction::new("c", "d", 2.0)]);
        ledger.add_block(block).unwrap();
        assert!(ledger.is_valid_chain());

        ledger.blocks_mut()[1].transactions_mut()[0].set_amount(1000.0);
        assert!(!ledger.is_valid_chain());

        // Re-sealing the tampered block still breaks the link from its successor
        ledger.blocks_mut()[1].seal().unwrap();
        assert!(!ledger.is_valid_chain());
    }

    #[test]
    fn test_non_finite_amount_is_not_queued() {
        let mut ledger = Ledger::new().unwrap();
        for amount in [f64::NAN, f64::INFINITY] {
            let err = ledger
                .append_transaction(Transaction::new("alice", "bob", amount))
                .unwrap_err();
            assert!(matches!(err, BlockchainError::InvalidTransaction(_)));
        }
        assert!(ledger.pending().is_empty());
    }

    #[test]
    fn test_non_finite_tamper_invalidates_chain() {
        let mut ledger = Ledger::new().unwrap();
        let block = next_block(&ledger, vec![Transaction::new("a", "b", 1.0)]);
        ledger.add_block(block).unwrap();

        ledger.blocks_mut()[1].transactions_mut()[0].set_amount(f64::INFINITY);
        assert!(!ledger.is_valid_chain());
        ledger.blocks_mut()[1].transactions_mut()[0].set_amount(f64::NAN);
        assert!(!ledger.is_valid_chain());
        assert!(ledger.blocks_mut()[1].seal().is_err());
    }

    #[test]
    fn test_chain_export() {
        let mut ledger = Ledger::new().unwrap();
        let block = next_block(&ledger, vec![]);
        ledger.add_block(block).unwrap();

        let export = ledger.to_json().unwrap();
        assert_eq!(export["length"], 2);
        assert_eq!(export["chain"][0]["previous_hash"], "0");
        assert_eq!(export["chain"][1]["index"], 1);
        assert!(ledger.get_block(1).is_some());
        assert!(ledger.get_block(2).is_none());
    }
}
