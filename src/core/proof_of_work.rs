use crate::core::{Block, ConsensusMethod, Ledger, Transaction};
use crate::error::{BlockchainError, Result};
use crate::utils::current_timestamp;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};

/// Leading hex zeros a PoW block hash must carry
pub const DEFAULT_DIFFICULTY: usize = 4;
/// Amount minted to the miner with every block
pub const DEFAULT_MINING_REWARD: f64 = 1.0;

// How often the search loop polls the cancel flag
const CANCEL_CHECK_INTERVAL: u64 = 1024;

#[derive(Debug, Clone)]
pub struct ProofOfWork {
    difficulty: usize,
    reward: f64,
}

impl Default for ProofOfWork {
    fn default() -> Self {
        Self::new(DEFAULT_DIFFICULTY, DEFAULT_MINING_REWARD)
    }
}

impl ProofOfWork {
    pub fn new(difficulty: usize, reward: f64) -> ProofOfWork {
        ProofOfWork { difficulty, reward }
    }

    pub fn get_difficulty(&self) -> usize {
        self.difficulty
    }

    pub fn get_reward(&self) -> f64 {
        self.reward
    }

    fn target_prefix(&self) -> String {
        "0".repeat(self.difficulty)
    }

    /// True when the stored hash is genuine and carries the difficulty prefix
    pub fn validate(&self, block: &Block) -> bool {
        match block.has_valid_hash() {
            Ok(true) => block
                .get_hash()
                .is_some_and(|hash| hash.starts_with(&self.target_prefix())),
            _ => false,
        }
    }

    /// Mines a block over the pending pool and appends it to the ledger.
    /// Runs until a hash is found.
    pub fn mine(&self, ledger: &mut Ledger, miner_address: &str) -> Result<Block> {
        self.mine_with_cancel(ledger, miner_address, &AtomicBool::new(false))
    }

    /// Same as `mine`, but gives up as soon as `cancel` is raised
    pub fn mine_with_cancel(
        &self,
        ledger: &mut Ledger,
        miner_address: &str,
        cancel: &AtomicBool,
    ) -> Result<Block> {
        let mut transactions = ledger.pending().to_vec();
        transactions.push(Transaction::new_reward(miner_address, self.reward));

        let mut block = Block::new(
            ledger.len() as u64,
            transactions,
            current_timestamp()?,
            ledger.last_hash().to_string(),
            ConsensusMethod::Pow,
        );

        info!(
            "Mining block {} with {} transactions (difficulty: {})",
            block.get_index(),
            block.get_transactions().len(),
            self.difficulty
        );
        let (nonce, hash) = self.run(&mut block, cancel)?;
        debug!("Found nonce {nonce} for block {}", block.get_index());

        // Pool stays intact on rejection so the caller can retry on the new tail
        if let Err(e) = ledger.add_block(block.clone()) {
            warn!("Mined block {hash} was not accepted: {e}");
            return Err(e);
        }
        ledger.clear_pending();

        info!("Successfully mined block: {hash} (nonce: {nonce})");
        Ok(block)
    }

    fn run(&self, block: &mut Block, cancel: &AtomicBool) -> Result<(u64, String)> {
        let prefix = self.target_prefix();
        let mut nonce: u64 = 0;
        loop {
            if nonce % CANCEL_CHECK_INTERVAL == 0 && cancel.load(Ordering::Relaxed) {
                return Err(BlockchainError::Mining(format!(
                    "nonce search cancelled after {nonce} attempts"
                )));
            }

            block.set_nonce(nonce);
            let hash = block.compute_hash()?;
            if hash.starts_with(&prefix) {
                block.set_hash(hash.clone());
                return Ok((nonce, hash));
            }

            nonce = nonce.checked_add(1).ok_or_else(|| {
                BlockchainError::Mining("nonce space exhausted".to_string())
            })?;
        }
    }
}
