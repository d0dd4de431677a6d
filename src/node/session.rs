// One running node: the ledger, one instance of each engine, the signing wallet
// and the consensus mode. The caller drives everything through this type.

use crate::config::Config;
use crate::consensus::{BftEngine, ConsensusMode, ProofOfStake, Proposal, StakeManager, Vote};
use crate::core::{Block, Ledger, ProofOfWork, Transaction};
use crate::error::{BlockchainError, Result};
use crate::utils::current_timestamp;
use crate::wallet::Wallet;
use log::info;
use serde_json::json;

#[derive(Debug)]
pub struct Session {
    ledger: Ledger,
    pow: ProofOfWork,
    bft: BftEngine,
    pos: ProofOfStake,
    mode: ConsensusMode,
    wallet: Wallet,
    mining_address: String,
}

impl Session {
    pub fn new(config: &Config) -> Result<Session> {
        config.validate()?;

        let mut stakes = StakeManager::new();
        let now = current_timestamp()?;
        for (validator, amount) in &config.initial_stakes {
            stakes.add_stake(validator, *amount, now)?;
        }

        let wallet = Wallet::new()?;
        info!(
            "Starting session in {} mode (signing key {})",
            config.consensus_mode,
            wallet.get_fingerprint()
        );

        Ok(Session {
            ledger: Ledger::new()?,
            pow: ProofOfWork::new(config.pow_difficulty, config.mining_reward),
            bft: BftEngine::new(config.bft_validators.clone())?,
            pos: ProofOfStake::new(stakes),
            mode: config.consensus_mode,
            wallet,
            mining_address: config.mining_address.clone(),
        })
    }

    pub fn mode(&self) -> ConsensusMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ConsensusMode) {
        if mode != self.mode {
            info!("Consensus mode set to {mode}");
        }
        self.mode = mode;
    }

    fn require_mode(&self, expected: ConsensusMode) -> Result<()> {
        if self.mode != expected {
            return Err(BlockchainError::WrongMode {
                expected: expected.to_string(),
                active: self.mode.to_string(),
            });
        }
        Ok(())
    }

    /// Signs the transfer with the session wallet and queues it
    pub fn submit_transaction(
        &mut self,
        sender: &str,
        recipient: &str,
        amount: f64,
    ) -> Result<Transaction> {
        let mut transaction = Transaction::new(sender, recipient, amount);
        transaction.sign(&self.wallet)?;
        self.ledger.append_transaction(transaction.clone())?;
        Ok(transaction)
    }

    /// PoW entry point; falls back to the configured mining address
    pub fn mine(&mut self, miner_address: Option<&str>) -> Result<Block> {
        self.require_mode(ConsensusMode::Pow)?;
        let miner = miner_address.unwrap_or(self.mining_address.as_str());
        self.pow.mine(&mut self.ledger, miner)
    }

    pub fn bft_propose(&mut self) -> Result<Proposal> {
        self.require_mode(ConsensusMode::Bft)?;
        self.bft.propose(&self.ledger)
    }

    pub fn bft_vote(&mut self) -> Result<Vec<Vote>> {
        self.require_mode(ConsensusMode::Bft)?;
        self.bft.vote(&self.ledger)
    }

    pub fn bft_commit(&mut self) -> Result<Block> {
        self.require_mode(ConsensusMode::Bft)?;
        self.bft.commit(&mut self.ledger)
    }

    /// One full BFT round: propose, vote, commit
    pub fn bft_next_round(&mut self) -> Result<Block> {
        self.require_mode(ConsensusMode::Bft)?;
        self.bft.run_round(&mut self.ledger)
    }

    pub fn pos_create_block(&mut self, validator: Option<&str>) -> Result<Block> {
        self.require_mode(ConsensusMode::Pos)?;
        self.pos.create_block(&mut self.ledger, validator)
    }

    /// Produces one block with whichever engine is active
    pub fn produce_block(&mut self) -> Result<Block> {
        match self.mode {
            ConsensusMode::Pow => self.mine(None),
            ConsensusMode::Bft => self.bft_next_round(),
            ConsensusMode::Pos => self.pos_create_block(None),
        }
    }

    pub fn add_stake(&mut self, validator: &str, amount: f64) -> Result<()> {
        let now = current_timestamp()?;
        self.pos.stakes_mut().add_stake(validator, amount, now)
    }

    pub fn remove_stake(&mut self, validator: &str, amount: f64) -> Result<()> {
        self.pos.stakes_mut().remove_stake(validator, amount)
    }

    pub fn report_malicious(&mut self, validator: &str) -> Result<f64> {
        self.pos.handle_malicious_attempt(validator)
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn bft(&self) -> &BftEngine {
        &self.bft
    }

    pub fn bft_mut(&mut self) -> &mut BftEngine {
        &mut self.bft
    }

    pub fn pos(&self) -> &ProofOfStake {
        &self.pos
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    /// `{chain, length, consensus_mode}`
    pub fn chain_json(&self) -> Result<serde_json::Value> {
        let mut export = self.ledger.to_json()?;
        export["consensus_mode"] = json!(self.mode);
        Ok(export)
    }
}
