// Entry point for the ledger simulator. Everything lives in memory, so each
// invocation builds a fresh session, drives it, and prints the resulting chain.
use clap::Parser;
use log::{error, info, warn, LevelFilter};
use std::process;
use triad_chain::{BlockchainError, Command, Config, FaultyVoter, Opt, Session};

fn main() {
    env_logger::builder().filter_level(LevelFilter::Info).init();

    let opt = Opt::parse();

    if let Err(e) = run_command(opt) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn load_config(opt: &Opt) -> Result<Config, BlockchainError> {
    match &opt.config {
        Some(path) => Config::load(path),
        None => Config::from_env(),
    }
}

fn run_command(opt: Opt) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(&opt)?;

    match opt.command {
        Command::Simulate {
            mode,
            blocks,
            transactions,
            stakes,
            fault_rate,
            seed,
        } => {
            if let Some(mode) = mode {
                config.consensus_mode = mode.parse()?;
            }
            for stake in stakes {
                *config.initial_stakes.entry(stake.validator).or_insert(0.0) += stake.amount;
            }

            let mut session = Session::new(&config)?;
            if let Some(rate) = fault_rate {
                session
                    .bft_mut()
                    .set_decider(Box::new(FaultyVoter::new(rate, seed)?));
            }

            let mut next_amount = 1.0;
            for round in 0..blocks {
                for i in 0..transactions {
                    let sender = format!("user{i}");
                    let recipient = format!("user{}", i + 1);
                    session.submit_transaction(&sender, &recipient, next_amount)?;
                    next_amount += 1.0;
                }

                match session.produce_block() {
                    Ok(block) => info!(
                        "Round {round}: block {} appended via {}",
                        block.get_index(),
                        block.get_consensus_method()
                    ),
                    // Pending transactions stay queued for the next round
                    Err(e @ BlockchainError::ConsensusFailure { .. }) => {
                        warn!("Round {round}: {e}")
                    }
                    Err(e) if e.is_retryable() => warn!("Round {round}: {e}"),
                    Err(e) => return Err(e.into()),
                }
            }

            println!("{}", serde_json::to_string_pretty(&session.chain_json()?)?);
            println!("Chain valid: {}", session.ledger().is_valid_chain());
        }
        Command::ShowConfig => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }
    Ok(())
}
