use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;

/// `name=amount` pair registering stake before a simulation
#[derive(Debug, Clone, PartialEq)]
pub struct StakeArg {
    pub validator: String,
    pub amount: f64,
}

impl FromStr for StakeArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (validator, amount) = s
            .split_once('=')
            .ok_or_else(|| format!("Invalid stake: {s}. Use NAME=AMOUNT (e.g., 'alice=50')"))?;
        let validator = validator.trim();
        if validator.is_empty() {
            return Err(format!("Invalid stake: {s}. Validator name is empty"));
        }
        let amount = amount
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("Invalid stake amount in {s}: {e}"))?;
        Ok(StakeArg {
            validator: validator.to_string(),
            amount,
        })
    }
}

#[derive(Debug, Parser)]
#[command(name = "triad-chain")]
pub struct Opt {
    #[arg(long = "config", global = true, help = "TOML configuration file")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(
        name = "simulate",
        about = "Produce blocks in memory and print the resulting chain"
    )]
    Simulate {
        #[arg(long = "mode", help = "Consensus mode (pow, bft, pos); overrides config")]
        mode: Option<String>,
        #[arg(long = "blocks", default_value_t = 3, help = "Blocks to produce")]
        blocks: usize,
        #[arg(
            long = "transactions",
            default_value_t = 2,
            help = "Signed transfers queued before each block"
        )]
        transactions: usize,
        #[arg(long = "stake", help = "Register stake as NAME=AMOUNT (repeatable)")]
        stakes: Vec<StakeArg>,
        #[arg(
            long = "fault-rate",
            help = "Probability that a BFT validator withholds its vote"
        )]
        fault_rate: Option<f64>,
        #[arg(long = "seed", default_value_t = 0, help = "Seed for simulated BFT faults")]
        seed: u64,
    },
    #[command(name = "show-config", about = "Print the effective configuration")]
    ShowConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stake_arg_parsing() {
        let arg: StakeArg = "alice=50".parse().unwrap();
        assert_eq!(arg.validator, "alice");
        assert_eq!(arg.amount, 50.0);

        assert!("alice".parse::<StakeArg>().is_err());
        assert!("=5".parse::<StakeArg>().is_err());
        assert!("bob=lots".parse::<StakeArg>().is_err());
    }

    #[test]
    fn test_simulate_arguments() {
        let opt = Opt::parse_from([
            "triad-chain",
            "simulate",
            "--mode",
            "pos",
            "--blocks",
            "5",
            "--stake",
            "alice=50",
            "--stake",
            "bob=20",
        ]);
        match opt.command {
            Command::Simulate {
                mode,
                blocks,
                transactions,
                stakes,
                fault_rate,
                ..
            } => {
                assert_eq!(mode.as_deref(), Some("pos"));
                assert_eq!(blocks, 5);
                assert_eq!(transactions, 2);
                assert_eq!(stakes.len(), 2);
                assert!(fault_rate.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_show_config_subcommand_name() {
        let opt = Opt::parse_from(["triad-chain", "show-config"]);
        assert!(matches!(opt.command, Command::ShowConfig));
        assert!(Opt::try_parse_from(["triad-chain", "showconfig"]).is_err());
    }
}
