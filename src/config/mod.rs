//! Configuration management
//!
//! Defaults for every engine, overridable from a TOML file and from
//! environment variables (`CONSENSUS_MODE`, `POW_DIFFICULTY`,
//! `MINING_ADDRESS`, `BFT_VALIDATORS`).

pub mod settings;

pub use settings::Config;
