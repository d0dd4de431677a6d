//! Session management
//!
//! Owns the ledger and the engines for the lifetime of the process and
//! enforces the consensus mode switch.

pub mod session;

pub use session::Session;
