//! Transaction signing keys
//!
//! Key provisioning is outside the ledger proper; the session holds one
//! wallet and signs every submitted transaction with it.

#[allow(clippy::module_inception)]
pub mod wallet;

pub use wallet::Wallet;
