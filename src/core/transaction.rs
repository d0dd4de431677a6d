// Transfer records carried by blocks. A transaction is just sender, recipient
// and amount plus an optional ECDSA signature; no balances are tracked here.

use crate::error::{BlockchainError, Result};
use crate::utils::{ecdsa_p256_sha256_sign_verify, sha256_hex, to_canonical_json};
use data_encoding::HEXLOWER;
use serde::{Deserialize, Serialize, Serializer};

/// Sender used by reward transactions minted by the engines
pub const NETWORK_SENDER: &str = "NETWORK";

// P-256 fixed-width signatures are r || s, 32 bytes each
const SCALAR_LEN: usize = 32;

/// Anything able to produce an ECDSA P-256 / SHA-256 signature over a message.
/// Key provisioning lives outside the ledger; the transaction only needs this.
pub trait TransactionSigner {
    fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>>;
}

/// The (r, s) pair of an ECDSA signature, hex encoded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxSignature {
    pub r: String,
    pub s: String,
}

impl TxSignature {
    fn from_fixed(bytes: &[u8]) -> Result<TxSignature> {
        if bytes.len() != SCALAR_LEN * 2 {
            return Err(BlockchainError::Crypto(format!(
                "Expected a {}-byte signature, got {}",
                SCALAR_LEN * 2,
                bytes.len()
            )));
        }
        Ok(TxSignature {
            r: HEXLOWER.encode(&bytes[..SCALAR_LEN]),
            s: HEXLOWER.encode(&bytes[SCALAR_LEN..]),
        })
    }

    fn to_fixed(&self) -> Option<Vec<u8>> {
        let mut bytes = HEXLOWER.decode(self.r.as_bytes()).ok()?;
        bytes.extend(HEXLOWER.decode(self.s.as_bytes()).ok()?);
        if bytes.len() != SCALAR_LEN * 2 {
            return None;
        }
        Some(bytes)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    sender: String,
    recipient: String,
    #[serde(serialize_with = "serialize_finite_amount")]
    amount: f64,
    signature: Option<TxSignature>,
}

// serde_json would otherwise write NaN and infinities as null
fn serialize_finite_amount<S: Serializer>(
    amount: &f64,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    if !amount.is_finite() {
        return Err(serde::ser::Error::custom(format!(
            "amount must be finite, got {amount}"
        )));
    }
    serializer.serialize_f64(*amount)
}

impl Transaction {
    pub fn new(sender: &str, recipient: &str, amount: f64) -> Transaction {
        Transaction {
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            amount,
            signature: None,
        }
    }

    /// Network-minted reward; never signed
    pub fn new_reward(recipient: &str, amount: f64) -> Transaction {
        Transaction::new(NETWORK_SENDER, recipient, amount)
    }

    /// The exact bytes covered by the signature
    pub fn signing_payload(&self) -> Vec<u8> {
        format!("{}{}{}", self.sender, self.recipient, self.amount).into_bytes()
    }

    pub fn sign(&mut self, signer: &dyn TransactionSigner) -> Result<()> {
        if self.is_reward() {
            return Err(BlockchainError::Crypto(
                "Reward transactions are not signed".to_string(),
            ));
        }
        let raw = signer.sign_message(&self.signing_payload())?;
        self.signature = Some(TxSignature::from_fixed(&raw)?);
        Ok(())
    }

    /// Checks the signature against the signer's uncompressed public key.
    /// Unsigned transactions are never valid.
    pub fn is_valid(&self, public_key: &[u8]) -> bool {
        let Some(signature) = self.signature.as_ref() else {
            return false;
        };
        let Some(raw) = signature.to_fixed() else {
            log::warn!("Malformed signature on transaction from {}", self.sender);
            return false;
        };
        ecdsa_p256_sha256_sign_verify(public_key, &raw, &self.signing_payload())
    }

    pub fn is_reward(&self) -> bool {
        self.sender == NETWORK_SENDER
    }

    /// SHA-256 of the canonical JSON form; identifies duplicates inside a block
    pub fn canonical_hash(&self) -> Result<String> {
        let json = to_canonical_json(self)?;
        Ok(sha256_hex(json.as_bytes()))
    }

    pub fn get_sender(&self) -> &str {
        self.sender.as_str()
    }

    pub fn get_recipient(&self) -> &str {
        self.recipient.as_str()
    }

    pub fn get_amount(&self) -> f64 {
        self.amount
    }

    pub fn get_signature(&self) -> Option<&TxSignature> {
        self.signature.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn set_amount(&mut self, amount: f64) {
        self.amount = amount;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::Wallet;

    #[test]
    fn test_signing_payload_concatenates_fields() {
        let tx = Transaction::new("alice", "bob", 5.0);
        assert_eq!(tx.signing_payload(), b"alicebob5".to_vec());

        let tx = Transaction::new("alice", "bob", 2.5);
        assert_eq!(tx.signing_payload(), b"alicebob2.5".to_vec());
    }

    #[test]
    fn test_signed_transaction_verifies() {
        let wallet = Wallet::new().unwrap();
        let mut tx = Transaction::new("alice", "bob", 5.0);
        tx.sign(&wallet).unwrap();

        let signature = tx.get_signature().unwrap();
        assert_eq!(signature.r.len(), 64);
        assert_eq!(signature.s.len(), 64);
        assert!(tx.is_valid(wallet.get_public_key()));
    }

    #[test]
    fn test_tampered_or_foreign_key_fails_verification() {
        let wallet = Wallet::new().unwrap();
        let other = Wallet::new().unwrap();
        let mut tx = Transaction::new("alice", "bob", 5.0);
        tx.sign(&wallet).unwrap();

        assert!(!tx.is_valid(other.get_public_key()));

        tx.set_amount(500.0);
        assert!(!tx.is_valid(wallet.get_public_key()));
    }

    #[test]
    fn test_unsigned_transaction_is_invalid() {
        let wallet = Wallet::new().unwrap();
        let tx = Transaction::new("alice", "bob", 5.0);
        assert!(!tx.is_valid(wallet.get_public_key()));
    }

    #[test]
    fn test_reward_transactions() {
        let wallet = Wallet::new().unwrap();
        let mut reward = Transaction::new_reward("miner", 1.0);
        assert!(reward.is_reward());
        assert_eq!(reward.get_sender(), NETWORK_SENDER);
        assert!(reward.sign(&wallet).is_err());
        assert!(reward.get_signature().is_none());
    }

    #[test]
    fn test_canonical_hash_distinguishes_content() {
        let a = Transaction::new("alice", "bob", 5.0);
        let b = Transaction::new("alice", "bob", 5.0);
        let c = Transaction::new("alice", "carol", 5.0);
        assert_eq!(a.canonical_hash().unwrap(), b.canonical_hash().unwrap());
        assert_ne!(a.canonical_hash().unwrap(), c.canonical_hash().unwrap());
    }

    #[test]
    fn test_external_json_shape() {
        let tx = Transaction::new("alice", "bob", 5.0);
        let value = serde_json::to_value(&tx).unwrap();
        assert_eq!(value["sender"], "alice");
        assert_eq!(value["recipient"], "bob");
        assert_eq!(value["amount"], 5.0);
        assert!(value["signature"].is_null());
    }

    #[test]
    fn test_non_finite_amounts_cannot_be_hashed() {
        for amount in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let tx = Transaction::new("alice", "bob", amount);
            assert!(matches!(
                tx.canonical_hash(),
                Err(BlockchainError::Serialization(_))
            ));
        }
    }
}
