use crate::core::TransactionSigner;
use crate::error::{BlockchainError, Result};
use data_encoding::HEXLOWER;
use ring::rand::SystemRandom;
use ring::signature::{EcdsaKeyPair, KeyPair, ECDSA_P256_SHA256_FIXED_SIGNING};
use zeroize::ZeroizeOnDrop;

const FINGERPRINT_LEN: usize = 8;

/// ECDSA P-256 key pair used to sign submitted transactions.
/// The PKCS#8 document is wiped from memory when the wallet is dropped.
#[derive(Clone, ZeroizeOnDrop)]
pub struct Wallet {
    pkcs8: Vec<u8>,
    public_key: Vec<u8>,
}

impl Wallet {
    pub fn new() -> Result<Wallet> {
        let pkcs8 = crate::utils::new_key_pair()?;
        Self::from_pkcs8(pkcs8)
    }

    pub fn from_pkcs8(pkcs8: Vec<u8>) -> Result<Wallet> {
        let rng = SystemRandom::new();
        let key_pair =
            EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, pkcs8.as_ref(), &rng)
                .map_err(|e| {
                    BlockchainError::Crypto(format!("Failed to create key pair from PKCS8: {e}"))
                })?;
        let public_key = key_pair.public_key().as_ref().to_vec();
        Ok(Wallet { pkcs8, public_key })
    }

    /// Uncompressed SEC1 public key, as expected by `Transaction::is_valid`
    pub fn get_public_key(&self) -> &[u8] {
        self.public_key.as_slice()
    }

    /// Short hex identifier of the public key, safe to log
    pub fn get_fingerprint(&self) -> String {
        let digest = crate::utils::sha256_digest(self.public_key.as_slice());
        HEXLOWER.encode(&digest[..FINGERPRINT_LEN])
    }
}

impl TransactionSigner for Wallet {
    fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>> {
        crate::utils::ecdsa_p256_sha256_sign_digest(self.pkcs8.as_slice(), message)
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("fingerprint", &self.get_fingerprint())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_key_is_uncompressed_point() {
        let wallet = Wallet::new().unwrap();
        assert_eq!(wallet.get_public_key().len(), 65);
        assert_eq!(wallet.get_public_key()[0], 0x04);
    }

    #[test]
    fn test_from_pkcs8_rejects_garbage() {
        assert!(Wallet::from_pkcs8(vec![1, 2, 3]).is_err());
    }

    #[test]
    fn test_debug_hides_key_material() {
        let wallet = Wallet::new().unwrap();
        let debug = format!("{wallet:?}");
        assert!(debug.contains(&wallet.get_fingerprint()));
        assert!(!debug.contains("pkcs8"));
    }
}
