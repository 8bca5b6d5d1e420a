use std::fmt;

use chain_dfi::signer::Signer;
use chain_dfi::DfiError;
use crypto_utils::random::random_secret_key;
use crypto_utils::zeroizing::SecretKeyBytes;
use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use k256::ecdsa::{Signature, SigningKey};

use crate::error::WalletError;

/// A secp256k1 key pair signing 32-byte digests.
///
/// Signatures are RFC6979 deterministic and always low-S, DER encoded.
#[derive(Clone)]
pub struct EllipticPair {
    key: SigningKey,
}

impl EllipticPair {
    /// Fresh key from the OS generator.
    pub fn random() -> Self {
        loop {
            let secret = random_secret_key();
            if let Ok(pair) = Self::from_secret(&secret) {
                return pair;
            }
        }
    }

    pub fn from_secret(secret: &SecretKeyBytes) -> Result<Self, WalletError> {
        let key = SigningKey::from_slice(secret.as_bytes())
            .map_err(|e| WalletError::InvalidPrivateKey(e.to_string()))?;
        Ok(Self { key })
    }

    pub fn secret(&self) -> SecretKeyBytes {
        SecretKeyBytes::new(self.key.to_bytes().into())
    }

    /// Compressed SEC1 public key.
    pub fn public_key(&self) -> Result<[u8; 33], WalletError> {
        self.key
            .verifying_key()
            .to_encoded_point(true)
            .as_bytes()
            .try_into()
            .map_err(|_| WalletError::InvalidPrivateKey("Invalid public key length".into()))
    }

    pub fn sign_digest(&self, digest: &[u8; 32]) -> Result<Vec<u8>, WalletError> {
        let signature: Signature = self
            .key
            .sign_prehash(digest)
            .map_err(|e| WalletError::SigningFailed(e.to_string()))?;
        let signature = signature.normalize_s().unwrap_or(signature);
        Ok(signature.to_der().as_bytes().to_vec())
    }

    /// Whether `der` is a valid signature over `digest` by this key.
    pub fn verify(&self, digest: &[u8; 32], der: &[u8]) -> bool {
        Signature::from_der(der)
            .map(|signature| self.key.verifying_key().verify_prehash(digest, &signature).is_ok())
            .unwrap_or(false)
    }
}

impl fmt::Debug for EllipticPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EllipticPair(..)")
    }
}

impl Signer for EllipticPair {
    async fn public_key(&self) -> Result<[u8; 33], DfiError> {
        EllipticPair::public_key(self).map_err(|e| DfiError::SigningError(e.to_string()))
    }

    async fn sign(&self, digest: [u8; 32]) -> Result<Vec<u8>, DfiError> {
        self.sign_digest(&digest)
            .map_err(|e| DfiError::SigningError(e.to_string()))
    }
}
