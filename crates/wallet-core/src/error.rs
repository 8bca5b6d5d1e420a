use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Invalid WIF: {0}")]
    InvalidWif(String),

    #[error("WIF prefix mismatch: expected 0x{expected:02x}, found 0x{actual:02x}")]
    PrefixMismatch { expected: u8, actual: u8 },

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(#[from] chain_dfi::DfiError),

    #[error("Crypto error: {0}")]
    Crypto(#[from] crypto_utils::CryptoError),
}
