//! # crypto-utils
//!
//! Hashing, key-material memory safety, and secure random generation shared
//! by the DeFi chain codec and the wallet.

pub mod error;
pub mod hash;
pub mod random;
pub mod zeroizing;

pub use error::CryptoError;
pub use hash::{double_sha256, hash160, sha256};
