//! Key handling for DeFi chain transactions: secp256k1 key pairs, WIF
//! import/export, and a single-key wallet that signs builder output.

pub mod classic;
pub mod elliptic;
pub mod error;
pub mod wif;

pub use classic::WalletClassic;
pub use elliptic::EllipticPair;
pub use error::WalletError;
