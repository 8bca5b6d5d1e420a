//! DeFi chain transaction support.
//!
//! Byte composition, scripts and custom `DfTx` messages, Base58/Bech32
//! addresses, the versioned transaction codec, sighash computation, signing
//! over an async key capability, and a funding builder.

pub mod address;
pub mod builder;
pub mod composer;
pub mod dftx;
pub mod error;
pub mod network;
pub mod script;
pub mod sighash;
pub mod signer;
pub mod transaction;

pub use error::DfiError;
