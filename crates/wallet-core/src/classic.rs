use chain_dfi::address::{Address, AddressType};
use chain_dfi::builder::UnsignedTransaction;
use chain_dfi::network::Network;
use chain_dfi::script::Script;
use chain_dfi::sighash::SigHashType;
use chain_dfi::signer::{sign_transaction, SignInput};
use chain_dfi::transaction::{RawTransaction, Transaction, Vout};
use crypto_utils::hash160;
use tracing::debug;

use crate::elliptic::EllipticPair;
use crate::error::WalletError;
use crate::wif;

/// A single-key wallet paying to and spending from its P2WPKH script.
#[derive(Debug, Clone)]
pub struct WalletClassic {
    pair: EllipticPair,
}

impl WalletClassic {
    pub fn new(pair: EllipticPair) -> Self {
        Self { pair }
    }

    pub fn from_wif(network: Network, wif: &str) -> Result<Self, WalletError> {
        let secret = wif::decode(network, wif)?;
        Ok(Self::new(EllipticPair::from_secret(&secret)?))
    }

    pub fn pair(&self) -> &EllipticPair {
        &self.pair
    }

    pub fn public_key(&self) -> Result<[u8; 33], WalletError> {
        self.pair.public_key()
    }

    /// `OP_0 <hash160(pubkey)>`.
    pub fn script(&self) -> Result<Script, WalletError> {
        Ok(Script::p2wpkh(&hash160(&self.public_key()?)))
    }

    pub fn address(&self, network: Network) -> Result<Address, WalletError> {
        let hash = hash160(&self.public_key()?);
        Ok(Address::encode(network, AddressType::P2WPKH, &hash)?)
    }

    /// Sign a builder result, every input with `SIGHASH_ALL`.
    pub async fn sign_tx(&self, unsigned: &UnsignedTransaction) -> Result<RawTransaction, WalletError> {
        self.sign(&unsigned.tx, &unsigned.spent_outputs()).await
    }

    /// Sign `tx` given the outputs its inputs spend, in input order.
    pub async fn sign(
        &self,
        tx: &Transaction,
        prevouts: &[Vout],
    ) -> Result<RawTransaction, WalletError> {
        debug!(inputs = tx.vin.len(), "wallet signing transaction");
        let inputs: Vec<_> = prevouts
            .iter()
            .map(|prevout| SignInput::new(prevout, &self.pair))
            .collect();
        Ok(sign_transaction(tx, &inputs, SigHashType::ALL).await?)
    }
}
