//! Signature hash preimages.
//!
//! Witness inputs follow BIP143; legacy inputs use the original
//! copy-and-blank scheme. Outputs are serialized in the transaction's own
//! version layout, so version 4 preimages commit to token ids.

use crypto_utils::double_sha256;

use crate::composer::{write_var_bytes, Encode};
use crate::error::DfiError;
use crate::script::Script;
use crate::transaction::{Transaction, Vin, Vout};

/// Sighash flag byte appended to every signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SigHashType(u8);

impl SigHashType {
    pub const ALL: SigHashType = SigHashType(0x01);
    pub const NONE: SigHashType = SigHashType(0x02);
    pub const SINGLE: SigHashType = SigHashType(0x03);
    pub const ALL_ANYONECANPAY: SigHashType = SigHashType(0x81);
    pub const NONE_ANYONECANPAY: SigHashType = SigHashType(0x82);
    pub const SINGLE_ANYONECANPAY: SigHashType = SigHashType(0x83);

    const ANYONECANPAY: u8 = 0x80;

    pub fn from_byte(byte: u8) -> Result<Self, DfiError> {
        match byte & !Self::ANYONECANPAY {
            0x01..=0x03 => Ok(SigHashType(byte)),
            _ => Err(DfiError::SigningError(format!(
                "unsupported sighash type 0x{byte:02x}"
            ))),
        }
    }

    pub fn byte(self) -> u8 {
        self.0
    }

    pub fn anyone_can_pay(self) -> bool {
        self.0 & Self::ANYONECANPAY != 0
    }

    fn base(self) -> u8 {
        self.0 & !Self::ANYONECANPAY
    }

    fn is_none(self) -> bool {
        self.base() == Self::NONE.0
    }

    fn is_single(self) -> bool {
        self.base() == Self::SINGLE.0
    }
}

/// Computes sighashes for every input of one transaction.
///
/// The transaction-wide BIP143 hashes are computed once at construction.
#[derive(Debug, Clone)]
pub struct SigHasher<'a> {
    tx: &'a Transaction,
    hash_prevouts: [u8; 32],
    hash_sequence: [u8; 32],
    hash_outputs: [u8; 32],
}

impl<'a> SigHasher<'a> {
    pub fn new(tx: &'a Transaction) -> Self {
        let mut prevouts = Vec::with_capacity(tx.vin.len() * 36);
        let mut sequences = Vec::with_capacity(tx.vin.len() * 4);
        for vin in &tx.vin {
            vin.txid.encode(&mut prevouts);
            prevouts.extend_from_slice(&vin.index.to_le_bytes());
            sequences.extend_from_slice(&vin.sequence.to_le_bytes());
        }
        let mut outputs = Vec::new();
        for vout in &tx.vout {
            vout.encode_versioned(&mut outputs, tx.version);
        }
        Self {
            tx,
            hash_prevouts: double_sha256(&prevouts),
            hash_sequence: double_sha256(&sequences),
            hash_outputs: double_sha256(&outputs),
        }
    }

    fn input(&self, index: usize) -> Result<&'a Vin, DfiError> {
        self.tx.vin.get(index).ok_or_else(|| {
            DfiError::SigningError(format!(
                "input {index} out of range ({} inputs)",
                self.tx.vin.len()
            ))
        })
    }

    fn check_single(&self, index: usize, sighash: SigHashType) -> Result<(), DfiError> {
        if sighash.is_single() && index >= self.tx.vout.len() {
            return Err(DfiError::SigningError(format!(
                "SIGHASH_SINGLE for input {index} without a matching output ({} outputs)",
                self.tx.vout.len()
            )));
        }
        Ok(())
    }

    /// BIP143 digest for a witness input spending `amount`.
    pub fn witness_digest(
        &self,
        index: usize,
        script_code: &Script,
        amount: u64,
        sighash: SigHashType,
    ) -> Result<[u8; 32], DfiError> {
        let vin = self.input(index)?;
        self.check_single(index, sighash)?;

        let zero = [0u8; 32];
        let hash_prevouts = if sighash.anyone_can_pay() {
            zero
        } else {
            self.hash_prevouts
        };
        let hash_sequence = if sighash.anyone_can_pay() || sighash.is_none() || sighash.is_single()
        {
            zero
        } else {
            self.hash_sequence
        };
        let hash_outputs = if sighash.is_single() {
            let mut output = Vec::new();
            self.tx.vout[index].encode_versioned(&mut output, self.tx.version);
            double_sha256(&output)
        } else if sighash.is_none() {
            zero
        } else {
            self.hash_outputs
        };

        let mut preimage = Vec::with_capacity(160 + script_code.len());
        preimage.extend_from_slice(&self.tx.version.to_le_bytes());
        preimage.extend_from_slice(&hash_prevouts);
        preimage.extend_from_slice(&hash_sequence);
        vin.txid.encode(&mut preimage);
        preimage.extend_from_slice(&vin.index.to_le_bytes());
        write_var_bytes(&mut preimage, &script_code.to_raw());
        preimage.extend_from_slice(&amount.to_le_bytes());
        preimage.extend_from_slice(&vin.sequence.to_le_bytes());
        preimage.extend_from_slice(&hash_outputs);
        preimage.extend_from_slice(&self.tx.lock_time.to_le_bytes());
        preimage.extend_from_slice(&(sighash.byte() as u32).to_le_bytes());
        Ok(double_sha256(&preimage))
    }

    /// Pre-SegWit digest: a modified copy of the transaction.
    pub fn legacy_digest(
        &self,
        index: usize,
        script_code: &Script,
        sighash: SigHashType,
    ) -> Result<[u8; 32], DfiError> {
        self.input(index)?;
        self.check_single(index, sighash)?;

        let blank_other_sequences = sighash.is_none() || sighash.is_single();
        let vin = self
            .tx
            .vin
            .iter()
            .enumerate()
            .filter(|(i, _)| !sighash.anyone_can_pay() || *i == index)
            .map(|(i, vin)| Vin {
                txid: vin.txid,
                index: vin.index,
                script: if i == index {
                    script_code.clone()
                } else {
                    Script::empty()
                },
                sequence: if i != index && blank_other_sequences {
                    0
                } else {
                    vin.sequence
                },
            })
            .collect();

        let vout = if sighash.is_none() {
            Vec::new()
        } else if sighash.is_single() {
            let mut outputs: Vec<Vout> = (0..index)
                .map(|_| Vout {
                    value: u64::MAX,
                    script: Script::empty(),
                    token_id: 0,
                })
                .collect();
            outputs.push(self.tx.vout[index].clone());
            outputs
        } else {
            self.tx.vout.clone()
        };

        let copy = Transaction {
            version: self.tx.version,
            vin,
            vout,
            lock_time: self.tx.lock_time,
        };
        let mut preimage = copy.to_bytes();
        preimage.extend_from_slice(&(sighash.byte() as u32).to_le_bytes());
        Ok(double_sha256(&preimage))
    }
}
