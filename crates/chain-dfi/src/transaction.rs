//! Transaction model and consensus codec.
//!
//! Legacy layout: `version · vin[] · vout[] · lockTime`. SegWit adds a
//! `0x00 0x01` marker/flag after the version and one witness stack per input
//! before the lock time. Outputs carry a token id byte from version 4 on.

use std::fmt;
use std::str::FromStr;

use crypto_utils::double_sha256;

use crate::composer::{write_var_bytes, write_varint, write_vec, Decode, Encode, Reader};
use crate::error::DfiError;
use crate::script::Script;

/// First transaction version whose outputs carry a token id.
pub const TOKEN_ID_VERSION: u32 = 4;

const SEGWIT_MARKER: u8 = 0x00;
const SEGWIT_FLAG: u8 = 0x01;

/// A 32-byte transaction id, stored in wire order and displayed reversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Txid([u8; 32]);

impl Txid {
    pub fn from_wire(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_wire(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Txid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut display = self.0;
        display.reverse();
        f.write_str(&hex::encode(display))
    }
}

impl FromStr for Txid {
    type Err = DfiError;

    /// Parse the displayed (byte-reversed) hex form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes: [u8; 32] = hex::decode(s)
            .map_err(|e| DfiError::Format(format!("invalid txid hex: {e}")))?
            .try_into()
            .map_err(|_| DfiError::Format("txid must be 32 bytes".into()))?;
        bytes.reverse();
        Ok(Self(bytes))
    }
}

impl Encode for Txid {
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.0);
    }
}

impl Decode for Txid {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, DfiError> {
        Ok(Self(reader.read_array()?))
    }
}

/// A transaction input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vin {
    pub txid: Txid,
    pub index: u32,
    pub script: Script,
    pub sequence: u32,
}

impl Encode for Vin {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.txid.encode(buf);
        buf.extend_from_slice(&self.index.to_le_bytes());
        self.script.encode(buf);
        buf.extend_from_slice(&self.sequence.to_le_bytes());
    }
}

impl Decode for Vin {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, DfiError> {
        Ok(Self {
            txid: Txid::decode(reader)?,
            index: reader.read_u32_le()?,
            script: Script::decode(reader)?,
            sequence: reader.read_u32_le()?,
        })
    }
}

/// A transaction output. `value` is in 1e-8 units and must not exceed
/// `i64::MAX`.
///
/// [`Vout::new`] is the checked constructor. A struct literal skips the
/// bound, and such an output encodes but fails to decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vout {
    pub value: u64,
    pub script: Script,
    pub token_id: u8,
}

impl Vout {
    pub fn new(value: u64, script: Script, token_id: u8) -> Result<Self, DfiError> {
        check_value(value)?;
        Ok(Self {
            value,
            script,
            token_id,
        })
    }

    /// Serialize in the layout of the given transaction version.
    pub fn encode_versioned(&self, buf: &mut Vec<u8>, version: u32) {
        buf.extend_from_slice(&self.value.to_le_bytes());
        self.script.encode(buf);
        if version >= TOKEN_ID_VERSION {
            buf.push(self.token_id);
        }
    }

    pub fn decode_versioned(reader: &mut Reader<'_>, version: u32) -> Result<Self, DfiError> {
        let value = reader.read_u64_le()?;
        check_value(value).map_err(|e| DfiError::Format(e.to_string()))?;
        let script = Script::decode(reader)?;
        let token_id = if version >= TOKEN_ID_VERSION {
            reader.read_u8()?
        } else {
            0
        };
        Ok(Self {
            value,
            script,
            token_id,
        })
    }
}

fn check_value(value: u64) -> Result<(), DfiError> {
    if value > i64::MAX as u64 {
        return Err(DfiError::Structural(format!(
            "output value {value} exceeds i64::MAX"
        )));
    }
    Ok(())
}

/// Witness stack for one input.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Witness {
    pub items: Vec<Vec<u8>>,
}

impl Witness {
    pub fn new(items: Vec<Vec<u8>>) -> Self {
        Self { items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Encode for Witness {
    fn encode(&self, buf: &mut Vec<u8>) {
        write_varint(buf, self.items.len() as u64);
        for item in &self.items {
            write_var_bytes(buf, item);
        }
    }
}

impl Decode for Witness {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, DfiError> {
        let count = reader.read_len()?;
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(reader.read_var_bytes()?.to_vec());
        }
        Ok(Self { items })
    }
}

/// A transaction without witness data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub version: u32,
    pub vin: Vec<Vin>,
    pub vout: Vec<Vout>,
    pub lock_time: u32,
}

impl Transaction {
    pub fn txid(&self) -> Txid {
        Txid(double_sha256(&self.to_bytes()))
    }

    /// Serialize only the outputs, in this transaction's version layout.
    pub fn encode_outputs(&self, buf: &mut Vec<u8>) {
        write_varint(buf, self.vout.len() as u64);
        for vout in &self.vout {
            vout.encode_versioned(buf, self.version);
        }
    }

    fn decode_after_version(reader: &mut Reader<'_>, version: u32) -> Result<Self, DfiError> {
        let vin = reader.read_vec()?;
        let vout = read_outputs(reader, version)?;
        Ok(Self {
            version,
            vin,
            vout,
            lock_time: reader.read_u32_le()?,
        })
    }
}

fn read_outputs(reader: &mut Reader<'_>, version: u32) -> Result<Vec<Vout>, DfiError> {
    let count = reader.read_len()?;
    let mut vout = Vec::with_capacity(count);
    for _ in 0..count {
        vout.push(Vout::decode_versioned(reader, version)?);
    }
    Ok(vout)
}

impl Encode for Transaction {
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.version.to_le_bytes());
        write_vec(buf, &self.vin);
        self.encode_outputs(buf);
        buf.extend_from_slice(&self.lock_time.to_le_bytes());
    }
}

impl Decode for Transaction {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, DfiError> {
        let version = reader.read_u32_le()?;
        Self::decode_after_version(reader, version)
    }
}

/// A transaction with a witness stack per input.
///
/// Fields are private so the witness count always equals the input count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionSegWit {
    version: u32,
    vin: Vec<Vin>,
    vout: Vec<Vout>,
    witness: Vec<Witness>,
    lock_time: u32,
}

impl TransactionSegWit {
    pub fn new(tx: Transaction, witness: Vec<Witness>) -> Result<Self, DfiError> {
        if witness.len() != tx.vin.len() {
            return Err(DfiError::Structural(format!(
                "{} witnesses for {} inputs",
                witness.len(),
                tx.vin.len()
            )));
        }
        Ok(Self {
            version: tx.version,
            vin: tx.vin,
            vout: tx.vout,
            witness,
            lock_time: tx.lock_time,
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn vin(&self) -> &[Vin] {
        &self.vin
    }

    pub fn vout(&self) -> &[Vout] {
        &self.vout
    }

    pub fn witness(&self) -> &[Witness] {
        &self.witness
    }

    pub fn lock_time(&self) -> u32 {
        self.lock_time
    }

    /// The same transaction with witness data stripped.
    pub fn to_legacy(&self) -> Transaction {
        Transaction {
            version: self.version,
            vin: self.vin.clone(),
            vout: self.vout.clone(),
            lock_time: self.lock_time,
        }
    }

    pub fn txid(&self) -> Txid {
        self.to_legacy().txid()
    }

    pub fn wtxid(&self) -> Txid {
        Txid(double_sha256(&self.to_bytes()))
    }
}

impl Encode for TransactionSegWit {
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.version.to_le_bytes());
        buf.push(SEGWIT_MARKER);
        buf.push(SEGWIT_FLAG);
        write_vec(buf, &self.vin);
        write_varint(buf, self.vout.len() as u64);
        for vout in &self.vout {
            vout.encode_versioned(buf, self.version);
        }
        for witness in &self.witness {
            witness.encode(buf);
        }
        buf.extend_from_slice(&self.lock_time.to_le_bytes());
    }
}

/// Either transaction layout, as found on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawTransaction {
    Legacy(Transaction),
    SegWit(TransactionSegWit),
}

impl RawTransaction {
    pub fn version(&self) -> u32 {
        match self {
            RawTransaction::Legacy(tx) => tx.version,
            RawTransaction::SegWit(tx) => tx.version,
        }
    }

    pub fn vin(&self) -> &[Vin] {
        match self {
            RawTransaction::Legacy(tx) => &tx.vin,
            RawTransaction::SegWit(tx) => &tx.vin,
        }
    }

    pub fn vout(&self) -> &[Vout] {
        match self {
            RawTransaction::Legacy(tx) => &tx.vout,
            RawTransaction::SegWit(tx) => &tx.vout,
        }
    }

    pub fn to_legacy(&self) -> Transaction {
        match self {
            RawTransaction::Legacy(tx) => tx.clone(),
            RawTransaction::SegWit(tx) => tx.to_legacy(),
        }
    }

    /// Hash of the witness-free serialization.
    pub fn txid(&self) -> Txid {
        match self {
            RawTransaction::Legacy(tx) => tx.txid(),
            RawTransaction::SegWit(tx) => tx.txid(),
        }
    }

    /// Hash of the full serialization; equals the txid for legacy layouts.
    pub fn wtxid(&self) -> Txid {
        match self {
            RawTransaction::Legacy(tx) => tx.txid(),
            RawTransaction::SegWit(tx) => tx.wtxid(),
        }
    }

    /// Size of the witness-free serialization.
    pub fn base_size(&self) -> usize {
        match self {
            RawTransaction::Legacy(tx) => tx.to_bytes().len(),
            RawTransaction::SegWit(tx) => tx.to_legacy().to_bytes().len(),
        }
    }

    pub fn total_size(&self) -> usize {
        self.to_bytes().len()
    }

    pub fn weight(&self) -> usize {
        self.base_size() * 3 + self.total_size()
    }

    pub fn vsize(&self) -> usize {
        self.weight().div_ceil(4)
    }
}

impl Encode for RawTransaction {
    fn encode(&self, buf: &mut Vec<u8>) {
        match self {
            RawTransaction::Legacy(tx) => tx.encode(buf),
            RawTransaction::SegWit(tx) => tx.encode(buf),
        }
    }
}

impl Decode for RawTransaction {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, DfiError> {
        let version = reader.read_u32_le()?;
        if reader.peek(2) != Some(&[SEGWIT_MARKER, SEGWIT_FLAG][..]) {
            return Ok(RawTransaction::Legacy(Transaction::decode_after_version(
                reader, version,
            )?));
        }
        reader.read_bytes(2)?;
        let vin: Vec<Vin> = reader.read_vec()?;
        let vout = read_outputs(reader, version)?;
        let mut witness = Vec::with_capacity(vin.len());
        for _ in 0..vin.len() {
            witness.push(Witness::decode(reader)?);
        }
        let lock_time = reader.read_u32_le()?;
        Ok(RawTransaction::SegWit(TransactionSegWit {
            version,
            vin,
            vout,
            witness,
            lock_time,
        }))
    }
}

impl From<Transaction> for RawTransaction {
    fn from(tx: Transaction) -> Self {
        RawTransaction::Legacy(tx)
    }
}

impl From<TransactionSegWit> for RawTransaction {
    fn from(tx: TransactionSegWit) -> Self {
        RawTransaction::SegWit(tx)
    }
}
