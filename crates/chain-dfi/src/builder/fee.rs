use crate::composer::varint_len;
use crate::script::Script;
use crate::transaction::{Vout, TOKEN_ID_VERSION};

use super::Prevout;

/// Serialized P2WPKH witness: item count, 72-byte signature + type, 33-byte key.
const P2WPKH_WITNESS_BYTES: usize = 1 + 1 + 72 + 1 + 33;

/// P2PKH scriptSig: push(signature + type) push(pubkey).
const P2PKH_SCRIPT_SIG_BYTES: usize = 1 + 72 + 1 + 33;

/// Outpoint, sequence.
const INPUT_FIXED_BYTES: usize = 32 + 4 + 4;

/// Decides the fee for a transaction of a given virtual size.
pub trait FeeEstimator {
    /// Fee in satoshis for `vsize` virtual bytes.
    fn fee(&self, vsize: usize) -> u64;

    /// Change at or below this value is not worth an output and goes to fee.
    fn dust_threshold(&self) -> u64 {
        0
    }
}

/// Flat rate in satoshis per virtual byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeRate {
    pub sat_per_vbyte: u64,
    pub dust_threshold: u64,
}

impl FeeRate {
    pub fn new(sat_per_vbyte: u64) -> Self {
        Self {
            sat_per_vbyte,
            dust_threshold: 0,
        }
    }

    pub fn with_dust_threshold(mut self, dust_threshold: u64) -> Self {
        self.dust_threshold = dust_threshold;
        self
    }
}

impl FeeEstimator for FeeRate {
    fn fee(&self, vsize: usize) -> u64 {
        (vsize as u64).saturating_mul(self.sat_per_vbyte)
    }

    fn dust_threshold(&self) -> u64 {
        self.dust_threshold
    }
}

fn script_field_len(script_len: usize) -> usize {
    varint_len(script_len as u64) + script_len
}

/// Serialized size of an output paying `script`.
pub fn output_len(script: &Script, version: u32) -> usize {
    let token = usize::from(version >= TOKEN_ID_VERSION);
    8 + script_field_len(script.to_raw().len()) + token
}

/// Virtual size of the signed transaction spending `inputs` into `outputs`.
///
/// P2WPKH inputs are assumed to carry a full-size witness, P2PKH inputs a
/// full-size scriptSig.
pub fn estimate_vsize(inputs: &[Prevout], outputs: &[Vout], version: u32) -> usize {
    let mut base = 4 + varint_len(inputs.len() as u64) + varint_len(outputs.len() as u64) + 4;
    let mut witness = 0;
    let mut segwit = false;

    for prevout in inputs {
        base += INPUT_FIXED_BYTES;
        if prevout.script.as_p2wpkh().is_some() {
            base += script_field_len(0);
            witness += P2WPKH_WITNESS_BYTES;
            segwit = true;
        } else if prevout.script.as_p2pkh().is_some() {
            base += script_field_len(P2PKH_SCRIPT_SIG_BYTES);
            witness += 1;
        } else {
            base += script_field_len(0);
            witness += 1;
        }
    }
    for vout in outputs {
        base += output_len(&vout.script, version);
    }

    let weight = if segwit {
        // marker and flag
        base * 4 + 2 + witness
    } else {
        base * 4
    };
    weight.div_ceil(4)
}
