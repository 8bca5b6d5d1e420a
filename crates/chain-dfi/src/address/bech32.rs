//! Bech32 witness v0 addresses: `hrp ‖ '1' ‖ data ‖ checksum`.

use bitcoin::bech32::{segwit, Hrp};

use super::Validation;
use crate::error::DfiError;

const CHARSET: &str = "qpzry9x8gf2tvdw0s3jn54khce6mua7l";
const SEPARATOR: char = '1';
/// Witness version 0 encodes as the first data character.
const WITNESS_V0_CHAR: char = 'q';

/// Characters after the separator for a v0 program of `program_len` bytes:
/// version, 5-bit groups of the program, then the 6-character checksum.
fn data_part_len(program_len: usize) -> usize {
    1 + (program_len * 8).div_ceil(5) + 6
}

pub(super) fn encode(hrp: &str, program: &[u8]) -> Result<String, DfiError> {
    let hrp = Hrp::parse(hrp)
        .map_err(|e| DfiError::InvalidNetwork(format!("invalid bech32 hrp {hrp:?}: {e}")))?;
    segwit::encode_v0(hrp, program)
        .map_err(|e| DfiError::Format(format!("bech32 encode failed: {e}")))
}

/// Human-readable part, lowercased, if the string has a separator.
pub(super) fn hrp_of(s: &str) -> Option<String> {
    s.rfind(SEPARATOR).map(|pos| s[..pos].to_lowercase())
}

/// Run the six bech32 validators for a v0 program of `program_len` bytes.
pub(super) fn validate(hrp: &str, program_len: usize, s: &str) -> Validation {
    let mut validation = Validation::default();
    let split = s.rfind(SEPARATOR);

    let mixed_case = s.chars().any(|c| c.is_ascii_lowercase())
        && s.chars().any(|c| c.is_ascii_uppercase());
    let charset_ok = match split {
        Some(pos) if pos > 0 && s.is_ascii() && !mixed_case => {
            let lower = s.to_lowercase();
            lower[..pos].chars().all(|c| ('!'..='~').contains(&c))
                && lower[pos + 1..].chars().all(|c| CHARSET.contains(c))
        }
        _ => false,
    };
    validation.check_charset(charset_ok);

    validation.check_prefix(hrp_of(s).as_deref() == Some(hrp));

    let decoded = segwit::decode(s).ok();
    validation.check_checksum(decoded.is_some());

    let data_part = split.map(|pos| s[pos + 1..].to_lowercase()).unwrap_or_default();
    validation.check(data_part.starts_with(WITNESS_V0_CHAR));

    validation.check(s.len() == hrp.len() + 1 + data_part_len(program_len));

    let program = decoded
        .filter(|(_, version, _)| version.to_u8() == 0)
        .map(|(_, _, program)| program)
        .unwrap_or_default();
    validation.check(program.len() == program_len);

    if validation.is_valid() {
        validation.payload = program;
    }
    validation
}
