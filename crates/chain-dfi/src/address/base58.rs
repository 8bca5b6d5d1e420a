//! Base58Check addresses: `version ‖ hash160 ‖ checksum[4]`.

use super::Validation;

const ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";
const CHECKSUM_LEN: usize = 4;
const DECODED_LEN: usize = 21;
const DATA_LEN: usize = 20;

pub(super) fn encode(prefix: u8, hash: &[u8]) -> String {
    let mut data = Vec::with_capacity(1 + hash.len());
    data.push(prefix);
    data.extend_from_slice(hash);
    bs58::encode(data).with_check().into_string()
}

/// Version byte of a checksummed base58 string, if it decodes at all.
pub(super) fn version_byte(s: &str) -> Option<u8> {
    bs58::decode(s)
        .with_check(None)
        .into_vec()
        .ok()
        .and_then(|decoded| decoded.first().copied())
}

/// Run the five base58 validators against the expected version byte.
pub(super) fn validate(prefix: u8, s: &str) -> Validation {
    let mut validation = Validation::default();

    validation.check_charset(!s.is_empty() && s.chars().all(|c| ALPHABET.contains(c)));

    let checked = bs58::decode(s).with_check(None).into_vec().ok();
    validation.check_checksum(checked.is_some());

    // Structural checks still run when the checksum fails, on the bytes
    // that precede the would-be checksum.
    let decoded = checked.or_else(|| {
        bs58::decode(s).into_vec().ok().and_then(|mut raw| {
            let len = raw.len().checked_sub(CHECKSUM_LEN)?;
            raw.truncate(len);
            Some(raw)
        })
    });
    let decoded = decoded.unwrap_or_default();

    validation.check(decoded.len() == DECODED_LEN);
    validation.check_prefix(decoded.first() == Some(&prefix));
    let data = decoded.get(1..).unwrap_or_default();
    validation.check(data.len() == DATA_LEN);

    if validation.is_valid() {
        validation.payload = data.to_vec();
    }
    validation
}
