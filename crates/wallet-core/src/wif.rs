//! Wallet Import Format for compressed-key secrets.
//!
//! Layout before Base58Check: network WIF prefix, 32-byte secret, `0x01`.

use chain_dfi::network::Network;
use crypto_utils::zeroizing::{SecretKeyBytes, ZeroizingString};
use zeroize::Zeroize;

use crate::error::WalletError;

const COMPRESSED_FLAG: u8 = 0x01;

pub fn encode(network: Network, secret: &SecretKeyBytes) -> ZeroizingString {
    let mut payload = Vec::with_capacity(34);
    payload.push(network.wif_prefix);
    payload.extend_from_slice(secret.as_bytes());
    payload.push(COMPRESSED_FLAG);
    let encoded = bs58::encode(&payload).with_check().into_string();
    payload.zeroize();
    ZeroizingString::new(encoded)
}

/// Decode a WIF string, returning its prefix byte and secret.
pub fn decode_any(wif: &str) -> Result<(u8, SecretKeyBytes), WalletError> {
    let mut payload = bs58::decode(wif)
        .with_check(None)
        .into_vec()
        .map_err(|e| WalletError::InvalidWif(e.to_string()))?;
    let result = match payload.as_slice() {
        [prefix, secret @ .., COMPRESSED_FLAG] if secret.len() == 32 => {
            SecretKeyBytes::from_slice(secret)
                .map(|secret| (*prefix, secret))
                .map_err(WalletError::from)
        }
        _ => Err(WalletError::InvalidWif(format!(
            "expected 34 bytes with compressed flag, got {}",
            payload.len()
        ))),
    };
    payload.zeroize();
    result
}

/// Decode a WIF string that must belong to `network`.
pub fn decode(network: Network, wif: &str) -> Result<SecretKeyBytes, WalletError> {
    let (prefix, secret) = decode_any(wif)?;
    if prefix != network.wif_prefix {
        return Err(WalletError::PrefixMismatch {
            expected: network.wif_prefix,
            actual: prefix,
        });
    }
    Ok(secret)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chain_dfi::network::{MAINNET, REGTEST, TESTNET};

    const REGTEST_WIF: &str = "cQSsfYvYkK5tx3u1ByK2ywTTc9xJrREc1dd67ZrJqJUEMwgktPWN";

    #[test]
    fn decode_then_encode_is_identity() {
        let secret = decode(REGTEST, REGTEST_WIF).unwrap();
        assert_eq!(&*encode(REGTEST, &secret), REGTEST_WIF);
    }

    #[test]
    fn testnet_and_regtest_share_prefix() {
        assert!(decode(TESTNET, REGTEST_WIF).is_ok());
    }

    #[test]
    fn wrong_network_prefix_rejected() {
        let err = decode(MAINNET, REGTEST_WIF).unwrap_err();
        assert!(matches!(
            err,
            WalletError::PrefixMismatch {
                expected: 0x80,
                actual: 0xef
            }
        ));
    }

    #[test]
    fn mainnet_encoding_starts_with_k_or_l() {
        let wif = encode(MAINNET, &SecretKeyBytes::new([0x01; 32]));
        assert!(wif.starts_with('K') || wif.starts_with('L'));
        let (prefix, secret) = decode_any(&wif).unwrap();
        assert_eq!(prefix, 0x80);
        assert_eq!(secret.as_bytes(), &[0x01; 32]);
    }

    #[test]
    fn corrupted_checksum_rejected() {
        let mut corrupted = REGTEST_WIF.to_string();
        corrupted.pop();
        corrupted.push('M');
        assert!(matches!(
            decode_any(&corrupted),
            Err(WalletError::InvalidWif(_))
        ));
    }

    #[test]
    fn uncompressed_form_rejected() {
        let mut payload = vec![0x80];
        payload.extend_from_slice(&[0x01; 32]);
        let wif = bs58::encode(&payload).with_check().into_string();
        assert!(matches!(decode_any(&wif), Err(WalletError::InvalidWif(_))));
    }
}
