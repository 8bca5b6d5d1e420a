//! DeFi chain address codec.
//!
//! Base58Check covers P2PKH and P2SH, bech32 witness v0 covers P2WPKH and
//! P2WSH. Each format runs a fixed list of validators; an address is valid
//! only when every validator passes. The count of passed validators is kept
//! for diagnostics.

mod base58;
mod bech32;

use std::fmt;

use crate::error::DfiError;
use crate::network::{Network, ALL_NETWORKS, MAINNET};
use crate::script::Script;

/// Recognised address kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressType {
    P2PKH,
    P2SH,
    P2WPKH,
    P2WSH,
    Unknown,
}

impl AddressType {
    /// Payload length the type carries, `None` for `Unknown`.
    pub fn payload_len(self) -> Option<usize> {
        match self {
            AddressType::P2PKH | AddressType::P2SH | AddressType::P2WPKH => Some(20),
            AddressType::P2WSH => Some(32),
            AddressType::Unknown => None,
        }
    }
}

impl fmt::Display for AddressType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AddressType::P2PKH => "P2PKH",
            AddressType::P2SH => "P2SH",
            AddressType::P2WPKH => "P2WPKH",
            AddressType::P2WSH => "P2WSH",
            AddressType::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Order in which a string is tried against a network.
const DECODE_ORDER: [AddressType; 4] = [
    AddressType::P2WPKH,
    AddressType::P2WSH,
    AddressType::P2PKH,
    AddressType::P2SH,
];

/// Why an address string did not validate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failure {
    Checksum,
    /// Well formed, but the version byte or hrp names another network or type.
    Prefix,
    Malformed,
}

/// Tally of validator outcomes for one address format.
#[derive(Debug, Default)]
struct Validation {
    passed: usize,
    failed: usize,
    charset_failed: bool,
    checksum_failed: bool,
    prefix_failed: bool,
    payload: Vec<u8>,
}

impl Validation {
    fn check(&mut self, ok: bool) {
        if ok {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
    }

    fn check_charset(&mut self, ok: bool) {
        self.charset_failed = !ok;
        self.check(ok);
    }

    fn check_checksum(&mut self, ok: bool) {
        self.checksum_failed = !ok;
        self.check(ok);
    }

    fn check_prefix(&mut self, ok: bool) {
        self.prefix_failed = !ok;
        self.check(ok);
    }

    fn failure(&self) -> Option<Failure> {
        if self.is_valid() {
            None
        } else if self.checksum_failed && !self.charset_failed {
            Some(Failure::Checksum)
        } else if self.prefix_failed && self.failed == 1 {
            Some(Failure::Prefix)
        } else {
            Some(Failure::Malformed)
        }
    }

    fn passed(&self) -> usize {
        self.passed
    }

    fn is_valid(&self) -> bool {
        self.failed == 0 && self.passed > 0
    }
}

/// A decoded or freshly encoded address. Immutable; validity is decided at
/// construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    network: Network,
    address: String,
    address_type: AddressType,
    payload: Vec<u8>,
    valid: bool,
    validators_passed: usize,
    failure: Option<Failure>,
}

impl Address {
    /// Encode `payload` as an address of the given type on `network`.
    pub fn encode(
        network: Network,
        address_type: AddressType,
        payload: &[u8],
    ) -> Result<Address, DfiError> {
        if let Some(expected) = address_type.payload_len() {
            if payload.len() != expected {
                return Err(DfiError::Format(format!(
                    "invalid data length: {address_type} needs {expected} bytes, got {}",
                    payload.len()
                )));
            }
        }
        let address = match address_type {
            AddressType::P2PKH => base58::encode(network.p2pkh_prefix, payload),
            AddressType::P2SH => base58::encode(network.p2sh_prefix, payload),
            AddressType::P2WPKH | AddressType::P2WSH => {
                bech32::encode(network.bech32_hrp, payload)?
            }
            AddressType::Unknown => {
                return Err(DfiError::InvalidAddress(
                    "cannot encode an Unknown address".into(),
                ))
            }
        };
        Ok(Self::decode_as(network, address_type, &address))
    }

    /// Decode `s` on `network`, returning the first type that fully
    /// validates, or an invalid `Unknown` address. An invalid result keeps
    /// the failure of the type that came closest.
    pub fn decode(network: Network, s: &str) -> Address {
        let mut closest: Option<Address> = None;
        for &address_type in &DECODE_ORDER {
            let address = Self::decode_as(network, address_type, s);
            if address.valid {
                return address;
            }
            if closest
                .as_ref()
                .map_or(true, |best| address.validators_passed > best.validators_passed)
            {
                closest = Some(address);
            }
        }
        let mut unknown = Self::unknown(network, s);
        unknown.failure = closest.and_then(|address| address.failure).or(unknown.failure);
        unknown
    }

    /// Validate `s` as one specific type on `network`. The result keeps the
    /// requested type even when invalid.
    pub fn decode_as(network: Network, address_type: AddressType, s: &str) -> Address {
        let validation = match address_type {
            AddressType::P2PKH => base58::validate(network.p2pkh_prefix, s),
            AddressType::P2SH => base58::validate(network.p2sh_prefix, s),
            AddressType::P2WPKH => bech32::validate(network.bech32_hrp, 20, s),
            AddressType::P2WSH => bech32::validate(network.bech32_hrp, 32, s),
            AddressType::Unknown => return Self::unknown(network, s),
        };
        Address {
            network,
            address: s.to_string(),
            address_type,
            valid: validation.is_valid(),
            validators_passed: validation.passed(),
            failure: validation.failure(),
            payload: validation.payload,
        }
    }

    /// Best-effort detection of network and type from the string alone.
    pub fn guess(s: &str) -> Address {
        if let Some(hrp) = bech32::hrp_of(s) {
            if let Some(network) = ALL_NETWORKS.iter().find(|n| n.bech32_hrp == hrp) {
                let address = Self::decode(*network, s);
                if address.valid {
                    return address;
                }
            }
        }

        if let Some(version) = base58::version_byte(s) {
            let candidates = ALL_NETWORKS
                .iter()
                .filter(|n| n.p2pkh_prefix == version || n.p2sh_prefix == version);
            for network in candidates {
                let address = Self::decode(*network, s);
                if address.valid {
                    return address;
                }
            }
        }

        ALL_NETWORKS
            .iter()
            .map(|network| Self::decode(*network, s))
            .find(|address| address.valid)
            .unwrap_or_else(|| Self::decode(MAINNET, s))
    }

    /// Map a standard locking script back to its address.
    pub fn from_script(network: Network, script: &Script) -> Option<Address> {
        let (address_type, payload) = if let Some(hash) = script.as_p2pkh() {
            (AddressType::P2PKH, hash.to_vec())
        } else if let Some(hash) = script.as_p2sh() {
            (AddressType::P2SH, hash.to_vec())
        } else if let Some(hash) = script.as_p2wpkh() {
            (AddressType::P2WPKH, hash.to_vec())
        } else if let Some(hash) = script.as_p2wsh() {
            (AddressType::P2WSH, hash.to_vec())
        } else {
            return None;
        };
        Self::encode(network, address_type, &payload).ok()
    }

    fn unknown(network: Network, s: &str) -> Address {
        Address {
            network,
            address: s.to_string(),
            address_type: AddressType::Unknown,
            payload: Vec::new(),
            valid: false,
            validators_passed: 0,
            failure: Some(Failure::Malformed),
        }
    }

    /// Locking script paying to this address.
    ///
    /// Fails with `Checksum` or `PrefixMismatch` when that is why the string
    /// did not validate, `InvalidAddress` otherwise.
    pub fn script(&self) -> Result<Script, DfiError> {
        match self.failure {
            None => {}
            Some(Failure::Checksum) => {
                return Err(DfiError::Checksum(format!(
                    "{} fails its checksum",
                    self.address
                )))
            }
            Some(Failure::Prefix) => {
                return Err(DfiError::PrefixMismatch(format!(
                    "{} is not an address on {}",
                    self.address, self.network.name
                )))
            }
            Some(Failure::Malformed) => {
                return Err(DfiError::InvalidAddress(format!(
                    "{} is not a valid {} address on {}",
                    self.address, self.address_type, self.network.name
                )))
            }
        }
        match self.address_type {
            AddressType::P2PKH => Ok(Script::p2pkh(&self.payload_array()?)),
            AddressType::P2SH => Ok(Script::p2sh(&self.payload_array()?)),
            AddressType::P2WPKH => Ok(Script::p2wpkh(&self.payload_array()?)),
            AddressType::P2WSH => Ok(Script::p2wsh(&self.payload_array()?)),
            AddressType::Unknown => Err(DfiError::InvalidAddress(self.address.clone())),
        }
    }

    fn payload_array<const N: usize>(&self) -> Result<[u8; N], DfiError> {
        self.payload.as_slice().try_into().map_err(|_| {
            DfiError::InvalidAddress(format!(
                "{} payload is {} bytes, expected {N}",
                self.address,
                self.payload.len()
            ))
        })
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn as_str(&self) -> &str {
        &self.address
    }

    pub fn address_type(&self) -> AddressType {
        self.address_type
    }

    /// Decoded hash; empty unless the address is valid.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn validators_passed(&self) -> usize {
        self.validators_passed
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{REGTEST, TESTNET};
    use crate::script::{Op, Opcode};

    const HASH_HEX: &str = "0e7c0ab18b305bc987a266dc06de26fcfab4b56a";
    const DF_P2WPKH: &str = "df1qpe7q4vvtxpdunpazvmwqdh3xlnatfdt2xr8mpv";
    const TF_P2WPKH: &str = "tf1qpe7q4vvtxpdunpazvmwqdh3xlnatfdt24nagpg";
    const BCRT_P2WPKH: &str = "bcrt1qpe7q4vvtxpdunpazvmwqdh3xlnatfdt2xghtpf";
    const MAINNET_P2SH: &str = "dFFPENo7FPMJpDV6fUcfo4QfkZrfrV1Uf8";
    const TESTNET_P2SH: &str = "trsUzSh3Qcu1MURY1BKDjttJN6hxtoRxM2";

    fn hash() -> Vec<u8> {
        hex::decode(HASH_HEX).unwrap()
    }

    fn dummy_network() -> Network {
        Network {
            name: "dummy",
            bech32_hrp: "dummy",
            p2pkh_prefix: 0x12,
            p2sh_prefix: 0x00,
            wif_prefix: 0x00,
            bip32_public_prefix: 0,
            bip32_private_prefix: 0,
            message_prefix: "\x00Dummy Msg Prefix:\n",
        }
    }

    #[test]
    fn encode_p2wpkh_per_network() {
        for (network, expected) in [
            (MAINNET, DF_P2WPKH),
            (TESTNET, TF_P2WPKH),
            (REGTEST, BCRT_P2WPKH),
        ] {
            let address = Address::encode(network, AddressType::P2WPKH, &hash()).unwrap();
            assert_eq!(address.as_str(), expected);
            assert!(address.is_valid());
            assert_eq!(address.validators_passed(), 6);
        }
    }

    #[test]
    fn encode_known_bech32_vector() {
        let network = Network {
            name: "bitcoin",
            bech32_hrp: "bc",
            ..MAINNET
        };
        let payload = hex::decode("751e76e8199196d454941c45d1b3a323f1433bd6").unwrap();
        let address = Address::encode(network, AddressType::P2WPKH, &payload).unwrap();
        assert_eq!(
            address.as_str(),
            "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4"
        );
    }

    #[test]
    fn decode_p2wpkh() {
        let address = Address::decode(MAINNET, DF_P2WPKH);
        assert!(address.is_valid());
        assert_eq!(address.address_type(), AddressType::P2WPKH);
        assert_eq!(address.payload(), hash().as_slice());
    }

    #[test]
    fn decode_rejects_other_network() {
        let address = Address::decode(TESTNET, DF_P2WPKH);
        assert!(!address.is_valid());
        assert_eq!(address.address_type(), AddressType::Unknown);
        assert_eq!(address.validators_passed(), 0);
        assert_eq!(address.network(), TESTNET);
    }

    #[test]
    fn decode_p2sh_fixtures() {
        let mainnet = Address::decode(MAINNET, MAINNET_P2SH);
        assert!(mainnet.is_valid());
        assert_eq!(mainnet.address_type(), AddressType::P2SH);

        let testnet = Address::decode(TESTNET, TESTNET_P2SH);
        assert!(testnet.is_valid());
        assert_eq!(testnet.address_type(), AddressType::P2SH);
    }

    #[test]
    fn p2sh_passes_five_validators() {
        let address = Address::decode_as(MAINNET, AddressType::P2SH, MAINNET_P2SH);
        assert!(address.is_valid());
        assert_eq!(address.validators_passed(), 5);
    }

    #[test]
    fn invalid_p2sh_variants() {
        assert!(!Address::decode(MAINNET, "FFPENo7FPMJpDV6fUcfo4QfkZrfrV1Uf8").is_valid());
        assert!(!Address::decode(MAINNET, "dFFPENo7FPMJpDV6fUcfo4QfkZrfrV1Uf").is_valid());
        assert!(!Address::decode(TESTNET, MAINNET_P2SH).is_valid());
    }

    #[test]
    fn custom_network_base58() {
        let network = dummy_network();
        let valid = Address::decode_as(network, AddressType::P2PKH, "8JBuS81VT8ouPrT6YS55qoS74D13Cw7h1Y");
        assert!(valid.is_valid());

        let wrong_prefix = Address::decode_as(network, AddressType::P2PKH, MAINNET_P2SH);
        assert!(!wrong_prefix.is_valid());

        let garbage = Address::decode_as(network, AddressType::P2PKH, "invalid b58 address");
        assert!(!garbage.is_valid());
    }

    #[test]
    fn encode_rejects_wrong_payload_length() {
        let err = Address::encode(MAINNET, AddressType::P2SH, &[0u8; 19]).unwrap_err();
        assert!(err.is_format());
        let err = Address::encode(MAINNET, AddressType::P2WSH, &[0u8; 20]).unwrap_err();
        assert!(err.is_format());
        assert!(Address::encode(MAINNET, AddressType::Unknown, &[]).is_err());
    }

    #[test]
    fn guess_detects_network_and_type() {
        let p2sh = Address::guess(MAINNET_P2SH);
        assert!(p2sh.is_valid());
        assert_eq!(p2sh.address_type(), AddressType::P2SH);
        assert_eq!(p2sh.network(), MAINNET);

        let regtest = Address::guess(BCRT_P2WPKH);
        assert!(regtest.is_valid());
        assert_eq!(regtest.address_type(), AddressType::P2WPKH);
        assert_eq!(regtest.network(), REGTEST);

        let testnet = Address::guess(TESTNET_P2SH);
        assert_eq!(testnet.network(), TESTNET);
    }

    #[test]
    fn guess_unknown() {
        let address = Address::guess("definitely not an address");
        assert!(!address.is_valid());
        assert_eq!(address.address_type(), AddressType::Unknown);
    }

    #[test]
    fn script_from_valid_p2sh() {
        let address = Address::decode(MAINNET, MAINNET_P2SH);
        let script = address.script().unwrap();
        assert_eq!(script.len(), 3);
        assert_eq!(script.ops()[0], Opcode::Op(Op::Hash160));
        assert!(matches!(script.ops()[1], Opcode::PushData(_)));
        assert_eq!(script.ops()[2], Opcode::Op(Op::Equal));
    }

    #[test]
    fn script_from_garbage_is_invalid_address() {
        let address = Address::decode(MAINNET, "definitely not an address");
        assert!(matches!(
            address.script(),
            Err(DfiError::InvalidAddress(_))
        ));
    }

    #[test]
    fn script_reports_prefix_mismatch() {
        for (network, s) in [(TESTNET, MAINNET_P2SH), (TESTNET, DF_P2WPKH), (MAINNET, TF_P2WPKH)] {
            assert!(
                matches!(Address::decode(network, s).script(), Err(DfiError::PrefixMismatch(_))),
                "{s} on {}",
                network.name
            );
        }
        let p2sh_as_testnet = Address::decode_as(TESTNET, AddressType::P2SH, MAINNET_P2SH);
        assert!(matches!(
            p2sh_as_testnet.script(),
            Err(DfiError::PrefixMismatch(_))
        ));
    }

    #[test]
    fn script_reports_checksum_failure() {
        for s in [
            "dFFPENo7FPMJpDV6fUcfo4QfkZrfrV1Uf9",
            "df1qpe7q4vvtxpdunpazvmwqdh3xlnatfdt2xr8mpw",
        ] {
            assert!(
                matches!(Address::decode(MAINNET, s).script(), Err(DfiError::Checksum(_))),
                "{s}"
            );
        }
    }

    /// Every copy of `valid` with one character swapped for another from
    /// `alphabet`.
    fn substitutions<'a>(valid: &'a str, alphabet: &'a str) -> impl Iterator<Item = String> + 'a {
        valid.char_indices().flat_map(move |(i, original)| {
            alphabet.chars().filter(move |&c| c != original).map(move |c| {
                let mut changed = valid.to_string();
                changed.replace_range(i..i + original.len_utf8(), c.encode_utf8(&mut [0; 4]));
                changed
            })
        })
    }

    #[test]
    fn any_base58_substitution_is_detected() {
        const BASE58: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";
        assert!(Address::decode(MAINNET, MAINNET_P2SH).is_valid());
        for changed in substitutions(MAINNET_P2SH, BASE58) {
            assert!(!Address::decode(MAINNET, &changed).is_valid(), "{changed}");
        }
    }

    #[test]
    fn any_bech32_substitution_is_detected() {
        const BECH32: &str = "qpzry9x8gf2tvdw0s3jn54khce6mua7l";
        assert!(Address::decode(MAINNET, DF_P2WPKH).is_valid());
        for changed in substitutions(DF_P2WPKH, BECH32) {
            assert!(!Address::decode(MAINNET, &changed).is_valid(), "{changed}");
        }
    }

    #[test]
    fn from_script_roundtrip() {
        for address_type in [
            AddressType::P2PKH,
            AddressType::P2SH,
            AddressType::P2WPKH,
        ] {
            let address = Address::encode(REGTEST, address_type, &hash()).unwrap();
            let script = address.script().unwrap();
            let back = Address::from_script(REGTEST, &script).unwrap();
            assert_eq!(back, address);
        }

        let p2wsh = Address::encode(REGTEST, AddressType::P2WSH, &[0x42; 32]).unwrap();
        assert!(p2wsh.is_valid());
        let back = Address::from_script(REGTEST, &p2wsh.script().unwrap()).unwrap();
        assert_eq!(back.address_type(), AddressType::P2WSH);

        assert!(Address::from_script(REGTEST, &Script::empty()).is_none());
    }
}
