use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::DfiError;

/// Address and key prefixes for one DeFi chain network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Network {
    pub name: &'static str,
    pub bech32_hrp: &'static str,
    pub p2pkh_prefix: u8,
    pub p2sh_prefix: u8,
    pub wif_prefix: u8,
    pub bip32_public_prefix: u32,
    pub bip32_private_prefix: u32,
    pub message_prefix: &'static str,
}

const MESSAGE_PREFIX: &str = "\x15Defi Signed Message:\n";

pub const MAINNET: Network = Network {
    name: "mainnet",
    bech32_hrp: "df",
    p2pkh_prefix: 0x12,
    p2sh_prefix: 0x5a,
    wif_prefix: 0x80,
    bip32_public_prefix: 0x0488_b21e,
    bip32_private_prefix: 0x0488_ade4,
    message_prefix: MESSAGE_PREFIX,
};

pub const TESTNET: Network = Network {
    name: "testnet",
    bech32_hrp: "tf",
    p2pkh_prefix: 0x0f,
    p2sh_prefix: 0x80,
    wif_prefix: 0xef,
    bip32_public_prefix: 0x0435_87cf,
    bip32_private_prefix: 0x0435_8394,
    message_prefix: MESSAGE_PREFIX,
};

pub const REGTEST: Network = Network {
    name: "regtest",
    bech32_hrp: "bcrt",
    p2pkh_prefix: 0x6f,
    p2sh_prefix: 0xc4,
    wif_prefix: 0xef,
    bip32_public_prefix: 0x0435_87cf,
    bip32_private_prefix: 0x0435_8394,
    message_prefix: MESSAGE_PREFIX,
};

/// Every published network, in lookup order.
pub const ALL_NETWORKS: [Network; 3] = [MAINNET, TESTNET, REGTEST];

/// Supported DeFi chain networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DfiNetwork {
    Mainnet,
    Testnet,
    Regtest,
}

impl DfiNetwork {
    /// Parameter record for this network.
    pub fn params(self) -> Network {
        match self {
            DfiNetwork::Mainnet => MAINNET,
            DfiNetwork::Testnet => TESTNET,
            DfiNetwork::Regtest => REGTEST,
        }
    }
}

impl fmt::Display for DfiNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.params().name)
    }
}

impl FromStr for DfiNetwork {
    type Err = DfiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet" => Ok(DfiNetwork::Mainnet),
            "testnet" => Ok(DfiNetwork::Testnet),
            "regtest" => Ok(DfiNetwork::Regtest),
            other => Err(DfiError::InvalidNetwork(other.to_string())),
        }
    }
}

/// Look up a published network by name.
pub fn network_by_name(name: &str) -> Result<Network, DfiError> {
    name.parse::<DfiNetwork>().map(DfiNetwork::params)
}
