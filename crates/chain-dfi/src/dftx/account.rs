use crate::composer::{write_vec, Decode, Encode, Reader};
use crate::error::DfiError;
use crate::script::Script;

use super::{ScriptBalances, TokenBalance};

/// Move token balances from one account to others.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountToAccount {
    pub from: Script,
    pub to: Vec<ScriptBalances>,
}

impl AccountToAccount {
    pub const KIND: u8 = b'B';
}

impl Encode for AccountToAccount {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.from.encode(buf);
        write_vec(buf, &self.to);
    }
}

impl Decode for AccountToAccount {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, DfiError> {
        Ok(Self {
            from: Script::decode(reader)?,
            to: reader.read_vec()?,
        })
    }
}

/// Convert UTXO value into account token balances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtxosToAccount {
    pub to: Vec<ScriptBalances>,
}

impl UtxosToAccount {
    pub const KIND: u8 = b'U';

    /// Sum of every converted amount; the value the carrying output must hold.
    /// `None` on overflow.
    pub fn total_amount(&self) -> Option<i64> {
        self.to
            .iter()
            .flat_map(|entry| entry.balances.iter())
            .try_fold(0i64, |acc, balance| acc.checked_add(balance.amount))
    }
}

impl Encode for UtxosToAccount {
    fn encode(&self, buf: &mut Vec<u8>) {
        write_vec(buf, &self.to);
    }
}

impl Decode for UtxosToAccount {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, DfiError> {
        Ok(Self {
            to: reader.read_vec()?,
        })
    }
}

/// Mint UTXOs out of account balances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountToUtxos {
    pub from: Script,
    pub balances: Vec<TokenBalance>,
    /// Index of the first output minted by this message.
    pub minting_outputs_start: u32,
}

impl AccountToUtxos {
    pub const KIND: u8 = b'b';
}

impl Encode for AccountToUtxos {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.from.encode(buf);
        write_vec(buf, &self.balances);
        buf.extend_from_slice(&self.minting_outputs_start.to_le_bytes());
    }
}

impl Decode for AccountToUtxos {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, DfiError> {
        Ok(Self {
            from: Script::decode(reader)?,
            balances: reader.read_vec()?,
            minting_outputs_start: reader.read_u32_le()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dftx::DfTx;

    fn p2wpkh(fill: u8) -> Script {
        Script::p2wpkh(&[fill; 20])
    }

    #[test]
    fn account_to_account_body() {
        let msg = AccountToAccount {
            from: p2wpkh(0x01),
            to: vec![ScriptBalances {
                script: p2wpkh(0x02),
                balances: vec![TokenBalance {
                    token: 0,
                    amount: 1,
                }],
            }],
        };
        let bytes = msg.to_bytes();
        // from: 0x16 len + OP_0 + push20
        assert_eq!(&bytes[..3], &[0x16, 0x00, 0x14]);
        // one destination
        assert_eq!(bytes[23], 0x01);
        assert_eq!(AccountToAccount::from_bytes(&bytes).unwrap(), msg);
    }

    #[test]
    fn utxos_to_account_total() {
        let msg = UtxosToAccount {
            to: vec![
                ScriptBalances {
                    script: p2wpkh(0x01),
                    balances: vec![TokenBalance {
                        token: 0,
                        amount: 150,
                    }],
                },
                ScriptBalances {
                    script: p2wpkh(0x02),
                    balances: vec![TokenBalance {
                        token: 0,
                        amount: 50,
                    }],
                },
            ],
        };
        assert_eq!(msg.total_amount(), Some(200));
        let payload = DfTx::UtxosToAccount(msg.clone()).to_payload();
        assert_eq!(
            DfTx::from_payload(&payload).unwrap(),
            DfTx::UtxosToAccount(msg)
        );
    }

    #[test]
    fn account_to_utxos_trailing_start_index() {
        let msg = AccountToUtxos {
            from: p2wpkh(0x03),
            balances: vec![TokenBalance {
                token: 0,
                amount: 10,
            }],
            minting_outputs_start: 2,
        };
        let bytes = msg.to_bytes();
        assert_eq!(&bytes[bytes.len() - 4..], &[0x02, 0x00, 0x00, 0x00]);
        assert_eq!(AccountToUtxos::from_bytes(&bytes).unwrap(), msg);
    }

    #[test]
    fn truncated_body_rejected() {
        let bytes = AccountToUtxos {
            from: p2wpkh(0x03),
            balances: vec![],
            minting_outputs_start: 0,
        }
        .to_bytes();
        let err = AccountToUtxos::from_bytes(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(err, DfiError::TruncatedInput { .. }));
    }
}
