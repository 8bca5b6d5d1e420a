use crate::composer::{write_varint, write_vec, Decode, Encode, Reader};
use crate::error::DfiError;
use crate::script::Script;

use super::ScriptBalances;

/// Add two tokens to a liquidity pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolAddLiquidity {
    pub from: Vec<ScriptBalances>,
    pub share_address: Script,
}

impl PoolAddLiquidity {
    pub const KIND: u8 = b'l';
}

impl Encode for PoolAddLiquidity {
    fn encode(&self, buf: &mut Vec<u8>) {
        write_vec(buf, &self.from);
        self.share_address.encode(buf);
    }
}

impl Decode for PoolAddLiquidity {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, DfiError> {
        Ok(Self {
            from: reader.read_vec()?,
            share_address: Script::decode(reader)?,
        })
    }
}

/// Redeem pool shares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolRemoveLiquidity {
    pub script: Script,
    pub token_id: u32,
    pub amount: i64,
}

impl PoolRemoveLiquidity {
    pub const KIND: u8 = b'r';
}

impl Encode for PoolRemoveLiquidity {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.script.encode(buf);
        write_varint(buf, self.token_id as u64);
        buf.extend_from_slice(&self.amount.to_le_bytes());
    }
}

impl Decode for PoolRemoveLiquidity {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, DfiError> {
        Ok(Self {
            script: Script::decode(reader)?,
            token_id: read_token_id(reader)?,
            amount: reader.read_i64_le()?,
        })
    }
}

/// Price limit as an integer part and a 1e-8 fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxPrice {
    pub integer: i64,
    pub fraction: i64,
}

impl MaxPrice {
    /// No effective limit.
    pub const UNBOUNDED: MaxPrice = MaxPrice {
        integer: i64::MAX,
        fraction: i64::MAX,
    };
}

/// Swap one token for another through a pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSwap {
    pub from_script: Script,
    pub from_token_id: u32,
    pub from_amount: i64,
    pub to_script: Script,
    pub to_token_id: u32,
    pub max_price: MaxPrice,
}

impl PoolSwap {
    pub const KIND: u8 = b's';
}

impl Encode for PoolSwap {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.from_script.encode(buf);
        write_varint(buf, self.from_token_id as u64);
        buf.extend_from_slice(&self.from_amount.to_le_bytes());
        self.to_script.encode(buf);
        write_varint(buf, self.to_token_id as u64);
        buf.extend_from_slice(&self.max_price.integer.to_le_bytes());
        buf.extend_from_slice(&self.max_price.fraction.to_le_bytes());
    }
}

impl Decode for PoolSwap {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, DfiError> {
        Ok(Self {
            from_script: Script::decode(reader)?,
            from_token_id: read_token_id(reader)?,
            from_amount: reader.read_i64_le()?,
            to_script: Script::decode(reader)?,
            to_token_id: read_token_id(reader)?,
            max_price: MaxPrice {
                integer: reader.read_i64_le()?,
                fraction: reader.read_i64_le()?,
            },
        })
    }
}

fn read_token_id(reader: &mut Reader<'_>) -> Result<u32, DfiError> {
    let id = reader.read_varint()?;
    u32::try_from(id).map_err(|_| DfiError::Format(format!("token id {id} exceeds u32")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dftx::{DfTx, TokenBalance};

    #[test]
    fn add_liquidity_body() {
        let msg = PoolAddLiquidity {
            from: vec![ScriptBalances {
                script: Script::p2wpkh(&[0x01; 20]),
                balances: vec![
                    TokenBalance {
                        token: 0,
                        amount: 10,
                    },
                    TokenBalance {
                        token: 1,
                        amount: 20,
                    },
                ],
            }],
            share_address: Script::p2wpkh(&[0x02; 20]),
        };
        let bytes = msg.to_bytes();
        assert_eq!(bytes[0], 0x01);
        assert_eq!(bytes.len(), 1 + 23 + 1 + 2 * 12 + 23);
        assert_eq!(PoolAddLiquidity::from_bytes(&bytes).unwrap(), msg);
    }

    #[test]
    fn remove_liquidity_uses_varint_token() {
        let msg = PoolRemoveLiquidity {
            script: Script::empty(),
            token_id: 300,
            amount: 5,
        };
        assert_eq!(msg.to_hex(), "00fd2c010500000000000000");
    }

    #[test]
    fn swap_roundtrip_through_payload() {
        let msg = PoolSwap {
            from_script: Script::p2wpkh(&[0x01; 20]),
            from_token_id: 0,
            from_amount: 1_000,
            to_script: Script::p2wpkh(&[0x02; 20]),
            to_token_id: 1,
            max_price: MaxPrice::UNBOUNDED,
        };
        let payload = DfTx::PoolSwap(msg.clone()).to_payload();
        assert_eq!(payload[4], b's');
        assert_eq!(DfTx::from_payload(&payload).unwrap(), DfTx::PoolSwap(msg));
    }

    #[test]
    fn oversized_token_id_rejected() {
        let mut bytes = vec![0x00];
        bytes.push(0xff);
        bytes.extend_from_slice(&(u32::MAX as u64 + 1).to_le_bytes());
        bytes.extend_from_slice(&0i64.to_le_bytes());
        assert!(PoolRemoveLiquidity::from_bytes(&bytes).unwrap_err().is_format());
    }
}
