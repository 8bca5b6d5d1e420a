//! DeFi custom transactions carried in an `OP_RETURN` output.
//!
//! Payload layout: `"DfTx"` signature, one type byte, then the typed body.

mod account;
mod governance;
mod oracle;
mod pool;

pub use account::{AccountToAccount, AccountToUtxos, UtxosToAccount};
pub use governance::CreateCfp;
pub use oracle::{AppointOracle, CurrencyPair, RemoveOracle};
pub use pool::{MaxPrice, PoolAddLiquidity, PoolRemoveLiquidity, PoolSwap};

use crate::composer::{write_vec, Decode, Encode, Reader};
use crate::error::DfiError;
use crate::script::Script;

/// Leading bytes of every custom transaction payload.
pub const DFTX_SIGNATURE: [u8; 4] = *b"DfTx";

/// Amount of a single token, in 1e-8 units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBalance {
    pub token: u32,
    pub amount: i64,
}

impl Encode for TokenBalance {
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.token.to_le_bytes());
        buf.extend_from_slice(&self.amount.to_le_bytes());
    }
}

impl Decode for TokenBalance {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, DfiError> {
        Ok(Self {
            token: reader.read_u32_le()?,
            amount: reader.read_i64_le()?,
        })
    }
}

/// Token balances owned by one script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptBalances {
    pub script: Script,
    pub balances: Vec<TokenBalance>,
}

impl Encode for ScriptBalances {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.script.encode(buf);
        write_vec(buf, &self.balances);
    }
}

impl Decode for ScriptBalances {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, DfiError> {
        Ok(Self {
            script: Script::decode(reader)?,
            balances: reader.read_vec()?,
        })
    }
}

/// A typed custom transaction message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DfTx {
    AccountToAccount(AccountToAccount),
    UtxosToAccount(UtxosToAccount),
    AccountToUtxos(AccountToUtxos),
    PoolAddLiquidity(PoolAddLiquidity),
    PoolRemoveLiquidity(PoolRemoveLiquidity),
    PoolSwap(PoolSwap),
    AppointOracle(AppointOracle),
    RemoveOracle(RemoveOracle),
    CreateCfp(CreateCfp),
    /// A type byte this crate does not model; the body is kept verbatim.
    Unmapped { kind: u8, body: Vec<u8> },
}

impl DfTx {
    /// The one-byte type discriminator.
    pub fn kind(&self) -> u8 {
        match self {
            DfTx::AccountToAccount(_) => AccountToAccount::KIND,
            DfTx::UtxosToAccount(_) => UtxosToAccount::KIND,
            DfTx::AccountToUtxos(_) => AccountToUtxos::KIND,
            DfTx::PoolAddLiquidity(_) => PoolAddLiquidity::KIND,
            DfTx::PoolRemoveLiquidity(_) => PoolRemoveLiquidity::KIND,
            DfTx::PoolSwap(_) => PoolSwap::KIND,
            DfTx::AppointOracle(_) => AppointOracle::KIND,
            DfTx::RemoveOracle(_) => RemoveOracle::KIND,
            DfTx::CreateCfp(_) => CreateCfp::KIND,
            DfTx::Unmapped { kind, .. } => *kind,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DfTx::AccountToAccount(_) => "ACCOUNT_TO_ACCOUNT",
            DfTx::UtxosToAccount(_) => "UTXOS_TO_ACCOUNT",
            DfTx::AccountToUtxos(_) => "ACCOUNT_TO_UTXOS",
            DfTx::PoolAddLiquidity(_) => "POOL_ADD_LIQUIDITY",
            DfTx::PoolRemoveLiquidity(_) => "POOL_REMOVE_LIQUIDITY",
            DfTx::PoolSwap(_) => "POOL_SWAP",
            DfTx::AppointOracle(_) => "APPOINT_ORACLE",
            DfTx::RemoveOracle(_) => "REMOVE_ORACLE",
            DfTx::CreateCfp(_) => "CREATE_CFP",
            DfTx::Unmapped { .. } => "UNMAPPED",
        }
    }

    /// Signature, type byte and body: the bytes pushed after `OP_RETURN`.
    pub fn to_payload(&self) -> Vec<u8> {
        let mut buf = DFTX_SIGNATURE.to_vec();
        buf.push(self.kind());
        match self {
            DfTx::AccountToAccount(msg) => msg.encode(&mut buf),
            DfTx::UtxosToAccount(msg) => msg.encode(&mut buf),
            DfTx::AccountToUtxos(msg) => msg.encode(&mut buf),
            DfTx::PoolAddLiquidity(msg) => msg.encode(&mut buf),
            DfTx::PoolRemoveLiquidity(msg) => msg.encode(&mut buf),
            DfTx::PoolSwap(msg) => msg.encode(&mut buf),
            DfTx::AppointOracle(msg) => msg.encode(&mut buf),
            DfTx::RemoveOracle(msg) => msg.encode(&mut buf),
            DfTx::CreateCfp(msg) => msg.encode(&mut buf),
            DfTx::Unmapped { body, .. } => buf.extend_from_slice(body),
        }
        buf
    }

    /// Parse a payload produced by [`DfTx::to_payload`].
    pub fn from_payload(payload: &[u8]) -> Result<Self, DfiError> {
        let mut reader = Reader::new(payload);
        let signature: [u8; 4] = reader.read_array()?;
        if signature != DFTX_SIGNATURE {
            return Err(DfiError::Format(format!(
                "missing DfTx signature, found {}",
                hex::encode(signature)
            )));
        }
        let kind = reader.read_u8()?;
        let tx = match kind {
            AccountToAccount::KIND => DfTx::AccountToAccount(AccountToAccount::decode(&mut reader)?),
            UtxosToAccount::KIND => DfTx::UtxosToAccount(UtxosToAccount::decode(&mut reader)?),
            AccountToUtxos::KIND => DfTx::AccountToUtxos(AccountToUtxos::decode(&mut reader)?),
            PoolAddLiquidity::KIND => DfTx::PoolAddLiquidity(PoolAddLiquidity::decode(&mut reader)?),
            PoolRemoveLiquidity::KIND => {
                DfTx::PoolRemoveLiquidity(PoolRemoveLiquidity::decode(&mut reader)?)
            }
            PoolSwap::KIND => DfTx::PoolSwap(PoolSwap::decode(&mut reader)?),
            AppointOracle::KIND => DfTx::AppointOracle(AppointOracle::decode(&mut reader)?),
            RemoveOracle::KIND => DfTx::RemoveOracle(RemoveOracle::decode(&mut reader)?),
            CreateCfp::KIND => DfTx::CreateCfp(CreateCfp::decode(&mut reader)?),
            other => {
                let body = reader.read_bytes(reader.remaining())?.to_vec();
                return Ok(DfTx::Unmapped { kind: other, body });
            }
        };
        reader.finish()?;
        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_balance_layout() {
        let balance = TokenBalance {
            token: 2,
            amount: 100_000_000,
        };
        assert_eq!(balance.to_hex(), "0200000000e1f50500000000");
    }

    #[test]
    fn unmapped_kind_is_preserved() {
        let payload = [b'D', b'f', b'T', b'x', b'Q', 0x01, 0x02, 0x03];
        let tx = DfTx::from_payload(&payload).unwrap();
        assert_eq!(
            tx,
            DfTx::Unmapped {
                kind: b'Q',
                body: vec![0x01, 0x02, 0x03]
            }
        );
        assert_eq!(tx.to_payload(), payload.to_vec());
    }

    #[test]
    fn missing_signature_rejected() {
        let err = DfTx::from_payload(b"DfTy\x42").unwrap_err();
        assert!(err.is_format());
    }

    #[test]
    fn known_kind_with_trailing_bytes_rejected() {
        let mut payload = DfTx::RemoveOracle(RemoveOracle {
            oracle_id: [0x11; 32],
        })
        .to_payload();
        payload.push(0x00);
        assert!(DfTx::from_payload(&payload).unwrap_err().is_format());
    }

    #[test]
    fn kind_bytes() {
        let script = Script::empty();
        assert_eq!(
            DfTx::UtxosToAccount(UtxosToAccount { to: vec![] }).kind(),
            b'U'
        );
        assert_eq!(
            DfTx::RemoveOracle(RemoveOracle { oracle_id: [0; 32] }).kind(),
            b'h'
        );
        assert_eq!(
            DfTx::PoolRemoveLiquidity(PoolRemoveLiquidity {
                script,
                token_id: 1,
                amount: 1
            })
            .kind(),
            b'r'
        );
    }
}
