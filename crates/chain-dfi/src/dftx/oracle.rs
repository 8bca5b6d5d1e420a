use crate::composer::{write_string, write_vec, Decode, Encode, Reader};
use crate::error::DfiError;
use crate::script::Script;

/// A `token/currency` price feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyPair {
    pub token: String,
    pub currency: String,
}

impl Encode for CurrencyPair {
    fn encode(&self, buf: &mut Vec<u8>) {
        write_string(buf, &self.token);
        write_string(buf, &self.currency);
    }
}

impl Decode for CurrencyPair {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, DfiError> {
        Ok(Self {
            token: reader.read_string()?,
            currency: reader.read_string()?,
        })
    }
}

/// Register an oracle allowed to publish the given price feeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointOracle {
    pub script: Script,
    pub weightage: u8,
    pub price_feeds: Vec<CurrencyPair>,
}

impl AppointOracle {
    pub const KIND: u8 = b'o';
}

impl Encode for AppointOracle {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.script.encode(buf);
        buf.push(self.weightage);
        write_vec(buf, &self.price_feeds);
    }
}

impl Decode for AppointOracle {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, DfiError> {
        Ok(Self {
            script: Script::decode(reader)?,
            weightage: reader.read_u8()?,
            price_feeds: reader.read_vec()?,
        })
    }
}

/// Remove a previously appointed oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoveOracle {
    /// Oracle id in wire order.
    pub oracle_id: [u8; 32],
}

impl RemoveOracle {
    pub const KIND: u8 = b'h';

    /// Build from the displayed (byte-reversed) id.
    pub fn from_display_hex(id: &str) -> Result<Self, DfiError> {
        let mut oracle_id: [u8; 32] = hex::decode(id)
            .map_err(|e| DfiError::Format(format!("invalid oracle id hex: {e}")))?
            .try_into()
            .map_err(|_| DfiError::Format("oracle id must be 32 bytes".into()))?;
        oracle_id.reverse();
        Ok(Self { oracle_id })
    }

    pub fn display_hex(&self) -> String {
        let mut id = self.oracle_id;
        id.reverse();
        hex::encode(id)
    }
}

impl Encode for RemoveOracle {
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.oracle_id);
    }
}

impl Decode for RemoveOracle {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, DfiError> {
        Ok(Self {
            oracle_id: reader.read_array()?,
        })
    }
}
