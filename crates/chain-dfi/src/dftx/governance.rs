use crate::composer::{write_string, Decode, Encode, Reader};
use crate::error::DfiError;
use crate::script::Script;

/// Community fund proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCfp {
    pub proposal_type: u8,
    /// Payout destination.
    pub address: Script,
    pub amount: i64,
    pub cycles: u8,
    pub title: String,
}

impl CreateCfp {
    pub const KIND: u8 = b'z';
}

impl Encode for CreateCfp {
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.push(self.proposal_type);
        self.address.encode(buf);
        buf.extend_from_slice(&self.amount.to_le_bytes());
        buf.push(self.cycles);
        write_string(buf, &self.title);
    }
}

impl Decode for CreateCfp {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, DfiError> {
        Ok(Self {
            proposal_type: reader.read_u8()?,
            address: Script::decode(reader)?,
            amount: reader.read_i64_le()?,
            cycles: reader.read_u8()?,
            title: reader.read_string()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cfp_layout() {
        let msg = CreateCfp {
            proposal_type: 0x01,
            address: Script::empty(),
            amount: 1,
            cycles: 2,
            title: "fund".into(),
        };
        assert_eq!(msg.to_hex(), "01000100000000000000020466756e64");
        assert_eq!(CreateCfp::from_bytes(&msg.to_bytes()).unwrap(), msg);
    }
}
