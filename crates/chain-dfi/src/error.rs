use thiserror::Error;

/// DeFi chain codec, address, builder and signing errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DfiError {
    #[error("truncated input: needed {needed} bytes, {remaining} remaining")]
    TruncatedInput { needed: usize, remaining: usize },

    #[error("non-minimal varint encoding of {0}")]
    InvalidVarInt(u64),

    #[error("format error: {0}")]
    Format(String),

    #[error("checksum error: {0}")]
    Checksum(String),

    #[error("prefix mismatch: {0}")]
    PrefixMismatch(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("structural error: {0}")]
    Structural(String),

    #[error("insufficient funds: need {needed} sat, have {available}")]
    InsufficientFunds { needed: u64, available: u64 },

    #[error("signing error: {0}")]
    SigningError(String),

    #[error("invalid network: {0}")]
    InvalidNetwork(String),
}

impl DfiError {
    /// Whether this error came from malformed or non-canonical binary input.
    pub fn is_format(&self) -> bool {
        matches!(
            self,
            DfiError::TruncatedInput { .. } | DfiError::InvalidVarInt(_) | DfiError::Format(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_truncated_input() {
        let err = DfiError::TruncatedInput {
            needed: 4,
            remaining: 1,
        };
        assert_eq!(err.to_string(), "truncated input: needed 4 bytes, 1 remaining");
    }

    #[test]
    fn display_invalid_varint() {
        let err = DfiError::InvalidVarInt(10);
        assert_eq!(err.to_string(), "non-minimal varint encoding of 10");
    }

    #[test]
    fn display_insufficient_funds() {
        let err = DfiError::InsufficientFunds {
            needed: 100_000,
            available: 50_000,
        };
        assert!(err.to_string().contains("100000"));
        assert!(err.to_string().contains("50000"));
    }

    #[test]
    fn display_structural() {
        let err = DfiError::Structural("`from` must have exactly one entry".into());
        assert_eq!(
            err.to_string(),
            "structural error: `from` must have exactly one entry"
        );
    }

    #[test]
    fn format_classification() {
        assert!(DfiError::InvalidVarInt(1).is_format());
        assert!(DfiError::Format("x".into()).is_format());
        assert!(!DfiError::Checksum("x".into()).is_format());
        assert!(!DfiError::SigningError("x".into()).is_format());
    }

    #[test]
    fn error_trait_is_implemented() {
        let err: Box<dyn std::error::Error> = Box::new(DfiError::InvalidAddress("bad".into()));
        assert!(err.to_string().contains("bad"));
    }
}
