use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CodecError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("script length mismatch: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("not an OP_RETURN data script")]
    NotOpReturn,

    #[error("unknown metadata version {0}")]
    UnknownVersion(u8),

    #[error("unknown taproot branch flags {0:#04x}")]
    UnknownBranchKind(u8),

    #[error("unknown chain type tag {0}")]
    UnknownChainType(u8),

    #[error("payload shorter than fixed head: {0} bytes")]
    ShortPayload(usize),

    #[error("abi word is not a canonical {0}")]
    MalformedWord(&'static str),

    #[error("dynamic offset or length out of bounds")]
    BadOffset,

    #[error("unknown contract call payload discriminator {0}")]
    UnknownPayloadKind(u8),

    #[error("unknown fee option {0}")]
    UnknownFeeOption(u8),
}
