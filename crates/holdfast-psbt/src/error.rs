use holdfast_codec::CodecError;
use holdfast_script::ScriptError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("invalid network byte {0}")]
    InvalidNetwork(u8),

    #[error("transaction has no inputs")]
    NoInputs,

    #[error("transaction has no outputs")]
    NoOutputs,

    #[error("output amount must be greater than zero")]
    ZeroOutput,

    #[error("insufficient funds: {available} sat available, {required} sat required")]
    InsufficientFunds { available: u64, required: u64 },

    #[error("script construction failed: {0}")]
    Script(#[from] ScriptError),

    #[error("metadata encoding failed: {0}")]
    Codec(#[from] CodecError),

    #[error("failed to assemble psbt")]
    FailedToBuildPsbt,
}
