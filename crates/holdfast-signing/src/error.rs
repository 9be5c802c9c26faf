use thiserror::Error;

#[derive(Error, Debug)]
pub enum SigningError {
    #[error("invalid network byte {0}")]
    InvalidNetwork(u8),

    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("key matches no signable input")]
    FailedToSign,

    #[error("psbt has no inputs")]
    InvalidPsbt,

    #[error("no tap script signatures supplied")]
    NoTapScriptSigs,

    #[error("input index {index} out of range for {inputs} inputs")]
    InputIndexOutOfRange { index: u64, inputs: usize },

    #[error("signature references a leaf hash unknown to its input")]
    UnknownLeafHash,

    #[error("input {0} cannot be finalized: {1}")]
    FailedToFinalize(usize, String),

    #[error("failed to extract final transaction")]
    FailedToExtractTx,

    #[error("input {0} is missing its witness utxo")]
    MissingWitnessUtxo(usize),

    #[error("sighash computation failed: {0}")]
    Sighash(String),

    #[error("signature is not 64 bytes")]
    InvalidSignatureSize,

    #[error("invalid x-only public key")]
    InvalidPublicKey,

    #[error("invalid leaf hash")]
    InvalidLeafHash,
}
