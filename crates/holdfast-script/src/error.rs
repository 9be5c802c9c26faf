use bitcoin::taproot::TaprootBuilderError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("no keys provided")]
    EmptyKeys,

    #[error("quorum {quorum} is not satisfiable by {keys} keys")]
    InvalidQuorum { quorum: u8, keys: usize },

    #[error("duplicate keys in quorum set")]
    DuplicateKeys,

    #[error("taproot builder error: {0}")]
    TaprootBuilder(#[from] TaprootBuilderError),

    #[error("taproot finalization failed")]
    TaprootFinalize,

    #[error("control block not found for branch")]
    ControlBlockMissing,
}
