//! # Holdfast codec
//!
//! Byte-exact codecs for the data the vault protocol puts on the wire:
//!
//! - the fixed-layout vault metadata carried in a locking transaction's
//!   OP_RETURN output ([`VaultEmbeddedData`]),
//! - the redeem-side OP_RETURN correlating a pooling-redeem transaction
//!   with its signing session ([`RedeemEmbeddedData`]),
//! - the 8-byte destination-chain identifier ([`ChainInfo`]),
//! - the ABI-encoded cross-chain payloads and their Keccak-256 content
//!   hashes ([`abi`]).
//!
//! External chain indexers re-decode all of these independently, so every
//! encoder here is deterministic and every decoder is all-or-nothing: a
//! single byte out of place is a hard [`CodecError`], never a partial
//! parse.

pub mod abi;
mod chain;
mod embedded;
mod error;
mod redeem;

pub use chain::{ChainInfo, ChainRegistry, ChainType, CHAIN_INFO_SIZE};
pub use embedded::{
    tag_bytes, service_tag_bytes, TaprootBranchKind, TransactionKind, VaultEmbeddedData,
    VaultEmbeddedDataV0, VaultEmbeddedDataV1, EMBEDDED_PAYLOAD_SIZE, EMBEDDED_SCRIPT_SIZE,
};
pub use error::CodecError;
pub use redeem::{RedeemEmbeddedData, REDEEM_PAYLOAD_SIZE, REDEEM_SCRIPT_SIZE};

/// Size of the protocol tag field in bytes.
pub const TAG_SIZE: usize = 6;

/// Size of the service tag field in bytes.
pub const SERVICE_TAG_SIZE: usize = 5;

/// Size of an EVM-style destination address in bytes.
pub const ADDRESS_SIZE: usize = 20;

/// Size of the destination chain identifier block in bytes.
pub const CHAIN_ID_SIZE: usize = 8;

/// Size of the custodian group uid (a 32-byte hash).
pub const GROUP_UID_SIZE: usize = 32;

/// Size of the redeem session sequence field in bytes.
pub const SESSION_SEQUENCE_SIZE: usize = 8;
