//! Destination chain identifiers.
//!
//! A destination chain is packed into 8 bytes: byte 0 tags the chain
//! family, bytes 1..8 carry the low 7 bytes of the big-endian chain id.
//! The top byte of the id is reserved and overwritten by the tag, so only
//! 56-bit chain ids survive a round trip.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::CHAIN_ID_SIZE;

/// Size of the packed [`ChainInfo`] block in bytes.
pub const CHAIN_INFO_SIZE: usize = CHAIN_ID_SIZE;

/// Chain family tag, the first byte of a packed [`ChainInfo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChainType {
    Bitcoin = 0,
    Evm = 1,
    Solana = 2,
    Cosmos = 3,
}

impl ChainType {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Bitcoin),
            1 => Some(Self::Evm),
            2 => Some(Self::Solana),
            3 => Some(Self::Cosmos),
            _ => None,
        }
    }
}

/// A destination chain: family tag plus numeric chain id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChainInfo {
    pub chain_type: ChainType,
    pub chain_id: u64,
}

impl ChainInfo {
    pub fn new(chain_type: ChainType, chain_id: u64) -> Self {
        Self {
            chain_type,
            chain_id,
        }
    }

    /// Pack into the 8-byte wire block. Ids wider than 56 bits lose their
    /// top byte to the chain type tag.
    pub fn to_bytes(&self) -> [u8; CHAIN_INFO_SIZE] {
        let mut bytes = self.chain_id.to_be_bytes();
        bytes[0] = self.chain_type as u8;
        bytes
    }

    /// Unpack an 8-byte wire block. Returns `None` when the tag byte is
    /// not a defined [`ChainType`].
    pub fn from_bytes(bytes: [u8; CHAIN_INFO_SIZE]) -> Option<Self> {
        let chain_type = ChainType::from_byte(bytes[0])?;
        let mut id_bytes = bytes;
        id_bytes[0] = 0;
        Some(Self {
            chain_type,
            chain_id: u64::from_be_bytes(id_bytes),
        })
    }
}

/// Read-only lookup table from packed chain identifiers to display names.
///
/// Built once from externally-loaded configuration; the transaction engine
/// itself never consults it.
#[derive(Debug, Clone, Default)]
pub struct ChainRegistry {
    entries: BTreeMap<[u8; CHAIN_INFO_SIZE], String>,
}

impl ChainRegistry {
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (ChainInfo, String)>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(info, name)| (info.to_bytes(), name))
                .collect(),
        }
    }

    pub fn name(&self, info: &ChainInfo) -> Option<&str> {
        self.entries.get(&info.to_bytes()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
