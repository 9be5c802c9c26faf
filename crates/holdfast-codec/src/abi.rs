//! Ethereum-ABI payload codec.
//!
//! The protocol's cross-chain messages are canonical ABI tuple encodings:
//! every static value occupies one 32-byte word (numbers left-padded,
//! fixed byte strings right-padded), every dynamic value is referenced by
//! an offset word pointing at a length-prefixed, 32-byte-padded tail.
//! Gateway contracts and relayers hash these encodings with Keccak-256 to
//! identify a message, so the bytes must match the Solidity side exactly.
//!
//! Shapes are fixed per message kind, so each payload is encoded by hand
//! over small word helpers instead of pulling in a general ABI compiler.

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use crate::{CodecError, ADDRESS_SIZE};

/// Size of one ABI word.
pub const WORD_SIZE: usize = 32;

/// Keccak-256, the content hash used for every payload below.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// Mempool-style fee tier selector forwarded to the bitcoin side of a
/// custodian-only contract call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BtcFeeOpts {
    Minimum = 0,
    Economy = 1,
    Hour = 2,
    HalfHour = 3,
    Fastest = 4,
}

impl BtcFeeOpts {
    pub fn from_byte(byte: u8) -> Result<Self, CodecError> {
        match byte {
            0 => Ok(Self::Minimum),
            1 => Ok(Self::Economy),
            2 => Ok(Self::Hour),
            3 => Ok(Self::HalfHour),
            4 => Ok(Self::Fastest),
            other => Err(CodecError::UnknownFeeOption(other)),
        }
    }
}

/// `(bytes20 recipient, uint64 amount, bytes32 source_txid)`, emitted
/// when a locking transaction is observed. `source_txid` is the bitcoin
/// txid in display (reversed) byte order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockingPayload {
    pub recipient: [u8; ADDRESS_SIZE],
    pub amount: u64,
    pub source_txid: [u8; 32],
}

impl LockingPayload {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(3 * WORD_SIZE);
        out.extend_from_slice(&bytes20_word(&self.recipient));
        out.extend_from_slice(&uint_word(self.amount));
        out.extend_from_slice(&self.source_txid);
        out
    }

    pub fn decode(data: &[u8]) -> Result<Self, CodecError> {
        let reader = WordReader::new(data, 3)?;
        if data.len() != 3 * WORD_SIZE {
            return Err(CodecError::InvalidLength {
                expected: 3 * WORD_SIZE,
                actual: data.len(),
            });
        }
        Ok(Self {
            recipient: reader.bytes20(0)?,
            amount: reader.uint(1)?,
            source_txid: reader.bytes32(2),
        })
    }

    pub fn hash(&self) -> [u8; 32] {
        keccak256(&self.encode())
    }
}

/// `(uint64 amount, bytes32 source_txid, bytes recipient_chain_identifier)`
/// is the destination-chain execute message for a locking event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationPayload {
    pub amount: u64,
    pub source_txid: [u8; 32],
    pub recipient_chain_identifier: Vec<u8>,
}

impl DestinationPayload {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&uint_word(self.amount));
        out.extend_from_slice(&self.source_txid);
        out.extend_from_slice(&uint_word((3 * WORD_SIZE) as u64));
        append_bytes_tail(&mut out, &self.recipient_chain_identifier);
        out
    }

    pub fn decode(data: &[u8]) -> Result<Self, CodecError> {
        let reader = WordReader::new(data, 3)?;
        Ok(Self {
            amount: reader.uint(0)?,
            source_txid: reader.bytes32(1),
            recipient_chain_identifier: reader.dynamic_bytes(2)?.to_vec(),
        })
    }

    pub fn hash(&self) -> [u8; 32] {
        keccak256(&self.encode())
    }
}

/// `(address sender, address source_contract, string token_symbol,
/// bytes metadata)` is the transfer-remote message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRemotePayload {
    pub sender: [u8; ADDRESS_SIZE],
    pub source_contract: [u8; ADDRESS_SIZE],
    pub token_symbol: String,
    pub metadata: Vec<u8>,
}

impl TransferRemotePayload {
    pub fn encode(&self) -> Vec<u8> {
        let head = 4 * WORD_SIZE;
        let symbol_tail = WORD_SIZE + padded_len(self.token_symbol.len());

        let mut out = Vec::new();
        out.extend_from_slice(&address_word(&self.sender));
        out.extend_from_slice(&address_word(&self.source_contract));
        out.extend_from_slice(&uint_word(head as u64));
        out.extend_from_slice(&uint_word((head + symbol_tail) as u64));
        append_bytes_tail(&mut out, self.token_symbol.as_bytes());
        append_bytes_tail(&mut out, &self.metadata);
        out
    }

    pub fn decode(data: &[u8]) -> Result<Self, CodecError> {
        let reader = WordReader::new(data, 4)?;
        let symbol_bytes = reader.dynamic_bytes(2)?;
        let token_symbol = std::str::from_utf8(symbol_bytes)
            .map_err(|_| CodecError::InvalidInput("token symbol is not utf-8".into()))?
            .to_string();
        Ok(Self {
            sender: reader.address(0)?,
            source_contract: reader.address(1)?,
            token_symbol,
            metadata: reader.dynamic_bytes(3)?.to_vec(),
        })
    }

    pub fn hash(&self) -> [u8; 32] {
        keccak256(&self.encode())
    }
}

/// `(uint64 amount, bytes recipient_chain_identifier, bytes metadata)` is
/// the metadata block nested inside a transfer-remote message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRemoteMetadata {
    pub amount: u64,
    pub recipient_chain_identifier: Vec<u8>,
    pub metadata: Vec<u8>,
}

impl TransferRemoteMetadata {
    pub fn encode(&self) -> Vec<u8> {
        let head = 3 * WORD_SIZE;
        let first_tail = WORD_SIZE + padded_len(self.recipient_chain_identifier.len());

        let mut out = Vec::new();
        out.extend_from_slice(&uint_word(self.amount));
        out.extend_from_slice(&uint_word(head as u64));
        out.extend_from_slice(&uint_word((head + first_tail) as u64));
        append_bytes_tail(&mut out, &self.recipient_chain_identifier);
        append_bytes_tail(&mut out, &self.metadata);
        out
    }

    pub fn decode(data: &[u8]) -> Result<Self, CodecError> {
        let reader = WordReader::new(data, 3)?;
        Ok(Self {
            amount: reader.uint(0)?,
            recipient_chain_identifier: reader.dynamic_bytes(1)?.to_vec(),
            metadata: reader.dynamic_bytes(2)?.to_vec(),
        })
    }

    pub fn hash(&self) -> [u8; 32] {
        keccak256(&self.encode())
    }
}

const CONTRACT_CALL_CUSTODIAN_ONLY: u8 = 0;
const CONTRACT_CALL_UPC: u8 = 1;

/// Contract-call-with-token payload: a one-byte discriminator followed by
/// the variant's ABI tuple. Exactly one variant per instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractCallPayload {
    /// `(uint8 fee_opts, bool rbf, bytes recipient_chain_identifier)`
    CustodianOnly {
        fee_opts: BtcFeeOpts,
        rbf: bool,
        recipient_chain_identifier: Vec<u8>,
    },
    /// `(bytes psbt)`
    Upc { psbt: Vec<u8> },
}

impl ContractCallPayload {
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::CustodianOnly {
                fee_opts,
                rbf,
                recipient_chain_identifier,
            } => {
                // Offsets are relative to the tuple start, one byte past
                // the discriminator.
                let mut out = vec![CONTRACT_CALL_CUSTODIAN_ONLY];
                out.extend_from_slice(&uint_word(*fee_opts as u64));
                out.extend_from_slice(&uint_word(u64::from(*rbf)));
                out.extend_from_slice(&uint_word((3 * WORD_SIZE) as u64));
                append_bytes_tail(&mut out, recipient_chain_identifier);
                out
            }
            Self::Upc { psbt } => {
                let mut out = vec![CONTRACT_CALL_UPC];
                out.extend_from_slice(&uint_word(WORD_SIZE as u64));
                append_bytes_tail(&mut out, psbt);
                out
            }
        }
    }

    pub fn decode(data: &[u8]) -> Result<Self, CodecError> {
        let (&kind, tuple) = data
            .split_first()
            .ok_or(CodecError::ShortPayload(0))?;
        match kind {
            CONTRACT_CALL_CUSTODIAN_ONLY => {
                let reader = WordReader::new(tuple, 3)?;
                Ok(Self::CustodianOnly {
                    fee_opts: BtcFeeOpts::from_byte(reader.uint8(0)?)?,
                    rbf: reader.bool(1)?,
                    recipient_chain_identifier: reader.dynamic_bytes(2)?.to_vec(),
                })
            }
            CONTRACT_CALL_UPC => {
                let reader = WordReader::new(tuple, 1)?;
                Ok(Self::Upc {
                    psbt: reader.dynamic_bytes(0)?.to_vec(),
                })
            }
            other => Err(CodecError::UnknownPayloadKind(other)),
        }
    }

    /// Keccak-256 over the full encoding, discriminator included.
    pub fn hash(&self) -> [u8; 32] {
        keccak256(&self.encode())
    }
}

// ─── Word helpers ───────────────────────────────────────────────────────────

fn uint_word(value: u64) -> [u8; WORD_SIZE] {
    let mut word = [0u8; WORD_SIZE];
    word[WORD_SIZE - 8..].copy_from_slice(&value.to_be_bytes());
    word
}

fn address_word(address: &[u8; ADDRESS_SIZE]) -> [u8; WORD_SIZE] {
    let mut word = [0u8; WORD_SIZE];
    word[WORD_SIZE - ADDRESS_SIZE..].copy_from_slice(address);
    word
}

fn bytes20_word(bytes: &[u8; ADDRESS_SIZE]) -> [u8; WORD_SIZE] {
    let mut word = [0u8; WORD_SIZE];
    word[..ADDRESS_SIZE].copy_from_slice(bytes);
    word
}

fn padded_len(len: usize) -> usize {
    len.div_ceil(WORD_SIZE) * WORD_SIZE
}

fn append_bytes_tail(out: &mut Vec<u8>, data: &[u8]) {
    out.extend_from_slice(&uint_word(data.len() as u64));
    out.extend_from_slice(data);
    out.resize(out.len() + padded_len(data.len()) - data.len(), 0);
}

/// Reads validated words out of an ABI tuple encoding. Offsets inside the
/// tuple are relative to the tuple start, matching `abi.encode`.
struct WordReader<'a> {
    data: &'a [u8],
}

impl<'a> WordReader<'a> {
    fn new(data: &'a [u8], min_words: usize) -> Result<Self, CodecError> {
        if data.len() < min_words * WORD_SIZE {
            return Err(CodecError::ShortPayload(data.len()));
        }
        Ok(Self { data })
    }

    fn word(&self, index: usize) -> &'a [u8] {
        &self.data[index * WORD_SIZE..(index + 1) * WORD_SIZE]
    }

    fn uint(&self, index: usize) -> Result<u64, CodecError> {
        let word = self.word(index);
        if word[..WORD_SIZE - 8].iter().any(|&b| b != 0) {
            return Err(CodecError::MalformedWord("uint64"));
        }
        Ok(u64::from_be_bytes(word[WORD_SIZE - 8..].try_into().expect("fixed slice")))
    }

    fn uint8(&self, index: usize) -> Result<u8, CodecError> {
        let value = self.uint(index)?;
        u8::try_from(value).map_err(|_| CodecError::MalformedWord("uint8"))
    }

    fn bool(&self, index: usize) -> Result<bool, CodecError> {
        match self.uint(index)? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(CodecError::MalformedWord("bool")),
        }
    }

    fn address(&self, index: usize) -> Result<[u8; ADDRESS_SIZE], CodecError> {
        let word = self.word(index);
        if word[..WORD_SIZE - ADDRESS_SIZE].iter().any(|&b| b != 0) {
            return Err(CodecError::MalformedWord("address"));
        }
        Ok(word[WORD_SIZE - ADDRESS_SIZE..].try_into().expect("fixed slice"))
    }

    fn bytes20(&self, index: usize) -> Result<[u8; ADDRESS_SIZE], CodecError> {
        let word = self.word(index);
        if word[ADDRESS_SIZE..].iter().any(|&b| b != 0) {
            return Err(CodecError::MalformedWord("bytes20"));
        }
        Ok(word[..ADDRESS_SIZE].try_into().expect("fixed slice"))
    }

    fn bytes32(&self, index: usize) -> [u8; 32] {
        self.word(index).try_into().expect("fixed slice")
    }

    fn dynamic_bytes(&self, index: usize) -> Result<&'a [u8], CodecError> {
        let offset = self.uint(index)? as usize;
        let len_end = offset.checked_add(WORD_SIZE).ok_or(CodecError::BadOffset)?;
        let len_word = self
            .data
            .get(offset..len_end)
            .ok_or(CodecError::BadOffset)?;
        if len_word[..WORD_SIZE - 8].iter().any(|&b| b != 0) {
            return Err(CodecError::BadOffset);
        }
        let len = u64::from_be_bytes(len_word[WORD_SIZE - 8..].try_into().expect("fixed slice"))
            as usize;
        self.data
            .get(len_end..len_end.checked_add(len).ok_or(CodecError::BadOffset)?)
            .ok_or(CodecError::BadOffset)
    }
}
