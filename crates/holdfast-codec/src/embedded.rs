//! Vault metadata embedded in a locking transaction's OP_RETURN output.
//!
//! The payload is a 63-byte fixed layout; the full script is
//! `OP_RETURN OP_PUSHBYTES_63 <payload>` (65 bytes). Both metadata
//! versions share the same field offsets:
//!
//! ```text
//! offset  size  field
//! 0       6     tag
//! 6       1     version
//! 7       1     network id
//! 8       1     flags
//! 9       5     service tag
//! 14      1     custodian quorum
//! 15      8     destination chain
//! 23      20    destination token address
//! 43      20    destination recipient address
//! ```
//!
//! The version byte selects how the flags byte and the destination chain
//! block are interpreted. Version 0 keeps only the taproot branch kind in
//! the flags and treats the chain block as an opaque little-endian id.
//! Version 1 adds a transaction-kind bit to the flags and validates the
//! chain block as a tagged [`ChainInfo`].

use bitcoin::hashes::{sha256d, Hash};
use bitcoin::opcodes::all::OP_RETURN;
use bitcoin::script::Builder;
use bitcoin::ScriptBuf;
use serde::{Deserialize, Serialize};

use crate::{
    ChainInfo, CodecError, ADDRESS_SIZE, CHAIN_ID_SIZE, SERVICE_TAG_SIZE, TAG_SIZE,
};

/// Size of the embedded payload (everything after the push opcode).
pub const EMBEDDED_PAYLOAD_SIZE: usize =
    TAG_SIZE + 1 + 1 + 1 + SERVICE_TAG_SIZE + 1 + CHAIN_ID_SIZE + ADDRESS_SIZE + ADDRESS_SIZE;

/// Size of the full OP_RETURN script.
pub const EMBEDDED_SCRIPT_SIZE: usize = 2 + EMBEDDED_PAYLOAD_SIZE;

const VERSION_OFFSET: usize = TAG_SIZE;
const UNLOCKING_BIT: u8 = 0b0000_0001;
const BRANCH_MASK: u8 = 0b1111_1110;

/// Which taproot tree shape the locking output uses, carried in the high
/// bits of the flags byte so indexers can re-derive the script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaprootBranchKind {
    OnlyKeys = 0b0000_0000,
    CustodianOnly = 0b0100_0000,
    Upc = 0b1000_0000,
}

impl TaprootBranchKind {
    fn from_byte(byte: u8) -> Result<Self, CodecError> {
        match byte {
            0b0000_0000 => Ok(Self::OnlyKeys),
            0b0100_0000 => Ok(Self::CustodianOnly),
            0b1000_0000 => Ok(Self::Upc),
            other => Err(CodecError::UnknownBranchKind(other)),
        }
    }
}

/// Whether the metadata rides on a locking or an unlocking transaction.
/// Version 1 encodes this in the low bit of the flags byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    Locking,
    Unlocking,
}

/// Parsed vault metadata, tagged by layout version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaultEmbeddedData {
    V0(VaultEmbeddedDataV0),
    V1(VaultEmbeddedDataV1),
}

/// Version-0 layout: the flags byte is the branch kind alone and the
/// destination chain is an opaque little-endian chain id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultEmbeddedDataV0 {
    pub tag: [u8; TAG_SIZE],
    pub network_id: u8,
    pub branch: TaprootBranchKind,
    pub service_tag: [u8; SERVICE_TAG_SIZE],
    pub custodian_quorum: u8,
    pub destination_chain_id: [u8; CHAIN_ID_SIZE],
    pub destination_token_address: [u8; ADDRESS_SIZE],
    pub destination_recipient_address: [u8; ADDRESS_SIZE],
}

/// Version-1 layout: the flags byte carries the branch kind plus a
/// transaction-kind bit, and the chain block is a validated [`ChainInfo`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultEmbeddedDataV1 {
    pub tag: [u8; TAG_SIZE],
    pub network_id: u8,
    pub branch: TaprootBranchKind,
    pub transaction: TransactionKind,
    pub service_tag: [u8; SERVICE_TAG_SIZE],
    pub custodian_quorum: u8,
    pub destination_chain: ChainInfo,
    pub destination_token_address: [u8; ADDRESS_SIZE],
    pub destination_recipient_address: [u8; ADDRESS_SIZE],
}

impl VaultEmbeddedData {
    pub fn version(&self) -> u8 {
        match self {
            Self::V0(_) => 0,
            Self::V1(_) => 1,
        }
    }

    pub fn tag(&self) -> &[u8; TAG_SIZE] {
        match self {
            Self::V0(d) => &d.tag,
            Self::V1(d) => &d.tag,
        }
    }

    pub fn network_id(&self) -> u8 {
        match self {
            Self::V0(d) => d.network_id,
            Self::V1(d) => d.network_id,
        }
    }

    pub fn branch(&self) -> TaprootBranchKind {
        match self {
            Self::V0(d) => d.branch,
            Self::V1(d) => d.branch,
        }
    }

    pub fn custodian_quorum(&self) -> u8 {
        match self {
            Self::V0(d) => d.custodian_quorum,
            Self::V1(d) => d.custodian_quorum,
        }
    }

    /// Encode into the full OP_RETURN script.
    pub fn to_script(&self) -> Result<ScriptBuf, CodecError> {
        let payload = match self {
            Self::V0(d) => d.encode_payload(),
            Self::V1(d) => d.encode_payload()?,
        };
        Ok(Builder::new()
            .push_opcode(OP_RETURN)
            .push_slice(payload)
            .into_script())
    }

    /// Decode from raw script bytes. The script must be exactly the
    /// expected size with the OP_RETURN opcode and push length in front;
    /// anything else is rejected outright.
    pub fn from_script(script: &[u8]) -> Result<Self, CodecError> {
        if script.len() != EMBEDDED_SCRIPT_SIZE {
            return Err(CodecError::InvalidLength {
                expected: EMBEDDED_SCRIPT_SIZE,
                actual: script.len(),
            });
        }
        if script[0] != OP_RETURN.to_u8() || script[1] as usize != EMBEDDED_PAYLOAD_SIZE {
            return Err(CodecError::NotOpReturn);
        }

        let payload = &script[2..];
        match payload[VERSION_OFFSET] {
            0 => VaultEmbeddedDataV0::decode_payload(payload).map(Self::V0),
            1 => VaultEmbeddedDataV1::decode_payload(payload).map(Self::V1),
            version => {
                log::debug!("rejecting embedded data with version byte {version}");
                Err(CodecError::UnknownVersion(version))
            }
        }
    }
}

impl VaultEmbeddedDataV0 {
    /// Branch kind `CustodianOnly` is how version 0 expressed its
    /// "have only custodians" boolean.
    pub fn have_only_custodians(&self) -> bool {
        self.branch == TaprootBranchKind::CustodianOnly
    }

    fn encode_payload(&self) -> [u8; EMBEDDED_PAYLOAD_SIZE] {
        encode_fields(
            &self.tag,
            0,
            self.network_id,
            self.branch as u8,
            &self.service_tag,
            self.custodian_quorum,
            &self.destination_chain_id,
            &self.destination_token_address,
            &self.destination_recipient_address,
        )
    }

    fn decode_payload(payload: &[u8]) -> Result<Self, CodecError> {
        let fields = RawFields::split(payload);
        let branch = TaprootBranchKind::from_byte(fields.flags)?;
        Ok(Self {
            tag: fields.tag,
            network_id: fields.network_id,
            branch,
            service_tag: fields.service_tag,
            custodian_quorum: fields.custodian_quorum,
            destination_chain_id: fields.destination_chain,
            destination_token_address: fields.destination_token_address,
            destination_recipient_address: fields.destination_recipient_address,
        })
    }
}

impl VaultEmbeddedDataV1 {
    fn flags_byte(&self) -> u8 {
        let kind_bit = match self.transaction {
            TransactionKind::Locking => 0,
            TransactionKind::Unlocking => UNLOCKING_BIT,
        };
        self.branch as u8 | kind_bit
    }

    fn encode_payload(&self) -> Result<[u8; EMBEDDED_PAYLOAD_SIZE], CodecError> {
        if self.destination_chain.chain_id >= 1 << 56 {
            return Err(CodecError::InvalidInput(format!(
                "chain id {} does not fit the 7-byte id field",
                self.destination_chain.chain_id
            )));
        }
        Ok(encode_fields(
            &self.tag,
            1,
            self.network_id,
            self.flags_byte(),
            &self.service_tag,
            self.custodian_quorum,
            &self.destination_chain.to_bytes(),
            &self.destination_token_address,
            &self.destination_recipient_address,
        ))
    }

    fn decode_payload(payload: &[u8]) -> Result<Self, CodecError> {
        let fields = RawFields::split(payload);
        let branch = TaprootBranchKind::from_byte(fields.flags & BRANCH_MASK)?;
        let transaction = if fields.flags & UNLOCKING_BIT != 0 {
            TransactionKind::Unlocking
        } else {
            TransactionKind::Locking
        };
        let destination_chain = ChainInfo::from_bytes(fields.destination_chain)
            .ok_or(CodecError::UnknownChainType(fields.destination_chain[0]))?;
        Ok(Self {
            tag: fields.tag,
            network_id: fields.network_id,
            branch,
            transaction,
            service_tag: fields.service_tag,
            custodian_quorum: fields.custodian_quorum,
            destination_chain,
            destination_token_address: fields.destination_token_address,
            destination_recipient_address: fields.destination_recipient_address,
        })
    }
}

struct RawFields {
    tag: [u8; TAG_SIZE],
    network_id: u8,
    flags: u8,
    service_tag: [u8; SERVICE_TAG_SIZE],
    custodian_quorum: u8,
    destination_chain: [u8; CHAIN_ID_SIZE],
    destination_token_address: [u8; ADDRESS_SIZE],
    destination_recipient_address: [u8; ADDRESS_SIZE],
}

impl RawFields {
    /// Callers have already checked `payload.len() == EMBEDDED_PAYLOAD_SIZE`.
    fn split(payload: &[u8]) -> Self {
        Self {
            tag: payload[0..6].try_into().expect("fixed slice"),
            network_id: payload[7],
            flags: payload[8],
            service_tag: payload[9..14].try_into().expect("fixed slice"),
            custodian_quorum: payload[14],
            destination_chain: payload[15..23].try_into().expect("fixed slice"),
            destination_token_address: payload[23..43].try_into().expect("fixed slice"),
            destination_recipient_address: payload[43..63].try_into().expect("fixed slice"),
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn encode_fields(
    tag: &[u8; TAG_SIZE],
    version: u8,
    network_id: u8,
    flags: u8,
    service_tag: &[u8; SERVICE_TAG_SIZE],
    custodian_quorum: u8,
    destination_chain: &[u8; CHAIN_ID_SIZE],
    destination_token_address: &[u8; ADDRESS_SIZE],
    destination_recipient_address: &[u8; ADDRESS_SIZE],
) -> [u8; EMBEDDED_PAYLOAD_SIZE] {
    let mut payload = [0u8; EMBEDDED_PAYLOAD_SIZE];
    payload[0..6].copy_from_slice(tag);
    payload[6] = version;
    payload[7] = network_id;
    payload[8] = flags;
    payload[9..14].copy_from_slice(service_tag);
    payload[14] = custodian_quorum;
    payload[15..23].copy_from_slice(destination_chain);
    payload[23..43].copy_from_slice(destination_token_address);
    payload[43..63].copy_from_slice(destination_recipient_address);
    payload
}

/// Fit an arbitrary protocol tag into its 6-byte field: short tags are
/// right-aligned with zero padding, longer tags are sha256d-hashed and
/// truncated.
pub fn tag_bytes(tag: &[u8]) -> [u8; TAG_SIZE] {
    fit_tag::<TAG_SIZE>(tag)
}

/// Same rule as [`tag_bytes`], for the 5-byte service tag field.
pub fn service_tag_bytes(service_tag: &[u8]) -> [u8; SERVICE_TAG_SIZE] {
    fit_tag::<SERVICE_TAG_SIZE>(service_tag)
}

fn fit_tag<const N: usize>(tag: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    if tag.len() <= N {
        out[N - tag.len()..].copy_from_slice(tag);
    } else {
        out.copy_from_slice(&sha256d::Hash::hash(tag)[..N]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChainType;

    // A locking script observed on testnet4: tag "SCALAR", service tag
    // "light", version 0, quorum 3, UPC branch.
    const SCRIPT_HEX: &str = "6a3f5343414c41520001806c6967687403a736aa00000000001f98c06d8734d5a9ff0b53e3294626e62e4d232c130c4810d57140e1e62967cbf742caeae91b6ece";

    fn v0_fixture() -> VaultEmbeddedDataV0 {
        VaultEmbeddedDataV0 {
            tag: *b"SCALAR",
            network_id: 1,
            branch: TaprootBranchKind::Upc,
            service_tag: *b"light",
            custodian_quorum: 3,
            destination_chain_id: 11155111u64.to_le_bytes(),
            destination_token_address: [0xaa; ADDRESS_SIZE],
            destination_recipient_address: [0xbb; ADDRESS_SIZE],
        }
    }

    fn v1_fixture() -> VaultEmbeddedDataV1 {
        VaultEmbeddedDataV1 {
            tag: *b"SCALAR",
            network_id: 1,
            branch: TaprootBranchKind::CustodianOnly,
            transaction: TransactionKind::Locking,
            service_tag: *b"light",
            custodian_quorum: 3,
            destination_chain: ChainInfo::new(ChainType::Evm, 11155111),
            destination_token_address: [0xaa; ADDRESS_SIZE],
            destination_recipient_address: [0xbb; ADDRESS_SIZE],
        }
    }

    #[test]
    fn parses_testnet_vector() {
        let script = hex::decode(SCRIPT_HEX).unwrap();
        let data = VaultEmbeddedData::from_script(&script).unwrap();

        assert_eq!(data.version(), 0);
        assert_eq!(data.tag(), b"SCALAR");
        assert_eq!(data.network_id(), 1);
        assert_eq!(data.branch(), TaprootBranchKind::Upc);
        assert_eq!(data.custodian_quorum(), 3);

        let VaultEmbeddedData::V0(v0) = data else {
            panic!("expected version 0");
        };
        assert_eq!(&v0.service_tag, b"light");
        assert_eq!(u64::from_le_bytes(v0.destination_chain_id), 11155111);
        assert_eq!(
            hex::encode(v0.destination_token_address),
            "1f98c06d8734d5a9ff0b53e3294626e62e4d232c"
        );
        assert_eq!(
            hex::encode(v0.destination_recipient_address),
            "130c4810d57140e1e62967cbf742caeae91b6ece"
        );
        assert!(!v0.have_only_custodians());
    }

    #[test]
    fn testnet_vector_round_trips() {
        let script = hex::decode(SCRIPT_HEX).unwrap();
        let data = VaultEmbeddedData::from_script(&script).unwrap();
        assert_eq!(data.to_script().unwrap().as_bytes(), script.as_slice());
    }

    #[test]
    fn truncated_vector_is_rejected() {
        let script = hex::decode(SCRIPT_HEX).unwrap();

        let err = VaultEmbeddedData::from_script(&script[..script.len() - 1]).unwrap_err();
        assert!(matches!(err, CodecError::InvalidLength { actual: 64, .. }));

        let mut extended = script.clone();
        extended.push(0);
        let err = VaultEmbeddedData::from_script(&extended).unwrap_err();
        assert!(matches!(err, CodecError::InvalidLength { actual: 66, .. }));
    }

    #[test]
    fn wrong_opcode_is_rejected() {
        let mut script = hex::decode(SCRIPT_HEX).unwrap();
        script[0] = 0x6b;
        assert_eq!(
            VaultEmbeddedData::from_script(&script),
            Err(CodecError::NotOpReturn)
        );

        let mut script = hex::decode(SCRIPT_HEX).unwrap();
        script[1] = 0x3e;
        assert_eq!(
            VaultEmbeddedData::from_script(&script),
            Err(CodecError::NotOpReturn)
        );
    }

    #[test]
    fn unknown_version_is_rejected() {
        let mut script = hex::decode(SCRIPT_HEX).unwrap();
        script[2 + VERSION_OFFSET] = 7;
        assert_eq!(
            VaultEmbeddedData::from_script(&script),
            Err(CodecError::UnknownVersion(7))
        );
    }

    #[test]
    fn unknown_branch_flags_are_rejected() {
        let mut script = hex::decode(SCRIPT_HEX).unwrap();
        script[2 + 8] = 0b0010_0000;
        assert_eq!(
            VaultEmbeddedData::from_script(&script),
            Err(CodecError::UnknownBranchKind(0b0010_0000))
        );
    }

    #[test]
    fn v0_round_trips() {
        let data = VaultEmbeddedData::V0(v0_fixture());
        let script = data.to_script().unwrap();
        assert_eq!(script.len(), EMBEDDED_SCRIPT_SIZE);
        assert_eq!(VaultEmbeddedData::from_script(script.as_bytes()).unwrap(), data);
    }

    #[test]
    fn v1_round_trips() {
        for transaction in [TransactionKind::Locking, TransactionKind::Unlocking] {
            let mut fixture = v1_fixture();
            fixture.transaction = transaction;
            let data = VaultEmbeddedData::V1(fixture);
            let script = data.to_script().unwrap();
            assert_eq!(VaultEmbeddedData::from_script(script.as_bytes()).unwrap(), data);
        }
    }

    #[test]
    fn v1_rejects_bad_chain_tag_on_decode() {
        let mut fixture = v1_fixture();
        fixture.destination_chain = ChainInfo::new(ChainType::Evm, 11155111);
        let script = VaultEmbeddedData::V1(fixture).to_script().unwrap();

        let mut bytes = script.as_bytes().to_vec();
        bytes[2 + 15] = 0x09;
        assert_eq!(
            VaultEmbeddedData::from_script(&bytes),
            Err(CodecError::UnknownChainType(0x09))
        );
    }

    #[test]
    fn v1_rejects_oversized_chain_id_on_encode() {
        let mut fixture = v1_fixture();
        fixture.destination_chain = ChainInfo::new(ChainType::Evm, 1 << 56);
        assert!(matches!(
            VaultEmbeddedData::V1(fixture).to_script(),
            Err(CodecError::InvalidInput(_))
        ));
    }

    #[test]
    fn tag_fitting_rules() {
        assert_eq!(tag_bytes(b"SCALAR"), *b"SCALAR");
        assert_eq!(tag_bytes(b"AB"), [0, 0, 0, 0, b'A', b'B']);
        assert_eq!(service_tag_bytes(b"light"), *b"light");

        // Over-long tags hash down to the field width.
        let hashed = tag_bytes(b"a longer protocol tag");
        assert_eq!(
            hashed[..],
            sha256d::Hash::hash(b"a longer protocol tag")[..TAG_SIZE]
        );
    }

    #[test]
    fn encoding_is_deterministic() {
        let data = VaultEmbeddedData::V1(v1_fixture());
        assert_eq!(data.to_script().unwrap(), data.to_script().unwrap());
    }

    #[test]
    fn serde_json_round_trip() {
        let data = VaultEmbeddedData::V1(v1_fixture());
        let json = serde_json::to_string(&data).unwrap();
        let back: VaultEmbeddedData = serde_json::from_str(&json).unwrap();
        assert_eq!(back, data);
    }
}
