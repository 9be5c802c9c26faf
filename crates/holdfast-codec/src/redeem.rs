//! Redeem-side OP_RETURN metadata.
//!
//! A pooling-redeem transaction carries a second fixed-layout OP_RETURN
//! that correlates it with the custodian signing session that authorized
//! it: the session sequence number and the custodian group uid. Indexers
//! match redeems back to sessions by this output, so the layout is as
//! strict as the locking metadata:
//!
//! ```text
//! offset  size  field
//! 0       6     tag
//! 6       1     version
//! 7       1     network id
//! 8       1     flags (unlocking branch kind)
//! 9       5     service tag
//! 14      8     session sequence (big-endian)
//! 22      32    custodian group uid
//! ```

use bitcoin::opcodes::all::OP_RETURN;
use bitcoin::script::Builder;
use bitcoin::ScriptBuf;
use serde::{Deserialize, Serialize};

use crate::{
    CodecError, TaprootBranchKind, GROUP_UID_SIZE, SERVICE_TAG_SIZE, SESSION_SEQUENCE_SIZE,
    TAG_SIZE,
};

/// Size of the redeem payload (everything after the push opcode).
pub const REDEEM_PAYLOAD_SIZE: usize =
    TAG_SIZE + 1 + 1 + 1 + SERVICE_TAG_SIZE + SESSION_SEQUENCE_SIZE + GROUP_UID_SIZE;

/// Size of the full redeem OP_RETURN script.
pub const REDEEM_SCRIPT_SIZE: usize = 2 + REDEEM_PAYLOAD_SIZE;

const UNLOCKING_BIT: u8 = 0b0000_0001;
const BRANCH_MASK: u8 = 0b1111_1110;

/// Session-correlation metadata embedded in a redeem transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemEmbeddedData {
    pub tag: [u8; TAG_SIZE],
    pub version: u8,
    pub network_id: u8,
    pub branch: TaprootBranchKind,
    pub service_tag: [u8; SERVICE_TAG_SIZE],
    pub session_sequence: u64,
    pub custodian_group_uid: [u8; GROUP_UID_SIZE],
}

impl RedeemEmbeddedData {
    pub fn to_script(&self) -> ScriptBuf {
        let mut payload = [0u8; REDEEM_PAYLOAD_SIZE];
        payload[0..6].copy_from_slice(&self.tag);
        payload[6] = self.version;
        payload[7] = self.network_id;
        payload[8] = self.branch as u8 | UNLOCKING_BIT;
        payload[9..14].copy_from_slice(&self.service_tag);
        payload[14..22].copy_from_slice(&self.session_sequence.to_be_bytes());
        payload[22..54].copy_from_slice(&self.custodian_group_uid);

        Builder::new()
            .push_opcode(OP_RETURN)
            .push_slice(payload)
            .into_script()
    }

    pub fn from_script(script: &[u8]) -> Result<Self, CodecError> {
        if script.len() != REDEEM_SCRIPT_SIZE {
            return Err(CodecError::InvalidLength {
                expected: REDEEM_SCRIPT_SIZE,
                actual: script.len(),
            });
        }
        if script[0] != OP_RETURN.to_u8() || script[1] as usize != REDEEM_PAYLOAD_SIZE {
            return Err(CodecError::NotOpReturn);
        }

        let payload = &script[2..];
        let flags = payload[8];
        if flags & UNLOCKING_BIT == 0 {
            return Err(CodecError::UnknownBranchKind(flags));
        }
        let branch = match flags & BRANCH_MASK {
            0b0100_0000 => TaprootBranchKind::CustodianOnly,
            0b1000_0000 => TaprootBranchKind::Upc,
            _ => return Err(CodecError::UnknownBranchKind(flags)),
        };

        Ok(Self {
            tag: payload[0..6].try_into().expect("fixed slice"),
            version: payload[6],
            network_id: payload[7],
            branch,
            service_tag: payload[9..14].try_into().expect("fixed slice"),
            session_sequence: u64::from_be_bytes(
                payload[14..22].try_into().expect("fixed slice"),
            ),
            custodian_group_uid: payload[22..54].try_into().expect("fixed slice"),
        })
    }
}
