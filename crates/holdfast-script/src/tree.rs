//! Taproot spend trees for the vault policies.
//!
//! All trees are finalized over the BIP-341 NUMS point, so there is no
//! key-path spend: every way out of a vault is a script path, and the
//! output key commits to exactly the branches built here. Downstream
//! indexers rebuild these trees from the same public inputs and expect
//! byte-identical output scripts.
//!
//! Shapes:
//!
//! - [`CustodianOnlyTree`]: one leaf, the custodian quorum.
//! - [`UpcTree`]: user+protocol at depth 1, protocol+custodians and
//!   user+custodians at depth 2.
//! - [`TimeGatedTree`]: csv-gated party and custodian quorum, both at
//!   depth 1.

use bitcoin::key::Secp256k1;
use bitcoin::secp256k1::All;
use bitcoin::taproot::{ControlBlock, LeafVersion, TaprootBuilder, TaprootSpendInfo};
use bitcoin::{ScriptBuf, XOnlyPublicKey};

use crate::branches::{csv_party_script, quorum_script, two_party_script};
use crate::ScriptError;

/// The BIP-341 "nothing up my sleeve" x-only key used as the internal key
/// of every vault output.
const NUMS_BYTES: [u8; 32] = [
    0x50, 0x92, 0x9b, 0x74, 0xc1, 0xa0, 0x49, 0x54, 0xb7, 0x8b, 0x4b, 0x60, 0x35, 0xe9, 0x7a,
    0x5e, 0x07, 0x8a, 0x5a, 0x0f, 0x28, 0xec, 0x96, 0xd5, 0x47, 0xbf, 0xee, 0x9a, 0xce, 0x80,
    0x3a, 0xc0,
];

pub fn nums_internal_key() -> XOnlyPublicKey {
    XOnlyPublicKey::from_slice(&NUMS_BYTES).expect("valid NUMS point")
}

/// Single-leaf tree: quorum-of-custodians is the only way to spend.
#[derive(Debug, Clone)]
pub struct CustodianOnlyTree {
    pub custodian_branch: ScriptBuf,
    custodian_keys: Vec<XOnlyPublicKey>,
    spend_info: TaprootSpendInfo,
}

impl CustodianOnlyTree {
    pub fn new(
        secp: &Secp256k1<All>,
        custodian_keys: &[XOnlyPublicKey],
        custodian_quorum: u8,
    ) -> Result<Self, ScriptError> {
        let custodian_branch = quorum_script(custodian_keys, custodian_quorum, None)?;

        let spend_info = TaprootBuilder::new()
            .add_leaf(0, custodian_branch.clone())?
            .finalize(secp, nums_internal_key())
            .map_err(|_| ScriptError::TaprootFinalize)?;

        Ok(Self {
            custodian_branch,
            custodian_keys: custodian_keys.to_vec(),
            spend_info,
        })
    }

    pub fn spend_info(&self) -> &TaprootSpendInfo {
        &self.spend_info
    }

    /// The P2TR output script committing to this tree.
    pub fn locking_script(&self) -> ScriptBuf {
        ScriptBuf::new_p2tr_tweaked(self.spend_info.output_key())
    }

    pub fn signer_keys(&self) -> &[XOnlyPublicKey] {
        &self.custodian_keys
    }

    pub fn control_block(&self) -> Result<ControlBlock, ScriptError> {
        control_block(&self.spend_info, &self.custodian_branch)
    }
}

/// Which UPC branch a spender intends to satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpcSpendPath {
    UserProtocol,
    CustodianProtocol,
    CustodianUser,
}

/// Three-leaf tree for user/protocol/custodian vaults: the cooperative
/// user+protocol path sits at depth 1, the two custodian-assisted paths
/// share the other side at depth 2.
#[derive(Debug, Clone)]
pub struct UpcTree {
    pub user_protocol_branch: ScriptBuf,
    pub protocol_custodian_branch: ScriptBuf,
    pub user_custodian_branch: ScriptBuf,
    user_key: XOnlyPublicKey,
    protocol_key: XOnlyPublicKey,
    custodian_keys: Vec<XOnlyPublicKey>,
    spend_info: TaprootSpendInfo,
}

impl UpcTree {
    pub fn new(
        secp: &Secp256k1<All>,
        user_key: XOnlyPublicKey,
        protocol_key: XOnlyPublicKey,
        custodian_keys: &[XOnlyPublicKey],
        custodian_quorum: u8,
    ) -> Result<Self, ScriptError> {
        let user_protocol_branch = two_party_script(&user_key, &protocol_key);
        let protocol_custodian_branch =
            quorum_script(custodian_keys, custodian_quorum, Some(&protocol_key))?;
        let user_custodian_branch =
            quorum_script(custodian_keys, custodian_quorum, Some(&user_key))?;

        let spend_info = TaprootBuilder::new()
            .add_leaf(2, protocol_custodian_branch.clone())?
            .add_leaf(2, user_custodian_branch.clone())?
            .add_leaf(1, user_protocol_branch.clone())?
            .finalize(secp, nums_internal_key())
            .map_err(|_| ScriptError::TaprootFinalize)?;

        Ok(Self {
            user_protocol_branch,
            protocol_custodian_branch,
            user_custodian_branch,
            user_key,
            protocol_key,
            custodian_keys: custodian_keys.to_vec(),
            spend_info,
        })
    }

    pub fn spend_info(&self) -> &TaprootSpendInfo {
        &self.spend_info
    }

    pub fn locking_script(&self) -> ScriptBuf {
        ScriptBuf::new_p2tr_tweaked(self.spend_info.output_key())
    }

    /// The branch script and the keys whose signatures can satisfy it.
    pub fn spend_branch(&self, path: UpcSpendPath) -> (&ScriptBuf, Vec<XOnlyPublicKey>) {
        match path {
            UpcSpendPath::UserProtocol => (
                &self.user_protocol_branch,
                vec![self.user_key, self.protocol_key],
            ),
            UpcSpendPath::CustodianProtocol => {
                let mut keys = vec![self.protocol_key];
                keys.extend_from_slice(&self.custodian_keys);
                (&self.protocol_custodian_branch, keys)
            }
            UpcSpendPath::CustodianUser => {
                let mut keys = vec![self.user_key];
                keys.extend_from_slice(&self.custodian_keys);
                (&self.user_custodian_branch, keys)
            }
        }
    }

    pub fn control_block(&self, branch: &ScriptBuf) -> Result<ControlBlock, ScriptError> {
        control_block(&self.spend_info, branch)
    }
}

/// Which time-gated branch a spender intends to satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeGatedSpendPath {
    CustodianOnly,
    PartyTimeGated,
}

/// Two-leaf tree: the party alone after a CSV delay, or the custodian
/// quorum at any time.
#[derive(Debug, Clone)]
pub struct TimeGatedTree {
    pub csv_party_branch: ScriptBuf,
    pub custodian_branch: ScriptBuf,
    party_key: XOnlyPublicKey,
    custodian_keys: Vec<XOnlyPublicKey>,
    spend_info: TaprootSpendInfo,
}

impl TimeGatedTree {
    pub fn new(
        secp: &Secp256k1<All>,
        party_key: XOnlyPublicKey,
        custodian_keys: &[XOnlyPublicKey],
        custodian_quorum: u8,
        sequence: u16,
    ) -> Result<Self, ScriptError> {
        let csv_party_branch = csv_party_script(&party_key, sequence);
        let custodian_branch = quorum_script(custodian_keys, custodian_quorum, None)?;

        let spend_info = TaprootBuilder::new()
            .add_leaf(1, csv_party_branch.clone())?
            .add_leaf(1, custodian_branch.clone())?
            .finalize(secp, nums_internal_key())
            .map_err(|_| ScriptError::TaprootFinalize)?;

        Ok(Self {
            csv_party_branch,
            custodian_branch,
            party_key,
            custodian_keys: custodian_keys.to_vec(),
            spend_info,
        })
    }

    pub fn spend_info(&self) -> &TaprootSpendInfo {
        &self.spend_info
    }

    pub fn locking_script(&self) -> ScriptBuf {
        ScriptBuf::new_p2tr_tweaked(self.spend_info.output_key())
    }

    pub fn spend_branch(&self, path: TimeGatedSpendPath) -> (&ScriptBuf, Vec<XOnlyPublicKey>) {
        match path {
            TimeGatedSpendPath::CustodianOnly => {
                (&self.custodian_branch, self.custodian_keys.clone())
            }
            TimeGatedSpendPath::PartyTimeGated => (&self.csv_party_branch, vec![self.party_key]),
        }
    }

    pub fn control_block(&self, branch: &ScriptBuf) -> Result<ControlBlock, ScriptError> {
        control_block(&self.spend_info, branch)
    }
}

fn control_block(
    spend_info: &TaprootSpendInfo,
    branch: &ScriptBuf,
) -> Result<ControlBlock, ScriptError> {
    spend_info
        .control_block(&(branch.clone(), LeafVersion::TapScript))
        .ok_or(ScriptError::ControlBlockMissing)
}
