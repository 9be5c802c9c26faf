//! Finalization: witness assembly and raw transaction extraction.
//!
//! Each input's revealed script dictates what the witness must contain.
//! The scripts built by this workspace come in two shapes:
//!
//! - verify-chain scripts (`<k> CHECKSIGVERIFY ... <k> CHECKSIG`): every
//!   key must have signed;
//! - quorum scripts (optionally prefixed by CHECKSIGVERIFY keys): every
//!   prefix key must have signed, and at least `quorum` accumulator keys.
//!
//! Witness elements are pushed in reverse script order, so the signature
//! for the first key checked sits on top of the stack, with an empty
//! element standing in for each accumulator key that did not sign
//! (BIP 342: an empty signature contributes 0 to CHECKSIGADD, while an
//! invalid non-empty one aborts the script).
//!
//! Finalization is all-or-nothing: an input whose signatures do not meet
//! its script's requirement fails the whole call.

use std::collections::BTreeMap;

use bitcoin::consensus::serialize;
use bitcoin::opcodes::all::{OP_CHECKSIG, OP_CHECKSIGADD, OP_CHECKSIGVERIFY, OP_GREATERTHANOREQUAL};
use bitcoin::script::Instruction;
use bitcoin::taproot::{ControlBlock, LeafVersion, TapLeafHash};
use bitcoin::{taproot, Psbt, Script, ScriptBuf, Witness, XOnlyPublicKey};

use crate::SigningError;

/// Check every input meets its script's signature requirement, build the
/// final witnesses, and extract the broadcastable transaction.
pub fn finalize_psbt_and_extract_tx(psbt: &mut Psbt) -> Result<Vec<u8>, SigningError> {
    if psbt.inputs.is_empty() {
        return Err(SigningError::InvalidPsbt);
    }

    for index in 0..psbt.inputs.len() {
        finalize_taproot_input(psbt, index)?;
    }

    let tx = psbt
        .clone()
        .extract_tx()
        .map_err(|_| SigningError::FailedToExtractTx)?;
    Ok(serialize(&tx))
}

fn finalize_taproot_input(psbt: &mut Psbt, index: usize) -> Result<(), SigningError> {
    let input = &psbt.inputs[index];
    if input.final_script_witness.is_some() {
        return Ok(());
    }

    // Key-path spend: a lone signature is the whole witness.
    if input.tap_script_sigs.is_empty() {
        if let Some(key_sig) = input.tap_key_sig {
            let mut witness = Witness::new();
            witness.push(key_sig.to_vec());
            set_final_witness(psbt, index, witness);
            return Ok(());
        }
        return Err(SigningError::FailedToFinalize(
            index,
            "no signatures present".into(),
        ));
    }

    // Script path: prefer the cheapest revealed script that has
    // signatures attached.
    let mut candidates: Vec<(&ControlBlock, &ScriptBuf, LeafVersion)> = input
        .tap_scripts
        .iter()
        .map(|(control_block, (script, version))| (control_block, script, *version))
        .collect();
    candidates.sort_by_key(|(_, script, _)| script.len());

    let mut chosen = None;
    for (control_block, script, version) in candidates {
        let leaf_hash = TapLeafHash::from_script(script, version);
        let sigs: BTreeMap<XOnlyPublicKey, taproot::Signature> = input
            .tap_script_sigs
            .iter()
            .filter(|((_, hash), _)| *hash == leaf_hash)
            .map(|(&(key, _), &sig)| (key, sig))
            .collect();
        if !sigs.is_empty() {
            chosen = Some((control_block.clone(), script.clone(), sigs));
            break;
        }
    }
    let Some((control_block, script, sigs)) = chosen else {
        return Err(SigningError::FailedToFinalize(
            index,
            "signatures match no revealed script".into(),
        ));
    };

    let structure = LeafStructure::parse(&script)
        .ok_or_else(|| SigningError::FailedToFinalize(index, "unrecognized script shape".into()))?;
    structure
        .check_threshold(&sigs)
        .map_err(|reason| SigningError::FailedToFinalize(index, reason))?;

    let witness = structure.build_witness(&sigs, &script, &control_block);
    set_final_witness(psbt, index, witness);
    Ok(())
}

fn set_final_witness(psbt: &mut Psbt, index: usize, witness: Witness) {
    let input = &mut psbt.inputs[index];
    input.final_script_witness = Some(witness);
    input.partial_sigs = BTreeMap::new();
    input.sighash_type = None;
    input.redeem_script = None;
    input.witness_script = None;
    input.bip32_derivation = BTreeMap::new();
    input.tap_script_sigs = BTreeMap::new();
    input.tap_scripts = BTreeMap::new();
    input.tap_key_sig = None;
    input.tap_internal_key = None;
    input.tap_merkle_root = None;
    input.tap_key_origins = BTreeMap::new();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyRole {
    /// Consumed by CHECKSIGVERIFY (or a bare CHECKSIG with no quorum
    /// terminator): a signature is mandatory.
    Required,
    /// Part of the CHECKSIGADD accumulator counted against the quorum.
    Accumulator,
}

/// What a revealed leaf script demands of its witness: the keys in script
/// order, each with its role, and the accumulator quorum if there is one.
struct LeafStructure {
    keys: Vec<(XOnlyPublicKey, KeyRole)>,
    quorum: Option<u8>,
}

impl LeafStructure {
    /// Walk the script instructions, pairing each 32-byte key push with
    /// the opcode that consumes it. Returns `None` for shapes no vault
    /// script produces.
    fn parse(script: &Script) -> Option<Self> {
        let mut keys: Vec<(XOnlyPublicKey, KeyRole)> = Vec::new();
        let mut quorum = None;
        let mut pending_key: Option<XOnlyPublicKey> = None;
        let mut pending_number: Option<u8> = None;

        for instruction in script.instructions() {
            match instruction.ok()? {
                Instruction::PushBytes(bytes) => {
                    pending_number = None;
                    if bytes.len() == 32 {
                        pending_key = XOnlyPublicKey::from_slice(bytes.as_bytes()).ok();
                    } else if bytes.len() == 1 {
                        // Script numbers above 16 are data pushes.
                        pending_number = Some(bytes.as_bytes()[0]);
                        pending_key = None;
                    } else {
                        pending_key = None;
                    }
                }
                Instruction::Op(op) => {
                    let code = op.to_u8();
                    if op == OP_CHECKSIGVERIFY {
                        keys.push((pending_key.take()?, KeyRole::Required));
                    } else if op == OP_CHECKSIG || op == OP_CHECKSIGADD {
                        keys.push((pending_key.take()?, KeyRole::Accumulator));
                    } else if op == OP_GREATERTHANOREQUAL {
                        quorum = Some(pending_number.take()?);
                    } else if (0x51..=0x60).contains(&code) {
                        // OP_PUSHNUM_1 ..= OP_PUSHNUM_16
                        pending_number = Some(code - 0x50);
                        pending_key = None;
                    } else {
                        // CSV, DROP and friends don't involve keys.
                        pending_key = None;
                        pending_number = None;
                    }
                }
            }
        }

        if keys.is_empty() {
            return None;
        }
        Some(Self { keys, quorum })
    }

    /// With no quorum terminator every key must sign; with one, every
    /// `Required` key must sign and the accumulator must reach the
    /// quorum.
    fn check_threshold(
        &self,
        sigs: &BTreeMap<XOnlyPublicKey, taproot::Signature>,
    ) -> Result<(), String> {
        match self.quorum {
            None => {
                let missing = self
                    .keys
                    .iter()
                    .filter(|(key, _)| !sigs.contains_key(key))
                    .count();
                if missing > 0 {
                    return Err(format!("{missing} required signature(s) missing"));
                }
            }
            Some(quorum) => {
                for (key, role) in &self.keys {
                    if *role == KeyRole::Required && !sigs.contains_key(key) {
                        return Err("required prefix signature missing".into());
                    }
                }
                let accumulated = self
                    .keys
                    .iter()
                    .filter(|(key, role)| {
                        *role == KeyRole::Accumulator && sigs.contains_key(key)
                    })
                    .count();
                if accumulated < quorum as usize {
                    return Err(format!(
                        "quorum not met: {accumulated} of {quorum} signatures"
                    ));
                }
            }
        }
        Ok(())
    }

    /// Witness: one element per key in reverse script order (empty for
    /// absent accumulator signers), then the script, then the control
    /// block.
    fn build_witness(
        &self,
        sigs: &BTreeMap<XOnlyPublicKey, taproot::Signature>,
        script: &Script,
        control_block: &ControlBlock,
    ) -> Witness {
        let mut witness = Witness::new();
        for (key, _) in self.keys.iter().rev() {
            match sigs.get(key) {
                Some(sig) => witness.push(sig.to_vec()),
                None => witness.push(&[] as &[u8]),
            }
        }
        witness.push(script.as_bytes());
        witness.push(control_block.serialize());
        witness
    }
}
