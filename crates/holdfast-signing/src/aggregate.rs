//! Merging collected signatures into a PSBT.
//!
//! Custodians sign concurrently on copies of the same unsigned PSBT and
//! their maps arrive in no particular order. Merging is commutative and
//! associative: each triple lands in its input's `tap_script_sigs` keyed
//! by `(key, leaf hash)`, and an entry that is already present is left
//! alone, so repeated or re-ordered deliveries converge on the same
//! state.

use bitcoin::taproot::TapLeafHash;
use bitcoin::Psbt;

use crate::{SigningError, TapScriptSigsMap};

/// Merge one signer's collected signatures into the PSBT and return the
/// serialized result. Call once per signer, in any order.
pub fn aggregate_tap_script_sigs(
    psbt: &mut Psbt,
    sigs: &TapScriptSigsMap,
) -> Result<Vec<u8>, SigningError> {
    if psbt.inputs.is_empty() {
        return Err(SigningError::InvalidPsbt);
    }
    if sigs.is_empty() {
        return Err(SigningError::NoTapScriptSigs);
    }

    let inputs = psbt.inputs.len();
    for (&index, entries) in sigs.iter() {
        let input = psbt
            .inputs
            .get_mut(index as usize)
            .ok_or(SigningError::InputIndexOutOfRange { index, inputs })?;

        for sig in entries {
            let known_leaf = input
                .tap_scripts
                .values()
                .any(|(script, version)| {
                    TapLeafHash::from_script(script, *version) == *sig.leaf_hash()
                });
            if !known_leaf {
                return Err(SigningError::UnknownLeafHash);
            }

            input
                .tap_script_sigs
                .entry((*sig.key(), *sig.leaf_hash()))
                .or_insert(*sig.sig());
        }
    }

    Ok(psbt.serialize())
}
