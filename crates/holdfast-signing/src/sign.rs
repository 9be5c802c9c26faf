//! Single-key PSBT signing.
//!
//! A signer walks every input's `tap_key_origins`, signing the leaves its
//! key participates in (and the key path, when the key is the internal
//! key with no leaf hashes, BIP 371's convention for key-path spends).
//!
//! Signatures use schnorr with no auxiliary randomness, so signing is
//! deterministic: the same key over the same PSBT always yields the same
//! bytes. Co-signing protocols and their test fixtures rely on that.

use bitcoin::key::{Secp256k1, TapTweak};
use bitcoin::secp256k1::{All, Keypair, Message};
use bitcoin::sighash::{Prevouts, SighashCache};
use bitcoin::{taproot, NetworkKind, Psbt, TapLeafHash, TapSighashType, Transaction, TxOut};

use crate::{SigningError, SigningKeyMap};

/// Sign every input the key can satisfy. With `finalize` the witness is
/// also assembled and the raw transaction returned; otherwise the
/// part-signed PSBT is serialized as-is.
///
/// Fails with [`SigningError::FailedToSign`] when the key participates in
/// no input.
pub fn sign_psbt_by_single_key(
    psbt: &mut Psbt,
    privkey: &[u8],
    network: NetworkKind,
    finalize: bool,
) -> Result<Vec<u8>, SigningError> {
    let secp = Secp256k1::new();
    let key_map = SigningKeyMap::from_privkey_slice(&secp, privkey, network)?;

    sign_by_key_map(psbt, &key_map, &secp)?;

    if finalize {
        crate::finalize_psbt_and_extract_tx(psbt)
    } else {
        Ok(psbt.serialize())
    }
}

/// Sign with every key in the map; returns how many signatures were added.
pub(crate) fn sign_by_key_map(
    psbt: &mut Psbt,
    key_map: &SigningKeyMap,
    secp: &Secp256k1<All>,
) -> Result<usize, SigningError> {
    if psbt.inputs.is_empty() {
        return Err(SigningError::InvalidPsbt);
    }

    let tx = psbt.unsigned_tx.clone();
    let mut cache = SighashCache::new(&tx);

    let mut added = 0;
    for index in 0..psbt.inputs.len() {
        added += sign_taproot_input(psbt, index, key_map, secp, &mut cache)?;
    }

    if added == 0 {
        return Err(SigningError::FailedToSign);
    }
    Ok(added)
}

fn sign_taproot_input(
    psbt: &mut Psbt,
    index: usize,
    key_map: &SigningKeyMap,
    secp: &Secp256k1<All>,
    cache: &mut SighashCache<&Transaction>,
) -> Result<usize, SigningError> {
    // Work on a copy so the sighash helper can keep borrowing the psbt.
    let mut input = psbt.inputs[index].clone();
    let mut added = 0;

    for (&x_only, (leaf_hashes, _)) in &psbt.inputs[index].tap_key_origins {
        let Some(privkey) = key_map.privkey_for(&x_only) else {
            continue;
        };
        let keypair = Keypair::from_secret_key(secp, &privkey.inner);

        // Key-path spend: the internal key is listed with no leaf hashes.
        if let Some(internal_key) = input.tap_internal_key {
            if internal_key == x_only && leaf_hashes.is_empty() && input.tap_key_sig.is_none() {
                let (msg, sighash_type) = taproot_sighash(psbt, index, cache, None)?;
                let tweaked = keypair.tap_tweak(secp, input.tap_merkle_root).to_inner();
                let signature = secp.sign_schnorr_no_aux_rand(&msg, &tweaked);
                input.tap_key_sig = Some(taproot::Signature {
                    signature,
                    sighash_type,
                });
                added += 1;
            }
        }

        // Script-path spends: one signature per leaf not yet signed.
        for &leaf_hash in leaf_hashes {
            if input.tap_script_sigs.contains_key(&(x_only, leaf_hash)) {
                continue;
            }
            let (msg, sighash_type) = taproot_sighash(psbt, index, cache, Some(leaf_hash))?;
            let signature = secp.sign_schnorr_no_aux_rand(&msg, &keypair);
            input.tap_script_sigs.insert(
                (x_only, leaf_hash),
                taproot::Signature {
                    signature,
                    sighash_type,
                },
            );
            added += 1;
        }
    }

    psbt.inputs[index] = input;
    Ok(added)
}

/// The message a taproot signature for `index` commits to. `leaf_hash`
/// selects script-path; `None` is the key path.
pub(crate) fn taproot_sighash(
    psbt: &Psbt,
    index: usize,
    cache: &mut SighashCache<&Transaction>,
    leaf_hash: Option<TapLeafHash>,
) -> Result<(Message, TapSighashType), SigningError> {
    let sighash_type = match psbt.inputs[index].sighash_type {
        Some(ty) => ty
            .taproot_hash_ty()
            .map_err(|err| SigningError::Sighash(err.to_string()))?,
        None => TapSighashType::Default,
    };

    let prevouts: Vec<&TxOut> = psbt
        .inputs
        .iter()
        .enumerate()
        .map(|(i, input)| {
            input
                .witness_utxo
                .as_ref()
                .ok_or(SigningError::MissingWitnessUtxo(i))
        })
        .collect::<Result<_, _>>()?;
    let prevouts = Prevouts::All(&prevouts);

    let sighash = match leaf_hash {
        Some(leaf_hash) => cache
            .taproot_script_spend_signature_hash(index, &prevouts, leaf_hash, sighash_type)
            .map_err(|err| SigningError::Sighash(err.to_string()))?,
        None => cache
            .taproot_key_spend_signature_hash(index, &prevouts, sighash_type)
            .map_err(|err| SigningError::Sighash(err.to_string()))?,
    };

    Ok((Message::from(sighash), sighash_type))
}
