//! Collected script-path signatures.
//!
//! Remote or air-gapped custodians do not ship whole PSBTs around: they
//! sign locally and return only their `(key, leaf hash, signature)`
//! triples, keyed by input index. [`TapScriptSigsMap`] is that minimal
//! commitment; the coordinator merges maps from every signer back into
//! the shared PSBT.

use std::collections::btree_map;
use std::collections::BTreeMap;

use bitcoin::hashes::Hash;
use bitcoin::key::Secp256k1;
use bitcoin::{taproot, NetworkKind, Psbt, TapLeafHash, XOnlyPublicKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{SigningError, SigningKeyMap};

/// One signer's commitment to one script leaf of one input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TapScriptSig {
    key: XOnlyPublicKey,
    leaf_hash: TapLeafHash,
    sig: taproot::Signature,
}

/// Fixed-width wire form of a [`TapScriptSig`]: 32 + 32 + 64 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TapScriptSigBytes {
    pub key_x_only: [u8; 32],
    pub leaf_hash: [u8; 32],
    pub signature: [u8; 64],
}

impl TapScriptSig {
    pub fn new(key: XOnlyPublicKey, leaf_hash: TapLeafHash, sig: taproot::Signature) -> Self {
        Self {
            key,
            leaf_hash,
            sig,
        }
    }

    pub fn key(&self) -> &XOnlyPublicKey {
        &self.key
    }

    pub fn leaf_hash(&self) -> &TapLeafHash {
        &self.leaf_hash
    }

    pub fn sig(&self) -> &taproot::Signature {
        &self.sig
    }

    /// Only 64-byte (default sighash) signatures have a fixed-width form;
    /// a non-default sighash byte would make this 65 bytes.
    pub fn to_bytes(&self) -> Result<TapScriptSigBytes, SigningError> {
        let signature: [u8; 64] = self
            .sig
            .to_vec()
            .try_into()
            .map_err(|_| SigningError::InvalidSignatureSize)?;
        Ok(TapScriptSigBytes {
            key_x_only: self.key.serialize(),
            leaf_hash: self.leaf_hash.to_byte_array(),
            signature,
        })
    }

    pub fn from_bytes(bytes: TapScriptSigBytes) -> Result<Self, SigningError> {
        let key = XOnlyPublicKey::from_slice(&bytes.key_x_only)
            .map_err(|_| SigningError::InvalidPublicKey)?;
        let leaf_hash = TapLeafHash::from_slice(&bytes.leaf_hash)
            .map_err(|_| SigningError::InvalidLeafHash)?;
        let sig = taproot::Signature::from_slice(&bytes.signature)
            .map_err(|_| SigningError::InvalidSignatureSize)?;
        Ok(Self {
            key,
            leaf_hash,
            sig,
        })
    }
}

#[derive(Serialize, Deserialize)]
struct TapScriptSigHex {
    key_x_only: String,
    leaf_hash: String,
    signature: String,
}

impl Serialize for TapScriptSig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let bytes = self.to_bytes().map_err(serde::ser::Error::custom)?;
        TapScriptSigHex {
            key_x_only: hex::encode(bytes.key_x_only),
            leaf_hash: hex::encode(bytes.leaf_hash),
            signature: hex::encode(bytes.signature),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TapScriptSig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        let raw = TapScriptSigHex::deserialize(deserializer)?;
        let bytes = TapScriptSigBytes {
            key_x_only: decode_fixed(&raw.key_x_only).map_err(D::Error::custom)?,
            leaf_hash: decode_fixed(&raw.leaf_hash).map_err(D::Error::custom)?,
            signature: decode_fixed(&raw.signature).map_err(D::Error::custom)?,
        };
        TapScriptSig::from_bytes(bytes).map_err(D::Error::custom)
    }
}

fn decode_fixed<const N: usize>(hex_str: &str) -> Result<[u8; N], String> {
    let bytes = hex::decode(hex_str).map_err(|err| err.to_string())?;
    bytes
        .try_into()
        .map_err(|_| format!("expected {N} bytes"))
}

/// Collected signatures per input index. Iteration order is the input
/// order, which keeps round trips and test fixtures stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapScriptSigsMap(BTreeMap<u64, Vec<TapScriptSig>>);

impl TapScriptSigsMap {
    pub fn insert(&mut self, index: u64, sigs: Vec<TapScriptSig>) {
        self.0.insert(index, sigs);
    }

    pub fn get(&self, index: u64) -> Option<&Vec<TapScriptSig>> {
        self.0.get(&index)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, u64, Vec<TapScriptSig>> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// All triples in input order.
    pub fn flatten(&self) -> Vec<TapScriptSig> {
        self.0.values().flatten().copied().collect()
    }
}

/// Sign with a single key and return only this signer's triples, keyed by
/// input index. The PSBT keeps the signatures too; callers that only
/// relay the map can drop it.
pub fn sign_psbt_and_collect_sigs(
    psbt: &mut Psbt,
    privkey: &[u8],
    network: NetworkKind,
) -> Result<TapScriptSigsMap, SigningError> {
    let secp = Secp256k1::new();
    let key_map = SigningKeyMap::from_privkey_slice(&secp, privkey, network)?;

    crate::sign::sign_by_key_map(psbt, &key_map, &secp)?;

    let mut map = TapScriptSigsMap::default();
    for (index, input) in psbt.inputs.iter().enumerate() {
        let sigs: Vec<TapScriptSig> = input
            .tap_script_sigs
            .iter()
            .filter(|((key, _), _)| key_map.privkey_for(key).is_some())
            .map(|(&(key, leaf_hash), &sig)| TapScriptSig::new(key, leaf_hash, sig))
            .collect();
        if !sigs.is_empty() {
            map.insert(index as u64, sigs);
        }
    }
    Ok(map)
}
