//! Tapscript leaf scripts.
//!
//! Every spend path in a vault tree is one of three shapes:
//!
//! - two-party: `<x> CHECKSIGVERIFY <y> CHECKSIG`
//! - custodian quorum: optional `<prefix> CHECKSIGVERIFY`, then the
//!   custodian keys as a CHECKSIGADD accumulator terminated by
//!   `<quorum> GREATERTHANOREQUAL`
//! - time-gated party: `<sequence> CSV DROP <x> CHECKSIGVERIFY`
//!
//! Custodian keys are sorted lexicographically before they enter the
//! script so that every party, including external indexers re-deriving
//! the script, produces identical bytes regardless of the order the
//! keys arrived in.

use bitcoin::opcodes::all::{
    OP_CHECKSIG, OP_CHECKSIGADD, OP_CHECKSIGVERIFY, OP_CSV, OP_DROP, OP_GREATERTHANOREQUAL,
};
use bitcoin::script::Builder;
use bitcoin::{ScriptBuf, XOnlyPublicKey};

use crate::ScriptError;

/// `<x> CHECKSIGVERIFY <y> CHECKSIG`: both parties must sign.
pub fn two_party_script(x: &XOnlyPublicKey, y: &XOnlyPublicKey) -> ScriptBuf {
    Builder::new()
        .push_x_only_key(x)
        .push_opcode(OP_CHECKSIGVERIFY)
        .push_x_only_key(y)
        .push_opcode(OP_CHECKSIG)
        .into_script()
}

/// Quorum-of-custodians accumulator, optionally gated by a prefix key
/// that must always sign.
///
/// The custodian keys are sorted internally; duplicates are rejected
/// because a doubled key would let one signer count twice toward the
/// quorum.
pub fn quorum_script(
    custodian_keys: &[XOnlyPublicKey],
    quorum: u8,
    prefix_key: Option<&XOnlyPublicKey>,
) -> Result<ScriptBuf, ScriptError> {
    if custodian_keys.is_empty() {
        return Err(ScriptError::EmptyKeys);
    }
    if quorum == 0 || quorum as usize > custodian_keys.len() {
        return Err(ScriptError::InvalidQuorum {
            quorum,
            keys: custodian_keys.len(),
        });
    }

    let sorted = sorted_unique_keys(custodian_keys)?;

    let mut builder = Builder::new();
    if let Some(prefix_key) = prefix_key {
        builder = builder
            .push_x_only_key(prefix_key)
            .push_opcode(OP_CHECKSIGVERIFY);
    }

    builder = builder.push_x_only_key(&sorted[0]).push_opcode(OP_CHECKSIG);
    for key in &sorted[1..] {
        builder = builder.push_x_only_key(key).push_opcode(OP_CHECKSIGADD);
    }

    Ok(builder
        .push_int(quorum as i64)
        .push_opcode(OP_GREATERTHANOREQUAL)
        .into_script())
}

/// `<sequence> CSV DROP <x> CHECKSIGVERIFY`: the party may sign alone
/// once the relative timelock has matured.
pub fn csv_party_script(x: &XOnlyPublicKey, sequence: u16) -> ScriptBuf {
    Builder::new()
        .push_int(sequence as i64)
        .push_opcode(OP_CSV)
        .push_opcode(OP_DROP)
        .push_x_only_key(x)
        .push_opcode(OP_CHECKSIGVERIFY)
        .into_script()
}

pub(crate) fn sorted_unique_keys(
    keys: &[XOnlyPublicKey],
) -> Result<Vec<XOnlyPublicKey>, ScriptError> {
    let mut sorted = keys.to_vec();
    sorted.sort();
    if sorted.windows(2).any(|pair| pair[0] == pair[1]) {
        return Err(ScriptError::DuplicateKeys);
    }
    Ok(sorted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_keys;

    #[test]
    fn quorum_script_is_order_independent() {
        let keys = test_keys(5);
        let mut shuffled = keys.clone();
        shuffled.reverse();
        shuffled.swap(0, 2);

        let a = quorum_script(&keys, 3, None).unwrap();
        let b = quorum_script(&shuffled, 3, None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn quorum_script_shape() {
        let keys = test_keys(5);
        let script = quorum_script(&keys, 3, None).unwrap();
        let asm = script.to_asm_string();

        assert_eq!(asm.matches("OP_CHECKSIGADD").count(), 4);
        assert_eq!(asm.matches("OP_CHECKSIG ").count(), 1);
        assert!(asm.ends_with("OP_PUSHNUM_3 OP_GREATERTHANOREQUAL"));
        assert!(!asm.contains("OP_CHECKSIGVERIFY"));
    }

    #[test]
    fn prefixed_quorum_script_starts_with_checksigverify() {
        let keys = test_keys(4);
        let prefix = test_keys(7)[6];
        let script = quorum_script(&keys, 2, Some(&prefix)).unwrap();
        let asm = script.to_asm_string();

        assert!(asm.contains("OP_CHECKSIGVERIFY"));
        assert!(asm.starts_with(&format!("OP_PUSHBYTES_32 {:x}", prefix)));
    }

    #[test]
    fn quorum_boundaries() {
        let keys = test_keys(3);

        assert!(matches!(
            quorum_script(&[], 1, None),
            Err(ScriptError::EmptyKeys)
        ));
        assert!(matches!(
            quorum_script(&keys, 0, None),
            Err(ScriptError::InvalidQuorum { quorum: 0, keys: 3 })
        ));
        assert!(matches!(
            quorum_script(&keys, 4, None),
            Err(ScriptError::InvalidQuorum { quorum: 4, keys: 3 })
        ));

        for quorum in 1..=3 {
            assert!(quorum_script(&keys, quorum, None).is_ok());
        }
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let keys = test_keys(3);
        let duplicated = vec![keys[0], keys[1], keys[0]];
        assert!(matches!(
            quorum_script(&duplicated, 2, None),
            Err(ScriptError::DuplicateKeys)
        ));
    }

    #[test]
    fn two_party_script_shape() {
        let keys = test_keys(2);
        let asm = two_party_script(&keys[0], &keys[1]).to_asm_string();
        assert!(asm.contains("OP_CHECKSIGVERIFY"));
        assert!(asm.ends_with("OP_CHECKSIG"));
    }

    #[test]
    fn csv_party_script_shape() {
        let keys = test_keys(1);
        let asm = csv_party_script(&keys[0], 144).to_asm_string();
        assert!(asm.contains("OP_CSV"));
        assert!(asm.contains("OP_DROP"));
        assert!(asm.ends_with("OP_CHECKSIGVERIFY"));
    }
}
