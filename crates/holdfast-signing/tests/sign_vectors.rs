//! Known-answer signing vectors.
//!
//! The PSBT below is a two-input custodian redeem captured from a
//! testnet4 session (5 custodians, quorum 3). Signing is deterministic,
//! so the signatures produced by the fixture key are pinned byte for
//! byte; external co-signer implementations assert the same bytes.

use bitcoin::{NetworkKind, Psbt};
use holdfast_signing::{
    network_kind_from_byte, sign_psbt_and_collect_sigs, sign_psbt_by_single_key, SigningError,
};

const PSBT_HEX: &str = "70736274ff0100a6020000000287ca13fc0a9424c6a0b372ac69d48b0df1ef690ada0a54148c912016b7e3aaaa0000000000fdffffff86b6764fd56f990f628958577fe3799e98696e41ecbaa78e7cc8ea70575ff2e80000000000fdffffff02a11900000000000016001450dceca158a9c872eb405d52293d351110572c9ee8f10200000000002251207f815abf6dfd78423a708aa8db1c2c906eecac910c035132d342e4988a37b8d5000000000001012ba0860100000000002251207f815abf6dfd78423a708aa8db1c2c906eecac910c035132d342e4988a37b8d5010304000000002215c050929b74c1a04954b78b4b6035e97a5e078a5a0f28ec96d547bfee9ace803ac0ad2015da913b3e87b4932b1e1b87d9667c28e7250aa0ed60b3a31095f541e1641488ac20594e78c0a2968210d9c1550d4ad31b03d5e4b9659cf2f67842483bb3c2bb7811ba20b59e575cef873ea95273afd55956c84590507200d410e693e4b079a426cc6102ba20e2d226cfdaec93903c3f3b81a01a81b19137627cb26e621a0afb7bcd6efbcfffba20f0f3d9beaf7a3945bcaa147e041ae1d5ca029bde7e40d8251f0783d6ecbe8fb5ba53a2c0211615da913b3e87b4932b1e1b87d9667c28e7250aa0ed60b3a31095f541e164148825015a10a5ec729629c6dd863dc28b7162e18f96b00dedd87f158b228428a298bccb000000002116594e78c0a2968210d9c1550d4ad31b03d5e4b9659cf2f67842483bb3c2bb781125015a10a5ec729629c6dd863dc28b7162e18f96b00dedd87f158b228428a298bccb000000002116b59e575cef873ea95273afd55956c84590507200d410e693e4b079a426cc610225015a10a5ec729629c6dd863dc28b7162e18f96b00dedd87f158b228428a298bccb000000002116e2d226cfdaec93903c3f3b81a01a81b19137627cb26e621a0afb7bcd6efbcfff25015a10a5ec729629c6dd863dc28b7162e18f96b00dedd87f158b228428a298bccb000000002116f0f3d9beaf7a3945bcaa147e041ae1d5ca029bde7e40d8251f0783d6ecbe8fb525015a10a5ec729629c6dd863dc28b7162e18f96b00dedd87f158b228428a298bccb0000000001172050929b74c1a04954b78b4b6035e97a5e078a5a0f28ec96d547bfee9ace803ac00118205a10a5ec729629c6dd863dc28b7162e18f96b00dedd87f158b228428a298bccb0001012ba0860100000000002251207f815abf6dfd78423a708aa8db1c2c906eecac910c035132d342e4988a37b8d5010304000000002215c050929b74c1a04954b78b4b6035e97a5e078a5a0f28ec96d547bfee9ace803ac0ad2015da913b3e87b4932b1e1b87d9667c28e7250aa0ed60b3a31095f541e1641488ac20594e78c0a2968210d9c1550d4ad31b03d5e4b9659cf2f67842483bb3c2bb7811ba20b59e575cef873ea95273afd55956c84590507200d410e693e4b079a426cc6102ba20e2d226cfdaec93903c3f3b81a01a81b19137627cb26e621a0afb7bcd6efbcfffba20f0f3d9beaf7a3945bcaa147e041ae1d5ca029bde7e40d8251f0783d6ecbe8fb5ba53a2c0211615da913b3e87b4932b1e1b87d9667c28e7250aa0ed60b3a31095f541e164148825015a10a5ec729629c6dd863dc28b7162e18f96b00dedd87f158b228428a298bccb000000002116594e78c0a2968210d9c1550d4ad31b03d5e4b9659cf2f67842483bb3c2bb781125015a10a5ec729629c6dd863dc28b7162e18f96b00dedd87f158b228428a298bccb000000002116b59e575cef873ea95273afd55956c84590507200d410e693e4b079a426cc610225015a10a5ec729629c6dd863dc28b7162e18f96b00dedd87f158b228428a298bccb000000002116e2d226cfdaec93903c3f3b81a01a81b19137627cb26e621a0afb7bcd6efbcfff25015a10a5ec729629c6dd863dc28b7162e18f96b00dedd87f158b228428a298bccb000000002116f0f3d9beaf7a3945bcaa147e041ae1d5ca029bde7e40d8251f0783d6ecbe8fb525015a10a5ec729629c6dd863dc28b7162e18f96b00dedd87f158b228428a298bccb0000000001172050929b74c1a04954b78b4b6035e97a5e078a5a0f28ec96d547bfee9ace803ac00118205a10a5ec729629c6dd863dc28b7162e18f96b00dedd87f158b228428a298bccb000000";

const PRIVKEY_HEX: &str = "f92d44713b18ec56bf387201b0439d8e8ef0731235d487f81c5f3d5f18a52af3";

const SIGNER_KEY_HEX: &str = "b59e575cef873ea95273afd55956c84590507200d410e693e4b079a426cc6102";
const LEAF_HASH_HEX: &str = "5a10a5ec729629c6dd863dc28b7162e18f96b00dedd87f158b228428a298bccb";

// One signature per input; both commit to the same key and leaf.
const EXPECTED_SIG_INPUT_0: &str = "ace560e1711c76f8df381f8a3ba2f5b9591ef7da5598e099f2e06a8ad3e8a79ac42666d9d3a2b8a212cc06b19a9a6b6871cec691c529ebf50c8368d695d5727a";
const EXPECTED_SIG_INPUT_1: &str = "593a39b8149fbfa87ab2c40b04f07db4de5c1f1023ecc8f76edb160b60c84df3c457b53988ba20151f2dec0e0c41108c7434219cf9d3376bbadb798df5bbcc49";

fn fixture_psbt() -> Psbt {
    Psbt::deserialize(&hex::decode(PSBT_HEX).unwrap()).unwrap()
}

fn fixture_privkey() -> Vec<u8> {
    hex::decode(PRIVKEY_HEX).unwrap()
}

#[test]
fn collect_sigs_matches_fixture() {
    let mut psbt = fixture_psbt();
    let sigs =
        sign_psbt_and_collect_sigs(&mut psbt, &fixture_privkey(), NetworkKind::Test).unwrap();

    let flat = sigs.flatten();
    assert_eq!(flat.len(), 2, "one signature per input");

    let expected = [EXPECTED_SIG_INPUT_0, EXPECTED_SIG_INPUT_1];
    for (sig, expected_sig) in flat.iter().zip(expected) {
        let bytes = sig.to_bytes().unwrap();
        assert_eq!(hex::encode(bytes.key_x_only), SIGNER_KEY_HEX);
        assert_eq!(hex::encode(bytes.leaf_hash), LEAF_HASH_HEX);
        assert_eq!(hex::encode(bytes.signature), expected_sig);
    }
}

#[test]
fn collect_sigs_keys_by_input_index() {
    let mut psbt = fixture_psbt();
    let sigs =
        sign_psbt_and_collect_sigs(&mut psbt, &fixture_privkey(), NetworkKind::Test).unwrap();

    assert_eq!(sigs.len(), 2);
    assert_eq!(sigs.get(0).unwrap().len(), 1);
    assert_eq!(sigs.get(1).unwrap().len(), 1);
    assert!(sigs.get(2).is_none());
}

#[test]
fn signing_without_finalize_embeds_partial_sigs() {
    let mut psbt = fixture_psbt();
    let serialized =
        sign_psbt_by_single_key(&mut psbt, &fixture_privkey(), NetworkKind::Test, false).unwrap();

    let reparsed = Psbt::deserialize(&serialized).unwrap();
    for input in &reparsed.inputs {
        assert_eq!(input.tap_script_sigs.len(), 1);
        assert!(input.final_script_witness.is_none());
    }
}

#[test]
fn signing_is_deterministic() {
    let mut a = fixture_psbt();
    let mut b = fixture_psbt();
    let sigs_a =
        sign_psbt_and_collect_sigs(&mut a, &fixture_privkey(), NetworkKind::Test).unwrap();
    let sigs_b =
        sign_psbt_and_collect_sigs(&mut b, &fixture_privkey(), NetworkKind::Test).unwrap();
    assert_eq!(sigs_a, sigs_b);
}

#[test]
fn unrelated_key_fails_to_sign() {
    let mut psbt = fixture_psbt();
    let unrelated = [0x42u8; 32];
    assert!(matches!(
        sign_psbt_and_collect_sigs(&mut psbt, &unrelated, NetworkKind::Test),
        Err(SigningError::FailedToSign)
    ));
}

#[test]
fn one_signer_cannot_finalize_a_quorum_of_three() {
    let mut psbt = fixture_psbt();
    assert!(matches!(
        sign_psbt_by_single_key(&mut psbt, &fixture_privkey(), NetworkKind::Test, true),
        Err(SigningError::FailedToFinalize(..))
    ));
}

#[test]
fn network_byte_helper_round_trips() {
    assert_eq!(network_kind_from_byte(1).unwrap(), NetworkKind::Test);
    assert!(network_kind_from_byte(9).is_err());
}
