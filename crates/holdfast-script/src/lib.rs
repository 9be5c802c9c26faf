//! # Holdfast script
//!
//! Taproot locking scripts for vault outputs. A vault commits to a small
//! tree of spend conditions (custodian quorums, two-party cooperation,
//! CSV-gated recovery) over an unspendable internal key, so the only way
//! to move funds is to reveal one branch and satisfy it.
//!
//! Construction is deterministic by design: custodian keys are sorted
//! before they enter a script, and leaf order is fixed per tree shape, so
//! independent implementations derive the same output script (and the
//! same address) from the same public inputs.

mod branches;
mod error;
mod tree;

pub use branches::{csv_party_script, quorum_script, two_party_script};
pub use error::ScriptError;
pub use tree::{
    nums_internal_key, CustodianOnlyTree, TimeGatedSpendPath, TimeGatedTree, UpcSpendPath,
    UpcTree,
};

#[cfg(test)]
pub(crate) fn test_keys(n: usize) -> Vec<bitcoin::XOnlyPublicKey> {
    use bitcoin::key::Keypair;
    use bitcoin::secp256k1::{Secp256k1, SecretKey};

    let secp = Secp256k1::new();
    (1..=n as u8)
        .map(|i| {
            let sk = SecretKey::from_slice(&[i; 32]).expect("non-zero secret");
            Keypair::from_secret_key(&secp, &sk).x_only_public_key().0
        })
        .collect()
}
