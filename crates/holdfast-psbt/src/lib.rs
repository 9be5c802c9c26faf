//! # Holdfast psbt
//!
//! Assembles the vault protocol's transactions: locking outputs (vault
//! script + embedded metadata) and unsigned unlocking PSBTs ready for the
//! custodian signing rounds.
//!
//! Everything here is a pure function of its parameters: no wallet
//! state, no coin selection, no network access. Multi-party signing
//! depends on it: every custodian rebuilds the PSBT locally and must end
//! up with the same bytes.

mod error;
pub mod fee;
mod tx;
mod types;
mod unlocking;
mod vault;

pub use error::BuildError;
pub use types::{LockingOutput, PreviousUtxo, UnlockingOutput};
pub use unlocking::{CustodianUnlockingParams, TimeGatedUnlockingParams, UpcUnlockingParams};
pub use vault::{CustodianLockingParams, TimeGatedLockingParams, UpcLockingParams, Vault};

#[cfg(test)]
pub(crate) mod test_utils {
    use bitcoin::hashes::Hash;
    use bitcoin::key::Keypair;
    use bitcoin::secp256k1::{Secp256k1, SecretKey};
    use bitcoin::{Amount, OutPoint, PublicKey, ScriptBuf, Txid};
    use holdfast_codec::{ChainInfo, ChainType};

    use crate::PreviousUtxo;

    pub const TEST_CHAIN: ChainInfo = ChainInfo {
        chain_type: ChainType::Evm,
        chain_id: 11155111,
    };

    pub fn test_pubkeys(n: usize) -> Vec<PublicKey> {
        let secp = Secp256k1::new();
        (1..=n as u8)
            .map(|i| {
                let sk = SecretKey::from_slice(&[i; 32]).expect("non-zero secret");
                PublicKey::new(Keypair::from_secret_key(&secp, &sk).public_key())
            })
            .collect()
    }

    pub fn test_utxo(txid_byte: u8, sats: u64) -> PreviousUtxo {
        PreviousUtxo {
            outpoint: OutPoint {
                txid: Txid::from_byte_array([txid_byte; 32]),
                vout: 0,
            },
            amount: Amount::from_sat(sats),
            script_pubkey: ScriptBuf::from_bytes(vec![0x51, 0x20].into_iter().chain([txid_byte; 32]).collect()),
        }
    }
}
