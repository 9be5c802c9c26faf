//! Vault configuration and locking-side builders.

use bitcoin::key::Secp256k1;
use bitcoin::secp256k1::All;
use bitcoin::{absolute, transaction, Amount, Psbt, PublicKey, Transaction, XOnlyPublicKey};
use holdfast_codec::{
    service_tag_bytes, tag_bytes, ChainInfo, TaprootBranchKind, TransactionKind,
    VaultEmbeddedData, VaultEmbeddedDataV0, VaultEmbeddedDataV1, ADDRESS_SIZE, SERVICE_TAG_SIZE,
    TAG_SIZE,
};
use holdfast_script::{CustodianOnlyTree, TimeGatedTree, UpcTree};

use crate::{BuildError, LockingOutput};

/// Protocol-level configuration shared by every transaction this instance
/// builds: the OP_RETURN tags, the metadata layout version, and the
/// network byte.
///
/// Construction validates the network byte (`0` mainnet, `1` testnet) and
/// the metadata version up front so the builders can assume both.
#[derive(Debug)]
pub struct Vault {
    secp: Secp256k1<All>,
    tag: [u8; TAG_SIZE],
    service_tag: [u8; SERVICE_TAG_SIZE],
    version: u8,
    network_id: u8,
}

/// Parameters for a custodian-only locking output.
#[derive(Debug, Clone)]
pub struct CustodianLockingParams {
    pub locking_amount: u64,
    pub custodian_pubkeys: Vec<PublicKey>,
    pub custodian_quorum: u8,
    pub destination_chain: ChainInfo,
    pub destination_token_address: [u8; ADDRESS_SIZE],
    pub destination_recipient_address: [u8; ADDRESS_SIZE],
}

/// Parameters for a user/protocol/custodian locking output.
#[derive(Debug, Clone)]
pub struct UpcLockingParams {
    pub locking_amount: u64,
    pub user_pubkey: PublicKey,
    pub protocol_pubkey: PublicKey,
    pub custodian_pubkeys: Vec<PublicKey>,
    pub custodian_quorum: u8,
    pub destination_chain: ChainInfo,
    pub destination_token_address: [u8; ADDRESS_SIZE],
    pub destination_recipient_address: [u8; ADDRESS_SIZE],
}

/// Parameters for a time-gated locking output (no embedded metadata).
#[derive(Debug, Clone)]
pub struct TimeGatedLockingParams {
    pub locking_amount: u64,
    pub party_pubkey: PublicKey,
    pub custodian_pubkeys: Vec<PublicKey>,
    pub custodian_quorum: u8,
    pub sequence: u16,
}

impl Vault {
    pub fn new(
        tag: &[u8],
        service_tag: &[u8],
        version: u8,
        network_id: u8,
    ) -> Result<Self, BuildError> {
        if network_id > 1 {
            return Err(BuildError::InvalidNetwork(network_id));
        }
        if version > 1 {
            return Err(BuildError::Codec(
                holdfast_codec::CodecError::UnknownVersion(version),
            ));
        }
        Ok(Self {
            secp: Secp256k1::new(),
            tag: tag_bytes(tag),
            service_tag: service_tag_bytes(service_tag),
            version,
            network_id,
        })
    }

    pub(crate) fn secp(&self) -> &Secp256k1<All> {
        &self.secp
    }

    pub(crate) fn tag(&self) -> [u8; TAG_SIZE] {
        self.tag
    }

    pub(crate) fn service_tag(&self) -> [u8; SERVICE_TAG_SIZE] {
        self.service_tag
    }

    pub(crate) fn version(&self) -> u8 {
        self.version
    }

    pub(crate) fn network_id(&self) -> u8 {
        self.network_id
    }

    /// The vault output plus its OP_RETURN for a custodian-only policy.
    pub fn custodian_locking_output(
        &self,
        params: &CustodianLockingParams,
    ) -> Result<LockingOutput, BuildError> {
        let keys = x_only_keys(&params.custodian_pubkeys);
        let tree = CustodianOnlyTree::new(&self.secp, &keys, params.custodian_quorum)?;

        let data = self.embedded_data(
            TaprootBranchKind::CustodianOnly,
            params.custodian_quorum,
            params.destination_chain,
            params.destination_token_address,
            params.destination_recipient_address,
        );

        Ok(LockingOutput {
            amount: Amount::from_sat(params.locking_amount),
            locking_script: tree.locking_script(),
            data_script: Some(data.to_script()?),
        })
    }

    /// The vault output plus its OP_RETURN for a UPC policy.
    pub fn upc_locking_output(
        &self,
        params: &UpcLockingParams,
    ) -> Result<LockingOutput, BuildError> {
        let custodian_keys = x_only_keys(&params.custodian_pubkeys);
        let tree = UpcTree::new(
            &self.secp,
            params.user_pubkey.into(),
            params.protocol_pubkey.into(),
            &custodian_keys,
            params.custodian_quorum,
        )?;

        let data = self.embedded_data(
            TaprootBranchKind::Upc,
            params.custodian_quorum,
            params.destination_chain,
            params.destination_token_address,
            params.destination_recipient_address,
        );

        Ok(LockingOutput {
            amount: Amount::from_sat(params.locking_amount),
            locking_script: tree.locking_script(),
            data_script: Some(data.to_script()?),
        })
    }

    /// Time-gated vault output. Nothing is bridged, so no metadata rides
    /// along.
    pub fn time_gated_locking_output(
        &self,
        params: &TimeGatedLockingParams,
    ) -> Result<LockingOutput, BuildError> {
        let custodian_keys = x_only_keys(&params.custodian_pubkeys);
        let tree = TimeGatedTree::new(
            &self.secp,
            params.party_pubkey.into(),
            &custodian_keys,
            params.custodian_quorum,
            params.sequence,
        )?;

        Ok(LockingOutput {
            amount: Amount::from_sat(params.locking_amount),
            locking_script: tree.locking_script(),
            data_script: None,
        })
    }

    /// Wrap a locking output into an input-less unsigned PSBT template.
    /// The funding wallet adds its own inputs and change before signing.
    pub fn locking_psbt(&self, output: LockingOutput) -> Result<Psbt, BuildError> {
        let tx = Transaction {
            version: transaction::Version::TWO,
            lock_time: absolute::LockTime::ZERO,
            input: Vec::new(),
            output: output.into_tx_outs(),
        };
        Psbt::from_unsigned_tx(tx).map_err(|_| BuildError::FailedToBuildPsbt)
    }

    /// Metadata in the layout this vault is configured for. Version 0
    /// predates tagged chain identifiers and stores the bare chain id
    /// little-endian.
    fn embedded_data(
        &self,
        branch: TaprootBranchKind,
        custodian_quorum: u8,
        destination_chain: ChainInfo,
        destination_token_address: [u8; ADDRESS_SIZE],
        destination_recipient_address: [u8; ADDRESS_SIZE],
    ) -> VaultEmbeddedData {
        match self.version {
            0 => VaultEmbeddedData::V0(VaultEmbeddedDataV0 {
                tag: self.tag,
                network_id: self.network_id,
                branch,
                service_tag: self.service_tag,
                custodian_quorum,
                destination_chain_id: destination_chain.chain_id.to_le_bytes(),
                destination_token_address,
                destination_recipient_address,
            }),
            _ => VaultEmbeddedData::V1(VaultEmbeddedDataV1 {
                tag: self.tag,
                network_id: self.network_id,
                branch,
                transaction: TransactionKind::Locking,
                service_tag: self.service_tag,
                custodian_quorum,
                destination_chain,
                destination_token_address,
                destination_recipient_address,
            }),
        }
    }
}

pub(crate) fn x_only_keys(pubkeys: &[PublicKey]) -> Vec<XOnlyPublicKey> {
    pubkeys.iter().map(|pk| XOnlyPublicKey::from(*pk)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{test_pubkeys, TEST_CHAIN};

    fn vault(version: u8) -> Vault {
        Vault::new(b"SCALAR", b"light", version, 1).unwrap()
    }

    fn custodian_params() -> CustodianLockingParams {
        CustodianLockingParams {
            locking_amount: 100_000,
            custodian_pubkeys: test_pubkeys(5),
            custodian_quorum: 3,
            destination_chain: TEST_CHAIN,
            destination_token_address: [0xaa; ADDRESS_SIZE],
            destination_recipient_address: [0xbb; ADDRESS_SIZE],
        }
    }

    #[test]
    fn rejects_bad_network_byte() {
        assert!(matches!(
            Vault::new(b"SCALAR", b"light", 1, 2),
            Err(BuildError::InvalidNetwork(2))
        ));
    }

    #[test]
    fn rejects_unknown_version() {
        assert!(matches!(
            Vault::new(b"SCALAR", b"light", 3, 0),
            Err(BuildError::Codec(_))
        ));
    }

    #[test]
    fn custodian_locking_output_shape() {
        let output = vault(1).custodian_locking_output(&custodian_params()).unwrap();
        let outs = output.into_tx_outs();

        assert_eq!(outs.len(), 2);
        assert_eq!(outs[0].value, Amount::from_sat(100_000));
        assert!(outs[0].script_pubkey.is_p2tr());
        assert_eq!(outs[1].value, Amount::ZERO);
        assert!(outs[1].script_pubkey.is_op_return());

        let data = VaultEmbeddedData::from_script(outs[1].script_pubkey.as_bytes()).unwrap();
        assert_eq!(data.version(), 1);
        assert_eq!(data.branch(), TaprootBranchKind::CustodianOnly);
        assert_eq!(data.custodian_quorum(), 3);
    }

    #[test]
    fn version_0_vault_emits_v0_metadata() {
        let output = vault(0).custodian_locking_output(&custodian_params()).unwrap();
        let outs = output.into_tx_outs();
        let data = VaultEmbeddedData::from_script(outs[1].script_pubkey.as_bytes()).unwrap();

        assert_eq!(data.version(), 0);
        let VaultEmbeddedData::V0(v0) = data else {
            panic!("expected v0 metadata");
        };
        assert_eq!(
            u64::from_le_bytes(v0.destination_chain_id),
            TEST_CHAIN.chain_id
        );
    }

    #[test]
    fn upc_locking_output_differs_from_custodian_only() {
        let vault = vault(1);
        let keys = test_pubkeys(7);
        let upc = vault
            .upc_locking_output(&UpcLockingParams {
                locking_amount: 100_000,
                user_pubkey: keys[5],
                protocol_pubkey: keys[6],
                custodian_pubkeys: keys[..5].to_vec(),
                custodian_quorum: 3,
                destination_chain: TEST_CHAIN,
                destination_token_address: [0xaa; ADDRESS_SIZE],
                destination_recipient_address: [0xbb; ADDRESS_SIZE],
            })
            .unwrap();
        let custodian = vault.custodian_locking_output(&custodian_params()).unwrap();

        assert_ne!(upc.locking_script, custodian.locking_script);

        let data =
            VaultEmbeddedData::from_script(upc.data_script.as_ref().unwrap().as_bytes()).unwrap();
        assert_eq!(data.branch(), TaprootBranchKind::Upc);
    }

    #[test]
    fn time_gated_output_has_no_metadata() {
        let keys = test_pubkeys(4);
        let output = vault(1)
            .time_gated_locking_output(&TimeGatedLockingParams {
                locking_amount: 50_000,
                party_pubkey: keys[3],
                custodian_pubkeys: keys[..3].to_vec(),
                custodian_quorum: 2,
                sequence: 144,
            })
            .unwrap();

        assert!(output.data_script.is_none());
        assert_eq!(output.clone().into_tx_outs().len(), 1);
    }

    #[test]
    fn locking_psbt_is_an_inputless_template() {
        let vault = vault(1);
        let output = vault.custodian_locking_output(&custodian_params()).unwrap();
        let psbt = vault.locking_psbt(output).unwrap();

        assert!(psbt.unsigned_tx.input.is_empty());
        assert_eq!(psbt.unsigned_tx.output.len(), 2);
    }

    #[test]
    fn locking_output_is_deterministic() {
        let a = vault(1).custodian_locking_output(&custodian_params()).unwrap();
        let b = vault(1).custodian_locking_output(&custodian_params()).unwrap();
        assert_eq!(a, b);
    }
}
