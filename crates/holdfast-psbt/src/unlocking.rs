//! Unlocking (redeem) PSBT assembly.
//!
//! All builders here are pure: the same parameters always produce the
//! same unsigned PSBT bytes. That is load-bearing: custodians sign
//! independently, possibly on different machines, and signatures only
//! aggregate if every party derived the identical transaction.
//!
//! Output order on a redeem transaction is fixed:
//!
//! ```text
//! [0]      zero-value OP_RETURN carrying the session correlation data
//! [1..=n]  the caller's unlocking outputs (these pay the fee, pro rata)
//! [n+1]    change back to the vault, when the inputs overshoot
//! ```

use std::collections::BTreeMap;

use bitcoin::bip32::{DerivationPath, Fingerprint};
use bitcoin::psbt::{Input, PsbtSighashType};
use bitcoin::taproot::{LeafVersion, TaprootSpendInfo};
use bitcoin::{
    Amount, Psbt, PublicKey, ScriptBuf, Sequence, TapSighashType, TxOut, XOnlyPublicKey,
};
use holdfast_codec::{RedeemEmbeddedData, TaprootBranchKind, GROUP_UID_SIZE};
use holdfast_script::{
    CustodianOnlyTree, ScriptError, TimeGatedSpendPath, TimeGatedTree, UpcSpendPath, UpcTree,
};

use crate::fee::{calculate_fee, distribute_fee, FeeParams};
use crate::tx::TransactionBuilder;
use crate::vault::{x_only_keys, Vault};
use crate::{BuildError, PreviousUtxo, UnlockingOutput};

/// Parameters for a pooling-redeem transaction spending custodian-only
/// vault outputs.
#[derive(Debug, Clone)]
pub struct CustodianUnlockingParams {
    pub inputs: Vec<PreviousUtxo>,
    pub outputs: Vec<UnlockingOutput>,
    pub custodian_pubkeys: Vec<PublicKey>,
    pub custodian_quorum: u8,
    pub rbf: bool,
    pub fee_rate: u64,
    /// Position of this redeem in the custodian group's signing session.
    pub session_sequence: u64,
    /// Identifies which custodian group is authorized to sign.
    pub custodian_group_uid: [u8; GROUP_UID_SIZE],
}

/// Parameters for unlocking a UPC vault output. Redeems are 1:1 here: one
/// previous vault output, one destination output.
#[derive(Debug, Clone)]
pub struct UpcUnlockingParams {
    pub inputs: Vec<PreviousUtxo>,
    pub output: UnlockingOutput,
    pub user_pubkey: PublicKey,
    pub protocol_pubkey: PublicKey,
    pub custodian_pubkeys: Vec<PublicKey>,
    pub custodian_quorum: u8,
    pub rbf: bool,
    pub fee_rate: u64,
    pub path: UpcSpendPath,
}

/// Parameters for unlocking a time-gated vault output.
#[derive(Debug, Clone)]
pub struct TimeGatedUnlockingParams {
    pub input: PreviousUtxo,
    pub output: UnlockingOutput,
    pub party_pubkey: PublicKey,
    pub custodian_pubkeys: Vec<PublicKey>,
    pub custodian_quorum: u8,
    pub sequence: u16,
    pub fee_rate: u64,
    pub path: TimeGatedSpendPath,
}

impl Vault {
    pub fn custodian_unlocking_psbt(
        &self,
        params: &CustodianUnlockingParams,
    ) -> Result<Psbt, BuildError> {
        if params.inputs.is_empty() {
            return Err(BuildError::NoInputs);
        }
        if params.outputs.is_empty() {
            return Err(BuildError::NoOutputs);
        }

        let total_in: Amount = params.inputs.iter().map(|input| input.amount).sum();
        let total_out: Amount = params.outputs.iter().map(|output| output.amount).sum();
        if total_out == Amount::ZERO {
            return Err(BuildError::ZeroOutput);
        }
        if total_in < total_out {
            return Err(BuildError::InsufficientFunds {
                available: total_in.to_sat(),
                required: total_out.to_sat(),
            });
        }

        let keys = x_only_keys(&params.custodian_pubkeys);
        let tree = CustodianOnlyTree::new(self.secp(), &keys, params.custodian_quorum)?;

        let mut builder = TransactionBuilder::new(params.rbf);
        for input in &params.inputs {
            builder.add_input(input.outpoint);
        }

        builder.add_output(
            Amount::ZERO,
            self.redeem_data(
                TaprootBranchKind::CustodianOnly,
                params.session_sequence,
                params.custodian_group_uid,
            )
            .to_script(),
        );
        for output in &params.outputs {
            builder.add_output(output.amount, output.locking_script.clone());
        }

        let change = total_in - total_out;
        if change > Amount::ZERO {
            builder.add_output(change, tree.locking_script());
        }

        let mut unsigned_tx = builder.build();

        let fee = calculate_fee(FeeParams {
            n_inputs: unsigned_tx.input.len() as u64,
            n_outputs: unsigned_tx.output.len() as u64,
            fee_rate: params.fee_rate,
            custodian_quorum: params.custodian_quorum,
        });
        // Change never pays: the fee comes out of the redeemed amounts.
        distribute_fee(
            &mut unsigned_tx.output[1..=params.outputs.len()],
            fee,
        )?;

        let mut psbt =
            Psbt::from_unsigned_tx(unsigned_tx).map_err(|_| BuildError::FailedToBuildPsbt)?;
        psbt.inputs = prepare_psbt_inputs(
            &params.inputs,
            tree.spend_info(),
            &tree.custodian_branch,
            tree.signer_keys(),
        )?;

        Ok(psbt)
    }

    pub fn upc_unlocking_psbt(&self, params: &UpcUnlockingParams) -> Result<Psbt, BuildError> {
        if params.inputs.is_empty() {
            return Err(BuildError::NoInputs);
        }
        if params.output.amount == Amount::ZERO {
            return Err(BuildError::ZeroOutput);
        }

        let total_in: Amount = params.inputs.iter().map(|input| input.amount).sum();
        if total_in < params.output.amount {
            return Err(BuildError::InsufficientFunds {
                available: total_in.to_sat(),
                required: params.output.amount.to_sat(),
            });
        }

        let custodian_keys = x_only_keys(&params.custodian_pubkeys);
        let tree = UpcTree::new(
            self.secp(),
            params.user_pubkey.into(),
            params.protocol_pubkey.into(),
            &custodian_keys,
            params.custodian_quorum,
        )?;

        let mut builder = TransactionBuilder::new(params.rbf);
        for input in &params.inputs {
            builder.add_input(input.outpoint);
        }
        // UPC redeems are not session-sequenced; the correlation fields
        // stay zero.
        builder.add_output(
            Amount::ZERO,
            self.redeem_data(TaprootBranchKind::Upc, 0, [0u8; GROUP_UID_SIZE])
                .to_script(),
        );
        builder.add_output(params.output.amount, params.output.locking_script.clone());

        let mut unsigned_tx = builder.build();

        let fee = calculate_fee(FeeParams {
            n_inputs: unsigned_tx.input.len() as u64,
            n_outputs: unsigned_tx.output.len() as u64,
            fee_rate: params.fee_rate,
            custodian_quorum: params.custodian_quorum,
        });
        distribute_fee(&mut unsigned_tx.output[1..2], fee)?;

        let mut psbt =
            Psbt::from_unsigned_tx(unsigned_tx).map_err(|_| BuildError::FailedToBuildPsbt)?;

        let (branch, signer_keys) = tree.spend_branch(params.path);
        psbt.inputs =
            prepare_psbt_inputs(&params.inputs, tree.spend_info(), branch, &signer_keys)?;

        Ok(psbt)
    }

    pub fn time_gated_unlocking_psbt(
        &self,
        params: &TimeGatedUnlockingParams,
    ) -> Result<Psbt, BuildError> {
        if params.output.amount == Amount::ZERO {
            return Err(BuildError::ZeroOutput);
        }
        if params.input.amount < params.output.amount {
            return Err(BuildError::InsufficientFunds {
                available: params.input.amount.to_sat(),
                required: params.output.amount.to_sat(),
            });
        }

        let custodian_keys = x_only_keys(&params.custodian_pubkeys);
        let tree = TimeGatedTree::new(
            self.secp(),
            params.party_pubkey.into(),
            &custodian_keys,
            params.custodian_quorum,
            params.sequence,
        )?;

        let mut builder = TransactionBuilder::new(true);
        builder.add_input_with_sequence(
            params.input.outpoint,
            Sequence::from_height(params.sequence),
        );
        builder.add_output(params.output.amount, params.output.locking_script.clone());

        let mut unsigned_tx = builder.build();

        let fee = calculate_fee(FeeParams {
            n_inputs: 1,
            n_outputs: 1,
            fee_rate: params.fee_rate,
            custodian_quorum: params.custodian_quorum,
        });
        distribute_fee(&mut unsigned_tx.output[..], fee)?;

        let mut psbt =
            Psbt::from_unsigned_tx(unsigned_tx).map_err(|_| BuildError::FailedToBuildPsbt)?;

        let (branch, signer_keys) = tree.spend_branch(params.path);
        psbt.inputs = prepare_psbt_inputs(
            std::slice::from_ref(&params.input),
            tree.spend_info(),
            branch,
            &signer_keys,
        )?;

        Ok(psbt)
    }

    fn redeem_data(
        &self,
        branch: TaprootBranchKind,
        session_sequence: u64,
        custodian_group_uid: [u8; GROUP_UID_SIZE],
    ) -> RedeemEmbeddedData {
        RedeemEmbeddedData {
            tag: self.tag(),
            version: self.version(),
            network_id: self.network_id(),
            branch,
            service_tag: self.service_tag(),
            session_sequence,
            custodian_group_uid,
        }
    }
}

/// Populate the PSBT input fields signers need for a script-path spend:
/// the spent output, the taproot commitment, the branch being satisfied,
/// and one key-origin entry per eligible signer pointing at the branch's
/// leaf hash.
fn prepare_psbt_inputs(
    inputs: &[PreviousUtxo],
    spend_info: &TaprootSpendInfo,
    branch: &ScriptBuf,
    signer_keys: &[XOnlyPublicKey],
) -> Result<Vec<Input>, BuildError> {
    let control_block = spend_info
        .control_block(&(branch.clone(), LeafVersion::TapScript))
        .ok_or(BuildError::Script(ScriptError::ControlBlockMissing))?;
    let leaf_hash = branch.tapscript_leaf_hash();

    let mut tap_scripts = BTreeMap::new();
    tap_scripts.insert(control_block, (branch.clone(), LeafVersion::TapScript));

    let mut tap_key_origins = BTreeMap::new();
    for &key in signer_keys {
        tap_key_origins.insert(
            key,
            (
                vec![leaf_hash],
                (Fingerprint::default(), DerivationPath::default()),
            ),
        );
    }

    Ok(inputs
        .iter()
        .map(|input| Input {
            witness_utxo: Some(TxOut {
                value: input.amount,
                script_pubkey: input.script_pubkey.clone(),
            }),
            tap_internal_key: Some(spend_info.internal_key()),
            tap_merkle_root: spend_info.merkle_root(),
            tap_scripts: tap_scripts.clone(),
            tap_key_origins: tap_key_origins.clone(),
            sighash_type: Some(PsbtSighashType::from(TapSighashType::Default)),
            ..Default::default()
        })
        .collect())
}
