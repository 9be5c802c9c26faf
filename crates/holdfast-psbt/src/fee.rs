//! Fee model for unlocking transactions.
//!
//! The fee is `fee_rate × estimated virtual size`. Vault inputs are
//! script-path taproot spends, so the witness grows with the custodian
//! quorum (one signature per required signer) plus the revealed script
//! and control block; the estimate folds both in per input.
//!
//! The fee is paid by the unlocking outputs, not by change: it is
//! deducted pro rata by amount, with the rounding remainder charged to
//! the first output. Zero-value outputs (the redeem OP_RETURN) never pay.

use bitcoin::{Amount, TxOut};

use crate::BuildError;

/// Virtual size of a taproot input, key material aside.
pub const P2TR_INPUT_VSIZE: u64 = 58;

/// Virtual size of a taproot-sized output.
pub const P2TR_OUTPUT_VSIZE: u64 = 43;

/// Fixed transaction overhead (version, locktime, counts, segwit marker).
pub const TX_OVERHEAD_VSIZE: u64 = 11;

/// Witness cost of one schnorr signature, in vbytes.
pub const SIGNATURE_VSIZE: u64 = 16;

/// Witness cost of revealing the script and control block, in vbytes.
pub const SCRIPT_PATH_VSIZE: u64 = 60;

#[derive(Debug, Clone, Copy)]
pub struct FeeParams {
    pub n_inputs: u64,
    pub n_outputs: u64,
    pub fee_rate: u64,
    pub custodian_quorum: u8,
}

pub fn estimate_vsize(n_inputs: u64, n_outputs: u64, custodian_quorum: u8) -> u64 {
    let input_vsize =
        P2TR_INPUT_VSIZE + SIGNATURE_VSIZE * custodian_quorum as u64 + SCRIPT_PATH_VSIZE;
    TX_OVERHEAD_VSIZE + n_inputs * input_vsize + n_outputs * P2TR_OUTPUT_VSIZE
}

pub fn calculate_fee(params: FeeParams) -> Amount {
    Amount::from_sat(
        params.fee_rate * estimate_vsize(params.n_inputs, params.n_outputs, params.custodian_quorum),
    )
}

/// Deduct `fee` from the given outputs, pro rata by amount. Fails with
/// `InsufficientFunds` if the outputs cannot cover the fee while staying
/// above zero.
pub(crate) fn distribute_fee(outputs: &mut [TxOut], fee: Amount) -> Result<(), BuildError> {
    let payers: Vec<usize> = outputs
        .iter()
        .enumerate()
        .filter(|(_, out)| out.value > Amount::ZERO)
        .map(|(i, _)| i)
        .collect();
    let total: u64 = payers.iter().map(|&i| outputs[i].value.to_sat()).sum();
    let fee = fee.to_sat();

    if fee >= total {
        return Err(BuildError::InsufficientFunds {
            available: total,
            required: fee,
        });
    }

    let mut remaining = fee;
    for &i in payers.iter().skip(1) {
        let share = fee * outputs[i].value.to_sat() / total;
        outputs[i].value = Amount::from_sat(outputs[i].value.to_sat() - share);
        remaining -= share;
    }

    // First payer absorbs its own share plus the rounding remainder.
    let first = payers[0];
    let first_value = outputs[first].value.to_sat();
    if remaining >= first_value {
        return Err(BuildError::InsufficientFunds {
            available: total,
            required: fee,
        });
    }
    outputs[first].value = Amount::from_sat(first_value - remaining);

    Ok(())
}
