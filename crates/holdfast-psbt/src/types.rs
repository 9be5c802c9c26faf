use bitcoin::{Amount, OutPoint, ScriptBuf, TxOut};
use serde::{Deserialize, Serialize};

/// A previous vault output being spent. Inputs are always caller-supplied;
/// the assembler does no coin selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviousUtxo {
    pub outpoint: OutPoint,
    pub amount: Amount,
    pub script_pubkey: ScriptBuf,
}

/// An output requested by the caller on an unlocking transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockingOutput {
    pub locking_script: ScriptBuf,
    pub amount: Amount,
}

impl UnlockingOutput {
    pub fn into_tx_out(self) -> TxOut {
        TxOut {
            value: self.amount,
            script_pubkey: self.locking_script,
        }
    }
}

/// The outputs a locking transaction must create: the vault output itself
/// plus, for policies that embed metadata, a zero-value OP_RETURN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockingOutput {
    pub amount: Amount,
    pub locking_script: ScriptBuf,
    pub data_script: Option<ScriptBuf>,
}

impl LockingOutput {
    /// Output order is part of the protocol: the vault output first, the
    /// OP_RETURN second. Indexers parse locking transactions by position.
    pub fn into_tx_outs(self) -> Vec<TxOut> {
        let mut outs = vec![TxOut {
            value: self.amount,
            script_pubkey: self.locking_script,
        }];
        if let Some(data_script) = self.data_script {
            outs.push(TxOut {
                value: Amount::ZERO,
                script_pubkey: data_script,
            });
        }
        outs
    }
}
