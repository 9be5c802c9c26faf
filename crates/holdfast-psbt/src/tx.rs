use bitcoin::{
    absolute, transaction, Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut,
    Witness,
};

/// Bare v2 transaction builder. RBF is expressed through the input
/// sequence: opted-in inputs use `ENABLE_RBF_NO_LOCKTIME`, final inputs
/// use `MAX`.
pub(crate) struct TransactionBuilder {
    inputs: Vec<TxIn>,
    outputs: Vec<TxOut>,
    rbf: bool,
}

impl TransactionBuilder {
    pub fn new(rbf: bool) -> Self {
        Self {
            inputs: Vec::new(),
            outputs: Vec::new(),
            rbf,
        }
    }

    pub fn add_input(&mut self, outpoint: OutPoint) {
        let sequence = if self.rbf {
            Sequence::ENABLE_RBF_NO_LOCKTIME
        } else {
            Sequence::MAX
        };
        self.add_input_with_sequence(outpoint, sequence);
    }

    pub fn add_input_with_sequence(&mut self, outpoint: OutPoint, sequence: Sequence) {
        self.inputs.push(TxIn {
            previous_output: outpoint,
            script_sig: ScriptBuf::default(),
            sequence,
            witness: Witness::default(),
        });
    }

    pub fn add_output(&mut self, value: Amount, script_pubkey: ScriptBuf) {
        self.outputs.push(TxOut {
            value,
            script_pubkey,
        });
    }

    pub fn build(self) -> Transaction {
        Transaction {
            version: transaction::Version::TWO,
            lock_time: absolute::LockTime::ZERO,
            input: self.inputs,
            output: self.outputs,
        }
    }
}
