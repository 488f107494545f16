use crate::core::utxo::UtxoProvider;
use crate::crypto::hash::{Hash256, Hashable};
use crate::{LedgerError, Result};
use serde::{Deserialize, Serialize};

/// Block reward minted by every coinbase transaction.
pub const SUBSIDY: u64 = 10;

/// Output index carried by the single coinbase input.
pub const COINBASE_VOUT: i64 = -1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Hash256,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
}

/// Reference to an output of an earlier transaction. `txid` is `None` only
/// for the coinbase input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    pub txid: Option<Hash256>,
    pub vout: i64,
    pub script_sig: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub value: u64,
    pub script_pubkey: String,
}

impl TxInput {
    pub fn can_unlock_output_with(&self, unlocking_data: &str) -> bool {
        self.script_sig == unlocking_data
    }
}

impl TxOutput {
    pub fn new(value: u64, address: &str) -> Self {
        Self {
            value,
            script_pubkey: address.to_string(),
        }
    }

    pub fn can_be_unlocked_with(&self, unlocking_data: &str) -> bool {
        self.script_pubkey == unlocking_data
    }
}

impl Transaction {
    fn from_parts(inputs: Vec<TxInput>, outputs: Vec<TxOutput>) -> Self {
        let mut tx = Self {
            id: Hash256::zero(),
            inputs,
            outputs,
        };
        tx.set_id();
        tx
    }

    /// Mints `value` to `to`. An empty memo is replaced by a reward note.
    pub fn new_coinbase(to: &str, value: u64, memo: &str) -> Self {
        let memo = if memo.is_empty() {
            format!("Reward to '{}'", to)
        } else {
            memo.to_string()
        };

        let coinbase_input = TxInput {
            txid: None,
            vout: COINBASE_VOUT,
            script_sig: memo,
        };

        Self::from_parts(vec![coinbase_input], vec![TxOutput::new(value, to)])
    }

    /// Builds a transfer of `amount` from `from` to `to`, consuming outputs in
    /// the order the provider selects them and returning any excess as change.
    pub fn new_utxo<P>(from: &str, to: &str, amount: u64, provider: &P) -> Result<Self>
    where
        P: UtxoProvider + ?Sized,
    {
        let (accumulated, spendable) = provider.find_spendable_outputs(from, amount)?;

        if accumulated < amount {
            log::warn!("Rejected spend of {} from {}: only {} available", amount, from, accumulated);
            return Err(LedgerError::InsufficientFunds {
                required: amount,
                available: accumulated,
            });
        }

        let inputs = spendable
            .into_iter()
            .map(|(txid, vout)| TxInput {
                txid: Some(txid),
                vout: vout as i64,
                script_sig: from.to_string(),
            })
            .collect();

        let mut outputs = vec![TxOutput::new(amount, to)];
        if accumulated > amount {
            outputs.push(TxOutput::new(accumulated - amount, from));
        }

        Ok(Self::from_parts(inputs, outputs))
    }

    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1
            && self.inputs[0].txid.is_none()
            && self.inputs[0].vout == COINBASE_VOUT
    }

    pub fn set_id(&mut self) {
        self.id = self.hash();
    }

    /// True when the stored id still matches the inputs and outputs.
    pub fn has_valid_id(&self) -> bool {
        self.id == self.hash()
    }

    /// Length-prefixed layout of inputs and outputs; the id is excluded.
    fn canonical_bytes(&self) -> Vec<u8> {
        let mut data = Vec::new();

        data.extend_from_slice(&(self.inputs.len() as u32).to_be_bytes());
        for input in &self.inputs {
            match &input.txid {
                Some(txid) => {
                    data.push(32);
                    data.extend_from_slice(txid.as_bytes());
                }
                None => data.push(0),
            }
            data.extend_from_slice(&input.vout.to_be_bytes());
            data.extend_from_slice(&(input.script_sig.len() as u32).to_be_bytes());
            data.extend_from_slice(input.script_sig.as_bytes());
        }

        data.extend_from_slice(&(self.outputs.len() as u32).to_be_bytes());
        for output in &self.outputs {
            data.extend_from_slice(&output.value.to_be_bytes());
            data.extend_from_slice(&(output.script_pubkey.len() as u32).to_be_bytes());
            data.extend_from_slice(output.script_pubkey.as_bytes());
        }

        data
    }
}

impl Hashable for Transaction {
    fn hash(&self) -> Hash256 {
        Hash256::hash(&self.canonical_bytes())
    }
}
