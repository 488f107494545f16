use crate::core::{Block, Transaction, TxOutput};
use crate::crypto::hash::Hash256;
use crate::{LedgerError, Result};
use std::collections::{HashMap, HashSet};

/// Source of spendable outputs for building transfers.
pub trait UtxoProvider {
    /// Accumulates unspent outputs of `address` in scan order until the total
    /// reaches `amount`, returning the total and the chosen `(txid, vout)` pairs.
    /// The total is below `amount` only when the address cannot cover it.
    fn find_spendable_outputs(&self, address: &str, amount: u64) -> Result<(u64, Vec<(Hash256, usize)>)>;
}

/// Unspent output of a single address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtxoEntry {
    pub txid: Hash256,
    pub vout: usize,
    pub output: TxOutput,
}

/// A transaction holding at least one unspent output of the scanned address,
/// with the indices of those outputs.
#[derive(Debug, Clone)]
pub struct UnspentTransaction {
    pub transaction: Transaction,
    pub unspent: Vec<usize>,
}

impl UnspentTransaction {
    pub fn entries(&self) -> impl Iterator<Item = UtxoEntry> + '_ {
        self.unspent.iter().map(move |&vout| UtxoEntry {
            txid: self.transaction.id,
            vout,
            output: self.transaction.outputs[vout].clone(),
        })
    }
}

/// Walks blocks newest-first and collects the transactions that still hold
/// outputs locked to `address`. Inputs are marked spent for a whole block
/// before its outputs are examined, so same-block spends are honoured.
pub fn scan_unspent<I>(blocks: I, address: &str) -> Result<Vec<UnspentTransaction>>
where
    I: IntoIterator<Item = Result<Block>>,
{
    let mut spent: HashMap<Hash256, HashSet<usize>> = HashMap::new();
    let mut unspent_txs = Vec::new();

    for block in blocks {
        let block = block?;

        for tx in block.transactions.iter().filter(|tx| !tx.is_coinbase()) {
            for input in &tx.inputs {
                if !input.can_unlock_output_with(address) {
                    continue;
                }
                if let (Some(txid), Ok(vout)) = (input.txid, usize::try_from(input.vout)) {
                    spent.entry(txid).or_default().insert(vout);
                }
            }
        }

        for tx in block.transactions {
            let spent_outputs = spent.get(&tx.id);
            let unspent: Vec<usize> = tx
                .outputs
                .iter()
                .enumerate()
                .filter(|(vout, output)| {
                    output.can_be_unlocked_with(address)
                        && !spent_outputs.map_or(false, |outs| outs.contains(vout))
                })
                .map(|(vout, _)| vout)
                .collect();

            if !unspent.is_empty() {
                unspent_txs.push(UnspentTransaction {
                    transaction: tx,
                    unspent,
                });
            }
        }
    }

    Ok(unspent_txs)
}

/// Greedy selection in scan order; stops as soon as the total covers `amount`.
pub fn select_spendable(unspent_txs: &[UnspentTransaction], amount: u64) -> Result<(u64, Vec<(Hash256, usize)>)> {
    let mut accumulated = 0u64;
    let mut selected = Vec::new();

    for entry in unspent_txs.iter().flat_map(|tx| tx.entries()) {
        if accumulated >= amount {
            break;
        }
        accumulated = accumulated
            .checked_add(entry.output.value)
            .ok_or(LedgerError::ValueOverflow)?;
        selected.push((entry.txid, entry.vout));
    }

    Ok((accumulated, selected))
}

/// Sum of output values, failing instead of wrapping.
pub fn total_value<'a, I>(outputs: I) -> Result<u64>
where
    I: IntoIterator<Item = &'a TxOutput>,
{
    outputs.into_iter().try_fold(0u64, |total, output| {
        total.checked_add(output.value).ok_or(LedgerError::ValueOverflow)
    })
}
