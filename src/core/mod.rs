//! Core ledger components

pub mod blockchain;
pub mod block;
pub mod transaction;
pub mod utxo;

pub use blockchain::{Blockchain, BlockchainIterator};
pub use block::Block;
pub use transaction::{Transaction, TxInput, TxOutput, SUBSIDY};
pub use utxo::{UtxoEntry, UtxoProvider};
