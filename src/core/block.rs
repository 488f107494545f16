use crate::core::Transaction;
use crate::crypto::hash::Hash256;
use crate::mining::ProofOfWork;
use crate::{LedgerError, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub timestamp: i64,
    pub transactions: Vec<Transaction>,
    /// `None` only for the genesis block.
    pub prev_hash: Option<Hash256>,
    pub hash: Hash256,
    pub nonce: u64,
}

impl Block {
    /// Stamps the current time and mines the block. This is the only way a
    /// block with a valid hash and nonce comes into existence.
    pub fn new(transactions: Vec<Transaction>, prev_hash: Option<Hash256>, pow: &ProofOfWork) -> Result<Self> {
        if transactions.is_empty() {
            return Err(LedgerError::InvalidInput(
                "Block must contain at least one transaction".to_string(),
            ));
        }

        let mut block = Self {
            timestamp: Utc::now().timestamp(),
            transactions,
            prev_hash,
            hash: Hash256::zero(),
            nonce: 0,
        };

        let (nonce, hash) = pow.run(&block)?;
        block.nonce = nonce;
        block.hash = hash;

        Ok(block)
    }

    pub fn new_genesis(coinbase: Transaction, pow: &ProofOfWork) -> Result<Self> {
        Self::new(vec![coinbase], None, pow)
    }

    pub fn is_genesis(&self) -> bool {
        self.prev_hash.is_none()
    }

    /// SHA-256 over the concatenated transaction ids, in block order.
    pub fn hash_transactions(&self) -> Hash256 {
        let mut data = Vec::with_capacity(self.transactions.len() * 32);
        for tx in &self.transactions {
            data.extend_from_slice(tx.id.as_bytes());
        }
        Hash256::hash(&data)
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| LedgerError::Storage(format!("Failed to serialize block: {}", e)))
    }

    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| LedgerError::CorruptRecord(format!("Failed to deserialize block: {}", e)))
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transaction::{TxInput, TxOutput, SUBSIDY};
    use crate::mining::pow::{DEFAULT_DIFFICULTY_BITS, DEFAULT_MAX_NONCE};

    fn pow() -> ProofOfWork {
        ProofOfWork::new(DEFAULT_DIFFICULTY_BITS, DEFAULT_MAX_NONCE).unwrap()
    }

    #[test]
    fn test_genesis_block_creation() -> Result<()> {
        let pow = pow();
        let coinbase = Transaction::new_coinbase("alice", SUBSIDY, "Genesis");
        let block = Block::new_genesis(coinbase.clone(), &pow)?;

        assert!(block.is_genesis());
        assert_eq!(block.transactions, vec![coinbase]);
        assert_eq!(block.transaction_count(), 1);
        assert!(block.timestamp > 0);
        assert!(pow.validate(&block));
        Ok(())
    }

    #[test]
    fn test_linked_block_creation() -> Result<()> {
        let pow = pow();
        let genesis = Block::new_genesis(Transaction::new_coinbase("alice", SUBSIDY, ""), &pow)?;
        let next = Block::new(
            vec![Transaction::new_coinbase("bob", SUBSIDY, "")],
            Some(genesis.hash),
            &pow,
        )?;

        assert!(!next.is_genesis());
        assert_eq!(next.prev_hash, Some(genesis.hash));
        assert!(pow.validate(&next));
        Ok(())
    }

    #[test]
    fn test_empty_block_rejected() {
        assert!(matches!(
            Block::new(Vec::new(), None, &pow()),
            Err(LedgerError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_transaction_digest_is_order_sensitive() {
        let a = Transaction::new_coinbase("alice", SUBSIDY, "a");
        let b = Transaction::new_coinbase("bob", SUBSIDY, "b");

        let mut block = Block {
            timestamp: 0,
            transactions: vec![a.clone(), b.clone()],
            prev_hash: None,
            hash: Hash256::zero(),
            nonce: 0,
        };
        let forward = block.hash_transactions();

        let mut joined = Vec::new();
        joined.extend_from_slice(a.id.as_bytes());
        joined.extend_from_slice(b.id.as_bytes());
        assert_eq!(forward, Hash256::hash(&joined));

        block.transactions = vec![b, a];
        assert_ne!(block.hash_transactions(), forward);
    }

    #[test]
    fn test_serialization_round_trip() -> Result<()> {
        let pow = pow();
        let coinbase = Transaction::new_coinbase("alice", SUBSIDY, "round trip");
        let genesis = Block::new_genesis(coinbase.clone(), &pow)?;

        let mut spend = Transaction {
            id: Hash256::zero(),
            inputs: vec![TxInput {
                txid: Some(coinbase.id),
                vout: 0,
                script_sig: "alice".to_string(),
            }],
            outputs: vec![TxOutput::new(4, "bob"), TxOutput::new(6, "alice")],
        };
        spend.set_id();
        let block = Block::new(vec![spend], Some(genesis.hash), &pow)?;

        for original in [genesis, block] {
            let decoded = Block::deserialize(&original.serialize()?)?;
            assert_eq!(decoded, original);
            assert!(pow.validate(&decoded));
        }
        Ok(())
    }

    #[test]
    fn test_deserialize_garbage_is_corrupt() {
        assert!(matches!(
            Block::deserialize(&[0xde, 0xad, 0xbe, 0xef]),
            Err(LedgerError::CorruptRecord(_))
        ));
    }
}
