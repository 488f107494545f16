use crate::config::MiningConfig;
use crate::core::Block;
use crate::crypto::hash::Hash256;
use crate::mining::difficulty::DifficultyTarget;
use crate::{LedgerError, Result};
use std::time::Instant;

pub const DEFAULT_DIFFICULTY_BITS: u32 = 12;
pub const DEFAULT_MAX_NONCE: u64 = 10_000_000;

/// Brute-force nonce search against a fixed difficulty target.
#[derive(Debug, Clone)]
pub struct ProofOfWork {
    target: DifficultyTarget,
    max_nonce: u64,
}

impl ProofOfWork {
    pub fn new(bits: u32, max_nonce: u64) -> Result<Self> {
        Ok(Self {
            target: DifficultyTarget::from_bits(bits)?,
            max_nonce,
        })
    }

    pub fn from_config(config: &MiningConfig) -> Result<Self> {
        Self::new(config.difficulty_bits, config.max_nonce)
    }

    pub fn bits(&self) -> u32 {
        self.target.bits
    }

    pub fn max_nonce(&self) -> u64 {
        self.max_nonce
    }

    /// `prev_hash ‖ tx_digest ‖ timestamp ‖ bits ‖ nonce`, integers big-endian.
    /// The genesis block contributes no previous-hash bytes.
    pub fn prepare_data(&self, block: &Block, nonce: u64) -> Vec<u8> {
        let mut data = Vec::with_capacity(32 + 32 + 8 * 3);
        if let Some(prev_hash) = &block.prev_hash {
            data.extend_from_slice(prev_hash.as_bytes());
        }
        data.extend_from_slice(block.hash_transactions().as_bytes());
        data.extend_from_slice(&block.timestamp.to_be_bytes());
        data.extend_from_slice(&i64::from(self.target.bits).to_be_bytes());
        data.extend_from_slice(&nonce.to_be_bytes());
        data
    }

    /// Finds the lowest nonce whose header hash falls below the target.
    pub fn run(&self, block: &Block) -> Result<(u64, Hash256)> {
        let start_time = Instant::now();
        log::debug!(
            "⛏️  Mining block with {} transactions at difficulty {} (~{} attempts expected)",
            block.transactions.len(),
            self.target.bits,
            self.target.expected_attempts()
        );

        for nonce in 0..self.max_nonce {
            let hash = Hash256::hash(&self.prepare_data(block, nonce));

            if self.target.is_met_by(&hash) {
                let elapsed = start_time.elapsed().as_secs_f64();
                let hashrate = if elapsed > 0.0 { (nonce + 1) as f64 / elapsed } else { 0.0 };

                log::info!(
                    "✅ Block mined! Nonce: {}, Hash: {}, Time: {:.2}s, Hashrate: {:.2} H/s",
                    nonce, hash, elapsed, hashrate
                );
                return Ok((nonce, hash));
            }
        }

        log::warn!("Nonce space exhausted below {} without meeting the target", self.max_nonce);
        Err(LedgerError::ExhaustedSearchSpace {
            ceiling: self.max_nonce,
        })
    }

    /// Re-hashes the block with its own nonce. Valid only when the result is
    /// below the target, equals the stored hash, and every transaction id
    /// still matches its content.
    pub fn validate(&self, block: &Block) -> bool {
        if !block.transactions.iter().all(|tx| tx.has_valid_id()) {
            return false;
        }

        let hash = Hash256::hash(&self.prepare_data(block, block.nonce));
        hash == block.hash && self.target.is_met_by(&hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Transaction, SUBSIDY};

    const MAX_BITS_FOR_TEST: u32 = 200;

    fn default_pow() -> ProofOfWork {
        ProofOfWork::new(DEFAULT_DIFFICULTY_BITS, DEFAULT_MAX_NONCE).unwrap()
    }

    fn mined_block(pow: &ProofOfWork) -> Block {
        let coinbase = Transaction::new_coinbase("alice", SUBSIDY, "pow test");
        Block::new(vec![coinbase], None, pow).unwrap()
    }

    #[test]
    fn test_from_config_defaults() {
        let pow = ProofOfWork::from_config(&MiningConfig::default()).unwrap();

        assert_eq!(pow.bits(), 12);
        assert_eq!(pow.max_nonce(), 10_000_000);
        assert_eq!(pow.target, default_pow().target);
    }

    #[test]
    fn test_mined_block_validates() {
        let pow = default_pow();
        let block = mined_block(&pow);

        assert!(pow.validate(&block));
        assert_eq!(Hash256::hash(&pow.prepare_data(&block, block.nonce)), block.hash);
    }

    #[test]
    fn test_first_qualifying_nonce_is_returned() {
        let pow = ProofOfWork::new(8, DEFAULT_MAX_NONCE).unwrap();
        let block = mined_block(&pow);

        for nonce in 0..block.nonce {
            let hash = Hash256::hash(&pow.prepare_data(&block, nonce));
            assert!(!pow.target.is_met_by(&hash));
        }
    }

    #[test]
    fn test_header_layout() {
        let pow = default_pow();
        let mut block = mined_block(&pow);

        let genesis_data = pow.prepare_data(&block, 7);
        assert_eq!(genesis_data.len(), 32 + 8 * 3);
        assert_eq!(&genesis_data[..32], block.hash_transactions().as_bytes());
        assert_eq!(&genesis_data[32..40], &block.timestamp.to_be_bytes());
        assert_eq!(&genesis_data[40..48], &12i64.to_be_bytes());
        assert_eq!(&genesis_data[48..], &7u64.to_be_bytes());

        let prev = Hash256::hash(b"previous");
        block.prev_hash = Some(prev);
        let data = pow.prepare_data(&block, 7);
        assert_eq!(data.len(), 32 * 2 + 8 * 3);
        assert_eq!(&data[..32], prev.as_bytes());
    }

    #[test]
    fn test_exhausted_search_space() {
        let pow = ProofOfWork::new(MAX_BITS_FOR_TEST, 16).unwrap();
        let coinbase = Transaction::new_coinbase("alice", SUBSIDY, "hopeless");

        match Block::new(vec![coinbase], None, &pow) {
            Err(LedgerError::ExhaustedSearchSpace { ceiling }) => assert_eq!(ceiling, 16),
            other => panic!("expected exhausted search space, got {:?}", other),
        }
    }

    #[test]
    fn test_tampering_is_detected() {
        let pow = default_pow();
        let block = mined_block(&pow);

        let mut tampered = block.clone();
        tampered.timestamp += 1;
        assert!(!pow.validate(&tampered));

        let mut tampered = block.clone();
        tampered.nonce += 1;
        assert!(!pow.validate(&tampered));

        let mut tampered = block.clone();
        let mut bytes = *tampered.hash.as_bytes();
        bytes[31] ^= 0x01;
        tampered.hash = Hash256::new(bytes);
        assert!(!pow.validate(&tampered));

        let mut tampered = block.clone();
        tampered.prev_hash = Some(Hash256::zero());
        assert!(!pow.validate(&tampered));

        let mut tampered = block.clone();
        tampered.transactions[0].outputs[0].value = 1_000;
        assert!(!pow.validate(&tampered));

        let mut tampered = block.clone();
        tampered.transactions[0].outputs[0].script_pubkey = "mallory".to_string();
        tampered.transactions[0].set_id();
        assert!(!pow.validate(&tampered));
    }

    #[test]
    fn test_validation_uses_engine_difficulty() {
        let easy = ProofOfWork::new(1, DEFAULT_MAX_NONCE).unwrap();
        let block = mined_block(&easy);
        let hard = ProofOfWork::new(MAX_BITS_FOR_TEST, DEFAULT_MAX_NONCE).unwrap();

        assert!(easy.validate(&block));
        assert!(!hard.validate(&block));
    }
}
