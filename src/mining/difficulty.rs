use crate::crypto::hash::Hash256;
use crate::{LedgerError, Result};
use serde::{Deserialize, Serialize};

pub const MIN_DIFFICULTY_BITS: u32 = 1;
pub const MAX_DIFFICULTY_BITS: u32 = 255;

/// Threshold `2^(256 - bits)` stored as a big-endian 256-bit integer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultyTarget {
    pub bits: u32,
    pub target_hash: [u8; 32],
}

impl DifficultyTarget {
    pub fn from_bits(bits: u32) -> Result<Self> {
        if !(MIN_DIFFICULTY_BITS..=MAX_DIFFICULTY_BITS).contains(&bits) {
            return Err(LedgerError::InvalidInput(format!(
                "Difficulty bits {} outside {}..={}",
                bits, MIN_DIFFICULTY_BITS, MAX_DIFFICULTY_BITS
            )));
        }

        // Single set bit at position 256 - bits, counted from the least significant end
        let position = (256 - bits) as usize;
        let mut target_hash = [0u8; 32];
        target_hash[31 - position / 8] = 1 << (position % 8);

        Ok(Self { bits, target_hash })
    }

    /// Big-endian byte arrays compare the same way as the integers they encode.
    pub fn is_met_by(&self, hash: &Hash256) -> bool {
        hash.as_bytes() < &self.target_hash
    }

    /// Expected number of hashes to find a qualifying nonce.
    pub fn expected_attempts(&self) -> f64 {
        2_f64.powi(self.bits as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_layout() {
        let target = DifficultyTarget::from_bits(12).unwrap();
        assert_eq!(target.target_hash[0], 0x00);
        assert_eq!(target.target_hash[1], 0x10);
        assert!(target.target_hash[2..].iter().all(|b| *b == 0));

        let target = DifficultyTarget::from_bits(8).unwrap();
        assert_eq!(target.target_hash[0], 0x01);

        let target = DifficultyTarget::from_bits(1).unwrap();
        assert_eq!(target.target_hash[0], 0x80);

        let target = DifficultyTarget::from_bits(255).unwrap();
        assert_eq!(target.target_hash[31], 0x02);
    }

    #[test]
    fn test_bits_bounds() {
        assert!(DifficultyTarget::from_bits(0).is_err());
        assert!(DifficultyTarget::from_bits(256).is_err());
    }

    #[test]
    fn test_strictly_below_target() {
        let target = DifficultyTarget::from_bits(12).unwrap();

        let mut at_target = [0u8; 32];
        at_target[1] = 0x10;
        assert!(!target.is_met_by(&Hash256::new(at_target)));

        let mut below = [0xFFu8; 32];
        below[0] = 0x00;
        below[1] = 0x0F;
        assert!(target.is_met_by(&Hash256::new(below)));

        assert!(target.is_met_by(&Hash256::zero()));
        assert!(!target.is_met_by(&Hash256::new([0xFF; 32])));
    }

    #[test]
    fn test_expected_attempts() {
        let target = DifficultyTarget::from_bits(12).unwrap();
        assert_eq!(target.expected_attempts(), 4096.0);
    }
}
