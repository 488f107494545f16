//! Proof-of-work admission for blocks

pub mod difficulty;
pub mod pow;

pub use difficulty::DifficultyTarget;
pub use pow::ProofOfWork;
