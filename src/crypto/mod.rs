//! Hash primitive shared by blocks and transactions

pub mod hash;

pub use hash::{Hash256, Hashable};
