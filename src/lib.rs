//! Minicoin - a single-node proof-of-work ledger
//!
//! This library implements:
//! - SHA-256 proof-of-work block admission with a static difficulty
//! - Hash-linked blocks persisted in sled
//! - UTXO accounting derived on demand from the chain
//! - A command line interface

pub mod core;
pub mod crypto;
pub mod mining;
pub mod storage;
pub mod cli;
pub mod error;
pub mod config;

pub use error::{LedgerError, Result};
