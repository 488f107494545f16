//! Command Line Interface for Minicoin

pub mod commands;

pub use commands::run_cli;
