//! CLI module for storewatch - command-line interface and subcommands.
//!
//! Runs the watch loop by default; `encode` prints lookup keys.

pub mod commands;

pub use commands::Cli;
