//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - watch: run the monitoring loop (default)
//! - encode: show the store lookup key for a digest or checkpoint

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use storewatch::config::Config;
use storewatch::poller::Dialect;

/// storewatch - watches full nodes and the transactions store for hangs
#[derive(Parser, Debug)]
#[command(name = "storewatch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only write to the log file
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the monitoring loop
    Watch(WatchArgs),

    /// Print the lookup key for a record id or checkpoint number
    Encode {
        /// Digest (base58 unless --hex) or checkpoint number
        value: String,

        /// Treat VALUE as a checkpoint sequence number
        #[arg(long, conflicts_with = "hex")]
        checkpoint: bool,

        /// Treat VALUE as a hex digest
        #[arg(long)]
        hex: bool,
    },
}

/// Overrides applied on top of the loaded config
#[derive(Args, Debug, Default, Clone)]
pub struct WatchArgs {
    /// Node RPC endpoint (repeatable; replaces configured endpoints)
    #[arg(long = "node")]
    pub nodes: Vec<String>,

    /// Transactions store base URL
    #[arg(long)]
    pub store_url: Option<String>,

    /// How the latest state is queried
    #[arg(long, value_enum)]
    pub dialect: Option<DialectArg>,

    /// Store request timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Node RPC timeout in seconds
    #[arg(long)]
    pub rpc_timeout_secs: Option<u64>,

    /// Delay between iterations in milliseconds
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Stop after this many iterations
    #[arg(long)]
    pub iterations: Option<u64>,

    /// Also ask every node for the latest records in one batch
    #[arg(long)]
    pub batch_probe: bool,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy)]
pub enum DialectArg {
    Recent,
    Checkpoint,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Recent => Dialect::Recent,
            DialectArg::Checkpoint => Dialect::Checkpoint,
        }
    }
}

impl WatchArgs {
    /// Apply command-line overrides to a loaded config
    pub fn apply(&self, config: &mut Config) {
        if !self.nodes.is_empty() {
            config.rpc.endpoints = self.nodes.clone();
        }
        if let Some(url) = &self.store_url {
            config.store.base_url = url.clone();
        }
        if let Some(dialect) = self.dialect {
            config.rpc.dialect = dialect.into();
        }
        if let Some(secs) = self.timeout_secs {
            config.store.timeout_ms = secs.saturating_mul(1000);
        }
        if let Some(secs) = self.rpc_timeout_secs {
            config.rpc.timeout_ms = secs.saturating_mul(1000);
        }
        if let Some(ms) = self.delay_ms {
            config.run.loop_delay_ms = ms;
        }
        if let Some(n) = self.iterations {
            config.run.max_iterations = Some(n);
        }
        if self.batch_probe {
            config.rpc.batch_probe = true;
        }
    }
}
