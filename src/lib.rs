//! storewatch - early detection of slow or hanging ledger reads
//!
//! Repeatedly polls a set of full nodes for their latest state, derives
//! store lookup keys from the most advanced answer, fans out probes against
//! the transactions store, and stops the run as soon as a response is
//! classified fatal (most importantly: a request that hangs until timeout).

pub mod classify;
pub mod codec;
pub mod config;
pub mod error;
pub mod monitor;
pub mod poller;
pub mod probe;
pub mod report;
pub mod rpc;

pub use error::{Result, WatchError};
