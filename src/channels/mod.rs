//! Channel abstraction for message I/O.

pub mod channel;
pub mod cli;
pub mod dispatch;

pub use channel::*;
pub use cli::CliChannel;
pub use dispatch::{run_channel, save_document};
