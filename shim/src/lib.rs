//! BOSSA Shim Library
//!
//! C-ABI glue that lets a mobile host run the BOSSA flashing tool from a
//! single command-line string:
//! - `tokenizer`: space-delimited argument splitting
//! - `dispatch`: forwarding an argument vector to the tool's entry point
//! - `mobile`: the exported `extern "C"` surface

pub mod config;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod mobile;
pub mod tokenizer;

pub use config::ShimConfig;
pub use dispatch::{CMain, Dispatcher, EntryPoint, ExternEntryPoint, ProcessEntryPoint};
pub use error::{Result, SHIM_FAILURE, ShimError};
