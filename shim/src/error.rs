//! Shim error types

use std::io;
use std::os::raw::c_int;
use std::path::PathBuf;
use thiserror::Error;

/// Status returned across the C ABI when the shim itself fails
/// (as opposed to the wrapped tool returning a non-zero status).
pub const SHIM_FAILURE: c_int = -1;

/// Shim errors
#[derive(Error, Debug)]
pub enum ShimError {
    #[error("Null pointer passed for `{0}`")]
    NullPointer(&'static str),

    #[error("Command line is not valid UTF-8")]
    InvalidUtf8,

    #[error("Too many arguments: {count} (max: {max})")]
    TooManyArguments { count: usize, max: usize },

    #[error("Empty command line and no program configured")]
    EmptyCommandLine,

    #[error("Argument contains an interior NUL byte: {0:?}")]
    InteriorNul(String),

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Child process exited without a status code")]
    NoExitStatus,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, ShimError>;
