//! Stand-in for `bossac` used by the integration tests.
//!
//! `--record FILE` writes the received arguments (one per line) to FILE,
//! `--cwd FILE` writes the working directory to FILE, and `--exit N` exits
//! with status N. Unknown arguments are ignored.

use anyhow::{Context, Result};
use std::process::ExitCode;

fn main() -> Result<ExitCode> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut status = 0u8;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--record" => {
                let path = iter.next().context("--record needs a path")?;
                std::fs::write(path, args.join("\n"))?;
            }
            "--cwd" => {
                let path = iter.next().context("--cwd needs a path")?;
                let cwd = std::env::current_dir()?;
                std::fs::write(path, cwd.to_string_lossy().as_bytes())?;
            }
            "--exit" => {
                let code = iter.next().context("--exit needs a code")?;
                status = code.parse().context("invalid exit code")?;
            }
            _ => {}
        }
    }

    Ok(ExitCode::from(status))
}
