//! Logging setup
//!
//! The host loads the library without running any Rust `main`, so every FFI
//! export calls [`init`] before tracing anything. The filter sits behind a
//! reload layer so a config loaded after the first export can still change
//! the level.

use std::sync::{Once, OnceLock};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, fmt, reload};

static INIT: Once = Once::new();
static FILTER: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

fn filter_for(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install a stdout `fmt` subscriber once per process.
///
/// `RUST_LOG` takes precedence over `level`. If the host already installed a
/// global subscriber, that one is kept.
pub fn init(level: &str) {
    INIT.call_once(|| {
        let (filter, handle) = reload::Layer::new(filter_for(level));

        // Output goes to a host-captured stdout, not a terminal.
        let installed = tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_ansi(false)
                    .with_writer(std::io::stdout),
            )
            .try_init();

        if installed.is_ok() {
            let _ = FILTER.set(handle);
        }
    });
}

/// Switch the installed subscriber to `level`. No-op when `RUST_LOG` is set
/// or when the subscriber belongs to the host.
pub fn set_level(level: &str) {
    if std::env::var_os("RUST_LOG").is_some() {
        return;
    }
    if let Some(handle) = FILTER.get() {
        let _ = handle.reload(filter_for(level));
    }
}
