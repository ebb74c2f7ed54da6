//! Logging Integration Tests
//!
//! Runs in its own test binary because it owns the global subscriber.

use bossa_shim::mobile::{bossa_configure, probe_void};
use std::ffi::CString;
use tracing::Level;

/// Test: a config loaded after the first export still sets the level
#[test]
fn test_configured_level_applies_after_first_export() {
    if std::env::var_os("RUST_LOG").is_some() {
        return;
    }

    probe_void();
    assert!(!tracing::enabled!(Level::DEBUG));

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("shim.toml");
    std::fs::write(&path, "log_level = \"debug\"\n").expect("write config");
    let path = CString::new(path.to_string_lossy().as_bytes()).expect("path");

    assert_eq!(unsafe { bossa_configure(path.as_ptr()) }, 0);
    assert!(tracing::enabled!(Level::DEBUG));
}
