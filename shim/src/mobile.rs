//! Mobile FFI bindings
//!
//! C-compatible entry points loaded by the Flutter host on Android and macOS.
//! Symbol names match the ones existing hosts already look up.

use crate::config::ShimConfig;
use crate::dispatch::{CMain, Dispatcher, ExternEntryPoint};
use crate::error::{Result, SHIM_FAILURE, ShimError};
use crate::logging;
use crate::tokenizer;
use parking_lot::RwLock;
use std::ffi::CStr;
use std::os::raw::{c_char, c_int};
use std::sync::Arc;
use tracing::{error, info};

/// Dispatcher installed by the host. `None` means the process-backed default.
static DISPATCHER: RwLock<Option<Arc<Dispatcher>>> = RwLock::new(None);

/// Last config loaded through `bossa_configure`
static CONFIG: RwLock<Option<ShimConfig>> = RwLock::new(None);

fn init_logging() {
    let config = CONFIG.read();
    logging::init(config.as_ref().map_or("info", |c| c.log_level.as_str()));
}

/// Dispatcher for the next call. The lock is released before the tool runs,
/// so a long flash never blocks reconfiguration.
fn current_dispatcher() -> Arc<Dispatcher> {
    let installed = DISPATCHER.read().clone();
    installed.unwrap_or_else(|| Arc::new(Dispatcher::default()))
}

fn ffi_status(result: Result<c_int>) -> c_int {
    result.unwrap_or_else(|e| {
        error!("{}", e);
        SHIM_FAILURE
    })
}

/// Split `buffer` in place into at most `argv_length` tokens.
///
/// Each token pointer in `argv` points into `buffer`, whose delimiters are
/// overwritten with NUL. The count is stored in `*argc` and returned.
///
/// # Safety
///
/// `buffer` must be a writable NUL-terminated string. `argv` must have room
/// for `argv_length` pointers. `argc` must be writable.
#[unsafe(export_name = "tokeniseToArgcArgv")]
pub unsafe extern "C" fn tokenise_to_argc_argv(
    buffer: *mut c_char,
    argc: *mut c_int,
    argv: *mut *mut c_char,
    argv_length: c_int,
) -> c_int {
    init_logging();

    let result = (|| {
        if buffer.is_null() {
            return Err(ShimError::NullPointer("buffer"));
        }
        if argc.is_null() {
            return Err(ShimError::NullPointer("argc"));
        }
        if argv.is_null() {
            return Err(ShimError::NullPointer("argv"));
        }

        let capacity = usize::try_from(argv_length).unwrap_or(0);

        // SAFETY: `buffer` is non-null and NUL-terminated per the contract, so
        // the slice covers exactly the string bytes before the terminator.
        let bytes = unsafe {
            let len = CStr::from_ptr(buffer).to_bytes().len();
            std::slice::from_raw_parts_mut(buffer.cast::<u8>(), len)
        };
        let starts = tokenizer::tokenize_in_place(bytes, capacity);

        // `starts.len() <= capacity <= c_int::MAX`
        let count = starts.len() as c_int;

        // SAFETY: `argv` has room for `capacity` entries and `starts.len()`
        // never exceeds it. Offsets are within `buffer`.
        unsafe {
            for (i, start) in starts.into_iter().enumerate() {
                *argv.add(i) = buffer.add(start);
            }
            *argc = count;
        }
        Ok(count)
    })();

    ffi_status(result)
}

/// Connectivity probe: writes a fixed trace line.
#[unsafe(export_name = "test_flutter_void")]
pub extern "C" fn probe_void() {
    init_logging();
    info!("probe_void called");
}

/// Connectivity probe: traces its inputs and returns `args` unchanged.
///
/// # Safety
///
/// `args` must be null or a valid NUL-terminated string.
#[unsafe(export_name = "test_flutter_pointer")]
pub unsafe extern "C" fn probe_echo(argc: c_int, args: *mut c_char) -> *mut c_char {
    init_logging();
    info!("probe_echo called");

    if args.is_null() {
        info!("probe_echo received: {} | <null>", argc);
    } else {
        // SAFETY: non-null and NUL-terminated per the contract.
        let text = unsafe { CStr::from_ptr(args) };
        info!("probe_echo received: {} | {}", argc, text.to_string_lossy());
    }

    args
}

/// Tokenize `args` and run the flashing tool with it. The bytes are passed
/// through in whatever encoding the host used.
///
/// Returns the tool's status unchanged, or -1 if the shim could not run it.
///
/// # Safety
///
/// `args` must be a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bossa_main(argc: c_int, args: *const c_char) -> c_int {
    init_logging();

    let result = (|| {
        if args.is_null() {
            return Err(ShimError::NullPointer("args"));
        }
        // SAFETY: non-null and NUL-terminated per the contract.
        let command_line = unsafe { CStr::from_ptr(args) }.to_bytes();

        current_dispatcher().dispatch_bytes(argc, command_line)
    })();

    ffi_status(result)
}

/// Load a TOML config file and install a process-backed dispatcher.
///
/// # Safety
///
/// `config_path` must be a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bossa_configure(config_path: *const c_char) -> c_int {
    let loaded = (|| {
        if config_path.is_null() {
            return Err(ShimError::NullPointer("config_path"));
        }
        // SAFETY: non-null and NUL-terminated per the contract.
        let path = unsafe { CStr::from_ptr(config_path) }
            .to_str()
            .map_err(|_| ShimError::InvalidUtf8)?;

        let config = ShimConfig::load(path)?;
        Ok((path, config))
    })();

    init_logging();

    let result = loaded.map(|(path, config)| {
        logging::set_level(&config.log_level);
        info!("Loaded configuration from {}", path);
        *DISPATCHER.write() = Some(Arc::new(Dispatcher::from_config(&config)));
        *CONFIG.write() = Some(config);
        0
    });
    ffi_status(result)
}

/// Route dispatch to a C `main` linked into this process. Always returns 0.
///
/// Passing null drops the in-process entry point and goes back to the
/// process-backed dispatcher of the last loaded config, or the unconfigured
/// default if none was loaded.
///
/// # Safety
///
/// `main` must be null or a function with C `main` semantics that stays valid
/// for the lifetime of the process.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bossa_register_main(main: Option<CMain>) -> c_int {
    init_logging();

    let config = CONFIG.read();
    let dispatcher = match main {
        Some(main) => {
            info!("Registered in-process entry point");
            let max_args = config.as_ref().map_or(tokenizer::MAX_ARGS, |c| c.max_args);
            // SAFETY: forwarded from this function's contract.
            let entry = unsafe { ExternEntryPoint::new(main) };
            Some(Arc::new(Dispatcher::new(Box::new(entry), max_args)))
        }
        None => {
            info!("Cleared in-process entry point");
            config.as_ref().map(|c| Arc::new(Dispatcher::from_config(c)))
        }
    };
    *DISPATCHER.write() = dispatcher;
    0
}
