//! Command dispatch
//!
//! Tokenizes a command line and hands the argument vector to an [`EntryPoint`].
//! The entry point's status is returned untouched. Arguments travel as raw
//! bytes so a command line in any encoding reaches the tool as given.

use crate::config::ShimConfig;
use crate::error::{Result, ShimError};
use crate::tokenizer::{self, MAX_ARGS};
use parking_lot::Mutex;
use std::ffi::{CString, OsStr};
use std::os::raw::{c_char, c_int};
use std::path::PathBuf;
use std::process::{Command, ExitStatus};
use tracing::{debug, info, warn};

/// Something that can run the flashing tool with an argument vector
pub trait EntryPoint: Send + Sync {
    /// Run with `argv` (including the program name) and return its status
    fn run(&self, argv: &[&[u8]]) -> Result<i32>;
}

/// Runs the tool as a child process
#[derive(Debug, Clone, Default)]
pub struct ProcessEntryPoint {
    program: Option<PathBuf>,
    working_dir: Option<PathBuf>,
}

impl ProcessEntryPoint {
    pub fn new(program: Option<PathBuf>, working_dir: Option<PathBuf>) -> Self {
        Self {
            program,
            working_dir,
        }
    }
}

#[cfg(unix)]
fn os_arg(bytes: &[u8]) -> Result<&OsStr> {
    use std::os::unix::ffi::OsStrExt;

    Ok(OsStr::from_bytes(bytes))
}

#[cfg(not(unix))]
fn os_arg(bytes: &[u8]) -> Result<&OsStr> {
    std::str::from_utf8(bytes)
        .map(OsStr::new)
        .map_err(|_| ShimError::InvalidUtf8)
}

impl EntryPoint for ProcessEntryPoint {
    fn run(&self, argv: &[&[u8]]) -> Result<i32> {
        let (program, args) = match (&self.program, argv.split_first()) {
            (Some(program), Some((_, rest))) => (program.clone(), rest),
            (Some(program), None) => (program.clone(), argv),
            (None, Some((first, rest))) => (PathBuf::from(os_arg(first)?), rest),
            (None, None) => return Err(ShimError::EmptyCommandLine),
        };

        let mut cmd = Command::new(&program);
        for arg in args {
            cmd.arg(os_arg(arg)?);
        }
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        debug!("Spawning {} with {} argument(s)", program.display(), args.len());

        let status = cmd
            .status()
            .map_err(|source| ShimError::Spawn { program, source })?;

        exit_code(status)
    }
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> Result<i32> {
    use std::os::unix::process::ExitStatusExt;

    match (status.code(), status.signal()) {
        (Some(code), _) => Ok(code),
        (None, Some(signal)) => {
            warn!("Tool terminated by signal {}", signal);
            Ok(128 + signal)
        }
        (None, None) => Err(ShimError::NoExitStatus),
    }
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> Result<i32> {
    status.code().ok_or(ShimError::NoExitStatus)
}

/// C `main` signature of a statically linked tool
pub type CMain = unsafe extern "C" fn(argc: c_int, argv: *mut *mut c_char) -> c_int;

/// Calls into a C `main` linked into the same process
pub struct ExternEntryPoint {
    main: CMain,
}

/// A C `main` is generally not re-entrant, so in-process calls are serialised.
static EXTERN_CALL: Mutex<()> = Mutex::new(());

impl ExternEntryPoint {
    /// # Safety
    ///
    /// `main` must be safe to call with a NUL-terminated argument vector of
    /// valid C strings, for as long as this value lives.
    pub unsafe fn new(main: CMain) -> Self {
        Self { main }
    }
}

impl EntryPoint for ExternEntryPoint {
    fn run(&self, argv: &[&[u8]]) -> Result<i32> {
        let owned = argv
            .iter()
            .map(|arg| {
                CString::new(*arg).map_err(|_| {
                    ShimError::InteriorNul(String::from_utf8_lossy(arg).into_owned())
                })
            })
            .collect::<Result<Vec<_>>>()?;

        // argv[argc] is NULL, as C callers expect.
        let mut ptrs: Vec<*mut c_char> = owned
            .iter()
            .map(|s| s.as_ptr() as *mut c_char)
            .chain(std::iter::once(std::ptr::null_mut()))
            .collect();

        let argc = c_int::try_from(owned.len()).map_err(|_| ShimError::TooManyArguments {
            count: owned.len(),
            max: c_int::MAX as usize,
        })?;

        let _guard = EXTERN_CALL.lock();
        // SAFETY: `ptrs` holds `argc` valid C strings followed by NULL, all
        // borrowed from `owned`, which outlives the call. The constructor's
        // contract covers `main` itself.
        let status = unsafe { (self.main)(argc, ptrs.as_mut_ptr()) };
        Ok(status)
    }
}

/// Tokenizes command lines and forwards them to an entry point
pub struct Dispatcher {
    entry: Box<dyn EntryPoint>,
    max_args: usize,
}

impl Dispatcher {
    pub fn new(entry: Box<dyn EntryPoint>, max_args: usize) -> Self {
        Self { entry, max_args }
    }

    /// Process-backed dispatcher built from configuration
    pub fn from_config(config: &ShimConfig) -> Self {
        let entry = ProcessEntryPoint::new(config.program.clone(), config.working_dir.clone());
        Self::new(Box::new(entry), config.max_args)
    }

    pub fn max_args(&self) -> usize {
        self.max_args
    }

    /// Tokenize `command_line` and run it.
    ///
    /// `argc` is the count reported by the caller; it is only traced.
    pub fn dispatch(&self, argc: i32, command_line: &str) -> Result<i32> {
        self.dispatch_bytes(argc, command_line.as_bytes())
    }

    /// Byte-level [`Dispatcher::dispatch`]; the command line may be in any encoding.
    pub fn dispatch_bytes(&self, argc: i32, command_line: &[u8]) -> Result<i32> {
        info!("Dispatch called");
        info!("Received: {} | {}", argc, String::from_utf8_lossy(command_line));

        let argv = tokenizer::tokenize_bytes_strict(command_line, self.max_args)?;

        for (i, arg) in argv.iter().enumerate() {
            info!("Argument {} parsed: {}", i + 1, String::from_utf8_lossy(arg));
        }

        if usize::try_from(argc).ok() != Some(argv.len()) {
            warn!(
                "Reported argument count {} differs from parsed count {}",
                argc,
                argv.len()
            );
        }

        let status = self.entry.run(&argv)?;
        info!("Tool returned status {}", status);
        Ok(status)
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(Box::new(ProcessEntryPoint::default()), MAX_ARGS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct Recording {
        status: i32,
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl EntryPoint for Recording {
        fn run(&self, argv: &[&[u8]]) -> Result<i32> {
            *self.seen.lock() = argv
                .iter()
                .map(|s| String::from_utf8_lossy(s).into_owned())
                .collect();
            Ok(self.status)
        }
    }

    fn bytes<'a>(args: &[&'a str]) -> Vec<&'a [u8]> {
        args.iter().map(|s| s.as_bytes()).collect()
    }

    fn recording(status: i32, max_args: usize) -> (Dispatcher, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let entry = Recording {
            status,
            seen: seen.clone(),
        };
        (Dispatcher::new(Box::new(entry), max_args), seen)
    }

    #[test]
    fn test_status_forwarded() {
        let (dispatcher, seen) = recording(2, MAX_ARGS);
        let status = dispatcher.dispatch(3, "bossac -i -p").unwrap();

        assert_eq!(status, 2);
        assert_eq!(*seen.lock(), ["bossac", "-i", "-p"]);
    }

    #[test]
    fn test_negative_status_forwarded() {
        let (dispatcher, _) = recording(-7, MAX_ARGS);
        assert_eq!(dispatcher.dispatch(1, "bossac").unwrap(), -7);
    }

    #[test]
    fn test_argc_mismatch_is_not_an_error() {
        let (dispatcher, seen) = recording(0, MAX_ARGS);
        assert_eq!(dispatcher.dispatch(0, "bossac --help").unwrap(), 0);
        assert_eq!(seen.lock().len(), 2);
    }

    #[test]
    fn test_overflow_rejected() {
        let (dispatcher, seen) = recording(0, 2);
        let result = dispatcher.dispatch(3, "a b c");

        assert!(matches!(
            result,
            Err(ShimError::TooManyArguments { count: 3, max: 2 })
        ));
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_process_empty_command_line() {
        let entry = ProcessEntryPoint::default();
        assert!(matches!(entry.run(&[]), Err(ShimError::EmptyCommandLine)));
    }

    #[test]
    fn test_process_spawn_failure() {
        let entry = ProcessEntryPoint::default();
        let result = entry.run(&bytes(&["/nonexistent/bossac-missing"]));
        assert!(matches!(result, Err(ShimError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_process_exit_code() {
        let entry = ProcessEntryPoint::new(Some(PathBuf::from("sh")), None);
        assert_eq!(entry.run(&bytes(&["bossac", "-c", "exit 3"])).unwrap(), 3);
    }

    #[cfg(unix)]
    #[test]
    fn test_process_signal_maps_to_shell_status() {
        let entry = ProcessEntryPoint::new(Some(PathBuf::from("sh")), None);
        let status = entry.run(&bytes(&["bossac", "-c", "kill -TERM $$"])).unwrap();
        assert_eq!(status, 128 + 15);
    }

    #[cfg(unix)]
    #[test]
    fn test_process_passes_non_utf8_arguments() {
        let entry = ProcessEntryPoint::new(Some(PathBuf::from("sh")), None);
        // `sh -c SCRIPT ARG` binds ARG to $0
        let argv: [&[u8]; 4] = [
            b"bossac",
            b"-c",
            b"test \"$0\" = \"$(printf 'fw\\377')\"",
            b"fw\xff",
        ];
        assert_eq!(entry.run(&argv).unwrap(), 0);
    }

    unsafe extern "C" fn count_args(argc: c_int, argv: *mut *mut c_char) -> c_int {
        // SAFETY: ExternEntryPoint passes argc valid pointers and a NULL terminator.
        let terminated = unsafe { (*argv.add(argc as usize)).is_null() };
        if terminated { argc * 10 } else { -1 }
    }

    #[test]
    fn test_extern_entry_point() {
        // SAFETY: count_args only reads within argv[..=argc].
        let entry = unsafe { ExternEntryPoint::new(count_args) };
        let dispatcher = Dispatcher::new(Box::new(entry), MAX_ARGS);

        assert_eq!(dispatcher.dispatch(4, "bossac -e -w fw.bin").unwrap(), 40);
        assert_eq!(dispatcher.dispatch(0, "").unwrap(), 0);
    }

    #[test]
    fn test_non_utf8_command_line_reaches_entry_point() {
        let (dispatcher, seen) = recording(5, MAX_ARGS);
        let status = dispatcher.dispatch_bytes(2, b"bossac fw\xff.bin").unwrap();

        assert_eq!(status, 5);
        assert_eq!(*seen.lock(), ["bossac", "fw\u{fffd}.bin"]);
    }

    #[test]
    fn test_extern_interior_nul() {
        // SAFETY: see test_extern_entry_point.
        let entry = unsafe { ExternEntryPoint::new(count_args) };
        let result = entry.run(&[&b"bad\0arg"[..]]);
        assert!(matches!(result, Err(ShimError::InteriorNul(_))));
    }
}
