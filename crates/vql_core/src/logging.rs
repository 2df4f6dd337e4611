//! Logging bootstrap for processes embedding the scope runtime.
//!
//! # Responsibility
//! - Start the `flexi_logger` backend exactly once per process.
//! - Record fatal registration panics before the process unwinds.
//!
//! # Invariants
//! - Init is idempotent for the same level and target.
//! - Re-initialization with a different level or target is rejected.
//! - Initialization never panics.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info, LevelFilter};
use once_cell::sync::OnceCell;
use std::path::PathBuf;

const LOG_FILE_BASENAME: &str = "vql";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;
const MAX_PANIC_PAYLOAD_CHARS: usize = 160;

static LOGGING_STATE: OnceCell<LoggingState> = OnceCell::new();
static PANIC_HOOK_INSTALLED: OnceCell<()> = OnceCell::new();

/// Where log records are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    /// Rolling files under an absolute directory.
    Directory(PathBuf),
}

impl LogTarget {
    fn describe(&self) -> String {
        match self {
            Self::Stderr => "stderr".to_string(),
            Self::Directory(dir) => dir.display().to_string(),
        }
    }
}

struct LoggingState {
    level: &'static str,
    target: LogTarget,
    _logger: LoggerHandle,
}

/// Initializes logging with `level` (`trace|debug|info|warn|error`).
///
/// # Errors
/// - Unsupported level, relative or uncreatable directory, backend failure.
/// - Logging already active with a different level or target.
pub fn init_logging(level: &str, target: LogTarget) -> Result<(), String> {
    let level = normalize_level(level)?;
    let target = normalize_target(target)?;

    // Why: the backend can only be installed once per process, so a second
    // caller with a different setup gets an error instead of a silent no-op.
    let state = LOGGING_STATE.get_or_try_init(|| start_logger(level, &target))?;
    if state.target != target {
        return Err(format!(
            "logging already initialized at `{}`; refusing to switch to `{}`",
            state.target.describe(),
            target.describe()
        ));
    }
    if state.level != level {
        return Err(format!(
            "logging already initialized with level `{}`; refusing to switch to `{}`",
            state.level, level
        ));
    }
    Ok(())
}

/// Returns `(level, target)` once logging is active.
pub fn logging_status() -> Option<(&'static str, LogTarget)> {
    LOGGING_STATE
        .get()
        .map(|state| (state.level, state.target.clone()))
}

/// `debug` for debug builds, `info` for release builds.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn start_logger(level: &'static str, target: &LogTarget) -> Result<LoggingState, String> {
    let logger = Logger::try_with_str(level)
        .map_err(|err| format!("invalid log level `{level}`: {err}"))?;

    let logger = match target {
        LogTarget::Stderr => logger
            .log_to_stderr()
            .format_for_stderr(flexi_logger::detailed_format),
        LogTarget::Directory(dir) => {
            std::fs::create_dir_all(dir).map_err(|err| {
                format!("failed to create log directory `{}`: {err}", dir.display())
            })?;
            logger
                .log_to_file(
                    FileSpec::default()
                        .directory(dir.as_path())
                        .basename(LOG_FILE_BASENAME),
                )
                .rotate(
                    Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
                    Naming::Numbers,
                    Cleanup::KeepLogFiles(MAX_LOG_FILES),
                )
                .write_mode(WriteMode::BufferAndFlush)
                .append()
                .format_for_files(flexi_logger::detailed_format)
        }
    };
    let handle = logger
        .start()
        .map_err(|err| format!("failed to start logger: {err}"))?;

    // Why: duplicate registrations abort startup via panic; the hook is what
    // gets the offending capability name into the log before the process dies.
    install_panic_hook_once();
    info!(
        "event=logging_init module=logging status=ok level={} target={} version={}",
        level,
        target.describe(),
        env!("CARGO_PKG_VERSION")
    );

    Ok(LoggingState {
        level,
        target: target.clone(),
        _logger: handle,
    })
}

fn normalize_level(level: &str) -> Result<&'static str, String> {
    let trimmed = level.trim();
    // Why: config files written for other loggers commonly spell it out.
    let candidate = if trimmed.eq_ignore_ascii_case("warning") {
        "warn"
    } else {
        trimmed
    };
    match candidate.parse::<LevelFilter>() {
        Ok(LevelFilter::Trace) => Ok("trace"),
        Ok(LevelFilter::Debug) => Ok("debug"),
        Ok(LevelFilter::Info) => Ok("info"),
        Ok(LevelFilter::Warn) => Ok("warn"),
        Ok(LevelFilter::Error) => Ok("error"),
        Ok(LevelFilter::Off) | Err(_) => Err(format!(
            "unsupported log level `{trimmed}`; expected trace|debug|info|warn|error"
        )),
    }
}

fn normalize_target(target: LogTarget) -> Result<LogTarget, String> {
    match target {
        LogTarget::Stderr => Ok(LogTarget::Stderr),
        LogTarget::Directory(dir) => {
            if dir.as_os_str().is_empty() {
                return Err("log directory cannot be empty".to_string());
            }
            if !dir.is_absolute() {
                return Err(format!(
                    "log directory must be an absolute path, got `{}`",
                    dir.display()
                ));
            }
            Ok(LogTarget::Directory(dir))
        }
    }
}

fn install_panic_hook_once() {
    if PANIC_HOOK_INSTALLED.set(()).is_err() {
        return;
    }

    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = panic_payload_summary(panic_info);
        error!(
            "event=panic_captured module=logging status=error location={} payload={}",
            location, payload
        );
        previous_hook(panic_info);
    }));
}

fn panic_payload_summary(info: &std::panic::PanicHookInfo<'_>) -> String {
    let payload = info.payload();
    let message = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload");
    sanitize_message(message, MAX_PANIC_PAYLOAD_CHARS)
}

// Why: capability names come from third-party extensions; keep records
// single-line so key=value log parsing stays intact.
fn sanitize_message(value: &str, max_chars: usize) -> String {
    let normalized = value.replace(['\n', '\r'], " ");
    let mut truncated = normalized.chars().take(max_chars).collect::<String>();
    if normalized.chars().count() > max_chars {
        truncated.push_str("...");
    }
    truncated
}

#[cfg(test)]
mod tests {
    use super::{
        init_logging, logging_status, normalize_level, normalize_target, sanitize_message,
        LogTarget,
    };
    use std::path::PathBuf;

    #[test]
    fn normalize_level_accepts_known_values() {
        assert_eq!(normalize_level("INFO").expect("INFO should normalize"), "info");
        assert_eq!(
            normalize_level(" warning ").expect("warning should normalize"),
            "warn"
        );
        assert!(normalize_level("verbose").is_err());
        assert!(normalize_level("off").is_err());
    }

    #[test]
    fn normalize_target_rejects_relative_directory() {
        let err = normalize_target(LogTarget::Directory(PathBuf::from("logs/dev")))
            .expect_err("relative paths must be rejected");
        assert!(err.contains("absolute"));
        assert_eq!(
            normalize_target(LogTarget::Stderr).expect("stderr is always valid"),
            LogTarget::Stderr
        );
    }

    #[test]
    fn sanitize_message_removes_newlines_and_truncates() {
        let sanitized = sanitize_message("line1\nline2\rline3", 8);
        assert!(!sanitized.contains('\n'));
        assert!(!sanitized.contains('\r'));
        assert!(sanitized.ends_with("..."));
    }

    #[test]
    fn init_logging_is_idempotent_and_rejects_conflicts() {
        let dir = tempfile::tempdir().expect("temp dir");
        let target = LogTarget::Directory(dir.path().to_path_buf());

        init_logging("info", target.clone()).expect("first init should succeed");
        init_logging("INFO", target.clone()).expect("same config should be idempotent");

        let level_error =
            init_logging("debug", target.clone()).expect_err("level conflict should fail");
        assert!(level_error.contains("refusing to switch"));

        let target_error =
            init_logging("info", LogTarget::Stderr).expect_err("target conflict should fail");
        assert!(target_error.contains("refusing to switch"));

        let (level, active_target) = logging_status().expect("logging should be active");
        assert_eq!(level, "info");
        assert_eq!(active_target, target);
    }
}
