//! Phial logging
//!
//! Leveled, environment-driven logging for the Phial dispatch core. Output
//! goes to stderr in one of three formats and can be bridged into the `log`
//! facade or, with the `tracing` feature, a `tracing` subscriber.
//!
//! # Usage
//!
//! ```rust
//! use phial_log::{debug, info, warn};
//!
//! info!("registered {} routes", 3);
//! let path = "/articles/2019/";
//! debug!(target: "phial::router", "resolving {}", path);
//! warn!("handler failed");
//! ```
//!
//! # Environment Variables
//!
//! - `PHIAL_DEBUG=1` - Enable debug logging
//! - `PHIAL_LOG_LEVEL=trace|debug|info|warn|error|off` - Minimum level
//! - `PHIAL_LOG_FORMAT=pretty|compact|json` - Output format
//! - `PHIAL_LOG_TIMESTAMPS=0|1` - Include timestamps

use once_cell::sync::Lazy;
use std::fmt;
use std::io::Write;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

// ============================================================================
// Levels and formats
// ============================================================================

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    /// Disables all output.
    Off = 5,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Off => "OFF",
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Level::Trace,
            1 => Level::Debug,
            2 => Level::Info,
            3 => Level::Warn,
            4 => Level::Error,
            _ => Level::Off,
        }
    }
}

impl FromStr for Level {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Level::Trace),
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            "off" | "none" => Ok(Level::Off),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<log::Level> for Level {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Trace => Level::Trace,
            log::Level::Debug => Level::Debug,
            log::Level::Info => Level::Info,
            log::Level::Warn => Level::Warn,
            log::Level::Error => Level::Error,
        }
    }
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `2026-01-01 12:00:00.000 INFO  [target] message`
    Pretty,
    /// `12:00:00 I target: message`
    Compact,
    /// One JSON object per line
    Json,
}

impl FromStr for Format {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Format::Pretty),
            "compact" => Ok(Format::Compact),
            "json" => Ok(Format::Json),
            _ => Err(()),
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);
static LOG_LEVEL: AtomicU8 = AtomicU8::new(Level::Info as u8);
static CONFIG: Lazy<LogConfig> = Lazy::new(|| {
    let config = LogConfig::from_env();
    config.apply();
    config
});

/// Logging configuration, resolved once from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub debug: bool,
    pub level: Level,
    pub format: Format,
    pub timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            debug: false,
            level: Level::Info,
            format: Format::Json,
            timestamps: true,
        }
    }
}

impl LogConfig {
    /// Read `PHIAL_*` variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |key: &str| {
            lookup(key).map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        };

        let debug = flag("PHIAL_DEBUG").unwrap_or(false);
        let level = lookup("PHIAL_LOG_LEVEL")
            .and_then(|s| s.parse().ok())
            .unwrap_or(if debug { Level::Debug } else { Level::Info });
        let format = lookup("PHIAL_LOG_FORMAT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(Format::Json);
        let timestamps = flag("PHIAL_LOG_TIMESTAMPS").unwrap_or(true);

        Self {
            debug,
            level,
            format,
            timestamps,
        }
    }

    fn apply(&self) {
        DEBUG_ENABLED.store(self.debug, Ordering::SeqCst);
        LOG_LEVEL.store(self.level as u8, Ordering::SeqCst);
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Force configuration to be read from the environment now.
pub fn init() {
    Lazy::force(&CONFIG);
}

/// Resolved configuration.
pub fn config() -> &'static LogConfig {
    &CONFIG
}

#[inline]
pub fn is_debug_enabled() -> bool {
    init();
    DEBUG_ENABLED.load(Ordering::Relaxed)
}

#[inline]
pub fn is_level_enabled(level: Level) -> bool {
    init();
    level != Level::Off && level as u8 >= LOG_LEVEL.load(Ordering::Relaxed)
}

pub fn current_level() -> Level {
    Level::from_u8(LOG_LEVEL.load(Ordering::Relaxed))
}

/// Change the minimum level at runtime.
pub fn set_level(level: Level) {
    init();
    LOG_LEVEL.store(level as u8, Ordering::SeqCst);
}

/// Toggle debug mode; enabling it lowers the level to at least `Debug`.
pub fn set_debug(enabled: bool) {
    init();
    DEBUG_ENABLED.store(enabled, Ordering::SeqCst);
    if enabled && current_level() > Level::Debug {
        LOG_LEVEL.store(Level::Debug as u8, Ordering::SeqCst);
    }
}

// ============================================================================
// Output
// ============================================================================

/// Write one record if `level` is enabled. Called by the macros; prefer those.
#[doc(hidden)]
pub fn log(level: Level, target: &str, message: &str) {
    if is_level_enabled(level) {
        emit(level, target, message);
    }
}

/// Whether `debug!` records pass: debug mode or a level of `Debug` or lower.
#[doc(hidden)]
#[inline]
pub fn debug_enabled() -> bool {
    is_debug_enabled() || is_level_enabled(Level::Debug)
}

/// Write one record without a level check.
///
/// With the `tracing` feature and an active subscriber the record goes to
/// `tracing` instead of stderr.
#[doc(hidden)]
pub fn emit(level: Level, target: &str, message: &str) {
    #[cfg(feature = "tracing")]
    {
        if tracing_compat::forward(level, target, message) {
            return;
        }
    }

    let line = render(config(), level, target, message);
    let mut stderr = std::io::stderr().lock();
    let _ = writeln!(stderr, "{}", line);
}

fn render(config: &LogConfig, level: Level, target: &str, message: &str) -> String {
    match config.format {
        Format::Pretty => {
            let mut line = String::new();
            if config.timestamps {
                line.push_str(&chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f ").to_string());
            }
            line.push_str(&format!("{:5} ", level.as_str()));
            if !target.is_empty() {
                line.push_str(&format!("[{}] ", target));
            }
            line.push_str(message);
            line
        }
        Format::Compact => {
            let mut line = String::new();
            if config.timestamps {
                line.push_str(&chrono::Local::now().format("%H:%M:%S ").to_string());
            }
            let initial = level.as_str().chars().next().unwrap_or('?');
            line.push(initial);
            line.push(' ');
            if !target.is_empty() {
                line.push_str(target);
                line.push_str(": ");
            }
            line.push_str(message);
            line
        }
        Format::Json => render_json(config, level, target, message),
    }
}

#[cfg(feature = "json")]
fn render_json(config: &LogConfig, level: Level, target: &str, message: &str) -> String {
    #[derive(serde::Serialize)]
    struct Entry<'a> {
        #[serde(skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
        level: &'a str,
        target: &'a str,
        message: &'a str,
    }

    let entry = Entry {
        timestamp: config.timestamps.then(|| chrono::Utc::now().to_rfc3339()),
        level: level.as_str(),
        target,
        message,
    };
    serde_json::to_string(&entry).unwrap_or_else(|_| message.to_string())
}

#[cfg(not(feature = "json"))]
fn render_json(config: &LogConfig, level: Level, target: &str, message: &str) -> String {
    let mut line = String::from("{");
    if config.timestamps {
        line.push_str(&format!("\"timestamp\":\"{}\",", chrono::Utc::now().to_rfc3339()));
    }
    line.push_str(&format!(
        "\"level\":\"{}\",\"target\":\"{}\",\"message\":\"{}\"}}",
        level.as_str(),
        escape_json(target),
        escape_json(message)
    ));
    line
}

/// Escape a string for use inside a JSON string literal.
#[cfg_attr(feature = "json", allow(dead_code))]
fn escape_json(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c if c.is_control() => escaped.push_str(&format!("\\u{:04x}", c as u32)),
            c => escaped.push(c),
        }
    }
    escaped
}

// ============================================================================
// `log` facade bridge
// ============================================================================

struct Bridge;

impl log::Log for Bridge {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        is_level_enabled(metadata.level().into())
    }

    fn log(&self, record: &log::Record<'_>) {
        if self.enabled(record.metadata()) {
            log(record.level().into(), record.target(), &record.args().to_string());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static BRIDGE: Bridge = Bridge;

/// Route records from the `log` facade through Phial's formatter.
///
/// Fails if another logger was installed first.
pub fn install_log_bridge() -> Result<(), log::SetLoggerError> {
    init();
    log::set_logger(&BRIDGE)?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}

// ============================================================================
// Macros
// ============================================================================

/// Log at trace level.
#[macro_export]
macro_rules! trace {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::is_level_enabled($crate::Level::Trace) {
            $crate::log($crate::Level::Trace, $target, &format!($($arg)+));
        }
    };
    ($($arg:tt)+) => {
        $crate::trace!(target: module_path!(), $($arg)+)
    };
}

/// Log at debug level. Also emitted when `PHIAL_DEBUG=1`, whatever the
/// configured level.
///
/// ```rust
/// let pattern = r"^/articles/?$";
/// phial_log::debug!(target: "phial::router", "registered {}", pattern);
/// ```
#[macro_export]
macro_rules! debug {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::debug_enabled() {
            $crate::emit($crate::Level::Debug, $target, &format!($($arg)+));
        }
    };
    ($($arg:tt)+) => {
        $crate::debug!(target: module_path!(), $($arg)+)
    };
}

#[macro_export]
macro_rules! info {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::is_level_enabled($crate::Level::Info) {
            $crate::log($crate::Level::Info, $target, &format!($($arg)+));
        }
    };
    ($($arg:tt)+) => {
        $crate::info!(target: module_path!(), $($arg)+)
    };
}

#[macro_export]
macro_rules! warn {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::is_level_enabled($crate::Level::Warn) {
            $crate::log($crate::Level::Warn, $target, &format!($($arg)+));
        }
    };
    ($($arg:tt)+) => {
        $crate::warn!(target: module_path!(), $($arg)+)
    };
}

#[macro_export]
macro_rules! error {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::is_level_enabled($crate::Level::Error) {
            $crate::log($crate::Level::Error, $target, &format!($($arg)+));
        }
    };
    ($($arg:tt)+) => {
        $crate::error!(target: module_path!(), $($arg)+)
    };
}

// ============================================================================
// Tracing integration
// ============================================================================

#[cfg(feature = "tracing")]
pub mod tracing_compat {
    //! Forwarding into `tracing`, plus a subscriber whose default filter
    //! follows `PHIAL_LOG_LEVEL`.

    use super::*;

    /// Hand a record to the current `tracing` dispatcher.
    ///
    /// Returns `false` when no subscriber is installed, so the caller falls
    /// back to stderr. The original target travels as the `phial.target` field.
    pub(crate) fn forward(level: Level, target: &str, message: &str) -> bool {
        let active = tracing::dispatcher::get_default(|dispatch| {
            !dispatch.is::<tracing::subscriber::NoSubscriber>()
        });
        if !active {
            return false;
        }

        match level {
            Level::Trace => {
                tracing::trace!(target: "phial", { phial.target = target }, "{}", message)
            }
            Level::Debug => {
                tracing::debug!(target: "phial", { phial.target = target }, "{}", message)
            }
            Level::Info => {
                tracing::info!(target: "phial", { phial.target = target }, "{}", message)
            }
            Level::Warn => {
                tracing::warn!(target: "phial", { phial.target = target }, "{}", message)
            }
            Level::Error => {
                tracing::error!(target: "phial", { phial.target = target }, "{}", message)
            }
            Level::Off => {}
        }
        true
    }

    pub fn subscriber() -> impl tracing::Subscriber {
        use tracing_subscriber::prelude::*;
        use tracing_subscriber::{EnvFilter, fmt};

        let directive = match config().level {
            Level::Off => "off".to_string(),
            level => level.as_str().to_ascii_lowercase(),
        };
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_level_ordering() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Error < Level::Off);
    }

    #[test]
    fn test_level_parse() {
        assert_eq!("DEBUG".parse::<Level>(), Ok(Level::Debug));
        assert_eq!("warning".parse::<Level>(), Ok(Level::Warn));
        assert_eq!(" off ".parse::<Level>(), Ok(Level::Off));
        assert!("loud".parse::<Level>().is_err());
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("compact".parse::<Format>(), Ok(Format::Compact));
        assert_eq!("JSON".parse::<Format>(), Ok(Format::Json));
        assert!("xml".parse::<Format>().is_err());
    }

    #[test]
    fn test_config_defaults() {
        let config = LogConfig::from_lookup(lookup(&[]));
        assert_eq!(config, LogConfig::default());
    }

    #[test]
    fn test_debug_flag_lowers_level() {
        let config = LogConfig::from_lookup(lookup(&[("PHIAL_DEBUG", "true")]));
        assert!(config.debug);
        assert_eq!(config.level, Level::Debug);
    }

    #[test]
    fn test_explicit_level_wins_over_debug() {
        let config = LogConfig::from_lookup(lookup(&[
            ("PHIAL_DEBUG", "1"),
            ("PHIAL_LOG_LEVEL", "error"),
            ("PHIAL_LOG_FORMAT", "pretty"),
            ("PHIAL_LOG_TIMESTAMPS", "0"),
        ]));
        assert_eq!(config.level, Level::Error);
        assert_eq!(config.format, Format::Pretty);
        assert!(!config.timestamps);
    }

    #[test]
    fn test_render_without_timestamps() {
        let mut config = LogConfig::default();
        config.timestamps = false;

        config.format = Format::Pretty;
        assert_eq!(render(&config, Level::Warn, "phial", "hi"), "WARN  [phial] hi");

        config.format = Format::Compact;
        assert_eq!(render(&config, Level::Info, "phial", "hi"), "I phial: hi");

        config.format = Format::Json;
        let line = render(&config, Level::Error, "phial", "say \"hi\"");
        assert!(line.contains("\"level\":\"ERROR\""));
        assert!(line.contains("say \\\"hi\\\""));
        assert!(!line.contains("timestamp"));
    }

    #[test]
    fn test_json_lines_escape_as_json() {
        let mut config = LogConfig::default();
        config.timestamps = false;
        config.format = Format::Json;

        let line = render(&config, Level::Info, "phial", "café it's");
        assert_eq!(
            line,
            r#"{"level":"INFO","target":"phial","message":"café it's"}"#
        );
    }

    #[test]
    fn test_escape_json() {
        assert_eq!(escape_json("café it's"), "café it's");
        assert_eq!(
            escape_json("a \"b\" \\ c\nd\t\u{1}"),
            r#"a \"b\" \\ c\nd\t\u0001"#
        );
    }

    #[test]
    fn test_debug_mode_bypasses_level() {
        set_debug(true);
        set_level(Level::Error);
        assert!(!is_level_enabled(Level::Debug));
        assert!(debug_enabled());

        set_debug(false);
        assert!(!debug_enabled());
        set_level(Level::Info);
    }

    #[cfg(feature = "tracing")]
    #[test]
    fn test_records_forward_to_tracing() {
        use std::sync::{Arc, Mutex};

        #[derive(Clone, Default)]
        struct Capture(Arc<Mutex<Vec<u8>>>);

        impl Write for Capture {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            error!(target: "phial::router", "route table rebuilt");
        });

        let output = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("ERROR"));
        assert!(output.contains("route table rebuilt"));
        assert!(output.contains("phial::router"));
    }

    #[test]
    fn test_off_is_never_enabled() {
        assert!(!is_level_enabled(Level::Off));
    }

    #[tokio::test]
    async fn test_macros_from_tasks() {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                tokio::spawn(async move {
                    trace!("trace {}", i);
                    debug!(target: "phial::test", "debug {}", i);
                    info!("info {}", i);
                    warn!("warn {}", i);
                    error!(target: "phial::test", "error {}", i);
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }
    }
}
