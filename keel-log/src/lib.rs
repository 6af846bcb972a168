//! Keel Logging
//!
//! Configures structured logging for the Keel crates. The core crates emit
//! events through `tracing`; this crate decides where those events go and how
//! they look, driven by the `KEEL_*` environment variables or by explicit
//! configuration.
//!
//! # Usage
//!
//! ```rust
//! use keel_log::{Format, Level, LogConfig};
//!
//! // Use the environment (KEEL_DEBUG, KEEL_LOG_LEVEL, ...)
//! let _installed = keel_log::init();
//!
//! // Or configure explicitly
//! let config = LogConfig::new()
//!     .level(Level::Debug)
//!     .format(Format::Compact)
//!     .with_timestamps(false);
//! let _installed = config.init();
//! ```
//!
//! # Environment Variables
//!
//! - `KEEL_DEBUG=1` - Enable debug logging
//! - `KEEL_LOG_LEVEL=trace|debug|info|warn|error|off` - Set log level
//! - `KEEL_LOG_FORMAT=pretty|json|compact` - Set output format
//! - `KEEL_LOG_COLOR=1|0` - Enable/disable colors
//! - `KEEL_LOG_TIMESTAMPS=1|0` - Include timestamps
//! - `KEEL_LOG_MODULE=1|0` - Include the event target (module path)
//! - `KEEL_LOG` - Full `EnvFilter` directive, overrides the level

use once_cell::sync::Lazy;
use std::env;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

pub use tracing::{debug, error, info, trace, warn};

// ============================================================================
// Log Levels
// ============================================================================

/// Log level for Keel logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    /// Trace level (most verbose)
    Trace = 0,
    /// Debug level
    Debug = 1,
    /// Info level
    Info = 2,
    /// Warning level
    Warn = 3,
    /// Error level (least verbose)
    Error = 4,
    /// Off (no logging)
    Off = 5,
}

impl Level {
    /// Get level from string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(Level::Trace),
            "debug" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "warn" | "warning" => Some(Level::Warn),
            "error" => Some(Level::Error),
            "off" | "none" => Some(Level::Off),
            _ => None,
        }
    }

    /// Get level name.
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

    /// Convert to the equivalent `tracing` filter.
    pub fn to_filter(&self) -> LevelFilter {
        match self {
            Level::Trace => LevelFilter::TRACE,
            Level::Debug => LevelFilter::DEBUG,
            Level::Info => LevelFilter::INFO,
            Level::Warn => LevelFilter::WARN,
            Level::Error => LevelFilter::ERROR,
            Level::Off => LevelFilter::OFF,
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Log Format
// ============================================================================

/// Output format for log messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Multi-line human readable output
    Pretty,
    /// Compact single-line format
    Compact,
    /// JSON format for structured logging (default)
    Json,
}

impl Format {
    /// Get format from string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pretty" => Some(Format::Pretty),
            "compact" => Some(Format::Compact),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Global configuration read from the environment (lazy initialized).
static CONFIG: Lazy<LogConfig> = Lazy::new(LogConfig::from_env);

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Whether debug mode is enabled
    pub debug: bool,
    /// Minimum log level
    pub level: Level,
    /// Output format
    pub format: Format,
    /// Whether colors are enabled
    pub color: bool,
    /// Whether to include timestamps
    pub timestamps: bool,
    /// Whether to include module path
    pub module_path: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            debug: false,
            level: Level::Info,
            format: Format::Json,
            color: false, // JSON output doesn't use colors
            timestamps: true,
            module_path: true,
        }
    }
}

fn env_flag(key: &str) -> Option<bool> {
    env::var(key)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

impl LogConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let debug = env_flag("KEEL_DEBUG").unwrap_or(false);

        let level = env::var("KEEL_LOG_LEVEL")
            .ok()
            .and_then(|s| Level::from_str(&s))
            .unwrap_or(if debug { Level::Debug } else { Level::Info });

        let format = env::var("KEEL_LOG_FORMAT")
            .ok()
            .and_then(|s| Format::from_str(&s))
            .unwrap_or(Format::Json);

        let color = env_flag("KEEL_LOG_COLOR").unwrap_or_else(|| {
            format != Format::Json && env::var("NO_COLOR").is_err() && env::var("TERM").is_ok()
        });

        Self {
            debug,
            level,
            format,
            color,
            timestamps: env_flag("KEEL_LOG_TIMESTAMPS").unwrap_or(true),
            module_path: env_flag("KEEL_LOG_MODULE").unwrap_or(true),
        }
    }

    /// Set the minimum level.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set the output format.
    pub fn format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Enable debug mode; lowers the level to at least `Debug`.
    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        if enabled && self.level > Level::Debug {
            self.level = Level::Debug;
        }
        self
    }

    pub fn with_color(mut self, enabled: bool) -> Self {
        self.color = enabled;
        self
    }

    pub fn with_timestamps(mut self, enabled: bool) -> Self {
        self.timestamps = enabled;
        self
    }

    pub fn with_module_path(mut self, enabled: bool) -> Self {
        self.module_path = enabled;
        self
    }

    /// The level actually applied, accounting for debug mode.
    pub fn effective_level(&self) -> Level {
        if self.debug && self.level > Level::Debug {
            Level::Debug
        } else {
            self.level
        }
    }

    /// Build the event filter for this configuration.
    ///
    /// `KEEL_LOG`, when set to a valid directive, takes precedence.
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_env("KEEL_LOG").unwrap_or_else(|_| {
            EnvFilter::builder()
                .with_default_directive(self.effective_level().to_filter().into())
                .parse_lossy("")
        })
    }

    /// Install a global `tracing` subscriber for this configuration.
    ///
    /// Returns `false` if a global subscriber was already installed.
    pub fn init(&self) -> bool {
        let builder = tracing_subscriber::fmt()
            .with_env_filter(self.env_filter())
            .with_ansi(self.color)
            .with_target(self.module_path)
            .with_writer(std::io::stderr);

        let result = match (self.format, self.timestamps) {
            #[cfg(feature = "json")]
            (Format::Json, true) => builder.json().try_init(),
            #[cfg(feature = "json")]
            (Format::Json, false) => builder.json().without_time().try_init(),
            #[cfg(not(feature = "json"))]
            (Format::Json, true) => builder.compact().try_init(),
            #[cfg(not(feature = "json"))]
            (Format::Json, false) => builder.compact().without_time().try_init(),
            (Format::Compact, true) => builder.compact().try_init(),
            (Format::Compact, false) => builder.compact().without_time().try_init(),
            (Format::Pretty, true) => builder.pretty().try_init(),
            (Format::Pretty, false) => builder.pretty().without_time().try_init(),
        };

        result.is_ok()
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Install the subscriber described by the environment.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init() -> bool {
    CONFIG.init()
}

/// Get the configuration read from the environment.
pub fn config() -> &'static LogConfig {
    &CONFIG
}

// ============================================================================
// Tests
// ============================================================================
