//! Logging for claimguard
//!
//! Library code only emits `tracing` events; binaries and hosts call
//! `init_logging_with_config` once at startup. `RUST_LOG` takes precedence
//! over the configured level when set.

use tracing_subscriber::{
    filter::Directive, fmt, fmt::writer::BoxMakeWriter, layer::SubscriberExt,
    util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

mod error;
mod level;

pub use error::LoggingError;
pub use level::LogLevel;

/// Configuration for the logging subsystem
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// The minimum log level to display
    pub level: LogLevel,
    pub with_timestamp: bool,
    /// Whether to include target module information
    pub with_target: bool,
    /// One JSON object per line instead of human-readable text
    pub json_format: bool,
    /// Extra per-module filters, e.g. `claimguard_core::core_region=trace`
    pub directives: Vec<String>,
    /// Write to stderr, keeping stdout for command output
    pub stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            with_timestamp: true,
            with_target: true,
            json_format: false,
            directives: Vec::new(),
            stderr: false,
        }
    }
}

impl LogConfig {
    pub fn new(level: LogLevel) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    pub fn with_timestamp(mut self, enabled: bool) -> Self {
        self.with_timestamp = enabled;
        self
    }

    pub fn with_target(mut self, enabled: bool) -> Self {
        self.with_target = enabled;
        self
    }

    pub fn json_format(mut self, enabled: bool) -> Self {
        self.json_format = enabled;
        self
    }

    pub fn stderr(mut self, enabled: bool) -> Self {
        self.stderr = enabled;
        self
    }

    pub fn directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// The filter this configuration installs when `RUST_LOG` is unset
    pub fn build_filter(&self) -> Result<EnvFilter, LoggingError> {
        let mut filter = EnvFilter::new(self.level.as_str());
        for raw in &self.directives {
            let directive: Directive = raw
                .parse()
                .map_err(|_| LoggingError::InvalidDirective(raw.clone()))?;
            filter = filter.add_directive(directive);
        }
        Ok(filter)
    }

    fn build_layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let writer = if self.stderr {
            BoxMakeWriter::new(std::io::stderr)
        } else {
            BoxMakeWriter::new(std::io::stdout)
        };
        let layer = fmt::layer().with_target(self.with_target).with_writer(writer);
        match (self.json_format, self.with_timestamp) {
            (true, true) => layer.json().boxed(),
            (true, false) => layer.json().without_time().boxed(),
            (false, true) => layer.boxed(),
            (false, false) => layer.without_time().boxed(),
        }
    }
}

/// Initialize logging at `info`
pub fn init_logging() -> Result<(), LoggingError> {
    init_logging_with_config(LogConfig::default())
}

/// Initialize logging with custom configuration
///
/// # Example
/// ```
/// use claimguard_core::logging::{init_logging_with_config, LogConfig, LogLevel};
///
/// let config = LogConfig::new(LogLevel::Debug)
///     .with_target(false)
///     .directive("claimguard_core::core_region::storage=trace");
///
/// init_logging_with_config(config).expect("Failed to initialize logging");
/// ```
pub fn init_logging_with_config(config: LogConfig) -> Result<(), LoggingError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => config.build_filter()?,
    };

    tracing_subscriber::registry()
        .with(config.build_layer())
        .with(env_filter)
        .try_init()
        .map_err(|e| LoggingError::InitializationFailed(e.to_string()))
}
