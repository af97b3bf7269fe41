//! Structured logging bootstrap
//!
//! Installs a global `tracing` subscriber with:
//! - An `EnvFilter` built from a global level plus per-module levels
//! - A console layer and/or a non-blocking rolling file layer
//! - Text or JSON formatting

mod config;
mod error;


pub use config::{LogFormat, LogLevel, LogOutput, LoggingConfig, RotationStrategy};
pub use error::{LoggingError, LoggingResult};

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Installed logging system. Dropping it flushes and stops the file writer.
pub struct LoggingSystem {
    config: LoggingConfig,
    _guards: Vec<WorkerGuard>,
}

impl LoggingSystem {
    /// Install the global subscriber. Fails if one is already installed.
    pub fn init(config: LoggingConfig) -> LoggingResult<Self> {
        let env_filter = Self::build_env_filter(&config)?;
        let mut guards = Vec::new();
        let registry = tracing_subscriber::registry().with(env_filter);

        match config.output {
            LogOutput::Console => registry
                .with(Self::create_console_layer(&config))
                .try_init(),
            LogOutput::File => {
                let (file_layer, guard) = Self::create_file_layer(&config)?;
                guards.push(guard);
                registry.with(file_layer).try_init()
            }
            LogOutput::Both => {
                let (file_layer, guard) = Self::create_file_layer(&config)?;
                guards.push(guard);
                registry
                    .with(Self::create_console_layer(&config))
                    .with(file_layer)
                    .try_init()
            }
        }
        .map_err(|e| LoggingError::Initialization(e.to_string()))?;

        tracing::debug!(level = %config.level, output = ?config.output, "Logging initialized");

        Ok(Self {
            config,
            _guards: guards,
        })
    }

    /// Global level plus one directive per configured module
    pub fn build_env_filter(config: &LoggingConfig) -> LoggingResult<EnvFilter> {
        let mut filter = EnvFilter::new(config.level.as_str());

        for (module, level) in &config.module_levels {
            let directive = format!("{}={}", module, level);
            let parsed = directive
                .parse::<Directive>()
                .map_err(|e| LoggingError::InvalidDirective {
                    directive: directive.clone(),
                    reason: e.to_string(),
                })?;
            filter = filter.add_directive(parsed);
        }

        Ok(filter)
    }

    fn create_console_layer<S>(config: &LoggingConfig) -> Box<dyn Layer<S> + Send + Sync>
    where
        S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    {
        let layer = fmt::layer()
            .with_target(config.include_target)
            .with_thread_ids(config.include_thread_id)
            .with_file(config.include_file_info)
            .with_line_number(config.include_file_info);

        if config.format == LogFormat::Json {
            layer.json().boxed()
        } else {
            layer.boxed()
        }
    }

    fn create_file_layer<S>(
        config: &LoggingConfig,
    ) -> LoggingResult<(Box<dyn Layer<S> + Send + Sync>, WorkerGuard)>
    where
        S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    {
        let log_dir = Self::file_directory(config);
        ensure_directory(&log_dir)?;

        let rotation = match config.rotation {
            RotationStrategy::Hourly => Rotation::HOURLY,
            RotationStrategy::Daily => Rotation::DAILY,
            RotationStrategy::Never => Rotation::NEVER,
        };
        let appender = RollingFileAppender::new(rotation, &log_dir, &config.file_prefix);
        let (writer, guard) = tracing_appender::non_blocking(appender);

        let layer = fmt::layer()
            .with_writer(writer)
            .with_target(config.include_target)
            .with_thread_ids(config.include_thread_id)
            .with_file(config.include_file_info)
            .with_line_number(config.include_file_info)
            .with_ansi(false);

        if config.format == LogFormat::Json {
            Ok((layer.json().boxed(), guard))
        } else {
            Ok((layer.boxed(), guard))
        }
    }

    fn file_directory(config: &LoggingConfig) -> PathBuf {
        config
            .log_directory
            .clone()
            .unwrap_or_else(|| PathBuf::from("logs"))
    }

    pub fn config(&self) -> &LoggingConfig {
        &self.config
    }

    /// Directory log files are written to, when file output is enabled
    pub fn log_directory(&self) -> Option<PathBuf> {
        self.config
            .output
            .writes_file()
            .then(|| Self::file_directory(&self.config))
    }

    pub fn log_level(&self) -> LogLevel {
        self.config.level
    }
}

fn ensure_directory(dir: &Path) -> LoggingResult<()> {
    std::fs::create_dir_all(dir).map_err(|e| LoggingError::DirectoryCreation {
        path: dir.display().to_string(),
        reason: e.to_string(),
    })
}
