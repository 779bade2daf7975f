//! Tools for listing and uploading assets and sensors through the Hyperview API.

use std::env;
use tracing_subscriber::EnvFilter;

pub mod config;
pub mod export;
pub mod hyperview;
pub mod table;
pub mod upload;

pub use config::LogLevel;

/// Install a global `tracing` subscriber that logs to stderr.
///
/// `RUST_LOG`, if set, takes precedence over `level`. It is harmless to call this more than once;
/// only the first call has any effect.
pub fn init_logging(level: LogLevel) {
    let rust_log = env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(level, rust_log.as_deref()))
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
}

/// The filter for `level`, unless `directives` is a valid `RUST_LOG` setting.
fn log_filter(level: LogLevel, directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::default().add_directive(level.filter().into()))
}

#[cfg(test)]
mod test {
    use super::*;
    use tracing::level_filters::LevelFilter;

    #[test]
    fn test_log_filter() {
        assert_eq!(
            log_filter(LogLevel::Warning, None).max_level_hint(),
            Some(LevelFilter::WARN)
        );
        assert_eq!(
            log_filter(LogLevel::Error, Some("debug")).max_level_hint(),
            Some(LevelFilter::DEBUG)
        );
        assert_eq!(
            log_filter(LogLevel::Info, Some("hyperview=trace")).max_level_hint(),
            Some(LevelFilter::TRACE)
        );
        assert_eq!(
            log_filter(LogLevel::Info, Some("hyperview=loud")).max_level_hint(),
            Some(LevelFilter::INFO)
        );
    }
}
