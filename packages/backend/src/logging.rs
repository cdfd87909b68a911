use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "course-review.log";
const DEFAULT_LOG_DIR: &str = "./logs";

/// Keeps the non-blocking file writer alive; drop flushes it.
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

/// Where log output goes besides stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSinks {
    /// Daily-rotated file directory, set when `ENABLE_FILE_LOGS` is on.
    pub file_dir: Option<PathBuf>,
}

impl LogSinks {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let enabled = lookup("ENABLE_FILE_LOGS")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1"))
            .unwrap_or(false);
        let file_dir = enabled.then(|| {
            lookup("LOG_DIR")
                .filter(|dir| !dir.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LOG_DIR.to_string())
                .into()
        });
        Self { file_dir }
    }
}

/// Falls back to `info` when the configured directive does not parse.
fn level_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_new(log_level).unwrap_or_else(|err| {
        eprintln!("invalid log level {log_level:?} ({err}), using info");
        EnvFilter::new("info")
    })
}

fn open_log_file(dir: &Path) -> Option<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    if let Err(err) = std::fs::create_dir_all(dir) {
        eprintln!("failed to create log directory {}: {err}", dir.display());
        return None;
    }
    let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
    Some(tracing_appender::non_blocking(appender))
}

pub fn init_tracing(log_level: &str) -> Option<FileLogGuard> {
    let sinks = LogSinks::from_env();
    let file = sinks.file_dir.as_deref().and_then(open_log_file);

    let (file_layer, guard) = match file {
        Some((writer, guard)) => {
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(level_filter(log_level))
        .with(fmt::layer().with_target(true))
        .with(file_layer)
        .init();

    if let (Some(dir), Some(_)) = (&sinks.file_dir, &guard) {
        tracing::info!(dir = %dir.display(), "File logging enabled");
    }
    guard.map(|guard| FileLogGuard { _guard: guard })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn sinks(vars: &[(&str, &str)]) -> LogSinks {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LogSinks::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn file_logging_off_by_default() {
        assert_eq!(sinks(&[]).file_dir, None);
        assert_eq!(sinks(&[("ENABLE_FILE_LOGS", "no"), ("LOG_DIR", "/var/log")]).file_dir, None);
    }

    #[test]
    fn file_logging_uses_log_dir_or_default() {
        assert_eq!(
            sinks(&[("ENABLE_FILE_LOGS", "TRUE")]).file_dir,
            Some(PathBuf::from(DEFAULT_LOG_DIR))
        );
        assert_eq!(
            sinks(&[("ENABLE_FILE_LOGS", "1"), ("LOG_DIR", "/var/log/reviews")]).file_dir,
            Some(PathBuf::from("/var/log/reviews"))
        );
        assert_eq!(
            sinks(&[("ENABLE_FILE_LOGS", "1"), ("LOG_DIR", "  ")]).file_dir,
            Some(PathBuf::from(DEFAULT_LOG_DIR))
        );
    }

    #[test]
    fn bad_level_falls_back_to_info() {
        assert_eq!(level_filter("course_review_backend=loud").to_string(), "info");
        assert_eq!(level_filter("debug").to_string(), "debug");
    }
}
