use std::path::PathBuf;

use once_cell::sync::OnceCell;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
    EnvFilter,
};

static FILE_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();

/// Where and how often the optional log file rolls over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLogSettings {
    pub dir: PathBuf,
    pub prefix: String,
    pub rotation: String,
}

impl FileLogSettings {
    /// `SHOPFLOOR_LOG_DIR` enables file output; prefix and rotation are optional.
    pub fn from_env() -> Option<Self> {
        let dir = std::env::var("SHOPFLOOR_LOG_DIR")
            .ok()
            .filter(|v| !v.trim().is_empty())?;
        Some(Self {
            dir: PathBuf::from(dir),
            prefix: std::env::var("SHOPFLOOR_LOG_PREFIX").unwrap_or_else(|_| "shopfloor".into()),
            rotation: std::env::var("SHOPFLOOR_LOG_ROTATION").unwrap_or_else(|_| "daily".into()),
        })
    }

    pub fn rotation(&self) -> Rotation {
        match self.rotation.trim().to_ascii_lowercase().as_str() {
            "hourly" => Rotation::HOURLY,
            "minutely" => Rotation::MINUTELY,
            "never" => Rotation::NEVER,
            _ => Rotation::DAILY,
        }
    }

    fn appender(&self) -> std::io::Result<RollingFileAppender> {
        std::fs::create_dir_all(&self.dir)?;
        Ok(RollingFileAppender::new(
            self.rotation(),
            &self.dir,
            &self.prefix,
        ))
    }
}

/// Install the global subscriber: console output filtered by `RUST_LOG`
/// (default `info`), plus a non-ANSI rolling file when `SHOPFLOOR_LOG_DIR`
/// is set. Calling it twice is harmless.
pub fn init() {
    install(FileLogSettings::from_env());
}

pub fn install(file: Option<FileLogSettings>) {
    let filter = default_filter();
    let registry = tracing_subscriber::registry().with(fmt::layer().with_filter(filter));
    let Some(settings) = file else {
        let _ = registry.try_init();
        return;
    };
    match settings.appender() {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            let file_layer = fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(default_filter());
            let _ = registry.with(file_layer).try_init();
        }
        Err(err) => {
            let _ = registry.try_init();
            tracing::warn!(
                directory = %settings.dir.display(),
                %err,
                "failed to create log directory; logging to console only"
            );
        }
    }
}

fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}
