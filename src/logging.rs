use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::{fmt, EnvFilter};

use crate::settings::config_dir;

pub const LOG_ENV: &str = "PENNY_LOG";
const DEFAULT_LEVEL: &str = "warn";

pub fn log_path() -> PathBuf {
    config_dir().join("penny.log")
}

pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL))
}

/// Send log output to a file so the alternate screen stays clean. Logging is
/// best effort: if the file cannot be opened, events are dropped.
pub fn init_at(path: &Path) {
    let file = path
        .parent()
        .map_or(Ok(()), fs::create_dir_all)
        .and_then(|_| OpenOptions::new().create(true).append(true).open(path));

    let builder = fmt().with_env_filter(env_filter()).with_ansi(false);
    let _ = match file {
        Ok(f) => builder.with_writer(Mutex::new(f)).try_init(),
        Err(_) => builder.with_writer(std::io::sink).try_init(),
    };
}

pub fn init() {
    init_at(&log_path());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_log_file_and_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("penny.log");
        init_at(&path);
        assert!(path.exists());
    }
}
