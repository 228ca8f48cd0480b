use std::error::Error;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const FILTER_ENV: &str = "PILOT_LOG";

type LogResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// Log to a file; the interactive client owns the terminal.
pub fn init_file(path: &Path) -> LogResult<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let log_file = OpenOptions::new().create(true).append(true).open(path)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter("info"))
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(log_file))
        .try_init()?;
    Ok(())
}

/// Log to stderr for the headless commands, quiet unless asked.
pub fn init_stderr() -> LogResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(filter("warn"))
        .with_writer(std::io::stderr)
        .try_init()?;
    Ok(())
}

pub fn default_log_path() -> PathBuf {
    if let Some(home) = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
        return PathBuf::from(home).join(".pilot").join("pilot.log");
    }

    PathBuf::from("pilot.log")
}

fn filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_env(FILTER_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default))
}
