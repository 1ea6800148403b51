use anyhow::{anyhow, Result};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "APPTRACK_LOG";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub db_path: PathBuf,
    pub log_filter: String,
}

impl Config {
    /// `db` comes from `--db` or `APPTRACK_DB`; `verbosity` is the number of
    /// `-v` flags.
    pub fn resolve(db: Option<PathBuf>, verbosity: u8) -> Self {
        let log_filter = std::env::var(LOG_ENV)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| default_filter(verbosity).to_string());

        Self {
            db_path: db.unwrap_or_else(default_db_path),
            log_filter,
        }
    }

    /// Logs go to stderr so `--json` output stays clean.
    ///
    /// # Errors
    ///
    /// Returns an error if a global subscriber is already set
    pub fn init_tracing(&self) -> Result<()> {
        let filter = EnvFilter::try_new(&self.log_filter)
            .unwrap_or_else(|_| EnvFilter::new(default_filter(0)));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init()
            .map_err(|e| anyhow!("Failed to setup tracing subscriber: {}", e))?;
        Ok(())
    }
}

fn default_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

pub fn default_db_path() -> PathBuf {
    // XDG data directory, or the current directory as a fallback
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "apptrack") {
        proj_dirs.data_dir().join("apptrack.db")
    } else {
        PathBuf::from("apptrack.db")
    }
}
