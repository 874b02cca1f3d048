use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

/// Where log output goes for this run
pub enum LogTarget<'a> {
    /// One-shot subcommands: the terminal is free
    Stderr,
    /// TUI mode: the terminal belongs to the UI, so logs go to a file or nowhere
    File(Option<&'a Path>),
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

pub fn init(target: LogTarget<'_>) -> Result<()> {
    match target {
        LogTarget::Stderr => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_writer(std::io::stderr)
                .init();
        }
        LogTarget::File(Some(path)) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;

            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        LogTarget::File(None) => {}
    }
    Ok(())
}
