use anyhow::Result;
use clap::Parser;

use resume_state_config::AppConfig;
use resume_state_core::ResumeSession;

mod cli;
mod commands;

use cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(AppConfig::config_path);
    let mut config = AppConfig::load_or_create(&config_path);
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.to_string_lossy().into_owned();
    }

    tracing::debug!(
        data_dir = %config.effective_data_dir().display(),
        "Starting resume-state"
    );

    let mut session = ResumeSession::open(&config)?;
    let mut stdout = std::io::stdout().lock();
    let result = commands::run(&mut session, cli.command, &mut stdout);
    // Flush even when the command failed part-way
    let flushed = session.flush();
    finish(result, flushed)
}

/// Combines the command and flush outcomes. A command error wins; a flush
/// error behind it is logged instead of dropped.
fn finish(result: Result<()>, flushed: Result<()>) -> Result<()> {
    match (result, flushed) {
        (Err(e), Err(flush_err)) => {
            tracing::error!("Failed to flush after command error: {flush_err:#}");
            Err(e)
        }
        (result, flushed) => result.and(flushed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_finish_keeps_command_error() {
        let err = finish(Err(anyhow!("bad field")), Err(anyhow!("disk full"))).unwrap_err();
        assert_eq!(err.to_string(), "bad field");
    }

    #[test]
    fn test_finish_reports_flush_error() {
        let err = finish(Ok(()), Err(anyhow!("disk full"))).unwrap_err();
        assert_eq!(err.to_string(), "disk full");
        assert!(finish(Ok(()), Ok(())).is_ok());
    }
}
