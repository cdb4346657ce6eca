//! CLI module for Convergence
//!
//! Provides command-line interface parsing for the convergence-server binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod output;

use crate::utils::toml_config::{ConfigError, ConvergenceConfig, DEFAULT_CONFIG_PATH};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Convergence - multi-agent fan-out and synthesis hub
///
/// Accepts WebSocket connections from AI agents, broadcasts each user query
/// to all of them and synthesizes their answers once every agent replied.
#[derive(Parser, Debug)]
#[command(
    name = "convergence-server",
    version,
    about = "Convergence - multi-agent fan-out and synthesis hub",
    long_about = "Accepts WebSocket connections from AI agents, broadcasts each user query\n\
                  to all of them, and synthesizes their answers exactly once per round.\n\n\
                  Run without arguments to start the server.",
    after_help = "EXAMPLES:\n    \
                  convergence-server                          # Start with convergence.toml or defaults\n    \
                  convergence-server --config prod.toml       # Use a custom config file\n    \
                  convergence-server config --validate        # Check the configuration and exit"
)]
pub struct Cli {
    /// Path to the configuration file [default: convergence.toml]
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Start the server (the default)
    Serve,

    /// Show configuration information
    Config {
        /// Validate the configuration file and exit
        #[arg(long)]
        validate: bool,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The file to load: `--config` when given, `convergence.toml` otherwise.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Whether `--config` was omitted, in which case a missing file falls
    /// back to built-in defaults. A named file must exist.
    pub fn uses_default_config(&self) -> bool {
        self.config.is_none()
    }

    /// Read the configuration file this invocation points at, before any
    /// environment overrides.
    pub fn read_config(&self) -> Result<ConvergenceConfig, ConfigError> {
        match &self.config {
            Some(path) => ConvergenceConfig::load(path),
            None => ConvergenceConfig::load_or_default(DEFAULT_CONFIG_PATH),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["convergence-server"]).unwrap();

        assert_eq!(cli.command, None);
        assert!(cli.uses_default_config());
        assert_eq!(cli.config_path(), PathBuf::from(DEFAULT_CONFIG_PATH));
        assert!(!cli.verbose);
    }

    #[test]
    fn test_config_validate_with_global_flags() {
        let cli = Cli::try_parse_from([
            "convergence-server",
            "config",
            "--validate",
            "--config",
            "custom.toml",
            "--no-color",
        ])
        .unwrap();

        assert_eq!(cli.command, Some(Commands::Config { validate: true }));
        assert!(!cli.uses_default_config());
        assert_eq!(cli.config_path(), PathBuf::from("custom.toml"));
        assert!(cli.no_color);
    }

    #[test]
    fn test_explicit_default_path_is_still_explicit() {
        let cli = Cli::try_parse_from(["convergence-server", "-c", DEFAULT_CONFIG_PATH]).unwrap();

        assert!(!cli.uses_default_config());
        assert_eq!(cli.config_path(), PathBuf::from(DEFAULT_CONFIG_PATH));
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join(DEFAULT_CONFIG_PATH);
        let cli = Cli::try_parse_from([
            OsStr::new("convergence-server"),
            OsStr::new("--config"),
            missing.as_os_str(),
        ])
        .unwrap();

        assert!(matches!(
            cli.read_config(),
            Err(ConfigError::FileNotFound(path)) if path == missing
        ));
    }

    #[test]
    fn test_explicit_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[server]\nport = 4100\n").unwrap();
        let cli = Cli::try_parse_from([
            OsStr::new("convergence-server"),
            OsStr::new("--config"),
            path.as_os_str(),
        ])
        .unwrap();

        assert_eq!(cli.read_config().unwrap().server.port, 4100);
    }

    #[test]
    fn test_unknown_subcommand() {
        assert!(Cli::try_parse_from(["convergence-server", "init"]).is_err());
    }
}
