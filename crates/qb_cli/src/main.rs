//! Quick Bench CLI
//!
//! Keeps one game in a save directory and drives it from the terminal,
//! a script file, or raw JSON API requests.

mod session;

use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use qb_core::save::{FileStore, LoadOutcome, SaveManager};
use qb_core::{EngineConfig, RotationEngine};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::session::{run_json_request, write_status, Session, HELP};

#[derive(Parser)]
#[command(name = "quick-bench")]
#[command(about = "Track player rotation, fatigue and goals across timed quarters", long_about = None)]
struct Cli {
    /// Directory holding the saved game
    #[arg(long, default_value = ".quick-bench")]
    data_dir: PathBuf,

    /// YAML engine configuration (defaults apply when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the saved game
    Status,

    /// Discard the saved game and start fresh
    Reset,

    /// Interactive session (reads commands from stdin)
    Session {
        /// Read commands from a file instead of stdin
        #[arg(long)]
        script: Option<PathBuf>,

        /// Pace `run` at one tick per second
        #[arg(long, default_value = "false")]
        realtime: bool,
    },

    /// Apply one JSON API request and print the response
    Json {
        /// Request text; read from stdin when omitted
        #[arg(long)]
        request: Option<String>,
    },

    /// Print the default configuration as YAML
    Config,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).compact().init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    let mut saves = SaveManager::for_config(FileStore::new(&cli.data_dir), &config);
    let mut engine = RotationEngine::new(config.clone());
    match saves.load_into(&mut engine) {
        LoadOutcome::Restored => info!(dir = %cli.data_dir.display(), "resumed saved game"),
        LoadOutcome::NoSave => info!("no saved game, starting fresh"),
        LoadOutcome::FellBack => info!("saved game unreadable, starting fresh"),
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Status => write_status(&engine, &mut out)?,

        Commands::Reset => {
            engine.reset_to_initial();
            saves.save(&engine).context("saving game")?;
            writeln!(out, "New game saved in {}", cli.data_dir.display())?;
        }

        Commands::Session { script, realtime } => {
            let mut session = Session::new(engine, saves, realtime);
            match script {
                Some(path) => {
                    let file = File::open(&path)
                        .with_context(|| format!("opening script {}", path.display()))?;
                    session.run(BufReader::new(file), &mut out)?;
                }
                None => {
                    writeln!(out, "{}", HELP)?;
                    session.run(io::stdin().lock(), &mut out)?;
                }
            }
        }

        Commands::Json { request } => {
            let request = match request {
                Some(request) => request,
                None => {
                    let mut buf = String::new();
                    io::stdin().read_to_string(&mut buf).context("reading request from stdin")?;
                    buf
                }
            };
            writeln!(out, "{}", run_json_request(&mut engine, &mut saves, &request)?)?;
        }

        Commands::Config => write!(out, "{}", config.to_yaml_string()?)?,
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let config = match path {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    config.validate().context("invalid configuration")?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tempfile::TempDir;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_session_flags() {
        let cli = Cli::parse_from(["quick-bench", "--data-dir", "/tmp/x", "session", "--realtime"]);
        assert_eq!(cli.data_dir, PathBuf::from("/tmp/x"));
        assert!(matches!(cli.command, Commands::Session { script: None, realtime: true }));
    }

    #[test]
    fn test_load_config_from_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bench.yaml");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "quarter_length_secs: 480\nteam_name: Otters").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.quarter_length_secs, 480);
        assert_eq!(config.team_name, "Otters");
        assert_eq!(config.field_capacity, 4);

        assert!(load_config(Some(&dir.path().join("missing.yaml"))).is_err());
    }
}
