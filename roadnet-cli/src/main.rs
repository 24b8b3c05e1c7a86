mod commands;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use roadnet::EditorConfig;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "adnet", about = "Inspect and repair AutoDrive road networks")]
struct Cli {
    /// Editor settings (JSON); defaults apply when omitted
    #[arg(long, global = true, value_name = "editor.json")]
    config: Option<PathBuf>,
    /// More log output; repeat for trace
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Summarise a config: map, version, node and marker counts
    Info { path: PathBuf },
    /// Verify structural consistency and report nodes outside the map
    Check { path: PathBuf },
    /// Print every node with its links and marker
    Dump {
        path: PathBuf,
        /// Emit the network as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Move nodes outside the map back to its centre and save
    FixBounds { path: PathBuf },
    /// Load and write the config again, normalising it
    Resave {
        path: PathBuf,
        /// Write to this file instead of overwriting the input
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn editor_config(path: Option<&PathBuf>) -> Result<EditorConfig> {
    match path {
        Some(p) => EditorConfig::load(p).with_context(|| format!("reading editor settings {}", p.display())),
        None => Ok(EditorConfig::default()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = editor_config(cli.config.as_ref())?;

    match cli.command {
        Command::Info { path } => commands::info(config, &path),
        Command::Check { path } => commands::check(config, &path),
        Command::Dump { path, json } => commands::dump(config, &path, json),
        Command::FixBounds { path } => commands::fix_bounds(config, &path),
        Command::Resave { path, output } => commands::resave(config, &path, output.as_deref()),
    }
}
