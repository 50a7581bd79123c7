use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use strand::name::{is_identifier, is_keyword, is_uid_key};
use strand::{is_name_valid, Root, Scene, SceneConfig};

mod script;

use script::Script;

#[derive(Parser)]
#[command(name = "strand")]
#[command(about = "Drive a strand scene from a script")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a scene script, flush and print the resulting snapshot as JSON
    Run {
        /// Path to the .toml script
        script: PathBuf,
        /// Scene configuration file
        #[arg(long)]
        config: Option<PathBuf>,
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Check whether names are usable for nodes and datums
    CheckName {
        /// Names to check
        #[arg(required = true)]
        names: Vec<String>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            script,
            config,
            pretty,
        } => run(&script, config, pretty)?,
        Commands::CheckName { names } => {
            if !check_names(&names) {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn run(path: &Path, config: Option<PathBuf>, pretty: bool) -> Result<()> {
    let config = match config {
        Some(path) => SceneConfig::load(&path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SceneConfig::default(),
    };
    let script = Script::load(path)?;
    log::info!("running {} ({} steps)", path.display(), script.steps.len());

    let mut scene = Scene::with_config(config);
    script.apply(&mut scene)?;
    let report = scene.flush_queue().context("final flush")?;
    log::info!("settled after {} rounds", report.rounds);

    let snapshot = scene.snapshot();
    let json = if pretty {
        serde_json::to_string_pretty(&snapshot)?
    } else {
        serde_json::to_string(&snapshot)?
    };
    println!("{json}");
    Ok(())
}

/// Print a verdict per name. Returns whether all were valid.
fn check_names(names: &[String]) -> bool {
    let mut all_valid = true;
    for name in names {
        if is_name_valid(name) {
            println!("{name}: ok");
            continue;
        }
        all_valid = false;
        let reason = if is_uid_key(name) {
            "reserved for uid keys"
        } else if is_keyword(name) {
            "reserved keyword"
        } else if !is_identifier(name) {
            "not an identifier"
        } else {
            "invalid"
        };
        println!("{name}: {reason}");
    }
    all_valid
}
