use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use artifactorium_core::constants::{ALLOW_OVERWRITE_ENV, STRINGIFY_RESULTS_ENV};
use artifactorium_core::{
    EntryKind, NO_SEGMENTS, PathRegistry, RegistryOptions, options_from_env_values,
};

#[derive(Parser)]
#[command(name = "artifactorium")]
#[command(about = "Lazy path registry for experiment output directories")]
struct Cli {
    /// Allow re-registering names that already exist (also ARTIFACTORIUM_ALLOW_OVERWRITE)
    #[arg(long, global = true)]
    allow_overwrite: bool,
    /// Report resolved paths as plain strings (also ARTIFACTORIUM_STRINGIFY_RESULTS)
    #[arg(long, global = true)]
    stringify: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a registry and save it without creating any directories
    Init {
        /// Root directory of the registry
        #[arg(long)]
        root: PathBuf,
        /// Extra segments appended to the root ("NOW" becomes the run stamp)
        #[arg(long = "segment")]
        segments: Vec<String>,
        /// Directory entry as NAME or NAME=PATH
        #[arg(long = "entry", value_parser = parse_entry)]
        entries: Vec<(String, String)>,
        /// File entry as NAME or NAME=PATH
        #[arg(long = "file-entry", value_parser = parse_entry)]
        file_entries: Vec<(String, String)>,
        /// Where to write the registry
        #[arg(long)]
        out: PathBuf,
    },
    /// List every entry of a saved registry
    Describe {
        /// Saved registry file
        registry: PathBuf,
    },
    /// Resolve a name, creating its directory on disk
    Resolve {
        /// Saved registry file
        registry: PathBuf,
        /// Entry name
        name: String,
    },
    /// Add or replace an entry in a saved registry
    Register {
        /// Saved registry file
        registry: PathBuf,
        /// Entry name
        name: String,
        /// Path relative to the registry root (defaults to the name)
        path: Option<String>,
        /// Treat the target as a file: only its parent directory is created
        #[arg(long)]
        file: bool,
    },
}

/// Parse `NAME=PATH`; a bare `NAME` uses the name as its own path.
fn parse_entry(raw: &str) -> Result<(String, String), String> {
    let (name, path) = raw.split_once('=').unwrap_or((raw, raw));
    if name.trim().is_empty() || path.trim().is_empty() {
        return Err(format!("expected NAME or NAME=PATH, got '{raw}'"));
    }
    Ok((name.to_string(), path.to_string()))
}

/// Entry point for the artifactorium CLI.
///
/// # Environment Variables
/// - `ARTIFACTORIUM_ALLOW_OVERWRITE`: default for `--allow-overwrite`
/// - `ARTIFACTORIUM_STRINGIFY_RESULTS`: default for `--stringify`
/// - `RUST_LOG`: tracing filter (default directive `artifactorium=info`)
fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("artifactorium=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut options = options_from_env_values(
        std::env::var(ALLOW_OVERWRITE_ENV).ok(),
        std::env::var(STRINGIFY_RESULTS_ENV).ok(),
    )?;
    if cli.allow_overwrite {
        options.allow_overwrite = true;
    }
    if cli.stringify {
        options.stringify_results = true;
    }

    match cli.command {
        Some(command) => {
            let output = run(command, options)?;
            for line in output {
                println!("{line}");
            }
        }
        None => {
            println!("Use 'artifactorium --help' for commands");
        }
    }

    Ok(())
}

/// Execute one command and return the lines to print.
fn run(command: Commands, options: RegistryOptions) -> anyhow::Result<Vec<String>> {
    match command {
        Commands::Init {
            root,
            segments,
            entries,
            file_entries,
            out,
        } => {
            let mut registry = PathRegistry::with_entries(&root, &segments, options, entries)
                .context("failed to build registry")?;
            for (name, path) in &file_entries {
                registry.register_file(name, path)?;
            }
            registry
                .dump(Some(out.as_path()))
                .with_context(|| format!("failed to save registry to {}", out.display()))?;
            tracing::info!("++ Saved registry to {}", out.display());
            Ok(registry.describe_lines())
        }
        Commands::Describe { registry } => {
            let registry = PathRegistry::load_from(&registry, options)?;
            Ok(registry.describe_lines())
        }
        Commands::Resolve { registry, name } => {
            let registry = PathRegistry::load_from(&registry, options)?;
            let resolved = registry.lookup(&name)?;
            Ok(vec![resolved.to_string()])
        }
        Commands::Register {
            registry: file,
            name,
            path,
            file: is_file,
        } => {
            let mut registry = PathRegistry::load_from(&file, options)?;
            let target = registry
                .register(&name, path.as_deref(), NO_SEGMENTS, EntryKind::from_is_file(is_file))?
                .target()
                .display()
                .to_string();
            registry.dump(Some(file.as_path()))?;
            Ok(vec![format!("{name}: {target}")])
        }
    }
}
