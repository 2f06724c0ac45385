mod commands;
mod logging;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use poster_studio::domain::demo;
use poster_studio::{Backend, InMemoryBackend, Studio, StudioConfig, connect};

/// Poster Studio - browse templates and manage poster designs
#[derive(Parser)]
#[command(name = "poster-studio")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Run against an in-process backend seeded with the built-in catalog
    #[arg(long)]
    embedded: bool,

    /// Account email; signs in before the command runs
    #[arg(long, global = true)]
    email: Option<String>,

    /// Account password
    #[arg(long, global = true, default_value = "")]
    password: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Templates(commands::TemplatesArgs),
    /// List the signed-in user's designs, most recently updated first
    Designs,
    Create(commands::CreateArgs),
    Rename(commands::RenameArgs),
    Delete(commands::DeleteArgs),
    Export(commands::ExportArgs),
    /// Show the signed-in profile and its credit balance
    Profile,
    SignUp(commands::SignUpArgs),
    /// Validate configuration and exit
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.json_logs);

    if let Some(path) = &cli.config
        && !path.is_file()
    {
        anyhow::bail!("config file does not exist: {}", path.display());
    }
    let config = StudioConfig::load(cli.config.as_deref()).context("invalid configuration")?;

    if matches!(cli.command, Commands::Check) {
        commands::check(&config);
        return Ok(());
    }

    let backend = if cli.embedded {
        let memory = Arc::new(InMemoryBackend::new());
        memory
            .seed_templates(&demo::templates())
            .context("seeding embedded catalog")?;
        Backend::embedded(memory)
    } else {
        connect(&config.backend)
    };
    let studio = Studio::new(&backend, config.write_mode);
    studio.start().await;

    let result = run(&studio, &cli).await;
    studio.shutdown();
    result
}

async fn run(studio: &Studio, cli: &Cli) -> Result<()> {
    if let Commands::SignUp(args) = &cli.command {
        let email = cli.email.as_deref().context("--email is required")?;
        return commands::sign_up(studio, email, &cli.password, args).await;
    }

    if let Some(email) = &cli.email {
        commands::sign_in(studio, email, &cli.password).await?;
    }

    match &cli.command {
        Commands::Templates(args) => {
            commands::templates(studio, args);
            Ok(())
        }
        Commands::Designs => commands::designs(studio).await,
        Commands::Create(args) => commands::create(studio, args).await,
        Commands::Rename(args) => commands::rename(studio, args).await,
        Commands::Delete(args) => commands::delete(studio, args).await,
        Commands::Export(args) => commands::export(studio, args).await,
        Commands::Profile => commands::profile(studio),
        Commands::SignUp(_) | Commands::Check => Ok(()),
    }
}
