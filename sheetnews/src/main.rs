use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use sheetnews_core::sheets::GoogleSheetsClient;
use sheetnews_core::sheets::auth::{ServiceAccountTokens, StaticToken, TokenSource};
use sheetnews_core::{NewsConfig, Pipeline};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod formatter;

#[derive(Parser)]
#[command(name = "sheetnews")]
#[command(
    about = "Republish weekly news submissions as formatted per-category sheets",
    long_about = None
)]
#[command(version)]
struct Cli {
    /// Path to configuration file (TOML)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Service-account key file (overrides auth.key_path)
    #[arg(short, long, value_name = "KEY")]
    key: Option<PathBuf>,

    /// Read a ready OAuth access token from this environment variable instead of a key file
    #[arg(long, value_name = "VAR", conflicts_with = "key")]
    token_env: Option<String>,

    /// Read and transform, but write nothing
    #[arg(long)]
    dry_run: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "human")]
    format: OutputFormat,

    /// Log debug details to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON output for schedulers and scripts
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = load_config(cli.config.as_ref())?;
    if let Some(key) = &cli.key {
        config.auth.key_path = key.clone();
    }
    config.validate().context("Invalid configuration")?;

    let tokens = token_source(&cli, &config)?;
    let client = GoogleSheetsClient::new(config.spreadsheet_id.clone(), tokens)
        .context("Failed to create Sheets client")?;
    let mut pipeline = Pipeline::new(config, client);

    let report = if cli.dry_run {
        let prepared = pipeline.prepare()?;
        info!("Dry run: nothing written");
        pipeline.preview(&prepared)
    } else {
        pipeline.run()?
    };

    match cli.format {
        OutputFormat::Human => formatter::print_human(&report),
        OutputFormat::Json => formatter::print_json(&report)?,
    }

    Ok(())
}

/// `--config`, else `sheetnews.toml` in the working directory, else built-in defaults
fn load_config(path: Option<&PathBuf>) -> Result<NewsConfig> {
    if let Some(config_path) = path {
        return NewsConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()));
    }

    let default_config_path = PathBuf::from("sheetnews.toml");
    if default_config_path.exists() {
        NewsConfig::from_file(&default_config_path).with_context(|| {
            format!(
                "Failed to load config from {}",
                default_config_path.display()
            )
        })
    } else {
        Ok(NewsConfig::default())
    }
}

fn token_source(cli: &Cli, config: &NewsConfig) -> Result<Box<dyn TokenSource>> {
    if let Some(var) = &cli.token_env {
        let token = std::env::var(var)
            .with_context(|| format!("Environment variable {} is not set", var))?;
        return Ok(Box::new(StaticToken::new(token)));
    }

    let tokens = ServiceAccountTokens::from_key_file(&config.auth.key_path, &config.auth.scopes)
        .with_context(|| {
            format!(
                "Failed to set up service account from {}",
                config.auth.key_path.display()
            )
        })?;
    Ok(Box::new(tokens))
}
