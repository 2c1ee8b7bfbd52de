use std::path::PathBuf;

use clap::Parser;
use eyre::Result;
use log::{info, warn};

mod cli;

use cli::Cli;
use ytnote::config::{Config, GeneratorKind, Settings, config_path};

fn setup_logging() -> Result<()> {
    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir)?;
    let log_file = log_dir.join("ytnote.log");

    let target = Box::new(std::fs::OpenOptions::new().create(true).append(true).open(&log_file)?);

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized: {}", log_file.display());
    Ok(())
}

fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ytnote")
        .join("logs")
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging()?;
    let cli = Cli::parse();

    // Load config file (non-fatal if missing/invalid)
    let path = cli.config.clone().unwrap_or_else(config_path);
    let loaded = match &cli.config {
        Some(explicit) => Config::load_from(explicit),
        None => Config::load(),
    };
    let config = loaded.unwrap_or_else(|e| {
        warn!("Ignoring config {}: {e}", path.display());
        Config::default()
    });

    // Read once; everything downstream gets it through Settings
    let api_key = std::env::var("GEMINI_API_KEY").ok();
    let mut settings = Settings::from_config(config, api_key)?;

    // CLI flags take priority over the config file
    if let Some(bind) = cli.bind {
        settings.bind = bind;
    }
    if let Some(generator) = cli.generator {
        settings.generator = generator;
    }
    if !cli.models.is_empty() {
        settings.set_models(cli.models)?;
    }
    if let Some(locale) = cli.locale {
        settings.locale = locale;
    }

    if settings.generator == GeneratorKind::Gemini && settings.api_key.is_none() {
        warn!("GEMINI_API_KEY is not set; requests will fail with MISSING_CREDENTIAL");
    }

    if cli.verbose {
        if path.exists() {
            eprintln!("Config: {}", path.display());
        }
        eprintln!(
            "Bind: {}\nGenerator: {:?}\nModels: {}\nHints: {:?}\nCredential: {}\nLogs: {}",
            settings.bind,
            settings.generator,
            settings.models.join(", "),
            settings.locale,
            if settings.api_key.is_some() { "set" } else { "missing" },
            log_dir().join("ytnote.log").display(),
        );
    }

    ytnote::server::serve(&settings).await
}
