mod changeset;
mod cli;
mod db;
mod error;
mod mapper;
mod models;
mod settings;
mod source;
mod sync;
mod validation;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::{Cli, Commands};
use settings::{load_settings, Settings};

fn init_logging(settings: &Settings, verbose: bool) {
    let default_filter = if verbose {
        "supplier_sync=debug".to_string()
    } else {
        settings.log_filter.clone()
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = load_settings(cli.config.as_deref())?;
    init_logging(&settings, cli.verbose);

    match cli.command {
        Commands::Init => cli::init::run(&settings),
        Commands::Sync { file, source } => cli::sync::run(&settings, &file, &source),
        Commands::Check { file, source } => cli::check::run(&settings, &file, &source),
        Commands::Status => cli::status::run(&settings),
    }
}

fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
