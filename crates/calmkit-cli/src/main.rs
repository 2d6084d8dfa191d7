use calmkit_core::Config;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "calmkit-cli", version, about = "Calmkit CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available exercises
    List {
        /// Print the catalog as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print one exercise definition as JSON
    Show {
        /// Exercise id (e.g. "box-breathing", "body-scan")
        id: String,
    },
    /// Run a breathing exercise
    Breathe {
        /// Breathing exercise id
        id: String,
        /// Override the number of cycles
        #[arg(long)]
        cycles: Option<u32>,
        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Run a grounding exercise
    Ground {
        /// Grounding exercise id
        id: String,
        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Emergency button: start the panic breathing exercise
    Panic {
        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

/// Logs go to stderr so stdout stays parseable. `RUST_LOG` wins over the
/// configured filter.
fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    // The subscriber is configured from the config file, so a load failure
    // cannot be logged through it yet.
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("warning: falling back to default config: {e}");
        Config::default()
    });
    init_tracing(&config.logging.filter);

    let result = match cli.command {
        Commands::List { json } => commands::catalog::list(&config, json),
        Commands::Show { id } => commands::catalog::show(&config, &id),
        Commands::Breathe { id, cycles, json } => {
            commands::session::breathe(&config, &id, cycles, json).await
        }
        Commands::Ground { id, json } => commands::session::ground(&config, &id, json).await,
        Commands::Panic { json } => commands::session::panic_button(&config, json).await,
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
