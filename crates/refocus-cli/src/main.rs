use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "refocus", version, about = "Refocus session CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Session control
    Session {
        #[command(subcommand)]
        action: commands::session::SessionAction,
    },
    /// Stage plan inspection
    Plan {
        #[command(subcommand)]
        action: commands::plan::PlanAction,
    },
    /// Score a completed self-assessment
    Assess {
        /// Comma-separated answers, each 0..=4
        #[arg(long, value_delimiter = ',', required = true)]
        answers: Vec<u8>,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    init_logging();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Session { action } => commands::session::run(action),
        Commands::Plan { action } => commands::plan::run(action),
        Commands::Assess { answers } => commands::assess::run(&answers),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn init_logging() {
    let debug_enabled = std::env::var("REFOCUS_DEBUG_LOG")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    let filter = if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    // Logs go to stderr; stdout is reserved for JSON output.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
