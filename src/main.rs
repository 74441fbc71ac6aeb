use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use xquote::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the example configuration (to --config-path if given)
    Setup,
    /// Resolve prices for symbols (or the configured watch list)
    Resolve {
        /// Symbols such as AAPL, BTC-USD or VUAG
        symbols: Vec<String>,

        /// Display currency, defaults to the configured currency
        #[arg(long)]
        currency: Option<String>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => xquote::cli::setup::run(cli.config_path.as_deref()),
        Some(Commands::Resolve {
            symbols,
            currency,
            json,
        }) => {
            let command = xquote::AppCommand::Resolve {
                symbols,
                currency,
                json,
            };
            xquote::run_command(command, cli.config_path.as_deref()).await
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
