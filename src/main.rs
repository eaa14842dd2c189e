use anyhow::Result;
use clap::{Parser, Subcommand};
use phonescreen::{app, global};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "phonescreen", about = "Automated phone-screen interview service")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Print the version and exit
    Version,
    /// Print the resolved config file path and exit
    ConfigPath,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Some(CliCommand::Version) => {
            println!("phonescreen {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some(CliCommand::ConfigPath) => {
            println!("{}", global::config_file()?.display());
            Ok(())
        }
        None => app::run_service().await,
    }
}
