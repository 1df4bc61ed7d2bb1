//! Binary entrypoint for the fnflow demo.
use anyhow::Result;
use clap::Parser;
use fnflow_cli::{load_config, run, Scenario};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "fnflow")]
#[command(about = "Run the fnflow reference pipelines", long_about = None)]
struct Cli {
    /// YAML config file
    #[arg(short, long, env = "FNFLOW_CONFIG")]
    config: Option<PathBuf>,

    /// Scenarios to run (all when omitted)
    #[arg(value_enum)]
    scenarios: Vec<Scenario>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Log level can be overridden with FNFLOW_LOG
    let filter = EnvFilter::try_from_env("FNFLOW_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    for (scenario, lines) in run(&cli.scenarios, &config).await? {
        println!("== {}", scenario.name());
        for line in lines {
            println!("  {}", line);
        }
    }
    Ok(())
}
