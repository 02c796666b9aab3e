mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::allocation::AllocateArgs;
use commands::analysis::AnalyzeArgs;
use commands::rebalance::{RebalanceArgs, StressTestArgs};
use commands::report::ReportArgs;
use commands::risk::{PredictArgs, RiskArgs};

/// Crypto portfolio allocation, risk and reporting calculations
#[derive(Parser)]
#[command(
    name = "cfolio",
    version,
    about = "Crypto portfolio allocation, risk and reporting calculations",
    long_about = "A CLI over the cryptofolio calculation core. Allocates an investment \
                  across coins under min/max rules, scores portfolio risk, projects \
                  returns, checks rebalancing drift, stress tests price shocks and \
                  renders CSV reports, all with decimal precision."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Emit debug logs to stderr (overrides RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Allocate an investment across assets using clamp-and-normalise weights
    Allocate(AllocateArgs),
    /// Assess portfolio risk (volatility, risk score, Sharpe-like ratio)
    Risk(RiskArgs),
    /// Project an asset's return from its price history
    Predict(PredictArgs),
    /// Check allocation drift and compute rebalancing trades
    Rebalance(RebalanceArgs),
    /// Revalue a portfolio under uniform price shocks
    StressTest(StressTestArgs),
    /// Render the CSV portfolio report
    Report(ReportArgs),
    /// Run allocation, risk, stress and report in one pass
    Analyze(AnalyzeArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Allocate(args) => commands::allocation::run_allocate(args),
        Commands::Risk(args) => commands::risk::run_risk(args),
        Commands::Predict(args) => commands::risk::run_predict(args),
        Commands::Rebalance(args) => commands::rebalance::run_rebalance(args),
        Commands::StressTest(args) => commands::rebalance::run_stress_test(args),
        Commands::Report(args) => commands::report::run_report(args),
        Commands::Analyze(args) => commands::analysis::run_analyze(args),
        Commands::Version => {
            println!("cfolio {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
