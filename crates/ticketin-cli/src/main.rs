//! TicketIn CLI entry point.

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use ticketin_cli::cli::{Cli, Commands};
use ticketin_cli::commands;
use ticketin_cli::repl::Repl;

fn main() {
    // Load .env.local if it exists (TICKETIN_STATE_DIR etc.)
    let _ = dotenvy::from_filename(".env.local");

    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level().to_string()));

    fmt().with_env_filter(filter).with_target(false).init();

    let state_dir = cli.state_dir();
    let config = cli.simulation_config();

    let result = match cli.command {
        Some(Commands::Repl) | None => run_repl(&state_dir, config),
        Some(cmd) => commands::execute(cmd, &state_dir, config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run_repl(
    state_dir: &std::path::Path,
    config: ticketin_runtime::SimulationConfig,
) -> commands::Result<()> {
    let mut repl = Repl::new(state_dir, config)?;
    repl.run()
}
