//! Command handlers for CLI subcommands.

use std::path::Path;
use std::time::Duration;

use ticketin_runtime::{BatchReport, RuntimeError, SimulationConfig};
use tracing::info;

use crate::app::App;
use crate::cli::Commands;

/// Result type for command operations.
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Execute a CLI command.
pub fn execute(command: Commands, state_dir: &Path, config: SimulationConfig) -> Result<()> {
    match command {
        Commands::Simulate { duration_secs } => cmd_simulate(state_dir, config, duration_secs),
        Commands::Configure { vendors, customers } => {
            cmd_configure(state_dir, config, vendors, customers)
        }
        Commands::Status => cmd_status(state_dir, config),
        Commands::Repl => {
            // REPL is handled separately in main
            Ok(())
        }
    }
}

fn cmd_simulate(state_dir: &Path, config: SimulationConfig, duration_secs: u64) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    let app = App::open(state_dir, config)?;
    let population = app.population();

    println!(
        "Simulating {} vendor(s) and {} customer(s) across {} event(s) for {}s...",
        population.vendors.len(),
        population.customers.len(),
        population.events.len(),
        duration_secs
    );

    let report = runtime
        .block_on(async {
            app.start().await?;
            tokio::time::sleep(Duration::from_secs(duration_secs)).await;
            app.stop().await
        })
        .inspect_err(|e| print_partial_report(e.as_ref()))?;

    if let Some(report) = report {
        print_report(&report);
    }
    print_pools(&app);
    Ok(())
}

fn cmd_configure(
    state_dir: &Path,
    config: SimulationConfig,
    vendors: usize,
    customers: usize,
) -> Result<()> {
    let mut app = App::open(state_dir, config)?;
    info!(vendors, customers, "generating simulation data");

    let configured = app.configure(vendors, customers)?;
    println!(
        "Created {} vendors, {} customers, and {} events. Simulation is ready.",
        configured.vendors, configured.customers, configured.events
    );
    Ok(())
}

fn cmd_status(state_dir: &Path, config: SimulationConfig) -> Result<()> {
    let app = App::open(state_dir, config)?;

    println!("Vendors:   {}", app.vendors().len());
    println!("Customers: {}", app.customers().len());
    println!("Events:    {}", app.events().len());
    if !app.events().is_empty() {
        println!();
        print_pools(&app);
    }
    Ok(())
}

/// Prints the summary of a finished batch.
pub fn print_report(report: &BatchReport) {
    let elapsed = report.stopped_at - report.started_at;
    println!(
        "Simulation stopped after {:.1}s: {} released, {} purchased",
        elapsed.num_milliseconds() as f64 / 1000.0,
        report.tickets_released(),
        report.tickets_purchased()
    );
    for fault in &report.faults {
        println!("  worker {} faulted: {}", fault.worker, fault.reason);
    }
}

/// Prints the report that comes with aborted stragglers, if `err` carries one.
pub fn print_partial_report(err: &(dyn std::error::Error + 'static)) {
    if let Some(RuntimeError::Stragglers { report, .. }) = err.downcast_ref::<RuntimeError>() {
        print_report(report);
    }
}

/// Prints one line per event with its pool level.
pub fn print_pools(app: &App) {
    println!(
        "{:<24}  {:>9}  {:>8}  {:>6}  {:>4}",
        "EVENT", "AVAILABLE", "RELEASED", "SOLD", "MAX"
    );
    for event in app.events() {
        match event.pool().map(|p| p.snapshot()) {
            Some(Ok(s)) => println!(
                "{:<24}  {:>9}  {:>8}  {:>6}  {:>4}",
                truncate(event.name(), 24),
                s.available_count,
                s.total_released,
                s.total_sold,
                s.max_pool_size
            ),
            Some(Err(e)) => println!("{:<24}  error: {}", truncate(event.name(), 24), e),
            None => println!("{:<24}  (no pool)", truncate(event.name(), 24)),
        }
    }
}

/// Truncates a string to the given length, adding "..." if truncated.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
