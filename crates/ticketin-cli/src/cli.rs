//! Command-line interface definition using clap.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use ticketin_runtime::SimulationConfig;

/// Shortest join timeout handed to the runtime.
const MIN_JOIN_TIMEOUT: Duration = Duration::from_secs(10);

/// TicketIn - concurrent ticket pool simulation
#[derive(Parser, Debug)]
#[command(name = "ticketin")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to state directory
    #[arg(short, long, env = "TICKETIN_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    /// Length of one rate unit in milliseconds
    #[arg(long, env = "TICKETIN_RATE_UNIT_MS", default_value_t = 1000)]
    pub rate_unit_ms: u64,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start interactive REPL mode
    Repl,

    /// Run all vendors and customers for a fixed time, then report
    Simulate {
        /// How long to run before stopping
        #[arg(short, long, default_value_t = 10)]
        duration_secs: u64,
    },

    /// Generate simulated vendors, customers and events
    Configure {
        /// Number of vendors (one event is created per vendor)
        #[arg(long, default_value_t = 3)]
        vendors: usize,

        /// Number of customers
        #[arg(long, default_value_t = 5)]
        customers: usize,
    },

    /// Show vendors, customers and pool levels
    Status,
}

impl Cli {
    /// Returns the state directory path, using default if not specified.
    pub fn state_dir(&self) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .map(|h| h.join(".ticketin"))
                .unwrap_or_else(|| PathBuf::from(".ticketin"))
        })
    }

    /// Returns the log level based on verbosity.
    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }

    /// Builds the simulation config. The join timeout grows with the rate
    /// unit so a rate-1 worker mid-sleep can still finish before `stop` gives
    /// up on it.
    pub fn simulation_config(&self) -> SimulationConfig {
        let rate_unit = Duration::from_millis(self.rate_unit_ms.max(1));
        let join_timeout = (rate_unit * 2).max(MIN_JOIN_TIMEOUT);
        SimulationConfig::new()
            .with_rate_unit(rate_unit)
            .with_join_timeout(join_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse_no_args() {
        let cli = Cli::parse_from(["ticketin"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.rate_unit_ms, 1000);
    }

    #[test]
    fn test_cli_parse_simulate() {
        let cli = Cli::parse_from(["ticketin", "simulate", "--duration-secs", "3"]);
        match cli.command {
            Some(Commands::Simulate { duration_secs }) => assert_eq!(duration_secs, 3),
            _ => panic!("Expected Simulate command"),
        }
    }

    #[test]
    fn test_cli_parse_configure_defaults() {
        let cli = Cli::parse_from(["ticketin", "configure", "--customers", "9"]);
        match cli.command {
            Some(Commands::Configure { vendors, customers }) => {
                assert_eq!(vendors, 3);
                assert_eq!(customers, 9);
            }
            _ => panic!("Expected Configure command"),
        }
    }

    #[test]
    fn test_cli_rate_unit() {
        let cli = Cli::parse_from(["ticketin", "--rate-unit-ms", "50", "status"]);
        assert_eq!(
            cli.simulation_config().rate_unit,
            Duration::from_millis(50)
        );
    }

    #[test]
    fn test_join_timeout_outlasts_slowest_worker() {
        let cli = Cli::parse_from(["ticketin", "--rate-unit-ms", "50"]);
        assert_eq!(cli.simulation_config().join_timeout, MIN_JOIN_TIMEOUT);

        let cli = Cli::parse_from(["ticketin", "--rate-unit-ms", "20000"]);
        let config = cli.simulation_config();
        assert_eq!(config.join_timeout, Duration::from_secs(40));
        assert!(config.join_timeout > config.rate_unit);
    }

    #[test]
    fn test_cli_verbose() {
        let cli = Cli::parse_from(["ticketin", "-vv"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.log_level(), tracing::Level::DEBUG);
    }

    #[test]
    fn test_cli_help() {
        Cli::command().debug_assert();
    }
}
