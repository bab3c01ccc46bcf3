//! Interactive REPL (Read-Eval-Print Loop) for TicketIn.

use std::path::{Path, PathBuf};

use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use tracing::debug;

use ticketin_runtime::SimulationConfig;

use crate::app::App;
use crate::commands::{print_partial_report, print_pools, print_report, Result};

/// Help information for a command.
pub struct CommandHelp {
    /// Command name (e.g., "vendor").
    pub name: &'static str,
    /// Command aliases.
    pub aliases: &'static [&'static str],
    /// Brief one-line description.
    pub brief: &'static str,
    /// Usage syntax.
    pub usage: &'static str,
}

/// Static help entries for all commands.
static COMMAND_HELP: &[CommandHelp] = &[
    CommandHelp {
        name: "vendor",
        aliases: &[],
        brief: "Create a vendor with a release rate",
        usage: "/vendor <name> <rate>",
    },
    CommandHelp {
        name: "vendors",
        aliases: &[],
        brief: "List vendors",
        usage: "/vendors",
    },
    CommandHelp {
        name: "customer",
        aliases: &[],
        brief: "Create a customer with a retrieval rate",
        usage: "/customer <name> <rate>",
    },
    CommandHelp {
        name: "customers",
        aliases: &[],
        brief: "List customers",
        usage: "/customers",
    },
    CommandHelp {
        name: "event",
        aliases: &[],
        brief: "Create an event owned by a vendor",
        usage: "/event <vendor> <name> <max-pool-size>",
    },
    CommandHelp {
        name: "events",
        aliases: &[],
        brief: "List events with their pool levels",
        usage: "/events",
    },
    CommandHelp {
        name: "tickets",
        aliases: &[],
        brief: "List the tickets of an event",
        usage: "/tickets <event>",
    },
    CommandHelp {
        name: "pool",
        aliases: &[],
        brief: "Show the pool counters of an event",
        usage: "/pool <event>",
    },
    CommandHelp {
        name: "release",
        aliases: &[],
        brief: "Release one ticket (vendor must own the event)",
        usage: "/release <vendor> <event>",
    },
    CommandHelp {
        name: "buy",
        aliases: &[],
        brief: "Buy one ticket",
        usage: "/buy <customer> <event>",
    },
    CommandHelp {
        name: "configure",
        aliases: &[],
        brief: "Generate simulated vendors, customers and events",
        usage: "/configure <vendors> <customers>",
    },
    CommandHelp {
        name: "start",
        aliases: &[],
        brief: "Start the simulation over the generated records",
        usage: "/start",
    },
    CommandHelp {
        name: "stop",
        aliases: &[],
        brief: "Stop the simulation and print its report",
        usage: "/stop",
    },
    CommandHelp {
        name: "workers",
        aliases: &[],
        brief: "Show the number of live workers",
        usage: "/workers",
    },
    CommandHelp {
        name: "help",
        aliases: &["h", "?"],
        brief: "Show help",
        usage: "/help [command]",
    },
    CommandHelp {
        name: "quit",
        aliases: &["q", "exit"],
        brief: "Exit the REPL (stops a running simulation)",
        usage: "/quit",
    },
];

/// Tab completion for slash commands.
struct CommandCompleter;

impl CommandCompleter {
    const COMMANDS: &'static [&'static str] = &[
        "/buy", "/configure", "/customer", "/customers", "/event", "/events", "/help",
        "/pool", "/quit", "/release", "/start", "/stop", "/tickets", "/vendor", "/vendors",
        "/workers",
    ];
}

impl Completer for CommandCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        if !line.starts_with('/') {
            return Ok((0, vec![]));
        }

        let prefix = &line[..pos];
        let matches: Vec<Pair> = Self::COMMANDS
            .iter()
            .filter(|cmd| cmd.starts_with(prefix))
            .map(|cmd| Pair {
                display: cmd.to_string(),
                replacement: cmd.to_string(),
            })
            .collect();

        Ok((0, matches))
    }
}

impl Hinter for CommandCompleter {
    type Hint = String;
}

impl Highlighter for CommandCompleter {}
impl Validator for CommandCompleter {}
impl Helper for CommandCompleter {}

/// Slash commands available in the REPL.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    AddVendor { name: String, rate: u32 },
    Vendors,
    AddCustomer { name: String, rate: u32 },
    Customers,
    AddEvent {
        vendor: String,
        name: String,
        max_pool_size: usize,
    },
    Events,
    Tickets(String),
    Pool(String),
    Release { vendor: String, event: String },
    Buy { customer: String, event: String },
    Configure { vendors: usize, customers: usize },
    Start,
    Stop,
    Workers,
    Help(Option<String>),
    Quit,
    /// Malformed or unknown input, with a message for the user
    Invalid(String),
    Empty,
}

impl ReplCommand {
    /// Parses input into a REPL command.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if input.is_empty() {
            return ReplCommand::Empty;
        }

        let Some(stripped) = input.strip_prefix('/') else {
            return ReplCommand::Invalid("commands start with '/', try /help".to_string());
        };

        let mut parts = stripped.split_whitespace();
        let cmd = parts.next().unwrap_or_default().to_lowercase();
        let args: Vec<&str> = parts.collect();

        match cmd.as_str() {
            "vendor" => Self::parse_named_rate(&args, "vendor")
                .map(|(name, rate)| ReplCommand::AddVendor { name, rate })
                .unwrap_or_else(ReplCommand::Invalid),
            "vendors" => ReplCommand::Vendors,
            "customer" => Self::parse_named_rate(&args, "customer")
                .map(|(name, rate)| ReplCommand::AddCustomer { name, rate })
                .unwrap_or_else(ReplCommand::Invalid),
            "customers" => ReplCommand::Customers,
            "event" => Self::parse_event(&args),
            "events" => ReplCommand::Events,
            "tickets" => Self::one_arg(&args, "tickets <event>").map_or_else(
                ReplCommand::Invalid,
                ReplCommand::Tickets,
            ),
            "pool" => Self::one_arg(&args, "pool <event>")
                .map_or_else(ReplCommand::Invalid, ReplCommand::Pool),
            "release" => match args.as_slice() {
                [vendor, event] => ReplCommand::Release {
                    vendor: vendor.to_string(),
                    event: event.to_string(),
                },
                _ => ReplCommand::Invalid("usage: /release <vendor> <event>".to_string()),
            },
            "buy" => match args.as_slice() {
                [customer, event] => ReplCommand::Buy {
                    customer: customer.to_string(),
                    event: event.to_string(),
                },
                _ => ReplCommand::Invalid("usage: /buy <customer> <event>".to_string()),
            },
            "configure" => match args.as_slice() {
                [vendors, customers] => match (vendors.parse(), customers.parse()) {
                    (Ok(vendors), Ok(customers)) => ReplCommand::Configure { vendors, customers },
                    _ => ReplCommand::Invalid("counts must be whole numbers".to_string()),
                },
                _ => ReplCommand::Invalid("usage: /configure <vendors> <customers>".to_string()),
            },
            "start" => ReplCommand::Start,
            "stop" => ReplCommand::Stop,
            "workers" => ReplCommand::Workers,
            "help" | "h" | "?" => ReplCommand::Help(args.first().map(|s| s.to_string())),
            "quit" | "q" | "exit" => ReplCommand::Quit,
            _ => ReplCommand::Invalid(format!("unknown command: /{}", cmd)),
        }
    }

    fn one_arg(args: &[&str], usage: &str) -> std::result::Result<String, String> {
        match args {
            [arg] => Ok(arg.to_string()),
            _ => Err(format!("usage: /{}", usage)),
        }
    }

    /// Parses `<name...> <rate>`; the name may contain spaces.
    fn parse_named_rate(args: &[&str], what: &str) -> std::result::Result<(String, u32), String> {
        let usage = || format!("usage: /{} <name> <rate>", what);
        let Some((rate, name)) = args.split_last() else {
            return Err(usage());
        };
        if name.is_empty() {
            return Err(usage());
        }
        let rate = rate
            .parse()
            .map_err(|_| format!("rate must be a whole number, got '{}'", rate))?;
        Ok((name.join(" "), rate))
    }

    /// Parses `<vendor> <name...> <max-pool-size>`.
    fn parse_event(args: &[&str]) -> Self {
        let usage = || ReplCommand::Invalid("usage: /event <vendor> <name> <max-pool-size>".to_string());
        let [vendor, rest @ ..] = args else {
            return usage();
        };
        let Some((max, name)) = rest.split_last() else {
            return usage();
        };
        if name.is_empty() {
            return usage();
        }
        match max.parse() {
            Ok(max_pool_size) => ReplCommand::AddEvent {
                vendor: vendor.to_string(),
                name: name.join(" "),
                max_pool_size,
            },
            Err(_) => ReplCommand::Invalid(format!("pool size must be a whole number, got '{}'", max)),
        }
    }
}

/// REPL state
pub struct Repl {
    editor: Editor<CommandCompleter, DefaultHistory>,
    app: App,
    history_path: Option<PathBuf>,
    runtime: tokio::runtime::Runtime,
}

impl Repl {
    /// Creates a new REPL instance.
    pub fn new(state_dir: &Path, config: SimulationConfig) -> Result<Self> {
        let rl_config = rustyline::Config::builder()
            .completion_type(rustyline::CompletionType::List)
            .build();
        let mut editor = Editor::with_config(rl_config)?;
        editor.set_helper(Some(CommandCompleter));

        // Workers run on this runtime while the editor blocks on input
        let runtime = tokio::runtime::Runtime::new()?;
        let app = App::open(state_dir, config)?;

        let history_path = state_dir.join("repl_history.txt");
        if history_path.exists() {
            let _ = editor.load_history(&history_path);
        }

        Ok(Self {
            editor,
            app,
            history_path: Some(history_path),
            runtime,
        })
    }

    /// Runs the REPL loop.
    pub fn run(&mut self) -> Result<()> {
        println!("TicketIn REPL v{}", env!("CARGO_PKG_VERSION"));
        println!("Type /help for commands, /quit to exit");
        println!();

        loop {
            let prompt = self.prompt();

            match self.editor.readline(&prompt) {
                Ok(line) => {
                    self.editor.add_history_entry(&line)?;

                    let cmd = ReplCommand::parse(&line);
                    debug!(?cmd, "Parsed command");

                    match self.handle_command(cmd) {
                        Ok(true) => break,
                        Ok(false) => {}
                        Err(e) => eprintln!("Error: {}", e),
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                }
                Err(ReadlineError::Eof) => {
                    println!("^D");
                    break;
                }
                Err(err) => {
                    eprintln!("Error: {:?}", err);
                    break;
                }
            }
        }

        if let Err(e) = self.stop_simulation() {
            eprintln!("Error: {}", e);
        }

        if let Some(path) = &self.history_path {
            let _ = self.editor.save_history(path);
        }

        println!("Goodbye!");
        Ok(())
    }

    fn prompt(&self) -> String {
        let workers = self.app.controller().active_worker_count();
        if workers > 0 {
            format!("ticketin [{} workers]> ", workers)
        } else {
            "ticketin> ".to_string()
        }
    }

    /// Stops a running batch and prints its report. Returns whether a batch
    /// was running.
    fn stop_simulation(&self) -> Result<bool> {
        let app = &self.app;
        let stopped = self
            .runtime
            .block_on(app.stop())
            .inspect_err(|e| print_partial_report(e.as_ref()))?;
        match stopped {
            Some(report) => {
                print_report(&report);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Handles a REPL command. Returns Ok(true) if should quit.
    fn handle_command(&mut self, cmd: ReplCommand) -> Result<bool> {
        match cmd {
            ReplCommand::AddVendor { name, rate } => {
                let vendor = self.app.add_vendor(&name, rate)?;
                println!("Created vendor '{}' ({})", vendor.name, vendor.id);
            }
            ReplCommand::Vendors => {
                if self.app.vendors().is_empty() {
                    println!("No vendors.");
                }
                for v in self.app.vendors() {
                    let marker = if v.simulated { "~" } else { " " };
                    println!("{} {} ({}) - rate {} - {}", marker, v.name, v.id, v.release_rate, v.contact);
                }
            }
            ReplCommand::AddCustomer { name, rate } => {
                let customer = self.app.add_customer(&name, rate)?;
                println!("Created customer '{}' ({})", customer.name, customer.id);
            }
            ReplCommand::Customers => {
                if self.app.customers().is_empty() {
                    println!("No customers.");
                }
                for c in self.app.customers() {
                    let marker = if c.simulated { "~" } else { " " };
                    println!("{} {} ({}) - rate {} - {}", marker, c.name, c.id, c.retrieval_rate, c.contact);
                }
            }
            ReplCommand::AddEvent {
                vendor,
                name,
                max_pool_size,
            } => {
                let event = self.app.add_event(&vendor, &name, max_pool_size)?;
                println!(
                    "Created event '{}' ({}) with a pool of {}",
                    event.name(),
                    event.id(),
                    max_pool_size
                );
            }
            ReplCommand::Events => {
                if self.app.events().is_empty() {
                    println!("No events.");
                } else {
                    print_pools(&self.app);
                }
            }
            ReplCommand::Tickets(event) => {
                let snapshot = self.app.pool_snapshot(&event)?;
                if snapshot.tickets.is_empty() {
                    println!("No tickets released yet.");
                }
                for ticket in &snapshot.tickets {
                    match ticket.sold_to() {
                        Some(customer) => println!(
                            "{:>6}  sold to {} (released by {})",
                            ticket.id().to_string(),
                            customer,
                            ticket.released_by()
                        ),
                        None => println!(
                            "{:>6}  available (released by {})",
                            ticket.id().to_string(),
                            ticket.released_by()
                        ),
                    }
                }
            }
            ReplCommand::Pool(event) => {
                let s = self.app.pool_snapshot(&event)?;
                println!("Pool for {} (version {})", s.event_id, s.version);
                println!("  Available: {}/{}", s.available_count, s.max_pool_size);
                println!("  Released:  {}", s.total_released);
                println!("  Sold:      {}", s.total_sold);
            }
            ReplCommand::Release { vendor, event } => {
                println!("{}", self.app.release(&vendor, &event)?);
            }
            ReplCommand::Buy { customer, event } => {
                println!("{}", self.app.buy(&customer, &event)?);
            }
            ReplCommand::Configure { vendors, customers } => {
                println!("Creating simulation data...");
                let configured = self.app.configure(vendors, customers)?;
                println!(
                    "Created {} vendors, {} customers, and {} events. Simulation is ready.",
                    configured.vendors, configured.customers, configured.events
                );
            }
            ReplCommand::Start => {
                let app = &self.app;
                self.runtime.block_on(app.start())?;
                println!(
                    "Simulation started with {} workers. Use /stop to end it.",
                    app.controller().active_worker_count()
                );
            }
            ReplCommand::Stop => {
                if !self.stop_simulation()? {
                    println!("No simulation running.");
                }
            }
            ReplCommand::Workers => {
                println!("Active workers: {}", self.app.controller().active_worker_count());
            }
            ReplCommand::Help(topic) => print_help(topic.as_deref()),
            ReplCommand::Quit => return Ok(true),
            ReplCommand::Invalid(message) => println!("{}", message),
            ReplCommand::Empty => {}
        }
        Ok(false)
    }
}

/// Finds help for a command by name or alias.
fn find_command_help(name: &str) -> Option<&'static CommandHelp> {
    let name_lower = name.trim_start_matches('/').to_lowercase();
    COMMAND_HELP
        .iter()
        .find(|h| h.name == name_lower || h.aliases.contains(&name_lower.as_str()))
}

/// Prints help information.
fn print_help(topic: Option<&str>) {
    match topic {
        Some(cmd) => match find_command_help(cmd) {
            Some(help) => {
                println!("/{} - {}", help.name, help.brief);
                if !help.aliases.is_empty() {
                    println!("Aliases: {}", help.aliases.join(", "));
                }
                println!("Usage: {}", help.usage);
            }
            None => println!("Unknown command: {}. Type /help for available commands.", cmd),
        },
        None => {
            println!("TicketIn REPL - ticket pool simulation");
            println!();
            for help in COMMAND_HELP {
                println!("  {:<42} {}", help.usage, help.brief);
            }
            println!();
            println!("Vendors, customers and events can be referred to by name or id.");
            println!("Type /help <command> for detailed help on a specific command.");
        }
    }
}
