use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "portal14", version, about = "portal14 invitation in the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play the invitation in real time
    Run(commands::run::RunArgs),
    /// Replay the invitation on a virtual clock and print events as JSON lines
    Simulate(commands::simulate::SimulateArgs),
    /// Print the current state as JSON
    Status {
        /// Evaluate at this instant (RFC 3339) instead of now
        #[arg(long)]
        now: Option<String>,
    },
    /// Print the countdown to the unlock instant as JSON
    Countdown {
        /// Evaluate at this instant (RFC 3339) instead of now
        #[arg(long)]
        now: Option<String>,
    },
    /// Record acceptance without playing the sequence
    Accept,
    /// Forget the recorded acceptance
    Reset,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Generate shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("PORTAL14_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Simulate(args) => commands::simulate::run(args),
        Commands::Status { now } => commands::status::status(now),
        Commands::Countdown { now } => commands::status::countdown(now),
        Commands::Accept => commands::flag::accept(),
        Commands::Reset => commands::flag::reset(),
        Commands::Config { action } => commands::config::run(action),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "portal14", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
