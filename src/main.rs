//! `pbs-init`: start PBS daemons according to `pbs.conf` and the environment.
//!
//! ```text
//! pbs.conf ──┐
//!            ├─▶ resolver ─▶ launcher ─▶ "PBS comm" / "PBS mom" / ...
//! PBS_START_*┘
//! ```

use std::io;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use pbs_init::config::env::conf_path_from_process_env;
use pbs_init::config::{load_config, EnvironmentOverrides, Subsystem};
use pbs_init::lifecycle::startup;
use pbs_init::lifecycle::ConsoleLauncher;
use pbs_init::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "pbs-init")]
#[command(about = "Start PBS daemons honouring PBS_START_* overrides", long_about = None)]
struct Cli {
    /// Configuration file (defaults to $PBS_CONF_FILE, then /etc/pbs.conf)
    #[arg(short, long, global = true)]
    conf: Option<PathBuf>,

    /// Default log level when RUST_LOG is not set
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start every subsystem whose resolved setting is on
    Start {
        /// Print what would start without running any daemon
        #[arg(long)]
        dry_run: bool,
    },
    /// Show the resolved start setting of every subsystem
    Show {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let conf = match cli.conf {
        Some(path) => path,
        None => conf_path_from_process_env()?,
    };
    let overrides = EnvironmentOverrides::from_process_env()?;

    match cli.command {
        Commands::Start { dry_run } => {
            let config = load_config(&conf)?;
            let mode = startup::launch_mode(&config, &overrides, dry_run, &conf)?;

            let mut launcher = ConsoleLauncher::new(io::stdout().lock(), mode);
            startup::launch(&config, &overrides, &mut launcher)?;
        }
        Commands::Show { json } => {
            let config = load_config(&conf)?;
            let resolved = startup::plan_from_config(&config, &overrides)?;
            let paths = startup::install_paths(&config, &overrides);

            if json {
                let report = serde_json::json!({ "subsystems": resolved, "paths": paths });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for (key, path) in [("PBS_EXEC", &paths.exec), ("PBS_HOME", &paths.home)] {
                    match path {
                        Some(path) => println!("{:<10} {}", key, path.display()),
                        None => println!("{:<10} (unset)", key),
                    }
                }
                for subsystem in Subsystem::START_ORDER {
                    if let Some(decision) = resolved.get(subsystem) {
                        println!(
                            "{:<10} {:<5} ({})",
                            subsystem.to_string(),
                            if decision.start { "start" } else { "skip" },
                            decision.origin
                        );
                    }
                }
            }
        }
    }

    Ok(())
}
