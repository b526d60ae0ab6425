mod client;
mod commands;
mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::client::Remote;
use crate::commands::{
    ConsoleNotifier, cmd_clear, cmd_list, cmd_missing, cmd_overview, cmd_pantry_add,
    cmd_pantry_clear, cmd_pantry_list, cmd_pantry_remove, cmd_set_purchased, cmd_storage,
};
use crate::config::{ApiSettings, Config, DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS};
use grocer_core::service::GroceryService;

#[derive(Parser)]
#[command(
    name = "grocer",
    version,
    about = "A local-first grocery list for your meal plans"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Catalog service base URL
    #[arg(long, global = true, env = "GROCER_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,
    /// Bearer token for the catalog service
    #[arg(long, global = true, env = "GROCER_API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,
    /// Request timeout in seconds
    #[arg(long, global = true, env = "GROCER_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,
    /// Confirm purchase changes with the catalog service instead of locally
    #[arg(long, global = true, env = "GROCER_REMOTE_CONFIRM")]
    remote_confirm: bool,
    /// Path to the local store (default: data directory)
    #[arg(long, global = true, env = "GROCER_DB", value_name = "PATH")]
    db: Option<PathBuf>,
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the grocery list of a meal plan with purchase state
    List {
        /// Meal plan ID
        meal_plan: String,
        /// Show the last cached list without contacting the catalog service
        #[arg(long)]
        offline: bool,
    },
    /// Mark items as purchased
    Check {
        /// Meal plan ID
        meal_plan: String,
        /// Item IDs
        #[arg(required = true)]
        items: Vec<String>,
        /// Use the cached list instead of fetching it
        #[arg(long)]
        offline: bool,
    },
    /// Mark items as not purchased
    Uncheck {
        /// Meal plan ID
        meal_plan: String,
        /// Item IDs
        #[arg(required = true)]
        items: Vec<String>,
        /// Use the cached list instead of fetching it
        #[arg(long)]
        offline: bool,
    },
    /// Show summary, cost estimate, store suggestions and budget alternatives
    Overview {
        /// Meal plan ID
        meal_plan: String,
    },
    /// Find list items not covered by the pantry
    Missing {
        /// Meal plan ID
        meal_plan: String,
        /// Show the last cached result without contacting the catalog service
        #[arg(long)]
        cached: bool,
    },
    /// Manage pantry items
    Pantry {
        #[command(subcommand)]
        command: PantryCommands,
    },
    /// Clear local data for a meal plan, or everything with --all
    Clear {
        /// Meal plan ID
        meal_plan: Option<String>,
        /// Clear every meal plan and the pantry
        #[arg(long, conflicts_with = "meal_plan")]
        all: bool,
    },
    /// Show local storage usage
    Storage,
}

#[derive(Subcommand)]
enum PantryCommands {
    /// Add an item to the pantry
    Add {
        /// Item name
        name: String,
    },
    /// Remove an item from the pantry
    Remove {
        /// Item name
        name: String,
    },
    /// List pantry items
    List,
    /// Remove every pantry item
    Clear,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("grocer=debug,grocer_core=debug,warn")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.db)?;
    let db_path = config
        .db_path
        .to_str()
        .context("Store path is not valid UTF-8")?;

    let settings = ApiSettings {
        base_url: cli.api_url,
        token: cli.api_token,
        timeout_secs: cli.timeout_secs,
    };
    let remote = Remote::new(settings);

    let svc = GroceryService::new(db_path)?
        .with_notifier(Arc::new(ConsoleNotifier { json: cli.json }));

    let json = cli.json;
    let remote_confirm = cli.remote_confirm;
    match cli.command {
        Commands::List { meal_plan, offline } => cmd_list(&svc, &remote, &meal_plan, offline, json),
        Commands::Check {
            meal_plan,
            items,
            offline,
        } => {
            let svc = confirming(svc, &remote, remote_confirm)?;
            cmd_set_purchased(&svc, &remote, &meal_plan, &items, true, offline, json)
        }
        Commands::Uncheck {
            meal_plan,
            items,
            offline,
        } => {
            let svc = confirming(svc, &remote, remote_confirm)?;
            cmd_set_purchased(&svc, &remote, &meal_plan, &items, false, offline, json)
        }
        Commands::Overview { meal_plan } => cmd_overview(&svc, &remote, &meal_plan, json),
        Commands::Missing { meal_plan, cached } => {
            cmd_missing(&svc, &remote, &meal_plan, cached, json)
        }
        Commands::Pantry { command } => match command {
            PantryCommands::Add { name } => cmd_pantry_add(&svc, &name, json),
            PantryCommands::Remove { name } => cmd_pantry_remove(&svc, &name, json),
            PantryCommands::List => cmd_pantry_list(&svc, json),
            PantryCommands::Clear => cmd_pantry_clear(&svc, json),
        },
        Commands::Clear { meal_plan, all } => cmd_clear(&svc, meal_plan.as_deref(), all, json),
        Commands::Storage => cmd_storage(&svc, json),
    }
}

/// Route purchase confirmations through the catalog service when asked to.
fn confirming(svc: GroceryService, remote: &Remote, remote_confirm: bool) -> Result<GroceryService> {
    if !remote_confirm {
        return Ok(svc);
    }
    Ok(svc.with_confirmer(remote.client()?))
}
