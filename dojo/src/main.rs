//! dojo - personal workspace assistant
//!
//! Knows what kind of project you are in, finds projects by fuzzy name,
//! keeps environments healthy and migrates the workspace layout.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Config, history: $XDG_CONFIG_HOME/dojo/ (~/.config/dojo/)
//! - Logs: $XDG_STATE_HOME/dojo/ (~/.local/state/dojo/)
//! - Workspace: $DOJO_ROOT, the `workspace_root` option, or ~/dojo

mod commands;
mod prompt;
mod render;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand, ValueEnum};
use dojo_core::{CancelToken, Context, Store, SystemRunner};

#[derive(Parser)]
#[command(name = "dojo")]
#[command(about = "Personal workspace assistant")]
#[command(version)]
struct Args {
    /// Answer yes to every confirmation
    #[arg(short, long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Show where you are: project, type, quick actions, git status
    #[command(visible_alias = "detect")]
    Where,

    /// Find a project by fuzzy name
    Goto {
        term: String,

        /// Pick the Nth candidate instead of prompting
        #[arg(long)]
        pick: Option<String>,
    },

    /// List projects by category
    Ls { category: Option<String> },

    /// Recently visited projects
    Recent {
        /// Only visits from the last N days
        #[arg(long, default_value_t = 7)]
        days: u32,

        /// Include every remembered visit
        #[arg(long, conflicts_with = "days")]
        all: bool,

        #[arg(long, default_value_t = 15)]
        limit: usize,
    },

    /// Toggle a project as favorite (current project by default)
    Fav { name: Option<String> },

    /// List favorite projects
    Favs,

    /// Start the dev server of a project
    Dev { target: Option<String> },

    /// Run a quick action of a project
    Run {
        action: String,
        target: Option<String>,
    },

    /// Open a project in the editor
    Code { target: Option<String> },

    /// Open a project in the file explorer
    Explore { target: Option<String> },

    /// Audit git repos, Python venvs and node installs
    Health,

    /// Fix what the health audit found (git, python, node or all)
    Fix { target: String },

    /// Pull every repository in the workspace
    Sync,

    /// Remove build artifacts
    Clean {
        /// Also remove node_modules, .next, dist, build and out
        #[arg(long)]
        deep: bool,
    },

    /// Move a legacy flat layout into the nested layout
    Migrate {
        #[command(subcommand)]
        action: MigrateCommand,
    },

    /// Show or change configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigCommand>,
    },

    /// Turn learning mode on or off
    Learn { state: Switch },
}

#[derive(Subcommand)]
enum MigrateCommand {
    /// Show what would move
    Preview,
    /// Perform the migration
    Execute,
    /// Undo the recorded migration
    Rollback,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print every option
    Show,
    /// Set one option
    Set { key: String, value: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum Switch {
    On,
    Off,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let store = Store::open_default();
    let config = store.load_config();

    // Initialize logging (to file; stdout belongs to the command output).
    // An unusable log directory only costs the log.
    let _log_guard = match dojo_core::logging::init(&config.logging) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("warning: logging disabled: {}", e);
            None
        }
    };

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "dojo starting");

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nStopping...");
        handler_token.cancel();
    })
    .context("failed to set Ctrl+C handler")?;
    let runner = SystemRunner::new(cancel);

    let cwd = std::env::current_dir().context("failed to read current directory")?;
    let mut ctx = Context::load(cwd, store, &runner);

    let assume_yes = args.yes;
    let result = match args.command.unwrap_or(Command::Where) {
        Command::Where => commands::where_am_i(&ctx),
        Command::Goto { term, pick } => commands::goto(&ctx, &term, pick.as_deref()),
        Command::Ls { category } => commands::list(&ctx, category.as_deref()),
        Command::Recent { days, all, limit } => {
            commands::recent(&ctx, limit, (!all).then_some(days))
        }
        Command::Fav { name } => commands::toggle_favorite(&ctx, name.as_deref()),
        Command::Favs => commands::favorites(&ctx),
        Command::Dev { target } => {
            commands::run_action(&ctx, "dev", target.as_deref(), assume_yes)
        }
        Command::Run { action, target } => {
            commands::run_action(&ctx, &action, target.as_deref(), assume_yes)
        }
        Command::Code { target } => commands::open_editor(&ctx, target.as_deref()),
        Command::Explore { target } => commands::open_explorer(&ctx, target.as_deref()),
        Command::Health => commands::health(&ctx, &runner),
        Command::Fix { target } => commands::fix(&ctx, &runner, &target),
        Command::Sync => commands::sync(&ctx, &runner),
        Command::Clean { deep } => commands::clean(&ctx, deep, assume_yes),
        Command::Migrate { action } => match action {
            MigrateCommand::Preview => commands::migrate_preview(&ctx),
            MigrateCommand::Execute => commands::migrate_execute(&ctx, assume_yes),
            MigrateCommand::Rollback => commands::migrate_rollback(&ctx, assume_yes),
        },
        Command::Config { action } => match action.unwrap_or(ConfigCommand::Show) {
            ConfigCommand::Show => commands::config_show(&ctx),
            ConfigCommand::Set { key, value } => commands::config_set(&mut ctx, &key, &value),
        },
        Command::Learn { state } => commands::learn(&mut ctx, matches!(state, Switch::On)),
    };

    if let Err(e) = &result {
        tracing::warn!(error = %e, "Command failed");
    }
    result
}
