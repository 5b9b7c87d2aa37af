//! # dojo-core
//!
//! Core library for dojo - a personal workspace assistant.
//!
//! This library provides:
//! - Project classification by marker files and per-type quick actions
//! - Visit history, command log and favorites in a JSON store
//! - Fuzzy project lookup across the workspace categories
//! - A health audit of repositories and dependency installs, with fixes
//! - Reversible migration from the legacy flat layout to the nested one
//! - Configuration and logging infrastructure
//!
//! ## Architecture
//!
//! A [`Context`] is built once per command from the current directory. It
//! owns the [`Store`] handle and the [`Workspace`] root. The [`Navigator`],
//! [`Auditor`] and [`Migrator`] each borrow what they need and return
//! structured results; nothing in this crate writes to stdout.
//!
//! External tools (git, pip, npm) are reached only through a
//! [`CommandRunner`], so everything above it can be tested with
//! [`MockRunner`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use dojo_core::{CancelToken, Context, Navigator, Store, SystemRunner};
//!
//! let runner = SystemRunner::new(CancelToken::new());
//! let ctx = Context::load(std::env::current_dir().unwrap(), Store::open_default(), &runner);
//!
//! let nav = Navigator::new(ctx.workspace(), ctx.config().fuzzy_threshold);
//! for hit in nav.search("demo") {
//!     println!("{} ({:.0}%)", hit.project, hit.score * 100.0);
//! }
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use context::{Context, LocationSummary};
pub use error::{Error, Result};
pub use health::{Auditor, FixTarget, HealthReport};
pub use history::{FavoriteToggle, History, VisitEntry};
pub use migrate::{MigrationBackup, Migrator};
pub use navigator::{Goto, Match, Navigator};
pub use process::{CancelToken, CommandOutcome, CommandRunner, Invocation, MockRunner, SystemRunner};
pub use project::{ProjectType, QuickAction};
pub use store::Store;
pub use workspace::{ProjectRef, Workspace};

// Public modules
pub mod classify;
pub mod clean;
pub mod config;
pub mod context;
pub mod error;
pub mod format;
pub mod git;
pub mod health;
pub mod history;
pub mod launch;
pub mod logging;
pub mod migrate;
pub mod navigator;
pub mod process;
pub mod project;
pub mod store;
pub mod workspace;
