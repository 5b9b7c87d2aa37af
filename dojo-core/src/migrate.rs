//! Legacy-to-nested workspace layout migration
//!
//! The legacy layout kept every category at the top level (`apps/`,
//! `bots/`, ...). The nested layout groups them under `work/`, `lab/`,
//! `research/` and `resources/`. [`MIGRATION_MAP`] is applied in order.
//!
//! Every rename that actually happens is recorded in a [`MigrationBackup`]
//! kept by the [`Store`], together with the parent directories the
//! migration had to create. Rollback replays the moves in reverse and then
//! removes those parents if they are empty again, which restores the
//! original tree exactly.
//!
//! Both directions are per-item: one failed rename is reported and the
//! rest still run.

use crate::error::{Error, Result};
use crate::store::Store;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Legacy folder to nested folder, in the order moves are attempted.
pub const MIGRATION_MAP: &[(&str, &str)] = &[
    ("apps", "work/apps"),
    ("bots", "work/bots"),
    ("tools", "work/tools"),
    ("contracts", "work/contracts"),
    ("experiments", "lab"),
    ("protocols", "research/defi"),
    ("ideas", "research/strategies"),
    ("archive", "resources"),
    ("downloads", "resources/downloads"),
];

/// True if any legacy top-level folder exists under `root`.
pub fn needs_migration(root: &Path) -> bool {
    MIGRATION_MAP
        .iter()
        .any(|(legacy, _)| root.join(legacy).is_dir())
}

/// One rename, as paths relative to the workspace root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub from: PathBuf,
    pub to: PathBuf,
}

impl Move {
    fn new(from: &str, to: &str) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    fn reversed(&self) -> Self {
        Self {
            from: self.to.clone(),
            to: self.from.clone(),
        }
    }
}

/// Record of a performed migration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationBackup {
    pub timestamp: DateTime<Utc>,
    /// Moves in the order they were performed
    pub moves: Vec<Move>,
    /// Parent directories the migration created, in creation order
    #[serde(default)]
    pub created_dirs: Vec<PathBuf>,
}

/// A move `execute` would attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMove {
    pub step: Move,
    /// Entries directly inside the source folder
    pub items: usize,
    /// Destination already exists, so the move will be refused
    pub blocked: bool,
}

/// A move that could not be performed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedMove {
    pub step: Move,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationOutcome {
    pub performed: Vec<Move>,
    pub failures: Vec<FailedMove>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollbackOutcome {
    pub restored: Vec<Move>,
    pub failures: Vec<FailedMove>,
    /// Created parents that were empty again and got removed
    pub removed_dirs: Vec<PathBuf>,
}

pub struct Migrator<'a> {
    root: &'a Path,
    store: &'a Store,
}

impl<'a> Migrator<'a> {
    pub fn new(root: &'a Path, store: &'a Store) -> Self {
        Self { root, store }
    }

    /// Moves whose source exists. Read-only.
    pub fn preview(&self) -> Vec<PlannedMove> {
        MIGRATION_MAP
            .iter()
            .filter(|(from, _)| self.root.join(from).is_dir())
            .map(|(from, to)| PlannedMove {
                step: Move::new(from, to),
                items: count_entries(&self.root.join(from)),
                blocked: self.root.join(to).exists(),
            })
            .collect()
    }

    pub fn has_backup(&self) -> Result<bool> {
        Ok(self.store.load_backup()?.is_some())
    }

    /// Perform every applicable move and record the ones that succeeded.
    ///
    /// An existing un-rolled-back record is extended rather than replaced,
    /// so a later rollback still undoes both runs.
    pub fn execute(&self) -> Result<MigrationOutcome> {
        let mut backup = self.store.load_backup()?.unwrap_or_else(|| MigrationBackup {
            timestamp: Utc::now(),
            moves: Vec::new(),
            created_dirs: Vec::new(),
        });
        let mut outcome = MigrationOutcome::default();

        for (from, to) in MIGRATION_MAP {
            if !self.root.join(from).is_dir() {
                continue;
            }
            let step = Move::new(from, to);
            match self.apply(&step, &mut backup.created_dirs) {
                Ok(()) => {
                    tracing::info!(from, to, "Moved folder");
                    outcome.performed.push(step);
                }
                Err(e) => {
                    tracing::warn!(from, to, error = %e, "Move failed");
                    outcome.failures.push(FailedMove {
                        step,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if !outcome.performed.is_empty() {
            backup.timestamp = Utc::now();
            backup.moves.extend(outcome.performed.iter().cloned());
            self.store.save_backup(&backup)?;
        }
        tracing::info!(
            performed = outcome.performed.len(),
            failed = outcome.failures.len(),
            "Migration finished"
        );
        Ok(outcome)
    }

    /// Reverse the recorded moves, most recent first.
    ///
    /// Moves that could not be reversed stay in the record so the rollback
    /// can be retried; otherwise the record is deleted.
    pub fn rollback(&self) -> Result<RollbackOutcome> {
        let backup = self.store.load_backup()?.ok_or(Error::NoBackup)?;
        let mut outcome = RollbackOutcome::default();
        let mut ignored = Vec::new();

        for step in backup.moves.iter().rev() {
            match self.apply(&step.reversed(), &mut ignored) {
                Ok(()) => {
                    tracing::info!(from = %step.to.display(), to = %step.from.display(), "Restored folder");
                    outcome.restored.push(step.clone());
                }
                Err(e) => {
                    tracing::warn!(from = %step.to.display(), error = %e, "Restore failed");
                    outcome.failures.push(FailedMove {
                        step: step.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        for dir in backup.created_dirs.iter().rev() {
            // Only succeeds once the directory is empty again
            if fs::remove_dir(self.root.join(dir)).is_ok() {
                outcome.removed_dirs.push(dir.clone());
            }
        }

        if outcome.failures.is_empty() {
            self.store.delete_backup()?;
        } else {
            let remaining = MigrationBackup {
                timestamp: backup.timestamp,
                moves: backup
                    .moves
                    .iter()
                    .filter(|m| outcome.failures.iter().any(|f| &f.step == *m))
                    .cloned()
                    .collect(),
                created_dirs: backup
                    .created_dirs
                    .iter()
                    .filter(|d| !outcome.removed_dirs.contains(d))
                    .cloned()
                    .collect(),
            };
            self.store.save_backup(&remaining)?;
        }
        tracing::info!(
            restored = outcome.restored.len(),
            failed = outcome.failures.len(),
            "Rollback finished"
        );
        Ok(outcome)
    }

    /// Rename `step.from` to `step.to`, creating missing parents of the
    /// destination and noting them in `created`.
    fn apply(&self, step: &Move, created: &mut Vec<PathBuf>) -> Result<()> {
        self.apply_with(step, created, |from, to| fs::rename(from, to))
    }

    /// [`Self::apply`] with the final move supplied by the caller. Parents
    /// created for a move that then fails are removed again and not noted.
    fn apply_with(
        &self,
        step: &Move,
        created: &mut Vec<PathBuf>,
        move_dir: impl FnOnce(&Path, &Path) -> std::io::Result<()>,
    ) -> Result<()> {
        let source = self.root.join(&step.from);
        let dest = self.root.join(&step.to);
        if !source.exists() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} does not exist", step.from.display()),
            )));
        }
        if dest.exists() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("{} already exists", step.to.display()),
            )));
        }

        let mut missing = Vec::new();
        let mut parent = step.to.parent();
        while let Some(rel) = parent.filter(|p| !p.as_os_str().is_empty()) {
            if self.root.join(rel).exists() {
                break;
            }
            missing.push(rel.to_path_buf());
            parent = rel.parent();
        }

        let mut made = Vec::new();
        let result = missing
            .into_iter()
            .rev()
            .try_for_each(|rel| -> std::io::Result<()> {
                fs::create_dir(self.root.join(&rel))?;
                made.push(rel);
                Ok(())
            })
            .and_then(|()| move_dir(&source, &dest));

        match result {
            Ok(()) => {
                created.extend(made);
                Ok(())
            }
            Err(e) => {
                for rel in made.iter().rev() {
                    if let Err(cleanup) = fs::remove_dir(self.root.join(rel)) {
                        tracing::warn!(dir = %rel.display(), error = %cleanup, "Could not remove created directory");
                    }
                }
                Err(e.into())
            }
        }
    }
}

fn count_entries(dir: &Path) -> usize {
    fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}
