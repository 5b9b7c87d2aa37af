//! Per-invocation snapshot of where the user is
//!
//! A [`Context`] is built once per command. Construction opens the store,
//! loads the config, classifies the current directory, derives its
//! [`ProjectRef`], queries repository status, and logs the visit.
//!
//! The history operations live here too. Each one is a whole-document
//! read-modify-write through the [`Store`]; a failure to persist is logged
//! and never aborts the command.

use crate::classify::classify;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::git::{self, RepoStatus};
use crate::history::{CommandEntry, FavoriteToggle, VisitEntry};
use crate::migrate;
use crate::process::CommandRunner;
use crate::project::{self, ProjectType, QuickAction};
use crate::store::Store;
use crate::workspace::{ProjectRef, Workspace};
use chrono::Utc;
use std::path::{Path, PathBuf};

/// Summary of the current location for "where am I".
#[derive(Debug, Clone)]
pub struct LocationSummary {
    /// Path relative to the workspace root, `None` outside it
    pub relative: Option<PathBuf>,
    pub project: Option<ProjectRef>,
    pub project_type: ProjectType,
    pub actions: &'static [QuickAction],
    pub repo: Option<RepoStatus>,
}

pub struct Context {
    cwd: PathBuf,
    workspace: Workspace,
    store: Store,
    config: Config,
    project_type: ProjectType,
    project: Option<ProjectRef>,
    repo: Option<RepoStatus>,
}

impl Context {
    /// Build the context for `cwd`, with the workspace root taken from the
    /// config (or `$DOJO_ROOT`).
    pub fn load(cwd: impl Into<PathBuf>, store: Store, runner: &dyn CommandRunner) -> Self {
        let config = store.load_config();
        let root = config.workspace_root();
        Self::build(cwd.into(), root, store, config, runner)
    }

    /// Build the context for `cwd` with an explicit workspace root.
    pub fn with_root(
        cwd: impl Into<PathBuf>,
        root: impl Into<PathBuf>,
        store: Store,
        runner: &dyn CommandRunner,
    ) -> Self {
        let config = store.load_config();
        Self::build(cwd.into(), root.into(), store, config, runner)
    }

    fn build(
        cwd: PathBuf,
        root: PathBuf,
        store: Store,
        config: Config,
        runner: &dyn CommandRunner,
    ) -> Self {
        let workspace = Workspace::new(root);
        let project_type = classify(&cwd);
        let project = workspace.project_ref(&cwd);
        let repo = git::query_status(runner, &cwd);

        tracing::info!(
            cwd = %cwd.display(),
            project = ?project.as_ref().map(ToString::to_string),
            project_type = %project_type,
            repo_available = repo.is_some(),
            "Context loaded"
        );

        let ctx = Self {
            cwd,
            workspace,
            store,
            config,
            project_type,
            project,
            repo,
        };
        ctx.log_visit();
        ctx
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn root(&self) -> &Path {
        self.workspace.root()
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn project_type(&self) -> ProjectType {
        self.project_type
    }

    /// The project the current directory belongs to, if any.
    pub fn project(&self) -> Option<&ProjectRef> {
        self.project.as_ref()
    }

    /// Repository status; `None` means unknown and is never a warning.
    pub fn repo_status(&self) -> Option<&RepoStatus> {
        self.repo.as_ref()
    }

    pub fn is_in_workspace(&self) -> bool {
        self.workspace.contains(&self.cwd)
    }

    pub fn is_learning_mode(&self) -> bool {
        self.config.learning_mode
    }

    pub fn needs_migration(&self) -> bool {
        migrate::needs_migration(self.workspace.root())
    }

    /// Quick actions for the current directory's type.
    pub fn quick_actions(&self) -> &'static [QuickAction] {
        project::quick_actions_for(self.project_type)
    }

    pub fn location(&self) -> LocationSummary {
        LocationSummary {
            relative: self.workspace.relative(&self.cwd),
            project: self.project.clone(),
            project_type: self.project_type,
            actions: self.quick_actions(),
            repo: self.repo.clone(),
        }
    }

    /// Count a visit to the current project and bump it to the front of
    /// the recent list. No-op outside any project.
    pub fn log_visit(&self) {
        let Some(project) = &self.project else {
            return;
        };
        let entry = VisitEntry {
            name: project.to_string(),
            project_type: self.project_type,
            timestamp: Utc::now(),
            path: self.cwd.clone(),
        };
        if let Err(e) = self.store.update_history(|h| h.record_visit(entry)) {
            tracing::warn!(error = %e, "Failed to record visit");
        }
    }

    /// Append a command to the command log.
    pub fn log_command(&self, command: &str, args: &[String]) {
        let entry = CommandEntry {
            command: command.to_string(),
            args: args.to_vec(),
            timestamp: Utc::now(),
            project: self.project.as_ref().map(ToString::to_string),
        };
        if let Err(e) = self.store.update_history(|h| h.record_command(entry)) {
            tracing::warn!(error = %e, "Failed to record command");
        }
    }

    /// Returns `false` when already a favorite.
    pub fn add_favorite(&self, name: &str) -> Result<bool> {
        self.store.update_history(|h| h.add_favorite(name))
    }

    /// Returns `false` when not a favorite.
    pub fn remove_favorite(&self, name: &str) -> Result<bool> {
        self.store.update_history(|h| h.remove_favorite(name))
    }

    /// Toggle `name`, or the current project when `name` is `None`.
    pub fn toggle_favorite(&self, name: Option<&str>) -> Result<(String, FavoriteToggle)> {
        let name = match name {
            Some(name) => name.trim_matches('/').to_string(),
            None => self
                .project
                .as_ref()
                .map(ToString::to_string)
                .ok_or(Error::OutsideWorkspace)?,
        };
        let toggled = self.store.update_history(|h| h.toggle_favorite(&name))?;
        tracing::info!(name = %name, result = ?toggled, "Toggled favorite");
        Ok((name, toggled))
    }

    pub fn favorites(&self) -> Vec<String> {
        self.store.load_history().favorites
    }

    pub fn is_favorite(&self, name: &str) -> bool {
        self.store.load_history().is_favorite(name)
    }

    /// Most recent visits first, optionally only the last `max_age_days`.
    pub fn recent_projects(&self, limit: usize, max_age_days: Option<u32>) -> Vec<VisitEntry> {
        self.store
            .load_history()
            .recent_projects(limit, max_age_days, Utc::now())
    }

    /// Set one config option and persist it.
    pub fn set_config(&mut self, key: &str, value: &str) -> Result<()> {
        let updated = self.store.update_config(|c| {
            c.set(key, value)?;
            Ok(c.clone())
        })?;
        tracing::info!(key, value, "Config updated");
        self.config = updated;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{failed, MockRunner};
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        root: PathBuf,
        store: Store,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("dojo");
        fs::create_dir_all(root.join("work/apps/demo")).unwrap();
        fs::write(
            root.join("work/apps/demo/package.json"),
            r#"{"dependencies": {"next": "14.0.0"}}"#,
        )
        .unwrap();
        let store = Store::open(temp.path().join("config"));
        Fixture {
            _temp: temp,
            root,
            store,
        }
    }

    fn no_git() -> MockRunner {
        MockRunner::new(|_| failed(128, "fatal: not a git repository"))
    }

    #[test]
    fn test_context_classifies_and_logs_visit() {
        let fx = fixture();
        let cwd = fx.root.join("work/apps/demo");
        let ctx = Context::with_root(&cwd, &fx.root, fx.store.clone(), &no_git());

        assert_eq!(ctx.project_type(), ProjectType::NextJs);
        assert_eq!(ctx.project().unwrap().to_string(), "work/apps/demo");
        assert!(ctx.repo_status().is_none());
        assert!(ctx.quick_actions().iter().any(|a| a.id == "dev"));

        let history = fx.store.load_history();
        assert_eq!(history.recent.len(), 1);
        assert_eq!(history.recent[0].name, "work/apps/demo");
        assert_eq!(history.recent[0].project_type, ProjectType::NextJs);
        assert_eq!(history.visit_count("work/apps/demo"), 1);
    }

    #[test]
    fn test_outside_workspace_logs_nothing() {
        let fx = fixture();
        let elsewhere = TempDir::new().unwrap();
        let ctx = Context::with_root(elsewhere.path(), &fx.root, fx.store.clone(), &no_git());

        assert!(ctx.project().is_none());
        assert!(!ctx.is_in_workspace());
        assert!(fx.store.load_history().recent.is_empty());
        assert!(matches!(
            ctx.toggle_favorite(None),
            Err(Error::OutsideWorkspace)
        ));
    }

    #[test]
    fn test_repo_status_is_queried_for_cwd() {
        let fx = fixture();
        let cwd = fx.root.join("work/apps/demo");
        let runner = MockRunner::succeeding("## main...origin/main [ahead 1]\n");
        let ctx = Context::with_root(&cwd, &fx.root, fx.store.clone(), &runner);

        let repo = ctx.repo_status().unwrap();
        assert_eq!(repo.branch, "main");
        assert!(repo.ahead);
        assert_eq!(runner.calls()[0].cwd, cwd);
    }

    #[test]
    fn test_corrupt_history_does_not_abort() {
        let fx = fixture();
        fs::write(fx.store.history_path(), "[[[").unwrap();
        let cwd = fx.root.join("work/apps/demo");
        let ctx = Context::with_root(&cwd, &fx.root, fx.store.clone(), &no_git());
        ctx.log_command("goto", &["demo".to_string()]);

        let history = fx.store.load_history();
        assert_eq!(history.visit_count("work/apps/demo"), 1);
        assert_eq!(history.command_history.len(), 1);
        assert_eq!(
            history.command_history[0].project.as_deref(),
            Some("work/apps/demo")
        );
    }

    #[test]
    fn test_toggle_current_project_favorite() {
        let fx = fixture();
        let cwd = fx.root.join("work/apps/demo");
        let ctx = Context::with_root(&cwd, &fx.root, fx.store.clone(), &no_git());

        let (name, toggled) = ctx.toggle_favorite(None).unwrap();
        assert_eq!(name, "work/apps/demo");
        assert_eq!(toggled, FavoriteToggle::Added);
        assert!(ctx.is_favorite("work/apps/demo"));
        assert!(!ctx.add_favorite("work/apps/demo").unwrap());

        let (_, toggled) = ctx.toggle_favorite(Some("work/apps/demo")).unwrap();
        assert_eq!(toggled, FavoriteToggle::Removed);
        assert!(ctx.favorites().is_empty());
    }

    #[test]
    fn test_set_config_persists_and_refreshes() {
        let fx = fixture();
        let mut ctx = Context::with_root(&fx.root, &fx.root, fx.store.clone(), &no_git());
        assert!(!ctx.is_learning_mode());

        ctx.set_config("learning_mode", "on").unwrap();
        assert!(ctx.is_learning_mode());
        assert!(fx.store.load_config().learning_mode);

        assert!(ctx.set_config("fuzzy_threshold", "lots").is_err());
        assert_eq!(ctx.config().fuzzy_threshold, 0.6);
    }
}
