//! Workspace health audit and auto-remediation
//!
//! Three independent scans walk the whole workspace tree:
//!
//! | Section | Found by | Unhealthy when |
//! |---------|----------|----------------|
//! | Git | `.git/` directory | ahead, behind, dirty, or status query failed |
//! | Python | `requirements.txt` | no `venv/`, or no `site-packages` under it |
//! | Node | `package.json` | no `node_modules/` |
//!
//! Walks never descend into `.git`, `venv` or `node_modules`, so dependency
//! trees are not mistaken for projects. Results are sorted by path.
//!
//! Fixes are best-effort per item: a failed command is recorded in the
//! [`FixReport`] and the remaining items and sections still run. Only user
//! cancellation stops the batch early.

use crate::error::Error;
use crate::git::{status_invocation, RepoStatus};
use crate::process::{
    CommandOutcome, CommandRunner, Invocation, INSTALL_TIMEOUT, PULL_TIMEOUT, VENV_TIMEOUT,
};
use crate::workspace::Workspace;
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use walkdir::WalkDir;

const PRUNED_DIRS: &[&str] = &[".git", "venv", "node_modules"];

const PYTHON_MANIFEST: &str = "requirements.txt";
const PYTHON_ENV_DIR: &str = "venv";
const PYTHON_PACKAGES_MARKER: &str = "site-packages";
const NODE_MANIFEST: &str = "package.json";
const NODE_INSTALL_DIR: &str = "node_modules";

/// Audit section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Git,
    Python,
    Node,
}

impl Section {
    pub fn label(&self) -> &'static str {
        match self {
            Section::Git => "Git",
            Section::Python => "Python",
            Section::Node => "Node",
        }
    }
}

/// Why an item is unhealthy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Issue {
    UnpushedCommits,
    BehindOrigin,
    UncommittedChanges,
    QueryError,
    NoEnvironment,
    MissingDependencies,
    MissingInstall,
}

impl Issue {
    pub fn as_str(&self) -> &'static str {
        match self {
            Issue::UnpushedCommits => "unpushed commits",
            Issue::BehindOrigin => "behind origin",
            Issue::UncommittedChanges => "uncommitted changes",
            Issue::QueryError => "status query failed",
            Issue::NoEnvironment => "no environment",
            Issue::MissingDependencies => "missing dependencies",
            Issue::MissingInstall => "missing install",
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of one scanned item. Recomputed every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthResult {
    /// Path relative to the workspace root
    pub name: String,
    pub path: PathBuf,
    pub issue: Option<Issue>,
}

impl HealthResult {
    pub fn is_healthy(&self) -> bool {
        self.issue.is_none()
    }
}

/// All results of one section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionReport {
    pub section: Section,
    pub results: Vec<HealthResult>,
    /// The user stopped the scan; `results` holds only the items checked before that
    pub cancelled: bool,
}

impl SectionReport {
    fn new(section: Section) -> Self {
        Self {
            section,
            results: Vec::new(),
            cancelled: false,
        }
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn healthy(&self) -> usize {
        self.results.iter().filter(|r| r.is_healthy()).count()
    }

    pub fn unhealthy(&self) -> impl Iterator<Item = &HealthResult> {
        self.results.iter().filter(|r| !r.is_healthy())
    }

    pub fn with_issue(&self, issue: Issue) -> impl Iterator<Item = &HealthResult> {
        self.results.iter().filter(move |r| r.issue == Some(issue))
    }
}

/// Results of a full audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthReport {
    pub git: SectionReport,
    pub python: SectionReport,
    pub node: SectionReport,
}

impl HealthReport {
    pub fn sections(&self) -> [&SectionReport; 3] {
        [&self.git, &self.python, &self.node]
    }

    pub fn has_issues(&self) -> bool {
        self.sections().iter().any(|s| s.healthy() < s.total())
    }

    pub fn cancelled(&self) -> bool {
        self.sections().iter().any(|s| s.cancelled)
    }
}

/// What `fix` should repair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixTarget {
    Git,
    Python,
    Node,
    All,
}

impl FixTarget {
    fn includes(&self, section: Section) -> bool {
        matches!(
            (self, section),
            (FixTarget::All, _)
                | (FixTarget::Git, Section::Git)
                | (FixTarget::Python, Section::Python)
                | (FixTarget::Node, Section::Node)
        )
    }
}

impl FromStr for FixTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "git" => Ok(FixTarget::Git),
            "python" => Ok(FixTarget::Python),
            "node" => Ok(FixTarget::Node),
            "all" => Ok(FixTarget::All),
            _ => Err(Error::UnknownFixTarget(s.to_string())),
        }
    }
}

/// A remediation command kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixAction {
    Pull,
    CreateEnvironment,
    InstallDependencies,
    Install,
}

impl FixAction {
    pub fn label(&self) -> &'static str {
        match self {
            FixAction::Pull => "Pulling repos",
            FixAction::CreateEnvironment => "Creating venvs",
            FixAction::InstallDependencies => "Installing dependencies",
            FixAction::Install => "Installing node_modules",
        }
    }
}

/// One attempted fix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixStep {
    pub action: FixAction,
    pub name: String,
    pub path: PathBuf,
    /// `Err` carries the failure reason
    pub outcome: Result<(), String>,
}

/// Everything `fix` attempted, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixReport {
    pub steps: Vec<FixStep>,
    /// Stopped early by the user; later items were not attempted
    pub cancelled: bool,
}

impl FixReport {
    pub fn succeeded(&self) -> usize {
        self.steps.iter().filter(|s| s.outcome.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.steps.len() - self.succeeded()
    }
}

/// Result of pulling one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullResult {
    UpToDate,
    Updated,
    Failed(String),
}

/// Everything `sync` attempted, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub repos: Vec<(String, PullResult)>,
    pub cancelled: bool,
}

/// Classify `git status -sb` output for the audit.
///
/// Priority: ahead, then behind, then any line after the header, else synced.
pub fn classify_git(outcome: &CommandOutcome) -> Option<Issue> {
    let Some(stdout) = outcome.stdout() else {
        return Some(Issue::QueryError);
    };
    let status = RepoStatus::parse(stdout);
    if status.ahead {
        Some(Issue::UnpushedCommits)
    } else if status.behind {
        Some(Issue::BehindOrigin)
    } else if !status.clean {
        Some(Issue::UncommittedChanges)
    } else {
        None
    }
}

/// Check one Python project directory.
pub fn check_python(dir: &Path) -> Option<Issue> {
    let env = dir.join(PYTHON_ENV_DIR);
    if !env.is_dir() {
        return Some(Issue::NoEnvironment);
    }
    if dir.join(PYTHON_MANIFEST).is_file() && !has_installed_packages(&env) {
        return Some(Issue::MissingDependencies);
    }
    None
}

fn has_installed_packages(env: &Path) -> bool {
    WalkDir::new(env)
        .into_iter()
        .filter_map(|e| e.ok())
        .any(|e| e.file_type().is_dir() && e.file_name() == OsStr::new(PYTHON_PACKAGES_MARKER))
}

/// Check one Node project directory.
pub fn check_node(dir: &Path) -> Option<Issue> {
    if dir.join(NODE_INSTALL_DIR).is_dir() {
        None
    } else {
        Some(Issue::MissingInstall)
    }
}

/// Every directory under `root` for which `is_match` holds, sorted.
///
/// Directories named in [`PRUNED_DIRS`] are not descended into.
pub fn find_dirs(root: &Path, is_match: impl Fn(&Path) -> bool) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !PRUNED_DIRS
                    .iter()
                    .any(|skip| e.file_name() == OsStr::new(skip))
        })
        .filter_map(|e| match e {
            Ok(e) => Some(e),
            Err(err) => {
                tracing::debug!(error = %err, "Skipping unreadable entry");
                None
            }
        })
        .filter(|e| e.file_type().is_dir() && is_match(e.path()))
        .map(|e| e.into_path())
        .collect();
    found.sort();
    found
}

fn pip_path(dir: &Path) -> PathBuf {
    if cfg!(windows) {
        dir.join(PYTHON_ENV_DIR).join("Scripts").join("pip.exe")
    } else {
        dir.join(PYTHON_ENV_DIR).join("bin").join("pip")
    }
}

fn python_program() -> &'static str {
    if cfg!(windows) {
        "python"
    } else {
        "python3"
    }
}

fn npm_program() -> &'static str {
    if cfg!(windows) {
        "npm.cmd"
    } else {
        "npm"
    }
}

pub struct Auditor<'a> {
    workspace: &'a Workspace,
    runner: &'a dyn CommandRunner,
}

impl<'a> Auditor<'a> {
    pub fn new(workspace: &'a Workspace, runner: &'a dyn CommandRunner) -> Self {
        Self { workspace, runner }
    }

    fn name_of(&self, path: &Path) -> String {
        match self.workspace.relative(path) {
            Some(rel) if rel.as_os_str().is_empty() => ".".to_string(),
            Some(rel) => rel.display().to_string(),
            None => path.display().to_string(),
        }
    }

    fn result(&self, path: PathBuf, issue: Option<Issue>) -> HealthResult {
        HealthResult {
            name: self.name_of(&path),
            path,
            issue,
        }
    }

    /// Run all three scans.
    pub fn scan(&self) -> HealthReport {
        let report = HealthReport {
            git: self.scan_git(),
            python: self.scan_python(),
            node: self.scan_node(),
        };
        for section in report.sections() {
            tracing::info!(
                section = section.section.label(),
                healthy = section.healthy(),
                total = section.total(),
                "Health scan"
            );
        }
        report
    }

    pub fn find_repos(&self) -> Vec<PathBuf> {
        find_dirs(self.workspace.root(), |d| d.join(".git").is_dir())
    }

    /// Marks `report` cancelled once the user has asked to stop.
    fn stopped(&self, report: &mut SectionReport) -> bool {
        if self.runner.is_cancelled() {
            report.cancelled = true;
        }
        report.cancelled
    }

    pub fn scan_git(&self) -> SectionReport {
        let mut report = SectionReport::new(Section::Git);
        for repo in self.find_repos() {
            if self.stopped(&mut report) {
                break;
            }
            let outcome = self.runner.run(&status_invocation(&repo));
            if outcome == CommandOutcome::Cancelled {
                report.cancelled = true;
                break;
            }
            let issue = classify_git(&outcome);
            tracing::debug!(repo = %repo.display(), issue = ?issue, "Checked repository");
            report.results.push(self.result(repo, issue));
        }
        report
    }

    pub fn scan_python(&self) -> SectionReport {
        let mut report = SectionReport::new(Section::Python);
        for dir in find_dirs(self.workspace.root(), |d| d.join(PYTHON_MANIFEST).is_file()) {
            if self.stopped(&mut report) {
                break;
            }
            let issue = check_python(&dir);
            report.results.push(self.result(dir, issue));
        }
        report
    }

    pub fn scan_node(&self) -> SectionReport {
        let mut report = SectionReport::new(Section::Node);
        for dir in find_dirs(self.workspace.root(), |d| d.join(NODE_MANIFEST).is_file()) {
            if self.stopped(&mut report) {
                break;
            }
            let issue = check_node(&dir);
            report.results.push(self.result(dir, issue));
        }
        report
    }

    /// Scan only what `target` needs, then fix it.
    pub fn scan_and_fix(&self, target: FixTarget) -> FixReport {
        let empty = |section| SectionReport::new(section);
        let report = HealthReport {
            git: if target.includes(Section::Git) {
                self.scan_git()
            } else {
                empty(Section::Git)
            },
            python: if target.includes(Section::Python) {
                self.scan_python()
            } else {
                empty(Section::Python)
            },
            node: if target.includes(Section::Node) {
                self.scan_node()
            } else {
                empty(Section::Node)
            },
        };
        if report.cancelled() {
            return FixReport {
                cancelled: true,
                ..FixReport::default()
            };
        }
        self.fix(target, &report)
    }

    /// Apply fixes for the unhealthy items in `report`.
    pub fn fix(&self, target: FixTarget, report: &HealthReport) -> FixReport {
        let mut fixes = FixReport::default();

        if target.includes(Section::Git) {
            let behind: Vec<_> = report.git.with_issue(Issue::BehindOrigin).collect();
            for item in behind {
                let inv = Invocation::new("git", &item.path, PULL_TIMEOUT).args(["pull"]);
                if !self.attempt(&mut fixes, FixAction::Pull, item, inv) {
                    return fixes;
                }
            }
        }

        if target.includes(Section::Python) {
            let mut needs_install: Vec<&HealthResult> = Vec::new();
            let missing_env: Vec<_> = report.python.with_issue(Issue::NoEnvironment).collect();
            for item in missing_env {
                let inv = Invocation::new(python_program(), &item.path, VENV_TIMEOUT)
                    .args(["-m", "venv", PYTHON_ENV_DIR]);
                if !self.attempt(&mut fixes, FixAction::CreateEnvironment, item, inv) {
                    return fixes;
                }
                if fixes.steps.last().map_or(false, |s| s.outcome.is_ok()) {
                    needs_install.push(item);
                }
            }
            needs_install.extend(report.python.with_issue(Issue::MissingDependencies));
            for item in needs_install {
                let pip = pip_path(&item.path);
                let inv = Invocation::new(pip.to_string_lossy(), &item.path, INSTALL_TIMEOUT)
                    .args(["install", "-r", PYTHON_MANIFEST]);
                if !self.attempt(&mut fixes, FixAction::InstallDependencies, item, inv) {
                    return fixes;
                }
            }
        }

        if target.includes(Section::Node) {
            let missing: Vec<_> = report.node.with_issue(Issue::MissingInstall).collect();
            for item in missing {
                let inv = Invocation::new(npm_program(), &item.path, INSTALL_TIMEOUT)
                    .args(["install"]);
                if !self.attempt(&mut fixes, FixAction::Install, item, inv) {
                    return fixes;
                }
            }
        }

        tracing::info!(
            succeeded = fixes.succeeded(),
            failed = fixes.failed(),
            "Fixes applied"
        );
        fixes
    }

    /// Run one fix and record it. Returns `false` once the user has cancelled.
    fn attempt(
        &self,
        fixes: &mut FixReport,
        action: FixAction,
        item: &HealthResult,
        invocation: Invocation,
    ) -> bool {
        if self.runner.is_cancelled() {
            fixes.cancelled = true;
            return false;
        }
        let outcome = self.runner.run(&invocation);
        if outcome == CommandOutcome::Cancelled {
            fixes.cancelled = true;
            return false;
        }
        let result = match outcome.failure() {
            None => Ok(()),
            Some(reason) => {
                tracing::warn!(item = %item.name, command = %invocation, reason = %reason, "Fix failed");
                Err(reason)
            }
        };
        fixes.steps.push(FixStep {
            action,
            name: item.name.clone(),
            path: item.path.clone(),
            outcome: result,
        });
        true
    }

    /// Pull every repository in the workspace.
    pub fn sync(&self) -> SyncReport {
        let mut report = SyncReport::default();
        for repo in self.find_repos() {
            if self.runner.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let outcome = self
                .runner
                .run(&Invocation::new("git", &repo, PULL_TIMEOUT).args(["pull"]));
            if outcome == CommandOutcome::Cancelled {
                report.cancelled = true;
                break;
            }
            let result = match (&outcome, outcome.failure()) {
                (_, Some(reason)) => PullResult::Failed(reason),
                (CommandOutcome::Exited { stdout, .. }, None)
                    if stdout.contains("Already up to date")
                        || stdout.contains("Already up-to-date") =>
                {
                    PullResult::UpToDate
                }
                _ => PullResult::Updated,
            };
            report.repos.push((self.name_of(&repo), result));
        }
        report
    }
}
