//! Repository status from `git status -sb`
//!
//! Only the header line (`## branch...upstream [ahead N, behind M]`) and the
//! presence of further lines are inspected.

use crate::process::{CommandRunner, Invocation, STATUS_TIMEOUT};
use serde::Serialize;
use std::path::Path;

/// Parsed status of one working tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoStatus {
    pub branch: String,
    pub ahead: bool,
    pub behind: bool,
    /// Tracks an upstream and is neither ahead nor behind it
    pub synced: bool,
    /// No status lines beyond the header
    pub clean: bool,
}

impl RepoStatus {
    /// Parse `git status -sb` output.
    pub fn parse(output: &str) -> Self {
        let mut lines = output.lines();
        let header = lines.next().unwrap_or_default();
        let clean = !lines.any(|l| !l.trim().is_empty());
        let divergence = divergence(header);
        let ahead = divergence.contains("ahead");
        let behind = divergence.contains("behind");
        let tracking = header.contains("...") && divergence != "gone";

        Self {
            branch: branch_name(header),
            ahead,
            behind,
            synced: tracking && !ahead && !behind,
            clean,
        }
    }
}

/// Contents of the trailing `[...]` of the header, lowercased. Ref names
/// cannot contain `[`, so branch names never leak in.
fn divergence(header: &str) -> String {
    let header = header.trim_end();
    match (header.rfind(" ["), header.strip_suffix(']')) {
        (Some(start), Some(body)) if start + 2 <= body.len() => {
            body[start + 2..].to_ascii_lowercase()
        }
        _ => String::new(),
    }
}

fn branch_name(header: &str) -> String {
    let name = header.trim_start_matches('#').trim();
    let name = name.split("...").next().unwrap_or(name);
    // "## main [gone]" or "## HEAD (no branch)"
    let name = name.split(" [").next().unwrap_or(name).trim();
    if name.is_empty() {
        "unknown".to_string()
    } else {
        name.to_string()
    }
}

/// Build the status invocation for `dir`.
pub fn status_invocation(dir: &Path) -> Invocation {
    Invocation::new("git", dir, STATUS_TIMEOUT).args(["status", "-sb"])
}

/// Query the status of `dir`.
///
/// `None` means unavailable: not a repository, git missing, or timed out.
/// Callers treat that as "unknown", never as a warning.
pub fn query_status(runner: &dyn CommandRunner, dir: &Path) -> Option<RepoStatus> {
    let outcome = runner.run(&status_invocation(dir));
    match outcome.stdout() {
        Some(stdout) => Some(RepoStatus::parse(stdout)),
        None => {
            tracing::debug!(
                dir = %dir.display(),
                reason = ?outcome.failure(),
                "Repository status unavailable"
            );
            None
        }
    }
}
