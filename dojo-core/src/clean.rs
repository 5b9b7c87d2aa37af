//! Build-artifact cleanup

use crate::workspace::Workspace;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Artifact directories removed by a normal clean.
pub const CACHE_DIRS: &[&str] = &["__pycache__", ".pytest_cache"];

/// Additional directories removed by a deep clean.
pub const DEEP_DIRS: &[&str] = &["node_modules", ".next", "dist", "build", "out"];

/// An artifact directory found by [`scan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub name: String,
    pub path: PathBuf,
    /// Total size of the files inside, in bytes
    pub size: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanOutcome {
    pub removed: Vec<Artifact>,
    pub failures: Vec<(Artifact, String)>,
}

impl CleanOutcome {
    pub fn freed(&self) -> u64 {
        self.removed.iter().map(|a| a.size).sum()
    }
}

pub fn patterns(deep: bool) -> Vec<&'static str> {
    let mut patterns = CACHE_DIRS.to_vec();
    if deep {
        patterns.extend_from_slice(DEEP_DIRS);
    }
    patterns
}

/// Find artifact directories under the workspace, largest first.
///
/// A matched directory is not searched further, so nested matches
/// (`node_modules/x/dist`) are covered by their outermost ancestor.
pub fn scan(workspace: &Workspace, deep: bool) -> Vec<Artifact> {
    let patterns = patterns(deep);
    let mut found = Vec::new();

    let mut walker = WalkDir::new(workspace.root()).min_depth(1).into_iter();
    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if entry.file_name() == ".git" {
            walker.skip_current_dir();
            continue;
        }
        if patterns.iter().any(|p| *p == name) {
            let path = entry.path().to_path_buf();
            found.push(Artifact {
                name: workspace
                    .relative(&path)
                    .map(|r| r.display().to_string())
                    .unwrap_or_else(|| path.display().to_string()),
                size: dir_size(&path),
                path,
            });
            walker.skip_current_dir();
        }
    }

    found.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.path.cmp(&b.path)));
    tracing::info!(count = found.len(), deep, "Artifact scan");
    found
}

fn dir_size(dir: &Path) -> u64 {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

/// Delete the given artifacts. Failures are collected, not raised.
pub fn remove(artifacts: Vec<Artifact>) -> CleanOutcome {
    let mut outcome = CleanOutcome::default();
    for artifact in artifacts {
        match fs::remove_dir_all(&artifact.path) {
            Ok(()) => outcome.removed.push(artifact),
            Err(e) => {
                tracing::warn!(path = %artifact.path.display(), error = %e, "Failed to remove artifact");
                outcome.failures.push((artifact, e.to_string()));
            }
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, bytes: usize) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, vec![b'x'; bytes]).unwrap();
    }

    #[test]
    fn test_scan_respects_depth_flag() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "bots/a/__pycache__/m.pyc", 10);
        write(root, "bots/a/src/.pytest_cache/v", 5);
        write(root, "apps/web/node_modules/react/index.js", 100);
        write(root, "apps/web/node_modules/react/dist/react.js", 50);
        write(root, "apps/web/src/build.rs", 1);
        let ws = Workspace::new(root);

        let shallow = scan(&ws, false);
        let names: Vec<_> = shallow.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["bots/a/__pycache__", "bots/a/src/.pytest_cache"]);
        assert_eq!(shallow[0].size, 10);

        let deep = scan(&ws, true);
        assert_eq!(deep.len(), 3);
        assert_eq!(deep[0].name, "apps/web/node_modules");
        assert_eq!(deep[0].size, 150);
    }

    #[test]
    fn test_remove_deletes_directories() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "lab/x/__pycache__/a.pyc", 3);
        let ws = Workspace::new(temp.path());

        let outcome = remove(scan(&ws, false));
        assert_eq!(outcome.removed.len(), 1);
        assert_eq!(outcome.freed(), 3);
        assert!(!temp.path().join("lab/x/__pycache__").exists());
        assert!(temp.path().join("lab/x").exists());
    }

    #[test]
    fn test_remove_reports_missing_directory() {
        let temp = TempDir::new().unwrap();
        let gone = Artifact {
            name: "gone".to_string(),
            path: temp.path().join("gone"),
            size: 0,
        };
        let outcome = remove(vec![gone]);
        assert!(outcome.removed.is_empty());
        assert_eq!(outcome.failures.len(), 1);
    }
}
