//! Workspace root, category sets, and path-derived project references
//!
//! Two category sets are recognized side by side:
//!
//! | Layout | Categories |
//! |--------|------------|
//! | Legacy | `apps`, `bots`, `tools`, `contracts`, `experiments`, `protocols`, `ideas` |
//! | Nested | `work/apps`, `work/bots`, `work/tools`, `work/contracts`, `lab`, `research/defi`, `research/strategies` |
//!
//! A [`ProjectRef`] is never stored as an id. It is recomputed from a path
//! every time, so the same directory always yields the same string.

use crate::error::{Error, Result};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Which folder layout a category belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Legacy,
    Nested,
}

/// A directory whose children are projects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Category {
    /// Path relative to the workspace root (one or two segments)
    pub path: &'static str,
    /// Display label
    pub label: &'static str,
    pub layout: Layout,
}

const fn category(path: &'static str, label: &'static str, layout: Layout) -> Category {
    Category {
        path,
        label,
        layout,
    }
}

/// Every category, legacy first. Fuzzy search enumerates in this order.
pub const CATEGORIES: &[Category] = &[
    category("apps", "Apps", Layout::Legacy),
    category("bots", "Bots", Layout::Legacy),
    category("tools", "Tools", Layout::Legacy),
    category("contracts", "Contracts", Layout::Legacy),
    category("experiments", "Experiments", Layout::Legacy),
    category("protocols", "Protocols", Layout::Legacy),
    category("ideas", "Ideas", Layout::Legacy),
    category("work/apps", "Work / Apps", Layout::Nested),
    category("work/bots", "Work / Bots", Layout::Nested),
    category("work/tools", "Work / Tools", Layout::Nested),
    category("work/contracts", "Work / Contracts", Layout::Nested),
    category("lab", "Lab", Layout::Nested),
    category("research/defi", "Research / DeFi", Layout::Nested),
    category("research/strategies", "Research / Strategies", Layout::Nested),
];

/// Top-level folders of the nested layout.
///
/// A child of one of these that is not itself a category (e.g.
/// `work/misc`) is still a project, filed under the top-level folder.
pub const NESTED_ROOTS: &[&str] = &["work", "lab", "research", "resources"];

/// Look up categories by name, in [`CATEGORIES`] order.
///
/// A name matches a category's full path or its last segment (`apps`
/// matches both `apps` and `work/apps`). A nested top-level folder name
/// (`work`, `research`) selects every category beneath it.
pub fn find_categories(name: &str) -> Result<Vec<&'static Category>> {
    let name = name.trim_matches('/');
    let matched: Vec<_> = CATEGORIES
        .iter()
        .filter(|c| {
            c.path == name
                || c.path.rsplit('/').next() == Some(name)
                || (NESTED_ROOTS.contains(&name)
                    && c.path.split('/').next() == Some(name))
        })
        .collect();
    if matched.is_empty() {
        return Err(Error::UnknownCategory(name.to_string()));
    }
    Ok(matched)
}

/// Path-derived identifier for a project: `<category>/<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectRef {
    category: String,
    name: String,
}

impl ProjectRef {
    pub fn new(category: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            name: name.into(),
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path relative to the workspace root.
    pub fn relative_path(&self) -> PathBuf {
        Path::new(&self.category).join(&self.name)
    }
}

impl fmt::Display for ProjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category, self.name)
    }
}

/// The managed directory tree.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a project.
    pub fn project_path(&self, project: &ProjectRef) -> PathBuf {
        self.root.join(project.relative_path())
    }

    /// Absolute path of a category directory.
    pub fn category_path(&self, category: &Category) -> PathBuf {
        self.root.join(category.path)
    }

    /// `path` relative to the root, or `None` when outside the workspace.
    pub fn relative(&self, path: &Path) -> Option<PathBuf> {
        if let Ok(rel) = path.strip_prefix(&self.root) {
            return Some(rel.to_path_buf());
        }
        // Symlinked roots (e.g. /home -> /var/home) only match once resolved.
        let root = self.root.canonicalize().ok()?;
        let path = path.canonicalize().ok()?;
        path.strip_prefix(root).ok().map(Path::to_path_buf)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.relative(path).is_some()
    }

    /// Derive the project a path belongs to.
    ///
    /// The longest category prefix wins. Paths at the root, or under a
    /// top-level folder that is not a category, yield `None`.
    pub fn project_ref(&self, path: &Path) -> Option<ProjectRef> {
        let rel = self.relative(path)?;
        let parts: Vec<String> = rel
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();

        let matched = CATEGORIES
            .iter()
            .filter(|c| {
                let segments: Vec<&str> = c.path.split('/').collect();
                parts.len() > segments.len()
                    && segments.iter().zip(&parts).all(|(a, b)| *a == b.as_str())
            })
            .max_by_key(|c| c.path.split('/').count());

        if let Some(category) = matched {
            let depth = category.path.split('/').count();
            return Some(ProjectRef::new(category.path, parts[depth].clone()));
        }

        if parts.len() >= 2 && NESTED_ROOTS.contains(&parts[0].as_str()) {
            return Some(ProjectRef::new(parts[0].clone(), parts[1].clone()));
        }

        None
    }
}
