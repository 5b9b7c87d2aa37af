//! Fuzzy project lookup and category listings
//!
//! Candidates are the directories one level under each category root, in
//! [`CATEGORIES`] order and then filesystem order within a category.
//! Ranking sorts by score only and is stable, so equal scores keep that
//! enumeration order; it is not a strict total order over names.

use crate::classify::classify;
use crate::error::{Error, Result};
use crate::project::{self, ProjectType, QuickAction};
use crate::workspace::{find_categories, Category, ProjectRef, Workspace, CATEGORIES};
use std::fs;
use std::path::{Path, PathBuf};

/// Score given to any name containing the search term.
pub const SUBSTRING_SCORE: f64 = 0.8;

/// How many ambiguous matches are offered for selection.
pub const SELECTION_LIMIT: usize = 10;

/// A scored search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub project: ProjectRef,
    pub path: PathBuf,
    pub score: f64,
}

/// Result of [`Navigator::goto`].
#[derive(Debug, Clone, PartialEq)]
pub enum Goto {
    NotFound,
    Found(Match),
    /// Ranked candidates, at most [`SELECTION_LIMIT`], for the caller to choose from
    Ambiguous(Vec<Match>),
}

/// One project in a category listing.
#[derive(Debug, Clone)]
pub struct ListedProject {
    pub project: ProjectRef,
    pub project_type: ProjectType,
    pub favorite: bool,
}

/// Projects of one category, sorted by name.
#[derive(Debug, Clone)]
pub struct CategoryListing {
    pub category: &'static Category,
    pub projects: Vec<ListedProject>,
}

/// Type and actions of a directory, without building a full context.
pub fn preview(path: &Path) -> (ProjectType, &'static [QuickAction]) {
    let project_type = classify(path);
    (project_type, project::quick_actions_for(project_type))
}

/// Normalized Levenshtein similarity in `[0, 1]`; identical strings score 1.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let max_len = a.len().max(b.len());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein(&a, &b) as f64 / max_len as f64
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Score `name` against an already-lowercased `term`.
pub fn score(term: &str, name: &str) -> f64 {
    let name = name.to_lowercase();
    let base = similarity(term, &name);
    if name.contains(term) {
        base.max(SUBSTRING_SCORE)
    } else {
        base
    }
}

pub struct Navigator<'a> {
    workspace: &'a Workspace,
    threshold: f64,
}

impl<'a> Navigator<'a> {
    pub fn new(workspace: &'a Workspace, threshold: f64) -> Self {
        Self {
            workspace,
            threshold,
        }
    }

    /// Every project directory under every existing category root.
    pub fn candidates(&self) -> Vec<(ProjectRef, PathBuf)> {
        CATEGORIES
            .iter()
            .flat_map(|category| self.children(category))
            .collect()
    }

    fn children(&self, category: &Category) -> Vec<(ProjectRef, PathBuf)> {
        let dir = self.workspace.category_path(category);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };
        entries
            .flatten()
            .filter(|e| e.path().is_dir())
            .map(|e| {
                let name = e.file_name().to_string_lossy().into_owned();
                (ProjectRef::new(category.path, name), e.path())
            })
            .collect()
    }

    /// Rank projects against `term`, best first, dropping those below the
    /// threshold.
    pub fn search(&self, term: &str) -> Vec<Match> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return Vec::new();
        }

        let mut matches: Vec<Match> = self
            .candidates()
            .into_iter()
            .filter_map(|(project, path)| {
                let score = score(&term, project.name());
                (score >= self.threshold).then_some(Match {
                    project,
                    path,
                    score,
                })
            })
            .collect();

        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        tracing::debug!(term = %term, hits = matches.len(), "Fuzzy search");
        matches
    }

    pub fn goto(&self, term: &str) -> Goto {
        let mut matches = self.search(term);
        match matches.len() {
            0 => Goto::NotFound,
            1 => Goto::Found(matches.remove(0)),
            _ => {
                matches.truncate(SELECTION_LIMIT);
                Goto::Ambiguous(matches)
            }
        }
    }

    /// Best match for `term`, for commands that act on a single project.
    pub fn resolve(&self, term: &str) -> Result<Match> {
        self.search(term)
            .into_iter()
            .next()
            .ok_or_else(|| Error::ProjectNotFound(term.to_string()))
    }

    /// List projects by category, or only those matching `category`.
    pub fn list(
        &self,
        category: Option<&str>,
        is_favorite: impl Fn(&str) -> bool,
    ) -> Result<Vec<CategoryListing>> {
        let categories: Vec<&'static Category> = match category {
            Some(name) => find_categories(name)?,
            None => CATEGORIES.iter().collect(),
        };

        let mut listings = Vec::new();
        for category in categories {
            let mut projects: Vec<ListedProject> = self
                .children(category)
                .into_iter()
                .map(|(project, path)| {
                    let favorite = is_favorite(&project.to_string());
                    ListedProject {
                        project_type: classify(&path),
                        project,
                        favorite,
                    }
                })
                .collect();
            if projects.is_empty() {
                continue;
            }
            projects.sort_by(|a, b| a.project.name().cmp(b.project.name()));
            listings.push(CategoryListing { category, projects });
        }
        Ok(listings)
    }
}

/// Pick a 1-based entry from the selection list.
pub fn select(matches: &[Match], input: &str) -> Result<Match> {
    let offered = matches.len().min(SELECTION_LIMIT);
    let choice: usize = input
        .trim()
        .parse()
        .map_err(|_| Error::InvalidSelection(format!("'{}' is not a number", input.trim())))?;
    if choice == 0 || choice > offered {
        return Err(Error::InvalidSelection(format!(
            "{} is not between 1 and {}",
            choice, offered
        )));
    }
    Ok(matches[choice - 1].clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn workspace(dirs: &[&str]) -> (TempDir, Workspace) {
        let temp = TempDir::new().unwrap();
        for dir in dirs {
            fs::create_dir_all(temp.path().join(dir)).unwrap();
        }
        let ws = Workspace::new(temp.path());
        (temp, ws)
    }

    #[test]
    fn test_similarity_bounds() {
        assert_eq!(similarity("demo", "demo"), 1.0);
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("abc", "xyz"), 0.0);
        assert!((similarity("kitten", "sitting") - (1.0 - 3.0 / 7.0)).abs() < 1e-9);
    }

    #[test]
    fn test_substring_boost() {
        // "bot" vs "tradingbot": edit distance ratio is 0.3
        assert!(similarity("bot", "tradingbot") < 0.8);
        assert_eq!(score("bot", "TradingBot"), SUBSTRING_SCORE);
        assert_eq!(score("demo", "demo"), 1.0);
    }

    #[test]
    fn test_exact_name_ranks_first() {
        let (_t, ws) = workspace(&["apps/demo-old", "work/apps/demo", "lab/demos"]);
        let nav = Navigator::new(&ws, 0.6);
        let hits = nav.search("Demo");

        assert_eq!(hits[0].project.to_string(), "work/apps/demo");
        assert_eq!(hits[0].score, 1.0);
        assert!(hits.iter().all(|m| m.score >= 0.8));
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn test_threshold_drops_weak_matches() {
        let (_t, ws) = workspace(&["apps/alpha", "apps/omega"]);
        let nav = Navigator::new(&ws, 0.6);
        let hits = nav.search("alpha");
        assert_eq!(hits.len(), 1);
        assert_eq!(nav.goto("zzzz"), Goto::NotFound);
    }

    #[test]
    fn test_ties_keep_category_order() {
        let (_t, ws) = workspace(&["lab/widget", "apps/widget"]);
        let nav = Navigator::new(&ws, 0.6);
        let hits = nav.search("widget");
        let names: Vec<_> = hits.iter().map(|m| m.project.to_string()).collect();
        assert_eq!(names, vec!["apps/widget", "lab/widget"]);
    }

    #[test]
    fn test_files_are_not_candidates() {
        let (temp, ws) = workspace(&["apps"]);
        fs::write(temp.path().join("apps/notes"), "").unwrap();
        let nav = Navigator::new(&ws, 0.0);
        assert!(nav.candidates().is_empty());
    }

    #[test]
    fn test_goto_outcomes() {
        let (_t, ws) = workspace(&["apps/solo", "bots/arb-one", "bots/arb-two"]);
        let nav = Navigator::new(&ws, 0.6);

        match nav.goto("solo") {
            Goto::Found(m) => assert_eq!(m.project.to_string(), "apps/solo"),
            other => panic!("expected single match, got {:?}", other),
        }
        match nav.goto("arb") {
            Goto::Ambiguous(list) => assert_eq!(list.len(), 2),
            other => panic!("expected ambiguous, got {:?}", other),
        }
    }

    #[test]
    fn test_select_is_strict() {
        let (_t, ws) = workspace(&["bots/arb-one", "bots/arb-two"]);
        let nav = Navigator::new(&ws, 0.6);
        let hits = nav.search("arb");

        assert_eq!(select(&hits, " 2 ").unwrap(), hits[1]);
        assert!(matches!(select(&hits, "0"), Err(Error::InvalidSelection(_))));
        assert!(matches!(select(&hits, "3"), Err(Error::InvalidSelection(_))));
        assert!(matches!(select(&hits, "two"), Err(Error::InvalidSelection(_))));
    }

    #[test]
    fn test_list_by_category() {
        let (temp, ws) = workspace(&["apps/zeta", "apps/alpha", "work/apps/beta", "lab"]);
        fs::write(temp.path().join("apps/alpha/Cargo.toml"), "").unwrap();
        let nav = Navigator::new(&ws, 0.6);

        let all = nav.list(None, |name| name == "apps/zeta").unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].category.path, "apps");
        assert_eq!(all[0].projects[0].project.name(), "alpha");
        assert_eq!(all[0].projects[0].project_type, ProjectType::Rust);
        assert!(all[0].projects[1].favorite);

        let apps = nav.list(Some("apps"), |_| false).unwrap();
        assert_eq!(apps.len(), 2);
        assert_eq!(apps[1].category.path, "work/apps");

        assert!(matches!(
            nav.list(Some("garage"), |_| false),
            Err(Error::UnknownCategory(_))
        ));
    }

    #[test]
    fn test_list_after_migration() {
        let (_t, ws) = workspace(&["work/apps/site", "work/bots/arb", "lab/notes"]);
        let nav = Navigator::new(&ws, 0.6);

        let apps = nav.list(Some("apps"), |_| false).unwrap();
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].category.path, "work/apps");
        assert_eq!(apps[0].projects[0].project.to_string(), "work/apps/site");

        let work: Vec<_> = nav
            .list(Some("work"), |_| false)
            .unwrap()
            .iter()
            .map(|l| l.category.path)
            .collect();
        assert_eq!(work, vec!["work/apps", "work/bots"]);

        assert!(nav.list(Some("research"), |_| false).unwrap().is_empty());
    }

    #[test]
    fn test_preview_is_side_effect_free() {
        let (temp, _ws) = workspace(&["apps/api"]);
        fs::write(
            temp.path().join("apps/api/package.json"),
            r#"{"dependencies": {"express": "4"}}"#,
        )
        .unwrap();
        let (project_type, actions) = preview(&temp.path().join("apps/api"));
        assert_eq!(project_type, ProjectType::Express);
        assert_eq!(actions[0].id, "dev");
    }
}
