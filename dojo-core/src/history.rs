//! Visit history, command log, and favorites
//!
//! [`History`] is the in-memory form of `history.json`. All mutations here
//! are pure; persisting is the store's job.

use crate::project::ProjectType;
use chrono::{DateTime, Duration, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Maximum entries kept in [`History::recent`].
pub const RECENT_LIMIT: usize = 20;

/// Maximum entries kept in [`History::command_history`].
pub const COMMAND_HISTORY_LIMIT: usize = 100;

/// One visit to a project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VisitEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub project_type: ProjectType,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub path: PathBuf,
}

/// One logged command invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandEntry {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub project: Option<String>,
}

/// Persisted usage history.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct History {
    /// Most recent first, one entry per name
    #[serde(default)]
    pub recent: Vec<VisitEntry>,
    /// Visit counts by name, never reset
    #[serde(default)]
    pub visits: BTreeMap<String, u64>,
    /// Oldest first
    #[serde(default)]
    pub command_history: Vec<CommandEntry>,
    /// Insertion order, no duplicates
    #[serde(default)]
    pub favorites: Vec<String>,
}

/// Result of [`History::toggle_favorite`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteToggle {
    Added,
    Removed,
}

impl History {
    /// Count a visit and move the entry to the front of `recent`.
    pub fn record_visit(&mut self, entry: VisitEntry) {
        *self.visits.entry(entry.name.clone()).or_insert(0) += 1;
        self.recent.retain(|r| r.name != entry.name);
        self.recent.insert(0, entry);
        self.recent.truncate(RECENT_LIMIT);
    }

    /// Append a command, dropping the oldest beyond the cap.
    pub fn record_command(&mut self, entry: CommandEntry) {
        self.command_history.push(entry);
        if self.command_history.len() > COMMAND_HISTORY_LIMIT {
            let excess = self.command_history.len() - COMMAND_HISTORY_LIMIT;
            self.command_history.drain(..excess);
        }
    }

    pub fn visit_count(&self, name: &str) -> u64 {
        self.visits.get(name).copied().unwrap_or(0)
    }

    pub fn is_favorite(&self, name: &str) -> bool {
        self.favorites.iter().any(|f| f == name)
    }

    /// Returns `false` when `name` was already a favorite.
    pub fn add_favorite(&mut self, name: &str) -> bool {
        if self.is_favorite(name) {
            return false;
        }
        self.favorites.push(name.to_string());
        true
    }

    /// Returns `false` when `name` was not a favorite.
    pub fn remove_favorite(&mut self, name: &str) -> bool {
        let before = self.favorites.len();
        self.favorites.retain(|f| f != name);
        self.favorites.len() != before
    }

    pub fn toggle_favorite(&mut self, name: &str) -> FavoriteToggle {
        if self.remove_favorite(name) {
            FavoriteToggle::Removed
        } else {
            self.add_favorite(name);
            FavoriteToggle::Added
        }
    }

    /// Leading entries of `recent`, optionally limited to the last
    /// `max_age_days`, at most `limit` of them.
    pub fn recent_projects(
        &self,
        limit: usize,
        max_age_days: Option<u32>,
        now: DateTime<Utc>,
    ) -> Vec<VisitEntry> {
        let cutoff = max_age_days.map(|days| now - Duration::days(i64::from(days)));
        self.recent
            .iter()
            .filter(|e| cutoff.map_or(true, |c| e.timestamp >= c))
            .take(limit)
            .cloned()
            .collect()
    }
}

/// Accept RFC 3339 timestamps and the zone-less local form older history
/// files were written with.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(serde::de::Error::custom)?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|ts| ts.with_timezone(&Utc))
        .ok_or_else(|| serde::de::Error::custom(format!("nonexistent local time: {}", raw)))
}
