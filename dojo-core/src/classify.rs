//! Marker-file project classification
//!
//! [`classify`] walks [`DETECTION_RULES`] in priority order and returns the
//! result of the first rule whose marker file exists. Ambiguous markers
//! delegate to a resolver that inspects the directory further.
//!
//! Nothing is cached: every call reads the filesystem as it is now.

use crate::project::ProjectType;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;

/// What a matched marker resolves to.
#[derive(Clone, Copy)]
pub enum Resolver {
    /// Marker maps straight to one type
    Tag(ProjectType),
    /// Marker is shared by several types; inspect the directory
    Delegate(fn(&Path) -> ProjectType),
}

/// One `(marker file, resolver)` pair.
#[derive(Clone, Copy)]
pub struct DetectionRule {
    pub marker: &'static str,
    pub resolver: Resolver,
}

/// Detection rules, first match wins.
pub const DETECTION_RULES: &[DetectionRule] = &[
    DetectionRule {
        marker: "package.json",
        resolver: Resolver::Delegate(detect_node),
    },
    DetectionRule {
        marker: "app.py",
        resolver: Resolver::Tag(ProjectType::Streamlit),
    },
    DetectionRule {
        marker: "requirements.txt",
        resolver: Resolver::Tag(ProjectType::Python),
    },
    DetectionRule {
        marker: "foundry.toml",
        resolver: Resolver::Tag(ProjectType::Foundry),
    },
    DetectionRule {
        marker: "hardhat.config.js",
        resolver: Resolver::Tag(ProjectType::Hardhat),
    },
    DetectionRule {
        marker: "hardhat.config.ts",
        resolver: Resolver::Tag(ProjectType::Hardhat),
    },
    DetectionRule {
        marker: "Cargo.toml",
        resolver: Resolver::Tag(ProjectType::Rust),
    },
    DetectionRule {
        marker: "go.mod",
        resolver: Resolver::Tag(ProjectType::Go),
    },
];

const NEXT_CONFIG_FILES: &[&str] = &["next.config.js", "next.config.mjs", "next.config.ts"];

/// Dependency name → type, checked in this order.
const NODE_FRAMEWORKS: &[(&str, ProjectType)] = &[
    ("next", ProjectType::NextJs),
    ("react", ProjectType::React),
    ("express", ProjectType::Express),
    ("vite", ProjectType::Vite),
];

/// Classify `dir` by its marker files.
pub fn classify(dir: &Path) -> ProjectType {
    for rule in DETECTION_RULES {
        if dir.join(rule.marker).exists() {
            let project_type = match rule.resolver {
                Resolver::Tag(tag) => tag,
                Resolver::Delegate(resolve) => resolve(dir),
            };
            tracing::debug!(
                dir = %dir.display(),
                marker = rule.marker,
                project_type = %project_type,
                "Classified directory"
            );
            return project_type;
        }
    }
    ProjectType::Folder
}

#[derive(Deserialize)]
struct PackageManifest {
    #[serde(default)]
    dependencies: Map<String, Value>,
    #[serde(default, rename = "devDependencies")]
    dev_dependencies: Map<String, Value>,
}

/// Resolve a `package.json` directory to a Node framework.
///
/// Falls back to [`ProjectType::Node`] when the manifest is unreadable or
/// names no known framework.
pub fn detect_node(dir: &Path) -> ProjectType {
    if NEXT_CONFIG_FILES.iter().any(|f| dir.join(f).is_file()) {
        return ProjectType::NextJs;
    }

    let manifest = match std::fs::read_to_string(dir.join("package.json"))
        .map_err(|e| e.to_string())
        .and_then(|text| {
            serde_json::from_str::<PackageManifest>(&text).map_err(|e| e.to_string())
        }) {
        Ok(manifest) => manifest,
        Err(e) => {
            tracing::debug!(dir = %dir.display(), error = %e, "Unreadable package.json");
            return ProjectType::Node;
        }
    };

    NODE_FRAMEWORKS
        .iter()
        .find(|(dep, _)| {
            manifest.dependencies.contains_key(*dep) || manifest.dev_dependencies.contains_key(*dep)
        })
        .map(|(_, project_type)| *project_type)
        .unwrap_or(ProjectType::Node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn dir_with(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        dir
    }

    #[test]
    fn test_single_markers_map_to_their_type() {
        let cases = [
            ("app.py", ProjectType::Streamlit),
            ("requirements.txt", ProjectType::Python),
            ("foundry.toml", ProjectType::Foundry),
            ("hardhat.config.js", ProjectType::Hardhat),
            ("hardhat.config.ts", ProjectType::Hardhat),
            ("Cargo.toml", ProjectType::Rust),
            ("go.mod", ProjectType::Go),
            ("package.json", ProjectType::Node),
        ];
        for (marker, expected) in cases {
            let dir = dir_with(&[(marker, "{}")]);
            assert_eq!(classify(dir.path()), expected, "marker {}", marker);
        }
    }

    #[test]
    fn test_no_markers_is_folder() {
        let dir = dir_with(&[("README.md", "# hi")]);
        assert_eq!(classify(dir.path()), ProjectType::Folder);
    }

    #[test]
    fn test_priority_order_first_match_wins() {
        let dir = dir_with(&[("app.py", ""), ("requirements.txt", "flask")]);
        assert_eq!(classify(dir.path()), ProjectType::Streamlit);

        let dir = dir_with(&[("package.json", "{}"), ("Cargo.toml", "")]);
        assert_eq!(classify(dir.path()), ProjectType::Node);
    }

    #[test]
    fn test_manifest_framework_priority() {
        let next = dir_with(&[(
            "package.json",
            r#"{"dependencies": {"react": "18", "next": "14"}}"#,
        )]);
        assert_eq!(classify(next.path()), ProjectType::NextJs);

        let react = dir_with(&[("package.json", r#"{"dependencies": {"react": "18"}}"#)]);
        assert_eq!(classify(react.path()), ProjectType::React);

        let plain = dir_with(&[("package.json", r#"{"dependencies": {"lodash": "4"}}"#)]);
        assert_eq!(classify(plain.path()), ProjectType::Node);
    }

    #[test]
    fn test_dev_dependencies_count() {
        let dir = dir_with(&[(
            "package.json",
            r#"{"dependencies": {"express": "4"}, "devDependencies": {"vite": "5", "react": "18"}}"#,
        )]);
        assert_eq!(classify(dir.path()), ProjectType::React);
    }

    #[test]
    fn test_next_config_file_wins_without_manifest_dep() {
        let dir = dir_with(&[("package.json", "{}"), ("next.config.mjs", "")]);
        assert_eq!(classify(dir.path()), ProjectType::NextJs);
    }

    #[test]
    fn test_malformed_manifest_falls_back_to_node() {
        let dir = dir_with(&[("package.json", "{ not json")]);
        assert_eq!(classify(dir.path()), ProjectType::Node);

        let dir = dir_with(&[("package.json", r#"{"dependencies": ["next"]}"#)]);
        assert_eq!(classify(dir.path()), ProjectType::Node);
    }

    #[test]
    fn test_reflects_current_filesystem_state() {
        let dir = dir_with(&[]);
        assert_eq!(classify(dir.path()), ProjectType::Folder);
        fs::write(dir.path().join("go.mod"), "module x").unwrap();
        assert_eq!(classify(dir.path()), ProjectType::Go);
    }
}
