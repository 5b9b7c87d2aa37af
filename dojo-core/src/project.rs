//! Project types and the quick actions bound to them
//!
//! A [`ProjectType`] is a closed tag. Each tag maps to an ordered list of
//! [`QuickAction`]s; the folder fallback has none.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification tag for a project directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProjectType {
    NextJs,
    React,
    Express,
    Vite,
    Node,
    Streamlit,
    Python,
    Foundry,
    Hardhat,
    Rust,
    Go,
    /// No marker file matched
    Folder,
}

impl ProjectType {
    pub const ALL: [ProjectType; 12] = [
        ProjectType::NextJs,
        ProjectType::React,
        ProjectType::Express,
        ProjectType::Vite,
        ProjectType::Node,
        ProjectType::Streamlit,
        ProjectType::Python,
        ProjectType::Foundry,
        ProjectType::Hardhat,
        ProjectType::Rust,
        ProjectType::Go,
        ProjectType::Folder,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectType::NextJs => "nextjs",
            ProjectType::React => "react",
            ProjectType::Express => "express",
            ProjectType::Vite => "vite",
            ProjectType::Node => "node",
            ProjectType::Streamlit => "streamlit",
            ProjectType::Python => "python",
            ProjectType::Foundry => "foundry",
            ProjectType::Hardhat => "hardhat",
            ProjectType::Rust => "rust",
            ProjectType::Go => "go",
            ProjectType::Folder => "folder",
        }
    }

    /// Quick actions offered for this type, in display order.
    pub fn quick_actions(&self) -> &'static [QuickAction] {
        quick_actions_for(*self)
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized tags (e.g. from an older history file) read as [`ProjectType::Folder`].
impl From<String> for ProjectType {
    fn from(tag: String) -> Self {
        ProjectType::ALL
            .into_iter()
            .find(|t| t.as_str() == tag)
            .unwrap_or(ProjectType::Folder)
    }
}

impl From<ProjectType> for String {
    fn from(t: ProjectType) -> Self {
        t.as_str().to_string()
    }
}

/// A named external command bound to a project type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuickAction {
    /// Short command id (`dev`, `build`, ...)
    pub id: &'static str,
    /// One-line description
    pub description: &'static str,
    /// Shell command line run in the project directory
    pub command: &'static str,
    /// Longer explanation shown in learning mode
    pub explanation: Option<&'static str>,
}

const fn action(
    id: &'static str,
    description: &'static str,
    command: &'static str,
    explanation: &'static str,
) -> QuickAction {
    QuickAction {
        id,
        description,
        command,
        explanation: Some(explanation),
    }
}

const NEXTJS_ACTIONS: &[QuickAction] = &[
    action("dev", "Start dev server", "npm run dev", "Runs the Next.js development server on http://localhost:3000"),
    action("build", "Build for production", "npm run build", "Creates an optimized production build in .next/"),
    action("test", "Run tests", "npm test", "Executes the project's test suite"),
];

const REACT_ACTIONS: &[QuickAction] = &[
    action("dev", "Start dev server", "npm start", "Launches the React dev server with hot reload"),
    action("build", "Build", "npm run build", "Creates a production build in build/"),
    action("test", "Test", "npm test", "Runs the test suite in watch mode"),
];

const NODE_ACTIONS: &[QuickAction] = &[
    action("dev", "Start dev", "npm run dev", "Starts the development server (usually with nodemon)"),
    action("start", "Start", "npm start", "Runs the production server"),
    action("install", "Install deps", "npm install", "Installs all dependencies from package.json"),
];

const EXPRESS_ACTIONS: &[QuickAction] = &[
    action("dev", "Start dev", "npm run dev", "Starts the Express server in development mode"),
    action("start", "Start", "npm start", "Runs the Express server"),
    action("install", "Install deps", "npm install", "Installs all dependencies from package.json"),
];

const VITE_ACTIONS: &[QuickAction] = &[
    action("dev", "Start dev server", "npm run dev", "Starts the Vite dev server with hot module replacement"),
    action("build", "Build", "npm run build", "Bundles the app into dist/"),
    action("preview", "Preview build", "npm run preview", "Serves the production build locally"),
];

const STREAMLIT_ACTIONS: &[QuickAction] = &[
    action("dev", "Run streamlit", "streamlit run app.py", "Launches the Streamlit app in the browser"),
    action("install", "Install deps", "pip install -r requirements.txt", "Installs Python dependencies"),
];

const PYTHON_ACTIONS: &[QuickAction] = &[
    action("dev", "Run main.py", "python main.py", "Executes the main Python script"),
    action("install", "Install deps", "pip install -r requirements.txt", "Installs required packages"),
    action("venv", "Create venv", "python -m venv venv", "Creates a virtual environment in venv/"),
];

const FOUNDRY_ACTIONS: &[QuickAction] = &[
    action("build", "Build contracts", "forge build", "Compiles the Solidity contracts"),
    action("test", "Run tests", "forge test", "Runs the Foundry test suite"),
    action("deploy", "Deploy", "forge script", "Deploys contracts using scripts"),
];

const HARDHAT_ACTIONS: &[QuickAction] = &[
    action("build", "Compile contracts", "npx hardhat compile", "Compiles the Solidity contracts"),
    action("test", "Run tests", "npx hardhat test", "Runs the Hardhat test suite"),
    action("dev", "Start local node", "npx hardhat node", "Starts a local Hardhat network on http://127.0.0.1:8545"),
];

const RUST_ACTIONS: &[QuickAction] = &[
    action("dev", "Run", "cargo run", "Builds and runs the default binary"),
    action("build", "Build", "cargo build --release", "Compiles an optimized build into target/release/"),
    action("test", "Run tests", "cargo test", "Runs unit and integration tests"),
];

const GO_ACTIONS: &[QuickAction] = &[
    action("dev", "Run", "go run .", "Builds and runs the main package"),
    action("build", "Build", "go build ./...", "Compiles every package in the module"),
    action("test", "Run tests", "go test ./...", "Runs tests for every package in the module"),
];

/// Static mapping from project type to its quick actions.
pub fn quick_actions_for(project_type: ProjectType) -> &'static [QuickAction] {
    match project_type {
        ProjectType::NextJs => NEXTJS_ACTIONS,
        ProjectType::React => REACT_ACTIONS,
        ProjectType::Express => EXPRESS_ACTIONS,
        ProjectType::Vite => VITE_ACTIONS,
        ProjectType::Node => NODE_ACTIONS,
        ProjectType::Streamlit => STREAMLIT_ACTIONS,
        ProjectType::Python => PYTHON_ACTIONS,
        ProjectType::Foundry => FOUNDRY_ACTIONS,
        ProjectType::Hardhat => HARDHAT_ACTIONS,
        ProjectType::Rust => RUST_ACTIONS,
        ProjectType::Go => GO_ACTIONS,
        ProjectType::Folder => &[],
    }
}

/// Find one quick action by id.
pub fn find_action(project_type: ProjectType, id: &str) -> Option<&'static QuickAction> {
    quick_actions_for(project_type).iter().find(|a| a.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_round_trip_through_strings() {
        for t in ProjectType::ALL {
            assert_eq!(ProjectType::from(t.as_str().to_string()), t);
        }
    }

    #[test]
    fn test_unknown_tag_reads_as_folder() {
        let t: ProjectType = serde_json::from_str("\"cobol\"").unwrap();
        assert_eq!(t, ProjectType::Folder);
        assert_eq!(serde_json::to_string(&ProjectType::NextJs).unwrap(), "\"nextjs\"");
    }

    #[test]
    fn test_every_typed_project_has_actions() {
        for t in ProjectType::ALL {
            if t == ProjectType::Folder {
                assert!(t.quick_actions().is_empty());
            } else {
                assert!(!t.quick_actions().is_empty(), "{} has no actions", t);
            }
        }
    }

    #[test]
    fn test_action_ids_unique_per_type() {
        for t in ProjectType::ALL {
            let actions = t.quick_actions();
            for (i, a) in actions.iter().enumerate() {
                assert!(actions[i + 1..].iter().all(|b| b.id != a.id));
            }
        }
    }

    #[test]
    fn test_find_action() {
        let dev = find_action(ProjectType::NextJs, "dev").unwrap();
        assert_eq!(dev.command, "npm run dev");
        assert!(find_action(ProjectType::Foundry, "dev").is_none());
    }
}
