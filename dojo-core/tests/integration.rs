//! Integration tests for dojo-core
//!
//! Each test builds a throwaway workspace and store directory and drives
//! the public API the way the CLI does.

use dojo_core::health::{Auditor, FixAction, Issue};
use dojo_core::history::{COMMAND_HISTORY_LIMIT, RECENT_LIMIT};
use dojo_core::migrate::{needs_migration, Migrator};
use dojo_core::navigator::{Goto, Navigator};
use dojo_core::process::{failed, ok, MockRunner};
use dojo_core::{Context, FixTarget, ProjectType, Store};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct TestEnv {
    _temp: TempDir,
    root: PathBuf,
    store: Store,
}

impl TestEnv {
    fn new() -> Self {
        let temp = TempDir::new().expect("failed to create temp dir");
        let root = temp.path().join("dojo");
        fs::create_dir_all(&root).expect("failed to create workspace root");
        let store = Store::open(temp.path().join("config"));
        Self {
            _temp: temp,
            root,
            store,
        }
    }

    fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    fn mkdir(&self, rel: &str) -> PathBuf {
        let path = self.root.join(rel);
        fs::create_dir_all(&path).unwrap();
        path
    }

    fn context(&self, cwd: &Path) -> Context {
        Context::with_root(cwd, &self.root, self.store.clone(), &not_a_repo())
    }
}

fn not_a_repo() -> MockRunner {
    MockRunner::new(|_| failed(128, "fatal: not a git repository"))
}

// ============================================
// Context and classification
// ============================================

#[test]
fn test_nextjs_project_offers_dev_server() {
    let env = TestEnv::new();
    env.write(
        "work/apps/demo/package.json",
        r#"{"name": "demo", "dependencies": {"next": "14.1.0", "react": "18.2.0"}}"#,
    );

    let ctx = env.context(&env.root.join("work/apps/demo"));

    assert_eq!(ctx.project_type(), ProjectType::NextJs);
    let dev = ctx
        .quick_actions()
        .iter()
        .find(|a| a.id == "dev")
        .expect("nextjs should offer a dev action");
    assert_eq!(dev.command, "npm run dev");

    let location = ctx.location();
    assert_eq!(location.relative, Some(PathBuf::from("work/apps/demo")));
    assert!(location.repo.is_none());
}

#[test]
fn test_visits_and_commands_are_bounded() {
    let env = TestEnv::new();
    for i in 0..(RECENT_LIMIT + 5) {
        let dir = env.mkdir(&format!("lab/p{:02}", i));
        env.context(&dir);
    }
    let last = env.root.join("lab/p00");
    let ctx = env.context(&last);
    for i in 0..(COMMAND_HISTORY_LIMIT + 10) {
        ctx.log_command("goto", &[format!("term{}", i)]);
    }

    let history = env.store.load_history();
    assert_eq!(history.recent.len(), RECENT_LIMIT);
    assert_eq!(history.recent[0].name, "lab/p00");
    assert_eq!(history.visit_count("lab/p00"), 2);
    assert_eq!(history.command_history.len(), COMMAND_HISTORY_LIMIT);
    assert_eq!(history.command_history[0].args, vec!["term10"]);
}

// ============================================
// Navigation
// ============================================

#[test]
fn test_goto_then_favorite_round() {
    let env = TestEnv::new();
    env.write("work/bots/arb-bot/requirements.txt", "requests\n");
    env.mkdir("lab/arb-sim");
    env.mkdir("work/apps/site");

    let ctx = env.context(&env.root);
    let nav = Navigator::new(ctx.workspace(), ctx.config().fuzzy_threshold);

    let hits = match nav.goto("arb") {
        Goto::Ambiguous(hits) => hits,
        other => panic!("expected two candidates, got {:?}", other),
    };
    assert_eq!(hits.len(), 2);

    let hit = match nav.goto("site") {
        Goto::Found(hit) => hit,
        other => panic!("expected one match, got {:?}", other),
    };
    assert_eq!(hit.path, env.root.join("work/apps/site"));

    ctx.toggle_favorite(Some("work/bots/arb-bot")).unwrap();
    let listing = nav.list(Some("work/bots"), |name| ctx.is_favorite(name)).unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].projects[0].project_type, ProjectType::Python);
    assert!(listing[0].projects[0].favorite);
}

// ============================================
// Health
// ============================================

#[test]
fn test_health_scan_and_fix_node() {
    let env = TestEnv::new();
    env.mkdir("work/apps/api/.git");
    env.write("work/apps/api/package.json", "{}");
    env.write("work/tools/cli/requirements.txt", "click\n");
    env.mkdir("work/tools/cli/venv/lib/python3.12/site-packages");

    let workspace = dojo_core::Workspace::new(&env.root);
    let runner = MockRunner::new(|inv| {
        if inv.program == "git" {
            ok("## main...origin/main [ahead 2]\n")
        } else {
            ok("")
        }
    });
    let auditor = Auditor::new(&workspace, &runner);

    let report = auditor.scan();
    assert_eq!(report.git.results[0].issue, Some(Issue::UnpushedCommits));
    assert_eq!(report.python.healthy(), 1);
    assert_eq!(report.node.healthy(), 0);

    let fixes = auditor.fix(FixTarget::All, &report);
    assert_eq!(fixes.steps.len(), 1);
    assert_eq!(fixes.steps[0].action, FixAction::Install);
    assert_eq!(fixes.steps[0].name, "work/apps/api");
}

// ============================================
// Migration
// ============================================

#[test]
fn test_legacy_layout_migrates_and_rolls_back() {
    let env = TestEnv::new();
    env.write("apps/site/index.html", "<html></html>");
    env.write("experiments/fuzz/notes.md", "try it");
    assert!(!env.root.join("work").exists());
    assert!(needs_migration(&env.root));

    let migrator = Migrator::new(&env.root, &env.store);
    let outcome = migrator.execute().unwrap();
    assert!(outcome.failures.is_empty());
    assert!(!env.root.join("apps").exists());
    assert!(env.root.join("work/apps/site/index.html").exists());
    assert!(env.root.join("lab/fuzz/notes.md").exists());

    // The migrated project is now found under its nested category
    let ctx = env.context(&env.root.join("work/apps/site"));
    assert_eq!(ctx.project().unwrap().to_string(), "work/apps/site");

    migrator.rollback().unwrap();
    assert_eq!(
        fs::read_to_string(env.root.join("apps/site/index.html")).unwrap(),
        "<html></html>"
    );
    assert!(!env.root.join("work").exists());
    assert!(!env.root.join("lab").exists());
    assert!(env.store.load_backup().unwrap().is_none());
}
