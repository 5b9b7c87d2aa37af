//! One handler per subcommand
//!
//! Handlers call into dojo-core, print through `render`, and log every
//! command that changes stored state.

use crate::{prompt, render};
use anyhow::{Context as _, Result};
use dojo_core::health::{Auditor, FixTarget};
use dojo_core::migrate::Migrator;
use dojo_core::navigator::{self, Goto, Navigator};
use dojo_core::project::find_action;
use dojo_core::{clean, launch, Context, Error, FavoriteToggle, SystemRunner};
use std::path::PathBuf;

fn navigator(ctx: &Context) -> Navigator<'_> {
    Navigator::new(ctx.workspace(), ctx.config().fuzzy_threshold)
}

fn args(values: &[Option<&str>]) -> Vec<String> {
    values.iter().flatten().map(|s| s.to_string()).collect()
}

/// Directory a command acts on: the best fuzzy match for `target`, or the
/// current directory.
fn target_dir(ctx: &Context, target: Option<&str>) -> Result<PathBuf> {
    match target {
        Some(term) => {
            let hit = navigator(ctx).resolve(term)?;
            println!(" -> {}", hit.project);
            Ok(hit.path)
        }
        None => Ok(ctx.cwd().to_path_buf()),
    }
}

pub fn where_am_i(ctx: &Context) -> Result<()> {
    render::location(&ctx.location(), ctx.cwd(), ctx.root());
    if ctx.needs_migration() {
        println!(" Legacy folders found; see 'dojo migrate preview'");
        println!();
    }
    Ok(())
}

pub fn goto(ctx: &Context, term: &str, pick: Option<&str>) -> Result<()> {
    let nav = navigator(ctx);
    let hit = match nav.goto(term) {
        Goto::NotFound => {
            println!(" Tip: try 'dojo ls' to see all projects");
            return Err(Error::ProjectNotFound(term.to_string()).into());
        }
        Goto::Found(hit) => hit,
        Goto::Ambiguous(matches) => {
            render::candidates(&matches);
            let choice = match pick {
                Some(choice) => choice.to_string(),
                None => prompt::choose("Choose")?,
            };
            navigator::select(&matches, &choice)?
        }
    };

    ctx.log_command("goto", &args(&[Some(term)]));
    println!(" -> {}", hit.project);
    println!();
    println!(" cd {}", hit.path.display());
    println!();
    let (project_type, actions) = navigator::preview(&hit.path);
    println!(" Type: {}", project_type);
    println!();
    render::actions(actions);
    Ok(())
}

pub fn list(ctx: &Context, category: Option<&str>) -> Result<()> {
    let listings = navigator(ctx).list(category, |name| ctx.is_favorite(name))?;
    render::heading("PROJECTS");
    render::listings(&listings);
    Ok(())
}

pub fn recent(ctx: &Context, limit: usize, days: Option<u32>) -> Result<()> {
    match days {
        Some(days) => render::heading(&format!("RECENT PROJECTS (last {} days)", days)),
        None => render::heading("RECENT PROJECTS"),
    }
    let entries = ctx.recent_projects(limit, days);
    if entries.is_empty() {
        println!(" No recent projects");
        println!();
        return Ok(());
    }
    let favorites = ctx.favorites();
    render::recent(&entries, |name| favorites.iter().any(|f| f == name));
    Ok(())
}

pub fn toggle_favorite(ctx: &Context, name: Option<&str>) -> Result<()> {
    let (name, toggled) = ctx.toggle_favorite(name)?;
    ctx.log_command("fav", &[name.clone()]);
    match toggled {
        FavoriteToggle::Added => println!(" Added {} to favorites", name),
        FavoriteToggle::Removed => println!(" Removed {} from favorites", name),
    }
    Ok(())
}

pub fn favorites(ctx: &Context) -> Result<()> {
    render::heading("FAVORITE PROJECTS");
    let favorites = ctx.favorites();
    if favorites.is_empty() {
        println!(" No favorites yet; 'dojo fav' adds the current project");
        println!();
        return Ok(());
    }
    for (i, name) in favorites.iter().enumerate() {
        let path = ctx.root().join(name);
        let kind = if path.is_dir() {
            navigator::preview(&path).0.to_string()
        } else {
            "missing".to_string()
        };
        println!(" {:>3}  {:<32} {}", i + 1, name, kind);
    }
    println!();
    Ok(())
}

pub fn run_action(
    ctx: &Context,
    action_id: &str,
    target: Option<&str>,
    assume_yes: bool,
) -> Result<()> {
    let dir = target_dir(ctx, target)?;
    let (project_type, _) = navigator::preview(&dir);
    let action = find_action(project_type, action_id).ok_or_else(|| Error::UnknownAction {
        action: action_id.to_string(),
        project_type: project_type.to_string(),
    })?;

    if ctx.is_learning_mode() {
        render::heading("LEARNING MODE");
        println!(" This will run: {}", action.command);
        println!(" Project type:  {}", project_type);
        println!(" Location:      {}", dir.display());
        if let Some(explanation) = action.explanation {
            println!();
            println!(" {}", explanation);
        }
        println!();
        if !prompt::confirm("Continue?", true, assume_yes)? {
            return Ok(());
        }
    }

    ctx.log_command("run", &args(&[Some(action_id), target]));
    println!(" $ {}", action.command);
    println!();
    let status = launch::run_action(&dir, action)?;
    if !status.success() {
        println!();
        println!(" Stopped ({})", status);
    }
    Ok(())
}

pub fn open_editor(ctx: &Context, target: Option<&str>) -> Result<()> {
    let dir = target_dir(ctx, target)?;
    println!(" Opening {} in {}", dir.display(), ctx.config().editor);
    launch::open_in_editor(&ctx.config().editor, &dir)?;
    Ok(())
}

pub fn open_explorer(ctx: &Context, target: Option<&str>) -> Result<()> {
    let dir = target_dir(ctx, target)?;
    println!(" Opening explorer at {}", dir.display());
    launch::open_in_explorer(&dir)?;
    Ok(())
}

pub fn health(ctx: &Context, runner: &SystemRunner) -> Result<()> {
    let auditor = Auditor::new(ctx.workspace(), runner);
    let pb = render::spinner("Scanning workspace...");
    let report = auditor.scan();
    pb.finish_and_clear();

    render::heading("HEALTH CHECK");
    render::health_section(&report.git, "repos synced");
    render::health_section(&report.python, "venvs healthy");
    render::health_section(&report.node, "projects installed");
    println!();
    if report.cancelled() {
        println!(" Cancelled; remaining items were not checked");
        println!();
        return Ok(());
    }
    if report.has_issues() {
        println!(" Run 'dojo fix <git|python|node|all>' to repair");
        println!();
    }
    Ok(())
}

pub fn fix(ctx: &Context, runner: &SystemRunner, target_arg: &str) -> Result<()> {
    let target: FixTarget = target_arg.parse()?;
    ctx.log_command("fix", &[target_arg.to_lowercase()]);

    let auditor = Auditor::new(ctx.workspace(), runner);
    render::heading("FIXING");
    let fixes = auditor.scan_and_fix(target);
    render::fixes(&fixes);
    Ok(())
}

pub fn sync(ctx: &Context, runner: &SystemRunner) -> Result<()> {
    ctx.log_command("sync", &[]);
    render::heading("SYNCING REPOSITORIES");
    let report = Auditor::new(ctx.workspace(), runner).sync();
    if report.repos.is_empty() && !report.cancelled {
        println!(" No repositories found");
        println!();
        return Ok(());
    }
    render::sync(&report);
    Ok(())
}

pub fn clean(ctx: &Context, deep: bool, assume_yes: bool) -> Result<()> {
    render::heading("CLEANING BUILD ARTIFACTS");
    println!(" Searching for: {}", clean::patterns(deep).join(", "));
    println!();

    let pb = render::spinner("Scanning...");
    let artifacts = clean::scan(ctx.workspace(), deep);
    pb.finish_and_clear();

    if artifacts.is_empty() {
        println!(" Nothing to clean");
        println!();
        return Ok(());
    }
    render::clean_candidates(&artifacts);
    if !prompt::confirm("Delete these directories?", false, assume_yes)? {
        println!(" Nothing deleted");
        return Ok(());
    }

    ctx.log_command("clean", &args(&[deep.then_some("--deep")]));
    let outcome = clean::remove(artifacts);
    for (artifact, reason) in &outcome.failures {
        println!("   FAIL {} ({})", artifact.name, reason);
    }
    println!(
        " Removed {} directories, freed {}",
        outcome.removed.len(),
        dojo_core::format::format_size(outcome.freed())
    );
    println!();
    Ok(())
}

pub fn migrate_preview(ctx: &Context) -> Result<()> {
    render::heading("MIGRATION PREVIEW");
    let plan = Migrator::new(ctx.root(), ctx.store()).preview();
    if plan.is_empty() {
        println!(" Nothing to migrate");
        println!();
        return Ok(());
    }
    render::migration_plan(&plan);
    println!(" Run 'dojo migrate execute' to apply");
    println!();
    Ok(())
}

pub fn migrate_execute(ctx: &Context, assume_yes: bool) -> Result<()> {
    let migrator = Migrator::new(ctx.root(), ctx.store());
    let plan = migrator.preview();
    render::heading("MIGRATION");
    if plan.is_empty() {
        println!(" Nothing to migrate");
        println!();
        return Ok(());
    }
    render::migration_plan(&plan);
    if !prompt::confirm("Move these folders?", false, assume_yes)? {
        println!(" Cancelled");
        return Ok(());
    }

    ctx.log_command("migrate", &["execute".to_string()]);
    let outcome = migrator.execute().context("migration failed")?;
    for step in &outcome.performed {
        println!("   ok   {} -> {}", step.from.display(), step.to.display());
    }
    render::move_failures(&outcome.failures);
    println!();
    println!(
        " Moved {} folders, {} failed. Undo with 'dojo migrate rollback'",
        outcome.performed.len(),
        outcome.failures.len()
    );
    println!();
    Ok(())
}

pub fn migrate_rollback(ctx: &Context, assume_yes: bool) -> Result<()> {
    let migrator = Migrator::new(ctx.root(), ctx.store());
    let backup = ctx.store().load_backup()?.ok_or(Error::NoBackup)?;

    render::heading("ROLLBACK");
    println!(
        " Migration from {} moved {} folders",
        backup.timestamp.format("%Y-%m-%d %H:%M"),
        backup.moves.len()
    );
    println!();
    if !prompt::confirm("Move them back?", false, assume_yes)? {
        println!(" Cancelled");
        return Ok(());
    }

    ctx.log_command("migrate", &["rollback".to_string()]);
    let outcome = migrator.rollback().context("rollback failed")?;
    for step in &outcome.restored {
        println!("   ok   {} -> {}", step.to.display(), step.from.display());
    }
    render::move_failures(&outcome.failures);
    println!();
    if outcome.failures.is_empty() {
        println!(" Restored {} folders", outcome.restored.len());
    } else {
        println!(
            " Restored {} folders; {} remain recorded for another rollback",
            outcome.restored.len(),
            outcome.failures.len()
        );
    }
    println!();
    Ok(())
}

pub fn config_show(ctx: &Context) -> Result<()> {
    render::heading("CONFIGURATION");
    for (key, value) in ctx.config().entries() {
        println!(" {:<20} {}", key, value);
    }
    println!();
    println!(" Workspace: {}", ctx.root().display());
    println!(" Store:     {}", ctx.store().dir().display());
    println!(" Logs:      {}", dojo_core::logging::log_dir().display());
    println!();
    Ok(())
}

pub fn config_set(ctx: &mut Context, key: &str, value: &str) -> Result<()> {
    ctx.set_config(key, value)?;
    ctx.log_command("config", &args(&[Some("set"), Some(key), Some(value)]));
    println!(" {} = {}", key, value);
    Ok(())
}

pub fn learn(ctx: &mut Context, on: bool) -> Result<()> {
    ctx.set_config("learning_mode", if on { "true" } else { "false" })?;
    ctx.log_command("learn", &[if on { "on" } else { "off" }.to_string()]);
    if on {
        println!(" Learning mode on: commands are explained before they run");
    } else {
        println!(" Learning mode off");
    }
    Ok(())
}
