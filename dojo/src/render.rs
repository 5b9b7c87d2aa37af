//! Console output for command results

use dojo_core::format::{format_relative_time, format_size};
use dojo_core::health::{FixReport, PullResult, SectionReport, SyncReport};
use dojo_core::migrate::{FailedMove, PlannedMove};
use dojo_core::navigator::{CategoryListing, Match};
use dojo_core::{LocationSummary, QuickAction, VisitEntry};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

/// How many clean candidates are listed before "... and N more".
const CLEAN_LISTED: usize = 10;

/// Spinner on stderr while a tree walk runs. Hidden when not a terminal.
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

pub fn heading(title: &str) {
    println!();
    println!(" {}", title);
    println!();
}

pub fn location(summary: &LocationSummary, cwd: &Path, root: &Path) {
    heading("WHERE AM I?");
    match &summary.relative {
        Some(rel) => {
            let shown = if rel.as_os_str().is_empty() {
                ".".to_string()
            } else {
                rel.display().to_string()
            };
            println!(" Location: {}", shown);
            if let Some(project) = &summary.project {
                println!(" Project:  {}", project);
            }
            println!(" Type:     {}", summary.project_type);
            if let Some(repo) = &summary.repo {
                let mut state = Vec::new();
                if repo.ahead {
                    state.push("ahead");
                }
                if repo.behind {
                    state.push("behind");
                }
                if !repo.clean {
                    state.push("uncommitted changes");
                }
                if state.is_empty() && repo.synced {
                    state.push("up to date");
                }
                println!(" Git:      {} ({})", repo.branch, state.join(", "));
            }
            println!();
            actions(summary.actions);
        }
        None => {
            println!(" Location: {}", cwd.display());
            println!(" (outside the workspace)");
            println!();
            println!(" Workspace: cd {}", root.display());
            println!();
        }
    }
}

pub fn actions(actions: &[QuickAction]) {
    if actions.is_empty() {
        return;
    }
    println!(" WHAT YOU CAN DO:");
    for (i, action) in actions.iter().enumerate() {
        println!("   {}. dojo run {:<10} {}", i + 1, action.id, action.description);
    }
    println!();
}

pub fn candidates(matches: &[Match]) {
    println!();
    println!(" Found {} matches:", matches.len());
    println!();
    for (i, m) in matches.iter().enumerate() {
        println!(" {:>3}  {:<36} {:.0}%", i + 1, m.project.to_string(), m.score * 100.0);
    }
    println!();
}

pub fn listings(listings: &[CategoryListing]) {
    if listings.is_empty() {
        println!(" No projects yet");
        println!();
        return;
    }
    for listing in listings {
        println!(" {} ({})", listing.category.label, listing.category.path);
        for project in &listing.projects {
            let star = if project.favorite { "*" } else { " " };
            println!("   {} {:<30} {}", star, project.project.name(), project.project_type);
        }
        println!();
    }
}

pub fn recent(entries: &[VisitEntry], is_favorite: impl Fn(&str) -> bool) {
    let now = chrono::Utc::now();
    for (i, entry) in entries.iter().enumerate() {
        let star = if is_favorite(&entry.name) { "*" } else { " " };
        println!(
            " {:>3} {} {:<32} {:>10}  {}",
            i + 1,
            star,
            entry.name,
            format_relative_time(entry.timestamp, now),
            entry.project_type
        );
    }
    println!();
}

pub fn health_section(section: &SectionReport, unit: &str) {
    let mark = if section.healthy() == section.total() { "ok" } else { "!!" };
    println!(
        " [{}] {:<7} {}/{} {}",
        mark,
        section.section.label(),
        section.healthy(),
        section.total(),
        unit
    );
    for item in section.unhealthy() {
        if let Some(issue) = item.issue {
            println!("        {} ({})", item.name, issue);
        }
    }
}

pub fn fixes(report: &FixReport) {
    let mut current = None;
    for step in &report.steps {
        if current != Some(step.action) {
            println!();
            println!(" {}...", step.action.label());
            current = Some(step.action);
        }
        match &step.outcome {
            Ok(()) => println!("   ok   {}", step.name),
            Err(reason) => println!("   FAIL {} ({})", step.name, reason),
        }
    }
    println!();
    if report.steps.is_empty() && !report.cancelled {
        println!(" Nothing to fix");
    } else {
        println!(" {} fixed, {} failed", report.succeeded(), report.failed());
    }
    if report.cancelled {
        println!(" Cancelled; remaining items were not processed");
    }
    println!();
}

pub fn sync(report: &SyncReport) {
    for (name, result) in &report.repos {
        match result {
            PullResult::UpToDate => println!("   ok   {} (already up to date)", name),
            PullResult::Updated => println!("   ok   {} (updated)", name),
            PullResult::Failed(reason) => println!("   FAIL {} ({})", name, reason),
        }
    }
    if report.cancelled {
        println!();
        println!(" Cancelled; remaining repositories were not pulled");
    }
    println!();
}

pub fn clean_candidates(artifacts: &[dojo_core::clean::Artifact]) {
    let total: u64 = artifacts.iter().map(|a| a.size).sum();
    println!(" Found {} items ({})", artifacts.len(), format_size(total));
    println!();
    for artifact in artifacts.iter().take(CLEAN_LISTED) {
        println!("   {} ({})", artifact.name, format_size(artifact.size));
    }
    if artifacts.len() > CLEAN_LISTED {
        println!("   ... and {} more", artifacts.len() - CLEAN_LISTED);
    }
    println!();
}

pub fn migration_plan(plan: &[PlannedMove]) {
    for planned in plan {
        let note = if planned.blocked {
            " [destination exists, will be skipped]"
        } else {
            ""
        };
        println!(
            "   {:<12} -> {:<22} ({} items){}",
            planned.step.from.display(),
            planned.step.to.display(),
            planned.items,
            note
        );
    }
    println!();
}

pub fn move_failures(failures: &[FailedMove]) {
    for failure in failures {
        println!(
            "   FAIL {} -> {} ({})",
            failure.step.from.display(),
            failure.step.to.display(),
            failure.reason
        );
    }
}
