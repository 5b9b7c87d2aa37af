//! Launching quick actions, the editor and the file explorer
//!
//! Quick actions run in the foreground with the terminal attached. Editor and
//! explorer are spawned detached with their output discarded.

use crate::error::{Error, Result};
use crate::project::QuickAction;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

fn shell_command(command_line: &str) -> Command {
    if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command_line]);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command_line]);
        cmd
    }
}

/// Run a quick action's command line in `dir` and wait for it.
pub fn run_action(dir: &Path, action: &QuickAction) -> Result<ExitStatus> {
    tracing::info!(action = action.id, command = action.command, dir = %dir.display(), "Running quick action");
    let status = shell_command(action.command)
        .current_dir(dir)
        .status()
        .map_err(|e| Error::Launch(format!("'{}': {}", action.command, e)))?;
    tracing::info!(action = action.id, code = ?status.code(), "Quick action finished");
    Ok(status)
}

/// Command that opens `path` in the platform file explorer.
pub fn explorer_command(path: &Path) -> Command {
    if cfg!(target_os = "macos") {
        let mut cmd = Command::new("open");
        cmd.arg(path);
        cmd
    } else if cfg!(windows) || std::env::var_os("WSL_DISTRO_NAME").is_some() {
        let mut cmd = Command::new("explorer.exe");
        cmd.arg(".").current_dir(path);
        cmd
    } else {
        let mut cmd = Command::new("xdg-open");
        cmd.arg(path);
        cmd
    }
}

fn spawn_detached(mut cmd: Command, what: &str) -> Result<()> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|_| ())
        .map_err(|e| Error::Launch(format!("{}: {}", what, e)))
}

/// Open `path` with the configured editor command.
pub fn open_in_editor(editor: &str, path: &Path) -> Result<()> {
    let mut parts = editor.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| Error::Launch("editor command is empty".to_string()))?;
    let mut cmd = Command::new(program);
    cmd.args(parts).arg(path);
    tracing::info!(editor, path = %path.display(), "Opening editor");
    spawn_detached(cmd, program)
}

pub fn open_in_explorer(path: &Path) -> Result<()> {
    let cmd = explorer_command(path);
    let program = cmd.get_program().to_string_lossy().into_owned();
    tracing::info!(program = %program, path = %path.display(), "Opening file explorer");
    spawn_detached(cmd, &program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{find_action, ProjectType};
    use tempfile::TempDir;

    #[test]
    fn test_empty_editor_is_rejected() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            open_in_editor("  ", temp.path()),
            Err(Error::Launch(_))
        ));
    }

    #[test]
    fn test_missing_editor_is_launch_error() {
        let temp = TempDir::new().unwrap();
        let err = open_in_editor("definitely-not-an-editor-dojo --wait", temp.path()).unwrap_err();
        assert!(err.to_string().contains("definitely-not-an-editor-dojo"));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_action_uses_directory() {
        let temp = TempDir::new().unwrap();
        let action = QuickAction {
            id: "touch",
            description: "Create a marker",
            command: "touch marker && exit 3",
            explanation: None,
        };
        let status = run_action(temp.path(), &action).unwrap();
        assert_eq!(status.code(), Some(3));
        assert!(temp.path().join("marker").exists());
    }

    #[test]
    fn test_actions_come_from_type_table() {
        let action = find_action(ProjectType::Rust, "build").unwrap();
        assert_eq!(action.command, "cargo build --release");
    }
}
