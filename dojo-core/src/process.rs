//! External command execution with timeouts and cancellation
//!
//! `CommandRunner` is the seam between the engine and external tools (git,
//! pip, npm). `SystemRunner` spawns real processes; `MockRunner` records
//! invocations and answers from a closure.
//!
//! A runner never returns an error. Spawn failures, non-zero exits, timeouts
//! and cancellation are all [`CommandOutcome`] values the caller records as a
//! per-item status.

use std::cell::RefCell;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Timeout for `git status` queries.
pub const STATUS_TIMEOUT: Duration = Duration::from_secs(5);
/// Timeout for `git pull`.
pub const PULL_TIMEOUT: Duration = Duration::from_secs(30);
/// Timeout for creating a Python environment.
pub const VENV_TIMEOUT: Duration = Duration::from_secs(60);
/// Timeout for dependency installs.
pub const INSTALL_TIMEOUT: Duration = Duration::from_secs(300);

/// Shared flag set when the user interrupts.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A command to run: program, arguments, working directory, time limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub timeout: Duration,
}

impl Invocation {
    pub fn new(program: impl Into<String>, cwd: &Path, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.to_path_buf(),
            timeout,
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// How an external command ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Process ran to completion
    Exited {
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },
    /// Binary missing or not executable
    SpawnFailed(String),
    /// Killed after exceeding its timeout
    TimedOut(Duration),
    /// Killed because the user interrupted
    Cancelled,
}

impl CommandOutcome {
    pub fn success(&self) -> bool {
        matches!(self, CommandOutcome::Exited { code: Some(0), .. })
    }

    /// Stdout of a successful run.
    pub fn stdout(&self) -> Option<&str> {
        match self {
            CommandOutcome::Exited {
                code: Some(0),
                stdout,
                ..
            } => Some(stdout),
            _ => None,
        }
    }

    /// Human-readable reason for a failed run, `None` on success.
    pub fn failure(&self) -> Option<String> {
        match self {
            CommandOutcome::Exited { code: Some(0), .. } => None,
            CommandOutcome::Exited { code, stderr, .. } => {
                let first = stderr.lines().map(str::trim).find(|l| !l.is_empty());
                Some(match (code, first) {
                    (Some(code), Some(line)) => format!("exit {}: {}", code, line),
                    (Some(code), None) => format!("exit {}", code),
                    (None, _) => "terminated by signal".to_string(),
                })
            }
            CommandOutcome::SpawnFailed(reason) => Some(reason.clone()),
            CommandOutcome::TimedOut(limit) => {
                Some(format!("timed out after {}s", limit.as_secs()))
            }
            CommandOutcome::Cancelled => Some("cancelled".to_string()),
        }
    }
}

/// Trait for executing external commands.
pub trait CommandRunner {
    fn run(&self, invocation: &Invocation) -> CommandOutcome;

    /// True once the user has asked to stop; loops check this between items.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Production runner that spawns real processes.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    cancel: CancelToken,
}

impl SystemRunner {
    pub fn new(cancel: CancelToken) -> Self {
        Self { cancel }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> CommandOutcome {
        if self.cancel.is_cancelled() {
            return CommandOutcome::Cancelled;
        }

        let mut child = match Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                tracing::debug!(command = %invocation, error = %e, "Spawn failed");
                return CommandOutcome::SpawnFailed(format!(
                    "failed to execute {}: {}",
                    invocation.program, e
                ));
            }
        };

        // Drain pipes on their own threads so a chatty child cannot block on a
        // full pipe while we poll for exit.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let started = Instant::now();
        let outcome = loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    break CommandOutcome::Exited {
                        code: status.code(),
                        stdout: join(stdout),
                        stderr: join(stderr),
                    };
                }
                Ok(None) => {
                    if self.cancel.is_cancelled() {
                        kill(&mut child);
                        break CommandOutcome::Cancelled;
                    }
                    if started.elapsed() >= invocation.timeout {
                        kill(&mut child);
                        break CommandOutcome::TimedOut(invocation.timeout);
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    kill(&mut child);
                    break CommandOutcome::SpawnFailed(format!(
                        "failed while waiting for {}: {}",
                        invocation.program, e
                    ));
                }
            }
        };

        tracing::debug!(
            command = %invocation,
            cwd = %invocation.cwd.display(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            success = outcome.success(),
            "External command finished"
        );
        outcome
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<thread::JoinHandle<String>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn join(handle: Option<thread::JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

fn kill(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Test-double runner that records invocations and answers from a closure.
pub struct MockRunner {
    respond: Box<dyn Fn(&Invocation) -> CommandOutcome>,
    calls: RefCell<Vec<Invocation>>,
    cancel_after: Option<usize>,
}

impl MockRunner {
    pub fn new(respond: impl Fn(&Invocation) -> CommandOutcome + 'static) -> Self {
        Self {
            respond: Box::new(respond),
            calls: RefCell::new(Vec::new()),
            cancel_after: None,
        }
    }

    /// Runner whose every command succeeds with `stdout`.
    pub fn succeeding(stdout: &str) -> Self {
        let stdout = stdout.to_string();
        Self::new(move |_| ok(&stdout))
    }

    /// Report cancellation once `n` commands have run.
    pub fn cancel_after(mut self, n: usize) -> Self {
        self.cancel_after = Some(n);
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }

    /// Calls rendered as command lines (`git pull`, ...).
    pub fn command_lines(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|c| c.to_string()).collect()
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, invocation: &Invocation) -> CommandOutcome {
        self.calls.borrow_mut().push(invocation.clone());
        (self.respond)(invocation)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_after
            .map_or(false, |n| self.calls.borrow().len() >= n)
    }
}

/// A successful exit with the given stdout.
pub fn ok(stdout: &str) -> CommandOutcome {
    CommandOutcome::Exited {
        code: Some(0),
        stdout: stdout.to_string(),
        stderr: String::new(),
    }
}

/// A failed exit with the given stderr.
pub fn failed(code: i32, stderr: &str) -> CommandOutcome {
    CommandOutcome::Exited {
        code: Some(code),
        stdout: String::new(),
        stderr: stderr.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_outcome_helpers() {
        assert!(ok("x").success());
        assert_eq!(ok("x").stdout(), Some("x"));
        assert_eq!(ok("x").failure(), None);

        let err = failed(128, "\nfatal: not a git repository\n");
        assert!(!err.success());
        assert_eq!(err.stdout(), None);
        assert_eq!(
            err.failure().as_deref(),
            Some("exit 128: fatal: not a git repository")
        );
        assert_eq!(
            CommandOutcome::TimedOut(Duration::from_secs(3)).failure().as_deref(),
            Some("timed out after 3s")
        );
    }

    #[test]
    fn test_invocation_display() {
        let inv = Invocation::new("git", Path::new("/tmp"), STATUS_TIMEOUT).args(["status", "-sb"]);
        assert_eq!(inv.to_string(), "git status -sb");
    }

    #[test]
    fn test_mock_runner_records_calls() {
        let runner = MockRunner::new(|inv| {
            if inv.program == "git" {
                ok("## main")
            } else {
                failed(1, "nope")
            }
        });
        let dir = Path::new("/tmp");
        assert!(runner.run(&Invocation::new("git", dir, STATUS_TIMEOUT)).success());
        assert!(!runner.run(&Invocation::new("npm", dir, INSTALL_TIMEOUT)).success());
        assert_eq!(runner.command_lines(), vec!["git", "npm"]);
    }

    #[test]
    fn test_system_runner_missing_binary() {
        let temp = TempDir::new().unwrap();
        let runner = SystemRunner::default();
        let outcome = runner.run(&Invocation::new(
            "definitely-not-a-real-binary-dojo",
            temp.path(),
            STATUS_TIMEOUT,
        ));
        assert!(matches!(outcome, CommandOutcome::SpawnFailed(_)));
    }

    #[test]
    fn test_system_runner_respects_cancel_before_spawn() {
        let temp = TempDir::new().unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        let runner = SystemRunner::new(cancel);
        let outcome = runner.run(&Invocation::new("true", temp.path(), STATUS_TIMEOUT));
        assert_eq!(outcome, CommandOutcome::Cancelled);
        assert!(runner.is_cancelled());
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_times_out() {
        let temp = TempDir::new().unwrap();
        let runner = SystemRunner::default();
        let outcome = runner.run(
            &Invocation::new("sleep", temp.path(), Duration::from_millis(200)).args(["5"]),
        );
        assert_eq!(outcome, CommandOutcome::TimedOut(Duration::from_millis(200)));
    }
}
