//! Bounded subprocess execution for package-manager queries.

use crate::security::error::{AuditError, AuditResult};
use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

/// Poll interval while waiting for a child to exit
pub const POLL_INTERVAL_MS: u64 = 20;

/// Captured output of a finished command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// -1 when the process was terminated by a signal
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Human-readable rendering of a command line for logs and errors.
pub fn describe_command(cmd: &Command) -> String {
    let mut parts = vec![cmd.get_program().to_string_lossy().to_string()];
    parts.extend(cmd.get_args().map(|a| a.to_string_lossy().to_string()));
    parts.join(" ")
}

/// Run `cmd` to completion, killing it once `timeout` elapses.
///
/// stdout/stderr are drained on background threads while the process runs;
/// a child writing more than the pipe buffer would otherwise block forever.
/// Output is decoded lossily.
///
/// On unix the child leads its own process group and the whole group is
/// killed on expiry. The call never waits for the pipes past `timeout`:
/// a descendant that inherited them can outlive the child.
pub fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> AuditResult<CommandOutput> {
    let command = describe_command(cmd);
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| AuditError::CommandFailed {
            command: command.clone(),
            reason: e.to_string(),
        })?;

    wait_with_timeout(&mut child, &command, timeout)
}

enum Stream {
    Stdout,
    Stderr,
}

fn wait_with_timeout(
    child: &mut Child,
    command: &str,
    timeout: Duration,
) -> AuditResult<CommandOutput> {
    let deadline = Instant::now() + timeout;
    let check_interval = Duration::from_millis(POLL_INTERVAL_MS);

    let (tx, rx) = mpsc::channel();
    let mut readers = 0;
    if let Some(out) = child.stdout.take() {
        spawn_drain(out, Stream::Stdout, tx.clone());
        readers += 1;
    }
    if let Some(err) = child.stderr.take() {
        spawn_drain(err, Stream::Stderr, tx.clone());
        readers += 1;
    }
    drop(tx);

    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                let Some((stdout, stderr)) = collect_output(&rx, readers, deadline) else {
                    kill_tree(child);
                    tracing::warn!("'{}' left its output pipes open past {:?}", command, timeout);
                    return Err(timeout_error(command, timeout));
                };
                return Ok(CommandOutput {
                    stdout,
                    stderr,
                    exit_code: status.code().unwrap_or(-1),
                });
            }
            Ok(None) => {}
            Err(e) => {
                kill_tree(child);
                return Err(AuditError::CommandFailed {
                    command: command.to_string(),
                    reason: format!("failed to wait for process: {}", e),
                });
            }
        }

        let now = Instant::now();
        if now >= deadline {
            kill_tree(child);
            tracing::warn!("Killed '{}' after {:?}", command, timeout);
            return Err(timeout_error(command, timeout));
        }

        thread::sleep(check_interval.min(deadline - now));
    }
}

fn timeout_error(command: &str, timeout: Duration) -> AuditError {
    AuditError::CommandTimeout {
        command: command.to_string(),
        timeout_secs: timeout.as_secs(),
    }
}

/// Readers that are still blocked at the deadline are left behind; they
/// finish on their own once the last holder of the pipe exits.
fn collect_output(
    rx: &Receiver<(Stream, String)>,
    readers: usize,
    deadline: Instant,
) -> Option<(String, String)> {
    let grace = Duration::from_millis(POLL_INTERVAL_MS);
    let mut stdout = String::new();
    let mut stderr = String::new();
    for _ in 0..readers {
        let wait = deadline.saturating_duration_since(Instant::now()).max(grace);
        match rx.recv_timeout(wait).ok()? {
            (Stream::Stdout, text) => stdout = text,
            (Stream::Stderr, text) => stderr = text,
        }
    }
    Some((stdout, stderr))
}

fn spawn_drain<R>(reader: R, stream: Stream, tx: Sender<(Stream, String)>)
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let _ = tx.send((stream, drain(reader)));
    });
}

#[cfg(unix)]
fn kill_tree(child: &mut Child) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    // The child leads its group (pgid == pid).
    if let Ok(pid) = i32::try_from(child.id()) {
        let _ = killpg(Pid::from_raw(pid), Signal::SIGKILL);
    }
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn drain<R: Read>(mut reader: R) -> String {
    let mut buf = Vec::new();
    let _ = reader.read_to_end(&mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}
