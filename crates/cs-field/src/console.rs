//! Command channel to the field solver.
//!
//! The solver reads one command per line and answers with free text that
//! ends at its prompt. Lines starting with `Error` are rejections.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::{FieldError, FieldResult};

/// A synchronous command interface to a field solver.
pub trait SolverConsole {
    /// Send one command and return the solver's reply text.
    fn execute(&mut self, command: &str) -> FieldResult<String>;

    /// Directory the solver writes report and case files into.
    fn working_dir(&self) -> &Path;
}

impl<C: SolverConsole + ?Sized> SolverConsole for Box<C> {
    fn execute(&mut self, command: &str) -> FieldResult<String> {
        (**self).execute(command)
    }

    fn working_dir(&self) -> &Path {
        (**self).working_dir()
    }
}

/// Shared flag that aborts a readiness wait.
#[derive(Clone, Debug, Default)]
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

/// How to start the external solver and recognize that it is ready.
#[derive(Clone, Debug)]
pub struct LaunchSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    /// Marker file the solver writes once it accepts commands; relative paths
    /// are resolved against `working_dir`.
    pub ready_marker: PathBuf,
    pub ready_token: String,
    pub poll_interval: Duration,
    pub startup_timeout: Option<Duration>,
    pub command_timeout: Duration,
    pub prompt: String,
}

impl LaunchSpec {
    pub fn new(program: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
            ready_marker: PathBuf::from("aaS_FluentId.txt"),
            ready_token: "IOR:".to_string(),
            poll_interval: Duration::from_millis(200),
            startup_timeout: None,
            command_timeout: Duration::from_secs(600),
            prompt: ">".to_string(),
        }
    }

    pub fn marker_path(&self) -> PathBuf {
        if self.ready_marker.is_absolute() {
            self.ready_marker.clone()
        } else {
            self.working_dir.join(&self.ready_marker)
        }
    }
}

/// Poll `marker` every `poll_interval` until it contains `token`.
///
/// `alive` is called on every poll and may abort the wait, e.g. when the
/// solver process has already exited.
pub fn wait_for_ready_marker(
    marker: &Path,
    token: &str,
    poll_interval: Duration,
    timeout: Option<Duration>,
    cancel: &CancelToken,
    mut alive: impl FnMut() -> FieldResult<()>,
) -> FieldResult<()> {
    let start = Instant::now();
    loop {
        if cancel.is_cancelled() {
            return Err(FieldError::Cancelled);
        }
        if let Ok(text) = std::fs::read_to_string(marker)
            && text.contains(token)
        {
            debug!(marker = %marker.display(), waited_s = start.elapsed().as_secs_f64(), "ready marker found");
            return Ok(());
        }
        alive()?;
        if let Some(limit) = timeout
            && start.elapsed() >= limit
        {
            return Err(FieldError::ReadyTimeout {
                marker: marker.to_path_buf(),
                seconds: limit.as_secs_f64(),
            });
        }
        thread::sleep(poll_interval);
    }
}

/// Field solver running as a child process driven through stdin/stdout.
///
/// The process is killed when the console is dropped.
pub struct ProcessConsole {
    child: Child,
    stdin: ChildStdin,
    output: Receiver<String>,
    pending: String,
    working_dir: PathBuf,
    command_timeout: Duration,
    prompt: String,
}

impl ProcessConsole {
    /// Start the solver and block until it is ready for commands.
    pub fn launch(spec: &LaunchSpec, cancel: &CancelToken) -> FieldResult<Self> {
        let marker = spec.marker_path();
        match std::fs::remove_file(&marker) {
            Ok(()) => debug!(marker = %marker.display(), "removed stale ready marker"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(FieldError::io(&marker)(e)),
        }

        let mut child = Command::new(&spec.program)
            .args(&spec.args)
            .current_dir(&spec.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| FieldError::Launch {
                program: spec.program.clone(),
                source,
            })?;

        let (stdin, stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                let _ = child.kill();
                return Err(FieldError::Exited {
                    status: "standard streams unavailable".to_string(),
                });
            }
        };
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || pump(stdout, tx));

        let mut console = Self {
            child,
            stdin,
            output: rx,
            pending: String::new(),
            working_dir: spec.working_dir.clone(),
            command_timeout: spec.command_timeout,
            prompt: spec.prompt.clone(),
        };

        info!(program = %spec.program, marker = %marker.display(), "waiting for field solver");
        wait_for_ready_marker(
            &marker,
            &spec.ready_token,
            spec.poll_interval,
            spec.startup_timeout,
            cancel,
            || console.check_alive(),
        )?;
        // discard the banner up to the first prompt
        let banner = console.read_reply("<startup>")?;
        debug!(bytes = banner.len(), "field solver ready");
        Ok(console)
    }

    fn check_alive(&mut self) -> FieldResult<()> {
        match self.child.try_wait() {
            Ok(Some(status)) => Err(FieldError::Exited {
                status: status.to_string(),
            }),
            Ok(None) => Ok(()),
            Err(e) => Err(FieldError::Exited {
                status: e.to_string(),
            }),
        }
    }

    fn read_reply(&mut self, command: &str) -> FieldResult<String> {
        let deadline = Instant::now() + self.command_timeout;
        loop {
            if let Some(reply) = take_reply(&mut self.pending, &self.prompt) {
                return Ok(reply);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.output.recv_timeout(remaining) {
                Ok(chunk) => self.pending.push_str(&chunk),
                Err(RecvTimeoutError::Timeout) => {
                    return Err(FieldError::Timeout {
                        command: command.to_string(),
                        seconds: self.command_timeout.as_secs_f64(),
                    });
                }
                Err(RecvTimeoutError::Disconnected) => {
                    self.check_alive()?;
                    return Err(FieldError::Exited {
                        status: "output closed".to_string(),
                    });
                }
            }
        }
    }
}

impl SolverConsole for ProcessConsole {
    fn execute(&mut self, command: &str) -> FieldResult<String> {
        debug!(command, "field command");
        writeln!(self.stdin, "{command}")
            .and_then(|()| self.stdin.flush())
            .map_err(|e| FieldError::Exited {
                status: e.to_string(),
            })?;
        let reply = self.read_reply(command)?;
        if let Some(line) = rejection(&reply) {
            return Err(FieldError::Rejected {
                command: command.to_string(),
                reply: line.to_string(),
            });
        }
        Ok(reply)
    }

    fn working_dir(&self) -> &Path {
        &self.working_dir
    }
}

impl Drop for ProcessConsole {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            if let Err(e) = self.child.kill() {
                warn!(error = %e, "failed to kill field solver");
            }
            let _ = self.child.wait();
        }
    }
}

fn pump(mut stdout: impl Read, tx: mpsc::Sender<String>) {
    let mut buf = [0u8; 4096];
    let mut carry = Vec::new();
    loop {
        match stdout.read(&mut buf) {
            Ok(0) | Err(_) => {
                if !carry.is_empty() {
                    let _ = tx.send(String::from_utf8_lossy(&carry).into_owned());
                }
                return;
            }
            Ok(n) => {
                let text = decode_chunk(&mut carry, &buf[..n]);
                if !text.is_empty() && tx.send(text).is_err() {
                    return;
                }
            }
        }
    }
}

/// Decode `bytes` after any bytes carried over from the previous read.
/// A multi-byte character cut off at the end stays in `carry`.
fn decode_chunk(carry: &mut Vec<u8>, bytes: &[u8]) -> String {
    carry.extend_from_slice(bytes);
    let split = carry.len() - incomplete_tail(carry.as_slice());
    let text = String::from_utf8_lossy(&carry[..split]).into_owned();
    carry.drain(..split);
    text
}

/// Length of a truncated UTF-8 sequence at the end of `bytes`, or 0.
fn incomplete_tail(bytes: &[u8]) -> usize {
    for back in 1..=bytes.len().min(3) {
        let b = bytes[bytes.len() - back];
        if b & 0xC0 == 0x80 {
            continue;
        }
        let needed = match b {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => 1,
        };
        return if needed > back { back } else { 0 };
    }
    0
}

/// Split off everything before the first line that is only the prompt.
fn take_reply(buffer: &mut String, prompt: &str) -> Option<String> {
    let prompt = prompt.trim();
    let mut start = 0;
    let mut found = None;
    for segment in buffer.split_inclusive('\n') {
        let end = start + segment.len();
        if segment.trim() == prompt {
            found = Some((start, end));
            break;
        }
        start = end;
    }
    let (start, end) = found?;
    let reply = buffer[..start].to_string();
    buffer.drain(..end);
    Some(reply)
}

/// First reply line the solver marked as an error.
pub(crate) fn rejection(reply: &str) -> Option<&str> {
    reply
        .lines()
        .map(str::trim_start)
        .find(|line| line.starts_with("Error"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn character_split_across_reads_is_kept_whole() {
        let bytes = "wall-floor 4.5 °C\n>\n".as_bytes();
        let cut = bytes.iter().position(|b| *b == 0xC2).unwrap() + 1;
        let mut carry = Vec::new();
        let mut text = decode_chunk(&mut carry, &bytes[..cut]);
        assert_eq!(carry.len(), 1);
        text.push_str(&decode_chunk(&mut carry, &bytes[cut..]));
        assert!(carry.is_empty());
        assert_eq!(text, "wall-floor 4.5 °C\n>\n");
        assert!(!text.contains('\u{FFFD}'));
    }

    #[test]
    fn pump_reassembles_characters_from_single_byte_reads() {
        struct Trickle<'a>(&'a [u8]);
        impl Read for Trickle<'_> {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                let n = self.0.len().min(1).min(buf.len());
                buf[..n].copy_from_slice(&self.0[..n]);
                self.0 = &self.0[n..];
                Ok(n)
            }
        }
        let (tx, rx) = mpsc::channel();
        pump(Trickle("T 293 \u{2103}\n".as_bytes()), tx);
        let text: String = rx.iter().collect();
        assert_eq!(text, "T 293 \u{2103}\n");
    }

    #[test]
    fn reply_ends_at_prompt_line() {
        let mut buf = String::from("line one\nline two\n>\nnext");
        assert_eq!(take_reply(&mut buf, ">").as_deref(), Some("line one\nline two\n"));
        assert_eq!(buf, "next");
    }

    #[test]
    fn prompt_without_trailing_newline() {
        let mut buf = String::from("done\n> ");
        assert_eq!(take_reply(&mut buf, "> ").as_deref(), Some("done\n"));
        assert!(buf.is_empty());
    }

    #[test]
    fn incomplete_reply_waits() {
        let mut buf = String::from("partial -> not a prompt\n");
        assert_eq!(take_reply(&mut buf, ">"), None);
        assert_eq!(buf, "partial -> not a prompt\n");
    }

    #[test]
    fn error_lines_are_rejections() {
        assert_eq!(rejection("ok\n  Error: invalid zone\n"), Some("Error: invalid zone"));
        assert_eq!(rejection("no errors here\n"), None);
    }

    #[test]
    fn marker_relative_to_working_dir() {
        let spec = LaunchSpec::new("solver", "/tmp/run/field");
        assert_eq!(spec.marker_path(), PathBuf::from("/tmp/run/field/aaS_FluentId.txt"));
        assert_eq!(spec.poll_interval, Duration::from_millis(200));
    }

    #[test]
    fn cancelled_wait_stops() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = wait_for_ready_marker(
            Path::new("/nonexistent/marker"),
            "IOR:",
            Duration::from_millis(1),
            None,
            &cancel,
            || Ok(()),
        )
        .unwrap_err();
        assert!(matches!(err, FieldError::Cancelled));
        assert_eq!(err.class(), cs_core::FailureClass::Connection);
    }

    #[test]
    fn wait_times_out_without_marker() {
        let err = wait_for_ready_marker(
            Path::new("/nonexistent/marker"),
            "IOR:",
            Duration::from_millis(5),
            Some(Duration::from_millis(20)),
            &CancelToken::new(),
            || Ok(()),
        )
        .unwrap_err();
        assert!(matches!(err, FieldError::ReadyTimeout { .. }));
    }
}
