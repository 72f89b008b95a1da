pub mod assertions;
pub mod cli;

use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::command::cli::{CfCli, CfCommand};
use crate::error::{CapturedOutput, HarnessError, HarnessResult};
use crate::identity::SessionEnv;

const REDACTED: &str = "[REDACTED]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub cwd: Option<PathBuf>,
    pub timeout: Duration,
    pub redacted_args: Vec<usize>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            env: Vec::new(),
            cwd: None,
            timeout,
            redacted_args: Vec::new(),
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_redacted_args(mut self, positions: Vec<usize>) -> Self {
        self.redacted_args = positions;
        self
    }

    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn display(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.clone());
        for (idx, arg) in self.args.iter().enumerate() {
            if self.redacted_args.contains(&idx) {
                parts.push(String::from(REDACTED));
            } else if arg.is_empty() || arg.contains(char::is_whitespace) {
                parts.push(format!("'{arg}'"));
            } else {
                parts.push(arg.clone());
            }
        }
        parts.join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn captured(&self) -> CapturedOutput {
        CapturedOutput {
            exit_code: Some(self.exit_code),
            stdout: self.stdout.clone(),
            stderr: self.stderr.clone(),
        }
    }

    pub fn last_stdout_line(&self) -> Option<&str> {
        self.stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .last()
    }
}

pub trait CommandRunner: Send + Sync + 'static {
    fn run(&self, spec: &CommandSpec) -> HarnessResult<CommandResult>;
}

pub type SharedCommandRunner = Arc<dyn CommandRunner>;

#[derive(Debug, Clone)]
pub struct StdCommandRunner {
    poll_step: Duration,
    drain_grace: Duration,
}

impl Default for StdCommandRunner {
    fn default() -> Self {
        Self {
            poll_step: Duration::from_millis(10),
            drain_grace: Duration::from_secs(2),
        }
    }
}

type StreamBuffer = Arc<Mutex<Vec<u8>>>;

struct StreamCapture {
    buffer: StreamBuffer,
    reader: Option<JoinHandle<()>>,
}

impl StreamCapture {
    fn spawn<R>(source: Option<R>) -> Self
    where
        R: Read + Send + 'static,
    {
        let buffer: StreamBuffer = Arc::new(Mutex::new(Vec::new()));
        let reader = source.map(|mut source| {
            let sink = Arc::clone(&buffer);
            thread::spawn(move || {
                let mut chunk = [0u8; 8192];
                loop {
                    match source.read(&mut chunk) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => sink
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .extend_from_slice(&chunk[..n]),
                    }
                }
            })
        });
        Self { buffer, reader }
    }

    // Grandchildren can keep the pipe open after the direct child exits, so the
    // reader is only awaited for a bounded grace period.
    fn finish(mut self, grace: Duration) -> String {
        if let Some(reader) = self.reader.take() {
            let deadline = Instant::now() + grace;
            while !reader.is_finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(5));
            }
            if reader.is_finished() {
                let _ = reader.join();
            }
        }
        let bytes = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(bytes.as_slice()).to_string()
    }
}

impl CommandRunner for StdCommandRunner {
    fn run(&self, spec: &CommandSpec) -> HarnessResult<CommandResult> {
        let rendered = spec.display();
        let mut command = Command::new(spec.program.as_str());
        command
            .args(spec.args.iter().map(String::as_str))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (key, value) in &spec.env {
            command.env(key, value);
        }
        if let Some(cwd) = spec.cwd.as_deref() {
            command.current_dir(cwd);
        }

        let started = Instant::now();
        let mut child = command.spawn().map_err(|source| HarnessError::CommandLaunch {
            command: rendered.clone(),
            source,
        })?;
        let stdout = StreamCapture::spawn(child.stdout.take());
        let stderr = StreamCapture::spawn(child.stderr.take());

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break Some(status),
                Ok(None) => {}
                Err(source) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(HarnessError::CommandLaunch {
                        command: rendered,
                        source,
                    });
                }
            }
            if started.elapsed() >= spec.timeout {
                let _ = child.kill();
                let _ = child.wait();
                break None;
            }
            thread::sleep(self.poll_step);
        };

        let stdout = stdout.finish(self.drain_grace);
        let stderr = stderr.finish(self.drain_grace);
        let duration = started.elapsed();

        match status {
            Some(status) => Ok(CommandResult {
                exit_code: status.code().unwrap_or(-1),
                stdout,
                stderr,
                duration,
            }),
            None => {
                warn!(
                    command = %rendered,
                    timeout_ms = spec.timeout.as_millis() as u64,
                    "command timed out and was killed"
                );
                Err(HarnessError::CommandTimeout {
                    command: rendered,
                    timeout: spec.timeout,
                    output: CapturedOutput {
                        exit_code: None,
                        stdout,
                        stderr,
                    },
                })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandRecord {
    pub identity: String,
    pub command: String,
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
    pub timed_out: bool,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct CommandJournal {
    records: Arc<Mutex<Vec<CommandRecord>>>,
}

impl CommandJournal {
    pub fn record(&self, record: CommandRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }

    pub fn snapshot(&self) -> Vec<CommandRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone)]
pub struct CommandExecutor {
    runner: SharedCommandRunner,
    cli: CfCli,
    journal: CommandJournal,
}

impl CommandExecutor {
    pub fn new(runner: SharedCommandRunner, cli: CfCli) -> Self {
        Self {
            runner,
            cli,
            journal: CommandJournal::default(),
        }
    }

    pub fn journal(&self) -> &CommandJournal {
        &self.journal
    }

    pub fn cf(
        &self,
        session: &SessionEnv,
        command: &CfCommand,
        timeout: Duration,
    ) -> HarnessResult<CommandResult> {
        let spec = self.cli.spec(command, session, timeout);
        self.run(session.identity().label(), &spec)
    }

    pub fn run(&self, identity: &str, spec: &CommandSpec) -> HarnessResult<CommandResult> {
        let rendered = spec.display();
        let started_at = Utc::now();
        debug!(identity, command = %rendered, "running command");

        let outcome = self.runner.run(spec);
        let (exit_code, duration, timed_out) = match &outcome {
            Ok(result) => (Some(result.exit_code), result.duration, false),
            Err(HarnessError::CommandTimeout { timeout, .. }) => (None, *timeout, true),
            Err(_) => (None, Duration::ZERO, false),
        };
        self.journal.record(CommandRecord {
            identity: identity.to_string(),
            command: rendered.clone(),
            exit_code,
            duration_ms: duration.as_millis() as u64,
            timed_out,
            started_at,
        });
        if let Ok(result) = &outcome {
            debug!(
                identity,
                command = %rendered,
                exit_code = result.exit_code,
                duration_ms = result.duration.as_millis() as u64,
                "command finished"
            );
        }
        outcome
    }
}
