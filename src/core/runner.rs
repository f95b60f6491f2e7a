#![allow(clippy::result_large_err)] // Runner returns AppError so spawn diagnostics keep their context.

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;

const OUTPUT_CAPTURE_LIMIT_BYTES: usize = 1_048_576;

/// Where the child's stdout and stderr go.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputMode {
    #[default]
    Inherit,
    /// Child stdout goes to our stderr so our stdout carries only the report.
    StdoutToStderr,
    Capture,
}

/// A single process launch. Arguments are passed as an array; no shell is
/// involved.
#[derive(Clone, Debug)]
pub struct ScriptRequest {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub cwd: PathBuf,
    pub env: BTreeMap<String, String>,
    pub output: OutputMode,
    pub timeout: Option<Duration>,
}

impl ScriptRequest {
    pub fn new<P: Into<OsString>>(program: P, cwd: PathBuf) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd,
            env: BTreeMap::new(),
            output: OutputMode::Inherit,
            timeout: None,
        }
    }

    /// Shell-quoted rendering for logs and dry runs. Never executed.
    pub fn command_line(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|arg| shell_quote(&arg.to_string_lossy()))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn argv(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }
}

#[derive(Clone, Debug)]
pub struct ScriptOutput {
    /// Exit code, or -1 when the process was terminated by a signal.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

impl ScriptOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

#[async_trait]
pub trait ScriptRunner: Send + Sync + 'static {
    async fn run(&self, request: &ScriptRequest) -> Result<ScriptOutput, AppError>;
}

/// Runs the script with `tokio::process`.
pub struct TokioScriptRunner;

#[async_trait]
impl ScriptRunner for TokioScriptRunner {
    async fn run(&self, request: &ScriptRequest) -> Result<ScriptOutput, AppError> {
        let mut command = Command::new(&request.program);
        command.args(&request.args);
        command.current_dir(&request.cwd);
        command.envs(&request.env);
        command.stdin(Stdio::null());
        match request.output {
            OutputMode::Inherit => {
                command.stdout(Stdio::inherit());
                command.stderr(Stdio::inherit());
            }
            OutputMode::StdoutToStderr => {
                command.stdout(io::stderr());
                command.stderr(Stdio::inherit());
            }
            OutputMode::Capture => {
                command.stdout(Stdio::piped());
                command.stderr(Stdio::piped());
            }
        }
        command.kill_on_drop(true);

        tracing::debug!(
            program = %request.program.to_string_lossy(),
            cwd = %request.cwd.display(),
            output = ?request.output,
            "spawning script"
        );

        let start = Instant::now();
        let child = command.spawn().map_err(|err| {
            let mut error = AppError::with_source(
                ErrorCategory::ToolExecutionError,
                format!("failed to start {}", request.program.to_string_lossy()),
                Box::new(err),
            )
            .with_code("MD-RUN-001")
            .with_suggestion("Check [script] path and interpreter in merge-dispatch.toml");
            error.add_context("cwd", &request.cwd.display().to_string());
            error
        })?;

        let output = match request.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(result) => result?,
                Err(_) => {
                    return Err(AppError::new(
                        ErrorCategory::TimeoutError,
                        format!("script exceeded timeout of {}s", limit.as_secs()),
                    )
                    .with_code("MD-RUN-002"));
                }
            },
            None => child.wait_with_output().await?,
        };

        Ok(ScriptOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: limit_bytes(&output.stdout),
            stderr: limit_bytes(&output.stderr),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}

fn limit_bytes(bytes: &[u8]) -> String {
    let limit = OUTPUT_CAPTURE_LIMIT_BYTES.min(bytes.len());
    String::from_utf8_lossy(&bytes[..limit]).into_owned()
}

fn shell_quote(arg: &str) -> String {
    if arg.is_empty() {
        return "''".to_string();
    }
    let safe = arg.chars().all(|ch| {
        ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.' | '/' | ':' | '@' | '+' | '=')
    });
    if safe {
        return arg.to_string();
    }
    format!("'{}'", arg.replace('\'', "'\"'\"'"))
}
