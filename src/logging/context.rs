use crate::cli::{ArtifactsCommand, Command};
use std::env;

/// Execution contexts that influence how logging is routed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionContext {
    /// A developer running the job from a terminal.
    LocalDev,
    /// A CI runner; no colours, everything else as local.
    Ci,
    /// Commands that only print information and must keep stdout clean.
    ReadOnly,
}

impl ExecutionContext {
    /// Returns `true` when ANSI colours may be used on the console.
    pub fn uses_ansi(self) -> bool {
        matches!(self, ExecutionContext::LocalDev)
    }

    /// Returns `true` when the file sink should be opened.
    pub fn writes_log_file(self) -> bool {
        !matches!(self, ExecutionContext::ReadOnly)
    }
}

/// Derive the active execution context from a parsed CLI command and the environment.
pub fn detect_context(command: &Command) -> ExecutionContext {
    match command {
        Command::Plan(_) | Command::Inputs(_) => ExecutionContext::ReadOnly,
        Command::Artifacts(args) if matches!(args.command, ArtifactsCommand::List { .. }) => {
            ExecutionContext::ReadOnly
        }
        Command::Dispatch(_) | Command::Artifacts(_) => {
            if running_in_ci() {
                ExecutionContext::Ci
            } else {
                ExecutionContext::LocalDev
            }
        }
    }
}

/// `CI=true` or `GITHUB_ACTIONS=true`, as set by hosted runners.
pub fn running_in_ci() -> bool {
    ["CI", "GITHUB_ACTIONS"].iter().any(|key| {
        env::var(key)
            .map(|value| value.trim().eq_ignore_ascii_case("true") || value.trim() == "1")
            .unwrap_or(false)
    })
}
