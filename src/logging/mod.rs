pub mod config;
pub mod context;
pub mod layers;

pub use context::{detect_context, ExecutionContext};
pub use layers::console::ConsoleOutput;

use crate::cli::Args;
use crate::logging::config::LoggingConfig;
use crate::logging::layers::{console, file};
use crate::Result;
use anyhow::{anyhow, Context};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::Registry;

static LOGGER_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Guards that keep logging sinks active for the duration of the command.
pub struct LoggingGuard {
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
    context: ExecutionContext,
    console_output: ConsoleOutput,
    log_file_path: Option<PathBuf>,
}

impl LoggingGuard {
    pub fn context(&self) -> ExecutionContext {
        self.context
    }

    /// Returns the console output configuration used during initialization.
    pub fn console_output(&self) -> ConsoleOutput {
        self.console_output
    }

    /// Returns the log file path when the file sink is active.
    pub fn log_file_path(&self) -> Option<&Path> {
        self.log_file_path.as_deref()
    }
}

/// Initialize the logging framework for the parsed command line.
///
/// Filters come from `RUST_LOG` or `[logging] default_level`. The file sink is
/// skipped for read-only commands and when the workspace is not an existing
/// directory. Errors when invoked more than once per process unless tests
/// explicitly reset the guard.
pub fn init(args: &Args) -> Result<LoggingGuard> {
    if LOGGER_INITIALIZED
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return Err(anyhow!("logging already initialized"));
    }

    let context = detect_context(&args.command);
    let workspace_root = resolve_workspace_path(args.workspace.as_deref())?;
    let config = LoggingConfig::load(&workspace_root, args.config.as_deref())?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.default_level))
        .context("failed to configure tracing level")?;

    type BaseRegistry = Registry;
    type FileSubscriber = file::FileLayerStack<BaseRegistry>;

    // A missing workspace is reported by the command, never created here.
    let file_enabled =
        config.enable_file && context.writes_log_file() && workspace_root.is_dir();
    let log_file_path = file::log_file_path(&config, &workspace_root)?;
    let (file_layer, file_guard) = file::file_layer::<BaseRegistry>(&log_file_path, file_enabled)?;

    let console_output = console::select_console_output(context, config.console_output);
    let console_layer = console::console_layer::<FileSubscriber>(console_output, context.uses_ansi());

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .with(env_filter)
        .try_init()
        .context("failed to install tracing subscriber")?;

    tracing::debug!(
        context = ?context,
        console = %console_output,
        log_file = %log_file_path.display(),
        file_enabled,
        "logging initialized"
    );

    Ok(LoggingGuard {
        _file_guard: file_guard,
        context,
        console_output,
        log_file_path: file_enabled.then_some(log_file_path),
    })
}

/// Workspace used to locate config and logs; relative paths are taken from the cwd.
pub fn resolve_workspace_path(workspace: Option<&Path>) -> Result<PathBuf> {
    let cwd = env::current_dir().context("failed to read current directory")?;
    Ok(match workspace {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => cwd.join(path),
        None => cwd,
    })
}

#[cfg(test)]
/// Reset the initialization guard so tests can reconfigure logging multiple times.
pub fn reset_for_tests() {
    LOGGER_INITIALIZED.store(false, Ordering::SeqCst);
}
