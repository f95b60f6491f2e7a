pub mod args;
pub mod commands;
pub mod context;

pub use args::{
    ArtifactsArgs, ArtifactsCommand, DispatchArgs, InputsArgs, PlanArgs, ScriptOverrideArgs,
    TriggerInputArgs,
};
pub use context::CommandContext;

use crate::core::error::{AppError, DefaultErrorReporter, ErrorReporter};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{name} {version}\n\
{about-with-newline}\n\
USAGE:\n    {usage}\n\
\nOPTIONS:\n{options}\n\
COMMANDS:\n{subcommands}\n";

#[derive(Parser, Debug)]
#[command(name = "merge-dispatch")]
#[command(version = crate::VERSION)]
#[command(about = "Manually triggered merge job for merge_macros.py")]
#[command(help_template = HELP_TEMPLATE)]
#[command(
    after_long_help = "Typical flow: inspect inputs, plan to check the command line, dispatch, then list the run's artifacts."
)]
pub struct Args {
    /// Workspace the script runs in (default: current directory)
    #[arg(long, global = true, value_name = "DIR")]
    pub workspace: Option<PathBuf>,

    /// Path to config file (default: {workspace}/merge-dispatch.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(
        about = "Run the merge job",
        long_about = "Dispatch resolves the trigger inputs, runs the merge script once, then always archives <output_dir>/merged_bundle.zip as the merged-zip artifact. The exit status is the script's.",
        after_help = "Example:\n    merge-dispatch dispatch --versions 3 --seed 42 --force true"
    )]
    Dispatch(DispatchArgs),
    #[command(
        about = "Show the command dispatch would run",
        long_about = "Plan resolves and validates the trigger inputs and prints the script invocation without executing anything.",
        after_help = "Example:\n    merge-dispatch plan --inputs payload.json --format json"
    )]
    Plan(PlanArgs),
    #[command(
        about = "Describe the trigger inputs",
        long_about = "Inputs lists every trigger input with its flag, default, type and INPUT_* environment variable.",
        after_help = "Example:\n    merge-dispatch inputs --format json"
    )]
    Inputs(InputsArgs),
    #[command(
        about = "Inspect or prune archived artifacts",
        long_about = "Artifacts lists what a run archived or removes runs older than the retention window.",
        after_help = "Examples:\n    merge-dispatch artifacts list 5f0c6a3e-8d7e-4a53-9d5b-1f2e3d4c5b6a\n    merge-dispatch artifacts clean --older-than 30days"
    )]
    Artifacts(ArtifactsArgs),
}

/// Execute the parsed command and return the process exit status.
pub async fn run(args: Args) -> crate::Result<i32> {
    let Args {
        workspace,
        config,
        command,
    } = args;
    let load = || CommandContext::load(workspace.as_deref(), config.as_deref());

    match command {
        Command::Dispatch(dispatch_args) => commands::dispatch(load()?, dispatch_args).await,
        Command::Plan(plan_args) => commands::plan(load()?, plan_args).await,
        Command::Inputs(inputs_args) => commands::inputs(inputs_args).await,
        Command::Artifacts(artifacts_args) => commands::artifacts(load()?, artifacts_args).await,
    }
}

/// Print a failed command's error and map it to an exit status.
pub fn report_failure(error: anyhow::Error) -> i32 {
    let app_error = match error.downcast::<AppError>() {
        Ok(app_error) => app_error,
        Err(other) => AppError::from(other),
    };
    DefaultErrorReporter::new().report_error(&app_error);
    app_error.exit_code()
}
