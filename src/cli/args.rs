use crate::core::config::DispatchConfig;
use crate::core::inputs::{InputField, RawInputs};
use crate::core::types::OutputFormat;
use clap::{Args, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

/// The ten trigger inputs. Every value is a string, like a manual workflow
/// form; blank means "use the default".
#[derive(Args, Debug, Clone, Default)]
pub struct TriggerInputArgs {
    /// Directory holding the original macro files (default: originals)
    #[arg(long, value_name = "DIR", help_heading = "Trigger Inputs")]
    pub input_dir: Option<String>,

    /// Directory the merged bundle is written to (default: output)
    #[arg(long, value_name = "DIR", help_heading = "Trigger Inputs")]
    pub output_dir: Option<String>,

    /// Number of versions generated per group (default: 5)
    #[arg(long, value_name = "N", help_heading = "Trigger Inputs")]
    pub versions: Option<String>,

    /// Random seed; blank for a random run
    #[arg(long, value_name = "N", help_heading = "Trigger Inputs")]
    pub seed: Option<String>,

    /// "true" to overwrite existing output (default: false)
    #[arg(long, value_name = "BOOL", help_heading = "Trigger Inputs")]
    pub force: Option<String>,

    /// Files excluded per version, 0-3 (default: 1)
    #[arg(long, value_name = "N", help_heading = "Trigger Inputs")]
    pub exclude_count: Option<String>,

    /// "true" to insert pauses inside files (default: false)
    #[arg(long, value_name = "BOOL", help_heading = "Trigger Inputs")]
    pub intra_file_enabled: Option<String>,

    /// Maximum pauses inserted per file (default: 4)
    #[arg(long, value_name = "N", help_heading = "Trigger Inputs")]
    pub intra_file_max: Option<String>,

    /// Shortest pause in minutes (default: 1)
    #[arg(long, value_name = "MINUTES", help_heading = "Trigger Inputs")]
    pub intra_file_min_mins: Option<String>,

    /// Longest pause in minutes (default: 3)
    #[arg(long, value_name = "MINUTES", help_heading = "Trigger Inputs")]
    pub intra_file_max_mins: Option<String>,

    /// JSON object of input names to values, e.g. a workflow-dispatch payload
    #[arg(long = "inputs", value_name = "FILE", help_heading = "Trigger Inputs")]
    pub inputs_file: Option<PathBuf>,
}

impl TriggerInputArgs {
    /// Values given on the command line, keyed by field.
    pub fn to_raw(&self) -> RawInputs {
        let mut raw = RawInputs::new();
        let pairs = [
            (InputField::InputDir, &self.input_dir),
            (InputField::OutputDir, &self.output_dir),
            (InputField::Versions, &self.versions),
            (InputField::Seed, &self.seed),
            (InputField::Force, &self.force),
            (InputField::ExcludeCount, &self.exclude_count),
            (InputField::IntraFileEnabled, &self.intra_file_enabled),
            (InputField::IntraFileMax, &self.intra_file_max),
            (InputField::IntraFileMinMins, &self.intra_file_min_mins),
            (InputField::IntraFileMaxMins, &self.intra_file_max_mins),
        ];
        for (field, value) in pairs {
            if let Some(value) = value {
                raw.set(field, value.clone());
            }
        }
        raw
    }
}

/// Per-invocation overrides of the `[script]` config table.
#[derive(Args, Debug, Clone, Default)]
pub struct ScriptOverrideArgs {
    /// Merge script to run (default: merge_macros.py in the workspace)
    #[arg(long, value_name = "PATH", help_heading = "Script Overrides")]
    pub script: Option<PathBuf>,

    /// Interpreter for the script; pass "" to execute it directly (default: python3)
    #[arg(long, value_name = "PROGRAM", help_heading = "Script Overrides")]
    pub interpreter: Option<String>,

    /// Kill the script after this many seconds; 0 disables the limit
    #[arg(long, value_name = "SECONDS", help_heading = "Script Overrides")]
    pub timeout: Option<u64>,
}

impl ScriptOverrideArgs {
    pub fn apply(&self, config: &mut DispatchConfig) {
        if let Some(script) = &self.script {
            config.script.path = script.clone();
        }
        if let Some(interpreter) = &self.interpreter {
            config.script.interpreter = interpreter.clone();
        }
        if let Some(timeout) = self.timeout {
            config.script.timeout_seconds = timeout;
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct DispatchArgs {
    #[command(flatten)]
    pub inputs: TriggerInputArgs,

    #[command(flatten)]
    pub script: ScriptOverrideArgs,

    /// Print the job report as JSON instead of a summary
    #[arg(long, value_enum, default_value = "text", help_heading = "Output Options")]
    pub format: OutputFormat,
}

#[derive(Args, Debug, Clone)]
pub struct PlanArgs {
    #[command(flatten)]
    pub inputs: TriggerInputArgs,

    #[command(flatten)]
    pub script: ScriptOverrideArgs,

    /// Output format (text prints the command line)
    #[arg(long, value_enum, default_value = "text", help_heading = "Output Options")]
    pub format: OutputFormat,
}

#[derive(Args, Debug, Clone)]
pub struct InputsArgs {
    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Args, Debug, Clone)]
pub struct ArtifactsArgs {
    #[command(subcommand)]
    pub command: ArtifactsCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ArtifactsCommand {
    /// Show the artifacts archived by a run
    List {
        /// Run id printed by `dispatch`
        #[arg(value_name = "RUN_ID")]
        run_id: Uuid,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Delete runs older than the retention window
    Clean {
        /// Retention window, e.g. "30days" (default: [artifact] retention_days)
        #[arg(long, value_name = "DURATION")]
        older_than: Option<humantime::Duration>,
    },
}
