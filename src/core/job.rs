#![allow(clippy::result_large_err)] // Job returns AppError so validation context reaches the CLI.

//! One manual merge job: run the script once, then always archive the bundle.

use crate::core::artifacts::{ArtifactRecord, ArtifactStore};
use crate::core::config::DispatchConfig;
use crate::core::error::AppError;
use crate::core::inputs::ResolvedInputs;
use crate::core::invocation::MergeInvocation;
use crate::core::runner::{OutputMode, ScriptRequest, ScriptRunner};
use crate::core::types::{ErrorCategory, ErrorSeverity, JobStatus, StepStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

pub const JOB_REPORT_FILE: &str = "job.json";

/// Exit code recorded when the script could not be started.
pub const SPAWN_FAILURE_EXIT_CODE: i32 = 127;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MainStepReport {
    pub status: StepStatus,
    /// Script exit code; -1 when killed by a signal or the timeout.
    pub exit_code: i32,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadStepReport {
    pub status: StepStatus,
    pub artifact: String,
    pub source: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<ArtifactRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Written to `<artifact root>/<run_id>/job.json` after every started job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub inputs: ResolvedInputs,
    pub program: String,
    pub argv: Vec<String>,
    pub command_line: String,
    pub main_step: MainStepReport,
    pub upload_step: UploadStepReport,
    pub status: JobStatus,
}

impl JobReport {
    /// Process exit status for the job. Only the main step counts.
    pub fn exit_code(&self) -> i32 {
        match self.main_step.exit_code {
            code if code < 0 => 1,
            code => code,
        }
    }
}

/// A validated job that has not been executed yet.
#[derive(Debug, Clone)]
pub struct PreparedJob {
    pub invocation: MergeInvocation,
    pub request: ScriptRequest,
    pub bundle_path: PathBuf,
}

pub struct Job {
    workspace: PathBuf,
    config: DispatchConfig,
    runner: Arc<dyn ScriptRunner>,
    store: ArtifactStore,
    output: OutputMode,
}

impl Job {
    pub fn new(workspace: PathBuf, config: DispatchConfig, runner: Arc<dyn ScriptRunner>) -> Self {
        let store = ArtifactStore::new(workspace.clone(), &config.artifact);
        Job {
            workspace,
            config,
            runner,
            store,
            output: OutputMode::Inherit,
        }
    }

    /// Route the script's console output, e.g. away from stdout when the
    /// report itself is printed there.
    pub fn with_output_mode(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Validate inputs and build the process request without running it.
    pub fn prepare(&self, inputs: &ResolvedInputs) -> Result<PreparedJob, AppError> {
        let invocation = MergeInvocation::from_inputs(inputs)?;
        let script = resolve_against(&self.workspace, &self.config.script.path);

        let mut request = if self.config.script.interpreter.trim().is_empty() {
            ScriptRequest::new(script.into_os_string(), self.workspace.clone())
        } else {
            let mut request = ScriptRequest::new(
                self.config.script.interpreter.trim(),
                self.workspace.clone(),
            );
            request.args.push(script.into_os_string());
            request
        };
        request.args.extend(invocation.to_args());
        request.timeout = self.config.script.timeout();
        request.output = self.output;

        let bundle_path = invocation.output_file(&self.workspace, &self.config.artifact.file_name);
        Ok(PreparedJob {
            invocation,
            request,
            bundle_path,
        })
    }

    /// Run the job. Errors are returned only when inputs fail validation;
    /// script and upload failures are recorded in the report.
    pub async fn run(&self, inputs: ResolvedInputs) -> Result<JobReport, AppError> {
        let prepared = self.prepare(&inputs)?;
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("job", run_id = %run_id);
        Ok(self.execute(run_id, inputs, prepared).instrument(span).await)
    }

    async fn execute(&self, run_id: Uuid, inputs: ResolvedInputs, prepared: PreparedJob) -> JobReport {
        let started_at = Utc::now();
        let command_line = prepared.request.command_line();
        tracing::info!(command = %command_line, "starting merge script");
        tracing::debug!(argv = ?prepared.request.argv(), cwd = %prepared.request.cwd.display());

        let main_step = self.run_main_step(&prepared.request).await;
        let upload_step = self.run_upload_step(&run_id, &prepared.bundle_path);

        let status = if main_step.status == StepStatus::Succeeded {
            JobStatus::Succeeded
        } else {
            JobStatus::Failed
        };

        let report = JobReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            inputs,
            program: prepared.request.program.to_string_lossy().into_owned(),
            argv: prepared.request.argv(),
            command_line,
            main_step,
            upload_step,
            status,
        };

        if let Err(err) = self.store.write_run_file(&run_id, JOB_REPORT_FILE, &report) {
            tracing::warn!(error = %err, "failed to write job report");
        }

        tracing::info!(
            status = ?report.status,
            exit_code = report.main_step.exit_code,
            upload = ?report.upload_step.status,
            "job finished"
        );
        report
    }

    async fn run_main_step(&self, request: &ScriptRequest) -> MainStepReport {
        match self.runner.run(request).await {
            Ok(output) if output.success() => MainStepReport {
                status: StepStatus::Succeeded,
                exit_code: output.exit_code,
                duration_ms: output.duration_ms,
                error: None,
            },
            Ok(output) => {
                tracing::error!(exit_code = output.exit_code, "merge script failed");
                MainStepReport {
                    status: StepStatus::Failed,
                    exit_code: output.exit_code,
                    duration_ms: output.duration_ms,
                    error: None,
                }
            }
            Err(err) => {
                tracing::error!(code = %err.code, error = %err.message, "merge script did not complete");
                let exit_code = match err.category {
                    ErrorCategory::TimeoutError => -1,
                    _ => SPAWN_FAILURE_EXIT_CODE,
                };
                MainStepReport {
                    status: StepStatus::Failed,
                    exit_code,
                    duration_ms: 0,
                    error: Some(err.to_string()),
                }
            }
        }
    }

    fn run_upload_step(&self, run_id: &Uuid, bundle_path: &Path) -> UploadStepReport {
        let name = self.config.artifact.name.clone();
        match self.store.upload(run_id, &name, bundle_path) {
            Ok(record) => UploadStepReport {
                status: StepStatus::Succeeded,
                artifact: name,
                source: bundle_path.to_path_buf(),
                record: Some(record),
                error: None,
            },
            Err(err) => {
                match err.severity() {
                    ErrorSeverity::Warning => tracing::warn!(
                        artifact = %name,
                        code = %err.code,
                        error = %err.message,
                        "upload step failed"
                    ),
                    ErrorSeverity::Error => tracing::error!(
                        artifact = %name,
                        code = %err.code,
                        error = %err.message,
                        "upload step failed"
                    ),
                }
                UploadStepReport {
                    status: StepStatus::Failed,
                    artifact: name,
                    source: bundle_path.to_path_buf(),
                    record: None,
                    error: Some(err.to_string()),
                }
            }
        }
    }
}

fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
