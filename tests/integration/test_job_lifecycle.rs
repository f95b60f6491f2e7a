use async_trait::async_trait;
use merge_dispatch::core::config::DispatchConfig;
use merge_dispatch::core::error::AppError;
use merge_dispatch::core::inputs::{InputField, RawInputs, ResolvedInputs};
use merge_dispatch::core::job::{Job, JobReport, JOB_REPORT_FILE, SPAWN_FAILURE_EXIT_CODE};
use merge_dispatch::core::runner::{ScriptOutput, ScriptRequest, ScriptRunner, TokioScriptRunner};
use merge_dispatch::core::types::{ErrorCategory, JobStatus, StepStatus};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Runner that optionally writes the bundle, then returns a fixed outcome.
struct FakeRunner {
    write_bundle: bool,
    outcome: fn() -> Result<ScriptOutput, AppError>,
    calls: Mutex<Vec<ScriptRequest>>,
}

impl FakeRunner {
    fn new(write_bundle: bool, outcome: fn() -> Result<ScriptOutput, AppError>) -> Arc<Self> {
        Arc::new(FakeRunner {
            write_bundle,
            outcome,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ScriptRunner for FakeRunner {
    async fn run(&self, request: &ScriptRequest) -> Result<ScriptOutput, AppError> {
        self.calls.lock().unwrap().push(request.clone());
        if self.write_bundle {
            let output_dir = request.cwd.join(flag_value(request, "--output-dir"));
            fs::create_dir_all(&output_dir).unwrap();
            fs::write(output_dir.join("merged_bundle.zip"), b"bundle").unwrap();
        }
        (self.outcome)()
    }
}

fn flag_value(request: &ScriptRequest, flag: &str) -> String {
    let index = request
        .args
        .iter()
        .position(|arg| arg == flag)
        .expect("flag should be present");
    request.args[index + 1].to_string_lossy().into_owned()
}

fn exit(code: i32) -> Result<ScriptOutput, AppError> {
    Ok(ScriptOutput {
        exit_code: code,
        stdout: String::new(),
        stderr: String::new(),
        duration_ms: 5,
    })
}

fn read_report(job: &Job, report: &JobReport) -> JobReport {
    let path = job.store().run_dir(&report.run_id).join(JOB_REPORT_FILE);
    serde_json::from_slice(&fs::read(path).expect("job.json should exist"))
        .expect("job.json should parse")
}

fn new_job(workspace: &Path, runner: Arc<dyn ScriptRunner>) -> Job {
    Job::new(workspace.to_path_buf(), DispatchConfig::default(), runner)
}

#[tokio::test]
async fn test_successful_run_archives_bundle() {
    let temp_dir = TempDir::new().unwrap();
    let runner = FakeRunner::new(true, || exit(0));
    let job = new_job(temp_dir.path(), runner.clone());

    let report = job.run(ResolvedInputs::default()).await.unwrap();

    assert_eq!(runner.calls(), 1);
    assert_eq!(report.status, JobStatus::Succeeded);
    assert_eq!(report.exit_code(), 0);
    assert_eq!(report.main_step.status, StepStatus::Succeeded);
    assert_eq!(report.upload_step.status, StepStatus::Succeeded);
    let record = report.upload_step.record.as_ref().unwrap();
    assert_eq!(record.name, "merged-zip");
    assert_eq!(record.size_bytes, 6);
    assert_eq!(read_report(&job, &report), report);
}

#[tokio::test]
async fn test_failed_run_with_bundle_still_uploads() {
    let temp_dir = TempDir::new().unwrap();
    let runner = FakeRunner::new(true, || exit(3));
    let job = new_job(temp_dir.path(), runner);

    let report = job.run(ResolvedInputs::default()).await.unwrap();

    assert_eq!(report.status, JobStatus::Failed);
    assert_eq!(report.exit_code(), 3);
    assert_eq!(report.upload_step.status, StepStatus::Succeeded);
}

#[tokio::test]
async fn test_missing_bundle_fails_only_upload_step() {
    let temp_dir = TempDir::new().unwrap();
    let runner = FakeRunner::new(false, || exit(0));
    let job = new_job(temp_dir.path(), runner);

    let report = job.run(ResolvedInputs::default()).await.unwrap();

    assert_eq!(report.status, JobStatus::Succeeded);
    assert_eq!(report.exit_code(), 0);
    assert_eq!(report.upload_step.status, StepStatus::Failed);
    assert!(report
        .upload_step
        .error
        .as_deref()
        .unwrap()
        .contains("MD-ART-001"));
}

#[tokio::test]
async fn test_spawn_failure_is_reported_and_upload_attempted() {
    let temp_dir = TempDir::new().unwrap();
    let runner = FakeRunner::new(false, || {
        Err(AppError::new(ErrorCategory::ToolExecutionError, "no such file").with_code("MD-RUN-001"))
    });
    let job = new_job(temp_dir.path(), runner);

    let report = job.run(ResolvedInputs::default()).await.unwrap();

    assert_eq!(report.main_step.exit_code, SPAWN_FAILURE_EXIT_CODE);
    assert_eq!(report.exit_code(), 127);
    assert_eq!(report.upload_step.status, StepStatus::Failed);
    assert!(report.main_step.error.as_deref().unwrap().contains("MD-RUN-001"));
}

#[tokio::test]
async fn test_timeout_maps_to_exit_code_one() {
    let temp_dir = TempDir::new().unwrap();
    let runner = FakeRunner::new(false, || {
        Err(AppError::new(ErrorCategory::TimeoutError, "too slow").with_code("MD-RUN-002"))
    });
    let job = new_job(temp_dir.path(), runner);

    let report = job.run(ResolvedInputs::default()).await.unwrap();
    assert_eq!(report.main_step.exit_code, -1);
    assert_eq!(report.exit_code(), 1);
}

#[tokio::test]
async fn test_validation_failure_runs_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let runner = FakeRunner::new(true, || exit(0));
    let job = new_job(temp_dir.path(), runner.clone());
    let inputs = RawInputs::new()
        .with(InputField::IntraFileMinMins, "9")
        .with(InputField::IntraFileMaxMins, "2")
        .resolve();

    let err = job.run(inputs).await.unwrap_err();

    assert_eq!(err.category, ErrorCategory::ValidationError);
    assert_eq!(runner.calls(), 0);
    assert!(!temp_dir.path().join(".merge-dispatch").exists());
}

#[tokio::test]
async fn test_report_records_inputs_and_argv() {
    let temp_dir = TempDir::new().unwrap();
    let runner = FakeRunner::new(true, || exit(0));
    let job = new_job(temp_dir.path(), runner);
    let inputs = RawInputs::new()
        .with(InputField::OutputDir, "dist")
        .with(InputField::Seed, "42")
        .resolve();

    let report = job.run(inputs).await.unwrap();

    assert_eq!(report.program, "python3");
    assert_eq!(report.inputs.get(InputField::Seed), "42");
    assert!(report.argv.windows(2).any(|pair| pair == ["--seed", "42"]));
    assert!(report.upload_step.source.ends_with("dist/merged_bundle.zip"));
    assert!(report.finished_at >= report.started_at);
}

#[cfg(unix)]
#[tokio::test]
async fn test_real_script_through_sh() {
    let temp_dir = TempDir::new().unwrap();
    let script = temp_dir.path().join("merge_macros.sh");
    fs::write(
        &script,
        r#"
out=""
while [ $# -gt 0 ]; do
  case "$1" in
    --output-dir) out="$2"; shift 2 ;;
    *) shift ;;
  esac
done
mkdir -p "$out"
printf 'PK' > "$out/merged_bundle.zip"
exit 5
"#,
    )
    .unwrap();

    let mut config = DispatchConfig::default();
    config.script.path = script;
    config.script.interpreter = "sh".to_string();
    let job = Job::new(
        temp_dir.path().to_path_buf(),
        config,
        Arc::new(TokioScriptRunner),
    );

    let report = job.run(ResolvedInputs::default()).await.unwrap();

    assert_eq!(report.exit_code(), 5);
    assert_eq!(report.status, JobStatus::Failed);
    assert_eq!(report.upload_step.status, StepStatus::Succeeded);
    assert_eq!(report.upload_step.record.as_ref().unwrap().size_bytes, 2);
}
