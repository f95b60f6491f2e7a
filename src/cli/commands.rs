use crate::{
    cli::args::{ArtifactsArgs, ArtifactsCommand, DispatchArgs, InputsArgs, PlanArgs},
    cli::context::CommandContext,
    core::{
        artifacts::ArtifactStore,
        inputs::InputField,
        job::{Job, JobReport},
        runner::{OutputMode, TokioScriptRunner},
        types::{OutputFormat, StepStatus},
    },
    Result,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Run the merge job once. Returns the script's exit status.
pub async fn dispatch(mut ctx: CommandContext, args: DispatchArgs) -> Result<i32> {
    args.script.apply(&mut ctx.config);
    let inputs = ctx.collect_inputs(&args.inputs)?;

    let output = match args.format {
        OutputFormat::Text => OutputMode::Inherit,
        OutputFormat::Json => OutputMode::StdoutToStderr,
    };
    let job = Job::new(
        ctx.workspace.clone(),
        ctx.config.clone(),
        Arc::new(TokioScriptRunner),
    )
    .with_output_mode(output);
    let report = job.run(inputs).await?;

    match args.format {
        OutputFormat::Text => print_report_summary(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(report.exit_code())
}

fn print_report_summary(report: &JobReport) {
    println!("Run ID: {}", report.run_id);
    println!("Status: {:?}", report.status);
    println!("Exit code: {}", report.main_step.exit_code);
    match report.upload_step.status {
        StepStatus::Succeeded => {
            if let Some(record) = &report.upload_step.record {
                println!(
                    "Artifact {}: {} ({} bytes, sha256 {})",
                    record.name,
                    record.path.display(),
                    record.size_bytes,
                    record.sha256
                );
            }
        }
        _ => println!(
            "Artifact {}: not uploaded ({})",
            report.upload_step.artifact,
            report.upload_step.error.as_deref().unwrap_or("unknown error")
        ),
    }
}

/// Resolve and validate inputs, then print what `dispatch` would execute.
pub async fn plan(mut ctx: CommandContext, args: PlanArgs) -> Result<i32> {
    args.script.apply(&mut ctx.config);
    let inputs = ctx.collect_inputs(&args.inputs)?;

    let job = Job::new(
        ctx.workspace.clone(),
        ctx.config.clone(),
        Arc::new(TokioScriptRunner),
    );
    let prepared = job.prepare(&inputs)?;

    match args.format {
        OutputFormat::Text => println!("{}", prepared.request.command_line()),
        OutputFormat::Json => {
            let inputs_json: serde_json::Map<String, serde_json::Value> = inputs
                .iter()
                .map(|(field, value)| (field.name().to_string(), json!(value)))
                .collect();
            let payload = json!({
                "program": prepared.request.program.to_string_lossy(),
                "argv": prepared.request.argv(),
                "command_line": prepared.request.command_line(),
                "cwd": prepared.request.cwd,
                "inputs": inputs_json,
                "invocation": prepared.invocation,
                "artifact": {
                    "name": ctx.config.artifact.name,
                    "source": prepared.bundle_path,
                },
            });
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
    }
    Ok(0)
}

/// Describe the trigger inputs and their defaults.
pub async fn inputs(args: InputsArgs) -> Result<i32> {
    match args.format {
        OutputFormat::Text => {
            println!(
                "{:<22} {:<24} {:<11} {:<22} DESCRIPTION",
                "INPUT", "FLAG", "DEFAULT", "TYPE"
            );
            for field in InputField::ALL {
                let default = match field.default_value() {
                    "" => "(unset)",
                    value => value,
                };
                println!(
                    "{:<22} {:<24} {:<11} {:<22} {}",
                    field.name(),
                    field.flag(),
                    default,
                    field.kind().to_string(),
                    field.description()
                );
            }
        }
        OutputFormat::Json => {
            let fields: Vec<_> = InputField::ALL
                .iter()
                .map(|field| {
                    json!({
                        "name": field.name(),
                        "flag": field.flag(),
                        "env": field.env_var(),
                        "default": field.default_value(),
                        "kind": field.kind(),
                        "description": field.description(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&fields)?);
        }
    }
    Ok(0)
}

/// `artifacts list` and `artifacts clean`.
pub async fn artifacts(ctx: CommandContext, args: ArtifactsArgs) -> Result<i32> {
    let store = ArtifactStore::new(ctx.workspace.clone(), &ctx.config.artifact);
    match args.command {
        ArtifactsCommand::List { run_id, format } => {
            let records = store.list(&run_id)?;
            match format {
                OutputFormat::Text => {
                    if records.is_empty() {
                        println!("Run {} has no archived artifacts", run_id);
                    }
                    for record in &records {
                        println!(
                            "{}\t{}\t{} bytes\tsha256:{}\t{}",
                            record.name,
                            record.path.display(),
                            record.size_bytes,
                            record.sha256,
                            record.uploaded_at.to_rfc3339()
                        );
                    }
                }
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
            }
        }
        ArtifactsCommand::Clean { older_than } => {
            let window: Duration = older_than
                .map(Into::into)
                .unwrap_or_else(|| ctx.config.artifact.retention());
            let summary = store.clean_older_than(window)?;
            tracing::info!(
                removed = summary.removed_runs.len(),
                freed_bytes = summary.freed_bytes,
                "artifact retention applied"
            );
            println!(
                "Removed {} run(s) older than {}, freed {} bytes",
                summary.removed_runs.len(),
                humantime::format_duration(window),
                summary.freed_bytes
            );
        }
    }
    Ok(0)
}
