#![allow(clippy::result_large_err)] // Artifact store returns AppError to preserve structured diagnostic context.

use crate::core::config::loader::is_plain_name;
use crate::core::config::ArtifactConfig;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use uuid::Uuid;

pub const MANIFEST_FILE: &str = "manifest.json";

const COPY_BUFFER_BYTES: usize = 64 * 1024;

/// Metadata written next to every archived artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub name: String,
    pub file_name: String,
    pub source: PathBuf,
    /// Archived copy, relative to the workspace when it lives inside it.
    pub path: PathBuf,
    pub size_bytes: u64,
    pub sha256: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Result of a retention sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupSummary {
    pub removed_runs: Vec<String>,
    pub freed_bytes: u64,
}

/// Local artifact store: `<root>/<run_id>/<artifact name>/<file>`.
pub struct ArtifactStore {
    workspace_root: PathBuf,
    artifact_root: PathBuf,
    max_artifact_bytes: u64,
}

impl ArtifactStore {
    pub fn new(workspace_root: PathBuf, settings: &ArtifactConfig) -> Self {
        let artifact_root = if settings.base_path.is_absolute() {
            settings.base_path.clone()
        } else {
            workspace_root.join(&settings.base_path)
        };
        ArtifactStore {
            workspace_root,
            artifact_root,
            max_artifact_bytes: settings.max_artifact_bytes,
        }
    }

    pub fn artifact_root(&self) -> &Path {
        &self.artifact_root
    }

    pub fn run_dir(&self, run_id: &Uuid) -> PathBuf {
        self.artifact_root.join(run_id.to_string())
    }

    /// Archive `source` under `name` for the given run.
    pub fn upload(
        &self,
        run_id: &Uuid,
        name: &str,
        source: &Path,
    ) -> Result<ArtifactRecord, AppError> {
        if !is_plain_name(name) {
            return Err(AppError::new(
                ErrorCategory::ArtifactError,
                format!("invalid artifact name '{}'", name),
            )
            .with_code("MD-ART-003"));
        }

        let metadata = match fs::metadata(source) {
            Ok(metadata) if metadata.is_file() => metadata,
            _ => {
                let mut err = AppError::new(
                    ErrorCategory::ArtifactError,
                    format!("no file found at {}", source.display()),
                )
                .with_code("MD-ART-001")
                .with_suggestion("The merge script did not produce its bundle");
                err.add_context("artifact", name);
                return Err(err);
            }
        };

        if metadata.len() > self.max_artifact_bytes {
            return Err(AppError::new(
                ErrorCategory::ArtifactError,
                format!(
                    "{} is {} bytes, above max_artifact_bytes {}",
                    source.display(),
                    metadata.len(),
                    self.max_artifact_bytes
                ),
            )
            .with_code("MD-ART-002"));
        }

        let file_name = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                AppError::new(
                    ErrorCategory::ArtifactError,
                    format!("{} has no file name", source.display()),
                )
                .with_code("MD-ART-001")
            })?;
        if file_name == MANIFEST_FILE {
            return Err(AppError::new(
                ErrorCategory::ArtifactError,
                format!("artifact file name '{}' is reserved", file_name),
            )
            .with_code("MD-ART-003"));
        }

        let artifact_dir = self.run_dir(run_id).join(name);
        fs::create_dir_all(&artifact_dir).map_err(|err| {
            AppError::new(
                ErrorCategory::IoError,
                format!(
                    "failed to create artifact path {}: {}",
                    artifact_dir.display(),
                    err
                ),
            )
        })?;

        let destination = artifact_dir.join(&file_name);
        let (size_bytes, sha256) = copy_with_digest(source, &destination)?;

        let record = ArtifactRecord {
            name: name.to_string(),
            file_name,
            source: source.to_path_buf(),
            path: self.relative_to_workspace(&destination),
            size_bytes,
            sha256,
            uploaded_at: Utc::now(),
        };
        let manifest = serde_json::to_vec_pretty(&record)?;
        atomic_write(&artifact_dir.join(MANIFEST_FILE), &manifest)?;

        tracing::info!(
            artifact = name,
            path = %destination.display(),
            size_bytes,
            "artifact archived"
        );
        Ok(record)
    }

    /// Write a JSON document into the run directory.
    pub fn write_run_file<T: Serialize>(
        &self,
        run_id: &Uuid,
        file_name: &str,
        value: &T,
    ) -> Result<PathBuf, AppError> {
        let path = self.run_dir(run_id).join(file_name);
        let bytes = serde_json::to_vec_pretty(value)?;
        atomic_write(&path, &bytes)?;
        Ok(path)
    }

    /// Artifacts archived for a run, sorted by name.
    pub fn list(&self, run_id: &Uuid) -> Result<Vec<ArtifactRecord>, AppError> {
        let run_dir = self.run_dir(run_id);
        if !run_dir.is_dir() {
            return Err(AppError::new(
                ErrorCategory::ArtifactError,
                format!("no artifacts recorded for run {}", run_id),
            )
            .with_code("MD-ART-004"));
        }
        let mut records = Vec::new();
        for entry in fs::read_dir(&run_dir)? {
            let manifest = entry?.path().join(MANIFEST_FILE);
            if !manifest.is_file() {
                continue;
            }
            let bytes = fs::read(&manifest)?;
            records.push(serde_json::from_slice::<ArtifactRecord>(&bytes)?);
        }
        records.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(records)
    }

    /// Remove run directories whose newest file is older than `older_than`.
    ///
    /// Only directories named by a run id are considered; anything else under
    /// the artifact root is left alone.
    pub fn clean_older_than(&self, older_than: Duration) -> Result<CleanupSummary, AppError> {
        let mut summary = CleanupSummary::default();
        if !self.artifact_root.is_dir() {
            return Ok(summary);
        }
        let now = SystemTime::now();
        for entry in fs::read_dir(&self.artifact_root)? {
            let run_dir = entry?.path();
            if !run_dir.is_dir() || !is_run_dir_name(&run_dir) {
                continue;
            }
            let files = collect_artifact_files(&run_dir)?;
            let newest = files
                .iter()
                .map(|file| file.modified)
                .max()
                .unwrap_or(SystemTime::UNIX_EPOCH);
            let age = now
                .duration_since(newest)
                .unwrap_or_else(|_| Duration::from_secs(0));
            if age < older_than {
                continue;
            }
            fs::remove_dir_all(&run_dir).map_err(|err| {
                AppError::new(
                    ErrorCategory::IoError,
                    format!("failed to remove {}: {}", run_dir.display(), err),
                )
            })?;
            summary.freed_bytes += files.iter().map(|file| file.size).sum::<u64>();
            if let Some(name) = run_dir.file_name() {
                summary.removed_runs.push(name.to_string_lossy().into_owned());
            }
        }
        summary.removed_runs.sort();
        Ok(summary)
    }

    fn relative_to_workspace(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.workspace_root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

fn is_run_dir_name(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| Uuid::parse_str(name).is_ok())
}

/// Sibling temp path unique to one write, so concurrent targets in the same
/// directory never share it.
fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()))
}

/// Stream `source` into `destination` through a temp file, hashing as it goes.
fn copy_with_digest(source: &Path, destination: &Path) -> Result<(u64, String), AppError> {
    let mut reader = File::open(source).map_err(|err| {
        AppError::new(
            ErrorCategory::IoError,
            format!("failed to open {}: {}", source.display(), err),
        )
    })?;
    let tmp = temp_path_for(destination);
    let result = stream_to_temp(&mut reader, &tmp)
        .and_then(|digest| rename_into_place(&tmp, destination).map(|()| digest));
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn stream_to_temp(reader: &mut File, tmp: &Path) -> Result<(u64, String), AppError> {
    let mut writer = File::create(tmp).map_err(|err| {
        AppError::new(
            ErrorCategory::IoError,
            format!("failed to create {}: {}", tmp.display(), err),
        )
    })?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; COPY_BUFFER_BYTES];
    let mut total = 0u64;
    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
        writer.write_all(&buffer[..read])?;
        total += read as u64;
    }
    writer.sync_all()?;
    Ok((total, hex::encode(hasher.finalize())))
}

fn rename_into_place(tmp: &Path, destination: &Path) -> Result<(), AppError> {
    fs::rename(tmp, destination).map_err(|err| {
        AppError::new(
            ErrorCategory::IoError,
            format!(
                "failed to rename {} -> {}: {}",
                tmp.display(),
                destination.display(),
                err
            ),
        )
    })
}

pub fn compute_sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn atomic_write(path: &Path, data: &[u8]) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| {
            AppError::new(
                ErrorCategory::IoError,
                format!("failed to create {}: {}", parent.display(), err),
            )
        })?;
    }
    let tmp = temp_path_for(path);
    let result = fs::write(&tmp, data)
        .map_err(|err| {
            AppError::new(
                ErrorCategory::IoError,
                format!("failed to write {}: {}", tmp.display(), err),
            )
        })
        .and_then(|()| rename_into_place(&tmp, path));
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

struct ArtifactFile {
    size: u64,
    modified: SystemTime,
}

fn collect_artifact_files(base: &Path) -> Result<Vec<ArtifactFile>, AppError> {
    let mut files = Vec::new();
    fn recurse(dir: &Path, files: &mut Vec<ArtifactFile>) -> Result<(), AppError> {
        for entry in fs::read_dir(dir).map_err(|err| {
            AppError::new(
                ErrorCategory::IoError,
                format!(
                    "failed to read artifact directory {}: {}",
                    dir.display(),
                    err
                ),
            )
        })? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                recurse(&path, files)?;
                continue;
            }
            let metadata = entry.metadata()?;
            files.push(ArtifactFile {
                size: metadata.len(),
                modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            });
        }
        Ok(())
    }
    recurse(base, &mut files)?;
    Ok(files)
}
