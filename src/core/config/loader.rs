#![allow(clippy::result_large_err)]

use super::{DispatchConfig, CONFIG_FILE_NAME};
use crate::core::artifacts::MANIFEST_FILE;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use std::env;
use std::path::{Component, Path, PathBuf};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config for a workspace.
    ///
    /// An explicit path must exist; the implicit `<workspace>/merge-dispatch.toml`
    /// is optional. Environment variables override file values and the result
    /// is validated before it is returned.
    pub fn load(workspace: &Path, explicit: Option<&Path>) -> Result<DispatchConfig, AppError> {
        let mut config = match explicit {
            Some(path) => Self::load_from_file(path)?.ok_or_else(|| {
                AppError::new(
                    ErrorCategory::ConfigError,
                    format!("config file {} does not exist", path.display()),
                )
                .with_code("MD-CFG-001")
            })?,
            None => Self::load_from_file(&workspace.join(CONFIG_FILE_NAME))?.unwrap_or_default(),
        };

        Self::apply_env_overrides(&mut config);
        Self::validate_config(&config)?;
        Ok(config)
    }

    /// Load config from specific file path
    /// Returns Ok(None) if file doesn't exist
    pub fn load_from_file(path: &Path) -> Result<Option<DispatchConfig>, AppError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::new(
                ErrorCategory::IoError,
                format!("Failed to read config file {}: {}", path.display(), e),
            )
        })?;

        let config: DispatchConfig = toml::from_str(&content).map_err(|e| {
            AppError::new(
                ErrorCategory::ConfigError,
                format!("Failed to parse config file {}: {}", path.display(), e),
            )
            .with_code("MD-CFG-002")
        })?;

        Ok(Some(config))
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(config: &mut DispatchConfig) {
        if let Ok(script) = env::var("MERGE_DISPATCH_SCRIPT") {
            config.script.path = PathBuf::from(script);
        }

        if let Ok(interpreter) = env::var("MERGE_DISPATCH_INTERPRETER") {
            config.script.interpreter = interpreter;
        }

        if let Ok(timeout) = env::var("MERGE_DISPATCH_TIMEOUT_SECONDS") {
            match timeout.trim().parse::<u64>() {
                Ok(seconds) => config.script.timeout_seconds = seconds,
                Err(_) => tracing::warn!(
                    value = %timeout,
                    "ignoring MERGE_DISPATCH_TIMEOUT_SECONDS; expected whole seconds"
                ),
            }
        }

        if let Ok(artifact_dir) = env::var("MERGE_DISPATCH_ARTIFACT_DIR") {
            config.artifact.base_path = PathBuf::from(artifact_dir);
        }
    }

    /// Get documentation for supported environment variables
    pub fn env_var_documentation() -> &'static [&'static str] {
        &[
            "MERGE_DISPATCH_SCRIPT - Override the merge script path (default: merge_macros.py)",
            "MERGE_DISPATCH_INTERPRETER - Override the script interpreter (default: python3)",
            "MERGE_DISPATCH_TIMEOUT_SECONDS - Kill the script after N seconds (default: 0, no limit)",
            "MERGE_DISPATCH_ARTIFACT_DIR - Override the artifact store root (default: .merge-dispatch/artifacts)",
            "INPUT_<NAME> - Supply a trigger input, e.g. INPUT_VERSIONS=3",
        ]
    }

    /// Validate configuration values
    pub fn validate_config(config: &DispatchConfig) -> Result<(), AppError> {
        if config.script.path.as_os_str().is_empty() {
            return Err(invalid_config("script.path cannot be empty"));
        }

        if !is_plain_name(&config.artifact.name) {
            return Err(invalid_config(
                "artifact.name must be a plain name without path separators",
            ));
        }

        if !is_plain_name(&config.artifact.file_name) {
            return Err(invalid_config(
                "artifact.file_name must be a plain file name without path separators",
            ));
        }

        if config.artifact.file_name == MANIFEST_FILE {
            return Err(invalid_config(
                "artifact.file_name cannot be the reserved manifest file name",
            ));
        }

        if !is_dedicated_dir(&config.artifact.base_path) {
            return Err(invalid_config(
                "artifact.base_path must name a directory below the workspace, not the workspace itself or a parent",
            ));
        }

        if config.artifact.max_artifact_bytes == 0 {
            return Err(invalid_config(
                "artifact.max_artifact_bytes must be greater than zero",
            ));
        }

        Ok(())
    }
}

fn invalid_config(message: &str) -> AppError {
    AppError::new(ErrorCategory::ConfigError, message).with_code("MD-CFG-003")
}

/// Absolute paths are taken as given; relative ones must descend into the workspace.
fn is_dedicated_dir(path: &Path) -> bool {
    if path.is_absolute() {
        return path.parent().is_some();
    }
    let mut descends = false;
    for component in path.components() {
        match component {
            Component::Normal(_) => descends = true,
            Component::CurDir => {}
            _ => return false,
        }
    }
    descends
}

pub(crate) fn is_plain_name(name: &str) -> bool {
    !name.trim().is_empty()
        && !name.contains('/')
        && !name.contains('\\')
        && name != "."
        && name != ".."
}
