#![allow(clippy::result_large_err)]

use crate::cli::args::TriggerInputArgs;
use crate::core::config::{ConfigLoader, DispatchConfig};
use crate::core::error::AppError;
use crate::core::inputs::{RawInputs, ResolvedInputs};
use crate::core::types::ErrorCategory;
use std::env;
use std::path::{Path, PathBuf};

/// Workspace and configuration shared by every command.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub workspace: PathBuf,
    pub config: DispatchConfig,
}

impl CommandContext {
    pub fn load(workspace: Option<&Path>, config: Option<&Path>) -> Result<Self, AppError> {
        let workspace = crate::logging::resolve_workspace_path(workspace)
            .map_err(|err| AppError::new(ErrorCategory::IoError, format!("{:#}", err)))?;
        if !workspace.is_dir() {
            return Err(AppError::new(
                ErrorCategory::ConfigError,
                format!("workspace {} is not a directory", workspace.display()),
            )
            .with_code("MD-CFG-004"));
        }
        let config = ConfigLoader::load(&workspace, config)?;
        Ok(CommandContext { workspace, config })
    }

    /// Merge inputs with precedence CLI flag > inputs file > `INPUT_*` env,
    /// then substitute defaults.
    pub fn collect_inputs(&self, args: &TriggerInputArgs) -> Result<ResolvedInputs, AppError> {
        self.collect_inputs_from(args, env::vars())
    }

    pub fn collect_inputs_from<I>(
        &self,
        args: &TriggerInputArgs,
        env_vars: I,
    ) -> Result<ResolvedInputs, AppError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut raw = RawInputs::from_env_vars(env_vars);
        if let Some(path) = &args.inputs_file {
            let path = if path.is_absolute() {
                path.clone()
            } else {
                self.workspace.join(path)
            };
            raw = raw.overlay(&RawInputs::from_file(&path)?);
        }
        Ok(raw.overlay(&args.to_raw()).resolve())
    }
}
