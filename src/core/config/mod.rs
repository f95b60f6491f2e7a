use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod loader;

pub use loader::ConfigLoader;

/// File name looked up in the workspace when no `--config` is given.
pub const CONFIG_FILE_NAME: &str = "merge-dispatch.toml";

/// Main configuration loaded from merge-dispatch.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DispatchConfig {
    /// How the merge script is launched
    #[serde(default)]
    pub script: ScriptConfig,

    /// Where and how the bundle is archived
    #[serde(default)]
    pub artifact: ArtifactConfig,
}

/// Script configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScriptConfig {
    /// Script path, relative to the workspace unless absolute
    #[serde(default = "default_script_path")]
    pub path: PathBuf,

    /// Interpreter used to run the script; empty runs the script directly
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    /// Kill the script after this many seconds; 0 disables the limit
    #[serde(default)]
    pub timeout_seconds: u64,
}

/// Artifact configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtifactConfig {
    /// Artifact name the bundle is archived under
    #[serde(default = "default_artifact_name")]
    pub name: String,

    /// File the script leaves in its output directory
    #[serde(default = "default_artifact_file_name")]
    pub file_name: String,

    /// Artifact store root, relative to the workspace unless absolute
    #[serde(default = "default_artifact_base_path")]
    pub base_path: PathBuf,

    /// Largest bundle accepted by the store
    #[serde(default = "default_max_artifact_bytes")]
    pub max_artifact_bytes: u64,

    /// Runs older than this are removed by `artifacts clean`
    #[serde(default = "default_retention_days")]
    pub retention_days: u64,
}

fn default_script_path() -> PathBuf {
    PathBuf::from("merge_macros.py")
}

fn default_interpreter() -> String {
    "python3".to_string()
}

fn default_artifact_name() -> String {
    "merged-zip".to_string()
}

fn default_artifact_file_name() -> String {
    "merged_bundle.zip".to_string()
}

fn default_artifact_base_path() -> PathBuf {
    PathBuf::from(".merge-dispatch/artifacts")
}

fn default_max_artifact_bytes() -> u64 {
    2 * 1024 * 1024 * 1024
}

fn default_retention_days() -> u64 {
    90
}

impl Default for ScriptConfig {
    fn default() -> Self {
        ScriptConfig {
            path: default_script_path(),
            interpreter: default_interpreter(),
            timeout_seconds: 0,
        }
    }
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        ArtifactConfig {
            name: default_artifact_name(),
            file_name: default_artifact_file_name(),
            base_path: default_artifact_base_path(),
            max_artifact_bytes: default_max_artifact_bytes(),
            retention_days: default_retention_days(),
        }
    }
}

impl ScriptConfig {
    pub fn timeout(&self) -> Option<std::time::Duration> {
        (self.timeout_seconds > 0).then(|| std::time::Duration::from_secs(self.timeout_seconds))
    }
}

impl ArtifactConfig {
    pub fn retention(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.retention_days * 24 * 3600)
    }
}
