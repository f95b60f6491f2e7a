//! Trigger inputs for a merge dispatch.
//!
//! Every input is string-typed at the boundary, mirroring a manual workflow
//! trigger form. A blank value means "use the default"; typing happens later in
//! [`crate::core::invocation`].
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Prefix used for environment-supplied inputs (`INPUT_VERSIONS=3`).
pub const ENV_INPUT_PREFIX: &str = "INPUT_";

/// The ten trigger inputs, in the order they are presented and serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputField {
    InputDir,
    OutputDir,
    Versions,
    Seed,
    Force,
    ExcludeCount,
    IntraFileEnabled,
    IntraFileMax,
    IntraFileMinMins,
    IntraFileMaxMins,
}

/// Semantic type of an input field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    Path,
    PositiveInt,
    OptionalInt,
    Flag,
    BoundedInt { min: u32, max: u32 },
    NonNegativeInt,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Path => write!(f, "path"),
            FieldKind::PositiveInt => write!(f, "positive integer"),
            FieldKind::OptionalInt => write!(f, "optional integer"),
            FieldKind::Flag => write!(f, "boolean flag"),
            FieldKind::BoundedInt { min, max } => write!(f, "integer {}-{}", min, max),
            FieldKind::NonNegativeInt => write!(f, "non-negative integer"),
        }
    }
}

impl InputField {
    pub const ALL: [InputField; 10] = [
        InputField::InputDir,
        InputField::OutputDir,
        InputField::Versions,
        InputField::Seed,
        InputField::Force,
        InputField::ExcludeCount,
        InputField::IntraFileEnabled,
        InputField::IntraFileMax,
        InputField::IntraFileMinMins,
        InputField::IntraFileMaxMins,
    ];

    /// Wire name used in inputs files and reports.
    pub fn name(self) -> &'static str {
        match self {
            InputField::InputDir => "input_dir",
            InputField::OutputDir => "output_dir",
            InputField::Versions => "versions",
            InputField::Seed => "seed",
            InputField::Force => "force",
            InputField::ExcludeCount => "exclude_count",
            InputField::IntraFileEnabled => "intra_file_enabled",
            InputField::IntraFileMax => "intra_file_max",
            InputField::IntraFileMinMins => "intra_file_min_mins",
            InputField::IntraFileMaxMins => "intra_file_max_mins",
        }
    }

    /// Flag forwarded to the merge script.
    pub fn flag(self) -> &'static str {
        match self {
            InputField::InputDir => "--input-dir",
            InputField::OutputDir => "--output-dir",
            InputField::Versions => "--versions",
            InputField::Seed => "--seed",
            InputField::Force => "--force",
            InputField::ExcludeCount => "--exclude-count",
            InputField::IntraFileEnabled => "--intra-file-enabled",
            InputField::IntraFileMax => "--intra-file-max",
            InputField::IntraFileMinMins => "--intra-file-min-mins",
            InputField::IntraFileMaxMins => "--intra-file-max-mins",
        }
    }

    pub fn default_value(self) -> &'static str {
        match self {
            InputField::InputDir => "originals",
            InputField::OutputDir => "output",
            InputField::Versions => "5",
            InputField::Seed => "",
            InputField::Force => "false",
            InputField::ExcludeCount => "1",
            InputField::IntraFileEnabled => "false",
            InputField::IntraFileMax => "4",
            InputField::IntraFileMinMins => "1",
            InputField::IntraFileMaxMins => "3",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            InputField::InputDir | InputField::OutputDir => FieldKind::Path,
            InputField::Versions | InputField::IntraFileMinMins | InputField::IntraFileMaxMins => {
                FieldKind::PositiveInt
            }
            InputField::Seed => FieldKind::OptionalInt,
            InputField::Force | InputField::IntraFileEnabled => FieldKind::Flag,
            InputField::ExcludeCount => FieldKind::BoundedInt { min: 0, max: 3 },
            InputField::IntraFileMax => FieldKind::NonNegativeInt,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            InputField::InputDir => "Directory holding the original macro files",
            InputField::OutputDir => "Directory the merged bundle is written to",
            InputField::Versions => "Number of versions generated per group",
            InputField::Seed => "Random seed (blank for a random run)",
            InputField::Force => "Overwrite existing output",
            InputField::ExcludeCount => "Files excluded per version (0-3)",
            InputField::IntraFileEnabled => "Insert pauses inside files",
            InputField::IntraFileMax => "Maximum pauses inserted per file",
            InputField::IntraFileMinMins => "Shortest pause in minutes",
            InputField::IntraFileMaxMins => "Longest pause in minutes (>= shortest)",
        }
    }

    /// Environment variable that supplies this input, e.g. `INPUT_EXCLUDE_COUNT`.
    pub fn env_var(self) -> String {
        format!("{}{}", ENV_INPUT_PREFIX, self.name().to_ascii_uppercase())
    }
}

impl fmt::Display for InputField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for InputField {
    type Err = InputError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().replace('-', "_").to_ascii_lowercase();
        InputField::ALL
            .into_iter()
            .find(|field| field.name() == normalized)
            .ok_or_else(|| InputError::UnknownField(value.to_string()))
    }
}

/// Errors raised while collecting or typing trigger inputs.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("unknown input '{0}'")]
    UnknownField(String),
    #[error("input '{field}' must be a string, got {found}")]
    NotAString { field: InputField, found: String },
    #[error("input '{field}' expects {expected}, got '{value}'")]
    Invalid {
        field: InputField,
        value: String,
        expected: FieldKind,
    },
    #[error("{0}")]
    Constraint(String),
    #[error("failed to read inputs file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("inputs file is not a JSON object of strings: {0}")]
    Parse(#[from] serde_json::Error),
}

impl From<InputError> for AppError {
    fn from(err: InputError) -> Self {
        let code = match &err {
            InputError::Read { .. } => "MD-INP-002",
            InputError::Parse(_) => "MD-INP-003",
            _ => "MD-INP-001",
        };
        let category = match &err {
            InputError::Read { .. } => ErrorCategory::IoError,
            _ => ErrorCategory::ValidationError,
        };
        AppError::new(category, err.to_string()).with_code(code)
    }
}

/// User-supplied input values before defaults are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawInputs {
    values: BTreeMap<InputField, String>,
}

impl RawInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<T: Into<String>>(&mut self, field: InputField, value: T) -> &mut Self {
        self.values.insert(field, value.into());
        self
    }

    pub fn with<T: Into<String>>(mut self, field: InputField, value: T) -> Self {
        self.set(field, value);
        self
    }

    pub fn get(&self, field: InputField) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Collect `INPUT_*` values from an environment snapshot.
    pub fn from_env_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: BTreeMap<String, String> = vars.into_iter().collect();
        let mut inputs = RawInputs::new();
        for field in InputField::ALL {
            if let Some(value) = vars.get(&field.env_var()) {
                inputs.set(field, value.clone());
            }
        }
        inputs
    }

    /// Parse a JSON object of field names to values, the shape of a
    /// workflow-dispatch `inputs` payload. Numbers and booleans are accepted
    /// and stringified; `null` counts as blank.
    pub fn from_json_str(text: &str) -> Result<Self, InputError> {
        let map: serde_json::Map<String, Value> = serde_json::from_str(text)?;
        let mut inputs = RawInputs::new();
        for (key, value) in map {
            let field = InputField::from_str(&key)?;
            let value = match value {
                Value::String(s) => s,
                Value::Null => String::new(),
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                other => {
                    return Err(InputError::NotAString {
                        field,
                        found: other.to_string(),
                    })
                }
            };
            inputs.set(field, value);
        }
        Ok(inputs)
    }

    pub fn from_file(path: &Path) -> Result<Self, InputError> {
        let text = fs::read_to_string(path).map_err(|source| InputError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Layer `other` on top of `self`; only non-blank values override.
    pub fn overlay(mut self, other: &RawInputs) -> Self {
        for (field, value) in &other.values {
            if !value.trim().is_empty() {
                self.values.insert(*field, value.clone());
            }
        }
        self
    }

    /// Substitute defaults for every blank or missing field.
    pub fn resolve(&self) -> ResolvedInputs {
        let mut values = BTreeMap::new();
        let mut defaulted = BTreeSet::new();
        for field in InputField::ALL {
            let supplied = self
                .values
                .get(&field)
                .filter(|value| !value.trim().is_empty());
            match supplied {
                Some(value) => {
                    values.insert(field, value.clone());
                }
                None => {
                    values.insert(field, field.default_value().to_string());
                    defaulted.insert(field);
                }
            }
        }
        ResolvedInputs { values, defaulted }
    }
}

/// Every field mapped to a concrete string value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedInputs {
    values: BTreeMap<InputField, String>,
    defaulted: BTreeSet<InputField>,
}

impl ResolvedInputs {
    pub fn get(&self, field: InputField) -> &str {
        self.values
            .get(&field)
            .map(String::as_str)
            .unwrap_or_else(|| field.default_value())
    }

    /// Whether the field fell back to its default.
    pub fn is_default(&self, field: InputField) -> bool {
        self.defaulted.contains(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (InputField, &str)> + '_ {
        InputField::ALL
            .into_iter()
            .map(move |field| (field, self.get(field)))
    }
}

impl Default for ResolvedInputs {
    fn default() -> Self {
        RawInputs::default().resolve()
    }
}
