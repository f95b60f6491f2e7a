//! Typed argument builder for the merge script.
//!
//! Resolved inputs are parsed into their semantic types before anything is
//! executed. The flag list carries each value exactly as it was supplied, as
//! separate arguments to the process API; nothing is interpolated into a
//! shell string.
use crate::core::error::AppError;
use crate::core::inputs::{FieldKind, InputError, InputField, ResolvedInputs};
use crate::core::types::ErrorCategory;
use serde::Serialize;
use std::ffi::{OsStr, OsString};
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const MAX_EXCLUDE_COUNT: u8 = 3;

/// A validated value together with the text it was parsed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Literal<T> {
    pub value: T,
    pub text: String,
}

impl<T> Literal<T> {
    fn new(value: T, text: &str) -> Self {
        Literal {
            value,
            text: text.to_string(),
        }
    }
}

/// Intra-file pause settings, forwarded opaquely to the script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntraFilePause {
    pub enabled: bool,
    pub max: Literal<u32>,
    pub min_mins: Literal<NonZeroU32>,
    pub max_mins: Literal<NonZeroU32>,
}

/// A validated merge invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeInvocation {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub versions: Literal<NonZeroU32>,
    /// Any integer; the script owns its range.
    pub seed: Option<String>,
    pub force: bool,
    pub exclude_count: Literal<u8>,
    pub intra_file: IntraFilePause,
}

/// Every validation failure found in one set of inputs.
#[derive(Debug, thiserror::Error)]
#[error("{} invalid input(s): {}", .0.len(), join_errors(.0))]
pub struct InvalidInputs(pub Vec<InputError>);

fn join_errors(errors: &[InputError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<InvalidInputs> for AppError {
    fn from(err: InvalidInputs) -> Self {
        let mut app = AppError::new(ErrorCategory::ValidationError, err.to_string())
            .with_code("MD-INP-001")
            .with_suggestion("Run `merge-dispatch inputs` to list accepted values");
        for (index, error) in err.0.iter().enumerate() {
            app.add_context(&format!("input_error_{}", index + 1), &error.to_string());
        }
        app
    }
}

impl MergeInvocation {
    /// Parse resolved inputs, collecting every failure instead of stopping at
    /// the first one.
    pub fn from_inputs(inputs: &ResolvedInputs) -> Result<Self, InvalidInputs> {
        let mut errors = Vec::new();

        let input_dir = collect(&mut errors, parse_path(inputs, InputField::InputDir));
        let output_dir = collect(&mut errors, parse_path(inputs, InputField::OutputDir));
        let versions = collect(
            &mut errors,
            parse_number::<NonZeroU32>(inputs, InputField::Versions),
        );
        let seed = collect(&mut errors, parse_seed(inputs));
        let force = parse_flag(inputs, InputField::Force);
        let exclude_count = collect(&mut errors, parse_exclude_count(inputs));
        let enabled = parse_flag(inputs, InputField::IntraFileEnabled);
        let max = collect(
            &mut errors,
            parse_number::<u32>(inputs, InputField::IntraFileMax),
        );
        let min_mins = collect(
            &mut errors,
            parse_number::<NonZeroU32>(inputs, InputField::IntraFileMinMins),
        );
        let max_mins = collect(
            &mut errors,
            parse_number::<NonZeroU32>(inputs, InputField::IntraFileMaxMins),
        );

        if let (Some(min), Some(max)) = (&min_mins, &max_mins) {
            if max.value < min.value {
                errors.push(InputError::Constraint(format!(
                    "input '{}' ({}) must be >= '{}' ({})",
                    InputField::IntraFileMaxMins,
                    max.text,
                    InputField::IntraFileMinMins,
                    min.text
                )));
            }
        }

        match (
            input_dir, output_dir, versions, seed, exclude_count, max, min_mins, max_mins,
        ) {
            (
                Some(input_dir),
                Some(output_dir),
                Some(versions),
                Some(seed),
                Some(exclude_count),
                Some(max),
                Some(min_mins),
                Some(max_mins),
            ) if errors.is_empty() => Ok(MergeInvocation {
                input_dir,
                output_dir,
                versions,
                seed,
                force,
                exclude_count,
                intra_file: IntraFilePause {
                    enabled,
                    max,
                    min_mins,
                    max_mins,
                },
            }),
            _ => Err(InvalidInputs(errors)),
        }
    }

    /// Flag list in the order the merge script documents it.
    pub fn to_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::with_capacity(18);
        push_pair(&mut args, InputField::InputDir, self.input_dir.as_os_str());
        push_pair(&mut args, InputField::OutputDir, self.output_dir.as_os_str());
        push_pair(&mut args, InputField::Versions, &self.versions.text);
        if let Some(seed) = &self.seed {
            push_pair(&mut args, InputField::Seed, seed);
        }
        if self.force {
            args.push(InputField::Force.flag().into());
        }
        push_pair(&mut args, InputField::ExcludeCount, &self.exclude_count.text);
        push_pair(&mut args, InputField::IntraFileMax, &self.intra_file.max.text);
        push_pair(
            &mut args,
            InputField::IntraFileMinMins,
            &self.intra_file.min_mins.text,
        );
        push_pair(
            &mut args,
            InputField::IntraFileMaxMins,
            &self.intra_file.max_mins.text,
        );
        if self.intra_file.enabled {
            args.push(InputField::IntraFileEnabled.flag().into());
        }
        args
    }

    /// Location of a file the script is expected to leave in its output dir.
    pub fn output_file(&self, working_dir: &Path, file_name: &str) -> PathBuf {
        let output_dir = if self.output_dir.is_absolute() {
            self.output_dir.clone()
        } else {
            working_dir.join(&self.output_dir)
        };
        output_dir.join(file_name)
    }
}

fn push_pair<V: AsRef<OsStr>>(args: &mut Vec<OsString>, field: InputField, value: V) {
    args.push(field.flag().into());
    args.push(value.as_ref().to_os_string());
}

fn collect<T>(errors: &mut Vec<InputError>, result: Result<T, InputError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            errors.push(err);
            None
        }
    }
}

fn invalid(field: InputField, value: &str) -> InputError {
    InputError::Invalid {
        field,
        value: value.to_string(),
        expected: field.kind(),
    }
}

fn parse_path(inputs: &ResolvedInputs, field: InputField) -> Result<PathBuf, InputError> {
    let value = inputs.get(field);
    if value.is_empty() || value.contains('\0') {
        return Err(invalid(field, value));
    }
    Ok(PathBuf::from(value))
}

fn parse_number<T: FromStr>(
    inputs: &ResolvedInputs,
    field: InputField,
) -> Result<Literal<T>, InputError> {
    let value = inputs.get(field);
    value
        .parse::<T>()
        .map(|parsed| Literal::new(parsed, value))
        .map_err(|_| invalid(field, value))
}

fn parse_seed(inputs: &ResolvedInputs) -> Result<Option<String>, InputError> {
    let value = inputs.get(InputField::Seed);
    if value.is_empty() {
        return Ok(None);
    }
    if is_integer_literal(value) {
        Ok(Some(value.to_string()))
    } else {
        Err(invalid(InputField::Seed, value))
    }
}

fn is_integer_literal(value: &str) -> bool {
    let digits = value.strip_prefix(['+', '-']).unwrap_or(value);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn parse_exclude_count(inputs: &ResolvedInputs) -> Result<Literal<u8>, InputError> {
    let field = InputField::ExcludeCount;
    match parse_number::<u8>(inputs, field) {
        Ok(count) if count.value <= MAX_EXCLUDE_COUNT => Ok(count),
        _ => Err(invalid(field, inputs.get(field))),
    }
}

/// Flags are present only for the literal `"true"`.
fn parse_flag(inputs: &ResolvedInputs, field: InputField) -> bool {
    debug_assert_eq!(field.kind(), FieldKind::Flag);
    match inputs.get(field) {
        "true" => true,
        "false" | "" => false,
        other => {
            tracing::warn!(
                input = %field,
                value = other,
                "flag input is not 'true'; treating it as unset"
            );
            false
        }
    }
}
