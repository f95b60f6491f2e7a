use insta::assert_snapshot;
use merge_dispatch::core::inputs::{InputField, RawInputs};
use merge_dispatch::core::invocation::MergeInvocation;
use merge_dispatch::core::runner::ScriptRequest;
use std::path::PathBuf;

fn args_for(raw: RawInputs) -> Vec<String> {
    MergeInvocation::from_inputs(&raw.resolve())
        .expect("inputs should be valid")
        .to_args()
        .into_iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect()
}

fn count(args: &[String], flag: &str) -> usize {
    args.iter().filter(|arg| arg.as_str() == flag).count()
}

fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|arg| arg == flag)
        .and_then(|index| args.get(index + 1))
        .map(String::as_str)
}

fn command_line(raw: RawInputs) -> String {
    let invocation = MergeInvocation::from_inputs(&raw.resolve()).expect("valid inputs");
    let mut request = ScriptRequest::new("merge_macros.py", PathBuf::from("."));
    request.args = invocation.to_args();
    request.command_line()
}

#[test]
fn test_all_blank_inputs_match_explicit_defaults() {
    let mut blank = RawInputs::new();
    let mut explicit = RawInputs::new();
    for field in InputField::ALL {
        blank.set(field, "");
        explicit.set(field, field.default_value());
    }
    assert_eq!(args_for(blank), args_for(explicit));
    assert_eq!(args_for(RawInputs::new()), args_for(RawInputs::new()));
}

#[test]
fn test_seed_flag_only_when_set() {
    let without = args_for(RawInputs::new().with(InputField::Seed, ""));
    assert_eq!(count(&without, "--seed"), 0);

    let with = args_for(RawInputs::new().with(InputField::Seed, "1234"));
    assert_eq!(count(&with, "--seed"), 1);
    assert_eq!(value_after(&with, "--seed"), Some("1234"));
}

#[test]
fn test_seed_is_forwarded_literally() {
    for seed in ["007", "+42", "-7", "123456789012345678901234567890"] {
        let args = args_for(RawInputs::new().with(InputField::Seed, seed));
        assert_eq!(count(&args, "--seed"), 1);
        assert_eq!(value_after(&args, "--seed"), Some(seed));
    }
}

#[test]
fn test_numeric_inputs_are_forwarded_as_supplied() {
    let args = args_for(
        RawInputs::new()
            .with(InputField::Versions, "+3")
            .with(InputField::ExcludeCount, "02")
            .with(InputField::IntraFileMax, "004"),
    );
    assert_eq!(value_after(&args, "--versions"), Some("+3"));
    assert_eq!(value_after(&args, "--exclude-count"), Some("02"));
    assert_eq!(value_after(&args, "--intra-file-max"), Some("004"));
}

#[test]
fn test_force_present_only_for_literal_true() {
    for value in ["false", "", "TRUE", "yes", "1"] {
        let args = args_for(RawInputs::new().with(InputField::Force, value));
        assert_eq!(count(&args, "--force"), 0, "force={:?}", value);
    }
    let args = args_for(RawInputs::new().with(InputField::Force, "true"));
    assert_eq!(count(&args, "--force"), 1);
}

#[test]
fn test_intra_file_enabled_present_only_for_literal_true() {
    let args = args_for(RawInputs::new().with(InputField::IntraFileEnabled, "on"));
    assert_eq!(count(&args, "--intra-file-enabled"), 0);

    let args = args_for(RawInputs::new().with(InputField::IntraFileEnabled, "true"));
    assert_eq!(count(&args, "--intra-file-enabled"), 1);
    assert_eq!(args.last().map(String::as_str), Some("--intra-file-enabled"));
}

#[test]
fn test_documented_example_invocation() {
    let raw = RawInputs::new()
        .with(InputField::Versions, "3")
        .with(InputField::ExcludeCount, "2")
        .with(InputField::IntraFileMax, "1")
        .with(InputField::IntraFileMinMins, "2")
        .with(InputField::IntraFileMaxMins, "5")
        .with(InputField::Seed, "42")
        .with(InputField::Force, "true")
        .with(InputField::IntraFileEnabled, "true");
    let args = args_for(raw.clone());

    assert_eq!(value_after(&args, "--versions"), Some("3"));
    assert_eq!(value_after(&args, "--exclude-count"), Some("2"));
    assert_eq!(value_after(&args, "--intra-file-max"), Some("1"));
    assert_eq!(value_after(&args, "--intra-file-min-mins"), Some("2"));
    assert_eq!(value_after(&args, "--intra-file-max-mins"), Some("5"));
    assert_eq!(value_after(&args, "--seed"), Some("42"));
    assert_eq!(count(&args, "--force"), 1);
    assert_eq!(count(&args, "--intra-file-enabled"), 1);

    assert_snapshot!(
        command_line(raw),
        @"merge_macros.py --input-dir originals --output-dir output --versions 3 --seed 42 --force --exclude-count 2 --intra-file-max 1 --intra-file-min-mins 2 --intra-file-max-mins 5 --intra-file-enabled"
    );
}

#[test]
fn test_default_command_line() {
    assert_snapshot!(
        command_line(RawInputs::new()),
        @"merge_macros.py --input-dir originals --output-dir output --versions 5 --exclude-count 1 --intra-file-max 4 --intra-file-min-mins 1 --intra-file-max-mins 3"
    );
}

#[test]
fn test_shell_metacharacters_reach_script_as_one_argument() {
    let hostile = "macros $(touch pwned); `id` && echo";
    let args = args_for(RawInputs::new().with(InputField::InputDir, hostile));
    assert_eq!(value_after(&args, "--input-dir"), Some(hostile));
    assert_eq!(args.len(), 14);
}

#[test]
fn test_malformed_numbers_are_rejected_before_execution() {
    let cases = [
        (InputField::Versions, "0"),
        (InputField::Versions, "five"),
        (InputField::Seed, "4.2"),
        (InputField::Seed, "12ab"),
        (InputField::ExcludeCount, "4"),
        (InputField::IntraFileMax, "-1"),
        (InputField::IntraFileMinMins, "0"),
        (InputField::IntraFileMaxMins, "3m"),
    ];
    for (field, value) in cases {
        let result = MergeInvocation::from_inputs(&RawInputs::new().with(field, value).resolve());
        let err = result.expect_err(&format!("{}={} should be rejected", field, value));
        assert!(
            err.to_string().contains(field.name()),
            "error should name {}: {}",
            field,
            err
        );
    }
}

#[test]
fn test_path_with_nul_byte_rejected() {
    let result =
        MergeInvocation::from_inputs(&RawInputs::new().with(InputField::OutputDir, "out\0put").resolve());
    assert!(result.is_err());
}
