use merge_dispatch::core::error::{AppError, DefaultErrorReporter, ErrorReporter};
use merge_dispatch::core::inputs::{InputError, InputField, RawInputs};
use merge_dispatch::core::invocation::MergeInvocation;
use merge_dispatch::core::types::{ErrorCategory, ErrorSeverity};

#[test]
fn test_error_severity_mapping() {
    let test_cases = vec![
        (ErrorCategory::ValidationError, ErrorSeverity::Error),
        (ErrorCategory::ConfigError, ErrorSeverity::Error),
        (ErrorCategory::ToolExecutionError, ErrorSeverity::Error),
        (ErrorCategory::TimeoutError, ErrorSeverity::Error),
        (ErrorCategory::SerializationError, ErrorSeverity::Error),
        (ErrorCategory::IoError, ErrorSeverity::Error),
        (ErrorCategory::ArtifactError, ErrorSeverity::Warning),
        (ErrorCategory::InternalError, ErrorSeverity::Error),
    ];

    for (category, expected_severity) in test_cases {
        let error = AppError::new(category, "test");
        assert_eq!(error.severity(), expected_severity);
    }
}

#[test]
fn test_display_includes_code_and_context() {
    let mut error = AppError::new(ErrorCategory::ArtifactError, "bundle missing")
        .with_code("MD-ART-001");
    error.add_context("artifact", "merged-zip");
    let rendered = error.to_string();
    assert!(rendered.starts_with("[MD-ART-001] ArtifactError: bundle missing"));
    assert!(rendered.contains("merged-zip"));
}

#[test]
fn test_invalid_inputs_convert_to_validation_error() {
    let raw = RawInputs::new()
        .with(InputField::Versions, "-3")
        .with(InputField::ExcludeCount, "9");
    let err = MergeInvocation::from_inputs(&raw.resolve()).unwrap_err();
    assert_eq!(err.0.len(), 2);

    let app: AppError = err.into();
    assert_eq!(app.category, ErrorCategory::ValidationError);
    assert_eq!(app.code, "MD-INP-001");
    assert_eq!(app.exit_code(), 2);
    assert_eq!(app.context.len(), 2);
    assert!(app.context["input_error_1"].contains("versions"));
    assert!(app.context["input_error_2"].contains("exclude_count"));
    assert!(!app.recovery_suggestions.is_empty());
}

#[test]
fn test_input_file_errors_have_their_own_codes() {
    let parse: AppError = RawInputs::from_json_str("not json").unwrap_err().into();
    assert_eq!(parse.code, "MD-INP-003");

    let unknown = RawInputs::from_json_str(r#"{"colour": "red"}"#).unwrap_err();
    assert!(matches!(unknown, InputError::UnknownField(ref name) if name == "colour"));
    let unknown: AppError = unknown.into();
    assert_eq!(unknown.code, "MD-INP-001");

    let read: AppError =
        RawInputs::from_file(std::path::Path::new("/definitely/not/here.json"))
            .unwrap_err()
            .into();
    assert_eq!(read.category, ErrorCategory::IoError);
    assert_eq!(read.code, "MD-INP-002");
}

#[test]
fn test_io_error_conversion() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    let app: AppError = io.into();
    assert_eq!(app.category, ErrorCategory::IoError);
    assert_eq!(app.code, "IO_ERROR");
    assert!(app.source.is_some());
}

#[test]
fn test_default_reporter_does_not_panic() {
    let reporter = DefaultErrorReporter::new();
    let error = AppError::new(ErrorCategory::TimeoutError, "script exceeded timeout")
        .with_code("MD-RUN-002")
        .with_suggestion("Raise [script] timeout_seconds");
    reporter.report_error(&error);
    reporter.report_warning("upload skipped", Some("artifact=merged-zip".to_string()));
}
