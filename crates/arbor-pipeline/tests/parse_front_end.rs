use arbor_core::{CompileOptions, DiagnosticLevel, SourceInput, SourceKind, SourceUnit};
use arbor_pipeline::parse::{
    parse_program, DUPLICATE_PATH_CODE, PARSE_FAILURE_CODE, READ_FAILURE_CODE,
};
use pretty_assertions::assert_eq;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn plain_parser(
    text: &str,
    _options: &CompileOptions,
    path: &Path,
) -> arbor_core::Result<SourceUnit> {
    Ok(SourceUnit::new(path, SourceKind::Regular, text))
}

fn concurrent_options() -> Arc<CompileOptions> {
    Arc::new(CompileOptions {
        concurrent_build: true,
        ..Default::default()
    })
}

fn sequential_options() -> Arc<CompileOptions> {
    Arc::new(CompileOptions {
        concurrent_build: false,
        ..Default::default()
    })
}

#[test]
fn test_output_order_is_input_order_despite_completion_order() {
    let inputs: Vec<SourceInput> = (0..24)
        .map(|i| {
            SourceInput::from_text(
                format!("src/file{i}.arb"),
                SourceKind::Regular,
                format!("unit {i}"),
            )
        })
        .collect();
    let expected: Vec<String> = (0..24).map(|i| format!("src/file{i}.arb")).collect();

    // Jitter each parse so completion order differs from input order, and
    // repeat: the output order must be stable every time.
    for round in 0..8u64 {
        let report = parse_program(
            "app",
            &inputs,
            concurrent_options(),
            |text, options, path| {
                let index: u64 = text.rsplit(' ').next().unwrap().parse().unwrap();
                thread::sleep(Duration::from_millis((index * 7 + round) % 5));
                plain_parser(text, options, path)
            },
        );
        let (snapshot, diagnostics) = report.into_result().unwrap();
        assert!(diagnostics.is_empty());
        let paths: Vec<String> = snapshot
            .units()
            .map(|u| u.path().display().to_string())
            .collect();
        assert_eq!(paths, expected);
    }
}

#[test]
fn test_sequential_and_concurrent_builds_are_observably_equivalent() {
    let inputs = vec![
        SourceInput::from_text("a.arb", SourceKind::Regular, "a"),
        SourceInput::from_text("A.ARB", SourceKind::Regular, "shadowed"),
        SourceInput::from_text("b.arb", SourceKind::Regular, "b"),
    ];

    let concurrent = parse_program("app", &inputs, concurrent_options(), plain_parser);
    let sequential = parse_program("app", &inputs, sequential_options(), plain_parser);

    let (concurrent_snapshot, concurrent_diags) = concurrent.into_result().unwrap();
    let (sequential_snapshot, sequential_diags) = sequential.into_result().unwrap();

    let paths = |snapshot: &arbor_core::ProgramSnapshot| -> Vec<String> {
        snapshot
            .units()
            .map(|u| u.path().display().to_string())
            .collect()
    };
    assert_eq!(paths(&concurrent_snapshot), paths(&sequential_snapshot));

    let messages = |diags: &[arbor_core::Diagnostic]| -> Vec<String> {
        diags.iter().map(|d| d.message.clone()).collect()
    };
    assert_eq!(messages(&concurrent_diags), messages(&sequential_diags));
}

#[test]
fn test_duplicate_paths_warn_and_keep_the_first_tree() {
    let inputs = vec![
        SourceInput::from_text("a.arb", SourceKind::Regular, "first a"),
        SourceInput::from_text("A.ARB", SourceKind::Regular, "second a"),
        SourceInput::from_text("b.arb", SourceKind::Regular, "b"),
    ];

    let report = parse_program("app", &inputs, sequential_options(), plain_parser);
    let (snapshot, diagnostics) = report.into_result().unwrap();

    assert_eq!(snapshot.len(), 2);
    let kept: Vec<(String, String)> = snapshot
        .units()
        .map(|u| (u.path().display().to_string(), u.text().to_string()))
        .collect();
    assert_eq!(
        kept,
        vec![
            ("a.arb".to_string(), "first a".to_string()),
            ("b.arb".to_string(), "b".to_string()),
        ]
    );

    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].level, DiagnosticLevel::Warning);
    assert_eq!(diagnostics[0].code.as_deref(), Some(DUPLICATE_PATH_CODE));
}

#[test]
fn test_read_failure_aborts_the_whole_build() {
    let inputs = vec![
        SourceInput::from_text("a.arb", SourceKind::Regular, "a"),
        SourceInput::from_file("/nonexistent/arbor/missing.arb", SourceKind::Regular),
        SourceInput::from_text("b.arb", SourceKind::Regular, "b"),
    ];

    let report = parse_program("app", &inputs, sequential_options(), plain_parser);

    assert!(report.value.is_none());
    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(
        report.diagnostics[0].code.as_deref(),
        Some(READ_FAILURE_CODE)
    );
    assert!(report.diagnostics[0].is_error());
}

#[test]
fn test_parse_failure_aborts_like_a_read_failure() {
    let inputs = vec![
        SourceInput::from_text("a.arb", SourceKind::Regular, "ok"),
        SourceInput::from_text("broken.arb", SourceKind::Regular, "!"),
    ];

    let report = parse_program("app", &inputs, sequential_options(), |text, options, path| {
        if text.contains('!') {
            return Err(arbor_core::Error::Parse {
                path: path.to_path_buf(),
                message: "unexpected token".to_string(),
            });
        }
        plain_parser(text, options, path)
    });

    assert!(report.value.is_none());
    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(
        report.diagnostics[0].code.as_deref(),
        Some(PARSE_FAILURE_CODE)
    );
}

#[test]
fn test_empty_input_listing_builds_an_empty_snapshot() {
    let report = parse_program("app", &[], sequential_options(), plain_parser);
    let (snapshot, diagnostics) = report.into_result().unwrap();
    assert!(snapshot.is_empty());
    assert!(diagnostics.is_empty());
    assert_eq!(snapshot.default_output_name(), "out");
}
