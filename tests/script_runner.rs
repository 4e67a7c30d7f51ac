//! Runs every `tests/scripts/**/*.lust` program and checks it against the
//! expectations in its leading comments:
//!
//! - `;; expect: <printed value of the last form>`
//! - `;; expect-error: <error code suffix>`
//! - `;; output: <everything printed, with \n for newlines>`

mod common;

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

#[derive(Debug, Default)]
struct Expectations {
    value: Option<String>,
    error: Option<String>,
    output: Option<String>,
}

fn parse_expectations(source: &str) -> Expectations {
    let mut expectations = Expectations::default();
    for line in source.lines().take_while(|line| line.starts_with(";;")) {
        let line = line.trim_start_matches(';').trim();
        if let Some(value) = line.strip_prefix("expect:") {
            expectations.value = Some(value.trim().to_string());
        } else if let Some(code) = line.strip_prefix("expect-error:") {
            expectations.error = Some(code.trim().to_string());
        } else if let Some(output) = line.strip_prefix("output:") {
            expectations.output = Some(output.trim().replace("\\n", "\n"));
        }
    }
    expectations
}

fn script_paths() -> Vec<PathBuf> {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/scripts");
    let mut paths: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "lust"))
        .collect();
    paths.sort();
    paths
}

fn check_script(path: &Path) -> Result<(), String> {
    let source = fs::read_to_string(path).map_err(|e| format!("cannot read: {e}"))?;
    let expected = parse_expectations(&source);
    if expected.value.is_none() && expected.error.is_none() && expected.output.is_none() {
        return Err("no `;; expect:` header".into());
    }

    match (common::try_run(&source), &expected.error) {
        (Ok(outcome), None) => {
            if let Some(value) = &expected.value {
                if &outcome.value != value {
                    return Err(format!("expected value `{value}`, got `{}`", outcome.value));
                }
            }
            if let Some(output) = &expected.output {
                if &outcome.output != output {
                    return Err(format!("expected output {output:?}, got {:?}", outcome.output));
                }
            }
            Ok(())
        }
        (Ok(outcome), Some(code)) => Err(format!(
            "expected error `{code}`, got value `{}`",
            outcome.value
        )),
        (Err(error), Some(code)) if error.code().ends_with(code.as_str()) => Ok(()),
        (Err(error), _) => Err(format!("unexpected error `{}`: {error}", error.code())),
    }
}

#[test]
fn all_scripts_meet_their_expectations() {
    let paths = script_paths();
    assert!(!paths.is_empty(), "no scripts found under tests/scripts");

    let failures: Vec<String> = paths
        .iter()
        .filter_map(|path| {
            check_script(path)
                .err()
                .map(|reason| format!("{}: {reason}", path.display()))
        })
        .collect();

    assert!(
        failures.is_empty(),
        "{} of {} scripts failed:\n{}",
        failures.len(),
        paths.len(),
        failures.join("\n")
    );
}
