// Regression tests for the `lust` binary: exit codes, printed values and
// miette-rendered diagnostics.

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::{prelude::PredicateBooleanExt, str::contains};

/// A script file under the OS temp dir, removed on drop.
struct TempScript(PathBuf);

impl TempScript {
    fn new(name: &str, source: &str) -> Self {
        let path = std::env::temp_dir().join(format!("lust-{}-{}.lust", std::process::id(), name));
        fs::write(&path, source).unwrap();
        TempScript(path)
    }
}

impl Drop for TempScript {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.0);
    }
}

fn lust() -> Command {
    Command::cargo_bin("lust").unwrap()
}

#[test]
fn run_prints_the_final_value() {
    let script = TempScript::new("value", "(let (sq x) (* x x))\n(sq 12)\n");
    lust()
        .arg("run")
        .arg(&script.0)
        .assert()
        .success()
        .stdout("144\n");
}

#[test]
fn run_streams_println_output() {
    let script = TempScript::new("println", "(println \"hello\" 'world)\n");
    lust()
        .arg("run")
        .arg(&script.0)
        .assert()
        .success()
        .stdout("hello world\n");
}

#[test]
fn parse_errors_are_rendered_with_diagnostics() {
    let script = TempScript::new("parse", "(let x 42");
    lust()
        .arg("run")
        .arg(&script.0)
        .assert()
        .failure()
        .stderr(contains("lust::parse").or(contains("help:")));
}

#[test]
fn runtime_errors_name_their_code() {
    let script = TempScript::new("runtime", "(let a 1)\n(set! a 2)\n");
    lust()
        .arg("run")
        .arg(&script.0)
        .assert()
        .failure()
        .stderr(contains("lust::runtime::immutable_binding_assignment"));
}

#[test]
fn missing_files_fail_cleanly() {
    lust()
        .arg("run")
        .arg("definitely/not/here.lust")
        .assert()
        .failure()
        .stderr(contains("lust::host::io"));
}

#[test]
fn expand_prints_macro_free_forms() {
    let script = TempScript::new(
        "expand",
        "(macro (unless c body...) `(if ,c nil (begin ,@body)))\n(unless x 1)\n",
    );
    lust()
        .arg("expand")
        .arg(&script.0)
        .assert()
        .success()
        .stdout(contains("(if x nil (begin 1))"));
}

#[test]
fn read_prints_desugared_forms() {
    let script = TempScript::new("read", "person.name 'x\n");
    lust()
        .arg("read")
        .arg(&script.0)
        .assert()
        .success()
        .stdout("(. person (quote name))\n(quote x)\n");
}

#[test]
fn list_atoms_includes_the_builtins() {
    lust()
        .arg("list-atoms")
        .assert()
        .success()
        .stdout(contains("println").and(contains("gensym")));
}

#[test]
fn max_depth_flag_limits_recursion() {
    let script = TempScript::new("depth", "(let (f n) (+ 1 (f n)))\n(f 1)\n");
    lust()
        .arg("--max-depth")
        .arg("100")
        .arg("run")
        .arg(&script.0)
        .assert()
        .failure()
        .stderr(contains("recursion_limit"));
}
