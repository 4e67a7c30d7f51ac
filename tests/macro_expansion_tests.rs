//! Macro definition and expansion as seen from whole programs.

mod common;

use common::{assert_error_code, output_of, run, run_with_config};
use lust::InterpreterConfig;

const COND: &str = "
    (macro (cond clauses...)
      (if (nil? clauses)
          nil
          (let ((clause (head clauses)))
            `(if ,(head clause)
                 (begin ,@(tail clause))
                 (cond ,@(tail clauses))))))";

#[test]
fn recursive_cond_macro() {
    assert_eq!(run(&format!("{COND} (cond ((= 1 2) 'x) (t 'y))")), "y");
    assert_eq!(run(&format!("{COND} (cond ((= 1 1) 'x) (t 'y))")), "x");
    assert_eq!(run(&format!("{COND} (cond ((= 1 2) 'x))")), "nil");
}

#[test]
fn cond_clause_bodies_run_in_order() {
    let source = format!("{COND} (cond (false 1) (true (display \"a\") (display \"b\") 3))");
    assert_eq!(output_of(&source), "ab");
}

#[test]
fn macros_see_their_arguments_unevaluated() {
    let source = "
        (macro (quote-all xs...) `(quote ,xs))
        (quote-all (undefined 1) [2 3])";
    assert_eq!(run(source), "((undefined 1) [2 3])");
}

#[test]
fn unless_built_from_if() {
    let source = "
        (macro (unless c body...) `(if ,c nil (begin ,@body)))
        (unless (= 1 2) (display \"ran\") 42)";
    assert_eq!(run(source), "42");
    assert_eq!(output_of(source), "ran");
}

#[test]
fn macros_may_expand_into_other_macros() {
    let source = "
        (macro (unless c body...) `(if ,c nil (begin ,@body)))
        (macro (when c body...) `(unless (not ,c) ,@body))
        (when true 'yes)";
    assert_eq!(run(source), "yes");
}

#[test]
fn expansion_is_unhygienic() {
    let source = "
        (macro (with-it value body...) `(let ((it ,value)) ,@body))
        (with-it 21 (* it 2))";
    assert_eq!(run(source), "42");
}

#[test]
fn gensym_avoids_capture() {
    let source = "
        (macro (swap! a b)
          (let ((tmp (gensym \"tmp\")))
            `(let ((,tmp ,a)) (set! ,a ,b) (set! ,b ,tmp))))
        (let! tmp 1)
        (let! other 2)
        (swap! tmp other)
        (list tmp other)";
    assert_eq!(run(source), "(2 1)");
}

#[test]
fn macros_expand_inside_function_bodies() {
    let source = "
        (macro (twice e) `(begin ,e ,e))
        (let (f) (twice (display \"x\")))
        (f)";
    assert_eq!(output_of(source), "xx");
}

#[test]
fn special_forms_cannot_be_shadowed_by_macros() {
    let source = "
        (macro (if c a b) ''hijacked)
        (if true 'kept 'other)";
    assert_eq!(run(source), "kept");
}

#[test]
fn macro_arity_is_checked() {
    let source = "(macro (pair-up a b) `(list ,a ,b)) (pair-up 1)";
    assert_error_code(source, "macro_expansion");
}

#[test]
fn runaway_expansion_is_bounded() {
    let mut config = InterpreterConfig::default();
    config.max_macro_expansions = 50;
    let source = "(macro (forever x) `(forever ,x)) (forever 1)";
    let err = run_with_config(source, config).unwrap_err();
    assert_eq!(err.code(), "lust::expansion::macro_expansion");
}
