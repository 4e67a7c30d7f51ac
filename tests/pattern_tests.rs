//! `type` declarations and `match`.

mod common;

use common::{assert_error_code, run};
use lust::ErrorKind;

const SHAPES: &str = "
    (type Shape (Circle r) (Rect w h) Dot)
    (let (area s)
      (match s
        ((Circle r) (* 3 r r))
        ((Rect w h) (* w h))
        (Dot 0)))";

#[test]
fn matching_on_declared_variants() {
    assert_eq!(run(&format!("{SHAPES} (area (Circle 2))")), "12");
    assert_eq!(run(&format!("{SHAPES} (area (Rect 3 4))")), "12");
    assert_eq!(run(&format!("{SHAPES} (area Dot)")), "0");
}

#[test]
fn bare_tags_bind_declared_field_names() {
    let source = format!("{SHAPES} (match (Rect 2 5) (Rect (+ w h)) (t 'other))");
    assert_eq!(run(&source), "7");
}

#[test]
fn records_print_and_expose_fields() {
    assert_eq!(run(&format!("{SHAPES} (Rect 3 4)")), "(Rect 3 4)");
    assert_eq!(run(&format!("{SHAPES} (let c (Circle 9)) c.r")), "9");
    assert_eq!(run(&format!("{SHAPES} Dot")), "Dot");
}

#[test]
fn constructors_check_their_arity() {
    assert_error_code(&format!("{SHAPES} (Rect 1)"), "arity_mismatch");
}

#[test]
fn list_patterns_destructure_pairs() {
    let source = "
        (let (sum xs)
          (match xs
            (Empty 0)
            ((Pair x rest) (+ x (sum rest)))))
        (sum '(1 2 3 4))";
    assert_eq!(run(source), "10");
}

#[test]
fn literal_and_quoted_patterns() {
    let source = "
        (let (describe v)
          (match v
            (0 'zero)
            (\"hi\" 'greeting)
            ('done 'finished)
            (Int 'number)
            (_ 'unknown)))
        (list (describe 0) (describe \"hi\") (describe 'done) (describe 7) (describe [1]))";
    assert_eq!(run(source), "(zero greeting finished number unknown)");
}

#[test]
fn the_first_matching_clause_wins() {
    assert_eq!(run("(match 5 (Number 'first) (Int 'second))"), "first");
}

#[test]
fn match_bodies_are_tail_positions() {
    let source = "
        (let (count-down n)
          (match n
            (0 'done)
            (t (count-down (- n 1)))))
        (count-down 200000)";
    assert_eq!(run(source), "done");
}

#[test]
fn no_matching_clause_is_a_type_mismatch() {
    assert_error_code("(match 3 (0 'zero) (\"x\" 'x))", "type_mismatch");
}

#[test]
fn unknown_tags_are_unbound() {
    assert_error_code("(match 3 (Triangle 'tri))", "unbound_variable");
}

#[test]
fn ordinary_variables_are_not_tags() {
    let kind = assert_error_code("(let x 5) (match 5 (x 1))", "type_mismatch");
    assert!(matches!(kind, ErrorKind::TypeMismatch { expected, .. } if expected == "a variant tag"));
}

#[test]
fn numeric_kind_tags_cover_ratios_and_big_integers() {
    let source = "
        (let (kind n) (match n (Int 'int) (Ratio 'ratio) (Float 'float)))
        (list (kind 1/2) (kind 99999999999999999999) (kind 0.5))";
    assert_eq!(run(source), "(ratio int float)");
}
