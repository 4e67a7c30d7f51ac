//! # External Interface Operations
//!
//! Atoms that talk to the outside world. Output goes through the context's
//! `SharedOutput`, so tests can capture it and embedders can redirect it.
//!
//! ## Atoms Provided
//!
//! - `println`: display forms separated by spaces, then a newline
//! - `display`: display forms separated by spaces, no newline

use crate::atoms::{AtomRegistry, StatefulAtomFn};
use crate::runtime::value::Value;

fn joined(args: &[Value]) -> String {
    args.iter()
        .map(Value::display_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Prints its arguments followed by a newline.
///
/// Usage: (println <a> <b> ...)
///
///   Returns: nil
///
/// Example:
///   (println "hello" 42) ; prints: hello 42
pub const ATOM_PRINTLN: StatefulAtomFn = |args, context| {
    let mut line = joined(args);
    line.push('\n');
    context.emit(&line);
    Ok(Value::Nil)
};

/// Prints its arguments without a trailing newline.
///
/// Usage: (display <a> <b> ...)
///
///   Returns: nil
pub const ATOM_DISPLAY: StatefulAtomFn = |args, context| {
    context.emit(&joined(args));
    Ok(Value::Nil)
};

/// Registers all external interface atoms with the given registry.
pub fn register_external_atoms(registry: &mut AtomRegistry) {
    registry.register_stateful("println", ATOM_PRINTLN);
    registry.register_stateful("display", ATOM_DISPLAY);
}
