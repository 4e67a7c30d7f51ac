//! # Collection Operations
//!
//! Atoms over lists (cons pairs ending in `nil`), vectors, sets and maps.
//! Every collection is persistent: "modifying" atoms return a new value and
//! leave their argument untouched.
//!
//! ## Atoms Provided
//!
//! - **Lists**: `list`, `cons`, `head`, `tail`, `length`, `append`, `reverse`, `nth`
//! - **Collections**: `vector`, `set`, `get`, `assoc`, `dissoc`, `contains?`,
//!   `count`, `keys`, `values`, `conj`

use im::{HashSet as ImHashSet, Vector as ImVector};

use crate::atoms::helpers::{
    check_arity, check_min_arity, extract_sequence, invalid_operation, type_error, AtomResult,
    ExtractValue,
};
use crate::atoms::{AtomRegistry, PureAtomFn};
use crate::runtime::value::{MapValue, Value};

// ============================================================================
// HELPERS
// ============================================================================

/// Number of elements in any collection or string.
fn size_of(value: &Value, name: &str) -> Result<usize, crate::errors::LustError> {
    match value {
        Value::Nil => Ok(0),
        Value::Pair(_) => value
            .list_to_vec()
            .map(|items| items.len())
            .ok_or_else(|| type_error(name, 0, "a proper list", value)),
        Value::Vector(items) => Ok(items.len()),
        Value::Set(items) => Ok(items.len()),
        Value::Map(map) => Ok(map.len()),
        Value::String(s) => Ok(s.chars().count()),
        other => Err(type_error(name, 0, "a collection or string", other)),
    }
}

fn index_arg(value: &Value, name: &str) -> Result<Option<usize>, crate::errors::LustError> {
    let index: i64 = value.extract(name, 1)?;
    Ok(usize::try_from(index).ok())
}

// ============================================================================
// LIST OPERATIONS
// ============================================================================

/// Builds a list from its arguments.
///
/// Usage: (list <a> <b> ...)
///
///   Returns: List
///
/// Example:
///   (list 1 2 3) ; => (1 2 3)
pub const ATOM_LIST: PureAtomFn = |args| Ok(Value::list(args.to_vec()));

/// Prepends a value to a list (or builds an improper pair).
///
/// Usage: (cons <head> <tail>)
///
///   Returns: Pair
///
/// Example:
///   (cons 1 '(2 3)) ; => (1 2 3)
pub const ATOM_CONS: PureAtomFn = |args| {
    check_arity(args, 2, "cons")?;
    Ok(Value::cons(args[0].clone(), args[1].clone()))
};

/// First element of a non-empty list.
///
/// Usage: (head <list>)
///
/// Example:
///   (head '(1 2 3)) ; => 1
pub const ATOM_HEAD: PureAtomFn = |args| {
    check_arity(args, 1, "head")?;
    match &args[0] {
        Value::Pair(pair) => Ok(pair.head.clone()),
        other => Err(type_error("head", 0, "a non-empty list", other)),
    }
};

/// Everything after the first element of a non-empty list.
///
/// Usage: (tail <list>)
///
/// Example:
///   (tail '(1 2 3)) ; => (2 3)
pub const ATOM_TAIL: PureAtomFn = |args| {
    check_arity(args, 1, "tail")?;
    match &args[0] {
        Value::Pair(pair) => Ok(pair.tail.clone()),
        other => Err(type_error("tail", 0, "a non-empty list", other)),
    }
};

/// Number of elements in a list or vector, or characters in a string.
///
/// Usage: (length <seq>)
///
/// Example:
///   (length '(1 2 3)) ; => 3
pub const ATOM_LENGTH: PureAtomFn = |args| {
    check_arity(args, 1, "length")?;
    match &args[0] {
        Value::Set(_) | Value::Map(_) => Err(type_error("length", 0, "a list, vector or string", &args[0])),
        value => size_of(value, "length").map(|n| Value::Int(n as i64)),
    }
};

/// Concatenates lists.
///
/// Usage: (append <list> ...)
///
/// Example:
///   (append '(1) '(2 3) nil) ; => (1 2 3)
pub const ATOM_APPEND: PureAtomFn = |args| {
    let mut items = Vec::new();
    for (i, arg) in args.iter().enumerate() {
        match arg.list_to_vec() {
            Some(list) => items.extend(list),
            None => return Err(type_error("append", i, "a proper list", arg)),
        }
    }
    Ok(Value::list(items))
};

/// Reverses a list or vector.
///
/// Usage: (reverse <seq>)
///
/// Example:
///   (reverse '(1 2 3)) ; => (3 2 1)
pub const ATOM_REVERSE: PureAtomFn = |args| {
    check_arity(args, 1, "reverse")?;
    match &args[0] {
        Value::Vector(items) => Ok(Value::Vector(items.iter().rev().cloned().collect())),
        list => {
            let mut items = extract_sequence(list, "reverse", 0)?;
            items.reverse();
            Ok(Value::list(items))
        }
    }
};

/// Element at a zero-based index of a list or vector; `nil` when out of range.
///
/// Usage: (nth <seq> <index>)
///
/// Example:
///   (nth '(a b c) 1) ; => b
pub const ATOM_NTH: PureAtomFn = |args| {
    check_arity(args, 2, "nth")?;
    let Some(index) = index_arg(&args[1], "nth")? else {
        return Ok(Value::Nil);
    };
    match &args[0] {
        Value::Vector(items) => Ok(items.get(index).cloned().unwrap_or_default()),
        Value::Nil | Value::Pair(_) => Ok(args[0].iter_list().nth(index).cloned().unwrap_or_default()),
        other => Err(type_error("nth", 0, "a list or vector", other)),
    }
};

// ============================================================================
// COLLECTION OPERATIONS
// ============================================================================

/// Builds a vector from its arguments.
///
/// Usage: (vector <a> <b> ...)
///
/// Example:
///   (vector 1 2) ; => [1 2]
pub const ATOM_VECTOR: PureAtomFn = |args| Ok(Value::Vector(args.iter().cloned().collect()));

/// Builds a set from its arguments; duplicates collapse.
///
/// Usage: (set <a> <b> ...)
///
/// Example:
///   (count (set 1 1 2)) ; => 2
pub const ATOM_SET: PureAtomFn = |args| Ok(Value::Set(args.iter().cloned().collect()));

/// Looks up a key in a map, an index in a vector, or a member of a set.
///
/// Usage: (get <coll> <key> [default])
///
///   Returns: the value found, else `default` (or `nil`)
///
/// Example:
///   (get {'a 1} 'a)    ; => 1
///   (get [10 20] 5 0)  ; => 0
pub const ATOM_GET: PureAtomFn = |args| -> AtomResult {
    check_min_arity(args, 2, "get")?;
    if args.len() > 3 {
        return Err(crate::atoms::helpers::arity_error("get", "2 or 3", args.len()));
    }
    let default = args.get(2).cloned().unwrap_or_default();
    let found = match (&args[0], &args[1]) {
        (Value::Map(map), key) => map.get(key).cloned(),
        (Value::Vector(items), Value::Int(i)) => {
            usize::try_from(*i).ok().and_then(|i| items.get(i).cloned())
        }
        (Value::Set(items), key) => items.contains(key).then(|| key.clone()),
        (Value::Nil, _) => None,
        (other, _) => return Err(type_error("get", 0, "a map, vector or set", other)),
    };
    Ok(found.unwrap_or(default))
};

/// Associates keys with values in a map, or replaces vector slots.
///
/// Usage: (assoc <coll> <key> <value> ...)
///
/// Example:
///   (assoc {'a 1} 'b 2) ; => {a 1 b 2}
///   (assoc [1 2] 0 9)   ; => [9 2]
pub const ATOM_ASSOC: PureAtomFn = |args| {
    check_min_arity(args, 3, "assoc")?;
    if args.len() % 2 == 0 {
        return Err(crate::atoms::helpers::arity_error(
            "assoc",
            "a collection plus key/value pairs",
            args.len(),
        ));
    }
    let pairs = args[1..].chunks(2);
    match &args[0] {
        Value::Map(map) => Ok(Value::Map(pairs.fold(map.clone(), |map, kv| {
            map.insert(kv[0].clone(), kv[1].clone())
        }))),
        Value::Nil => Ok(Value::Map(
            pairs.map(|kv| (kv[0].clone(), kv[1].clone())).collect(),
        )),
        Value::Vector(items) => {
            let mut items = items.clone();
            for kv in pairs {
                match index_arg(&kv[0], "assoc")? {
                    Some(i) if i < items.len() => {
                        items.set(i, kv[1].clone());
                    }
                    Some(i) if i == items.len() => items.push_back(kv[1].clone()),
                    _ => return Err(invalid_operation("assoc", "a vector index out of range")),
                }
            }
            Ok(Value::Vector(items))
        }
        other => Err(type_error("assoc", 0, "a map or vector", other)),
    }
};

/// Removes keys from a map or members from a set.
///
/// Usage: (dissoc <coll> <key> ...)
///
/// Example:
///   (dissoc {'a 1 'b 2} 'a) ; => {b 2}
pub const ATOM_DISSOC: PureAtomFn = |args| {
    check_min_arity(args, 1, "dissoc")?;
    match &args[0] {
        Value::Map(map) => Ok(Value::Map(
            args[1..].iter().fold(map.clone(), |map, key| map.remove(key)),
        )),
        Value::Set(items) => Ok(Value::Set(
            args[1..].iter().fold(items.clone(), |set, key| set.without(key)),
        )),
        other => Err(type_error("dissoc", 0, "a map or set", other)),
    }
};

/// Membership test: map keys, set members, list or vector elements.
///
/// Usage: (contains? <coll> <value>)
///
/// Example:
///   (contains? #{1 2} 2)  ; => true
///   (contains? {'a 1} 'a) ; => true
pub const ATOM_CONTAINS: PureAtomFn = |args| {
    check_arity(args, 2, "contains?")?;
    let needle = &args[1];
    let found = match &args[0] {
        Value::Map(map) => map.contains_key(needle),
        Value::Set(items) => items.contains(needle),
        Value::Vector(items) => items.iter().any(|item| item == needle),
        Value::Nil | Value::Pair(_) => args[0].iter_list().any(|item| item == needle),
        other => return Err(type_error("contains?", 0, "a collection", other)),
    };
    Ok(Value::Bool(found))
};

/// Number of elements in any collection, or characters in a string.
///
/// Usage: (count <coll>)
///
/// Example:
///   (count {'a 1 'b 2}) ; => 2
pub const ATOM_COUNT: PureAtomFn = |args| {
    check_arity(args, 1, "count")?;
    size_of(&args[0], "count").map(|n| Value::Int(n as i64))
};

/// Keys of a map as a list, in insertion order.
///
/// Usage: (keys <map>)
pub const ATOM_KEYS: PureAtomFn = |args| {
    check_arity(args, 1, "keys")?;
    let map: MapValue = args[0].extract("keys", 0)?;
    Ok(Value::list(map.keys().cloned().collect::<Vec<_>>()))
};

/// Values of a map as a list, in insertion order.
///
/// Usage: (values <map>)
pub const ATOM_VALUES: PureAtomFn = |args| {
    check_arity(args, 1, "values")?;
    let map: MapValue = args[0].extract("values", 0)?;
    Ok(Value::list(map.values().cloned().collect::<Vec<_>>()))
};

/// Adds elements where the collection grows cheapest: lists at the front,
/// vectors at the back, sets anywhere, maps from `[key value]` vectors.
///
/// Usage: (conj <coll> <x> ...)
///
/// Example:
///   (conj '(2 3) 1) ; => (1 2 3)
///   (conj [1 2] 3)  ; => [1 2 3]
pub const ATOM_CONJ: PureAtomFn = |args| {
    check_min_arity(args, 1, "conj")?;
    let additions = &args[1..];
    match &args[0] {
        Value::Nil | Value::Pair(_) => Ok(additions
            .iter()
            .fold(args[0].clone(), |list, x| Value::cons(x.clone(), list))),
        Value::Vector(items) => {
            let mut items: ImVector<Value> = items.clone();
            items.extend(additions.iter().cloned());
            Ok(Value::Vector(items))
        }
        Value::Set(items) => {
            let mut items: ImHashSet<Value> = items.clone();
            items.extend(additions.iter().cloned());
            Ok(Value::Set(items))
        }
        Value::Map(map) => {
            let mut map = map.clone();
            for (i, entry) in additions.iter().enumerate() {
                match entry {
                    Value::Vector(kv) if kv.len() == 2 => {
                        map = map.insert(kv[0].clone(), kv[1].clone());
                    }
                    other => return Err(type_error("conj", i + 1, "a [key value] vector", other)),
                }
            }
            Ok(Value::Map(map))
        }
        other => Err(type_error("conj", 0, "a collection", other)),
    }
};

// ============================================================================
// REGISTRATION FUNCTION
// ============================================================================

/// Registers all collection atoms with the given registry.
pub fn register_collection_atoms(registry: &mut AtomRegistry) {
    // Lists
    registry.register_pure("list", ATOM_LIST);
    registry.register_pure("cons", ATOM_CONS);
    registry.register_pure("head", ATOM_HEAD);
    registry.register_pure("tail", ATOM_TAIL);
    registry.register_pure("length", ATOM_LENGTH);
    registry.register_pure("append", ATOM_APPEND);
    registry.register_pure("reverse", ATOM_REVERSE);
    registry.register_pure("nth", ATOM_NTH);

    // Vectors, sets and maps
    registry.register_pure("vector", ATOM_VECTOR);
    registry.register_pure("set", ATOM_SET);
    registry.register_pure("get", ATOM_GET);
    registry.register_pure("assoc", ATOM_ASSOC);
    registry.register_pure("dissoc", ATOM_DISSOC);
    registry.register_pure("contains?", ATOM_CONTAINS);
    registry.register_pure("count", ATOM_COUNT);
    registry.register_pure("keys", ATOM_KEYS);
    registry.register_pure("values", ATOM_VALUES);
    registry.register_pure("conj", ATOM_CONJ);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[i64]) -> Value {
        Value::list(items.iter().copied().map(Value::Int).collect::<Vec<_>>())
    }

    #[test]
    fn list_primitives() {
        let xs = list(&[1, 2, 3]);
        assert_eq!(ATOM_HEAD(&[xs.clone()]).unwrap(), Value::Int(1));
        assert_eq!(ATOM_TAIL(&[xs.clone()]).unwrap(), list(&[2, 3]));
        assert_eq!(ATOM_LENGTH(&[xs.clone()]).unwrap(), Value::Int(3));
        assert_eq!(ATOM_REVERSE(&[xs.clone()]).unwrap(), list(&[3, 2, 1]));
        assert_eq!(ATOM_NTH(&[xs.clone(), Value::Int(2)]).unwrap(), Value::Int(3));
        assert_eq!(ATOM_NTH(&[xs, Value::Int(9)]).unwrap(), Value::Nil);
        assert!(ATOM_HEAD(&[Value::Nil]).is_err());
    }

    #[test]
    fn append_concatenates_and_accepts_nil() {
        let joined = ATOM_APPEND(&[list(&[1]), Value::Nil, list(&[2, 3])]).unwrap();
        assert_eq!(joined, list(&[1, 2, 3]));
    }

    #[test]
    fn maps_are_persistent() {
        let empty = Value::Map(MapValue::new());
        let one = ATOM_ASSOC(&[empty.clone(), Value::symbol("a"), Value::Int(1)]).unwrap();
        assert_eq!(ATOM_COUNT(&[empty]).unwrap(), Value::Int(0));
        assert_eq!(
            ATOM_GET(&[one.clone(), Value::symbol("a")]).unwrap(),
            Value::Int(1)
        );
        assert_eq!(
            ATOM_GET(&[one.clone(), Value::symbol("zz"), Value::Int(0)]).unwrap(),
            Value::Int(0)
        );
        let none = ATOM_DISSOC(&[one.clone(), Value::symbol("a")]).unwrap();
        assert_eq!(ATOM_COUNT(&[none]).unwrap(), Value::Int(0));
        assert_eq!(ATOM_KEYS(&[one]).unwrap().to_string(), "(a)");
    }

    #[test]
    fn conj_grows_each_collection_at_its_natural_end() {
        assert_eq!(
            ATOM_CONJ(&[list(&[2, 3]), Value::Int(1)]).unwrap(),
            list(&[1, 2, 3])
        );
        let v = ATOM_VECTOR(&[Value::Int(1)]).unwrap();
        assert_eq!(ATOM_CONJ(&[v, Value::Int(2)]).unwrap().to_string(), "[1 2]");
        let s = ATOM_SET(&[Value::Int(1), Value::Int(1)]).unwrap();
        assert_eq!(ATOM_COUNT(&[s]).unwrap(), Value::Int(1));
    }

    #[test]
    fn contains_checks_membership() {
        let s = ATOM_SET(&[Value::Int(1), Value::Int(2)]).unwrap();
        assert_eq!(
            ATOM_CONTAINS(&[s, Value::Int(2)]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            ATOM_CONTAINS(&[list(&[1]), Value::Int(5)]).unwrap(),
            Value::Bool(false)
        );
    }
}
