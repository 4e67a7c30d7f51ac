//! The Lust value model.
//!
//! Every runtime datum is a `Value`. Lists are chains of immutable `Pair`s
//! ending in `Nil`; vectors, sets and maps are persistent `im` collections.
//! Equality is structural for data and by identity for functions, macros and
//! modules. Walking along a list's tail (drop, equality, hashing, printing)
//! is iterative, so very long lists never recurse natively.
//!
//! `#{...}` and `{...}` read as `SetLiteral`/`MapLiteral` forms that keep
//! every element in source order. Evaluating one builds the real `Set` or
//! `Map`; quoting one turns it into data with `to_datum`.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use im::{HashMap as ImHashMap, HashSet as ImHashSet, Vector as ImVector};
use num_bigint::BigInt;
use num_rational::BigRational;

use crate::atoms::Atom;
use crate::errors::{ErrorKind, LustError};
use crate::runtime::env::Env;
use crate::syntax::{keywords, Symbol};

// ============================================================================
// CORE VALUE TYPE
// ============================================================================

#[derive(Clone, Default)]
pub enum Value {
    /// The empty list; also the "nothing" result.
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    BigInt(Rc<BigInt>),
    Ratio(Rc<BigRational>),
    Float(f64),
    String(Rc<str>),
    Symbol(Symbol),
    Pair(Rc<Pair>),
    Vector(ImVector<Value>),
    Set(ImHashSet<Value>),
    Map(MapValue),
    SetLiteral(Rc<[Value]>),
    MapLiteral(Rc<[(Value, Value)]>),
    Closure(Rc<Lambda>),
    Macro(Rc<Lambda>),
    Native(NativeFn),
    Module(Rc<Module>),
    Record(Rc<Record>),
    Constructor(Rc<RecordVariant>),
}

/// An immutable cons cell.
pub struct Pair {
    pub head: Value,
    pub tail: Value,
}

impl Drop for Pair {
    fn drop(&mut self) {
        let mut next = std::mem::take(&mut self.tail);
        while let Value::Pair(rc) = next {
            match Rc::try_unwrap(rc) {
                Ok(mut pair) => next = std::mem::take(&mut pair.tail),
                Err(_) => break,
            }
        }
    }
}

/// Parameter list for closures and macros.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParamList {
    pub required: Vec<Symbol>,
    pub rest: Option<Symbol>,
}

/// Shared shape of closures and macros: parameters, body, defining scope.
pub struct Lambda {
    pub name: Option<Symbol>,
    pub params: ParamList,
    pub body: Rc<[Value]>,
    pub env: Env,
}

#[derive(Clone)]
pub struct NativeFn {
    pub name: Rc<str>,
    pub atom: Atom,
}

pub struct Module {
    pub name: Symbol,
    pub env: Env,
}

/// One tagged variant of a declared record type.
#[derive(Debug, PartialEq)]
pub struct RecordVariant {
    pub type_name: Symbol,
    pub tag: Symbol,
    pub fields: Vec<Symbol>,
}

pub struct Record {
    pub variant: Rc<RecordVariant>,
    pub values: Vec<Value>,
}

// ============================================================================
// CONSTRUCTION AND INSPECTION
// ============================================================================

impl Value {
    pub fn cons(head: Value, tail: Value) -> Value {
        Value::Pair(Rc::new(Pair { head, tail }))
    }

    /// Build a proper list from the items, last item innermost.
    pub fn list<I>(items: I) -> Value
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: DoubleEndedIterator,
    {
        Self::list_with_tail(items, Value::Nil)
    }

    pub fn list_with_tail<I>(items: I, tail: Value) -> Value
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: DoubleEndedIterator,
    {
        items
            .into_iter()
            .rev()
            .fold(tail, |acc, item| Value::cons(item, acc))
    }

    pub fn symbol(name: &str) -> Value {
        Value::Symbol(Symbol::new(name))
    }

    pub fn string(text: &str) -> Value {
        Value::String(Rc::from(text))
    }

    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Value::Nil | Value::Pair(_))
    }

    pub fn as_symbol(&self) -> Option<Symbol> {
        match self {
            Value::Symbol(sym) => Some(*sym),
            _ => None,
        }
    }

    /// The head symbol of a list form, if it has one.
    pub fn head_symbol(&self) -> Option<Symbol> {
        match self {
            Value::Pair(pair) => pair.head.as_symbol(),
            _ => None,
        }
    }

    /// True for `(quote x)` style two-element forms headed by `head`.
    pub fn is_form(&self, head: Symbol) -> bool {
        self.head_symbol() == Some(head)
    }

    pub fn iter_list(&self) -> ListIter<'_> {
        ListIter { current: self }
    }

    /// Collect a proper list into a vector; `None` for anything else.
    pub fn list_to_vec(&self) -> Option<Vec<Value>> {
        let mut iter = self.iter_list();
        let items: Vec<Value> = iter.by_ref().cloned().collect();
        matches!(iter.remainder(), Value::Nil).then_some(items)
    }

    /// Like `list_to_vec`, but reports non-lists as a type mismatch.
    pub fn expect_list(&self, what: &str) -> Result<Vec<Value>, LustError> {
        self.list_to_vec().ok_or_else(|| {
            LustError::new(ErrorKind::TypeMismatch {
                expected: format!("a proper list for {}", what),
                actual: self.describe(),
            })
        })
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) | Value::BigInt(_) => "int",
            Value::Ratio(_) => "ratio",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::Pair(_) => "pair",
            Value::Vector(_) => "vector",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
            Value::SetLiteral(_) => "set form",
            Value::MapLiteral(_) => "map form",
            Value::Closure(_) => "lambda",
            Value::Macro(_) => "macro",
            Value::Native(_) => "native function",
            Value::Module(_) => "module",
            Value::Record(_) => "record",
            Value::Constructor(_) => "constructor",
        }
    }

    /// Type name plus printed form, for error messages.
    pub fn describe(&self) -> String {
        let printed = self.to_string();
        if printed.chars().count() > 60 {
            let short: String = printed.chars().take(57).collect();
            format!("{} {}...", self.type_name(), short)
        } else {
            format!("{} {}", self.type_name(), printed)
        }
    }

    /// Quoted code as data: set and map forms become real sets and maps,
    /// keeping the last value for a repeated key.
    pub fn to_datum(&self) -> Value {
        match self {
            Value::Pair(_) => {
                let mut iter = self.iter_list();
                let items: Vec<Value> = iter.by_ref().map(Value::to_datum).collect();
                let tail = iter.remainder().to_datum();
                Value::list_with_tail(items, tail)
            }
            Value::Vector(items) => Value::Vector(items.iter().map(Value::to_datum).collect()),
            Value::SetLiteral(items) => Value::Set(items.iter().map(Value::to_datum).collect()),
            Value::MapLiteral(entries) => Value::Map(
                entries
                    .iter()
                    .map(|(k, v)| (k.to_datum(), v.to_datum()))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// The text `display`/`println` show: strings unquoted, everything else printed.
    pub fn display_string(&self) -> String {
        match self {
            Value::String(s) => s.to_string(),
            other => other.to_string(),
        }
    }
}

/// Iterator over the heads of a (possibly improper) list.
pub struct ListIter<'a> {
    current: &'a Value,
}

impl<'a> ListIter<'a> {
    /// Whatever follows the last pair visited: `Nil` for proper lists.
    pub fn remainder(&self) -> &'a Value {
        self.current
    }
}

impl<'a> Iterator for ListIter<'a> {
    type Item = &'a Value;

    fn next(&mut self) -> Option<Self::Item> {
        match self.current {
            Value::Pair(pair) => {
                self.current = &pair.tail;
                Some(&pair.head)
            }
            _ => None,
        }
    }
}

impl ParamList {
    /// Parse `(a b rest...)`, or a bare symbol that collects every argument.
    pub fn parse(form: &Value) -> Result<ParamList, LustError> {
        let kw = keywords();
        let bad = |found: &Value| {
            LustError::new(ErrorKind::TypeMismatch {
                expected: "parameter name".into(),
                actual: found.describe(),
            })
        };

        if let Value::Symbol(sym) = form {
            return Ok(ParamList {
                required: Vec::new(),
                rest: Some(*sym),
            });
        }

        let items = form.expect_list("a parameter list")?;
        let mut params = ParamList::default();
        for item in &items {
            if params.rest.is_some() {
                return Err(bad(item).with_help("a variadic parameter must come last"));
            }
            match item {
                Value::Symbol(sym) => params.required.push(*sym),
                varg if varg.is_form(kw.varg) => match varg.list_to_vec().as_deref() {
                    Some([_, Value::Symbol(sym)]) => params.rest = Some(*sym),
                    _ => return Err(bad(varg)),
                },
                other => return Err(bad(other)),
            }
        }
        Ok(params)
    }

    pub fn accepts(&self, count: usize) -> bool {
        if self.rest.is_some() {
            count >= self.required.len()
        } else {
            count == self.required.len()
        }
    }

    pub fn arity_string(&self) -> String {
        if self.rest.is_some() {
            format!("at least {}", self.required.len())
        } else {
            self.required.len().to_string()
        }
    }

    /// Pair parameters with arguments; the rest parameter gets a list.
    pub fn bind(&self, args: Vec<Value>) -> Vec<(Symbol, Value)> {
        let mut args = args.into_iter();
        let mut bound: Vec<(Symbol, Value)> = self
            .required
            .iter()
            .map(|sym| (*sym, args.next().unwrap_or_default()))
            .collect();
        if let Some(rest) = self.rest {
            bound.push((rest, Value::list(args.collect::<Vec<_>>())));
        }
        bound
    }
}

impl RecordVariant {
    pub fn field_index(&self, field: Symbol) -> Option<usize> {
        self.fields.iter().position(|f| *f == field)
    }

    pub fn same_variant(a: &Rc<RecordVariant>, b: &Rc<RecordVariant>) -> bool {
        Rc::ptr_eq(a, b) || (a.type_name == b.type_name && a.tag == b.tag)
    }
}

impl Record {
    pub fn get(&self, field: Symbol) -> Option<&Value> {
        self.variant
            .field_index(field)
            .and_then(|i| self.values.get(i))
    }
}

// ============================================================================
// MAPS - insertion ordered, looked up by hash
// ============================================================================

#[derive(Clone, Default)]
pub struct MapValue {
    entries: ImVector<(Value, Value)>,
    index: ImHashMap<Value, usize>,
}

impl MapValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.index
            .get(key)
            .and_then(|i| self.entries.get(*i))
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.index.contains_key(key)
    }

    /// A new map with `key` set; an existing key keeps its position.
    pub fn insert(&self, key: Value, value: Value) -> MapValue {
        let mut next = self.clone();
        match next.index.get(&key).copied() {
            Some(i) => {
                next.entries.set(i, (key, value));
            }
            None => {
                next.index.insert(key.clone(), next.entries.len());
                next.entries.push_back((key, value));
            }
        }
        next
    }

    pub fn remove(&self, key: &Value) -> MapValue {
        if !self.contains_key(key) {
            return self.clone();
        }
        self.iter()
            .filter(|(k, _)| k != key)
            .fold(MapValue::new(), |map, (k, v)| map.insert(k.clone(), v.clone()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Value, Value)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }
}

impl FromIterator<(Value, Value)> for MapValue {
    fn from_iter<T: IntoIterator<Item = (Value, Value)>>(iter: T) -> Self {
        iter.into_iter()
            .fold(MapValue::new(), |map, (k, v)| map.insert(k, v))
    }
}

impl PartialEq for MapValue {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl Hash for MapValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let combined = self.iter().fold(0u64, |acc, (k, v)| {
            let mut h = DefaultHasher::new();
            k.hash(&mut h);
            v.hash(&mut h);
            acc.wrapping_add(h.finish())
        });
        self.len().hash(state);
        combined.hash(state);
    }
}

// ============================================================================
// EQUALITY AND HASHING
// ============================================================================

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        let (mut a, mut b) = (self, other);
        loop {
            match (a, b) {
                (Value::Pair(x), Value::Pair(y)) => {
                    if Rc::ptr_eq(x, y) {
                        return true;
                    }
                    if x.head != y.head {
                        return false;
                    }
                    a = &x.tail;
                    b = &y.tail;
                }
                _ => return a.shallow_eq(b),
            }
        }
    }
}

impl Eq for Value {}

impl Value {
    fn shallow_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::BigInt(a), Value::BigInt(b)) => a == b,
            (Value::Ratio(a), Value::Ratio(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Vector(a), Value::Vector(b)) => a == b,
            (Value::Set(a), Value::Set(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::SetLiteral(a), Value::SetLiteral(b)) => a == b,
            (Value::MapLiteral(a), Value::MapLiteral(b)) => a == b,
            (Value::Closure(a), Value::Closure(b)) | (Value::Macro(a), Value::Macro(b)) => {
                Rc::ptr_eq(a, b)
            }
            (Value::Native(a), Value::Native(b)) => a.name == b.name,
            (Value::Module(a), Value::Module(b)) => Rc::ptr_eq(a, b),
            (Value::Record(a), Value::Record(b)) => {
                Rc::ptr_eq(a, b)
                    || (RecordVariant::same_variant(&a.variant, &b.variant)
                        && a.values == b.values)
            }
            (Value::Constructor(a), Value::Constructor(b)) => RecordVariant::same_variant(a, b),
            _ => false,
        }
    }

    fn hash_shallow<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Nil | Value::Pair(_) => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(n) => n.hash(state),
            Value::BigInt(n) => n.hash(state),
            Value::Ratio(r) => r.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::String(s) => s.hash(state),
            Value::Symbol(s) => s.hash(state),
            Value::Vector(items) => {
                items.len().hash(state);
                for item in items {
                    item.hash(state);
                }
            }
            Value::Set(items) => {
                let combined = items.iter().fold(0u64, |acc, item| {
                    let mut h = DefaultHasher::new();
                    item.hash(&mut h);
                    acc.wrapping_add(h.finish())
                });
                items.len().hash(state);
                combined.hash(state);
            }
            Value::Map(map) => map.hash(state),
            Value::SetLiteral(items) => items.hash(state),
            Value::MapLiteral(entries) => entries.hash(state),
            Value::Closure(l) | Value::Macro(l) => (Rc::as_ptr(l) as *const () as usize).hash(state),
            Value::Native(n) => n.name.hash(state),
            Value::Module(m) => (Rc::as_ptr(m) as *const () as usize).hash(state),
            Value::Record(r) => {
                r.variant.type_name.hash(state);
                r.variant.tag.hash(state);
                r.values.hash(state);
            }
            Value::Constructor(v) => {
                v.type_name.hash(state);
                v.tag.hash(state);
            }
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut current = self;
        loop {
            std::mem::discriminant(current).hash(state);
            match current {
                Value::Pair(pair) => {
                    pair.head.hash(state);
                    current = &pair.tail;
                }
                other => {
                    other.hash_shallow(state);
                    return;
                }
            }
        }
    }
}

// ============================================================================
// PRINTING
// ============================================================================

fn escape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\n' => result.push_str("\\n"),
            '\t' => result.push_str("\\t"),
            '\r' => result.push_str("\\r"),
            '\0' => result.push_str("\\0"),
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            c => result.push(c),
        }
    }
    result
}

fn write_seq<'a>(
    f: &mut fmt::Formatter<'_>,
    open: &str,
    items: impl Iterator<Item = &'a Value>,
    close: &str,
) -> fmt::Result {
    f.write_str(open)?;
    for (i, item) in items.enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{item}")?;
    }
    f.write_str(close)
}

fn write_entries<'a>(
    f: &mut fmt::Formatter<'_>,
    entries: impl Iterator<Item = &'a (Value, Value)>,
) -> fmt::Result {
    f.write_str("{")?;
    for (i, (k, v)) in entries.enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{k} {v}")?;
    }
    f.write_str("}")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::BigInt(n) => write!(f, "{n}"),
            Value::Ratio(r) => write!(f, "{}/{}", r.numer(), r.denom()),
            Value::Float(x) if x.is_finite() && x.fract() == 0.0 => write!(f, "{x:.1}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => write!(f, "\"{}\"", escape_string(s)),
            Value::Symbol(s) => write!(f, "{s}"),
            Value::Pair(_) => {
                let mut iter = self.iter_list();
                write_seq(f, "(", iter.by_ref(), "")?;
                match iter.remainder() {
                    Value::Nil => f.write_str(")"),
                    tail => write!(f, " . {tail})"),
                }
            }
            Value::Vector(items) => write_seq(f, "[", items.iter(), "]"),
            Value::Set(items) => write_seq(f, "#{", items.iter(), "}"),
            Value::Map(map) => write_entries(f, map.iter()),
            Value::SetLiteral(items) => write_seq(f, "#{", items.iter(), "}"),
            Value::MapLiteral(entries) => write_entries(f, entries.iter()),
            Value::Closure(l) => match l.name {
                Some(name) => write!(f, "#<lambda {name}>"),
                None => f.write_str("#<lambda>"),
            },
            Value::Macro(l) => match l.name {
                Some(name) => write!(f, "#<macro {name}>"),
                None => f.write_str("#<macro>"),
            },
            Value::Native(n) => write!(f, "#<native {}>", n.name),
            Value::Module(m) => write!(f, "#<module {}>", m.name),
            Value::Record(r) if r.values.is_empty() => write!(f, "{}", r.variant.tag),
            Value::Record(r) => {
                write!(f, "({}", r.variant.tag)?;
                for v in &r.values {
                    write!(f, " {v}")?;
                }
                f.write_str(")")
            }
            Value::Constructor(v) => write!(f, "#<constructor {}>", v.tag),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(range: std::ops::Range<i64>) -> Value {
        Value::list(range.map(Value::Int).collect::<Vec<_>>())
    }

    #[test]
    fn lists_compare_structurally() {
        assert_eq!(ints(0..3), ints(0..3));
        assert_ne!(ints(0..3), ints(0..4));
        assert_eq!(ints(0..3).to_string(), "(0 1 2)");
        assert_eq!(Value::list(Vec::new()), Value::Nil);
    }

    #[test]
    fn improper_tails_print_with_a_dot() {
        let v = Value::cons(Value::Int(1), Value::Int(2));
        assert_eq!(v.to_string(), "(1 . 2)");
        assert_eq!(v.list_to_vec(), None);
    }

    #[test]
    fn very_long_lists_are_handled_iteratively() {
        let mut list = Value::Nil;
        for i in 0..1_000_000 {
            list = Value::cons(Value::Int(i), list);
        }
        let copy = list.clone();
        assert_eq!(list, copy);
        let mut h1 = DefaultHasher::new();
        list.hash(&mut h1);
        assert!(list.to_string().len() > 1_000_000);
        drop(copy);
        drop(list);
    }

    #[test]
    fn maps_keep_insertion_order_but_compare_unordered() {
        let a = MapValue::new()
            .insert(Value::symbol("name"), Value::string("John"))
            .insert(Value::symbol("age"), Value::Int(30));
        let b = MapValue::new()
            .insert(Value::symbol("age"), Value::Int(30))
            .insert(Value::symbol("name"), Value::string("John"));
        assert_eq!(Value::Map(a.clone()), Value::Map(b));
        assert_eq!(Value::Map(a.clone()).to_string(), "{name \"John\" age 30}");
        assert_eq!(a.get(&Value::symbol("name")), Some(&Value::string("John")));
        assert_eq!(a.remove(&Value::symbol("name")).len(), 1);
    }

    #[test]
    fn param_lists_support_rest_parameters() {
        let form = Value::list(vec![
            Value::symbol("a"),
            Value::list(vec![Value::symbol("varg"), Value::symbol("more")]),
        ]);
        let params = ParamList::parse(&form).unwrap();
        assert_eq!(params.required, vec![Symbol::new("a")]);
        assert!(params.accepts(1) && params.accepts(4) && !params.accepts(0));
        assert_eq!(params.arity_string(), "at least 1");
        let bound = params.bind(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(bound[1].1.to_string(), "(2 3)");
    }

    #[test]
    fn floats_print_distinctly_from_ints() {
        assert_eq!(Value::Float(3.0).to_string(), "3.0");
        assert_eq!(Value::Float(0.5).to_string(), "0.5");
        assert_ne!(Value::Float(3.0), Value::Int(3));
    }
}
