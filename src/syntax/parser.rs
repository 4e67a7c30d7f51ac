//! Lust Reader
//!
//! Converts source text into `Value` trees, one top-level form at a time.
//! The reader first finds the extent of the next form by balancing
//! delimiters, then hands that slice to the pest grammar. A malformed form
//! yields a located `LustError` and reading resumes after it, so one bad
//! form never hides the forms that follow.

use pest::{iterators::Pair, Parser};
use pest_derive::Parser;
use tracing::trace;

use crate::errors::{ErrorKind, LustError, SourceContext};
use crate::runtime::numeric::parse_exact;
use crate::runtime::value::Value;
use crate::syntax::{keywords, Span, Spanned, Symbol};

#[derive(Parser)]
#[grammar = "syntax/grammar.pest"]
struct LustGrammar;

// ============================================================================
// PUBLIC API
// ============================================================================

/// A lazy, restartable reader over the top-level forms of a source.
pub struct Reader<'a> {
    context: &'a SourceContext,
    pos: usize,
}

/// Read every top-level form, stopping at the first error.
pub fn read_all(context: &SourceContext) -> Result<Vec<Spanned<Value>>, LustError> {
    Reader::new(context).collect()
}

/// Read a source string into bare values.
pub fn read_str(source: &str) -> Result<Vec<Value>, LustError> {
    let context = SourceContext::from_file("<input>", source);
    Reader::new(&context)
        .map(|form| form.map(|spanned| spanned.value))
        .collect()
}

impl<'a> Reader<'a> {
    pub fn new(context: &'a SourceContext) -> Self {
        Self { context, pos: 0 }
    }

    /// Byte offset of the next unread character.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Read the next top-level form, or `None` at end of input.
    pub fn read_form(&mut self) -> Option<Result<Spanned<Value>, LustError>> {
        let start = self.skip_trivia(self.pos);
        if start >= self.source().len() {
            self.pos = start;
            return None;
        }

        let end = match self.scan_extent(start) {
            Ok(end) => end,
            Err(failure) => {
                self.pos = failure.resume;
                return Some(Err(self.error(failure.kind, failure.span)));
            }
        };
        self.pos = end;

        let span = Span::new(start, end);
        let result = self
            .parse_extent(span)
            .map(|value| Spanned::new(value, span));
        if let Ok(form) = &result {
            trace!(start, end, form = %form.value, "read form");
        }
        Some(result)
    }

    fn source(&self) -> &'a str {
        &self.context.content
    }

    fn error(&self, kind: ErrorKind, span: Span) -> LustError {
        LustError::at(kind, self.context, span)
    }
}

impl Iterator for Reader<'_> {
    type Item = Result<Spanned<Value>, LustError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_form()
    }
}

// ============================================================================
// FORM EXTENT SCANNING
// ============================================================================

struct ScanFailure {
    kind: ErrorKind,
    span: Span,
    resume: usize,
}

fn closer_for(open: u8) -> u8 {
    match open {
        b'(' => b')',
        b'[' => b']',
        _ => b'}',
    }
}

fn is_terminator(byte: u8) -> bool {
    matches!(
        byte,
        b' ' | b'\t'
            | b'\r'
            | b'\n'
            | b'('
            | b')'
            | b'['
            | b']'
            | b'{'
            | b'}'
            | b'"'
            | b';'
            | b'\''
            | b'`'
            | b','
    )
}

impl<'a> Reader<'a> {
    fn skip_trivia(&self, mut i: usize) -> usize {
        let bytes = self.source().as_bytes();
        while i < bytes.len() {
            match bytes[i] {
                b' ' | b'\t' | b'\r' | b'\n' => i += 1,
                b';' => {
                    while i < bytes.len() && bytes[i] != b'\n' {
                        i += 1;
                    }
                }
                _ => break,
            }
        }
        i
    }

    /// Find the end of the form starting at `start`.
    fn scan_extent(&self, start: usize) -> Result<usize, ScanFailure> {
        let bytes = self.source().as_bytes();
        let len = bytes.len();
        let mut i = start;

        // reader-macro prefixes
        loop {
            i = self.skip_trivia(i);
            if i >= len {
                return Err(ScanFailure {
                    kind: ErrorKind::UnexpectedToken {
                        expected: "a form".into(),
                        found: "end of input".into(),
                    },
                    span: Span::new(start, len),
                    resume: len,
                });
            }
            match bytes[i] {
                b'\'' | b'`' => i += 1,
                b',' => {
                    i += 1;
                    if bytes.get(i) == Some(&b'@') {
                        i += 1;
                    }
                }
                _ => break,
            }
        }

        match bytes[i] {
            b')' | b']' | b'}' => Err(ScanFailure {
                kind: ErrorKind::UnmatchedDelimiter {
                    delimiter: bytes[i] as char,
                },
                span: Span::new(i, i + 1),
                resume: i + 1,
            }),
            b'"' => self.scan_string(i),
            b'(' | b'[' | b'{' => self.scan_nested(i, 1),
            b'#' if matches!(bytes.get(i + 1), Some(b'[') | Some(b'{')) => {
                self.scan_nested(i, 2)
            }
            _ => {
                let mut end = i;
                while end < len && !is_terminator(bytes[end]) {
                    end += 1;
                }
                Ok(end)
            }
        }
    }

    fn scan_string(&self, open: usize) -> Result<usize, ScanFailure> {
        let bytes = self.source().as_bytes();
        let mut i = open + 1;
        while i < bytes.len() {
            match bytes[i] {
                b'\\' => i += 2,
                b'"' => return Ok(i + 1),
                _ => i += 1,
            }
        }
        Err(ScanFailure {
            kind: ErrorKind::UnterminatedString,
            span: Span::new(open, bytes.len()),
            resume: bytes.len(),
        })
    }

    fn scan_nested(&self, open: usize, open_len: usize) -> Result<usize, ScanFailure> {
        let bytes = self.source().as_bytes();
        let len = bytes.len();
        let mut stack = vec![(closer_for(bytes[open + open_len - 1]), open)];
        let mut i = open + open_len;

        while let Some(&(expected, _)) = stack.last() {
            i = self.skip_trivia(i);
            if i >= len {
                return Err(ScanFailure {
                    kind: ErrorKind::UnmatchedDelimiter {
                        delimiter: bytes[open + open_len - 1] as char,
                    },
                    span: Span::new(open, open + open_len),
                    resume: len,
                });
            }
            match bytes[i] {
                b'"' => i = self.scan_string(i)?,
                b'(' | b'[' | b'{' => {
                    stack.push((closer_for(bytes[i]), i));
                    i += 1;
                }
                b'#' if matches!(bytes.get(i + 1), Some(b'[') | Some(b'{')) => {
                    stack.push((closer_for(bytes[i + 1]), i));
                    i += 2;
                }
                closer @ (b')' | b']' | b'}') => {
                    if closer != expected {
                        return Err(ScanFailure {
                            kind: ErrorKind::UnexpectedToken {
                                expected: format!("'{}'", expected as char),
                                found: format!("'{}'", closer as char),
                            },
                            span: Span::new(i, i + 1),
                            resume: i + 1,
                        });
                    }
                    stack.pop();
                    i += 1;
                }
                _ => i += 1,
            }
        }
        Ok(i)
    }
}

// ============================================================================
// VALUE BUILDERS
// ============================================================================

impl<'a> Reader<'a> {
    fn parse_extent(&self, extent: Span) -> Result<Value, LustError> {
        let text = &self.source()[extent.start..extent.end];
        let mut pairs = LustGrammar::parse(Rule::form, text).map_err(|e| {
            let (start, end) = match e.location {
                pest::error::InputLocation::Pos(pos) => (pos, pos),
                pest::error::InputLocation::Span((start, end)) => (start, end),
            };
            let found = text[start.min(text.len())..]
                .chars()
                .take_while(|c| !c.is_whitespace())
                .collect::<String>();
            self.error(
                ErrorKind::UnexpectedToken {
                    expected: "a form".into(),
                    found: if found.is_empty() {
                        "end of form".into()
                    } else {
                        format!("'{}'", found)
                    },
                },
                Span::new(start, end.max(start + 1).min(text.len())).offset(extent.start),
            )
        })?;

        let datum = pairs
            .next()
            .and_then(|form| form.into_inner().find(|p| p.as_rule() != Rule::EOI))
            .ok_or_else(|| {
                self.error(
                    ErrorKind::UnexpectedToken {
                        expected: "a form".into(),
                        found: "nothing".into(),
                    },
                    extent,
                )
            })?;
        self.build(datum, extent.start)
    }

    fn build(&self, pair: Pair<Rule>, offset: usize) -> Result<Value, LustError> {
        let span = Span::new(pair.as_span().start(), pair.as_span().end()).offset(offset);
        let kw = keywords();

        match pair.as_rule() {
            Rule::quote => self.build_prefixed(kw.quote, pair, span, offset),
            Rule::quasiquote => self.build_prefixed(kw.quasiquote, pair, span, offset),
            Rule::unquote => self.build_prefixed(kw.unquote, pair, span, offset),
            Rule::unquote_splicing => {
                self.build_prefixed(kw.unquote_splicing, pair, span, offset)
            }

            Rule::list => Ok(Value::list(self.build_children(pair, offset)?)),

            Rule::vector | Rule::hash_vector => Ok(Value::Vector(
                self.build_children(pair, offset)?.into_iter().collect(),
            )),

            Rule::set => Ok(Value::SetLiteral(self.build_children(pair, offset)?.into())),

            Rule::map => {
                let items = self.build_children(pair, offset)?;
                if items.len() % 2 != 0 {
                    return Err(self.error(ErrorKind::OddMapLiteral { count: items.len() }, span));
                }
                let mut items = items.into_iter();
                let mut entries = Vec::new();
                while let (Some(key), Some(value)) = (items.next(), items.next()) {
                    entries.push((key, value));
                }
                Ok(Value::MapLiteral(entries.into()))
            }

            Rule::string => {
                let raw = pair
                    .into_inner()
                    .next()
                    .map(|inner| inner.as_str())
                    .unwrap_or_default();
                Ok(Value::string(&self.unescape(raw, span)?))
            }

            Rule::number => self.build_number(pair.as_str(), span),

            Rule::boolean => Ok(Value::Bool(pair.as_str() == "true")),

            Rule::symbol => self.build_symbol(pair.as_str(), span),

            rule => Err(self.error(
                ErrorKind::Internal {
                    message: format!("reader produced unexpected rule {:?}", rule),
                },
                span,
            )),
        }
    }

    fn build_children(&self, pair: Pair<Rule>, offset: usize) -> Result<Vec<Value>, LustError> {
        pair.into_inner().map(|p| self.build(p, offset)).collect()
    }

    fn build_prefixed(
        &self,
        head: Symbol,
        pair: Pair<Rule>,
        span: Span,
        offset: usize,
    ) -> Result<Value, LustError> {
        let inner = pair.into_inner().next().ok_or_else(|| {
            self.error(
                ErrorKind::UnexpectedToken {
                    expected: "a form after reader prefix".into(),
                    found: "nothing".into(),
                },
                span,
            )
        })?;
        Ok(Value::list(vec![
            Value::Symbol(head),
            self.build(inner, offset)?,
        ]))
    }

    fn build_number(&self, text: &str, span: Span) -> Result<Value, LustError> {
        if let Some(n) = parse_exact(text) {
            return Ok(n.into_value());
        }
        if text.contains(['.', 'e', 'E']) && !text.contains('/') {
            if let Ok(f) = text.parse::<f64>() {
                return Ok(Value::Float(f));
            }
        }
        Err(self.error(
            ErrorKind::InvalidLiteral {
                literal_type: "number".into(),
                value: text.into(),
            },
            span,
        ))
    }

    /// Symbols carry two pieces of reader sugar: `rest...` marks a variadic
    /// parameter and `a.b.c` is field access `(. (. a 'b) 'c)`.
    fn build_symbol(&self, text: &str, span: Span) -> Result<Value, LustError> {
        let kw = keywords();
        if text == "nil" {
            return Ok(Value::Nil);
        }

        let invalid = || {
            self.error(
                ErrorKind::InvalidLiteral {
                    literal_type: "qualified name".into(),
                    value: text.into(),
                },
                span,
            )
        };

        if text.len() > 3 && text.ends_with("...") {
            let name = &text[..text.len() - 3];
            if name.contains('.') {
                return Err(invalid());
            }
            return Ok(Value::list(vec![Value::Symbol(kw.varg), Value::symbol(name)]));
        }

        if text.contains('.') && !text.chars().all(|c| c == '.') {
            let segments: Vec<&str> = text.split('.').collect();
            if segments.iter().any(|s| s.is_empty()) {
                return Err(invalid());
            }
            let mut access = Value::symbol(segments[0]);
            for field in &segments[1..] {
                access = Value::list(vec![
                    Value::Symbol(kw.dot),
                    access,
                    Value::list(vec![Value::Symbol(kw.quote), Value::symbol(field)]),
                ]);
            }
            return Ok(access);
        }

        Ok(Value::symbol(text))
    }

    fn unescape(&self, raw: &str, span: Span) -> Result<String, LustError> {
        let mut out = String::with_capacity(raw.len());
        let mut chars = raw.chars();
        while let Some(c) = chars.next() {
            if c != '\\' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('0') => out.push('\0'),
                Some('\\') => out.push('\\'),
                Some('"') => out.push('"'),
                other => {
                    return Err(self.error(
                        ErrorKind::InvalidLiteral {
                            literal_type: "escape sequence".into(),
                            value: format!("\\{}", other.map(String::from).unwrap_or_default()),
                        },
                        span,
                    ))
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_one(src: &str) -> Value {
        let forms = read_str(src).unwrap();
        assert_eq!(forms.len(), 1, "expected one form from {src:?}");
        forms.into_iter().next().unwrap()
    }

    fn kind_of(src: &str) -> ErrorKind {
        read_str(src).unwrap_err().kind
    }

    #[test]
    fn reader_prefixes_desugar_to_lists() {
        assert_eq!(read_one("'x").to_string(), "(quote x)");
        assert_eq!(read_one("`(a ,b ,@c)").to_string(),
            "(quasiquote (a (unquote b) (unquote-splicing c)))");
    }

    #[test]
    fn collection_literals_keep_unevaluated_elements() {
        let v = read_one("[1 2 (+ 1 2)]");
        let Value::Vector(items) = &v else { panic!("not a vector: {v}") };
        assert_eq!(items.len(), 3);
        assert_eq!(items[2].to_string(), "(+ 1 2)");
        assert_eq!(read_one("#[1 2]"), read_one("[1 2]"));
        assert!(matches!(read_one("#{1 2 2}"), Value::SetLiteral(s) if s.len() == 3));
        assert_eq!(read_one("#{1 2 2}").to_string(), "#{1 2 2}");
        let map = read_one("{(f) 1 (f) 2}");
        assert!(matches!(&map, Value::MapLiteral(m) if m.len() == 2));
        assert_eq!(map.to_string(), "{(f) 1 (f) 2}");
    }

    #[test]
    fn dotted_names_read_as_field_access() {
        assert_eq!(read_one("person.name"), read_one("(. person 'name)"));
        assert_eq!(read_one("a.b.c").to_string(), "(. (. a (quote b)) (quote c))");
        assert_eq!(read_one("..."), Value::symbol("..."));
    }

    #[test]
    fn variadic_parameter_sugar() {
        assert_eq!(read_one("rest...").to_string(), "(varg rest)");
    }

    #[test]
    fn atoms_read_with_their_types() {
        assert_eq!(read_one("42"), Value::Int(42));
        assert_eq!(read_one("-7"), Value::Int(-7));
        assert_eq!(read_one("2.5"), Value::Float(2.5));
        assert_eq!(read_one("1/2").to_string(), "1/2");
        assert_eq!(read_one("6/3"), Value::Int(2));
        assert_eq!(read_one("99999999999999999999").to_string(), "99999999999999999999");
        assert!(matches!(read_one("-99999999999999999999"), Value::BigInt(_)));
        assert_eq!(read_one("true"), Value::Bool(true));
        assert_eq!(read_one("nil"), Value::Nil);
        assert_eq!(read_one("-"), Value::symbol("-"));
        assert_eq!(read_one(r#""a\n\"b\"""#), Value::string("a\n\"b\""));
    }

    #[test]
    fn malformed_input_reports_parse_errors() {
        assert!(matches!(kind_of("(+ 1 2"), ErrorKind::UnmatchedDelimiter { delimiter: '(' }));
        assert!(matches!(kind_of(")"), ErrorKind::UnmatchedDelimiter { delimiter: ')' }));
        assert!(matches!(kind_of("\"abc"), ErrorKind::UnterminatedString));
        assert!(matches!(kind_of("12abc"), ErrorKind::InvalidLiteral { .. }));
        assert!(matches!(kind_of("1/0"), ErrorKind::InvalidLiteral { .. }));
        assert!(matches!(kind_of("{1}"), ErrorKind::OddMapLiteral { count: 1 }));
        assert!(matches!(kind_of("(a]"), ErrorKind::UnexpectedToken { .. }));
    }

    #[test]
    fn errors_abort_only_the_current_form() {
        let context = SourceContext::from_file("t.lust", "(ok 1)\n12x\n(ok 2)");
        let results: Vec<_> = Reader::new(&context).collect();
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        let err = results[1].as_ref().unwrap_err();
        assert_eq!(err.location(), Some((2, 1)));
        assert_eq!(results[2].as_ref().unwrap().value.to_string(), "(ok 2)");
    }

    #[test]
    fn comments_and_whitespace_are_skipped() {
        let forms = read_str("; header\n  a ; trailing\n\n b").unwrap();
        assert_eq!(forms, vec![Value::symbol("a"), Value::symbol("b")]);
        assert!(read_str("  ; only a comment").unwrap().is_empty());
    }

    #[test]
    fn spans_point_at_forms() {
        let context = SourceContext::from_file("t.lust", "  (a b)  c");
        let forms = read_all(&context).unwrap();
        assert_eq!(forms[0].span, Span::new(2, 7));
        assert_eq!(forms[1].span, Span::new(9, 10));
    }
}
