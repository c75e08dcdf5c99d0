//! Compilation of semantic-action templates.
//!
//! Templates arrive as positional indices or source text and are rewritten
//! into a segment IR ([`ActionBody`]). Identical bodies are deduplicated,
//! and each body is lowered into the executable [`ActionProgram`] form the
//! runtime evaluates. Position `n` of a length-`L` production becomes the
//! stack reference `$[$0 - (L - n)]`, kept in the IR as `offset = L - n`.

use crate::grammar::{ActionMode, ActionTemplate};
use crate::types::Map;
use grackle_runtime::action::{ActionProgram, ListElem};
use std::fmt;

/// One segment of a compiled action body.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Text(String),
    /// Semantic value `offset` slots below the frame top.
    Value { offset: i64 },
    /// Location `offset` slots below the frame top.
    Loc { offset: i64 },
    /// The result slot (`$$`).
    Result,
    /// The result location slot (`@$` / `@0`).
    ResultLoc,
}

/// Whether the segments form an expression the body returns, or raw
/// statement code (jison source actions).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BodyKind {
    Expr,
    Code,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActionBody {
    pub kind: BodyKind,
    pub segments: Vec<Segment>,
}

impl ActionBody {
    fn expr(segments: Vec<Segment>) -> Self {
        Self {
            kind: BodyKind::Expr,
            segments,
        }
    }
}

impl fmt::Display for ActionBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind == BodyKind::Expr {
            f.write_str("return ")?;
        }
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => f.write_str(text)?,
                Segment::Value { offset } => write_ref(f, "$[$0", *offset)?,
                Segment::Loc { offset } => write_ref(f, "loc[$0", *offset)?,
                Segment::Result => f.write_str("$$")?,
                Segment::ResultLoc => f.write_str("@$")?,
            }
        }
        if self.kind == BodyKind::Expr {
            f.write_str(";")?;
        }
        Ok(())
    }
}

fn write_ref(f: &mut fmt::Formatter<'_>, base: &str, offset: i64) -> fmt::Result {
    match offset {
        0 => write!(f, "{}]", base),
        o if o > 0 => write!(f, "{}-{}]", base, o),
        o => write!(f, "{}+{}]", base, -o),
    }
}

/// Per-alternative name table for jison-mode `$name`/`@name` references:
/// inline aliases plus each symbol's own name, repeated occurrences
/// disambiguated as `name`, `name1`, `name2`, ...
#[derive(Debug, Default)]
pub struct NameTable {
    positions: Map<String, i64>,
}

impl NameTable {
    /// Build from the pattern's `(symbol name, alias)` pairs in order.
    pub fn new(tokens: &[(String, Option<String>)]) -> Self {
        let mut positions = Map::default();
        for (i, (_, alias)) in tokens.iter().enumerate() {
            if let Some(alias) = alias {
                positions.entry(alias.clone()).or_insert(i as i64 + 1);
            }
        }
        let mut seen: Map<&str, usize> = Map::default();
        for (i, (name, _)) in tokens.iter().enumerate() {
            let occurrence = seen.entry(name.as_str()).or_insert(0);
            let key = if *occurrence == 0 {
                name.clone()
            } else {
                format!("{}{}", name, occurrence)
            };
            *occurrence += 1;
            positions.entry(key).or_insert(i as i64 + 1);
        }
        Self { positions }
    }

    fn resolve(&self, name: &str) -> Option<i64> {
        self.positions.get(name).copied()
    }
}

/// Compile one alternative's template into its body.
pub fn compile(
    mode: ActionMode,
    template: Option<&ActionTemplate>,
    len: usize,
    names: &NameTable,
) -> ActionBody {
    let len = len as i64;
    match (mode, template) {
        (_, None) | (_, Some(ActionTemplate::Index(1))) => passthrough(len),
        (_, Some(ActionTemplate::Index(n))) => {
            ActionBody::expr(vec![Segment::Value { offset: len - n }])
        }
        (ActionMode::Sexp, Some(ActionTemplate::Source(source))) => {
            if has_position_refs(source) {
                rewrite_positional(source, len)
            } else {
                rewrite_bare(source, len)
            }
        }
        (ActionMode::Jison, Some(ActionTemplate::Source(source))) => {
            rewrite_jison(source, len, names)
        }
    }
}

/// The default action: pass position 1 through, or null for ε handles.
fn passthrough(len: i64) -> ActionBody {
    if len == 0 {
        ActionBody::expr(vec![Segment::Text("null".into())])
    } else {
        ActionBody::expr(vec![Segment::Value { offset: len - 1 }])
    }
}

// ---- template scanning ----

#[derive(Default)]
struct SegmentBuilder {
    segments: Vec<Segment>,
}

impl SegmentBuilder {
    fn text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Segment::Text(tail)) = self.segments.last_mut() {
            tail.push_str(text);
        } else {
            self.segments.push(Segment::Text(text.to_owned()));
        }
    }

    fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    fn finish(self) -> Vec<Segment> {
        self.segments
    }
}

/// A `$n` reference (signed integer) anywhere in the template opts into
/// explicit positional syntax and makes bare digits literal.
fn has_position_refs(source: &str) -> bool {
    let bytes = source.as_bytes();
    for i in 0..bytes.len() {
        if bytes[i] == b'$' && scan_int(bytes, i + 1).is_some() {
            return true;
        }
    }
    false
}

/// Style 1: replace every `$n`, keep everything else verbatim.
fn rewrite_positional(source: &str, len: i64) -> ActionBody {
    let bytes = source.as_bytes();
    let mut b = SegmentBuilder::default();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' {
            if let Some((n, next)) = scan_int(bytes, i + 1) {
                b.text(&source[start..i]);
                b.push(Segment::Value { offset: len - n });
                i = next;
                start = i;
                continue;
            }
        }
        i += 1;
    }
    b.text(&source[start..]);
    ActionBody::expr(b.finish())
}

/// Style 2: every bare signed integer outside a string literal is a
/// position reference.
fn rewrite_bare(source: &str, len: i64) -> ActionBody {
    let bytes = source.as_bytes();
    let mut b = SegmentBuilder::default();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        if c == b'\'' || c == b'"' {
            i = skip_string(bytes, i);
            continue;
        }
        let after_ident = i > 0 && is_ident_byte(bytes[i - 1]);
        let signed = c == b'-' && bytes.get(i + 1).is_some_and(|b| b.is_ascii_digit());
        if (c.is_ascii_digit() || signed) && !after_ident {
            if let Some((n, next)) = scan_int(bytes, i) {
                b.text(&source[start..i]);
                b.push(Segment::Value { offset: len - n });
                i = next;
                start = i;
                continue;
            }
        }
        i += 1;
    }
    b.text(&source[start..]);
    ActionBody::expr(b.finish())
}

/// jison source actions: resolve named references, then `$$`, `@$`/`@0`,
/// `$n`, `@n`, and the `YYABORT`/`YYACCEPT` sentinels. Quoted strings are
/// kept verbatim.
fn rewrite_jison(source: &str, len: i64, names: &NameTable) -> ActionBody {
    let bytes = source.as_bytes();
    let mut b = SegmentBuilder::default();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        if c == b'\'' || c == b'"' {
            i = skip_string(bytes, i);
            continue;
        }
        if c == b'$' || c == b'@' {
            let loc = c == b'@';
            if bytes.get(i + 1) == Some(&b'$') {
                b.text(&source[start..i]);
                b.push(if loc { Segment::ResultLoc } else { Segment::Result });
                i += 2;
                start = i;
                continue;
            }
            if let Some((n, next)) = scan_int(bytes, i + 1) {
                b.text(&source[start..i]);
                if loc && n == 0 {
                    b.push(Segment::ResultLoc);
                } else if loc {
                    b.push(Segment::Loc { offset: len - n });
                } else {
                    b.push(Segment::Value { offset: len - n });
                }
                i = next;
                start = i;
                continue;
            }
            if let Some((name, next)) = scan_ident(source, i + 1) {
                if let Some(n) = names.resolve(name) {
                    b.text(&source[start..i]);
                    if loc {
                        b.push(Segment::Loc { offset: len - n });
                    } else {
                        b.push(Segment::Value { offset: len - n });
                    }
                    start = next;
                }
                i = next;
                continue;
            }
            i += 1;
            continue;
        }
        if c.is_ascii_alphabetic() || c == b'_' {
            let (word, next) = scan_ident(source, i).expect("identifier start");
            match word {
                "YYABORT" => {
                    b.text(&source[start..i]);
                    b.text("return false");
                    start = next;
                }
                "YYACCEPT" => {
                    b.text(&source[start..i]);
                    b.text("return true");
                    start = next;
                }
                _ => {}
            }
            i = next;
            continue;
        }
        i += 1;
    }
    b.text(&source[start..]);
    ActionBody {
        kind: BodyKind::Code,
        segments: b.finish(),
    }
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Scan a signed integer at `i`; returns its value and the index past it.
fn scan_int(bytes: &[u8], i: usize) -> Option<(i64, usize)> {
    let mut j = i;
    let negative = bytes.get(j) == Some(&b'-');
    if negative {
        j += 1;
    }
    let digits = j;
    while bytes.get(j).is_some_and(|b| b.is_ascii_digit()) {
        j += 1;
    }
    if j == digits {
        return None;
    }
    let mut n: i64 = 0;
    for &b in &bytes[digits..j] {
        n = n * 10 + i64::from(b - b'0');
    }
    Some((if negative { -n } else { n }, j))
}

fn scan_ident(source: &str, i: usize) -> Option<(&str, usize)> {
    let bytes = source.as_bytes();
    let first = *bytes.get(i)?;
    if !(first.is_ascii_alphabetic() || first == b'_') {
        return None;
    }
    let mut j = i + 1;
    while bytes.get(j).is_some_and(|&b| is_ident_byte(b)) {
        j += 1;
    }
    Some((&source[i..j], j))
}

fn skip_string(bytes: &[u8], i: usize) -> usize {
    let quote = bytes[i];
    let mut j = i + 1;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 2,
            b if b == quote => return j + 1,
            _ => j += 1,
        }
    }
    j
}

// ---- deduplication ----

/// The deduplicated action store: every rule maps to an index in here,
/// and rules with identical compiled bodies share one entry.
#[derive(Debug, Default)]
pub struct CompiledActions {
    bodies: Vec<ActionBody>,
    index: Map<ActionBody, usize>,
}

impl CompiledActions {
    pub fn add(&mut self, body: ActionBody) -> usize {
        if let Some(&idx) = self.index.get(&body) {
            return idx;
        }
        let idx = self.bodies.len();
        self.index.insert(body.clone(), idx);
        self.bodies.push(body);
        idx
    }

    pub fn bodies(&self) -> &[ActionBody] {
        &self.bodies
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Lower every body into its executable form.
    pub fn programs(&self) -> Vec<ActionProgram> {
        self.bodies.iter().map(lower).collect()
    }
}

// ---- lowering into the executable form ----

/// Lower a body into the runtime's executable form. Bodies outside the
/// evaluable expression subset are carried as raw text.
pub fn lower(body: &ActionBody) -> ActionProgram {
    if body.kind == BodyKind::Code {
        return ActionProgram::Raw(body.to_string());
    }
    parse_program(&body.segments).unwrap_or_else(|| ActionProgram::Raw(body.to_string()))
}

#[derive(Debug, PartialEq)]
enum Tok {
    LBracket,
    RBracket,
    Comma,
    Spread,
    Null,
    True,
    False,
    Num(f64),
    Str(String),
    Arg(i64),
}

fn parse_program(segments: &[Segment]) -> Option<ActionProgram> {
    let mut toks = Vec::new();
    for segment in segments {
        match segment {
            Segment::Value { offset } => toks.push(Tok::Arg(*offset)),
            Segment::Text(text) => tokenize_text(text, &mut toks)?,
            _ => return None,
        }
    }
    let mut pos = 0;
    let program = parse_expr(&toks, &mut pos)?;
    (pos == toks.len()).then_some(program)
}

fn tokenize_text(text: &str, toks: &mut Vec<Tok>) -> Option<()> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b' ' | b'\t' | b'\r' | b'\n' => i += 1,
            b'[' => {
                toks.push(Tok::LBracket);
                i += 1;
            }
            b']' => {
                toks.push(Tok::RBracket);
                i += 1;
            }
            b',' => {
                toks.push(Tok::Comma);
                i += 1;
            }
            b'.' if bytes.get(i + 1) == Some(&b'.') && bytes.get(i + 2) == Some(&b'.') => {
                toks.push(Tok::Spread);
                i += 3;
            }
            b'\'' | b'"' => {
                let end = skip_string(bytes, i);
                if end > bytes.len() || bytes.get(end.wrapping_sub(1)) != Some(&bytes[i]) {
                    return None;
                }
                toks.push(Tok::Str(unescape(&text[i + 1..end - 1])));
                i = end;
            }
            c if c.is_ascii_digit() || (c == b'-' && bytes.get(i + 1).is_some_and(|b| b.is_ascii_digit())) => {
                let mut j = i + 1;
                while bytes
                    .get(j)
                    .is_some_and(|&b| b.is_ascii_digit() || b == b'.')
                {
                    j += 1;
                }
                let num: f64 = text[i..j].parse().ok()?;
                toks.push(Tok::Num(num));
                i = j;
            }
            c if c.is_ascii_alphabetic() => {
                let (word, next) = scan_ident(text, i)?;
                match word {
                    "null" => toks.push(Tok::Null),
                    "true" => toks.push(Tok::True),
                    "false" => toks.push(Tok::False),
                    _ => return None,
                }
                i = next;
            }
            _ => return None,
        }
    }
    Some(())
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn parse_expr(toks: &[Tok], pos: &mut usize) -> Option<ActionProgram> {
    let tok = toks.get(*pos)?;
    *pos += 1;
    match tok {
        Tok::Null => Some(ActionProgram::Null),
        Tok::True => Some(ActionProgram::Bool(true)),
        Tok::False => Some(ActionProgram::Bool(false)),
        Tok::Num(n) => Some(ActionProgram::Num(*n)),
        Tok::Str(s) => Some(ActionProgram::Str(s.clone())),
        Tok::Arg(offset) => Some(ActionProgram::Arg(*offset)),
        Tok::LBracket => {
            let mut elems = Vec::new();
            if toks.get(*pos) == Some(&Tok::RBracket) {
                *pos += 1;
                return Some(ActionProgram::List(elems));
            }
            loop {
                if toks.get(*pos) == Some(&Tok::Spread) {
                    *pos += 1;
                    elems.push(ListElem::Spread(parse_expr(toks, pos)?));
                } else {
                    elems.push(ListElem::Item(parse_expr(toks, pos)?));
                }
                match toks.get(*pos)? {
                    Tok::Comma => *pos += 1,
                    Tok::RBracket => {
                        *pos += 1;
                        return Some(ActionProgram::List(elems));
                    }
                    _ => return None,
                }
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::ActionTemplate;

    fn sexp(template: Option<ActionTemplate>, len: usize) -> ActionBody {
        compile(ActionMode::Sexp, template.as_ref(), len, &NameTable::default())
    }

    #[test]
    fn passthrough_forms_coincide() {
        let absent = sexp(None, 3);
        let one = sexp(Some(ActionTemplate::Index(1)), 3);
        assert_eq!(absent, one);
        assert_eq!(absent.to_string(), "return $[$0-2];");
    }

    #[test]
    fn empty_handle_passthrough_is_null() {
        let body = sexp(None, 0);
        assert_eq!(body.to_string(), "return null;");
        assert_eq!(lower(&body), ActionProgram::Null);
    }

    #[test]
    fn positional_index() {
        let body = sexp(Some(ActionTemplate::Index(2)), 3);
        assert_eq!(body.to_string(), "return $[$0-1];");
    }

    #[test]
    fn bare_integers_reference_positions_in_order() {
        let body = sexp(Some(ActionTemplate::Source("[\"+\",1,3]".into())), 3);
        assert_eq!(body.to_string(), "return [\"+\",$[$0-2],$[$0]];");

        let offsets: Vec<i64> = body
            .segments
            .iter()
            .filter_map(|s| match s {
                Segment::Value { offset } => Some(*offset),
                _ => None,
            })
            .collect();
        assert_eq!(offsets, vec![2, 0]);

        let program = lower(&body);
        assert_eq!(
            program,
            ActionProgram::List(vec![
                ListElem::Item(ActionProgram::Str("+".into())),
                ListElem::Item(ActionProgram::Arg(2)),
                ListElem::Item(ActionProgram::Arg(0)),
            ])
        );
    }

    #[test]
    fn spread_accumulation_template() {
        let body = sexp(Some(ActionTemplate::Source("[...1,2]".into())), 2);
        assert_eq!(
            lower(&body),
            ActionProgram::List(vec![
                ListElem::Spread(ActionProgram::Arg(1)),
                ListElem::Item(ActionProgram::Arg(0)),
            ])
        );
    }

    #[test]
    fn dollar_references_make_bare_digits_literal() {
        let body = sexp(Some(ActionTemplate::Source("$1 + 1".into())), 3);
        assert_eq!(body.to_string(), "return $[$0-2] + 1;");
    }

    #[test]
    fn quoted_digits_stay_literal() {
        let body = sexp(Some(ActionTemplate::Source("[\"x1\", 2]".into())), 2);
        assert_eq!(body.to_string(), "return [\"x1\", $[$0]];");
    }

    #[test]
    fn jison_aliases_resolve() {
        let names = NameTable::new(&[
            ("Var".into(), Some("name".into())),
            ("=".into(), None),
            ("Expr".into(), Some("value".into())),
        ]);
        let body = compile(
            ActionMode::Jison,
            Some(&ActionTemplate::Source("return assign($name, $value)".into())),
            3,
            &names,
        );
        assert_eq!(body.to_string(), "return assign($[$0-2], $[$0])");
    }

    #[test]
    fn jison_repeated_names_disambiguate() {
        let names = NameTable::new(&[
            ("Expr".into(), None),
            ("+".into(), None),
            ("Expr".into(), None),
        ]);
        let body = compile(
            ActionMode::Jison,
            Some(&ActionTemplate::Source("$$ = [$Expr, $Expr1]".into())),
            3,
            &names,
        );
        assert_eq!(body.to_string(), "$$ = [$[$0-2], $[$0]]");
    }

    #[test]
    fn jison_sentinels_and_locations() {
        let names = NameTable::default();
        let body = compile(
            ActionMode::Jison,
            Some(&ActionTemplate::Source("if (bad($1)) YYABORT; @$ = @1".into())),
            1,
            &names,
        );
        assert_eq!(body.to_string(), "if (bad($[$0])) return false; @$ = loc[$0]");
    }

    #[test]
    fn identical_bodies_share_a_slot() {
        let mut actions = CompiledActions::default();
        let a = actions.add(sexp(None, 1));
        let b = actions.add(sexp(Some(ActionTemplate::Index(1)), 1));
        let c = actions.add(sexp(Some(ActionTemplate::Index(2)), 3));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(actions.len(), 2);
    }
}
