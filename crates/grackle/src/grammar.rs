//! The declarative grammar object accepted by the generator.
//!
//! A grammar is plain data: a rule map (nonterminal name → alternatives),
//! an ordered operator table, and an optional start symbol. It is usually
//! deserialized from JSON but can be built directly in Rust.

use crate::types::Map;
use crate::GrammarError;
use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::Deserialize;
use std::fmt;

/// Operator associativity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Assoc {
    Left,
    Right,
    Nonassoc,
}

impl Assoc {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Nonassoc => "nonassoc",
        }
    }
}

/// One row of the operator table: `[assoc, tok, tok, ...]`. Rows are
/// ordered lowest precedence first.
#[derive(Debug, Clone)]
pub struct OperatorRow {
    pub assoc: Assoc,
    pub tokens: Vec<String>,
}

impl<'de> Deserialize<'de> for OperatorRow {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RowVisitor;

        impl<'de> Visitor<'de> for RowVisitor {
            type Value = OperatorRow;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an operator row [assoc, token, ...]")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<OperatorRow, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let assoc: Assoc = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let mut tokens = Vec::new();
                while let Some(token) = seq.next_element::<String>()? {
                    tokens.push(token);
                }
                Ok(OperatorRow { assoc, tokens })
            }
        }

        deserializer.deserialize_seq(RowVisitor)
    }
}

/// A production pattern: either whitespace-separated symbol names or a
/// pre-split token sequence.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Pattern {
    Text(String),
    Tokens(Vec<String>),
}

impl Pattern {
    /// The pattern's tokens. An empty pattern (the ε alternative) yields
    /// no tokens, whichever encoding it used.
    pub fn tokens(&self) -> Vec<&str> {
        match self {
            Self::Text(text) => text.split_whitespace().collect(),
            Self::Tokens(tokens) => tokens
                .iter()
                .map(String::as_str)
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }
}

/// A semantic-action template: a positional index or source text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ActionTemplate {
    Index(i64),
    Source(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AltOptions {
    /// Resolve this rule's precedence as the named operator's.
    pub prec: Option<String>,
}

/// One alternative of a nonterminal: a bare pattern or a
/// `[pattern, action?, options?]` tuple.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Alternative {
    Full(Pattern, ActionTemplate, AltOptions),
    WithOptions(Pattern, AltOptions),
    WithAction(Pattern, ActionTemplate),
    Lone((Pattern,)),
    Bare(Pattern),
}

impl Alternative {
    pub fn pattern(&self) -> &Pattern {
        match self {
            Self::Full(p, _, _)
            | Self::WithOptions(p, _)
            | Self::WithAction(p, _)
            | Self::Bare(p) => p,
            Self::Lone((p,)) => p,
        }
    }

    pub fn action(&self) -> Option<&ActionTemplate> {
        match self {
            Self::Full(_, a, _) | Self::WithAction(_, a) => Some(a),
            _ => None,
        }
    }

    pub fn options(&self) -> Option<&AltOptions> {
        match self {
            Self::Full(_, _, o) | Self::WithOptions(_, o) => Some(o),
            _ => None,
        }
    }
}

pub type RuleMap = Map<String, Vec<Alternative>>;

/// How action templates are interpreted, selected by which rule map the
/// grammar carries.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ActionMode {
    /// The concise list-template style (`grammar` map). Default.
    Sexp,
    /// jison-compatible actions (`bnf` map): named/positional references,
    /// `$$`, locations, `YYABORT`/`YYACCEPT`.
    Jison,
}

/// The in-memory grammar object.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GrammarSpec {
    #[serde(default)]
    pub grammar: Option<RuleMap>,
    #[serde(default)]
    pub bnf: Option<RuleMap>,
    #[serde(default)]
    pub operators: Vec<OperatorRow>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default, rename = "parseParams")]
    pub parse_params: Vec<String>,
}

impl GrammarSpec {
    pub fn from_json(text: &str) -> Result<Self, GrammarError> {
        serde_json::from_str(text).map_err(|err| GrammarError::Load(err.to_string()))
    }

    pub fn mode(&self) -> ActionMode {
        if self.grammar.is_some() {
            ActionMode::Sexp
        } else {
            ActionMode::Jison
        }
    }

    /// The rule map in use, `grammar` taking priority over `bnf`.
    pub fn rules(&self) -> Result<&RuleMap, GrammarError> {
        self.grammar
            .as_ref()
            .or(self.bnf.as_ref())
            .ok_or(GrammarError::UnknownFormat)
    }
}
