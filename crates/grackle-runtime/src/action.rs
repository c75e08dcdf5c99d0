//! The executable form of compiled semantic actions.

use crate::lexer::Span;
use crate::value::Value;

/// A compiled action body, lowered by the generator into a small
/// expression tree the driver can evaluate directly. Bodies outside the
/// evaluable subset are carried as [`Raw`](ActionProgram::Raw) text and
/// rejected if a reduction ever runs them in memory.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionProgram {
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
    /// The semantic value `offset` slots below the top of the reduced
    /// frame: position `n` of a length-`L` production has `offset = L - n`.
    Arg(i64),
    List(Vec<ListElem>),
    /// Target-language source the in-memory driver cannot evaluate.
    Raw(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListElem {
    Item(ActionProgram),
    Spread(ActionProgram),
}

/// Everything a reduction's action body may observe.
#[derive(Debug)]
pub struct ReduceContext<'a> {
    /// Semantic values of the handle being reduced, leftmost first.
    pub frame: &'a [Value],
    /// Locations of the handle being reduced.
    pub locations: &'a [Span],
    /// Matched text of the most recent token.
    pub yytext: &'a str,
    pub yyleng: usize,
    pub yylineno: u32,
    /// The synthesized location of the reduction.
    pub span: Span,
    /// The rule being reduced.
    pub rule: u16,
    /// Extra parse parameters threaded in by the caller.
    pub params: &'a [(String, Value)],
}

impl ReduceContext<'_> {
    /// The value at `offset` slots below the frame top; `Null` outside
    /// the frame (e.g. the position-1 reference of an ε reduction).
    pub fn arg(&self, offset: i64) -> Value {
        let idx = self.frame.len() as i64 - 1 - offset;
        if (0..self.frame.len() as i64).contains(&idx) {
            self.frame[idx as usize].clone()
        } else {
            Value::Null
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("action body cannot be evaluated in memory: {0}")]
    Unsupported(String),

    #[error("cannot spread a non-list value")]
    SpreadNonList,
}

impl ActionProgram {
    pub fn eval(&self, cx: &ReduceContext<'_>) -> Result<Value, ActionError> {
        match self {
            Self::Null => Ok(Value::Null),
            Self::Bool(b) => Ok(Value::Bool(*b)),
            Self::Num(n) => Ok(Value::Num(*n)),
            Self::Str(s) => Ok(Value::Str(s.clone())),
            Self::Arg(offset) => Ok(cx.arg(*offset)),
            Self::List(elems) => {
                let mut items = Vec::with_capacity(elems.len());
                for elem in elems {
                    match elem {
                        ListElem::Item(p) => items.push(p.eval(cx)?),
                        ListElem::Spread(p) => match p.eval(cx)? {
                            Value::List(spliced) => items.extend(spliced),
                            // A spread over a not-yet-seeded slot adds nothing.
                            Value::Null => {}
                            _ => return Err(ActionError::SpreadNonList),
                        },
                    }
                }
                Ok(Value::List(items))
            }
            Self::Raw(body) => Err(ActionError::Unsupported(body.clone())),
        }
    }
}
