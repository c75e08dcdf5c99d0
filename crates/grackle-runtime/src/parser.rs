//! The shift-reduce parse driver.

use crate::action::{ActionError, ReduceContext};
use crate::lexer::{LexedToken, Lexer, Span};
use crate::tables::{ParseAction, ParserTables, EOI, ERROR_TOKEN};
use crate::value::Value;

/// Number of tokens that must shift cleanly before the driver leaves
/// error-recovery mode.
const RECOVERY_COUNTDOWN: u32 = 3;

/// The diagnostic handed to the `parse_error` hook and carried by
/// [`ParseError::Syntax`].
#[derive(Debug, Clone)]
pub struct SyntaxError {
    pub message: String,
    /// Name of the offending token.
    pub token: String,
    pub line: u32,
    pub loc: Span,
    /// Names of the terminals that would have been accepted.
    pub expected: Vec<String>,
    /// Whether the grammar's `error` token makes recovery possible here.
    pub recoverable: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("{}", .0.message)]
    Syntax(SyntaxError),

    #[error(transparent)]
    Action(#[from] ActionError),
}

type ErrorHook<'t> = Box<dyn FnMut(&SyntaxError) + 't>;

/// A single-use shift-reduce machine over a set of [`ParserTables`].
///
/// The driver keeps three stacks: states (seeded with the start state),
/// semantic values (seeded with `Null`) and locations (seeded with the
/// lexer's initial position). The only blocking call is `Lexer::lex`.
pub struct Parser<'t> {
    tables: &'t ParserTables,
    params: Vec<(String, Value)>,
    parse_error: Option<ErrorHook<'t>>,
}

impl std::fmt::Debug for Parser<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parser")
            .field("states", &self.tables.rows.len())
            .field("rules", &self.tables.rules.len())
            .finish_non_exhaustive()
    }
}

impl<'t> Parser<'t> {
    pub fn new(tables: &'t ParserTables) -> Self {
        Self {
            tables,
            params: Vec::new(),
            parse_error: None,
        }
    }

    /// Thread an extra parse parameter through to reduction actions.
    pub fn with_param(mut self, name: impl Into<String>, value: Value) -> Self {
        self.params.push((name.into(), value));
        self
    }

    /// Install an observer invoked before a syntax error is raised or
    /// recovered from.
    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&SyntaxError) + 't,
    {
        self.parse_error = Some(Box::new(hook));
        self
    }

    /// Drive `lexer` to acceptance and return the start symbol's value.
    pub fn parse<L: Lexer>(&mut self, lexer: &mut L) -> Result<Value, ParseError> {
        let tables = self.tables;
        let recovery_enabled = tables.has_error_recovery();

        let mut states: Vec<u16> = vec![0];
        let mut values: Vec<Value> = vec![Value::Null];
        let mut locations: Vec<Span> = vec![lexer.yylloc()];

        let mut lookahead: Option<u16> = None;
        let mut recovering: u32 = 0;

        loop {
            let state = *states.last().expect("state stack underflow");
            let row = &tables.rows[state as usize];

            let action = if let Some(rule) = row.default_reduce {
                ParseAction::Reduce(rule)
            } else {
                let symbol = match lookahead {
                    Some(symbol) => symbol,
                    None => {
                        let symbol = next_symbol(tables, lexer);
                        lookahead = Some(symbol);
                        symbol
                    }
                };
                match row.action(symbol) {
                    Some(ParseAction::Fail) | None => {
                        if recovering == 0 {
                            let err = self.syntax_error(state, symbol, lexer, recovery_enabled);
                            if let Some(hook) = self.parse_error.as_mut() {
                                hook(&err);
                            }
                            if !recovery_enabled {
                                return Err(ParseError::Syntax(err));
                            }
                            if !recover(tables, &mut states, &mut values, &mut locations, lexer) {
                                return Err(ParseError::Syntax(err));
                            }
                            // Retry the offending lookahead from the
                            // error state before discarding anything.
                            recovering = RECOVERY_COUNTDOWN;
                            continue;
                        }
                        if symbol == EOI {
                            // Nothing left to discard.
                            let err = self.syntax_error(state, symbol, lexer, false);
                            return Err(ParseError::Syntax(err));
                        }
                        // Still erroring mid-recovery: discard the token.
                        lookahead = None;
                        continue;
                    }
                    Some(action) => action,
                }
            };

            match action {
                ParseAction::Shift(next) => {
                    states.push(next);
                    values.push(Value::Str(lexer.yytext().to_owned()));
                    locations.push(lexer.yylloc());
                    lookahead = None;
                    recovering = recovering.saturating_sub(1);
                }

                ParseAction::Reduce(rule) => {
                    let info = tables.rules[rule as usize];
                    let len = info.len as usize;
                    let frame_start = values.len() - len;

                    let span = if len == 0 {
                        lexer.yylloc()
                    } else {
                        Span::merge(locations[frame_start], locations[values.len() - 1])
                    };

                    let program = &tables.actions[tables.rule_actions[rule as usize] as usize];
                    let result = program.eval(&ReduceContext {
                        frame: &values[frame_start..],
                        locations: &locations[frame_start..],
                        yytext: lexer.yytext(),
                        yyleng: lexer.yyleng(),
                        yylineno: lexer.yylineno(),
                        span,
                        rule,
                        params: &self.params,
                    })?;
                    // A null result keeps the frame default, the value of
                    // the handle's first symbol.
                    let value = if result.is_null() && len >= 1 {
                        values[frame_start].clone()
                    } else {
                        result
                    };

                    states.truncate(states.len() - len);
                    values.truncate(frame_start);
                    locations.truncate(frame_start);

                    let top = *states.last().expect("state stack underflow");
                    states.push(tables.goto(top, info.lhs));
                    values.push(value);
                    locations.push(span);
                }

                ParseAction::Accept => {
                    return Ok(values.pop().unwrap_or(Value::Null));
                }

                // Goto rows are only consulted after a reduction and Fail
                // is handled above.
                ParseAction::Goto(_) | ParseAction::Fail => {
                    unreachable!("terminal lookup produced {:?}", action)
                }
            }
        }
    }

    fn syntax_error<L: Lexer>(
        &self,
        state: u16,
        symbol: u16,
        lexer: &L,
        recoverable: bool,
    ) -> SyntaxError {
        let tables = self.tables;
        let token = if symbol == EOI {
            "$end".to_owned()
        } else if (symbol as usize) < tables.symbol_names.len() {
            tables.symbol_name(symbol).to_owned()
        } else {
            format!("'{}'", lexer.yytext())
        };
        let expected = tables.expected(state);
        let line = lexer.yylineno();
        let message = match lexer.show_position() {
            Some(position) => format!(
                "parse error on line {}:\n{}\nexpecting {}",
                line,
                position,
                expected.join(", "),
            ),
            None => format!(
                "parse error on line {}: unexpected {}; expecting {}",
                line,
                token,
                expected.join(", "),
            ),
        };
        SyntaxError {
            message,
            token,
            line,
            loc: lexer.yylloc(),
            expected,
            recoverable,
        }
    }
}

/// Normalize the lexer's next token to a symbol id. Unknown names map to
/// an id no table row carries, so the driver reports them as syntax
/// errors in the state where they appear.
fn next_symbol<L: Lexer>(tables: &ParserTables, lexer: &mut L) -> u16 {
    match lexer.lex() {
        None => EOI,
        Some(LexedToken::Id(id)) => id,
        Some(LexedToken::Name(name)) => tables.token_id(&name).unwrap_or(u16::MAX),
    }
}

/// Pop states until one shifts the `error` token, then shift it. Returns
/// false when the stack bottoms out first.
fn recover<L: Lexer>(
    tables: &ParserTables,
    states: &mut Vec<u16>,
    values: &mut Vec<Value>,
    locations: &mut Vec<Span>,
    lexer: &L,
) -> bool {
    loop {
        let state = *states.last().expect("state stack underflow");
        if let Some(ParseAction::Shift(next)) = tables.rows[state as usize].action(ERROR_TOKEN) {
            states.push(next);
            values.push(Value::Str(lexer.yytext().to_owned()));
            locations.push(lexer.yylloc());
            return true;
        }
        if states.len() == 1 {
            return false;
        }
        states.pop();
        values.pop();
        locations.pop();
    }
}
