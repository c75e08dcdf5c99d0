//! Runtime support for parsers produced by the `grackle` generator.

pub mod action;
pub mod lexer;
pub mod parser;
pub mod tables;
pub mod value;

pub use crate::{
    lexer::{LexedToken, Lexer, Span},
    parser::{ParseError, Parser, SyntaxError},
    tables::{ParseAction, ParserTables},
    value::Value,
};

// internally used by emitted parsers.
#[doc(hidden)]
pub mod _private {
    pub use crate::{
        action::{ActionProgram, ListElem},
        lexer::Lexer,
        parser::{ParseError, Parser},
        tables::{ParseAction, ParserTables, Row, RuleInfo},
        value::Value,
    };
}
