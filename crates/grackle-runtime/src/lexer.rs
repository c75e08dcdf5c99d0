//! The lexer interface consumed by generated parsers.

/// A source location, in the shape the driver records on the location
/// stack and synthesizes for reductions.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Span {
    pub first_line: u32,
    pub first_column: u32,
    pub last_line: u32,
    pub last_column: u32,
    /// Byte range of the matched text, present when the lexer tracks ranges.
    pub range: Option<(usize, usize)>,
}

impl Span {
    /// The location spanning `first` through `last`.
    pub fn merge(first: Span, last: Span) -> Span {
        let range = match (first.range, last.range) {
            (Some((start, _)), Some((_, end))) => Some((start, end)),
            _ => None,
        };
        Span {
            first_line: first.first_line,
            first_column: first.first_column,
            last_line: last.last_line,
            last_column: last.last_column,
            range,
        }
    }
}

/// A token as handed over by the lexer: either a terminal name from the
/// grammar, or an explicit symbol id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexedToken {
    Name(String),
    Id(u16),
}

/// The token stream the driver pulls from.
///
/// The position accessors must reflect the most recently returned token
/// until the next call to [`lex`](Lexer::lex).
pub trait Lexer {
    /// Return the next token, or `None` at end of input.
    fn lex(&mut self) -> Option<LexedToken>;

    /// The matched text of the current token.
    fn yytext(&self) -> &str;

    fn yyleng(&self) -> usize {
        self.yytext().len()
    }

    fn yylineno(&self) -> u32;

    fn yylloc(&self) -> Span;

    /// A rendering of the current position for error messages.
    fn show_position(&self) -> Option<String> {
        None
    }

    /// Whether `yylloc` carries byte ranges.
    fn ranges(&self) -> bool {
        false
    }
}
