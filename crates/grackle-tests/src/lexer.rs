//! A token-vector lexer implementing the runtime lexer interface.

use grackle_runtime::{LexedToken, Lexer, Span};

/// Replays a fixed `(token name, matched text)` sequence, synthesizing
/// single-line locations with one column per byte of text.
pub struct VecLexer {
    tokens: Vec<(String, String)>,
    cursor: usize,
    text: String,
    loc: Span,
    offset: usize,
}

impl VecLexer {
    pub fn new<I, N, T>(tokens: I) -> Self
    where
        I: IntoIterator<Item = (N, T)>,
        N: Into<String>,
        T: Into<String>,
    {
        Self {
            tokens: tokens
                .into_iter()
                .map(|(name, text)| (name.into(), text.into()))
                .collect(),
            cursor: 0,
            text: String::new(),
            loc: Span {
                first_line: 1,
                first_column: 0,
                last_line: 1,
                last_column: 0,
                range: Some((0, 0)),
            },
            offset: 0,
        }
    }
}

impl Lexer for VecLexer {
    fn lex(&mut self) -> Option<LexedToken> {
        let (name, text) = self.tokens.get(self.cursor)?.clone();
        self.cursor += 1;
        let start = self.offset;
        let end = start + text.len();
        self.loc = Span {
            first_line: 1,
            first_column: start as u32,
            last_line: 1,
            last_column: end as u32,
            range: Some((start, end)),
        };
        self.offset = end + 1;
        self.text = text;
        Some(LexedToken::Name(name))
    }

    fn yytext(&self) -> &str {
        &self.text
    }

    fn yylineno(&self) -> u32 {
        1
    }

    fn yylloc(&self) -> Span {
        self.loc
    }

    fn ranges(&self) -> bool {
        true
    }
}
