//! Cursor over the current line's token sequence

use super::token::{Token, TokenKind};

/// A cursor over one line's tokens with a single save slot. The
/// sequence always ends in an end-of-line token and the cursor never
/// moves past it; one slot is all the parser's local lookahead needs.
pub struct TokenStream<'a> {
    tokens: &'a [Token],
    cur: usize,
    prev: usize,
    saved: (usize, usize),
}

impl<'a> TokenStream<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        TokenStream {
            tokens,
            cur: 0,
            prev: 0,
            saved: (0, 0),
        }
    }

    pub fn current(&self) -> &Token {
        &self.tokens[self.cur]
    }

    pub fn previous(&self) -> &Token {
        &self.tokens[self.prev]
    }

    pub fn is_eol(&self) -> bool {
        self.current().kind == TokenKind::Eol
    }

    /// Move one token forward; a no-op at the end of the line
    pub fn advance(&mut self) {
        if !self.is_eol() {
            self.prev = self.cur;
            self.cur += 1;
        }
    }

    pub fn save(&mut self) {
        self.saved = (self.cur, self.prev);
    }

    pub fn restore(&mut self) {
        (self.cur, self.prev) = self.saved;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::token::Span;

    fn token(kind: TokenKind, text: &str) -> Token {
        Token {
            span: Span { start: 0, len: text.len() },
            kind,
            text: text.to_string(),
        }
    }

    fn sample() -> Vec<Token> {
        vec![
            token(TokenKind::Identifier, "x"),
            token(TokenKind::Colon, ":"),
            token(TokenKind::Eol, "\n"),
        ]
    }

    #[test]
    fn test_advance_stops_at_end_of_line() {
        let tokens = sample();
        let mut ts = TokenStream::new(&tokens);
        assert_eq!(ts.current().kind, TokenKind::Identifier);

        ts.advance();
        assert_eq!(ts.current().kind, TokenKind::Colon);
        assert_eq!(ts.previous().kind, TokenKind::Identifier);

        ts.advance();
        assert!(ts.is_eol());

        ts.advance();
        assert!(ts.is_eol());
        assert_eq!(ts.previous().kind, TokenKind::Colon);
    }

    #[test]
    fn test_save_and_restore_round_trip() {
        let tokens = sample();
        let mut ts = TokenStream::new(&tokens);

        ts.save();
        ts.advance();
        ts.advance();
        assert!(ts.is_eol());

        ts.restore();
        assert_eq!(ts.current().kind, TokenKind::Identifier);
        assert_eq!(ts.previous().kind, TokenKind::Identifier);
    }
}
