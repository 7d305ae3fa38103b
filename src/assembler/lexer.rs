//! Splits a source line into tokens
//!
//! The lexer is a character-class state machine producing one token
//! per step; [tokenize] drives it until the end of the line. The
//! delimiter grammar is strict: `.` `:` `#` `,` are single-character
//! tokens, a sign must sit directly on its digits, string literals
//! keep their quotes, and several whitespace placements are illegal
//! outright. Any lexical error abandons the line.

use super::context::FileContext;
use super::token::{Span, Token, TokenKind, classify};

/// Tokenize the context's current line. Returns the token sequence,
/// always terminated by an end-of-line token, or `None` after a
/// lexical error has been reported.
pub fn tokenize(ctx: &mut FileContext) -> Option<Vec<Token>> {
    let chars: Vec<char> = ctx.current_line.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    loop {
        let token = next_token(&chars, pos, ctx)?;
        pos = token.span.start + token.span.len;
        let at_end = token.kind == TokenKind::Eol;
        tokens.push(token);
        if at_end {
            return Some(tokens);
        }
    }
}

fn is_blank(ch: char) -> bool {
    ch == ' ' || ch == '\t'
}

/// Extract the next token starting at `from`. Leading whitespace is
/// skipped; reaching the end of the line yields the end-of-line
/// token. `None` means a lexical error was reported.
fn next_token(chars: &[char], from: usize, ctx: &mut FileContext) -> Option<Token> {
    let mut i = from;
    while chars.get(i).copied().is_some_and(is_blank) {
        i += 1;
    }
    let start = i;
    let mut len = 0;
    let mut got_string = false;

    while let Some(&ch) = chars.get(i) {
        match ch {
            '.' => {
                if len > 0 {
                    break;
                }
                len = 1;
                if chars.get(i + 1).copied().is_some_and(is_blank) {
                    ctx.error_at(at(i), "whitespace after '.'");
                    return None;
                }
                break;
            }
            ' ' | '\t' => {
                // A token ending at whitespace must not run into a
                // dot or colon; both bind to the token before them.
                let mut j = i;
                while chars.get(j).copied().is_some_and(is_blank) {
                    j += 1;
                }
                match chars.get(j) {
                    Some('.') => {
                        ctx.error_at(at(i), "'.' is preceded by whitespace");
                        return None;
                    }
                    Some(':') => {
                        ctx.error_at(at(i), "':' is preceded by whitespace");
                        return None;
                    }
                    _ => {}
                }
                break;
            }
            '#' | ':' => {
                if len > 0 {
                    break;
                }
                len = 1;
                if ch == '#' && chars.get(i + 1).copied().is_some_and(is_blank) {
                    ctx.error_at(at(i), "whitespace after '#'");
                    return None;
                }
                break;
            }
            ',' => {
                if len > 0 {
                    break;
                }
                len = 1;
                break;
            }
            '"' => {
                if len > 0 {
                    ctx.error_at(at(i), "string literal must be delimited by whitespace");
                    return None;
                }
                i += 1;
                len += 1;
                while chars.get(i) != Some(&'"') {
                    if i >= chars.len() {
                        ctx.error_at(at(i), "missing terminating '\"' character");
                        return None;
                    }
                    i += 1;
                    len += 1;
                }
                len += 1;
                got_string = true;
                break;
            }
            '+' | '-' => {
                if len > 0 {
                    ctx.error_at(at(i), "number literal must be delimited by whitespace");
                    return None;
                }
                match chars.get(i + 1) {
                    Some(next) if is_blank(*next) => {
                        ctx.error_at(at(i), "whitespace between sign and number");
                        return None;
                    }
                    Some(next) if next.is_ascii_digit() => {}
                    _ => {
                        ctx.error_at(at(i), "invalid number literal");
                        return None;
                    }
                }
                len += 1;
                i += 1;
            }
            ';' => {
                ctx.error_at(at(i), "';' is only allowed at the start of a comment line");
                return None;
            }
            _ => {
                len += 1;
                i += 1;
            }
        }
    }

    if len == 0 {
        return Some(Token {
            span: Span {
                start: start + 1,
                len: 0,
            },
            kind: TokenKind::Eol,
            text: "\n".to_string(),
        });
    }

    let text: String = chars[start..start + len].iter().collect();
    let kind = if got_string {
        TokenKind::StringLit
    } else {
        classify(&text)
    };
    Some(Token {
        span: Span { start, len },
        kind,
        text,
    })
}

fn at(index: usize) -> Span {
    Span {
        start: index,
        len: 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::token::{DirectiveKind, Opcode};

    fn lex(line: &str) -> Option<Vec<Token>> {
        let mut ctx = FileContext::new();
        ctx.advance_line(line);
        let tokens = tokenize(&mut ctx);
        assert_eq!(tokens.is_none(), ctx.error);
        tokens
    }

    fn kinds(line: &str) -> Vec<TokenKind> {
        lex(line).unwrap().iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_instruction_line() {
        assert_eq!(
            kinds("MAIN: mov #-1, r3"),
            vec![
                TokenKind::Identifier,
                TokenKind::Colon,
                TokenKind::Op(Opcode::Mov),
                TokenKind::Hash,
                TokenKind::Number,
                TokenKind::Comma,
                TokenKind::Register(3),
                TokenKind::Eol,
            ]
        );
    }

    #[test]
    fn test_struct_operand_splits_on_the_dot() {
        assert_eq!(
            kinds("mov S.1, r2"),
            vec![
                TokenKind::Op(Opcode::Mov),
                TokenKind::Identifier,
                TokenKind::Dot,
                TokenKind::Number,
                TokenKind::Comma,
                TokenKind::Register(2),
                TokenKind::Eol,
            ]
        );
    }

    #[test]
    fn test_directive_line() {
        assert_eq!(
            kinds(".data +5, -3, 0"),
            vec![
                TokenKind::Dot,
                TokenKind::Directive(DirectiveKind::Data),
                TokenKind::Number,
                TokenKind::Comma,
                TokenKind::Number,
                TokenKind::Comma,
                TokenKind::Number,
                TokenKind::Eol,
            ]
        );
    }

    #[test]
    fn test_string_literal_keeps_quotes() {
        let tokens = lex(".string \"abc def\"").unwrap();
        assert_eq!(tokens[2].kind, TokenKind::StringLit);
        assert_eq!(tokens[2].text, "\"abc def\"");
    }

    #[test]
    fn test_spans_cover_source_columns() {
        let tokens = lex("mov r1, r2").unwrap();
        assert_eq!(tokens[0].span, Span { start: 0, len: 3 });
        assert_eq!(tokens[1].span, Span { start: 4, len: 2 });
        assert_eq!(tokens[2].span, Span { start: 6, len: 1 });
        assert_eq!(tokens[3].span, Span { start: 8, len: 2 });
    }

    #[test]
    fn test_empty_line_is_just_eol() {
        assert_eq!(kinds(""), vec![TokenKind::Eol]);
        assert_eq!(kinds("   \t "), vec![TokenKind::Eol]);
    }

    #[test]
    fn test_unterminated_string_is_fatal() {
        assert!(lex(".string \"abc").is_none());
    }

    #[test]
    fn test_whitespace_before_colon_is_fatal() {
        assert!(lex("label : stop").is_none());
    }

    #[test]
    fn test_whitespace_before_dot_is_fatal() {
        assert!(lex("mov S .1, r2").is_none());
    }

    #[test]
    fn test_whitespace_after_hash_is_fatal() {
        assert!(lex("mov # 1, r2").is_none());
    }

    #[test]
    fn test_sign_must_sit_on_digits() {
        assert!(lex("mov #- 1, r2").is_none());
        assert!(lex("mov #-x, r2").is_none());
        assert!(lex(".data 5-3").is_none());
    }

    #[test]
    fn test_misplaced_semicolon_is_fatal() {
        assert!(lex("mov r1, r2 ; trailing comment").is_none());
    }

    #[test]
    fn test_signed_number_is_a_single_token() {
        let tokens = lex(".data -42").unwrap();
        assert_eq!(tokens[2].kind, TokenKind::Number);
        assert_eq!(tokens[2].text, "-42");
    }
}
