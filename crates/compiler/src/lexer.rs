//! Lexer for minic source text
//!
//! Produces a flat token stream tagged with line numbers and byte offsets.
//! Keywords are recognized only on full identifier words, so `return_code`
//! is a single identifier. An unrecognized character is an error, not a
//! silent end-of-input.
//!
//! Note that the basic type names (`int`, `float`, ...) are NOT keywords;
//! they reach the parser as plain identifiers and are recognized there by
//! value during type-name lookahead.

use std::fmt;

/// Closed set of token kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    LiteralInteger,
    LiteralDecimal,
    Return,
    If,
    Else,
    While,
    Struct,
    Unsigned,
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Semicolon,
    Comma,
    Assign,
    Equality,
    GreaterThan,
    GreaterThanEqual,
    LessThan,
    LessThanEqual,
    Ampersand,
    Pipe,
    Star,
    Slash,
    Plus,
    Minus,
    Dot,
}

/// Token payload: identifier/keyword/operator text, or a parsed number.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenValue {
    Text(String),
    Int(i64),
    Float(f64),
}

impl fmt::Display for TokenValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenValue::Text(s) => write!(f, "{}", s),
            TokenValue::Int(n) => write!(f, "{}", n),
            TokenValue::Float(x) => write!(f, "{}", x),
        }
    }
}

/// A token with source position information
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: TokenValue,
    /// Line number (0-indexed)
    pub line: usize,
    /// Byte offset of the token start in the source buffer
    pub offset: usize,
}

impl Token {
    /// Identifier text, if this token is an identifier.
    pub fn ident(&self) -> Option<&str> {
        match (&self.kind, &self.value) {
            (TokenKind::Identifier, TokenValue::Text(s)) => Some(s),
            _ => None,
        }
    }
}

/// Tokenize a source buffer.
pub fn tokenize(source: &str) -> Result<Vec<Token>, String> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    Ok(tokens)
}

struct Lexer<'a> {
    bytes: &'a [u8],
    pos: usize,
    line: usize,
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Lexer {
            bytes: source.as_bytes(),
            pos: 0,
            line: 0,
        }
    }

    fn at(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos + 1).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(b) = self.at() {
            match b {
                b'\n' => {
                    self.line += 1;
                    self.pos += 1;
                }
                b' ' | b'\t' => self.pos += 1,
                _ => break,
            }
        }
    }

    fn token(&self, kind: TokenKind, value: TokenValue, offset: usize) -> Token {
        Token {
            kind,
            value,
            line: self.line,
            offset,
        }
    }

    fn next_word(&mut self) -> Token {
        let start = self.pos;
        while self.at().is_some_and(is_ident_continue) {
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.bytes[start..self.pos])
            .unwrap_or_default()
            .to_string();
        let kind = match text.as_str() {
            "return" => TokenKind::Return,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "struct" => TokenKind::Struct,
            "unsigned" => TokenKind::Unsigned,
            _ => TokenKind::Identifier,
        };
        self.token(kind, TokenValue::Text(text), start)
    }

    /// Scan a run of digits with at most one `.`; a second `.` ends the
    /// number (so `1.2.3` lexes as `1.2`, `.`, `3`).
    fn next_number(&mut self) -> Result<Token, String> {
        let start = self.pos;
        let mut seen_dot = false;
        while let Some(b) = self.at() {
            if b == b'.' {
                if seen_dot {
                    break;
                }
                seen_dot = true;
            } else if !b.is_ascii_digit() {
                break;
            }
            self.pos += 1;
        }

        let digits = std::str::from_utf8(&self.bytes[start..self.pos]).unwrap_or_default();
        if seen_dot {
            let value: f64 = digits
                .parse()
                .map_err(|_| format!("invalid decimal literal '{}' at line {}", digits, self.line + 1))?;
            Ok(self.token(TokenKind::LiteralDecimal, TokenValue::Float(value), start))
        } else {
            let value: i64 = digits
                .parse()
                .map_err(|_| format!("invalid integer literal '{}' at line {}", digits, self.line + 1))?;
            Ok(self.token(TokenKind::LiteralInteger, TokenValue::Int(value), start))
        }
    }

    fn single(&mut self, kind: TokenKind, text: &str) -> Token {
        let start = self.pos;
        self.pos += 1;
        self.token(kind, TokenValue::Text(text.to_string()), start)
    }

    /// `=`, `>`, `<` optionally followed by `=`.
    fn with_equal(
        &mut self,
        single_kind: TokenKind,
        single_text: &str,
        double_kind: TokenKind,
        double_text: &str,
    ) -> Token {
        let start = self.pos;
        if self.peek() == Some(b'=') {
            self.pos += 2;
            self.token(double_kind, TokenValue::Text(double_text.to_string()), start)
        } else {
            self.pos += 1;
            self.token(single_kind, TokenValue::Text(single_text.to_string()), start)
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, String> {
        self.skip_whitespace();

        let Some(b) = self.at() else {
            return Ok(None);
        };

        let token = match b {
            _ if is_ident_start(b) => self.next_word(),
            _ if b.is_ascii_digit() => self.next_number()?,
            b'(' => self.single(TokenKind::LeftParen, "("),
            b')' => self.single(TokenKind::RightParen, ")"),
            b'{' => self.single(TokenKind::LeftBrace, "{"),
            b'}' => self.single(TokenKind::RightBrace, "}"),
            b';' => self.single(TokenKind::Semicolon, ";"),
            b',' => self.single(TokenKind::Comma, ","),
            b'=' => self.with_equal(TokenKind::Assign, "=", TokenKind::Equality, "=="),
            b'>' => self.with_equal(
                TokenKind::GreaterThan,
                ">",
                TokenKind::GreaterThanEqual,
                ">=",
            ),
            b'<' => self.with_equal(TokenKind::LessThan, "<", TokenKind::LessThanEqual, "<="),
            b'&' => self.single(TokenKind::Ampersand, "&"),
            b'|' => self.single(TokenKind::Pipe, "|"),
            b'*' => self.single(TokenKind::Star, "*"),
            b'/' => self.single(TokenKind::Slash, "/"),
            b'+' => self.single(TokenKind::Plus, "+"),
            b'-' => {
                // a leading '-' is never part of a literal; the parser owns
                // unary minus
                self.single(TokenKind::Minus, "-")
            }
            b'.' => {
                if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.next_number()?
                } else {
                    self.single(TokenKind::Dot, ".")
                }
            }
            _ => {
                return Err(format!(
                    "unrecognized character '{}' at line {}",
                    b as char,
                    self.line + 1
                ));
            }
        };

        Ok(Some(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_tokenize_function_header() {
        let tokens = tokenize("float my_function(int arg0, int arg1)").unwrap();
        let expected = [
            (TokenKind::Identifier, "float"),
            (TokenKind::Identifier, "my_function"),
            (TokenKind::LeftParen, "("),
            (TokenKind::Identifier, "int"),
            (TokenKind::Identifier, "arg0"),
            (TokenKind::Comma, ","),
            (TokenKind::Identifier, "int"),
            (TokenKind::Identifier, "arg1"),
            (TokenKind::RightParen, ")"),
        ];
        assert_eq!(tokens.len(), expected.len());
        for (token, (kind, text)) in tokens.iter().zip(expected) {
            assert_eq!(token.kind, kind);
            assert_eq!(token.value, TokenValue::Text(text.to_string()));
        }
    }

    #[test]
    fn test_two_char_operators() {
        assert_eq!(
            kinds("== = <= < >= >"),
            vec![
                TokenKind::Equality,
                TokenKind::Assign,
                TokenKind::LessThanEqual,
                TokenKind::LessThan,
                TokenKind::GreaterThanEqual,
                TokenKind::GreaterThan,
            ]
        );
    }

    #[test]
    fn test_keywords_require_word_boundary() {
        let tokens = tokenize("return return_code; iffy while").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Return);
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
        assert_eq!(tokens[1].value, TokenValue::Text("return_code".to_string()));
        assert_eq!(tokens[3].kind, TokenKind::Identifier);
        assert_eq!(tokens[3].value, TokenValue::Text("iffy".to_string()));
        assert_eq!(tokens[4].kind, TokenKind::While);
    }

    #[test]
    fn test_number_literals() {
        let tokens = tokenize("42 1.05 .95 1.2.3").unwrap();
        assert_eq!(tokens[0].value, TokenValue::Int(42));
        assert_eq!(tokens[1].value, TokenValue::Float(1.05));
        assert_eq!(tokens[2].value, TokenValue::Float(0.95));
        // a second dot ends the literal
        assert_eq!(tokens[3].value, TokenValue::Float(1.2));
        assert_eq!(tokens[4].kind, TokenKind::Dot);
        assert_eq!(tokens[5].value, TokenValue::Int(3));
    }

    #[test]
    fn test_minus_is_never_part_of_literal() {
        assert_eq!(
            kinds("-1"),
            vec![TokenKind::Minus, TokenKind::LiteralInteger]
        );
    }

    #[test]
    fn test_line_numbers() {
        let tokens = tokenize("a\nb\n\nc").unwrap();
        assert_eq!(tokens[0].line, 0);
        assert_eq!(tokens[1].line, 1);
        assert_eq!(tokens[2].line, 3);
    }

    #[test]
    fn test_unrecognized_character_is_error() {
        let err = tokenize("int a = 0;\nint b = $;").unwrap_err();
        assert!(err.contains('$'), "error should name the character: {}", err);
        assert!(err.contains("line 2"), "error should carry the line: {}", err);
    }

    #[test]
    fn test_dot_before_identifier_is_dot() {
        assert_eq!(
            kinds("p.x"),
            vec![TokenKind::Identifier, TokenKind::Dot, TokenKind::Identifier]
        );
    }
}
