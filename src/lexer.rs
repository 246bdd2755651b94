//! Lexical analyzer.
//!
//! Converts source text into a flat stream of [`Token`]s, each carrying its
//! own `line`/`column` so that later phases (parser, evaluator) can report
//! positions without re-scanning the source. The scanner is a simple
//! character-cursor with one and two character lookahead, in the same style
//! as a hand-written recursive-descent lexer: no regex, no external parsing
//! crate, just `peek`/`peek_next`/`advance`.

use crate::error::LexError;
use std::fmt;

/// The closed set of token kinds this language's grammar is built from.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // literals
    IntLit(i64),
    FloatLit(f64),
    StringLit(String),
    Identifier(String),

    // keywords
    Fn,
    If,
    Else,
    While,
    For,
    Return,
    TypeInt,
    TypeFloat,
    TypeString,
    TypeBool,
    And,
    Or,
    Not,
    True,
    False,
    Main,

    // operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Assign,
    EqualEqual,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    /// `->`, recognized by maximal munch per the scanning rules but unused
    /// by any grammar production here - carried over from the closed
    /// operator set this lexer implements. See DESIGN.md.
    Arrow,

    // punctuation
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Comma,
    Semicolon,
    Dot,

    Newline,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TokenKind::IntLit(n) => write!(f, "integer literal '{}'", n),
            TokenKind::FloatLit(n) => write!(f, "float literal '{}'", n),
            TokenKind::StringLit(s) => write!(f, "string literal \"{}\"", s),
            TokenKind::Identifier(s) => write!(f, "identifier '{}'", s),
            TokenKind::Newline => write!(f, "newline"),
            TokenKind::Eof => write!(f, "end of input"),
            other => write!(f, "'{:?}'", other),
        }
    }
}

impl TokenKind {
    /// The `kind` string used by the `tokenize` external entry point -
    /// the closed set named in the external interface, independent of
    /// this enum's own (Rust-idiomatic) variant names.
    pub fn external_name(&self) -> &'static str {
        match self {
            TokenKind::IntLit(_) => "NUMBER",
            TokenKind::FloatLit(_) => "NUMBER",
            TokenKind::StringLit(_) => "STRING",
            TokenKind::Identifier(_) => "IDENTIFIER",
            TokenKind::Fn => "FN",
            TokenKind::If => "IF",
            TokenKind::Else => "ELSE",
            TokenKind::While => "WHILE",
            TokenKind::For => "FOR",
            TokenKind::Return => "RETURN",
            TokenKind::TypeInt => "INT",
            TokenKind::TypeFloat => "FLOAT",
            TokenKind::TypeString => "STRING_TYPE",
            TokenKind::TypeBool => "BOOL",
            TokenKind::And => "AND",
            TokenKind::Or => "OR",
            TokenKind::Not => "NOT",
            TokenKind::True => "TRUE",
            TokenKind::False => "FALSE",
            TokenKind::Main => "MAIN",
            TokenKind::Plus => "PLUS",
            TokenKind::Minus => "MINUS",
            TokenKind::Star => "MULTIPLY",
            TokenKind::Slash => "DIVIDE",
            TokenKind::Percent => "MODULO",
            TokenKind::Assign => "ASSIGN",
            TokenKind::EqualEqual => "EQUAL",
            TokenKind::NotEqual => "NOT_EQUAL",
            TokenKind::Less => "LESS_THAN",
            TokenKind::Greater => "GREATER_THAN",
            TokenKind::LessEqual => "LESS_EQUAL",
            TokenKind::GreaterEqual => "GREATER_EQUAL",
            TokenKind::Arrow => "ARROW",
            TokenKind::LeftParen => "LPAREN",
            TokenKind::RightParen => "RPAREN",
            TokenKind::LeftBrace => "LBRACE",
            TokenKind::RightBrace => "RBRACE",
            TokenKind::LeftBracket => "LBRACKET",
            TokenKind::RightBracket => "RBRACKET",
            TokenKind::Comma => "COMMA",
            TokenKind::Semicolon => "SEMICOLON",
            TokenKind::Dot => "DOT",
            TokenKind::Newline => "NEWLINE",
            TokenKind::Eof => "EOF",
        }
    }
}

/// A single lexeme together with its source position.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: usize,
    pub column: usize,
}

/// Character-cursor scanner that turns source text into [`Token`]s.
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        // `\r\n` line endings are normalized by dropping the `\r`; a lone
        // `\r` is likewise just skipped as trivia below.
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Scans the entire input into a token stream terminated by `Eof`.
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_trivia()?;

        let start_line = self.line;
        let start_column = self.column;

        if self.is_at_end() {
            return Ok(Token {
                kind: TokenKind::Eof,
                lexeme: String::new(),
                line: start_line,
                column: start_column,
            });
        }

        let c = self.advance();

        if c == '\n' {
            return Ok(Token {
                kind: TokenKind::Newline,
                lexeme: "\n".to_string(),
                line: start_line,
                column: start_column,
            });
        }

        let (kind, width) = match c {
            '(' => (TokenKind::LeftParen, 1),
            ')' => (TokenKind::RightParen, 1),
            '{' => (TokenKind::LeftBrace, 1),
            '}' => (TokenKind::RightBrace, 1),
            '[' => (TokenKind::LeftBracket, 1),
            ']' => (TokenKind::RightBracket, 1),
            ',' => (TokenKind::Comma, 1),
            ';' => (TokenKind::Semicolon, 1),
            '.' => (TokenKind::Dot, 1),
            '+' => (TokenKind::Plus, 1),
            '*' => (TokenKind::Star, 1),
            '/' => (TokenKind::Slash, 1),
            '%' => (TokenKind::Percent, 1),
            '-' => {
                if self.peek() == '>' {
                    self.advance();
                    (TokenKind::Arrow, 2)
                } else {
                    (TokenKind::Minus, 1)
                }
            }
            '=' => {
                if self.peek() == '=' {
                    self.advance();
                    (TokenKind::EqualEqual, 2)
                } else {
                    (TokenKind::Assign, 1)
                }
            }
            '!' => {
                if self.peek() == '=' {
                    self.advance();
                    (TokenKind::NotEqual, 2)
                } else {
                    return Err(LexError::UnexpectedCharacter {
                        ch: c,
                        line: start_line,
                        column: start_column,
                    });
                }
            }
            '>' => {
                if self.peek() == '=' {
                    self.advance();
                    (TokenKind::GreaterEqual, 2)
                } else {
                    (TokenKind::Greater, 1)
                }
            }
            '<' => {
                if self.peek() == '=' {
                    self.advance();
                    (TokenKind::LessEqual, 2)
                } else {
                    (TokenKind::Less, 1)
                }
            }
            '&' => {
                if self.peek() == '&' {
                    self.advance();
                    (TokenKind::And, 2)
                } else {
                    return Err(LexError::UnexpectedCharacter {
                        ch: c,
                        line: start_line,
                        column: start_column,
                    });
                }
            }
            '|' => {
                if self.peek() == '|' {
                    self.advance();
                    (TokenKind::Or, 2)
                } else {
                    return Err(LexError::UnexpectedCharacter {
                        ch: c,
                        line: start_line,
                        column: start_column,
                    });
                }
            }
            '"' | '\'' => return self.string_literal(c, start_line, start_column),
            c if c.is_ascii_digit() => return self.number_literal(c, start_line, start_column),
            c if c.is_ascii_alphabetic() || c == '_' => {
                return self.identifier_or_keyword(c, start_line, start_column)
            }
            _ => {
                return Err(LexError::UnexpectedCharacter {
                    ch: c,
                    line: start_line,
                    column: start_column,
                })
            }
        };

        let lexeme = self.input[self.position - width..self.position].iter().collect();

        Ok(Token {
            kind,
            lexeme,
            line: start_line,
            column: start_column,
        })
    }

    /// String literals may be delimited by `"` or `'`; whichever quote
    /// opened the literal is the only one that can close it.
    fn string_literal(
        &mut self,
        quote: char,
        line: usize,
        column: usize,
    ) -> Result<Token, LexError> {
        let mut value = String::new();
        loop {
            if self.is_at_end() {
                return Err(LexError::UnterminatedString { line, column });
            }
            let c = self.advance();
            match c {
                c if c == quote => break,
                '\\' => {
                    if self.is_at_end() {
                        return Err(LexError::UnterminatedString { line, column });
                    }
                    let escaped = self.advance();
                    value.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        '\\' => '\\',
                        other => other,
                    });
                }
                '\n' => return Err(LexError::UnterminatedString { line, column }),
                other => value.push(other),
            }
        }
        let lexeme = format!("{quote}{value}{quote}");
        Ok(Token {
            kind: TokenKind::StringLit(value),
            lexeme,
            line,
            column,
        })
    }

    fn number_literal(
        &mut self,
        first_digit: char,
        line: usize,
        column: usize,
    ) -> Result<Token, LexError> {
        let mut lexeme = String::from(first_digit);
        while self.peek().is_ascii_digit() {
            lexeme.push(self.advance());
        }

        let mut is_float = false;
        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            is_float = true;
            lexeme.push(self.advance());
            while self.peek().is_ascii_digit() {
                lexeme.push(self.advance());
            }
        }

        let kind = if is_float {
            let value = lexeme.parse::<f64>().map_err(|_| LexError::InvalidNumber {
                lexeme: lexeme.clone(),
                line,
                column,
            })?;
            TokenKind::FloatLit(value)
        } else {
            let value = lexeme.parse::<i64>().map_err(|_| LexError::InvalidNumber {
                lexeme: lexeme.clone(),
                line,
                column,
            })?;
            TokenKind::IntLit(value)
        };

        Ok(Token {
            kind,
            lexeme,
            line,
            column,
        })
    }

    fn identifier_or_keyword(
        &mut self,
        first_char: char,
        line: usize,
        column: usize,
    ) -> Result<Token, LexError> {
        let mut lexeme = String::from(first_char);
        while self.peek().is_ascii_alphanumeric() || self.peek() == '_' {
            lexeme.push(self.advance());
        }

        let kind = match lexeme.as_str() {
            "fn" => TokenKind::Fn,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "for" => TokenKind::For,
            "return" => TokenKind::Return,
            "int" => TokenKind::TypeInt,
            "float" => TokenKind::TypeFloat,
            "string" => TokenKind::TypeString,
            "bool" => TokenKind::TypeBool,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "main" => TokenKind::Main,
            _ => TokenKind::Identifier(lexeme.clone()),
        };

        Ok(Token {
            kind,
            lexeme,
            line,
            column,
        })
    }

    /// Skips whitespace (space/tab/carriage-return) and both comment
    /// forms. Newlines are *not* trivia - they're tokenized by
    /// `next_token` itself - so this only loops over the forms that carry
    /// no grammatical weight at all.
    fn skip_trivia(&mut self) -> Result<(), LexError> {
        loop {
            match self.peek() {
                ' ' | '\r' | '\t' => {
                    self.advance();
                }
                '/' if self.peek_next() == '/' => {
                    while self.peek() != '\n' && !self.is_at_end() {
                        self.advance();
                    }
                }
                '/' if self.peek_next() == '*' => {
                    let (start_line, start_column) = (self.line, self.column);
                    self.advance();
                    self.advance();
                    loop {
                        if self.is_at_end() {
                            return Err(LexError::UnterminatedComment {
                                line: start_line,
                                column: start_column,
                            });
                        }
                        if self.peek() == '*' && self.peek_next() == '/' {
                            self.advance();
                            self.advance();
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn advance(&mut self) -> char {
        if !self.is_at_end() {
            let c = self.input[self.position];
            self.position += 1;
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            c
        } else {
            '\0'
        }
    }

    fn peek(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.input[self.position]
        }
    }

    fn peek_next(&self) -> char {
        if self.position + 1 >= self.input.len() {
            '\0'
        } else {
            self.input[self.position + 1]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_all(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .expect("source should lex cleanly")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn lexes_an_arithmetic_expression() {
        let kinds = lex_all("1 + 2 * 3");
        assert_eq!(
            kinds,
            vec![
                TokenKind::IntLit(1),
                TokenKind::Plus,
                TokenKind::IntLit(2),
                TokenKind::Star,
                TokenKind::IntLit(3),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn distinguishes_int_and_float_literals() {
        let kinds = lex_all("42 3.14 5.");
        assert_eq!(kinds[0], TokenKind::IntLit(42));
        assert_eq!(kinds[1], TokenKind::FloatLit(3.14));
        // trailing dot with no following digit is not consumed as a decimal point
        assert_eq!(kinds[2], TokenKind::IntLit(5));
        assert_eq!(kinds[3], TokenKind::Dot);
    }

    #[test]
    fn integer_literal_overflow_is_a_lex_error_not_a_panic() {
        let err = Lexer::new("99999999999999999999").tokenize().unwrap_err();
        assert!(matches!(err, LexError::InvalidNumber { .. }));
    }

    #[test]
    fn maximal_munch_disambiguates_two_char_operators() {
        let kinds = lex_all("a == b != c <= d >= e = f && g || h");
        assert_eq!(
            kinds,
            vec![
                TokenKind::Identifier("a".into()),
                TokenKind::EqualEqual,
                TokenKind::Identifier("b".into()),
                TokenKind::NotEqual,
                TokenKind::Identifier("c".into()),
                TokenKind::LessEqual,
                TokenKind::Identifier("d".into()),
                TokenKind::GreaterEqual,
                TokenKind::Identifier("e".into()),
                TokenKind::Assign,
                TokenKind::Identifier("f".into()),
                TokenKind::And,
                TokenKind::Identifier("g".into()),
                TokenKind::Or,
                TokenKind::Identifier("h".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn arrow_is_recognized_as_its_own_token() {
        let kinds = lex_all("a -> b");
        assert_eq!(
            kinds,
            vec![
                TokenKind::Identifier("a".into()),
                TokenKind::Arrow,
                TokenKind::Identifier("b".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn recognizes_keywords_as_distinct_from_identifiers() {
        let kinds = lex_all("fn main if else while for return int float string bool and or not true false");
        assert_eq!(
            kinds,
            vec![
                TokenKind::Fn,
                TokenKind::Main,
                TokenKind::If,
                TokenKind::Else,
                TokenKind::While,
                TokenKind::For,
                TokenKind::Return,
                TokenKind::TypeInt,
                TokenKind::TypeFloat,
                TokenKind::TypeString,
                TokenKind::TypeBool,
                TokenKind::And,
                TokenKind::Or,
                TokenKind::Not,
                TokenKind::True,
                TokenKind::False,
            ]
        );
    }

    #[test]
    fn string_literal_supports_escapes() {
        let kinds = lex_all(r#""hello\nworld""#);
        assert_eq!(kinds[0], TokenKind::StringLit("hello\nworld".to_string()));
    }

    #[test]
    fn single_and_double_quotes_both_delimit_strings() {
        let kinds = lex_all(r#"'it''s' "ok""#);
        assert_eq!(kinds[0], TokenKind::StringLit("it".to_string()));
        assert_eq!(kinds[1], TokenKind::StringLit("s".to_string()));
        assert_eq!(kinds[2], TokenKind::StringLit("ok".to_string()));
    }

    #[test]
    fn newline_is_emitted_as_its_own_token() {
        let kinds = lex_all("a\nb");
        assert_eq!(
            kinds,
            vec![
                TokenKind::Identifier("a".into()),
                TokenKind::Newline,
                TokenKind::Identifier("b".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn tracks_line_and_column_across_newlines() {
        let tokens = Lexer::new("a\nb").tokenize().unwrap();
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[2].line, 2);
        assert_eq!(tokens[2].column, 1);
    }

    #[test]
    fn external_kind_names_match_the_closed_set() {
        assert_eq!(TokenKind::IntLit(1).external_name(), "NUMBER");
        assert_eq!(TokenKind::TypeString.external_name(), "STRING_TYPE");
        assert_eq!(TokenKind::Newline.external_name(), "NEWLINE");
        assert_eq!(TokenKind::Eof.external_name(), "EOF");
    }

    // ==================== EDGE CASES ====================

    #[test]
    fn unterminated_string_reports_its_start_position() {
        let err = Lexer::new("\"abc").tokenize().unwrap_err();
        assert_eq!(err, LexError::UnterminatedString { line: 1, column: 1 });
    }

    #[test]
    fn unterminated_block_comment_reports_its_opening_position() {
        let err = Lexer::new("x /* never closed").tokenize().unwrap_err();
        assert_eq!(
            err,
            LexError::UnterminatedComment { line: 1, column: 3 }
        );
    }

    #[test]
    fn line_comment_runs_to_end_of_line_only() {
        let kinds = lex_all("1 // ignored\n2");
        assert_eq!(
            kinds,
            vec![TokenKind::IntLit(1), TokenKind::Newline, TokenKind::IntLit(2), TokenKind::Eof]
        );
    }

    #[test]
    fn block_comment_can_span_multiple_lines() {
        let kinds = lex_all("1 /* line one\nline two */ 2");
        assert_eq!(kinds, vec![TokenKind::IntLit(1), TokenKind::IntLit(2), TokenKind::Eof]);
    }

    #[test]
    fn block_comment_newlines_are_counted_only_once() {
        let tokens = Lexer::new("1 /* a\nb */ 2").tokenize().unwrap();
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn unrecognized_character_fails_instead_of_being_skipped() {
        let err = Lexer::new("@").tokenize().unwrap_err();
        assert_eq!(
            err,
            LexError::UnexpectedCharacter { ch: '@', line: 1, column: 1 }
        );
    }

    #[test]
    fn lone_bang_is_rejected() {
        let err = Lexer::new("!").tokenize().unwrap_err();
        assert_eq!(
            err,
            LexError::UnexpectedCharacter { ch: '!', line: 1, column: 1 }
        );
    }

    #[test]
    fn lone_ampersand_and_pipe_are_rejected() {
        assert!(matches!(
            Lexer::new("&").tokenize(),
            Err(LexError::UnexpectedCharacter { ch: '&', .. })
        ));
        assert!(matches!(
            Lexer::new("|").tokenize(),
            Err(LexError::UnexpectedCharacter { ch: '|', .. })
        ));
    }

    #[test]
    fn ends_with_exactly_one_eof_and_no_earlier_eof() {
        let tokens = Lexer::new("fn main() { out(1) }\n\n").tokenize().unwrap();
        let eof_count = tokens.iter().filter(|t| t.kind == TokenKind::Eof).count();
        assert_eq!(eof_count, 1);
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
    }
}
