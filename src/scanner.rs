use crate::token::{Token, TokenKind};

/// On-demand tokenizer. Tokens never copy source text; they carry byte
/// offsets into the buffer the scanner was built from. Once the end of input
/// is reached, every further call keeps returning `Eof`.
pub struct Scanner<'source> {
    source: &'source [u8],
    current: usize,
    line: usize,
}

impl<'source> Scanner<'source> {
    pub fn new(source: &'source str) -> Self {
        Scanner {
            source: source.as_bytes(),
            current: 0,
            line: 0,
        }
    }

    pub fn scan_token(&mut self) -> Token {
        self.skip_whitespace();

        let start = self.current;
        let line = self.line;

        if self.is_at_end() {
            return Token::new(TokenKind::Eof, start, start, line);
        }

        let c = self.peek();

        if c.is_ascii_digit() {
            return self.number(start, line);
        }
        if is_alpha(c) {
            return self.identifier(start, line);
        }

        self.advance();
        let kind = match c {
            b'(' => TokenKind::LeftParen,
            b')' => TokenKind::RightParen,
            b'{' => TokenKind::LeftBrace,
            b'}' => TokenKind::RightBrace,
            b',' => TokenKind::Comma,
            b'.' => TokenKind::Dot,
            b'-' => TokenKind::Minus,
            b'+' => TokenKind::Plus,
            b';' => TokenKind::Semicolon,
            b'/' => TokenKind::Slash,
            b'*' => TokenKind::Star,
            b'!' => self.either(b'=', TokenKind::BangEqual, TokenKind::Bang),
            b'=' => self.either(b'=', TokenKind::EqualEqual, TokenKind::Equal),
            b'<' => self.either(b'=', TokenKind::LessEqual, TokenKind::Less),
            b'>' => self.either(b'=', TokenKind::GreaterEqual, TokenKind::Greater),
            b'"' => return self.string(start, line),
            _ => TokenKind::Invalid,
        };

        Token::new(kind, start, self.current, line)
    }

    fn string(&mut self, start: usize, line: usize) -> Token {
        // The opening quote was already consumed.
        while self.peek() != b'"' && !self.is_at_end() {
            self.advance();
        }

        if self.is_at_end() {
            return Token::new(TokenKind::UnclosedString, start, self.current, line);
        }

        self.advance();
        Token::new(TokenKind::String, start, self.current, line)
    }

    fn number(&mut self, start: usize, line: usize) -> Token {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        Token::new(TokenKind::Number, start, self.current, line)
    }

    fn identifier(&mut self, start: usize, line: usize) -> Token {
        while is_alpha(self.peek()) || self.peek().is_ascii_digit() {
            self.advance();
        }

        let kind = keyword_kind(&self.source[start..self.current]);
        Token::new(kind, start, self.current, line)
    }

    fn skip_whitespace(&mut self) {
        loop {
            match self.peek() {
                b' ' | b'\r' | b'\t' | b'\n' => {
                    self.advance();
                }
                b'/' if self.peek_next() == b'/' => {
                    while self.peek() != b'\n' && !self.is_at_end() {
                        self.advance();
                    }
                }
                _ => return,
            }
        }
    }

    fn either(&mut self, expected: u8, matched: TokenKind, single: TokenKind) -> TokenKind {
        if self.matches(expected) {
            matched
        } else {
            single
        }
    }

    fn matches(&mut self, expected: u8) -> bool {
        if self.is_at_end() || self.peek() != expected {
            return false;
        }
        self.advance();
        true
    }

    fn advance(&mut self) -> u8 {
        let c = self.peek();
        self.current += 1;
        if c == b'\n' {
            self.line += 1;
        }
        c
    }

    fn peek(&self) -> u8 {
        self.source.get(self.current).copied().unwrap_or(b'\0')
    }

    fn peek_next(&self) -> u8 {
        self.source.get(self.current + 1).copied().unwrap_or(b'\0')
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }
}

fn is_alpha(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

fn keyword_kind(lexeme: &[u8]) -> TokenKind {
    match lexeme {
        b"and" => TokenKind::And,
        b"class" => TokenKind::Class,
        b"else" => TokenKind::Else,
        b"false" => TokenKind::False,
        b"for" => TokenKind::For,
        b"fun" => TokenKind::Fun,
        b"if" => TokenKind::If,
        b"nil" => TokenKind::Nil,
        b"or" => TokenKind::Or,
        b"print" => TokenKind::Print,
        b"return" => TokenKind::Return,
        b"super" => TokenKind::Super,
        b"this" => TokenKind::This,
        b"true" => TokenKind::True,
        b"var" => TokenKind::Var,
        b"while" => TokenKind::While,
        _ => TokenKind::Identifier,
    }
}
