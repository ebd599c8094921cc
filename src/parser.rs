use typed_arena::Arena;

use crate::chunk::Chunk;
use crate::error;
use crate::object::{self, Obj, ObjString};
use crate::opcodes::Op;
use crate::scanner::Scanner;
use crate::table::Table;
use crate::token::{Token, TokenKind};
use crate::value::Value;

const PREFIX_BP: u8 = 20;

/// Single-pass compiler: pulls tokens from the scanner and emits byte-code
/// straight into the chunk, with no intermediate tree. Expressions use
/// binding-power (Pratt) parsing; each infix operator carries an explicit
/// (left, right) pair, with right = left + 1 for left-associativity.
pub struct Parser<'source, 'ctx, 'heap> {
    source: &'source str,
    scanner: Scanner<'source>,
    current: Token,
    chunk: &'ctx mut Chunk<'heap>,
    strings: &'ctx mut Table<'heap>,
    heap: &'heap Arena<ObjString>,
    had_error: bool,
    panic_mode: bool,
}

impl<'source, 'ctx, 'heap> Parser<'source, 'ctx, 'heap> {
    pub fn new(
        source: &'source str,
        heap: &'heap Arena<ObjString>,
        chunk: &'ctx mut Chunk<'heap>,
        strings: &'ctx mut Table<'heap>,
    ) -> Self {
        let mut parser = Self {
            source,
            scanner: Scanner::new(source),
            current: Token::new(TokenKind::Eof, 0, 0, 0),
            chunk,
            strings,
            heap,
            had_error: false,
            panic_mode: false,
        };
        parser.advance();
        parser
    }

    /// Drives `declaration*` until EOF and appends the trailing return.
    /// The error flag is monotonic: one bad statement anywhere fails the
    /// whole compilation, though parsing continues for further diagnostics.
    pub fn parse(&mut self) -> bool {
        while !self.check(TokenKind::Eof) {
            self.declaration();
        }
        self.emit(Op::Return);
        !self.had_error
    }

    fn declaration(&mut self) {
        if self.matches(TokenKind::Var) {
            self.var_declaration();
        } else {
            self.statement();
        }
        if self.panic_mode {
            self.synchronize();
        }
    }

    fn var_declaration(&mut self) {
        let global = self.parse_variable("Expect variable name");

        if self.matches(TokenKind::Equal) {
            self.expression();
        } else {
            self.emit(Op::Nil);
        }

        self.consume(TokenKind::Semicolon, "Expect the ending semicolon ';'");
        self.emit_pair(Op::DefineGlobal, global);
    }

    fn statement(&mut self) {
        match self.current.kind {
            TokenKind::Print => self.print_statement(),
            _ => self.expression_statement(),
        }
    }

    fn print_statement(&mut self) {
        self.consume(TokenKind::Print, "Expect the 'print' keyword");
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect the ending semicolon ';'");
        self.emit(Op::Print);
    }

    fn expression_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect the ending semicolon ';'");
        self.emit(Op::Pop);
    }

    fn expression(&mut self) {
        self.expression_bp(0);
        if self.check(TokenKind::Equal) {
            self.error_at_current("Invalid assignment target");
        }
    }

    fn expression_bp(&mut self, min_bp: u8) {
        match self.current.kind {
            TokenKind::Minus | TokenKind::Bang => {
                let operator = self.current.kind;
                self.advance();
                self.expression_bp(PREFIX_BP);
                self.emit_prefix(operator);
            }
            TokenKind::LeftParen => self.grouping(),
            TokenKind::Number => self.number(),
            TokenKind::String => self.string(),
            TokenKind::True | TokenKind::False | TokenKind::Nil => self.literal(),
            TokenKind::Identifier => self.variable(min_bp == 0),
            _ => {
                self.error_at_current("Invalid operand");
                return;
            }
        }

        loop {
            let (left_bp, right_bp) = match infix_binding_power(self.current.kind) {
                Some(pair) => pair,
                None => return,
            };
            if left_bp < min_bp {
                return;
            }

            let operator = self.current.kind;
            self.advance();
            self.expression_bp(right_bp);
            self.emit_infix(operator);
        }
    }

    fn grouping(&mut self) {
        self.consume(TokenKind::LeftParen, "Expect opening '('");
        self.expression_bp(0);
        self.consume(TokenKind::RightParen, "Expect closing ')'");
    }

    fn number(&mut self) {
        let value = self
            .current
            .lexeme(self.source)
            .parse::<f64>()
            .expect("scanner produced an unparsable number literal");
        self.emit_constant(Value::Number(value));
        self.advance();
    }

    fn string(&mut self) {
        let token = self.current;
        // Strip the surrounding quotes; there is no escape processing.
        let contents = &self.source[token.start + 1..token.end - 1];
        let interned = object::intern(self.heap, self.strings, contents);
        self.emit_constant(Value::Obj(Obj::String(interned)));
        self.advance();
    }

    fn literal(&mut self) {
        let value = match self.current.kind {
            TokenKind::True => Value::Bool(true),
            TokenKind::False => Value::Bool(false),
            TokenKind::Nil => Value::Nil,
            _ => unreachable!(),
        };
        self.emit_constant(value);
        self.advance();
    }

    fn variable(&mut self, can_assign: bool) {
        let name = self.identifier_constant(self.current);
        self.advance();

        if can_assign && self.matches(TokenKind::Equal) {
            self.expression();
            self.emit_pair(Op::SetGlobal, name);
        } else {
            self.emit_pair(Op::GetGlobal, name);
        }
    }

    fn parse_variable(&mut self, message: &str) -> u8 {
        let token = self.current;
        self.consume(TokenKind::Identifier, message);
        self.identifier_constant(token)
    }

    /// Interns the identifier's name and stores it in the constant pool, so
    /// global accesses refer to their variable through a constant index.
    fn identifier_constant(&mut self, token: Token) -> u8 {
        let name = object::intern(self.heap, self.strings, token.lexeme(self.source));
        self.make_constant(Value::Obj(Obj::String(name)))
    }

    fn emit_prefix(&mut self, operator: TokenKind) {
        match operator {
            TokenKind::Minus => self.emit(Op::Negate),
            TokenKind::Bang => self.emit(Op::Not),
            _ => unreachable!(),
        }
    }

    /// `!=`, `>=` and `<=` have no dedicated opcodes: they lower to the
    /// complementary comparison followed by a logical not.
    fn emit_infix(&mut self, operator: TokenKind) {
        match operator {
            TokenKind::Plus => self.emit(Op::Add),
            TokenKind::Minus => self.emit(Op::Subtract),
            TokenKind::Star => self.emit(Op::Multiply),
            TokenKind::Slash => self.emit(Op::Divide),
            TokenKind::EqualEqual => self.emit(Op::Equal),
            TokenKind::BangEqual => {
                self.emit(Op::Equal);
                self.emit(Op::Not);
            }
            TokenKind::Greater => self.emit(Op::Greater),
            TokenKind::GreaterEqual => {
                self.emit(Op::Less);
                self.emit(Op::Not);
            }
            TokenKind::Less => self.emit(Op::Less),
            TokenKind::LessEqual => {
                self.emit(Op::Greater);
                self.emit(Op::Not);
            }
            TokenKind::And => self.emit(Op::And),
            TokenKind::Or => self.emit(Op::Or),
            _ => unreachable!(),
        }
    }

    fn emit(&mut self, op: Op) {
        self.chunk.write(op.u8(), self.current.line);
    }

    fn emit_pair(&mut self, op: Op, operand: u8) {
        self.emit(op);
        self.chunk.write(operand, self.current.line);
    }

    /// All literals flow through here: a one-byte operand when the pool
    /// index fits, a two-byte big-endian operand otherwise.
    fn emit_constant(&mut self, value: Value<'heap>) {
        let index = self.chunk.add_constant(value);
        if index < 256 {
            self.emit_pair(Op::Constant, index as u8);
        } else if index < 256 * 256 {
            self.emit(Op::ConstantLong);
            self.chunk.write((index >> 8) as u8, self.current.line);
            self.chunk.write(index as u8, self.current.line);
        } else {
            self.error_at_current("Too many constants in one chunk");
        }
    }

    fn make_constant(&mut self, value: Value<'heap>) -> u8 {
        let index = self.chunk.add_constant(value);
        if index > u8::MAX as usize {
            self.error_at_current("Too many constants in one chunk");
            return 0;
        }
        index as u8
    }

    fn advance(&mut self) {
        loop {
            let token = self.scanner.scan_token();
            match token.kind {
                TokenKind::Invalid | TokenKind::UnclosedString => self.error_token(token),
                _ => {
                    self.current = token;
                    return;
                }
            }
        }
    }

    fn consume(&mut self, kind: TokenKind, message: &str) {
        if self.current.kind == kind {
            self.advance();
            return;
        }
        self.error_at_current(message);
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if !self.check(kind) {
            return false;
        }
        self.advance();
        true
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    /// Panic-mode recovery: discard tokens up to the next statement
    /// boundary, then resume parsing. Keeps one malformed region to one
    /// diagnostic instead of a cascade.
    fn synchronize(&mut self) {
        self.panic_mode = false;

        loop {
            match self.current.kind {
                TokenKind::Eof => return,
                TokenKind::Semicolon => {
                    self.advance();
                    return;
                }
                TokenKind::Print | TokenKind::Var => return,
                _ => self.advance(),
            }
        }
    }

    fn error_at_current(&mut self, message: &str) {
        self.had_error = true;
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;
        error::report(self.current.line, message);
    }

    fn error_token(&mut self, token: Token) {
        self.had_error = true;
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;
        error::report_token(self.source, token);
    }
}

/// Explicit (left, right) binding powers per operator; right is one more
/// than left, making every infix operator left-associative. Returns `None`
/// for tokens that are not infix operators, which is what terminates the
/// parse loop.
fn infix_binding_power(kind: TokenKind) -> Option<(u8, u8)> {
    match kind {
        TokenKind::Or => Some((5, 6)),
        TokenKind::And => Some((7, 8)),
        TokenKind::EqualEqual
        | TokenKind::BangEqual
        | TokenKind::Greater
        | TokenKind::GreaterEqual
        | TokenKind::Less
        | TokenKind::LessEqual => Some((9, 10)),
        TokenKind::Plus | TokenKind::Minus => Some((11, 12)),
        TokenKind::Star | TokenKind::Slash => Some((13, 14)),
        _ => None,
    }
}
