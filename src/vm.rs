use std::convert::TryFrom;
use std::io::{self, Write};

use thiserror::Error;
use typed_arena::Arena;

use crate::chunk::Chunk;
use crate::compiler;
use crate::error;
use crate::object::{self, Obj, ObjString};
use crate::opcodes::Op;
use crate::table::Table;
use crate::value::Value;

pub const STACK_MAX: usize = 256;

const STACK_UNDERFLOW: &str = "stack underflow";

#[derive(Debug, Error, Eq, PartialEq)]
pub enum InterpretError {
    #[error("compile error")]
    CompileError,
    #[error("runtime error")]
    RuntimeError,
}

pub type InterpretResult = Result<(), InterpretError>;

macro_rules! binary_op {
    ($self:ident, $operator:tt, $variant:tt) => {{
        let b = $self.pop();
        let a = $self.pop();
        if let (Value::Number(n1), Value::Number(n2)) = (a, b) {
            $self.push(Value::$variant(n1 $operator n2))?;
        } else {
            return Err($self.runtime_error("Operands must be two numbers"));
        }
    }};
}

/// The interpreter context: one chunk, an operand stack, the string intern
/// table, and the global bindings. The arena passed at construction owns
/// every heap object allocated while this VM runs; dropping it tears all of
/// them down at once. A single instance survives any number of `interpret`
/// calls, so a REPL keeps its globals and interned strings between lines.
pub struct Vm<'heap, W = io::Stdout> {
    heap: &'heap Arena<ObjString>,
    chunk: Chunk<'heap>,
    ip: usize,
    stack: Vec<Value<'heap>>,
    strings: Table<'heap>,
    globals: Table<'heap>,
    out: W,
}

impl<'heap> Vm<'heap, io::Stdout> {
    pub fn new(heap: &'heap Arena<ObjString>) -> Self {
        Self::with_output(heap, io::stdout())
    }
}

impl<'heap, W: Write> Vm<'heap, W> {
    /// Builds a VM whose `print` statements write to `out` instead of
    /// standard output.
    pub fn with_output(heap: &'heap Arena<ObjString>, out: W) -> Self {
        Vm {
            heap,
            chunk: Chunk::new(),
            ip: 0,
            stack: Vec::with_capacity(STACK_MAX),
            strings: Table::new(),
            globals: Table::new(),
            out,
        }
    }

    /// Compiles and runs one source buffer. The stack, instruction pointer
    /// and chunk code are reset first, so a failed run never poisons the
    /// next one.
    pub fn interpret(&mut self, source: &str) -> InterpretResult {
        self.stack.clear();
        self.ip = 0;
        self.chunk.reset();

        if compiler::compile(source, self.heap, &mut self.chunk, &mut self.strings).is_err() {
            return Err(InterpretError::CompileError);
        }

        self.run()
    }

    fn run(&mut self) -> InterpretResult {
        while self.ip < self.chunk.code.len() {
            #[cfg(feature = "trace")]
            {
                eprintln!("          {:?}", self.stack);
                let (text, _) = crate::debug::disassemble_instruction(&self.chunk, self.ip);
                eprintln!("{}", text);
            }

            let byte = self.next_byte();
            let instruction = match Op::try_from(byte) {
                Ok(op) => op,
                Err(()) => return Err(self.runtime_error(&format!("Unknown opcode {}", byte))),
            };

            match instruction {
                Op::Return => return Ok(()),
                Op::Print => {
                    let value = self.pop();
                    let _ = writeln!(self.out, "{}", value);
                }
                Op::Pop => {
                    self.pop();
                }
                Op::Constant => {
                    let index = self.next_byte() as usize;
                    let constant = self.chunk.constants[index];
                    self.push(constant)?;
                }
                Op::ConstantLong => {
                    let index =
                        ((self.next_byte() as usize) << 8) + self.next_byte() as usize;
                    let constant = self.chunk.constants[index];
                    self.push(constant)?;
                }
                Op::Nil => self.push(Value::Nil)?,
                Op::True => self.push(Value::Bool(true))?,
                Op::False => self.push(Value::Bool(false))?,
                Op::DefineGlobal => {
                    let name = self.read_global_name();
                    let value = self.pop();
                    self.globals.set(name, value);
                }
                Op::GetGlobal => {
                    let name = self.read_global_name();
                    match self.globals.get(name) {
                        Some(value) => self.push(value)?,
                        None => {
                            let message = format!("Undefined variable '{}'", name);
                            return Err(self.runtime_error(&message));
                        }
                    }
                }
                Op::SetGlobal => {
                    let name = self.read_global_name();
                    // Assignment is an expression: the value stays on the
                    // stack for the surrounding expression to consume.
                    let value = self.peek();
                    if self.globals.set(name, value) {
                        self.globals.delete(name);
                        let message = format!("Undefined variable '{}'", name);
                        return Err(self.runtime_error(&message));
                    }
                }
                Op::Negate => {
                    let operand = self.pop();
                    match operand.as_number() {
                        Some(n) => self.push(Value::Number(-n))?,
                        None => return Err(self.runtime_error("Operand must be a number")),
                    }
                }
                Op::Not => {
                    let operand = self.pop();
                    self.push(Value::Bool(operand.is_falsy()))?;
                }
                Op::Equal => {
                    let b = self.pop();
                    let a = self.pop();
                    self.push(Value::Bool(a == b))?;
                }
                Op::Greater => binary_op!(self, >, Bool),
                Op::Less => binary_op!(self, <, Bool),
                Op::Add => {
                    let b = self.pop();
                    let a = self.pop();
                    match (a, b) {
                        (Value::Number(n1), Value::Number(n2)) => {
                            self.push(Value::Number(n1 + n2))?
                        }
                        (Value::Obj(Obj::String(s1)), Value::Obj(Obj::String(s2))) => {
                            let joined =
                                object::concatenate(self.heap, &mut self.strings, s1, s2);
                            self.push(Value::Obj(Obj::String(joined)))?;
                        }
                        _ => {
                            return Err(self
                                .runtime_error("Operands must be two numbers or two strings"))
                        }
                    }
                }
                Op::Subtract => binary_op!(self, -, Number),
                Op::Multiply => binary_op!(self, *, Number),
                Op::Divide => binary_op!(self, /, Number),
                // `and`/`or` are eager: both operands are evaluated and
                // popped before combining truthiness, and the result is
                // always a boolean.
                Op::And => {
                    let b = self.pop();
                    let a = self.pop();
                    self.push(Value::Bool(!a.is_falsy() && !b.is_falsy()))?;
                }
                Op::Or => {
                    let b = self.pop();
                    let a = self.pop();
                    self.push(Value::Bool(!a.is_falsy() || !b.is_falsy()))?;
                }
            }
        }
        Ok(())
    }

    fn push(&mut self, value: Value<'heap>) -> InterpretResult {
        if self.stack.len() == STACK_MAX {
            return Err(self.runtime_error("Stack overflow"));
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self) -> Value<'heap> {
        self.stack.pop().expect(STACK_UNDERFLOW)
    }

    fn peek(&self) -> Value<'heap> {
        *self.stack.last().expect(STACK_UNDERFLOW)
    }

    fn next_byte(&mut self) -> u8 {
        let byte = self.chunk.code[self.ip];
        self.ip += 1;
        byte
    }

    /// Reads a one-byte constant index holding a variable name. The
    /// compiler only ever emits string constants for global operands.
    fn read_global_name(&mut self) -> &'heap ObjString {
        let index = self.next_byte() as usize;
        match self.chunk.constants[index] {
            Value::Obj(Obj::String(name)) => name,
            _ => unreachable!("global operand must be a string constant"),
        }
    }

    fn runtime_error(&self, message: &str) -> InterpretError {
        let line = self.chunk.lines[self.ip.saturating_sub(1)];
        error::report(line, message);
        InterpretError::RuntimeError
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(source: &str) -> (InterpretResult, String) {
        let heap = Arena::new();
        let mut out = Vec::new();
        let result = {
            let mut vm = Vm::with_output(&heap, &mut out);
            vm.interpret(source)
        };
        (result, String::from_utf8(out).unwrap())
    }

    fn output(source: &str) -> String {
        let (result, out) = run(source);
        assert_eq!(result, Ok(()));
        out
    }

    #[test]
    fn arithmetic() {
        assert_eq!(output("print 1 + 2;"), "3\n");
        assert_eq!(output("print (1 + 2) * 3 - 4;"), "5\n");
        assert_eq!(output("print 10 / 4;"), "2.5\n");
        assert_eq!(output("print -(1 + 2);"), "-3\n");
    }

    #[test]
    fn comparison_and_equality() {
        assert_eq!(output("print !(1 == 2);"), "true\n");
        assert_eq!(output("print 1 < 2;"), "true\n");
        assert_eq!(output("print 2 <= 1;"), "false\n");
        assert_eq!(output("print nil == false;"), "false\n");
        assert_eq!(output("print \"a\" == \"a\";"), "true\n");
        assert_eq!(output("print \"a\" == \"b\";"), "false\n");
    }

    #[test]
    fn negated_comparisons_match_their_rewrites() {
        let pairs = [(1.0, 2.0), (2.0, 1.0), (2.0, 2.0), (-1.0, 0.5)];
        for (a, b) in &pairs {
            assert_eq!(
                output(&format!("print {} >= {};", a, b)),
                output(&format!("print !({} < {});", a, b))
            );
            assert_eq!(
                output(&format!("print {} != {};", a, b)),
                output(&format!("print !({} == {});", a, b))
            );
        }
    }

    #[test]
    fn string_concatenation() {
        assert_eq!(output("print \"a\" + \"b\";"), "ab\n");
        assert_eq!(output("print \"a\" + \"b\" == \"ab\";"), "true\n");
    }

    #[test]
    fn logical_operators_are_eager_and_boolean_valued() {
        assert_eq!(output("print true and false;"), "false\n");
        assert_eq!(output("print true and 1;"), "true\n");
        assert_eq!(output("print nil or 1;"), "true\n");
        assert_eq!(output("print nil or false;"), "false\n");
    }

    #[test]
    fn globals_define_read_and_assign() {
        assert_eq!(output("var a = 1; var b = 2; print a + b;"), "3\n");
        assert_eq!(output("var a; print a;"), "nil\n");
        assert_eq!(output("var a = 1; a = 5; print a;"), "5\n");
        assert_eq!(output("var a = 1; print a = 2;"), "2\n");
    }

    #[test]
    fn undefined_variables_are_runtime_errors() {
        assert_eq!(run("print missing;").0, Err(InterpretError::RuntimeError));
        assert_eq!(run("missing = 1;").0, Err(InterpretError::RuntimeError));
    }

    #[test]
    fn type_mismatches_are_runtime_errors() {
        let (result, out) = run("print 1 + \"a\";");
        assert_eq!(result, Err(InterpretError::RuntimeError));
        assert_eq!(out, "");
        assert_eq!(run("print -\"a\";").0, Err(InterpretError::RuntimeError));
        assert_eq!(run("print 1 < \"a\";").0, Err(InterpretError::RuntimeError));
    }

    #[test]
    fn compile_errors_do_not_execute() {
        let (result, out) = run("print \"abc;");
        assert_eq!(result, Err(InterpretError::CompileError));
        assert_eq!(out, "");
    }

    #[test]
    fn stack_overflow_is_detected() {
        let depth = STACK_MAX + 10;
        let mut source = String::from("print ");
        for _ in 0..depth {
            source.push_str("1+(");
        }
        source.push('1');
        for _ in 0..depth {
            source.push(')');
        }
        source.push(';');

        let (result, out) = run(&source);
        assert_eq!(result, Err(InterpretError::RuntimeError));
        assert_eq!(out, "");
    }

    #[test]
    fn the_vm_is_reusable_after_errors() {
        let heap = Arena::new();
        let mut out = Vec::new();
        {
            let mut vm = Vm::with_output(&heap, &mut out);
            assert_eq!(vm.interpret("print nope;"), Err(InterpretError::RuntimeError));
            assert_eq!(vm.interpret("print +;"), Err(InterpretError::CompileError));
            assert_eq!(vm.interpret("print 7;"), Ok(()));
        }
        assert_eq!(String::from_utf8(out).unwrap(), "7\n");
    }

    #[test]
    fn globals_persist_across_interpret_calls() {
        let heap = Arena::new();
        let mut out = Vec::new();
        {
            let mut vm = Vm::with_output(&heap, &mut out);
            vm.interpret("var total = 1;").unwrap();
            vm.interpret("total = total + 2;").unwrap();
            vm.interpret("print total;").unwrap();
        }
        assert_eq!(String::from_utf8(out).unwrap(), "3\n");
    }
}
