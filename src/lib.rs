use typed_arena::Arena;

use vm::{InterpretResult, Vm};

pub mod chunk;
pub mod compiler;
pub mod debug;
pub mod error;
pub mod object;
pub mod opcodes;
pub mod parser;
pub mod repl;
pub mod scanner;
pub mod table;
pub mod token;
pub mod value;
pub mod vm;

/// Compiles and runs a whole script in a fresh VM. All heap objects are
/// released when the arena goes out of scope.
pub fn run_source(source: &str) -> InterpretResult {
    let heap = Arena::new();
    let mut vm = Vm::new(&heap);
    vm.interpret(source)
}
