use thiserror::Error;
use typed_arena::Arena;

use crate::chunk::Chunk;
use crate::object::ObjString;
use crate::parser::Parser;
use crate::table::Table;

#[derive(Debug, Error, Eq, PartialEq)]
#[error("compile error")]
pub struct CompileError;

pub type CompilationResult = Result<(), CompileError>;

/// Compiles `source` into `chunk`. String literals and identifier names are
/// interned through `strings` against the shared heap, so the byte-code's
/// constants stay valid for the lifetime of the VM that owns them.
pub fn compile<'heap>(
    source: &str,
    heap: &'heap Arena<ObjString>,
    chunk: &mut Chunk<'heap>,
    strings: &mut Table<'heap>,
) -> CompilationResult {
    let mut parser = Parser::new(source, heap, chunk, strings);
    if parser.parse() {
        Ok(())
    } else {
        Err(CompileError)
    }
}
