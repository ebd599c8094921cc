use crate::value::Value;

/// A compiled unit of byte-code: instruction bytes, a parallel per-byte
/// source-line table, and a constant pool. `code` and `lines` are always
/// written together and have identical lengths.
pub struct Chunk<'heap> {
    pub code: Vec<u8>,
    pub lines: Vec<usize>,
    pub constants: Vec<Value<'heap>>,
}

impl<'heap> Chunk<'heap> {
    pub fn new() -> Self {
        Chunk {
            code: Vec::with_capacity(8),
            lines: Vec::with_capacity(8),
            constants: Vec::with_capacity(8),
        }
    }

    pub fn write(&mut self, byte: u8, line: usize) {
        self.code.push(byte);
        self.lines.push(line);
    }

    /// Appends to the constant pool; identical values are stored again
    /// rather than deduplicated (string interning at the value layer is what
    /// keeps string constants unique).
    pub fn add_constant(&mut self, value: Value<'heap>) -> usize {
        self.constants.push(value);
        self.constants.len() - 1
    }

    /// Rewinds the instruction stream while keeping its allocation and the
    /// constant pool, so repeated REPL evaluations reuse storage and earlier
    /// constant indices stay valid.
    pub fn reset(&mut self) {
        self.code.clear();
        self.lines.clear();
    }
}

impl Default for Chunk<'_> {
    fn default() -> Self {
        Self::new()
    }
}
