use std::convert::TryFrom;
use std::fmt::Write;

use crate::chunk::Chunk;
use crate::opcodes::Op;

/// Renders a whole chunk, one instruction per line. Purely a view: the chunk
/// is not modified and nothing is printed here.
pub fn disassemble(chunk: &Chunk<'_>, name: &str) -> String {
    let mut text = format!("== {} ==\n", name);
    let mut offset = 0;
    while offset < chunk.code.len() {
        let (line, next) = disassemble_instruction(chunk, offset);
        text.push_str(&line);
        text.push('\n');
        offset = next;
    }
    text
}

/// Decodes the instruction at `offset` and returns its rendering plus the
/// offset of the next instruction. Repeated line numbers on consecutive
/// instructions are shown as a `|` continuation marker.
pub fn disassemble_instruction(chunk: &Chunk<'_>, offset: usize) -> (String, usize) {
    let mut text = format!("{:04} ", offset);
    if offset > 0 && chunk.lines[offset] == chunk.lines[offset - 1] {
        text.push_str("   | ");
    } else {
        let _ = write!(text, "{:4} ", chunk.lines[offset]);
    }

    let op = match Op::try_from(chunk.code[offset]) {
        Ok(op) => op,
        Err(()) => {
            let _ = write!(text, "Unknown opcode {}", chunk.code[offset]);
            return (text, offset + 1);
        }
    };

    match op {
        Op::Constant | Op::DefineGlobal | Op::GetGlobal | Op::SetGlobal => {
            let index = chunk.code[offset + 1] as usize;
            let _ = write!(
                text,
                "{:<16} {:4} '{}'",
                mnemonic(op),
                index,
                chunk.constants[index]
            );
            (text, offset + 2)
        }
        Op::ConstantLong => {
            let index =
                ((chunk.code[offset + 1] as usize) << 8) + chunk.code[offset + 2] as usize;
            let _ = write!(
                text,
                "{:<16} {:4} '{}'",
                mnemonic(op),
                index,
                chunk.constants[index]
            );
            (text, offset + 3)
        }
        _ => {
            let _ = write!(text, "{:<16}", mnemonic(op));
            (text, offset + 1)
        }
    }
}

fn mnemonic(op: Op) -> &'static str {
    match op {
        Op::Return => "OP_RETURN",
        Op::Constant => "OP_CONSTANT",
        Op::ConstantLong => "OP_CONSTANT_LONG",
        Op::Nil => "OP_NIL",
        Op::True => "OP_TRUE",
        Op::False => "OP_FALSE",
        Op::Pop => "OP_POP",
        Op::DefineGlobal => "OP_DEFINE_GLOBAL",
        Op::GetGlobal => "OP_GET_GLOBAL",
        Op::SetGlobal => "OP_SET_GLOBAL",
        Op::Equal => "OP_EQUAL",
        Op::Greater => "OP_GREATER",
        Op::Less => "OP_LESS",
        Op::Add => "OP_ADD",
        Op::Subtract => "OP_SUBTRACT",
        Op::Multiply => "OP_MULTIPLY",
        Op::Divide => "OP_DIVIDE",
        Op::Not => "OP_NOT",
        Op::Negate => "OP_NEGATE",
        Op::And => "OP_AND",
        Op::Or => "OP_OR",
        Op::Print => "OP_PRINT",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn decodes_constant_operands_and_values() {
        let mut chunk = Chunk::new();
        let index = chunk.add_constant(Value::Number(1.5));
        chunk.write(Op::Constant.u8(), 0);
        chunk.write(index as u8, 0);
        chunk.write(Op::Return.u8(), 0);

        let listing = disassemble(&chunk, "test");
        assert!(listing.contains("== test =="));
        assert!(listing.contains("OP_CONSTANT"));
        assert!(listing.contains("'1.5'"));
        assert!(listing.contains("OP_RETURN"));
    }

    #[test]
    fn decodes_two_byte_big_endian_operands() {
        let mut chunk = Chunk::new();
        for i in 0..300 {
            chunk.add_constant(Value::Number(i as f64));
        }
        chunk.write(Op::ConstantLong.u8(), 0);
        chunk.write(1, 0); // 256 + 43 = 299
        chunk.write(43, 0);

        let (text, next) = disassemble_instruction(&chunk, 0);
        assert!(text.contains("OP_CONSTANT_LONG"));
        assert!(text.contains("299"));
        assert_eq!(next, 3);
    }

    #[test]
    fn repeated_lines_use_a_continuation_marker() {
        let mut chunk = Chunk::new();
        chunk.write(Op::Nil.u8(), 0);
        chunk.write(Op::Nil.u8(), 0);
        chunk.write(Op::Nil.u8(), 1);

        let (first, _) = disassemble_instruction(&chunk, 0);
        let (second, _) = disassemble_instruction(&chunk, 1);
        let (third, _) = disassemble_instruction(&chunk, 2);
        assert!(first.starts_with("0000    0"));
        assert!(second.starts_with("0001    |"));
        assert!(third.starts_with("0002    1"));
    }

    #[test]
    fn decodes_every_defined_opcode() {
        let simple = [
            Op::Return,
            Op::Nil,
            Op::True,
            Op::False,
            Op::Pop,
            Op::Equal,
            Op::Greater,
            Op::Less,
            Op::Add,
            Op::Subtract,
            Op::Multiply,
            Op::Divide,
            Op::Not,
            Op::Negate,
            Op::And,
            Op::Or,
            Op::Print,
        ];
        let mut chunk = Chunk::new();
        for op in &simple {
            chunk.write(op.u8(), 0);
        }
        let mut offset = 0;
        for op in &simple {
            let (text, next) = disassemble_instruction(&chunk, offset);
            assert!(text.contains(mnemonic(*op)), "missing {:?}", op);
            offset = next;
        }
    }
}
