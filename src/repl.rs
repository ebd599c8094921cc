use rustyline::error::ReadlineError;
use rustyline::Editor;
use typed_arena::Arena;

use crate::vm::Vm;

/// Read-eval-print loop. One VM lives for the whole session, so globals and
/// interned strings carry over between lines; a failed line leaves the VM
/// ready for the next one.
pub fn repl() {
    let heap = Arena::new();
    let mut vm = Vm::new(&heap);
    let mut editor = Editor::<()>::new();

    loop {
        match editor.readline("> ") {
            Ok(line) => {
                editor.add_history_entry(line.as_str());
                let _ = vm.interpret(&line);
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("Failed to read line: {}", err);
                break;
            }
        }
    }
}
