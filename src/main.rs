use std::fs;
use std::process;

use clap::{App, Arg, ErrorKind};

fn main() {
    let result = App::new("smolox")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A byte-code compiler and virtual machine for a small scripting language")
        .arg(
            Arg::with_name("script")
                .help("Path to a script file; omit it for an interactive session")
                .index(1),
        )
        .get_matches_safe();

    let matches = match result {
        Ok(matches) => matches,
        Err(err)
            if err.kind == ErrorKind::HelpDisplayed || err.kind == ErrorKind::VersionDisplayed =>
        {
            println!("{}", err.message);
            process::exit(0);
        }
        Err(err) => {
            eprintln!("{}", err.message);
            process::exit(2);
        }
    };

    match matches.value_of("script") {
        Some(path) => run_file(path),
        None => smolox::repl::repl(),
    }
}

fn run_file(path: &str) {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("Failed to open file {}: {}", path, err);
            process::exit(1);
        }
    };

    if smolox::run_source(&source).is_err() {
        process::exit(1);
    }
}
