use std::env;
use std::io;
use std::path::Path;
use std::process::ExitCode;

use rustyline::DefaultEditor;

use preter::{init_tracing, PlainLines, Runner, EX_IOERR, EX_USAGE};

fn main() -> ExitCode {
    init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    match args.as_slice() {
        [] => prompt(),
        [path] => ExitCode::from(Runner::stdio().run_file(Path::new(path))),
        _ => {
            eprintln!("Usage: preter [script]");
            ExitCode::from(EX_USAGE)
        }
    }
}

fn prompt() -> ExitCode {
    let mut runner = Runner::stdio();
    let res = match DefaultEditor::new() {
        Ok(mut editor) => runner.run_prompt(&mut editor),
        Err(err) => {
            tracing::warn!(%err, "line editing unavailable, reading plain lines");
            let mut lines = PlainLines::new(io::stdin().lock(), runner.stdout());
            runner.run_prompt(&mut lines)
        }
    };

    match res {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Could not read input: {}", err);
            ExitCode::from(EX_IOERR)
        }
    }
}
