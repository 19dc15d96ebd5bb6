use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use crate::error::Error;
use crate::token::{Token, Type};

/// Collects every error raised while running one program (or one prompt line) and writes it
/// out as a single diagnostic line. Lexical and syntax errors set `had_error`, runtime errors
/// set `had_runtime_error`. Both flags stay set until `reset` is called.
pub struct Reporter {
    stderr: Rc<RefCell<dyn Write>>,
    had_error: bool,
    had_runtime_error: bool,
}

impl Reporter {
    pub fn new(stderr: Rc<RefCell<dyn Write>>) -> Self {
        Reporter {
            stderr,
            had_error: false,
            had_runtime_error: false,
        }
    }

    /// Reporter writing to the process' standard error.
    pub fn stderr() -> Self {
        Reporter::new(Rc::new(RefCell::new(io::stderr())))
    }

    pub fn had_error(&self) -> bool {
        self.had_error
    }

    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    pub fn reset(&mut self) {
        self.had_error = false;
        self.had_runtime_error = false;
    }

    pub fn scan_error(&mut self, err: &Error) {
        self.error(err.line(), &err.to_string());
    }

    pub fn error(&mut self, line: usize, msg: &str) {
        self.report(line, "", msg);
    }

    pub fn token_error(&mut self, token: &Token, msg: &str) {
        if token.ty == Type::Eof {
            self.report(token.line, " at end ", msg);
        } else {
            self.report(token.line, &format!(" at {} ", token.lexeme), msg);
        }
    }

    pub fn runtime_error(&mut self, line: usize, msg: &str) {
        tracing::debug!(line, msg, "runtime error");
        self.write(format_args!("{}\n[line {}]", msg, line));
        self.had_runtime_error = true;
    }

    fn report(&mut self, line: usize, location: &str, msg: &str) {
        tracing::debug!(line, msg, "compile error");
        self.write(format_args!("[{}] Error{}: {}", line, location, msg));
        self.had_error = true;
    }

    // A diagnostic that cannot be written has nowhere else to go, the flags still record it.
    fn write(&mut self, args: std::fmt::Arguments) {
        if let Err(err) = writeln!(self.stderr.borrow_mut(), "{}", args) {
            tracing::warn!(%err, "failed to write diagnostic");
        }
    }
}
