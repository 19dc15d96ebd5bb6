use std::cell::RefCell;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::rc::Rc;

use preter_core::{Reporter, Scanner};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::interpreter::Interpreter;
use crate::parser::Parser;
#[cfg(feature = "debug-print-ast")]
use crate::printer::AstPrinter;

// Exit codes, following sysexits(3)
pub const EX_OK: u8 = 0;
pub const EX_USAGE: u8 = 64;
pub const EX_DATAERR: u8 = 65;
pub const EX_NOINPUT: u8 = 66;
pub const EX_SOFTWARE: u8 = 70;
pub const EX_IOERR: u8 = 74;

/// Drives the whole pipeline for a script or an interactive session. The interpreter, and with
/// it the global scope, lives as long as the runner, so prompt lines can build on each other.
pub struct Runner {
    interpreter: Interpreter,
    reporter: Reporter,
    stdout: Rc<RefCell<dyn Write>>,
    stderr: Rc<RefCell<dyn Write>>,
}

impl Runner {
    pub fn new(stdout: Rc<RefCell<dyn Write>>, stderr: Rc<RefCell<dyn Write>>) -> Self {
        Runner {
            interpreter: Interpreter::new(stdout.clone()),
            reporter: Reporter::new(stderr.clone()),
            stdout,
            stderr,
        }
    }

    pub fn stdio() -> Self {
        Runner::new(
            Rc::new(RefCell::new(io::stdout())),
            Rc::new(RefCell::new(io::stderr())),
        )
    }

    /// Scans, parses and runs one program. Nothing is executed if scanning or parsing reported
    /// an error.
    #[tracing::instrument(level = "debug", skip_all, fields(len = src.len()))]
    pub fn run(&mut self, src: &str) {
        let tokens = Scanner::new(src, &mut self.reporter).scan_tokens();
        let program = Parser::new(&tokens, &mut self.reporter).parse();

        if self.reporter.had_error() {
            tracing::debug!("skipping execution after syntax errors");
            return;
        }

        #[cfg(feature = "debug-print-ast")]
        {
            let tree = AstPrinter.print(&program);
            if let Err(err) = writeln!(self.stderr.borrow_mut(), "{}", tree) {
                tracing::warn!(%err, "failed to print syntax tree");
            }
        }

        self.interpreter.interpret(&program, &mut self.reporter);
    }

    /// Where program output goes, shared with the interpreter.
    pub fn stdout(&self) -> Rc<RefCell<dyn Write>> {
        Rc::clone(&self.stdout)
    }

    pub fn had_error(&self) -> bool {
        self.reporter.had_error()
    }

    pub fn had_runtime_error(&self) -> bool {
        self.reporter.had_runtime_error()
    }

    /// Exit code for everything run so far: syntax errors take precedence over runtime errors.
    pub fn status(&self) -> u8 {
        if self.reporter.had_error() {
            EX_DATAERR
        } else if self.reporter.had_runtime_error() {
            EX_SOFTWARE
        } else {
            EX_OK
        }
    }

    pub fn run_file(&mut self, path: &Path) -> u8 {
        match fs::read_to_string(path) {
            Ok(src) => {
                self.run(&src);
                self.status()
            }
            Err(err) => {
                if let Err(write_err) = writeln!(
                    self.stderr.borrow_mut(),
                    "Could not read file '{}': {}",
                    path.display(),
                    err
                ) {
                    tracing::warn!(err = %write_err, "failed to report unreadable file");
                }
                EX_NOINPUT
            }
        }
    }

    /// Reads one line at a time and runs it as a complete program until the input ends or the
    /// user interrupts the session. Errors are reported and forgotten, they never end it.
    pub fn run_prompt(&mut self, editor: &mut dyn LineEditor) -> io::Result<()> {
        loop {
            match editor.read_line(PROMPT)? {
                Prompted::Line(line) => {
                    self.run(&line);
                    self.reporter.reset();
                }
                Prompted::Interrupted => {
                    tracing::debug!("interrupted, leaving prompt");
                    writeln!(self.stdout.borrow_mut(), "Interrupted.")?;
                    return Ok(());
                }
                Prompted::Eof => {
                    tracing::debug!("end of input, leaving prompt");
                    return Ok(());
                }
            }
        }
    }
}

const PROMPT: &str = "> ";

/// What the prompt got back from one read.
#[derive(Debug, PartialEq)]
pub enum Prompted {
    Line(String),
    Interrupted,
    Eof,
}

/// Source of prompt lines. The terminal uses rustyline, which also turns Ctrl-C into
/// `Prompted::Interrupted`; `PlainLines` covers piped input and tests.
pub trait LineEditor {
    fn read_line(&mut self, prompt: &str) -> io::Result<Prompted>;
}

impl LineEditor for DefaultEditor {
    fn read_line(&mut self, prompt: &str) -> io::Result<Prompted> {
        match self.readline(prompt) {
            Ok(line) => {
                if let Err(err) = self.add_history_entry(line.as_str()) {
                    tracing::warn!(%err, "failed to record history");
                }
                Ok(Prompted::Line(line))
            }
            Err(ReadlineError::Interrupted) => Ok(Prompted::Interrupted),
            Err(ReadlineError::Eof) => Ok(Prompted::Eof),
            Err(ReadlineError::Io(err)) => Err(err),
            Err(err) => Err(io::Error::new(io::ErrorKind::Other, err.to_string())),
        }
    }
}

/// Line editor over any buffered reader, writing the prompt to `output` itself.
pub struct PlainLines<R> {
    input: R,
    output: Rc<RefCell<dyn Write>>,
}

impl<R: BufRead> PlainLines<R> {
    pub fn new(input: R, output: Rc<RefCell<dyn Write>>) -> Self {
        PlainLines { input, output }
    }
}

impl<R: BufRead> LineEditor for PlainLines<R> {
    fn read_line(&mut self, prompt: &str) -> io::Result<Prompted> {
        {
            let mut output = self.output.borrow_mut();
            write!(output, "{}", prompt)?;
            output.flush()?;
        }

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            Ok(Prompted::Eof)
        } else {
            Ok(Prompted::Line(line))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::io::{self, Cursor};
    use std::path::Path;
    use std::rc::Rc;
    use std::str;

    use crate::runner::{
        LineEditor, PlainLines, Prompted, Runner, EX_DATAERR, EX_NOINPUT, EX_OK, EX_SOFTWARE,
    };

    // Replays a fixed sequence of reads, then reports end of input.
    struct Scripted(VecDeque<Prompted>);

    impl LineEditor for Scripted {
        fn read_line(&mut self, _: &str) -> io::Result<Prompted> {
            Ok(self.0.pop_front().unwrap_or(Prompted::Eof))
        }
    }

    fn runner() -> (Runner, Rc<RefCell<Vec<u8>>>, Rc<RefCell<Vec<u8>>>) {
        let stdout: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
        let stderr: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
        (Runner::new(stdout.clone(), stderr.clone()), stdout, stderr)
    }

    fn text(buffer: &Rc<RefCell<Vec<u8>>>) -> String {
        String::from(str::from_utf8(&buffer.borrow()).unwrap())
    }

    #[test]
    fn test_status_codes() {
        let tests = [
            ("print 1;", EX_OK),
            ("print 1", EX_DATAERR),
            ("print \"open;", EX_DATAERR),
            ("print 1 / 0;", EX_SOFTWARE),
        ];

        for (src, expected) in tests {
            let (mut runner, _, _) = runner();
            runner.run(src);
            assert_eq!(runner.status(), expected, "source: {}", src);
        }
    }

    #[test]
    fn test_syntax_error_skips_execution() {
        let (mut runner, stdout, stderr) = runner();
        runner.run("print 1;\nprint 2");

        assert!(runner.had_error());
        assert!(!runner.had_runtime_error());
        assert_eq!(text(&stdout), "");
        assert_eq!(text(&stderr), "[2] Error at end : Expect ';' after value.\n");
    }

    #[test]
    fn test_missing_file() {
        let (mut runner, _, stderr) = runner();
        let status = runner.run_file(Path::new("does/not/exist.lox"));

        assert_eq!(status, EX_NOINPUT);
        assert!(text(&stderr).starts_with("Could not read file 'does/not/exist.lox'"));
    }

    #[test]
    fn test_prompt_keeps_going_after_errors() {
        let (mut runner, stdout, stderr) = runner();
        let input = Cursor::new("var a = 1;\nprint a +;\nprint a + nil;\nprint a;\n");
        runner
            .run_prompt(&mut PlainLines::new(input, runner.stdout()))
            .unwrap();

        assert_eq!(text(&stdout), "> > > > 1\n> ");
        assert_eq!(
            text(&stderr),
            "[1] Error at ; : Expect expression.\n\
             Operands must be both numbers or both strings.\n[line 1]\n"
        );
        assert_eq!(runner.status(), EX_OK);
    }

    struct Broken;

    impl io::Write for Broken {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_missing_file_with_closed_stderr() {
        let stdout: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
        let mut runner = Runner::new(stdout, Rc::new(RefCell::new(Broken)));

        assert_eq!(runner.run_file(Path::new("does/not/exist.lox")), EX_NOINPUT);
    }

    #[test]
    fn test_interrupt_ends_prompt() {
        let (mut runner, stdout, stderr) = runner();
        let mut editor = Scripted(VecDeque::from([
            Prompted::Line(String::from("print 1;")),
            Prompted::Interrupted,
            Prompted::Line(String::from("print 2;")),
        ]));
        runner.run_prompt(&mut editor).unwrap();

        assert_eq!(text(&stdout), "1\nInterrupted.\n");
        assert_eq!(text(&stderr), "");
        assert_eq!(editor.0.len(), 1);
        assert_eq!(runner.status(), EX_OK);
    }

    #[test]
    fn test_eof_ends_prompt_quietly() {
        let (mut runner, stdout, _) = runner();
        runner
            .run_prompt(&mut PlainLines::new(Cursor::new(""), runner.stdout()))
            .unwrap();

        assert_eq!(text(&stdout), "> ");
    }

    #[test]
    fn test_deep_recursion_reports_stack_overflow() {
        let status = std::thread::Builder::new()
            .stack_size(8 * 1024 * 1024)
            .spawn(|| {
                let (mut runner, _, stderr) = runner();
                let nested = 40;
                runner.run(&format!(
                    "fun f() {{ {} f(); {} }} f();",
                    "{".repeat(nested),
                    "}".repeat(nested)
                ));
                (runner.status(), text(&stderr))
            })
            .unwrap()
            .join()
            .unwrap();

        assert_eq!(status, (EX_SOFTWARE, String::from("Stack overflow.\n[line 1]\n")));
    }
}
