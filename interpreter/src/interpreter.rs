use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;
use std::time::Instant;

use preter_core::{Literal, Reporter, Token, Type};

use crate::ast::{Expr, ExprVisitor, FunctionDecl, Stmt, StmtVisitor};
use crate::callable::{BoxedFunction, Function, Native};
use crate::env::{Environment, SharedEnv};
use crate::error::Error;
use crate::limits::MAX_EVAL_DEPTH;
use crate::parser::StmtStream;
use crate::value::Value;

pub struct Interpreter {
    globals: SharedEnv,
    env: SharedEnv,
    stdout: Rc<RefCell<dyn Write>>,

    // Statements and expressions currently being evaluated, across all active calls
    depth: usize,
}

impl Interpreter {
    pub fn new(stdout: Rc<RefCell<dyn Write>>) -> Self {
        let globals = Environment::global();

        let start = Instant::now();
        let clock: BoxedFunction =
            Box::new(move |_: &[Value]| Ok(Value::from(start.elapsed().as_secs_f64())));
        globals.borrow_mut().define(
            "clock",
            Value::Callable(Rc::new(Native::new(clock, "clock", 0))),
        );

        Interpreter {
            env: globals.clone(),
            globals,
            stdout,
            depth: 0,
        }
    }

    /// Runs the statements in order. The first runtime error is written to the reporter and
    /// the remaining statements are skipped; bindings made before the error are kept.
    pub fn interpret(&mut self, program: &StmtStream, reporter: &mut Reporter) {
        for stmt in &program.0 {
            if let Err(err) = self.execute(stmt) {
                match err {
                    Error::RuntimeError { line, msg, .. } => reporter.runtime_error(line, &msg),
                    Error::ParserError { token, msg, .. } => reporter.token_error(&token, &msg),
                }
                return;
            }
        }
    }

    pub(crate) fn globals(&self) -> &SharedEnv {
        &self.globals
    }

    // The previous scope is restored on every exit, including when a statement fails.
    pub(crate) fn execute_block_with_env(
        &mut self,
        stmts: &[Stmt],
        env: SharedEnv,
    ) -> Result<(), Error> {
        let previous = std::mem::replace(&mut self.env, env);
        let res = stmts.iter().try_for_each(|stmt| self.execute(stmt));
        self.env = previous;
        res
    }

    fn execute(&mut self, stmt: &Stmt) -> Result<(), Error> {
        self.depth += 1;
        let res = self.visit_stmt(stmt);
        self.depth -= 1;
        res
    }

    fn evaluate(&mut self, expr: &Expr) -> Result<Value, Error> {
        self.depth += 1;
        let res = self.visit_expr(expr);
        self.depth -= 1;
        res
    }
}

fn number_operands(operator: &Token, left: &Value, right: &Value) -> Result<(f64, f64), Error> {
    match (left, right) {
        (Value::Num(left), Value::Num(right)) => Ok((*left, *right)),
        _ => Err(Error::runtime_error(operator, "Operand must be a number.")),
    }
}

impl ExprVisitor for Interpreter {
    type Item = Value;

    fn visit_assign(&mut self, name: &Token, value: &Expr) -> Result<Value, Error> {
        let value = self.evaluate(value)?;

        self.env
            .borrow_mut()
            .assign(&name.lexeme, value.clone())
            .map_err(|err| Error::runtime_error(name, &err.to_string()))?;

        Ok(value)
    }

    fn visit_binary(
        &mut self,
        left: &Expr,
        operator: &Token,
        right: &Expr,
    ) -> Result<Value, Error> {
        let left = self.evaluate(left)?;
        let right = self.evaluate(right)?;

        match operator.ty {
            Type::Plus => match (left, right) {
                (Value::Str(left), Value::Str(right)) => {
                    Ok(Value::from(format!("{}{}", left, right)))
                }
                (Value::Num(left), Value::Num(right)) => Ok(Value::Num(left + right)),
                _ => Err(Error::runtime_error(
                    operator,
                    "Operands must be both numbers or both strings.",
                )),
            },
            Type::Minus => {
                let (left, right) = number_operands(operator, &left, &right)?;
                Ok(Value::Num(left - right))
            }
            Type::Star => {
                let (left, right) = number_operands(operator, &left, &right)?;
                Ok(Value::Num(left * right))
            }
            Type::Slash => {
                let (left, right) = number_operands(operator, &left, &right)?;
                if right == 0.0 {
                    Err(Error::runtime_error(operator, "Divide by zero."))
                } else {
                    Ok(Value::Num(left / right))
                }
            }
            Type::Greater => {
                let (left, right) = number_operands(operator, &left, &right)?;
                Ok(Value::Bool(left > right))
            }
            Type::GreaterEqual => {
                let (left, right) = number_operands(operator, &left, &right)?;
                Ok(Value::Bool(left >= right))
            }
            Type::Less => {
                let (left, right) = number_operands(operator, &left, &right)?;
                Ok(Value::Bool(left < right))
            }
            Type::LessEqual => {
                let (left, right) = number_operands(operator, &left, &right)?;
                Ok(Value::Bool(left <= right))
            }
            Type::EqualEqual => Ok(Value::Bool(left == right)),
            Type::BangEqual => Ok(Value::Bool(left != right)),
            _ => Err(Error::runtime_error(operator, "Invalid binary operator.")),
        }
    }

    fn visit_call(
        &mut self,
        callee: &Expr,
        paren: &Token,
        args: &[Expr],
    ) -> Result<Value, Error> {
        let callee = self.evaluate(callee)?;
        let mut evaluated_args = Vec::with_capacity(args.len());
        for arg in args {
            evaluated_args.push(self.evaluate(arg)?);
        }

        let func = match callee {
            Value::Callable(func) => func,
            _ => {
                return Err(Error::runtime_error(
                    paren,
                    "Can only call functions and classes.",
                ))
            }
        };

        if func.arity() != evaluated_args.len() {
            return Err(Error::runtime_error(
                paren,
                &format!(
                    "Expected {} but got {} arguments.",
                    func.arity(),
                    evaluated_args.len()
                ),
            ));
        }

        // Nesting between two calls is bounded by the parser, so checking here is enough to
        // keep the host stack within reach.
        if self.depth >= MAX_EVAL_DEPTH {
            return Err(Error::runtime_error(paren, "Stack overflow."));
        }

        tracing::trace!(name = func.name(), depth = self.depth, "call");
        func.execute(self, &evaluated_args)
    }

    fn visit_grouping(&mut self, expression: &Expr) -> Result<Value, Error> {
        self.evaluate(expression)
    }

    fn visit_literal(&mut self, value: &Literal) -> Result<Value, Error> {
        Ok(Value::from(value))
    }

    fn visit_logical(
        &mut self,
        left: &Expr,
        operator: &Token,
        right: &Expr,
    ) -> Result<Value, Error> {
        let left = self.evaluate(left)?;

        // The right side only runs when the left side doesn't already decide the result:
        // a truthy left for "or", a falsy left for "and". The deciding operand is returned as is.
        if operator.ty == Type::Or {
            if left.is_truthy() {
                return Ok(left);
            }
        } else if !left.is_truthy() {
            return Ok(left);
        }

        self.evaluate(right)
    }

    fn visit_unary(&mut self, operator: &Token, right: &Expr) -> Result<Value, Error> {
        let right = self.evaluate(right)?;
        match (operator.ty, right) {
            (Type::Minus, Value::Num(val)) => Ok(Value::Num(-val)),
            (Type::Minus, _) => Err(Error::runtime_error(operator, "Operand must be a number.")),
            (Type::Bang, val) => Ok(Value::Bool(!val.is_truthy())),
            _ => Err(Error::runtime_error(operator, "Invalid unary operator.")),
        }
    }

    fn visit_variable(&mut self, name: &Token) -> Result<Value, Error> {
        self.env
            .borrow()
            .get(&name.lexeme)
            .map_err(|err| Error::runtime_error(name, &err.to_string()))
    }
}

impl StmtVisitor for Interpreter {
    type Item = ();

    fn visit_block(&mut self, statements: &[Stmt]) -> Result<(), Error> {
        let env = Environment::nested(&self.env);
        self.execute_block_with_env(statements, env)
    }

    fn visit_expression(&mut self, expression: &Expr) -> Result<(), Error> {
        self.evaluate(expression)?;
        Ok(())
    }

    fn visit_function(&mut self, declaration: &Rc<FunctionDecl>) -> Result<(), Error> {
        let function = Function::new(Rc::clone(declaration));
        self.env
            .borrow_mut()
            .define(&declaration.name.lexeme, Value::Callable(Rc::new(function)));
        Ok(())
    }

    fn visit_if(
        &mut self,
        condition: &Expr,
        then_branch: &Stmt,
        else_branch: Option<&Stmt>,
    ) -> Result<(), Error> {
        if self.evaluate(condition)?.is_truthy() {
            self.execute(then_branch)
        } else if let Some(else_branch) = else_branch {
            self.execute(else_branch)
        } else {
            Ok(())
        }
    }

    fn visit_while(&mut self, condition: &Expr, body: &Stmt) -> Result<(), Error> {
        while self.evaluate(condition)?.is_truthy() {
            self.execute(body)?;
        }
        Ok(())
    }

    fn visit_print(&mut self, keyword: &Token, expression: &Expr) -> Result<(), Error> {
        let value = self.evaluate(expression)?;
        writeln!(self.stdout.borrow_mut(), "{}", value).map_err(|err| {
            Error::runtime_error(keyword, &format!("Failed to write output: {}.", err))
        })
    }

    fn visit_var(&mut self, name: &Token, init: Option<&Expr>) -> Result<(), Error> {
        let value = match init {
            Some(expr) => self.evaluate(expr)?,
            None => Value::Nil,
        };

        self.env.borrow_mut().define(&name.lexeme, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::str;

    use preter_core::{Reporter, Scanner};

    use crate::interpreter::Interpreter;
    use crate::parser::Parser;

    struct Session {
        interpreter: Interpreter,
        reporter: Reporter,
        stdout: Rc<RefCell<Vec<u8>>>,
        stderr: Rc<RefCell<Vec<u8>>>,
    }

    impl Session {
        fn new() -> Self {
            let stdout: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
            let stderr: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
            Session {
                interpreter: Interpreter::new(stdout.clone()),
                reporter: Reporter::new(stderr.clone()),
                stdout,
                stderr,
            }
        }

        fn run(&mut self, src: &str) {
            let tokens = Scanner::new(src, &mut self.reporter).scan_tokens();
            let stmts = Parser::new(&tokens, &mut self.reporter).parse();
            assert!(!self.reporter.had_error(), "syntax error in:\n{}", src);
            self.interpreter.interpret(&stmts, &mut self.reporter);
        }

        fn stdout(&self) -> String {
            String::from(str::from_utf8(&self.stdout.borrow()).unwrap())
        }

        fn stderr(&self) -> String {
            String::from(str::from_utf8(&self.stderr.borrow()).unwrap())
        }
    }

    fn test_statements(src: &str, out: &str, err: Option<&str>) {
        let mut session = Session::new();
        session.run(src);

        match err {
            Some(err) => {
                assert!(session.reporter.had_runtime_error(), "expected '{}'", err);
                assert_eq!(session.stderr(), format!("{}\n[line 1]\n", err));
            }
            None => assert_eq!(session.stderr(), "", "unexpected error in:\n{}", src),
        }

        assert_eq!(session.stdout(), out, "source:\n{}", src);
    }

    #[test]
    fn test_programs() {
        let tests = [
            // binary and grouping expressions, with precedence
            ("print (1 + 2) * 5 + 2;", "17\n"),
            ("print 1 + 2 * 3;", "7\n"),
            ("1 + 2 * 3;", ""),
            ("print 7 / 2;", "3.5\n"),
            ("print \"hello \" + \"world\";", "hello world\n"),
            ("print \"a\" + \"b\";", "ab\n"),
            // comparison and equality
            ("print 3 >= 3;", "true\n"),
            ("print 2 < 1;", "false\n"),
            ("print 1 == 1;", "true\n"),
            ("print 1 != 2;", "true\n"),
            ("print \"1\" == 1;", "false\n"),
            ("print nil == nil;", "true\n"),
            ("print nil == false;", "false\n"),
            // logical expressions return the deciding operand
            ("print false or true;", "true\n"),
            ("print nil or \"x\";", "x\n"),
            ("print false or nil;", "nil\n"),
            ("print 0 and 2;", "2\n"),
            ("print nil and 1;", "nil\n"),
            // unary expressions
            ("print !true;", "false\n"),
            ("print !nil;", "true\n"),
            ("print !0;", "false\n"),
            ("print -10.5;", "-10.5\n"),
            ("print --3;", "3\n"),
            // variables
            ("var foo = \"bar\"; print foo;", "bar\n"),
            ("var x; print x;", "nil\n"),
            ("var a = 1; var a = 2; print a;", "2\n"),
            ("var a = 1; print a = 3; print a;", "3\n3\n"),
            // scopes
            ("var x = 1; { var x = 2; print x; } print x;", "2\n1\n"),
            ("var a = 1; { a = 2; } print a;", "2\n"),
            ("var a = 1; { var b = a + 1; { print a + b; } }", "3\n"),
            // control flow
            ("while (false) print 1; print 2;", "2\n"),
            ("for (var i = 0; i < 3; i = i + 1) print i;", "0\n1\n2\n"),
            ("var i = 0; for (; i < 2;) i = i + 1; print i;", "2\n"),
            ("if (0) print \"zero\"; else print \"no\";", "zero\n"),
            ("if (nil) print 1; else if (false) print 2; else print 3;", "3\n"),
            ("if (false) print 1;", ""),
            // functions
            ("print clock;", "<native fn clock>\n"),
            ("print clock() >= 0;", "true\n"),
            ("fun f() {} print f;", "<fn f>\n"),
            ("fun f() {} print f == f;", "true\n"),
            ("fun f() { print 1; } print f();", "1\nnil\n"),
            (
                "fun greet(name) { print \"hi \" + name; } greet(\"bob\");",
                "hi bob\n",
            ),
            (
                "fun count(n) { if (n > 0) { print n; count(n - 1); } } count(3);",
                "3\n2\n1\n",
            ),
            // calls see the global scope, not the caller's scope
            (
                "var x = \"global\"; fun show() { print x; } { var x = \"local\"; show(); }",
                "global\n",
            ),
            (
                "var total = 0; fun add(n) { total = total + n; } add(2); add(3); print total;",
                "5\n",
            ),
        ];

        for (src, expected) in tests {
            test_statements(src, expected, None);
        }
    }

    #[test]
    fn test_binary_expression_with_wrong_types() {
        let tests = [
            ("print 1 + \"b\";", "Operands must be both numbers or both strings."),
            ("print true + false;", "Operands must be both numbers or both strings."),
            ("print nil + nil;", "Operands must be both numbers or both strings."),
            ("print 1 < \"a\";", "Operand must be a number."),
            ("print \"a\" * 2;", "Operand must be a number."),
            ("print nil - 1;", "Operand must be a number."),
        ];

        for (src, expected) in tests {
            test_statements(src, "", Some(expected));
        }
    }

    #[test]
    fn test_divide_by_zero() {
        test_statements("print 1 / 0;", "", Some("Divide by zero."));
        test_statements("print 0 / 0;", "", Some("Divide by zero."));
    }

    #[test]
    fn test_unary_expression_with_wrong_types() {
        test_statements("-false;", "", Some("Operand must be a number."));
        test_statements("print -\"a\";", "", Some("Operand must be a number."));
    }

    #[test]
    fn test_use_of_undefined_variable() {
        let tests = [
            ("var foo = \"bar\"; print bar;", "Undefined variable 'bar'."),
            ("bar = 1;", "Undefined variable 'bar'."),
            ("{ var inner = 1; } print inner;", "Undefined variable 'inner'."),
            ("nope();", "Undefined variable 'nope'."),
        ];

        for (src, expected) in tests {
            test_statements(src, "", Some(expected));
        }
    }

    #[test]
    fn test_calls_with_wrong_callee_or_arity() {
        let tests = [
            ("\"str\"();", "Can only call functions and classes."),
            ("var x = 1; x();", "Can only call functions and classes."),
            ("fun f(a) {} f(1, 2);", "Expected 1 but got 2 arguments."),
            ("fun f(a, b) {} f();", "Expected 2 but got 0 arguments."),
            ("clock(1);", "Expected 0 but got 1 arguments."),
        ];

        for (src, expected) in tests {
            test_statements(src, "", Some(expected));
        }
    }

    #[test]
    fn test_inner_function_does_not_see_caller_locals() {
        test_statements(
            "fun outer() { var secret = 1; fun inner() { print secret; } inner(); } outer();",
            "",
            Some("Undefined variable 'secret'."),
        );
    }

    #[test]
    fn test_runtime_error_aborts_remaining_statements() {
        test_statements(
            "print 1; print nil + 1; print 2;",
            "1\n",
            Some("Operands must be both numbers or both strings."),
        );
    }

    #[test]
    fn test_scope_is_restored_after_error() {
        let mut session = Session::new();
        session.run("var a = \"global\"; { var a = \"block\"; print a + 1; }");
        assert!(session.reporter.had_runtime_error());

        session.reporter.reset();
        session.run("print a;");
        assert!(!session.reporter.had_runtime_error());
        assert_eq!(session.stdout(), "global\n");
    }

    #[test]
    fn test_scope_is_restored_after_error_in_call() {
        let mut session = Session::new();
        session.run("var n = \"outer\"; fun boom(n) { print n; print n / 0; } boom(1);");
        session.run("print n;");

        assert_eq!(session.stdout(), "1\nouter\n");
    }

    // Runs `src` on a thread with the stack size of a default main thread.
    fn run_on_main_sized_stack(src: String) -> (bool, String) {
        std::thread::Builder::new()
            .stack_size(8 * 1024 * 1024)
            .spawn(move || {
                let mut session = Session::new();
                session.run(&src);
                (session.reporter.had_runtime_error(), session.stderr())
            })
            .unwrap()
            .join()
            .unwrap()
    }

    #[test]
    fn test_unbounded_recursion_is_an_error() {
        let (had_runtime_error, stderr) =
            run_on_main_sized_stack(String::from("fun f() { f(); } f();"));

        assert!(had_runtime_error);
        assert_eq!(stderr, "Stack overflow.\n[line 1]\n");
    }

    #[test]
    fn test_recursion_from_nested_blocks_is_an_error() {
        for blocks in [40, 100] {
            let src = format!(
                "fun f() {{ {} f(); {} }} f();",
                "{".repeat(blocks),
                "}".repeat(blocks)
            );
            let (had_runtime_error, stderr) = run_on_main_sized_stack(src);

            assert!(had_runtime_error, "nested {} blocks deep", blocks);
            assert_eq!(stderr, "Stack overflow.\n[line 1]\n");
        }
    }

    #[test]
    fn test_depth_is_released_after_calls() {
        // Sequential calls never accumulate depth, only nested ones do.
        test_statements(
            "var n = 0; fun tick() { n = n + 1; }\n\
             for (var i = 0; i < 2000; i = i + 1) tick(); print n;",
            "2000\n",
            None,
        );
    }
}
