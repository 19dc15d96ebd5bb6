use std::fmt::{Debug, Formatter};
use std::rc::Rc;

use crate::ast::FunctionDecl;
use crate::env::Environment;
use crate::error::Error;
use crate::interpreter::Interpreter;
use crate::value::Value;

pub(crate) trait Callable {
    fn name(&self) -> &str;
    fn arity(&self) -> usize;

    // The interpreter checks the arity before calling, `args` always has `arity()` values.
    fn execute(
        self: Rc<Self>,
        interpreter: &mut Interpreter,
        args: &[Value],
    ) -> Result<Value, Error>;

    fn is_native(&self) -> bool {
        false
    }
}

impl Debug for dyn Callable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_native() {
            write!(f, "<native fn {}>", self.name())
        } else {
            write!(f, "<fn {}>", self.name())
        }
    }
}

pub(crate) type BoxedFunction = Box<dyn Fn(&[Value]) -> Result<Value, Error>>;

// `Native` bridges the native rust calls and the interpreter environment.
// All of these trait objects live in the global scope.
pub(crate) struct Native {
    func: BoxedFunction,
    name: String,
    arity: usize,
}

impl Native {
    pub(crate) fn new(func: BoxedFunction, name: &str, arity: usize) -> Self {
        Self {
            func,
            name: String::from(name),
            arity,
        }
    }
}

impl Callable for Native {
    fn name(&self) -> &str {
        &self.name
    }

    fn arity(&self) -> usize {
        self.arity
    }

    fn execute(self: Rc<Self>, _: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
        (self.func)(args)
    }

    fn is_native(&self) -> bool {
        true
    }
}

/// A user defined function. It does not capture the scope it was declared in: every call runs
/// in a fresh scope whose parent is the global scope, and the call always evaluates to `nil`.
#[derive(Debug)]
pub(crate) struct Function {
    declaration: Rc<FunctionDecl>,
}

impl Function {
    pub(crate) fn new(declaration: Rc<FunctionDecl>) -> Self {
        Function { declaration }
    }
}

impl Callable for Function {
    fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    fn execute(
        self: Rc<Self>,
        interpreter: &mut Interpreter,
        args: &[Value],
    ) -> Result<Value, Error> {
        let env = Environment::nested(interpreter.globals());
        for (param, arg) in self.declaration.params.iter().zip(args) {
            env.borrow_mut().define(&param.lexeme, arg.clone());
        }

        interpreter.execute_block_with_env(&self.declaration.body, env)?;
        Ok(Value::Nil)
    }
}
