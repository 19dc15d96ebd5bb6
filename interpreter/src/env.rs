use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use thiserror::Error;

use crate::value::Value;

pub(crate) type SharedEnv = Rc<RefCell<Environment>>;

/// One scope of variable bindings. Block and call scopes link to the scope they were opened
/// from; lookups and assignments walk that chain outwards, definitions never leave the scope.
#[derive(Debug, Default)]
pub(crate) struct Environment {
    enclosing: Option<SharedEnv>,
    values: HashMap<String, Value>,
}

#[derive(Debug, Error, PartialEq)]
#[error("Undefined variable '{0}'.")]
pub(crate) struct UndefinedVariable(pub(crate) String);

impl Environment {
    /// The outermost scope, holding the natives and every top level declaration.
    pub(crate) fn global() -> SharedEnv {
        Rc::new(RefCell::new(Environment::default()))
    }

    /// A fresh scope for a block body or a call, nested in `enclosing`.
    pub(crate) fn nested(enclosing: &SharedEnv) -> SharedEnv {
        Rc::new(RefCell::new(Environment {
            enclosing: Some(Rc::clone(enclosing)),
            values: HashMap::new(),
        }))
    }

    // Redefining a name in the same scope replaces the old binding
    pub(crate) fn define(&mut self, name: &str, value: Value) {
        self.values.insert(String::from(name), value);
    }

    pub(crate) fn get(&self, name: &str) -> Result<Value, UndefinedVariable> {
        match (self.values.get(name), &self.enclosing) {
            (Some(value), _) => Ok(value.clone()),
            (None, Some(enclosing)) => enclosing.borrow().get(name),
            (None, None) => Err(UndefinedVariable(String::from(name))),
        }
    }

    pub(crate) fn assign(&mut self, name: &str, value: Value) -> Result<(), UndefinedVariable> {
        if let Some(slot) = self.values.get_mut(name) {
            *slot = value;
            return Ok(());
        }

        match &self.enclosing {
            Some(enclosing) => enclosing.borrow_mut().assign(name, value),
            None => Err(UndefinedVariable(String::from(name))),
        }
    }
}
