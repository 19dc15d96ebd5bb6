use std::fmt::{Debug, Display, Formatter};
use std::rc::Rc;

use preter_core::Literal;

use crate::callable::Callable;

#[derive(Debug, Clone)]
pub(crate) enum Value {
    Callable(Rc<dyn Callable>),
    Str(Rc<String>),
    Num(f64),
    Bool(bool),
    Nil,
}

impl Value {
    /// Only `nil` and `false` are falsy.
    pub(crate) fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }
}

impl From<&Literal> for Value {
    fn from(value: &Literal) -> Self {
        match value {
            Literal::Str(val) => Value::Str(Rc::new(val.clone())),
            Literal::Num(val) => Value::Num(*val),
            Literal::Bool(val) => Value::Bool(*val),
            Literal::Nil => Value::Nil,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Callable(lhs), Value::Callable(rhs)) => Rc::ptr_eq(lhs, rhs),
            (Value::Str(lhs), Value::Str(rhs)) => lhs == rhs,
            (Value::Num(lhs), Value::Num(rhs)) => lhs == rhs,
            (Value::Bool(lhs), Value::Bool(rhs)) => lhs == rhs,
            (Value::Nil, Value::Nil) => true,
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(Rc::new(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(Rc::new(String::from(value)))
    }
}

macro_rules! impl_from_num_for_value {
    ( $( $t:ident )* ) => {
        $(
            impl From<$t> for Value {
                fn from(n: $t) -> Value {
                    Value::Num(n as f64)
                }
            }
        )*
    }
}

impl_from_num_for_value!(u8 i8 u16 i16 u32 i32 u64 i64 usize isize f32 f64);

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Callable(val) => write!(f, "{:?}", val),
            Value::Str(val) => write!(f, "{}", val),
            Value::Num(val) => write!(f, "{}", val),
            Value::Bool(val) => write!(f, "{}", val),
            Value::Nil => write!(f, "nil"),
        }
    }
}
