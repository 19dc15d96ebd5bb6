use std::fmt::{Display, Formatter};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Comma,
    Dot,
    Minus,
    Plus,
    SemiColon,
    Slash,
    Star,

    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,

    Identifier,
    String,
    Number,

    And,
    Class,
    Else,
    False,
    For,
    Fun,
    If,
    Nil,
    Or,
    Print,
    Return,
    Super,
    This,
    True,
    Var,
    While,

    Eof,
}

impl Type {
    /// Keywords that start a declaration or statement. The parser uses these as recovery
    /// points after a syntax error.
    pub fn starts_statement(self) -> bool {
        matches!(
            self,
            Type::Class
                | Type::Fun
                | Type::Var
                | Type::For
                | Type::If
                | Type::While
                | Type::Print
                | Type::Return
        )
    }
}

/// Compile-time constant value. Tokens only carry `Str` and `Num`; `Bool` and `Nil` exist so
/// the parser can build literal expressions for `true`, `false` and `nil` from the same type.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Num(f64),
    Bool(bool),
    Nil,
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::Str(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::Str(String::from(value))
    }
}

macro_rules! impl_from_num_for_literal {
    ( $( $t:ident )* ) => {
        $(
            impl From<$t> for Literal {
                fn from(n: $t) -> Literal {
                    Literal::Num(n as f64)
                }
            }
        )*
    }
}

impl_from_num_for_literal!(u8 i8 u16 i16 u32 i32 u64 i64 usize isize f32 f64);

impl Display for Literal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Str(val) => write!(f, "{}", val),
            Literal::Num(val) => write!(f, "{}", val),
            Literal::Bool(val) => write!(f, "{}", val),
            Literal::Nil => write!(f, "nil"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub ty: Type,
    pub lexeme: String,
    pub literal: Option<Literal>,
    pub line: usize,
}

impl Token {
    pub fn new(ty: Type, lexeme: String, literal: Option<Literal>, line: usize) -> Self {
        Token {
            ty,
            lexeme,
            literal,
            line,
        }
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.literal {
            Some(literal) => write!(
                f,
                "{:?} {} {} [line {}]",
                self.ty, self.lexeme, literal, self.line
            ),
            None => write!(f, "{:?} {} [line {}]", self.ty, self.lexeme, self.line),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::token::{Literal, Token, Type};

    #[test]
    fn test_display() {
        let number = Token::new(Type::Number, String::from("1.5"), Some(Literal::Num(1.5)), 3);
        let plus = Token::new(Type::Plus, String::from("+"), None, 1);

        assert_eq!(number.to_string(), "Number 1.5 1.5 [line 3]");
        assert_eq!(plus.to_string(), "Plus + [line 1]");
    }

    #[test]
    fn test_statement_starters() {
        assert!(Type::Var.starts_statement());
        assert!(Type::Return.starts_statement());
        assert!(!Type::Identifier.starts_statement());
        assert!(!Type::SemiColon.starts_statement());
    }
}
