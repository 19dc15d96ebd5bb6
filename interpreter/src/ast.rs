use std::rc::Rc;

use preter_core::{Literal, Token};

use crate::error::Error;

// Tokens are cloned into the nodes during parsing. They are small and the tree is built once,
// so the nodes own them instead of borrowing from the token vector.

#[derive(Debug, PartialEq, Clone)]
pub(crate) enum Expr {
    Assign {
        name: Token,
        value: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        paren: Token,
        args: Vec<Expr>,
    },
    Grouping {
        expression: Box<Expr>,
    },
    Literal {
        value: Literal,
    },
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },
    Unary {
        operator: Token,
        right: Box<Expr>,
    },
    Variable {
        name: Token,
    },
}

pub(crate) trait ExprVisitor {
    type Item;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Item, Error> {
        match expr {
            Expr::Assign { name, value } => self.visit_assign(name, value),
            Expr::Binary {
                left,
                operator,
                right,
            } => self.visit_binary(left, operator, right),
            Expr::Call {
                callee,
                paren,
                args,
            } => self.visit_call(callee, paren, args),
            Expr::Grouping { expression } => self.visit_grouping(expression),
            Expr::Literal { value } => self.visit_literal(value),
            Expr::Logical {
                left,
                operator,
                right,
            } => self.visit_logical(left, operator, right),
            Expr::Unary { operator, right } => self.visit_unary(operator, right),
            Expr::Variable { name } => self.visit_variable(name),
        }
    }

    fn visit_assign(&mut self, name: &Token, value: &Expr) -> Result<Self::Item, Error>;
    fn visit_binary(
        &mut self,
        left: &Expr,
        operator: &Token,
        right: &Expr,
    ) -> Result<Self::Item, Error>;
    fn visit_call(
        &mut self,
        callee: &Expr,
        paren: &Token,
        args: &[Expr],
    ) -> Result<Self::Item, Error>;
    fn visit_grouping(&mut self, expression: &Expr) -> Result<Self::Item, Error>;
    fn visit_literal(&mut self, value: &Literal) -> Result<Self::Item, Error>;
    fn visit_logical(
        &mut self,
        left: &Expr,
        operator: &Token,
        right: &Expr,
    ) -> Result<Self::Item, Error>;
    fn visit_unary(&mut self, operator: &Token, right: &Expr) -> Result<Self::Item, Error>;
    fn visit_variable(&mut self, name: &Token) -> Result<Self::Item, Error>;
}

impl Expr {
    // Creator methods, these keep the parser and the tests free of `Box::new` noise.
    pub(crate) fn assign(name: Token, value: Expr) -> Self {
        Expr::Assign {
            name,
            value: Box::new(value),
        }
    }

    pub(crate) fn binary(left: Expr, operator: Token, right: Expr) -> Self {
        Expr::Binary {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        }
    }

    pub(crate) fn call(callee: Expr, paren: Token, args: Vec<Expr>) -> Self {
        Expr::Call {
            callee: Box::new(callee),
            paren,
            args,
        }
    }

    pub(crate) fn grouping(expression: Expr) -> Self {
        Expr::Grouping {
            expression: Box::new(expression),
        }
    }

    pub(crate) fn literal<T>(value: T) -> Self
    where
        Literal: From<T>,
    {
        Expr::Literal {
            value: Literal::from(value),
        }
    }

    pub(crate) fn nil() -> Self {
        Expr::Literal {
            value: Literal::Nil,
        }
    }

    pub(crate) fn logical(left: Expr, operator: Token, right: Expr) -> Self {
        Expr::Logical {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        }
    }

    pub(crate) fn unary(operator: Token, right: Expr) -> Self {
        Expr::Unary {
            operator,
            right: Box::new(right),
        }
    }

    pub(crate) fn variable(name: Token) -> Self {
        Expr::Variable { name }
    }
}

/// A function declaration. It is shared between the statement that declares it and every
/// callable created from it.
#[derive(Debug, PartialEq)]
pub(crate) struct FunctionDecl {
    pub(crate) name: Token,
    pub(crate) params: Vec<Token>,
    pub(crate) body: Vec<Stmt>,
}

#[derive(Debug, PartialEq, Clone)]
pub(crate) enum Stmt {
    Block {
        statements: Vec<Stmt>,
    },
    Expression {
        expression: Expr,
    },
    Function {
        declaration: Rc<FunctionDecl>,
    },
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
    },
    Print {
        keyword: Token,
        expression: Expr,
    },
    Var {
        name: Token,
        init: Option<Expr>,
    },
}

pub(crate) trait StmtVisitor {
    type Item;

    fn visit_stmt(&mut self, stmt: &Stmt) -> Result<Self::Item, Error> {
        match stmt {
            Stmt::Expression { expression } => self.visit_expression(expression),
            Stmt::Block { statements } => self.visit_block(statements),
            Stmt::Function { declaration } => self.visit_function(declaration),
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => self.visit_if(condition, then_branch, else_branch.as_deref()),
            Stmt::While { condition, body } => self.visit_while(condition, body),
            Stmt::Print {
                keyword,
                expression,
            } => self.visit_print(keyword, expression),
            Stmt::Var { name, init } => self.visit_var(name, init.as_ref()),
        }
    }

    fn visit_block(&mut self, statements: &[Stmt]) -> Result<Self::Item, Error>;
    fn visit_expression(&mut self, expression: &Expr) -> Result<Self::Item, Error>;
    fn visit_function(&mut self, declaration: &Rc<FunctionDecl>) -> Result<Self::Item, Error>;
    fn visit_if(
        &mut self,
        condition: &Expr,
        then_branch: &Stmt,
        else_branch: Option<&Stmt>,
    ) -> Result<Self::Item, Error>;
    fn visit_while(&mut self, condition: &Expr, body: &Stmt) -> Result<Self::Item, Error>;
    fn visit_print(&mut self, keyword: &Token, expression: &Expr) -> Result<Self::Item, Error>;
    fn visit_var(&mut self, name: &Token, init: Option<&Expr>) -> Result<Self::Item, Error>;
}

impl Stmt {
    pub(crate) fn block(statements: Vec<Stmt>) -> Self {
        Stmt::Block { statements }
    }

    pub(crate) fn expression(expression: Expr) -> Self {
        Stmt::Expression { expression }
    }

    pub(crate) fn function(name: Token, params: Vec<Token>, body: Vec<Stmt>) -> Self {
        Stmt::Function {
            declaration: Rc::new(FunctionDecl { name, params, body }),
        }
    }

    pub(crate) fn if_(condition: Expr, then_branch: Stmt, else_branch: Option<Stmt>) -> Self {
        Stmt::If {
            condition,
            then_branch: Box::new(then_branch),
            else_branch: else_branch.map(Box::new),
        }
    }

    pub(crate) fn while_(condition: Expr, body: Stmt) -> Self {
        Stmt::While {
            condition,
            body: Box::new(body),
        }
    }

    pub(crate) fn print(keyword: Token, expression: Expr) -> Self {
        Stmt::Print {
            keyword,
            expression,
        }
    }

    pub(crate) fn var(name: Token, init: Option<Expr>) -> Self {
        Stmt::Var { name, init }
    }
}
