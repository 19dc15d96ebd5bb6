use preter_core::{Literal, Reporter, Token, Type};

use crate::ast::{Expr, Stmt};
use crate::error::Error;
use crate::limits::{MAX_ARGS, MAX_NESTING};

/// Recursive descent parser. Every syntax error is written to the reporter; the parser then
/// skips ahead to the next statement boundary and carries on, so `parse` always hands back
/// whatever statements could be recovered.
pub struct Parser<'a> {
    tokens: &'a [Token],
    reporter: &'a mut Reporter,
    current: usize,

    // Current nesting of expressions and statements, bounded by `MAX_NESTING` so pathological
    // input can't exhaust the host stack.
    depth: usize,
}

// A wrapper over vector of statements to not leak Stmt to public
#[derive(Debug, PartialEq)]
pub struct StmtStream(pub(crate) Vec<Stmt>);

impl StmtStream {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// Helper alias for shorter return types
type BlockResult = Result<Vec<Stmt>, Error>;
type StmtResult = Result<Stmt, Error>;
type ExprResult = Result<Expr, Error>;

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token], reporter: &'a mut Reporter) -> Self {
        Parser {
            tokens,
            reporter,
            current: 0,
            depth: 0,
        }
    }

    pub fn parse(&mut self) -> StmtStream {
        let mut statements = Vec::new();

        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        tracing::debug!(count = statements.len(), "parsed statements");
        StmtStream(statements)
    }

    // Syntax errors stop here: the failed declaration is dropped and the parser resumes at the
    // next statement boundary.
    fn declaration(&mut self) -> Option<Stmt> {
        let res = if self.match_one(Type::Fun) {
            self.function()
        } else if self.match_one(Type::Var) {
            self.var_declaration()
        } else {
            self.statement()
        };

        match res {
            Ok(stmt) => Some(stmt),
            Err(err) => {
                self.report(&err);
                self.synchronize();
                None
            }
        }
    }

    fn function(&mut self) -> StmtResult {
        let name = self
            .consume(Type::Identifier, "Expect function name.")?
            .clone();
        self.consume(Type::LeftParen, "Expect '(' after function name.")?;

        let mut params = Vec::new();
        if !self.check(Type::RightParen) {
            loop {
                if params.len() >= MAX_ARGS {
                    let token = self.peek().clone();
                    self.error(&token, "Can't have more than 255 parameters.");
                }

                params.push(
                    self.consume(Type::Identifier, "Expect parameter name.")?
                        .clone(),
                );
                if !self.match_one(Type::Comma) {
                    break;
                }
            }
        }

        self.consume(Type::RightParen, "Expect ')' after parameters.")?;
        self.consume(Type::LeftBrace, "Expect '{' before function body.")?;

        let body = self.block()?;
        Ok(Stmt::function(name, params, body))
    }

    fn var_declaration(&mut self) -> StmtResult {
        let name = self
            .consume(Type::Identifier, "Expect variable name.")?
            .clone();
        let init = if self.match_one(Type::Equal) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(Type::SemiColon, "Expect ';' after variable declaration.")?;
        Ok(Stmt::var(name, init))
    }

    fn statement(&mut self) -> StmtResult {
        self.nested(Self::statement_kind)
    }

    fn statement_kind(&mut self) -> StmtResult {
        if self.match_one(Type::If) {
            self.if_statement()
        } else if self.match_one(Type::Print) {
            self.print_statement()
        } else if self.match_one(Type::While) {
            self.while_statement()
        } else if self.match_one(Type::For) {
            self.for_statement()
        } else if self.match_one(Type::LeftBrace) {
            Ok(Stmt::block(self.block()?))
        } else {
            self.expression_statement()
        }
    }

    fn block(&mut self) -> BlockResult {
        let mut stmts = Vec::new();
        while !self.check(Type::RightBrace) && !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                stmts.push(stmt);
            }
        }
        self.consume(Type::RightBrace, "Expect '}' after block.")?;
        Ok(stmts)
    }

    fn expression_statement(&mut self) -> StmtResult {
        let expr = self.expression()?;
        self.consume(Type::SemiColon, "Expect ';' after expression.")?;
        Ok(Stmt::expression(expr))
    }

    fn if_statement(&mut self) -> StmtResult {
        self.consume(Type::LeftParen, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(Type::RightParen, "Expect ')' after if condition.")?;

        // The else binds to the closest if since the inner statement is parsed first
        let then_branch = self.statement()?;
        let else_branch = if self.match_one(Type::Else) {
            Some(self.statement()?)
        } else {
            None
        };

        Ok(Stmt::if_(condition, then_branch, else_branch))
    }

    fn while_statement(&mut self) -> StmtResult {
        self.consume(Type::LeftParen, "Expect '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(Type::RightParen, "Expect ')' after while condition.")?;
        let body = self.statement()?;
        Ok(Stmt::while_(condition, body))
    }

    // `for` has no node of its own, it is rewritten into a while loop:
    //   { init; while (cond) { body; increment; } }
    fn for_statement(&mut self) -> StmtResult {
        self.consume(Type::LeftParen, "Expect '(' after 'for'.")?;

        let initializer = if self.match_one(Type::SemiColon) {
            None
        } else if self.match_one(Type::Var) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if !self.check(Type::SemiColon) {
            self.expression()?
        } else {
            Expr::literal(true)
        };
        self.consume(Type::SemiColon, "Expect ';' after loop condition.")?;

        let increment = if !self.check(Type::RightParen) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(Type::RightParen, "Expect ')' after for clauses.")?;

        let mut body = self.statement()?;
        if let Some(increment) = increment {
            body = Stmt::block(vec![body, Stmt::expression(increment)]);
        }

        let mut looped = Stmt::while_(condition, body);
        if let Some(initializer) = initializer {
            looped = Stmt::block(vec![initializer, looped]);
        }

        Ok(looped)
    }

    fn print_statement(&mut self) -> StmtResult {
        let keyword = self.previous().clone();
        let expr = self.expression()?;
        self.consume(Type::SemiColon, "Expect ';' after value.")?;
        Ok(Stmt::print(keyword, expr))
    }

    fn expression(&mut self) -> ExprResult {
        self.nested(Self::assignment)
    }

    fn assignment(&mut self) -> ExprResult {
        let expr = self.or_expression()?;
        if self.match_one(Type::Equal) {
            let equals = self.previous().clone();
            let value = self.assignment()?;

            match expr {
                Expr::Variable { name } => Ok(Expr::assign(name, value)),
                // Reported without unwinding, the parser is not confused about where it is
                _ => {
                    self.error(&equals, "Invalid assignment target.");
                    Ok(expr)
                }
            }
        } else {
            Ok(expr)
        }
    }

    fn or_expression(&mut self) -> ExprResult {
        let mut expr = self.and_expression()?;
        while self.match_one(Type::Or) {
            let operator = self.previous().clone();
            let right = self.and_expression()?;
            expr = Expr::logical(expr, operator, right);
        }
        Ok(expr)
    }

    fn and_expression(&mut self) -> ExprResult {
        let mut expr = self.equality()?;
        while self.match_one(Type::And) {
            let operator = self.previous().clone();
            let right = self.equality()?;
            expr = Expr::logical(expr, operator, right);
        }
        Ok(expr)
    }

    fn equality(&mut self) -> ExprResult {
        let mut expr = self.comparison()?;
        while self.match_either(&[Type::BangEqual, Type::EqualEqual]) {
            let operator = self.previous().clone();
            let right = self.comparison()?;
            expr = Expr::binary(expr, operator, right);
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> ExprResult {
        let mut expr = self.term()?;
        while self.match_either(&[
            Type::Greater,
            Type::GreaterEqual,
            Type::Less,
            Type::LessEqual,
        ]) {
            let operator = self.previous().clone();
            let right = self.term()?;
            expr = Expr::binary(expr, operator, right);
        }
        Ok(expr)
    }

    fn term(&mut self) -> ExprResult {
        let mut expr = self.factor()?;
        while self.match_either(&[Type::Plus, Type::Minus]) {
            let operator = self.previous().clone();
            let right = self.factor()?;
            expr = Expr::binary(expr, operator, right);
        }
        Ok(expr)
    }

    fn factor(&mut self) -> ExprResult {
        let mut expr = self.unary()?;
        while self.match_either(&[Type::Slash, Type::Star]) {
            let operator = self.previous().clone();
            let right = self.unary()?;
            expr = Expr::binary(expr, operator, right);
        }
        Ok(expr)
    }

    fn unary(&mut self) -> ExprResult {
        if self.match_either(&[Type::Bang, Type::Minus]) {
            let operator = self.previous().clone();
            let right = self.nested(Self::unary)?;
            Ok(Expr::unary(operator, right))
        } else {
            self.call()
        }
    }

    fn call(&mut self) -> ExprResult {
        let mut expr = self.primary()?;
        while self.match_one(Type::LeftParen) {
            expr = self.finish_call(expr)?;
        }
        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> ExprResult {
        let mut args: Vec<Expr> = Vec::new();
        if !self.check(Type::RightParen) {
            loop {
                if args.len() >= MAX_ARGS {
                    let token = self.peek().clone();
                    self.error(&token, "Can't have more than 255 arguments.");
                }

                args.push(self.expression()?);
                if !self.match_one(Type::Comma) {
                    break;
                }
            }
        }

        let paren = self
            .consume(Type::RightParen, "Expect ')' after arguments.")?
            .clone();
        Ok(Expr::call(callee, paren, args))
    }

    fn primary(&mut self) -> ExprResult {
        if self.match_one(Type::True) {
            Ok(Expr::literal(true))
        } else if self.match_one(Type::False) {
            Ok(Expr::literal(false))
        } else if self.match_one(Type::Nil) {
            Ok(Expr::nil())
        } else if self.match_either(&[Type::Number, Type::String]) {
            let value = self.previous().literal.clone().unwrap_or(Literal::Nil);
            Ok(Expr::Literal { value })
        } else if self.match_one(Type::LeftParen) {
            let expr = self.expression()?;
            self.consume(Type::RightParen, "Expect ')' after expression.")?;
            Ok(Expr::grouping(expr))
        } else if self.match_one(Type::Identifier) {
            Ok(Expr::variable(self.previous().clone()))
        } else {
            Err(Error::parser_error(self.peek(), "Expect expression."))
        }
    }

    fn nested<T>(&mut self, parse: fn(&mut Self) -> Result<T, Error>) -> Result<T, Error> {
        if self.depth >= MAX_NESTING {
            return Err(Error::parser_error(self.peek(), "Too much nesting."));
        }

        self.depth += 1;
        let res = parse(self);
        self.depth -= 1;
        res
    }

    fn error(&mut self, token: &Token, msg: &str) {
        self.reporter.token_error(token, msg);
    }

    fn report(&mut self, err: &Error) {
        match err {
            Error::ParserError { token, msg, .. } | Error::RuntimeError { token, msg, .. } => {
                self.reporter.token_error(token, msg)
            }
        }
    }

    // Discard tokens until just past a ';' or right before a keyword that starts a statement.
    fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous().ty == Type::SemiColon || self.peek().ty.starts_statement() {
                return;
            }

            self.advance();
        }
    }

    fn is_at_end(&self) -> bool {
        self.peek().ty == Type::Eof
    }

    fn check(&self, ty: Type) -> bool {
        if self.is_at_end() {
            false
        } else {
            self.peek().ty == ty
        }
    }

    fn consume(&mut self, ty: Type, msg: &str) -> Result<&Token, Error> {
        if self.check(ty) {
            Ok(self.advance())
        } else {
            Err(Error::parser_error(self.peek(), msg))
        }
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }

        self.previous()
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn match_either(&mut self, types: &[Type]) -> bool {
        for ty in types {
            if self.match_one(*ty) {
                // Already skipped in the `match_one`, just return result
                return true;
            }
        }

        false
    }

    fn match_one(&mut self, ty: Type) -> bool {
        if self.check(ty) {
            self.advance();
            true
        } else {
            false
        }
    }
}
