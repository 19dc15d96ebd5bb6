use std::rc::Rc;

use preter_core::{Literal, Token};

use crate::ast::{Expr, ExprVisitor, FunctionDecl, Stmt, StmtVisitor};
use crate::error::Error;
use crate::parser::StmtStream;

/// Renders the syntax tree in a fully parenthesized prefix form, e.g. `(* (- 42) (group 4.5))`.
/// Only meant for debugging the parser.
pub struct AstPrinter;

impl AstPrinter {
    /// One line per top level statement.
    pub fn print(&mut self, program: &StmtStream) -> String {
        program
            .0
            .iter()
            .map(|stmt| self.stmt(stmt))
            .collect::<Vec<String>>()
            .join("\n")
    }

    fn stmt(&mut self, stmt: &Stmt) -> String {
        // Printing never fails, the visitor only returns `Result` for the interpreter's sake.
        self.visit_stmt(stmt).unwrap_or_default()
    }

    fn expr(&mut self, expr: &Expr) -> String {
        self.visit_expr(expr).unwrap_or_default()
    }

    fn parenthesize(&mut self, name: &str, exprs: &[&Expr]) -> String {
        let mut res = format!("({}", name);
        for expr in exprs {
            res.push(' ');
            res.push_str(&self.expr(expr));
        }
        res.push(')');
        res
    }

    fn parenthesize_stmts(&mut self, head: String, stmts: &[Stmt]) -> String {
        let mut res = head;
        for stmt in stmts {
            res.push(' ');
            res.push_str(&self.stmt(stmt));
        }
        res.push(')');
        res
    }
}

impl ExprVisitor for AstPrinter {
    type Item = String;

    fn visit_assign(&mut self, name: &Token, value: &Expr) -> Result<String, Error> {
        Ok(format!("(= {} {})", name.lexeme, self.expr(value)))
    }

    fn visit_binary(
        &mut self,
        left: &Expr,
        operator: &Token,
        right: &Expr,
    ) -> Result<String, Error> {
        Ok(self.parenthesize(&operator.lexeme, &[left, right]))
    }

    fn visit_call(&mut self, callee: &Expr, _: &Token, args: &[Expr]) -> Result<String, Error> {
        let mut exprs = vec![callee];
        exprs.extend(args.iter());
        Ok(self.parenthesize("call", &exprs))
    }

    fn visit_grouping(&mut self, expression: &Expr) -> Result<String, Error> {
        Ok(self.parenthesize("group", &[expression]))
    }

    fn visit_literal(&mut self, value: &Literal) -> Result<String, Error> {
        Ok(value.to_string())
    }

    fn visit_logical(
        &mut self,
        left: &Expr,
        operator: &Token,
        right: &Expr,
    ) -> Result<String, Error> {
        Ok(self.parenthesize(&operator.lexeme, &[left, right]))
    }

    fn visit_unary(&mut self, operator: &Token, right: &Expr) -> Result<String, Error> {
        Ok(self.parenthesize(&operator.lexeme, &[right]))
    }

    fn visit_variable(&mut self, name: &Token) -> Result<String, Error> {
        Ok(name.lexeme.clone())
    }
}

impl StmtVisitor for AstPrinter {
    type Item = String;

    fn visit_block(&mut self, statements: &[Stmt]) -> Result<String, Error> {
        Ok(self.parenthesize_stmts(String::from("(block"), statements))
    }

    fn visit_expression(&mut self, expression: &Expr) -> Result<String, Error> {
        Ok(self.parenthesize(";", &[expression]))
    }

    fn visit_function(&mut self, declaration: &Rc<FunctionDecl>) -> Result<String, Error> {
        let params: Vec<&str> = declaration
            .params
            .iter()
            .map(|param| param.lexeme.as_str())
            .collect();
        let head = format!("(fun {} ({})", declaration.name.lexeme, params.join(" "));
        Ok(self.parenthesize_stmts(head, &declaration.body))
    }

    fn visit_if(
        &mut self,
        condition: &Expr,
        then_branch: &Stmt,
        else_branch: Option<&Stmt>,
    ) -> Result<String, Error> {
        let mut res = format!("(if {} {}", self.expr(condition), self.stmt(then_branch));
        if let Some(else_branch) = else_branch {
            res.push(' ');
            res.push_str(&self.stmt(else_branch));
        }
        res.push(')');
        Ok(res)
    }

    fn visit_while(&mut self, condition: &Expr, body: &Stmt) -> Result<String, Error> {
        Ok(format!("(while {} {})", self.expr(condition), self.stmt(body)))
    }

    fn visit_print(&mut self, _: &Token, expression: &Expr) -> Result<String, Error> {
        Ok(self.parenthesize("print", &[expression]))
    }

    fn visit_var(&mut self, name: &Token, init: Option<&Expr>) -> Result<String, Error> {
        match init {
            Some(init) => Ok(format!("(var {} {})", name.lexeme, self.expr(init))),
            None => Ok(format!("(var {})", name.lexeme)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use preter_core::{Reporter, Scanner, Token, Type};

    use crate::ast::{Expr, Stmt};
    use crate::parser::{Parser, StmtStream};
    use crate::printer::AstPrinter;

    fn print(src: &str) -> String {
        let output: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
        let mut reporter = Reporter::new(output);
        let tokens = Scanner::new(src, &mut reporter).scan_tokens();
        let program = Parser::new(&tokens, &mut reporter).parse();
        AstPrinter.print(&program)
    }

    #[test]
    fn test_expression_tree() {
        let expr = Expr::binary(
            Expr::unary(
                Token::new(Type::Minus, String::from("-"), None, 1),
                Expr::literal(42),
            ),
            Token::new(Type::Star, String::from("*"), None, 1),
            Expr::grouping(Expr::literal(45.67)),
        );
        let program = StmtStream(vec![Stmt::expression(expr)]);

        assert_eq!(AstPrinter.print(&program), "(; (* (- 42) (group 45.67)))");
    }

    #[test]
    fn test_programs() {
        let tests = [
            ("print 1 + 2 * 3;", "(print (+ 1 (* 2 3)))"),
            ("var a;", "(var a)"),
            ("var a = nil or \"s\";", "(var a (or nil s))"),
            ("a = f(1, true);", "(; (= a (call f 1 true)))"),
            ("if (a) print 1; else print 2;", "(if a (print 1) (print 2))"),
            (
                "for (var i = 0; i < 2; i = i + 1) print i;",
                "(block (var i 0) (while (< i 2) (block (print i) (; (= i (+ i 1))))))",
            ),
            ("fun f(a, b) { print a; }", "(fun f (a b) (print a))"),
            ("{ var x = 1; }\nprint x;", "(block (var x 1))\n(print x)"),
        ];

        for (src, expected) in tests {
            assert_eq!(print(src), expected);
        }
    }
}
