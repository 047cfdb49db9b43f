use std::rc::Rc;

use log::debug;

use crate::ast::{Expr, ExprId, FunctionDecl, Stmt};
use crate::error::LoxError;
use crate::reporter::Reporter;
use crate::token::{Literal, Token, TokenType};

const MAX_ARITY: usize = 255;

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    next_id: usize,
    errors: Vec<LoxError>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self::with_first_id(tokens, 0)
    }

    /// Start numbering expression ids at `first_id`, so several parses in
    /// one session never hand out the same id twice.
    pub fn with_first_id(mut tokens: Vec<Token>, first_id: usize) -> Self {
        if tokens.last().is_none_or(|t| t.token_type != TokenType::Eof) {
            let (line, end) = tokens
                .last()
                .map(|t| (t.line, t.span.end))
                .unwrap_or((1, 0));
            tokens.push(Token::new(TokenType::Eof, "", line, end..end));
        }
        Self {
            tokens,
            current: 0,
            next_id: first_id,
            errors: Vec::new(),
        }
    }

    /// First id not yet handed out.
    pub fn next_id(&self) -> usize {
        self.next_id
    }

    /// Parse every declaration. Syntax errors go to `reporter` and the
    /// parser resynchronizes at the next statement boundary.
    pub fn parse(&mut self, reporter: &mut Reporter) -> Vec<Stmt> {
        let mut statements = Vec::new();
        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        debug!(
            "parsed {} statements ({} errors)",
            statements.len(),
            self.errors.len()
        );

        for error in self.errors.drain(..) {
            reporter.report(error);
        }
        statements
    }

    fn declaration(&mut self) -> Option<Stmt> {
        let result = if self.match_types(&[TokenType::Class]) {
            self.class_declaration()
        } else if self.check(&TokenType::Fun) && self.check_next(&TokenType::Identifier) {
            self.advance();
            self.function("function").map(Stmt::Function)
        } else if self.match_types(&[TokenType::Var]) {
            self.var_declaration()
        } else {
            self.statement()
        };

        match result {
            Ok(stmt) => Some(stmt),
            Err(e) => {
                self.errors.push(e);
                self.synchronize();
                None
            }
        }
    }

    fn class_declaration(&mut self) -> Result<Stmt, LoxError> {
        let name = self
            .consume(TokenType::Identifier, "Expect class name.")?
            .clone();

        let superclass = if self.match_types(&[TokenType::Less]) {
            let name = self
                .consume(TokenType::Identifier, "Expect superclass name.")?
                .clone();
            Some(Expr::Variable {
                id: self.make_id(),
                name,
            })
        } else {
            None
        };

        self.consume(TokenType::LeftBrace, "Expect '{' before class body.")?;

        let mut methods = Vec::new();
        while !self.check(&TokenType::RightBrace) && !self.is_at_end() {
            // Methods may optionally be introduced by the function keyword.
            self.match_types(&[TokenType::Fun]);
            methods.push(self.function("method")?);
        }

        self.consume(TokenType::RightBrace, "Expect '}' after class body.")?;

        Ok(Stmt::Class {
            name,
            superclass,
            methods,
        })
    }

    fn function(&mut self, kind: &str) -> Result<Rc<FunctionDecl>, LoxError> {
        let name = self
            .consume(TokenType::Identifier, &format!("Expect {} name.", kind))?
            .clone();
        self.consume(
            TokenType::LeftParen,
            &format!("Expect '(' after {} name.", kind),
        )?;
        self.function_body(Some(name), kind)
    }

    /// Parameters and body, starting just after the opening parenthesis.
    fn function_body(
        &mut self,
        name: Option<Token>,
        kind: &str,
    ) -> Result<Rc<FunctionDecl>, LoxError> {
        let mut params = Vec::new();
        if !self.check(&TokenType::RightParen) {
            loop {
                if params.len() >= MAX_ARITY {
                    let error =
                        LoxError::parse(self.peek(), "Can't have more than 255 parameters.");
                    self.errors.push(error);
                }
                params.push(
                    self.consume(TokenType::Identifier, "Expect parameter name.")?
                        .clone(),
                );
                if !self.match_types(&[TokenType::Comma]) {
                    break;
                }
            }
        }
        self.consume(TokenType::RightParen, "Expect ')' after parameters.")?;

        self.consume(
            TokenType::LeftBrace,
            &format!("Expect '{{' before {} body.", kind),
        )?;
        let body = self.block()?;

        Ok(Rc::new(FunctionDecl { name, params, body }))
    }

    fn var_declaration(&mut self) -> Result<Stmt, LoxError> {
        let name = self
            .consume(TokenType::Identifier, "Expect variable name.")?
            .clone();

        let initializer = if self.match_types(&[TokenType::Equal]) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            TokenType::Semicolon,
            "Expect ';' after variable declaration.",
        )?;
        Ok(Stmt::Var { name, initializer })
    }

    fn statement(&mut self) -> Result<Stmt, LoxError> {
        if self.match_types(&[TokenType::For]) {
            self.for_statement()
        } else if self.match_types(&[TokenType::If]) {
            self.if_statement()
        } else if self.match_types(&[TokenType::Print]) {
            self.print_statement()
        } else if self.match_types(&[TokenType::Return]) {
            self.return_statement()
        } else if self.match_types(&[TokenType::While]) {
            self.while_statement()
        } else if self.match_types(&[TokenType::LeftBrace]) {
            Ok(Stmt::Block {
                statements: self.block()?,
            })
        } else {
            self.expression_statement()
        }
    }

    fn for_statement(&mut self) -> Result<Stmt, LoxError> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'for'.")?;

        let initializer = if self.match_types(&[TokenType::Semicolon]) {
            None
        } else if self.match_types(&[TokenType::Var]) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if self.check(&TokenType::Semicolon) {
            Expr::Literal {
                value: Literal::Bool(true),
            }
        } else {
            self.expression()?
        };
        self.consume(TokenType::Semicolon, "Expect ';' after loop condition.")?;

        let increment = if self.check(&TokenType::RightParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenType::RightParen, "Expect ')' after for clauses.")?;

        let mut body = self.statement()?;

        if let Some(increment) = increment {
            body = Stmt::Block {
                statements: vec![
                    body,
                    Stmt::Expression {
                        expression: increment,
                    },
                ],
            };
        }

        body = Stmt::While {
            condition,
            body: Box::new(body),
        };

        if let Some(initializer) = initializer {
            body = Stmt::Block {
                statements: vec![initializer, body],
            };
        }

        Ok(body)
    }

    fn while_statement(&mut self) -> Result<Stmt, LoxError> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "Expect ')' after condition.")?;
        let body = Box::new(self.statement()?);

        Ok(Stmt::While { condition, body })
    }

    fn if_statement(&mut self) -> Result<Stmt, LoxError> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "Expect ')' after if condition.")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.match_types(&[TokenType::Else]) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn block(&mut self) -> Result<Vec<Stmt>, LoxError> {
        let mut statements = Vec::new();

        while !self.check(&TokenType::RightBrace) && !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        self.consume(TokenType::RightBrace, "Expect '}' after block.")?;
        Ok(statements)
    }

    fn print_statement(&mut self) -> Result<Stmt, LoxError> {
        let expression = self.expression()?;
        self.consume(TokenType::Semicolon, "Expect ';' after value.")?;
        Ok(Stmt::Print { expression })
    }

    fn return_statement(&mut self) -> Result<Stmt, LoxError> {
        let keyword = self.previous().clone();
        let value = if self.check(&TokenType::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenType::Semicolon, "Expect ';' after return value.")?;
        Ok(Stmt::Return { keyword, value })
    }

    fn expression_statement(&mut self) -> Result<Stmt, LoxError> {
        let expression = self.expression()?;
        self.consume(TokenType::Semicolon, "Expect ';' after expression.")?;
        Ok(Stmt::Expression { expression })
    }

    fn expression(&mut self) -> Result<Expr, LoxError> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr, LoxError> {
        let expr = self.or()?;

        if self.match_types(&[TokenType::Equal]) {
            let equals = self.previous().clone();
            let value = Box::new(self.assignment()?);

            return match expr {
                Expr::Variable { id, name } => Ok(Expr::Assign { id, name, value }),
                Expr::Get { object, name } => Ok(Expr::Set {
                    object,
                    name,
                    value,
                }),
                other => {
                    // Reported, but the parse carries on with the left side.
                    self.errors
                        .push(LoxError::parse(&equals, "Invalid assignment target."));
                    Ok(other)
                }
            };
        }

        Ok(expr)
    }

    fn or(&mut self) -> Result<Expr, LoxError> {
        let mut expr = self.and()?;

        while self.match_types(&[TokenType::Or]) {
            let operator = self.previous().clone();
            let right = self.and()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn and(&mut self) -> Result<Expr, LoxError> {
        let mut expr = self.equality()?;

        while self.match_types(&[TokenType::And]) {
            let operator = self.previous().clone();
            let right = self.equality()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr, LoxError> {
        let mut expr = self.comparison()?;

        while self.match_types(&[TokenType::BangEqual, TokenType::EqualEqual]) {
            let operator = self.previous().clone();
            let right = self.comparison()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Expr, LoxError> {
        let mut expr = self.term()?;

        while self.match_types(&[
            TokenType::Greater,
            TokenType::GreaterEqual,
            TokenType::Less,
            TokenType::LessEqual,
        ]) {
            let operator = self.previous().clone();
            let right = self.term()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn term(&mut self) -> Result<Expr, LoxError> {
        let mut expr = self.factor()?;

        while self.match_types(&[TokenType::Minus, TokenType::Plus]) {
            let operator = self.previous().clone();
            let right = self.factor()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn factor(&mut self) -> Result<Expr, LoxError> {
        let mut expr = self.unary()?;

        while self.match_types(&[TokenType::Slash, TokenType::Star]) {
            let operator = self.previous().clone();
            let right = self.unary()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr, LoxError> {
        if self.match_types(&[TokenType::Bang, TokenType::Minus]) {
            let operator = self.previous().clone();
            let right = self.unary()?;
            return Ok(Expr::Unary {
                operator,
                right: Box::new(right),
            });
        }

        self.call()
    }

    fn call(&mut self) -> Result<Expr, LoxError> {
        let mut expr = self.primary()?;

        loop {
            if self.match_types(&[TokenType::LeftParen]) {
                expr = self.finish_call(expr)?;
            } else if self.match_types(&[TokenType::Dot]) {
                let name = self
                    .consume(TokenType::Identifier, "Expect property name after '.'.")?
                    .clone();
                expr = Expr::Get {
                    object: Box::new(expr),
                    name,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr, LoxError> {
        let mut arguments = Vec::new();
        if !self.check(&TokenType::RightParen) {
            loop {
                if arguments.len() >= MAX_ARITY {
                    let error =
                        LoxError::parse(self.peek(), "Can't have more than 255 arguments.");
                    self.errors.push(error);
                }
                arguments.push(self.expression()?);
                if !self.match_types(&[TokenType::Comma]) {
                    break;
                }
            }
        }

        let paren = self
            .consume(TokenType::RightParen, "Expect ')' after arguments.")?
            .clone();

        Ok(Expr::Call {
            callee: Box::new(callee),
            paren,
            arguments,
        })
    }

    fn primary(&mut self) -> Result<Expr, LoxError> {
        let token = self.peek().clone();
        match token.token_type {
            TokenType::False => {
                self.advance();
                Ok(Expr::Literal {
                    value: Literal::Bool(false),
                })
            }
            TokenType::True => {
                self.advance();
                Ok(Expr::Literal {
                    value: Literal::Bool(true),
                })
            }
            TokenType::Nil => {
                self.advance();
                Ok(Expr::Literal {
                    value: Literal::Nil,
                })
            }
            TokenType::Number | TokenType::String => {
                self.advance();
                let value = token.literal.unwrap_or(Literal::Nil);
                Ok(Expr::Literal { value })
            }
            TokenType::Super => {
                self.advance();
                self.consume(TokenType::Dot, "Expect '.' after 'super'.")?;
                let method = self
                    .consume(TokenType::Identifier, "Expect superclass method name.")?
                    .clone();
                Ok(Expr::Super {
                    id: self.make_id(),
                    keyword: token,
                    method,
                })
            }
            TokenType::This => {
                self.advance();
                Ok(Expr::This {
                    id: self.make_id(),
                    keyword: token,
                })
            }
            TokenType::Identifier => {
                self.advance();
                Ok(Expr::Variable {
                    id: self.make_id(),
                    name: token,
                })
            }
            TokenType::Fun => {
                self.advance();
                self.consume(TokenType::LeftParen, "Expect '(' after 'fun'.")?;
                Ok(Expr::Function(self.function_body(None, "function")?))
            }
            TokenType::LeftParen => {
                self.advance();
                let expr = self.expression()?;
                self.consume(TokenType::RightParen, "Expect ')' after expression.")?;
                Ok(Expr::Grouping {
                    expression: Box::new(expr),
                })
            }
            _ => Err(LoxError::parse(&token, "Expect expression.")),
        }
    }

    fn make_id(&mut self) -> ExprId {
        let id = ExprId(self.next_id);
        self.next_id += 1;
        id
    }

    fn match_types(&mut self, types: &[TokenType]) -> bool {
        for t in types {
            if self.check(t) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn consume(&mut self, token_type: TokenType, message: &str) -> Result<&Token, LoxError> {
        if self.check(&token_type) {
            return Ok(self.advance());
        }
        Err(LoxError::parse(self.peek(), message))
    }

    /// Discard tokens until something that looks like the start of a statement.
    fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous().token_type == TokenType::Semicolon {
                return;
            }

            match self.peek().token_type {
                TokenType::Class
                | TokenType::Fun
                | TokenType::Var
                | TokenType::For
                | TokenType::If
                | TokenType::While
                | TokenType::Print
                | TokenType::Return => return,
                _ => {}
            }

            self.advance();
        }
    }

    fn check(&self, token_type: &TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }
        &self.peek().token_type == token_type
    }

    fn check_next(&self, token_type: &TokenType) -> bool {
        self.tokens
            .get(self.current + 1)
            .is_some_and(|t| &t.token_type == token_type)
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::Eof
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::Scanner;

    fn make_token(token_type: TokenType, lexeme: &str) -> Token {
        Token::new(token_type, lexeme, 1, 0..lexeme.len())
    }

    fn parse(source: &str) -> (Vec<Stmt>, Reporter) {
        let mut reporter = Reporter::new();
        let tokens = Scanner::new(source).scan_tokens(&mut reporter);
        let statements = Parser::new(tokens).parse(&mut reporter);
        (statements, reporter)
    }

    fn parse_expr(source: &str) -> Expr {
        let (statements, reporter) = parse(source);
        assert!(reporter.is_clean(), "{:?}", reporter.diagnostics());
        match statements.into_iter().next() {
            Some(Stmt::Expression { expression }) | Some(Stmt::Print { expression }) => {
                expression
            }
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    fn messages(reporter: &Reporter) -> Vec<String> {
        reporter
            .diagnostics()
            .iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn parse_eof_only_returns_empty() {
        let mut reporter = Reporter::new();
        let statements = Parser::new(vec![make_token(TokenType::Eof, "")]).parse(&mut reporter);
        assert!(statements.is_empty());
        assert!(reporter.is_clean());
    }

    #[test]
    fn missing_eof_is_supplied() {
        let mut reporter = Reporter::new();
        let tokens = vec![
            make_token(TokenType::Nil, "nil"),
            make_token(TokenType::Semicolon, ";"),
        ];
        let statements = Parser::new(tokens).parse(&mut reporter);
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn parses_literals() {
        assert_eq!(parse_expr("123;").to_string(), "123");
        assert_eq!(parse_expr("\"hi\";").to_string(), "\"hi\"");
        assert_eq!(parse_expr("true;").to_string(), "true");
        assert_eq!(parse_expr("nil;").to_string(), "nil");
    }

    #[test]
    fn factor_binds_tighter_than_term() {
        assert_eq!(parse_expr("1 + 2 * 3;").to_string(), "(+ 1 (* 2 3))");
    }

    #[test]
    fn binary_tiers_are_left_associative() {
        assert_eq!(parse_expr("1 - 2 - 3;").to_string(), "(- (- 1 2) 3)");
        assert_eq!(parse_expr("8 / 4 / 2;").to_string(), "(/ (/ 8 4) 2)");
    }

    #[test]
    fn full_precedence_ladder() {
        assert_eq!(
            parse_expr("a or b and c == d < e + f * -g;").to_string(),
            "(or a (and b (== c (< d (+ e (* f (- g)))))))"
        );
    }

    #[test]
    fn parses_grouping_and_unary() {
        assert_eq!(parse_expr("!(1 == 2);").to_string(), "(! (group (== 1 2)))");
        assert_eq!(parse_expr("--1;").to_string(), "(- (- 1))");
    }

    #[test]
    fn assignment_is_right_associative() {
        assert_eq!(parse_expr("a = b = 3;").to_string(), "(= a (= b 3))");
    }

    #[test]
    fn property_assignment_becomes_set() {
        let expr = parse_expr("point.x = 1;");
        assert!(matches!(expr, Expr::Set { ref name, .. } if name.lexeme == "x"));
    }

    #[test]
    fn invalid_assignment_target_is_reported_without_aborting() {
        let (statements, reporter) = parse("1 + 2 = 3; print 4;");
        assert_eq!(
            messages(&reporter),
            vec!["[line 1] Error at '=': Invalid assignment target."]
        );
        assert_eq!(statements.len(), 2);
    }

    #[test]
    fn parses_chained_calls_and_gets() {
        assert_eq!(
            parse_expr("a.b(1)(2).c;").to_string(),
            "(. (call (call (. a b) 1) 2) c)"
        );
    }

    #[test]
    fn parses_this_and_super() {
        assert_eq!(parse_expr("this.x;").to_string(), "(. this x)");
        assert_eq!(parse_expr("super.cook();").to_string(), "(call (super cook))");
    }

    #[test]
    fn super_requires_method_name() {
        let (_, reporter) = parse("super;");
        assert_eq!(
            messages(&reporter),
            vec!["[line 1] Error at ';': Expect '.' after 'super'."]
        );
    }

    #[test]
    fn parses_var_declaration() {
        let (statements, _) = parse("var a = 1; var b;");
        assert!(matches!(
            &statements[0],
            Stmt::Var { name, initializer: Some(_) } if name.lexeme == "a"
        ));
        assert!(matches!(
            &statements[1],
            Stmt::Var { initializer: None, .. }
        ));
    }

    #[test]
    fn var_requires_name() {
        let (_, reporter) = parse("var = 1;");
        assert_eq!(
            messages(&reporter),
            vec!["[line 1] Error at '=': Expect variable name."]
        );
    }

    #[test]
    fn parses_if_else() {
        let (statements, reporter) = parse("if (a) print 1; else print 2;");
        assert!(reporter.is_clean());
        assert!(matches!(
            &statements[0],
            Stmt::If {
                else_branch: Some(_),
                ..
            }
        ));
    }

    #[test]
    fn dangling_else_binds_to_nearest_if() {
        let (statements, _) = parse("if (a) if (b) print 1; else print 2;");
        let Stmt::If {
            then_branch,
            else_branch,
            ..
        } = &statements[0]
        else {
            panic!("expected if");
        };
        assert!(else_branch.is_none());
        assert!(matches!(
            then_branch.as_ref(),
            Stmt::If {
                else_branch: Some(_),
                ..
            }
        ));
    }

    #[test]
    fn for_desugars_into_while_inside_blocks() {
        let (statements, reporter) = parse("for (var i = 0; i < 3; i = i + 1) print i;");
        assert!(reporter.is_clean());
        let Stmt::Block { statements: outer } = &statements[0] else {
            panic!("expected initializer block");
        };
        assert!(matches!(&outer[0], Stmt::Var { .. }));
        let Stmt::While { body, .. } = &outer[1] else {
            panic!("expected while");
        };
        let Stmt::Block { statements: inner } = body.as_ref() else {
            panic!("expected body block");
        };
        assert!(matches!(&inner[0], Stmt::Print { .. }));
        assert!(matches!(&inner[1], Stmt::Expression { .. }));
    }

    #[test]
    fn empty_for_clauses_default_condition_to_true() {
        let (statements, _) = parse("for (;;) print 1;");
        let Stmt::While { condition, body } = &statements[0] else {
            panic!("expected bare while");
        };
        assert_eq!(condition.to_string(), "true");
        assert!(matches!(body.as_ref(), Stmt::Print { .. }));
    }

    #[test]
    fn parses_function_declaration() {
        let (statements, reporter) = parse("fun add(a, b) { return a + b; }");
        assert!(reporter.is_clean());
        let Stmt::Function(decl) = &statements[0] else {
            panic!("expected function");
        };
        assert_eq!(decl.name.as_ref().map(|t| t.lexeme.as_str()), Some("add"));
        assert_eq!(decl.params.len(), 2);
        assert!(matches!(&decl.body[0], Stmt::Return { value: Some(_), .. }));
    }

    #[test]
    fn fn_spelling_declares_function_too() {
        let (statements, reporter) = parse("fn f() {}");
        assert!(reporter.is_clean());
        assert!(matches!(&statements[0], Stmt::Function(_)));
    }

    #[test]
    fn fun_without_name_is_function_literal() {
        let (statements, reporter) = parse("var f = fun (x) { return x; };");
        assert!(reporter.is_clean());
        assert!(matches!(
            &statements[0],
            Stmt::Var {
                initializer: Some(Expr::Function(decl)),
                ..
            } if decl.name.is_none() && decl.params.len() == 1
        ));
    }

    #[test]
    fn function_literal_can_be_called_immediately() {
        let expr = parse_expr("(fun () { print 1; })();");
        assert!(matches!(expr, Expr::Call { .. }));
    }

    #[test]
    fn return_without_value() {
        let (statements, _) = parse("fun f() { return; }");
        let Stmt::Function(decl) = &statements[0] else {
            panic!("expected function");
        };
        assert!(matches!(&decl.body[0], Stmt::Return { value: None, .. }));
    }

    #[test]
    fn parses_class_with_superclass_and_methods() {
        let (statements, reporter) =
            parse("class B < A { init(x) { this.x = x; } fun get() { return this.x; } }");
        assert!(reporter.is_clean(), "{:?}", messages(&reporter));
        let Stmt::Class {
            name,
            superclass,
            methods,
        } = &statements[0]
        else {
            panic!("expected class");
        };
        assert_eq!(name.lexeme, "B");
        assert!(matches!(superclass, Some(Expr::Variable { name, .. }) if name.lexeme == "A"));
        assert_eq!(methods.len(), 2);
        assert_eq!(
            methods[1].name.as_ref().map(|t| t.lexeme.as_str()),
            Some("get")
        );
    }

    #[test]
    fn class_requires_brace() {
        let (_, reporter) = parse("class A print 1;");
        assert_eq!(
            messages(&reporter),
            vec!["[line 1] Error at 'print': Expect '{' before class body."]
        );
    }

    #[test]
    fn too_many_arguments_is_reported_not_fatal() {
        let args = vec!["1"; 256].join(", ");
        let (statements, reporter) = parse(&format!("f({});", args));
        assert_eq!(statements.len(), 1);
        assert_eq!(reporter.diagnostics().len(), 1);
        assert!(messages(&reporter)[0].ends_with("Can't have more than 255 arguments."));
    }

    #[test]
    fn too_many_parameters_is_reported_not_fatal() {
        let params: Vec<String> = (0..256).map(|i| format!("p{}", i)).collect();
        let (statements, reporter) = parse(&format!("fun f({}) {{}}", params.join(", ")));
        assert_eq!(statements.len(), 1);
        assert!(messages(&reporter)[0].ends_with("Can't have more than 255 parameters."));
    }

    #[test]
    fn missing_semicolon_reports_at_next_token() {
        let (_, reporter) = parse("print 1\nprint 2;");
        assert_eq!(
            messages(&reporter),
            vec!["[line 2] Error at 'print': Expect ';' after value."]
        );
    }

    #[test]
    fn error_at_end_of_input() {
        let (_, reporter) = parse("print");
        assert_eq!(
            messages(&reporter),
            vec!["[line 1] Error at end: Expect expression."]
        );
    }

    #[test]
    fn synchronizes_and_reports_multiple_errors() {
        let (statements, reporter) = parse("var = 1;\nprint 2;\n(3;\nprint 4;");
        assert_eq!(
            messages(&reporter),
            vec![
                "[line 1] Error at '=': Expect variable name.",
                "[line 3] Error at ';': Expect ')' after expression.",
            ]
        );
        assert_eq!(statements.len(), 2);
    }

    #[test]
    fn errors_inside_blocks_keep_the_rest_of_the_block() {
        let (statements, reporter) = parse("{ var; print 1; }");
        assert!(reporter.had_error());
        let Stmt::Block { statements: inner } = &statements[0] else {
            panic!("expected block");
        };
        assert_eq!(inner.len(), 1);
    }

    #[test]
    fn unclosed_block_is_reported() {
        let (_, reporter) = parse("{ print 1;");
        assert_eq!(
            messages(&reporter),
            vec!["[line 1] Error at end: Expect '}' after block."]
        );
    }

    #[test]
    fn unknown_token_is_not_an_expression() {
        let (_, reporter) = parse("print @;");
        assert_eq!(
            messages(&reporter),
            vec![
                "[line 1] Error: Unexpected character.",
                "[line 1] Error at '@': Expect expression.",
            ]
        );
    }

    #[test]
    fn expression_ids_are_unique_and_continue_from_first_id() {
        let mut reporter = Reporter::new();
        let tokens = Scanner::new("a = b + this.c;").scan_tokens(&mut reporter);
        let mut parser = Parser::with_first_id(tokens, 10);
        let statements = parser.parse(&mut reporter);
        assert_eq!(parser.next_id(), 13);

        let Stmt::Expression {
            expression: Expr::Assign { id, value, .. },
        } = &statements[0]
        else {
            panic!("expected assignment");
        };
        assert_eq!(*id, ExprId(10));
        let Expr::Binary { left, right, .. } = value.as_ref() else {
            panic!("expected binary");
        };
        assert!(matches!(left.as_ref(), Expr::Variable { id, .. } if *id == ExprId(11)));
        assert!(matches!(
            right.as_ref(),
            Expr::Get { object, .. } if matches!(object.as_ref(), Expr::This { id, .. } if *id == ExprId(12))
        ));
    }
}
