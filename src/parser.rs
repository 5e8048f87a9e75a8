use crate::ast::{
    BinaryOperator, Expression, FunctionDeclaration, Literal, LogicalOperator, Parameter,
    Statement, UnaryOperator,
};
use crate::stack::ensure_sufficient_stack;
use crate::token::{Token, TokenKind};
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, error};

#[derive(Debug, Clone, PartialEq, Error)]
#[error("[line {line}, column {column}] Error at '{lexeme}': {message}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub lexeme: String,
    pub message: String,
}

type ParseResult<T> = Result<T, ParseError>;

static EOF: Token = Token {
    kind: TokenKind::Eof,
    text: String::new(),
    line: 0,
    column: 0,
};

/// Parses a token stream (as produced by `tokenize`) into top-level
/// statements.
///
/// A statement that fails to parse is reported, left out of the result, and
/// parsing resumes at the next statement boundary.
pub fn parse(tokens: &[Token]) -> (Vec<Statement>, Vec<ParseError>) {
    let mut parser = Parser::new(tokens);
    let statements = parser.parse();
    (statements, parser.errors)
}

pub struct Parser<'a> {
    tokens: &'a [Token],
    current: usize,
    errors: Vec<ParseError>,
    loop_depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token]) -> Parser<'a> {
        Parser {
            tokens,
            current: 0,
            errors: Vec::new(),
            loop_depth: 0,
        }
    }
    pub fn parse(&mut self) -> Vec<Statement> {
        let mut statements: Vec<Statement> = Vec::new();
        while !self.is_at_end() {
            if let Some(statement) = self.declaration() {
                statements.push(statement);
            }
        }
        debug!(
            statements = statements.len(),
            errors = self.errors.len(),
            "parsed program"
        );
        statements
    }
    fn declaration(&mut self) -> Option<Statement> {
        ensure_sufficient_stack(|| self.declaration_inner())
    }
    fn declaration_inner(&mut self) -> Option<Statement> {
        let result = match self.peek().kind {
            TokenKind::Let | TokenKind::Var => {
                self.advance();
                self.var_declaration(false)
            }
            TokenKind::Const => {
                self.advance();
                self.var_declaration(true)
            }
            TokenKind::Function => {
                self.advance();
                self.function_declaration()
            }
            _ => self.statement(),
        };
        match result {
            Ok(statement) => Some(statement),
            Err(e) => {
                error!("{}", e);
                self.errors.push(e);
                self.synchronize();
                None
            }
        }
    }
    fn var_declaration(&mut self, is_const: bool) -> ParseResult<Statement> {
        let name = self.consume(TokenKind::Identifier, "Expected variable name.")?;
        let type_name = self.type_annotation("Expected type name.")?;
        let initializer = if self.matches(&[TokenKind::Equal]) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(
            TokenKind::Semicolon,
            "Expected ';' after variable declaration.",
        )?;
        Ok(Statement::VariableDeclaration {
            name: name.text.clone(),
            type_name,
            initializer,
            is_const,
        })
    }
    fn type_annotation(&mut self, message: &str) -> ParseResult<Option<String>> {
        if self.matches(&[TokenKind::Colon]) {
            let annotation = self.consume(TokenKind::Identifier, message)?;
            Ok(Some(annotation.text.clone()))
        } else {
            Ok(None)
        }
    }
    fn function_declaration(&mut self) -> ParseResult<Statement> {
        let name = self.consume(TokenKind::Identifier, "Expected function name.")?;
        self.consume(TokenKind::LeftParen, "Expected '(' after function name.")?;

        let mut parameters: Vec<Parameter> = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                let parameter = self.consume(TokenKind::Identifier, "Expected parameter name.")?;
                if parameters.iter().any(|p| p.name == parameter.text) {
                    return Err(self.error_at(parameter, "Duplicate parameter name."));
                }
                let type_name = self.type_annotation("Expected parameter type.")?;
                parameters.push(Parameter {
                    name: parameter.text.clone(),
                    type_name,
                });
                if !self.matches(&[TokenKind::Comma]) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expected ')' after parameters.")?;
        let return_type = self.type_annotation("Expected return type.")?;
        self.consume(TokenKind::LeftBrace, "Expected '{' before function body.")?;

        // A loop around the declaration does not make `break` legal inside it.
        let enclosing_loops = std::mem::replace(&mut self.loop_depth, 0);
        let body = self.block();
        self.loop_depth = enclosing_loops;

        Ok(Statement::Function(Rc::new(FunctionDeclaration {
            name: name.text.clone(),
            parameters,
            return_type,
            body: body?,
        })))
    }
    fn statement(&mut self) -> ParseResult<Statement> {
        match self.peek().kind {
            TokenKind::If => {
                self.advance();
                self.if_statement()
            }
            TokenKind::While => {
                self.advance();
                self.while_statement()
            }
            TokenKind::For => {
                self.advance();
                self.for_statement()
            }
            TokenKind::Return => {
                self.advance();
                self.return_statement()
            }
            TokenKind::Break | TokenKind::Continue => {
                let keyword = self.advance();
                self.loop_control(keyword)
            }
            TokenKind::LeftBrace => {
                self.advance();
                Ok(Statement::Block(self.block()?))
            }
            _ => self.expression_statement(),
        }
    }
    fn for_statement(&mut self) -> ParseResult<Statement> {
        self.consume(TokenKind::LeftParen, "Expected '(' after 'for'.")?;
        let initializer: Option<Statement> = match self.peek().kind {
            TokenKind::Semicolon => {
                self.advance();
                None
            }
            TokenKind::Let | TokenKind::Var => {
                self.advance();
                Some(self.var_declaration(false)?)
            }
            TokenKind::Const => {
                self.advance();
                Some(self.var_declaration(true)?)
            }
            _ => Some(self.expression_statement()?),
        };

        let condition = if self.check(TokenKind::Semicolon) {
            Expression::Literal(Literal::Bool(true))
        } else {
            self.expression()?
        };
        self.consume(TokenKind::Semicolon, "Expected ';' after loop condition.")?;

        let increment = if self.check(TokenKind::RightParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenKind::RightParen, "Expected ')' after for clauses.")?;

        let body = self.loop_body()?;
        let body = Statement::While {
            condition,
            body: Box::new(body),
            increment,
        };
        match initializer {
            None => Ok(body),
            Some(x) => Ok(Statement::Block(vec![x, body])),
        }
    }
    fn while_statement(&mut self) -> ParseResult<Statement> {
        self.consume(TokenKind::LeftParen, "Expected '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "Expected ')' after condition.")?;
        let body = self.loop_body()?;
        Ok(Statement::While {
            condition,
            body: Box::new(body),
            increment: None,
        })
    }
    fn loop_body(&mut self) -> ParseResult<Statement> {
        self.loop_depth += 1;
        let body = self.statement();
        self.loop_depth -= 1;
        body
    }
    fn if_statement(&mut self) -> ParseResult<Statement> {
        self.consume(TokenKind::LeftParen, "Expected '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "Expected ')' after condition.")?;
        let then_branch = self.statement()?;
        let else_branch = if self.matches(&[TokenKind::Else]) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Statement::If {
            condition,
            then_branch: Box::new(then_branch),
            else_branch,
        })
    }
    fn return_statement(&mut self) -> ParseResult<Statement> {
        let value = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenKind::Semicolon, "Expected ';' after return value.")?;
        Ok(Statement::Return(value))
    }
    fn loop_control(&mut self, keyword: &'a Token) -> ParseResult<Statement> {
        if self.loop_depth == 0 {
            return Err(self.error_at(
                keyword,
                &format!("Cannot use '{}' outside of a loop.", keyword.text),
            ));
        }
        self.consume(
            TokenKind::Semicolon,
            &format!("Expected ';' after '{}'.", keyword.text),
        )?;
        match keyword.kind {
            TokenKind::Break => Ok(Statement::Break),
            _ => Ok(Statement::Continue),
        }
    }
    fn block(&mut self) -> ParseResult<Vec<Statement>> {
        let mut statements: Vec<Statement> = Vec::new();
        while !self.is_at_end() && !self.check(TokenKind::RightBrace) {
            if let Some(statement) = self.declaration() {
                statements.push(statement);
            }
        }
        self.consume(TokenKind::RightBrace, "Expected '}' after block.")?;
        Ok(statements)
    }
    fn expression_statement(&mut self) -> ParseResult<Statement> {
        let expr = self.expression()?;
        self.consume(TokenKind::Semicolon, "Expected ';' after expression.")?;
        Ok(Statement::Expression(expr))
    }
    fn expression(&mut self) -> ParseResult<Expression> {
        ensure_sufficient_stack(|| self.assignment())
    }
    fn assignment(&mut self) -> ParseResult<Expression> {
        let expr = self.or()?;
        let compound = match self.peek().kind {
            TokenKind::Equal => None,
            TokenKind::PlusEqual => Some(BinaryOperator::Add),
            TokenKind::MinusEqual => Some(BinaryOperator::Subtract),
            TokenKind::StarEqual => Some(BinaryOperator::Multiply),
            TokenKind::SlashEqual => Some(BinaryOperator::Divide),
            TokenKind::PercentEqual => Some(BinaryOperator::Modulo),
            _ => return Ok(expr),
        };
        let equals = self.advance();
        let value = self.assignment()?;
        match &expr {
            Expression::Identifier(name) => {
                let value = match compound {
                    None => value,
                    Some(operator) => Expression::Binary {
                        left: Box::new(Expression::Identifier(name.clone())),
                        operator,
                        right: Box::new(value),
                    },
                };
                Ok(Expression::Assignment {
                    name: name.clone(),
                    value: Box::new(value),
                })
            }
            _ => Err(self.error_at(equals, "Invalid assignment target.")),
        }
    }
    fn or(&mut self) -> ParseResult<Expression> {
        let mut expr = self.and()?;
        while self.matches(&[TokenKind::OrOr]) {
            let right = self.and()?;
            expr = Expression::Logical {
                left: Box::new(expr),
                operator: LogicalOperator::Or,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }
    fn and(&mut self) -> ParseResult<Expression> {
        let mut expr = self.equality()?;
        while self.matches(&[TokenKind::AndAnd]) {
            let right = self.equality()?;
            expr = Expression::Logical {
                left: Box::new(expr),
                operator: LogicalOperator::And,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }
    fn equality(&mut self) -> ParseResult<Expression> {
        let mut expr = self.comparison()?;
        loop {
            let operator = match self.peek().kind {
                TokenKind::EqualEqual => BinaryOperator::Equal,
                TokenKind::BangEqual => BinaryOperator::NotEqual,
                TokenKind::EqualEqualEqual => BinaryOperator::StrictEqual,
                TokenKind::BangEqualEqual => BinaryOperator::StrictNotEqual,
                _ => break,
            };
            self.advance();
            let right = self.comparison()?;
            expr = binary(expr, operator, right);
        }
        Ok(expr)
    }
    fn comparison(&mut self) -> ParseResult<Expression> {
        let mut expr = self.term()?;
        loop {
            let operator = match self.peek().kind {
                TokenKind::Less => BinaryOperator::Less,
                TokenKind::LessEqual => BinaryOperator::LessEqual,
                TokenKind::Greater => BinaryOperator::Greater,
                TokenKind::GreaterEqual => BinaryOperator::GreaterEqual,
                _ => break,
            };
            self.advance();
            let right = self.term()?;
            expr = binary(expr, operator, right);
        }
        Ok(expr)
    }
    fn term(&mut self) -> ParseResult<Expression> {
        let mut expr = self.factor()?;
        loop {
            let operator = match self.peek().kind {
                TokenKind::Plus => BinaryOperator::Add,
                TokenKind::Minus => BinaryOperator::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.factor()?;
            expr = binary(expr, operator, right);
        }
        Ok(expr)
    }
    fn factor(&mut self) -> ParseResult<Expression> {
        let mut expr = self.unary()?;
        loop {
            let operator = match self.peek().kind {
                TokenKind::Star => BinaryOperator::Multiply,
                TokenKind::Slash => BinaryOperator::Divide,
                TokenKind::Percent => BinaryOperator::Modulo,
                _ => break,
            };
            self.advance();
            let right = self.unary()?;
            expr = binary(expr, operator, right);
        }
        Ok(expr)
    }
    fn unary(&mut self) -> ParseResult<Expression> {
        let operator = match self.peek().kind {
            TokenKind::Bang => UnaryOperator::Not,
            TokenKind::Minus => UnaryOperator::Negate,
            _ => return self.call(),
        };
        self.advance();
        let right = ensure_sufficient_stack(|| self.unary())?;
        Ok(Expression::Unary {
            operator,
            right: Box::new(right),
        })
    }
    fn call(&mut self) -> ParseResult<Expression> {
        let mut expr = self.primary()?;
        loop {
            match self.peek().kind {
                TokenKind::LeftParen => {
                    self.advance();
                    expr = self.finish_call(expr)?;
                }
                TokenKind::Dot => {
                    self.advance();
                    let name =
                        self.consume(TokenKind::Identifier, "Expected property name after '.'.")?;
                    expr = Expression::PropertyGet {
                        object: Box::new(expr),
                        name: name.text.clone(),
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }
    fn finish_call(&mut self, callee: Expression) -> ParseResult<Expression> {
        let mut arguments: Vec<Expression> = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                arguments.push(self.expression()?);
                if !self.matches(&[TokenKind::Comma]) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expected ')' after arguments.")?;
        Ok(Expression::Call {
            callee: Box::new(callee),
            arguments,
        })
    }
    fn primary(&mut self) -> ParseResult<Expression> {
        let token = self.peek();
        let expr = match token.kind {
            TokenKind::Boolean => Expression::Literal(Literal::Bool(token.text == "true")),
            TokenKind::Null => Expression::Literal(Literal::Null),
            TokenKind::Integer | TokenKind::Float => match token.text.parse::<f64>() {
                Ok(x) => Expression::Literal(Literal::Number(x)),
                Err(_) => return Err(self.error_at(token, "Invalid number literal.")),
            },
            TokenKind::String => Expression::Literal(Literal::String(token.text.clone())),
            TokenKind::Identifier => Expression::Identifier(token.text.clone()),
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.expression()?;
                self.consume(TokenKind::RightParen, "Expected ')' after expression.")?;
                return Ok(expr);
            }
            TokenKind::Unknown if token.text.starts_with(|c: char| c == '"' || c == '\'') => {
                return Err(self.error_at(token, "Unterminated string literal."));
            }
            TokenKind::Unknown => return Err(self.error_at(token, "Unexpected character.")),
            _ => return Err(self.error_at(token, "Expected expression.")),
        };
        self.advance();
        Ok(expr)
    }
    fn synchronize(&mut self) {
        self.advance();
        while !self.is_at_end() {
            if let TokenKind::Semicolon = self.previous().kind {
                return;
            }
            match self.peek().kind {
                TokenKind::Class
                | TokenKind::Function
                | TokenKind::Var
                | TokenKind::Let
                | TokenKind::Const
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Return
                | TokenKind::RightBrace => {
                    debug!(
                        line = self.peek().line,
                        column = self.peek().column,
                        "resuming after parse error"
                    );
                    return;
                }
                _ => (),
            }
            self.advance();
        }
    }
    fn consume(&mut self, kind: TokenKind, message: &str) -> ParseResult<&'a Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error_at(self.peek(), message))
        }
    }
    fn matches(&mut self, kinds: &[TokenKind]) -> bool {
        if kinds.iter().any(|kind| self.check(*kind)) {
            self.advance();
            true
        } else {
            false
        }
    }
    fn check(&self, kind: TokenKind) -> bool {
        !self.is_at_end() && self.peek().kind == kind
    }
    fn advance(&mut self) -> &'a Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }
    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }
    fn peek(&self) -> &'a Token {
        self.tokens.get(self.current).unwrap_or(&EOF)
    }
    fn previous(&self) -> &'a Token {
        self.tokens
            .get(self.current.saturating_sub(1))
            .unwrap_or(&EOF)
    }
    fn error_at(&self, token: &Token, message: &str) -> ParseError {
        let lexeme = match token.kind {
            TokenKind::Eof => String::from("end of input"),
            _ => token.text.clone(),
        };
        ParseError {
            line: token.line,
            column: token.column,
            lexeme,
            message: message.to_string(),
        }
    }
}

fn binary(left: Expression, operator: BinaryOperator, right: Expression) -> Expression {
    Expression::Binary {
        left: Box::new(left),
        operator,
        right: Box::new(right),
    }
}

#[cfg(test)]
mod parser_tests {
    use crate::ast::{AstPrinter, Statement};
    use crate::lexer::tokenize;
    use crate::parser::parse;
    use pretty_assertions::assert_eq;

    fn print(source: &str) -> Vec<String> {
        let tokens = tokenize(source);
        let (statements, errors) = parse(&tokens);
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
        let mut printer = AstPrinter {};
        statements.iter().map(|s| printer.print(s)).collect()
    }

    #[test]
    fn multiplication_binds_tighter() {
        assert_eq!(print("1 + 2 * 3;"), vec!["(expr (+ 1 (* 2 3)))"]);
        assert_eq!(print("(1 + 2) * 3;"), vec!["(expr (* (+ 1 2) 3))"]);
        assert_eq!(print("1 - 2 - 3;"), vec!["(expr (- (- 1 2) 3))"]);
    }

    #[test]
    fn precedence_ladder() {
        assert_eq!(
            print("a = b || c && d == e < f + g * -h;"),
            vec!["(expr (= a (|| b (&& c (== d (< e (+ f (* g (- h)))))))))"]
        );
    }

    #[test]
    fn assignment_is_right_associative() {
        assert_eq!(print("a = b = 1;"), vec!["(expr (= a (= b 1)))"]);
    }

    #[test]
    fn compound_assignment_desugars() {
        assert_eq!(print("x += 2;"), vec!["(expr (= x (+ x 2)))"]);
        assert_eq!(print("x %= 2;"), vec!["(expr (= x (% x 2)))"]);
    }

    #[test]
    fn calls_and_properties_chain() {
        assert_eq!(
            print("Array.create(1, 2).push(3);"),
            vec!["(expr (call (. (call (. Array create) 1 2) push) 3))"]
        );
    }

    #[test]
    fn for_loop_desugars_to_while() {
        assert_eq!(
            print("for (let i = 0; i < 3; i += 1) { f(i); }"),
            vec!["(block (let i 0) (while (< i 3) (block (expr (call f i))) (= i (+ i 1))))"]
        );
        assert_eq!(print("for (;;) break;"), vec!["(while true (break))"]);
    }

    #[test]
    fn function_declaration_keeps_annotations() {
        let tokens = tokenize("function add(a: number, b): number { return a + b; }");
        let (statements, errors) = parse(&tokens);
        assert!(errors.is_empty());
        match &statements[0] {
            Statement::Function(declaration) => {
                assert_eq!(declaration.name, "add");
                assert_eq!(declaration.parameters.len(), 2);
                assert_eq!(
                    declaration.parameters[0].type_name.as_deref(),
                    Some("number")
                );
                assert_eq!(declaration.parameters[1].type_name, None);
                assert_eq!(declaration.return_type.as_deref(), Some("number"));
                assert_eq!(declaration.body.len(), 1);
            }
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn declarations_record_constness() {
        assert_eq!(
            print("const x = 5; let y: number; var z = 1;"),
            vec!["(const x 5)", "(let y)", "(let z 1)"]
        );
    }

    #[test]
    fn end_to_end_statement_count() {
        let tokens = tokenize("const x = 5; let y = 2; y = 3; x + y;");
        let (statements, errors) = parse(&tokens);
        assert!(errors.is_empty());
        assert_eq!(statements.len(), 4);
    }

    #[test]
    fn recovers_at_statement_boundary() {
        let tokens = tokenize("let a = 1; let = 2; let b = a + ; let c = 3;");
        let (statements, errors) = parse(&tokens);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].message, "Expected variable name.");
        assert_eq!((errors[0].line, errors[0].column), (1, 16));
        assert_eq!(errors[0].lexeme, "=");
        let mut printer = AstPrinter {};
        let printed: Vec<String> = statements.iter().map(|s| printer.print(s)).collect();
        assert_eq!(printed, vec!["(let a 1)", "(let c 3)"]);
    }

    #[test]
    fn recovery_inside_nested_bodies() {
        let tokens =
            tokenize("function f() { let = 1; return 2; } { let x = ; let y = 3; } let z = 4;");
        let (statements, errors) = parse(&tokens);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].message, "Expected variable name.");
        let mut printer = AstPrinter {};
        let printed: Vec<String> = statements.iter().map(|s| printer.print(s)).collect();
        assert_eq!(
            printed,
            vec!["(function f () (return 2))", "(block (let y 3))", "(let z 4)"]
        );
    }

    #[test]
    fn invalid_assignment_target() {
        let tokens = tokenize("1 = 2; f() = 3;");
        let (statements, errors) = parse(&tokens);
        assert!(statements.is_empty());
        assert_eq!(errors.len(), 2);
        assert!(errors
            .iter()
            .all(|e| e.message == "Invalid assignment target."));
    }

    #[test]
    fn unknown_tokens_become_parse_errors() {
        let tokens = tokenize("let a = #; let b = 'open");
        let (statements, errors) = parse(&tokens);
        assert!(statements.is_empty());
        assert_eq!(errors[0].message, "Unexpected character.");
        assert_eq!(errors[1].message, "Unterminated string literal.");
    }

    #[test]
    fn break_outside_loop_is_rejected() {
        let tokens = tokenize("break; while (true) { function f() { continue; } break; }");
        let (_, errors) = parse(&tokens);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].message, "Cannot use 'break' outside of a loop.");
        assert_eq!(errors[1].message, "Cannot use 'continue' outside of a loop.");
    }

    #[test]
    fn missing_semicolon_reports_end_of_input() {
        let tokens = tokenize("x + 1");
        let (_, errors) = parse(&tokens);
        assert_eq!(
            errors[0].to_string(),
            "[line 1, column 6] Error at 'end of input': Expected ';' after expression."
        );
    }
}
