use crate::stack::ensure_sufficient_stack;
use std::fmt;
use std::mem;
use std::rc::Rc;
use strum_macros::Display;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => write!(f, "null"),
            Literal::Bool(x) => write!(f, "{}", x),
            Literal::Number(x) => write!(f, "{}", x),
            Literal::String(x) => write!(f, "{:?}", x),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum BinaryOperator {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Subtract,
    #[strum(serialize = "*")]
    Multiply,
    #[strum(serialize = "/")]
    Divide,
    #[strum(serialize = "%")]
    Modulo,
    #[strum(serialize = "==")]
    Equal,
    #[strum(serialize = "!=")]
    NotEqual,
    #[strum(serialize = "===")]
    StrictEqual,
    #[strum(serialize = "!==")]
    StrictNotEqual,
    #[strum(serialize = "<")]
    Less,
    #[strum(serialize = "<=")]
    LessEqual,
    #[strum(serialize = ">")]
    Greater,
    #[strum(serialize = ">=")]
    GreaterEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum UnaryOperator {
    #[strum(serialize = "-")]
    Negate,
    #[strum(serialize = "!")]
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum LogicalOperator {
    #[strum(serialize = "&&")]
    And,
    #[strum(serialize = "||")]
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Literal),
    Identifier(String),
    Binary {
        left: Box<Expression>,
        operator: BinaryOperator,
        right: Box<Expression>,
    },
    Unary {
        operator: UnaryOperator,
        right: Box<Expression>,
    },
    Assignment {
        name: String,
        value: Box<Expression>,
    },
    Logical {
        left: Box<Expression>,
        operator: LogicalOperator,
        right: Box<Expression>,
    },
    Call {
        callee: Box<Expression>,
        arguments: Vec<Expression>,
    },
    PropertyGet {
        object: Box<Expression>,
        name: String,
    },
}

pub trait Visitor<T, Output> {
    fn visit(&mut self, n: &T) -> Output;
}

impl Expression {
    pub fn accept<T, V: Visitor<Expression, T> + ?Sized>(&self, v: &mut V) -> T {
        v.visit(self)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    /// Annotation text after `:`; recorded, never checked.
    pub type_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDeclaration {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub return_type: Option<String>,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Expression(Expression),
    VariableDeclaration {
        name: String,
        type_name: Option<String>,
        initializer: Option<Expression>,
        is_const: bool,
    },
    Block(Vec<Statement>),
    If {
        condition: Expression,
        then_branch: Box<Statement>,
        else_branch: Option<Box<Statement>>,
    },
    /// `increment` is the trailing clause of a desugared `for` loop. It runs
    /// after every pass through `body`, including passes cut short by
    /// `continue`.
    While {
        condition: Expression,
        body: Box<Statement>,
        increment: Option<Expression>,
    },
    Return(Option<Expression>),
    Break,
    Continue,
    // Shared so function values can keep their declaration alive.
    Function(Rc<FunctionDeclaration>),
}

impl Statement {
    pub fn accept<T, V: Visitor<Statement, T> + ?Sized>(&self, v: &mut V) -> T {
        v.visit(self)
    }
}

// Trees nest as deep as the source does, so children are freed on a stack
// that grows on demand rather than through plain recursive drop glue.
impl Drop for Expression {
    fn drop(&mut self) {
        let mut children = Vec::new();
        match self {
            Expression::Literal(_) | Expression::Identifier(_) => return,
            Expression::Binary { left, right, .. } | Expression::Logical { left, right, .. } => {
                children.push(take_expression(left));
                children.push(take_expression(right));
            }
            Expression::Unary { right, .. } => children.push(take_expression(right)),
            Expression::Assignment { value, .. } => children.push(take_expression(value)),
            Expression::Call { callee, arguments } => {
                children.push(take_expression(callee));
                children.append(arguments);
            }
            Expression::PropertyGet { object, .. } => children.push(take_expression(object)),
        }
        ensure_sufficient_stack(move || drop(children));
    }
}

impl Drop for Statement {
    fn drop(&mut self) {
        let mut children = Vec::new();
        match self {
            Statement::Block(statements) => children.append(statements),
            Statement::If {
                then_branch,
                else_branch,
                ..
            } => {
                children.push(take_statement(then_branch));
                if let Some(else_branch) = else_branch.take() {
                    children.push(*else_branch);
                }
            }
            Statement::While { body, .. } => children.push(take_statement(body)),
            _ => {}
        }
        // Expressions held directly check the stack in their own drop.
        ensure_sufficient_stack(move || drop(children));
    }
}

fn take_expression(slot: &mut Box<Expression>) -> Expression {
    *mem::replace(slot, Box::new(Expression::Literal(Literal::Null)))
}

fn take_statement(slot: &mut Box<Statement>) -> Statement {
    *mem::replace(slot, Box::new(Statement::Break))
}

/// Renders a tree as nested prefix forms, e.g. `(+ 1 (* 2 3))`.
pub struct AstPrinter {}

impl AstPrinter {
    pub fn print(&mut self, statement: &Statement) -> String {
        statement.accept(self)
    }
    fn expr(&mut self, expression: &Expression) -> String {
        expression.accept(self)
    }
    fn parenthesize(&mut self, name: &str, args: Vec<&Expression>) -> String {
        let mut x = String::from("(");
        x.push_str(name);
        for arg in args {
            x.push_str(" ");
            x.push_str(self.expr(arg).as_str());
        }
        x.push_str(")");
        x
    }
    fn block(&mut self, name: &str, statements: &[Statement]) -> String {
        let mut x = String::from("(");
        x.push_str(name);
        for statement in statements {
            x.push_str(" ");
            x.push_str(self.print(statement).as_str());
        }
        x.push_str(")");
        x
    }
}

impl Visitor<Expression, String> for AstPrinter {
    fn visit(&mut self, n: &Expression) -> String {
        match n {
            Expression::Literal(x) => x.to_string(),
            Expression::Identifier(x) => x.clone(),
            Expression::Binary {
                left,
                operator,
                right,
            } => self.parenthesize(&operator.to_string(), vec![&**left, &**right]),
            Expression::Unary { operator, right } => {
                self.parenthesize(&operator.to_string(), vec![&**right])
            }
            Expression::Assignment { name, value } => {
                format!("(= {} {})", name, self.expr(value))
            }
            Expression::Logical {
                left,
                operator,
                right,
            } => self.parenthesize(&operator.to_string(), vec![&**left, &**right]),
            Expression::Call { callee, arguments } => {
                let mut args: Vec<&Expression> = vec![&**callee];
                args.extend(arguments.iter());
                self.parenthesize("call", args)
            }
            Expression::PropertyGet { object, name } => {
                format!("(. {} {})", self.expr(object), name)
            }
        }
    }
}

impl Visitor<Statement, String> for AstPrinter {
    fn visit(&mut self, n: &Statement) -> String {
        match n {
            Statement::Expression(e) => format!("(expr {})", self.expr(e)),
            Statement::VariableDeclaration {
                name,
                initializer,
                is_const,
                ..
            } => {
                let keyword = if *is_const { "const" } else { "let" };
                match initializer {
                    Some(e) => format!("({} {} {})", keyword, name, self.expr(e)),
                    None => format!("({} {})", keyword, name),
                }
            }
            Statement::Block(statements) => self.block("block", statements),
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => match else_branch {
                Some(else_branch) => format!(
                    "(if {} {} {})",
                    self.expr(condition),
                    self.print(then_branch),
                    self.print(else_branch)
                ),
                None => format!("(if {} {})", self.expr(condition), self.print(then_branch)),
            },
            Statement::While {
                condition,
                body,
                increment,
            } => match increment {
                Some(increment) => format!(
                    "(while {} {} {})",
                    self.expr(condition),
                    self.print(body),
                    self.expr(increment)
                ),
                None => format!("(while {} {})", self.expr(condition), self.print(body)),
            },
            Statement::Return(Some(e)) => format!("(return {})", self.expr(e)),
            Statement::Return(None) => String::from("(return)"),
            Statement::Break => String::from("(break)"),
            Statement::Continue => String::from("(continue)"),
            Statement::Function(declaration) => {
                let params: Vec<&str> = declaration
                    .parameters
                    .iter()
                    .map(|p| p.name.as_str())
                    .collect();
                let name = format!("function {} ({})", declaration.name, params.join(" "));
                self.block(&name, &declaration.body)
            }
        }
    }
}
