use crate::ast::{
    BinaryOperator, Expression, LogicalOperator, Statement, UnaryOperator, Visitor,
};
use crate::builtins;
use crate::callable::Function;
use crate::environment::Environment;
use crate::error::RuntimeError;
use crate::stack::ensure_sufficient_stack;
use crate::value::Value;
use std::io::{self, Write};
use tracing::{debug, error, trace};

pub const DEFAULT_MAX_CALL_DEPTH: usize = 200;

/// How a statement finished. Anything other than `Normal` unwinds enclosing
/// statements until a loop or function body consumes it.
#[derive(Debug, Clone)]
pub enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

type EvalResult = Result<Value, RuntimeError>;
type ExecResult = Result<Flow, RuntimeError>;

pub struct Interpreter {
    globals: Environment,
    environment: Environment,
    last_value: Value,
    output: Box<dyn Write>,
    echo: bool,
    call_depth: usize,
    max_call_depth: usize,
}

impl Visitor<Expression, EvalResult> for Interpreter {
    fn visit(&mut self, expr: &Expression) -> EvalResult {
        match expr {
            Expression::Literal(x) => Ok(Value::from(x)),
            Expression::Identifier(name) => self.environment.get(name),
            Expression::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                binary(*operator, &left, &right)
            }
            Expression::Unary { operator, right } => {
                let right = self.evaluate(right)?;
                match operator {
                    UnaryOperator::Negate => Ok(Value::Number(-right.as_number()?)),
                    UnaryOperator::Not => Ok(Value::Bool(!right.is_truthy())),
                }
            }
            Expression::Assignment { name, value } => {
                let value = self.evaluate(value)?;
                self.environment.assign(name, value.clone())?;
                Ok(value)
            }
            Expression::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?.is_truthy();
                let result = match operator {
                    LogicalOperator::Or => left || self.evaluate(right)?.is_truthy(),
                    LogicalOperator::And => left && self.evaluate(right)?.is_truthy(),
                };
                Ok(Value::Bool(result))
            }
            Expression::Call { callee, arguments } => {
                // `receiver.name(...)` dispatches through the receiver's class.
                let (callee, method) = match &**callee {
                    Expression::PropertyGet { object, name } => {
                        (self.evaluate(object)?, Some(name))
                    }
                    callee => (self.evaluate(callee)?, None),
                };
                let mut args = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    args.push(self.evaluate(argument)?);
                }
                match method {
                    Some(name) => self.call_method(&callee, name, &args),
                    None => self.call_function(&callee, &args),
                }
            }
            Expression::PropertyGet { object, name } => {
                let object = self.evaluate(object)?;
                property(&object, name)
            }
        }
    }
}

impl Visitor<Statement, ExecResult> for Interpreter {
    fn visit(&mut self, stmt: &Statement) -> ExecResult {
        match stmt {
            Statement::Expression(expr) => {
                self.last_value = self.evaluate(expr)?;
                Ok(Flow::Normal)
            }
            Statement::VariableDeclaration {
                name,
                initializer,
                is_const,
                ..
            } => {
                let value = match initializer {
                    Some(initializer) => self.evaluate(initializer)?,
                    None => Value::Null,
                };
                self.environment.define(name, value, *is_const)?;
                Ok(Flow::Normal)
            }
            Statement::Block(statements) => {
                let environment = self.environment.new_child();
                self.execute_block(statements, environment)
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Statement::While {
                condition,
                body,
                increment,
            } => {
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute(body)? {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal | Flow::Continue => {}
                    }
                    if let Some(increment) = increment {
                        self.evaluate(increment)?;
                    }
                }
                Ok(Flow::Normal)
            }
            Statement::Return(value) => {
                let value = match value {
                    Some(value) => self.evaluate(value)?,
                    None => Value::Null,
                };
                Ok(Flow::Return(value))
            }
            Statement::Break => Ok(Flow::Break),
            Statement::Continue => Ok(Flow::Continue),
            Statement::Function(declaration) => {
                let function = Function::declared(declaration.clone(), self.environment.clone());
                self.environment
                    .define(&declaration.name, Value::Function(function), false)?;
                Ok(Flow::Normal)
            }
        }
    }
}

impl Interpreter {
    pub fn new() -> Interpreter {
        Interpreter::with_output(Box::new(io::stdout()))
    }

    /// An interpreter whose `print` output goes to `output`.
    pub fn with_output(output: Box<dyn Write>) -> Interpreter {
        let mut globals = Environment::new();
        builtins::register(&mut globals);
        Interpreter {
            environment: globals.clone(),
            globals,
            last_value: Value::Null,
            output,
            echo: false,
            call_depth: 0,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }

    /// Writes the value of every top-level expression statement to the output.
    pub fn set_echo(&mut self, echo: bool) {
        self.echo = echo;
    }

    pub fn set_max_call_depth(&mut self, depth: usize) {
        self.max_call_depth = depth;
    }

    pub fn globals(&self) -> &Environment {
        &self.globals
    }

    /// The value most recently produced by an expression statement or a
    /// top-level `return`.
    pub fn last_value(&self) -> &Value {
        &self.last_value
    }

    /// Runs `statements` in order against the global scope, stopping at the
    /// first runtime error. Effects of earlier statements persist.
    pub fn interpret(&mut self, statements: &[Statement]) -> Result<(), RuntimeError> {
        for statement in statements {
            match self.execute(statement) {
                Ok(Flow::Return(value)) => self.last_value = value,
                Ok(_) => {}
                Err(e) => {
                    error!(error = %e, "runtime error");
                    return Err(e);
                }
            }
            if self.echo {
                if let Statement::Expression(_) = statement {
                    let line = self.last_value.to_string();
                    self.write_line(&line)?;
                }
            }
        }
        Ok(())
    }

    /// Calls `callee` with already evaluated arguments.
    pub fn call_function(&mut self, callee: &Value, arguments: &[Value]) -> EvalResult {
        match callee {
            Value::Function(function) => function.call(self, arguments),
            other => Err(RuntimeError::NotCallable(other.type_name())),
        }
    }

    /// Calls the method `name` on `receiver`. Fields and static properties
    /// are called like any other value; anything else goes to the class's
    /// method table, failing with `MethodNotFound`.
    pub fn call_method(
        &mut self,
        receiver: &Value,
        name: &str,
        arguments: &[Value],
    ) -> EvalResult {
        match receiver {
            Value::Object(object) => match object.field(name) {
                Some(field) => self.call_function(&field, arguments),
                None => object
                    .class()
                    .invoke_method(self, name, object, arguments),
            },
            Value::Class(class) => match class.static_properties().get(name) {
                Some(property) => self.call_function(property, arguments),
                None => class.invoke_static(self, name, arguments),
            },
            other => {
                let callee = property(other, name)?;
                self.call_function(&callee, arguments)
            }
        }
    }

    pub(crate) fn write_line(&mut self, line: &str) -> Result<(), RuntimeError> {
        writeln!(self.output, "{}", line).map_err(|e| RuntimeError::Output(e.to_string()))
    }

    fn evaluate(&mut self, expr: &Expression) -> EvalResult {
        ensure_sufficient_stack(|| expr.accept(self))
    }

    fn execute(&mut self, stmt: &Statement) -> ExecResult {
        ensure_sufficient_stack(|| stmt.accept(self))
    }

    /// Runs `statements` in `environment`, restoring the previous scope
    /// afterwards whether or not they succeed.
    pub(crate) fn execute_block(
        &mut self,
        statements: &[Statement],
        environment: Environment,
    ) -> ExecResult {
        let previous = std::mem::replace(&mut self.environment, environment);
        let mut result = Ok(Flow::Normal);
        for statement in statements {
            match self.execute(statement) {
                Ok(Flow::Normal) => {}
                other => {
                    result = other;
                    break;
                }
            }
        }
        self.environment = previous;
        result
    }

    /// Runs a function body, enforcing the call depth limit.
    pub(crate) fn execute_body(
        &mut self,
        body: &[Statement],
        environment: Environment,
    ) -> ExecResult {
        if self.call_depth >= self.max_call_depth {
            debug!(depth = self.call_depth, "call depth exceeded");
            return Err(RuntimeError::StackOverflow(self.max_call_depth));
        }
        self.call_depth += 1;
        trace!(depth = self.call_depth, "enter function");
        let result = self.execute_block(body, environment);
        self.call_depth -= 1;
        result
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new()
    }
}

fn property(object: &Value, name: &str) -> EvalResult {
    match object {
        Value::Class(class) => class.get(name),
        Value::Function(function) => function.get(name),
        Value::Object(object) => object.get(name),
        _ => Err(RuntimeError::UndefinedProperty(name.to_string())),
    }
}

fn binary(operator: BinaryOperator, left: &Value, right: &Value) -> EvalResult {
    match operator {
        BinaryOperator::Equal | BinaryOperator::StrictEqual => {
            return Ok(Value::Bool(left.equals(right)))
        }
        BinaryOperator::NotEqual | BinaryOperator::StrictNotEqual => {
            return Ok(Value::Bool(!left.equals(right)))
        }
        BinaryOperator::Divide | BinaryOperator::Modulo => {
            if let Value::Number(x) = right {
                if *x == 0.0 {
                    return Err(RuntimeError::DivisionByZero);
                }
            }
        }
        _ => {}
    }
    let l = left.as_number()?;
    let r = right.as_number()?;
    Ok(match operator {
        BinaryOperator::Add => Value::Number(l + r),
        BinaryOperator::Subtract => Value::Number(l - r),
        BinaryOperator::Multiply => Value::Number(l * r),
        BinaryOperator::Divide => Value::Number(l / r),
        BinaryOperator::Modulo => Value::Number(l % r),
        BinaryOperator::Less => Value::Bool(l < r),
        BinaryOperator::LessEqual => Value::Bool(l <= r),
        BinaryOperator::Greater => Value::Bool(l > r),
        BinaryOperator::GreaterEqual => Value::Bool(l >= r),
        BinaryOperator::Equal
        | BinaryOperator::NotEqual
        | BinaryOperator::StrictEqual
        | BinaryOperator::StrictNotEqual => {
            return Err(RuntimeError::Internal(format!(
                "unhandled operator {}",
                operator
            )))
        }
    })
}

#[cfg(test)]
mod tests {
    use crate::builtins::array_class;
    use crate::error::RuntimeError;
    use crate::instance::Object;
    use crate::interpreter::Interpreter;
    use crate::lexer::tokenize;
    use crate::parser::parse;
    use crate::value::Value;

    fn run(source: &str) -> (Interpreter, Result<(), RuntimeError>) {
        let (statements, errors) = parse(&tokenize(source));
        assert!(errors.is_empty(), "{:?}", errors);
        let mut interpreter = Interpreter::with_output(Box::new(Vec::new()));
        let result = interpreter.interpret(&statements);
        (interpreter, result)
    }

    fn eval(source: &str) -> Value {
        let (interpreter, result) = run(source);
        result.unwrap();
        interpreter.last_value().clone()
    }

    fn fails(source: &str) -> RuntimeError {
        run(source).1.unwrap_err()
    }

    #[test]
    fn arithmetic() {
        assert_eq!(eval("1 + 2 * 3;").as_number().unwrap(), 7.0);
        assert_eq!(eval("(1 + 2) * 3;").as_number().unwrap(), 9.0);
        assert_eq!(eval("7 % 3;").as_number().unwrap(), 1.0);
        assert_eq!(eval("-(2 - 5);").as_number().unwrap(), 3.0);
        assert_eq!(eval("10 / 4;").as_number().unwrap(), 2.5);
    }

    #[test]
    fn comparisons_and_equality() {
        assert!(eval("1 < 2;").as_bool().unwrap());
        assert!(eval("2 >= 2;").as_bool().unwrap());
        assert!(eval("\"a\" == \"a\";").as_bool().unwrap());
        assert!(!eval("1 == \"1\";").as_bool().unwrap());
        assert!(eval("null === null;").as_bool().unwrap());
        assert!(eval("true !== false;").as_bool().unwrap());
        assert!(!eval("Array == Array;").as_bool().unwrap());
    }

    #[test]
    fn division_by_zero() {
        assert_eq!(fails("1 / 0;"), RuntimeError::DivisionByZero);
        assert_eq!(fails("1 % 0;"), RuntimeError::DivisionByZero);
        assert_eq!(fails("\"a\" / 0;"), RuntimeError::DivisionByZero);
    }

    #[test]
    fn arithmetic_needs_numbers() {
        assert_eq!(
            fails("\"a\" + \"b\";"),
            RuntimeError::type_mismatch("number", "string")
        );
        assert_eq!(
            fails("-true;"),
            RuntimeError::type_mismatch("number", "bool")
        );
        assert_eq!(
            fails("1 < null;"),
            RuntimeError::type_mismatch("number", "null")
        );
    }

    #[test]
    fn logical_operators_short_circuit() {
        let (interpreter, result) = run("let hits = 0;
            function hit() { hits = hits + 1; return true; }
            false && hit();
            true || hit();
            let a = 1 && \"x\";
            let b = 0 || \"\";");
        result.unwrap();
        let globals = interpreter.globals();
        assert_eq!(globals.get("hits").unwrap().as_number().unwrap(), 0.0);
        assert!(globals.get("a").unwrap().as_bool().unwrap());
        assert!(!globals.get("b").unwrap().as_bool().unwrap());
    }

    #[test]
    fn undefined_and_not_callable() {
        assert_eq!(
            fails("missing;"),
            RuntimeError::UndefinedVariable("missing".to_string())
        );
        assert_eq!(fails("let x = 1; x();"), RuntimeError::NotCallable("number"));
        assert_eq!(
            fails("let x = 1; let x = 2;"),
            RuntimeError::DuplicateDefinition("x".to_string())
        );
    }

    #[test]
    fn arity_mismatch() {
        assert_eq!(
            fails("function f(a, b) { return a; } f(1);"),
            RuntimeError::arity("f", 2, 1)
        );
    }

    #[test]
    fn return_unwinds_loops() {
        let value = eval(
            "function first_over(limit) {
                 for (let i = 0; i < 100; i += 1) {
                     if (i * i > limit) { return i; }
                 }
                 return -1;
             }
             first_over(50);",
        );
        assert_eq!(value.as_number().unwrap(), 8.0);
    }

    #[test]
    fn function_without_return_yields_null() {
        assert!(eval("function f() { 1; } f();").is_null());
        assert!(eval("function f() { return; } f();").is_null());
    }

    #[test]
    fn continue_runs_increment() {
        let (interpreter, result) = run("let sum = 0;
            for (let i = 0; i < 10; i += 1) {
                if (i % 2 == 0) { continue; }
                if (i > 7) { break; }
                sum += i;
            }");
        result.unwrap();
        // 1 + 3 + 5 + 7
        assert_eq!(
            interpreter.globals().get("sum").unwrap().as_number().unwrap(),
            16.0
        );
    }

    #[test]
    fn call_depth_is_limited() {
        let (statements, _) = parse(&tokenize("function f(n) { return f(n + 1); } f(0);"));
        let mut interpreter = Interpreter::with_output(Box::new(Vec::new()));
        interpreter.set_max_call_depth(25);
        assert_eq!(
            interpreter.interpret(&statements).unwrap_err(),
            RuntimeError::StackOverflow(25)
        );
        // The scope chain is restored after unwinding.
        let (statements, _) = parse(&tokenize("let after = 1;"));
        interpreter.interpret(&statements).unwrap();
        assert!(interpreter.globals().get("after").is_ok());
    }

    #[test]
    fn top_level_return_records_value() {
        let (interpreter, result) = run("return 5; let after = 1;");
        result.unwrap();
        assert_eq!(interpreter.last_value().as_number().unwrap(), 5.0);
        assert!(interpreter.globals().get("after").is_ok());
    }

    #[test]
    fn property_access() {
        assert_eq!(eval("Array.name;").as_str().unwrap(), "Array");
        assert_eq!(eval("function f(a, b) {} f.arity;").as_number().unwrap(), 2.0);
        assert_eq!(eval("print.name;").as_str().unwrap(), "print");
        assert_eq!(eval("Array.create(1, 2).length();").as_number().unwrap(), 2.0);
        assert_eq!(
            fails("Array.create().size;"),
            RuntimeError::UndefinedProperty("size".to_string())
        );
        assert_eq!(
            fails("let n = 1; n.name;"),
            RuntimeError::UndefinedProperty("name".to_string())
        );
        assert_eq!(
            fails("let n = 1; n.name();"),
            RuntimeError::UndefinedProperty("name".to_string())
        );
    }

    #[test]
    fn bound_methods_expose_arity() {
        assert_eq!(eval("Array.create().push.arity;").as_number().unwrap(), 1.0);
        assert_eq!(eval("Array.create().set.arity;").as_number().unwrap(), 2.0);
        assert_eq!(eval("Array.create.arity;").as_number().unwrap(), 0.0);
        assert_eq!(eval("Array.create().pop.name;").as_str().unwrap(), "pop");
    }

    #[test]
    fn unknown_methods_are_reported() {
        assert_eq!(
            fails("Array.create(1).missing(2);"),
            RuntimeError::MethodNotFound {
                class: "Array".to_string(),
                method: "missing".to_string()
            }
        );
        assert_eq!(
            fails("Array.build();"),
            RuntimeError::MethodNotFound {
                class: "Array".to_string(),
                method: "build".to_string()
            }
        );
        assert_eq!(fails("Array.name();"), RuntimeError::NotCallable("string"));
    }

    #[test]
    fn fields_shadow_methods_in_calls() {
        let mut interpreter = Interpreter::with_output(Box::new(Vec::new()));
        let object = Object::array(array_class(), Vec::new());
        object.set("push", Value::Number(1.0));
        assert_eq!(
            interpreter
                .call_method(&Value::Object(object), "push", &[])
                .unwrap_err(),
            RuntimeError::NotCallable("number")
        );
    }

    #[test]
    fn function_bindings_can_be_reassigned() {
        let (interpreter, result) = run(
            "function g() { return 1; } g = 2; \
             function outer() { function inner() {} inner = 3; return inner; } \
             let r = outer();",
        );
        result.unwrap();
        let globals = interpreter.globals();
        assert_eq!(globals.get("g").unwrap().as_number().unwrap(), 2.0);
        assert_eq!(globals.get("r").unwrap().as_number().unwrap(), 3.0);
    }
}
