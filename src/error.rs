use thiserror::Error;

/// Failures raised while executing a program. None of these are caught inside
/// the interpreter; they unwind to `Interpreter::interpret`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("Undefined variable '{0}'.")]
    UndefinedVariable(String),
    #[error("Variable '{0}' is already defined in this scope.")]
    DuplicateDefinition(String),
    #[error("Cannot assign to constant '{0}'.")]
    ConstViolation(String),
    #[error("Type mismatch: expected {expected}, found {found}.")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("Division by zero.")]
    DivisionByZero,
    #[error("Value of type {0} is not callable.")]
    NotCallable(&'static str),
    #[error("Undefined property '{0}'.")]
    UndefinedProperty(String),
    #[error("Method '{method}' not found on {class}.")]
    MethodNotFound { class: String, method: String },
    #[error("{name}() expects {expected} argument(s) but got {found}.")]
    ArityMismatch {
        name: String,
        expected: String,
        found: usize,
    },
    #[error("Index {index} out of bounds for length {length}.")]
    IndexOutOfBounds { index: f64, length: usize },
    #[error("Maximum call depth of {0} exceeded.")]
    StackOverflow(usize),
    #[error("Cannot write output: {0}")]
    Output(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RuntimeError {
    pub fn type_mismatch(expected: &'static str, found: &'static str) -> RuntimeError {
        RuntimeError::TypeMismatch { expected, found }
    }
    pub fn arity(name: &str, expected: impl ToString, found: usize) -> RuntimeError {
        RuntimeError::ArityMismatch {
            name: name.to_string(),
            expected: expected.to_string(),
            found,
        }
    }
}
