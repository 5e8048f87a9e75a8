use crate::ast::Literal;
use crate::callable::Function;
use crate::class::Class;
use crate::error::RuntimeError;
use crate::instance::Object;
use std::fmt;

/// Nesting beyond this prints as `[...]`, which also cuts off arrays that
/// contain themselves.
const MAX_DISPLAY_DEPTH: usize = 16;

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Function(Function),
    Class(Class),
    Object(Object),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Function(_) => "function",
            Value::Class(_) => "class",
            Value::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
    pub fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }
    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }
    pub fn is_function(&self) -> bool {
        matches!(self, Value::Function(_))
    }
    pub fn is_class(&self) -> bool {
        matches!(self, Value::Class(_))
    }
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    pub fn as_bool(&self) -> Result<bool, RuntimeError> {
        match self {
            Value::Bool(x) => Ok(*x),
            _ => Err(RuntimeError::type_mismatch("bool", self.type_name())),
        }
    }
    pub fn as_number(&self) -> Result<f64, RuntimeError> {
        match self {
            Value::Number(x) => Ok(*x),
            _ => Err(RuntimeError::type_mismatch("number", self.type_name())),
        }
    }
    pub fn as_str(&self) -> Result<&str, RuntimeError> {
        match self {
            Value::String(x) => Ok(x),
            _ => Err(RuntimeError::type_mismatch("string", self.type_name())),
        }
    }
    pub fn as_function(&self) -> Result<&Function, RuntimeError> {
        match self {
            Value::Function(x) => Ok(x),
            _ => Err(RuntimeError::type_mismatch("function", self.type_name())),
        }
    }
    pub fn as_class(&self) -> Result<&Class, RuntimeError> {
        match self {
            Value::Class(x) => Ok(x),
            _ => Err(RuntimeError::type_mismatch("class", self.type_name())),
        }
    }
    pub fn as_object(&self) -> Result<&Object, RuntimeError> {
        match self {
            Value::Object(x) => Ok(x),
            _ => Err(RuntimeError::type_mismatch("object", self.type_name())),
        }
    }

    /// `false`, `null`, `0`, `""` and every function, class or object are
    /// falsy. NaN is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(x) => *x,
            Value::Number(x) => *x != 0.0,
            Value::String(x) => !x.is_empty(),
            Value::Null | Value::Function(_) | Value::Class(_) | Value::Object(_) => false,
        }
    }

    /// Equal only when both sides carry the same scalar tag and payload.
    /// Reference values never compare equal, not even to themselves.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            _ => false,
        }
    }

    fn render(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(x) => write!(f, "{}", x),
            Value::Number(x) => write!(f, "{}", x),
            Value::String(x) => write!(f, "{}", x),
            Value::Function(x) => write!(f, "{}", x),
            Value::Class(x) => write!(f, "{}", x),
            Value::Object(object) => match object.elements() {
                Some(_) if depth >= MAX_DISPLAY_DEPTH => write!(f, "[...]"),
                Some(elements) => {
                    write!(f, "[")?;
                    for (i, element) in elements.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        element.render(f, depth + 1)?;
                    }
                    write!(f, "]")
                }
                None => write!(f, "{}", object),
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, 0)
    }
}

impl From<&Literal> for Value {
    fn from(literal: &Literal) -> Value {
        match literal {
            Literal::Null => Value::Null,
            Literal::Bool(x) => Value::Bool(*x),
            Literal::Number(x) => Value::Number(*x),
            Literal::String(x) => Value::String(x.clone()),
        }
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Value {
        Value::Number(x)
    }
}

impl From<bool> for Value {
    fn from(x: bool) -> Value {
        Value::Bool(x)
    }
}

impl From<&str> for Value {
    fn from(x: &str) -> Value {
        Value::String(x.to_string())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::RuntimeError;
    use crate::value::Value;

    #[test]
    fn truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(!Value::Number(0.0).is_truthy());
        assert!(!Value::Number(-0.0).is_truthy());
        assert!(Value::Number(-1.5).is_truthy());
        assert!(Value::Number(f64::NAN).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(Value::from("0").is_truthy());
    }

    #[test]
    fn equality_requires_matching_tags() {
        assert!(Value::Null.equals(&Value::Null));
        assert!(Value::from(1.0).equals(&Value::from(1.0)));
        assert!(Value::from("a").equals(&Value::from("a")));
        assert!(!Value::from(1.0).equals(&Value::from("1")));
        assert!(!Value::from(0.0).equals(&Value::Bool(false)));
        assert!(!Value::Null.equals(&Value::Bool(false)));
        assert!(!Value::Number(f64::NAN).equals(&Value::Number(f64::NAN)));
    }

    #[test]
    fn accessors_report_mismatch() {
        assert_eq!(Value::from(2.5).as_number().unwrap(), 2.5);
        assert_eq!(
            Value::from("x").as_number().unwrap_err(),
            RuntimeError::type_mismatch("number", "string")
        );
        assert_eq!(
            Value::Null.as_object().unwrap_err(),
            RuntimeError::type_mismatch("object", "null")
        );
        assert!(Value::Bool(true).is_bool());
        assert!(Value::Null.is_null());
        assert!(!Value::Null.is_number());
    }

    #[test]
    fn display_formats() {
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::from(8.0).to_string(), "8");
        assert_eq!(Value::from(2.5).to_string(), "2.5");
        assert_eq!(Value::from(true).to_string(), "true");
        assert_eq!(Value::from("hi").to_string(), "hi");
    }
}
