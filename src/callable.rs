use crate::ast::FunctionDeclaration;
use crate::class::Class;
use crate::environment::Environment;
use crate::error::RuntimeError;
use crate::instance::Object;
use crate::interpreter::{Flow, Interpreter};
use crate::value::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use tracing::debug;

/// Host implementation of a callable. `this` is the receiver for methods and
/// `Value::Null` for free functions.
pub type NativeFn = fn(&mut Interpreter, &Value, &[Value]) -> Result<Value, RuntimeError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl Arity {
    fn check(self, name: &str, found: usize) -> Result<(), RuntimeError> {
        match self {
            Arity::Exactly(n) if found != n => Err(RuntimeError::arity(name, n, found)),
            Arity::AtLeast(n) if found < n => {
                Err(RuntimeError::arity(name, format!("at least {}", n), found))
            }
            _ => Ok(()),
        }
    }
    fn minimum(self) -> usize {
        match self {
            Arity::Exactly(n) | Arity::AtLeast(n) => n,
        }
    }
}

#[derive(Clone, Copy)]
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: Arity,
    pub call: NativeFn,
}

enum FunctionKind {
    Declared {
        declaration: Rc<FunctionDeclaration>,
        closure: Environment,
    },
    Native(NativeFunction),
    Method {
        receiver: Object,
        name: String,
    },
    StaticMethod {
        class: Class,
        name: String,
    },
}

/// A callable value. Every function carries a property table holding at
/// least `name`, readable with `f.name`.
#[derive(Clone)]
pub struct Function {
    data: Rc<FunctionImpl>,
}

struct FunctionImpl {
    kind: FunctionKind,
    properties: BTreeMap<String, Value>,
}

impl Function {
    fn new(kind: FunctionKind, name: &str, arity: Option<usize>) -> Function {
        let mut properties = BTreeMap::new();
        properties.insert("name".to_string(), Value::from(name));
        if let Some(arity) = arity {
            properties.insert("arity".to_string(), Value::Number(arity as f64));
        }
        Function {
            data: Rc::new(FunctionImpl {
                kind,
                properties,
            }),
        }
    }

    pub fn declared(declaration: Rc<FunctionDeclaration>, closure: Environment) -> Function {
        let name = declaration.name.clone();
        let arity = declaration.parameters.len();
        Function::new(
            FunctionKind::Declared {
                declaration,
                closure,
            },
            &name,
            Some(arity),
        )
    }

    pub fn native(native: NativeFunction) -> Function {
        Function::new(
            FunctionKind::Native(native),
            native.name,
            Some(native.arity.minimum()),
        )
    }

    /// An instance method bound to `receiver`, dispatched through its class.
    pub fn method(receiver: Object, name: &str) -> Function {
        let arity = receiver.class().find_method(name).and_then(|m| m.arity());
        Function::new(
            FunctionKind::Method {
                receiver,
                name: name.to_string(),
            },
            name,
            arity,
        )
    }

    /// A static method bound to `class`.
    pub fn static_method(class: Class, name: &str) -> Function {
        let arity = class.find_static_method(name).and_then(|m| m.arity());
        Function::new(
            FunctionKind::StaticMethod {
                class,
                name: name.to_string(),
            },
            name,
            arity,
        )
    }

    pub fn name(&self) -> String {
        match self.data.properties.get("name") {
            Some(Value::String(name)) => name.clone(),
            _ => String::new(),
        }
    }

    /// Minimum argument count, as exposed through `f.arity`.
    pub fn arity(&self) -> Option<usize> {
        match self.data.properties.get("arity") {
            Some(Value::Number(n)) => Some(*n as usize),
            _ => None,
        }
    }

    pub fn get(&self, name: &str) -> Result<Value, RuntimeError> {
        self.data
            .properties
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::UndefinedProperty(name.to_string()))
    }

    pub fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: &[Value],
    ) -> Result<Value, RuntimeError> {
        self.call_with_receiver(interpreter, &Value::Null, arguments)
    }

    /// Calls with an explicit receiver. Declared functions ignore it.
    pub fn call_with_receiver(
        &self,
        interpreter: &mut Interpreter,
        this: &Value,
        arguments: &[Value],
    ) -> Result<Value, RuntimeError> {
        match &self.data.kind {
            FunctionKind::Declared {
                declaration,
                closure,
            } => call_declared(declaration, closure, interpreter, arguments),
            FunctionKind::Native(native) => {
                native.arity.check(native.name, arguments.len())?;
                debug!(name = native.name, args = arguments.len(), "native call");
                (native.call)(interpreter, this, arguments)
            }
            FunctionKind::Method { receiver, name } => {
                receiver
                    .class()
                    .invoke_method(interpreter, name, receiver, arguments)
            }
            FunctionKind::StaticMethod { class, name } => {
                class.invoke_static(interpreter, name, arguments)
            }
        }
    }

    pub fn equals(&self, other: &Function) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

fn call_declared(
    declaration: &FunctionDeclaration,
    closure: &Environment,
    interpreter: &mut Interpreter,
    arguments: &[Value],
) -> Result<Value, RuntimeError> {
    if arguments.len() != declaration.parameters.len() {
        return Err(RuntimeError::arity(
            &declaration.name,
            declaration.parameters.len(),
            arguments.len(),
        ));
    }
    let mut environment = closure.new_child();
    for (parameter, argument) in declaration.parameters.iter().zip(arguments) {
        environment.define(&parameter.name, argument.clone(), false)?;
    }
    debug!(name = %declaration.name, args = arguments.len(), "call");
    match interpreter.execute_body(&declaration.body, environment)? {
        Flow::Return(value) => Ok(value),
        _ => Ok(Value::Null),
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.data.kind {
            FunctionKind::Declared { declaration, .. } => write!(f, "<fn {}>", declaration.name),
            FunctionKind::Native(native) => write!(f, "<native fn {}>", native.name),
            FunctionKind::Method { receiver, name } => {
                write!(f, "<method {}.{}>", receiver.class().name(), name)
            }
            FunctionKind::StaticMethod { class, name } => {
                write!(f, "<method {}.{}>", class.name(), name)
            }
        }
    }
}

// Closures may reach back to this function, so Debug stays shallow.
impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function({})", self)
    }
}
