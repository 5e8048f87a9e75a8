//! Globals installed into every interpreter: the `Array` class and the
//! `print` and `clock` functions.

use crate::callable::{Arity, Function, NativeFunction};
use crate::class::{Class, ClassBehavior};
use crate::environment::Environment;
use crate::error::RuntimeError;
use crate::instance::Object;
use crate::interpreter::Interpreter;
use crate::value::Value;
use std::cell::RefMut;
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

pub fn register(globals: &mut Environment) {
    globals.define_builtin("Array", Value::Class(array_class()));
    for native in &[
        NativeFunction {
            name: "print",
            arity: Arity::AtLeast(0),
            call: print,
        },
        NativeFunction {
            name: "clock",
            arity: Arity::Exactly(0),
            call: clock,
        },
    ] {
        globals.define_builtin(native.name, Value::Function(Function::native(*native)));
    }
}

fn print(interpreter: &mut Interpreter, _: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    let line = args
        .iter()
        .map(|arg| arg.to_string())
        .collect::<Vec<_>>()
        .join(" ");
    interpreter.write_line(&line)?;
    Ok(Value::Null)
}

fn clock(_: &mut Interpreter, _: &Value, _: &[Value]) -> Result<Value, RuntimeError> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| RuntimeError::Internal(e.to_string()))?;
    Ok(Value::Number(elapsed.as_secs_f64()))
}

struct ArrayBehavior;

impl ClassBehavior for ArrayBehavior {
    fn instantiate(
        &self,
        _: &mut Interpreter,
        class: &Class,
        arguments: &[Value],
    ) -> Result<Value, RuntimeError> {
        Ok(Value::Object(Object::array(class.clone(), arguments.to_vec())))
    }
}

pub fn array_class() -> Class {
    let methods = table(&[
        NativeFunction {
            name: "push",
            arity: Arity::AtLeast(1),
            call: array_push,
        },
        NativeFunction {
            name: "pop",
            arity: Arity::Exactly(0),
            call: array_pop,
        },
        NativeFunction {
            name: "get",
            arity: Arity::Exactly(1),
            call: array_get,
        },
        NativeFunction {
            name: "set",
            arity: Arity::Exactly(2),
            call: array_set,
        },
        NativeFunction {
            name: "length",
            arity: Arity::Exactly(0),
            call: array_length,
        },
    ]);
    let static_methods = table(&[NativeFunction {
        name: "create",
        arity: Arity::AtLeast(0),
        call: array_create,
    }]);
    Class::new("Array", methods, static_methods, Box::new(ArrayBehavior))
}

fn table(natives: &[NativeFunction]) -> BTreeMap<String, Function> {
    natives
        .iter()
        .map(|native| (native.name.to_string(), Function::native(*native)))
        .collect()
}

fn elements(this: &Value) -> Result<RefMut<Vec<Value>>, RuntimeError> {
    this.as_object()?
        .elements_mut()
        .ok_or_else(|| RuntimeError::type_mismatch("array", "object"))
}

fn index(value: &Value, length: usize) -> Result<usize, RuntimeError> {
    let index = value.as_number()?;
    if index.fract() != 0.0 {
        return Err(RuntimeError::type_mismatch("integer index", "number"));
    }
    if index < 0.0 || index >= length as f64 {
        return Err(RuntimeError::IndexOutOfBounds { index, length });
    }
    Ok(index as usize)
}

fn array_create(
    interpreter: &mut Interpreter,
    this: &Value,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    this.as_class()?.instantiate(interpreter, args)
}

fn array_push(_: &mut Interpreter, this: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    let mut elements = elements(this)?;
    elements.extend(args.iter().cloned());
    Ok(Value::Number(elements.len() as f64))
}

fn array_pop(_: &mut Interpreter, this: &Value, _: &[Value]) -> Result<Value, RuntimeError> {
    Ok(elements(this)?.pop().unwrap_or(Value::Null))
}

fn array_get(_: &mut Interpreter, this: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    let elements = elements(this)?;
    let i = index(&args[0], elements.len())?;
    Ok(elements[i].clone())
}

fn array_set(_: &mut Interpreter, this: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    let mut elements = elements(this)?;
    let i = index(&args[0], elements.len())?;
    elements[i] = args[1].clone();
    Ok(args[1].clone())
}

fn array_length(_: &mut Interpreter, this: &Value, _: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Number(elements(this)?.len() as f64))
}
