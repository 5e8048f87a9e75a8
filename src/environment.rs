use crate::error::RuntimeError;
use crate::shared_list::SharedList;
use crate::value::Value;
use std::collections::BTreeMap;
use tracing::trace;

#[derive(Debug, Clone)]
struct Binding {
    value: Value,
    is_const: bool,
}

type Scope = BTreeMap<String, Binding>;

/// A chain of scopes, innermost first. Clones share scopes, so a closure that
/// captures an `Environment` sees later writes made through any other handle.
#[derive(Debug, Clone)]
pub struct Environment {
    scopes: SharedList<Scope>,
}

impl Environment {
    pub fn new() -> Environment {
        let mut scopes = SharedList::new();
        scopes.push(Scope::new());
        Environment { scopes }
    }

    /// A fresh innermost scope whose parent is `self`.
    pub fn new_child(&self) -> Environment {
        let mut scopes = self.scopes.clone();
        scopes.push(Scope::new());
        Environment { scopes }
    }

    #[cfg(test)]
    pub fn enclosing(&self) -> Option<Environment> {
        let scopes = self.scopes.tail();
        if scopes.empty() {
            None
        } else {
            Some(Environment { scopes })
        }
    }

    pub fn define(&mut self, name: &str, value: Value, is_const: bool) -> Result<(), RuntimeError> {
        let mut scope = self
            .scopes
            .peek_mut()
            .ok_or_else(|| RuntimeError::Internal("environment has no scope".to_string()))?;
        if scope.contains_key(name) {
            return Err(RuntimeError::DuplicateDefinition(name.to_string()));
        }
        trace!(name, is_const, "define");
        scope.insert(name.to_string(), Binding { value, is_const });
        Ok(())
    }

    /// Binds `name` in the innermost scope as a constant, replacing any
    /// existing binding. Used to install builtins.
    pub(crate) fn define_builtin(&mut self, name: &str, value: Value) {
        if let Some(mut scope) = self.scopes.peek_mut() {
            scope.insert(
                name.to_string(),
                Binding {
                    value,
                    is_const: true,
                },
            );
        }
    }

    pub fn get(&self, name: &str) -> Result<Value, RuntimeError> {
        self.scopes
            .find_map(|scope| scope.get(name).map(|binding| binding.value.clone()))
            .ok_or_else(|| RuntimeError::UndefinedVariable(name.to_string()))
    }

    /// Rebinds the nearest binding of `name` and hands back the value it
    /// replaced. Constants are left untouched.
    pub fn assign(&mut self, name: &str, value: Value) -> Result<Value, RuntimeError> {
        // The old value is moved out and dropped by the caller, after the
        // scope borrow ends: it may own the last handle to a closure over
        // this very scope.
        let mut value = Some(value);
        self.scopes
            .find_map(|scope| {
                scope.get_mut(name).map(|binding| {
                    if binding.is_const {
                        Err(RuntimeError::ConstViolation(name.to_string()))
                    } else {
                        let value = value.take().unwrap_or(Value::Null);
                        Ok(std::mem::replace(&mut binding.value, value))
                    }
                })
            })
            .unwrap_or_else(|| Err(RuntimeError::UndefinedVariable(name.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::FunctionDeclaration;
    use crate::callable::Function;
    use crate::environment::Environment;
    use crate::error::RuntimeError;
    use crate::value::Value;
    use std::rc::Rc;

    #[test]
    fn define_and_get() {
        let mut env = Environment::new();
        env.define("x", Value::Number(1.0), false).unwrap();
        assert_eq!(env.get("x").unwrap().as_number().unwrap(), 1.0);
        assert_eq!(
            env.get("y").unwrap_err(),
            RuntimeError::UndefinedVariable("y".to_string())
        );
    }

    #[test]
    fn duplicate_in_same_scope() {
        let mut env = Environment::new();
        env.define("x", Value::Null, false).unwrap();
        assert_eq!(
            env.define("x", Value::Null, false).unwrap_err(),
            RuntimeError::DuplicateDefinition("x".to_string())
        );
    }

    #[test]
    fn shadowing_leaves_outer_untouched() {
        let mut outer = Environment::new();
        outer.define("x", Value::Number(1.0), false).unwrap();
        let mut inner = outer.new_child();
        inner.define("x", Value::Number(2.0), false).unwrap();
        assert_eq!(inner.get("x").unwrap().as_number().unwrap(), 2.0);
        assert_eq!(outer.get("x").unwrap().as_number().unwrap(), 1.0);
        let enclosing = inner.enclosing().unwrap();
        assert_eq!(enclosing.get("x").unwrap().as_number().unwrap(), 1.0);
        assert!(enclosing.enclosing().is_none());
    }

    #[test]
    fn assignment_reaches_outer_scope() {
        let mut outer = Environment::new();
        outer.define("count", Value::Number(0.0), false).unwrap();
        let mut inner = outer.new_child();
        inner.assign("count", Value::Number(5.0)).unwrap();
        assert_eq!(outer.get("count").unwrap().as_number().unwrap(), 5.0);
        assert_eq!(
            inner.assign("missing", Value::Null).unwrap_err(),
            RuntimeError::UndefinedVariable("missing".to_string())
        );
    }

    #[test]
    fn clones_share_scopes() {
        let mut env = Environment::new();
        let captured = env.clone();
        env.define("later", Value::Bool(true), false).unwrap();
        assert!(captured.get("later").unwrap().as_bool().unwrap());
    }

    #[test]
    fn constants_reject_assignment() {
        let mut env = Environment::new();
        env.define("k", Value::Number(10.0), true).unwrap();
        let mut inner = env.new_child();
        assert_eq!(
            inner.assign("k", Value::Number(20.0)).unwrap_err(),
            RuntimeError::ConstViolation("k".to_string())
        );
        assert_eq!(env.get("k").unwrap().as_number().unwrap(), 10.0);
    }

    #[test]
    fn assign_returns_replaced_value() {
        let mut env = Environment::new();
        env.define("x", Value::Number(1.0), false).unwrap();
        let old = env.assign("x", Value::Number(2.0)).unwrap();
        assert_eq!(old.as_number().unwrap(), 1.0);
        assert_eq!(env.get("x").unwrap().as_number().unwrap(), 2.0);
    }

    #[test]
    fn overwriting_last_closure_over_scope() {
        let mut env = Environment::new();
        let closure = Function::declared(
            Rc::new(FunctionDeclaration {
                name: "g".to_string(),
                parameters: Vec::new(),
                return_type: None,
                body: Vec::new(),
            }),
            env.clone(),
        );
        env.define("g", Value::Function(closure), false).unwrap();
        env.assign("g", Value::Number(1.0)).unwrap();
        assert_eq!(env.get("g").unwrap().as_number().unwrap(), 1.0);
    }

    #[test]
    fn builtins_are_constant() {
        let mut env = Environment::new();
        env.define_builtin("answer", Value::Number(42.0));
        assert_eq!(
            env.assign("answer", Value::Null).unwrap_err(),
            RuntimeError::ConstViolation("answer".to_string())
        );
    }
}
