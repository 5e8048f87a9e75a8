use crate::callable::Function;
use crate::error::RuntimeError;
use crate::instance::Object;
use crate::interpreter::Interpreter;
use crate::value::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use tracing::debug;

/// How a class builds its instances. Method dispatch is shared by all
/// classes and lives on `Class` itself.
pub trait ClassBehavior {
    fn instantiate(
        &self,
        interpreter: &mut Interpreter,
        class: &Class,
        arguments: &[Value],
    ) -> Result<Value, RuntimeError>;
}

#[derive(Clone)]
pub struct Class {
    data: Rc<ClassImpl>,
}

struct ClassImpl {
    name: String,
    methods: BTreeMap<String, Function>,
    static_methods: BTreeMap<String, Function>,
    static_properties: BTreeMap<String, Value>,
    behavior: Box<dyn ClassBehavior>,
}

impl Class {
    pub fn new(
        name: &str,
        methods: BTreeMap<String, Function>,
        static_methods: BTreeMap<String, Function>,
        behavior: Box<dyn ClassBehavior>,
    ) -> Class {
        let mut static_properties = BTreeMap::new();
        static_properties.insert("name".to_string(), Value::from(name));
        Class {
            data: Rc::new(ClassImpl {
                name: name.to_string(),
                methods,
                static_methods,
                static_properties,
                behavior,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.data.name
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.data.methods.contains_key(name)
    }

    pub fn find_method(&self, name: &str) -> Option<Function> {
        self.data.methods.get(name).cloned()
    }

    pub fn find_static_method(&self, name: &str) -> Option<Function> {
        self.data.static_methods.get(name).cloned()
    }

    pub fn static_properties(&self) -> &BTreeMap<String, Value> {
        &self.data.static_properties
    }

    /// Property lookup on the class value: static methods first, then static
    /// properties.
    pub fn get(&self, name: &str) -> Result<Value, RuntimeError> {
        if self.data.static_methods.contains_key(name) {
            return Ok(Value::Function(Function::static_method(self.clone(), name)));
        }
        self.static_properties()
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::UndefinedProperty(name.to_string()))
    }

    pub fn instantiate(
        &self,
        interpreter: &mut Interpreter,
        arguments: &[Value],
    ) -> Result<Value, RuntimeError> {
        debug!(class = %self.data.name, args = arguments.len(), "instantiate");
        self.data
            .behavior
            .instantiate(interpreter, self, arguments)
    }

    pub fn invoke_method(
        &self,
        interpreter: &mut Interpreter,
        name: &str,
        target: &Object,
        arguments: &[Value],
    ) -> Result<Value, RuntimeError> {
        let method = self
            .data
            .methods
            .get(name)
            .ok_or_else(|| self.method_not_found(name))?;
        method.call_with_receiver(interpreter, &Value::Object(target.clone()), arguments)
    }

    pub fn invoke_static(
        &self,
        interpreter: &mut Interpreter,
        name: &str,
        arguments: &[Value],
    ) -> Result<Value, RuntimeError> {
        let method = self
            .data
            .static_methods
            .get(name)
            .ok_or_else(|| self.method_not_found(name))?;
        method.call_with_receiver(interpreter, &Value::Class(self.clone()), arguments)
    }

    fn method_not_found(&self, name: &str) -> RuntimeError {
        RuntimeError::MethodNotFound {
            class: self.data.name.clone(),
            method: name.to_string(),
        }
    }

    pub fn equals(&self, other: &Class) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<class {}>", self.data.name)
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Class({})", self.data.name)
    }
}

#[cfg(test)]
mod tests {
    use crate::callable::{Arity, Function, NativeFunction};
    use crate::class::{Class, ClassBehavior};
    use crate::error::RuntimeError;
    use crate::instance::Object;
    use crate::interpreter::Interpreter;
    use crate::value::Value;
    use std::collections::BTreeMap;

    struct Plain;

    impl ClassBehavior for Plain {
        fn instantiate(
            &self,
            _: &mut Interpreter,
            class: &Class,
            _: &[Value],
        ) -> Result<Value, RuntimeError> {
            Ok(Value::Object(Object::new(class.clone())))
        }
    }

    fn describe_receiver(
        _: &mut Interpreter,
        this: &Value,
        _: &[Value],
    ) -> Result<Value, RuntimeError> {
        Ok(Value::String(this.to_string()))
    }

    fn point_class() -> Class {
        let describe = Function::native(NativeFunction {
            name: "describe",
            arity: Arity::Exactly(0),
            call: describe_receiver,
        });
        let mut methods = BTreeMap::new();
        methods.insert("describe".to_string(), describe.clone());
        let mut static_methods = BTreeMap::new();
        static_methods.insert("who".to_string(), describe);
        Class::new("Point", methods, static_methods, Box::new(Plain))
    }

    #[test]
    fn dispatch_passes_receiver() {
        let mut interpreter = Interpreter::with_output(Box::new(Vec::new()));
        let class = point_class();
        let instance = class.instantiate(&mut interpreter, &[]).unwrap();
        let object = instance.as_object().unwrap();
        assert!(object.class().equals(&class));
        let described = class
            .invoke_method(&mut interpreter, "describe", object, &[])
            .unwrap();
        assert_eq!(described.as_str().unwrap(), "<Point instance>");
        let who = class.invoke_static(&mut interpreter, "who", &[]).unwrap();
        assert_eq!(who.as_str().unwrap(), "<class Point>");
    }

    #[test]
    fn missing_method() {
        let mut interpreter = Interpreter::with_output(Box::new(Vec::new()));
        let class = point_class();
        let object = Object::new(class.clone());
        assert_eq!(
            class
                .invoke_method(&mut interpreter, "area", &object, &[])
                .unwrap_err(),
            RuntimeError::MethodNotFound {
                class: "Point".to_string(),
                method: "area".to_string()
            }
        );
    }

    #[test]
    fn static_lookup_order() {
        let class = point_class();
        let who = class.get("who").unwrap();
        assert_eq!(who.as_function().unwrap().arity(), Some(0));
        assert_eq!(class.get("name").unwrap().as_str().unwrap(), "Point");
        assert!(class.has_method("describe"));
        assert_eq!(
            class.get("describe").unwrap_err(),
            RuntimeError::UndefinedProperty("describe".to_string())
        );
    }
}
