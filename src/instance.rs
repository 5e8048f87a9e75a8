use crate::callable::Function;
use crate::class::Class;
use crate::error::RuntimeError;
use crate::value::Value;
use std::cell::{Ref, RefCell, RefMut};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

#[derive(Clone)]
pub struct Object {
    data: Rc<RefCell<ObjectImpl>>,
}

struct ObjectImpl {
    class: Class,
    fields: BTreeMap<String, Value>,
    // Present only for arrays.
    elements: Option<Vec<Value>>,
}

impl Object {
    pub fn new(class: Class) -> Object {
        Object::with_payload(class, None)
    }

    pub fn array(class: Class, elements: Vec<Value>) -> Object {
        Object::with_payload(class, Some(elements))
    }

    fn with_payload(class: Class, elements: Option<Vec<Value>>) -> Object {
        Object {
            data: Rc::new(RefCell::new(ObjectImpl {
                class,
                fields: BTreeMap::new(),
                elements,
            })),
        }
    }

    pub fn class(&self) -> Class {
        self.data.borrow().class.clone()
    }

    pub fn field(&self, name: &str) -> Option<Value> {
        self.data.borrow().fields.get(name).cloned()
    }

    /// Fields first, then the class's instance methods bound to this object.
    pub fn get(&self, name: &str) -> Result<Value, RuntimeError> {
        if let Some(value) = self.field(name) {
            return Ok(value);
        }
        let class = self.class();
        if class.has_method(name) {
            Ok(Value::Function(Function::method(self.clone(), name)))
        } else {
            Err(RuntimeError::UndefinedProperty(name.to_string()))
        }
    }

    #[cfg(test)]
    pub fn set(&self, name: &str, value: Value) {
        self.data
            .borrow_mut()
            .fields
            .insert(name.to_string(), value);
    }

    pub fn elements(&self) -> Option<Ref<Vec<Value>>> {
        Ref::filter_map(self.data.borrow(), |data| data.elements.as_ref()).ok()
    }

    pub fn elements_mut(&self) -> Option<RefMut<Vec<Value>>> {
        RefMut::filter_map(self.data.borrow_mut(), |data| data.elements.as_mut()).ok()
    }

    pub fn equals(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} instance>", self.data.borrow().class.name())
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object({})", self)
    }
}

#[cfg(test)]
mod tests {
    use crate::builtins::array_class;
    use crate::error::RuntimeError;
    use crate::instance::Object;
    use crate::value::Value;

    #[test]
    fn fields_shadow_methods() {
        let object = Object::new(array_class());
        assert!(object.get("push").unwrap().is_function());
        object.set("push", Value::Number(1.0));
        assert_eq!(object.get("push").unwrap().as_number().unwrap(), 1.0);
        assert_eq!(
            object.get("missing").unwrap_err(),
            RuntimeError::UndefinedProperty("missing".to_string())
        );
    }

    #[test]
    fn payload_and_identity() {
        let class = array_class();
        let plain = Object::new(class.clone());
        assert!(plain.elements().is_none());
        let array = Object::array(class, vec![Value::Null]);
        assert_eq!(array.elements().unwrap().len(), 1);
        array.elements_mut().unwrap().push(Value::Bool(true));
        assert_eq!(Value::Object(array.clone()).to_string(), "[null, true]");
        assert_eq!(plain.to_string(), "<Array instance>");
        assert!(array.equals(&array.clone()));
        assert!(!array.equals(&plain));
    }
}
