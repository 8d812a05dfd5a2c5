use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::EvalError;
use crate::value::{Object, Value};

/// Ambient names available to one expression on top of the scope:
/// loop variables, `$index`/`$prop`, `$event`, dataset entries.
pub type Params = IndexMap<String, Value>;

/// The object bare identifiers resolve against, typically a component.
pub trait Scope {
    /// `None` means the member does not exist at all.
    fn get(&self, name: &str) -> Option<Value>;

    fn set(&mut self, name: &str, _value: Value) -> Result<(), EvalError> {
        Err(EvalError::ReadOnly(name.to_string()))
    }

    /// `None` when the scope has no method of that name.
    fn call(&mut self, _name: &str, _args: Vec<Value>) -> Option<Result<Value, EvalError>> {
        None
    }

    /// Used in diagnostics.
    fn scope_name(&self) -> &str {
        "scope"
    }
}

pub type Method = Rc<dyn Fn(&mut State, Vec<Value>) -> Result<Value, EvalError>>;

/// A ready-made [`Scope`]: named fields plus registered methods.
#[derive(Clone, Default)]
pub struct State {
    name: String,
    fields: Object,
    methods: IndexMap<String, Method>,
}

impl State {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Object::new(),
            methods: IndexMap::new(),
        }
    }

    /// Builds a state from a JSON object; anything else is a type error.
    pub fn from_json(name: impl Into<String>, json: serde_json::Value) -> Result<Self, EvalError> {
        match Value::from(json) {
            Value::Object(obj) => Ok(Self {
                name: name.into(),
                fields: Rc::unwrap_or_clone(obj),
                methods: IndexMap::new(),
            }),
            other => Err(EvalError::type_error(format!(
                "state must be an object, got {}",
                other.type_name()
            ))),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_method<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut State, Vec<Value>) -> Result<Value, EvalError> + 'static,
    {
        self.methods.insert(name.into(), Rc::new(f));
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields.get_mut(name)
    }

    pub fn fields(&self) -> &Object {
        &self.fields
    }

    /// Appends to an array field, creating it when missing.
    pub fn push(&mut self, name: &str, value: impl Into<Value>) -> Result<(), EvalError> {
        let slot = self
            .fields
            .entry(name.to_string())
            .or_insert_with(|| Value::array(Vec::new()));
        match slot {
            Value::Array(items) => {
                Rc::make_mut(items).push(value.into());
                Ok(())
            }
            other => Err(EvalError::type_error(format!(
                "{name} is a {}, not an array",
                other.type_name()
            ))),
        }
    }

    /// Removes and returns the element at `index` of an array field.
    pub fn remove_at(&mut self, name: &str, index: usize) -> Option<Value> {
        match self.fields.get_mut(name) {
            Some(Value::Array(items)) if index < items.len() => {
                Some(Rc::make_mut(items).remove(index))
            }
            _ => None,
        }
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Scope for State {
    fn get(&self, name: &str) -> Option<Value> {
        self.fields.get(name).cloned()
    }

    fn set(&mut self, name: &str, value: Value) -> Result<(), EvalError> {
        if self.methods.contains_key(name) {
            return Err(EvalError::ReadOnly(name.to_string()));
        }
        self.fields.insert(name.to_string(), value);
        Ok(())
    }

    fn call(&mut self, name: &str, args: Vec<Value>) -> Option<Result<Value, EvalError>> {
        let method = self.methods.get(name)?.clone();
        Some(method(self, args))
    }

    fn scope_name(&self) -> &str {
        &self.name
    }
}
