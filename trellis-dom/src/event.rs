use std::fmt;
use std::rc::Rc;

use trellis_core::Value;

use crate::NodeId;
use crate::error::DirectiveError;

/// An event travelling from its target up to the document root.
#[derive(Debug, Clone)]
pub struct Event {
    kind: String,
    detail: Value,
    target: Option<NodeId>,
    current_target: Option<NodeId>,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl Event {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            detail: Value::Undefined,
            target: None,
            current_target: None,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<Value>) -> Self {
        self.detail = detail.into();
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn detail(&self) -> &Value {
        &self.detail
    }

    pub fn target(&self) -> Option<NodeId> {
        self.target
    }

    pub fn current_target(&self) -> Option<NodeId> {
        self.current_target
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    pub(crate) fn retarget(&mut self, target: NodeId, current: NodeId) {
        self.target.get_or_insert(target);
        self.current_target = Some(current);
    }

    /// The `$event` object handed to handler expressions.
    pub fn to_value(&self) -> Value {
        Value::object([
            ("type", Value::from(self.kind.as_str())),
            ("detail", self.detail.clone()),
            ("defaultPrevented", Value::Bool(self.default_prevented)),
        ])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

pub type Callback = Rc<dyn Fn(&mut Event) -> Result<(), DirectiveError>>;

#[derive(Clone)]
pub(crate) struct Listener {
    pub(crate) id: ListenerId,
    pub(crate) kind: String,
    pub(crate) once: bool,
    pub(crate) callback: Callback,
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("once", &self.once)
            .finish_non_exhaustive()
    }
}

/// Wraps a closure as a listener [`Callback`].
pub fn callback<F>(f: F) -> Callback
where
    F: Fn(&mut Event) -> Result<(), DirectiveError> + 'static,
{
    Rc::new(f)
}
