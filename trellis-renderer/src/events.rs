use std::cell::RefCell;
use std::rc::Rc;

use tracing::trace;
use trellis_core::{Evaluator, Params, Scope, Value};
use trellis_dom::{DirectiveError, Document, EventBinding, ListenerId, NodeId, VElement, callback};

/// The scope and evaluator handlers capture when they are bound.
#[derive(Clone)]
pub(crate) struct Context {
    pub(crate) scope: Rc<RefCell<dyn Scope>>,
    pub(crate) evaluator: Rc<Evaluator>,
}

/// What a bound listener was built from; equal signatures need no rebind.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Signature {
    expression: String,
    modifiers: Vec<String>,
    params: Params,
}

#[derive(Debug, Clone)]
pub(crate) struct BoundEvent {
    pub(crate) listener: ListenerId,
    signature: Signature,
}

/// Slot key of an event binding on one element: `click.prevent`.
pub(crate) fn slot_name(event: &EventBinding) -> String {
    let mut name = event.name.clone();
    for m in &event.modifiers {
        name.push('.');
        name.push_str(m);
    }
    name
}

/// Attaches the handler for `event` to `node`, replacing `previous` unless
/// it was built from the same expression, modifiers and parameters.
///
/// A `once` listener fires at most once between two passes; every pass
/// re-arms one that already fired.
pub(crate) fn bind_event(
    doc: &mut Document,
    node: NodeId,
    element: &VElement,
    event: &EventBinding,
    previous: Option<BoundEvent>,
    ctx: &Context,
) -> BoundEvent {
    let signature = Signature {
        expression: event.expression.clone(),
        modifiers: event.modifiers.clone(),
        params: element.params.clone(),
    };
    if let Some(bound) = previous {
        // a fired `once` listener is gone from the node and is armed again
        if bound.signature == signature && doc.has_listener(node, bound.listener) {
            return bound;
        }
        doc.remove_listener(node, bound.listener);
    }

    let prevent = event.has("prevent");
    let stop = event.has("stop");
    let expression = event.expression.clone();
    let tag = element.tag.clone();
    let params = element.params.clone();
    let scope = Rc::clone(&ctx.scope);
    let evaluator = Rc::clone(&ctx.evaluator);
    let handler = callback(move |ev| {
        if prevent {
            ev.prevent_default();
        }
        if stop {
            ev.stop_propagation();
        }
        let mut locals = params.clone();
        locals.insert("$event".to_string(), ev.to_value());
        trace!(event = ev.kind(), %expression, "handler");
        let mut scope = scope.borrow_mut();
        evaluator
            .block(&expression, &locals, &mut *scope)
            .map(|_: Value| ())
            .map_err(|e| DirectiveError::evaluation(expression.as_str(), tag.as_str(), e))
    });

    let listener = doc.add_listener(node, event.name.as_str(), event.has("once"), handler);
    BoundEvent {
        listener,
        signature,
    }
}
