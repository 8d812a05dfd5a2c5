use std::rc::Rc;

use trellis_core::{EvalError, Params, RenderQueue, Scope, State, Value};
use trellis_renderer::{Component, EngineConfig, Host, parse_attribute};

struct Counter {
    state: State,
    connected: usize,
    disconnected: usize,
    changes: Vec<(String, Value, Value)>,
    queue: Option<Rc<RenderQueue>>,
    touched: bool,
}

impl Counter {
    fn new() -> Self {
        Self {
            state: State::new("counter")
                .with("count", 0)
                .with("label", "Clicks")
                .with("title", "t"),
            connected: 0,
            disconnected: 0,
            changes: Vec::new(),
            queue: None,
            touched: false,
        }
    }
}

impl Scope for Counter {
    fn get(&self, name: &str) -> Option<Value> {
        self.state.get(name)
    }

    fn set(&mut self, name: &str, value: Value) -> Result<(), EvalError> {
        self.state.set(name, value)
    }

    fn call(&mut self, name: &str, args: Vec<Value>) -> Option<Result<Value, EvalError>> {
        match name {
            // asks for one more pass the first time it is evaluated
            "touch" => {
                if !self.touched {
                    self.touched = true;
                    if let Some(queue) = &self.queue {
                        queue.schedule();
                    }
                }
                Some(Ok(Value::from("touched")))
            }
            _ => self.state.call(name, args),
        }
    }
}

impl Component for Counter {
    fn template(&self) -> String {
        r#"<p [textcontent]="label + ': ' + count"></p><button (click)="count++">+</button>"#
            .to_string()
    }

    fn styles(&self) -> Vec<String> {
        vec!["p { color: red; }".to_string()]
    }

    fn observed_attributes(&self) -> Vec<String> {
        vec!["label".to_string()]
    }

    fn on_connected(&mut self) {
        self.connected += 1;
    }

    fn on_changes(&mut self, name: &str, old: &Value, new: &Value) {
        self.changes.push((name.to_string(), old.clone(), new.clone()));
    }

    fn on_disconnected(&mut self) {
        self.disconnected += 1;
    }
}

fn count(host: &Host<Counter>) -> Value {
    host.component().state.field("count").cloned().unwrap_or_default()
}

#[test]
fn connect_renders_styles_then_template() {
    let mut host = Host::new("x-counter", Counter::new());
    host.connect().unwrap();
    assert_eq!(
        host.html(),
        "<style>p { color: red; }</style><p>Clicks: 0</p><button>+</button>"
    );
    assert_eq!(host.component().connected, 1);
    assert!(host.is_connected());
}

#[test]
fn click_updates_scope_and_rerenders() {
    let mut host = Host::new("x-counter", Counter::new());
    host.connect().unwrap();
    let button = host.el("button").unwrap().expect("button rendered");
    host.click(button).unwrap();
    host.click(button).unwrap();
    assert_eq!(count(&host), Value::from(2));
    let p = host.el("p").unwrap().unwrap();
    assert_eq!(host.document().text_content(p), "Clicks: 2");
}

#[test]
fn observed_attributes_are_parsed_and_deduplicated() {
    let mut host = Host::new("x-counter", Counter::new());
    host.connect().unwrap();

    assert!(host.set_attribute("label", r#""Taps""#).unwrap());
    assert!(!host.set_attribute("label", r#""Taps""#).unwrap());
    assert_eq!(host.component().changes.len(), 1);
    let p = host.el("p").unwrap().unwrap();
    assert_eq!(host.document().text_content(p), "Taps: 0");

    // not JSON, kept as text
    assert!(host.set_attribute("label", "plain words").unwrap());
    let (_, old, new) = host.component().changes[1].clone();
    assert_eq!((old, new), (Value::from("Taps"), Value::from("plain words")));

    // unobserved attributes only land on the element
    assert!(!host.set_attribute("title", "ignored").unwrap());
    assert_eq!(host.document().attribute(host.element(), "title"), Some("ignored"));
    assert_eq!(host.component().state.field("title"), Some(&Value::from("t")));
}

#[test]
fn batched_updates_coalesce_until_settled() {
    let mut host = Host::new("x-counter", Counter::new());
    host.connect().unwrap();
    let passes = host.tree().passes();

    host.component_mut().state.insert("count", 5);
    host.update().unwrap();
    host.update().unwrap();
    assert!(host.html().contains("Clicks: 0"));

    assert_eq!(host.settle().unwrap(), 1);
    assert_eq!(host.tree().passes(), passes + 1);
    assert_eq!(host.queue().superseded(), 1);
    assert!(host.html().contains("Clicks: 5"));
}

#[test]
fn scheduled_passes_wait_for_settle() {
    let mut host = Host::new("x-counter", Counter::new());
    host.connect().unwrap();

    host.component_mut().state.insert("count", 4);
    let first = host.schedule();
    let second = host.schedule();
    assert_ne!(first, second);
    assert!(host.queue().is_pending());
    assert!(host.html().contains("Clicks: 0"));

    assert_eq!(host.settle().unwrap(), 1);
    assert!(host.html().contains("Clicks: 4"));
    assert_eq!(host.settle().unwrap(), 0);
}

#[test]
fn unbatched_updates_render_immediately() {
    let config = EngineConfig::default().with_batch_updates(false);
    let mut host = Host::with_config("x-counter", Counter::new(), config);
    host.connect().unwrap();

    host.component_mut().state.insert("count", 7);
    assert_eq!(host.update().unwrap(), 1);
    assert!(host.html().contains("Clicks: 7"));
}

#[test]
fn pass_requested_during_a_pass_is_deferred() {
    struct Touchy(Counter);

    impl Scope for Touchy {
        fn get(&self, name: &str) -> Option<Value> {
            self.0.get(name)
        }

        fn call(&mut self, name: &str, args: Vec<Value>) -> Option<Result<Value, EvalError>> {
            self.0.call(name, args)
        }
    }

    impl Component for Touchy {
        fn template(&self) -> String {
            r#"<p [title]="touch()"></p>"#.to_string()
        }
    }

    let mut host = Host::new("x-touchy", Touchy(Counter::new()));
    let queue = host.queue();
    host.component_mut().0.queue = Some(queue);
    host.connect().unwrap();

    assert!(host.component().0.touched);
    assert_eq!(host.tree().passes(), 2);
    assert!(!host.queue().is_pending());
    assert_eq!(host.html(), r#"<p title="touched"></p>"#);
}

#[test]
fn update_with_only_writes_known_members() {
    let mut host = Host::new("x-counter", Counter::new());
    host.connect().unwrap();
    let details: Params = [
        ("count".to_string(), Value::from(3)),
        ("unknown".to_string(), Value::from(1)),
    ]
    .into_iter()
    .collect();
    host.update_with(&details).unwrap();
    assert_eq!(count(&host), Value::from(3));
    assert_eq!(host.component().state.field("unknown"), None);
    assert!(host.html().contains("Clicks: 3"));
}

#[test]
fn disconnect_runs_hook_and_stops_rendering() {
    let mut host = Host::new("x-counter", Counter::new());
    host.connect().unwrap();
    host.disconnect();
    host.disconnect();
    assert_eq!(host.component().disconnected, 1);

    host.component_mut().state.insert("count", 9);
    host.update().unwrap();
    assert_eq!(host.settle().unwrap(), 0);
    assert!(host.html().contains("Clicks: 0"));
}

#[test]
fn queries_are_scoped_to_the_host() {
    let mut host = Host::new("x-counter", Counter::new());
    host.connect().unwrap();
    assert_eq!(host.all("p, button").unwrap().len(), 2);
    assert!(host.el("section").unwrap().is_none());
    assert!(host.el("p.").is_err());
}

#[test]
fn attribute_values_parse_as_json_first() {
    assert_eq!(parse_attribute("3"), Value::from(3));
    assert_eq!(parse_attribute("true"), Value::Bool(true));
    assert_eq!(parse_attribute("[1]"), Value::array([Value::from(1)]));
    assert_eq!(parse_attribute("hello"), Value::from("hello"));
}
