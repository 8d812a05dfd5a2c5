use std::cell::RefCell;
use std::rc::Rc;

use trellis_core::{Params, Scope, State, Value};
use trellis_dom::{DirectiveError, Document, Event, NodeId};
use trellis_renderer::{EngineConfig, Registry, TreeNode};

struct Fixture {
    doc: Document,
    root: NodeId,
    state: Rc<RefCell<State>>,
    scope: Rc<RefCell<dyn Scope>>,
    tree: TreeNode,
}

impl Fixture {
    fn new(state: State) -> Self {
        let state = Rc::new(RefCell::new(state));
        let scope: Rc<RefCell<dyn Scope>> = state.clone();
        let doc = Document::new();
        let root = doc.root();
        Self {
            doc,
            root,
            state,
            scope,
            tree: TreeNode::new(),
        }
    }

    fn render(&mut self, markup: &str) -> Result<(), DirectiveError> {
        self.tree
            .render(&mut self.doc, self.root, markup, &self.scope, &Params::new())
            .map(|_| ())
    }

    fn update(&mut self) -> Result<(), DirectiveError> {
        self.tree
            .update(&mut self.doc, &self.scope, &Params::new())
            .map(|_| ())
    }

    fn html(&self) -> String {
        self.doc.inner_html(self.root)
    }

    fn child(&self, path: &[usize]) -> NodeId {
        path.iter().fold(self.root, |node, &i| {
            self.doc.child_at(node, i).expect("child exists")
        })
    }

    fn field(&self, name: &str) -> Value {
        self.state.borrow().field(name).cloned().unwrap_or_default()
    }

    fn elements(&self, parent: NodeId, tag: &str) -> Vec<NodeId> {
        self.doc
            .children(parent)
            .iter()
            .copied()
            .filter(|&c| self.doc.tag(c) == Some(tag))
            .collect()
    }
}

#[test]
fn unchanged_text_keeps_its_node() {
    let mut fx = Fixture::new(State::new("t").with("n", 1));
    fx.render(r#"<p>static</p><span [textcontent]="n"></span>"#).unwrap();
    assert_eq!(fx.html(), "<p>static</p><span>1</span>");
    let text = fx.child(&[0, 0]);

    fx.state.borrow_mut().insert("n", 2);
    fx.update().unwrap();
    assert_eq!(fx.html(), "<p>static</p><span>2</span>");
    assert_eq!(fx.child(&[0, 0]), text);
    assert_eq!(fx.tree.last_stats().replaced, 0);
}

#[test]
fn inner_html_binding_only_touches_its_element() {
    let mut fx = Fixture::new(State::new("t").with("text", "A"));
    fx.render(r#"<h1>title</h1><div [innerHTML]="text"></div>"#).unwrap();
    assert_eq!(fx.html(), "<h1>title</h1><div>A</div>");
    let (h1, div) = (fx.child(&[0]), fx.child(&[1]));

    fx.state.borrow_mut().insert("text", "B");
    fx.update().unwrap();

    assert_eq!(fx.doc.inner_html(div), "B");
    assert_eq!((fx.child(&[0]), fx.child(&[1])), (h1, div));
    let stats = fx.tree.last_stats();
    assert_eq!(stats.applied, 1);
    assert_eq!(stats.created + stats.replaced + stats.placeholders, 0);
}

#[test]
fn pushing_to_a_loop_creates_only_the_new_sibling() {
    let mut fx = Fixture::new(
        State::new("t").with("items", Value::array([Value::from(10), Value::from(20)])),
    );
    fx.render(r#"<ul><li #for="let x of items" [attr.index]="$index">{x}</li></ul>"#)
        .unwrap();
    assert_eq!(
        fx.html(),
        r#"<ul><li index="0">{x}</li><li index="1">{x}</li></ul>"#
    );
    let ul = fx.child(&[0]);
    let before = fx.elements(ul, "li");

    fx.state.borrow_mut().push("items", 30).unwrap();
    fx.update().unwrap();

    let after = fx.elements(ul, "li");
    assert_eq!(after.len(), 3);
    assert_eq!(&after[..2], &before[..]);
    assert_eq!(fx.doc.attribute(after[2], "index"), Some("2"));
    assert_eq!(fx.tree.last_stats().created, 1);

    fx.state.borrow_mut().remove_at("items", 0);
    fx.update().unwrap();
    assert_eq!(fx.elements(ul, "li").len(), 2);
}

#[test]
fn loop_bindings_reach_attributes() {
    let mut fx = Fixture::new(State::new("t").with(
        "tags",
        Value::array([Value::from("a"), Value::from("b"), Value::from("c")]),
    ));
    fx.render(r#"<b #for="let tag of tags" [title]="$index + ':' + tag"></b>"#)
        .unwrap();
    assert_eq!(
        fx.html(),
        r#"<b title="0:a"></b><b title="1:b"></b><b title="2:c"></b>"#
    );
}

#[test]
fn mapping_loops_bind_keys() {
    let obj = Value::object([("first", Value::from(1)), ("second", Value::from(2))]);
    let mut fx = Fixture::new(State::new("t").with("obj", obj));
    fx.render(
        r#"<ol><li #for="let key in obj" [attr.value]="$prop" [innerHTML]="key + '=' + $value"></li></ol>"#,
    )
    .unwrap();
    assert_eq!(
        fx.html(),
        r#"<ol><li value="first">first=1</li><li value="second">second=2</li></ol>"#
    );
}

#[test]
fn empty_and_missing_iterables_yield_nothing() {
    let mut fx = Fixture::new(State::new("t").with("none", Value::Null).with("empty", Value::array(Vec::<Value>::new())));
    fx.render(r#"<i #for="let a of none"></i><i #for="let b of empty"></i><p></p>"#)
        .unwrap();
    assert_eq!(fx.html(), "<p></p>");
}

#[test]
fn toggling_a_conditional_swaps_with_one_mask() {
    let mut fx = Fixture::new(State::new("t").with("show", true).with("clicks", 0));
    fx.render(r#"<p #if="show" (click)="clicks++">banner</p><span>after</span>"#)
        .unwrap();
    let span = fx.child(&[1]);
    assert_eq!(fx.doc.listener_count(), 1);

    let mut mask = None;
    for round in 1..=6 {
        let show = round % 2 == 0;
        fx.state.borrow_mut().insert("show", show);
        fx.update().unwrap();

        assert_eq!(fx.tree.last_stats().replaced, 1, "round {round}");
        assert_eq!(fx.child(&[1]), span);
        let first = fx.child(&[0]);
        if show {
            assert_eq!(fx.doc.tag(first), Some("p"));
            assert_eq!(fx.doc.listener_count(), 1);
        } else {
            assert_eq!(fx.doc.text(first), Some(""));
            assert_eq!(*mask.get_or_insert(first), first);
            assert_eq!(fx.doc.listener_count(), 0);
        }
    }
    assert_eq!(fx.tree.masks(), 1);

    let p = fx.child(&[0]);
    fx.doc.click(p).unwrap();
    assert_eq!(fx.field("clicks"), Value::from(1));
}

#[test]
fn conditional_is_evaluated_per_loop_clone() {
    let nums = Value::array((1..=4).map(Value::from));
    let mut fx = Fixture::new(State::new("t").with("nums", nums));
    fx.render(r#"<li #for="let n of nums" #if="n % 2 == 0" [textcontent]="n"></li>"#)
        .unwrap();
    assert_eq!(fx.html(), "<li>2</li><li>4</li>");
    assert_eq!(fx.doc.children(fx.root).len(), 4);
}

#[test]
fn shrinking_a_loop_forgets_its_clones_masks_and_components() {
    let rows = |n: i32| Value::array((0..n).map(Value::from));
    let mut fx = Fixture::new(State::new("t").with("rows", rows(5)).with("open", false));
    fx.render(
        r#"<div #for="let r of rows"><i #if="open"></i><row-chart></row-chart></div><p #if="open"></p>"#,
    )
    .unwrap();
    assert_eq!((fx.tree.masks(), fx.tree.boundaries()), (6, 5));

    fx.state.borrow_mut().insert("rows", rows(2));
    fx.update().unwrap();
    assert_eq!((fx.tree.masks(), fx.tree.boundaries()), (3, 2));

    fx.state.borrow_mut().insert("rows", rows(3));
    fx.update().unwrap();
    assert_eq!((fx.tree.masks(), fx.tree.boundaries()), (4, 3));
    assert_eq!(fx.elements(fx.root, "div").len(), 3);
}

#[test]
fn second_pass_without_changes_is_silent() {
    let items = Value::array([Value::from("x"), Value::from("y")]);
    let state = State::new("t")
        .with("items", items)
        .with("on", true)
        .with("width", 12)
        .with("tone", "dark")
        .with("meta", Value::object([("k", Value::from(1))]))
        .with("count", 0);
    let mut fx = Fixture::new(state);
    fx.render(
        r#"<section class="box" [class.active]="on" [style.width.px]="width" [classname]="'box ' + tone">
             <li #for="let it of items" data-kind="row" [attr.meta]="meta" (click.stop)="count++">{it}</li>
             <em #if="!on">off</em>
             <user-card [attr.user]="tone"><b>light</b></user-card>
           </section>"#,
    )
    .unwrap();
    let listeners = fx.doc.listener_count();
    let mutations = fx.doc.mutations();

    fx.update().unwrap();
    assert_eq!(fx.doc.mutations(), mutations);
    assert_eq!(fx.doc.listener_count(), listeners);
    assert!(fx.tree.last_stats().is_noop());
}

#[test]
fn boundaries_are_not_traversed() {
    let mut fx = Fixture::new(State::new("t").with("who", "ada"));
    fx.render(r#"<user-card [attr.name]="who" data-x="1"><b>light</b></user-card>"#)
        .unwrap();
    assert_eq!(
        fx.html(),
        r#"<user-card data-x="1" name="ada"><b>light</b></user-card>"#
    );
    let card = fx.child(&[0]);
    // the nested component rewrites its own content
    let inner = fx.child(&[0, 0, 0]);
    fx.doc.set_text(inner, "owned by the card");

    fx.state.borrow_mut().insert("who", "grace");
    fx.update().unwrap();
    assert_eq!(fx.child(&[0]), card);
    assert_eq!(fx.doc.attribute(card, "name"), Some("grace"));
    assert_eq!(fx.doc.text_content(card), "owned by the card");
}

#[test]
fn boundary_survives_parent_rebuild() {
    let mut fx = Fixture::new(State::new("t").with("wide", false));
    fx.render(r#"<div #if="!wide"><x-chart></x-chart></div><section #if="wide"></section>"#)
        .unwrap();
    let chart = fx.child(&[0, 0]);

    fx.state.borrow_mut().insert("wide", true);
    fx.update().unwrap();
    fx.state.borrow_mut().insert("wide", false);
    fx.update().unwrap();
    assert_eq!(fx.child(&[0, 0]), chart);
}

#[test]
fn prevent_modifier_blocks_navigation() {
    let mut fx = Fixture::new(State::new("t").with("count", 0));
    fx.render(
        r#"<a href="/next" (click.prevent)="count = count + 1">go</a><a href="/plain">plain</a>"#,
    )
    .unwrap();
    let link = fx.child(&[0]);
    for expected in 1..=2 {
        let event = fx.doc.click(link).unwrap();
        assert!(event.is_default_prevented());
        assert_eq!(fx.field("count"), Value::from(expected));
    }
    assert!(fx.doc.navigations().is_empty());

    let plain = fx.child(&[1]);
    fx.doc.click(plain).unwrap();
    assert_eq!(fx.doc.navigations(), ["/plain"]);
}

#[test]
fn stop_and_once_modifiers() {
    let mut fx = Fixture::new(State::new("t").with("outer", 0).with("inner", 0).with("first", 0));
    fx.render(
        r#"<div (click)="outer++"><button (click.stop)="inner++"></button><i (click.once)="first++"></i></div>"#,
    )
    .unwrap();
    let (button, once) = (fx.child(&[0, 0]), fx.child(&[0, 1]));

    fx.doc.click(button).unwrap();
    assert_eq!((fx.field("inner"), fx.field("outer")), (Value::from(1), Value::from(0)));

    fx.doc.click(once).unwrap();
    fx.doc.click(once).unwrap();
    assert_eq!(fx.field("first"), Value::from(1));
    assert_eq!(fx.field("outer"), Value::from(2));

    // each pass re-arms a fired `once` handler without stacking listeners
    fx.update().unwrap();
    assert_eq!(fx.doc.listeners_on(once), 1);
    fx.doc.click(once).unwrap();
    fx.doc.click(once).unwrap();
    assert_eq!(fx.field("first"), Value::from(2));

    fx.update().unwrap();
    fx.update().unwrap();
    assert_eq!(fx.doc.listeners_on(once), 1);
    fx.doc.click(once).unwrap();
    assert_eq!(fx.field("first"), Value::from(3));
}

#[test]
fn rebinding_never_duplicates_listeners() {
    let mut fx = Fixture::new(State::new("t").with("step", 1).with("total", 0));
    fx.render(r#"<button (click)="total = total + step" [title]="step"></button>"#)
        .unwrap();
    let button = fx.child(&[0]);
    for step in 2..5 {
        fx.state.borrow_mut().insert("step", step);
        fx.update().unwrap();
        assert_eq!(fx.doc.listeners_on(button), 1);
    }
    fx.doc.click(button).unwrap();
    assert_eq!(fx.field("total"), Value::from(4));
}

#[test]
fn handlers_see_dataset_and_event() {
    let mut fx = Fixture::new(State::new("t").with("picked", Value::Null).with("last", Value::Null));
    fx.render(r#"<button data-item-id="42" (click)="picked = itemId" (ping)="last = $event.detail"></button>"#)
        .unwrap();
    let button = fx.child(&[0]);
    fx.doc.click(button).unwrap();
    assert_eq!(fx.field("picked"), Value::from("42"));

    let mut ping = Event::new("ping").with_detail("hi");
    fx.doc.dispatch(button, &mut ping).unwrap();
    assert_eq!(fx.field("last"), Value::from("hi"));
}

#[test]
fn failed_expression_aborts_before_any_mutation() {
    let mut fx = Fixture::new(
        State::new("t")
            .with("a", "y")
            .with("b", Value::object([("c", Value::from(1))])),
    );
    fx.render(r#"<p [title]="a"></p><p [title]="b.c"></p>"#).unwrap();
    let mutations = fx.doc.mutations();

    fx.state.borrow_mut().insert("a", "x");
    fx.state.borrow_mut().insert("b", Value::Null);
    let err = fx.update().unwrap_err();
    match &err {
        DirectiveError::Evaluation { expression, tag, .. } => {
            assert_eq!((expression.as_str(), tag.as_str()), ("b.c", "p"));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(fx.doc.mutations(), mutations);
    assert_eq!(fx.doc.attribute(fx.child(&[0]), "title"), Some("y"));

    fx.state.borrow_mut().insert("b", Value::object([("c", Value::from(2))]));
    fx.update().unwrap();
    assert_eq!(fx.html(), r#"<p title="x"></p><p title="2"></p>"#);
}

#[test]
fn undefined_identifier_names_expression_and_tag() {
    let mut fx = Fixture::new(State::new("t"));
    let err = fx.render(r#"<section><h2 [title]="missing"></h2></section>"#).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("missing") && message.contains("<h2>"), "{message}");
    assert!(fx.html().is_empty());
}

#[test]
fn malformed_loop_is_rejected() {
    let mut fx = Fixture::new(State::new("t").with("items", Value::array(Vec::<Value>::new())));
    let err = fx.render(r#"<li #for="item in items"></li>"#).unwrap_err();
    assert!(matches!(err, DirectiveError::Malformed { ref directive, .. } if directive == "#for"));

    let mut fx = Fixture::new(State::new("t").with("n", 3));
    let err = fx.render(r#"<li #for="let i of n"></li>"#).unwrap_err();
    assert!(matches!(err, DirectiveError::Evaluation { .. }));
}

#[test]
fn builtin_appliers() {
    let state = State::new("t")
        .with("color", "red")
        .with("size", 3)
        .with("on", false)
        .with("cfg", Value::object([("a", Value::from(1))]))
        .with("busy", true)
        .with("label", Value::Null);
    let mut fx = Fixture::new(state);
    fx.render(
        r#"<div class="x on" [style.color]="color" [style.margin.em]="size" [class.on]="on" [attribute.data-cfg]="cfg" [disabled]="busy" [aria-label]="label"></div>"#,
    )
    .unwrap();
    let div = fx.child(&[0]);
    assert_eq!(fx.doc.attribute(div, "style"), Some("color: red; margin: 3em;"));
    assert_eq!(fx.doc.attribute(div, "class"), Some("x"));
    assert_eq!(fx.doc.attribute(div, "data-cfg"), Some(r#"{"a":1}"#));
    assert!(fx.doc.has_attribute(div, "disabled"));
    assert!(!fx.doc.has_attribute(div, "aria-label"));

    fx.state.borrow_mut().insert("label", "close");
    fx.state.borrow_mut().insert("color", Value::Null);
    fx.update().unwrap();
    assert_eq!(fx.doc.attribute(div, "aria-label"), Some("close"));
    assert_eq!(fx.doc.attribute(div, "style"), Some("margin: 3em;"));
}

#[test]
fn registered_applier_runs_before_builtins() {
    let registry = Registry::new().with_fn("tooltip", |doc, node, _binding, value| {
        doc.set_attribute(node, "data-tip", value.to_display_string());
        Ok(())
    });
    let mut fx = Fixture::new(State::new("t").with("msg", "hello"));
    fx.tree = TreeNode::with_config(EngineConfig::default()).with_registry(registry);
    fx.render(r#"<span [tooltip]="msg"></span><span tooltip="msg + '!'"></span>"#)
        .unwrap();
    assert_eq!(
        fx.html(),
        r#"<span data-tip="hello"></span><span data-tip="hello!"></span>"#
    );
}

#[test]
fn static_attributes_follow_the_template() {
    let mut fx = Fixture::new(
        State::new("t")
            .with("one", Value::array([Value::from(1)]))
            .with("two", Value::array(Vec::<Value>::new())),
    );
    fx.render(r#"<p #for="let a of one" class="a"></p><p #for="let b of two" id="b"></p>"#)
        .unwrap();
    assert_eq!(fx.html(), r#"<p class="a"></p>"#);
    let p = fx.child(&[0]);

    {
        let mut state = fx.state.borrow_mut();
        let moved = state.remove_at("one", 0).unwrap();
        state.push("two", moved).unwrap();
    }
    fx.update().unwrap();
    assert_eq!(fx.html(), r#"<p id="b"></p>"#);
    assert_eq!(fx.child(&[0]), p);
}

#[test]
fn template_attributes_do_not_hide_bound_classes() {
    let selected = || Value::object([("sel", Value::Bool(true))]);
    let mut fx = Fixture::new(State::new("t").with("items", Value::array([selected()])));
    fx.render(
        r#"<li #for="let x of items" class="item" [class.sel]="x.sel"></li><li class="footer" [class.sel]="true"></li>"#,
    )
    .unwrap();
    assert_eq!(
        fx.html(),
        r#"<li class="item sel"></li><li class="footer sel"></li>"#
    );
    let second = fx.child(&[1]);

    fx.state.borrow_mut().push("items", selected()).unwrap();
    fx.update().unwrap();
    assert_eq!(
        fx.html(),
        r#"<li class="item sel"></li><li class="item sel"></li><li class="footer sel"></li>"#
    );
    assert_eq!(fx.child(&[1]), second);
}

#[test]
fn first_render_reuses_matching_live_content() {
    let mut fx = Fixture::new(State::new("t").with("n", 5));
    let root = fx.root;
    let existing = fx.doc.create_element("p");
    fx.doc.append_child(root, existing);

    fx.render(r#"<p [title]="n"></p>"#).unwrap();
    assert_eq!(fx.child(&[0]), existing);
    assert_eq!(fx.html(), r#"<p title="5"></p>"#);
}
