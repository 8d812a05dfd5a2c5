use std::path::PathBuf;

use trellis_cli::{check_cmd, load_state, render_cmd, render_source, Report, Source, StateInput};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

#[test]
fn renders_component_file_with_state_file() {
    let state = fixture("todo.json");
    let html = render_cmd(&fixture("todo.html"), StateInput::File(&state), false)
        .expect("render todo");
    assert!(html.starts_with("<style>.done { text-decoration: line-through; }</style>"));
    assert!(html.contains("<h1>Today</h1>"));
    assert!(html.contains(r#"<li class="done"><span>write</span></li><li><span>test</span></li>"#));
    assert!(!html.contains("Nothing to do"));
}

#[test]
fn inline_state_feeds_conditionals() {
    let html = render_cmd(
        &fixture("todo.html"),
        StateInput::Inline(r#"{"title": "Empty", "items": []}"#),
        false,
    )
    .expect("render empty todo");
    assert!(html.contains("<p>Nothing to do</p>"));
    assert!(!html.contains("<li"));
}

#[test]
fn pretty_output_indents_nested_nodes() {
    let source =
        Source::parse(r#"<b [textcontent]="a"></b> <ul><li #for="let n of list" [textcontent]="n"></li></ul>"#)
            .unwrap();
    let state = load_state(StateInput::Inline(r#"{"a": 1, "list": ["x", "y"]}"#)).unwrap();
    let html = render_source(source, state, true).unwrap();
    assert_eq!(html, "<b>1</b>\n<ul>\n  <li>x</li>\n  <li>y</li>\n</ul>");
}

#[test]
fn bare_markup_is_not_split() {
    let source = Source::parse("<div>plain</div>").unwrap();
    assert_eq!(source.template, "<div>plain</div>");
    assert!(source.styles.is_empty());
}

#[test]
fn check_reports_listeners_and_hidden_conditionals() {
    let state = fixture("todo.json");
    let report = check_cmd(&fixture("todo.html"), StateInput::File(&state)).expect("check todo");
    assert_eq!(report.listeners, 2);
    assert_eq!(report.hidden, 1);
    assert!(report.nodes > 0);
    assert!(report.to_string().starts_with("ok: "));
}

#[test]
fn check_names_failing_expression_and_tag() {
    let err = check_cmd(&fixture("broken.html"), StateInput::Empty).unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("broken.html failed to build"), "{message}");
    assert!(message.contains("missing.name"), "{message}");
    assert!(message.contains("<span>"), "{message}");
}

#[test]
fn state_must_be_an_object() {
    assert!(load_state(StateInput::Inline("[1, 2]")).is_err());
    assert!(load_state(StateInput::Inline("{nope")).is_err());
    assert_eq!(Report::default().listeners, 0);
}

#[test]
fn missing_file_is_reported_with_path() {
    let err = render_cmd(&fixture("absent.html"), StateInput::Empty, false).unwrap_err();
    assert!(err.to_string().contains("absent.html"));
}
