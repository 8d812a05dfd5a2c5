use trellis_markup::{MarkupError, is_component, parse_component, parse_fragment};

#[test]
fn splits_template_and_styles() {
    let src = r#"
<style>
  .a { color: red; }
</style>
<template id="root">
  <div class="a"><template><i>nested</i></template></div>
</template>
<!-- trailing -->
<style>.b {}</style>
"#;
    assert!(is_component(src));
    let component = parse_component(src).unwrap();
    assert_eq!(component.styles, vec![".a { color: red; }", ".b {}"]);
    assert!(component.template.contains("<template><i>nested</i></template>"));
    assert_eq!(component.template_attrs[0].name, "id");

    let nodes = parse_fragment(&component.template).unwrap();
    assert_eq!(nodes.len(), 1);
}

#[test]
fn style_only_file_has_no_template() {
    assert_eq!(
        parse_component("<style>p {}</style>"),
        Err(MarkupError::MissingTemplate)
    );
}

#[test]
fn bare_markup_is_not_a_component() {
    assert!(!is_component("<div>hello</div>"));
    assert!(parse_component("<div>hello</div>").is_err());
}
