use trellis_markup::{AttrKind, Node, parse_fragment};

#[test]
fn parse_element_with_text() {
    let nodes = parse_fragment("<div>hi</div>").unwrap();
    assert_eq!(nodes.len(), 1);
    match &nodes[0] {
        Node::Element(el) => {
            assert_eq!(el.tag, "div");
            assert_eq!(el.children, vec![Node::Text("hi".into())]);
        }
        _ => panic!("expected element"),
    }
}

#[test]
fn names_are_lowercased_and_directives_classified() {
    let src = r#"<LI #for="let x of items" [attr.index]="$index" (Click.prevent)='go()' class=row hidden>x</LI>"#;
    let nodes = parse_fragment(src).unwrap();
    let Node::Element(el) = &nodes[0] else {
        panic!("expected element");
    };
    assert_eq!(el.tag, "li");
    let kinds: Vec<AttrKind> = el.attrs.iter().map(|a| a.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            AttrKind::For,
            AttrKind::Binding("attr.index"),
            AttrKind::Event("click.prevent"),
            AttrKind::Static,
            AttrKind::Static,
        ]
    );
    assert_eq!(el.attr("(click.prevent)"), Some("go()"));
    assert_eq!(el.attr("class"), Some("row"));
    assert_eq!(el.attr("hidden"), Some(""));
}

#[test]
fn void_and_self_closing_elements_take_no_children() {
    let nodes = parse_fragment("<p><input type=\"text\"><br/>after</p>").unwrap();
    let Node::Element(p) = &nodes[0] else {
        panic!("expected element");
    };
    assert_eq!(p.children.len(), 3);
    assert!(matches!(&p.children[2], Node::Text(t) if t == "after"));
}

#[test]
fn unclosed_and_stray_tags_are_tolerated() {
    let nodes = parse_fragment("<ul><li>a<li>b</ul></span>").unwrap();
    assert_eq!(nodes.len(), 1);
    let Node::Element(ul) = &nodes[0] else {
        panic!("expected element");
    };
    // the second <li> nests inside the first; closing </ul> closes both
    assert_eq!(ul.children.len(), 1);
}

#[test]
fn raw_elements_keep_their_content() {
    let nodes = parse_fragment("<style>a > b { color: red }</style><div>&lt;ok&gt; &amp; &#65;&#x42;</div>").unwrap();
    assert_eq!(nodes.len(), 2);
    let Node::Element(style) = &nodes[0] else {
        panic!("expected element");
    };
    assert_eq!(style.children, vec![Node::Text("a > b { color: red }".into())]);
    let Node::Element(div) = &nodes[1] else {
        panic!("expected element");
    };
    assert_eq!(div.children, vec![Node::Text("<ok> & AB".into())]);
}

#[test]
fn comments_and_root_whitespace() {
    let nodes = parse_fragment("\n  <!-- note -->\n  <b>x</b>\n").unwrap();
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0], Node::Comment(" note ".into()));
}

#[test]
fn malformed_tag_reports_position() {
    let err = parse_fragment("<div>\n<p class=\"x></p>").unwrap_err();
    match err {
        trellis_markup::MarkupError::Syntax { line, .. } => assert_eq!(line, 2),
        other => panic!("unexpected {other:?}"),
    }
}
