use std::cell::RefCell;
use std::rc::Rc;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use trellis_core::{Params, Scope, State, Value};
use trellis_dom::Document;
use trellis_renderer::TreeNode;

const LIST: &str = r#"<ul><li #for="let item of items" [class.odd]="$index % 2" (click)="pick(item)"><span [textcontent]="item"></span></li></ul><p #if="items.length > 10">many</p>"#;

fn scope_with(count: usize) -> Rc<RefCell<dyn Scope>> {
    let items = Value::array((0..count).map(|i| Value::from(format!("item {i}"))));
    Rc::new(RefCell::new(
        State::new("bench")
            .with("items", items)
            .with_method("pick", |_, _| Ok(Value::Undefined)),
    ))
}

fn bench_first_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("first_render");
    group.sample_size(20);
    for &count in &[10usize, 100, 500] {
        let scope = scope_with(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &scope, |b, scope| {
            b.iter(|| {
                let mut doc = Document::new();
                let root = doc.root();
                let mut tree = TreeNode::new();
                tree.render(&mut doc, root, LIST, scope, &Params::new())
                    .expect("render");
            });
        });
    }
    group.finish();
}

fn bench_idle_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("idle_update");
    group.sample_size(20);
    for &count in &[10usize, 100, 500] {
        let scope = scope_with(count);
        let mut doc = Document::new();
        let root = doc.root();
        let mut tree = TreeNode::new();
        tree.render(&mut doc, root, LIST, &scope, &Params::new())
            .expect("render");
        group.bench_function(BenchmarkId::from_parameter(count), |b| {
            b.iter(|| {
                let stats = tree.update(&mut doc, &scope, &Params::new()).expect("update");
                assert!(stats.is_noop());
            });
        });
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default().without_plots();
    targets = bench_first_render, bench_idle_update
}
criterion_main!(benches);
