use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;
use trellis_core::{Evaluator, Params, Scope};
use trellis_dom::{DirectiveError, Document, NodeId, VNode};

use crate::builder::{Builder, snapshot};
use crate::config::EngineConfig;
use crate::events::Context;
use crate::reconcile::{PatchStats, Patcher, Resolved, Retained, resolve};
use crate::runtime::Registry;

/// A template bound to one container of a live [`Document`].
///
/// `render` parses the template and patches the container against a
/// snapshot of what it currently holds; every later `update` diffs against
/// the tree retained from the previous pass. A pass that fails leaves the
/// previous baseline in place.
#[derive(Debug, Default)]
pub struct TreeNode {
    config: EngineConfig,
    registry: Registry,
    evaluator: Rc<Evaluator>,
    template: Option<Document>,
    container: Option<NodeId>,
    previous: Option<VNode>,
    retained: Retained,
    last: PatchStats,
    passes: u64,
}

impl TreeNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn evaluator(&self) -> &Rc<Evaluator> {
        &self.evaluator
    }

    pub fn container(&self) -> Option<NodeId> {
        self.container
    }

    /// The tree the next `update` diffs against.
    pub fn previous(&self) -> Option<&VNode> {
        self.previous.as_ref()
    }

    pub fn last_stats(&self) -> PatchStats {
        self.last
    }

    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Conditional placeholders kept alive for reuse.
    pub fn masks(&self) -> usize {
        self.retained.masks()
    }

    /// Nested component elements kept for reuse.
    pub fn boundaries(&self) -> usize {
        self.retained.boundaries()
    }

    /// Listeners this tree has attached and not yet released.
    pub fn bound_listeners(&self) -> usize {
        self.retained.bound_listeners()
    }

    /// First pass: parses `markup` and patches `container` from whatever it
    /// holds now.
    pub fn render(
        &mut self,
        doc: &mut Document,
        container: NodeId,
        markup: &str,
        scope: &Rc<RefCell<dyn Scope>>,
        params: &Params,
    ) -> Result<PatchStats, DirectiveError> {
        let template = Document::from_markup(markup)?;
        let baseline = snapshot(doc, container, &self.config);
        self.template = Some(template);
        self.container = Some(container);
        self.retained = Retained::default();
        self.pass(doc, baseline, scope, params)
    }

    /// Rebuilds from the current scope and patches against the last pass.
    /// Does nothing before the first `render`.
    pub fn update(
        &mut self,
        doc: &mut Document,
        scope: &Rc<RefCell<dyn Scope>>,
        params: &Params,
    ) -> Result<PatchStats, DirectiveError> {
        let Some(baseline) = self.previous.take() else {
            debug!("update before first render ignored");
            return Ok(PatchStats::default());
        };
        self.pass(doc, baseline, scope, params)
    }

    fn pass(
        &mut self,
        doc: &mut Document,
        baseline: VNode,
        scope: &Rc<RefCell<dyn Scope>>,
        params: &Params,
    ) -> Result<PatchStats, DirectiveError> {
        let (Some(template), Some(container)) = (self.template.as_ref(), self.container) else {
            return Ok(PatchStats::default());
        };
        let span = tracing::debug_span!("render_pass", container = container.index(), pass = self.passes);
        let _enter = span.enter();

        let prepared = {
            let mut scope = scope.borrow_mut();
            Builder::new(template, &mut *scope, &self.evaluator, &self.registry, &self.config)
                .build(template.root(), params)
                .and_then(|tree| {
                    let mut resolved = Resolved::new();
                    resolve(&tree, &mut *scope, &self.evaluator, &self.registry, &mut resolved)?;
                    Ok((tree, resolved))
                })
        };
        let (tree, resolved) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => {
                self.previous = Some(baseline);
                return Err(e);
            }
        };

        let ctx = Context {
            scope: Rc::clone(scope),
            evaluator: Rc::clone(&self.evaluator),
        };
        let mut patcher = Patcher::new(
            doc,
            template,
            &mut self.retained,
            &resolved,
            &self.registry,
            &self.config,
            &ctx,
        );
        let outcome = patcher.patch_children(container, tree.children(), baseline.children());
        let stats = patcher.stats;
        match outcome {
            Ok(()) => {
                let pruned = self.retained.prune(&tree);
                debug!(
                    created = stats.created,
                    replaced = stats.replaced,
                    placeholders = stats.placeholders,
                    updated = stats.updated,
                    applied = stats.applied,
                    pruned,
                    "render pass done"
                );
                self.previous = Some(tree);
                self.last = stats;
                self.passes += 1;
                Ok(stats)
            }
            Err(e) => {
                self.previous = Some(baseline);
                Err(e)
            }
        }
    }
}
