/// Knobs shared by a [`TreeNode`](crate::TreeNode) and the hosts built on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// A tag containing this character is a nested component boundary.
    pub boundary_separator: char,
    /// Coalesce update requests into one deferred pass.
    pub batch_updates: bool,
    /// Diff static attributes of matched elements by name.
    pub sync_static_attributes: bool,
    /// Upper bound on back-to-back passes when a host settles.
    pub max_flush_passes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            boundary_separator: '-',
            batch_updates: true,
            sync_static_attributes: true,
            max_flush_passes: 8,
        }
    }
}

impl EngineConfig {
    pub fn with_boundary_separator(mut self, separator: char) -> Self {
        self.boundary_separator = separator;
        self
    }

    pub fn with_batch_updates(mut self, on: bool) -> Self {
        self.batch_updates = on;
        self
    }

    pub fn with_sync_static_attributes(mut self, on: bool) -> Self {
        self.sync_static_attributes = on;
        self
    }

    pub fn with_max_flush_passes(mut self, passes: usize) -> Self {
        self.max_flush_passes = passes.max(1);
        self
    }

    pub fn is_boundary(&self, tag: &str) -> bool {
        tag.contains(self.boundary_separator)
    }
}
