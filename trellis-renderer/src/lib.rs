//! Template rendering: builds virtual trees from markup with directives,
//! patches a live [`Document`](trellis_dom::Document) positionally, and
//! hosts components on top of that.

pub mod builder;
pub mod component;
pub mod config;
pub mod directive;
mod events;
mod reconcile;
pub mod runtime;
mod tree;

pub use builder::{Builder, snapshot};
pub use component::{Component, Host, parse_attribute};
pub use config::EngineConfig;
pub use directive::{Entry, ForDirective, entries, parse_for};
pub use reconcile::PatchStats;
pub use runtime::{Applier, Registry, apply_builtin};
pub use tree::TreeNode;
