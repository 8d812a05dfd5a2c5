use crate::{VNode, changed};

/// What the reconciler does at one child position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Nothing was here before: materialize the new node.
    Create,
    /// The node is gone: leave an empty text node so later indices hold.
    Placeholder,
    /// Kind or tag differs: rebuild from the new node.
    Replace,
    /// Same kind: rebind directives and recurse into children.
    Update,
}

pub fn step(new: Option<&VNode>, old: Option<&VNode>) -> Option<Step> {
    match (new, old) {
        (None, None) => None,
        (Some(_), None) => Some(Step::Create),
        (None, Some(_)) => Some(Step::Placeholder),
        (Some(n), Some(o)) if changed(n, o) => Some(Step::Replace),
        (Some(_), Some(_)) => Some(Step::Update),
    }
}

/// Positional plan over `max(new.len(), old.len())` children.
pub fn plan(new: &[VNode], old: &[VNode]) -> Vec<Step> {
    let len = new.len().max(old.len());
    (0..len)
        .filter_map(|i| step(new.get(i), old.get(i)))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrPatch {
    Set(String, String),
    Remove(String),
}

/// Static attribute changes between two matched elements.
pub fn diff_attrs(old: &[(String, String)], new: &[(String, String)]) -> Vec<AttrPatch> {
    let mut patches = Vec::new();
    for (k, v_new) in new {
        match old.iter().find(|(name, _)| name == k) {
            Some((_, v_old)) if v_old == v_new => {}
            _ => patches.push(AttrPatch::Set(k.clone(), v_new.clone())),
        }
    }
    for (k, _) in old {
        if !new.iter().any(|(name, _)| name == k) {
            patches.push(AttrPatch::Remove(k.clone()));
        }
    }
    patches
}
