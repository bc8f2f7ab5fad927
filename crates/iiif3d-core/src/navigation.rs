//! Type-tag lookups over a host's scene forest.
//!
//! Every walk tolerates disconnected or partially-built trees: a missing
//! ancestor is `None`, never a panic.

use std::collections::HashSet;

use crate::host::SceneHost;
use crate::id::{NodeId, NodeKind};
use crate::provenance::IIIF_ID;

/// Walk parent links from `node` (exclusive) to the first node tagged `kind`.
pub fn nearest_ancestor_of_type<H: SceneHost + ?Sized>(
    host: &H,
    node: NodeId,
    kind: NodeKind,
) -> Option<NodeId> {
    let mut seen = HashSet::new();
    let mut current = host.parent(node);
    while let Some(id) = current {
        if !seen.insert(id) {
            return None;
        }
        if host.node_kind(id) == Some(kind) {
            return Some(id);
        }
        current = host.parent(id);
    }
    None
}

/// Immediate children of `container` tagged `kind`, in host order.
pub fn children_of_type<H: SceneHost + ?Sized>(
    host: &H,
    container: NodeId,
    kind: NodeKind,
) -> Vec<NodeId> {
    host.children(container)
        .into_iter()
        .filter(|c| host.node_kind(*c) == Some(kind))
        .collect()
}

/// Immediate children that are bodies (Model, Camera or Light).
pub fn body_children<H: SceneHost + ?Sized>(host: &H, container: NodeId) -> Vec<NodeId> {
    host.children(container)
        .into_iter()
        .filter(|c| host.node_kind(*c).is_some_and(NodeKind::is_body))
        .collect()
}

/// Root nodes tagged `kind`.
pub fn roots_of_type<H: SceneHost + ?Sized>(host: &H, kind: NodeKind) -> Vec<NodeId> {
    host.roots()
        .into_iter()
        .filter(|r| host.node_kind(*r) == Some(kind))
        .collect()
}

/// Every node reachable from the roots, depth first.
pub fn descendants<H: SceneHost + ?Sized>(host: &H, start: &[NodeId]) -> Vec<NodeId> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let mut stack: Vec<NodeId> = start.iter().rev().copied().collect();
    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        out.push(id);
        let children = host.children(id);
        stack.extend(children.into_iter().rev());
    }
    out
}

/// Every node in the forest, depth first from the roots.
pub fn all_nodes<H: SceneHost + ?Sized>(host: &H) -> Vec<NodeId> {
    descendants(host, &host.roots())
}

/// Nodes tagged `kind` whose stored IIIF id equals `id`.
pub fn find_by_iiif_id<H: SceneHost + ?Sized>(host: &H, kind: NodeKind, id: &str) -> Vec<NodeId> {
    all_nodes(host)
        .into_iter()
        .filter(|n| host.node_kind(*n) == Some(kind) && host.node_property(*n, IIIF_ID) == Some(id))
        .collect()
}

/// The Scene a body or container belongs to.
pub fn enclosing_scene<H: SceneHost + ?Sized>(host: &H, node: NodeId) -> Option<NodeId> {
    nearest_ancestor_of_type(host, node, NodeKind::Scene)
}
