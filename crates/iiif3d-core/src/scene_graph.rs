//! In-memory scene graph implementing [`SceneHost`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use glam::{DMat4, DVec3};
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use crate::bounds::Aabb;
use crate::error::AssetError;
use crate::host::{AssetSource, BodySettings, MeshInfo, NodeTransform, SceneHost};
use crate::id::{NodeId, NodeKind};

// ---------------------------------------------------------------------------
// Asset table
// ---------------------------------------------------------------------------

/// In-memory [`AssetSource`]: URLs and decoded meshes are registered up front.
///
/// `file://` URLs that were not registered resolve to their path.
#[derive(Debug, Clone, Default)]
pub struct AssetTable {
    urls: BTreeMap<String, PathBuf>,
    meshes: BTreeMap<PathBuf, Vec<MeshInfo>>,
}

impl AssetTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `url` as resolving to `path`, which decodes to `meshes`.
    pub fn register(
        &mut self,
        url: impl Into<String>,
        path: impl Into<PathBuf>,
        meshes: Vec<MeshInfo>,
    ) -> &mut Self {
        let path = path.into();
        self.urls.insert(url.into(), path.clone());
        self.meshes.insert(path, meshes);
        self
    }

    /// Register geometry for a local path without a URL.
    pub fn register_file(&mut self, path: impl Into<PathBuf>, meshes: Vec<MeshInfo>) -> &mut Self {
        self.meshes.insert(path.into(), meshes);
        self
    }
}

impl AssetSource for AssetTable {
    fn resolve_asset(&self, url: &str) -> Result<PathBuf, AssetError> {
        if let Some(path) = self.urls.get(url) {
            return Ok(path.clone());
        }
        if let Some(path) = url.strip_prefix("file://") {
            return Ok(PathBuf::from(path));
        }
        Err(AssetError::Fetch {
            url: url.to_string(),
            detail: "not registered".into(),
        })
    }

    fn load_geometry(
        &self,
        path: &Path,
        _format_hint: Option<&str>,
    ) -> Result<Vec<MeshInfo>, AssetError> {
        self.meshes
            .get(path)
            .cloned()
            .ok_or_else(|| AssetError::Decode {
                path: path.to_path_buf(),
                detail: "no geometry registered".into(),
            })
    }
}

fn default_assets() -> Box<dyn AssetSource> {
    Box::new(AssetTable::default())
}

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

/// One node of the in-memory graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneNode {
    pub name: String,
    /// `None` for untagged geometry.
    pub kind: Option<NodeKind>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub transform: NodeTransform,
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub settings: Option<BodySettings>,
    /// Mesh bounds in the node's local space.
    #[serde(default)]
    pub local_bounds: Option<Aabb>,
    /// Scene containers only.
    #[serde(default)]
    pub background: Option<DVec3>,
}

impl SceneNode {
    fn new(name: &str, kind: Option<NodeKind>, parent: Option<NodeId>) -> Self {
        Self {
            name: name.to_string(),
            kind,
            parent,
            children: Vec::new(),
            transform: NodeTransform::default(),
            properties: BTreeMap::new(),
            settings: None,
            local_bounds: None,
            background: None,
        }
    }
}

// ---------------------------------------------------------------------------
// SceneGraph
// ---------------------------------------------------------------------------

/// A forest of named, tagged nodes with transforms and string properties.
///
/// Roots and children keep creation order. The asset source is not
/// serialized; a deserialized graph starts with an empty [`AssetTable`].
#[derive(Debug, Serialize, Deserialize)]
pub struct SceneGraph {
    nodes: SlotMap<NodeId, SceneNode>,
    roots: Vec<NodeId>,
    #[serde(skip, default = "default_assets")]
    assets: Box<dyn AssetSource>,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::with_assets(default_assets())
    }

    pub fn with_assets(assets: Box<dyn AssetSource>) -> Self {
        Self {
            nodes: SlotMap::with_key(),
            roots: Vec::new(),
            assets,
        }
    }

    pub fn set_assets(&mut self, assets: Box<dyn AssetSource>) {
        self.assets = assets;
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(node)
    }

    pub fn node(&self, node: NodeId) -> Option<&SceneNode> {
        self.nodes.get(node)
    }

    /// All node ids in depth-first, creation order.
    pub fn walk(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            if let Some(node) = self.nodes.get(id) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    pub fn set_local_bounds(&mut self, node: NodeId, bounds: Option<Aabb>) {
        if let Some(n) = self.nodes.get_mut(node) {
            n.local_bounds = bounds;
        }
    }

    pub fn rename(&mut self, node: NodeId, name: &str) {
        if let Some(n) = self.nodes.get_mut(node) {
            n.name = name.to_string();
        }
    }

    /// Parent-composed transform of a node.
    pub fn world_matrix(&self, node: NodeId) -> DMat4 {
        let mut matrix = DMat4::IDENTITY;
        let mut current = Some(node);
        let mut steps = 0;
        while let Some(id) = current {
            let Some(n) = self.nodes.get(id) else { break };
            matrix = n.transform.to_matrix() * matrix;
            current = n.parent;
            steps += 1;
            if steps > self.nodes.len() {
                break;
            }
        }
        matrix
    }

    fn insert(&mut self, name: &str, kind: Option<NodeKind>, parent: Option<NodeId>) -> NodeId {
        let parent = parent.filter(|p| self.nodes.contains_key(*p));
        let id = self.nodes.insert(SceneNode::new(name, kind, parent));
        match parent.and_then(|p| self.nodes.get_mut(p)) {
            Some(p) => p.children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    fn is_ancestor_or_self(&self, candidate: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        let mut steps = 0;
        while let Some(id) = current {
            if id == candidate {
                return true;
            }
            current = self.nodes.get(id).and_then(|n| n.parent);
            steps += 1;
            if steps > self.nodes.len() {
                break;
            }
        }
        false
    }

    fn collect_bounds(&self, node: NodeId, acc: &mut Option<Aabb>) {
        let Some(n) = self.nodes.get(node) else {
            return;
        };
        if let Some(local) = n.local_bounds {
            let world = local.transform(&self.world_matrix(node));
            *acc = Some(match acc {
                Some(b) => b.union(&world),
                None => world,
            });
        }
        for child in &n.children {
            self.collect_bounds(*child, acc);
        }
    }
}

impl SceneHost for SceneGraph {
    fn create_container_node(
        &mut self,
        kind: NodeKind,
        name: &str,
        parent: Option<NodeId>,
    ) -> NodeId {
        self.insert(name, Some(kind), parent)
    }

    fn create_body_node(&mut self, kind: NodeKind, name: &str, parent: NodeId) -> NodeId {
        self.insert(name, Some(kind), Some(parent))
    }

    fn set_parent(&mut self, node: NodeId, parent: Option<NodeId>) {
        if !self.nodes.contains_key(node) {
            return;
        }
        let parent = parent.filter(|p| self.nodes.contains_key(*p));
        if let Some(p) = parent {
            if self.is_ancestor_or_self(node, p) {
                log::warn!("refusing to parent {node:?} under its own descendant {p:?}");
                return;
            }
        }
        let old = self.nodes.get(node).and_then(|n| n.parent);
        match old.and_then(|o| self.nodes.get_mut(o)) {
            Some(o) => o.children.retain(|c| *c != node),
            None => self.roots.retain(|r| *r != node),
        }
        match parent.and_then(|p| self.nodes.get_mut(p)) {
            Some(p) => p.children.push(node),
            None => self.roots.push(node),
        }
        if let Some(n) = self.nodes.get_mut(node) {
            n.parent = parent;
        }
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node).and_then(|n| n.parent)
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn roots(&self) -> Vec<NodeId> {
        self.roots.clone()
    }

    fn node_kind(&self, node: NodeId) -> Option<NodeKind> {
        self.nodes.get(node).and_then(|n| n.kind)
    }

    fn node_name(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(node).map(|n| n.name.as_str())
    }

    fn set_node_transform(&mut self, node: NodeId, transform: NodeTransform) {
        if let Some(n) = self.nodes.get_mut(node) {
            n.transform = transform;
        }
    }

    fn node_transform(&self, node: NodeId) -> Option<NodeTransform> {
        self.nodes.get(node).map(|n| n.transform)
    }

    fn set_node_property(&mut self, node: NodeId, key: &str, value: String) {
        if let Some(n) = self.nodes.get_mut(node) {
            n.properties.insert(key.to_string(), value);
        }
    }

    fn node_property(&self, node: NodeId, key: &str) -> Option<&str> {
        self.nodes
            .get(node)
            .and_then(|n| n.properties.get(key))
            .map(String::as_str)
    }

    fn node_properties(&self, node: NodeId) -> Vec<String> {
        self.nodes
            .get(node)
            .map(|n| n.properties.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn set_body_settings(&mut self, node: NodeId, settings: BodySettings) {
        if let Some(n) = self.nodes.get_mut(node) {
            n.settings = Some(settings);
        }
    }

    fn body_settings(&self, node: NodeId) -> Option<BodySettings> {
        self.nodes.get(node).and_then(|n| n.settings)
    }

    fn set_scene_background(&mut self, scene: NodeId, color: Option<DVec3>) {
        if let Some(n) = self.nodes.get_mut(scene) {
            n.background = color;
        }
    }

    fn scene_background(&self, scene: NodeId) -> Option<DVec3> {
        self.nodes.get(scene).and_then(|n| n.background)
    }

    fn resolve_asset(&mut self, url: &str) -> Result<PathBuf, AssetError> {
        self.assets.resolve_asset(url)
    }

    fn import_geometry(
        &mut self,
        path: &Path,
        format_hint: Option<&str>,
    ) -> Result<Vec<NodeId>, AssetError> {
        let meshes = self.assets.load_geometry(path, format_hint)?;
        let ids = meshes
            .into_iter()
            .map(|mesh| {
                let id = self.insert(&mesh.name, None, None);
                self.set_local_bounds(id, mesh.bounds);
                id
            })
            .collect();
        Ok(ids)
    }

    fn compute_world_bounds(&self, nodes: &[NodeId]) -> Option<Aabb> {
        let mut acc = None;
        for node in nodes {
            self.collect_bounds(*node, &mut acc);
        }
        acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube(name: &str) -> MeshInfo {
        MeshInfo {
            name: name.to_string(),
            bounds: Some(Aabb::new(DVec3::splat(-1.0), DVec3::ONE)),
        }
    }

    #[test]
    fn containers_nest_in_creation_order() {
        let mut g = SceneGraph::new();
        let m = g.create_container_node(NodeKind::Manifest, "m", None);
        let s1 = g.create_container_node(NodeKind::Scene, "s1", Some(m));
        let s2 = g.create_container_node(NodeKind::Scene, "s2", Some(m));
        assert_eq!(g.roots(), vec![m]);
        assert_eq!(g.children(m), vec![s1, s2]);
        assert_eq!(g.parent(s2), Some(m));
        assert_eq!(g.node_kind(s1), Some(NodeKind::Scene));
        assert_eq!(g.walk(), vec![m, s1, s2]);
    }

    #[test]
    fn set_parent_moves_between_roots_and_children() {
        let mut g = SceneGraph::new();
        let a = g.create_container_node(NodeKind::Scene, "a", None);
        let b = g.create_container_node(NodeKind::Annotation, "b", None);
        g.set_parent(b, Some(a));
        assert_eq!(g.roots(), vec![a]);
        assert_eq!(g.children(a), vec![b]);
        g.set_parent(b, None);
        assert_eq!(g.roots(), vec![a, b]);
        assert!(g.children(a).is_empty());
    }

    #[test]
    fn set_parent_refuses_cycles() {
        let mut g = SceneGraph::new();
        let a = g.create_container_node(NodeKind::Scene, "a", None);
        let b = g.create_container_node(NodeKind::AnnotationPage, "b", Some(a));
        g.set_parent(a, Some(b));
        assert_eq!(g.parent(a), None);
        assert_eq!(g.parent(b), Some(a));
    }

    #[test]
    fn properties_are_listed_sorted() {
        let mut g = SceneGraph::new();
        let a = g.create_container_node(NodeKind::Scene, "a", None);
        g.set_node_property(a, "iiif_json", "{}".into());
        g.set_node_property(a, "iiif_id", "https://x/s".into());
        assert_eq!(g.node_properties(a), vec!["iiif_id", "iiif_json"]);
        assert_eq!(g.node_property(a, "iiif_id"), Some("https://x/s"));
        assert_eq!(g.node_property(a, "missing"), None);
    }

    #[test]
    fn scene_background_is_set_and_cleared() {
        let mut g = SceneGraph::new();
        let s = g.create_container_node(NodeKind::Scene, "s", None);
        assert_eq!(g.scene_background(s), None);
        g.set_scene_background(s, Some(DVec3::new(0.0, 0.5, 1.0)));
        assert_eq!(g.scene_background(s), Some(DVec3::new(0.0, 0.5, 1.0)));
        g.set_scene_background(s, None);
        assert_eq!(g.scene_background(s), None);
    }

    #[test]
    fn import_geometry_creates_detached_untagged_nodes() {
        let mut table = AssetTable::new();
        table.register("https://x/m.glb", "/tmp/m.glb", vec![cube("a"), cube("b")]);
        let mut g = SceneGraph::with_assets(Box::new(table));
        let path = g.resolve_asset("https://x/m.glb").unwrap();
        let ids = g.import_geometry(&path, Some("model/gltf-binary")).unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(g.roots(), ids);
        assert_eq!(g.node_kind(ids[0]), None);
        assert_eq!(g.node_name(ids[1]), Some("b"));
    }

    #[test]
    fn unknown_assets_fail() {
        let mut g = SceneGraph::new();
        assert!(matches!(
            g.resolve_asset("https://x/missing.glb"),
            Err(AssetError::Fetch { .. })
        ));
        assert_eq!(
            g.resolve_asset("file:///data/m.glb").unwrap(),
            PathBuf::from("/data/m.glb")
        );
        assert!(matches!(
            g.import_geometry(Path::new("/data/m.glb"), None),
            Err(AssetError::Decode { .. })
        ));
    }

    #[test]
    fn world_bounds_follow_parent_transforms() {
        let mut table = AssetTable::new();
        table.register_file("/m.glb", vec![cube("c")]);
        let mut g = SceneGraph::with_assets(Box::new(table));
        let scene = g.create_container_node(NodeKind::Scene, "s", None);
        let body = g.create_body_node(NodeKind::Model, "m", scene);
        let geo = g.import_geometry(Path::new("/m.glb"), None).unwrap();
        g.set_parent(geo[0], Some(body));
        g.set_node_transform(
            body,
            NodeTransform {
                position: DVec3::new(5.0, 0.0, 0.0),
                scale: DVec3::splat(2.0),
                ..NodeTransform::default()
            },
        );
        let b = g.compute_world_bounds(&[body]).unwrap();
        assert_eq!(b.min, DVec3::new(3.0, -2.0, -2.0));
        assert_eq!(b.max, DVec3::new(7.0, 2.0, 2.0));
        assert!(g.compute_world_bounds(&[scene]).is_some());
        let empty = g.create_container_node(NodeKind::Scene, "e", None);
        assert!(g.compute_world_bounds(&[empty]).is_none());
    }

    #[test]
    fn graph_survives_serde_round_trip() {
        let mut g = SceneGraph::new();
        let m = g.create_container_node(NodeKind::Manifest, "m", None);
        let s = g.create_container_node(NodeKind::Scene, "s", Some(m));
        g.set_node_property(s, "iiif_id", "https://x/s".into());
        let text = serde_json::to_string(&g).unwrap();
        let back: SceneGraph = serde_json::from_str(&text).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back.roots(), vec![m]);
        assert_eq!(back.node_property(s, "iiif_id"), Some("https://x/s"));
    }
}
