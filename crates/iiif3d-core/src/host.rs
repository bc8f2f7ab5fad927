//! Capabilities the mapping needs from the application that owns the scene.
//!
//! The importer and exporter never touch a concrete scene graph; they are
//! written against [`SceneHost`]. [`SceneGraph`](crate::scene_graph::SceneGraph)
//! is the in-memory implementation used by the CLI and the tests.

use std::fmt;
use std::path::{Path, PathBuf};

use glam::{DMat4, DVec3};
use serde::{Deserialize, Serialize};

use crate::bounds::Aabb;
use crate::coords::SceneRotation;
use crate::error::AssetError;
use crate::id::{CameraProjection, LightKind, NodeId, NodeKind};

// ---------------------------------------------------------------------------
// Node state
// ---------------------------------------------------------------------------

/// Scene-space transform of one node, relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeTransform {
    pub position: DVec3,
    pub rotation: SceneRotation,
    pub scale: DVec3,
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self {
            position: DVec3::ZERO,
            rotation: SceneRotation::default(),
            scale: DVec3::ONE,
        }
    }
}

impl NodeTransform {
    pub fn to_matrix(&self) -> DMat4 {
        DMat4::from_scale_rotation_translation(self.scale, self.rotation.to_quat(), self.position)
    }
}

/// Kind-specific state of camera and light bodies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BodySettings {
    Camera {
        projection: CameraProjection,
        /// Vertical field of view in degrees.
        field_of_view: Option<f64>,
    },
    Light {
        kind: LightKind,
        /// Linear 0..1 RGB.
        color: DVec3,
        intensity: f64,
    },
}

// ---------------------------------------------------------------------------
// Host capability interface
// ---------------------------------------------------------------------------

/// Node creation, inspection and asset capabilities of a scene host.
///
/// Node handles are only valid for the host that issued them. Lookups on an
/// unknown handle return `None` / empty rather than panicking.
pub trait SceneHost {
    /// Create a tagged container. `None` parent makes it a root.
    fn create_container_node(&mut self, kind: NodeKind, name: &str, parent: Option<NodeId>)
    -> NodeId;

    /// Create a tagged body node (Model, Camera or Light) under `parent`.
    fn create_body_node(&mut self, kind: NodeKind, name: &str, parent: NodeId) -> NodeId;

    /// Re-parent a node. `None` detaches it into a root.
    fn set_parent(&mut self, node: NodeId, parent: Option<NodeId>);

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Children in creation order.
    fn children(&self, node: NodeId) -> Vec<NodeId>;

    /// Parentless nodes in creation order.
    fn roots(&self) -> Vec<NodeId>;

    fn node_kind(&self, node: NodeId) -> Option<NodeKind>;

    fn node_name(&self, node: NodeId) -> Option<&str>;

    fn set_node_transform(&mut self, node: NodeId, transform: NodeTransform);

    fn node_transform(&self, node: NodeId) -> Option<NodeTransform>;

    fn set_node_property(&mut self, node: NodeId, key: &str, value: String);

    fn node_property(&self, node: NodeId, key: &str) -> Option<&str>;

    /// Keys of every property on the node, sorted.
    fn node_properties(&self, node: NodeId) -> Vec<String>;

    fn set_body_settings(&mut self, node: NodeId, settings: BodySettings);

    fn body_settings(&self, node: NodeId) -> Option<BodySettings>;

    /// Background color (0..1 RGB) rendered behind a Scene container.
    fn set_scene_background(&mut self, scene: NodeId, color: Option<DVec3>);

    fn scene_background(&self, scene: NodeId) -> Option<DVec3>;

    /// Turn an asset URL into a readable local file.
    fn resolve_asset(&mut self, url: &str) -> Result<PathBuf, AssetError>;

    /// Decode a local file into detached, untagged geometry nodes.
    fn import_geometry(
        &mut self,
        path: &Path,
        format_hint: Option<&str>,
    ) -> Result<Vec<NodeId>, AssetError>;

    /// World-space bounds enclosing the nodes and their descendants.
    fn compute_world_bounds(&self, nodes: &[NodeId]) -> Option<Aabb>;
}

// ---------------------------------------------------------------------------
// Asset sources
// ---------------------------------------------------------------------------

/// One mesh produced by decoding an asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshInfo {
    pub name: String,
    /// Scene-space bounds relative to the mesh's own origin.
    pub bounds: Option<Aabb>,
}

/// Where a [`SceneGraph`](crate::scene_graph::SceneGraph) gets its assets from.
pub trait AssetSource: fmt::Debug {
    fn resolve_asset(&self, url: &str) -> Result<PathBuf, AssetError>;

    fn load_geometry(
        &self,
        path: &Path,
        format_hint: Option<&str>,
    ) -> Result<Vec<MeshInfo>, AssetError>;
}
