use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a node in a host scene graph.
    pub struct NodeId;
}

/// Type tag carried by every node the mapping creates.
///
/// The first four are containers; the last three are bodies. Geometry nodes
/// produced by a host's geometry importer carry no tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Manifest,
    Scene,
    AnnotationPage,
    Annotation,
    Model,
    Camera,
    Light,
}

impl NodeKind {
    pub fn is_container(self) -> bool {
        matches!(
            self,
            NodeKind::Manifest | NodeKind::Scene | NodeKind::AnnotationPage | NodeKind::Annotation
        )
    }

    pub fn is_body(self) -> bool {
        !self.is_container()
    }

    /// The IIIF `type` a container of this kind serializes as.
    pub fn container_type(self) -> Option<&'static str> {
        match self {
            NodeKind::Manifest => Some("Manifest"),
            NodeKind::Scene => Some("Scene"),
            NodeKind::AnnotationPage => Some("AnnotationPage"),
            NodeKind::Annotation => Some("Annotation"),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Manifest => "manifest",
            NodeKind::Scene => "scene",
            NodeKind::AnnotationPage => "annotation-page",
            NodeKind::Annotation => "annotation",
            NodeKind::Model => "model",
            NodeKind::Camera => "camera",
            NodeKind::Light => "light",
        }
    }
}

/// Projection of a camera body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CameraProjection {
    Perspective,
    Orthographic,
}

impl CameraProjection {
    pub fn iiif_type(self) -> &'static str {
        match self {
            CameraProjection::Perspective => "PerspectiveCamera",
            CameraProjection::Orthographic => "OrthographicCamera",
        }
    }
}

/// Kind of a light body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LightKind {
    Ambient,
    Directional,
}

impl LightKind {
    pub fn iiif_type(self) -> &'static str {
        match self {
            LightKind::Ambient => "AmbientLight",
            LightKind::Directional => "DirectionalLight",
        }
    }
}
