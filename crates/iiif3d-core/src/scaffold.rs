//! Building manifests from scratch inside a scene graph.

use std::path::Path;

use glam::DVec3;
use serde_json::{Value, json};

use crate::coords::{MODEL_EULER_ORDER, SceneRotation};
use crate::error::IiifError;
use crate::host::{NodeTransform, SceneHost};
use crate::id::{NodeId, NodeKind};
use crate::mint::{DEFAULT_ID_BASE, IdMinter};
use crate::normalize::JsonObject;
use crate::provenance::{
    IIIF_BODY, IIIF_FORMAT, IIIF_ID, IIIF_JSON, IIIF_LABEL, IIIF_SOURCE_URL, store_json,
    store_resource,
};
use crate::resource::PRESENTATION_CONTEXT;

/// CC BY 4.0.
pub const DEFAULT_RIGHTS: &str = "https://creativecommons.org/licenses/by/4.0/";
pub const DEFAULT_MANIFEST_LABEL: &str = "default-manifest-label";
pub const DEFAULT_SCENE_LABEL: &str = "default-scene-label";
pub const DEFAULT_PAGE_LABEL: &str = "default-annotation-page-label";

#[derive(Debug, Clone)]
pub struct ScaffoldOptions {
    pub id_base: String,
    pub rights: String,
    pub label: String,
}

impl Default for ScaffoldOptions {
    fn default() -> Self {
        Self {
            id_base: DEFAULT_ID_BASE.to_string(),
            rights: DEFAULT_RIGHTS.to_string(),
            label: DEFAULT_MANIFEST_LABEL.to_string(),
        }
    }
}

/// Containers created by [`new_manifest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scaffold {
    pub manifest: NodeId,
    pub scene: NodeId,
    pub page: NodeId,
}

fn object(value: Value) -> JsonObject {
    match value {
        Value::Object(map) => map,
        _ => JsonObject::new(),
    }
}

/// Create an empty Manifest → Scene → AnnotationPage chain as a new root.
pub fn new_manifest<H: SceneHost + ?Sized>(host: &mut H, options: &ScaffoldOptions) -> Scaffold {
    let mut minter = IdMinter::from_host(host, &options.id_base);

    let manifest_json = object(json!({
        "@context": PRESENTATION_CONTEXT,
        "id": minter.mint(NodeKind::Manifest.as_str()),
        "type": "Manifest",
        "rights": options.rights,
        "label": {"none": [options.label]},
    }));
    let manifest = host.create_container_node(NodeKind::Manifest, &options.label, None);
    store_resource(host, manifest, IIIF_JSON, &manifest_json);
    host.set_node_property(manifest, IIIF_LABEL, options.label.clone());

    let scene_json = object(json!({
        "id": minter.mint(NodeKind::Scene.as_str()),
        "type": "Scene",
        "label": {"none": [DEFAULT_SCENE_LABEL]},
    }));
    let scene = host.create_container_node(NodeKind::Scene, DEFAULT_SCENE_LABEL, Some(manifest));
    store_resource(host, scene, IIIF_JSON, &scene_json);

    let page_json = object(json!({
        "id": minter.mint(NodeKind::AnnotationPage.as_str()),
        "type": "AnnotationPage",
        "label": {"none": [DEFAULT_PAGE_LABEL]},
    }));
    let page =
        host.create_container_node(NodeKind::AnnotationPage, DEFAULT_PAGE_LABEL, Some(scene));
    store_resource(host, page, IIIF_JSON, &page_json);

    log::info!("scaffolded manifest {}", options.label);
    Scaffold {
        manifest,
        scene,
        page,
    }
}

/// MIME type for a model file, by extension.
pub fn mime_for_path(path: &str) -> Option<&'static str> {
    let ext = Path::new(path).extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "glb" => Some("model/gltf-binary"),
        "gltf" => Some("model/gltf+json"),
        _ => None,
    }
}

/// Resolve and import the model at `url` into a new Annotation under
/// `parent` (an AnnotationPage or Scene). Returns the Model body node.
///
/// Nothing is created when the asset cannot be resolved or decoded.
pub fn add_model<H: SceneHost + ?Sized>(
    host: &mut H,
    parent: NodeId,
    url: &str,
    options: &ScaffoldOptions,
) -> Result<NodeId, IiifError> {
    match host.node_kind(parent) {
        Some(NodeKind::AnnotationPage | NodeKind::Scene) => {}
        other => {
            return Err(IiifError::NavigationMiss {
                detail: format!("models are added to an AnnotationPage or Scene, not {other:?}"),
            });
        }
    }
    let format = mime_for_path(url)
        .ok_or_else(|| IiifError::feature(format!("unsupported model format: {url}")))?;
    let path = host.resolve_asset(url).map_err(|e| e.into_iiif(url))?;
    let geometry = host
        .import_geometry(&path, Some(format))
        .map_err(|e| e.into_iiif(url))?;

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("model")
        .to_string();
    let mut minter = IdMinter::from_host(host, &options.id_base);
    let anno_json = object(json!({
        "id": minter.mint(NodeKind::Annotation.as_str()),
        "type": "Annotation",
        "motivation": ["painting"],
    }));
    let anno = host.create_container_node(NodeKind::Annotation, &name, Some(parent));
    store_resource(host, anno, IIIF_JSON, &anno_json);

    let body = host.create_body_node(NodeKind::Model, &name, anno);
    store_json(
        host,
        body,
        IIIF_BODY,
        &json!({"id": url, "type": "Model", "format": format}),
    );
    host.set_node_property(body, IIIF_ID, url.to_string());
    host.set_node_property(body, IIIF_SOURCE_URL, url.to_string());
    host.set_node_property(body, IIIF_FORMAT, format.to_string());
    host.set_node_transform(
        body,
        NodeTransform {
            rotation: SceneRotation::Euler {
                order: MODEL_EULER_ORDER,
                angles: DVec3::ZERO,
            },
            ..NodeTransform::default()
        },
    );
    for g in geometry {
        host.set_parent(g, Some(body));
    }
    log::info!("added model {url} as {name}");
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exporter::{ExportOptions, export_first_manifest};
    use crate::provenance::stored_id;
    use crate::scene_graph::SceneGraph;
    use crate::test_utils::*;

    #[test]
    fn new_manifest_builds_container_chain() {
        let mut g = SceneGraph::new();
        let s = new_manifest(&mut g, &ScaffoldOptions::default());
        assert_eq!(g.parent(s.page), Some(s.scene));
        assert_eq!(g.parent(s.scene), Some(s.manifest));
        assert_eq!(stored_id(&g, s.scene), Some("https://example.com/iiif3d/scene/1"));
    }

    #[test]
    fn scaffolded_manifest_exports_with_defaults() {
        let mut g = SceneGraph::new();
        new_manifest(&mut g, &ScaffoldOptions::default());
        let (out, report) = export_first_manifest(&g, &ExportOptions::default()).unwrap();
        assert!(report.diagnostics.is_empty());
        assert_eq!(out["@context"], PRESENTATION_CONTEXT);
        assert_eq!(out["rights"], DEFAULT_RIGHTS);
        assert_eq!(out["label"]["none"][0], DEFAULT_MANIFEST_LABEL);
        assert_eq!(out["items"][0]["label"]["none"][0], DEFAULT_SCENE_LABEL);
        assert_eq!(out["items"][0]["items"][0]["type"], "AnnotationPage");
    }

    #[test]
    fn mime_types_by_extension() {
        assert_eq!(mime_for_path("a/b/Chair.GLB"), Some("model/gltf-binary"));
        assert_eq!(mime_for_path("https://x/m.gltf"), Some("model/gltf+json"));
        assert_eq!(mime_for_path("m.obj"), None);
        assert_eq!(mime_for_path("noext"), None);
    }

    #[test]
    fn add_model_creates_tagged_annotation() {
        let mut g = graph_with_model("https://x/chair.glb");
        let s = new_manifest(&mut g, &ScaffoldOptions::default());
        let body = add_model(&mut g, s.page, "https://x/chair.glb", &ScaffoldOptions::default())
            .unwrap();
        assert_eq!(g.node_name(body), Some("chair"));
        assert_eq!(g.node_property(body, IIIF_FORMAT), Some("model/gltf-binary"));
        let anno = g.parent(body).unwrap();
        assert_eq!(g.node_kind(anno), Some(NodeKind::Annotation));
        assert_eq!(g.children(body).len(), 1);

        let (out, _) = export_first_manifest(&g, &ExportOptions::default()).unwrap();
        let exported = &out["items"][0]["items"][0]["items"][0];
        assert_eq!(exported["body"]["id"], "https://x/chair.glb");
        assert_eq!(exported["target"]["type"], "Scene");
    }

    #[test]
    fn add_model_failures_create_nothing() {
        let mut g = SceneGraph::new();
        let s = new_manifest(&mut g, &ScaffoldOptions::default());
        let before = g.len();
        let missing = add_model(&mut g, s.page, "https://x/missing.glb", &ScaffoldOptions::default());
        assert!(matches!(missing, Err(IiifError::AssetFetch { .. })));
        let unsupported = add_model(&mut g, s.page, "https://x/m.obj", &ScaffoldOptions::default());
        assert!(matches!(unsupported, Err(IiifError::UnsupportedFeature { .. })));
        let wrong_parent =
            add_model(&mut g, s.manifest, "https://x/m.glb", &ScaffoldOptions::default());
        assert!(matches!(wrong_parent, Err(IiifError::NavigationMiss { .. })));
        assert_eq!(g.len(), before);
    }
}
