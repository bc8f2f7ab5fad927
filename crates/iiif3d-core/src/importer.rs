//! Manifest → scene graph.
//!
//! The whole document is validated before the first node is created, so a
//! [`IiifError::MalformedManifest`] never leaves a partial Manifest container
//! behind. After that every problem is scoped to the entity it concerns and
//! recorded in the report's diagnostics.

use glam::DVec3;
use serde_json::Value;

use crate::coords::{
    CAMERA_EULER_ORDER, MODEL_EULER_ORDER, SceneRotation, camera_rotation_to_scene,
    look_rotation, model_rotation_to_scene, position_to_scene, scale_to_scene, uniform_scale,
};
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::error::IiifError;
use crate::host::{BodySettings, NodeTransform, SceneHost};
use crate::id::{CameraProjection, LightKind, NodeId, NodeKind};
use crate::navigation::{body_children, descendants, find_by_iiif_id};
use crate::normalize::{JsonObject, id_of, language_text};
use crate::provenance::{
    IIIF_BODY, IIIF_FORMAT, IIIF_ID, IIIF_JSON, IIIF_LABEL, IIIF_SOURCE_URL, IIIF_SUMMARY,
    store_json, store_resource,
};
use crate::resource::{
    Annotation, AnnotationPage, Body, BodyKind, LookAt, Manifest, Scene, SceneItem,
};

// ---------------------------------------------------------------------------
// Options and report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Name for the Manifest container; defaults to the manifest label.
    pub root_name: Option<String>,
}

/// Outcome of one successful import.
#[derive(Debug, Clone)]
pub struct ImportReport {
    pub manifest: NodeId,
    pub scenes: Vec<NodeId>,
    /// Body nodes created, in manifest order.
    pub bodies: Vec<NodeId>,
    pub diagnostics: Vec<Diagnostic>,
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Import a manifest held as JSON text.
pub fn import_str<H: SceneHost + ?Sized>(
    host: &mut H,
    text: &str,
    options: &ImportOptions,
) -> Result<ImportReport, IiifError> {
    let mut diags = Diagnostics::new();
    let manifest = Manifest::from_json_str(text, &mut diags).inspect_err(|e| log::error!("{e}"))?;
    Ok(Importer::new(host, diags).run(&manifest, options))
}

/// Import a parsed manifest document.
pub fn import_manifest<H: SceneHost + ?Sized>(
    host: &mut H,
    value: &Value,
    options: &ImportOptions,
) -> Result<ImportReport, IiifError> {
    let mut diags = Diagnostics::new();
    let manifest = Manifest::parse(value, &mut diags).inspect_err(|e| log::error!("{e}"))?;
    Ok(Importer::new(host, diags).run(&manifest, options))
}

// ---------------------------------------------------------------------------
// Traversal
// ---------------------------------------------------------------------------

/// A camera whose `lookAt` names an Annotation; resolved once every body
/// of the manifest exists.
struct PendingLookAt {
    camera: NodeId,
    annotation: String,
    at: Option<String>,
}

struct Importer<'h, H: SceneHost + ?Sized> {
    host: &'h mut H,
    diags: Diagnostics,
    scenes: Vec<NodeId>,
    bodies: Vec<NodeId>,
    pending: Vec<PendingLookAt>,
}

fn node_name(label: Option<String>, id: Option<&str>, fallback: &str) -> String {
    label
        .or_else(|| id.map(str::to_string))
        .unwrap_or_else(|| fallback.to_string())
}

impl<'h, H: SceneHost + ?Sized> Importer<'h, H> {
    fn new(host: &'h mut H, diags: Diagnostics) -> Self {
        Self {
            host,
            diags,
            scenes: Vec::new(),
            bodies: Vec::new(),
            pending: Vec::new(),
        }
    }

    fn run(mut self, manifest: &Manifest, options: &ImportOptions) -> ImportReport {
        log::info!(
            "importing manifest {} ({} scenes)",
            manifest.id.as_deref().unwrap_or("<no id>"),
            manifest.scenes.len()
        );
        let name = options
            .root_name
            .clone()
            .unwrap_or_else(|| node_name(manifest.label.clone(), manifest.id.as_deref(), "Manifest"));
        let root = self
            .host
            .create_container_node(NodeKind::Manifest, &name, None);
        store_resource(self.host, root, IIIF_JSON, &manifest.header);
        for (key, field) in [(IIIF_LABEL, "label"), (IIIF_SUMMARY, "summary")] {
            if let Some(text) = language_text(manifest.header.get(field)) {
                self.host.set_node_property(root, key, text);
            }
        }

        for scene in &manifest.scenes {
            self.import_scene(root, scene);
        }
        self.resolve_pending(root);

        log::info!(
            "imported {} scenes, {} bodies, {} diagnostics",
            self.scenes.len(),
            self.bodies.len(),
            self.diags.len()
        );
        ImportReport {
            manifest: root,
            scenes: self.scenes,
            bodies: self.bodies,
            diagnostics: self.diags.into_entries(),
        }
    }

    fn import_scene(&mut self, parent: NodeId, obj: &JsonObject) {
        let scene = match Scene::parse(obj, &mut self.diags) {
            Ok(scene) => scene,
            Err(e) => {
                self.diags.push_error(id_of(obj), &e);
                return;
            }
        };
        log::info!("importing scene {}", scene.id.as_deref().unwrap_or("<no id>"));
        let name = node_name(scene.label.clone(), scene.id.as_deref(), "Scene");
        let node = self
            .host
            .create_container_node(NodeKind::Scene, &name, Some(parent));
        store_resource(self.host, node, IIIF_JSON, &scene.header);
        self.host.set_scene_background(node, scene.background);
        self.scenes.push(node);

        for item in &scene.items {
            match item {
                SceneItem::Page(page) => self.import_page(node, page),
                SceneItem::Annotation(anno) => self.import_annotation(node, anno),
            }
        }
    }

    fn import_page(&mut self, scene: NodeId, obj: &JsonObject) {
        let page = match AnnotationPage::parse(obj, &mut self.diags) {
            Ok(page) => page,
            Err(e) => {
                self.diags.push_error(id_of(obj), &e);
                return;
            }
        };
        let name = node_name(page.label.clone(), page.id.as_deref(), "AnnotationPage");
        let node = self
            .host
            .create_container_node(NodeKind::AnnotationPage, &name, Some(scene));
        store_resource(self.host, node, IIIF_JSON, &page.header);

        for anno in &page.annotations {
            self.import_annotation(node, anno);
        }
    }

    fn import_annotation(&mut self, parent: NodeId, obj: &JsonObject) {
        let anno = match Annotation::parse(obj, &mut self.diags) {
            Ok(anno) => anno,
            Err(e) => {
                self.diags.push_error(id_of(obj), &e);
                return;
            }
        };
        let at = anno.id.clone();
        let body = match Body::parse(anno.body.as_ref(), &mut self.diags, at.as_deref()) {
            Ok(body) => body,
            Err(e) => {
                self.diags.push_error(at.as_deref(), &e);
                return;
            }
        };
        match body.kind {
            BodyKind::Model => self.import_model(parent, &anno, &body),
            BodyKind::Camera(projection) => self.import_camera(parent, &anno, &body, projection),
            BodyKind::Light(kind) => self.import_light(parent, &anno, &body, kind),
            BodyKind::TextualBody => self.diags.push(
                DiagnosticKind::UnknownType,
                at.as_deref(),
                "TextualBody has no scene representation, skipped",
            ),
        }
    }

    /// Create the Annotation container and its tagged body node.
    fn create_annotation(
        &mut self,
        parent: NodeId,
        anno: &Annotation,
        body: &Body,
        kind: NodeKind,
    ) -> NodeId {
        let name = node_name(anno.label.clone(), anno.id.as_deref(), "Annotation");
        let container = self
            .host
            .create_container_node(NodeKind::Annotation, &name, Some(parent));
        store_resource(self.host, container, IIIF_JSON, &anno.header);

        let body_name = node_name(body.label(), None, kind.as_str());
        let node = self.host.create_body_node(kind, &body_name, container);
        store_json(self.host, node, IIIF_BODY, &Value::Object(body.raw.clone()));
        if let Some(id) = body.id() {
            self.host.set_node_property(node, IIIF_ID, id.to_string());
        }
        self.bodies.push(node);
        node
    }

    /// Scene-space position: TranslateTransform plus target PointSelector.
    fn placement(anno: &Annotation, body: &Body) -> DVec3 {
        let translate = body.transforms.translate.unwrap_or(DVec3::ZERO);
        let point = anno.target.point.unwrap_or(DVec3::ZERO);
        position_to_scene(translate) + position_to_scene(point)
    }

    fn import_model(&mut self, parent: NodeId, anno: &Annotation, body: &Body) {
        let at = anno.id.as_deref();
        let Some(url) = body.id() else {
            self.diags
                .push_error(at, &IiifError::shape("Model body without an id"));
            return;
        };
        let format = body.format();
        let geometry = self
            .host
            .resolve_asset(url)
            .and_then(|path| self.host.import_geometry(&path, format));
        let geometry = match geometry {
            Ok(nodes) => nodes,
            Err(e) => {
                self.diags.push_error(at, &e.into_iiif(url));
                return;
            }
        };

        let node = self.create_annotation(parent, anno, body, NodeKind::Model);
        for g in geometry {
            self.host.set_parent(g, Some(node));
        }
        self.host
            .set_node_property(node, IIIF_SOURCE_URL, url.to_string());
        if let Some(format) = format {
            self.host
                .set_node_property(node, IIIF_FORMAT, format.to_string());
        }

        let scale = match body.transforms.scale.map(uniform_scale) {
            None => DVec3::ONE,
            Some(Ok(s)) => scale_to_scene(s),
            Some(Err(e)) => {
                self.diags.push_error(at, &e);
                DVec3::ONE
            }
        };
        let rotation = body
            .transforms
            .rotate
            .map(model_rotation_to_scene)
            .unwrap_or(SceneRotation::Euler {
                order: MODEL_EULER_ORDER,
                angles: DVec3::ZERO,
            });
        let transform = NodeTransform {
            position: Self::placement(anno, body),
            rotation,
            scale,
        };
        log::debug!("model {url} placed at {}", transform.position);
        self.host.set_node_transform(node, transform);
    }

    fn import_camera(
        &mut self,
        parent: NodeId,
        anno: &Annotation,
        body: &Body,
        projection: CameraProjection,
    ) {
        let at = anno.id.clone();
        let node = self.create_annotation(parent, anno, body, NodeKind::Camera);
        self.host.set_body_settings(
            node,
            BodySettings::Camera {
                projection,
                field_of_view: body.field_of_view(),
            },
        );
        if body.transforms.scale.is_some() {
            self.diags.push(
                DiagnosticKind::UnsupportedFeature,
                at.as_deref(),
                "ScaleTransform on a camera is ignored",
            );
        }

        let position = Self::placement(anno, body);
        let default_rotation = camera_rotation_to_scene(DVec3::ZERO);
        let look_at = match body.look_at(&mut self.diags, at.as_deref()) {
            Ok(look_at) => look_at,
            Err(e) => {
                self.diags.push_error(at.as_deref(), &e);
                None
            }
        };
        if look_at.is_some() && body.transforms.rotate.is_some() {
            self.diags.push(
                DiagnosticKind::UnsupportedFeature,
                at.as_deref(),
                "camera has both lookAt and RotateTransform, RotateTransform ignored",
            );
        }
        let rotation = match (look_at, body.transforms.rotate) {
            (Some(LookAt::Point(p)), _) => self
                .aim(position, position_to_scene(p), at.as_deref())
                .unwrap_or(default_rotation),
            (Some(LookAt::Annotation(target)), _) => {
                self.pending.push(PendingLookAt {
                    camera: node,
                    annotation: target,
                    at: at.clone(),
                });
                default_rotation
            }
            (None, Some(degrees)) => camera_rotation_to_scene(degrees),
            (None, None) => {
                self.diags.push(
                    DiagnosticKind::DefaultOrientation,
                    at.as_deref(),
                    "camera has neither lookAt nor RotateTransform, default orientation applied",
                );
                default_rotation
            }
        };
        let transform = NodeTransform {
            position,
            rotation,
            scale: DVec3::ONE,
        };
        log::debug!("camera placed at {}", transform.position);
        self.host.set_node_transform(node, transform);
    }

    /// Camera rotation facing `target`, or `None` (reported) when it
    /// coincides with the camera.
    fn aim(&mut self, eye: DVec3, target: DVec3, at: Option<&str>) -> Option<SceneRotation> {
        match look_rotation(eye, target) {
            Some(q) => Some(SceneRotation::Quaternion(q).with_order(CAMERA_EULER_ORDER)),
            None => {
                self.diags.push(
                    DiagnosticKind::UnsupportedFeature,
                    at,
                    "lookAt target coincides with the camera, default orientation applied",
                );
                None
            }
        }
    }

    fn import_light(&mut self, parent: NodeId, anno: &Annotation, body: &Body, kind: LightKind) {
        let at = anno.id.clone();
        let node = self.create_annotation(parent, anno, body, NodeKind::Light);
        if body.transforms.rotate.is_some() || body.source.contains_key("lookAt") {
            self.diags.push(
                DiagnosticKind::UnsupportedFeature,
                at.as_deref(),
                "light orientation is kept in provenance only",
            );
        }
        let color = match body.color() {
            Ok(color) => color.unwrap_or(DVec3::ONE),
            Err(e) => {
                self.diags.push_error(at.as_deref(), &e);
                DVec3::ONE
            }
        };
        self.host.set_body_settings(
            node,
            BodySettings::Light {
                kind,
                color,
                intensity: body.intensity().unwrap_or(1.0),
            },
        );
        let transform = NodeTransform {
            position: Self::placement(anno, body),
            ..NodeTransform::default()
        };
        self.host.set_node_transform(node, transform);
    }

    /// Orient cameras whose `lookAt` names an Annotation at the centre of
    /// that Annotation's content, searching this manifest before the rest of
    /// the forest.
    fn resolve_pending(&mut self, root: NodeId) {
        for pending in std::mem::take(&mut self.pending) {
            let local: Vec<NodeId> = descendants(&*self.host, &[root])
                .into_iter()
                .filter(|n| {
                    self.host.node_kind(*n) == Some(NodeKind::Annotation)
                        && self.host.node_property(*n, IIIF_ID) == Some(pending.annotation.as_str())
                })
                .collect();
            let containers = if local.is_empty() {
                find_by_iiif_id(&*self.host, NodeKind::Annotation, &pending.annotation)
            } else {
                local
            };
            let bodies: Vec<NodeId> = containers
                .iter()
                .flat_map(|c| body_children(&*self.host, *c))
                .collect();
            let Some(bounds) = self.host.compute_world_bounds(&bodies) else {
                self.diags.push_error(
                    pending.at.as_deref(),
                    &IiifError::NavigationMiss {
                        detail: format!(
                            "lookAt annotation {} not found, default orientation applied",
                            pending.annotation
                        ),
                    },
                );
                continue;
            };
            let Some(mut transform) = self.host.node_transform(pending.camera) else {
                continue;
            };
            if let Some(rotation) = self.aim(transform.position, bounds.center(), pending.at.as_deref())
            {
                transform.rotation = rotation;
                self.host.set_node_transform(pending.camera, transform);
            }
        }
    }
}
