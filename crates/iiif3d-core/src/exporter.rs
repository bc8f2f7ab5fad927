//! Scene graph → manifest.
//!
//! Every export rebuilds the document from current node state: ids, types,
//! targets and transforms come from the nodes, everything else from the
//! stored provenance JSON. Nodes without provenance get minted ids and
//! default fields.

use std::collections::HashMap;
use std::path::Path;

use glam::DVec3;
use serde_json::Value;

use crate::color::{hex_to_rgb, rgb_to_hex};
use crate::coords::{
    IDENTITY_EPSILON, camera_rotation_to_manifest, is_zero, model_rotation_to_manifest,
    position_to_manifest, scale_to_manifest, snap, snap_vec,
};
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::error::IiifError;
use crate::host::{BodySettings, SceneHost};
use crate::id::{NodeId, NodeKind};
use crate::mint::{DEFAULT_ID_BASE, IdMinter};
use crate::navigation::{body_children, children_of_type, enclosing_scene, roots_of_type};
use crate::normalize::{JsonObject, id_of, language_map, language_text, number};
use crate::provenance::{
    IIIF_BODY, IIIF_FORMAT, IIIF_JSON, IIIF_LABEL, IIIF_SOURCE_URL, IIIF_SUMMARY, load_json,
    stored_id,
};
use crate::resource::{Body, PRESENTATION_CONTEXT, Target, TransformChain, with_items};

// ---------------------------------------------------------------------------
// Options and report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Base URI for ids minted for nodes without provenance.
    pub id_base: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            id_base: DEFAULT_ID_BASE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExportReport {
    pub annotations: usize,
    pub diagnostics: Vec<Diagnostic>,
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Export the Manifest container `manifest`.
pub fn export_manifest<H: SceneHost + ?Sized>(
    host: &H,
    manifest: NodeId,
    options: &ExportOptions,
) -> Result<(Value, ExportReport), IiifError> {
    if host.node_kind(manifest) != Some(NodeKind::Manifest) {
        return Err(IiifError::NavigationMiss {
            detail: format!("{manifest:?} is not a Manifest container"),
        });
    }
    let mut exporter = Exporter {
        host,
        diags: Diagnostics::new(),
        minter: IdMinter::from_host(host, &options.id_base),
        ids: HashMap::new(),
        annotations: 0,
    };
    let value = exporter.manifest(manifest);
    log::info!(
        "exported manifest {} ({} annotations, {} diagnostics)",
        value.get("id").and_then(Value::as_str).unwrap_or("<no id>"),
        exporter.annotations,
        exporter.diags.len()
    );
    Ok((
        value,
        ExportReport {
            annotations: exporter.annotations,
            diagnostics: exporter.diags.into_entries(),
        },
    ))
}

/// Export the first root Manifest container of the forest.
pub fn export_first_manifest<H: SceneHost + ?Sized>(
    host: &H,
    options: &ExportOptions,
) -> Result<(Value, ExportReport), IiifError> {
    let manifest = roots_of_type(host, NodeKind::Manifest)
        .into_iter()
        .next()
        .ok_or_else(|| IiifError::NavigationMiss {
            detail: "scene graph has no Manifest container".into(),
        })?;
    export_manifest(host, manifest, options)
}

/// Two-space indented JSON with a trailing newline.
pub fn to_pretty_string(value: &Value) -> Result<String, IiifError> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    Ok(text)
}

pub fn write_manifest(path: &Path, value: &Value) -> Result<(), IiifError> {
    std::fs::write(path, to_pretty_string(value)?)?;
    log::info!("wrote {}", path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Traversal
// ---------------------------------------------------------------------------

struct Exporter<'h, H: SceneHost + ?Sized> {
    host: &'h H,
    diags: Diagnostics,
    minter: IdMinter,
    /// Minted ids, so a Scene and the targets pointing at it agree.
    ids: HashMap<NodeId, String>,
    annotations: usize,
}

fn string(s: &str) -> Value {
    Value::String(s.to_string())
}

impl<'h, H: SceneHost + ?Sized> Exporter<'h, H> {
    fn resource_id(&mut self, node: NodeId, kind: NodeKind) -> String {
        if let Some(id) = stored_id(self.host, node) {
            return id.to_string();
        }
        self.ids
            .entry(node)
            .or_insert_with(|| self.minter.mint(kind.as_str()))
            .clone()
    }

    fn default_header(&self, node: NodeId, kind: NodeKind) -> JsonObject {
        let mut header = JsonObject::new();
        if kind == NodeKind::Manifest {
            header.insert("@context".into(), string(PRESENTATION_CONTEXT));
        }
        header.insert("id".into(), Value::Null);
        header.insert("type".into(), Value::Null);
        let name = self.host.node_name(node).unwrap_or(kind.as_str());
        let mut label = JsonObject::new();
        label.insert("none".into(), Value::Array(vec![string(name)]));
        header.insert("label".into(), Value::Object(label));
        if kind == NodeKind::Annotation {
            header.insert("motivation".into(), Value::Array(vec![string("painting")]));
        }
        header
    }

    /// Stored container JSON (or defaults) with the node's id and type.
    fn header(&mut self, node: NodeId, kind: NodeKind) -> JsonObject {
        let mut header = load_json(self.host, node, IIIF_JSON, &mut self.diags)
            .unwrap_or_else(|| self.default_header(node, kind));
        let id = self.resource_id(node, kind);
        header.insert("id".into(), Value::String(id));
        if let Some(ty) = kind.container_type() {
            header.insert("type".into(), string(ty));
        }
        header
    }

    fn manifest(&mut self, manifest: NodeId) -> Value {
        let mut header = self.header(manifest, NodeKind::Manifest);
        let host = self.host;
        for (key, field) in [(IIIF_LABEL, "label"), (IIIF_SUMMARY, "summary")] {
            let Some(text) = host.node_property(manifest, key) else {
                continue;
            };
            if language_text(header.get(field)).as_deref() != Some(text) {
                let map = language_map(text, header.get(field));
                header.insert(field.into(), map);
            }
        }
        let items = children_of_type(self.host, manifest, NodeKind::Scene)
            .into_iter()
            .map(|scene| self.scene(scene))
            .collect();
        with_items(header, items)
    }

    fn scene(&mut self, scene: NodeId) -> Value {
        let mut header = self.header(scene, NodeKind::Scene);
        match self.host.scene_background(scene) {
            Some(rgb) => set_color(&mut header, "backgroundColor", rgb),
            // A cleared background drops a valid stored color; invalid values pass through.
            None => header.retain(|k, v| {
                k != "backgroundColor" || v.as_str().is_none_or(|s| hex_to_rgb(s).is_err())
            }),
        }
        let mut items = Vec::new();
        for child in self.host.children(scene) {
            match self.host.node_kind(child) {
                Some(NodeKind::AnnotationPage) => items.push(self.page(child)),
                Some(NodeKind::Annotation) => items.extend(self.annotation(child)),
                Some(kind) if kind.is_body() => items.push(self.fallback_annotation(child)),
                _ => {}
            }
        }
        with_items(header, items)
    }

    fn page(&mut self, page: NodeId) -> Value {
        let header = self.header(page, NodeKind::AnnotationPage);
        let mut items = Vec::new();
        for child in self.host.children(page) {
            match self.host.node_kind(child) {
                Some(NodeKind::Annotation) => items.extend(self.annotation(child)),
                Some(kind) if kind.is_body() => items.push(self.fallback_annotation(child)),
                _ => {}
            }
        }
        with_items(header, items)
    }

    fn annotation(&mut self, anno: NodeId) -> Option<Value> {
        let bodies = body_children(self.host, anno);
        let header = self.header(anno, NodeKind::Annotation);
        let at = id_of(&header).map(str::to_string);
        let Some(&body) = bodies.first() else {
            self.diags.push(
                DiagnosticKind::UnsupportedShape,
                at.as_deref(),
                "annotation has no body node, skipped",
            );
            return None;
        };
        if bodies.len() > 1 {
            self.diags.push(
                DiagnosticKind::UnsupportedFeature,
                at.as_deref(),
                format!("annotation has {} body nodes, only the first is exported", bodies.len()),
            );
        }
        Some(self.finish_annotation(header, anno, body))
    }

    /// An Annotation for a body node that has no Annotation container.
    fn fallback_annotation(&mut self, body: NodeId) -> Value {
        let mut header = self.default_header(body, NodeKind::Annotation);
        header.insert(
            "id".into(),
            Value::String(self.minter.mint(NodeKind::Annotation.as_str())),
        );
        header.insert("type".into(), string("Annotation"));
        self.finish_annotation(header, body, body)
    }

    /// Attach body and target. `anchor` is the node whose Scene ancestor
    /// the target points at.
    fn finish_annotation(&mut self, mut header: JsonObject, anchor: NodeId, body: NodeId) -> Value {
        let at = id_of(&header).map(str::to_string);
        let shape = Target::parse(header.get("target"), &mut Diagnostics::new(), None)
            .map(|t| t.shape)
            .unwrap_or_default();
        let (body_json, position) = self.body(body, at.as_deref());
        header.insert("body".into(), body_json);

        match enclosing_scene(self.host, anchor) {
            Some(scene) => {
                let scene_id = self.resource_id(scene, NodeKind::Scene);
                let point = (position != DVec3::ZERO).then_some(position);
                header.insert("target".into(), Target::to_json(&scene_id, point, shape));
            }
            None => {
                header.retain(|k, _| k != "target");
                self.diags.push_error(
                    at.as_deref(),
                    &IiifError::NavigationMiss {
                        detail: "no enclosing Scene, target omitted".into(),
                    },
                );
            }
        }
        self.annotations += 1;
        Value::Object(header)
    }

    /// Body JSON and manifest-space position of a body node.
    fn body(&mut self, node: NodeId, at: Option<&str>) -> (Value, DVec3) {
        let kind = self.host.node_kind(node);
        let transform = self.host.node_transform(node).unwrap_or_default();
        let stored = load_json(self.host, node, IIIF_BODY, &mut self.diags)
            .and_then(|raw| Body::parse(Some(&Value::Object(raw)), &mut Diagnostics::new(), at).ok())
            .filter(|b| b.kind.node_kind() == kind);
        let position = snap_vec(position_to_manifest(transform.position));
        log::debug!("exporting {:?} body at {position}", kind);

        let mut source = match &stored {
            Some(b) => b.source.clone(),
            None => self.fallback_source(node, kind, at),
        };
        let mut chain = TransformChain::default();

        match kind {
            Some(NodeKind::Model) => {
                let degrees = snap_vec(model_rotation_to_manifest(&transform.rotation));
                if !is_zero(degrees) {
                    chain.rotate = Some(degrees);
                }
                match scale_to_manifest(transform.scale) {
                    Ok(s) if (s - 1.0).abs() > IDENTITY_EPSILON => {
                        chain.scale = Some(DVec3::splat(snap(s)))
                    }
                    Ok(_) => {}
                    Err(e) => self.diags.push_error(at, &e),
                }
            }
            Some(NodeKind::Camera) => {
                let degrees = snap_vec(camera_rotation_to_manifest(&transform.rotation));
                if !is_zero(degrees) {
                    chain.rotate = Some(degrees);
                }
                source.retain(|k, _| k != "lookAt");
                if let Some(BodySettings::Camera {
                    projection,
                    field_of_view,
                }) = self.host.body_settings(node)
                {
                    source.insert("type".into(), string(projection.iiif_type()));
                    if let Some(fov) = field_of_view {
                        set_number(&mut source, "fieldOfView", snap(fov));
                    }
                }
            }
            Some(NodeKind::Light) => {
                chain.rotate = stored.as_ref().and_then(|b| b.transforms.rotate);
                if let Some(BodySettings::Light {
                    kind,
                    color,
                    intensity,
                }) = self.host.body_settings(node)
                {
                    source.insert("type".into(), string(kind.iiif_type()));
                    set_color(&mut source, "color", color);
                    set_intensity(&mut source, snap(intensity));
                }
            }
            _ => {}
        }

        let body = if chain.is_empty() {
            Value::Object(source)
        } else {
            let mut wrapper = stored
                .filter(|b| b.wrapped)
                .map(|b| b.raw)
                .unwrap_or_default();
            wrapper.retain(|k, _| k != "lookAt");
            wrapper.insert("type".into(), string("SpecificResource"));
            wrapper.insert("source".into(), Value::Object(source));
            wrapper.insert("transform".into(), Value::Array(chain.to_json()));
            Value::Object(wrapper)
        };
        (body, position)
    }

    /// Body source for a node without stored body JSON.
    fn fallback_source(&mut self, node: NodeId, kind: Option<NodeKind>, at: Option<&str>) -> JsonObject {
        let host = self.host;
        let mut source = JsonObject::new();
        match (kind, host.body_settings(node)) {
            (Some(NodeKind::Model), _) => {
                let url = host.node_property(node, IIIF_SOURCE_URL);
                let id = match url {
                    Some(url) => url.to_string(),
                    None => {
                        self.diags.push(
                            DiagnosticKind::UnsupportedShape,
                            at,
                            "model has no source URL, id minted",
                        );
                        self.resource_id(node, NodeKind::Model)
                    }
                };
                source.insert("id".into(), Value::String(id));
                source.insert("type".into(), string("Model"));
                if let Some(format) = host.node_property(node, IIIF_FORMAT) {
                    source.insert("format".into(), string(format));
                }
            }
            (Some(NodeKind::Camera), settings) => {
                let ty = match settings {
                    Some(BodySettings::Camera { projection, .. }) => projection.iiif_type(),
                    _ => "PerspectiveCamera",
                };
                source.insert("id".into(), Value::String(self.resource_id(node, NodeKind::Camera)));
                source.insert("type".into(), string(ty));
            }
            (Some(NodeKind::Light), settings) => {
                let ty = match settings {
                    Some(BodySettings::Light { kind, .. }) => kind.iiif_type(),
                    _ => "AmbientLight",
                };
                source.insert("id".into(), Value::String(self.resource_id(node, NodeKind::Light)));
                source.insert("type".into(), string(ty));
            }
            _ => {}
        }
        source
    }
}

/// Write `v` under `key` unless the stored number already equals it, so
/// `45` is not rewritten as `45.0`.
fn set_number(obj: &mut JsonObject, key: &str, v: f64) {
    if obj.get(key).and_then(Value::as_f64) != Some(v) {
        obj.insert(key.into(), number(v));
    }
}

/// Write `rgb` as `#RRGGBB` unless the stored string names the same color.
fn set_color(obj: &mut JsonObject, key: &str, rgb: DVec3) {
    let hex = rgb_to_hex(rgb);
    let same = obj
        .get(key)
        .and_then(Value::as_str)
        .and_then(|s| hex_to_rgb(s).ok())
        .is_some_and(|stored| rgb_to_hex(stored) == hex);
    if !same {
        obj.insert(key.into(), Value::String(hex));
    }
}

/// Write a light intensity back in the shape it was read in.
fn set_intensity(source: &mut JsonObject, intensity: f64) {
    match source.get_mut("intensity") {
        Some(Value::Object(obj)) => set_number(obj, "value", intensity),
        Some(Value::Number(_)) => set_number(source, "intensity", intensity),
        _ => {
            let mut obj = JsonObject::new();
            obj.insert("type".into(), string("Value"));
            obj.insert("value".into(), number(intensity));
            obj.insert("unit".into(), string("relative"));
            source.insert("intensity".into(), Value::Object(obj));
        }
    }
}
