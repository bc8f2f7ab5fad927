//! Typed views over manifest JSON.
//!
//! Parsing never copies more than it has to interpret: each level keeps a
//! `header` (its own JSON without its children) for provenance and hands its
//! children on as raw objects, so the importer can scope failures to one
//! entity at a time.

use glam::DVec3;
use serde_json::Value;

use crate::coords::snap_vec;
use crate::color::hex_to_rgb;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::IiifError;
use crate::id::{CameraProjection, LightKind, NodeKind};
use crate::normalize::{
    JsonObject, as_list, as_object, as_singleton_reported, axis_object, axis_values,
    coerce_singleton, display_label, id_of, singleton_object, source_resource, type_of,
};

/// IIIF context written into scaffolded manifests.
pub const PRESENTATION_CONTEXT: &str = "http://iiif.io/api/presentation/4/context.json";

// ---------------------------------------------------------------------------
// Type tags
// ---------------------------------------------------------------------------

/// Every `type` tag the mapping understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Manifest,
    Scene,
    AnnotationPage,
    Annotation,
    Model,
    PerspectiveCamera,
    OrthographicCamera,
    AmbientLight,
    DirectionalLight,
    TextualBody,
    SpecificResource,
    PointSelector,
    RotateTransform,
    ScaleTransform,
    TranslateTransform,
}

impl ResourceType {
    const ALL: [ResourceType; 15] = [
        ResourceType::Manifest,
        ResourceType::Scene,
        ResourceType::AnnotationPage,
        ResourceType::Annotation,
        ResourceType::Model,
        ResourceType::PerspectiveCamera,
        ResourceType::OrthographicCamera,
        ResourceType::AmbientLight,
        ResourceType::DirectionalLight,
        ResourceType::TextualBody,
        ResourceType::SpecificResource,
        ResourceType::PointSelector,
        ResourceType::RotateTransform,
        ResourceType::ScaleTransform,
        ResourceType::TranslateTransform,
    ];

    pub fn from_tag(tag: &str) -> Option<ResourceType> {
        Self::ALL.into_iter().find(|t| t.as_str() == tag)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceType::Manifest => "Manifest",
            ResourceType::Scene => "Scene",
            ResourceType::AnnotationPage => "AnnotationPage",
            ResourceType::Annotation => "Annotation",
            ResourceType::Model => "Model",
            ResourceType::PerspectiveCamera => "PerspectiveCamera",
            ResourceType::OrthographicCamera => "OrthographicCamera",
            ResourceType::AmbientLight => "AmbientLight",
            ResourceType::DirectionalLight => "DirectionalLight",
            ResourceType::TextualBody => "TextualBody",
            ResourceType::SpecificResource => "SpecificResource",
            ResourceType::PointSelector => "PointSelector",
            ResourceType::RotateTransform => "RotateTransform",
            ResourceType::ScaleTransform => "ScaleTransform",
            ResourceType::TranslateTransform => "TranslateTransform",
        }
    }
}

fn resource_type(obj: &JsonObject) -> Option<ResourceType> {
    type_of(obj).and_then(ResourceType::from_tag)
}

fn unknown(obj: &JsonObject) -> IiifError {
    IiifError::UnknownType {
        type_tag: type_of(obj).map(str::to_string),
    }
}

/// `obj` without the listed keys.
fn without(obj: &JsonObject, keys: &[&str]) -> JsonObject {
    obj.iter()
        .filter(|(k, _)| !keys.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

// ---------------------------------------------------------------------------
// Transforms
// ---------------------------------------------------------------------------

/// One entry of a SpecificResource `transform` list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transform {
    /// Degrees about each manifest axis.
    Rotate(DVec3),
    Scale(DVec3),
    Translate(DVec3),
}

impl Transform {
    pub fn parse(value: &Value, diags: &mut Diagnostics, at: Option<&str>) -> Result<Transform, IiifError> {
        let obj = as_object(Some(value), None)?
            .ok_or_else(|| IiifError::shape("null transform"))?;
        let v = axis_values(&obj, diags, at)?;
        match resource_type(&obj) {
            Some(ResourceType::RotateTransform) => Ok(Transform::Rotate(v)),
            Some(ResourceType::ScaleTransform) => Ok(Transform::Scale(v)),
            Some(ResourceType::TranslateTransform) => Ok(Transform::Translate(v)),
            _ => Err(IiifError::feature(format!(
                "transform type {:?} is not supported",
                type_of(&obj).unwrap_or("<none>")
            ))),
        }
    }

    pub fn resource_type(&self) -> ResourceType {
        match self {
            Transform::Rotate(_) => ResourceType::RotateTransform,
            Transform::Scale(_) => ResourceType::ScaleTransform,
            Transform::Translate(_) => ResourceType::TranslateTransform,
        }
    }

    pub fn to_json(&self) -> Value {
        let v = match *self {
            Transform::Rotate(v) | Transform::Scale(v) | Transform::Translate(v) => v,
        };
        axis_object(self.resource_type().as_str(), snap_vec(v))
    }
}

/// A validated transform list: at most one of each kind.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransformChain {
    pub scale: Option<DVec3>,
    pub rotate: Option<DVec3>,
    pub translate: Option<DVec3>,
}

impl TransformChain {
    /// Parse a `transform` property.
    ///
    /// Unsupported entries and duplicates are reported and dropped (the
    /// first of each kind wins). A TranslateTransform that is not last is
    /// reported and applied as if it were last.
    pub fn parse(value: Option<&Value>, diags: &mut Diagnostics, at: Option<&str>) -> TransformChain {
        let mut chain = TransformChain::default();
        let items = as_list(value);
        let count = items.len();
        for (index, item) in items.into_iter().enumerate() {
            let transform = match Transform::parse(item, diags, at) {
                Ok(t) => t,
                Err(e) => {
                    diags.push_error(at, &e);
                    continue;
                }
            };
            let slot = match transform {
                Transform::Scale(v) => (&mut chain.scale, v),
                Transform::Rotate(v) => (&mut chain.rotate, v),
                Transform::Translate(v) => (&mut chain.translate, v),
            };
            if slot.0.is_some() {
                diags.push(
                    DiagnosticKind::UnsupportedFeature,
                    at,
                    format!(
                        "duplicate {}, only the first is applied",
                        transform.resource_type().as_str()
                    ),
                );
                continue;
            }
            *slot.0 = Some(slot.1);
            if matches!(transform, Transform::Translate(_)) && index + 1 != count {
                diags.push(
                    DiagnosticKind::UnsupportedFeature,
                    at,
                    "TranslateTransform is not last, applied after the other transforms",
                );
            }
        }
        chain
    }

    pub fn is_empty(&self) -> bool {
        self.scale.is_none() && self.rotate.is_none() && self.translate.is_none()
    }

    /// Canonical order: scale, rotate, translate.
    pub fn to_json(&self) -> Vec<Value> {
        let mut out = Vec::new();
        if let Some(v) = self.scale {
            out.push(Transform::Scale(v).to_json());
        }
        if let Some(v) = self.rotate {
            out.push(Transform::Rotate(v).to_json());
        }
        if let Some(v) = self.translate {
            out.push(Transform::Translate(v).to_json());
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyKind {
    Model,
    Camera(CameraProjection),
    Light(LightKind),
    TextualBody,
}

impl BodyKind {
    pub fn from_type(ty: ResourceType) -> Option<BodyKind> {
        match ty {
            ResourceType::Model => Some(BodyKind::Model),
            ResourceType::PerspectiveCamera => Some(BodyKind::Camera(CameraProjection::Perspective)),
            ResourceType::OrthographicCamera => {
                Some(BodyKind::Camera(CameraProjection::Orthographic))
            }
            ResourceType::AmbientLight => Some(BodyKind::Light(LightKind::Ambient)),
            ResourceType::DirectionalLight => Some(BodyKind::Light(LightKind::Directional)),
            ResourceType::TextualBody => Some(BodyKind::TextualBody),
            _ => None,
        }
    }

    /// Scene node kind, or `None` for bodies with no scene counterpart.
    pub fn node_kind(self) -> Option<NodeKind> {
        match self {
            BodyKind::Model => Some(NodeKind::Model),
            BodyKind::Camera(_) => Some(NodeKind::Camera),
            BodyKind::Light(_) => Some(NodeKind::Light),
            BodyKind::TextualBody => None,
        }
    }

    pub fn iiif_type(self) -> &'static str {
        match self {
            BodyKind::Model => ResourceType::Model.as_str(),
            BodyKind::Camera(p) => p.iiif_type(),
            BodyKind::Light(k) => k.iiif_type(),
            BodyKind::TextualBody => ResourceType::TextualBody.as_str(),
        }
    }
}

/// What a camera's `lookAt` points at.
#[derive(Debug, Clone, PartialEq)]
pub enum LookAt {
    /// Manifest-space point.
    Point(DVec3),
    /// Id of an Annotation whose content the camera faces.
    Annotation(String),
}

/// An Annotation body with one SpecificResource level unwrapped.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub kind: BodyKind,
    /// The source resource (the body itself when not wrapped).
    pub source: JsonObject,
    pub transforms: TransformChain,
    pub wrapped: bool,
    /// The body exactly as written, wrapper included.
    pub raw: JsonObject,
}

impl Body {
    pub fn parse(value: Option<&Value>, diags: &mut Diagnostics, at: Option<&str>) -> Result<Body, IiifError> {
        let (raw, ignored) = singleton_object(value, None)?;
        if ignored > 0 {
            diags.push(
                DiagnosticKind::ListCoerced,
                at,
                format!("body list coerced to singleton, {ignored} ignored"),
            );
        }
        let raw = raw.ok_or_else(|| IiifError::shape("annotation has no body"))?;
        let wrapped = resource_type(&raw) == Some(ResourceType::SpecificResource);
        let source = source_resource(&raw, None)?;
        let kind = resource_type(&source)
            .and_then(BodyKind::from_type)
            .ok_or_else(|| unknown(&source))?;
        let transforms = if wrapped {
            TransformChain::parse(raw.get("transform"), diags, at)
        } else {
            TransformChain::default()
        };
        Ok(Body {
            kind,
            source,
            transforms,
            wrapped,
            raw,
        })
    }

    pub fn id(&self) -> Option<&str> {
        id_of(&self.source)
    }

    pub fn label(&self) -> Option<String> {
        display_label(&self.source)
    }

    /// A source-level property, falling back to the wrapper.
    fn property(&self, key: &str) -> Option<&Value> {
        self.source.get(key).or_else(|| self.raw.get(key))
    }

    pub fn format(&self) -> Option<&str> {
        coerce_singleton(self.property("format")).value.and_then(Value::as_str)
    }

    /// Camera field of view in degrees.
    pub fn field_of_view(&self) -> Option<f64> {
        self.property("fieldOfView").and_then(Value::as_f64)
    }

    pub fn look_at(&self, diags: &mut Diagnostics, at: Option<&str>) -> Result<Option<LookAt>, IiifError> {
        let (obj, _) = singleton_object(self.property("lookAt"), Some("Annotation"))?;
        let Some(obj) = obj else {
            return Ok(None);
        };
        match resource_type(&obj) {
            Some(ResourceType::PointSelector) => {
                Ok(Some(LookAt::Point(axis_values(&obj, diags, at)?)))
            }
            Some(ResourceType::Annotation) => id_of(&obj)
                .map(|id| Some(LookAt::Annotation(id.to_string())))
                .ok_or_else(|| IiifError::shape("lookAt Annotation without an id")),
            _ => Err(IiifError::feature(format!(
                "lookAt of type {:?} is not supported",
                type_of(&obj).unwrap_or("<none>")
            ))),
        }
    }

    /// Light color as 0..1 RGB.
    pub fn color(&self) -> Result<Option<DVec3>, IiifError> {
        match self.property("color") {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => hex_to_rgb(s).map(Some),
            Some(other) => Err(IiifError::shape(format!("color {other} is not a string"))),
        }
    }

    /// Light intensity: the `value` of an intensity object, or a bare number.
    pub fn intensity(&self) -> Option<f64> {
        match self.property("intensity")? {
            Value::Number(n) => n.as_f64(),
            Value::Object(obj) => obj.get("value").and_then(Value::as_f64),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Targets
// ---------------------------------------------------------------------------

/// How a target was written, so export can keep the same shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetShape {
    /// `"target": "https://.../scene/1"`
    BareString,
    /// `"target": {"id": ..., "type": "Scene"}`
    #[default]
    SceneObject,
    /// `"target": {"type": "SpecificResource", "source": ..., "selector": ...}`
    Specific { source_string: bool, selector_list: bool },
}

/// Where an Annotation places its body.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Target {
    pub scene_id: Option<String>,
    /// Manifest-space point from a PointSelector.
    pub point: Option<DVec3>,
    pub shape: TargetShape,
}

impl Target {
    pub fn parse(value: Option<&Value>, diags: &mut Diagnostics, at: Option<&str>) -> Result<Target, IiifError> {
        let Some(value) = as_singleton_reported(value, "target", diags, at) else {
            return Ok(Target::default());
        };
        if let Value::String(id) = value {
            return Ok(Target {
                scene_id: Some(id.clone()),
                point: None,
                shape: TargetShape::BareString,
            });
        }
        let obj = as_object(Some(value), Some("Scene"))?
            .ok_or_else(|| IiifError::shape("null target"))?;
        if resource_type(&obj) != Some(ResourceType::SpecificResource) {
            return Ok(Target {
                scene_id: id_of(&obj).map(str::to_string),
                point: None,
                shape: TargetShape::SceneObject,
            });
        }

        let source_string = matches!(coerce_singleton(obj.get("source")).value, Some(Value::String(_)));
        let scene_id = source_resource(&obj, Some("Scene"))
            .ok()
            .and_then(|s| id_of(&s).map(str::to_string));
        let selector_list = matches!(obj.get("selector"), Some(Value::Array(_)));
        let (selector, ignored) = singleton_object(obj.get("selector"), None)?;
        if ignored > 0 {
            diags.push(
                DiagnosticKind::ListCoerced,
                at,
                format!("selector list coerced to singleton, {ignored} ignored"),
            );
        }
        let point = match selector {
            None => None,
            Some(sel) if resource_type(&sel) == Some(ResourceType::PointSelector) => {
                Some(axis_values(&sel, diags, at)?)
            }
            Some(sel) => {
                diags.push(
                    DiagnosticKind::UnsupportedFeature,
                    at,
                    format!(
                        "selector type {:?} is not supported, placed at the origin",
                        type_of(&sel).unwrap_or("<none>")
                    ),
                );
                None
            }
        };
        Ok(Target {
            scene_id,
            point,
            shape: TargetShape::Specific {
                source_string,
                selector_list,
            },
        })
    }

    /// Build a target JSON value. A point turns any shape into a
    /// SpecificResource; without one, a previous SpecificResource shape
    /// collapses to the Scene object.
    pub fn to_json(scene_id: &str, point: Option<DVec3>, shape: TargetShape) -> Value {
        let scene_ref = |as_string: bool| {
            if as_string {
                Value::String(scene_id.to_string())
            } else {
                let mut scene = JsonObject::new();
                scene.insert("id".into(), Value::String(scene_id.to_string()));
                scene.insert("type".into(), Value::String("Scene".into()));
                Value::Object(scene)
            }
        };
        let Some(point) = point else {
            return scene_ref(shape == TargetShape::BareString);
        };
        let (source_string, selector_list) = match shape {
            TargetShape::Specific {
                source_string,
                selector_list,
            } => (source_string, selector_list),
            _ => (false, false),
        };
        let selector = axis_object(ResourceType::PointSelector.as_str(), snap_vec(point));
        let mut target = JsonObject::new();
        target.insert("type".into(), Value::String("SpecificResource".into()));
        target.insert("source".into(), scene_ref(source_string));
        target.insert(
            "selector".into(),
            if selector_list {
                Value::Array(vec![selector])
            } else {
                selector
            },
        );
        Value::Object(target)
    }
}

// ---------------------------------------------------------------------------
// Containers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub id: Option<String>,
    pub label: Option<String>,
    /// Annotation JSON without its `body`.
    pub header: JsonObject,
    pub body: Option<Value>,
    pub target: Target,
}

impl Annotation {
    pub fn parse(obj: &JsonObject, diags: &mut Diagnostics) -> Result<Annotation, IiifError> {
        if resource_type(obj) != Some(ResourceType::Annotation) {
            return Err(unknown(obj));
        }
        let id = id_of(obj).map(str::to_string);
        let target = Target::parse(obj.get("target"), diags, id.as_deref())?;
        Ok(Annotation {
            label: display_label(obj),
            header: without(obj, &["body"]),
            body: obj.get("body").cloned(),
            target,
            id,
        })
    }
}

/// An item of a Scene.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneItem {
    Page(JsonObject),
    Annotation(JsonObject),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationPage {
    pub id: Option<String>,
    pub label: Option<String>,
    pub header: JsonObject,
    pub annotations: Vec<JsonObject>,
}

impl AnnotationPage {
    pub fn parse(obj: &JsonObject, diags: &mut Diagnostics) -> Result<AnnotationPage, IiifError> {
        if resource_type(obj) != Some(ResourceType::AnnotationPage) {
            return Err(unknown(obj));
        }
        let id = id_of(obj).map(str::to_string);
        let mut annotations = Vec::new();
        for item in as_list(obj.get("items")) {
            match as_object(Some(item), Some("Annotation")) {
                Ok(Some(anno)) => annotations.push(anno),
                Ok(None) => {}
                Err(e) => diags.push_error(id.as_deref(), &e),
            }
        }
        Ok(AnnotationPage {
            label: display_label(obj),
            header: without(obj, &["items"]),
            annotations,
            id,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub id: Option<String>,
    pub label: Option<String>,
    /// `backgroundColor` as 0..1 RGB, when it is a valid `#RRGGBB`.
    pub background: Option<DVec3>,
    pub header: JsonObject,
    pub items: Vec<SceneItem>,
}

impl Scene {
    /// Parse a Scene. Items that are neither AnnotationPage nor Annotation
    /// are reported and dropped; an invalid `backgroundColor` is reported and
    /// kept as written.
    pub fn parse(obj: &JsonObject, diags: &mut Diagnostics) -> Result<Scene, IiifError> {
        if resource_type(obj) != Some(ResourceType::Scene) {
            return Err(unknown(obj));
        }
        let id = id_of(obj).map(str::to_string);
        let mut background = None;
        if let Some(color) = obj.get("backgroundColor") {
            match color.as_str().map(hex_to_rgb) {
                Some(Ok(rgb)) => background = Some(rgb),
                _ => diags.push(
                    DiagnosticKind::UnsupportedShape,
                    id.as_deref(),
                    format!("backgroundColor {color} is not #RRGGBB"),
                ),
            }
        }
        let mut items = Vec::new();
        for item in as_list(obj.get("items")) {
            let item = match as_object(Some(item), None) {
                Ok(Some(item)) => item,
                Ok(None) => continue,
                Err(e) => {
                    diags.push_error(id.as_deref(), &e);
                    continue;
                }
            };
            match resource_type(&item) {
                Some(ResourceType::AnnotationPage) => items.push(SceneItem::Page(item)),
                Some(ResourceType::Annotation) => items.push(SceneItem::Annotation(item)),
                _ => diags.push_error(id_of(&item).or(id.as_deref()), &unknown(&item)),
            }
        }
        Ok(Scene {
            label: display_label(obj),
            background,
            header: without(obj, &["items"]),
            items,
            id,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    pub id: Option<String>,
    pub label: Option<String>,
    pub header: JsonObject,
    pub scenes: Vec<JsonObject>,
}

impl Manifest {
    /// Parse and validate a manifest document.
    ///
    /// Fails with [`IiifError::MalformedManifest`] when the document is not
    /// a `Manifest` object or contains no Scene.
    pub fn parse(value: &Value, diags: &mut Diagnostics) -> Result<Manifest, IiifError> {
        let Value::Object(obj) = value else {
            return Err(IiifError::malformed("document is not a JSON object"));
        };
        if resource_type(obj) != Some(ResourceType::Manifest) {
            return Err(IiifError::malformed(format!(
                "expected type \"Manifest\", found {:?}",
                type_of(obj).unwrap_or("<none>")
            )));
        }
        let id = id_of(obj).map(str::to_string);
        let mut scenes = Vec::new();
        for item in as_list(obj.get("items")) {
            match as_object(Some(item), Some("Scene")) {
                Ok(Some(scene)) if resource_type(&scene) == Some(ResourceType::Scene) => {
                    scenes.push(scene)
                }
                Ok(Some(other)) => {
                    diags.push_error(id_of(&other).or(id.as_deref()), &unknown(&other))
                }
                Ok(None) => {}
                Err(e) => diags.push_error(id.as_deref(), &e),
            }
        }
        if scenes.is_empty() {
            return Err(IiifError::malformed("manifest contains no Scene"));
        }
        Ok(Manifest {
            label: display_label(obj),
            header: without(obj, &["items"]),
            scenes,
            id,
        })
    }

    pub fn from_json_str(text: &str, diags: &mut Diagnostics) -> Result<Manifest, IiifError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| IiifError::malformed(format!("invalid JSON: {e}")))?;
        Manifest::parse(&value, diags)
    }
}

/// Re-attach children to a stored container header.
pub fn with_items(mut header: JsonObject, items: Vec<Value>) -> Value {
    header.insert("items".into(), Value::Array(items));
    Value::Object(header)
}
