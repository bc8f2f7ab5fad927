//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use glam::DVec3;
use serde_json::{Value, json};

use crate::bounds::Aabb;
use crate::host::MeshInfo;
use crate::scene_graph::{AssetTable, SceneGraph};

pub const MANIFEST_ID: &str = "https://x/manifest";
pub const SCENE_ID: &str = "https://x/scene/1";
pub const PAGE_ID: &str = "https://x/page/1";

// ===========================================================================
// Assets
// ===========================================================================

/// A 2x2x2 mesh centred on its origin.
pub fn cube_mesh(name: &str) -> MeshInfo {
    MeshInfo {
        name: name.to_string(),
        bounds: Some(Aabb::new(DVec3::splat(-1.0), DVec3::ONE)),
    }
}

/// Asset table where each URL resolves to `/assets/{file name}` holding one cube.
pub fn asset_table(urls: &[&str]) -> AssetTable {
    let mut table = AssetTable::new();
    for url in urls {
        let file = url.rsplit('/').next().unwrap_or(url);
        let stem = file.split('.').next().unwrap_or(file);
        table.register(*url, format!("/assets/{file}"), vec![cube_mesh(stem)]);
    }
    table
}

pub fn graph_with_models(urls: &[&str]) -> SceneGraph {
    SceneGraph::with_assets(Box::new(asset_table(urls)))
}

pub fn graph_with_model(url: &str) -> SceneGraph {
    graph_with_models(&[url])
}

// ===========================================================================
// Manifest JSON
// ===========================================================================

pub fn model_body(url: &str) -> Value {
    json!({"id": url, "type": "Model", "format": "model/gltf-binary"})
}

pub fn scene_target() -> Value {
    json!({"id": SCENE_ID, "type": "Scene"})
}

pub fn point_target(x: f64, y: f64, z: f64) -> Value {
    json!({
        "type": "SpecificResource",
        "source": {"id": SCENE_ID, "type": "Scene"},
        "selector": {"type": "PointSelector", "x": x, "y": y, "z": z},
    })
}

pub fn annotation(n: usize, body: Value, target: Value) -> Value {
    json!({
        "id": format!("https://x/anno/{n}"),
        "type": "Annotation",
        "motivation": ["painting"],
        "body": body,
        "target": target,
    })
}

/// One Scene with one AnnotationPage holding the given Annotations.
pub fn manifest_with_annotations(annotations: Vec<Value>) -> Value {
    json!({
        "@context": "http://iiif.io/api/presentation/4/context.json",
        "id": MANIFEST_ID,
        "type": "Manifest",
        "label": {"en": ["Test manifest"]},
        "items": [{
            "id": SCENE_ID,
            "type": "Scene",
            "label": {"en": ["Test scene"]},
            "items": [{
                "id": PAGE_ID,
                "type": "AnnotationPage",
                "items": annotations,
            }],
        }],
    })
}

/// One Annotation per body, each targeting the Scene with no selector.
pub fn manifest_with_bodies(bodies: Vec<Value>) -> Value {
    let annotations = bodies
        .into_iter()
        .enumerate()
        .map(|(i, body)| annotation(i + 1, body, scene_target()))
        .collect();
    manifest_with_annotations(annotations)
}

/// A manifest with `count` model annotations at spread-out positions, all
/// using the same asset.
pub fn large_manifest(url: &str, count: usize) -> Value {
    let annotations = (0..count)
        .map(|i| {
            let body = json!({
                "type": "SpecificResource",
                "source": model_body(url),
                "transform": [
                    {"type": "ScaleTransform", "x": 2.0, "y": 2.0, "z": 2.0},
                    {"type": "RotateTransform", "x": 0.0, "y": (i % 360) as f64, "z": 0.0},
                ],
            });
            let target = point_target(i as f64, 0.0, -(i as f64));
            annotation(i + 1, body, target)
        })
        .collect();
    manifest_with_annotations(annotations)
}

// ===========================================================================
// Assertions
// ===========================================================================

pub fn assert_vec_close(actual: DVec3, expected: DVec3, eps: f64) {
    assert!(
        (actual - expected).abs().max_element() <= eps,
        "expected {expected}, got {actual}"
    );
}

/// Read `{x, y, z}` from a JSON object.
pub fn json_vec(value: &Value) -> DVec3 {
    let axis = |k: &str| value.get(k).and_then(Value::as_f64).unwrap_or(0.0);
    DVec3::new(axis("x"), axis("y"), axis("z"))
}
