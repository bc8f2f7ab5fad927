//! Integration tests for IIIF 3D import and export.
//!
//! These tests drive whole manifests through the public API: import into a
//! `SceneGraph`, edit nodes the way a user would, export, and re-import.

use glam::DVec3;
use iiif3d_core::coords::{
    camera_rotation_to_manifest, model_rotation_to_manifest, model_rotation_to_scene,
};
use iiif3d_core::exporter::{export_first_manifest, to_pretty_string};
use iiif3d_core::importer::{import_manifest, import_str};
use iiif3d_core::navigation::{children_of_type, descendants};
use iiif3d_core::scaffold::{ScaffoldOptions, add_model, new_manifest};
use iiif3d_core::test_utils::*;
use iiif3d_core::*;
use serde_json::{Value, json};

fn kinds(diagnostics: &[Diagnostic]) -> Vec<DiagnosticKind> {
    diagnostics.iter().map(|d| d.kind).collect()
}

/// RotateTransform angles of an exported body, zero when it has none.
fn exported_rotation(body: &Value) -> DVec3 {
    body["transform"]
        .as_array()
        .and_then(|list| list.iter().find(|t| t["type"] == "RotateTransform"))
        .map(json_vec)
        .unwrap_or(DVec3::ZERO)
}

// ===========================================================================
// Test 1: Single model, no transforms
// ===========================================================================

#[test]
fn single_model_imports_at_origin_and_round_trips() {
    let mut g = graph_with_model("https://x/m.glb");
    let doc = manifest_with_bodies(vec![model_body("https://x/m.glb")]);

    let report = import_manifest(&mut g, &doc, &ImportOptions::default()).unwrap();
    assert!(report.diagnostics.is_empty());
    assert_eq!(report.bodies.len(), 1);

    let transform = g.node_transform(report.bodies[0]).unwrap();
    assert_vec_close(transform.position, DVec3::ZERO, 1e-12);
    assert_vec_close(transform.scale, DVec3::ONE, 1e-12);
    assert_vec_close(model_rotation_to_manifest(&transform.rotation), DVec3::ZERO, 1e-9);

    let (out, export) = export_first_manifest(&g, &ExportOptions::default()).unwrap();
    assert_eq!(out, doc);
    assert_eq!(export.annotations, 1);
}

// ===========================================================================
// Test 2: Non-uniform scale
// ===========================================================================

#[test]
fn non_uniform_scale_is_reported_and_ignored() {
    let mut g = graph_with_model("https://x/m.glb");
    let body = json!({
        "type": "SpecificResource",
        "source": model_body("https://x/m.glb"),
        "transform": [{"type": "ScaleTransform", "x": 2.0, "y": 3.0, "z": 2.0}],
    });
    let doc = manifest_with_bodies(vec![body]);

    let report = import_manifest(&mut g, &doc, &ImportOptions::default()).unwrap();
    assert_eq!(kinds(&report.diagnostics), vec![DiagnosticKind::UnsupportedFeature]);
    let transform = g.node_transform(report.bodies[0]).unwrap();
    assert_vec_close(transform.scale, DVec3::ONE, 1e-12);
}

// ===========================================================================
// Test 3: Camera with rotation and point selector
// ===========================================================================

#[test]
fn camera_rotation_and_position_survive_a_round_trip() {
    let mut g = SceneGraph::new();
    let body = json!({
        "type": "SpecificResource",
        "source": {"id": "https://x/camera/1", "type": "PerspectiveCamera", "fieldOfView": 50.0},
        "transform": [{"type": "RotateTransform", "x": 0.0, "y": 90.0, "z": 0.0}],
    });
    let doc = manifest_with_annotations(vec![annotation(1, body, point_target(1.0, 2.0, 3.0))]);

    let report = import_manifest(&mut g, &doc, &ImportOptions::default()).unwrap();
    assert!(report.diagnostics.is_empty());
    let camera = report.bodies[0];
    let transform = g.node_transform(camera).unwrap();
    assert_vec_close(transform.position, DVec3::new(1.0, -3.0, 2.0), 1e-12);
    assert_vec_close(
        camera_rotation_to_manifest(&transform.rotation),
        DVec3::new(0.0, 90.0, 0.0),
        1e-9,
    );
    assert_eq!(
        g.body_settings(camera),
        Some(BodySettings::Camera {
            projection: id::CameraProjection::Perspective,
            field_of_view: Some(50.0),
        })
    );

    let (out, _) = export_first_manifest(&g, &ExportOptions::default()).unwrap();
    let anno = &out["items"][0]["items"][0]["items"][0];
    assert_eq!(anno["body"]["source"]["type"], "PerspectiveCamera");
    assert_eq!(anno["body"]["source"]["fieldOfView"], 50.0);
    assert_vec_close(exported_rotation(&anno["body"]), DVec3::new(0.0, 90.0, 0.0), 1e-6);
    assert_vec_close(json_vec(&anno["target"]["selector"]), DVec3::new(1.0, 2.0, 3.0), 1e-9);
}

// ===========================================================================
// Test 4: Malformed manifests
// ===========================================================================

#[test]
fn manifest_without_scenes_is_malformed_and_creates_nothing() {
    let mut g = SceneGraph::new();
    let text = r#"{"id": "https://x/manifest", "type": "Manifest", "items": []}"#;
    let err = import_str(&mut g, text, &ImportOptions::default()).unwrap_err();
    assert!(matches!(err, IiifError::MalformedManifest { .. }));
    assert_eq!(g.len(), 0);
}

#[test]
fn non_manifest_document_is_malformed() {
    let mut g = SceneGraph::new();
    let doc = json!({"id": SCENE_ID, "type": "Scene", "items": []});
    let err = import_manifest(&mut g, &doc, &ImportOptions::default()).unwrap_err();
    assert!(matches!(err, IiifError::MalformedManifest { .. }));
    assert!(g.is_empty());
}

// ===========================================================================
// Test 5: Mixed manifest
// ===========================================================================
//
// Two models, a camera aimed at the second model by reference, a light, an
// unknown body type and a model whose asset is missing. Only the failing
// entries are skipped.

#[test]
fn mixed_manifest_skips_only_failing_entries() {
    let mut g = graph_with_models(&["https://x/a.glb", "https://x/b.glb"]);
    let camera = json!({
        "id": "https://x/camera/1",
        "type": "PerspectiveCamera",
        "lookAt": {"id": "https://x/anno/2", "type": "Annotation"},
    });
    let light = json!({
        "id": "https://x/light/1",
        "type": "DirectionalLight",
        "color": "#FF8000",
        "intensity": {"type": "Value", "value": 0.5, "unit": "relative"},
    });
    let doc = manifest_with_annotations(vec![
        annotation(1, camera, point_target(0.0, 0.0, 5.0)),
        annotation(2, model_body("https://x/a.glb"), point_target(0.0, 0.0, -5.0)),
        annotation(3, model_body("https://x/b.glb"), scene_target()),
        annotation(4, light, scene_target()),
        annotation(5, json!({"id": "https://x/v", "type": "Video"}), scene_target()),
        annotation(6, model_body("https://x/missing.glb"), scene_target()),
    ]);

    let report = import_manifest(&mut g, &doc, &ImportOptions::default()).unwrap();
    assert_eq!(report.bodies.len(), 4);
    assert_eq!(
        kinds(&report.diagnostics),
        vec![DiagnosticKind::UnknownType, DiagnosticKind::AssetFetchFailure]
    );
    assert_eq!(report.diagnostics[1].resource.as_deref(), Some("https://x/anno/6"));

    let page = children_of_type(&g, report.scenes[0], NodeKind::AnnotationPage)[0];
    assert_eq!(children_of_type(&g, page, NodeKind::Annotation).len(), 4);

    // Camera aimed along manifest -Z, the rest orientation.
    let camera_node = report.bodies[0];
    let transform = g.node_transform(camera_node).unwrap();
    assert_vec_close(camera_rotation_to_manifest(&transform.rotation), DVec3::ZERO, 1e-6);

    let light_node = report.bodies[3];
    assert_eq!(
        g.body_settings(light_node),
        Some(BodySettings::Light {
            kind: id::LightKind::Directional,
            color: DVec3::new(1.0, 128.0 / 255.0, 0.0),
            intensity: 0.5,
        })
    );

    let (out, export) = export_first_manifest(&g, &ExportOptions::default()).unwrap();
    assert_eq!(export.annotations, 4);
    let items = out["items"][0]["items"][0]["items"].as_array().unwrap();
    assert_eq!(items.len(), 4);
    assert!(items[0]["body"].get("lookAt").is_none());
    assert_eq!(items[3]["body"]["color"], "#FF8000");
    assert_eq!(items[3]["body"]["intensity"]["value"], 0.5);
}

// ===========================================================================
// Test 6: User edits survive export and re-import
// ===========================================================================

#[test]
fn edited_transforms_survive_reimport() {
    let url = "https://x/m.glb";
    let mut g = graph_with_model(url);
    let doc = manifest_with_bodies(vec![model_body(url)]);
    let report = import_manifest(&mut g, &doc, &ImportOptions::default()).unwrap();

    let edited = NodeTransform {
        position: DVec3::new(2.0, -1.0, 0.5),
        rotation: model_rotation_to_scene(DVec3::new(10.0, 20.0, 30.0)),
        scale: DVec3::splat(1.5),
    };
    g.set_node_transform(report.bodies[0], edited);
    let (out, _) = export_first_manifest(&g, &ExportOptions::default()).unwrap();

    let mut fresh = graph_with_model(url);
    let again = import_manifest(&mut fresh, &out, &ImportOptions::default()).unwrap();
    assert!(again.diagnostics.is_empty());
    let transform = fresh.node_transform(again.bodies[0]).unwrap();
    assert_vec_close(transform.position, edited.position, 1e-9);
    assert_vec_close(transform.scale, edited.scale, 1e-9);
    assert_vec_close(
        model_rotation_to_manifest(&transform.rotation),
        DVec3::new(10.0, 20.0, 30.0),
        1e-6,
    );

    // Imported geometry hangs below the body node.
    let geometry = descendants(&fresh, &[again.bodies[0]]);
    assert_eq!(geometry.len(), 1);
    assert_eq!(fresh.node_kind(geometry[0]), None);
}

#[test]
fn persisted_graph_exports_the_same_manifest() {
    let url = "https://x/m.glb";
    let mut g = graph_with_model(url);
    import_manifest(&mut g, &large_manifest(url, 5), &ImportOptions::default()).unwrap();
    let (before, _) = export_first_manifest(&g, &ExportOptions::default()).unwrap();

    let saved = serde_json::to_string(&g).unwrap();
    let restored: SceneGraph = serde_json::from_str(&saved).unwrap();
    let (after, _) = export_first_manifest(&restored, &ExportOptions::default()).unwrap();
    assert_eq!(
        to_pretty_string(&before).unwrap(),
        to_pretty_string(&after).unwrap()
    );
}

// ===========================================================================
// Test 7: Scaffolding
// ===========================================================================

#[test]
fn scaffolded_manifest_with_model_reimports() {
    let url = "https://x/chair.glb";
    let mut g = graph_with_model(url);
    let scaffold = new_manifest(&mut g, &ScaffoldOptions::default());
    let body = add_model(&mut g, scaffold.page, url, &ScaffoldOptions::default()).unwrap();
    g.set_node_transform(
        body,
        NodeTransform {
            position: DVec3::new(0.0, 0.0, 1.0),
            ..g.node_transform(body).unwrap()
        },
    );

    let (out, export) = export_first_manifest(&g, &ExportOptions::default()).unwrap();
    assert!(export.diagnostics.is_empty());
    let anno = &out["items"][0]["items"][0]["items"][0];
    assert_vec_close(json_vec(&anno["target"]["selector"]), DVec3::new(0.0, 1.0, 0.0), 1e-9);

    let mut fresh = graph_with_model(url);
    let report = import_manifest(&mut fresh, &out, &ImportOptions::default()).unwrap();
    assert!(report.diagnostics.is_empty());
    assert_eq!(report.bodies.len(), 1);
    let transform = fresh.node_transform(report.bodies[0]).unwrap();
    assert_vec_close(transform.position, DVec3::new(0.0, 0.0, 1.0), 1e-9);
}

// ===========================================================================
// Test 8: Scene background and manifest text edits
// ===========================================================================

#[test]
fn edited_background_and_label_are_exported() {
    let url = "https://x/m.glb";
    let mut g = graph_with_model(url);
    let mut doc = manifest_with_bodies(vec![model_body(url)]);
    doc["items"][0]["backgroundColor"] = json!("#336699");
    let report = import_manifest(&mut g, &doc, &ImportOptions::default()).unwrap();
    assert!(report.diagnostics.is_empty());

    let scene = report.scenes[0];
    let background = g.scene_background(scene).unwrap();
    assert_vec_close(background, DVec3::new(0.2, 0.4, 0.6), 1e-12);

    g.set_scene_background(scene, Some(DVec3::new(1.0, 0.5, 0.0)));
    g.set_node_property(report.manifest, "iiif_label", "Edited room".into());
    g.set_node_property(report.manifest, "iiif_summary", "Two chairs".into());
    let (out, export) = export_first_manifest(&g, &ExportOptions::default()).unwrap();
    assert!(export.diagnostics.is_empty());
    assert_eq!(out["items"][0]["backgroundColor"], "#FF8000");
    assert_eq!(out["label"], json!({"en": ["Edited room"]}));
    assert_eq!(out["summary"], json!({"en": ["Two chairs"]}));

    let mut fresh = graph_with_model(url);
    let again = import_manifest(&mut fresh, &out, &ImportOptions::default()).unwrap();
    let background = fresh.scene_background(again.scenes[0]).unwrap();
    assert_vec_close(background, DVec3::new(1.0, 128.0 / 255.0, 0.0), 1e-12);
    assert_eq!(fresh.node_name(again.manifest), Some("Edited room"));
}

// ===========================================================================
// Test 9: Non-finite coordinates
// ===========================================================================

#[test]
fn non_finite_translate_is_reported_and_read_as_zero() {
    let url = "https://x/m.glb";
    let mut g = graph_with_model(url);
    let body = json!({
        "type": "SpecificResource",
        "source": model_body(url),
        "transform": [{"type": "TranslateTransform", "x": "NaN", "y": 2.0, "z": "inf"}],
    });
    let doc = manifest_with_bodies(vec![body]);
    let report = import_manifest(&mut g, &doc, &ImportOptions::default()).unwrap();
    assert_eq!(
        kinds(&report.diagnostics),
        vec![DiagnosticKind::UnsupportedShape, DiagnosticKind::UnsupportedShape]
    );
    assert_eq!(report.bodies.len(), 1);

    let position = g.node_transform(report.bodies[0]).unwrap().position;
    assert!(position.is_finite());
    assert_vec_close(position, DVec3::new(0.0, 0.0, 2.0), 1e-9);

    let (out, _) = export_first_manifest(&g, &ExportOptions::default()).unwrap();
    let selector = &out["items"][0]["items"][0]["items"][0]["target"]["selector"];
    assert_vec_close(json_vec(selector), DVec3::new(0.0, 2.0, 0.0), 1e-9);
}
