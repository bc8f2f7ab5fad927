//! Original manifest JSON kept on scene nodes so export can rebuild
//! everything the scene graph itself does not model.

use serde_json::Value;

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::host::SceneHost;
use crate::id::NodeId;
use crate::normalize::JsonObject;

/// Prefix shared by every provenance key.
pub const PREFIX: &str = "iiif_";

/// The resource `id` a node was imported from.
pub const IIIF_ID: &str = "iiif_id";
/// Container JSON without its `items` (Annotation JSON without its `body`).
pub const IIIF_JSON: &str = "iiif_json";
/// Full body JSON of a body node, including any SpecificResource wrapper.
pub const IIIF_BODY: &str = "iiif_body";
/// Asset URL of a Model body.
pub const IIIF_SOURCE_URL: &str = "iiif_source_url";
/// MIME type of a Model body.
pub const IIIF_FORMAT: &str = "iiif_format";
/// Editable Manifest `label` text.
pub const IIIF_LABEL: &str = "iiif_label";
/// Editable Manifest `summary` text.
pub const IIIF_SUMMARY: &str = "iiif_summary";

/// Store `value` as compact JSON under `key`.
pub fn store_json<H: SceneHost + ?Sized>(host: &mut H, node: NodeId, key: &str, value: &Value) {
    host.set_node_property(node, key, value.to_string());
}

/// Store a resource object and its id.
pub fn store_resource<H: SceneHost + ?Sized>(
    host: &mut H,
    node: NodeId,
    key: &str,
    resource: &JsonObject,
) {
    if let Some(id) = resource.get("id").and_then(Value::as_str) {
        host.set_node_property(node, IIIF_ID, id.to_string());
    }
    host.set_node_property(node, key, Value::Object(resource.clone()).to_string());
}

/// Load a stored JSON object. Unparsable or non-object values are treated
/// as absent and reported.
pub fn load_json<H: SceneHost + ?Sized>(
    host: &H,
    node: NodeId,
    key: &str,
    diags: &mut Diagnostics,
) -> Option<JsonObject> {
    let raw = host.node_property(node, key)?;
    let resource = stored_id(host, node);
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) => {
            diags.push(
                DiagnosticKind::UnsupportedShape,
                resource,
                format!("stored {key} is not a JSON object, ignored"),
            );
            None
        }
        Err(e) => {
            diags.push(
                DiagnosticKind::UnsupportedShape,
                resource,
                format!("stored {key} is not valid JSON ({e}), ignored"),
            );
            None
        }
    }
}

pub fn stored_id<H: SceneHost + ?Sized>(host: &H, node: NodeId) -> Option<&str> {
    host.node_property(node, IIIF_ID)
}

/// Keys of the provenance entries on a node.
pub fn provenance_keys<H: SceneHost + ?Sized>(host: &H, node: NodeId) -> Vec<String> {
    host.node_properties(node)
        .into_iter()
        .filter(|k| k.starts_with(PREFIX))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::SceneHost;
    use crate::id::NodeKind;
    use crate::scene_graph::SceneGraph;
    use serde_json::json;

    #[test]
    fn resource_round_trips_with_id() {
        let mut g = SceneGraph::new();
        let n = g.create_container_node(NodeKind::Scene, "s", None);
        let scene = json!({"id": "https://x/s", "type": "Scene", "custom": [1, 2]});
        store_resource(&mut g, n, IIIF_JSON, scene.as_object().unwrap());
        let mut diags = Diagnostics::new();
        let back = load_json(&g, n, IIIF_JSON, &mut diags).unwrap();
        assert_eq!(Value::Object(back), scene);
        assert_eq!(stored_id(&g, n), Some("https://x/s"));
        assert!(diags.is_empty());
        assert_eq!(provenance_keys(&g, n), vec![IIIF_ID, IIIF_JSON]);
    }

    #[test]
    fn malformed_json_is_absent_with_warning() {
        let mut g = SceneGraph::new();
        let n = g.create_container_node(NodeKind::Scene, "s", None);
        g.set_node_property(n, IIIF_JSON, "{not json".into());
        g.set_node_property(n, IIIF_BODY, "[1]".into());
        g.set_node_property(n, "user_note", "x".into());
        let mut diags = Diagnostics::new();
        assert!(load_json(&g, n, IIIF_JSON, &mut diags).is_none());
        assert!(load_json(&g, n, IIIF_BODY, &mut diags).is_none());
        assert!(load_json(&g, n, IIIF_SOURCE_URL, &mut diags).is_none());
        assert_eq!(diags.count(DiagnosticKind::UnsupportedShape), 2);
        assert_eq!(provenance_keys(&g, n), vec![IIIF_BODY, IIIF_JSON]);
    }
}
