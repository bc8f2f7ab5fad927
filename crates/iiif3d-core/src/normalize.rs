//! JSON-LD shape normalization.
//!
//! IIIF allows a property that is inherently one resource to be written as
//! a list of one, a property that is inherently a list to be written as a
//! single resource, and a resource to be written as a bare URI string. All
//! shape checks of that kind live here; the rest of the crate only sees
//! canonical shapes.

use glam::DVec3;
use serde_json::{Map, Value};

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::IiifError;

pub type JsonObject = Map<String, Value>;

// ---------------------------------------------------------------------------
// Singleton / list / object coercion
// ---------------------------------------------------------------------------

/// Result of coercing a value to a singleton, with the number of list
/// entries that were dropped on the way.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coerced<'a> {
    pub value: Option<&'a Value>,
    pub ignored: usize,
}

/// Coerce without logging. `ignored` is `N - 1` for an `N`-element list.
pub fn coerce_singleton(value: Option<&Value>) -> Coerced<'_> {
    match value {
        None | Some(Value::Null) => Coerced {
            value: None,
            ignored: 0,
        },
        Some(Value::Array(items)) => Coerced {
            value: items.first(),
            ignored: items.len().saturating_sub(1),
        },
        Some(other) => Coerced {
            value: Some(other),
            ignored: 0,
        },
    }
}

/// Read a property expected to hold a single resource.
///
/// Null and the empty list yield `None`; a list yields its first element
/// (with a warning when further elements are ignored); anything else is
/// returned unchanged.
pub fn as_singleton(value: Option<&Value>) -> Option<&Value> {
    let coerced = coerce_singleton(value);
    if coerced.ignored > 0 {
        log::warn!(
            "list coerced to singleton, {} ignored",
            coerced.ignored
        );
    }
    coerced.value
}

/// [`as_singleton`] that records dropped list entries as a
/// [`DiagnosticKind::ListCoerced`] diagnostic against `at`.
pub fn as_singleton_reported<'a>(
    value: Option<&'a Value>,
    what: &str,
    diags: &mut Diagnostics,
    at: Option<&str>,
) -> Option<&'a Value> {
    let coerced = coerce_singleton(value);
    if coerced.ignored > 0 {
        diags.push(
            DiagnosticKind::ListCoerced,
            at,
            format!("{what} list coerced to singleton, {} ignored", coerced.ignored),
        );
    }
    coerced.value
}

/// Read a property expected to hold a (possibly empty) list of resources.
pub fn as_list(value: Option<&Value>) -> Vec<&Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(other) => vec![other],
    }
}

/// Read a resource that may be written as a bare URI.
///
/// Objects pass through; a string becomes `{"id": s}` plus `"type"` when a
/// default type is supplied. Any other shape is [`IiifError::UnsupportedShape`].
pub fn as_object(
    value: Option<&Value>,
    default_type: Option<&str>,
) -> Result<Option<JsonObject>, IiifError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map.clone())),
        Some(Value::String(uri)) => {
            let mut map = JsonObject::new();
            map.insert("id".into(), Value::String(uri.clone()));
            if let Some(kind) = default_type {
                map.insert("type".into(), Value::String(kind.to_string()));
            }
            Ok(Some(map))
        }
        Some(other) => Err(IiifError::shape(format!(
            "cannot interpret {other} as a resource"
        ))),
    }
}

/// `as_object(as_singleton(value))`, reporting how many list entries were dropped.
pub fn singleton_object(
    value: Option<&Value>,
    default_type: Option<&str>,
) -> Result<(Option<JsonObject>, usize), IiifError> {
    let coerced = coerce_singleton(value);
    let object = as_object(coerced.value, default_type)?;
    Ok((object, coerced.ignored))
}

// ---------------------------------------------------------------------------
// Field access
// ---------------------------------------------------------------------------

/// The `type` tag of a resource object.
pub fn type_of(obj: &JsonObject) -> Option<&str> {
    obj.get("type").and_then(Value::as_str)
}

/// The `id` of a resource object.
pub fn id_of(obj: &JsonObject) -> Option<&str> {
    obj.get("id").and_then(Value::as_str)
}

/// Read `x`, `y`, `z` from an object; absent components default to `0.0`.
///
/// Numeric strings are accepted. A component that parses to NaN or an
/// infinity is reported as [`DiagnosticKind::UnsupportedShape`] and read as
/// `0.0`. Any other non-numeric component is an [`IiifError::UnsupportedShape`].
pub fn axis_values(
    obj: &JsonObject,
    diags: &mut Diagnostics,
    at: Option<&str>,
) -> Result<DVec3, IiifError> {
    let mut axis = |name: &str| -> Result<f64, IiifError> {
        let v = match obj.get(name) {
            None | Some(Value::Null) => return Ok(0.0),
            Some(Value::Number(n)) => n
                .as_f64()
                .ok_or_else(|| IiifError::shape(format!("axis {name} is not a finite number")))?,
            Some(Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| IiifError::shape(format!("axis {name} is not numeric: {s:?}")))?,
            Some(other) => {
                return Err(IiifError::shape(format!(
                    "axis {name} is not numeric: {other}"
                )));
            }
        };
        if v.is_finite() {
            return Ok(v);
        }
        diags.push(
            DiagnosticKind::UnsupportedShape,
            at,
            format!("axis {name} is not finite ({v}), read as 0"),
        );
        Ok(0.0)
    };
    Ok(DVec3::new(axis("x")?, axis("y")?, axis("z")?))
}

/// Build `{"type": kind, "x": .., "y": .., "z": ..}`.
pub fn axis_object(kind: &str, v: DVec3) -> Value {
    let mut map = JsonObject::new();
    map.insert("type".into(), Value::String(kind.to_string()));
    map.insert("x".into(), number(v.x));
    map.insert("y".into(), number(v.y));
    map.insert("z".into(), number(v.z));
    Value::Object(map)
}

/// A JSON number; non-finite values (never produced by the conversions) become `0`.
pub fn number(v: f64) -> Value {
    serde_json::Number::from_f64(v)
        .map(Value::Number)
        .unwrap_or_else(|| Value::from(0))
}

/// Unwrap one level of `SpecificResource`: returns the `source` resource
/// when `obj` is a SpecificResource, otherwise `obj` itself.
pub fn source_resource(obj: &JsonObject, default_type: Option<&str>) -> Result<JsonObject, IiifError> {
    if type_of(obj) != Some("SpecificResource") {
        return Ok(obj.clone());
    }
    let (source, ignored) = singleton_object(obj.get("source"), default_type)?;
    if ignored > 0 {
        log::warn!("SpecificResource source list coerced to singleton, {ignored} ignored");
    }
    source.ok_or_else(|| IiifError::shape("SpecificResource without a source"))
}

/// Human-facing name of a resource: the first `en` label, else `none`, else
/// the first label in any language, else the id.
pub fn display_label(obj: &JsonObject) -> Option<String> {
    language_text(obj.get("label")).or_else(|| id_of(obj).map(str::to_string))
}

/// Text of a language map such as `label` or `summary`: `en`, else `none`,
/// else the first language. Plain strings are returned as-is.
pub fn language_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Object(langs) => ["en", "none"]
            .iter()
            .filter_map(|lang| langs.get(*lang))
            .chain(langs.values())
            .find_map(|v| as_singleton(Some(v)).and_then(Value::as_str))
            .map(str::to_string),
        _ => None,
    }
}

/// `{lang: [text]}`, using the first language of `previous` when it is a
/// language map, else `en`.
pub fn language_map(text: &str, previous: Option<&Value>) -> Value {
    let lang = match previous {
        Some(Value::Object(langs)) => langs.keys().next().map_or("en", String::as_str),
        _ => "en",
    };
    let mut map = JsonObject::new();
    map.insert(lang.to_string(), Value::Array(vec![Value::String(text.to_string())]));
    Value::Object(map)
}
