//! Recoverable problems collected during one import or export traversal.

use std::fmt;

use crate::error::IiifError;

/// Category of a recoverable problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// A property could not be read as a resource; the entity was skipped.
    UnsupportedShape,
    /// A construct the mapping does not support; a default was applied.
    UnsupportedFeature,
    /// A model asset could not be fetched or decoded; the Annotation was skipped.
    AssetFetchFailure,
    /// No enclosing container (or referenced node) could be located.
    NavigationMiss,
    /// A resource `type` the importer does not handle; the item was skipped.
    UnknownType,
    /// A list-valued property was coerced to its first element.
    ListCoerced,
    /// A camera had neither `lookAt` nor a RotateTransform.
    DefaultOrientation,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::UnsupportedShape => "unsupported-shape",
            DiagnosticKind::UnsupportedFeature => "unsupported-feature",
            DiagnosticKind::AssetFetchFailure => "asset-fetch-failure",
            DiagnosticKind::NavigationMiss => "navigation-miss",
            DiagnosticKind::UnknownType => "unknown-type",
            DiagnosticKind::ListCoerced => "list-coerced",
            DiagnosticKind::DefaultOrientation => "default-orientation",
        }
    }
}

/// One recorded problem, tied to the resource id it concerns when known.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub resource: Option<String>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.resource {
            Some(id) => write!(f, "[{}] {}: {}", self.kind.as_str(), id, self.message),
            None => write!(f, "[{}] {}", self.kind.as_str(), self.message),
        }
    }
}

/// Sink for diagnostics. Every pushed entry is also logged at `warn` level.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &mut self,
        kind: DiagnosticKind,
        resource: Option<&str>,
        message: impl Into<String>,
    ) {
        let diagnostic = Diagnostic {
            kind,
            resource: resource.map(str::to_string),
            message: message.into(),
        };
        log::warn!("{diagnostic}");
        self.entries.push(diagnostic);
    }

    /// Record a recoverable [`IiifError`] under its matching kind.
    pub fn push_error(&mut self, resource: Option<&str>, error: &IiifError) {
        let kind = match error {
            IiifError::UnsupportedFeature { .. } => DiagnosticKind::UnsupportedFeature,
            IiifError::AssetFetch { .. } => DiagnosticKind::AssetFetchFailure,
            IiifError::NavigationMiss { .. } => DiagnosticKind::NavigationMiss,
            IiifError::UnknownType { .. } => DiagnosticKind::UnknownType,
            _ => DiagnosticKind::UnsupportedShape,
        };
        self.push(kind, resource, error.to_string());
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<Diagnostic> {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether any entry of `kind` has been recorded.
    pub fn has(&self, kind: DiagnosticKind) -> bool {
        self.entries.iter().any(|d| d.kind == kind)
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_error_maps_kind() {
        let mut diags = Diagnostics::new();
        diags.push_error(Some("a"), &IiifError::feature("non-uniform scale"));
        diags.push_error(
            None,
            &IiifError::AssetFetch {
                url: "https://x/m.glb".into(),
                detail: "404".into(),
            },
        );
        assert!(diags.has(DiagnosticKind::UnsupportedFeature));
        assert!(diags.has(DiagnosticKind::AssetFetchFailure));
        assert_eq!(diags.len(), 2);
        assert_eq!(diags.entries()[0].resource.as_deref(), Some("a"));
    }

    #[test]
    fn display_includes_kind_and_resource() {
        let d = Diagnostic {
            kind: DiagnosticKind::UnknownType,
            resource: Some("https://x/anno/1".into()),
            message: "skipped Canvas".into(),
        };
        assert_eq!(
            d.to_string(),
            "[unknown-type] https://x/anno/1: skipped Canvas"
        );
    }
}
