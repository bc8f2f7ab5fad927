use std::path::PathBuf;

/// Errors raised while mapping between manifests and the scene graph.
///
/// Only [`IiifError::MalformedManifest`] (and the I/O / JSON variants that
/// produce it) aborts a whole import. Every other variant is recoverable:
/// the importer and exporter record it as a
/// [`Diagnostic`](crate::diagnostics::Diagnostic) and carry on with the
/// next entity.
#[derive(Debug, thiserror::Error)]
pub enum IiifError {
    /// The document is not a usable manifest (unparsable, wrong type, no Scenes).
    #[error("malformed manifest: {detail}")]
    MalformedManifest { detail: String },

    /// A property value has a JSON shape that cannot be read as a resource.
    #[error("unsupported resource shape: {detail}")]
    UnsupportedShape { detail: String },

    /// A well-formed construct the mapping deliberately does not support.
    #[error("unsupported feature: {detail}")]
    UnsupportedFeature { detail: String },

    /// A resource `type` the mapping does not handle.
    #[error("unknown resource type {type_tag:?}")]
    UnknownType { type_tag: Option<String> },

    /// A model asset could not be fetched or decoded.
    #[error("asset fetch failed for {url}: {detail}")]
    AssetFetch { url: String, detail: String },

    /// A node has no enclosing container of the expected type.
    #[error("navigation miss: {detail}")]
    NavigationMiss { detail: String },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A JSON (de)serialization error occurred.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl IiifError {
    pub(crate) fn shape(detail: impl Into<String>) -> Self {
        Self::UnsupportedShape {
            detail: detail.into(),
        }
    }

    pub(crate) fn feature(detail: impl Into<String>) -> Self {
        Self::UnsupportedFeature {
            detail: detail.into(),
        }
    }

    pub(crate) fn malformed(detail: impl Into<String>) -> Self {
        Self::MalformedManifest {
            detail: detail.into(),
        }
    }
}

/// Errors from the host's asset capabilities (`resolve_asset`, `import_geometry`).
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    /// The asset URL could not be resolved to a local file.
    #[error("cannot fetch {url}: {detail}")]
    Fetch { url: String, detail: String },

    /// The local file could not be decoded into geometry.
    #[error("cannot decode {path}: {detail}")]
    Decode { path: PathBuf, detail: String },

    /// The file has a format the geometry importer does not handle.
    #[error("unsupported geometry format: {path}")]
    UnsupportedFormat { path: PathBuf },
}

impl AssetError {
    /// Convert into the recoverable import error scoped to one Annotation.
    pub fn into_iiif(self, url: &str) -> IiifError {
        IiifError::AssetFetch {
            url: url.to_string(),
            detail: self.to_string(),
        }
    }
}
