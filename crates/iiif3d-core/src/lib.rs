//! IIIF 3D Core -- bidirectional mapping between IIIF 3D manifests and a
//! host scene graph.
//!
//! A manifest is a JSON-LD tree (Manifest → Scene → AnnotationPage →
//! Annotation → body); a scene graph is a forest of tagged nodes with
//! transforms and string properties. Import walks the manifest and creates
//! nodes; export walks the nodes and rebuilds the manifest.
//!
//! # Axis conventions
//!
//! Manifests are +Y up, scenes are +Z up. [`coords`] holds every conversion
//! and its inverse: positions `(x, y, z) ↔ (x, -z, y)`, model rotations
//! through host Euler order `YZX`, camera rotations through `ZYX` with a
//! quarter-turn rest offset.
//!
//! # Round trips
//!
//! ```rust,ignore
//! let mut graph = SceneGraph::with_assets(Box::new(assets));
//! let report = importer::import_str(&mut graph, &text, &ImportOptions::default())?;
//! // ... user edits node transforms ...
//! let (manifest, _) = exporter::export_first_manifest(&graph, &ExportOptions::default())?;
//! ```
//!
//! Everything the scene graph does not model (labels, rights, custom fields)
//! is carried through as provenance JSON on the nodes ([`provenance`]), so an
//! unedited round trip reproduces the input.
//!
//! # Key Types
//!
//! - [`host::SceneHost`] -- Capabilities required from the scene owner.
//! - [`scene_graph::SceneGraph`] -- In-memory `SceneHost` backed by a slotmap.
//! - [`resource`] -- Typed views over Manifest, Scene, Annotation, Body and
//!   Transform JSON.
//! - [`diagnostics::Diagnostics`] -- Recoverable problems collected per run.
//! - [`error::IiifError`] -- Errors; only `MalformedManifest` aborts an import.

pub mod bounds;
pub mod color;
pub mod coords;
pub mod diagnostics;
pub mod error;
pub mod exporter;
pub mod host;
pub mod id;
pub mod importer;
pub mod mint;
pub mod navigation;
pub mod normalize;
pub mod provenance;
pub mod resource;
pub mod scaffold;
pub mod scene_graph;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use error::{AssetError, IiifError};
pub use exporter::{ExportOptions, ExportReport};
pub use host::{AssetSource, BodySettings, MeshInfo, NodeTransform, SceneHost};
pub use id::{NodeId, NodeKind};
pub use importer::{ImportOptions, ImportReport};
pub use scene_graph::{AssetTable, SceneGraph};
