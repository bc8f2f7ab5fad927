//! Filesystem asset source with glTF bounds extraction.

use std::path::{Path, PathBuf};

use glam::{DMat4, DVec3};
use iiif3d_core::bounds::Aabb;
use iiif3d_core::coords::position_to_scene;
use iiif3d_core::{AssetError, AssetSource, MeshInfo};

/// Resolves model URLs to local files.
///
/// - `file://` URLs and plain paths resolve against `base_dir`.
/// - `http(s)://` URLs resolve to `asset_dir/{file name}`; nothing is
///   downloaded.
#[derive(Debug, Clone)]
pub struct FsAssets {
    base_dir: PathBuf,
    asset_dir: PathBuf,
}

impl FsAssets {
    pub fn new(base_dir: impl Into<PathBuf>, asset_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            asset_dir: asset_dir.into(),
        }
    }

    fn existing(&self, url: &str, path: PathBuf) -> Result<PathBuf, AssetError> {
        if path.is_file() {
            Ok(path)
        } else {
            Err(AssetError::Fetch {
                url: url.to_string(),
                detail: format!("{} does not exist", path.display()),
            })
        }
    }
}

/// Last path segment of a URL, without query or fragment.
fn url_file_name(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next()?;
    path.rsplit('/').next().filter(|name| !name.is_empty())
}

impl AssetSource for FsAssets {
    fn resolve_asset(&self, url: &str) -> Result<PathBuf, AssetError> {
        if url.starts_with("http://") || url.starts_with("https://") {
            let name = url_file_name(url).ok_or_else(|| AssetError::Fetch {
                url: url.to_string(),
                detail: "URL has no file name".into(),
            })?;
            return self.existing(url, self.asset_dir.join(name));
        }
        let local = url.strip_prefix("file://").unwrap_or(url);
        self.existing(url, self.base_dir.join(local))
    }

    fn load_geometry(
        &self,
        path: &Path,
        format_hint: Option<&str>,
    ) -> Result<Vec<MeshInfo>, AssetError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let is_gltf = matches!(ext.as_deref(), Some("glb" | "gltf"))
            || matches!(format_hint, Some("model/gltf-binary" | "model/gltf+json"));
        if !is_gltf {
            return Err(AssetError::UnsupportedFormat {
                path: path.to_path_buf(),
            });
        }
        load_gltf(path)
    }
}

// ===========================================================================
// glTF
// ===========================================================================

fn load_gltf(path: &Path) -> Result<Vec<MeshInfo>, AssetError> {
    let gltf = gltf::Gltf::open(path).map_err(|e| AssetError::Decode {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    let Some(scene) = gltf.default_scene().or_else(|| gltf.scenes().next()) else {
        return Err(AssetError::Decode {
            path: path.to_path_buf(),
            detail: "no scenes".into(),
        });
    };
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("model");

    let meshes: Vec<MeshInfo> = scene
        .nodes()
        .enumerate()
        .map(|(i, node)| MeshInfo {
            name: node
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("{stem}.{i}")),
            // glTF is +Y up like the manifest.
            bounds: node_bounds(&node, DMat4::IDENTITY).map(|b| b.map_axes(position_to_scene)),
        })
        .collect();
    log::debug!("{} root nodes in {}", meshes.len(), path.display());
    Ok(meshes)
}

/// Bounds of a node's meshes and its descendants, in the frame of `parent`.
fn node_bounds(node: &gltf::Node, parent: DMat4) -> Option<Aabb> {
    let local = node.transform().matrix().map(|col| col.map(f64::from));
    let world = parent * DMat4::from_cols_array_2d(&local);

    let own = node.mesh().into_iter().flat_map(|mesh| {
        mesh.primitives()
            .map(|p| {
                let b = p.bounding_box();
                Aabb::new(
                    DVec3::from(b.min.map(f64::from)),
                    DVec3::from(b.max.map(f64::from)),
                )
            })
            .collect::<Vec<_>>()
    });
    let children = node.children().filter_map(|child| node_bounds(&child, world));

    own.map(|b| b.transform(&world))
        .chain(children)
        .reduce(|acc, b| acc.union(&b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn make_test_dir(suffix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "iiif3d_assets_test_{suffix}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// A box from (-1,-1,-1) to (1,1,1), raised 2 units along glTF +Y.
    const BOX_GLTF: &str = r#"{
        "asset": {"version": "2.0"},
        "scene": 0,
        "scenes": [{"nodes": [0]}],
        "nodes": [{"name": "Box", "mesh": 0, "translation": [0.0, 2.0, 0.0]}],
        "meshes": [{"primitives": [{"attributes": {"POSITION": 0}}]}],
        "accessors": [{
            "componentType": 5126,
            "count": 8,
            "type": "VEC3",
            "min": [-1.0, -1.0, -1.0],
            "max": [1.0, 1.0, 1.0]
        }]
    }"#;

    #[test]
    fn http_urls_resolve_into_the_asset_dir() {
        let dir = make_test_dir("http");
        fs::write(dir.join("chair.glb"), b"glTF").unwrap();
        let assets = FsAssets::new("/nowhere", &dir);

        let path = assets
            .resolve_asset("https://museum.org/models/chair.glb?v=2")
            .unwrap();
        assert_eq!(path, dir.join("chair.glb"));
        assert!(matches!(
            assets.resolve_asset("https://museum.org/models/table.glb"),
            Err(AssetError::Fetch { .. })
        ));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn file_urls_and_paths_resolve_against_base_dir() {
        let dir = make_test_dir("file");
        fs::write(dir.join("a.gltf"), BOX_GLTF).unwrap();
        let assets = FsAssets::new(&dir, "/nowhere");

        assert_eq!(assets.resolve_asset("a.gltf").unwrap(), dir.join("a.gltf"));
        let absolute = format!("file://{}", dir.join("a.gltf").display());
        assert_eq!(assets.resolve_asset(&absolute).unwrap(), dir.join("a.gltf"));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn gltf_root_nodes_become_meshes_with_scene_bounds() {
        let dir = make_test_dir("gltf");
        let path = dir.join("box.gltf");
        fs::write(&path, BOX_GLTF).unwrap();
        let assets = FsAssets::new(&dir, &dir);

        let meshes = assets.load_geometry(&path, None).unwrap();
        assert_eq!(meshes.len(), 1);
        assert_eq!(meshes[0].name, "Box");
        let bounds = meshes[0].bounds.unwrap();
        // glTF +Y maps to scene +Z.
        assert!((bounds.min - DVec3::new(-1.0, -1.0, 1.0)).abs().max_element() < 1e-6);
        assert!((bounds.max - DVec3::new(1.0, 1.0, 3.0)).abs().max_element() < 1e-6);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn other_formats_are_rejected() {
        let assets = FsAssets::new(".", ".");
        assert!(matches!(
            assets.load_geometry(Path::new("m.obj"), None),
            Err(AssetError::UnsupportedFormat { .. })
        ));
        assert_eq!(url_file_name("https://x/a/b.glb#frag"), Some("b.glb"));
        assert_eq!(url_file_name("https://x/a/"), None);
    }
}
