//! `iiif3d` -- import, edit and export IIIF 3D manifests from the shell.
//!
//! The scene graph lives in a JSON file (`--scene`) between invocations, so a
//! session looks like:
//!
//! ```text
//! iiif3d import manifest.json
//! iiif3d add-model https://museum.org/models/chair.glb
//! iiif3d export out.json
//! ```

mod assets;
mod config;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use iiif3d_core::exporter::{export_manifest, write_manifest};
use iiif3d_core::importer::import_str;
use iiif3d_core::navigation::{descendants, roots_of_type};
use iiif3d_core::scaffold::{add_model, new_manifest};
use iiif3d_core::{Diagnostic, IiifError, NodeId, NodeKind, SceneGraph, SceneHost};
use log::LevelFilter;

use crate::assets::FsAssets;
use crate::config::{Config, ConfigError};

#[derive(Parser)]
#[command(
    name = "iiif3d",
    version,
    about = "Map IIIF 3D manifests to and from an editable scene graph"
)]
struct Cli {
    /// Config file (.toml, .ron or .json). Defaults to ./iiif3d.toml when present.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Scene graph file shared between invocations.
    #[arg(long, global = true, value_name = "SCENE.json", default_value = "iiif3d-scene.json")]
    scene: PathBuf,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a manifest as a new root of the scene graph.
    Import {
        #[arg(value_name = "MANIFEST")]
        manifest: PathBuf,
        /// Name for the Manifest node instead of the manifest label.
        #[arg(long)]
        name: Option<String>,
    },
    /// Export one Manifest subtree to a JSON file.
    Export {
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
        /// Manifest node name; defaults to the first Manifest.
        #[arg(long)]
        manifest: Option<String>,
    },
    /// Create an empty Manifest, Scene and AnnotationPage.
    New {
        #[arg(long)]
        label: Option<String>,
    },
    /// Add a glTF model to the first AnnotationPage of a Manifest.
    AddModel {
        #[arg(value_name = "URL")]
        url: String,
        #[arg(long)]
        manifest: Option<String>,
    },
    /// Print the scene graph as an indented tree.
    Tree,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Iiif(#[from] IiifError),

    #[error("cannot read scene {path}: {detail}")]
    State { path: PathBuf, detail: String },

    #[error("no Manifest named {0:?} in the scene graph")]
    NoManifest(Option<String>),

    #[error("Manifest {0:?} has no AnnotationPage or Scene to add to")]
    NoPage(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn init_logging(verbose: bool) {
    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    });
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(cli) {
        log::error!("{err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = Config::load(cli.config.as_deref())?;
    let mut graph = load_state(&cli.scene)?;

    match cli.command {
        Commands::Import { manifest, name } => {
            let base = manifest.parent().unwrap_or(Path::new(".")).to_path_buf();
            graph.set_assets(Box::new(FsAssets::new(base, &config.asset_dir)));
            let text = std::fs::read_to_string(&manifest)?;
            let report = import_str(&mut graph, &text, &config.import_options(name))?;
            println!(
                "imported {} scene(s), {} bodies from {}",
                report.scenes.len(),
                report.bodies.len(),
                manifest.display()
            );
            print_diagnostics(&report.diagnostics);
            save_state(&cli.scene, &graph)?;
        }
        Commands::Export { output, manifest } => {
            let root = find_manifest(&graph, manifest.as_deref())?;
            let (value, report) = export_manifest(&graph, root, &config.export_options())?;
            write_manifest(&output, &value)?;
            println!(
                "exported {} annotation(s) to {}",
                report.annotations,
                output.display()
            );
            print_diagnostics(&report.diagnostics);
        }
        Commands::New { label } => {
            let scaffold = new_manifest(&mut graph, &config.scaffold_options(label));
            println!(
                "created {}",
                graph.node_name(scaffold.manifest).unwrap_or_default()
            );
            save_state(&cli.scene, &graph)?;
        }
        Commands::AddModel { url, manifest } => {
            graph.set_assets(Box::new(FsAssets::new(".", &config.asset_dir)));
            let root = find_manifest(&graph, manifest.as_deref())?;
            let parent = drop_target(&graph, root)?;
            let body = add_model(&mut graph, parent, &url, &config.scaffold_options(None))?;
            println!("added {}", graph.node_name(body).unwrap_or_default());
            save_state(&cli.scene, &graph)?;
        }
        Commands::Tree => print!("{}", render_tree(&graph)),
    }
    Ok(())
}

// ===========================================================================
// State
// ===========================================================================

fn load_state(path: &Path) -> Result<SceneGraph, CliError> {
    if !path.exists() {
        log::debug!("no scene at {}, starting empty", path.display());
        return Ok(SceneGraph::new());
    }
    let text = std::fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|e| CliError::State {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}

fn save_state(path: &Path, graph: &SceneGraph) -> Result<(), CliError> {
    let text = serde_json::to_string(graph).map_err(IiifError::from)?;
    std::fs::write(path, text)?;
    log::debug!("saved {} nodes to {}", graph.len(), path.display());
    Ok(())
}

// ===========================================================================
// Lookup
// ===========================================================================

fn find_manifest(graph: &SceneGraph, name: Option<&str>) -> Result<NodeId, CliError> {
    roots_of_type(graph, NodeKind::Manifest)
        .into_iter()
        .find(|root| name.is_none() || graph.node_name(*root) == name)
        .ok_or_else(|| CliError::NoManifest(name.map(str::to_string)))
}

/// First AnnotationPage below `manifest`, else its first Scene.
fn drop_target(graph: &SceneGraph, manifest: NodeId) -> Result<NodeId, CliError> {
    let below = descendants(graph, &[manifest]);
    [NodeKind::AnnotationPage, NodeKind::Scene]
        .into_iter()
        .find_map(|kind| {
            below
                .iter()
                .copied()
                .find(|n| graph.node_kind(*n) == Some(kind))
        })
        .ok_or_else(|| {
            CliError::NoPage(graph.node_name(manifest).unwrap_or_default().to_string())
        })
}

// ===========================================================================
// Output
// ===========================================================================

fn print_diagnostics(diagnostics: &[Diagnostic]) {
    if diagnostics.is_empty() {
        return;
    }
    let mut by_kind: BTreeMap<&str, usize> = BTreeMap::new();
    for d in diagnostics {
        *by_kind.entry(d.kind.as_str()).or_default() += 1;
    }
    let summary: Vec<String> = by_kind
        .iter()
        .map(|(kind, n)| format!("{n} {kind}"))
        .collect();
    println!("{} diagnostic(s): {}", diagnostics.len(), summary.join(", "));
    for d in diagnostics {
        println!("  {d}");
    }
}

fn render_tree(graph: &SceneGraph) -> String {
    fn visit(graph: &SceneGraph, node: NodeId, depth: usize, out: &mut String) {
        let kind = graph.node_kind(node).map_or("mesh", |k| k.as_str());
        let name = graph.node_name(node).unwrap_or_default();
        let position = graph
            .node_transform(node)
            .map(|t| t.position)
            .unwrap_or_default();
        out.push_str(&format!(
            "{:indent$}{name} [{kind}] at ({:.3}, {:.3}, {:.3})\n",
            "",
            position.x,
            position.y,
            position.z,
            indent = depth * 2
        ));
        for child in graph.children(node) {
            visit(graph, child, depth + 1, out);
        }
    }

    let mut out = String::new();
    for root in graph.roots() {
        visit(graph, root, 0, &mut out);
    }
    out
}
