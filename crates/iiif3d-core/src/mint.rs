use std::collections::{HashMap, HashSet};

use crate::host::SceneHost;
use crate::navigation::all_nodes;
use crate::provenance::stored_id;

/// Base URI for ids minted when nothing else is configured.
pub const DEFAULT_ID_BASE: &str = "https://example.com/iiif3d";

/// Mints `{base}/{kind}/{n}` ids that do not collide with any id already
/// present in a forest or handed out before.
#[derive(Debug, Clone)]
pub struct IdMinter {
    base: String,
    used: HashSet<String>,
    counters: HashMap<String, u64>,
}

impl IdMinter {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            used: HashSet::new(),
            counters: HashMap::new(),
        }
    }

    /// A minter that avoids every stored id in `host`.
    pub fn from_host<H: SceneHost + ?Sized>(host: &H, base: &str) -> Self {
        let mut minter = Self::new(base);
        for node in all_nodes(host) {
            if let Some(id) = stored_id(host, node) {
                minter.reserve(id);
            }
        }
        minter
    }

    pub fn reserve(&mut self, id: &str) {
        self.used.insert(id.to_string());
    }

    pub fn mint(&mut self, kind: &str) -> String {
        let counter = self.counters.entry(kind.to_string()).or_insert(0);
        loop {
            *counter += 1;
            let candidate = format!("{}/{}/{}", self.base, kind, counter);
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

impl Default for IdMinter {
    fn default() -> Self {
        Self::new(DEFAULT_ID_BASE)
    }
}
