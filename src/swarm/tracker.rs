use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use tracing::{debug, info};

use super::{AnnounceEvent, SwarmRegistry};
use crate::torrent::TorrentFile;

/// A tracker: knows the canonical metadata of every file it tracks
/// and which peers announced themselves for it.
#[derive(Debug)]
pub struct TorrentTracker {
    id: String,
    registry: SwarmRegistry,
    files: RwLock<HashMap<String, TorrentFile>>,
}

impl TorrentTracker {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            registry: SwarmRegistry::new(),
            files: RwLock::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Tracking a file again leaves its swarm untouched.
    pub fn track_file(&self, file: &TorrentFile) {
        let info_hash = file.info_hash();
        // files before registry, the other methods only take one of them
        let mut files = self.files.write();
        if self.registry.register(info_hash) {
            files.insert(info_hash.to_owned(), file.clone());
            info!(tracker = self.id, info_hash, file = file.file_name(), "tracking file");
        }
    }

    pub fn announce(&self, info_hash: &str, peer_id: &str, event: AnnounceEvent) {
        if self.registry.add_peer(info_hash, peer_id) {
            info!(tracker = self.id, info_hash, peer_id, %event, "peer joined swarm");
        } else {
            debug!(tracker = self.id, info_hash, peer_id, %event, "announce ignored");
        }
    }

    pub fn peers(&self, info_hash: &str) -> HashSet<String> {
        self.registry.peers(info_hash)
    }

    pub fn tracked_file(&self, info_hash: &str) -> Option<TorrentFile> {
        self.files.read().get(info_hash).cloned()
    }

    pub fn is_tracked(&self, info_hash: &str) -> bool {
        self.registry.is_registered(info_hash)
    }

    pub fn tracked_hashes(&self) -> Vec<String> {
        self.registry.hashes()
    }
}
