use std::collections::HashSet;

use tracing::info;

use super::SwarmRegistry;
use crate::torrent::TorrentFile;

/// Server side bookkeeping of who is active on the files it hosts.
/// Same membership rules as the tracker, without keeping the metadata.
#[derive(Debug)]
pub struct TorrentServer {
    id: String,
    registry: SwarmRegistry,
}

impl TorrentServer {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            registry: SwarmRegistry::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn host_file(&self, file: &TorrentFile) {
        if self.registry.register(file.info_hash()) {
            info!(server = self.id, info_hash = file.info_hash(), "hosting file");
        }
    }

    pub fn register_peer(&self, info_hash: &str, peer_id: &str) {
        if self.registry.add_peer(info_hash, peer_id) {
            info!(server = self.id, info_hash, peer_id, "registered peer");
        }
    }

    pub fn active_peers(&self, info_hash: &str) -> HashSet<String> {
        self.registry.peers(info_hash)
    }

    pub fn is_hosted(&self, info_hash: &str) -> bool {
        self.registry.is_registered(info_hash)
    }
}
