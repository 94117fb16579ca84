use std::{
    collections::{HashMap, HashSet},
    fmt,
};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

mod info;
mod server;
mod tracker;

pub use info::SwarmInfo;
pub use server::TorrentServer;
pub use tracker::TorrentTracker;

/// The event a peer attaches to an announce.
/// Only logged: every event adds the peer to the swarm.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnounceEvent {
    Started,
    Completed,
    Stopped,
    #[default]
    Empty,
}

impl fmt::Display for AnnounceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AnnounceEvent::Started => "started",
            AnnounceEvent::Completed => "completed",
            AnnounceEvent::Stopped => "stopped",
            AnnounceEvent::Empty => "empty",
        };
        f.write_str(s)
    }
}

/// Which peers take part in which file.
///
/// A file has to be registered before peers can join it; joining an unknown
/// file does nothing. Entries are never removed and everything handed out is a copy.
#[derive(Debug, Default)]
pub struct SwarmRegistry {
    swarms: RwLock<HashMap<String, HashSet<String>>>,
}

impl SwarmRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// returns true if the hash wasn't registered before
    pub fn register(&self, info_hash: &str) -> bool {
        if info_hash.is_empty() {
            return false;
        }
        let mut swarms = self.swarms.write();
        if swarms.contains_key(info_hash) {
            return false;
        }
        swarms.insert(info_hash.to_owned(), HashSet::new());
        true
    }

    /// returns true if the peer is new to a registered swarm
    pub fn add_peer(&self, info_hash: &str, peer_id: &str) -> bool {
        if peer_id.is_empty() {
            return false;
        }
        self.swarms
            .write()
            .get_mut(info_hash)
            .is_some_and(|peers| peers.insert(peer_id.to_owned()))
    }

    pub fn peers(&self, info_hash: &str) -> HashSet<String> {
        self.swarms
            .read()
            .get(info_hash)
            .cloned()
            .unwrap_or_default()
    }

    pub fn is_registered(&self, info_hash: &str) -> bool {
        self.swarms.read().contains_key(info_hash)
    }

    pub fn hashes(&self) -> Vec<String> {
        self.swarms.read().keys().cloned().collect()
    }
}

#[cfg(test)]
mod test_registry {
    use super::*;

    #[test]
    fn unknown_hash_stays_empty() {
        let registry = SwarmRegistry::new();
        assert!(!registry.add_peer("hash123", "PEER1"));
        assert!(registry.peers("hash123").is_empty());
        assert!(!registry.is_registered("hash123"));
    }

    #[test]
    fn register_twice_keeps_peers() {
        let registry = SwarmRegistry::new();
        assert!(registry.register("hash123"));
        assert!(registry.add_peer("hash123", "PEER1"));
        assert!(!registry.register("hash123"));
        assert_eq!(registry.peers("hash123").len(), 1);
    }

    #[test]
    fn duplicates_collapse() {
        let registry = SwarmRegistry::new();
        registry.register("hash123");
        assert!(registry.add_peer("hash123", "PEER1"));
        assert!(!registry.add_peer("hash123", "PEER1"));
        assert!(!registry.add_peer("hash123", ""));
        assert_eq!(registry.peers("hash123").len(), 1);
    }

    #[test]
    fn empty_hash_is_ignored() {
        let registry = SwarmRegistry::new();
        assert!(!registry.register(""));
        assert!(registry.hashes().is_empty());
    }

    #[test]
    fn peers_is_a_copy() {
        let registry = SwarmRegistry::new();
        registry.register("hash123");
        registry.add_peer("hash123", "PEER1");
        let mut peers = registry.peers("hash123");
        peers.insert("INTRUDER".to_owned());
        peers.remove("PEER1");
        assert_eq!(
            registry.peers("hash123"),
            HashSet::from(["PEER1".to_owned()])
        );
    }

    #[test]
    fn event_names() {
        assert_eq!(AnnounceEvent::Started.to_string(), "started");
        assert_eq!(AnnounceEvent::default(), AnnounceEvent::Empty);
        assert_eq!(
            serde_json::to_string(&AnnounceEvent::Completed).unwrap(),
            "\"completed\""
        );
    }

    #[test]
    fn concurrent_announces() {
        let registry = std::sync::Arc::new(SwarmRegistry::new());
        registry.register("hash123");
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        registry.add_peer("hash123", &format!("PEER{}", (t * 50 + i) % 100));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.peers("hash123").len(), 100);
    }
}
