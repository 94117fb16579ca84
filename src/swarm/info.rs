use std::collections::HashSet;

use serde::Serialize;

/// Summary counters of one swarm.
///
/// The seeder/leecher counters move on every `add_peer`/`remove_peer` call,
/// whether or not the set of active peers changes. Adding the same peer twice
/// counts it twice, removing an unknown peer can push a counter below zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwarmInfo {
    info_hash: String,
    num_seeders: i64,
    num_leechers: i64,
    active_peers: HashSet<String>,
    total_transferred: u64,
}

impl SwarmInfo {
    pub fn new(info_hash: impl Into<String>) -> Self {
        Self {
            info_hash: info_hash.into(),
            num_seeders: 0,
            num_leechers: 0,
            active_peers: HashSet::new(),
            total_transferred: 0,
        }
    }

    pub fn add_peer(&mut self, peer_id: &str, is_seeder: bool) {
        self.active_peers.insert(peer_id.to_owned());
        if is_seeder {
            self.num_seeders += 1;
        } else {
            self.num_leechers += 1;
        }
    }

    pub fn remove_peer(&mut self, peer_id: &str, was_seeder: bool) {
        self.active_peers.remove(peer_id);
        if was_seeder {
            self.num_seeders -= 1;
        } else {
            self.num_leechers -= 1;
        }
    }

    pub fn update_transferred(&mut self, bytes: u64) {
        self.total_transferred = self.total_transferred.saturating_add(bytes);
    }

    pub fn info_hash(&self) -> &str {
        &self.info_hash
    }

    pub fn num_seeders(&self) -> i64 {
        self.num_seeders
    }

    pub fn num_leechers(&self) -> i64 {
        self.num_leechers
    }

    pub fn active_peers(&self) -> HashSet<String> {
        self.active_peers.clone()
    }

    pub fn total_transferred(&self) -> u64 {
        self.total_transferred
    }
}

#[cfg(test)]
mod test_swarm_info {
    use super::*;

    #[test]
    fn new_swarm_is_empty() {
        let swarm = SwarmInfo::new("hash123");
        assert_eq!(swarm.info_hash(), "hash123");
        assert_eq!(swarm.num_seeders(), 0);
        assert_eq!(swarm.num_leechers(), 0);
        assert!(swarm.active_peers().is_empty());
        assert_eq!(swarm.total_transferred(), 0);
    }

    #[test]
    fn seeders_and_leechers() {
        let mut swarm = SwarmInfo::new("hash123");
        swarm.add_peer("peer1", true);
        swarm.add_peer("peer2", false);
        assert_eq!(swarm.num_seeders(), 1);
        assert_eq!(swarm.num_leechers(), 1);
        assert_eq!(swarm.active_peers().len(), 2);

        swarm.remove_peer("peer1", true);
        swarm.remove_peer("peer2", false);
        assert_eq!(swarm.num_seeders(), 0);
        assert_eq!(swarm.num_leechers(), 0);
        assert!(swarm.active_peers().is_empty());
    }

    #[test]
    fn duplicate_add_counts_twice() {
        let mut swarm = SwarmInfo::new("hash123");
        swarm.add_peer("peer1", true);
        swarm.add_peer("peer1", true);
        assert_eq!(swarm.active_peers().len(), 1);
        assert_eq!(swarm.num_seeders(), 2);
    }

    #[test]
    fn unmatched_remove_goes_negative() {
        let mut swarm = SwarmInfo::new("hash123");
        swarm.remove_peer("ghost", false);
        assert_eq!(swarm.num_leechers(), -1);
        assert!(swarm.active_peers().is_empty());
    }

    #[test]
    fn transferred_accumulates() {
        let mut swarm = SwarmInfo::new("hash123");
        swarm.update_transferred(1_000);
        swarm.update_transferred(500);
        assert_eq!(swarm.total_transferred(), 1_500);
    }

    #[test]
    fn active_peers_is_a_copy() {
        let mut swarm = SwarmInfo::new("hash123");
        swarm.add_peer("peer1", false);
        swarm.active_peers().clear();
        assert_eq!(swarm.active_peers().len(), 1);
    }
}
