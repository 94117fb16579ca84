use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Who a peer is and whether it can currently take part in a transfer.
pub trait DeviceIdentity {
    /// stable and unique per device
    fn id(&self) -> &str;
    fn is_online(&self) -> bool;
}

pub trait StorageOwner {
    fn has_storage_space(&self, required_bytes: u64) -> bool;
}

/// The smallest device that can host a torrent client.
/// Online state and used storage can be changed through a shared reference,
/// so one `Computer` can sit behind an `Arc` while the simulation toggles it.
#[derive(Debug)]
pub struct Computer {
    id: String,
    online: AtomicBool,
    storage_capacity: u64,
    used_storage: AtomicU64,
}

impl Computer {
    pub fn new(id: impl Into<String>, storage_capacity: u64) -> Self {
        Self {
            id: id.into(),
            online: AtomicBool::new(true),
            storage_capacity,
            used_storage: AtomicU64::new(0),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Relaxed);
    }

    pub fn storage_capacity(&self) -> u64 {
        self.storage_capacity
    }

    pub fn used_storage(&self) -> u64 {
        self.used_storage.load(Ordering::Relaxed)
    }

    /// clamps to the capacity
    pub fn set_used_storage(&self, used: u64) {
        self.used_storage
            .store(used.min(self.storage_capacity), Ordering::Relaxed);
    }
}

impl DeviceIdentity for Computer {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_online(&self) -> bool {
        self.online.load(Ordering::Relaxed)
    }
}

impl StorageOwner for Computer {
    fn has_storage_space(&self, required_bytes: u64) -> bool {
        self.used_storage()
            .checked_add(required_bytes)
            .is_some_and(|total| total <= self.storage_capacity)
    }
}
