use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::{
    device::{Computer, DeviceIdentity, StorageOwner},
    torrent::TorrentFile,
};

mod clock;
mod peer_status;
mod policy;

pub use clock::{Clock, ManualClock, SystemClock};
pub use peer_status::PeerTransferStats;
pub use policy::{AlwaysSucceed, RandomSuccess, TransferPolicy};

/// What a downloading client needs from the peer it requests a piece from.
pub trait PieceSource: Send + Sync {
    fn peer_id(&self) -> &str;
    fn is_online(&self) -> bool;
    fn has_file(&self, info_hash: &str) -> bool;
    fn has_piece(&self, info_hash: &str, index: u32) -> bool;
    /// called on the remote after it served us, `peer_id` is the requester
    fn record_transfer(&self, peer_id: &str, uploaded: u64, downloaded: u64);
}

/// One peer of the swarm: its own copies of the files it downloads
/// and the transfer rates to everybody it exchanged pieces with.
///
/// All state lives behind a single lock. When a request needs both the local
/// and the remote lock, the lock of the lower peer id is taken first.
pub struct TorrentClient<D = Computer> {
    device: Arc<D>,
    state: Mutex<ClientState>,
    clock: Arc<dyn Clock>,
    policy: Arc<dyn TransferPolicy>,
}

#[derive(Default)]
struct ClientState {
    downloading: HashMap<String, TorrentFile>,
    peer_stats: HashMap<String, PeerTransferStats>,
}

/// what we learned about the remote before deciding on a transfer
struct RemoteView {
    has_file: bool,
    has_piece: bool,
    online: bool,
}

impl<D> TorrentClient<D>
where
    D: DeviceIdentity + StorageOwner + Send + Sync,
{
    /// Uses the system clock and lets every transfer succeed.
    ///
    /// Stats for a peer start on its first transfer and are updated right away,
    /// so the first rate is measured over the gap between two clock readings.
    /// With `SystemClock` that gap is a few nanoseconds and the rate is huge;
    /// it settles once later transfers are spaced out.
    pub fn new(device: Arc<D>) -> Self {
        Self {
            device,
            state: Mutex::new(ClientState::default()),
            clock: Arc::new(SystemClock),
            policy: Arc::new(AlwaysSucceed),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_policy(mut self, policy: Arc<dyn TransferPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn id(&self) -> &str {
        self.device.id()
    }

    /// Starts downloading our own copy of `file` if the device has room for it.
    /// A file we already download keeps its progress.
    pub fn initialize_download(&self, file: &TorrentFile) {
        let info_hash = file.info_hash();
        if info_hash.is_empty() {
            return;
        }
        let mut state = self.state.lock();
        if state.downloading.contains_key(info_hash) {
            debug!(peer = self.id(), info_hash, "download already initialized");
            return;
        }
        if !self.device.has_storage_space(file.file_size()) {
            warn!(
                peer = self.id(),
                file = file.file_name(),
                size = file.file_size(),
                "insufficient storage"
            );
            return;
        }
        state
            .downloading
            .insert(info_hash.to_owned(), file.fresh_copy());
        info!(peer = self.id(), info_hash, file = file.file_name(), "started downloading");
    }

    /// Downloads piece `piece_index` of `info_hash` from `remote`.
    ///
    /// Returns false without touching any state if we don't download the file,
    /// the remote doesn't have it, the index is out of range, we already have
    /// the piece, the remote doesn't, either side is offline or the transfer
    /// policy refuses. On success both sides record the transfer.
    pub fn request_piece(
        &self,
        info_hash: &str,
        piece_index: u32,
        remote: &dyn PieceSource,
    ) -> bool {
        if info_hash.is_empty() || remote.peer_id() == self.id() {
            return false;
        }
        let probe = || RemoteView {
            has_file: remote.has_file(info_hash),
            has_piece: remote.has_piece(info_hash, piece_index),
            online: remote.is_online(),
        };
        let (mut state, remote_view) = if remote.peer_id() < self.id() {
            let remote_view = probe();
            (self.state.lock(), remote_view)
        } else {
            let state = self.state.lock();
            let remote_view = probe();
            (state, remote_view)
        };

        let Some(local) = state.downloading.get_mut(info_hash) else {
            return false;
        };
        if !remote_view.has_file || piece_index >= local.piece_count() {
            return false;
        }
        if local.is_piece_completed(piece_index) {
            debug!(peer = self.id(), info_hash, piece_index, "piece already completed");
            return false;
        }
        if !remote_view.has_piece {
            debug!(peer = self.id(), remote = remote.peer_id(), piece_index, "remote lacks piece");
            return false;
        }
        if !self.device.is_online() || !remote_view.online {
            debug!(peer = self.id(), remote = remote.peer_id(), "a party is offline");
            return false;
        }
        let Some(piece) = local.piece(piece_index).cloned() else {
            return false;
        };
        if !self.policy.allow_transfer(&piece, remote.peer_id()) {
            debug!(peer = self.id(), remote = remote.peer_id(), piece_index, "transfer failed");
            return false;
        }

        local.mark_piece_completed(piece_index);
        let size = piece.size() as u64;
        self.record(&mut state, remote.peer_id(), 0, size);
        drop(state);
        remote.record_transfer(self.id(), size, 0);

        debug!(
            peer = self.id(),
            remote = remote.peer_id(),
            info_hash,
            piece_index,
            "downloaded piece"
        );
        true
    }

    /// Marks a piece of our own copy as completed, e.g. to seed.
    /// Returns whether anything changed.
    pub fn mark_piece_completed(&self, info_hash: &str, piece_index: u32) -> bool {
        self.state
            .lock()
            .downloading
            .get_mut(info_hash)
            .is_some_and(|file| file.mark_piece_completed(piece_index))
    }

    pub fn next_needed_piece(&self, info_hash: &str) -> Option<u32> {
        self.with_file(info_hash, TorrentFile::next_missing_piece)
            .flatten()
    }

    pub fn download_progress(&self, info_hash: &str) -> f64 {
        self.with_file(info_hash, TorrentFile::progress)
            .unwrap_or(0.0)
    }

    pub fn completed_piece_count(&self, info_hash: &str) -> u32 {
        self.with_file(info_hash, TorrentFile::completed_piece_count)
            .unwrap_or(0)
    }

    pub fn total_piece_count(&self, info_hash: &str) -> u32 {
        self.with_file(info_hash, TorrentFile::piece_count)
            .unwrap_or(0)
    }

    pub fn is_download_complete(&self, info_hash: &str) -> bool {
        self.with_file(info_hash, TorrentFile::is_complete)
            .unwrap_or(false)
    }

    /// a snapshot, changing it doesn't affect the download
    pub fn downloading_file(&self, info_hash: &str) -> Option<TorrentFile> {
        self.with_file(info_hash, TorrentFile::clone)
    }

    pub fn downloading_hashes(&self) -> Vec<String> {
        self.state.lock().downloading.keys().cloned().collect()
    }

    pub fn peer_stats(&self, peer_id: &str) -> Option<PeerTransferStats> {
        self.state.lock().peer_stats.get(peer_id).copied()
    }

    /// summed over every peer
    pub fn real_upload_speed(&self) -> f64 {
        self.state
            .lock()
            .peer_stats
            .values()
            .map(PeerTransferStats::upload_speed)
            .sum()
    }

    /// summed over every peer
    pub fn real_download_speed(&self) -> f64 {
        self.state
            .lock()
            .peer_stats
            .values()
            .map(PeerTransferStats::download_speed)
            .sum()
    }

    fn with_file<T>(&self, info_hash: &str, f: impl FnOnce(&TorrentFile) -> T) -> Option<T> {
        self.state.lock().downloading.get(info_hash).map(f)
    }

    fn record(&self, state: &mut ClientState, peer_id: &str, uploaded: u64, downloaded: u64) {
        let stats = state
            .peer_stats
            .entry(peer_id.to_owned())
            .or_insert_with(|| PeerTransferStats::new(self.clock.now()));
        stats.update_transfer(uploaded, downloaded, self.clock.now());
    }
}

impl<D> PieceSource for TorrentClient<D>
where
    D: DeviceIdentity + StorageOwner + Send + Sync,
{
    fn peer_id(&self) -> &str {
        self.id()
    }

    fn is_online(&self) -> bool {
        self.device.is_online()
    }

    fn has_file(&self, info_hash: &str) -> bool {
        self.state.lock().downloading.contains_key(info_hash)
    }

    fn has_piece(&self, info_hash: &str, index: u32) -> bool {
        self.with_file(info_hash, |file| file.is_piece_completed(index))
            .unwrap_or(false)
    }

    fn record_transfer(&self, peer_id: &str, uploaded: u64, downloaded: u64) {
        let mut state = self.state.lock();
        self.record(&mut state, peer_id, uploaded, downloaded);
    }
}
