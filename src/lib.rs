pub mod client;
pub mod device;
pub mod simulation;
pub mod swarm;
pub mod torrent;

pub use client::{PeerTransferStats, PieceSource, TorrentClient};
pub use device::{Computer, DeviceIdentity, StorageOwner};
pub use simulation::{Simulation, SimulationConfig, SimulationReport};
pub use swarm::{AnnounceEvent, SwarmInfo, SwarmRegistry, TorrentServer, TorrentTracker};
pub use torrent::{Metainfo, Piece, TorrentError, TorrentFile};

/// 256 KiB
pub const DEFAULT_PIECE_SIZE: u32 = 1 << 18;
