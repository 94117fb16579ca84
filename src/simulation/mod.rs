use std::{fmt, sync::Arc};

use futures_util::future::join_all;
use rand::seq::SliceRandom;
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    client::{PieceSource, RandomSuccess, TorrentClient, TransferPolicy},
    device::Computer,
    swarm::{AnnounceEvent, SwarmInfo, TorrentTracker},
    torrent::{Metainfo, TorrentFile},
};

mod config;
pub mod error;

pub use config::SimulationConfig;
pub use error::{ConfigError, SimulationError};

const TRACKER_ID: &str = "TRK001";
const SEEDER_ID: &str = "SEED001";
const MIB: f64 = 1_048_576.0;

/// One file, one tracker, one seeder holding every piece and a group of
/// peers that download from each other and from the seeder.
pub struct Simulation {
    config: SimulationConfig,
    file: TorrentFile,
    tracker: TorrentTracker,
    seeder: Arc<TorrentClient>,
    peers: Vec<Arc<TorrentClient>>,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        let metainfo = Metainfo::new(&config.file_name, config.file_size, config.piece_size);
        let file = TorrentFile::from_metainfo(&metainfo)?;
        let info_hash = file.info_hash();

        let tracker = TorrentTracker::new(TRACKER_ID);
        tracker.track_file(&file);

        let seeder = Arc::new(TorrentClient::new(Arc::new(Computer::new(SEEDER_ID, u64::MAX))));
        seeder.initialize_download(&file);
        for piece_i in 0..file.piece_count() {
            seeder.mark_piece_completed(info_hash, piece_i);
        }
        tracker.announce(info_hash, seeder.id(), AnnounceEvent::Completed);

        let policy: Arc<dyn TransferPolicy> = Arc::new(RandomSuccess::new(config.success_rate));
        let peers: Vec<_> = (1..=config.peers)
            .map(|i| {
                let device = Computer::new(format!("PEER{i:03}"), config.peer_storage());
                Arc::new(TorrentClient::new(Arc::new(device)).with_policy(policy.clone()))
            })
            .collect();
        for peer in &peers {
            peer.initialize_download(&file);
            tracker.announce(info_hash, peer.id(), AnnounceEvent::Started);
        }

        Ok(Self {
            config,
            file,
            tracker,
            seeder,
            peers,
        })
    }

    pub fn info_hash(&self) -> &str {
        self.file.info_hash()
    }

    pub fn file(&self) -> &TorrentFile {
        &self.file
    }

    pub fn tracker(&self) -> &TorrentTracker {
        &self.tracker
    }

    pub fn seeder(&self) -> &TorrentClient {
        &self.seeder
    }

    pub fn peers(&self) -> &[Arc<TorrentClient>] {
        &self.peers
    }

    /// Lets every peer download concurrently for one cycle.
    /// Returns how many pieces changed hands.
    pub async fn run_cycle(&self, cycle: usize) -> Result<usize, SimulationError> {
        let mut candidates = self.peers.clone();
        candidates.push(self.seeder.clone());

        let handles = self.peers.iter().map(|peer| {
            let peer = peer.clone();
            let candidates = candidates.clone();
            let info_hash = self.info_hash().to_owned();
            let rounds = self.config.pieces_per_cycle;
            tokio::spawn(async move { process_downloads(&peer, &candidates, &info_hash, rounds) })
        });

        let mut transferred = 0;
        for result in join_all(handles).await {
            transferred += result.map_err(|error| SimulationError::PeerTask { cycle, error })?;
        }
        Ok(transferred)
    }

    pub fn is_complete(&self) -> bool {
        self.peers
            .iter()
            .all(|peer| peer.is_download_complete(self.info_hash()))
    }

    pub async fn run(&self) -> Result<SimulationReport, SimulationError> {
        info!(
            file = self.file.file_name(),
            size_mib = self.file.file_size() as f64 / MIB,
            piece_kib = self.file.piece_size() / 1_024,
            pieces = self.file.piece_count(),
            peers = self.peers.len(),
            "starting simulation"
        );

        let mut cycles_run = 0;
        for cycle in 1..=self.config.cycles {
            let transferred = self.run_cycle(cycle).await?;
            cycles_run = cycle;
            self.log_status(cycle, transferred);

            if self.is_complete() {
                info!(cycle, "all peers completed the download");
                break;
            }
            if cycle < self.config.cycles {
                tokio::time::sleep(self.config.cycle_delay()).await;
            }
        }

        Ok(self.report(cycles_run))
    }

    pub fn report(&self, cycles_run: usize) -> SimulationReport {
        let info_hash = self.info_hash();
        let peers = self
            .peers
            .iter()
            .map(|peer| PeerReport {
                peer_id: peer.id().to_owned(),
                progress: peer.download_progress(info_hash),
                completed_pieces: peer.completed_piece_count(info_hash),
                total_pieces: peer.total_piece_count(info_hash),
                upload_speed: peer.real_upload_speed(),
                download_speed: peer.real_download_speed(),
            })
            .collect();

        let announced = self.tracker.peers(info_hash);
        let mut swarm = SwarmInfo::new(info_hash);
        for client in std::iter::once(&self.seeder).chain(&self.peers) {
            if announced.contains(client.id()) {
                swarm.add_peer(client.id(), client.is_download_complete(info_hash));
            }
        }
        for peer in &self.peers {
            swarm.update_transferred(downloaded_bytes(peer, info_hash));
        }

        SimulationReport {
            info_hash: info_hash.to_owned(),
            piece_count: self.file.piece_count(),
            cycles_run,
            completed: self.is_complete(),
            peers,
            swarm,
        }
    }

    fn log_status(&self, cycle: usize, transferred: usize) {
        info!(cycle, transferred, seeder = self.seeder.id(), "cycle finished");
        for peer in &self.peers {
            // a peer's first transfer is timed over two back to back clock readings,
            // so early cycles can show very large rates
            info!(
                peer = peer.id(),
                progress = format!("{:.1}%", peer.download_progress(self.info_hash()) * 100.0),
                up_mib_s = format!("{:.2}", peer.real_upload_speed() / MIB),
                down_mib_s = format!("{:.2}", peer.real_download_speed() / MIB),
                "status"
            );
        }
    }
}

/// up to `rounds` times: pick the next missing piece and fetch it from anyone who has it
fn process_downloads(
    peer: &TorrentClient,
    candidates: &[Arc<TorrentClient>],
    info_hash: &str,
    rounds: usize,
) -> usize {
    let mut downloaded = 0;
    for _ in 0..rounds {
        let Some(piece_i) = peer.next_needed_piece(info_hash) else {
            break;
        };
        let Some(source) = find_source(peer, candidates, info_hash, piece_i) else {
            continue;
        };
        if peer.request_piece(info_hash, piece_i, source) {
            debug!(peer = peer.id(), source = source.id(), piece_i, "downloaded piece");
            downloaded += 1;
        }
    }
    downloaded
}

fn find_source<'a>(
    requester: &TorrentClient,
    candidates: &'a [Arc<TorrentClient>],
    info_hash: &str,
    piece_i: u32,
) -> Option<&'a TorrentClient> {
    let mut shuffled: Vec<&TorrentClient> = candidates.iter().map(Arc::as_ref).collect();
    shuffled.shuffle(&mut rand::rng());
    shuffled.into_iter().find(|candidate| {
        candidate.id() != requester.id() && candidate.has_piece(info_hash, piece_i)
    })
}

fn downloaded_bytes(peer: &TorrentClient, info_hash: &str) -> u64 {
    peer.downloading_file(info_hash)
        .map(|file| {
            file.pieces()
                .iter()
                .filter(|piece| piece.is_downloaded())
                .map(|piece| piece.size() as u64)
                .sum()
        })
        .unwrap_or(0)
}

#[derive(Debug, Clone, Serialize)]
pub struct PeerReport {
    pub peer_id: String,
    pub progress: f64,
    pub completed_pieces: u32,
    pub total_pieces: u32,
    /// bytes/second
    pub upload_speed: f64,
    /// bytes/second
    pub download_speed: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub info_hash: String,
    pub piece_count: u32,
    pub cycles_run: usize,
    pub completed: bool,
    pub peers: Vec<PeerReport>,
    pub swarm: SwarmInfo,
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Final Statistics ({} cycles):", self.cycles_run)?;
        for peer in &self.peers {
            writeln!(f, "{}:", peer.peer_id)?;
            writeln!(f, "  - Final Progress: {:.1}%", peer.progress * 100.0)?;
            writeln!(
                f,
                "  - Completed Pieces: {}/{}",
                peer.completed_pieces, peer.total_pieces
            )?;
        }
        write!(
            f,
            "Swarm: {} seeders, {} leechers, {:.2} MiB transferred",
            self.swarm.num_seeders(),
            self.swarm.num_leechers(),
            self.swarm.total_transferred() as f64 / MIB
        )
    }
}
