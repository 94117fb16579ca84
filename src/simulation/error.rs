use std::{io, path::PathBuf};

use thiserror::Error;

use crate::torrent::TorrentError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read the config at the path `{path}` with the error: `{error}`")]
    Read { path: PathBuf, error: io::Error },
    #[error("Failed to parse the config at the path `{path}` with the error: `{error}`")]
    Parse {
        path: PathBuf,
        error: serde_json::Error,
    },
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("The simulation failed with the following config error: {0}")]
    Config(#[from] ConfigError),
    #[error("The simulation failed with the following Torrent error: {0}")]
    Torrent(#[from] TorrentError),
    #[error("A peer task of cycle {cycle} failed: `{error}`")]
    PeerTask {
        cycle: usize,
        error: tokio::task::JoinError,
    },
}
