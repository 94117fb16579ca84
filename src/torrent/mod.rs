use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use thiserror::Error;

mod piece;

pub use piece::Piece;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
/// The info dictionary of a single-file torrent.
pub struct Metainfo {
    /// The suggested name of the file.
    pub name: String,
    /// `piece length` maps to the number of bytes in each piece the file is split into.
    #[serde(rename = "piece length")]
    pub piece_length: u32,
    /// The length of the file in bytes.
    pub length: u64,
}

impl Metainfo {
    pub fn new(name: impl Into<String>, length: u64, piece_length: u32) -> Self {
        Self {
            name: name.into(),
            piece_length,
            length,
        }
    }

    /// hex encoded SHA1 of the bencoded dictionary
    pub fn info_hash(&self) -> Result<String, TorrentError> {
        let mut hasher = Sha1::new();
        hasher.update(serde_bencode::to_bytes(self)?);
        let info_hash: [u8; 20] = hasher.finalize().into();
        Ok(hex::encode(info_hash))
    }
}

/// A file split into pieces together with the bitmap of the pieces we have.
///
/// Two `TorrentFile`s with the same `info_hash` describe the same content but
/// are separate objects: every client advances its own copy.
#[derive(Debug, Clone, PartialEq)]
pub struct TorrentFile {
    info_hash: String,
    file_name: String,
    file_size: u64,
    piece_size: u32,
    pieces: Vec<Piece>,
    completed: Vec<bool>,
}

impl TorrentFile {
    /// Splits the file into `ceil(file_size / piece_size)` pieces.
    /// Every piece has `piece_size` bytes except the last which holds the remainder.
    ///
    /// A `piece_size` of zero can't describe any file and is rejected,
    /// as is a file that needs more than `u32::MAX` pieces.
    pub fn new(
        info_hash: impl Into<String>,
        file_name: impl Into<String>,
        file_size: u64,
        piece_size: u32,
    ) -> Result<Self, TorrentError> {
        let info_hash = info_hash.into();
        if piece_size == 0 {
            return Err(TorrentError::ZeroPieceSize { info_hash });
        }
        let n_pieces = file_size.div_ceil(piece_size as u64);
        let Ok(n_pieces) = u32::try_from(n_pieces) else {
            return Err(TorrentError::TooManyPieces { info_hash, n_pieces });
        };
        let pieces = (0..n_pieces)
            .map(|piece_i| Piece::new(piece_i, get_piece_size(file_size, piece_size, piece_i)))
            .collect();

        Ok(Self {
            info_hash,
            file_name: file_name.into(),
            file_size,
            piece_size,
            pieces,
            completed: vec![false; n_pieces as usize],
        })
    }

    /// keyed by the hash of the metainfo
    pub fn from_metainfo(metainfo: &Metainfo) -> Result<Self, TorrentError> {
        Self::new(
            metainfo.info_hash()?,
            metainfo.name.clone(),
            metainfo.length,
            metainfo.piece_length,
        )
    }

    /// Same metadata, nothing completed.
    pub fn fresh_copy(&self) -> Self {
        Self {
            info_hash: self.info_hash.clone(),
            file_name: self.file_name.clone(),
            file_size: self.file_size,
            piece_size: self.piece_size,
            pieces: self
                .pieces
                .iter()
                .map(|piece| Piece::new(piece.index(), piece.size()))
                .collect(),
            completed: vec![false; self.pieces.len()],
        }
    }

    pub fn info_hash(&self) -> &str {
        &self.info_hash
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn piece_size(&self) -> u32 {
        self.piece_size
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub fn piece(&self, index: u32) -> Option<&Piece> {
        self.pieces.get(index as usize)
    }

    pub fn piece_count(&self) -> u32 {
        self.pieces.len() as u32
    }

    /// Out of range indices are ignored.
    /// Returns whether the bit changed.
    pub fn mark_piece_completed(&mut self, index: u32) -> bool {
        let i = index as usize;
        let (Some(bit), Some(piece)) = (self.completed.get_mut(i), self.pieces.get_mut(i)) else {
            return false;
        };
        let changed = !*bit;
        *bit = true;
        piece.set_downloaded(true);
        changed
    }

    pub fn mark_piece_verified(&mut self, index: u32) {
        if let Some(piece) = self.pieces.get_mut(index as usize) {
            piece.set_verified(true);
        }
    }

    pub fn is_piece_completed(&self, index: u32) -> bool {
        self.completed.get(index as usize).copied().unwrap_or(false)
    }

    pub fn completed_pieces(&self) -> Vec<bool> {
        self.completed.clone()
    }

    pub fn completed_piece_count(&self) -> u32 {
        self.completed.iter().filter(|b| **b).count() as u32
    }

    /// lowest index we don't have yet
    pub fn next_missing_piece(&self) -> Option<u32> {
        self.completed
            .iter()
            .position(|b| !*b)
            .map(|piece_i| piece_i as u32)
    }

    pub fn progress(&self) -> f64 {
        if self.pieces.is_empty() {
            return 0.0;
        }
        self.completed_piece_count() as f64 / self.piece_count() as f64
    }

    pub fn is_complete(&self) -> bool {
        self.progress() >= 1.0
    }
}

fn get_piece_size(file_size: u64, piece_size: u32, piece_i: u32) -> u32 {
    let n_pieces = file_size.div_ceil(piece_size as u64);
    let remainder = (file_size % piece_size as u64) as u32;
    if piece_i as u64 == n_pieces - 1 && remainder != 0 {
        remainder
    } else {
        piece_size
    }
}

#[derive(Error, Debug)]
pub enum TorrentError {
    #[error("The torrent `{info_hash}` was created with a piece size of 0")]
    ZeroPieceSize { info_hash: String },
    #[error("The torrent `{info_hash}` needs {n_pieces} pieces, more than u32 can index")]
    TooManyPieces { info_hash: String, n_pieces: u64 },
    #[error("Failed to bencode the metainfo: `{0}`")]
    Metainfo(#[from] serde_bencode::Error),
}

#[cfg(test)]
mod test_torrent_file {
    use super::*;

    const PIECE_SIZE: u32 = 262_144;

    fn file(file_size: u64) -> TorrentFile {
        TorrentFile::new("hash123", "test.mp4", file_size, PIECE_SIZE).expect("valid piece size")
    }

    #[test]
    fn exact_multiple() {
        let whole = file(1_048_576);
        assert_eq!(whole.piece_count(), 4);
        assert!(whole.pieces().iter().all(|p| p.size() == PIECE_SIZE));

        let halves = file(524_288);
        assert_eq!(halves.piece_count(), 2);
        assert_eq!(halves.piece(1).map(Piece::size), Some(PIECE_SIZE));
    }

    #[test]
    fn smaller_than_one_piece() {
        let file = file(1_000);
        assert_eq!(file.piece_count(), 1);
        assert_eq!(file.piece(0).map(Piece::size), Some(1_000));
    }

    #[test]
    fn sizes_sum_to_file_size() {
        for (file_size, piece_size) in [(1u64, 1u32), (10, 3), (1_000_001, 4_096), (7, 7), (8, 7)] {
            let file = TorrentFile::new("h", "f", file_size, piece_size).unwrap();
            assert_eq!(file.piece_count() as u64, file_size.div_ceil(piece_size as u64));
            let total: u64 = file.pieces().iter().map(|p| p.size() as u64).sum();
            assert_eq!(total, file_size);
            let (last, rest) = file.pieces().split_last().unwrap();
            assert!(rest.iter().all(|p| p.size() == piece_size));
            assert!(last.size() >= 1 && last.size() <= piece_size);
            assert!(file.pieces().iter().enumerate().all(|(i, p)| p.index() == i as u32));
        }
    }

    #[test]
    fn remainder_goes_to_the_last_piece() {
        let file = TorrentFile::new("h", "f", 10, 3).unwrap();
        let sizes: Vec<u32> = file.pieces().iter().map(Piece::size).collect();
        assert_eq!(sizes, vec![3, 3, 3, 1]);
    }

    #[test]
    fn too_many_pieces_is_rejected() {
        let err = TorrentFile::new("hash123", "huge.bin", (1 << 32) + 3, 1).unwrap_err();
        assert!(matches!(
            err,
            TorrentError::TooManyPieces { info_hash, n_pieces }
                if info_hash == "hash123" && n_pieces == (1 << 32) + 3
        ));

        let max = TorrentFile::new("h", "f", (u32::MAX as u64 + 1) * 2, 2).unwrap_err();
        assert!(matches!(max, TorrentError::TooManyPieces { .. }));
    }

    #[test]
    fn zero_piece_size_is_rejected() {
        let err = TorrentFile::new("hash123", "test.mp4", 100, 0).unwrap_err();
        assert!(matches!(err, TorrentError::ZeroPieceSize { info_hash } if info_hash == "hash123"));
    }

    #[test]
    fn empty_file() {
        let file = file(0);
        assert_eq!(file.piece_count(), 0);
        assert_eq!(file.progress(), 0.0);
        assert!(!file.is_complete());
        assert_eq!(file.next_missing_piece(), None);
    }

    #[test]
    fn mark_completed_is_idempotent() {
        let mut file = file(1_048_576);
        assert!(file.mark_piece_completed(2));
        assert!(!file.mark_piece_completed(2));
        assert_eq!(file.completed_piece_count(), 1);
        assert!(file.is_piece_completed(2));
        assert!(file.piece(2).is_some_and(Piece::is_downloaded));
        assert!(!file.piece(2).is_some_and(Piece::is_verified));
    }

    #[test]
    fn out_of_range() {
        let mut file = file(1_048_576);
        assert!(!file.mark_piece_completed(4));
        assert!(!file.mark_piece_completed(u32::MAX));
        assert_eq!(file.completed_piece_count(), 0);
        assert!(!file.is_piece_completed(4));
        file.mark_piece_verified(99);
        assert!(file.piece(99).is_none());
    }

    #[test]
    fn progress_is_monotonic() {
        let mut file = file(1_048_576);
        let mut last = file.progress();
        for i in [3, 0, 0, 2, 1] {
            file.mark_piece_completed(i);
            let progress = file.progress();
            assert!(progress >= last);
            assert_eq!(
                progress,
                file.completed_piece_count() as f64 / file.piece_count() as f64
            );
            last = progress;
        }
        assert_eq!(last, 1.0);
        assert!(file.is_complete());
    }

    #[test]
    fn next_missing_piece() {
        let mut file = file(1_048_576);
        assert_eq!(file.next_missing_piece(), Some(0));
        file.mark_piece_completed(0);
        file.mark_piece_completed(2);
        assert_eq!(file.next_missing_piece(), Some(1));
    }

    #[test]
    fn fresh_copy_does_not_share_progress() {
        let mut original = file(1_048_576);
        original.mark_piece_completed(0);
        original.mark_piece_verified(0);

        let mut copy = original.fresh_copy();
        assert_eq!(copy.info_hash(), original.info_hash());
        assert_eq!(copy.piece_count(), 4);
        assert_eq!(copy.completed_piece_count(), 0);
        assert_eq!(copy.completed_pieces(), vec![false; 4]);
        assert_eq!(copy.file_size(), 1_048_576);
        assert_eq!(copy.piece_size(), PIECE_SIZE);
        assert!(!copy.piece(0).is_some_and(Piece::is_verified));

        copy.mark_piece_completed(3);
        assert!(!original.is_piece_completed(3));
    }

    #[test]
    fn info_hash_from_metainfo() {
        let metainfo = Metainfo::new("sample.data", 10_485_760, PIECE_SIZE);
        let hash = metainfo.info_hash().unwrap();
        assert_eq!(hash.len(), 40);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash, metainfo.info_hash().unwrap());

        let other = Metainfo::new("other.data", 10_485_760, PIECE_SIZE);
        assert_ne!(hash, other.info_hash().unwrap());

        let file = TorrentFile::from_metainfo(&metainfo).unwrap();
        assert_eq!(file.info_hash(), hash);
        assert_eq!(file.file_name(), "sample.data");
        assert_eq!(file.piece_count(), 40);
    }
}
