use std::time::Instant;

/// Transfer rates towards one remote peer.
///
/// Bytes are accumulated until a reading with a strictly positive elapsed time
/// arrives; that reading turns them into bytes/second and starts a new cycle.
/// The speeds therefore describe the latest burst only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeerTransferStats {
    uploaded_bytes: u64,
    downloaded_bytes: u64,
    upload_speed: f64,
    download_speed: f64,
    last_update: Instant,
}

impl PeerTransferStats {
    pub fn new(now: Instant) -> Self {
        Self {
            uploaded_bytes: 0,
            downloaded_bytes: 0,
            upload_speed: 0.0,
            download_speed: 0.0,
            last_update: now,
        }
    }

    pub fn update_transfer(&mut self, uploaded_bytes: u64, downloaded_bytes: u64, now: Instant) {
        self.uploaded_bytes += uploaded_bytes;
        self.downloaded_bytes += downloaded_bytes;

        let elapsed = now.saturating_duration_since(self.last_update);
        if elapsed.is_zero() {
            return;
        }
        let secs = elapsed.as_secs_f64();
        self.upload_speed = self.uploaded_bytes as f64 / secs;
        self.download_speed = self.downloaded_bytes as f64 / secs;
        self.uploaded_bytes = 0;
        self.downloaded_bytes = 0;
        self.last_update = now;
    }

    /// bytes/second
    pub fn upload_speed(&self) -> f64 {
        self.upload_speed
    }

    /// bytes/second
    pub fn download_speed(&self) -> f64 {
        self.download_speed
    }

    /// bytes not yet turned into a speed
    pub fn pending(&self) -> (u64, u64) {
        (self.uploaded_bytes, self.downloaded_bytes)
    }

    pub fn last_update(&self) -> Instant {
        self.last_update
    }
}
