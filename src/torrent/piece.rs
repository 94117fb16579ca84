/// One addressable chunk of a shared file.
/// `index` and `size` are fixed at construction, the two status flags are independent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Piece {
    index: u32,
    size: u32,
    downloaded: bool,
    verified: bool,
}

impl Piece {
    pub(crate) fn new(index: u32, size: u32) -> Self {
        Self {
            index,
            size,
            downloaded: false,
            verified: false,
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn is_downloaded(&self) -> bool {
        self.downloaded
    }

    pub fn is_verified(&self) -> bool {
        self.verified
    }

    pub fn set_downloaded(&mut self, downloaded: bool) {
        self.downloaded = downloaded;
    }

    /// nothing is hashed, this only records the claim
    pub fn set_verified(&mut self, verified: bool) {
        self.verified = verified;
    }
}
