use rand::Rng;

use crate::torrent::Piece;

/// Decides whether a transfer that passed every check actually goes through.
pub trait TransferPolicy: Send + Sync {
    fn allow_transfer(&self, piece: &Piece, remote_id: &str) -> bool;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysSucceed;

impl TransferPolicy for AlwaysSucceed {
    fn allow_transfer(&self, _piece: &Piece, _remote_id: &str) -> bool {
        true
    }
}

/// Lets a transfer through with the given probability.
#[derive(Debug, Clone, Copy)]
pub struct RandomSuccess {
    rate: f64,
}

impl RandomSuccess {
    /// `rate` is clamped to `[0, 1]`, NaN counts as 0
    pub fn new(rate: f64) -> Self {
        let rate = if rate.is_nan() { 0.0 } else { rate.clamp(0.0, 1.0) };
        Self { rate }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }
}

impl TransferPolicy for RandomSuccess {
    fn allow_transfer(&self, _piece: &Piece, _remote_id: &str) -> bool {
        rand::rng().random_bool(self.rate)
    }
}

impl<F> TransferPolicy for F
where
    F: Fn(&Piece, &str) -> bool + Send + Sync,
{
    fn allow_transfer(&self, piece: &Piece, remote_id: &str) -> bool {
        self(piece, remote_id)
    }
}

#[cfg(test)]
mod test_policy {
    use super::*;

    #[test]
    fn random_success_extremes() {
        let piece = Piece::new(0, 1);
        let never = RandomSuccess::new(0.0);
        let always = RandomSuccess::new(1.0);
        for _ in 0..100 {
            assert!(!never.allow_transfer(&piece, "PEER001"));
            assert!(always.allow_transfer(&piece, "PEER001"));
        }
    }

    #[test]
    fn rate_is_clamped() {
        assert_eq!(RandomSuccess::new(7.0).rate(), 1.0);
        assert_eq!(RandomSuccess::new(-1.0).rate(), 0.0);
        assert_eq!(RandomSuccess::new(f64::NAN).rate(), 0.0);
    }

    #[test]
    fn closures_are_policies() {
        let only_even = |piece: &Piece, _: &str| piece.index() % 2 == 0;
        assert!(only_even.allow_transfer(&Piece::new(2, 1), "x"));
        assert!(!only_even.allow_transfer(&Piece::new(3, 1), "x"));
    }
}
