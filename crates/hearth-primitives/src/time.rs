//! wall-clock seconds supplied by the host with every call

use core::fmt;

use serde::{Deserialize, Serialize};

pub const SECONDS_PER_DAY: u64 = 86_400;

/// `n` days in seconds
pub const fn days(n: u64) -> u64 {
    n * SECONDS_PER_DAY
}

/// seconds since an arbitrary epoch chosen by the host
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// seconds elapsed since `earlier`, zero if the clock went backwards
    pub fn elapsed_since(self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    pub fn plus_secs(self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }

    pub fn plus_days(self, n: u64) -> Self {
        self.plus_secs(days(n))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t={}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_saturates() {
        let t = Timestamp::from_secs(100);
        assert_eq!(t.elapsed_since(Timestamp::from_secs(40)), 60);
        assert_eq!(Timestamp::from_secs(40).elapsed_since(t), 0);
        assert_eq!(t.plus_days(1).0, 100 + SECONDS_PER_DAY);
    }
}
