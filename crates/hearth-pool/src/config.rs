//! pool parameters

use hearth_primitives::Bps;
use serde::{Deserialize, Serialize};

/// liquidity pool configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// share of every deposit booked into the insurance reserve
    /// Default: 200 (2%)
    pub insurance_cut_bps: Bps,

    /// advertised annual yield reported by `estimated_yield_bps`
    /// Default: 800 (8%)
    pub estimated_yield_bps: Bps,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            insurance_cut_bps: Bps(200),   // 2%
            estimated_yield_bps: Bps(800), // 8% placeholder
        }
    }
}
