//! ledger and protocol configuration

use hearth_pool::PoolConfig;
use hearth_primitives::{time::days, Bps, MAX_BPS};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mortgage ledger configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Minimum down payment as a share of the asset value
    /// Default: 1000 (10%)
    pub min_down_payment_bps: Bps,

    /// Late fee as a share of the monthly payment
    /// Default: 500 (5%)
    pub late_fee_bps: Bps,

    /// Length of one payment period in seconds
    /// Default: 30 days
    pub payment_interval_secs: u64,

    /// Extra time after a missed period before the late fee applies
    /// Default: 15 days
    pub grace_period_secs: u64,

    /// Silence after the last payment before a default can be declared
    /// Default: 90 days
    pub default_period_secs: u64,

    /// Rate applied to new loans until the owner changes it
    /// Default: 500 (5%)
    pub initial_base_rate_bps: Bps,

    /// Ceiling for `set_base_rate`
    /// Default: 2000 (20%)
    pub max_base_rate_bps: Bps,

    /// Longest accepted term
    /// Default: 360 (30 years)
    pub max_term_months: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            min_down_payment_bps: Bps(1_000),   // 10%
            late_fee_bps: Bps(500),             // 5%
            payment_interval_secs: days(30),    // one month
            grace_period_secs: days(15),        // 15 days
            default_period_secs: days(90),      // 90 days
            initial_base_rate_bps: Bps(500),    // 5%
            max_base_rate_bps: Bps(2_000),      // 20%
            max_term_months: 360,               // 30 years
        }
    }
}

/// Full protocol configuration
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    pub pool: PoolConfig,
    pub ledger: LedgerConfig,
}

impl ProtocolConfig {
    /// Parse from JSON, filling missing fields with defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject parameter combinations the engine cannot honour
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ratios = [
            ("pool.insurance_cut_bps", self.pool.insurance_cut_bps),
            ("ledger.min_down_payment_bps", self.ledger.min_down_payment_bps),
            ("ledger.late_fee_bps", self.ledger.late_fee_bps),
            ("ledger.max_base_rate_bps", self.ledger.max_base_rate_bps),
        ];
        for (name, value) in ratios {
            if value > MAX_BPS {
                return Err(ConfigError::Invalid(format!("{name} exceeds 10000 ({value})")));
            }
        }

        let ledger = &self.ledger;
        if ledger.initial_base_rate_bps > ledger.max_base_rate_bps {
            return Err(ConfigError::Invalid(format!(
                "ledger.initial_base_rate_bps {} above ceiling {}",
                ledger.initial_base_rate_bps, ledger.max_base_rate_bps
            )));
        }
        if ledger.payment_interval_secs == 0 {
            return Err(ConfigError::Invalid("ledger.payment_interval_secs is zero".into()));
        }
        if ledger.default_period_secs == 0 {
            return Err(ConfigError::Invalid("ledger.default_period_secs is zero".into()));
        }
        if ledger.max_term_months == 0 {
            return Err(ConfigError::Invalid("ledger.max_term_months is zero".into()));
        }

        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = ProtocolConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pool.insurance_cut_bps, Bps(200));
        assert_eq!(config.ledger.grace_period_secs, 15 * 86_400);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = ProtocolConfig::from_json(
            r#"{ "ledger": { "initial_base_rate_bps": 750, "max_term_months": 240 } }"#,
        )
        .unwrap();
        assert_eq!(config.ledger.initial_base_rate_bps, Bps(750));
        assert_eq!(config.ledger.max_term_months, 240);
        assert_eq!(config.ledger.late_fee_bps, Bps(500));
        assert_eq!(config.pool, PoolConfig::default());
    }

    #[test]
    fn test_rate_above_ceiling_rejected() {
        let err = ProtocolConfig::from_json(r#"{ "ledger": { "initial_base_rate_bps": 2500 } }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            ProtocolConfig::from_json("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
