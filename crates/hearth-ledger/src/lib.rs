//! hearth mortgage ledger
//!
//! borrowers finance a tokenized property out of the shared liquidity pool
//! and earn ownership of it payment by payment. lenders share default risk
//! through the pool's insurance reserve.
//!
//! # architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Protocol                             │
//! │  reentrancy guard ─► snapshot ─► transition ─► transfer out  │
//! │                                      │            │ fails?   │
//! │                                      │            └► restore │
//! │                                      ▼                       │
//! │  ┌────────────────┐   fund / repay / cover  ┌──────────────┐ │
//! │  │ MortgageLedger │ ──────────────────────► │LiquidityPool │ │
//! │  └───────┬────────┘                         └──────────────┘ │
//! │          │ custody / list / unlist                           │
//! │          ▼                                                   │
//! │  ┌──────────────────┐                                        │
//! │  │ PropertyRegistry │                                        │
//! │  └──────────────────┘                                        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # loan lifecycle
//!
//! ```text
//! None ──apply──► Applied ──funded──► Active ──paid up──► PaidOff
//!                                        │
//!                                        └─90 days silent─► Defaulted ──► Foreclosed
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod ledger;
pub mod loan;
pub mod protocol;
pub mod registry;

pub use config::{ConfigError, LedgerConfig, ProtocolConfig};
pub use error::{LedgerError, ProtocolError, Result};
pub use event::{LoanEvent, Outcome, ProtocolEvent};
pub use ledger::{ledger_account, MortgageLedger};
pub use loan::{flat_rate_schedule, LoanRecord, LoanStatus, Schedule};
pub use protocol::{Protocol, Resource};
pub use registry::{AssetInfo, AssetRegistry, PropertyRegistry, RegistryError};

/// domain label the ledger's own account is derived from
pub const LEDGER_ACCOUNT_LABEL: &[u8] = b"hearth.mortgage-ledger.v1";

/// months per year for rate conversion
pub const MONTHS_PER_YEAR: u128 = 12;
