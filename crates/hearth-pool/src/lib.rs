//! liquidity pool
//!
//! lenders deposit capital and receive proportional shares. the mortgage
//! ledger, as an authorized caller, draws principal out of the pool, routes
//! repayments back into it and claims insurance coverage on default.
//!
//! ## accounting
//!
//! ```text
//!   deposit ──► total_liquidity += amount        insurance_reserve += 2%
//!   withdraw ◄─ total_liquidity -= out           (out ≤ available)
//!   fund    ──► active_loan_capital += principal
//!   repay   ──► active_loan_capital -= principal  total_liquidity += paid
//!   cover   ──► active_loan_capital -= payout     insurance_reserve -= payout
//!
//!   available = total_liquidity - active_loan_capital ≥ 0
//! ```
//!
//! every operation validates before it mutates; callers that move value
//! outwards get a [`Payout`](hearth_primitives::Payout) back and are
//! responsible for pushing it after their own state is settled.

pub mod config;
pub mod error;
pub mod event;
pub mod pool;

pub use config::PoolConfig;
pub use error::{PoolError, Result};
pub use event::PoolEvent;
pub use pool::{LiquidityPool, LiquidityPosition, PoolState};
