//! hearth primitives
//!
//! value types shared by the liquidity pool and the mortgage ledger
//!
//! # layout
//!
//! ```text
//! amount   ─ Amount, Shares, Bps, checked mul_div
//! id       ─ AccountId (opaque caller key), PropertyId
//! time     ─ Timestamp in seconds, day/month windows
//! guard    ─ per-resource reentrancy guard
//! transfer ─ external value push + in-memory balance book
//! ```

pub mod amount;
pub mod guard;
pub mod id;
pub mod time;
pub mod transfer;

pub use amount::{mul_div, Amount, ArithmeticError, Bps, Shares};
pub use guard::{Entered, ReentrancyGuard, ReentrantCall};
pub use id::{AccountId, PropertyId};
pub use time::Timestamp;
pub use transfer::{BalanceBook, Payout, TransferError, ValueTransfer};

/// denominator for basis point ratios
pub const BPS_DENOMINATOR: u128 = 10_000;

/// ownership and rate ceiling in basis points
pub const MAX_BPS: Bps = Bps(10_000);

/// coarse failure classes used by callers to decide whether to retry
///
/// validation failures can be retried with corrected input, authorization
/// failures never, resource failures once pool conditions change, integrity
/// failures abort the whole operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Authorization,
    Resource,
    Integrity,
}
