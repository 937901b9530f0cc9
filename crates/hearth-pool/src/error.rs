//! error types for the liquidity pool

use hearth_primitives::{AccountId, Amount, ArithmeticError, ErrorKind, Shares};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PoolError>;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PoolError {
    // === validation ===
    #[error("invalid amount")]
    InvalidAmount,

    #[error("payment mismatch: paid {paid}, principal {principal} + interest {interest}")]
    PaymentMismatch {
        principal: Amount,
        interest: Amount,
        paid: Amount,
    },

    // === authorization ===
    #[error("caller {0} is not an authorized lender")]
    Unauthorized(AccountId),

    #[error("caller {0} is not the pool owner")]
    NotOwner(AccountId),

    // === resource ===
    #[error("insufficient shares: have {held}, requested {requested}")]
    InsufficientShares { held: Shares, requested: Shares },

    #[error("insufficient available liquidity: requested {requested}, available {available}")]
    InsufficientAvailableLiquidity { requested: Amount, available: Amount },

    #[error("insufficient insurance reserve: requested {requested}, reserve {reserve}")]
    InsufficientReserve { requested: Amount, reserve: Amount },

    // === integrity ===
    #[error(transparent)]
    Arithmetic(#[from] ArithmeticError),
}

impl PoolError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PoolError::InvalidAmount | PoolError::PaymentMismatch { .. } => ErrorKind::Validation,
            PoolError::Unauthorized(_) | PoolError::NotOwner(_) => ErrorKind::Authorization,
            PoolError::InsufficientShares { .. }
            | PoolError::InsufficientAvailableLiquidity { .. }
            | PoolError::InsufficientReserve { .. } => ErrorKind::Resource,
            PoolError::Arithmetic(e) => e.kind(),
        }
    }
}
