//! error types for the mortgage ledger and the protocol service

use hearth_pool::PoolError;
use hearth_primitives::{
    AccountId, Amount, ArithmeticError, Bps, ErrorKind, PropertyId, ReentrantCall, TransferError,
};
use thiserror::Error;

use crate::{ConfigError, LoanStatus, RegistryError};

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LedgerError {
    // === validation ===
    #[error("invalid amount")]
    InvalidAmount,

    #[error("invalid term of {0} months")]
    InvalidTerm(u32),

    #[error("{0} is not listed for financing")]
    AssetNotListed(PropertyId),

    #[error("{asset} already has a {status:?} loan")]
    LoanAlreadyExists { asset: PropertyId, status: LoanStatus },

    #[error("down payment too low: offered {offered}, required {required}")]
    DownPaymentTooLow { offered: Amount, required: Amount },

    #[error("no loan on {0}")]
    LoanNotFound(PropertyId),

    #[error("loan on {asset} is {status:?}, not active")]
    LoanNotActive { asset: PropertyId, status: LoanStatus },

    #[error("insufficient payment: paid {paid}, due {expected}")]
    InsufficientPayment { expected: Amount, paid: Amount },

    #[error("rate {requested} above ceiling {max}")]
    RateTooHigh { requested: Bps, max: Bps },

    // === authorization ===
    #[error("caller {0} is not the borrower")]
    NotBorrower(AccountId),

    #[error("caller {0} is not the ledger owner")]
    NotOwner(AccountId),

    // === resource ===
    #[error("insufficient pool liquidity: need {required}, available {available}")]
    InsufficientPoolLiquidity { required: Amount, available: Amount },

    // === collaborators ===
    #[error("pool: {0}")]
    Pool(#[from] PoolError),

    #[error("registry: {0}")]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Arithmetic(#[from] ArithmeticError),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::InvalidAmount
            | LedgerError::InvalidTerm(_)
            | LedgerError::AssetNotListed(_)
            | LedgerError::LoanAlreadyExists { .. }
            | LedgerError::DownPaymentTooLow { .. }
            | LedgerError::LoanNotFound(_)
            | LedgerError::LoanNotActive { .. }
            | LedgerError::InsufficientPayment { .. }
            | LedgerError::RateTooHigh { .. } => ErrorKind::Validation,
            LedgerError::NotBorrower(_) | LedgerError::NotOwner(_) => ErrorKind::Authorization,
            LedgerError::InsufficientPoolLiquidity { .. } => ErrorKind::Resource,
            LedgerError::Pool(e) => e.kind(),
            LedgerError::Registry(e) => e.kind(),
            LedgerError::Arithmetic(e) => e.kind(),
        }
    }
}

/// failure of a call made through [`Protocol`](crate::Protocol)
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("transfer failed: {0}")]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    Reentrant(#[from] ReentrantCall),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ProtocolError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProtocolError::Ledger(e) => e.kind(),
            ProtocolError::Pool(e) => e.kind(),
            ProtocolError::Transfer(e) => e.kind(),
            ProtocolError::Reentrant(e) => e.kind(),
            ProtocolError::Config(_) => ErrorKind::Validation,
        }
    }

    /// the underlying ledger error, if any
    pub fn as_ledger(&self) -> Option<&LedgerError> {
        match self {
            ProtocolError::Ledger(e) => Some(e),
            _ => None,
        }
    }

    /// the underlying pool error, whether raised directly or via the ledger
    pub fn as_pool(&self) -> Option<&PoolError> {
        match self {
            ProtocolError::Pool(e) | ProtocolError::Ledger(LedgerError::Pool(e)) => Some(e),
            _ => None,
        }
    }
}
