//! external value transfer
//!
//! the engine never holds real value. outgoing amounts are pushed through a
//! [`ValueTransfer`] supplied by the host; a failed push aborts the whole
//! enclosing operation.

use core::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{AccountId, Amount, ErrorKind};

/// outgoing value owed to an account once an operation commits
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub to: AccountId,
    pub amount: Amount,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("transfer of {amount} to {to} rejected: {reason}")]
    Rejected {
        to: AccountId,
        amount: Amount,
        reason: String,
    },

    #[error("recipient balance overflow")]
    Overflow,
}

impl TransferError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Integrity
    }
}

/// atomic push of a fungible amount to an account
///
/// takes `&self` so a recipient hook may call back into the engine; the
/// engine's reentrancy guard is what refuses such calls.
pub trait ValueTransfer {
    fn push(&self, to: &AccountId, amount: Amount) -> Result<(), TransferError>;
}

impl<T: ValueTransfer + ?Sized> ValueTransfer for &T {
    fn push(&self, to: &AccountId, amount: Amount) -> Result<(), TransferError> {
        (**self).push(to, amount)
    }
}

/// in-memory recipient balances
#[derive(Debug, Default)]
pub struct BalanceBook {
    balances: RefCell<BTreeMap<AccountId, Amount>>,
    rejecting: RefCell<BTreeSet<AccountId>>,
    history: RefCell<Vec<Payout>>,
}

impl BalanceBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// refuse every future push to `account`
    pub fn reject(&self, account: AccountId) {
        self.rejecting.borrow_mut().insert(account);
    }

    pub fn accept(&self, account: &AccountId) {
        self.rejecting.borrow_mut().remove(account);
    }

    pub fn balance_of(&self, account: &AccountId) -> Amount {
        self.balances
            .borrow()
            .get(account)
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    /// successful pushes in order
    pub fn history(&self) -> Vec<Payout> {
        self.history.borrow().clone()
    }
}

impl ValueTransfer for BalanceBook {
    fn push(&self, to: &AccountId, amount: Amount) -> Result<(), TransferError> {
        if self.rejecting.borrow().contains(to) {
            return Err(TransferError::Rejected {
                to: *to,
                amount,
                reason: "recipient refuses value".into(),
            });
        }

        let mut balances = self.balances.borrow_mut();
        let balance = balances.entry(*to).or_insert(Amount::ZERO);
        *balance = balance.try_add(amount).map_err(|_| TransferError::Overflow)?;
        self.history.borrow_mut().push(Payout { to: *to, amount });
        Ok(())
    }
}
