//! events emitted by committed pool operations

use hearth_primitives::{AccountId, Amount, Shares};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolEvent {
    LiquidityDeposited {
        depositor: AccountId,
        amount: Amount,
        shares: Shares,
        insurance_cut: Amount,
    },
    LiquidityWithdrawn {
        depositor: AccountId,
        shares: Shares,
        amount: Amount,
    },
    LoanFunded {
        borrower: AccountId,
        amount: Amount,
        active_loan_capital: Amount,
    },
    RepaymentReceived {
        principal: Amount,
        interest: Amount,
        total_liquidity: Amount,
    },
    InsurancePayout {
        amount: Amount,
        remaining_reserve: Amount,
    },
    CallerAuthorized {
        caller: AccountId,
    },
    CallerRevoked {
        caller: AccountId,
    },
}
