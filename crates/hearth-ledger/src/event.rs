//! audit trail
//!
//! events are produced by transitions and only reach the journal once the
//! enclosing operation commits

use hearth_pool::PoolEvent;
use hearth_primitives::{AccountId, Amount, Bps, Payout, PropertyId};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanEvent {
    LoanApplied {
        asset: PropertyId,
        borrower: AccountId,
        asset_value: Amount,
        down_payment: Amount,
        principal: Amount,
        annual_rate_bps: Bps,
        term_months: u32,
        monthly_payment: Amount,
    },
    LoanActivated {
        asset: PropertyId,
        borrower: AccountId,
        principal: Amount,
    },
    PaymentReceived {
        asset: PropertyId,
        borrower: AccountId,
        amount: Amount,
        principal: Amount,
        interest: Amount,
        late_fee: Amount,
        ownership_bps: Bps,
        payments_made: u32,
    },
    LoanCompleted {
        asset: PropertyId,
        borrower: AccountId,
        total_paid: Amount,
    },
    LoanDefaulted {
        asset: PropertyId,
        borrower: AccountId,
        remaining_balance: Amount,
        insurance_coverage: Amount,
    },
    LoanForeclosed {
        asset: PropertyId,
        borrower: AccountId,
    },
    BaseRateUpdated {
        rate_bps: Bps,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolEvent {
    Pool(PoolEvent),
    Loan(LoanEvent),
}

impl From<PoolEvent> for ProtocolEvent {
    fn from(e: PoolEvent) -> Self {
        ProtocolEvent::Pool(e)
    }
}

impl From<LoanEvent> for ProtocolEvent {
    fn from(e: LoanEvent) -> Self {
        ProtocolEvent::Loan(e)
    }
}

/// what a transition wants committed: events, plus at most one outgoing
/// transfer to perform after the ledger state is settled
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Outcome {
    pub events: Vec<ProtocolEvent>,
    pub payout: Option<Payout>,
}

impl Outcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_event(event: impl Into<ProtocolEvent>) -> Self {
        let mut outcome = Self::new();
        outcome.push(event);
        outcome
    }

    pub fn push(&mut self, event: impl Into<ProtocolEvent>) {
        self.events.push(event.into());
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.payout.is_none()
    }
}
