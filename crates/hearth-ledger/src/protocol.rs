//! Protocol service - serialized all-or-nothing execution
//!
//! Owns the pool, the ledger and the registry. Every mutating call:
//!
//! 1. enters the reentrancy guard for each resource it touches
//! 2. snapshots the parts of the world those resources cover
//! 3. runs the transition, restoring the snapshot on error
//! 4. pushes the outgoing payout, if any, with the world already settled
//!    and unborrowed; a failed push restores the snapshot
//! 5. journals the transition's events at the position they held when the
//!    transition ran
//!
//! A recipient that calls back in during step 4 sees the committed state
//! and is refused by the guard for any resource still in flight. Events of
//! a reentrant call that commits during the push land after the outer
//! call's events.

use std::cell::{Ref, RefCell};

use hearth_pool::{LiquidityPool, PoolState};
use hearth_primitives::{
    AccountId, Amount, Bps, PropertyId, ReentrancyGuard, Shares, Timestamp, TransferError,
    ValueTransfer,
};
use tracing::{debug, info, warn};

use crate::{
    ledger_account, LedgerError, LoanRecord, LoanStatus, MortgageLedger, Outcome, ProtocolConfig,
    ProtocolError, ProtocolEvent, PropertyRegistry,
};

type ProtocolResult<T> = std::result::Result<T, ProtocolError>;

/// guard key for a piece of state an operation touches
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Resource {
    Pool,
    Ledger,
    Loan(PropertyId),
}

#[derive(Debug)]
struct World<R> {
    pool: LiquidityPool,
    ledger: MortgageLedger,
    registry: R,
}

/// copy of the parts of the world an operation holds
///
/// the registry travels with the ledger: only ledger transitions move
/// custody or toggle listings
struct Snapshot<R> {
    pool: Option<LiquidityPool>,
    ledger: Option<(MortgageLedger, R)>,
}

fn holds_pool(held: &[Resource]) -> bool {
    held.contains(&Resource::Pool)
}

fn holds_ledger(held: &[Resource]) -> bool {
    held.iter()
        .any(|r| matches!(r, Resource::Ledger | Resource::Loan(_)))
}

impl<R: Clone> World<R> {
    fn snapshot(&self, held: &[Resource]) -> Snapshot<R> {
        Snapshot {
            pool: holds_pool(held).then(|| self.pool.clone()),
            ledger: holds_ledger(held).then(|| (self.ledger.clone(), self.registry.clone())),
        }
    }

    /// put back what `snapshot` holds
    ///
    /// parts it does not hold may have been changed by a reentrant call that
    /// already committed, so they stay as they are
    fn restore(&mut self, snapshot: Snapshot<R>) {
        if let Some(pool) = snapshot.pool {
            self.pool = pool;
        }
        if let Some((ledger, registry)) = snapshot.ledger {
            self.ledger = ledger;
            self.registry = registry;
        }
    }
}

pub struct Protocol<R: PropertyRegistry + Clone> {
    world: RefCell<World<R>>,
    guard: ReentrancyGuard<Resource>,
    journal: RefCell<Vec<ProtocolEvent>>,
}

impl<R: PropertyRegistry + Clone> Protocol<R> {
    /// set up an empty pool and ledger over `registry`
    ///
    /// the registry must already delegate its operator role to
    /// [`ledger_account`]; the pool is created with the ledger authorized.
    pub fn new(owner: AccountId, config: ProtocolConfig, registry: R) -> ProtocolResult<Self> {
        config.validate()?;

        let account = ledger_account();
        let mut pool = LiquidityPool::new(owner, config.pool);
        let authorized = pool.authorize(&owner, account)?;
        let ledger = MortgageLedger::new(owner, account, config.ledger);

        info!("protocol initialized: owner {}, ledger account {}", owner, account);

        Ok(Self {
            world: RefCell::new(World {
                pool,
                ledger,
                registry,
            }),
            guard: ReentrancyGuard::new(),
            journal: RefCell::new(vec![authorized.into()]),
        })
    }

    fn execute<T>(
        &self,
        op: &'static str,
        held: &[Resource],
        transfer: Option<&dyn ValueTransfer>,
        transition: impl FnOnce(&mut World<R>) -> ProtocolResult<(T, Outcome)>,
    ) -> ProtocolResult<T> {
        let _entered = self.guard.enter_all(held).map_err(|e| {
            warn!("{} refused: {}", op, e);
            e
        })?;
        let snapshot = self.world.borrow().snapshot(held);

        let mut world = self.world.borrow_mut();
        let result = transition(&mut *world);
        // the push below may call back in, so nothing stays borrowed
        drop(world);

        let (value, outcome) = match result {
            Ok(done) => done,
            Err(e) => {
                self.world.borrow_mut().restore(snapshot);
                warn!("{} rolled back: {}", op, e);
                return Err(e);
            }
        };

        let position = self.journal.borrow().len();
        if let Some(payout) = outcome.payout {
            let pushed = match transfer {
                Some(channel) => channel.push(&payout.to, payout.amount),
                None => Err(TransferError::Rejected {
                    to: payout.to,
                    amount: payout.amount,
                    reason: "no transfer channel".into(),
                }),
            };
            if let Err(e) = pushed {
                self.world.borrow_mut().restore(snapshot);
                warn!("{} rolled back: {}", op, e);
                return Err(e.into());
            }
            debug!("{} pushed {} to {}", op, payout.amount, payout.to);
        }

        info!("{} committed with {} events", op, outcome.events.len());
        for event in &outcome.events {
            debug!("{}: {:?}", op, event);
        }
        // anything journaled during the push came after this transition
        let mut journal = self.journal.borrow_mut();
        let at = position.min(journal.len());
        let later = journal.split_off(at);
        journal.extend(outcome.events);
        journal.extend(later);

        Ok(value)
    }

    // === liquidity ===

    pub fn deposit_liquidity(
        &self,
        depositor: AccountId,
        amount: Amount,
        now: Timestamp,
    ) -> ProtocolResult<Shares> {
        self.execute("deposit_liquidity", &[Resource::Pool], None, |w| {
            let (shares, event) = w.pool.deposit(depositor, amount, now)?;
            Ok((shares, Outcome::with_event(event)))
        })
    }

    /// burn `shares` and push their value to the depositor
    pub fn withdraw_liquidity(
        &self,
        depositor: AccountId,
        shares: Shares,
        transfer: &dyn ValueTransfer,
    ) -> ProtocolResult<Amount> {
        self.execute("withdraw_liquidity", &[Resource::Pool], Some(transfer), |w| {
            let (payout, event) = w.pool.withdraw(depositor, shares)?;
            let mut outcome = Outcome::with_event(event);
            outcome.payout = Some(payout);
            Ok((payout.amount, outcome))
        })
    }

    pub fn authorize(&self, caller: &AccountId, target: AccountId) -> ProtocolResult<()> {
        self.execute("authorize", &[Resource::Pool], None, |w| {
            let event = w.pool.authorize(caller, target)?;
            Ok(((), Outcome::with_event(event)))
        })
    }

    pub fn revoke(&self, caller: &AccountId, target: AccountId) -> ProtocolResult<()> {
        self.execute("revoke", &[Resource::Pool], None, |w| {
            let event = w.pool.revoke(caller, target)?;
            Ok(((), Outcome::with_event(event)))
        })
    }

    /// lend pool capital directly on behalf of an authorized caller
    pub fn fund_loan(
        &self,
        caller: &AccountId,
        borrower: AccountId,
        amount: Amount,
        transfer: &dyn ValueTransfer,
    ) -> ProtocolResult<()> {
        self.execute("fund_loan", &[Resource::Pool], Some(transfer), |w| {
            let (payout, event) = w.pool.fund_loan(caller, borrower, amount)?;
            let mut outcome = Outcome::with_event(event);
            outcome.payout = Some(payout);
            Ok(((), outcome))
        })
    }

    pub fn receive_repayment(
        &self,
        caller: &AccountId,
        principal: Amount,
        interest: Amount,
        paid: Amount,
    ) -> ProtocolResult<()> {
        self.execute("receive_repayment", &[Resource::Pool], None, |w| {
            let event = w.pool.receive_repayment(caller, principal, interest, paid)?;
            Ok(((), Outcome::with_event(event)))
        })
    }

    pub fn cover_default(&self, caller: &AccountId, amount: Amount) -> ProtocolResult<()> {
        self.execute("cover_default", &[Resource::Pool], None, |w| {
            let event = w.pool.cover_default(caller, amount)?;
            Ok(((), Outcome::with_event(event)))
        })
    }

    // === mortgages ===

    /// finance `asset` for `borrower`, pushing the principal to them
    ///
    /// returns the loan as it stands once active
    #[allow(clippy::too_many_arguments)]
    pub fn apply_for_loan(
        &self,
        borrower: AccountId,
        asset: PropertyId,
        down_payment: Amount,
        term_months: u32,
        now: Timestamp,
        transfer: &dyn ValueTransfer,
    ) -> ProtocolResult<LoanRecord> {
        let held = [Resource::Ledger, Resource::Pool, Resource::Loan(asset)];
        self.execute("apply_for_loan", &held, Some(transfer), |w| {
            let World {
                pool,
                ledger,
                registry,
            } = w;
            let outcome = ledger.apply_for_loan(
                pool,
                registry,
                borrower,
                asset,
                down_payment,
                term_months,
                now,
            )?;
            let record = *ledger.loan(asset).ok_or(LedgerError::LoanNotFound(asset))?;
            Ok((record, outcome))
        })
    }

    /// take an installment from `borrower`; returns the updated loan
    pub fn make_payment(
        &self,
        borrower: &AccountId,
        asset: PropertyId,
        paid: Amount,
        now: Timestamp,
    ) -> ProtocolResult<LoanRecord> {
        let held = [Resource::Pool, Resource::Loan(asset)];
        self.execute("make_payment", &held, None, |w| {
            let outcome = w.ledger.make_payment(&mut w.pool, borrower, asset, paid, now)?;
            let record = *w.ledger.loan(asset).ok_or(LedgerError::LoanNotFound(asset))?;
            Ok((record, outcome))
        })
    }

    /// declare a default if the loan has gone silent too long
    pub fn check_default(&self, asset: PropertyId, now: Timestamp) -> ProtocolResult<bool> {
        let held = [Resource::Pool, Resource::Loan(asset)];
        self.execute("check_default", &held, None, |w| {
            let World {
                pool,
                ledger,
                registry,
            } = w;
            Ok(ledger.check_default(pool, registry, asset, now)?)
        })
    }

    pub fn set_base_rate(&self, caller: &AccountId, rate_bps: Bps) -> ProtocolResult<()> {
        self.execute("set_base_rate", &[Resource::Ledger], None, |w| {
            let outcome = w.ledger.set_base_rate(caller, rate_bps)?;
            Ok(((), outcome))
        })
    }

    // === views ===

    pub fn pool(&self) -> Ref<'_, LiquidityPool> {
        Ref::map(self.world.borrow(), |w| &w.pool)
    }

    pub fn ledger(&self) -> Ref<'_, MortgageLedger> {
        Ref::map(self.world.borrow(), |w| &w.ledger)
    }

    pub fn registry(&self) -> Ref<'_, R> {
        Ref::map(self.world.borrow(), |w| &w.registry)
    }

    pub fn pool_state(&self) -> PoolState {
        *self.pool().state()
    }

    pub fn share_value(&self, depositor: &AccountId) -> ProtocolResult<Amount> {
        Ok(self.pool().share_value(depositor)?)
    }

    pub fn available_liquidity(&self) -> Amount {
        self.pool().available_liquidity()
    }

    pub fn estimated_yield_bps(&self) -> Bps {
        self.pool().estimated_yield_bps()
    }

    pub fn realized_yield_bps(&self) -> ProtocolResult<Bps> {
        Ok(self.pool().realized_yield_bps()?)
    }

    pub fn loan(&self, asset: PropertyId) -> Option<LoanRecord> {
        self.ledger().loan(asset).copied()
    }

    pub fn status_of(&self, asset: PropertyId) -> LoanStatus {
        self.ledger().status_of(asset)
    }

    pub fn ownership_percentage(&self, asset: PropertyId) -> Option<u32> {
        self.ledger().ownership_percentage(asset)
    }

    pub fn loans_of(&self, borrower: &AccountId) -> Vec<PropertyId> {
        self.ledger().loans_of(borrower).to_vec()
    }

    pub fn is_payment_overdue(&self, asset: PropertyId, now: Timestamp) -> bool {
        self.ledger().is_payment_overdue(asset, now)
    }

    pub fn amount_due(&self, asset: PropertyId, now: Timestamp) -> ProtocolResult<Amount> {
        Ok(self.ledger().amount_due(asset, now)?)
    }

    pub fn remaining_balance(&self, asset: PropertyId) -> ProtocolResult<Amount> {
        Ok(self.ledger().remaining_balance(asset)?)
    }

    /// no operation is in flight
    pub fn is_idle(&self) -> bool {
        self.guard.is_idle()
    }

    // === journal ===

    /// committed events, oldest first
    pub fn events(&self) -> Vec<ProtocolEvent> {
        self.journal.borrow().clone()
    }

    /// drain the journal
    pub fn take_events(&self) -> Vec<ProtocolEvent> {
        std::mem::take(&mut *self.journal.borrow_mut())
    }

    pub fn events_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&*self.journal.borrow())
    }
}
