//! Mortgage Ledger - per-asset loan lifecycle
//!
//! Drives each financed asset through
//! `None → Applied → Active → {PaidOff | Defaulted → Foreclosed}`.
//!
//! Every transition checks everything it can before the first mutation.
//! Once the pool or the registry has been touched, a later collaborator
//! failure leaves the three stores out of step; the [`Protocol`] service
//! restores its snapshot in that case, so callers outside the service must
//! do the same.
//!
//! [`Protocol`]: crate::Protocol

use std::collections::BTreeMap;

use hearth_pool::LiquidityPool;
use hearth_primitives::{
    AccountId, Amount, ArithmeticError, Bps, PropertyId, Timestamp, BPS_DENOMINATOR, MAX_BPS,
};

use crate::loan::{monthly_interest, ownership_bps};
use crate::{
    flat_rate_schedule, LedgerConfig, LedgerError, LoanEvent, LoanRecord, LoanStatus, Outcome,
    PropertyRegistry, Result, LEDGER_ACCOUNT_LABEL,
};

/// identity the ledger uses toward the pool and the registry
pub fn ledger_account() -> AccountId {
    AccountId::derive(LEDGER_ACCOUNT_LABEL)
}

#[derive(Clone, Debug)]
pub struct MortgageLedger {
    /// may change the base rate
    owner: AccountId,
    /// caller identity presented to the pool and the registry
    account: AccountId,
    config: LedgerConfig,
    base_rate_bps: Bps,
    loans: BTreeMap<PropertyId, LoanRecord>,
    by_borrower: BTreeMap<AccountId, Vec<PropertyId>>,
}

impl MortgageLedger {
    pub fn new(owner: AccountId, account: AccountId, config: LedgerConfig) -> Self {
        Self {
            owner,
            account,
            base_rate_bps: config.initial_base_rate_bps,
            config,
            loans: BTreeMap::new(),
            by_borrower: BTreeMap::new(),
        }
    }

    pub fn owner(&self) -> &AccountId {
        &self.owner
    }

    pub fn account(&self) -> &AccountId {
        &self.account
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn base_rate_bps(&self) -> Bps {
        self.base_rate_bps
    }

    pub fn loan(&self, asset: PropertyId) -> Option<&LoanRecord> {
        self.loans.get(&asset)
    }

    pub fn loans(&self) -> impl Iterator<Item = (&PropertyId, &LoanRecord)> {
        self.loans.iter()
    }

    /// `None` for assets that were never financed
    pub fn status_of(&self, asset: PropertyId) -> LoanStatus {
        self.loans
            .get(&asset)
            .map(|l| l.status)
            .unwrap_or_default()
    }

    /// borrower ownership in whole percent
    pub fn ownership_percentage(&self, asset: PropertyId) -> Option<u32> {
        self.loans.get(&asset).map(|l| l.ownership_percentage())
    }

    /// assets ever financed by `borrower`, in application order
    pub fn loans_of(&self, borrower: &AccountId) -> &[PropertyId] {
        self.by_borrower
            .get(borrower)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// more than one payment interval since the last payment
    ///
    /// ignores the grace period, so a loan can be overdue without owing a
    /// late fee yet
    pub fn is_payment_overdue(&self, asset: PropertyId, now: Timestamp) -> bool {
        self.loans.get(&asset).map_or(false, |loan| {
            loan.status == LoanStatus::Active
                && now.elapsed_since(loan.last_payment_time) > self.config.payment_interval_secs
        })
    }

    /// installment plus late fee a payment at `now` must cover
    pub fn amount_due(&self, asset: PropertyId, now: Timestamp) -> Result<Amount> {
        let loan = self.active_loan(asset)?;
        let late_fee = self.late_fee(loan, now)?;
        Ok(loan.monthly_payment.try_add(late_fee)?)
    }

    /// principal still owed on a loan
    pub fn remaining_balance(&self, asset: PropertyId) -> Result<Amount> {
        let loan = self.loans.get(&asset).ok_or(LedgerError::LoanNotFound(asset))?;
        Ok(loan.outstanding()?)
    }

    fn active_loan(&self, asset: PropertyId) -> Result<&LoanRecord> {
        let loan = self.loans.get(&asset).ok_or(LedgerError::LoanNotFound(asset))?;
        if loan.status != LoanStatus::Active {
            return Err(LedgerError::LoanNotActive {
                asset,
                status: loan.status,
            });
        }
        Ok(loan)
    }

    fn late_fee(
        &self,
        loan: &LoanRecord,
        now: Timestamp,
    ) -> std::result::Result<Amount, ArithmeticError> {
        let threshold = self
            .config
            .payment_interval_secs
            .saturating_add(self.config.grace_period_secs);
        if now.elapsed_since(loan.last_payment_time) > threshold {
            loan.monthly_payment.apply_bps(self.config.late_fee_bps)
        } else {
            Ok(Amount::ZERO)
        }
    }

    /// smallest down payment that satisfies the minimum ratio, if `offered`
    /// falls short of it
    fn down_payment_shortfall(&self, value: Amount, offered: Amount) -> Result<Option<Amount>> {
        let min_bps = self.config.min_down_payment_bps.0 as u128;
        let offered_scaled = offered
            .0
            .checked_mul(BPS_DENOMINATOR)
            .ok_or(ArithmeticError::Overflow)?;
        let required_scaled = value.0.checked_mul(min_bps).ok_or(ArithmeticError::Overflow)?;

        if offered_scaled < required_scaled {
            Ok(Some(Amount(required_scaled.div_ceil(BPS_DENOMINATOR))))
        } else {
            Ok(None)
        }
    }

    /// finance a listed asset out of the pool
    ///
    /// the record is created `Applied` and moved to `Active` before this
    /// returns: principal is drawn from the pool for the borrower, custody
    /// moves to the borrower and the asset is unlisted. the returned outcome
    /// carries the principal payout.
    #[allow(clippy::too_many_arguments)]
    pub fn apply_for_loan<R: PropertyRegistry + ?Sized>(
        &mut self,
        pool: &mut LiquidityPool,
        registry: &mut R,
        borrower: AccountId,
        asset: PropertyId,
        down_payment: Amount,
        term_months: u32,
        now: Timestamp,
    ) -> Result<Outcome> {
        let status = self.status_of(asset);
        if status != LoanStatus::None {
            return Err(LedgerError::LoanAlreadyExists { asset, status });
        }

        let info = registry.asset(asset)?;
        if !info.is_listed {
            return Err(LedgerError::AssetNotListed(asset));
        }

        if term_months == 0 || term_months > self.config.max_term_months {
            return Err(LedgerError::InvalidTerm(term_months));
        }

        if let Some(required) = self.down_payment_shortfall(info.value, down_payment)? {
            return Err(LedgerError::DownPaymentTooLow {
                offered: down_payment,
                required,
            });
        }
        if down_payment >= info.value {
            return Err(LedgerError::InvalidAmount);
        }
        let principal = info.value.try_sub(down_payment)?;

        let rate = self.base_rate_bps;
        let schedule = flat_rate_schedule(principal, rate, term_months)?;
        if schedule.monthly_payment.is_zero() {
            return Err(LedgerError::InvalidTerm(term_months));
        }

        let available = pool.available_liquidity();
        if available < principal {
            return Err(LedgerError::InsufficientPoolLiquidity {
                required: principal,
                available,
            });
        }

        let mut record = LoanRecord {
            borrower,
            original_asset_value: info.value,
            down_payment,
            principal,
            annual_rate_bps: rate,
            term_months,
            monthly_payment: schedule.monthly_payment,
            origination_time: now,
            last_payment_time: now,
            cumulative_paid: down_payment,
            ownership_bps: ownership_bps(down_payment, info.value)?,
            payments_made: 0,
            status: LoanStatus::Applied,
        };

        let mut outcome = Outcome::with_event(LoanEvent::LoanApplied {
            asset,
            borrower,
            asset_value: info.value,
            down_payment,
            principal,
            annual_rate_bps: rate,
            term_months,
            monthly_payment: schedule.monthly_payment,
        });

        let (payout, funded) = pool.fund_loan(&self.account, borrower, principal)?;
        registry.transfer_custody(&self.account, &info.custodian, &borrower, asset)?;
        registry.unlist_asset(&self.account, asset)?;

        record.status = LoanStatus::Active;
        outcome.push(funded);
        outcome.push(LoanEvent::LoanActivated {
            asset,
            borrower,
            principal,
        });
        outcome.payout = Some(payout);

        self.loans.insert(asset, record);
        self.by_borrower.entry(borrower).or_default().push(asset);

        tracing::debug!(
            "{} financed for {}: principal {}, {} x {} at {}",
            asset,
            borrower,
            principal,
            term_months,
            schedule.monthly_payment,
            rate
        );

        Ok(outcome)
    }

    /// take one installment from the borrower
    ///
    /// interest is charged on the outstanding balance at a monthly rate of
    /// `annual / 12` bps; the rest of the payment is principal, capped at the
    /// outstanding balance with any excess credited as interest.
    pub fn make_payment(
        &mut self,
        pool: &mut LiquidityPool,
        caller: &AccountId,
        asset: PropertyId,
        paid: Amount,
        now: Timestamp,
    ) -> Result<Outcome> {
        let mut loan = *self.active_loan(asset)?;
        if caller != &loan.borrower {
            return Err(LedgerError::NotBorrower(*caller));
        }

        let late_fee = self.late_fee(&loan, now)?;
        let expected = loan.monthly_payment.try_add(late_fee)?;
        if paid < expected {
            return Err(LedgerError::InsufficientPayment { expected, paid });
        }

        let outstanding = loan.outstanding()?;
        let interest_due = monthly_interest(outstanding, loan.annual_rate_bps)?;
        let principal = paid.try_sub(interest_due)?.min(outstanding);
        let interest = paid.try_sub(principal)?;

        let cumulative_paid = loan.cumulative_paid.try_add(paid)?;
        let ownership = ownership_bps(cumulative_paid, loan.original_asset_value)?;
        let payments_made = loan
            .payments_made
            .checked_add(1)
            .ok_or(ArithmeticError::Overflow)?;

        let repaid = pool.receive_repayment(&self.account, principal, interest, paid)?;

        loan.cumulative_paid = cumulative_paid;
        loan.ownership_bps = ownership;
        loan.payments_made = payments_made;
        loan.last_payment_time = now;

        let mut outcome = Outcome::with_event(repaid);
        outcome.push(LoanEvent::PaymentReceived {
            asset,
            borrower: loan.borrower,
            amount: paid,
            principal,
            interest,
            late_fee,
            ownership_bps: ownership,
            payments_made,
        });

        if ownership >= MAX_BPS || payments_made >= loan.term_months {
            loan.status = LoanStatus::PaidOff;
            outcome.push(LoanEvent::LoanCompleted {
                asset,
                borrower: loan.borrower,
                total_paid: cumulative_paid,
            });
            tracing::debug!("{} paid off after {} payments", asset, payments_made);
        }

        self.loans.insert(asset, loan);
        Ok(outcome)
    }

    /// declare a default and foreclose if the borrower has been silent for
    /// longer than the default period
    ///
    /// anyone may call this. returns whether a default was declared; a loan
    /// that is not active or not yet past the window is left alone.
    pub fn check_default<R: PropertyRegistry + ?Sized>(
        &mut self,
        pool: &mut LiquidityPool,
        registry: &mut R,
        asset: PropertyId,
        now: Timestamp,
    ) -> Result<(bool, Outcome)> {
        let Some(mut loan) = self.loans.get(&asset).copied() else {
            return Ok((false, Outcome::new()));
        };
        if loan.status != LoanStatus::Active
            || now.elapsed_since(loan.last_payment_time) <= self.config.default_period_secs
        {
            return Ok((false, Outcome::new()));
        }

        let remaining_balance = loan.outstanding()?;
        let insurance_coverage = Amount(remaining_balance.0 / 2).min(pool.insurance_reserve());

        loan.status = LoanStatus::Defaulted;
        let mut outcome = Outcome::with_event(LoanEvent::LoanDefaulted {
            asset,
            borrower: loan.borrower,
            remaining_balance,
            insurance_coverage,
        });

        if !insurance_coverage.is_zero() {
            outcome.push(pool.cover_default(&self.account, insurance_coverage)?);
        }

        registry.transfer_custody(&self.account, &loan.borrower, &self.account, asset)?;
        registry.list_asset(&self.account, asset)?;

        loan.status = LoanStatus::Foreclosed;
        outcome.push(LoanEvent::LoanForeclosed {
            asset,
            borrower: loan.borrower,
        });

        self.loans.insert(asset, loan);

        tracing::debug!(
            "{} foreclosed: {} outstanding, {} covered by insurance",
            asset,
            remaining_balance,
            insurance_coverage
        );

        Ok((true, outcome))
    }

    /// rate applied to loans originated from now on
    pub fn set_base_rate(&mut self, caller: &AccountId, rate_bps: Bps) -> Result<Outcome> {
        if caller != &self.owner {
            return Err(LedgerError::NotOwner(*caller));
        }
        if rate_bps > self.config.max_base_rate_bps {
            return Err(LedgerError::RateTooHigh {
                requested: rate_bps,
                max: self.config.max_base_rate_bps,
            });
        }

        self.base_rate_bps = rate_bps;
        Ok(Outcome::with_event(LoanEvent::BaseRateUpdated { rate_bps }))
    }
}
