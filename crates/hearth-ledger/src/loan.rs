//! loan records and the flat-rate payment schedule

use hearth_primitives::{
    mul_div, AccountId, Amount, ArithmeticError, Bps, Timestamp, BPS_DENOMINATOR, MAX_BPS,
};
use serde::{Deserialize, Serialize};

use crate::MONTHS_PER_YEAR;

/// per-asset loan state
///
/// `None` is the state of an asset that has never been financed; records are
/// never reset to it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoanStatus {
    #[default]
    None,
    Applied,
    Active,
    PaidOff,
    Defaulted,
    Foreclosed,
}

impl LoanStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoanStatus::PaidOff | LoanStatus::Foreclosed)
    }
}

/// one financed asset
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanRecord {
    pub borrower: AccountId,
    pub original_asset_value: Amount,
    pub down_payment: Amount,
    pub principal: Amount,
    pub annual_rate_bps: Bps,
    pub term_months: u32,
    pub monthly_payment: Amount,
    pub origination_time: Timestamp,
    pub last_payment_time: Timestamp,
    /// down payment plus every installment received
    pub cumulative_paid: Amount,
    /// borrower's share of the asset, 0..=10000
    pub ownership_bps: Bps,
    pub payments_made: u32,
    pub status: LoanStatus,
}

impl LoanRecord {
    /// installments received so far, excluding the down payment
    pub fn repaid(&self) -> Result<Amount, ArithmeticError> {
        self.cumulative_paid.try_sub(self.down_payment)
    }

    /// principal still owed, clamped at zero once installments exceed it
    pub fn outstanding(&self) -> Result<Amount, ArithmeticError> {
        Ok(self.principal.saturating_sub(self.repaid()?))
    }

    /// ownership in whole percent
    pub fn ownership_percentage(&self) -> u32 {
        self.ownership_bps.percent()
    }
}

/// flat-rate repayment plan
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Schedule {
    pub total_interest: Amount,
    pub monthly_payment: Amount,
}

/// simple interest on the original principal for the whole term, spread
/// evenly across the months
///
/// `total_interest = principal * rate * term / (10000 * 12)`,
/// `monthly = (principal + total_interest) / term`, both floored. this is
/// not an amortizing schedule.
pub fn flat_rate_schedule(
    principal: Amount,
    annual_rate: Bps,
    term_months: u32,
) -> Result<Schedule, ArithmeticError> {
    let rate_term = (annual_rate.0 as u128)
        .checked_mul(term_months as u128)
        .ok_or(ArithmeticError::Overflow)?;
    let total_interest = principal.mul_div(rate_term, BPS_DENOMINATOR * MONTHS_PER_YEAR)?;
    let monthly_payment = principal
        .try_add(total_interest)?
        .mul_div(1, term_months as u128)?;

    Ok(Schedule {
        total_interest,
        monthly_payment,
    })
}

/// interest for one month on `outstanding` at `annual_rate / 12`
///
/// the monthly rate is floored to whole basis points first
pub fn monthly_interest(outstanding: Amount, annual_rate: Bps) -> Result<Amount, ArithmeticError> {
    let monthly_rate = annual_rate.0 as u128 / MONTHS_PER_YEAR;
    outstanding.mul_div(monthly_rate, BPS_DENOMINATOR)
}

/// `min(10000, paid * 10000 / value)`
pub fn ownership_bps(cumulative_paid: Amount, asset_value: Amount) -> Result<Bps, ArithmeticError> {
    let bps = mul_div(cumulative_paid.0, BPS_DENOMINATOR, asset_value.0)?;
    Ok(Bps(bps.min(MAX_BPS.0 as u128) as u32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_schedule() {
        // 80 principal, 500 bps, 12 months
        let schedule = flat_rate_schedule(Amount::new(80), Bps(500), 12).unwrap();
        assert_eq!(schedule.total_interest, Amount::new(4));
        assert_eq!(schedule.monthly_payment, Amount::new(7));
    }

    #[test]
    fn test_schedule_is_flat_not_compound() {
        // 100_000 at 6% over 30 years: 180_000 simple interest
        let schedule = flat_rate_schedule(Amount::new(100_000), Bps(600), 360).unwrap();
        assert_eq!(schedule.total_interest, Amount::new(180_000));
        assert_eq!(schedule.monthly_payment, Amount::new(777));
    }

    #[test]
    fn test_zero_term_rejected() {
        assert_eq!(
            flat_rate_schedule(Amount::new(80), Bps(500), 0),
            Err(ArithmeticError::DivisionByZero)
        );
    }

    #[test]
    fn test_monthly_interest_floors_rate() {
        // 500 / 12 = 41 bps
        assert_eq!(monthly_interest(Amount::new(80), Bps(500)), Ok(Amount::ZERO));
        assert_eq!(monthly_interest(Amount::new(10_000), Bps(500)), Ok(Amount::new(41)));
    }

    #[test]
    fn test_ownership_caps_at_full() {
        assert_eq!(ownership_bps(Amount::new(27), Amount::new(100)), Ok(Bps(2700)));
        assert_eq!(ownership_bps(Amount::new(104), Amount::new(100)), Ok(Bps(10_000)));
    }

    #[test]
    fn test_outstanding_clamps() {
        let record = LoanRecord {
            borrower: AccountId::derive(b"borrower"),
            original_asset_value: Amount::new(100),
            down_payment: Amount::new(20),
            principal: Amount::new(80),
            annual_rate_bps: Bps(500),
            term_months: 12,
            monthly_payment: Amount::new(7),
            origination_time: Timestamp(0),
            last_payment_time: Timestamp(0),
            cumulative_paid: Amount::new(104),
            ownership_bps: Bps(10_000),
            payments_made: 12,
            status: LoanStatus::PaidOff,
        };
        assert_eq!(record.repaid(), Ok(Amount::new(84)));
        assert_eq!(record.outstanding(), Ok(Amount::ZERO));
        assert_eq!(record.ownership_percentage(), 100);
        assert!(record.status.is_terminal());
    }
}
