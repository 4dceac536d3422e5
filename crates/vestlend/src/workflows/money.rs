//! Fixed-point helpers shared by quoting, scheduling, and summaries. All
//! monetary arithmetic stays in `Decimal`; floating point never touches
//! money or share counts.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

/// Round to the currency's minor unit, half away from zero.
pub fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Nominal annual percentage to a monthly decimal rate (percent / 100 / 12).
pub fn monthly_rate(annual_percent: Decimal) -> Decimal {
    annual_percent / dec!(1200)
}

/// One cent, the tolerance for reconciling component splits.
pub fn cent() -> Decimal {
    dec!(0.01)
}
