//! Domain workflows: equity-side vesting and eligibility, lending-side
//! reservation, quoting, and the loan application lifecycle.

pub mod equity;
pub mod lending;
pub mod money;
pub mod policy;
