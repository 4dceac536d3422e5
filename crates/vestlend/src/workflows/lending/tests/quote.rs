use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::common::*;
use crate::workflows::equity::GrantId;
use crate::workflows::lending::quote::{
    build_quote, quote_options, resolve_selection, validate_selection,
};
use crate::workflows::lending::reservation::AllocationLine;
use crate::workflows::lending::{QuoteError, ShareSelection};
use crate::workflows::policy::{InterestType, LendingPolicy, RepaymentMethod};

fn single_line(shares: u64, price: Decimal) -> Vec<AllocationLine> {
    vec![AllocationLine {
        grant_id: GrantId::generate(),
        shares,
        exercise_price: price,
        observed_reserved: 0,
    }]
}

#[test]
fn fixed_twelve_month_quote_matches_the_reference_figures() {
    let quote = build_quote(
        &single_line(4000, dec!(2.50)),
        &LendingPolicy::standard(),
        InterestType::Fixed,
        RepaymentMethod::PrincipalAndInterest,
        12,
    )
    .expect("quote builds");

    assert_eq!(quote.purchase_price, dec!(10000.00));
    assert_eq!(quote.down_payment, Decimal::ZERO);
    assert_eq!(quote.principal, dec!(10000.00));
    assert_eq!(quote.annual_rate_percent, dec!(6.0));
    assert_eq!(quote.periodic_payment, dec!(860.66));
    assert_eq!(quote.total_payable, dec!(10327.92));
    assert_eq!(quote.total_interest, dec!(327.92));
}

#[test]
fn balloon_quote_charges_flat_interest_only_payments() {
    let quote = build_quote(
        &single_line(4000, dec!(2.50)),
        &LendingPolicy::standard(),
        InterestType::Fixed,
        RepaymentMethod::Balloon,
        12,
    )
    .expect("quote builds");

    assert_eq!(quote.periodic_payment, dec!(50.00));
    assert_eq!(quote.total_interest, dec!(600.00));
    assert_eq!(quote.total_payable, dec!(10600.00));
}

#[test]
fn variable_rate_adds_the_margin_to_the_base() {
    let mut policy = LendingPolicy::standard();
    policy.variable_base_rate_annual_percent = dec!(5.25);
    policy.variable_margin_annual_percent = dec!(1.25);

    let quote = build_quote(
        &single_line(100, dec!(10.00)),
        &policy,
        InterestType::Variable,
        RepaymentMethod::Balloon,
        12,
    )
    .expect("quote builds");

    assert_eq!(quote.annual_rate_percent, dec!(6.50));
}

#[test]
fn down_payment_reduces_the_financed_principal() {
    let mut policy = LendingPolicy::standard();
    policy.require_down_payment = true;
    policy.down_payment_percent = dec!(20);

    let quote = build_quote(
        &single_line(4000, dec!(2.50)),
        &policy,
        InterestType::Fixed,
        RepaymentMethod::PrincipalAndInterest,
        12,
    )
    .expect("quote builds");

    assert_eq!(quote.purchase_price, dec!(10000.00));
    assert_eq!(quote.down_payment, dec!(2000.00));
    assert_eq!(quote.principal, dec!(8000.00));
    assert_eq!(quote.periodic_payment, dec!(688.53));
}

#[test]
fn zero_rate_splits_principal_into_equal_slices() {
    let mut policy = LendingPolicy::standard();
    policy.fixed_interest_rate_annual_percent = Decimal::ZERO;

    let quote = build_quote(
        &single_line(4800, dec!(2.50)),
        &policy,
        InterestType::Fixed,
        RepaymentMethod::PrincipalAndInterest,
        12,
    )
    .expect("quote builds");

    assert_eq!(quote.periodic_payment, dec!(1000.00));
    assert_eq!(quote.total_interest, Decimal::ZERO);
    assert_eq!(quote.total_payable, dec!(12000.00));
}

#[test]
fn each_line_is_priced_at_its_own_strike() {
    let lines = vec![
        AllocationLine {
            grant_id: GrantId::generate(),
            shares: 600,
            exercise_price: dec!(2.50),
            observed_reserved: 0,
        },
        AllocationLine {
            grant_id: GrantId::generate(),
            shares: 100,
            exercise_price: dec!(10.00),
            observed_reserved: 0,
        },
    ];

    let quote = build_quote(
        &lines,
        &LendingPolicy::standard(),
        InterestType::Fixed,
        RepaymentMethod::Balloon,
        12,
    )
    .expect("quote builds");

    assert_eq!(quote.share_count, 700);
    assert_eq!(quote.lines[0].cost, dec!(1500.00));
    assert_eq!(quote.lines[1].cost, dec!(1000.00));
    assert_eq!(quote.purchase_price, dec!(2500.00));
}

#[test]
fn term_outside_policy_bounds_is_rejected() {
    let result = build_quote(
        &single_line(100, dec!(2.50)),
        &LendingPolicy::standard(),
        InterestType::Fixed,
        RepaymentMethod::PrincipalAndInterest,
        3,
    );

    assert_eq!(
        result,
        Err(QuoteError::TermOutOfRange {
            months: 3,
            min: 6,
            max: 60,
        })
    );
}

#[test]
fn repayment_method_not_offered_by_policy_is_rejected() {
    let mut policy = LendingPolicy::standard();
    policy.allowed_repayment_methods = vec![RepaymentMethod::PrincipalAndInterest];

    let result = build_quote(
        &single_line(100, dec!(2.50)),
        &policy,
        InterestType::Fixed,
        RepaymentMethod::Balloon,
        12,
    );

    assert_eq!(
        result,
        Err(QuoteError::RepaymentMethodNotAllowed(
            RepaymentMethod::Balloon
        ))
    );
}

#[test]
fn percent_selection_floors_to_whole_shares() {
    let selection = ShareSelection::Percent { percent: dec!(33) };
    assert_eq!(resolve_selection(selection, 1000), Ok(330));
}

#[test]
fn percent_rounding_to_zero_shares_is_an_empty_selection() {
    let selection = ShareSelection::Percent {
        percent: dec!(0.05),
    };
    assert_eq!(
        resolve_selection(selection, 1000),
        Err(QuoteError::EmptySelection)
    );
}

#[test]
fn percent_outside_the_unit_range_is_rejected() {
    let too_high = ShareSelection::Percent {
        percent: dec!(150),
    };
    assert_eq!(
        validate_selection(too_high),
        Err(QuoteError::PercentOutOfRange(dec!(150)))
    );

    let zero = ShareSelection::Percent {
        percent: Decimal::ZERO,
    };
    assert_eq!(
        validate_selection(zero),
        Err(QuoteError::PercentOutOfRange(Decimal::ZERO))
    );
}

#[test]
fn zero_share_selection_is_rejected_up_front() {
    assert_eq!(
        validate_selection(ShareSelection::Shares { count: 0 }),
        Err(QuoteError::EmptySelection)
    );
}

#[test]
fn quote_options_cover_every_allowed_combination() {
    let options = quote_options(
        &single_line(100, dec!(2.50)),
        &LendingPolicy::standard(),
        12,
    );

    assert_eq!(options.len(), 4);
    let mut combinations: Vec<(&str, &str)> = options
        .iter()
        .map(|quote| (quote.interest_type.label(), quote.repayment_method.label()))
        .collect();
    combinations.sort_unstable();
    assert_eq!(
        combinations,
        vec![
            ("FIXED", "BALLOON"),
            ("FIXED", "PRINCIPAL_AND_INTEREST"),
            ("VARIABLE", "BALLOON"),
            ("VARIABLE", "PRINCIPAL_AND_INTEREST"),
        ]
    );
}

#[test]
fn quote_options_skip_combinations_the_policy_forbids() {
    let mut policy = LendingPolicy::standard();
    policy.allowed_interest_types = vec![InterestType::Fixed];

    let options = quote_options(&single_line(100, dec!(2.50)), &policy, 12);
    assert_eq!(options.len(), 2);
    assert!(options
        .iter()
        .all(|quote| quote.interest_type == InterestType::Fixed));
}

#[test]
fn preview_prices_the_borrowers_actual_grant_book() {
    let harness = harness();
    let preview = harness
        .service
        .quote_preview(harness.membership.id, shares_terms(700), as_of())
        .expect("preview");

    assert_eq!(preview.quote.purchase_price, dec!(2500.00));
    assert_eq!(preview.requested_shares, 700);
    assert_eq!(preview.available_shares, 1000);
}
