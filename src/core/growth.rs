use tracing::debug;

use super::money::{Cents, grow, percent_of};
use super::products::{BonusTiming, ProductConfig, resolve_bonus, resolve_surrender_charge};
use super::scenario::{ProjectionContext, apply_tax, conversion_amount, finish_balances};
use super::types::{HouseholdProfile, YearRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrowthState {
    pub year_index: u32,
    pub traditional: Cents,
    pub roth: Cents,
    pub taxable: Cents,
}

impl GrowthState {
    pub fn initial(household: &HouseholdProfile) -> Self {
        Self {
            year_index: 0,
            traditional: household.traditional_balance,
            roth: household.roth_balance,
            taxable: household.taxable_balance,
        }
    }
}

fn bonus_timing(year_index: u32) -> BonusTiming {
    if year_index == 0 {
        BonusTiming::Issue
    } else {
        BonusTiming::Anniversary(year_index)
    }
}

pub fn step_baseline(ctx: &ProjectionContext<'_>, state: GrowthState) -> (GrowthState, YearRow) {
    let h = ctx.household;
    let idx = state.year_index;

    let traditional = grow(state.traditional, h.baseline_growth_rate);
    let roth = grow(state.roth, h.baseline_growth_rate);
    let taxable = grow(state.taxable, h.taxable_growth_rate);

    let mut row = ctx.row_template(idx);
    row.beginning_traditional = state.traditional;
    apply_tax(&mut row, &ctx.attributable_tax(idx, 0));
    finish_balances(&mut row, traditional, roth, taxable);

    let next = GrowthState {
        year_index: idx + 1,
        traditional,
        roth,
        taxable,
    };
    (next, row)
}

pub fn step_strategy(
    ctx: &ProjectionContext<'_>,
    product: &ProductConfig,
    state: GrowthState,
) -> (GrowthState, YearRow) {
    let h = ctx.household;
    let sel = ctx.selection;
    let idx = state.year_index;
    let growth_rate = sel.growth_rate.unwrap_or(product.credited_rate);
    let roth_rate = sel.roth_growth_rate.unwrap_or(growth_rate);

    // The contract holds both buckets; a bonus credits each in proportion to what it holds.
    let bonus = resolve_bonus(product, bonus_timing(idx));
    let beginning = grow(state.traditional, bonus);
    let beginning_roth = grow(state.roth, bonus);

    let mut traditional = grow(beginning, growth_rate);
    let mut roth = grow(beginning_roth, roth_rate);
    let taxable = grow(state.taxable, h.taxable_growth_rate);

    let conversion = if ctx.in_conversion_window(idx) {
        conversion_amount(sel, traditional, None)
    } else {
        0
    };
    traditional -= conversion;
    roth += conversion;

    let mut row = ctx.row_template(idx);
    row.beginning_traditional = beginning;
    row.conversion = conversion;
    apply_tax(&mut row, &ctx.attributable_tax(idx, conversion));
    row.surrender_charge = percent_of(traditional + roth, resolve_surrender_charge(product, idx));
    finish_balances(&mut row, traditional, roth, taxable);

    if conversion > 0 && traditional == 0 {
        debug!(year = row.year, age = row.age, "traditional balance fully converted");
    }

    let next = GrowthState {
        year_index: idx + 1,
        traditional,
        roth,
        taxable,
    };
    (next, row)
}

fn fold_years(
    ctx: &ProjectionContext<'_>,
    step: impl Fn(GrowthState) -> (GrowthState, YearRow),
) -> Vec<YearRow> {
    let initial = GrowthState::initial(ctx.household);
    let (_, rows) = (0..ctx.years()).fold(
        (initial, Vec::with_capacity(ctx.years() as usize)),
        |(state, mut rows), _| {
            let (next, row) = step(state);
            rows.push(row);
            (next, rows)
        },
    );
    rows
}

pub fn run_baseline(ctx: &ProjectionContext<'_>) -> Vec<YearRow> {
    fold_years(ctx, |state| step_baseline(ctx, state))
}

pub fn run_strategy(ctx: &ProjectionContext<'_>, product: &ProductConfig) -> Vec<YearRow> {
    fold_years(ctx, |state| step_strategy(ctx, product, state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::money::dollars;
    use crate::core::products::find_product;
    use crate::core::scenario::fixtures;
    use crate::core::types::{ConversionType, ProductSelection, TaxMode};
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    fn selection() -> ProductSelection {
        ProductSelection {
            product_id: "summit-growth-10".to_string(),
            conversion_type: ConversionType::FullConversion,
            growth_rate: Some(7.0),
            ..ProductSelection::default()
        }
    }

    fn product() -> &'static ProductConfig {
        find_product("summit-growth-10").expect("catalog product")
    }

    #[test]
    fn first_strategy_year_applies_bonus_growth_and_full_conversion() {
        let h = fixtures::household();
        let sel = selection();
        let ctx = ProjectionContext::new(&h, &sel, 2026, 2049);
        let rows = run_strategy(&ctx, product());
        let first = &rows[0];

        assert_eq!(first.beginning_traditional, dollars(550_000));
        assert_eq!(first.conversion, dollars(588_500));
        assert_eq!(first.federal_tax, dollars(141_240));
        assert_eq!(first.state_tax, 0);
        assert_eq!(first.total_tax, dollars(141_240));
        assert_eq!(first.roth_balance, dollars(588_500));
        assert_eq!(first.traditional_balance, 0);
        assert_eq!(first.surrender_charge, dollars(58_850));
    }

    #[test]
    fn fully_converted_balance_stays_zero() {
        let h = fixtures::household();
        let sel = selection();
        let ctx = ProjectionContext::new(&h, &sel, 2026, 2049);
        let rows = run_strategy(&ctx, product());
        assert_eq!(rows.len(), 24);
        for row in &rows[1..] {
            assert_eq!(row.conversion, 0);
            assert_eq!(row.traditional_balance, 0);
            assert_eq!(row.total_tax, 0);
        }
        assert_eq!(rows[1].roth_balance, grow(dollars(588_500), 7.0));
    }

    #[test]
    fn baseline_grows_without_tax_or_conversion() {
        let h = fixtures::household();
        let sel = selection();
        let ctx = ProjectionContext::new(&h, &sel, 2026, 2049);
        let rows = run_baseline(&ctx);
        assert_eq!(rows[0].traditional_balance, dollars(535_000));
        assert_eq!(rows[0].beginning_traditional, dollars(500_000));
        assert_eq!(rows[1].traditional_balance, dollars(572_450));
        assert!(rows.iter().all(|r| r.conversion == 0 && r.total_tax == 0));
    }

    #[test]
    fn fixed_amount_conversion_is_capped_and_deferred() {
        let mut h = fixtures::household();
        h.tax_mode = TaxMode::Brackets;
        let sel = ProductSelection {
            conversion_type: ConversionType::FixedAmount,
            fixed_conversion_amount: dollars(100_000),
            deferral_years: 1,
            conversion_end_age: Some(70),
            ..selection()
        };
        let ctx = ProjectionContext::new(&h, &sel, 2026, 2049);
        let rows = run_strategy(&ctx, product());
        assert_eq!(rows[0].conversion, 0);
        assert_eq!(rows[0].total_tax, 0);
        assert_eq!(rows[1].conversion, dollars(100_000));
        assert!(rows[1].federal_tax > 0);
        // conversions stop after age 70
        assert!(rows.iter().filter(|r| r.age > 70).all(|r| r.conversion == 0));
        let converted: Cents = rows.iter().map(|r| r.conversion).sum();
        assert!(converted > 0);
    }

    #[test]
    fn anniversary_bonus_applies_in_its_contract_year() {
        let h = fixtures::household();
        let sel = ProductSelection {
            product_id: "summit-growth-7-plus".to_string(),
            conversion_type: ConversionType::NoConversion,
            growth_rate: Some(0.0),
            ..ProductSelection::default()
        };
        let p = find_product("summit-growth-7-plus").expect("catalog product");
        let ctx = ProjectionContext::new(&h, &sel, 2026, 2049);
        let rows = run_strategy(&ctx, p);
        assert_eq!(rows[0].traditional_balance, dollars(525_000));
        assert_eq!(rows[2].traditional_balance, dollars(525_000));
        assert_eq!(rows[3].traditional_balance, dollars(540_750));
    }

    #[test]
    fn anniversary_bonus_follows_the_contract_after_conversion() {
        let h = fixtures::household();
        let sel = ProductSelection {
            product_id: "summit-growth-7-plus".to_string(),
            conversion_type: ConversionType::FullConversion,
            growth_rate: Some(0.0),
            ..ProductSelection::default()
        };
        let p = find_product("summit-growth-7-plus").expect("catalog product");
        let ctx = ProjectionContext::new(&h, &sel, 2026, 2049);
        let rows = run_strategy(&ctx, p);
        assert_eq!(rows[0].traditional_balance, 0);
        assert_eq!(rows[0].roth_balance, dollars(525_000));
        assert_eq!(rows[2].roth_balance, dollars(525_000));
        assert_eq!(rows[3].roth_balance, dollars(540_750));
        assert_eq!(rows[3].conversion, 0);
    }

    #[test]
    fn anniversary_bonus_splits_across_partially_converted_contract() {
        let h = fixtures::household();
        let sel = ProductSelection {
            product_id: "summit-growth-7-plus".to_string(),
            conversion_type: ConversionType::FixedAmount,
            fixed_conversion_amount: dollars(100_000),
            conversion_end_age: Some(62),
            growth_rate: Some(0.0),
            ..ProductSelection::default()
        };
        let p = find_product("summit-growth-7-plus").expect("catalog product");
        let ctx = ProjectionContext::new(&h, &sel, 2026, 2049);
        let rows = run_strategy(&ctx, p);
        assert_eq!(rows[2].traditional_balance, dollars(425_000));
        assert_eq!(rows[2].roth_balance, dollars(100_000));
        assert_eq!(rows[3].traditional_balance, dollars(437_750));
        assert_eq!(rows[3].roth_balance, dollars(103_000));
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(32))]

        #[test]
        fn prop_growth_rows_are_non_negative_and_aligned(
            traditional in 0i64..500_000_000,
            roth in 0i64..100_000_000,
            age in 50u32..75,
            span in 1u32..30,
            rate_bp in -500i32..1200,
            fixed in 0i64..50_000_000,
            fixed_mode in proptest::bool::ANY,
        ) {
            let mut h = fixtures::household();
            h.traditional_balance = traditional;
            h.roth_balance = roth;
            h.age = age;
            h.end_age = age + span;
            h.tax_mode = TaxMode::Brackets;
            let sel = ProductSelection {
                conversion_type: if fixed_mode { ConversionType::FixedAmount } else { ConversionType::OptimizedAmount },
                fixed_conversion_amount: fixed,
                growth_rate: Some(rate_bp as f64 / 100.0),
                ..selection()
            };
            let ctx = ProjectionContext::new(&h, &sel, 2026, 2026 + span);
            let baseline = run_baseline(&ctx);
            let strategy = run_strategy(&ctx, product());

            prop_assert_eq!(baseline.len(), (span + 1) as usize);
            prop_assert_eq!(strategy.len(), baseline.len());
            for row in baseline.iter().chain(&strategy) {
                prop_assert!(row.traditional_balance >= 0);
                prop_assert!(row.roth_balance >= 0);
                prop_assert!(row.total_tax >= 0);
            }
            for row in &baseline {
                prop_assert_eq!(row.conversion, 0);
                prop_assert_eq!(row.total_tax, 0);
            }
            prop_assert_eq!(strategy.clone(), run_strategy(&ctx, product()));
        }
    }
}
