use super::money::{Cents, percent_change, percent_of};
use super::types::{GiPhase, GiSummary, GiYearRow, LifetimeWealth, ProjectionSummary, YearRow};

pub fn net_legacy(row: &YearRow, heir_tax_rate: f64) -> Cents {
    row.traditional_balance - percent_of(row.traditional_balance, heir_tax_rate)
        + row.roth_balance
        + row.taxable_balance
}

pub fn after_tax_cash(row: &YearRow) -> Cents {
    row.withdrawal + row.guaranteed_income - row.total_tax
}

pub fn cumulative_wealth(rows: &[YearRow], heir_tax_rate: f64) -> Vec<Cents> {
    rows.iter()
        .scan(0, |flows, row| {
            *flows += after_tax_cash(row) - row.irmaa_surcharge;
            Some(net_legacy(row, heir_tax_rate) + *flows)
        })
        .collect()
}

/// First age at which the strategy's cumulative wealth strictly exceeds the baseline's.
pub fn calculate_break_even_age(
    baseline: &[YearRow],
    strategy: &[YearRow],
    heir_tax_rate: f64,
) -> Option<u32> {
    let base = cumulative_wealth(baseline, heir_tax_rate);
    let strat = cumulative_wealth(strategy, heir_tax_rate);
    strategy
        .iter()
        .zip(strat.iter().zip(&base))
        .find(|(_, (s, b))| s > b)
        .map(|(row, _)| row.age)
}

pub fn calculate_tax_savings(baseline: &[YearRow], strategy: &[YearRow]) -> Cents {
    let total = |rows: &[YearRow]| rows.iter().map(|r| r.total_tax).sum::<Cents>();
    total(baseline) - total(strategy)
}

pub fn calculate_irmaa_savings(baseline: &[YearRow], strategy: &[YearRow]) -> Cents {
    let total = |rows: &[YearRow]| rows.iter().map(|r| r.irmaa_surcharge).sum::<Cents>();
    total(baseline) - total(strategy)
}

fn final_net_legacy(rows: &[YearRow], heir_tax_rate: f64) -> Cents {
    rows.last().map_or(0, |r| net_legacy(r, heir_tax_rate))
}

pub fn calculate_heir_benefit(
    baseline: &[YearRow],
    strategy: &[YearRow],
    heir_tax_rate: f64,
) -> Cents {
    final_net_legacy(strategy, heir_tax_rate) - final_net_legacy(baseline, heir_tax_rate)
}

pub fn calculate_lifetime_wealth(
    baseline: &[YearRow],
    strategy: &[YearRow],
    heir_tax_rate: f64,
) -> LifetimeWealth {
    let last = |rows: &[YearRow]| {
        cumulative_wealth(rows, heir_tax_rate)
            .last()
            .copied()
            .unwrap_or(0)
    };
    let baseline = last(baseline);
    let strategy = last(strategy);
    LifetimeWealth {
        baseline,
        strategy,
        improvement_percent: percent_change(baseline, strategy),
    }
}

pub fn summarize_gi(gi_rows: &[GiYearRow], baseline: &[YearRow]) -> GiSummary {
    let income_base_at_start = gi_rows
        .iter()
        .find(|r| r.phase == GiPhase::Purchase)
        .map_or(0, |r| r.income_base);
    let first_income = gi_rows.iter().find(|r| r.phase == GiPhase::Income);
    let income_base_at_income_age = first_income.map_or_else(
        || gi_rows.last().map_or(0, |r| r.income_base),
        |r| r.income_base,
    );

    let baseline_paid = baseline.iter().filter(|r| r.withdrawal > 0);
    let baseline_started = baseline.iter().any(|r| r.withdrawal > 0);

    GiSummary {
        income_base_at_start,
        income_base_at_income_age,
        roll_up_growth: income_base_at_income_age - income_base_at_start,
        income_start_age: first_income.map(|r| r.age),
        annual_gross_income: first_income.map_or(0, |r| r.gross_payment),
        total_gross_paid: gi_rows.iter().map(|r| r.gross_payment).sum(),
        total_net_paid: gi_rows.iter().map(|r| r.net_payment).sum(),
        depletion_age: gi_rows.iter().find(|r| r.depleted).map(|r| r.age),
        baseline_total_gross: baseline_paid.clone().map(|r| r.withdrawal).sum(),
        baseline_total_net: baseline_paid.map(after_tax_cash).sum(),
        baseline_depletion_age: baseline
            .iter()
            .find(|r| baseline_started && r.traditional_balance == 0)
            .map(|r| r.age),
    }
}

pub fn summarize(
    baseline: &[YearRow],
    strategy: &[YearRow],
    gi_rows: Option<&[GiYearRow]>,
    heir_tax_rate: f64,
) -> ProjectionSummary {
    ProjectionSummary {
        break_even_age: calculate_break_even_age(baseline, strategy, heir_tax_rate),
        total_tax_savings: calculate_tax_savings(baseline, strategy),
        total_irmaa_savings: calculate_irmaa_savings(baseline, strategy),
        heir_benefit: calculate_heir_benefit(baseline, strategy, heir_tax_rate),
        baseline_net_legacy: final_net_legacy(baseline, heir_tax_rate),
        strategy_net_legacy: final_net_legacy(strategy, heir_tax_rate),
        lifetime_wealth: calculate_lifetime_wealth(baseline, strategy, heir_tax_rate),
        gi: gi_rows.map(|rows| summarize_gi(rows, baseline)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::money::dollars;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    fn row(age: u32, traditional: Cents, roth: Cents) -> YearRow {
        YearRow {
            year: 2026 + age - 62,
            age,
            traditional_balance: traditional,
            roth_balance: roth,
            ..YearRow::default()
        }
    }

    // Baseline nets 68,000 every year; strategy Roth climbs 1,000 a year from 56,000.
    fn crossing_fixture() -> (Vec<YearRow>, Vec<YearRow>) {
        let baseline = (62..=85).map(|age| row(age, dollars(100_000), 0)).collect();
        let strategy = (62..=85)
            .map(|age| row(age, 0, dollars(56_000 + 1_000 * i64::from(age - 62))))
            .collect();
        (baseline, strategy)
    }

    #[test]
    fn net_legacy_taxes_only_traditional() {
        let mut r = row(70, dollars(100_000), dollars(50_000));
        r.taxable_balance = dollars(10_000);
        assert_eq!(net_legacy(&r, 32.0), dollars(128_000));
        assert_eq!(net_legacy(&r, 0.0), dollars(160_000));
    }

    #[test]
    fn break_even_is_first_strict_crossing() {
        let (baseline, strategy) = crossing_fixture();
        // equal at 74, ahead from 75
        assert_eq!(calculate_break_even_age(&baseline, &strategy, 32.0), Some(75));
        assert_eq!(calculate_break_even_age(&strategy, &baseline, 32.0), Some(62));
        assert_eq!(calculate_break_even_age(&baseline, &baseline, 32.0), None);
    }

    #[test]
    fn break_even_counts_cash_paid_out_along_the_way() {
        let baseline = (62..=70).map(|age| row(age, dollars(100_000), 0)).collect::<Vec<_>>();
        let mut strategy = baseline.clone();
        strategy[3].guaranteed_income = dollars(1_000);
        strategy[3].total_tax = dollars(240);
        assert_eq!(calculate_break_even_age(&baseline, &strategy, 32.0), Some(65));

        let mut taxed = baseline.clone();
        taxed[0].total_tax = dollars(5_000);
        taxed[0].conversion = dollars(5_000);
        assert_eq!(calculate_break_even_age(&baseline, &taxed, 32.0), None);
    }

    #[test]
    fn savings_and_heir_benefit_are_signed_differences() {
        let (mut baseline, mut strategy) = crossing_fixture();
        strategy[0].total_tax = dollars(20_000);
        baseline[10].total_tax = dollars(5_000);
        baseline[12].irmaa_surcharge = dollars(2_000);
        assert_eq!(calculate_tax_savings(&baseline, &strategy), dollars(-15_000));
        assert_eq!(calculate_irmaa_savings(&baseline, &strategy), dollars(2_000));
        // strategy ends with 79,000 Roth, baseline nets 68,000
        assert_eq!(calculate_heir_benefit(&baseline, &strategy, 32.0), dollars(11_000));
    }

    #[test]
    fn lifetime_wealth_reports_improvement_and_guards_zero_base() {
        let (baseline, strategy) = crossing_fixture();
        let wealth = calculate_lifetime_wealth(&baseline, &strategy, 32.0);
        assert_eq!(wealth.baseline, dollars(68_000));
        assert_eq!(wealth.strategy, dollars(79_000));
        assert!((wealth.improvement_percent - 1_100.0 / 68.0).abs() < 1e-9);

        let empty = calculate_lifetime_wealth(&[], &strategy, 32.0);
        assert_eq!(empty.baseline, 0);
        assert_eq!(empty.improvement_percent, 0.0);
    }

    #[test]
    fn gi_summary_reads_phase_rows() {
        let gi_row = |age: u32, phase: GiPhase, income_base: Cents, gross: Cents, depleted: bool| GiYearRow {
            year: 2026 + age - 60,
            age,
            phase,
            income_base,
            roll_up_rate: 0.0,
            rider_fee: 0,
            account_value: if depleted { 0 } else { dollars(1) },
            gross_payment: gross,
            net_payment: gross - gross / 4,
            depleted,
        };
        let rows = vec![
            gi_row(60, GiPhase::Purchase, dollars(600_000), 0, false),
            gi_row(61, GiPhase::Deferral, dollars(642_000), 0, false),
            gi_row(62, GiPhase::Income, dollars(642_000), dollars(40_000), false),
            gi_row(63, GiPhase::Income, dollars(642_000), dollars(40_000), true),
        ];
        let mut baseline = (60..=63).map(|age| row(age, dollars(50_000), 0)).collect::<Vec<_>>();
        baseline[2].withdrawal = dollars(30_000);
        baseline[2].total_tax = dollars(7_200);
        baseline[3].withdrawal = dollars(20_000);
        baseline[3].total_tax = dollars(4_800);
        baseline[3].traditional_balance = 0;

        let gi = summarize_gi(&rows, &baseline);
        assert_eq!(gi.income_base_at_start, dollars(600_000));
        assert_eq!(gi.income_base_at_income_age, dollars(642_000));
        assert_eq!(gi.roll_up_growth, dollars(42_000));
        assert_eq!(gi.income_start_age, Some(62));
        assert_eq!(gi.annual_gross_income, dollars(40_000));
        assert_eq!(gi.total_gross_paid, dollars(80_000));
        assert_eq!(gi.total_net_paid, dollars(60_000));
        assert_eq!(gi.depletion_age, Some(63));
        assert_eq!(gi.baseline_total_gross, dollars(50_000));
        assert_eq!(gi.baseline_total_net, dollars(38_000));
        assert_eq!(gi.baseline_depletion_age, Some(63));
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_summary_is_antisymmetric(
            balances in proptest::collection::vec((0i64..100_000_000, 0i64..100_000_000, 0i64..5_000_000), 1..30),
            heir in 0.0f64..50.0,
        ) {
            let baseline = balances.iter().enumerate()
                .map(|(i, (t, _, tax))| YearRow { total_tax: *tax, ..row(62 + i as u32, *t, 0) })
                .collect::<Vec<_>>();
            let strategy = balances.iter().enumerate()
                .map(|(i, (_, r, _))| row(62 + i as u32, 0, *r))
                .collect::<Vec<_>>();

            prop_assert_eq!(
                calculate_tax_savings(&baseline, &strategy),
                -calculate_tax_savings(&strategy, &baseline)
            );
            prop_assert_eq!(
                calculate_heir_benefit(&baseline, &strategy, heir),
                -calculate_heir_benefit(&strategy, &baseline, heir)
            );
            prop_assert!(calculate_tax_savings(&baseline, &strategy) >= 0);
            if let Some(age) = calculate_break_even_age(&baseline, &strategy, heir) {
                prop_assert!((62..62 + balances.len() as u32).contains(&age));
            }
        }
    }
}
