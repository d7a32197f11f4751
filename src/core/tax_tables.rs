use serde::Serialize;

use super::money::{Cents, dollars, index_dollars};
use super::types::FilingStatus;

pub const TAX_TABLE_BASE_YEAR: u32 = 2026;
pub const TAX_INDEXING_RATE: f64 = 3.0;

/// One marginal bracket. `upper` is exclusive; the top bracket uses `i64::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bracket {
    pub lower: Cents,
    pub upper: Cents,
    pub rate: f64,
}

// Lower thresholds in whole dollars for the base year.
const FEDERAL_SINGLE: [(i64, f64); 7] = [
    (0, 10.0),
    (12_400, 12.0),
    (50_400, 22.0),
    (105_700, 24.0),
    (201_775, 32.0),
    (256_225, 35.0),
    (640_600, 37.0),
];

const FEDERAL_JOINT: [(i64, f64); 7] = [
    (0, 10.0),
    (24_800, 12.0),
    (100_800, 22.0),
    (211_400, 24.0),
    (403_550, 32.0),
    (512_450, 35.0),
    (768_700, 37.0),
];

const FEDERAL_SEPARATE: [(i64, f64); 7] = [
    (0, 10.0),
    (12_400, 12.0),
    (50_400, 22.0),
    (105_700, 24.0),
    (201_775, 32.0),
    (256_225, 35.0),
    (384_350, 37.0),
];

const FEDERAL_HEAD_OF_HOUSEHOLD: [(i64, f64); 7] = [
    (0, 10.0),
    (17_700, 12.0),
    (67_450, 22.0),
    (105_700, 24.0),
    (201_750, 32.0),
    (256_200, 35.0),
    (640_600, 37.0),
];

fn years_past_base(year: u32) -> u32 {
    year.saturating_sub(TAX_TABLE_BASE_YEAR)
}

fn build_brackets(table: &[(i64, f64)], year: u32, threshold_multiplier: i64) -> Vec<Bracket> {
    let years = years_past_base(year);
    let lowers = table
        .iter()
        .map(|&(lower, _)| index_dollars(lower * threshold_multiplier, TAX_INDEXING_RATE, years))
        .collect::<Vec<_>>();

    table
        .iter()
        .enumerate()
        .map(|(idx, &(_, rate))| Bracket {
            lower: lowers[idx],
            upper: lowers.get(idx + 1).copied().unwrap_or(i64::MAX),
            rate,
        })
        .collect()
}

pub fn get_federal_brackets(year: u32, filing_status: FilingStatus) -> Vec<Bracket> {
    let table: &[(i64, f64)] = match filing_status {
        FilingStatus::Single => &FEDERAL_SINGLE,
        FilingStatus::MarriedFilingJointly => &FEDERAL_JOINT,
        FilingStatus::MarriedFilingSeparately => &FEDERAL_SEPARATE,
        FilingStatus::HeadOfHousehold => &FEDERAL_HEAD_OF_HOUSEHOLD,
    };
    build_brackets(table, year, 1)
}

pub fn get_bracket_ceiling(filing_status: FilingStatus, target_rate: f64, year: u32) -> Cents {
    let brackets = get_federal_brackets(year, filing_status);
    if let Some(bracket) = brackets.iter().find(|b| b.rate == target_rate) {
        return bracket.upper;
    }

    let fallback = brackets
        .iter()
        .filter(|b| b.rate < target_rate)
        .next_back()
        .or_else(|| brackets.first());
    table_gap!(
        table = "federal_brackets",
        target_rate,
        year,
        "no bracket at requested rate, using nearest lower bracket"
    );
    fallback.map(|b| b.upper).unwrap_or(0)
}

pub fn tax_from_brackets(taxable_income: Cents, brackets: &[Bracket]) -> Cents {
    if taxable_income <= 0 {
        return 0;
    }
    brackets
        .iter()
        .map(|b| {
            let slice = taxable_income.min(b.upper) - taxable_income.min(b.lower);
            super::money::percent_of(slice.max(0), b.rate)
        })
        .sum()
}

pub fn get_standard_deduction(
    filing_status: FilingStatus,
    age: u32,
    spouse_age: Option<u32>,
    year: u32,
) -> Cents {
    let (base, additional) = match filing_status {
        FilingStatus::Single => (16_100, 2_050),
        FilingStatus::HeadOfHousehold => (24_150, 2_050),
        FilingStatus::MarriedFilingJointly => (32_200, 1_650),
        FilingStatus::MarriedFilingSeparately => (16_100, 1_650),
    };

    let mut seniors = i64::from(age >= 65);
    if filing_status.is_married() && spouse_age.is_some_and(|a| a >= 65) {
        seniors += 1;
    }

    index_dollars(base + additional * seniors, TAX_INDEXING_RATE, years_past_base(year))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StateTaxSchedule {
    NoIncomeTax,
    Flat(f64),
    Progressive(&'static [(i64, f64)]),
}

const CA: [(i64, f64); 9] = [
    (0, 1.0),
    (10_756, 2.0),
    (25_499, 4.0),
    (40_245, 6.0),
    (55_866, 8.0),
    (70_606, 9.3),
    (360_659, 10.3),
    (432_787, 11.3),
    (721_314, 12.3),
];
const NY: [(i64, f64); 9] = [
    (0, 4.0),
    (8_500, 4.5),
    (11_700, 5.25),
    (13_900, 5.5),
    (80_650, 6.0),
    (215_400, 6.85),
    (1_077_550, 9.65),
    (5_000_000, 10.3),
    (25_000_000, 10.9),
];
const NJ: [(i64, f64); 7] = [
    (0, 1.4),
    (20_000, 1.75),
    (35_000, 3.5),
    (40_000, 5.525),
    (75_000, 6.37),
    (500_000, 8.97),
    (1_000_000, 10.75),
];
const OR: [(i64, f64); 4] = [(0, 4.75), (4_400, 6.75), (11_050, 8.75), (125_000, 9.9)];
const MN: [(i64, f64); 4] = [(0, 5.35), (32_570, 6.8), (106_990, 7.85), (198_630, 9.85)];
const VA: [(i64, f64); 4] = [(0, 2.0), (3_000, 3.0), (5_000, 5.0), (17_000, 5.75)];
const MD: [(i64, f64); 8] = [
    (0, 2.0),
    (1_000, 3.0),
    (2_000, 4.0),
    (3_000, 4.75),
    (100_000, 5.0),
    (125_000, 5.25),
    (150_000, 5.5),
    (250_000, 5.75),
];
const OH: [(i64, f64); 3] = [(0, 0.0), (26_050, 2.75), (100_000, 3.5)];
const WI: [(i64, f64); 4] = [(0, 3.5), (14_320, 4.4), (28_640, 5.3), (315_310, 7.65)];
const CT: [(i64, f64); 7] = [
    (0, 2.0),
    (10_000, 4.5),
    (50_000, 5.5),
    (100_000, 6.0),
    (200_000, 6.5),
    (250_000, 6.9),
    (500_000, 6.99),
];

pub fn state_tax_schedule(code: &str) -> Option<StateTaxSchedule> {
    use StateTaxSchedule::{Flat, NoIncomeTax, Progressive};

    let code = code.trim().to_ascii_uppercase();
    let schedule = match code.as_str() {
        "AK" | "FL" | "NV" | "NH" | "SD" | "TN" | "TX" | "WA" | "WY" => NoIncomeTax,
        "CA" => Progressive(&CA),
        "NY" => Progressive(&NY),
        "NJ" => Progressive(&NJ),
        "OR" => Progressive(&OR),
        "MN" => Progressive(&MN),
        "VA" => Progressive(&VA),
        "MD" => Progressive(&MD),
        "OH" => Progressive(&OH),
        "WI" => Progressive(&WI),
        "CT" => Progressive(&CT),
        "AZ" => Flat(2.5),
        "CO" => Flat(4.4),
        "GA" => Flat(5.19),
        "ID" => Flat(5.3),
        "IL" => Flat(4.95),
        "IN" => Flat(3.0),
        "IA" => Flat(3.8),
        "KY" => Flat(4.0),
        "LA" => Flat(3.0),
        "MA" => Flat(5.0),
        "MI" => Flat(4.25),
        "MS" => Flat(4.4),
        "NC" => Flat(4.25),
        "PA" => Flat(3.07),
        "UT" => Flat(4.55),
        "AL" => Flat(5.0),
        "AR" => Flat(3.9),
        "DE" => Flat(6.6),
        "DC" => Flat(8.5),
        "HI" => Flat(7.9),
        "KS" => Flat(5.58),
        "ME" => Flat(7.15),
        "MO" => Flat(4.7),
        "MT" => Flat(5.9),
        "NE" => Flat(5.2),
        "NM" => Flat(4.9),
        "ND" => Flat(1.95),
        "OK" => Flat(4.75),
        "RI" => Flat(4.75),
        "SC" => Flat(6.2),
        "VT" => Flat(6.6),
        "WV" => Flat(4.82),
        _ => return None,
    };
    Some(schedule)
}

pub fn get_state_brackets(state: &str, filing_status: FilingStatus, year: u32) -> Vec<Bracket> {
    let flat = |rate| {
        vec![Bracket {
            lower: 0,
            upper: i64::MAX,
            rate,
        }]
    };

    match state_tax_schedule(state) {
        Some(StateTaxSchedule::NoIncomeTax) => flat(0.0),
        Some(StateTaxSchedule::Flat(rate)) => flat(rate),
        Some(StateTaxSchedule::Progressive(table)) => {
            let multiplier = if filing_status.is_joint() { 2 } else { 1 };
            build_brackets(table, year, multiplier)
        }
        None => {
            table_gap!(table = "state_brackets", state, "unknown state, applying no state tax");
            flat(0.0)
        }
    }
}

const ACA_APPLICABLE_PERCENTAGE: [(f64, f64, f64, f64); 6] = [
    (0.0, 133.0, 2.10, 2.10),
    (133.0, 150.0, 3.14, 4.19),
    (150.0, 200.0, 4.19, 6.60),
    (200.0, 250.0, 6.60, 8.44),
    (250.0, 300.0, 8.44, 9.96),
    (300.0, 400.0, 9.96, 9.96),
];

pub fn aca_applicable_percentage(fpl_percent: f64) -> Option<f64> {
    if !fpl_percent.is_finite() || fpl_percent < 0.0 {
        return None;
    }
    ACA_APPLICABLE_PERCENTAGE
        .iter()
        .find(|&&(lower, upper, _, _)| fpl_percent >= lower && fpl_percent < upper)
        .map(|&(lower, upper, start, end)| {
            let w = (fpl_percent - lower) / (upper - lower);
            start + (end - start) * w
        })
}

pub fn federal_poverty_level(household_size: u32) -> Cents {
    let extra = i64::from(household_size.max(1) - 1);
    dollars(15_650 + 5_500 * extra)
}
