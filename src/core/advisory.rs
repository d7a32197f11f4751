use serde::{Deserialize, Serialize};

use super::engine::{check_amount, validate_household};
use super::error::{EngineError, EngineResult};
use super::irmaa::{calculate_irmaa_headroom, get_irmaa_tier};
use super::money::{Cents, percent_of};
use super::scenario::ProjectionContext;
use super::tax::{IncomeComponents, MEDICARE_AGE, compute_year_tax, net_investment_income_tax};
use super::tax_tables::{
    aca_applicable_percentage, federal_poverty_level, get_bracket_ceiling, get_standard_deduction,
};
use super::types::{HouseholdProfile, ProductSelection, TaxMode};

fn default_target_rate() -> f64 {
    22.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisoryRequest {
    pub household_profile: HouseholdProfile,
    pub year: u32,
    #[serde(default = "default_target_rate")]
    pub target_rate: f64,
    #[serde(default)]
    pub planned_conversion: Cents,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionAdvice {
    pub year: u32,
    pub target_rate: f64,
    pub bracket_ceiling: Cents,
    pub taxable_income_before: Cents,
    pub conversion_room: Cents,
    pub magi_before: Cents,
    pub planned_magi: Cents,
    pub irmaa_tier: u8,
    pub irmaa_surcharge: Cents,
    pub irmaa_headroom: Option<Cents>,
    pub on_medicare: bool,
    pub optimized_conversion_cap: Cents,
    pub net_investment_income_tax: Cents,
    pub aca_expected_contribution: Option<Cents>,
}

pub fn advise(request: &AdvisoryRequest) -> EngineResult<ConversionAdvice> {
    let h = &request.household_profile;
    validate_household(h)?;
    if !request.target_rate.is_finite() || request.target_rate <= 0.0 {
        return Err(EngineError::invalid("targetRate must be > 0"));
    }
    check_amount("plannedConversion", request.planned_conversion)?;

    let selection = ProductSelection::default();
    let ctx = ProjectionContext::new(h, &selection, request.year, request.year);
    let outside = ctx.outside_income(0);
    let mut tax_ctx = ctx.tax_context(0);
    tax_ctx.tax_mode = TaxMode::Brackets;

    let before_income = IncomeComponents {
        ordinary: outside.taxable,
        social_security: outside.social_security,
        tax_exempt: outside.tax_exempt,
    };
    let before = compute_year_tax(&before_income, &tax_ctx);
    let planned = compute_year_tax(
        &IncomeComponents {
            ordinary: outside.taxable + request.planned_conversion,
            ..before_income
        },
        &tax_ctx,
    );

    let status = h.filing_status;
    let bracket_ceiling = get_bracket_ceiling(status, request.target_rate, request.year);
    let deduction = get_standard_deduction(status, h.age, h.spouse_age, request.year);
    // Unused deduction counts as room. Ignores Social Security becoming taxable.
    let conversion_room = bracket_ceiling
        .saturating_sub(before.agi - deduction)
        .max(0);

    let is_joint = status.is_joint();
    let on_medicare = h.age >= MEDICARE_AGE
        || (is_joint && h.spouse_age.is_some_and(|a| a >= MEDICARE_AGE));
    let tier = get_irmaa_tier(planned.magi, is_joint, request.year);

    let optimized_conversion_cap = if on_medicare {
        calculate_irmaa_headroom(before.magi, is_joint, request.year)
            .map_or(conversion_room, |headroom| conversion_room.min((headroom - 1).max(0)))
    } else {
        conversion_room
    };

    let investment_income = percent_of(h.taxable_balance, h.taxable_growth_rate).max(0);
    let niit =
        net_investment_income_tax(planned.magi + investment_income, investment_income, status);

    let aca_expected_contribution = if on_medicare {
        None
    } else {
        let household_size = if status.is_married() { 2 } else { 1 };
        let fpl = federal_poverty_level(household_size);
        let fpl_percent = planned.magi as f64 / fpl as f64 * 100.0;
        aca_applicable_percentage(fpl_percent).map(|pct| percent_of(planned.magi, pct))
    };

    Ok(ConversionAdvice {
        year: request.year,
        target_rate: request.target_rate,
        bracket_ceiling,
        taxable_income_before: before.taxable_income,
        conversion_room,
        magi_before: before.magi,
        planned_magi: planned.magi,
        irmaa_tier: tier.tier,
        irmaa_surcharge: tier.annual_surcharge,
        irmaa_headroom: calculate_irmaa_headroom(planned.magi, is_joint, request.year),
        on_medicare,
        optimized_conversion_cap,
        net_investment_income_tax: niit,
        aca_expected_contribution,
    })
}
