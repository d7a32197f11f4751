use tracing::info;

use super::error::{EngineError, EngineResult};
use super::money::Cents;
use super::products::{
    IncomeRider, ProductConfig, RollUpSchedule, find_product, find_roll_up_option,
};
use super::scenario::ProjectionContext;
use super::summary::summarize;
use super::tax_tables::state_tax_schedule;
use super::types::{
    HouseholdProfile, PayoutOption, ProductFamily, ProductSelection, ProjectionRequest,
    SimulationResult,
};
use super::{growth, guaranteed_income};

const MAX_AGE: u32 = 120;
const MAX_INPUT_CENTS: Cents = 1_000_000_000_000_000;
// Headroom under `i64::MAX` for sums across both trajectories.
const MAX_PROJECTED_CENTS: f64 = 1e17;

fn check_rate(name: &str, value: f64, min: f64, max: f64) -> EngineResult<()> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(EngineError::invalid(format!("{name} must be between {min} and {max}")))
    }
}

pub(crate) fn check_amount(name: &str, value: Cents) -> EngineResult<()> {
    if (0..=MAX_INPUT_CENTS).contains(&value) {
        Ok(())
    } else {
        Err(EngineError::invalid(format!(
            "{name} must be between 0 and {MAX_INPUT_CENTS} cents"
        )))
    }
}

fn check_growth_rate(name: &str, value: f64) -> EngineResult<()> {
    check_rate(name, value, -99.0, 100.0)
}

pub(crate) fn validate_household(h: &HouseholdProfile) -> EngineResult<()> {
    if h.age > MAX_AGE || h.end_age > MAX_AGE {
        return Err(EngineError::invalid(format!("ages must be at most {MAX_AGE}")));
    }
    if h.end_age <= h.age {
        return Err(EngineError::invalid("endAge must be > age"));
    }
    if h.spouse_age.is_some_and(|a| a > MAX_AGE) {
        return Err(EngineError::invalid(format!("spouseAge must be at most {MAX_AGE}")));
    }
    check_amount("account balances", h.traditional_balance)?;
    check_amount("account balances", h.roth_balance)?;
    check_amount("account balances", h.taxable_balance)?;
    let streams = [h.social_security, h.spouse_social_security, h.pension];
    for stream in streams.iter().flatten() {
        check_amount("income stream amounts", stream.annual_amount)?;
    }
    for entry in &h.other_income {
        check_amount("otherIncome amounts", entry.taxable)?;
        check_amount("otherIncome amounts", entry.tax_exempt)?;
    }
    check_rate("federalTaxRate", h.federal_tax_rate, 0.0, 100.0)?;
    check_rate("stateTaxRate", h.state_tax_rate, 0.0, 100.0)?;
    check_rate("heirTaxRate", h.heir_tax_rate, 0.0, 100.0)?;
    check_growth_rate("baselineGrowthRate", h.baseline_growth_rate)?;
    check_growth_rate("taxableGrowthRate", h.taxable_growth_rate)?;
    if state_tax_schedule(&h.state).is_none() {
        return Err(EngineError::UnknownState(h.state.clone()));
    }
    Ok(())
}

fn validate_selection(
    h: &HouseholdProfile,
    sel: &ProductSelection,
    product: &ProductConfig,
    years: u32,
) -> EngineResult<()> {
    check_amount("fixedConversionAmount", sel.fixed_conversion_amount)?;
    if let Some(rate) = sel.growth_rate {
        check_growth_rate("growthRate", rate)?;
    }
    if let Some(rate) = sel.roth_growth_rate {
        check_growth_rate("rothGrowthRate", rate)?;
    }
    if sel.conversion_end_age.is_some_and(|a| a < h.age) {
        return Err(EngineError::invalid("conversionEndAge must be >= age"));
    }
    if product.family == ProductFamily::Growth {
        return Ok(());
    }

    if sel.conversion_years >= years {
        return Err(EngineError::invalid(
            "conversionYears must leave at least one year for the annuity purchase",
        ));
    }
    if sel.income_start_age.is_some_and(|a| a > MAX_AGE) {
        return Err(EngineError::invalid(format!("incomeStartAge must be at most {MAX_AGE}")));
    }
    let rider = product.income_rider.as_ref().ok_or_else(|| {
        EngineError::invalid(format!("product {} has no income rider", product.id))
    })?;
    if sel.payout_option == PayoutOption::Increasing && rider.increasing.is_none() {
        return Err(EngineError::UnsupportedPayoutOption {
            product_id: product.id.clone(),
            option: sel.payout_option,
        });
    }
    if let Some(option) = sel.roll_up_option.as_deref() {
        if find_roll_up_option(product, Some(option)).is_none() {
            return Err(EngineError::UnknownRollUpOption {
                product_id: product.id.clone(),
                option: option.to_string(),
            });
        }
    }
    Ok(())
}

pub fn validate_request(request: &ProjectionRequest) -> EngineResult<&'static ProductConfig> {
    let h = &request.household_profile;
    if request.end_year <= request.start_year {
        return Err(EngineError::invalid("endYear must be > startYear"));
    }
    validate_household(h)?;
    if request.end_year - request.start_year != h.end_age - h.age {
        return Err(EngineError::invalid("endYear - startYear must equal endAge - age"));
    }

    let sel = &request.product_config;
    let product = find_product(&sel.product_id)
        .ok_or_else(|| EngineError::UnknownProduct(sel.product_id.clone()))?;
    let years = request.end_year - request.start_year + 1;
    validate_selection(h, sel, product, years)?;
    check_envelope(h, sel, product, years)?;
    Ok(product)
}

fn roll_up_rates(rider: &IncomeRider) -> impl Iterator<Item = f64> + '_ {
    rider
        .roll_up_options
        .iter()
        .flat_map(|option| match &option.schedule {
            RollUpSchedule::Flat(rate) => vec![*rate],
            RollUpSchedule::Tiered(tiers) => tiers.iter().map(|t| t.rate).collect(),
        })
}

fn projection_envelope(
    h: &HouseholdProfile,
    sel: &ProductSelection,
    product: &ProductConfig,
    years: u32,
) -> f64 {
    let credited = sel.growth_rate.unwrap_or(product.credited_rate);
    let mut rates = vec![h.baseline_growth_rate, h.taxable_growth_rate, credited];
    rates.extend(sel.roth_growth_rate);
    if let Some(rider) = product.income_rider.as_ref() {
        rates.push(rider.increasing_step_up);
        rates.extend(roll_up_rates(rider));
    }
    let max_rate = rates.into_iter().fold(0.0, f64::max);
    let bonus_factor: f64 = product
        .bonuses
        .iter()
        .map(|b| 1.0 + b.percent.max(0.0) / 100.0)
        .product();

    let streams = [h.social_security, h.spouse_social_security, h.pension];
    let annual: f64 = streams.iter().flatten().map(|s| s.annual_amount as f64).sum();
    let one_off: f64 = h
        .other_income
        .iter()
        .map(|e| e.taxable as f64 + e.tax_exempt as f64)
        .sum();
    let start = (h.traditional_balance + h.roth_balance + h.taxable_balance) as f64
        + annual * f64::from(years)
        + one_off;

    let compounded = (1.0 + max_rate / 100.0).powi(years as i32);
    start * bonus_factor * compounded * f64::from(years + 1)
}

fn check_envelope(
    h: &HouseholdProfile,
    sel: &ProductSelection,
    product: &ProductConfig,
    years: u32,
) -> EngineResult<()> {
    let envelope = projection_envelope(h, sel, product, years);
    if envelope.is_finite() && envelope <= MAX_PROJECTED_CENTS {
        Ok(())
    } else {
        Err(EngineError::invalid(
            "balances, growth rates and horizon would push the projection past the \
             representable range",
        ))
    }
}

pub fn run_projection(request: &ProjectionRequest) -> EngineResult<SimulationResult> {
    let product = validate_request(request)?;
    let h = &request.household_profile;
    let ctx = ProjectionContext::new(
        h,
        &request.product_config,
        request.start_year,
        request.end_year,
    );

    let (baseline_years, strategy_years, gi_yearly_data) = match product.family {
        ProductFamily::Growth => (
            growth::run_baseline(&ctx),
            growth::run_strategy(&ctx, product),
            None,
        ),
        ProductFamily::GuaranteedIncome => {
            let (strategy, gi_rows) = guaranteed_income::run_strategy(&ctx, product);
            (
                guaranteed_income::run_baseline(&ctx, product),
                strategy,
                Some(gi_rows),
            )
        }
    };

    let summary = summarize(
        &baseline_years,
        &strategy_years,
        gi_yearly_data.as_deref(),
        h.heir_tax_rate,
    );
    info!(
        product = %product.id,
        family = ?product.family,
        years = ctx.years(),
        break_even_age = ?summary.break_even_age,
        heir_benefit = summary.heir_benefit,
        "projection complete"
    );

    Ok(SimulationResult {
        family: product.family,
        product_id: product.id.clone(),
        baseline_years,
        strategy_years,
        gi_yearly_data,
        summary,
    })
}
