use tracing::debug;

use super::money::{Cents, fraction_of, grow, percent_of};
use super::products::{
    BonusTiming, Compounding, FeeBasis, PayoutType, ProductConfig, get_payout_factor,
    get_roll_up_for_year, resolve_bonus_split, resolve_surrender_charge,
};
use super::scenario::{ProjectionContext, apply_tax, conversion_amount, finish_balances};
use super::types::{GiPhase, GiYearRow, PayoutOption, YearRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GiState {
    pub year_index: u32,
    pub phase: GiPhase,
    pub traditional: Cents,
    pub roth: Cents,
    pub taxable: Cents,
    pub income_base: Cents,
    pub purchase_income_base: Cents,
    pub account_value: Cents,
    pub annual_payment: Option<Cents>,
    pub depleted: bool,
}

impl GiState {
    pub fn initial(ctx: &ProjectionContext<'_>) -> Self {
        let h = ctx.household;
        Self {
            year_index: 0,
            phase: GiPhase::Conversion,
            traditional: h.traditional_balance,
            roth: h.roth_balance,
            taxable: h.taxable_balance,
            income_base: 0,
            purchase_income_base: 0,
            account_value: 0,
            annual_payment: None,
            depleted: false,
        }
    }
}

pub fn income_start_age(ctx: &ProjectionContext<'_>) -> u32 {
    ctx.selection
        .income_start_age
        .unwrap_or(ctx.household.age + ctx.selection.conversion_years + 1)
}

pub fn payout_type(ctx: &ProjectionContext<'_>) -> PayoutType {
    if ctx.household.filing_status.is_joint() && ctx.household.spouse_age.is_some() {
        PayoutType::Joint
    } else {
        PayoutType::Single
    }
}

pub fn phase_for(ctx: &ProjectionContext<'_>, year_index: u32) -> GiPhase {
    let purchase_index = ctx.selection.conversion_years;
    if year_index < purchase_index {
        GiPhase::Conversion
    } else if year_index == purchase_index {
        GiPhase::Purchase
    } else if ctx.age(year_index) < income_start_age(ctx) {
        GiPhase::Deferral
    } else {
        GiPhase::Income
    }
}

fn rider_fee(product: &ProductConfig, income_base: Cents, account_value: Cents) -> Cents {
    let Some(rider) = product.income_rider.as_ref() else {
        return 0;
    };
    let basis = match rider.rider_fee_basis {
        FeeBasis::IncomeBase => income_base,
        FeeBasis::AccountValue => account_value,
    };
    percent_of(basis, rider.rider_fee_rate).min(account_value).max(0)
}

pub fn step_strategy(
    ctx: &ProjectionContext<'_>,
    product: &ProductConfig,
    state: GiState,
) -> (GiState, YearRow, GiYearRow) {
    let h = ctx.household;
    let sel = ctx.selection;
    let idx = state.year_index;
    let phase = phase_for(ctx, idx);
    debug_assert!(phase >= state.phase, "phases never re-enter");
    if phase != state.phase || idx == 0 {
        debug!(year = ctx.year(idx), age = ctx.age(idx), ?phase, "entering phase");
    }

    let credited = sel.growth_rate.unwrap_or(product.credited_rate);
    let roth_rate = sel.roth_growth_rate.unwrap_or(h.baseline_growth_rate);
    let contract_year = idx.saturating_sub(sel.conversion_years);

    let mut next = GiState {
        year_index: idx + 1,
        phase,
        traditional: grow(state.traditional, h.baseline_growth_rate),
        taxable: grow(state.taxable, h.taxable_growth_rate),
        ..state
    };
    let mut row = ctx.row_template(idx);
    row.beginning_traditional = state.traditional;
    let mut roll_up_rate = 0.0;
    let mut fee = 0;
    let mut gross = 0;

    match phase {
        GiPhase::Conversion => {
            let remaining = sel.conversion_years - idx;
            let amount = conversion_amount(sel, next.traditional, Some(remaining));
            next.traditional -= amount;
            next.roth = grow(state.roth, roth_rate) + amount;
            row.conversion = amount;
            apply_tax(&mut row, &ctx.attributable_tax(idx, amount));
        }
        GiPhase::Purchase => {
            let premium = state.roth;
            let (ib_bonus, av_bonus) = resolve_bonus_split(product, BonusTiming::Issue);
            let income_base = grow(premium, ib_bonus);
            let account_value = grow(premium, av_bonus);
            fee = rider_fee(product, income_base, account_value);
            next.income_base = income_base;
            next.purchase_income_base = income_base;
            next.account_value = (grow(account_value, credited) - fee).max(0);
            next.roth = next.account_value;
            apply_tax(&mut row, &ctx.attributable_tax(idx, 0));
            debug!(premium, income_base, "annuity purchased");
        }
        GiPhase::Deferral => {
            let (ib_bonus, av_bonus) =
                resolve_bonus_split(product, BonusTiming::Anniversary(contract_year));
            let mut income_base = grow(state.income_base, ib_bonus);
            let account_value = grow(state.account_value, av_bonus);

            if let Some(roll_up) =
                get_roll_up_for_year(product, contract_year, sel.roll_up_option.as_deref())
            {
                roll_up_rate = roll_up.rate;
                income_base = match roll_up.compounding {
                    Compounding::Simple => {
                        income_base + percent_of(state.purchase_income_base, roll_up.rate)
                    }
                    Compounding::Compound => grow(income_base, roll_up.rate),
                };
            }

            fee = rider_fee(product, state.income_base, account_value);
            next.income_base = income_base.max(state.income_base);
            next.account_value = (grow(account_value, credited) - fee).max(0);
            next.roth = next.account_value;
            apply_tax(&mut row, &ctx.attributable_tax(idx, 0));
        }
        GiPhase::Income => {
            let payment = match state.annual_payment {
                None => {
                    let factor = get_payout_factor(
                        product,
                        payout_type(ctx),
                        ctx.age(idx),
                        sel.payout_option,
                    );
                    fraction_of(state.income_base, factor)
                }
                Some(previous) => match sel.payout_option {
                    PayoutOption::Level => previous,
                    PayoutOption::Increasing => {
                        let step_up = product
                            .income_rider
                            .as_ref()
                            .map_or(0.0, |r| r.increasing_step_up);
                        grow(previous, step_up)
                    }
                },
            };

            fee = if state.depleted {
                0
            } else {
                rider_fee(product, state.income_base, state.account_value)
            };
            gross = payment;
            next.annual_payment = Some(payment);
            next.account_value = (grow(state.account_value, credited) - fee - payment).max(0);
            next.roth = next.account_value;
            next.depleted = state.depleted || next.account_value == 0;
            if next.depleted && !state.depleted {
                debug!(age = ctx.age(idx), "account value depleted, guaranteed income continues");
            }

            row.guaranteed_income = payment;
            apply_tax(&mut row, &ctx.attributable_tax(idx, payment));
        }
    }

    if phase >= GiPhase::Purchase {
        row.surrender_charge = percent_of(
            next.account_value,
            resolve_surrender_charge(product, contract_year),
        );
    }
    finish_balances(&mut row, next.traditional, next.roth, next.taxable);

    let gi_row = GiYearRow {
        year: row.year,
        age: row.age,
        phase,
        income_base: next.income_base,
        roll_up_rate,
        rider_fee: fee,
        account_value: next.account_value,
        gross_payment: gross,
        net_payment: if gross > 0 { gross - row.total_tax } else { 0 },
        depleted: next.depleted,
    };
    (next, row, gi_row)
}

pub fn run_strategy(
    ctx: &ProjectionContext<'_>,
    product: &ProductConfig,
) -> (Vec<YearRow>, Vec<GiYearRow>) {
    let capacity = ctx.years() as usize;
    let mut rows = Vec::with_capacity(capacity);
    let mut gi_rows = Vec::with_capacity(capacity);
    let mut state = GiState::initial(ctx);
    for _ in 0..ctx.years() {
        let (next, row, gi_row) = step_strategy(ctx, product, state);
        rows.push(row);
        gi_rows.push(gi_row);
        state = next;
    }
    (rows, gi_rows)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawalState {
    pub year_index: u32,
    pub traditional: Cents,
    pub roth: Cents,
    pub taxable: Cents,
    pub annual_withdrawal: Option<Cents>,
}

pub fn step_baseline(
    ctx: &ProjectionContext<'_>,
    product: &ProductConfig,
    state: WithdrawalState,
) -> (WithdrawalState, YearRow) {
    let h = ctx.household;
    let idx = state.year_index;
    let age = ctx.age(idx);

    let mut traditional = grow(state.traditional, h.baseline_growth_rate);
    let roth = grow(state.roth, h.baseline_growth_rate);
    let taxable = grow(state.taxable, h.taxable_growth_rate);

    let mut annual_withdrawal = state.annual_withdrawal;
    let mut withdrawal = 0;
    if age >= income_start_age(ctx) {
        let planned = *annual_withdrawal.get_or_insert_with(|| {
            let factor = get_payout_factor(product, payout_type(ctx), age, PayoutOption::Level);
            fraction_of(traditional, factor)
        });
        withdrawal = planned.min(traditional).max(0);
        traditional -= withdrawal;
    }

    let mut row = ctx.row_template(idx);
    row.beginning_traditional = state.traditional;
    row.withdrawal = withdrawal;
    apply_tax(&mut row, &ctx.attributable_tax(idx, withdrawal));
    finish_balances(&mut row, traditional, roth, taxable);

    let next = WithdrawalState {
        year_index: idx + 1,
        traditional,
        roth,
        taxable,
        annual_withdrawal,
    };
    (next, row)
}

pub fn run_baseline(ctx: &ProjectionContext<'_>, product: &ProductConfig) -> Vec<YearRow> {
    let h = ctx.household;
    let initial = WithdrawalState {
        year_index: 0,
        traditional: h.traditional_balance,
        roth: h.roth_balance,
        taxable: h.taxable_balance,
        annual_withdrawal: None,
    };
    let (_, rows) = (0..ctx.years()).fold(
        (initial, Vec::with_capacity(ctx.years() as usize)),
        |(state, mut rows), _| {
            let (next, row) = step_baseline(ctx, product, state);
            rows.push(row);
            (next, rows)
        },
    );
    rows
}
