use serde::Serialize;

use super::irmaa::get_irmaa_surcharge;
use super::money::{Cents, dollars, percent_of};
use super::tax_tables::{
    get_federal_brackets, get_standard_deduction, get_state_brackets, tax_from_brackets,
};
use super::types::{FilingStatus, TaxMode};

pub const MEDICARE_AGE: u32 = 65;
pub const NIIT_RATE: f64 = 3.8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IncomeComponents {
    pub ordinary: Cents,
    pub social_security: Cents,
    pub tax_exempt: Cents,
}

#[derive(Debug, Clone, Copy)]
pub struct TaxContext<'a> {
    pub filing_status: FilingStatus,
    pub state: &'a str,
    pub year: u32,
    pub age: u32,
    pub spouse_age: Option<u32>,
    pub tax_mode: TaxMode,
    pub federal_rate: f64,
    pub state_rate: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearTax {
    pub agi: Cents,
    pub taxable_income: Cents,
    pub taxable_social_security: Cents,
    pub federal_tax: Cents,
    pub state_tax: Cents,
    pub magi: Cents,
    pub irmaa_surcharge: Cents,
}

impl YearTax {
    pub fn total_tax(&self) -> Cents {
        self.federal_tax + self.state_tax
    }
}

pub fn taxable_social_security(
    benefits: Cents,
    other_income: Cents,
    filing_status: FilingStatus,
) -> Cents {
    if benefits <= 0 {
        return 0;
    }

    let (base, adjusted) = match filing_status {
        FilingStatus::MarriedFilingJointly => (dollars(32_000), dollars(44_000)),
        FilingStatus::MarriedFilingSeparately => (0, 0),
        FilingStatus::Single | FilingStatus::HeadOfHousehold => (dollars(25_000), dollars(34_000)),
    };

    let half_benefits = percent_of(benefits, 50.0);
    let provisional = other_income.max(0) + half_benefits;
    if provisional <= base {
        return 0;
    }
    if provisional <= adjusted {
        return percent_of(provisional - base, 50.0).min(half_benefits);
    }

    let lower_tier = percent_of(adjusted - base, 50.0).min(half_benefits);
    (percent_of(provisional - adjusted, 85.0) + lower_tier).min(percent_of(benefits, 85.0))
}

fn medicare_enrollees(ctx: &TaxContext<'_>) -> u32 {
    let primary = u32::from(ctx.age >= MEDICARE_AGE);
    let spouse = u32::from(
        ctx.filing_status.is_joint() && ctx.spouse_age.is_some_and(|a| a >= MEDICARE_AGE),
    );
    primary + spouse
}

fn irmaa_for(magi: Cents, ctx: &TaxContext<'_>) -> Cents {
    let enrollees = medicare_enrollees(ctx);
    if enrollees == 0 {
        return 0;
    }

    let is_joint = ctx.filing_status.is_joint();
    let surcharge = get_irmaa_surcharge(magi, is_joint, ctx.year);
    if is_joint && enrollees == 1 {
        percent_of(surcharge, 50.0)
    } else {
        surcharge
    }
}

pub fn compute_year_tax(income: &IncomeComponents, ctx: &TaxContext<'_>) -> YearTax {
    let ordinary = income.ordinary.max(0);
    let taxable_ss = taxable_social_security(
        income.social_security,
        ordinary + income.tax_exempt.max(0),
        ctx.filing_status,
    );
    let agi = ordinary + taxable_ss;

    let (taxable_income, federal_tax, state_tax) = match ctx.tax_mode {
        TaxMode::Brackets => {
            let deduction =
                get_standard_deduction(ctx.filing_status, ctx.age, ctx.spouse_age, ctx.year);
            let taxable_income = (agi - deduction).max(0);
            let federal = tax_from_brackets(
                taxable_income,
                &get_federal_brackets(ctx.year, ctx.filing_status),
            );
            let state = tax_from_brackets(
                ordinary,
                &get_state_brackets(ctx.state, ctx.filing_status, ctx.year),
            );
            (taxable_income, federal, state)
        }
        TaxMode::FlatRate => (
            ordinary,
            percent_of(ordinary, ctx.federal_rate),
            percent_of(ordinary, ctx.state_rate),
        ),
    };

    let magi = agi + income.tax_exempt.max(0) + (income.social_security.max(0) - taxable_ss);

    YearTax {
        agi,
        taxable_income,
        taxable_social_security: taxable_ss,
        federal_tax,
        state_tax,
        magi,
        irmaa_surcharge: irmaa_for(magi, ctx),
    }
}

pub fn net_investment_income_tax(
    magi: Cents,
    investment_income: Cents,
    filing_status: FilingStatus,
) -> Cents {
    let threshold = match filing_status {
        FilingStatus::MarriedFilingJointly => dollars(250_000),
        FilingStatus::MarriedFilingSeparately => dollars(125_000),
        FilingStatus::Single | FilingStatus::HeadOfHousehold => dollars(200_000),
    };
    let excess = (magi - threshold).max(0);
    percent_of(investment_income.max(0).min(excess), NIIT_RATE)
}
