use serde::{Deserialize, Serialize};

use super::money::Cents;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilingStatus {
    Single,
    #[serde(alias = "joint", alias = "mfj")]
    MarriedFilingJointly,
    #[serde(alias = "mfs")]
    MarriedFilingSeparately,
    #[serde(alias = "hoh")]
    HeadOfHousehold,
}

impl FilingStatus {
    pub fn is_joint(self) -> bool {
        self == FilingStatus::MarriedFilingJointly
    }

    pub fn is_married(self) -> bool {
        matches!(
            self,
            FilingStatus::MarriedFilingJointly | FilingStatus::MarriedFilingSeparately
        )
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxMode {
    #[default]
    Brackets,
    #[serde(alias = "flat")]
    FlatRate,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeStream {
    pub annual_amount: Cents,
    pub start_age: u32,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IncomeEntry {
    pub year: u32,
    pub taxable: Cents,
    pub tax_exempt: Cents,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HouseholdProfile {
    pub age: u32,
    #[serde(default)]
    pub spouse_age: Option<u32>,
    pub end_age: u32,
    pub filing_status: FilingStatus,
    pub state: String,
    pub traditional_balance: Cents,
    #[serde(default)]
    pub roth_balance: Cents,
    #[serde(default)]
    pub taxable_balance: Cents,
    #[serde(default)]
    pub social_security: Option<IncomeStream>,
    #[serde(default)]
    pub spouse_social_security: Option<IncomeStream>,
    #[serde(default)]
    pub pension: Option<IncomeStream>,
    #[serde(default)]
    pub other_income: Vec<IncomeEntry>,
    #[serde(default)]
    pub tax_mode: TaxMode,
    #[serde(default)]
    pub federal_tax_rate: f64,
    #[serde(default)]
    pub state_tax_rate: f64,
    #[serde(default)]
    pub heir_tax_rate: f64,
    pub baseline_growth_rate: f64,
    #[serde(default)]
    pub taxable_growth_rate: f64,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionType {
    NoConversion,
    #[default]
    #[serde(alias = "full")]
    FullConversion,
    #[serde(alias = "optimized")]
    OptimizedAmount,
    #[serde(alias = "fixed")]
    FixedAmount,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutOption {
    #[default]
    Level,
    Increasing,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProductSelection {
    pub product_id: String,
    pub conversion_type: ConversionType,
    pub fixed_conversion_amount: Cents,
    pub deferral_years: u32,
    pub conversion_end_age: Option<u32>,
    pub conversion_years: u32,
    pub growth_rate: Option<f64>,
    pub roth_growth_rate: Option<f64>,
    pub income_start_age: Option<u32>,
    pub payout_option: PayoutOption,
    pub roll_up_option: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionRequest {
    pub household_profile: HouseholdProfile,
    pub product_config: ProductSelection,
    pub start_year: u32,
    pub end_year: u32,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductFamily {
    Growth,
    GuaranteedIncome,
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearRow {
    pub year: u32,
    pub age: u32,
    pub spouse_age: Option<u32>,
    pub beginning_traditional: Cents,
    pub traditional_balance: Cents,
    pub roth_balance: Cents,
    pub taxable_balance: Cents,
    pub withdrawal: Cents,
    pub conversion: Cents,
    pub social_security: Cents,
    pub other_taxable_income: Cents,
    pub other_tax_exempt_income: Cents,
    pub guaranteed_income: Cents,
    pub federal_tax: Cents,
    pub state_tax: Cents,
    pub irmaa_surcharge: Cents,
    pub total_tax: Cents,
    pub magi: Cents,
    pub surrender_charge: Cents,
    pub net_worth: Cents,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GiPhase {
    Conversion,
    Purchase,
    Deferral,
    Income,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GiYearRow {
    pub year: u32,
    pub age: u32,
    pub phase: GiPhase,
    pub income_base: Cents,
    pub roll_up_rate: f64,
    pub rider_fee: Cents,
    pub account_value: Cents,
    pub gross_payment: Cents,
    pub net_payment: Cents,
    pub depleted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LifetimeWealth {
    pub baseline: Cents,
    pub strategy: Cents,
    pub improvement_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GiSummary {
    pub income_base_at_start: Cents,
    pub income_base_at_income_age: Cents,
    pub roll_up_growth: Cents,
    pub income_start_age: Option<u32>,
    pub annual_gross_income: Cents,
    pub total_gross_paid: Cents,
    pub total_net_paid: Cents,
    pub depletion_age: Option<u32>,
    pub baseline_total_gross: Cents,
    pub baseline_total_net: Cents,
    pub baseline_depletion_age: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionSummary {
    pub break_even_age: Option<u32>,
    pub total_tax_savings: Cents,
    pub total_irmaa_savings: Cents,
    pub heir_benefit: Cents,
    pub baseline_net_legacy: Cents,
    pub strategy_net_legacy: Cents,
    pub lifetime_wealth: LifetimeWealth,
    pub gi: Option<GiSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub family: ProductFamily,
    pub product_id: String,
    pub baseline_years: Vec<YearRow>,
    pub strategy_years: Vec<YearRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gi_yearly_data: Option<Vec<GiYearRow>>,
    #[serde(flatten)]
    pub summary: ProjectionSummary,
}
