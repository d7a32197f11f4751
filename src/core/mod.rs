macro_rules! table_gap {
    ($($arg:tt)+) => {
        ::tracing::warn!(target: "rothplan::table_gap", $($arg)+)
    };
}

mod advisory;
mod engine;
mod error;
mod growth;
mod guaranteed_income;
mod irmaa;
mod money;
mod products;
mod scenario;
mod summary;
mod tax;
mod tax_tables;
mod types;

pub use advisory::{AdvisoryRequest, ConversionAdvice, advise};
pub use engine::{run_projection, validate_request};
pub use error::{EngineError, EngineResult};
pub use irmaa::{IrmaaTier, calculate_irmaa_headroom, get_irmaa_surcharge, get_irmaa_tier};
pub use money::{Cents, dollars, percent_change};
pub use products::{
    BonusTiming, PayoutType, ProductConfig, catalog, find_product, get_payout_factor,
    get_roll_up_for_year, resolve_bonus, resolve_surrender_charge,
};
pub use summary::{
    calculate_break_even_age, calculate_heir_benefit, calculate_irmaa_savings,
    calculate_lifetime_wealth, calculate_tax_savings,
};
pub use tax::{IncomeComponents, TaxContext, YearTax, compute_year_tax};
pub use tax_tables::{get_bracket_ceiling, get_federal_brackets, get_standard_deduction};
pub use types::{
    ConversionType, FilingStatus, GiPhase, GiSummary, GiYearRow, HouseholdProfile, IncomeEntry,
    IncomeStream, LifetimeWealth, PayoutOption, ProductFamily, ProductSelection,
    ProjectionRequest, ProjectionSummary, SimulationResult, TaxMode, YearRow,
};
