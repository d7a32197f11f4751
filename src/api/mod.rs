use axum::{
    Router,
    extract::{Json, Query, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

use crate::core::{
    AdvisoryRequest, Cents, ConversionAdvice, ConversionType, EngineResult, FilingStatus,
    HouseholdProfile, IncomeStream, PayoutOption, ProductConfig, ProductSelection,
    ProjectionRequest, SimulationResult, TaxMode, advise, catalog, run_projection,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliFilingStatus {
    Single,
    MarriedFilingJointly,
    MarriedFilingSeparately,
    HeadOfHousehold,
}

impl From<CliFilingStatus> for FilingStatus {
    fn from(value: CliFilingStatus) -> Self {
        match value {
            CliFilingStatus::Single => FilingStatus::Single,
            CliFilingStatus::MarriedFilingJointly => FilingStatus::MarriedFilingJointly,
            CliFilingStatus::MarriedFilingSeparately => FilingStatus::MarriedFilingSeparately,
            CliFilingStatus::HeadOfHousehold => FilingStatus::HeadOfHousehold,
        }
    }
}

impl From<FilingStatus> for CliFilingStatus {
    fn from(value: FilingStatus) -> Self {
        match value {
            FilingStatus::Single => CliFilingStatus::Single,
            FilingStatus::MarriedFilingJointly => CliFilingStatus::MarriedFilingJointly,
            FilingStatus::MarriedFilingSeparately => CliFilingStatus::MarriedFilingSeparately,
            FilingStatus::HeadOfHousehold => CliFilingStatus::HeadOfHousehold,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliTaxMode {
    Brackets,
    FlatRate,
}

impl From<CliTaxMode> for TaxMode {
    fn from(value: CliTaxMode) -> Self {
        match value {
            CliTaxMode::Brackets => TaxMode::Brackets,
            CliTaxMode::FlatRate => TaxMode::FlatRate,
        }
    }
}

impl From<TaxMode> for CliTaxMode {
    fn from(value: TaxMode) -> Self {
        match value {
            TaxMode::Brackets => CliTaxMode::Brackets,
            TaxMode::FlatRate => CliTaxMode::FlatRate,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliConversionType {
    NoConversion,
    FullConversion,
    OptimizedAmount,
    FixedAmount,
}

impl From<CliConversionType> for ConversionType {
    fn from(value: CliConversionType) -> Self {
        match value {
            CliConversionType::NoConversion => ConversionType::NoConversion,
            CliConversionType::FullConversion => ConversionType::FullConversion,
            CliConversionType::OptimizedAmount => ConversionType::OptimizedAmount,
            CliConversionType::FixedAmount => ConversionType::FixedAmount,
        }
    }
}

impl From<ConversionType> for CliConversionType {
    fn from(value: ConversionType) -> Self {
        match value {
            ConversionType::NoConversion => CliConversionType::NoConversion,
            ConversionType::FullConversion => CliConversionType::FullConversion,
            ConversionType::OptimizedAmount => CliConversionType::OptimizedAmount,
            ConversionType::FixedAmount => CliConversionType::FixedAmount,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliPayoutOption {
    Level,
    Increasing,
}

impl From<CliPayoutOption> for PayoutOption {
    fn from(value: CliPayoutOption) -> Self {
        match value {
            CliPayoutOption::Level => PayoutOption::Level,
            CliPayoutOption::Increasing => PayoutOption::Increasing,
        }
    }
}

impl From<PayoutOption> for CliPayoutOption {
    fn from(value: PayoutOption) -> Self {
        match value {
            PayoutOption::Level => CliPayoutOption::Level,
            PayoutOption::Increasing => CliPayoutOption::Increasing,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectionQuery {
    age: Option<u32>,
    spouse_age: Option<u32>,
    end_age: Option<u32>,
    filing_status: Option<FilingStatus>,
    state: Option<String>,

    traditional_balance: Option<f64>,
    roth_balance: Option<f64>,
    taxable_balance: Option<f64>,
    social_security: Option<f64>,
    social_security_start_age: Option<u32>,
    spouse_social_security: Option<f64>,
    spouse_social_security_start_age: Option<u32>,
    pension: Option<f64>,
    pension_start_age: Option<u32>,

    tax_mode: Option<TaxMode>,
    federal_tax_rate: Option<f64>,
    state_tax_rate: Option<f64>,
    heir_tax_rate: Option<f64>,
    baseline_growth_rate: Option<f64>,
    taxable_growth_rate: Option<f64>,

    product_id: Option<String>,
    conversion_type: Option<ConversionType>,
    fixed_conversion_amount: Option<f64>,
    deferral_years: Option<u32>,
    conversion_end_age: Option<u32>,
    conversion_years: Option<u32>,
    growth_rate: Option<f64>,
    roth_growth_rate: Option<f64>,
    income_start_age: Option<u32>,
    payout_option: Option<PayoutOption>,
    roll_up_option: Option<String>,

    start_year: Option<u32>,
    end_year: Option<u32>,
}

#[derive(Parser, Debug)]
#[command(
    name = "rothplan",
    about = "Deterministic Roth conversion and annuity projection (baseline vs strategy)"
)]
struct Cli {
    #[arg(long, default_value_t = 62)]
    age: u32,
    #[arg(long)]
    spouse_age: Option<u32>,
    #[arg(long, default_value_t = 85, help = "Last age projected")]
    end_age: u32,
    #[arg(long, value_enum, default_value_t = CliFilingStatus::Single)]
    filing_status: CliFilingStatus,
    #[arg(long, default_value = "TX", help = "Two-letter state of residence")]
    state: String,

    #[arg(long, default_value_t = 500_000.0, help = "Traditional IRA balance in dollars")]
    traditional_balance: f64,
    #[arg(long, default_value_t = 0.0)]
    roth_balance: f64,
    #[arg(long, default_value_t = 0.0)]
    taxable_balance: f64,
    #[arg(long, default_value_t = 0.0, help = "Annual Social Security benefit in dollars")]
    social_security: f64,
    #[arg(long, default_value_t = 67)]
    social_security_start_age: u32,
    #[arg(long, default_value_t = 0.0)]
    spouse_social_security: f64,
    #[arg(long, default_value_t = 67)]
    spouse_social_security_start_age: u32,
    #[arg(long, default_value_t = 0.0, help = "Annual taxable pension in dollars")]
    pension: f64,
    #[arg(long, default_value_t = 65)]
    pension_start_age: u32,

    #[arg(long, value_enum, default_value_t = CliTaxMode::Brackets)]
    tax_mode: CliTaxMode,
    #[arg(
        long,
        default_value_t = 24.0,
        help = "Federal rate in percent, used with --tax-mode flat-rate"
    )]
    federal_tax_rate: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "State rate in percent, used with --tax-mode flat-rate"
    )]
    state_tax_rate: f64,
    #[arg(long, default_value_t = 32.0, help = "Heirs' marginal rate in percent")]
    heir_tax_rate: f64,
    #[arg(long, default_value_t = 7.0, help = "Baseline IRA return in percent")]
    baseline_growth_rate: f64,
    #[arg(long, default_value_t = 4.0, help = "Taxable account return in percent")]
    taxable_growth_rate: f64,

    #[arg(long, default_value = "summit-growth-10")]
    product_id: String,
    #[arg(long, value_enum, default_value_t = CliConversionType::FullConversion)]
    conversion_type: CliConversionType,
    #[arg(long, default_value_t = 0.0, help = "Annual amount for --conversion-type fixed-amount")]
    fixed_conversion_amount: f64,
    #[arg(long, default_value_t = 0)]
    deferral_years: u32,
    #[arg(long)]
    conversion_end_age: Option<u32>,
    #[arg(
        long,
        default_value_t = 3,
        help = "Guaranteed-income products: years spent converting before the purchase"
    )]
    conversion_years: u32,
    #[arg(long, help = "Overrides the product's credited rate, in percent")]
    growth_rate: Option<f64>,
    #[arg(long)]
    roth_growth_rate: Option<f64>,
    #[arg(long)]
    income_start_age: Option<u32>,
    #[arg(long, value_enum, default_value_t = CliPayoutOption::Level)]
    payout_option: CliPayoutOption,
    #[arg(long)]
    roll_up_option: Option<String>,

    #[arg(long, default_value_t = 2026)]
    start_year: u32,
    #[arg(long, help = "Defaults to start-year + end-age - age")]
    end_year: Option<u32>,

    #[arg(long, help = "Read the full JSON projection request from this file instead")]
    request_file: Option<String>,
}

#[derive(Debug, Serialize)]
struct ProductsResponse {
    products: &'static [ProductConfig],
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn dollars_to_cents(flag: &str, value: f64) -> Result<Cents, String> {
    if !value.is_finite() || value < 0.0 {
        return Err(format!("--{flag} must be >= 0"));
    }
    Ok((value * 100.0).round() as Cents)
}

fn income_stream(flag: &str, amount: f64, start_age: u32) -> Result<Option<IncomeStream>, String> {
    let annual_amount = dollars_to_cents(flag, amount)?;
    Ok((annual_amount > 0).then_some(IncomeStream {
        annual_amount,
        start_age,
    }))
}

fn build_request(cli: Cli) -> Result<ProjectionRequest, String> {
    if cli.end_age <= cli.age {
        return Err("--end-age must be > --age".to_string());
    }

    if cli.spouse_age.is_some() && !FilingStatus::from(cli.filing_status).is_married() {
        return Err("--spouse-age requires a married filing status".to_string());
    }

    if cli.state.trim().is_empty() {
        return Err("--state must not be empty".to_string());
    }

    if cli.product_id.trim().is_empty() {
        return Err("--product-id must not be empty".to_string());
    }

    if cli.conversion_type == CliConversionType::FixedAmount && cli.fixed_conversion_amount <= 0.0
    {
        return Err(
            "--fixed-conversion-amount must be > 0 with --conversion-type fixed-amount"
                .to_string(),
        );
    }

    let span = cli.end_age - cli.age;
    let end_year = match cli.end_year {
        Some(year) => year,
        None => cli
            .start_year
            .checked_add(span)
            .ok_or_else(|| "--start-year is too large for the requested age range".to_string())?,
    };
    if end_year <= cli.start_year {
        return Err("--end-year must be > --start-year".to_string());
    }

    let household_profile = HouseholdProfile {
        age: cli.age,
        spouse_age: cli.spouse_age,
        end_age: cli.end_age,
        filing_status: cli.filing_status.into(),
        state: cli.state.trim().to_ascii_uppercase(),
        traditional_balance: dollars_to_cents("traditional-balance", cli.traditional_balance)?,
        roth_balance: dollars_to_cents("roth-balance", cli.roth_balance)?,
        taxable_balance: dollars_to_cents("taxable-balance", cli.taxable_balance)?,
        social_security: income_stream(
            "social-security",
            cli.social_security,
            cli.social_security_start_age,
        )?,
        spouse_social_security: income_stream(
            "spouse-social-security",
            cli.spouse_social_security,
            cli.spouse_social_security_start_age,
        )?,
        pension: income_stream("pension", cli.pension, cli.pension_start_age)?,
        other_income: Vec::new(),
        tax_mode: cli.tax_mode.into(),
        federal_tax_rate: cli.federal_tax_rate,
        state_tax_rate: cli.state_tax_rate,
        heir_tax_rate: cli.heir_tax_rate,
        baseline_growth_rate: cli.baseline_growth_rate,
        taxable_growth_rate: cli.taxable_growth_rate,
    };

    let product_config = ProductSelection {
        product_id: cli.product_id.trim().to_string(),
        conversion_type: cli.conversion_type.into(),
        fixed_conversion_amount: dollars_to_cents(
            "fixed-conversion-amount",
            cli.fixed_conversion_amount,
        )?,
        deferral_years: cli.deferral_years,
        conversion_end_age: cli.conversion_end_age,
        conversion_years: cli.conversion_years,
        growth_rate: cli.growth_rate,
        roth_growth_rate: cli.roth_growth_rate,
        income_start_age: cli.income_start_age,
        payout_option: cli.payout_option.into(),
        roll_up_option: cli.roll_up_option,
    };

    Ok(ProjectionRequest {
        household_profile,
        product_config,
        start_year: cli.start_year,
        end_year,
    })
}

fn request_from_query(query: ProjectionQuery) -> Result<ProjectionRequest, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = query.age {
        cli.age = v;
    }
    if query.spouse_age.is_some() {
        cli.spouse_age = query.spouse_age;
    }
    if let Some(v) = query.end_age {
        cli.end_age = v;
    }
    if let Some(v) = query.filing_status {
        cli.filing_status = v.into();
    }
    if let Some(v) = query.state {
        cli.state = v;
    }

    if let Some(v) = query.traditional_balance {
        cli.traditional_balance = v;
    }
    if let Some(v) = query.roth_balance {
        cli.roth_balance = v;
    }
    if let Some(v) = query.taxable_balance {
        cli.taxable_balance = v;
    }
    if let Some(v) = query.social_security {
        cli.social_security = v;
    }
    if let Some(v) = query.social_security_start_age {
        cli.social_security_start_age = v;
    }
    if let Some(v) = query.spouse_social_security {
        cli.spouse_social_security = v;
    }
    if let Some(v) = query.spouse_social_security_start_age {
        cli.spouse_social_security_start_age = v;
    }
    if let Some(v) = query.pension {
        cli.pension = v;
    }
    if let Some(v) = query.pension_start_age {
        cli.pension_start_age = v;
    }

    if let Some(v) = query.tax_mode {
        cli.tax_mode = v.into();
    }
    if let Some(v) = query.federal_tax_rate {
        cli.federal_tax_rate = v;
    }
    if let Some(v) = query.state_tax_rate {
        cli.state_tax_rate = v;
    }
    if let Some(v) = query.heir_tax_rate {
        cli.heir_tax_rate = v;
    }
    if let Some(v) = query.baseline_growth_rate {
        cli.baseline_growth_rate = v;
    }
    if let Some(v) = query.taxable_growth_rate {
        cli.taxable_growth_rate = v;
    }

    if let Some(v) = query.product_id {
        cli.product_id = v;
    }
    if let Some(v) = query.conversion_type {
        cli.conversion_type = v.into();
    }
    if let Some(v) = query.fixed_conversion_amount {
        cli.fixed_conversion_amount = v;
    }
    if let Some(v) = query.deferral_years {
        cli.deferral_years = v;
    }
    if query.conversion_end_age.is_some() {
        cli.conversion_end_age = query.conversion_end_age;
    }
    if let Some(v) = query.conversion_years {
        cli.conversion_years = v;
    }
    if query.growth_rate.is_some() {
        cli.growth_rate = query.growth_rate;
    }
    if query.roth_growth_rate.is_some() {
        cli.roth_growth_rate = query.roth_growth_rate;
    }
    if query.income_start_age.is_some() {
        cli.income_start_age = query.income_start_age;
    }
    if let Some(v) = query.payout_option {
        cli.payout_option = v.into();
    }
    if query.roll_up_option.is_some() {
        cli.roll_up_option = query.roll_up_option;
    }

    if let Some(v) = query.start_year {
        cli.start_year = v;
    }
    if query.end_year.is_some() {
        cli.end_year = query.end_year;
    }

    build_request(cli)
}

fn request_from_json(json: &str) -> Result<ProjectionRequest, String> {
    serde_json::from_str::<ProjectionRequest>(json)
        .map_err(|e| format!("Invalid projection JSON: {e}"))
}

fn default_cli_for_api() -> Cli {
    Cli {
        age: 62,
        spouse_age: None,
        end_age: 85,
        filing_status: CliFilingStatus::Single,
        state: "TX".to_string(),
        traditional_balance: 500_000.0,
        roth_balance: 0.0,
        taxable_balance: 0.0,
        social_security: 0.0,
        social_security_start_age: 67,
        spouse_social_security: 0.0,
        spouse_social_security_start_age: 67,
        pension: 0.0,
        pension_start_age: 65,
        tax_mode: CliTaxMode::Brackets,
        federal_tax_rate: 24.0,
        state_tax_rate: 0.0,
        heir_tax_rate: 32.0,
        baseline_growth_rate: 7.0,
        taxable_growth_rate: 4.0,
        product_id: "summit-growth-10".to_string(),
        conversion_type: CliConversionType::FullConversion,
        fixed_conversion_amount: 0.0,
        deferral_years: 0,
        conversion_end_age: None,
        conversion_years: 3,
        growth_rate: None,
        roth_growth_rate: None,
        income_start_age: None,
        payout_option: CliPayoutOption::Level,
        roll_up_option: None,
        start_year: 2026,
        end_year: None,
        request_file: None,
    }
}

pub fn run_cli_projection<I, T>(args: I) -> Result<String, String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let argv = std::iter::once(std::ffi::OsString::from("rothplan"))
        .chain(args.into_iter().map(Into::into));
    let cli = Cli::try_parse_from(argv).map_err(|e| e.to_string())?;

    let request = match cli.request_file.as_deref() {
        Some(path) => {
            let json = fs::read_to_string(path)
                .map_err(|e| format!("--request-file {path} could not be read: {e}"))?;
            request_from_json(&json)?
        }
        None => build_request(cli)?,
    };

    let result = run_projection(&request).map_err(|e| e.to_string())?;
    serde_json::to_string_pretty(&result).map_err(|e| format!("Failed to encode result: {e}"))
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route(
            "/api/projection",
            get(projection_get_handler).post(projection_post_handler),
        )
        .route("/api/products", get(products_handler))
        .route("/api/advisory", post(advisory_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "rothplan HTTP API listening");
    info!("Local access: http://127.0.0.1:{port}/api/products");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn products_handler() -> Response {
    json_response(
        StatusCode::OK,
        ProductsResponse {
            products: catalog(),
        },
    )
}

async fn projection_get_handler(Query(query): Query<ProjectionQuery>) -> Response {
    match request_from_query(query) {
        Ok(request) => projection_response(run_projection(&request)),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

async fn projection_post_handler(
    payload: Result<Json<ProjectionRequest>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(request)) => projection_response(run_projection(&request)),
        Err(rejection) => error_response(
            StatusCode::BAD_REQUEST,
            &format!("Invalid projection JSON: {}", rejection.body_text()),
        ),
    }
}

async fn advisory_handler(payload: Result<Json<AdvisoryRequest>, JsonRejection>) -> Response {
    match payload {
        Ok(Json(request)) => advisory_response(advise(&request)),
        Err(rejection) => error_response(
            StatusCode::BAD_REQUEST,
            &format!("Invalid advisory JSON: {}", rejection.body_text()),
        ),
    }
}

fn projection_response(result: EngineResult<SimulationResult>) -> Response {
    match result {
        Ok(result) => json_response(StatusCode::OK, result),
        Err(e) => error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    }
}

fn advisory_response(result: EngineResult<ConversionAdvice>) -> Response {
    match result {
        Ok(advice) => json_response(StatusCode::OK, advice),
        Err(e) => error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}
