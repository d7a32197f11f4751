use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use super::types::{PayoutOption, ProductFamily};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BonusTiming {
    Issue,
    Anniversary(u32),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BonusTarget {
    IncomeBase,
    AccountValue,
    Both,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bonus {
    pub percent: f64,
    pub timing: BonusTiming,
    pub target: BonusTarget,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compounding {
    Simple,
    Compound,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollUpTier {
    pub start_year: u32,
    pub end_year: u32,
    pub rate: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RollUpSchedule {
    Flat(f64),
    // Tiers must be contiguous and non-overlapping; a year no tier covers gets no roll-up.
    Tiered(Vec<RollUpTier>),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollUpOption {
    pub id: String,
    pub compounding: Compounding,
    pub schedule: RollUpSchedule,
    pub max_period: u32,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollUp {
    pub rate: f64,
    pub compounding: Compounding,
    pub max_period: u32,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeBasis {
    IncomeBase,
    AccountValue,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutType {
    Single,
    Joint,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutTable {
    pub min_age: u32,
    pub max_age: u32,
    pub single: Vec<f64>,
    pub joint: Vec<f64>,
}

impl PayoutTable {
    fn stepped(min_age: u32, max_age: u32, single_start: f64, joint_offset: f64, step: f64) -> Self {
        let single = (0..=(max_age - min_age))
            .map(|i| round_rate(single_start + step * i as f64))
            .collect::<Vec<_>>();
        let joint = single
            .iter()
            .map(|rate| round_rate(rate - joint_offset))
            .collect();
        Self {
            min_age,
            max_age,
            single,
            joint,
        }
    }

    fn percent_at(&self, payout_type: PayoutType, age: u32) -> f64 {
        let idx = (age - self.min_age) as usize;
        let column = match payout_type {
            PayoutType::Single => &self.single,
            PayoutType::Joint => &self.joint,
        };
        column.get(idx).copied().unwrap_or(0.0)
    }
}

fn round_rate(rate: f64) -> f64 {
    (rate * 100.0).round() / 100.0
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeRider {
    pub level: PayoutTable,
    pub increasing: Option<PayoutTable>,
    pub increasing_step_up: f64,
    pub roll_up_options: Vec<RollUpOption>,
    pub rider_fee_rate: f64,
    pub rider_fee_basis: FeeBasis,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductConfig {
    pub id: String,
    pub name: String,
    pub family: ProductFamily,
    pub credited_rate: f64,
    pub bonuses: Vec<Bonus>,
    pub surrender_schedule: Vec<f64>,
    pub income_rider: Option<IncomeRider>,
}

static CATALOG: LazyLock<Vec<ProductConfig>> = LazyLock::new(build_catalog);

fn build_catalog() -> Vec<ProductConfig> {
    vec![
        ProductConfig {
            id: "summit-growth-10".to_string(),
            name: "Summit Growth 10".to_string(),
            family: ProductFamily::Growth,
            credited_rate: 7.0,
            bonuses: vec![Bonus {
                percent: 10.0,
                timing: BonusTiming::Issue,
                target: BonusTarget::Both,
            }],
            surrender_schedule: vec![10.0, 9.0, 8.0, 7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0],
            income_rider: None,
        },
        ProductConfig {
            id: "summit-growth-7-plus".to_string(),
            name: "Summit Growth 7 Plus".to_string(),
            family: ProductFamily::Growth,
            credited_rate: 6.5,
            bonuses: vec![
                Bonus {
                    percent: 5.0,
                    timing: BonusTiming::Issue,
                    target: BonusTarget::Both,
                },
                Bonus {
                    percent: 3.0,
                    timing: BonusTiming::Anniversary(3),
                    target: BonusTarget::Both,
                },
            ],
            surrender_schedule: vec![8.0, 7.0, 6.0, 5.0, 4.0, 3.0, 2.0],
            income_rider: None,
        },
        ProductConfig {
            id: "summit-growth-5".to_string(),
            name: "Summit Growth 5".to_string(),
            family: ProductFamily::Growth,
            credited_rate: 6.0,
            bonuses: Vec::new(),
            surrender_schedule: vec![5.0, 4.0, 3.0, 2.0, 1.0],
            income_rider: None,
        },
        ProductConfig {
            id: "lifetime-income-plus".to_string(),
            name: "Lifetime Income Plus".to_string(),
            family: ProductFamily::GuaranteedIncome,
            credited_rate: 4.0,
            bonuses: vec![Bonus {
                percent: 20.0,
                timing: BonusTiming::Issue,
                target: BonusTarget::IncomeBase,
            }],
            surrender_schedule: vec![10.0, 9.0, 8.0, 7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0],
            income_rider: Some(IncomeRider {
                level: PayoutTable::stepped(50, 80, 4.0, 0.5, 0.1),
                increasing: Some(PayoutTable::stepped(50, 80, 3.0, 0.5, 0.1)),
                increasing_step_up: 2.0,
                roll_up_options: vec![
                    RollUpOption {
                        id: "compound-7".to_string(),
                        compounding: Compounding::Compound,
                        schedule: RollUpSchedule::Flat(7.0),
                        max_period: 10,
                    },
                    RollUpOption {
                        id: "simple-10".to_string(),
                        compounding: Compounding::Simple,
                        schedule: RollUpSchedule::Flat(10.0),
                        max_period: 10,
                    },
                ],
                rider_fee_rate: 1.0,
                rider_fee_basis: FeeBasis::IncomeBase,
            }),
        },
        ProductConfig {
            id: "secure-income-tiered".to_string(),
            name: "Secure Income Tiered".to_string(),
            family: ProductFamily::GuaranteedIncome,
            credited_rate: 3.5,
            bonuses: vec![
                Bonus {
                    percent: 10.0,
                    timing: BonusTiming::Issue,
                    target: BonusTarget::Both,
                },
                Bonus {
                    percent: 2.0,
                    timing: BonusTiming::Anniversary(1),
                    target: BonusTarget::IncomeBase,
                },
            ],
            surrender_schedule: vec![9.0, 8.0, 7.0, 6.0, 5.0, 4.0, 3.0],
            income_rider: Some(IncomeRider {
                level: PayoutTable::stepped(55, 80, 4.75, 0.6, 0.12),
                increasing: None,
                increasing_step_up: 0.0,
                roll_up_options: vec![RollUpOption {
                    id: "tiered".to_string(),
                    compounding: Compounding::Simple,
                    schedule: RollUpSchedule::Tiered(vec![
                        RollUpTier {
                            start_year: 1,
                            end_year: 5,
                            rate: 8.0,
                        },
                        RollUpTier {
                            start_year: 6,
                            end_year: 10,
                            rate: 6.0,
                        },
                    ]),
                    max_period: 10,
                }],
                rider_fee_rate: 1.15,
                rider_fee_basis: FeeBasis::AccountValue,
            }),
        },
    ]
}

pub fn catalog() -> &'static [ProductConfig] {
    &CATALOG
}

pub fn find_product(id: &str) -> Option<&'static ProductConfig> {
    CATALOG.iter().find(|p| p.id == id)
}

pub fn resolve_bonus(config: &ProductConfig, timing: BonusTiming) -> f64 {
    config
        .bonuses
        .iter()
        .filter(|b| b.timing == timing)
        .map(|b| b.percent)
        .sum()
}

pub fn resolve_bonus_split(config: &ProductConfig, timing: BonusTiming) -> (f64, f64) {
    config
        .bonuses
        .iter()
        .filter(|b| b.timing == timing)
        .fold((0.0, 0.0), |(ib, av), b| match b.target {
            BonusTarget::IncomeBase => (ib + b.percent, av),
            BonusTarget::AccountValue => (ib, av + b.percent),
            BonusTarget::Both => (ib + b.percent, av + b.percent),
        })
}

pub fn resolve_surrender_charge(config: &ProductConfig, year_index: u32) -> f64 {
    config
        .surrender_schedule
        .get(year_index as usize)
        .copied()
        .unwrap_or(0.0)
}

pub fn get_payout_factor(
    config: &ProductConfig,
    payout_type: PayoutType,
    age: u32,
    option: PayoutOption,
) -> f64 {
    let Some(rider) = config.income_rider.as_ref() else {
        table_gap!(
            table = "payout",
            product = %config.id,
            "product has no income rider, payout factor is zero"
        );
        return 0.0;
    };

    let table = match option {
        PayoutOption::Level => &rider.level,
        PayoutOption::Increasing => rider.increasing.as_ref().unwrap_or_else(|| {
            table_gap!(
                table = "payout",
                product = %config.id,
                "no increasing payout table, using level"
            );
            &rider.level
        }),
    };

    let clamped = age.clamp(table.min_age, table.max_age);
    if clamped != age {
        table_gap!(
            table = "payout",
            product = %config.id,
            age,
            clamped,
            "attained age outside payout table, clamped"
        );
    }
    table.percent_at(payout_type, clamped) / 100.0
}

pub fn find_roll_up_option<'a>(
    config: &'a ProductConfig,
    selected: Option<&str>,
) -> Option<&'a RollUpOption> {
    let rider = config.income_rider.as_ref()?;
    match selected {
        Some(id) => rider.roll_up_options.iter().find(|o| o.id == id),
        None => rider.roll_up_options.first(),
    }
}

pub fn get_roll_up_for_year(
    config: &ProductConfig,
    deferral_year_index: u32,
    selected_option: Option<&str>,
) -> Option<RollUp> {
    let option = find_roll_up_option(config, selected_option)?;
    if deferral_year_index == 0 || deferral_year_index > option.max_period {
        return None;
    }

    let rate = match &option.schedule {
        RollUpSchedule::Flat(rate) => *rate,
        RollUpSchedule::Tiered(tiers) => {
            let tier = tiers
                .iter()
                .find(|t| (t.start_year..=t.end_year).contains(&deferral_year_index));
            match tier {
                Some(t) => t.rate,
                None => {
                    table_gap!(
                        table = "roll_up",
                        product = %config.id,
                        option = %option.id,
                        deferral_year_index,
                        "no roll-up tier covers this deferral year"
                    );
                    return None;
                }
            }
        }
    };

    Some(RollUp {
        rate,
        compounding: option.compounding,
        max_period: option.max_period,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn product(id: &str) -> &'static ProductConfig {
        find_product(id).expect("catalog product")
    }

    #[test]
    fn catalog_ids_are_unique_and_families_match_riders() {
        let mut ids = catalog().iter().map(|p| p.id.as_str()).collect::<Vec<_>>();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), catalog().len());
        for p in catalog() {
            assert_eq!(
                p.income_rider.is_some(),
                p.family == ProductFamily::GuaranteedIncome,
                "{}",
                p.id
            );
        }
        assert!(find_product("does-not-exist").is_none());
    }

    #[test]
    fn bonus_resolution_filters_by_timing_and_target() {
        let growth = product("summit-growth-7-plus");
        assert_approx(resolve_bonus(growth, BonusTiming::Issue), 5.0);
        assert_approx(resolve_bonus(growth, BonusTiming::Anniversary(3)), 3.0);
        assert_approx(resolve_bonus(growth, BonusTiming::Anniversary(2)), 0.0);

        let gi = product("lifetime-income-plus");
        assert_eq!(resolve_bonus_split(gi, BonusTiming::Issue), (20.0, 0.0));
        let tiered = product("secure-income-tiered");
        assert_eq!(resolve_bonus_split(tiered, BonusTiming::Issue), (10.0, 10.0));
        assert_eq!(
            resolve_bonus_split(tiered, BonusTiming::Anniversary(1)),
            (2.0, 0.0)
        );
    }

    #[test]
    fn surrender_charge_is_zero_past_schedule() {
        let p = product("summit-growth-10");
        assert_approx(resolve_surrender_charge(p, 0), 10.0);
        assert_approx(resolve_surrender_charge(p, 9), 1.0);
        assert_approx(resolve_surrender_charge(p, 10), 0.0);
        assert_approx(resolve_surrender_charge(p, 40), 0.0);
    }

    #[test]
    fn payout_factor_clamps_age_to_table_range() {
        let p = product("lifetime-income-plus");
        assert_approx(
            get_payout_factor(p, PayoutType::Single, 50, PayoutOption::Level),
            0.04,
        );
        assert_approx(
            get_payout_factor(p, PayoutType::Single, 65, PayoutOption::Level),
            0.055,
        );
        assert_approx(
            get_payout_factor(p, PayoutType::Joint, 65, PayoutOption::Level),
            0.05,
        );
        assert_approx(
            get_payout_factor(p, PayoutType::Single, 92, PayoutOption::Level),
            0.07,
        );
        assert_approx(
            get_payout_factor(p, PayoutType::Single, 45, PayoutOption::Level),
            0.04,
        );

        let tiered = product("secure-income-tiered");
        assert_approx(
            get_payout_factor(tiered, PayoutType::Single, 50, PayoutOption::Level),
            0.0475,
        );
        // Missing increasing table falls back to level.
        assert_approx(
            get_payout_factor(tiered, PayoutType::Single, 55, PayoutOption::Increasing),
            0.0475,
        );
        assert_approx(
            get_payout_factor(product("summit-growth-10"), PayoutType::Single, 65, PayoutOption::Level),
            0.0,
        );
    }

    #[test]
    fn flat_roll_up_stops_after_max_period() {
        let p = product("lifetime-income-plus");
        let first = get_roll_up_for_year(p, 1, None).expect("roll-up in year 1");
        assert_approx(first.rate, 7.0);
        assert_eq!(first.compounding, Compounding::Compound);
        assert!(get_roll_up_for_year(p, 10, None).is_some());
        assert!(get_roll_up_for_year(p, 11, None).is_none());
        assert!(get_roll_up_for_year(p, 0, None).is_none());

        let simple = get_roll_up_for_year(p, 3, Some("simple-10")).expect("simple option");
        assert_eq!(simple.compounding, Compounding::Simple);
        assert_approx(simple.rate, 10.0);
        assert!(get_roll_up_for_year(p, 3, Some("missing")).is_none());
    }

    #[test]
    fn tiered_roll_up_selects_containing_tier() {
        let p = product("secure-income-tiered");
        assert_approx(get_roll_up_for_year(p, 5, None).map(|r| r.rate).unwrap_or(-1.0), 8.0);
        assert_approx(get_roll_up_for_year(p, 6, None).map(|r| r.rate).unwrap_or(-1.0), 6.0);
        assert!(get_roll_up_for_year(p, 11, None).is_none());
    }

    #[test]
    fn tiered_gap_yields_no_roll_up() {
        let mut p = product("secure-income-tiered").clone();
        if let Some(rider) = p.income_rider.as_mut() {
            rider.roll_up_options[0].schedule = RollUpSchedule::Tiered(vec![
                RollUpTier {
                    start_year: 1,
                    end_year: 3,
                    rate: 8.0,
                },
                RollUpTier {
                    start_year: 5,
                    end_year: 10,
                    rate: 6.0,
                },
            ]);
        }
        let (gap, logs) = capture_logs(|| get_roll_up_for_year(&p, 4, None));
        assert!(gap.is_none());
        assert!(logs.contains("rothplan::table_gap"), "logs: {logs}");
        assert!(logs.contains("deferral_year_index=4"), "logs: {logs}");
        assert!(get_roll_up_for_year(&p, 5, None).is_some());
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().expect("log buffer").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .finish();
        let value = tracing::subscriber::with_default(subscriber, f);
        let text = String::from_utf8(logs.0.lock().expect("log buffer").clone())
            .expect("utf-8 log output");
        (value, text)
    }

    #[test]
    fn clamped_payout_age_is_logged_as_table_gap() {
        let p = product("lifetime-income-plus");
        let (factor, logs) =
            capture_logs(|| get_payout_factor(p, PayoutType::Single, 92, PayoutOption::Level));
        assert_approx(factor, 0.07);
        let line = logs
            .lines()
            .find(|l| l.contains("rothplan::table_gap"))
            .unwrap_or_else(|| panic!("no table gap event in: {logs}"));
        assert!(line.contains("WARN"));
        assert!(line.contains("age=92"));
        assert!(line.contains("clamped=80"));

        let (_, quiet) =
            capture_logs(|| get_payout_factor(p, PayoutType::Single, 65, PayoutOption::Level));
        assert!(!quiet.contains("rothplan::table_gap"), "logs: {quiet}");
    }
}
