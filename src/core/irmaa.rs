use serde::Serialize;

use super::money::{Cents, dollars, index_dollars};

pub const IRMAA_BASE_YEAR: u32 = 2026;
pub const IRMAA_INDEXING_RATE: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IrmaaTier {
    pub tier: u8,
    pub lower_threshold: Cents,
    pub annual_surcharge: Cents,
}

// (lower threshold, annual surcharge) in whole dollars.
const JOINT_TIERS: [(i64, i64); 6] = [
    (0, 0),
    (206_000, 2_000),
    (258_000, 4_200),
    (322_000, 6_600),
    (386_000, 9_000),
    (750_000, 9_900),
];

const SINGLE_TIERS: [(i64, i64); 6] = [
    (0, 0),
    (103_000, 1_000),
    (129_000, 2_100),
    (161_000, 3_300),
    (193_000, 4_500),
    (500_000, 4_950),
];

pub fn irmaa_tiers(is_joint: bool, year: u32) -> Vec<IrmaaTier> {
    let table = if is_joint { &JOINT_TIERS } else { &SINGLE_TIERS };
    let years = year.saturating_sub(IRMAA_BASE_YEAR);
    table
        .iter()
        .enumerate()
        .map(|(idx, &(lower, surcharge))| IrmaaTier {
            tier: idx as u8,
            lower_threshold: index_dollars(lower, IRMAA_INDEXING_RATE, years),
            annual_surcharge: dollars(surcharge),
        })
        .collect()
}

pub fn get_irmaa_tier(magi: Cents, is_joint: bool, year: u32) -> IrmaaTier {
    let tiers = irmaa_tiers(is_joint, year);
    let base = tiers[0];
    tiers
        .into_iter()
        .rev()
        .find(|t| t.lower_threshold <= magi)
        .unwrap_or(base)
}

pub fn get_irmaa_surcharge(magi: Cents, is_joint: bool, year: u32) -> Cents {
    get_irmaa_tier(magi, is_joint, year).annual_surcharge
}

pub fn calculate_irmaa_headroom(magi: Cents, is_joint: bool, year: u32) -> Option<Cents> {
    let current = get_irmaa_tier(magi, is_joint, year);
    irmaa_tiers(is_joint, year)
        .into_iter()
        .find(|t| t.tier == current.tier + 1)
        .map(|next| (next.lower_threshold - magi).max(0))
}
