pub type Cents = i64;

pub const CENTS_PER_DOLLAR: Cents = 100;

pub fn dollars(whole_dollars: i64) -> Cents {
    whole_dollars * CENTS_PER_DOLLAR
}

/// `amount * rate_percent / 100`, rounded half away from zero to whole cents.
pub fn percent_of(amount: Cents, rate_percent: f64) -> Cents {
    if amount == 0 || rate_percent == 0.0 {
        return 0;
    }
    (amount as f64 * rate_percent / 100.0).round() as Cents
}

pub fn fraction_of(amount: Cents, fraction: f64) -> Cents {
    if amount == 0 || fraction == 0.0 {
        return 0;
    }
    (amount as f64 * fraction).round() as Cents
}

pub fn grow(amount: Cents, rate_percent: f64) -> Cents {
    amount.saturating_add(percent_of(amount, rate_percent))
}

pub fn index_dollars(whole_dollars: i64, rate_percent: f64, years: u32) -> Cents {
    if years == 0 {
        return dollars(whole_dollars);
    }
    let factor = (1.0 + rate_percent / 100.0).powi(years as i32);
    dollars((whole_dollars as f64 * factor).round() as i64)
}

pub fn percent_change(base: Cents, new: Cents) -> f64 {
    if base <= 0 {
        return 0.0;
    }
    (new - base) as f64 / base as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_of_rounds_half_away_from_zero() {
        assert_eq!(percent_of(50, 1.0), 1);
        assert_eq!(percent_of(-50, 1.0), -1);
        assert_eq!(percent_of(dollars(588_500), 24.0), dollars(141_240));
    }

    #[test]
    fn grow_compounds_on_cents() {
        assert_eq!(grow(dollars(550_000), 7.0), dollars(588_500));
        assert_eq!(grow(0, 7.0), 0);
    }

    #[test]
    fn grow_saturates_instead_of_wrapping() {
        assert_eq!(grow(Cents::MAX / 2 + 1, 100.0), Cents::MAX);
        assert_eq!(grow(Cents::MAX, 5.0), Cents::MAX);
        assert_eq!(percent_of(Cents::MAX, 1e6), Cents::MAX);
    }

    #[test]
    fn index_dollars_rounds_to_whole_dollars() {
        assert_eq!(index_dollars(12_400, 3.0, 0), dollars(12_400));
        assert_eq!(index_dollars(12_400, 3.0, 1), dollars(12_772));
        assert_eq!(index_dollars(12_400, 3.0, 2), dollars(13_155));
    }

    #[test]
    fn percent_change_has_defined_sentinel_for_non_positive_base() {
        assert_eq!(percent_change(0, 100), 0.0);
        assert_eq!(percent_change(-10, 100), 0.0);
        assert!((percent_change(200, 250) - 25.0).abs() < 1e-9);
    }
}
