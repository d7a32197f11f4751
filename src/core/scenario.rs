use super::money::Cents;
use super::tax::{IncomeComponents, TaxContext, compute_year_tax};
use super::types::{ConversionType, HouseholdProfile, ProductSelection, YearRow};

#[derive(Debug, Clone, Copy)]
pub struct ProjectionContext<'a> {
    pub household: &'a HouseholdProfile,
    pub selection: &'a ProductSelection,
    pub start_year: u32,
    pub end_year: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutsideIncome {
    pub social_security: Cents,
    pub taxable: Cents,
    pub tax_exempt: Cents,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttributableTax {
    pub federal_tax: Cents,
    pub state_tax: Cents,
    pub irmaa_surcharge: Cents,
    pub magi: Cents,
}

impl AttributableTax {
    pub fn total_tax(&self) -> Cents {
        self.federal_tax + self.state_tax
    }
}

impl<'a> ProjectionContext<'a> {
    pub fn new(
        household: &'a HouseholdProfile,
        selection: &'a ProductSelection,
        start_year: u32,
        end_year: u32,
    ) -> Self {
        Self {
            household,
            selection,
            start_year,
            end_year,
        }
    }

    pub fn years(&self) -> u32 {
        self.end_year - self.start_year + 1
    }

    pub fn year(&self, year_index: u32) -> u32 {
        self.start_year + year_index
    }

    pub fn age(&self, year_index: u32) -> u32 {
        self.household.age + year_index
    }

    pub fn spouse_age(&self, year_index: u32) -> Option<u32> {
        self.household.spouse_age.map(|a| a + year_index)
    }

    pub fn outside_income(&self, year_index: u32) -> OutsideIncome {
        let h = self.household;
        let age = self.age(year_index);
        let spouse_age = self.spouse_age(year_index);
        let year = self.year(year_index);

        let primary_ss = h
            .social_security
            .filter(|s| age >= s.start_age)
            .map_or(0, |s| s.annual_amount);
        let spouse_ss = h
            .spouse_social_security
            .zip(spouse_age)
            .filter(|(s, a)| *a >= s.start_age)
            .map_or(0, |(s, _)| s.annual_amount);
        let pension = h
            .pension
            .filter(|p| age >= p.start_age)
            .map_or(0, |p| p.annual_amount);

        let (other_taxable, other_exempt) = h
            .other_income
            .iter()
            .filter(|e| e.year == year)
            .fold((0, 0), |(t, e): (Cents, Cents), entry| {
                (t.saturating_add(entry.taxable), e.saturating_add(entry.tax_exempt))
            });

        OutsideIncome {
            social_security: primary_ss + spouse_ss,
            taxable: pension + other_taxable,
            tax_exempt: other_exempt,
        }
    }

    pub fn tax_context(&self, year_index: u32) -> TaxContext<'a> {
        let h = self.household;
        TaxContext {
            filing_status: h.filing_status,
            state: h.state.as_str(),
            year: self.year(year_index),
            age: self.age(year_index),
            spouse_age: self.spouse_age(year_index),
            tax_mode: h.tax_mode,
            federal_rate: h.federal_tax_rate,
            state_rate: h.state_tax_rate,
        }
    }

    /// Tax with `extra_ordinary` added minus tax without it.
    pub fn attributable_tax(&self, year_index: u32, extra_ordinary: Cents) -> AttributableTax {
        let outside = self.outside_income(year_index);
        let ctx = self.tax_context(year_index);
        let without = IncomeComponents {
            ordinary: outside.taxable,
            social_security: outside.social_security,
            tax_exempt: outside.tax_exempt,
        };
        let before = compute_year_tax(&without, &ctx);
        if extra_ordinary <= 0 {
            return AttributableTax {
                magi: before.magi,
                ..AttributableTax::default()
            };
        }

        let with = IncomeComponents {
            ordinary: outside.taxable + extra_ordinary,
            ..without
        };
        let after = compute_year_tax(&with, &ctx);
        AttributableTax {
            federal_tax: after.federal_tax - before.federal_tax,
            state_tax: after.state_tax - before.state_tax,
            irmaa_surcharge: after.irmaa_surcharge - before.irmaa_surcharge,
            magi: after.magi,
        }
    }

    pub fn in_conversion_window(&self, year_index: u32) -> bool {
        let age = self.age(year_index);
        let first = self.household.age + self.selection.deferral_years;
        let last = self
            .selection
            .conversion_end_age
            .unwrap_or(self.household.end_age);
        age >= first && age <= last
    }

    pub fn row_template(&self, year_index: u32) -> YearRow {
        let outside = self.outside_income(year_index);
        YearRow {
            year: self.year(year_index),
            age: self.age(year_index),
            spouse_age: self.spouse_age(year_index),
            social_security: outside.social_security,
            other_taxable_income: outside.taxable,
            other_tax_exempt_income: outside.tax_exempt,
            ..YearRow::default()
        }
    }
}

pub fn conversion_amount(
    selection: &ProductSelection,
    balance: Cents,
    remaining_years: Option<u32>,
) -> Cents {
    if balance <= 0 {
        return 0;
    }
    match selection.conversion_type {
        ConversionType::NoConversion => 0,
        ConversionType::FullConversion | ConversionType::OptimizedAmount => match remaining_years
        {
            Some(years) if years > 1 => balance / i64::from(years),
            _ => balance,
        },
        ConversionType::FixedAmount => selection.fixed_conversion_amount.clamp(0, balance),
    }
}

pub fn apply_tax(row: &mut YearRow, tax: &AttributableTax) {
    row.federal_tax = tax.federal_tax;
    row.state_tax = tax.state_tax;
    row.irmaa_surcharge = tax.irmaa_surcharge;
    row.total_tax = tax.total_tax();
    row.magi = tax.magi;
}

pub fn finish_balances(row: &mut YearRow, traditional: Cents, roth: Cents, taxable: Cents) {
    row.traditional_balance = traditional;
    row.roth_balance = roth;
    row.taxable_balance = taxable;
    row.net_worth = traditional + roth + taxable;
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::money::dollars;
    use crate::core::types::{IncomeEntry, IncomeStream, TaxMode};

    #[test]
    fn outside_income_respects_start_ages_and_year_entries() {
        let mut h = fixtures::household();
        h.spouse_age = Some(60);
        h.social_security = Some(IncomeStream {
            annual_amount: dollars(24_000),
            start_age: 67,
        });
        h.spouse_social_security = Some(IncomeStream {
            annual_amount: dollars(12_000),
            start_age: 62,
        });
        h.pension = Some(IncomeStream {
            annual_amount: dollars(10_000),
            start_age: 62,
        });
        h.other_income = vec![IncomeEntry {
            year: 2027,
            taxable: dollars(5_000),
            tax_exempt: dollars(1_000),
        }];
        let selection = ProductSelection::default();
        let ctx = ProjectionContext::new(&h, &selection, 2026, 2049);

        let first = ctx.outside_income(0);
        assert_eq!(first.social_security, 0);
        assert_eq!(first.taxable, dollars(10_000));

        let second = ctx.outside_income(1);
        assert_eq!(second.taxable, dollars(15_000));
        assert_eq!(second.tax_exempt, dollars(1_000));

        // spouse turns 62 in year index 2, primary turns 67 in index 5
        assert_eq!(ctx.outside_income(2).social_security, dollars(12_000));
        assert_eq!(ctx.outside_income(5).social_security, dollars(36_000));
    }

    #[test]
    fn attributable_tax_is_incremental_over_outside_income() {
        let mut h = fixtures::household();
        h.tax_mode = TaxMode::Brackets;
        h.pension = Some(IncomeStream {
            annual_amount: dollars(26_100),
            start_age: 60,
        });
        let selection = ProductSelection::default();
        let ctx = ProjectionContext::new(&h, &selection, 2026, 2049);

        // Pension alone fills the 10% bracket exactly up to 10,000 taxable; the next
        // 2,400 is still 10%, the rest at 12%.
        let tax = ctx.attributable_tax(0, dollars(10_000));
        assert_eq!(tax.federal_tax, dollars(240 + 912));
        assert_eq!(ctx.attributable_tax(0, 0).total_tax(), 0);
    }

    #[test]
    fn conversion_amount_by_type() {
        let mut selection = ProductSelection::default();
        assert_eq!(conversion_amount(&selection, dollars(100), None), dollars(100));
        assert_eq!(conversion_amount(&selection, dollars(100), Some(4)), dollars(25));
        assert_eq!(conversion_amount(&selection, dollars(100), Some(1)), dollars(100));

        selection.conversion_type = ConversionType::FixedAmount;
        selection.fixed_conversion_amount = dollars(30);
        assert_eq!(conversion_amount(&selection, dollars(100), None), dollars(30));
        assert_eq!(conversion_amount(&selection, dollars(20), None), dollars(20));

        selection.conversion_type = ConversionType::NoConversion;
        assert_eq!(conversion_amount(&selection, dollars(100), None), 0);
        assert_eq!(conversion_amount(&ProductSelection::default(), 0, None), 0);
    }

    #[test]
    fn conversion_window_honours_deferral_and_end_age() {
        let h = fixtures::household();
        let selection = ProductSelection {
            deferral_years: 2,
            conversion_end_age: Some(66),
            ..ProductSelection::default()
        };
        let ctx = ProjectionContext::new(&h, &selection, 2026, 2049);
        let open = (0..8).map(|i| ctx.in_conversion_window(i)).collect::<Vec<_>>();
        assert_eq!(
            open,
            vec![false, false, true, true, true, false, false, false]
        );
    }
}
