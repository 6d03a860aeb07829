//! Fiscal period derivation.
//!
//! The billing year runs April through March: April is period 1, March is
//! period 12 of the fiscal year that started the previous April. Everything
//! here is a pure function of the reference date.

use chrono::{Datelike, NaiveDate};

/// Date-derived fields for one billing month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiscalPeriod {
    /// Position of the billing month within the April-start fiscal year (1-12).
    pub period_index: u32,
    /// Two-digit label of the fiscal year's starting calendar year.
    pub fy_start_short: String,
    /// Two-digit label of the fiscal year's ending calendar year.
    pub fy_end_short: String,
    /// Short month name of the billing month, e.g. "Jan".
    pub month_short: String,
    /// Two-digit calendar year of the billing month.
    pub year_short: String,
    /// First calendar day of the billing month.
    pub first_day: NaiveDate,
    /// Last calendar day of the billing month.
    pub last_day: NaiveDate,
    /// Number of days in the billing month.
    pub day_count: u32,
}

impl FiscalPeriod {
    /// Derive the period for an arbitrary reference date.
    pub fn for_date(reference: NaiveDate) -> Self {
        let month = reference.month();
        let year = reference.year();

        let (period_index, fy_start, fy_end) = if month >= 4 {
            (month - 3, year, year + 1)
        } else {
            (month + 9, year - 1, year)
        };

        let first_day = NaiveDate::from_ymd_opt(year, month, 1)
            .unwrap_or(reference);
        let (next_y, next_m) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
        let last_day = NaiveDate::from_ymd_opt(next_y, next_m, 1)
            .and_then(|d| d.pred_opt())
            .unwrap_or(reference);

        Self {
            period_index,
            fy_start_short: two_digit_year(fy_start),
            fy_end_short: two_digit_year(fy_end),
            month_short: first_day.format("%b").to_string(),
            year_short: two_digit_year(year),
            first_day,
            last_day,
            day_count: last_day.day(),
        }
    }

    /// Invoice number string: `{period index}/{code}/{fy-start}-{fy-end}`.
    pub fn invoice_number(&self, code: &str) -> String {
        format!(
            "{}/{}/{}-{}",
            self.period_index, code, self.fy_start_short, self.fy_end_short
        )
    }

    /// Invoice date: the first day of the billing month, `DD/MM/YYYY`.
    pub fn invoice_date(&self) -> String {
        self.first_day.format("%d/%m/%Y").to_string()
    }

    /// Free-text billing label, e.g. "Rent for the month of Jan,26".
    pub fn billing_label(&self) -> String {
        format!("Rent for the month of {},{}", self.month_short, self.year_short)
    }

    /// Explicit date range, e.g. "(01/01/2026 - 31/01/2026)".
    pub fn date_range(&self) -> String {
        format!(
            "({} - {})",
            self.first_day.format("%d/%m/%Y"),
            self.last_day.format("%d/%m/%Y")
        )
    }
}

fn two_digit_year(year: i32) -> String {
    format!("{:02}", year.rem_euclid(100))
}
