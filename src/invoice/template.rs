//! Template population.
//!
//! Rewrites the fixed invoice fields inside a working copy of a tenant's
//! spreadsheet template. Cell positions are fixed business logic, matching
//! the layout of the rent invoice templates in use; this is deliberately not
//! a configurable schema.

use std::path::Path;

use thiserror::Error;
use umya_spreadsheet::XlsxError;

use super::period::FiscalPeriod;

const INVOICE_NUMBER_CELL: &str = "A9";
const INVOICE_DATE_CELL: &str = "J9";
const BILLING_LABEL_CELL: &str = "A22";
const DATE_RANGE_CELL: &str = "A23";
const DAY_COUNT_CELL: &str = "J23";

/// Errors from opening or saving the working spreadsheet.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("failed to open spreadsheet template: {0}")]
    Open(#[source] XlsxError),
    #[error("template workbook has no worksheet")]
    NoWorksheet,
    #[error("failed to save populated spreadsheet: {0}")]
    Save(#[source] XlsxError),
}

/// Write the computed invoice fields into the spreadsheet at `path`.
///
/// `path` must be a caller-owned working copy; the shared template asset is
/// never touched here. Fields written: invoice number, invoice date (first
/// of the billing month), billing-period label, explicit date range, and the
/// numeric day count.
pub fn populate_template(
    path: &Path,
    invoice_code: &str,
    period: &FiscalPeriod,
) -> Result<(), TemplateError> {
    let mut book = umya_spreadsheet::reader::xlsx::read(path).map_err(TemplateError::Open)?;
    let sheet = book.get_sheet_mut(&0).ok_or(TemplateError::NoWorksheet)?;

    sheet
        .get_cell_mut(INVOICE_NUMBER_CELL)
        .set_value(format!("Invoice Number- {}", period.invoice_number(invoice_code)));
    sheet
        .get_cell_mut(INVOICE_DATE_CELL)
        .set_value(period.invoice_date());
    sheet
        .get_cell_mut(BILLING_LABEL_CELL)
        .set_value(period.billing_label());
    sheet
        .get_cell_mut(DATE_RANGE_CELL)
        .set_value(period.date_range());
    sheet
        .get_cell_mut(DAY_COUNT_CELL)
        .set_value_number(period.day_count as f64);

    umya_spreadsheet::writer::xlsx::write(&book, path).map_err(TemplateError::Save)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_period() -> FiscalPeriod {
        FiscalPeriod::for_date(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap())
    }

    #[test]
    fn test_populate_writes_expected_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Invoice.xlsx");
        let book = umya_spreadsheet::new_file();
        umya_spreadsheet::writer::xlsx::write(&book, &path).unwrap();

        populate_template(&path, "BIG", &sample_period()).unwrap();

        let book = umya_spreadsheet::reader::xlsx::read(&path).unwrap();
        let sheet = book.get_sheet(&0).unwrap();
        assert_eq!(
            sheet.get_cell(INVOICE_NUMBER_CELL).unwrap().get_value(),
            "Invoice Number- 10/BIG/25-26"
        );
        assert_eq!(sheet.get_cell(INVOICE_DATE_CELL).unwrap().get_value(), "01/01/2026");
        assert_eq!(
            sheet.get_cell(BILLING_LABEL_CELL).unwrap().get_value(),
            "Rent for the month of Jan,26"
        );
        assert_eq!(
            sheet.get_cell(DATE_RANGE_CELL).unwrap().get_value(),
            "(01/01/2026 - 31/01/2026)"
        );
        assert_eq!(sheet.get_cell(DAY_COUNT_CELL).unwrap().get_value(), "31");
    }

    #[test]
    fn test_missing_file_is_an_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = populate_template(&dir.path().join("absent.xlsx"), "BIG", &sample_period());
        assert!(matches!(err, Err(TemplateError::Open(_))));
    }
}
