//! Workbook restore.
//!
//! Reads a workbook in the export layout, coerces each row defensively and
//! replaces the purchases and merchants collections in one mutation. Every
//! value that had to be guessed is reported as an `ImportWarning`; nothing is
//! written when a required sheet is missing.
use anyhow::Result;
use calamine::{Data, Range, Reader, Xlsx};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use log::{info, warn};
use shared::ImportWarning;
use std::collections::HashMap;
use std::io::Cursor;

use crate::domain::errors::DomainError;
use crate::domain::export_service::{from_excel_serial, MERCHANTS_SHEET, PURCHASES_SHEET};
use crate::domain::models::merchant::normalize_location;
use crate::domain::models::{Merchant, Purchase};
use crate::domain::state::{Mutation, StateManager};

const TEXT_DATE_TIME_FORMATS: [&str; 4] = ["%d/%m/%Y %H:%M", "%d/%m/%Y %H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
const TEXT_DATE_FORMATS: [&str; 3] = ["%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y"];

/// Rows parsed from a workbook
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedWorkbook {
    pub purchases: Vec<Purchase>,
    pub merchants: Vec<Merchant>,
    pub warnings: Vec<ImportWarning>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Column {
    Id,
    Date,
    Merchant,
    Location,
    Description,
    Amount,
    Discount,
    FinalAmount,
    Receipt,
    Name,
}

fn fold_accents(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' => 'a',
            'é' => 'e',
            'í' => 'i',
            'ó' => 'o',
            'ú' | 'ü' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}

fn purchase_column(header: &str) -> Option<Column> {
    match fold_accents(header).as_str() {
        "id" => Some(Column::Id),
        "fecha" | "date" => Some(Column::Date),
        "comercio" | "merchant" | "merchant name" => Some(Column::Merchant),
        "ubicacion" | "location" => Some(Column::Location),
        "descripcion" | "description" => Some(Column::Description),
        "monto original" | "monto" | "amount" => Some(Column::Amount),
        "descuento" | "discount" => Some(Column::Discount),
        "monto final" | "final amount" => Some(Column::FinalAmount),
        "comprobante" | "receipt" => Some(Column::Receipt),
        _ => None,
    }
}

fn merchant_column(header: &str) -> Option<Column> {
    match fold_accents(header).as_str() {
        "id" => Some(Column::Id),
        "nombre" | "name" | "comercio" => Some(Column::Name),
        "ubicacion" | "location" => Some(Column::Location),
        _ => None,
    }
}

fn cell_text(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::Empty | Data::Error(_) => return None,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.as_f64().to_string(),
    };
    (!text.is_empty()).then_some(text)
}

fn parse_text_date(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(text) {
        return Some(date.with_timezone(&Utc));
    }
    for format in TEXT_DATE_TIME_FORMATS {
        if let Ok(date) = NaiveDateTime::parse_from_str(text, format) {
            return Some(date.and_utc());
        }
    }
    for format in TEXT_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return date.and_hms_opt(0, 0, 0).map(|d| d.and_utc());
        }
    }
    None
}

/// One worksheet row with its header mapping and the warning sink
struct RowReader<'a> {
    sheet: &'static str,
    row_number: usize,
    cells: &'a [Data],
    columns: &'a HashMap<Column, usize>,
    warnings: &'a mut Vec<ImportWarning>,
}

impl RowReader<'_> {
    fn warn(&mut self, field: &str, message: impl Into<String>) {
        self.warnings.push(ImportWarning {
            sheet: self.sheet.to_string(),
            row: self.row_number,
            field: field.to_string(),
            message: message.into(),
        });
    }

    fn cell(&self, column: Column) -> Option<&Data> {
        self.columns.get(&column).and_then(|&index| self.cells.get(index))
    }

    fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| cell_text(c).is_none())
    }

    fn text(&self, column: Column) -> Option<String> {
        self.cell(column).and_then(cell_text)
    }

    fn number(&mut self, column: Column, field: &str) -> f64 {
        let value = match self.cell(column) {
            Some(Data::Float(f)) => Some(*f),
            Some(Data::Int(i)) => Some(*i as f64),
            Some(Data::String(s)) => s.trim().replace(',', ".").parse::<f64>().ok(),
            _ => None,
        };
        match value {
            Some(v) if v.is_finite() => v,
            _ => {
                let raw = self.text(column).unwrap_or_default();
                self.warn(field, format!("Could not read number '{}', using 0", raw));
                0.0
            }
        }
    }

    fn date(&mut self, now: DateTime<Utc>) -> DateTime<Utc> {
        let parsed = match self.cell(Column::Date) {
            Some(Data::Float(f)) => from_excel_serial(*f),
            Some(Data::Int(i)) => from_excel_serial(*i as f64),
            Some(Data::DateTime(dt)) => from_excel_serial(dt.as_f64()),
            Some(Data::String(s)) | Some(Data::DateTimeIso(s)) => parse_text_date(s.trim()),
            _ => None,
        };
        parsed.unwrap_or_else(|| {
            let raw = self.text(Column::Date).unwrap_or_default();
            self.warn("date", format!("Could not read date '{}', using the import time", raw));
            now
        })
    }

    fn id(&mut self, generate: fn() -> String) -> String {
        self.text(Column::Id).unwrap_or_else(|| {
            let id = generate();
            self.warn("id", format!("Missing id, generated {}", id));
            id
        })
    }
}

fn header_map(range: &Range<Data>, resolve: fn(&str) -> Option<Column>) -> HashMap<Column, usize> {
    let mut columns = HashMap::new();
    if let Some(header) = range.rows().next() {
        for (index, cell) in header.iter().enumerate() {
            if let Some(column) = cell_text(cell).as_deref().and_then(resolve) {
                columns.entry(column).or_insert(index);
            }
        }
    }
    columns
}

fn parse_purchases(range: &Range<Data>, now: DateTime<Utc>, warnings: &mut Vec<ImportWarning>) -> Vec<Purchase> {
    let columns = header_map(range, purchase_column);
    let mut purchases = Vec::new();

    for (index, cells) in range.rows().enumerate().skip(1) {
        let mut row = RowReader {
            sheet: PURCHASES_SHEET,
            row_number: index + 1,
            cells,
            columns: &columns,
            warnings: &mut *warnings,
        };
        if row.is_blank() {
            continue;
        }

        let id = row.id(Purchase::generate_id);
        let date = row.date(now);
        let merchant_name = row.text(Column::Merchant).unwrap_or_else(|| {
            row.warn("merchant_name", "Missing merchant name");
            String::new()
        });
        let amount = row.number(Column::Amount, "amount");
        let discount_applied = row.number(Column::Discount, "discount_applied");
        let final_amount = row.number(Column::FinalAmount, "final_amount");

        purchases.push(Purchase {
            id,
            amount,
            date,
            merchant_name,
            merchant_location: normalize_location(row.text(Column::Location).as_deref()),
            description: row.text(Column::Description),
            receipt_image: row.text(Column::Receipt),
            discount_applied,
            final_amount,
        });
    }
    purchases
}

fn parse_merchants(range: &Range<Data>, warnings: &mut Vec<ImportWarning>) -> Vec<Merchant> {
    let columns = header_map(range, merchant_column);
    let mut merchants = Vec::new();

    for (index, cells) in range.rows().enumerate().skip(1) {
        let mut row = RowReader {
            sheet: MERCHANTS_SHEET,
            row_number: index + 1,
            cells,
            columns: &columns,
            warnings: &mut *warnings,
        };
        if row.is_blank() {
            continue;
        }

        let Some(name) = row.text(Column::Name) else {
            row.warn("name", "Missing merchant name, row skipped");
            continue;
        };
        let id = row.id(Merchant::generate_id);
        merchants.push(Merchant {
            id,
            name,
            location: normalize_location(row.text(Column::Location).as_deref()),
        });
    }
    merchants
}

/// Parse workbook bytes. Fails when either required sheet is absent.
pub fn parse_workbook(bytes: &[u8], now: DateTime<Utc>) -> Result<ParsedWorkbook> {
    let mut workbook: Xlsx<_> =
        Xlsx::new(Cursor::new(bytes.to_vec())).map_err(|e| DomainError::MalformedWorkbook(e.to_string()))?;

    let sheet_names = workbook.sheet_names();
    for required in [PURCHASES_SHEET, MERCHANTS_SHEET] {
        if !sheet_names.iter().any(|name| name == required) {
            warn!("📥 IMPORT: Workbook has no '{}' sheet", required);
            return Err(DomainError::MissingSheet(required.to_string()).into());
        }
    }

    let purchases_range = workbook
        .worksheet_range(PURCHASES_SHEET)
        .map_err(|e| DomainError::MalformedWorkbook(e.to_string()))?;
    let merchants_range = workbook
        .worksheet_range(MERCHANTS_SHEET)
        .map_err(|e| DomainError::MalformedWorkbook(e.to_string()))?;

    let mut warnings = Vec::new();
    let purchases = parse_purchases(&purchases_range, now, &mut warnings);
    let merchants = parse_merchants(&merchants_range, &mut warnings);

    Ok(ParsedWorkbook {
        purchases,
        merchants,
        warnings,
    })
}

#[derive(Clone)]
pub struct ImportService {
    state: StateManager,
}

impl ImportService {
    pub fn new(state: StateManager) -> Self {
        Self { state }
    }

    /// Replace purchases and merchants with the workbook content
    pub async fn restore_workbook(&self, bytes: &[u8], now: DateTime<Utc>) -> Result<ParsedWorkbook> {
        let parsed = parse_workbook(bytes, now)?;
        self.state
            .commit(Mutation::ReplaceCollections {
                purchases: parsed.purchases.clone(),
                merchants: parsed.merchants.clone(),
            })
            .await?;

        info!(
            "📥 IMPORT: Restored {} purchases and {} merchants ({} warnings)",
            parsed.purchases.len(),
            parsed.merchants.len(),
            parsed.warnings.len()
        );
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::export_service::{render_workbook, to_excel_serial, PURCHASE_COLUMNS};
    use chrono::TimeZone;
    use rust_xlsxwriter::Workbook;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 1, 9, 0, 0).unwrap()
    }

    fn sample_purchase() -> Purchase {
        Purchase {
            id: "purchase::abc".to_string(),
            amount: 45.5,
            date: Utc.with_ymd_and_hms(2025, 7, 14, 20, 30, 0).unwrap(),
            merchant_name: "Café Tortoni".to_string(),
            merchant_location: Some("Av. de Mayo".to_string()),
            description: Some("Cena".to_string()),
            receipt_image: None,
            discount_applied: 5.69,
            final_amount: 39.81,
        }
    }

    #[test]
    fn test_export_then_parse_preserves_records() {
        let merchant = Merchant {
            id: "merchant::1".to_string(),
            name: "Café Tortoni".to_string(),
            location: Some("Av. de Mayo".to_string()),
        };
        let bytes = render_workbook(&[sample_purchase()], &[merchant.clone()]).unwrap();

        let parsed = parse_workbook(&bytes, now()).unwrap();
        assert!(parsed.warnings.is_empty(), "unexpected warnings: {:?}", parsed.warnings);
        assert_eq!(parsed.purchases, vec![sample_purchase()]);
        assert_eq!(parsed.merchants, vec![merchant]);
    }

    #[test]
    fn test_missing_merchants_sheet_fails() {
        let mut workbook = Workbook::new();
        workbook.add_worksheet().set_name(PURCHASES_SHEET).unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let err = parse_workbook(&bytes, now()).unwrap_err();
        match err.downcast_ref::<DomainError>() {
            Some(DomainError::MissingSheet(sheet)) => assert_eq!(sheet, MERCHANTS_SHEET),
            other => panic!("expected missing sheet, got {:?}", other),
        }
    }

    #[test]
    fn test_not_a_workbook_is_malformed() {
        let err = parse_workbook(b"definitely not a zip", now()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DomainError>(),
            Some(DomainError::MalformedWorkbook(_))
        ));
    }

    #[test]
    fn test_defensive_row_parsing_records_warnings() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name(PURCHASES_SHEET).unwrap();
        for (col, title) in PURCHASE_COLUMNS.iter().enumerate() {
            sheet.write_string(0, col as u16, *title).unwrap();
        }
        // Row 2: text date, text amount with decimal comma, no id, bad discount.
        sheet.write_string(1, 1, "14/07/2025 20:30").unwrap();
        sheet.write_string(1, 2, "Parrilla").unwrap();
        sheet.write_string(1, 5, "1234,5").unwrap();
        sheet.write_string(1, 6, "n/a").unwrap();
        sheet.write_number(1, 7, 1049.33).unwrap();
        // Row 3: unreadable date, serial-less.
        sheet.write_string(2, 0, "purchase::x").unwrap();
        sheet.write_string(2, 1, "someday").unwrap();
        sheet.write_string(2, 2, "Bar").unwrap();
        sheet.write_number(2, 5, 10.0).unwrap();
        sheet.write_number(2, 6, 1.5).unwrap();
        sheet.write_number(2, 7, 8.5).unwrap();
        let merchants = workbook.add_worksheet();
        merchants.set_name(MERCHANTS_SHEET).unwrap();
        merchants.write_string(0, 0, "ID").unwrap();
        merchants.write_string(0, 1, "Nombre").unwrap();
        merchants.write_string(1, 1, "Parrilla").unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let parsed = parse_workbook(&bytes, now()).unwrap();
        assert_eq!(parsed.purchases.len(), 2);

        let first = &parsed.purchases[0];
        assert!(first.id.starts_with("purchase::"));
        assert_eq!(first.date, Utc.with_ymd_and_hms(2025, 7, 14, 20, 30, 0).unwrap());
        assert_eq!(first.amount, 1234.5);
        assert_eq!(first.discount_applied, 0.0);

        assert_eq!(parsed.purchases[1].date, now());
        assert_eq!(parsed.merchants.len(), 1);
        assert!(parsed.merchants[0].id.starts_with("merchant::"));

        let fields: Vec<(&str, usize, &str)> = parsed
            .warnings
            .iter()
            .map(|w| (w.sheet.as_str(), w.row, w.field.as_str()))
            .collect();
        assert_eq!(
            fields,
            vec![
                (PURCHASES_SHEET, 2, "id"),
                (PURCHASES_SHEET, 2, "discount_applied"),
                (PURCHASES_SHEET, 3, "date"),
                (MERCHANTS_SHEET, 2, "id"),
            ]
        );
    }

    #[test]
    fn test_serial_dates_are_read() {
        let date = Utc.with_ymd_and_hms(2024, 12, 24, 22, 15, 0).unwrap();
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name(PURCHASES_SHEET).unwrap();
        sheet.write_string(0, 0, "Fecha").unwrap();
        sheet.write_string(0, 1, "Comercio").unwrap();
        sheet.write_number(1, 0, to_excel_serial(date)).unwrap();
        sheet.write_string(1, 1, "Bar").unwrap();
        workbook.add_worksheet().set_name(MERCHANTS_SHEET).unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let parsed = parse_workbook(&bytes, now()).unwrap();
        assert_eq!(parsed.purchases[0].date, date);
    }
}
