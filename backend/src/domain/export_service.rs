//! Export service: purchases as CSV and the full catalog as an `.xlsx` workbook.
//!
//! Both formats use the Spanish column names users already know from the
//! spreadsheet the tracker replaces. The workbook layout is shared with the
//! import side so an exported file restores cleanly.

use anyhow::Result;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use csv::{QuoteStyle, WriterBuilder};
use log::{info, warn};
use rust_xlsxwriter::{Format, Workbook, Worksheet};

use crate::domain::errors::DomainError;
use crate::domain::models::{Merchant, Purchase};
use crate::domain::notifications::NotificationCenter;
use crate::domain::settings_service::SettingsService;
use crate::domain::state::StateManager;

pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";
pub const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const CSV_DATE_FORMAT: &str = "%d/%m/%Y %H:%M";

pub const CSV_HEADER: [&str; 9] = [
    "ID",
    "Monto Original",
    "Fecha",
    "Comercio",
    "Ubicación",
    "Descripción",
    "Descuento",
    "Monto Final",
    "Comprobante",
];

pub const PURCHASES_SHEET: &str = "Compras";
pub const MERCHANTS_SHEET: &str = "Comercios";

pub const PURCHASE_COLUMNS: [&str; 9] = [
    "ID",
    "Fecha",
    "Comercio",
    "Ubicación",
    "Descripción",
    "Monto Original",
    "Descuento",
    "Monto Final",
    "Comprobante",
];

pub const MERCHANT_COLUMNS: [&str; 3] = ["ID", "Nombre", "Ubicación"];

/// A generated file ready to hand to the user
#[derive(Debug, Clone, PartialEq)]
pub struct ExportFile {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

fn excel_epoch() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
        .unwrap_or_default()
}

/// Spreadsheet serial date (days since 1899-12-30, fraction = time of day)
pub fn to_excel_serial(date: DateTime<Utc>) -> f64 {
    (date - excel_epoch()).num_seconds() as f64 / 86_400.0
}

pub fn from_excel_serial(serial: f64) -> Option<DateTime<Utc>> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let millis = (serial * 86_400_000.0).round() as i64;
    excel_epoch().checked_add_signed(ChronoDuration::milliseconds(millis))
}

/// Format a money value the way the CSV shows it
fn money(value: f64) -> String {
    format!("{:.2}", value)
}

#[derive(Clone)]
pub struct ExportService {
    state: StateManager,
    settings_service: SettingsService,
    notifications: NotificationCenter,
}

impl ExportService {
    pub fn new(state: StateManager, settings_service: SettingsService, notifications: NotificationCenter) -> Self {
        Self {
            state,
            settings_service,
            notifications,
        }
    }

    /// One CSV row per purchase, most recent first
    pub fn export_csv(&self, now: DateTime<Utc>) -> Result<ExportFile> {
        let purchases = self.state.data().purchases_by_date_desc();
        if purchases.is_empty() {
            warn!("📄 EXPORT: No purchases to export");
            self.notifications.warning("There are no purchases to export yet.");
            return Err(DomainError::NothingToExport.into());
        }

        let bytes = render_csv(&purchases)?;
        info!("📄 EXPORT: Generated CSV with {} purchases ({} bytes)", purchases.len(), bytes.len());
        Ok(ExportFile {
            file_name: format!("gastos_beneficio_{}.csv", now.format("%Y-%m-%d")),
            content_type: CSV_CONTENT_TYPE,
            bytes,
        })
    }

    /// Workbook with the "Compras" and "Comercios" sheets. Records the backup
    /// time in the settings once the file is built.
    pub async fn export_workbook(&self, now: DateTime<Utc>) -> Result<ExportFile> {
        let data = self.state.data();
        let purchases = data.purchases_by_date_desc();
        let merchants = data.merchants_by_name();

        let bytes = render_workbook(&purchases, &merchants)?;
        self.settings_service.record_cloud_backup(now).await?;

        info!(
            "📊 EXPORT: Generated workbook with {} purchases and {} merchants",
            purchases.len(),
            merchants.len()
        );
        Ok(ExportFile {
            file_name: format!("beneficio_gastronomico_{}.xlsx", now.format("%Y-%m-%d")),
            content_type: XLSX_CONTENT_TYPE,
            bytes,
        })
    }
}

/// UTF-8 CSV with BOM; text fields are always quoted
pub fn render_csv(purchases: &[Purchase]) -> Result<Vec<u8>> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::NonNumeric)
        .from_writer(UTF8_BOM.to_vec());

    writer.write_record(CSV_HEADER)?;
    for purchase in purchases {
        writer.write_record([
            purchase.id.clone(),
            money(purchase.amount),
            purchase.date.format(CSV_DATE_FORMAT).to_string(),
            purchase.merchant_name.clone(),
            purchase.merchant_location.clone().unwrap_or_default(),
            purchase.description.clone().unwrap_or_default(),
            money(purchase.discount_applied),
            money(purchase.final_amount),
            purchase.receipt_image.clone().unwrap_or_default(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to finish CSV: {}", e.error()))
}

fn write_header(sheet: &mut Worksheet, columns: &[&str], bold: &Format) -> Result<()> {
    for (col, title) in columns.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, bold)?;
    }
    Ok(())
}

fn write_optional(sheet: &mut Worksheet, row: u32, col: u16, value: Option<&str>) -> Result<()> {
    if let Some(value) = value {
        sheet.write_string(row, col, value)?;
    }
    Ok(())
}

pub fn render_workbook(purchases: &[Purchase], merchants: &[Merchant]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let date_format = Format::new().set_num_format("dd/mm/yyyy hh:mm");
    let money_format = Format::new().set_num_format("#,##0.00");

    let sheet = workbook.add_worksheet();
    sheet.set_name(PURCHASES_SHEET)?;
    write_header(sheet, &PURCHASE_COLUMNS, &bold)?;
    for (index, purchase) in purchases.iter().enumerate() {
        let row = index as u32 + 1;
        sheet.write_string(row, 0, &purchase.id)?;
        sheet.write_number_with_format(row, 1, to_excel_serial(purchase.date), &date_format)?;
        sheet.write_string(row, 2, &purchase.merchant_name)?;
        write_optional(sheet, row, 3, purchase.merchant_location.as_deref())?;
        write_optional(sheet, row, 4, purchase.description.as_deref())?;
        sheet.write_number_with_format(row, 5, purchase.amount, &money_format)?;
        sheet.write_number_with_format(row, 6, purchase.discount_applied, &money_format)?;
        sheet.write_number_with_format(row, 7, purchase.final_amount, &money_format)?;
        write_optional(sheet, row, 8, purchase.receipt_image.as_deref())?;
    }
    sheet.set_column_width(0, 42)?;
    sheet.set_column_width(1, 18)?;
    sheet.set_column_width(2, 28)?;

    let sheet = workbook.add_worksheet();
    sheet.set_name(MERCHANTS_SHEET)?;
    write_header(sheet, &MERCHANT_COLUMNS, &bold)?;
    for (index, merchant) in merchants.iter().enumerate() {
        let row = index as u32 + 1;
        sheet.write_string(row, 0, &merchant.id)?;
        sheet.write_string(row, 1, &merchant.name)?;
        write_optional(sheet, row, 2, merchant.location.as_deref())?;
    }
    sheet.set_column_width(0, 42)?;
    sheet.set_column_width(1, 28)?;

    Ok(workbook.save_to_buffer()?)
}
