//! Session-scoped, append-only record of completed calculations.

use crate::core::calculator::CalculationResult;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use chrono_tz::America::Argentina::Buenos_Aires;
use chrono_tz::Tz;
use rust_xlsxwriter::{ColNum, Workbook};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

/// A snapshot of one calculation. Never changes after it is recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub result: CalculationResult,
    pub recorded_at: DateTime<Tz>,
}

/// File format of a history export.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Workbook with a single "CEDEARs" sheet.
    #[default]
    Xlsx,
    Csv,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
        }
    }
}

const SHEET_NAME: &str = "CEDEARs";

const COLUMNS: [&str; 9] = [
    "symbol",
    "underlying_usd",
    "ratio",
    "ccl",
    "mep",
    "adjustment_factor",
    "cedear_usd",
    "cedear_ars",
    "timestamp",
];

/// One exported row; the timestamp is written without its zone.
#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    symbol: &'a str,
    underlying_usd: f64,
    ratio: u32,
    ccl: f64,
    mep: Option<f64>,
    adjustment_factor: Option<f64>,
    cedear_usd: Option<f64>,
    cedear_ars: Option<f64>,
    timestamp: String,
}

impl<'a> From<&'a HistoryEntry> for ExportRow<'a> {
    fn from(entry: &'a HistoryEntry) -> Self {
        let result = &entry.result;
        ExportRow {
            symbol: &result.symbol,
            underlying_usd: result.underlying_price,
            ratio: result.ratio,
            ccl: result.rates.ccl,
            mep: result.rates.mep,
            adjustment_factor: result.derived.and_then(|d| d.adjustment_factor),
            cedear_usd: result.derived.map(|d| d.receipt_price),
            cedear_ars: result.derived.map(|d| d.home_price),
            timestamp: entry
                .recorded_at
                .naive_local()
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
        }
    }
}

#[derive(Debug)]
pub struct SessionHistory {
    session_id: Uuid,
    entries: Vec<HistoryEntry>,
}

impl SessionHistory {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            entries: Vec::new(),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn record(&mut self, result: CalculationResult) -> &HistoryEntry {
        self.record_at(result, Utc::now())
    }

    pub fn record_at(&mut self, result: CalculationResult, at: DateTime<Utc>) -> &HistoryEntry {
        self.entries.push(HistoryEntry {
            result,
            recorded_at: at.with_timezone(&Buenos_Aires),
        });
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes all entries as CSV, header first.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        for entry in &self.entries {
            wtr.serialize(ExportRow::from(entry))
                .context("Failed to serialize history row")?;
        }
        wtr.flush().context("Failed to flush history export")?;
        Ok(())
    }

    /// Writes all entries to a workbook at `path`, header row first.
    /// Missing values are left as blank cells.
    pub fn write_xlsx(&self, path: &Path) -> Result<()> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet().set_name(SHEET_NAME)?;

        for (col, name) in COLUMNS.iter().enumerate() {
            sheet.write_string(0, col as ColNum, *name)?;
        }
        for (i, entry) in self.entries.iter().enumerate() {
            let row = ExportRow::from(entry);
            let r = i as u32 + 1;
            sheet.write_string(r, 0, row.symbol)?;
            sheet.write_number(r, 1, row.underlying_usd)?;
            sheet.write_number(r, 2, row.ratio)?;
            sheet.write_number(r, 3, row.ccl)?;
            let optional = [row.mep, row.adjustment_factor, row.cedear_usd, row.cedear_ars];
            for (offset, value) in optional.into_iter().enumerate() {
                if let Some(value) = value {
                    sheet.write_number(r, 4 + offset as ColNum, value)?;
                }
            }
            sheet.write_string(r, 8, &row.timestamp)?;
        }
        sheet.autofit();

        workbook
            .save(path)
            .with_context(|| format!("Failed to save workbook: {}", path.display()))?;
        Ok(())
    }

    /// Exports to `cedears_<unix-seconds>.<ext>` inside `dir` and returns the path.
    pub fn export(&self, dir: &Path, format: ExportFormat) -> Result<PathBuf> {
        self.export_at(dir, format, Utc::now())
    }

    pub fn export_at(&self, dir: &Path, format: ExportFormat, at: DateTime<Utc>) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        let path = dir.join(format!("cedears_{}.{}", at.timestamp(), format.extension()));
        match format {
            ExportFormat::Xlsx => self.write_xlsx(&path)?,
            ExportFormat::Csv => {
                let file = std::fs::File::create(&path).with_context(|| {
                    format!("Failed to create export file: {}", path.display())
                })?;
                self.write_csv(file)?;
            }
        }

        info!(
            session = %self.session_id,
            rows = self.entries.len(),
            "Exported history to {}",
            path.display()
        );
        Ok(path)
    }
}

impl Default for SessionHistory {
    fn default() -> Self {
        Self::new()
    }
}
