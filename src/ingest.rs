use log::{info, warn};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;

use crate::collection::AppLists;
use crate::error::AppResult;
use crate::reader::{self, SheetRows, WorkbookContents};
use crate::record::{ListKind, RowError, map_row};

/// A row that was left out of the collection.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DroppedRow {
    pub sheet: String,
    /// 1-based spreadsheet row number.
    pub row: usize,
    pub reason: String,
}

/// Per-sheet outcome for a recognized sheet.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetReport {
    pub name: String,
    pub kind: ListKind,
    pub rows_read: usize,
    pub records: usize,
    pub growth_defaulted: usize,
}

/// Everything the pipeline produced: the collection plus diagnostics.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub data: AppLists,
    pub sheets: Vec<SheetReport>,
    pub skipped_sheets: Vec<String>,
    pub dropped_rows: Vec<DroppedRow>,
}

/// Record counts returned alongside an upload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IngestCounts {
    #[serde(rename = "Web")]
    pub web: usize,
    #[serde(rename = "App")]
    pub app: usize,
    pub all: usize,
    pub dropped: usize,
    pub skipped: usize,
}

impl IngestReport {
    pub fn counts(&self) -> IngestCounts {
        IngestCounts {
            web: self.data.web.len(),
            app: self.data.app.len(),
            all: self.data.all.len(),
            dropped: self.dropped_rows.len(),
            skipped: self.skipped_sheets.len(),
        }
    }

    /// One-line summary for logs and the CLI.
    pub fn summary(&self) -> String {
        let c = self.counts();
        let mut parts = vec![
            format!("{} Web", c.web),
            format!("{} App", c.app),
            format!("{} total", c.all),
        ];
        if c.dropped > 0 {
            parts.push(format!("{} rows dropped", c.dropped));
        }
        if c.skipped > 0 {
            parts.push(format!("skipped sheets: {}", self.skipped_sheets.join(", ")));
        }
        parts.join(", ")
    }
}

/// Builds the unified collection from an opened workbook.
///
/// Only sheets named exactly `Web` or `App` are read; anything else is noted
/// and skipped. `Web` records are placed before `App` records in `all`
/// regardless of sheet order in the workbook. Nothing is persisted here.
pub fn ingest(workbook: &WorkbookContents) -> IngestReport {
    let mut report = IngestReport::default();

    for sheet in &workbook.sheets {
        if ListKind::from_sheet_name(&sheet.name).is_none() {
            info!("skipping sheet {}", sheet.name);
            report.skipped_sheets.push(sheet.name.clone());
        }
    }

    for kind in ListKind::ALL {
        let Some(sheet) = workbook.sheet(kind.sheet_name()) else {
            continue;
        };
        if sheet.rows.is_empty() {
            info!("sheet {} is empty", sheet.name);
        }
        let sheet_report = ingest_sheet(sheet, kind, &mut report);
        info!(
            "parsed {} list: {} records from {} rows",
            kind, sheet_report.records, sheet_report.rows_read
        );
        report.sheets.push(sheet_report);
    }

    info!("ingested {}", report.summary());
    report
}

fn ingest_sheet(sheet: &SheetRows, kind: ListKind, report: &mut IngestReport) -> SheetReport {
    let mut seen_ranks = HashSet::new();
    let mut sheet_report = SheetReport {
        name: sheet.name.clone(),
        kind,
        rows_read: sheet.rows.len(),
        records: 0,
        growth_defaulted: 0,
    };

    for (row, &row_number) in sheet.rows.iter().zip(&sheet.row_numbers) {
        let mapped = map_row(row, kind).and_then(|mapped| {
            if seen_ranks.insert(mapped.record.rank) {
                Ok(mapped)
            } else {
                Err(RowError::DuplicateRank(mapped.record.rank))
            }
        });

        match mapped {
            Ok(mapped) => {
                if mapped.growth_defaulted {
                    sheet_report.growth_defaulted += 1;
                }
                sheet_report.records += 1;
                report.data.push(mapped.record);
            }
            Err(reason) => {
                warn!("sheet {} row {}: {}; row dropped", sheet.name, row_number, reason);
                report.dropped_rows.push(DroppedRow {
                    sheet: sheet.name.clone(),
                    row: row_number,
                    reason: reason.to_string(),
                });
            }
        }
    }

    sheet_report
}

/// Reads and ingests a workbook held in memory.
///
/// # Arguments
/// * `bytes` - Raw `.xlsx` or `.xls` contents, e.g. an upload body
///
/// # Returns
/// * `Ok(IngestReport)` - The collection plus per-sheet counts and dropped rows
/// * `Err(AppError::Parse)` - The bytes are not a readable workbook
///
/// # Examples
/// ```
/// use rankings::ingest_bytes;
/// use rankings::template::{self, TemplateKind};
///
/// let bytes = template::generate(TemplateKind::All).unwrap();
/// let report = ingest_bytes(&bytes).unwrap();
/// assert_eq!(report.data.all.len(), 2);
/// ```
pub fn ingest_bytes(bytes: &[u8]) -> AppResult<IngestReport> {
    let workbook = reader::read_bytes(bytes)?;
    Ok(ingest(&workbook))
}

/// Reads and ingests a workbook on disk.
///
/// # Arguments
/// * `path` - Path to the workbook
///
/// # Returns
/// * `AppResult<IngestReport>` - As [`ingest_bytes`], or `NotFound` for a missing file
pub fn ingest_path(path: impl AsRef<Path>) -> AppResult<IngestReport> {
    let workbook = reader::read_path(path)?;
    Ok(ingest(&workbook))
}
