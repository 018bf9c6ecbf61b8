use calamine::{Data, Range, Reader, Sheets, Xls, Xlsx};
use log::{debug, info, warn};
use std::io::Cursor;
use std::path::Path;

use crate::error::{AppError, AppResult};
use crate::record::{CellValue, RawRow};

/// Leading bytes of a zip container (`.xlsx`).
const ZIP_SIGNATURE: &[u8] = b"PK\x03\x04";
/// Leading bytes of an OLE2 compound file (legacy `.xls`).
const CFB_SIGNATURE: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Container format detected from the file signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Container {
    Xlsx,
    Xls,
}

impl Container {
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(ZIP_SIGNATURE) {
            Some(Container::Xlsx)
        } else if bytes.starts_with(CFB_SIGNATURE) {
            Some(Container::Xls)
        } else {
            None
        }
    }

    fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "xlsx" | "xlsm" => Some(Container::Xlsx),
            "xls" => Some(Container::Xls),
            _ => None,
        }
    }
}

/// One worksheet converted to header-keyed rows.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SheetRows {
    pub name: String,
    /// Header row, in column order. Blank header cells are kept as empty strings.
    pub headers: Vec<String>,
    /// Data rows. Blank cells are omitted from each row and fully blank rows are skipped.
    pub rows: Vec<RawRow>,
    /// 1-based spreadsheet row number of each entry in `rows`.
    pub row_numbers: Vec<usize>,
}

/// Every sheet of an opened workbook, in workbook order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WorkbookContents {
    pub sheets: Vec<SheetRows>,
}

impl WorkbookContents {
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn sheet(&self, name: &str) -> Option<&SheetRows> {
        self.sheets.iter().find(|s| s.name == name)
    }
}

/// Reads a workbook from disk.
///
/// The codec follows the file signature, so a mislabelled `.xls`/`.xlsx` still opens.
///
/// # Arguments
/// * `path` - Path to the `.xlsx` or `.xls` file
///
/// # Returns
/// * `Ok(WorkbookContents)` - Every sheet as header-keyed rows
/// * `Err(AppError::NotFound)` - Nothing exists at `path`
/// * `Err(AppError::Parse)` - The file is not a readable workbook
///
/// # Examples
/// ```no_run
/// use rankings::reader::read_path;
///
/// match read_path("rankings.xlsx") {
///     Ok(book) => println!("sheets: {:?}", book.sheet_names()),
///     Err(e) => eprintln!("Error loading workbook: {}", e),
/// }
/// ```
pub fn read_path(path: impl AsRef<Path>) -> AppResult<WorkbookContents> {
    let path = path.as_ref();
    info!("loading workbook {}", path.display());

    if !path.is_file() {
        return Err(AppError::NotFound(format!(
            "workbook {} does not exist",
            path.display()
        )));
    }

    let bytes = std::fs::read(path).map_err(|e| AppError::io_at(path, e))?;
    debug!("workbook size: {} bytes", bytes.len());

    let sniffed = Container::sniff(&bytes);
    if let (Some(by_ext), Some(by_sig)) = (Container::from_extension(path), sniffed) {
        if by_ext != by_sig {
            warn!(
                "{} has a {:?} extension but a {:?} signature; trusting the signature",
                path.display(),
                by_ext,
                by_sig
            );
        }
    }

    read_bytes(&bytes).map_err(|e| match e {
        AppError::Parse(msg) => AppError::Parse(format!("{}: {}", path.display(), msg)),
        other => other,
    })
}

/// Reads a workbook held in memory, e.g. an upload body.
///
/// The codec is chosen from the leading bytes; anything that is neither a zip
/// nor an OLE2 container is rejected with `Parse`.
///
/// # Arguments
/// * `bytes` - Raw workbook file contents
///
/// # Returns
/// * `AppResult<WorkbookContents>` - The sheets, or `Parse` for unreadable input
pub fn read_bytes(bytes: &[u8]) -> AppResult<WorkbookContents> {
    let cursor = Cursor::new(bytes.to_vec());
    let mut workbook: Sheets<_> = match Container::sniff(bytes) {
        Some(Container::Xlsx) => Sheets::Xlsx(
            Xlsx::new(cursor).map_err(|e| AppError::Parse(format!("invalid xlsx: {}", e)))?,
        ),
        Some(Container::Xls) => Sheets::Xls(
            Xls::new(cursor).map_err(|e| AppError::Parse(format!("invalid xls: {}", e)))?,
        ),
        None => {
            return Err(AppError::Parse(
                "not a spreadsheet (expected an xlsx or xls container)".to_string(),
            ));
        }
    };

    let names = workbook.sheet_names().to_vec();
    info!("sheets: {:?}", names);

    let mut contents = WorkbookContents::default();
    for name in names {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| AppError::Parse(format!("sheet '{}': {}", name, e)))?;
        contents.sheets.push(sheet_rows(&name, &range));
    }

    Ok(contents)
}

/// Converts a sheet range into rows keyed by the first row's text.
fn sheet_rows(name: &str, range: &Range<Data>) -> SheetRows {
    let mut sheet = SheetRows {
        name: name.to_string(),
        ..Default::default()
    };

    // Offset of the used range inside the sheet, for 1-based row numbers.
    let first_row = range.start().map(|(r, _)| r as usize).unwrap_or(0);

    let mut rows = range.rows().enumerate();
    let Some((_, header_row)) = rows.next() else {
        return sheet;
    };
    // Header text is kept verbatim: column matching is whitespace-sensitive.
    sheet.headers = header_row
        .iter()
        .map(|c| match convert(c) {
            CellValue::Text(s) => s,
            other => other.as_text().unwrap_or_default(),
        })
        .collect();

    for (idx, cells) in rows {
        let mut row = RawRow::new();
        for (header, cell) in sheet.headers.iter().zip(cells) {
            if header.is_empty() {
                continue;
            }
            let value = convert(cell);
            if !value.is_empty() {
                row.insert(header.clone(), value);
            }
        }
        if !row.is_empty() {
            sheet.rows.push(row);
            sheet.row_numbers.push(first_row + idx + 1);
        }
    }

    sheet
}

fn convert(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(_) => CellValue::Empty,
    }
}
