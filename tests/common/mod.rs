#![allow(dead_code)]

use rankings::record::*;
use rust_xlsxwriter::Workbook;

/// A cell written by the test workbook builder.
#[derive(Clone, Debug)]
pub enum Cell {
    T(&'static str),
    N(f64),
    Blank,
}

pub use Cell::{Blank, N, T};

/// Builds an `.xlsx` in memory. Each sheet is a list of rows; the first row
/// is the header row. A `None` row leaves a fully blank line.
pub fn workbook(sheets: &[(&str, Vec<Option<Vec<Cell>>>)]) -> Vec<u8> {
    let mut wb = Workbook::new();
    for (name, rows) in sheets {
        let ws = wb.add_worksheet();
        ws.set_name(*name).expect("sheet name");
        for (r, row) in rows.iter().enumerate() {
            let Some(row) = row else { continue };
            for (c, cell) in row.iter().enumerate() {
                match cell {
                    T(s) => {
                        ws.write_string(r as u32, c as u16, *s).expect("write string");
                    }
                    N(n) => {
                        ws.write_number(r as u32, c as u16, *n).expect("write number");
                    }
                    Blank => {}
                }
            }
        }
    }
    wb.save_to_buffer().expect("save workbook")
}

/// Header row for a kind with the columns used by most tests.
pub fn short_headers(kind: ListKind) -> Vec<Cell> {
    let link = match kind {
        ListKind::Web => COL_WEBSITE,
        ListKind::App => COL_APP,
    };
    vec![
        T(COL_RANK),
        T(COL_PRODUCT),
        T(COL_CATEGORY),
        T(link),
        T(COL_MRR),
        T(COL_GROWTH_RATE),
        T(COL_ARR),
    ]
}

pub fn sheet(kind: ListKind, rows: Vec<Vec<Cell>>) -> (&'static str, Vec<Option<Vec<Cell>>>) {
    let mut all = vec![Some(short_headers(kind))];
    all.extend(rows.into_iter().map(Some));
    (kind.sheet_name(), all)
}
