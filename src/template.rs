use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::str::FromStr;

use crate::error::{AppError, AppResult};
use crate::record::{CellValue, ListKind, Record};

/// Which sheets a template contains.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TemplateKind {
    Web,
    App,
    All,
}

impl TemplateKind {
    pub fn kinds(self) -> &'static [ListKind] {
        match self {
            TemplateKind::Web => &[ListKind::Web],
            TemplateKind::App => &[ListKind::App],
            TemplateKind::All => &ListKind::ALL,
        }
    }

    /// Download file name, extension included.
    pub fn file_name(self) -> &'static str {
        match self {
            TemplateKind::Web => "web-template.xlsx",
            TemplateKind::App => "app-template.xlsx",
            TemplateKind::All => "all-templates.xlsx",
        }
    }
}

impl FromStr for TemplateKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Web" => Ok(TemplateKind::Web),
            "App" => Ok(TemplateKind::App),
            "All" => Ok(TemplateKind::All),
            other => Err(AppError::Validation(format!(
                "invalid template type {:?}, expected Web, App or All",
                other
            ))),
        }
    }
}

/// The illustrative row written under the headers of each template sheet.
pub fn example_record(kind: ListKind) -> Record {
    match kind {
        ListKind::Web => Record {
            rank: 1,
            product: "ChatGPT".to_string(),
            market: Some("海外".to_string()),
            category: "语言模型".to_string(),
            website: Some("https://chat.openai.com".to_string()),
            app: None,
            mrr: Some(1000.0),
            growth_rate: 0.15,
            arr: Some(12000.0),
            monthly_active_users: Some(18000.0),
            arpu: Some(5.5),
            list_type: ListKind::Web,
        },
        ListKind::App => Record {
            rank: 1,
            product: "Remini".to_string(),
            market: Some("出海".to_string()),
            category: "图像编辑".to_string(),
            website: None,
            app: Some("Remini - AI Photo Enhancer".to_string()),
            mrr: Some(800.0),
            growth_rate: -0.05,
            arr: Some(9600.0),
            monthly_active_users: Some(2500.0),
            arpu: Some(3.2),
            list_type: ListKind::App,
        },
    }
}

/// Builds an `.xlsx` workbook with one sheet per selected kind, each holding
/// the canonical header row and the example record.
pub fn generate(kind: TemplateKind) -> AppResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold().set_text_wrap();

    for &list in kind.kinds() {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(list.sheet_name())?;
        write_sheet(worksheet, list, &header_format)?;
    }

    Ok(workbook.save_to_buffer()?)
}

fn write_sheet(worksheet: &mut Worksheet, kind: ListKind, header_format: &Format) -> AppResult<()> {
    for (col, header) in kind.headers().iter().enumerate() {
        let col = col as u16;
        worksheet.write_string_with_format(0, col, *header, header_format)?;
        worksheet.set_column_width(col, 16.0)?;
    }

    for (col, value) in example_record(kind).to_row().into_iter().enumerate() {
        let col = col as u16;
        match value {
            CellValue::Number(n) => {
                worksheet.write_number(1, col, n)?;
            }
            CellValue::Text(s) => {
                worksheet.write_string(1, col, &s)?;
            }
            CellValue::Bool(b) => {
                worksheet.write_boolean(1, col, b)?;
            }
            CellValue::Empty => {}
        }
    }

    Ok(())
}
