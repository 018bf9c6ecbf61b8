use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// Column headers shared by both sheets.
///
/// These must match the workbook byte-for-byte, including the embedded
/// newlines and the full-width parentheses in the monthly-active-users header.
pub const COL_RANK: &str = "排名";
pub const COL_PRODUCT: &str = "产品";
pub const COL_MARKET: &str = "市场";
pub const COL_CATEGORY: &str = "分类";
pub const COL_WEBSITE: &str = "网址";
pub const COL_APP: &str = "应用";
pub const COL_MRR: &str = "MRR\n(万美金)";
pub const COL_GROWTH_RATE: &str = "环比变化";
pub const COL_ARR: &str = "ARR\n(万美金)";
pub const COL_MONTHLY_ACTIVE_USERS: &str = "月活\n（万人）";
pub const COL_ARPU: &str = "ARPU\n(美金)";

/// Which ranking list (and therefore which sheet) a record belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListKind {
    Web,
    App,
}

impl ListKind {
    pub const ALL: [ListKind; 2] = [ListKind::Web, ListKind::App];

    /// Sheet name the kind is read from and written to.
    pub fn sheet_name(self) -> &'static str {
        match self {
            ListKind::Web => "Web",
            ListKind::App => "App",
        }
    }

    /// Recognizes a sheet name. Matching is exact.
    pub fn from_sheet_name(name: &str) -> Option<Self> {
        match name {
            "Web" => Some(ListKind::Web),
            "App" => Some(ListKind::App),
            _ => None,
        }
    }

    /// Header of the kind-specific column (`网址` or `应用`).
    pub fn link_column(self) -> &'static str {
        match self {
            ListKind::Web => COL_WEBSITE,
            ListKind::App => COL_APP,
        }
    }

    /// Canonical header row, in template column order.
    pub fn headers(self) -> [&'static str; 10] {
        [
            COL_RANK,
            COL_PRODUCT,
            COL_MARKET,
            COL_CATEGORY,
            self.link_column(),
            COL_MRR,
            COL_GROWTH_RATE,
            COL_ARR,
            COL_MONTHLY_ACTIVE_USERS,
            COL_ARPU,
        ]
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sheet_name())
    }
}

/// One normalized product entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub rank: u32,
    pub product: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,
    /// Monthly recurring revenue, ten-thousands of USD.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mrr: Option<f64>,
    /// Month-over-month change, 0.15 = +15%.
    #[serde(default)]
    pub growth_rate: f64,
    /// Annual recurring revenue, ten-thousands of USD.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arr: Option<f64>,
    /// Ten-thousands of users.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_active_users: Option<f64>,
    /// USD.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arpu: Option<f64>,
    pub list_type: ListKind,
}

/// A loosely typed spreadsheet cell, as handed over by the workbook reader.
#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Text rendering; integral numbers lose their `.0`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            CellValue::Number(n) => Some(format_number(*n)),
            CellValue::Bool(b) => Some(b.to_string()),
        }
    }

    /// Numeric reading. Text is parsed leniently: thousands separators are
    /// ignored and a trailing `%` divides by 100. NaN and infinities read as
    /// absent since JSON cannot carry them.
    pub fn as_number(&self) -> Option<f64> {
        let n = match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => parse_number(s),
            CellValue::Empty | CellValue::Bool(_) => None,
        };
        n.filter(|v| v.is_finite())
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    let value = match cleaned.strip_suffix('%') {
        Some(pct) => pct.trim().parse::<f64>().ok().map(|v| v / 100.0),
        None => cleaned.parse::<f64>().ok(),
    };
    value.filter(|v| v.is_finite())
}

/// One spreadsheet row keyed by header text. Empty cells are not stored.
pub type RawRow = HashMap<String, CellValue>;

/// Why a row could not become a record.
#[derive(Clone, Debug, PartialEq)]
pub enum RowError {
    MissingRank,
    InvalidRank(String),
    MissingProduct,
    DuplicateRank(u32),
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowError::MissingRank => write!(f, "missing {}", COL_RANK),
            RowError::InvalidRank(raw) => write!(f, "invalid {} {:?}", COL_RANK, raw),
            RowError::MissingProduct => write!(f, "missing {}", COL_PRODUCT),
            RowError::DuplicateRank(rank) => write!(f, "duplicate {} {}", COL_RANK, rank),
        }
    }
}

/// A successfully mapped row.
#[derive(Clone, Debug, PartialEq)]
pub struct Mapped {
    pub record: Record,
    /// The growth-rate cell was empty and 0 was used instead.
    pub growth_defaulted: bool,
}

fn cell<'a>(row: &'a RawRow, header: &str) -> Option<&'a CellValue> {
    row.get(header).filter(|v| !v.is_empty())
}

fn text(row: &RawRow, header: &str) -> Option<String> {
    cell(row, header).and_then(CellValue::as_text)
}

fn number(row: &RawRow, header: &str) -> Option<f64> {
    cell(row, header).and_then(CellValue::as_number)
}

fn rank(row: &RawRow) -> Result<u32, RowError> {
    let value = cell(row, COL_RANK).ok_or(RowError::MissingRank)?;
    let invalid = || RowError::InvalidRank(value.as_text().unwrap_or_default());
    let n = value.as_number().ok_or_else(invalid)?;
    if n.fract() != 0.0 || n < 1.0 || n > u32::MAX as f64 {
        return Err(invalid());
    }
    Ok(n as u32)
}

/// Maps one raw row into a record of the given kind.
///
/// Only the rank and product are structurally required. Absent optional
/// columns stay `None`, an empty growth rate becomes `0.0`, and `listType`
/// always comes from `kind`.
pub fn map_row(row: &RawRow, kind: ListKind) -> Result<Mapped, RowError> {
    let rank = rank(row)?;
    let product = text(row, COL_PRODUCT).ok_or(RowError::MissingProduct)?;
    let growth_rate = number(row, COL_GROWTH_RATE);

    let (website, app) = match kind {
        ListKind::Web => (text(row, COL_WEBSITE), None),
        ListKind::App => (None, text(row, COL_APP)),
    };

    let record = Record {
        rank,
        product,
        market: text(row, COL_MARKET),
        category: text(row, COL_CATEGORY).unwrap_or_default(),
        website,
        app,
        mrr: number(row, COL_MRR),
        growth_rate: growth_rate.unwrap_or(0.0),
        arr: number(row, COL_ARR),
        monthly_active_users: number(row, COL_MONTHLY_ACTIVE_USERS),
        arpu: number(row, COL_ARPU),
        list_type: kind,
    };

    Ok(Mapped {
        record,
        growth_defaulted: growth_rate.is_none(),
    })
}

impl Record {
    /// False when any figure is NaN or infinite; JSON would write those as `null`.
    pub fn figures_are_finite(&self) -> bool {
        self.growth_rate.is_finite()
            && [self.mrr, self.arr, self.monthly_active_users, self.arpu]
                .iter()
                .flatten()
                .all(|v| v.is_finite())
    }

    /// The record laid out as one template row, matching `ListKind::headers`.
    pub fn to_row(&self) -> Vec<CellValue> {
        let text = |v: &Option<String>| match v {
            Some(s) => CellValue::Text(s.clone()),
            None => CellValue::Empty,
        };
        let number = |v: Option<f64>| match v {
            Some(n) => CellValue::Number(n),
            None => CellValue::Empty,
        };
        let link = match self.list_type {
            ListKind::Web => text(&self.website),
            ListKind::App => text(&self.app),
        };

        vec![
            CellValue::Number(self.rank as f64),
            CellValue::Text(self.product.clone()),
            text(&self.market),
            CellValue::Text(self.category.clone()),
            link,
            number(self.mrr),
            CellValue::Number(self.growth_rate),
            number(self.arr),
            number(self.monthly_active_users),
            number(self.arpu),
        ]
    }
}

/// Selector accepted by list endpoints: one kind or the merged list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListSelector {
    Kind(ListKind),
    All,
}

impl FromStr for ListSelector {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(ListSelector::All),
            other => ListKind::from_sheet_name(other)
                .map(ListSelector::Kind)
                .ok_or_else(|| AppError::Validation(format!("invalid list type {:?}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[(&str, CellValue)]) -> RawRow {
        cells
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn chatgpt_row() -> RawRow {
        row(&[
            (COL_RANK, CellValue::Number(1.0)),
            (COL_PRODUCT, CellValue::Text("ChatGPT".into())),
            (COL_CATEGORY, CellValue::Text("语言模型".into())),
            (COL_WEBSITE, CellValue::Text("https://chat.openai.com".into())),
            (COL_MRR, CellValue::Number(1000.0)),
            (COL_GROWTH_RATE, CellValue::Number(0.15)),
            (COL_ARR, CellValue::Number(12000.0)),
        ])
    }

    #[test]
    fn maps_web_row_and_leaves_missing_columns_absent() {
        let mapped = map_row(&chatgpt_row(), ListKind::Web).unwrap();
        let r = mapped.record;
        assert_eq!(r.rank, 1);
        assert_eq!(r.product, "ChatGPT");
        assert_eq!(r.category, "语言模型");
        assert_eq!(r.website.as_deref(), Some("https://chat.openai.com"));
        assert_eq!(r.mrr, Some(1000.0));
        assert_eq!(r.arr, Some(12000.0));
        assert_eq!(r.growth_rate, 0.15);
        assert_eq!(r.market, None);
        assert_eq!(r.monthly_active_users, None, "absent must not become zero");
        assert_eq!(r.arpu, None);
        assert_eq!(r.app, None);
        assert_eq!(r.list_type, ListKind::Web);
        assert!(!mapped.growth_defaulted);
    }

    #[test]
    fn app_kind_reads_app_column_and_ignores_website() {
        let mut raw = chatgpt_row();
        raw.insert(COL_APP.to_string(), CellValue::Text("ChatGPT iOS".into()));
        let r = map_row(&raw, ListKind::App).unwrap().record;
        assert_eq!(r.app.as_deref(), Some("ChatGPT iOS"));
        assert_eq!(r.website, None);
        assert_eq!(r.list_type, ListKind::App);
    }

    #[test]
    fn list_type_column_in_sheet_is_ignored() {
        let mut raw = chatgpt_row();
        raw.insert("listType".to_string(), CellValue::Text("App".into()));
        let r = map_row(&raw, ListKind::Web).unwrap().record;
        assert_eq!(r.list_type, ListKind::Web);
    }

    #[test]
    fn missing_rank_or_product_is_malformed() {
        let mut raw = chatgpt_row();
        raw.remove(COL_RANK);
        assert_eq!(map_row(&raw, ListKind::Web), Err(RowError::MissingRank));

        let mut raw = chatgpt_row();
        raw.insert(COL_PRODUCT.to_string(), CellValue::Text("   ".into()));
        assert_eq!(map_row(&raw, ListKind::Web), Err(RowError::MissingProduct));
    }

    #[test]
    fn non_positive_or_fractional_rank_is_invalid() {
        for bad in [0.0, -3.0, 1.5] {
            let mut raw = chatgpt_row();
            raw.insert(COL_RANK.to_string(), CellValue::Number(bad));
            assert!(matches!(
                map_row(&raw, ListKind::Web),
                Err(RowError::InvalidRank(_))
            ));
        }
        let mut raw = chatgpt_row();
        raw.insert(COL_RANK.to_string(), CellValue::Text("first".into()));
        assert_eq!(
            map_row(&raw, ListKind::Web),
            Err(RowError::InvalidRank("first".into()))
        );
    }

    #[test]
    fn empty_growth_rate_defaults_to_zero_and_is_flagged() {
        let mut raw = chatgpt_row();
        raw.remove(COL_GROWTH_RATE);
        let mapped = map_row(&raw, ListKind::Web).unwrap();
        assert_eq!(mapped.record.growth_rate, 0.0);
        assert!(mapped.growth_defaulted);
    }

    #[test]
    fn text_cells_are_coerced() {
        let raw = row(&[
            (COL_RANK, CellValue::Text(" 7 ".into())),
            (COL_PRODUCT, CellValue::Number(360.0)),
            (COL_MRR, CellValue::Text("1,200".into())),
            (COL_GROWTH_RATE, CellValue::Text("-12.5%".into())),
        ]);
        let r = map_row(&raw, ListKind::App).unwrap().record;
        assert_eq!(r.rank, 7);
        assert_eq!(r.product, "360");
        assert_eq!(r.mrr, Some(1200.0));
        assert_eq!(r.growth_rate, -0.125);
        assert_eq!(r.category, "");
    }

    #[test]
    fn negative_figures_pass_through() {
        let mut raw = chatgpt_row();
        raw.insert(COL_ARPU.to_string(), CellValue::Number(-4.0));
        let r = map_row(&raw, ListKind::Web).unwrap().record;
        assert_eq!(r.arpu, Some(-4.0));
    }

    #[test]
    fn non_finite_numbers_read_as_absent() {
        let mut raw = chatgpt_row();
        raw.insert(COL_GROWTH_RATE.to_string(), CellValue::Text("NaN".into()));
        raw.insert(COL_MRR.to_string(), CellValue::Text("inf".into()));
        raw.insert(COL_ARR.to_string(), CellValue::Number(f64::INFINITY));
        raw.insert(COL_ARPU.to_string(), CellValue::Text("-infinity%".into()));
        let mapped = map_row(&raw, ListKind::Web).unwrap();
        assert_eq!(mapped.record.growth_rate, 0.0);
        assert!(mapped.growth_defaulted);
        assert_eq!(mapped.record.mrr, None);
        assert_eq!(mapped.record.arr, None);
        assert_eq!(mapped.record.arpu, None);

        raw.insert(COL_RANK.to_string(), CellValue::Text("inf".into()));
        assert!(matches!(
            map_row(&raw, ListKind::Web),
            Err(RowError::InvalidRank(_))
        ));
    }

    #[test]
    fn serializes_camel_case_without_absent_fields() {
        let r = map_row(&chatgpt_row(), ListKind::Web).unwrap().record;
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["growthRate"], 0.15);
        assert_eq!(json["listType"], "Web");
        assert!(json.get("monthlyActiveUsers").is_none());
        assert!(json.get("app").is_none());
    }

    #[test]
    fn list_selector_parsing_is_exact() {
        assert_eq!("Web".parse::<ListSelector>().unwrap(), ListSelector::Kind(ListKind::Web));
        assert_eq!("all".parse::<ListSelector>().unwrap(), ListSelector::All);
        assert!("web".parse::<ListSelector>().is_err());
        assert!("Foo".parse::<ListSelector>().is_err());
    }

    #[test]
    fn headers_include_kind_specific_column() {
        assert_eq!(ListKind::Web.headers()[4], COL_WEBSITE);
        assert_eq!(ListKind::App.headers()[4], COL_APP);
        assert!(ListKind::Web.headers().contains(&"月活\n（万人）"));
    }
}
