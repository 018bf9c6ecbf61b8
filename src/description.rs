use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::error::{AppError, AppResult};
use crate::record::{ListKind, Record};

/// `source` of a freshly rendered description.
pub const SOURCE_GENERATED: &str = "系统生成";
/// `source` of a description served from its cache file.
pub const SOURCE_CACHED: &str = "缓存数据";

const UNKNOWN: &str = "未知";

/// Product facts a description is rendered from.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptionRequest {
    /// Cache key. Defaults to `<listType>-<product>`.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub product: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub mrr: Option<f64>,
    #[serde(default)]
    pub growth_rate: Option<f64>,
    #[serde(default)]
    pub arr: Option<f64>,
    #[serde(default)]
    pub list_type: Option<ListKind>,
    /// Re-render even when a cached description exists.
    #[serde(default)]
    pub force: bool,
}

impl DescriptionRequest {
    pub fn file_id(&self) -> String {
        match &self.id {
            Some(id) if !id.is_empty() => id.clone(),
            _ => format!("{}-{}", self.kind(), self.product),
        }
    }

    fn kind(&self) -> ListKind {
        self.list_type.unwrap_or(ListKind::Web)
    }
}

impl From<&Record> for DescriptionRequest {
    fn from(record: &Record) -> Self {
        Self {
            id: None,
            product: record.product.clone(),
            category: record.category.clone(),
            website: record.website.clone(),
            mrr: record.mrr,
            growth_rate: Some(record.growth_rate),
            arr: record.arr,
            list_type: Some(record.list_type),
            force: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Description {
    pub description: String,
    pub source: String,
}

// Zero reads as "no figure", like an empty cell.
fn figure(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0 && v.is_finite())
}

fn growth_phrase(rate: Option<f64>) -> &'static str {
    match figure(rate) {
        None => "",
        Some(r) if r > 0.2 => "增长迅猛，处于高速发展阶段",
        Some(r) if r > 0.1 => "保持着良好的增长势头",
        Some(r) if r > 0.05 => "增长稳健",
        Some(r) if r > 0.0 => "保持着稳定增长",
        Some(_) => "正在经历市场调整",
    }
}

fn market_phrase(mrr: Option<f64>) -> &'static str {
    match figure(mrr) {
        None => "",
        Some(m) if m > 10000.0 => "在全球市场占据领先地位，是该领域的标杆产品",
        Some(m) if m > 5000.0 => "在市场上占据重要位置，是该领域的主要参与者",
        Some(m) if m > 1000.0 => "在市场上表现良好，拥有相当的市场份额",
        Some(_) => "在市场中稳步发展，拥有自己的用户群体",
    }
}

fn money(value: Option<f64>) -> String {
    figure(value).map_or_else(|| UNKNOWN.to_string(), |v| format!("{}万美金", v))
}

/// Renders the product write-up. Tone follows the growth and MRR tiers.
pub fn render(req: &DescriptionRequest) -> String {
    let website = req
        .website
        .as_deref()
        .filter(|w| !w.trim().is_empty())
        .unwrap_or(UNKNOWN);
    let growth = figure(req.growth_rate)
        .map_or_else(|| UNKNOWN.to_string(), |r| format!("{:.2}%", r * 100.0));

    format!(
        "{product}是{category}领域的知名产品，{market}。其官方网站为{website}。\n\n\
         该产品月收入(MRR)约{mrr}，环比增长率{growth}，年收入(ARR)约{arr}，{tone}。\n\n\
         {product}提供了丰富的功能和直观的用户体验，致力于为用户提供最佳的{category}解决方案。\
         产品不断创新和优化，以满足用户不断变化的需求，同时保持高水平的质量和性能。\n\n\
         凭借其专业性和易用性，{product}获得了广泛的用户认可，包括个人用户和企业客户，\
         在{kind}榜单中表现优异。",
        product = req.product,
        category = req.category,
        market = market_phrase(req.mrr),
        website = website,
        mrr = money(req.mrr),
        growth = growth,
        arr = money(req.arr),
        tone = growth_phrase(req.growth_rate),
        kind = req.kind(),
    )
}

/// File cache of product descriptions, one `<id>.txt` per product.
pub struct DescriptionStore {
    dir: PathBuf,
}

impl DescriptionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> AppResult<PathBuf> {
        if id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\', '\0']) {
            return Err(AppError::Validation(format!(
                "invalid description id {:?}",
                id
            )));
        }
        Ok(self.dir.join(format!("{}.txt", id)))
    }

    /// Cached description for `id`, `None` when none has been saved.
    pub fn read(&self, id: &str) -> AppResult<Option<String>> {
        let path = self.path_for(id)?;
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::io_at(&path, e)),
        }
    }

    /// Stores `text` as the description for `id`, replacing any previous one.
    pub fn write(&self, id: &str, text: &str) -> AppResult<PathBuf> {
        let path = self.path_for(id)?;
        fs::create_dir_all(&self.dir).map_err(|e| AppError::write_failed(&self.dir, e))?;

        let mut tmp =
            NamedTempFile::new_in(&self.dir).map_err(|e| AppError::write_failed(&self.dir, e))?;
        tmp.write_all(text.as_bytes())
            .map_err(|e| AppError::write_failed(tmp.path(), e))?;
        tmp.persist(&path)
            .map_err(|e| AppError::write_failed(&path, e.error))?;

        info!("description saved to {}", path.display());
        Ok(path)
    }

    /// Returns the cached description unless `force` is set or none exists,
    /// otherwise renders, stores and returns a new one.
    ///
    /// # Arguments
    /// * `req` - Product facts; `product` and `category` are required
    ///
    /// # Returns
    /// * `Ok(Description)` - The text and whether it was cached or generated
    /// * `Err(AppError::Validation)` - A required field is missing or the id is unusable
    pub fn describe(&self, req: &DescriptionRequest) -> AppResult<Description> {
        if req.product.trim().is_empty() {
            return Err(AppError::Validation("missing parameter: product".to_string()));
        }
        if req.category.trim().is_empty() {
            return Err(AppError::Validation("missing parameter: category".to_string()));
        }

        let id = req.file_id();
        if !req.force {
            if let Some(cached) = self.read(&id)? {
                debug!("description cache hit for {}", id);
                return Ok(Description {
                    description: cached,
                    source: SOURCE_CACHED.to_string(),
                });
            }
        }

        info!("generating description for {}", req.product);
        let text = render(req);
        self.write(&id, &text)?;
        Ok(Description {
            description: text,
            source: SOURCE_GENERATED.to_string(),
        })
    }
}
