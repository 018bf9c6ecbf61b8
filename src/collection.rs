use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::record::{ListKind, ListSelector, Record};

/// The unified collection: both ranking lists plus their concatenation.
///
/// Field order is the serialized key order (`Web`, `App`, `all`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AppLists {
    #[serde(rename = "Web")]
    pub web: Vec<Record>,
    #[serde(rename = "App")]
    pub app: Vec<Record>,
    pub all: Vec<Record>,
}

/// Keys a client-submitted collection must carry.
pub const REQUIRED_KEYS: [&str; 3] = ["Web", "App", "all"];

impl AppLists {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record to its kind list and to `all` in the same step.
    pub fn push(&mut self, record: Record) {
        match record.list_type {
            ListKind::Web => self.web.push(record.clone()),
            ListKind::App => self.app.push(record.clone()),
        }
        self.all.push(record);
    }

    pub fn list(&self, kind: ListKind) -> &[Record] {
        match kind {
            ListKind::Web => &self.web,
            ListKind::App => &self.app,
        }
    }

    pub fn select(&self, selector: ListSelector) -> &[Record] {
        match selector {
            ListSelector::Kind(kind) => self.list(kind),
            ListSelector::All => &self.all,
        }
    }

    /// `all` has exactly one entry per kind-list entry.
    pub fn is_consistent(&self) -> bool {
        self.all.len() == self.web.len() + self.app.len()
    }

    /// Decodes a client-held collection, rejecting bodies that lack any of
    /// the three sequences before attempting a typed decode.
    pub fn from_json(value: serde_json::Value) -> AppResult<Self> {
        let object = value.as_object().ok_or_else(|| {
            AppError::Validation("collection must be a JSON object".to_string())
        })?;

        let missing: Vec<&str> = REQUIRED_KEYS
            .iter()
            .copied()
            .filter(|key| !object.get(*key).is_some_and(|v| v.is_array()))
            .collect();
        if !missing.is_empty() {
            return Err(AppError::Validation(format!(
                "collection must contain Web, App and all arrays; missing {}",
                missing.join(", ")
            )));
        }

        serde_json::from_value(value).map_err(|e| AppError::Validation(e.to_string()))
    }

    /// Minimal collection served until the first snapshot exists.
    pub fn fallback() -> Self {
        let mut lists = AppLists::new();
        lists.push(Record {
            rank: 1,
            product: "ChatGPT".to_string(),
            market: Some("海外".to_string()),
            category: "语言模型".to_string(),
            website: Some("https://chat.openai.com".to_string()),
            app: None,
            mrr: Some(1000.0),
            growth_rate: 0.15,
            arr: Some(12000.0),
            monthly_active_users: None,
            arpu: None,
            list_type: ListKind::Web,
        });
        lists.push(Record {
            rank: 1,
            product: "ChatGPT".to_string(),
            market: Some("海外".to_string()),
            category: "语言模型".to_string(),
            website: None,
            app: Some("ChatGPT".to_string()),
            mrr: Some(500.0),
            growth_rate: 0.1,
            arr: Some(6000.0),
            monthly_active_users: None,
            arpu: None,
            list_type: ListKind::App,
        });
        lists
    }
}
