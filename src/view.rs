use std::cmp::Ordering;
use std::collections::HashSet;
use std::str::FromStr;

use crate::error::AppError;
use crate::record::Record;

/// Category value meaning "no category filter".
pub const ALL_CATEGORIES: &str = "全部";

/// Column a ranking list can be sorted by.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortKey {
    Rank,
    Product,
    Category,
    Mrr,
    Arr,
    GrowthRate,
    MonthlyActiveUsers,
    Arpu,
}

impl FromStr for SortKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "rank" => SortKey::Rank,
            "product" => SortKey::Product,
            "category" => SortKey::Category,
            "mrr" => SortKey::Mrr,
            "arr" => SortKey::Arr,
            "growthRate" => SortKey::GrowthRate,
            "monthlyActiveUsers" => SortKey::MonthlyActiveUsers,
            "arpu" => SortKey::Arpu,
            other => return Err(AppError::Validation(format!("unknown sort key {:?}", other))),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl FromStr for SortDirection {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(AppError::Validation(format!("unknown sort order {:?}", other))),
        }
    }
}

/// Compares optional figures with absent values last in either direction.
fn cmp_figure(a: Option<f64>, b: Option<f64>, dir: SortDirection) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => {
            let ord = x.partial_cmp(&y).unwrap_or(Ordering::Equal);
            match dir {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl SortKey {
    fn compare(self, a: &Record, b: &Record, dir: SortDirection) -> Ordering {
        let directed = |ord: Ordering| match dir {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        };
        match self {
            SortKey::Rank => directed(a.rank.cmp(&b.rank)),
            SortKey::Product => directed(a.product.cmp(&b.product)),
            SortKey::Category => directed(a.category.cmp(&b.category)),
            SortKey::Mrr => cmp_figure(a.mrr, b.mrr, dir),
            SortKey::Arr => cmp_figure(a.arr, b.arr, dir),
            SortKey::GrowthRate => cmp_figure(Some(a.growth_rate), Some(b.growth_rate), dir),
            SortKey::MonthlyActiveUsers => {
                cmp_figure(a.monthly_active_users, b.monthly_active_users, dir)
            }
            SortKey::Arpu => cmp_figure(a.arpu, b.arpu, dir),
        }
    }
}

/// Browsing state over one ranking list: search term, category and sort.
///
/// Owned by whoever renders the list and mutated only through its setters;
/// `filtered` is recomputed on every change.
#[derive(Clone, Debug)]
pub struct RankingView {
    apps: Vec<Record>,
    categories: Vec<String>,
    filtered: Vec<Record>,
    search_term: String,
    selected_category: String,
    sort: (SortKey, SortDirection),
}

impl Default for RankingView {
    fn default() -> Self {
        Self {
            apps: Vec::new(),
            categories: vec![ALL_CATEGORIES.to_string()],
            filtered: Vec::new(),
            search_term: String::new(),
            selected_category: ALL_CATEGORIES.to_string(),
            sort: (SortKey::Rank, SortDirection::Asc),
        }
    }
}

impl RankingView {
    pub fn new(apps: Vec<Record>) -> Self {
        let mut view = Self::default();
        view.set_apps(apps);
        view
    }

    pub fn apps(&self) -> &[Record] {
        &self.apps
    }

    /// `全部` followed by each distinct category in first-seen order.
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn filtered(&self) -> &[Record] {
        &self.filtered
    }

    pub fn into_filtered(self) -> Vec<Record> {
        self.filtered
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn selected_category(&self) -> &str {
        &self.selected_category
    }

    pub fn sort(&self) -> (SortKey, SortDirection) {
        self.sort
    }

    pub fn set_apps(&mut self, apps: Vec<Record>) {
        let mut seen = HashSet::new();
        self.categories = std::iter::once(ALL_CATEGORIES.to_string())
            .chain(
                apps.iter()
                    .filter(|r| seen.insert(r.category.clone()))
                    .map(|r| r.category.clone()),
            )
            .collect();
        self.apps = apps;
        self.refresh();
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.search_term = term.into();
        self.refresh();
    }

    pub fn set_selected_category(&mut self, category: impl Into<String>) {
        self.selected_category = category.into();
        self.refresh();
    }

    pub fn set_sort(&mut self, key: SortKey, direction: SortDirection) {
        self.sort = (key, direction);
        self.refresh();
    }

    pub fn reset_filters(&mut self) {
        self.search_term.clear();
        self.selected_category = ALL_CATEGORIES.to_string();
        self.sort = (SortKey::Rank, SortDirection::Asc);
        self.refresh();
    }

    fn refresh(&mut self) {
        let needle = self.search_term.to_lowercase();
        let category = self.selected_category.as_str();

        let mut filtered: Vec<Record> = self
            .apps
            .iter()
            .filter(|r| needle.is_empty() || r.product.to_lowercase().contains(&needle))
            .filter(|r| category == ALL_CATEGORIES || r.category == category)
            .cloned()
            .collect();

        let (key, dir) = self.sort;
        filtered.sort_by(|a, b| key.compare(a, b, dir));
        self.filtered = filtered;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ListKind;

    fn record(rank: u32, product: &str, category: &str, mrr: Option<f64>) -> Record {
        Record {
            rank,
            product: product.to_string(),
            market: None,
            category: category.to_string(),
            website: None,
            app: None,
            mrr,
            growth_rate: 0.0,
            arr: None,
            monthly_active_users: None,
            arpu: None,
            list_type: ListKind::Web,
        }
    }

    fn sample() -> Vec<Record> {
        vec![
            record(2, "Claude", "语言模型", Some(800.0)),
            record(1, "ChatGPT", "语言模型", Some(1000.0)),
            record(3, "Midjourney", "图像生成", None),
            record(4, "Canva", "设计", Some(300.0)),
        ]
    }

    fn products(view: &RankingView) -> Vec<&str> {
        view.filtered().iter().map(|r| r.product.as_str()).collect()
    }

    #[test]
    fn defaults_to_rank_order_with_all_categories() {
        let view = RankingView::new(sample());
        assert_eq!(products(&view), ["ChatGPT", "Claude", "Midjourney", "Canva"]);
        assert_eq!(view.categories(), ["全部", "语言模型", "图像生成", "设计"]);
        assert_eq!(view.selected_category(), ALL_CATEGORIES);
    }

    #[test]
    fn search_is_case_insensitive_and_combines_with_category() {
        let mut view = RankingView::new(sample());
        view.set_search_term("c");
        assert_eq!(products(&view), ["ChatGPT", "Claude", "Canva"]);

        view.set_selected_category("语言模型");
        assert_eq!(products(&view), ["ChatGPT", "Claude"]);

        view.set_search_term("CLA");
        assert_eq!(products(&view), ["Claude"]);
    }

    #[test]
    fn sort_places_absent_figures_last_both_ways() {
        let mut view = RankingView::new(sample());
        view.set_sort(SortKey::Mrr, SortDirection::Desc);
        assert_eq!(products(&view), ["ChatGPT", "Claude", "Canva", "Midjourney"]);

        view.set_sort(SortKey::Mrr, SortDirection::Asc);
        assert_eq!(products(&view), ["Canva", "Claude", "ChatGPT", "Midjourney"]);
    }

    #[test]
    fn reset_restores_defaults() {
        let mut view = RankingView::new(sample());
        view.set_search_term("zzz");
        view.set_sort(SortKey::Product, SortDirection::Desc);
        assert!(view.filtered().is_empty());

        view.reset_filters();
        assert_eq!(view.search_term(), "");
        assert_eq!(view.sort(), (SortKey::Rank, SortDirection::Asc));
        assert_eq!(view.filtered().len(), 4);
    }

    #[test]
    fn parses_sort_parameters() {
        assert_eq!("growthRate".parse::<SortKey>().unwrap(), SortKey::GrowthRate);
        assert!("growth".parse::<SortKey>().is_err());
        assert_eq!("desc".parse::<SortDirection>().unwrap(), SortDirection::Desc);
        assert!("down".parse::<SortDirection>().is_err());
    }
}
