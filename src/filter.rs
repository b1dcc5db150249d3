use crate::models::{CountsByRow, Item};

/// Category selector meaning "no category filter".
pub const ALL_CATEGORIES: &str = "Alle";

#[derive(Debug, Default, Clone)]
pub struct ItemFilter {
    pub category: Option<String>,
    pub search: Option<String>,
    /// Keep only items without a live count.
    pub missing_only: bool,
}

impl ItemFilter {
    fn matches(&self, item: &Item, counts: &CountsByRow) -> bool {
        let category_ok = match self.category.as_deref() {
            None | Some(ALL_CATEGORIES) => true,
            Some(c) => item.kategori == c,
        };
        let search_ok = match self.search.as_deref() {
            None | Some("") => true,
            Some(term) => {
                let term = term.to_lowercase();
                item.navn.to_lowercase().contains(&term)
                    || item.artikkelnummer.to_lowercase().contains(&term)
            }
        };
        let missing_ok = !self.missing_only || !counts.contains_key(&item.row_index);
        category_ok && search_ok && missing_ok
    }
}

pub fn filter_items<'a>(items: &'a [Item], counts: &CountsByRow, filter: &ItemFilter) -> Vec<&'a Item> {
    items.iter().filter(|item| filter.matches(item, counts)).collect()
}

/// Distinct non-empty categories in the order they first appear.
pub fn categories(items: &[Item]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for item in items {
        if !item.kategori.is_empty() && !seen.contains(&item.kategori) {
            seen.push(item.kategori.clone());
        }
    }
    seen
}

/// Counted value of a line; zero unless both count and a non-zero price are known.
pub fn line_value(count: Option<f64>, price: Option<f64>) -> f64 {
    match (count, price) {
        (Some(c), Some(p)) if p != 0.0 => c * p,
        _ => 0.0,
    }
}

pub fn is_high_value(count: Option<f64>, price: Option<f64>, threshold: f64) -> bool {
    line_value(count, price) > threshold
}
