use std::collections::BTreeMap;

/// One countable line of the count list.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    /// 1-based worksheet row; identity of the item within a session.
    pub row_index: u32,
    pub kategori: String,
    pub artikkelnummer: String,
    pub navn: String,
    pub enhet: String,
    pub pakningsinfo: Option<String>,
    pub pris_per_forpakning: Option<f64>,
    /// Quantity already present in the source file, not the live count.
    pub antall: Option<f64>,
}

/// Live counts keyed by `Item::row_index`. A missing key means "not counted yet",
/// which is different from a stored zero.
pub type CountsByRow = BTreeMap<u32, f64>;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub id: Option<i64>,
    pub month_year: String,
    pub file_name: String,
    /// SHA-256 of the imported workbook; names the stored copy used for export.
    pub checksum: String,
    pub sheet_name: String,
    pub counts: CountsByRow,
    /// Unix milliseconds of the last write.
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChecklistItem {
    pub id: i64,
    pub month_year: String,
    pub text: String,
    pub checked: bool,
    pub comment: Option<String>,
}
