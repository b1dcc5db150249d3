//! Mapping of a count-list worksheet onto `Item`s: header detection, column
//! inference and the category-aware row walk.

use calamine::{Data, Range};
use tracing::{debug, info};

use crate::error::ParseError;
use crate::models::Item;

pub type Sheet = Range<Data>;

/// Column-A label that marks the header row.
pub const HEADER_SENTINEL: &str = "ANTALL";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Antall,
    Artikkel,
    Navn,
    Enhet,
    Pakningsinfo,
    Pris,
}

/// A header matches a rule when it contains every needle.
struct ColumnRule {
    field: Field,
    needles: &'static [&'static str],
}

impl ColumnRule {
    fn matches(&self, header: &str) -> bool {
        self.needles.iter().all(|n| header.contains(n))
    }
}

// Evaluated in order for every header cell. Headers are free text, so one cell
// may satisfy several rules, and a later column overrides an earlier one.
const COLUMN_RULES: &[ColumnRule] = &[
    ColumnRule { field: Field::Antall, needles: &["ANTALL"] },
    ColumnRule { field: Field::Artikkel, needles: &["ARTIKKEL"] },
    ColumnRule { field: Field::Navn, needles: &["VARENAVN"] },
    ColumnRule { field: Field::Enhet, needles: &["FORPAKNINGEN", "SKAL"] },
    ColumnRule { field: Field::Pakningsinfo, needles: &["HVOR", "PAKNINGEN"] },
    ColumnRule { field: Field::Pris, needles: &["PRIS", "PER"] },
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnMap {
    pub antall: Option<u32>,
    pub artikkel: Option<u32>,
    pub navn: Option<u32>,
    pub enhet: Option<u32>,
    pub pakningsinfo: Option<u32>,
    pub pris: Option<u32>,
}

impl ColumnMap {
    fn assign(&mut self, field: Field, col: u32) {
        let slot = match field {
            Field::Antall => &mut self.antall,
            Field::Artikkel => &mut self.artikkel,
            Field::Navn => &mut self.navn,
            Field::Enhet => &mut self.enhet,
            Field::Pakningsinfo => &mut self.pakningsinfo,
            Field::Pris => &mut self.pris,
        };
        *slot = Some(col);
    }

    /// Column holding the live count; column A when no header matched.
    pub fn count_column(&self) -> u32 {
        self.antall.unwrap_or(0)
    }
}

/// Result of a full parse: where the header is, how columns map, and the items.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSheet {
    pub header_row: u32,
    pub columns: ColumnMap,
    pub items: Vec<Item>,
}

/// What a single body row contributes to the walk.
#[derive(Debug, Clone, PartialEq)]
pub enum RowKind {
    Category(String),
    Item(Item),
    Skip,
}

/// First row in the occupied range whose column-A text is the sentinel.
pub fn locate_header_row(sheet: &Sheet) -> Option<u32> {
    let (start, end) = (sheet.start()?, sheet.end()?);
    (start.0..=end.0).find(|&row| match sheet.get_value((row, 0)) {
        Some(Data::String(s)) => s.trim().to_uppercase() == HEADER_SENTINEL,
        _ => false,
    })
}

pub fn map_columns(sheet: &Sheet, header_row: u32) -> ColumnMap {
    let mut map = ColumnMap::default();
    let (Some(start), Some(end)) = (sheet.start(), sheet.end()) else {
        return map;
    };
    for col in start.1..=end.1 {
        let Some(Data::String(text)) = sheet.get_value((header_row, col)) else {
            continue;
        };
        let header = text.trim().to_uppercase();
        for rule in COLUMN_RULES {
            if rule.matches(&header) {
                map.assign(rule.field, col);
            }
        }
    }
    debug!(header_row, ?map, "mapped header columns");
    map
}

fn is_blank(value: Option<&Data>) -> bool {
    match value {
        None | Some(Data::Empty) => true,
        Some(Data::String(s)) => s.is_empty(),
        _ => false,
    }
}

fn text_at(sheet: &Sheet, row: u32, col: Option<u32>) -> Option<String> {
    match sheet.get_value((row, col?)) {
        None | Some(Data::Empty) => None,
        Some(value) => Some(value.to_string()),
    }
}

fn number_at(sheet: &Sheet, row: u32, col: Option<u32>) -> Option<f64> {
    match sheet.get_value((row, col?)) {
        Some(Data::Float(f)) => Some(*f),
        Some(Data::Int(i)) => Some(*i as f64),
        _ => None,
    }
}

/// Classifies one body row. Items come back with an empty `kategori`; the walk
/// in `parse_items` fills it in.
pub fn classify_row(sheet: &Sheet, columns: &ColumnMap, row: u32) -> RowKind {
    let article_col = columns.artikkel.unwrap_or(0);
    let article = sheet.get_value((row, article_col));

    if is_blank(article) {
        return match sheet.get_value((row, 0)) {
            Some(Data::String(s)) if !s.trim().is_empty() => RowKind::Category(s.trim().to_string()),
            _ => RowKind::Skip,
        };
    }

    RowKind::Item(Item {
        row_index: row + 1,
        kategori: String::new(),
        artikkelnummer: text_at(sheet, row, Some(article_col)).unwrap_or_default(),
        navn: text_at(sheet, row, Some(columns.navn.unwrap_or(0))).unwrap_or_default(),
        enhet: text_at(sheet, row, Some(columns.enhet.unwrap_or(0))).unwrap_or_default(),
        pakningsinfo: text_at(sheet, row, columns.pakningsinfo).filter(|s| !s.is_empty()),
        pris_per_forpakning: number_at(sheet, row, columns.pris),
        antall: number_at(sheet, row, Some(columns.count_column())),
    })
}

/// Walks every row below the header, carrying the current category.
pub fn parse_items(sheet: &Sheet, columns: &ColumnMap, header_row: u32) -> Vec<Item> {
    let Some(end) = sheet.end() else {
        return Vec::new();
    };
    let (_, items) = (header_row.saturating_add(1)..=end.0).fold(
        (String::new(), Vec::new()),
        |(mut kategori, mut items), row| {
            match classify_row(sheet, columns, row) {
                RowKind::Category(name) => kategori = name,
                RowKind::Item(mut item) => {
                    item.kategori = kategori.clone();
                    items.push(item);
                }
                RowKind::Skip => {}
            }
            (kategori, items)
        },
    );
    items
}

/// Header detection, column mapping and item walk in one go.
pub fn parse_sheet(sheet: &Sheet) -> Result<ParsedSheet, ParseError> {
    if sheet.start().is_none() {
        return Err(ParseError::SheetNotFound);
    }
    let header_row = locate_header_row(sheet).ok_or(ParseError::HeaderRowNotFound)?;
    let columns = map_columns(sheet, header_row);
    let items = parse_items(sheet, &columns, header_row);
    info!(header_row, items = items.len(), "parsed count list");
    Ok(ParsedSheet {
        header_row,
        columns,
        items,
    })
}
