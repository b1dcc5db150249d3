use std::sync::OnceLock;

use chrono::{Datelike, Local, NaiveDate};
use regex::Regex;

use crate::error::{Result, VareError};

/// Norwegian month names as they appear in count list file names, January first.
const MONTHS: [&str; 12] = [
    "JANUAR", "FEBRUAR", "MARS", "APRIL", "MAI", "JUNI", "JULI", "AUGUST", "SEPTEMBER",
    "OKTOBER", "NOVEMBER", "DESEMBER",
];

pub fn format_month_year(year: i32, month: u32) -> String {
    format!("{year:04}-{month:02}")
}

pub fn current_month_year() -> String {
    let today = Local::now().date_naive();
    format_month_year(today.year(), today.month())
}

fn year_pattern() -> &'static Regex {
    static YEAR_RE: OnceLock<Regex> = OnceLock::new();
    YEAR_RE.get_or_init(|| Regex::new(r"20\d{2}").expect("valid regex"))
}

/// Guesses the counting period from a file name like "Varetelling MARS 2025.xlsx".
/// Both a month name and a year must be present; otherwise it is `today`'s month.
pub fn month_year_from_file_name(name: &str, today: NaiveDate) -> String {
    let upper = name.to_uppercase();
    let month = MONTHS.iter().position(|m| upper.contains(m)).map(|i| i as u32 + 1);
    let year = year_pattern()
        .find(&upper)
        .and_then(|m| m.as_str().parse::<i32>().ok());
    match (year, month) {
        (Some(year), Some(month)) => format_month_year(year, month),
        _ => format_month_year(today.year(), today.month()),
    }
}

/// Accepts `YYYY-MM` with a month between 01 and 12.
pub fn parse_month_year(input: &str) -> Result<String> {
    let invalid = || VareError::InvalidPeriod(input.to_string());
    let (year, month) = input.trim().split_once('-').ok_or_else(invalid)?;
    if year.len() != 4 || month.len() != 2 {
        return Err(invalid());
    }
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u32 = month.parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&month) {
        return Err(invalid());
    }
    Ok(format_month_year(year, month))
}
