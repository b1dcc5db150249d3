use std::collections::BTreeMap;

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::db::now_millis;
use crate::error::{Result, VareError};

/// NOK coins and notes counted in the registers.
pub const DENOMINATIONS: [u32; 9] = [1, 5, 10, 20, 50, 100, 200, 500, 1000];

/// Value of one roll (or bundle) per denomination as kept in the safe.
pub const DEFAULT_ROLL_VALUES: [(u32, f64); 9] = [
    (1, 50.0),
    (5, 250.0),
    (10, 500.0),
    (20, 400.0),
    (50, 500.0),
    (100, 1000.0),
    (200, 2000.0),
    (500, 5000.0),
    (1000, 10000.0),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Register {
    Kasse1,
    Kasse2,
    /// Counted in rolls rather than pieces.
    Safe,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashCount {
    pub month_year: String,
    pub kasse1: BTreeMap<u32, u32>,
    pub kasse2: BTreeMap<u32, u32>,
    pub safe: BTreeMap<u32, u32>,
    pub roll_values: BTreeMap<u32, f64>,
}

impl CashCount {
    pub fn new(month_year: &str) -> Self {
        Self {
            month_year: month_year.to_string(),
            kasse1: BTreeMap::new(),
            kasse2: BTreeMap::new(),
            safe: BTreeMap::new(),
            roll_values: DEFAULT_ROLL_VALUES.into_iter().collect(),
        }
    }

    pub fn register(&self, register: Register) -> &BTreeMap<u32, u32> {
        match register {
            Register::Kasse1 => &self.kasse1,
            Register::Kasse2 => &self.kasse2,
            Register::Safe => &self.safe,
        }
    }

    pub fn set(&mut self, register: Register, denomination: u32, count: u32) -> Result<()> {
        validate_denomination(denomination)?;
        let map = match register {
            Register::Kasse1 => &mut self.kasse1,
            Register::Kasse2 => &mut self.kasse2,
            Register::Safe => &mut self.safe,
        };
        map.insert(denomination, count);
        Ok(())
    }

    pub fn set_roll_value(&mut self, denomination: u32, value: f64) -> Result<()> {
        validate_denomination(denomination)?;
        if !value.is_finite() || value < 0.0 {
            return Err(VareError::Other(format!("Invalid roll value: {value}")));
        }
        self.roll_values.insert(denomination, value);
        Ok(())
    }

    pub fn roll_value(&self, denomination: u32) -> f64 {
        self.roll_values.get(&denomination).copied().unwrap_or(0.0)
    }

    pub fn sum(&self, register: Register) -> f64 {
        let counts = self.register(register);
        counts
            .iter()
            .map(|(&denom, &count)| match register {
                Register::Safe => count as f64 * self.roll_value(denom),
                _ => count as f64 * denom as f64,
            })
            .sum()
    }

    pub fn total(&self) -> f64 {
        self.sum(Register::Kasse1) + self.sum(Register::Kasse2) + self.sum(Register::Safe)
    }
}

pub fn validate_denomination(denomination: u32) -> Result<()> {
    if DENOMINATIONS.contains(&denomination) {
        Ok(())
    } else {
        Err(VareError::InvalidDenomination(denomination))
    }
}

/// The month's tally, or an empty one with default roll values.
pub fn get_cash_count(conn: &Connection, month_year: &str) -> Result<CashCount> {
    let row: Option<(String, String, String, String)> = conn
        .query_row(
            "SELECT kasse1, kasse2, safe, roll_values FROM cash_counts WHERE month_year = ?1",
            [month_year],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )
        .optional()?;
    match row {
        None => Ok(CashCount::new(month_year)),
        Some((kasse1, kasse2, safe, roll_values)) => Ok(CashCount {
            month_year: month_year.to_string(),
            kasse1: serde_json::from_str(&kasse1)?,
            kasse2: serde_json::from_str(&kasse2)?,
            safe: serde_json::from_str(&safe)?,
            roll_values: serde_json::from_str(&roll_values)?,
        }),
    }
}

pub fn save_cash_count(conn: &Connection, cash: &CashCount) -> Result<()> {
    conn.execute(
        "INSERT INTO cash_counts (month_year, kasse1, kasse2, safe, roll_values, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(month_year) DO UPDATE SET
            kasse1 = excluded.kasse1,
            kasse2 = excluded.kasse2,
            safe = excluded.safe,
            roll_values = excluded.roll_values,
            timestamp = excluded.timestamp",
        params![
            cash.month_year,
            serde_json::to_string(&cash.kasse1)?,
            serde_json::to_string(&cash.kasse2)?,
            serde_json::to_string(&cash.safe)?,
            serde_json::to_string(&cash.roll_values)?,
            now_millis()
        ],
    )?;
    Ok(())
}
