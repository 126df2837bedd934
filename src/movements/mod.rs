//! Client-side filtering and ordering of account movements

use crate::api::Movement;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Movement types whose name contains this marker are charges.
pub const EXPENSE_MARKER: &str = "consumo";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Income,
    Expense,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MovementFilter {
    #[default]
    #[serde(rename = "todos")]
    All,
    #[serde(rename = "positivos")]
    Income,
    #[serde(rename = "consumos")]
    Expense,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    #[serde(rename = "fecha-desc")]
    DateDesc,
    #[serde(rename = "fecha-asc")]
    DateAsc,
    #[serde(rename = "monto-desc")]
    AmountDesc,
    #[serde(rename = "monto-asc")]
    AmountAsc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSelector(pub String);

impl fmt::Display for UnknownSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown selector: {}", self.0)
    }
}

impl std::error::Error for UnknownSelector {}

impl FromStr for MovementFilter {
    type Err = UnknownSelector;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "todos" | "all" => Ok(Self::All),
            "positivos" | "income" => Ok(Self::Income),
            "consumos" | "expense" => Ok(Self::Expense),
            other => Err(UnknownSelector(other.to_string())),
        }
    }
}

impl FromStr for SortOrder {
    type Err = UnknownSelector;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fecha-desc" | "date-desc" => Ok(Self::DateDesc),
            "fecha-asc" | "date-asc" => Ok(Self::DateAsc),
            "monto-desc" | "amount-desc" => Ok(Self::AmountDesc),
            "monto-asc" | "amount-asc" => Ok(Self::AmountAsc),
            other => Err(UnknownSelector(other.to_string())),
        }
    }
}

impl Movement {
    /// Direction comes from the type name, never from the sign of `monto`.
    pub fn direction(&self) -> Direction {
        let is_expense = self
            .tipo_movimiento
            .as_ref()
            .map(|t| t.nombre.to_lowercase().contains(EXPENSE_MARKER))
            .unwrap_or(false);
        if is_expense {
            Direction::Expense
        } else {
            Direction::Income
        }
    }

    pub fn type_name(&self) -> &str {
        self.tipo_movimiento
            .as_ref()
            .map(|t| t.nombre.as_str())
            .filter(|n| !n.is_empty())
            .unwrap_or("Movimiento")
    }

    /// Amount as shown to the user, e.g. `-$50.00` for a charge.
    pub fn display_amount(&self) -> String {
        let sign = match self.direction() {
            Direction::Expense => '-',
            Direction::Income => '+',
        };
        format!("{}${:.2}", sign, self.monto.abs())
    }

    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        parse_date(&self.fecha)
    }
}

fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

impl MovementFilter {
    pub fn accepts(&self, movement: &Movement) -> bool {
        match self {
            MovementFilter::All => true,
            MovementFilter::Income => movement.direction() == Direction::Income,
            MovementFilter::Expense => movement.direction() == Direction::Expense,
        }
    }
}

impl SortOrder {
    // Unparseable dates are `None`, which orders before every real date.
    fn compare(&self, a: &Movement, b: &Movement) -> Ordering {
        match self {
            SortOrder::DateDesc => b.timestamp().cmp(&a.timestamp()),
            SortOrder::DateAsc => a.timestamp().cmp(&b.timestamp()),
            SortOrder::AmountDesc => b.monto.total_cmp(&a.monto),
            SortOrder::AmountAsc => a.monto.total_cmp(&b.monto),
        }
    }
}

/// Filter then sort, returning a new list. Entries that compare equal keep
/// their input order.
pub fn apply(movements: &[Movement], filter: MovementFilter, order: SortOrder) -> Vec<Movement> {
    let mut result: Vec<Movement> = movements
        .iter()
        .filter(|m| filter.accepts(m))
        .cloned()
        .collect();
    result.sort_by(|a, b| order.compare(a, b));
    result
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Totals {
    pub income: f64,
    pub expense: f64,
}

impl Totals {
    pub fn net(&self) -> f64 {
        self.income - self.expense
    }
}

/// Sum absolute amounts per direction.
pub fn totals(movements: &[Movement]) -> Totals {
    movements.iter().fold(Totals::default(), |mut acc, m| {
        match m.direction() {
            Direction::Income => acc.income += m.monto.abs(),
            Direction::Expense => acc.expense += m.monto.abs(),
        }
        acc
    })
}
