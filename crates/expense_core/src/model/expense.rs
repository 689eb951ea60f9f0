//! Expense domain model.
//!
//! # Responsibility
//! - Define the single record type persisted by the store.
//! - Own the boundary parsing for amounts and titles.
//!
//! # Invariants
//! - `id` is assigned by the store and never reused for another expense.
//! - `amount` is always held as signed integer cents; there is no float path.
//! - A validated title is trimmed and non-empty.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Upper bound for title length, counted in characters.
pub const MAX_TITLE_CHARS: usize = 200;

static AMOUNT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<sign>[+-])?(?P<units>\d+)(?:[.,](?P<frac>\d{1,2}))?$")
        .expect("valid amount regex")
});

/// Store-assigned primary key.
pub type ExpenseId = i64;

/// Validation failure raised before anything reaches storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpenseValidationError {
    EmptyTitle,
    TitleTooLong { chars: usize, max: usize },
    InvalidAmount(String),
}

impl Display for ExpenseValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "title cannot be empty"),
            Self::TitleTooLong { chars, max } => {
                write!(f, "title has {chars} characters; at most {max} allowed")
            }
            Self::InvalidAmount(raw) => write!(
                f,
                "invalid amount `{raw}`; expected a number with at most two decimals"
            ),
        }
    }
}

impl Error for ExpenseValidationError {}

/// Monetary value in signed cents.
///
/// Ordering is numeric, which is what the amount index relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(i64);

impl Amount {
    pub const MIN: Amount = Amount(i64::MIN);
    pub const MAX: Amount = Amount(i64::MAX);
    pub const ZERO: Amount = Amount(0);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Whole units, e.g. `Amount::from_units(1200)` is `1200.00`.
    pub const fn from_units(units: i64) -> Self {
        Self(units.saturating_mul(100))
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Parses user-entered text such as `45`, `-999.99` or `12,5`.
    pub fn parse(raw: &str) -> Result<Self, ExpenseValidationError> {
        let trimmed = raw.trim();
        let invalid = || ExpenseValidationError::InvalidAmount(raw.to_string());
        let caps = AMOUNT_RE.captures(trimmed).ok_or_else(invalid)?;

        let units: i64 = caps["units"].parse().map_err(|_| invalid())?;
        let frac = match caps.name("frac") {
            Some(m) if m.as_str().len() == 1 => m.as_str().parse::<i64>().map_err(|_| invalid())? * 10,
            Some(m) => m.as_str().parse::<i64>().map_err(|_| invalid())?,
            None => 0,
        };
        let magnitude = units
            .checked_mul(100)
            .and_then(|cents| cents.checked_add(frac))
            .ok_or_else(invalid)?;

        let negative = caps.name("sign").is_some_and(|sign| sign.as_str() == "-");
        Ok(Self(if negative { -magnitude } else { magnitude }))
    }
}

impl FromStr for Amount {
    type Err = ExpenseValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Serialize for Amount {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Seed files carry amounts either as JSON numbers or as strings.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawAmount {
            Int(i64),
            Float(f64),
            Text(String),
        }

        let text = match RawAmount::deserialize(deserializer)? {
            RawAmount::Int(value) => value.to_string(),
            // Shortest round-trip text, so a third decimal is rejected
            // exactly like typed input.
            RawAmount::Float(value) => value.to_string(),
            RawAmount::Text(value) => value,
        };
        Amount::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// Input for creating or rewriting an expense; carries no id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewExpense {
    pub title: String,
    pub amount: Amount,
}

impl NewExpense {
    /// Builds a draft from already-typed values, normalizing the title.
    pub fn new(title: impl Into<String>, amount: Amount) -> Result<Self, ExpenseValidationError> {
        Ok(Self {
            title: normalize_title(&title.into())?,
            amount,
        })
    }

    /// Builds a draft from raw form text for both fields.
    pub fn parse(title: &str, amount: &str) -> Result<Self, ExpenseValidationError> {
        Self::new(title, Amount::parse(amount)?)
    }

    /// Checks invariants for drafts that bypassed the constructors.
    pub fn validate(&self) -> Result<(), ExpenseValidationError> {
        normalize_title(&self.title).map(|_| ())
    }

    /// Validated copy with the title trimmed, as it should be stored.
    pub fn normalized(&self) -> Result<Self, ExpenseValidationError> {
        Self::new(self.title.as_str(), self.amount)
    }
}

/// Persisted expense row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub title: String,
    pub amount: Amount,
}

impl Expense {
    /// Returns a copy with the writable fields replaced; `id` is kept.
    pub fn with_changes(&self, changes: NewExpense) -> Self {
        Self {
            id: self.id,
            title: changes.title,
            amount: changes.amount,
        }
    }

    pub fn validate(&self) -> Result<(), ExpenseValidationError> {
        normalize_title(&self.title).map(|_| ())
    }

    pub fn normalized(&self) -> Result<Self, ExpenseValidationError> {
        Ok(Self {
            id: self.id,
            title: normalize_title(&self.title)?,
            amount: self.amount,
        })
    }
}

fn normalize_title(raw: &str) -> Result<String, ExpenseValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ExpenseValidationError::EmptyTitle);
    }
    let chars = trimmed.chars().count();
    if chars > MAX_TITLE_CHARS {
        return Err(ExpenseValidationError::TitleTooLong {
            chars,
            max: MAX_TITLE_CHARS,
        });
    }
    Ok(trimmed.to_string())
}
