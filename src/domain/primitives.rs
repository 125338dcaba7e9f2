//! Domain primitives: TimeMs, Money, ProductId, PartyId.

use chrono::Datelike;
use serde::{Deserialize, Serialize};

/// Time in milliseconds since Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeMs(pub i64);

impl TimeMs {
    /// Create a TimeMs from milliseconds.
    pub fn new(ms: i64) -> Self {
        TimeMs(ms)
    }

    /// Current wall-clock time.
    pub fn now() -> Self {
        TimeMs(chrono::Utc::now().timestamp_millis())
    }

    /// Get the underlying milliseconds value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }

    /// Shift forward by whole days (used for invoice due dates).
    pub fn plus_days(self, days: i64) -> Self {
        TimeMs(self.0 + days * 86_400_000)
    }

    /// Calendar year of this timestamp (UTC).
    pub fn year(self) -> i32 {
        chrono::DateTime::from_timestamp_millis(self.0)
            .map(|dt| dt.year())
            .unwrap_or(1970)
    }
}

/// Monetary amount in integer cents.
///
/// All prices and invoice amounts are whole cents; there is no fractional
/// currency anywhere in the trade engine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Money(pub i64);

impl Money {
    /// Create a Money from cents.
    pub fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Zero amount.
    pub fn zero() -> Self {
        Money(0)
    }

    /// Get the underlying cents value.
    pub fn as_cents(&self) -> i64 {
        self.0
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl std::ops::Mul<i64> for Money {
    type Output = Money;

    fn mul(self, qty: i64) -> Money {
        Money(self.0 * qty)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

/// Product identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProductId(pub String);

impl ProductId {
    /// Create a ProductId from a string.
    pub fn new(id: String) -> Self {
        ProductId(id)
    }

    /// Get the id as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Counterparty identifier (customer or vendor business).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartyId(pub String);

impl PartyId {
    /// Create a PartyId from a string.
    pub fn new(id: String) -> Self {
        PartyId(id)
    }

    /// Get the id as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PartyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
