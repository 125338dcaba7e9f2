//! Receivable/payable invoice types and invoice-number formatting.

use crate::domain::{Money, PartyId, TimeMs};
use serde::{Deserialize, Serialize};

/// Which side of the books an invoice sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceKind {
    /// Accounts receivable: the counterparty owes us.
    Receivable,
    /// Accounts payable: we owe the counterparty.
    Payable,
}

impl InvoiceKind {
    /// Wire/database representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceKind::Receivable => "receivable",
            InvoiceKind::Payable => "payable",
        }
    }

    /// Prefix used in invoice numbers.
    pub fn number_prefix(&self) -> &'static str {
        match self {
            InvoiceKind::Receivable => "B2B-AR",
            InvoiceKind::Payable => "B2B-AP",
        }
    }
}

impl std::str::FromStr for InvoiceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "receivable" => Ok(InvoiceKind::Receivable),
            "payable" => Ok(InvoiceKind::Payable),
            other => Err(format!("unknown invoice kind: {}", other)),
        }
    }
}

/// An AR or AP invoice created when a trade's goods movement completes.
///
/// Exactly one invoice is created per trade: receivable on DEPARTED for
/// outgoing trades, payable on ACCEPTED for incoming trades.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub kind: InvoiceKind,
    pub counterparty_id: PartyId,
    pub trade_id: String,
    pub invoice_number: String,
    pub invoice_date_ms: TimeMs,
    pub due_date_ms: TimeMs,
    pub amount: Money,
    pub balance_remaining: Money,
}

/// Format an invoice number: `<PREFIX>-<YEAR>-<5-digit-sequence>`.
pub fn invoice_number(kind: InvoiceKind, year: i32, sequence: i64) -> String {
    format!("{}-{}-{:05}", kind.number_prefix(), year, sequence)
}
