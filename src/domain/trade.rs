//! Trade and trade line-item types plus the status/direction enums.

use crate::domain::{Money, PartyId, ProductId, TimeMs};
use serde::{Deserialize, Serialize};

/// Direction of a trade relative to this business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeDirection {
    /// A sale: goods leave our inventory.
    Outgoing,
    /// A purchase: goods enter our inventory.
    Incoming,
}

impl TradeDirection {
    /// Wire/database representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeDirection::Outgoing => "outgoing",
            TradeDirection::Incoming => "incoming",
        }
    }
}

impl std::str::FromStr for TradeDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "outgoing" => Ok(TradeDirection::Outgoing),
            "incoming" => Ok(TradeDirection::Incoming),
            other => Err(format!("unknown trade direction: {}", other)),
        }
    }
}

impl std::fmt::Display for TradeDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle status of a trade.
///
/// Statuses only move forward: DRAFT -> COMMITTED -> DEPARTED, then one of
/// the terminal branches (ARRIVED for outgoing, ACCEPTED/REJECTED for
/// incoming). The legal edge set lives in `engine::lifecycle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeStatus {
    Draft,
    Committed,
    Departed,
    Arrived,
    Accepted,
    Rejected,
}

impl TradeStatus {
    /// Wire/database representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeStatus::Draft => "DRAFT",
            TradeStatus::Committed => "COMMITTED",
            TradeStatus::Departed => "DEPARTED",
            TradeStatus::Arrived => "ARRIVED",
            TradeStatus::Accepted => "ACCEPTED",
            TradeStatus::Rejected => "REJECTED",
        }
    }

    /// Terminal statuses have no outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TradeStatus::Arrived | TradeStatus::Accepted | TradeStatus::Rejected
        )
    }
}

impl std::str::FromStr for TradeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(TradeStatus::Draft),
            "COMMITTED" => Ok(TradeStatus::Committed),
            "DEPARTED" => Ok(TradeStatus::Departed),
            "ARRIVED" => Ok(TradeStatus::Arrived),
            "ACCEPTED" => Ok(TradeStatus::Accepted),
            "REJECTED" => Ok(TradeStatus::Rejected),
            other => Err(format!("unknown trade status: {}", other)),
        }
    }
}

impl std::fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single line item on a trade.
///
/// An item starts unresolved (`lot_id` = None) and is pinned to a lot during
/// allocation. An item whose quantity spans several lots is split: its
/// quantity is rewritten to the first lot's share and sibling items are
/// inserted for the remainder, so quantity is partitioned, never duplicated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeItem {
    pub id: String,
    pub trade_id: String,
    pub product_id: ProductId,
    pub variety_id: Option<String>,
    pub quantity: i64,
    pub unit_price: Money,
    pub lot_id: Option<String>,
    pub created_ms: TimeMs,
}

impl TradeItem {
    /// Line total: quantity x unit price.
    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }
}

/// A B2B sale (outgoing) or purchase (incoming) record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub direction: TradeDirection,
    pub source_id: PartyId,
    pub target_id: PartyId,
    pub status: TradeStatus,
    pub depart_at_ms: Option<TimeMs>,
    pub arrive_at_ms: Option<TimeMs>,
    pub created_ms: TimeMs,
    pub items: Vec<TradeItem>,
}

impl Trade {
    /// Sum of all line totals.
    pub fn total_amount(&self) -> Money {
        self.items.iter().map(|i| i.line_total()).sum()
    }
}

/// Input for one line item of a new trade, pre-normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTradeItem {
    pub product_id: String,
    pub quantity: i64,
    /// Unit price in cents; negative values are clamped to zero.
    pub unit_price: i64,
    #[serde(default)]
    pub variety_id: Option<String>,
}

/// Input for creating a trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTrade {
    pub direction: TradeDirection,
    pub source_id: String,
    pub target_id: String,
    pub items: Vec<NewTradeItem>,
}
