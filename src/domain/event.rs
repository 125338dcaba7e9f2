//! Append-only trade event log types.
//!
//! Every side effect and state change is recorded as a `TradeEvent`. The
//! payload is a closed set of tagged variants, one per event type, so the
//! shape of each payload is checked at compile time while the database still
//! stores a plain `(event_type, data)` pair.

use crate::domain::{Allocation, Money, TradeDirection, TradeStatus, TimeMs};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Payload of a `CREATED` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedPayload {
    pub direction: TradeDirection,
    pub source_id: String,
    pub target_id: String,
}

/// Payload of an `ALLOCATED` or `ALLOCATE_ON_DEPART` event: the full list of
/// lot/quantity pairs used for one original line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocatedPayload {
    pub item_id: String,
    pub allocations: Vec<Allocation>,
}

/// Payload of a `DEPARTED_ITEM` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartedItemPayload {
    pub item_id: String,
    pub lot_id: String,
    pub quantity: i64,
    /// Unit cost in effect at ship time, for margin reporting. None when the
    /// lot's batch has no cost history entry yet.
    pub unit_cost: Option<Money>,
}

/// Payload of a `RECEIVED_ITEM` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedItemPayload {
    pub item_id: String,
    pub batch_id: String,
    pub lot_id: String,
    pub quantity: i64,
    pub unit_cost: Money,
}

/// Payload of a `STATUS_<X>` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPayload {
    pub from: TradeStatus,
    pub to: TradeStatus,
}

/// Payload of an `AR_CREATED` or `AP_CREATED` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoicePayload {
    pub invoice_number: String,
    pub total: Money,
}

/// The closed set of event payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventPayload {
    Created(CreatedPayload),
    Allocated(AllocatedPayload),
    AllocateOnDepart(AllocatedPayload),
    DepartedItem(DepartedItemPayload),
    ReceivedItem(ReceivedItemPayload),
    Status(StatusPayload),
    ArCreated(InvoicePayload),
    ApCreated(InvoicePayload),
}

/// Failure to reconstruct a payload from its stored form.
#[derive(Debug, Error)]
pub enum EventDecodeError {
    #[error("unknown event type: {0}")]
    UnknownType(String),
    #[error("malformed event data: {0}")]
    Json(#[from] serde_json::Error),
}

impl EventPayload {
    /// The wire tag stored in the `event_type` column.
    pub fn event_type(&self) -> String {
        match self {
            EventPayload::Created(_) => "CREATED".to_string(),
            EventPayload::Allocated(_) => "ALLOCATED".to_string(),
            EventPayload::AllocateOnDepart(_) => "ALLOCATE_ON_DEPART".to_string(),
            EventPayload::DepartedItem(_) => "DEPARTED_ITEM".to_string(),
            EventPayload::ReceivedItem(_) => "RECEIVED_ITEM".to_string(),
            EventPayload::Status(p) => format!("STATUS_{}", p.to.as_str()),
            EventPayload::ArCreated(_) => "AR_CREATED".to_string(),
            EventPayload::ApCreated(_) => "AP_CREATED".to_string(),
        }
    }

    /// Serialize the payload for the `data` column.
    pub fn to_data(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            EventPayload::Created(p) => serde_json::to_value(p),
            EventPayload::Allocated(p) => serde_json::to_value(p),
            EventPayload::AllocateOnDepart(p) => serde_json::to_value(p),
            EventPayload::DepartedItem(p) => serde_json::to_value(p),
            EventPayload::ReceivedItem(p) => serde_json::to_value(p),
            EventPayload::Status(p) => serde_json::to_value(p),
            EventPayload::ArCreated(p) => serde_json::to_value(p),
            EventPayload::ApCreated(p) => serde_json::to_value(p),
        }
    }

    /// Reconstruct a payload from its stored `(event_type, data)` pair.
    pub fn from_parts(event_type: &str, data: &str) -> Result<Self, EventDecodeError> {
        if event_type.starts_with("STATUS_") {
            return Ok(EventPayload::Status(serde_json::from_str(data)?));
        }
        match event_type {
            "CREATED" => Ok(EventPayload::Created(serde_json::from_str(data)?)),
            "ALLOCATED" => Ok(EventPayload::Allocated(serde_json::from_str(data)?)),
            "ALLOCATE_ON_DEPART" => {
                Ok(EventPayload::AllocateOnDepart(serde_json::from_str(data)?))
            }
            "DEPARTED_ITEM" => Ok(EventPayload::DepartedItem(serde_json::from_str(data)?)),
            "RECEIVED_ITEM" => Ok(EventPayload::ReceivedItem(serde_json::from_str(data)?)),
            "AR_CREATED" => Ok(EventPayload::ArCreated(serde_json::from_str(data)?)),
            "AP_CREATED" => Ok(EventPayload::ApCreated(serde_json::from_str(data)?)),
            other => Err(EventDecodeError::UnknownType(other.to_string())),
        }
    }
}

/// One append-only audit record scoped to a trade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeEvent {
    pub id: String,
    pub trade_id: String,
    pub payload: EventPayload,
    pub created_ms: TimeMs,
}

impl TradeEvent {
    /// The wire tag of this event.
    pub fn event_type(&self) -> String {
        self.payload.event_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_event_type_carries_target() {
        let payload = EventPayload::Status(StatusPayload {
            from: TradeStatus::Draft,
            to: TradeStatus::Committed,
        });
        assert_eq!(payload.event_type(), "STATUS_COMMITTED");
    }

    #[test]
    fn test_payload_roundtrip() {
        let payloads = vec![
            EventPayload::Created(CreatedPayload {
                direction: TradeDirection::Outgoing,
                source_id: "us".to_string(),
                target_id: "them".to_string(),
            }),
            EventPayload::Allocated(AllocatedPayload {
                item_id: "item-1".to_string(),
                allocations: vec![
                    Allocation {
                        lot_id: "lot-1".to_string(),
                        quantity: 10,
                    },
                    Allocation {
                        lot_id: "lot-2".to_string(),
                        quantity: 20,
                    },
                ],
            }),
            EventPayload::DepartedItem(DepartedItemPayload {
                item_id: "item-1".to_string(),
                lot_id: "lot-1".to_string(),
                quantity: 10,
                unit_cost: Some(Money::from_cents(500)),
            }),
            EventPayload::Status(StatusPayload {
                from: TradeStatus::Departed,
                to: TradeStatus::Arrived,
            }),
            EventPayload::ArCreated(InvoicePayload {
                invoice_number: "B2B-AR-2026-00001".to_string(),
                total: Money::from_cents(42500),
            }),
        ];

        for payload in payloads {
            let event_type = payload.event_type();
            let data = payload.to_data().unwrap().to_string();
            let decoded = EventPayload::from_parts(&event_type, &data).unwrap();
            assert_eq!(decoded, payload);
        }
    }

    #[test]
    fn test_unknown_event_type_rejected() {
        let err = EventPayload::from_parts("SOMETHING_ELSE", "{}").unwrap_err();
        assert!(matches!(err, EventDecodeError::UnknownType(_)));
    }

    #[test]
    fn test_malformed_data_rejected() {
        let err = EventPayload::from_parts("ALLOCATED", "{\"nope\":true}").unwrap_err();
        assert!(matches!(err, EventDecodeError::Json(_)));
    }
}
