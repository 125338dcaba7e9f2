//! Trade state machine and per-transition side-effect handlers.
//!
//! `TradeEngine` is the sole mutation entry point for trades. Each status
//! change runs one transaction: validate the edge, run the matching handler
//! (allocate / ship / receive), compare-and-swap the status, append the
//! `STATUS_<X>` event, and create the AR/AP invoice where the transition
//! calls for one. A handler failure rolls the whole transaction back, so the
//! trade, its items, all touched lots, and the event log stay exactly as
//! they were.

use crate::db::repo::{events as events_repo, invoices as invoices_repo, lots as lots_repo,
    trades as trades_repo, Repository};
use crate::domain::{
    invoice_number, Allocation, AllocatedPayload, Batch, CreatedPayload, DepartedItemPayload,
    EventPayload, Invoice, InvoiceKind, InvoicePayload, Lot, Money, NewTrade, PartyId, ProductId,
    ReceivedItemPayload, StatusPayload, TimeMs, Trade, TradeDirection, TradeItem, TradeStatus,
};
use crate::engine::{allocator, ledger, IntakeRequest};
use crate::error::EngineError;
use sqlx::SqliteConnection;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Whether `from -> to` is a legal edge for a trade of the given direction.
///
/// Outgoing trades terminate via ARRIVED; incoming trades terminate via
/// ACCEPTED or REJECTED and may skip DEPARTED. Outgoing trades may also
/// depart straight from DRAFT (allocation then happens at depart time).
pub fn is_legal_transition(
    direction: TradeDirection,
    from: TradeStatus,
    to: TradeStatus,
) -> bool {
    use TradeDirection::{Incoming, Outgoing};
    use TradeStatus::{Accepted, Arrived, Committed, Departed, Draft, Rejected};

    match (direction, from, to) {
        (_, Draft, Committed) => true,
        (Outgoing, Draft, Departed) => true,
        (_, Committed, Departed) => true,
        (Outgoing, Departed, Arrived) => true,
        (Incoming, Committed, Accepted | Rejected) => true,
        (Incoming, Departed, Accepted | Rejected) => true,
        _ => false,
    }
}

/// The trade engine: creation, status transitions, and inventory intake.
pub struct TradeEngine {
    repo: Arc<Repository>,
    net_terms_days: i64,
}

impl TradeEngine {
    /// Create a new engine over the repository.
    pub fn new(repo: Arc<Repository>, net_terms_days: i64) -> Self {
        TradeEngine {
            repo,
            net_terms_days,
        }
    }

    /// Create a DRAFT trade with one line item per valid input item.
    pub async fn create_trade(&self, input: NewTrade) -> Result<Trade, EngineError> {
        self.create_trade_at(input, TimeMs::now()).await
    }

    /// Create a trade at an explicit timestamp (tests control the clock).
    pub async fn create_trade_at(
        &self,
        input: NewTrade,
        now: TimeMs,
    ) -> Result<Trade, EngineError> {
        if input.items.is_empty() {
            return Err(EngineError::ItemsRequired);
        }

        // Normalize: clamp negative prices to zero, drop items with no
        // product or non-positive quantity.
        let trade_id = Uuid::new_v4().to_string();
        let items: Vec<TradeItem> = input
            .items
            .into_iter()
            .filter(|i| !i.product_id.is_empty() && i.quantity > 0)
            .map(|i| TradeItem {
                id: Uuid::new_v4().to_string(),
                trade_id: trade_id.clone(),
                product_id: ProductId::new(i.product_id),
                variety_id: i.variety_id,
                quantity: i.quantity,
                unit_price: Money::from_cents(i.unit_price.max(0)),
                lot_id: None,
                created_ms: now,
            })
            .collect();
        if items.is_empty() {
            return Err(EngineError::InvalidItems);
        }

        let trade = Trade {
            id: trade_id,
            direction: input.direction,
            source_id: PartyId::new(input.source_id),
            target_id: PartyId::new(input.target_id),
            status: TradeStatus::Draft,
            depart_at_ms: None,
            arrive_at_ms: None,
            created_ms: now,
            items,
        };

        let mut tx = self.repo.begin().await?;
        trades_repo::insert_trade(&mut tx, &trade).await?;
        for item in &trade.items {
            trades_repo::insert_item(&mut tx, item).await?;
        }
        events_repo::append(
            &mut tx,
            &trade.id,
            EventPayload::Created(CreatedPayload {
                direction: trade.direction,
                source_id: trade.source_id.as_str().to_string(),
                target_id: trade.target_id.as_str().to_string(),
            }),
            now,
        )
        .await?;
        tx.commit().await?;

        info!(trade_id = %trade.id, direction = %trade.direction, items = trade.items.len(), "trade created");
        Ok(trade)
    }

    /// Request a status change on a trade.
    ///
    /// Re-requesting the current status is a no-op and returns the trade
    /// unchanged. Illegal edges fail with `InvalidTransition`. Otherwise the
    /// matching side-effect handler, the status update, the `STATUS_<X>`
    /// event, and any invoice all commit atomically or not at all.
    pub async fn update_status(
        &self,
        trade_id: &str,
        new_status: TradeStatus,
    ) -> Result<Trade, EngineError> {
        self.update_status_at(trade_id, new_status, TimeMs::now())
            .await
    }

    /// `update_status` at an explicit timestamp.
    pub async fn update_status_at(
        &self,
        trade_id: &str,
        new_status: TradeStatus,
        now: TimeMs,
    ) -> Result<Trade, EngineError> {
        let mut tx = self.repo.begin().await?;

        let trade = trades_repo::fetch_trade(&mut tx, trade_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("trade {}", trade_id)))?;

        if trade.status == new_status {
            return Ok(trade);
        }
        if !is_legal_transition(trade.direction, trade.status, new_status) {
            return Err(EngineError::InvalidTransition {
                from: trade.status,
                to: new_status,
            });
        }

        match (new_status, trade.direction) {
            (TradeStatus::Committed, TradeDirection::Outgoing) => {
                self.allocate_for_outgoing(&mut tx, &trade, now).await?;
            }
            (TradeStatus::Departed, TradeDirection::Outgoing) => {
                self.depart_for_outgoing(&mut tx, &trade, now).await?;
            }
            (TradeStatus::Accepted, TradeDirection::Incoming) => {
                self.accept_for_incoming(&mut tx, &trade, now).await?;
            }
            // COMMITTED/DEPARTED on incoming, ARRIVED, and REJECTED carry no
            // inventory or financial side effects.
            _ => {}
        }

        let depart_at = if new_status == TradeStatus::Departed {
            Some(now)
        } else {
            trade.depart_at_ms
        };
        let arrive_at = if matches!(new_status, TradeStatus::Arrived | TradeStatus::Accepted) {
            Some(now)
        } else {
            trade.arrive_at_ms
        };

        let swapped = trades_repo::update_status_cas(
            &mut tx,
            trade_id,
            trade.status,
            new_status,
            depart_at,
            arrive_at,
        )
        .await?;
        if !swapped {
            // A concurrent transition changed the status under us.
            return Err(EngineError::InvalidTransition {
                from: trade.status,
                to: new_status,
            });
        }

        events_repo::append(
            &mut tx,
            trade_id,
            EventPayload::Status(StatusPayload {
                from: trade.status,
                to: new_status,
            }),
            now,
        )
        .await?;

        // Items may have been split by the handler; refetch before computing
        // the invoice total and returning.
        let updated = trades_repo::fetch_trade(&mut tx, trade_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("trade {}", trade_id)))?;

        if new_status == TradeStatus::Departed && trade.direction == TradeDirection::Outgoing {
            let total = updated.total_amount();
            let invoice = self
                .create_invoice(
                    &mut tx,
                    trade_id,
                    InvoiceKind::Receivable,
                    &trade.target_id,
                    total,
                    now,
                )
                .await?;
            events_repo::append(
                &mut tx,
                trade_id,
                EventPayload::ArCreated(InvoicePayload {
                    invoice_number: invoice.invoice_number,
                    total,
                }),
                now,
            )
            .await?;
        }
        if new_status == TradeStatus::Accepted && trade.direction == TradeDirection::Incoming {
            let total = updated.total_amount();
            let invoice = self
                .create_invoice(
                    &mut tx,
                    trade_id,
                    InvoiceKind::Payable,
                    &trade.source_id,
                    total,
                    now,
                )
                .await?;
            events_repo::append(
                &mut tx,
                trade_id,
                EventPayload::ApCreated(InvoicePayload {
                    invoice_number: invoice.invoice_number,
                    total,
                }),
                now,
            )
            .await?;
        }

        tx.commit().await?;
        info!(trade_id = %trade_id, from = %trade.status, to = %new_status, "trade transition applied");
        Ok(updated)
    }

    /// Bring pre-existing stock into inventory: batch + cost entry + lot.
    pub async fn intake(&self, request: IntakeRequest) -> Result<(Batch, Lot), EngineError> {
        self.intake_at(request, TimeMs::now()).await
    }

    /// `intake` at an explicit timestamp.
    pub async fn intake_at(
        &self,
        request: IntakeRequest,
        now: TimeMs,
    ) -> Result<(Batch, Lot), EngineError> {
        if request.product_id.is_empty() || request.quantity <= 0 {
            return Err(EngineError::InvalidItems);
        }

        let spec = ledger::ReceiveSpec {
            product_id: ProductId::new(request.product_id),
            vendor_id: PartyId::new(request.vendor_id),
            lot_number: request.lot_number,
            variety_id: request.variety_id,
        };

        let mut tx = self.repo.begin().await?;
        let (batch, lot) = ledger::receive(
            &mut tx,
            &spec,
            request.quantity,
            Money::from_cents(request.unit_cost.max(0)),
            now,
        )
        .await?;
        tx.commit().await?;

        info!(batch_id = %batch.id, lot_id = %lot.id, quantity = lot.quantity_on_hand, "stock intake recorded");
        Ok((batch, lot))
    }

    /// COMMITTED handler (outgoing): reserve every line item's quantity,
    /// splitting items across lots where FIFO allocation spans several.
    async fn allocate_for_outgoing(
        &self,
        conn: &mut SqliteConnection,
        trade: &Trade,
        now: TimeMs,
    ) -> Result<(), EngineError> {
        for item in &trade.items {
            if item.quantity <= 0 {
                continue;
            }

            let allocations = match &item.lot_id {
                Some(lot_id) => {
                    vec![allocator::allocate_from_lot(conn, lot_id, item.quantity, now).await?]
                }
                None => {
                    let allocs =
                        allocator::allocate_fifo(conn, &item.product_id, item.quantity, now)
                            .await?;
                    split_item_across_lots(conn, item, &allocs, now).await?;
                    allocs
                }
            };

            events_repo::append(
                conn,
                &trade.id,
                EventPayload::Allocated(AllocatedPayload {
                    item_id: item.id.clone(),
                    allocations,
                }),
                now,
            )
            .await?;
        }
        Ok(())
    }

    /// DEPARTED handler (outgoing): late-allocate unresolved items, then
    /// consume every resolved (lot, quantity) pair and record the unit cost
    /// in effect at ship time.
    async fn depart_for_outgoing(
        &self,
        conn: &mut SqliteConnection,
        trade: &Trade,
        now: TimeMs,
    ) -> Result<(), EngineError> {
        for item in &trade.items {
            if item.quantity <= 0 {
                continue;
            }

            let resolved = match &item.lot_id {
                Some(lot_id) => vec![(
                    item.id.clone(),
                    Allocation {
                        lot_id: lot_id.clone(),
                        quantity: item.quantity,
                    },
                )],
                None => {
                    let allocs =
                        allocator::allocate_fifo(conn, &item.product_id, item.quantity, now)
                            .await?;
                    let resolved = split_item_across_lots(conn, item, &allocs, now).await?;
                    events_repo::append(
                        conn,
                        &trade.id,
                        EventPayload::AllocateOnDepart(AllocatedPayload {
                            item_id: item.id.clone(),
                            allocations: allocs,
                        }),
                        now,
                    )
                    .await?;
                    resolved
                }
            };

            for (item_id, alloc) in resolved {
                ledger::consume(conn, &alloc.lot_id, alloc.quantity).await?;

                let unit_cost = match lots_repo::fetch_lot(conn, &alloc.lot_id).await? {
                    Some(lot) => ledger::active_unit_cost(conn, &lot.batch_id, now).await?,
                    None => None,
                };

                events_repo::append(
                    conn,
                    &trade.id,
                    EventPayload::DepartedItem(DepartedItemPayload {
                        item_id,
                        lot_id: alloc.lot_id,
                        quantity: alloc.quantity,
                        unit_cost,
                    }),
                    now,
                )
                .await?;
            }
        }
        Ok(())
    }

    /// ACCEPTED handler (incoming): create a batch + lot per unresolved line
    /// item at the item's unit price as cost, and link the item to it.
    async fn accept_for_incoming(
        &self,
        conn: &mut SqliteConnection,
        trade: &Trade,
        now: TimeMs,
    ) -> Result<(), EngineError> {
        let mut idx = 0;
        for item in &trade.items {
            if item.quantity <= 0 || item.lot_id.is_some() {
                continue;
            }
            idx += 1;

            let spec = ledger::ReceiveSpec {
                product_id: item.product_id.clone(),
                vendor_id: trade.source_id.clone(),
                lot_number: format!("B2B-{}-{}", trade.id, idx),
                variety_id: item.variety_id.clone(),
            };
            let (batch, lot) =
                ledger::receive(conn, &spec, item.quantity, item.unit_price, now).await?;
            trades_repo::update_item_lot(conn, &item.id, &lot.id).await?;

            events_repo::append(
                conn,
                &trade.id,
                EventPayload::ReceivedItem(ReceivedItemPayload {
                    item_id: item.id.clone(),
                    batch_id: batch.id,
                    lot_id: lot.id,
                    quantity: item.quantity,
                    unit_cost: item.unit_price,
                }),
                now,
            )
            .await?;
        }
        Ok(())
    }

    async fn create_invoice(
        &self,
        conn: &mut SqliteConnection,
        trade_id: &str,
        kind: InvoiceKind,
        counterparty: &PartyId,
        total: Money,
        now: TimeMs,
    ) -> Result<Invoice, EngineError> {
        let sequence = invoices_repo::count_kind(conn, kind).await? + 1;
        let invoice = Invoice {
            id: Uuid::new_v4().to_string(),
            kind,
            counterparty_id: counterparty.clone(),
            trade_id: trade_id.to_string(),
            invoice_number: invoice_number(kind, now.year(), sequence),
            invoice_date_ms: now,
            due_date_ms: now.plus_days(self.net_terms_days),
            amount: total,
            balance_remaining: total,
        };
        invoices_repo::insert_invoice(conn, &invoice).await?;
        Ok(invoice)
    }
}

/// Rewrite `item` to the first (lot, quantity) pair and insert sibling items
/// for the rest. Returns every resolved `(item_id, allocation)` pair; the
/// summed quantities equal the item's original quantity.
async fn split_item_across_lots(
    conn: &mut SqliteConnection,
    item: &TradeItem,
    allocations: &[Allocation],
    now: TimeMs,
) -> Result<Vec<(String, Allocation)>, EngineError> {
    let Some((first, rest)) = allocations.split_first() else {
        return Ok(Vec::new());
    };

    trades_repo::update_item_allocation(conn, &item.id, &first.lot_id, first.quantity).await?;
    let mut resolved = vec![(item.id.clone(), first.clone())];

    for alloc in rest {
        let sibling = TradeItem {
            id: Uuid::new_v4().to_string(),
            trade_id: item.trade_id.clone(),
            product_id: item.product_id.clone(),
            variety_id: item.variety_id.clone(),
            quantity: alloc.quantity,
            unit_price: item.unit_price,
            lot_id: Some(alloc.lot_id.clone()),
            created_ms: now,
        };
        trades_repo::insert_item(conn, &sibling).await?;
        resolved.push((sibling.id, alloc.clone()));
    }

    Ok(resolved)
}
