use std::sync::Arc;
use tempfile::TempDir;
use tradelot::db::init_db;
use tradelot::domain::{Money, PartyId, ProductId, TimeMs};
use tradelot::engine::{allocator, ledger, ReceiveSpec};
use tradelot::error::EngineError;
use tradelot::Repository;

async fn setup_repo() -> (Arc<Repository>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    (Arc::new(Repository::new(pool)), temp_dir)
}

fn spec(product: &str, lot_number: &str) -> ReceiveSpec {
    ReceiveSpec {
        product_id: ProductId::new(product.to_string()),
        vendor_id: PartyId::new("vendor-1".to_string()),
        lot_number: lot_number.to_string(),
        variety_id: None,
    }
}

/// Create a committed lot of `qty` units received at `at`.
async fn seed_lot(repo: &Repository, product: &str, lot_number: &str, qty: i64, at: TimeMs) -> String {
    let mut tx = repo.begin().await.unwrap();
    let (_, lot) = ledger::receive(&mut tx, &spec(product, lot_number), qty, Money::from_cents(500), at)
        .await
        .unwrap();
    tx.commit().await.unwrap();
    lot.id
}

#[tokio::test]
async fn test_receive_creates_balanced_lot() {
    let (repo, _temp) = setup_repo().await;
    let lot_id = seed_lot(&repo, "apples", "LOT-A", 40, TimeMs::new(1000)).await;

    let lot = repo.get_lot(&lot_id).await.unwrap().unwrap();
    assert_eq!(lot.quantity_on_hand, 40);
    assert_eq!(lot.quantity_allocated, 0);
    assert_eq!(lot.quantity_available, 40);
    assert!(lot.is_balanced());
}

#[tokio::test]
async fn test_reserve_moves_available_to_allocated() {
    let (repo, _temp) = setup_repo().await;
    let lot_id = seed_lot(&repo, "apples", "LOT-A", 40, TimeMs::new(1000)).await;

    let mut tx = repo.begin().await.unwrap();
    ledger::reserve(&mut tx, &lot_id, 15, TimeMs::new(2000))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let lot = repo.get_lot(&lot_id).await.unwrap().unwrap();
    assert_eq!(lot.quantity_on_hand, 40);
    assert_eq!(lot.quantity_allocated, 15);
    assert_eq!(lot.quantity_available, 25);
    assert_eq!(lot.last_movement_ms, TimeMs::new(2000));
}

#[tokio::test]
async fn test_reserve_beyond_available_fails_and_leaves_lot_unchanged() {
    let (repo, _temp) = setup_repo().await;
    let lot_id = seed_lot(&repo, "apples", "LOT-A", 10, TimeMs::new(1000)).await;

    let mut tx = repo.begin().await.unwrap();
    let err = ledger::reserve(&mut tx, &lot_id, 11, TimeMs::new(2000))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientStock { .. }));
    drop(tx);

    let lot = repo.get_lot(&lot_id).await.unwrap().unwrap();
    assert_eq!(lot.quantity_available, 10);
    assert_eq!(lot.quantity_allocated, 0);
    assert_eq!(lot.last_movement_ms, TimeMs::new(1000));
}

#[tokio::test]
async fn test_reserve_missing_lot_is_not_found() {
    let (repo, _temp) = setup_repo().await;

    let mut tx = repo.begin().await.unwrap();
    let err = ledger::reserve(&mut tx, "no-such-lot", 1, TimeMs::new(0))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn test_consume_requires_reservation() {
    let (repo, _temp) = setup_repo().await;
    let lot_id = seed_lot(&repo, "apples", "LOT-A", 10, TimeMs::new(1000)).await;

    let mut tx = repo.begin().await.unwrap();
    let err = ledger::consume(&mut tx, &lot_id, 5).await.unwrap_err();
    assert!(matches!(err, EngineError::InsufficientAllocated { .. }));
}

#[tokio::test]
async fn test_consume_drops_on_hand_and_allocated() {
    let (repo, _temp) = setup_repo().await;
    let lot_id = seed_lot(&repo, "apples", "LOT-A", 10, TimeMs::new(1000)).await;

    let mut tx = repo.begin().await.unwrap();
    ledger::reserve(&mut tx, &lot_id, 7, TimeMs::new(2000))
        .await
        .unwrap();
    ledger::consume(&mut tx, &lot_id, 7).await.unwrap();
    tx.commit().await.unwrap();

    let lot = repo.get_lot(&lot_id).await.unwrap().unwrap();
    assert_eq!(lot.quantity_on_hand, 3);
    assert_eq!(lot.quantity_allocated, 0);
    assert_eq!(lot.quantity_available, 3);
    assert!(lot.is_balanced());
}

#[tokio::test]
async fn test_release_returns_quantity_to_available() {
    let (repo, _temp) = setup_repo().await;
    let lot_id = seed_lot(&repo, "apples", "LOT-A", 10, TimeMs::new(1000)).await;

    let mut tx = repo.begin().await.unwrap();
    ledger::reserve(&mut tx, &lot_id, 6, TimeMs::new(2000))
        .await
        .unwrap();
    ledger::release(&mut tx, &lot_id, 6, TimeMs::new(3000))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let lot = repo.get_lot(&lot_id).await.unwrap().unwrap();
    assert_eq!(lot.quantity_allocated, 0);
    assert_eq!(lot.quantity_available, 10);
}

#[tokio::test]
async fn test_fifo_prefers_oldest_movement() {
    let (repo, _temp) = setup_repo().await;
    let newer = seed_lot(&repo, "apples", "LOT-NEW", 50, TimeMs::new(5000)).await;
    let older = seed_lot(&repo, "apples", "LOT-OLD", 50, TimeMs::new(1000)).await;

    let mut tx = repo.begin().await.unwrap();
    let allocations = allocator::allocate_fifo(
        &mut tx,
        &ProductId::new("apples".to_string()),
        20,
        TimeMs::new(9000),
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(allocations.len(), 1);
    assert_eq!(allocations[0].lot_id, older);
    assert_eq!(allocations[0].quantity, 20);

    let untouched = repo.get_lot(&newer).await.unwrap().unwrap();
    assert_eq!(untouched.quantity_allocated, 0);
}

#[tokio::test]
async fn test_fifo_splits_across_lots_in_order() {
    let (repo, _temp) = setup_repo().await;
    let first = seed_lot(&repo, "apples", "LOT-1", 10, TimeMs::new(1000)).await;
    let second = seed_lot(&repo, "apples", "LOT-2", 25, TimeMs::new(2000)).await;

    let mut tx = repo.begin().await.unwrap();
    let allocations = allocator::allocate_fifo(
        &mut tx,
        &ProductId::new("apples".to_string()),
        30,
        TimeMs::new(9000),
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(allocations.len(), 2);
    assert_eq!(allocations[0].lot_id, first);
    assert_eq!(allocations[0].quantity, 10);
    assert_eq!(allocations[1].lot_id, second);
    assert_eq!(allocations[1].quantity, 20);

    let lot1 = repo.get_lot(&first).await.unwrap().unwrap();
    assert_eq!(lot1.quantity_available, 0);
    assert_eq!(lot1.quantity_allocated, 10);
    let lot2 = repo.get_lot(&second).await.unwrap().unwrap();
    assert_eq!(lot2.quantity_available, 5);
    assert_eq!(lot2.quantity_allocated, 20);
}

#[tokio::test]
async fn test_fifo_shortfall_rolls_back_partial_reservations() {
    let (repo, _temp) = setup_repo().await;
    let first = seed_lot(&repo, "apples", "LOT-1", 10, TimeMs::new(1000)).await;
    let second = seed_lot(&repo, "apples", "LOT-2", 5, TimeMs::new(2000)).await;

    let mut tx = repo.begin().await.unwrap();
    let err = allocator::allocate_fifo(
        &mut tx,
        &ProductId::new("apples".to_string()),
        30,
        TimeMs::new(9000),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        EngineError::InsufficientStock { requested: 30, .. }
    ));
    drop(tx);

    // The partial reservations made before the shortfall never committed.
    for lot_id in [&first, &second] {
        let lot = repo.get_lot(lot_id).await.unwrap().unwrap();
        assert_eq!(lot.quantity_allocated, 0);
        assert_eq!(lot.quantity_on_hand, lot.quantity_available);
    }
}

#[tokio::test]
async fn test_fifo_ignores_other_products() {
    let (repo, _temp) = setup_repo().await;
    seed_lot(&repo, "pears", "LOT-P", 100, TimeMs::new(1000)).await;
    let apples = seed_lot(&repo, "apples", "LOT-A", 8, TimeMs::new(2000)).await;

    let mut tx = repo.begin().await.unwrap();
    let allocations = allocator::allocate_fifo(
        &mut tx,
        &ProductId::new("apples".to_string()),
        8,
        TimeMs::new(9000),
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(allocations.len(), 1);
    assert_eq!(allocations[0].lot_id, apples);
}

#[tokio::test]
async fn test_allocate_from_lot_reserves_exactly() {
    let (repo, _temp) = setup_repo().await;
    let lot_id = seed_lot(&repo, "apples", "LOT-A", 12, TimeMs::new(1000)).await;

    let mut tx = repo.begin().await.unwrap();
    let alloc = allocator::allocate_from_lot(&mut tx, &lot_id, 12, TimeMs::new(2000))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(alloc.lot_id, lot_id);
    assert_eq!(alloc.quantity, 12);
    let lot = repo.get_lot(&lot_id).await.unwrap().unwrap();
    assert_eq!(lot.quantity_available, 0);
}

#[tokio::test]
async fn test_active_unit_cost_uses_newest_applicable_entry() {
    let (repo, _temp) = setup_repo().await;

    let mut tx = repo.begin().await.unwrap();
    let (batch, _) = ledger::receive(
        &mut tx,
        &spec("apples", "LOT-A"),
        10,
        Money::from_cents(500),
        TimeMs::new(1000),
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();

    // A later cost revision for the same batch.
    sqlx::query(
        "INSERT INTO batch_costs (id, batch_id, effective_from_ms, unit_cost) VALUES (?, ?, ?, ?)",
    )
    .bind("cost-2")
    .bind(&batch.id)
    .bind(5000_i64)
    .bind(750_i64)
    .execute(repo.pool())
    .await
    .unwrap();

    let mut tx = repo.begin().await.unwrap();
    let before = ledger::active_unit_cost(&mut tx, &batch.id, TimeMs::new(2000))
        .await
        .unwrap();
    let after = ledger::active_unit_cost(&mut tx, &batch.id, TimeMs::new(6000))
        .await
        .unwrap();
    let too_early = ledger::active_unit_cost(&mut tx, &batch.id, TimeMs::new(500))
        .await
        .unwrap();

    assert_eq!(before, Some(Money::from_cents(500)));
    assert_eq!(after, Some(Money::from_cents(750)));
    assert_eq!(too_early, None);
}
