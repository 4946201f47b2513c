//! Database tests for paid-order persistence.
//!
//! These tests require a running `PostgreSQL` database. Migrations are applied
//! on connect. Point `STOREFRONT_DATABASE_URL` (or `DATABASE_URL`) at a
//! throwaway database.
//!
//! Run with: cargo test -p timberline-storefront -- --ignored

use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::task::JoinSet;
use uuid::Uuid;

use timberline_core::{
    CustomerContact, DiscountCodeId, DiscountKind, Email, OrderDraftItem, PaymentMethod, ProductId,
};
use timberline_storefront::db::discounts::NewDiscountCode;
use timberline_storefront::db::{DiscountRepository, OrderRepository};
use timberline_storefront::models::{NewOrder, OrderCreation};

async fn test_pool() -> PgPool {
    let url = std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .expect("STOREFRONT_DATABASE_URL or DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(16)
        .connect(&url)
        .await
        .expect("Failed to connect to test database");
    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

/// Session ids are unique per run so tests can share one database.
fn session_id() -> String {
    format!("cs_test_{}", Uuid::new_v4().simple())
}

async fn create_code(pool: &PgPool) -> DiscountCodeId {
    DiscountRepository::new(pool)
        .create(&NewDiscountCode {
            code: format!("DB{}", Uuid::new_v4().simple()),
            kind: DiscountKind::Percentage,
            value: Decimal::from(10),
            max_uses: None,
            expires_at: None,
        })
        .await
        .expect("Failed to create discount code")
        .id
}

async fn code_uses(pool: &PgPool, id: DiscountCodeId) -> i32 {
    sqlx::query_scalar("SELECT current_uses FROM discount_codes WHERE id = $1")
        .bind(id.as_uuid())
        .fetch_one(pool)
        .await
        .expect("Failed to read discount code")
}

async fn orders_for_session(pool: &PgPool, session_id: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE checkout_session_id = $1")
        .bind(session_id)
        .fetch_one(pool)
        .await
        .expect("Failed to count orders")
}

fn new_order(session_id: &str, discount_code_id: Option<DiscountCodeId>) -> NewOrder {
    NewOrder {
        checkout_session_id: session_id.to_owned(),
        customer: CustomerContact {
            name: "Ada Birch".to_owned(),
            email: Email::parse("ada@example.com").expect("valid email"),
            phone: "555-0100".to_owned(),
            address: "12 Elm Street".to_owned(),
        },
        total: Decimal::new(117_000, 2),
        discount_code_id,
        payment_method: PaymentMethod::Card,
        items: vec![
            OrderDraftItem {
                product_id: ProductId::new(),
                quantity: 2,
                price: Decimal::from(500),
            },
            OrderDraftItem {
                product_id: ProductId::new(),
                quantity: 1,
                price: Decimal::from(300),
            },
        ],
    }
}

// ============================================================================
// Idempotency
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "Requires database"]
async fn test_concurrent_confirmations_of_one_session_write_once() {
    let pool = test_pool().await;
    let code = create_code(&pool).await;
    let session_id = session_id();
    let order = new_order(&session_id, Some(code));
    let repo = OrderRepository::new(&pool);

    let (a, b) = tokio::join!(repo.create_paid(&order), repo.create_paid(&order));
    let a = a.expect("first confirmation failed");
    let b = b.expect("second confirmation failed");

    assert_eq!(a.order_id(), b.order_id());
    assert_eq!(
        [a, b].iter().filter(|c| matches!(c, OrderCreation::Created(_))).count(),
        1,
        "exactly one call should write the order"
    );
    assert_eq!(orders_for_session(&pool, &session_id).await, 1);
    assert_eq!(code_uses(&pool, code).await, 1);

    let stored = repo
        .get_with_items(a.order_id())
        .await
        .expect("Failed to load order")
        .expect("order exists");
    assert_eq!(stored.items.len(), 2);
    assert_eq!(stored.order.total, Decimal::new(117_000, 2));
    assert_eq!(stored.order.discount_code_id, Some(code));
}

#[tokio::test]
#[ignore = "Requires database"]
async fn test_repeat_confirmation_returns_existing_order() {
    let pool = test_pool().await;
    let session_id = session_id();
    let order = new_order(&session_id, None);
    let repo = OrderRepository::new(&pool);

    let first = repo.create_paid(&order).await.expect("first insert");
    let second = repo.create_paid(&order).await.expect("second insert");

    assert!(matches!(first, OrderCreation::Created(_)));
    assert_eq!(second, OrderCreation::Existing(first.order_id()));
}

// ============================================================================
// Discount use counting
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "Requires database"]
async fn test_concurrent_orders_sharing_a_code_count_every_use() {
    const ORDERS: i32 = 12;

    let pool = test_pool().await;
    let code = create_code(&pool).await;

    let mut tasks = JoinSet::new();
    for _ in 0..ORDERS {
        let pool = pool.clone();
        tasks.spawn(async move {
            OrderRepository::new(&pool)
                .create_paid(&new_order(&session_id(), Some(code)))
                .await
        });
    }
    while let Some(result) = tasks.join_next().await {
        let creation = result.expect("task panicked").expect("insert failed");
        assert!(matches!(creation, OrderCreation::Created(_)));
    }

    assert_eq!(code_uses(&pool, code).await, ORDERS);
}

// ============================================================================
// Atomicity
// ============================================================================

#[tokio::test]
#[ignore = "Requires database"]
async fn test_failed_item_insert_leaves_nothing_behind() {
    let pool = test_pool().await;
    let code = create_code(&pool).await;
    let session_id = session_id();
    let mut order = new_order(&session_id, Some(code));
    // Violates order_items' quantity check after the order row is inserted.
    order.items.last_mut().expect("order has items").quantity = 0;

    let result = OrderRepository::new(&pool).create_paid(&order).await;

    assert!(result.is_err());
    assert_eq!(orders_for_session(&pool, &session_id).await, 0);
    assert_eq!(code_uses(&pool, code).await, 0);
}
