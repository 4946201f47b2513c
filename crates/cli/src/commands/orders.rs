//! Order inspection and status changes.

use sqlx::PgPool;

use timberline_core::{OrderId, OrderStatus};
use timberline_storefront::db::orders::OrderRepository;

use super::CliError;

/// Print the most recent orders, newest first.
pub async fn list(pool: &PgPool, limit: i64) -> Result<(), CliError> {
    if limit < 1 {
        return Err(CliError::Invalid("limit must be at least 1".to_owned()));
    }
    let orders = OrderRepository::new(pool).list_recent(limit).await?;

    #[allow(clippy::print_stdout)]
    {
        println!(
            "{:<36} {:<20} {:<28} {:>10} {:<13} STATUS",
            "ID", "CREATED", "CUSTOMER", "TOTAL", "METHOD"
        );
        for order in orders {
            println!(
                "{:<36} {:<20} {:<28} {:>10} {:<13} {}",
                order.id,
                order.created_at.format("%Y-%m-%d %H:%M"),
                order.customer.email.as_str(),
                order.total,
                order.payment_method.as_str(),
                order.status
            );
        }
    }
    Ok(())
}

/// Set an order's status.
pub async fn set_status(pool: &PgPool, id: OrderId, status: OrderStatus) -> Result<(), CliError> {
    OrderRepository::new(pool).set_status(id, status).await?;
    tracing::info!(order_id = %id, %status, "Order status updated");
    Ok(())
}
