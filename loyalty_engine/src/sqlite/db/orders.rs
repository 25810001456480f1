use chrono::Utc;
use log::debug;
use sqlx::SqliteConnection;

use crate::db_types::{Order, OrderNumber, OrderStatusType, OrderUpdate};

/// Creates the orders table on a fresh database. Safe to call on every startup.
pub async fn ensure_schema(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS orders (
            number      TEXT PRIMARY KEY,
            login       TEXT NOT NULL,
            status      TEXT NOT NULL,
            accrual     DOUBLE,
            uploaded_at TIMESTAMP NOT NULL
        );
        "#,
    )
    .execute(conn)
    .await?;
    Ok(())
}

/// Orders that still await a terminal verdict, oldest first.
pub async fn fetch_pending_orders(conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as(
        r#"
        SELECT number, status, accrual, uploaded_at FROM orders
        WHERE status IN ('NEW', 'PROCESSING')
        ORDER BY uploaded_at ASC
        "#,
    )
    .fetch_all(conn)
    .await?;
    Ok(orders)
}

/// The login the order number is bound to, or `None` if the number is unseen.
pub async fn fetch_order_owner(
    number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Option<String>, sqlx::Error> {
    let login = sqlx::query_scalar("SELECT login FROM orders WHERE number = $1")
        .bind(number.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(login)
}

/// Inserts an unseen order number as `NEW`, bound to `login`.
pub async fn insert_as_new(number: &OrderNumber, login: &str, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO orders (number, login, status, uploaded_at) VALUES ($1, $2, $3, $4)")
        .bind(number.as_str())
        .bind(login)
        .bind(OrderStatusType::New)
        .bind(Utc::now())
        .execute(conn)
        .await?;
    debug!("🗃️ Order {number} created as NEW for {login}");
    Ok(())
}

/// Overwrites the stored status and accrual for the order.
pub async fn update_status(
    update: &OrderUpdate,
    status: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE orders SET status = $1, accrual = $2 WHERE number = $3")
        .bind(status)
        .bind(update.accrual)
        .bind(update.number.as_str())
        .execute(conn)
        .await?;
    Ok(())
}
