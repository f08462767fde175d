//! Order store: transactional creation, totals, stock checks and status
//! updates.

use rust_decimal::Decimal;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tracing::instrument;

use railshop_core::{CustomerId, DomainError, DomainResult, OrderId, ProductCode};
use railshop_orders::{Order, OrderLine, OrderStatus};

use crate::catalog::CatalogStore;
use crate::db::{map_sqlx_error, narrow_count};

/// Read/write access to orders. Holds its own catalog handle: totals and
/// stock checks re-resolve every line against live catalog state.
#[derive(Debug, Clone)]
pub struct OrderStore {
    pool: SqlitePool,
    catalog: CatalogStore,
}

impl OrderStore {
    pub fn new(pool: SqlitePool) -> Self {
        let catalog = CatalogStore::new(pool.clone());
        Self { pool, catalog }
    }

    /// Current total of the order: Σ (current catalog price × quantity).
    ///
    /// Contract: every line's product is re-resolved from the catalog at
    /// call time, so the total always reflects current pricing, at the
    /// cost of one lookup per line. Cached line snapshots are ignored.
    #[instrument(skip(self, order), fields(line_count = order.lines().len()), err)]
    pub async fn total_cost(&self, order: &Order) -> DomainResult<Decimal> {
        let mut total = Decimal::ZERO;
        for line in order.lines() {
            let product = self.catalog.product_by_code(&line.product_code).await?;
            total += product.price * Decimal::from(line.quantity);
        }
        Ok(total)
    }

    /// Advisory stock precheck against current levels.
    ///
    /// Fails with `InsufficientStock` on the first line whose quantity
    /// exceeds the catalog's current stock; the boundary
    /// `requested == available` passes. This reserves nothing:
    /// [`create_order`](Self::create_order) re-validates atomically, so a
    /// passing precheck can still lose the race.
    #[instrument(skip(self, order), fields(line_count = order.lines().len()), err)]
    pub async fn check_stock(&self, order: &Order) -> DomainResult<()> {
        for line in order.lines() {
            let product = self.catalog.product_by_code(&line.product_code).await?;
            if line.quantity > product.stock_level {
                return Err(DomainError::InsufficientStock {
                    product_code: product.code.to_string(),
                    requested: line.quantity,
                    available: product.stock_level,
                });
            }
        }
        Ok(())
    }

    /// Persist a new order atomically and decrement stock.
    ///
    /// One transaction: insert the header, obtain the generated id, then
    /// for each line run a conditional stock decrement
    /// (`.. SET stock_level = stock_level - ? WHERE code = ? AND
    /// stock_level >= ?`) followed by the line insert. A decrement that
    /// affects no row means insufficient stock (or an unknown product) and
    /// aborts the whole order; any line failure rolls everything back. On
    /// success the generated id is assigned to `order`.
    #[instrument(
        skip(self, order),
        fields(customer_id = %order.customer_id, line_count = order.lines().len()),
        err
    )]
    pub async fn create_order(&self, order: &mut Order) -> DomainResult<OrderId> {
        if order.id().is_some() {
            return Err(DomainError::validation("order has already been created"));
        }
        if order.is_empty() {
            return Err(DomainError::validation("order has no lines"));
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_create_order", e))?;

        match insert_order(&mut tx, order).await {
            Ok(id) => {
                tx.commit()
                    .await
                    .map_err(|e| map_sqlx_error("commit_create_order", e))?;
                order.assign_id(id);
                Ok(id)
            }
            Err(err) => {
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("rollback_create_order", e))?;
                Err(err)
            }
        }
    }

    /// Fetch one order, hydrated with its lines.
    #[instrument(skip(self), fields(order_id = %order_id), err)]
    pub async fn order_by_id(&self, order_id: OrderId) -> DomainResult<Order> {
        let row = sqlx::query("SELECT id, customer_id, order_date, status FROM orders WHERE id = ?")
            .bind(order_id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("order_by_id", e))?;

        let row = row.ok_or_else(|| DomainError::not_found(format!("order [{order_id}]")))?;
        self.hydrate_order(&row).await
    }

    /// Update an order's status.
    ///
    /// Fails with `NotFound` when no such order exists and with
    /// `Validation` when the change is not in the allowed-transition table
    /// (`Pending → Confirmed → Fulfilled`). The update itself is
    /// conditional on the status it was checked against, so a concurrent
    /// transition surfaces as `Ok(false)` rather than a silent overwrite.
    #[instrument(skip(self), fields(order_id = %order_id, new_status = new_status.as_str()), err)]
    pub async fn update_status(
        &self,
        order_id: OrderId,
        new_status: OrderStatus,
    ) -> DomainResult<bool> {
        let row = sqlx::query("SELECT status FROM orders WHERE id = ?")
            .bind(order_id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_order_status", e))?;

        let row = row.ok_or_else(|| DomainError::not_found(format!("order [{order_id}]")))?;
        let current: OrderStatus = row
            .try_get::<String, _>("status")
            .map_err(|e| map_sqlx_error("find_order_status", e))?
            .parse()?;

        if !current.can_transition_to(new_status) {
            return Err(DomainError::validation(format!(
                "illegal status transition {} -> {}",
                current.as_str(),
                new_status.as_str()
            )));
        }

        let result = sqlx::query("UPDATE orders SET status = ? WHERE id = ? AND status = ?")
            .bind(new_status.as_str())
            .bind(order_id.as_i64())
            .bind(current.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_status", e))?;

        Ok(result.rows_affected() > 0)
    }

    /// All orders whose status is any of `statuses`, hydrated with lines.
    ///
    /// An empty status list yields an empty result. Result order is
    /// whatever the store returns; callers sort if they need an order.
    #[instrument(skip(self, statuses), fields(status_count = statuses.len()), err)]
    pub async fn orders_with_status(
        &self,
        statuses: &[OrderStatus],
    ) -> DomainResult<Vec<Order>> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; statuses.len()].join(", ");
        let sql = format!(
            "SELECT id, customer_id, order_date, status FROM orders WHERE status IN ({placeholders})"
        );

        let mut query = sqlx::query(&sql);
        for status in statuses {
            query = query.bind(status.as_str());
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("orders_with_status", e))?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in &rows {
            orders.push(self.hydrate_order(row).await?);
        }
        Ok(orders)
    }

    async fn hydrate_order(&self, row: &sqlx::sqlite::SqliteRow) -> DomainResult<Order> {
        let id: i64 = row
            .try_get("id")
            .map_err(|e| map_sqlx_error("order_row", e))?;
        let customer_id: i64 = row
            .try_get("customer_id")
            .map_err(|e| map_sqlx_error("order_row", e))?;
        let date: chrono::NaiveDate = row
            .try_get("order_date")
            .map_err(|e| map_sqlx_error("order_row", e))?;
        let status: OrderStatus = row
            .try_get::<String, _>("status")
            .map_err(|e| map_sqlx_error("order_row", e))?
            .parse()?;

        let lines = self.lines_for(id).await?;
        Ok(Order::from_parts(
            OrderId::new(id),
            CustomerId::new(customer_id),
            date,
            status,
            lines,
        ))
    }

    async fn lines_for(&self, order_id: i64) -> DomainResult<Vec<OrderLine>> {
        let rows =
            sqlx::query("SELECT product_code, quantity FROM order_lines WHERE order_id = ?")
                .bind(order_id)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("order_lines", e))?;

        let mut lines = Vec::with_capacity(rows.len());
        for row in rows {
            let product_code: String = row
                .try_get("product_code")
                .map_err(|e| map_sqlx_error("order_line_row", e))?;
            let quantity: i64 = row
                .try_get("quantity")
                .map_err(|e| map_sqlx_error("order_line_row", e))?;

            lines.push(OrderLine {
                product_code: ProductCode::new(product_code)?,
                quantity: narrow_count(quantity, "order line quantity")?,
                product: None,
            });
        }
        Ok(lines)
    }
}

/// Header insert, then per line: conditional stock decrement + line insert.
/// Runs inside the caller's transaction; any error aborts the whole order.
async fn insert_order(tx: &mut Transaction<'_, Sqlite>, order: &Order) -> DomainResult<OrderId> {
    let result = sqlx::query("INSERT INTO orders (customer_id, order_date, status) VALUES (?, ?, ?)")
        .bind(order.customer_id.as_i64())
        .bind(order.date)
        .bind(order.status.as_str())
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;

    let order_id = OrderId::new(result.last_insert_rowid());

    for line in order.lines() {
        let decremented = sqlx::query(
            "UPDATE products SET stock_level = stock_level - ? WHERE code = ? AND stock_level >= ?",
        )
        .bind(i64::from(line.quantity))
        .bind(line.product_code.as_str())
        .bind(i64::from(line.quantity))
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("decrement_stock", e))?;

        if decremented.rows_affected() == 0 {
            return Err(stock_failure(tx, line).await?);
        }

        sqlx::query("INSERT INTO order_lines (order_id, product_code, quantity) VALUES (?, ?, ?)")
            .bind(order_id.as_i64())
            .bind(line.product_code.as_str())
            .bind(i64::from(line.quantity))
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("insert_order_line", e))?;
    }

    Ok(order_id)
}

/// A conditional decrement matched no row: either the product is unknown or
/// its stock is short. Read the current level (inside the transaction) to
/// report which.
async fn stock_failure(
    tx: &mut Transaction<'_, Sqlite>,
    line: &OrderLine,
) -> DomainResult<DomainError> {
    let row = sqlx::query("SELECT stock_level FROM products WHERE code = ?")
        .bind(line.product_code.as_str())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("read_stock_level", e))?;

    match row {
        None => Ok(DomainError::not_found(format!(
            "product [{}]",
            line.product_code
        ))),
        Some(row) => {
            let available: i64 = row
                .try_get("stock_level")
                .map_err(|e| map_sqlx_error("read_stock_level", e))?;
            Ok(DomainError::InsufficientStock {
                product_code: line.product_code.to_string(),
                requested: line.quantity,
                available: narrow_count(available, "stock level")?,
            })
        }
    }
}
