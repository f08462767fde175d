//! Integration tests for the full store stack against in-memory SQLite.
//!
//! Verifies:
//! - Catalog resolution (variants, boxed-set expansion, cycle guard)
//! - Transactional order creation with conditional stock decrements
//! - Status transition enforcement
//! - Vault round-trips and key-scoped access

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rand::RngCore;
    use rust_decimal_macros::dec;
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;

    use railshop_catalog::{Component, ControlType, Curvature, Gauge, PriceBracket};
    use railshop_core::{BankDetailId, CustomerId, DomainError, OrderId, ProductCode};
    use railshop_orders::{Order, OrderStatus};
    use railshop_vault::{EncryptionKey, NewBankDetail};

    use crate::catalog::CatalogStore;
    use crate::db::apply_schema;
    use crate::orders::OrderStore;
    use crate::vault::VaultStore;

    async fn memory_pool() -> SqlitePool {
        railshop_observability::init();

        // One connection: the in-memory database lives exactly as long as
        // the connection, and concurrent callers serialize on it.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .expect("connect to in-memory sqlite");
        apply_schema(&pool).await.expect("apply schema");
        pool
    }

    fn code(s: &str) -> ProductCode {
        ProductCode::new(s).unwrap()
    }

    fn order_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    async fn seed_product(pool: &SqlitePool, code: &str, name: &str, stock: i64, price: &str) {
        sqlx::query("INSERT INTO products (code, name, stock_level, price) VALUES (?, ?, ?, ?)")
            .bind(code)
            .bind(name)
            .bind(stock)
            .bind(price)
            .execute(pool)
            .await
            .unwrap();
    }

    async fn seed_component(pool: &SqlitePool, code: &str, brand: &str, era: &str, gauge: &str) {
        sqlx::query("INSERT INTO components (code, brand, era, gauge) VALUES (?, ?, ?, ?)")
            .bind(code)
            .bind(brand)
            .bind(era)
            .bind(gauge)
            .execute(pool)
            .await
            .unwrap();
    }

    async fn seed_variant(pool: &SqlitePool, table: &str, column: &str, code: &str, value: &str) {
        let sql = format!("INSERT INTO {table} (code, {column}) VALUES (?, ?)");
        sqlx::query(&sql)
            .bind(code)
            .bind(value)
            .execute(pool)
            .await
            .unwrap();
    }

    async fn seed_content(pool: &SqlitePool, set_code: &str, content_code: &str, quantity: i64) {
        sqlx::query(
            "INSERT INTO boxed_set_contents (box_set_code, content_code, quantity) VALUES (?, ?, ?)",
        )
        .bind(set_code)
        .bind(content_code)
        .bind(quantity)
        .execute(pool)
        .await
        .unwrap();
    }

    /// Seed a fully described locomotive product.
    async fn seed_locomotive(pool: &SqlitePool, code: &str, stock: i64, price: &str) {
        seed_product(pool, code, &format!("Locomotive {code}"), stock, price).await;
        seed_component(pool, code, "Hornby", "BR era", "OO").await;
        seed_variant(pool, "locomotives", "price_bracket", code, "PREMIUM").await;
    }

    async fn stock_of(pool: &SqlitePool, code: &str) -> i64 {
        sqlx::query_scalar("SELECT stock_level FROM products WHERE code = ?")
            .bind(code)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    fn random_key() -> EncryptionKey {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        EncryptionKey::new(bytes)
    }

    // ----- catalog -----

    #[tokio::test]
    async fn product_by_code_returns_the_row() {
        let pool = memory_pool().await;
        seed_product(&pool, "L100", "Flying Scotsman", 4, "179.99").await;

        let catalog = CatalogStore::new(pool);
        let product = catalog.product_by_code(&code("L100")).await.unwrap();
        assert_eq!(product.name, "Flying Scotsman");
        assert_eq!(product.stock_level, 4);
        assert_eq!(product.price, dec!(179.99));
    }

    #[tokio::test]
    async fn product_by_code_reports_absent_products() {
        let pool = memory_pool().await;
        let catalog = CatalogStore::new(pool);

        let err = catalog.product_by_code(&code("L404")).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_products_returns_all_rows_by_code() {
        let pool = memory_pool().await;
        seed_product(&pool, "R2", "Curve", 10, "4.50").await;
        seed_product(&pool, "L1", "Shunter", 2, "54.00").await;

        let catalog = CatalogStore::new(pool);
        let products = catalog.list_products().await.unwrap();
        let codes: Vec<_> = products.iter().map(|p| p.code.as_str()).collect();
        assert_eq!(codes, vec!["L1", "R2"]);
    }

    #[tokio::test]
    async fn locomotive_resolves_with_its_variant_attributes() {
        let pool = memory_pool().await;
        seed_locomotive(&pool, "L100", 4, "179.99").await;

        let catalog = CatalogStore::new(pool);
        let product = catalog.product_by_code(&code("L100")).await.unwrap();
        let component = catalog.resolve_component(&product).await.unwrap();

        match component {
            Component::Locomotive {
                info,
                price_bracket,
            } => {
                assert_eq!(info.brand, "Hornby");
                assert_eq!(info.era, "BR era");
                assert_eq!(info.gauge, Gauge::OO);
                assert_eq!(price_bracket, PriceBracket::Premium);
                assert_eq!(info.product, product);
            }
            other => panic!("expected a locomotive, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn controller_and_track_resolve_their_variants() {
        let pool = memory_pool().await;
        seed_product(&pool, "C10", "Power controller", 3, "39.99").await;
        seed_component(&pool, "C10", "Gaugemaster", "modern", "N").await;
        seed_variant(&pool, "controllers", "control_type", "C10", "DIGITAL").await;

        seed_product(&pool, "R20", "Second radius curve", 40, "4.25").await;
        seed_component(&pool, "R20", "Peco", "any", "OO").await;
        seed_variant(&pool, "tracks", "curvature", "R20", "SECOND_RADIUS").await;

        let catalog = CatalogStore::new(pool);

        let controller = catalog
            .resolve_component(&catalog.product_by_code(&code("C10")).await.unwrap())
            .await
            .unwrap();
        assert!(matches!(
            controller,
            Component::Controller {
                control_type: ControlType::Digital,
                ..
            }
        ));

        let track = catalog
            .resolve_component(&catalog.product_by_code(&code("R20")).await.unwrap())
            .await
            .unwrap();
        assert!(matches!(
            track,
            Component::Track {
                curvature: Curvature::SecondRadius,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn accessory_resolves_from_the_component_table_alone() {
        let pool = memory_pool().await;
        seed_product(&pool, "S5", "Station kit", 7, "12.99").await;
        seed_component(&pool, "S5", "Metcalfe", "steam", "OO").await;

        let catalog = CatalogStore::new(pool);
        let component = catalog
            .resolve_component(&catalog.product_by_code(&code("S5")).await.unwrap())
            .await
            .unwrap();
        assert!(matches!(component, Component::Accessory { .. }));
    }

    #[tokio::test]
    async fn resolving_a_boxed_set_code_as_component_fails() {
        let pool = memory_pool().await;
        seed_product(&pool, "M1", "Starter set", 2, "99.99").await;

        let catalog = CatalogStore::new(pool);
        let product = catalog.product_by_code(&code("M1")).await.unwrap();
        let err = catalog.resolve_component(&product).await.unwrap_err();
        assert_eq!(err, DomainError::NotComponent("M1".to_string()));
    }

    #[tokio::test]
    async fn missing_variant_row_is_an_integrity_failure() {
        let pool = memory_pool().await;
        // Product and component rows exist, locomotives row does not.
        seed_product(&pool, "L7", "Ghost locomotive", 1, "10.00").await;
        seed_component(&pool, "L7", "Hornby", "BR era", "OO").await;

        let catalog = CatalogStore::new(pool);
        let product = catalog.product_by_code(&code("L7")).await.unwrap();
        let err = catalog.resolve_component(&product).await.unwrap_err();
        assert_eq!(err, DomainError::MissingVariantRow("L7".to_string()));
    }

    #[tokio::test]
    async fn missing_component_row_is_an_integrity_failure() {
        let pool = memory_pool().await;
        seed_product(&pool, "L8", "Bare product row", 1, "10.00").await;

        let catalog = CatalogStore::new(pool);
        let product = catalog.product_by_code(&code("L8")).await.unwrap();
        let err = catalog.resolve_component(&product).await.unwrap_err();
        assert_eq!(err, DomainError::MissingVariantRow("L8".to_string()));
    }

    #[tokio::test]
    async fn empty_boxed_set_resolves_to_empty_lists() {
        let pool = memory_pool().await;
        seed_product(&pool, "M9", "Empty set", 1, "0.00").await;

        let catalog = CatalogStore::new(pool);
        let product = catalog.product_by_code(&code("M9")).await.unwrap();
        let set = catalog.resolve_boxed_set(&product).await.unwrap();
        assert!(set.is_empty());
        assert!(set.components.is_empty());
        assert!(set.boxed_sets.is_empty());
    }

    #[tokio::test]
    async fn boxed_set_expands_components_and_nested_sets() {
        let pool = memory_pool().await;
        seed_locomotive(&pool, "L1", 5, "54.00").await;
        seed_product(&pool, "R1", "Straight track", 100, "3.50").await;
        seed_component(&pool, "R1", "Peco", "any", "OO").await;
        seed_variant(&pool, "tracks", "curvature", "R1", "STRAIGHT").await;

        // P1 is a track pack of 8 straights; M1 bundles a locomotive and the pack.
        seed_product(&pool, "P1", "Track pack A", 10, "24.00").await;
        seed_content(&pool, "P1", "R1", 8).await;
        seed_product(&pool, "M1", "Starter set", 3, "109.99").await;
        seed_content(&pool, "M1", "L1", 1).await;
        seed_content(&pool, "M1", "P1", 2).await;

        let catalog = CatalogStore::new(pool);
        let product = catalog.product_by_code(&code("M1")).await.unwrap();
        let set = catalog.resolve_boxed_set(&product).await.unwrap();

        assert_eq!(set.content_lines(), 2);
        assert_eq!(set.components.len(), 1);
        let (component, quantity) = &set.components[0];
        assert_eq!(component.product().code.as_str(), "L1");
        assert_eq!(*quantity, 1);

        assert_eq!(set.boxed_sets.len(), 1);
        let (nested, quantity) = &set.boxed_sets[0];
        assert_eq!(nested.product.code.as_str(), "P1");
        assert_eq!(*quantity, 2);
        assert_eq!(nested.components.len(), 1);
        assert_eq!(nested.components[0].1, 8);
    }

    #[tokio::test]
    async fn resolving_a_component_code_as_boxed_set_fails() {
        let pool = memory_pool().await;
        seed_locomotive(&pool, "L1", 5, "54.00").await;

        let catalog = CatalogStore::new(pool);
        let product = catalog.product_by_code(&code("L1")).await.unwrap();
        let err = catalog.resolve_boxed_set(&product).await.unwrap_err();
        assert_eq!(err, DomainError::NotBoxedSet("L1".to_string()));
    }

    #[tokio::test]
    async fn cyclic_boxed_set_graphs_are_detected() {
        let pool = memory_pool().await;
        seed_product(&pool, "M1", "Set one", 1, "10.00").await;
        seed_product(&pool, "M2", "Set two", 1, "10.00").await;
        seed_content(&pool, "M1", "M2", 1).await;
        seed_content(&pool, "M2", "M1", 1).await;

        let catalog = CatalogStore::new(pool);
        let product = catalog.product_by_code(&code("M1")).await.unwrap();
        let err = catalog.resolve_boxed_set(&product).await.unwrap_err();
        assert!(matches!(err, DomainError::CompositionCycle(_)));
    }

    #[tokio::test]
    async fn self_referential_boxed_set_is_detected() {
        let pool = memory_pool().await;
        seed_product(&pool, "M3", "Own contents", 1, "10.00").await;
        seed_content(&pool, "M3", "M3", 1).await;

        let catalog = CatalogStore::new(pool);
        let product = catalog.product_by_code(&code("M3")).await.unwrap();
        let err = catalog.resolve_boxed_set(&product).await.unwrap_err();
        assert_eq!(err, DomainError::CompositionCycle("M3".to_string()));
    }

    #[tokio::test]
    async fn shared_contents_across_branches_are_not_a_cycle() {
        let pool = memory_pool().await;
        seed_product(&pool, "R1", "Straight track", 50, "3.50").await;
        seed_component(&pool, "R1", "Peco", "any", "OO").await;
        seed_variant(&pool, "tracks", "curvature", "R1", "STRAIGHT").await;

        // Both packs contain the same track piece; the set contains both packs.
        seed_product(&pool, "P1", "Pack one", 5, "20.00").await;
        seed_product(&pool, "P2", "Pack two", 5, "22.00").await;
        seed_content(&pool, "P1", "R1", 4).await;
        seed_content(&pool, "P2", "R1", 6).await;
        seed_product(&pool, "M1", "Big set", 1, "60.00").await;
        seed_content(&pool, "M1", "P1", 1).await;
        seed_content(&pool, "M1", "P2", 1).await;

        let catalog = CatalogStore::new(pool);
        let product = catalog.product_by_code(&code("M1")).await.unwrap();
        let set = catalog.resolve_boxed_set(&product).await.unwrap();
        assert_eq!(set.boxed_sets.len(), 2);
    }

    #[tokio::test]
    async fn update_stock_reports_whether_a_row_changed() {
        let pool = memory_pool().await;
        seed_product(&pool, "L1", "Shunter", 2, "54.00").await;

        let catalog = CatalogStore::new(pool.clone());
        assert!(catalog.update_stock(&code("L1"), 9).await.unwrap());
        assert_eq!(stock_of(&pool, "L1").await, 9);

        assert!(!catalog.update_stock(&code("L404"), 9).await.unwrap());
    }

    // ----- orders -----

    #[tokio::test]
    async fn create_order_persists_header_and_lines_and_decrements_stock() {
        let pool = memory_pool().await;
        seed_product(&pool, "L1", "Shunter", 5, "54.00").await;
        seed_product(&pool, "R1", "Straight track", 30, "3.50").await;

        let catalog = CatalogStore::new(pool.clone());
        let orders = OrderStore::new(pool.clone());

        let mut order = Order::new(CustomerId::new(42), order_date());
        order.add_item(&catalog.product_by_code(&code("L1")).await.unwrap(), 2);
        order.add_item(&catalog.product_by_code(&code("R1")).await.unwrap(), 10);

        let id = orders.create_order(&mut order).await.unwrap();
        assert_eq!(order.id(), Some(id));

        let fetched = orders.order_by_id(id).await.unwrap();
        assert_eq!(fetched.customer_id, CustomerId::new(42));
        assert_eq!(fetched.status, OrderStatus::Pending);
        assert_eq!(fetched.lines().len(), 2);
        assert_eq!(fetched.lines()[0].quantity, 2);

        assert_eq!(stock_of(&pool, "L1").await, 3);
        assert_eq!(stock_of(&pool, "R1").await, 20);
    }

    #[tokio::test]
    async fn create_order_at_the_stock_boundary_succeeds() {
        let pool = memory_pool().await;
        seed_product(&pool, "L1", "Shunter", 2, "54.00").await;

        let catalog = CatalogStore::new(pool.clone());
        let orders = OrderStore::new(pool.clone());

        let mut order = Order::new(CustomerId::new(1), order_date());
        order.add_item(&catalog.product_by_code(&code("L1")).await.unwrap(), 2);

        orders.create_order(&mut order).await.unwrap();
        assert_eq!(stock_of(&pool, "L1").await, 0);
    }

    #[tokio::test]
    async fn insufficient_stock_aborts_the_whole_order() {
        let pool = memory_pool().await;
        seed_product(&pool, "L1", "Shunter", 5, "54.00").await;
        seed_product(&pool, "R1", "Straight track", 3, "3.50").await;

        let catalog = CatalogStore::new(pool.clone());
        let orders = OrderStore::new(pool.clone());

        let mut order = Order::new(CustomerId::new(1), order_date());
        order.add_item(&catalog.product_by_code(&code("L1")).await.unwrap(), 2);
        order.add_item(&catalog.product_by_code(&code("R1")).await.unwrap(), 4);

        let err = orders.create_order(&mut order).await.unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientStock {
                product_code: "R1".to_string(),
                requested: 4,
                available: 3,
            }
        );

        // Rollback: the earlier line's decrement is undone and nothing persisted.
        assert_eq!(order.id(), None);
        assert_eq!(stock_of(&pool, "L1").await, 5);
        assert_eq!(stock_of(&pool, "R1").await, 3);

        let headers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&pool)
            .await
            .unwrap();
        let lines: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM order_lines")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(headers, 0);
        assert_eq!(lines, 0);
    }

    #[tokio::test]
    async fn ordering_an_unknown_product_aborts_with_not_found() {
        let pool = memory_pool().await;
        seed_product(&pool, "L1", "Shunter", 5, "54.00").await;

        let catalog = CatalogStore::new(pool.clone());
        let orders = OrderStore::new(pool.clone());

        let mut order = Order::new(CustomerId::new(1), order_date());
        let mut ghost = catalog.product_by_code(&code("L1")).await.unwrap();
        ghost.code = code("L999");
        order.add_item(&ghost, 1);

        let err = orders.create_order(&mut order).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn empty_and_already_created_orders_are_rejected() {
        let pool = memory_pool().await;
        seed_product(&pool, "L1", "Shunter", 5, "54.00").await;

        let catalog = CatalogStore::new(pool.clone());
        let orders = OrderStore::new(pool.clone());

        let mut empty = Order::new(CustomerId::new(1), order_date());
        assert!(matches!(
            orders.create_order(&mut empty).await.unwrap_err(),
            DomainError::Validation(_)
        ));

        let mut order = Order::new(CustomerId::new(1), order_date());
        order.add_item(&catalog.product_by_code(&code("L1")).await.unwrap(), 1);
        orders.create_order(&mut order).await.unwrap();
        assert!(matches!(
            orders.create_order(&mut order).await.unwrap_err(),
            DomainError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn check_stock_passes_within_stock_including_the_boundary() {
        let pool = memory_pool().await;
        seed_product(&pool, "L1", "Shunter", 2, "54.00").await;

        let catalog = CatalogStore::new(pool.clone());
        let orders = OrderStore::new(pool);

        let mut order = Order::new(CustomerId::new(1), order_date());
        order.add_item(&catalog.product_by_code(&code("L1")).await.unwrap(), 2);

        orders.check_stock(&order).await.unwrap();
    }

    #[tokio::test]
    async fn check_stock_reports_the_first_shortfall() {
        let pool = memory_pool().await;
        seed_product(&pool, "L1", "Shunter", 2, "54.00").await;

        let catalog = CatalogStore::new(pool.clone());
        let orders = OrderStore::new(pool);

        let mut order = Order::new(CustomerId::new(1), order_date());
        order.add_item(&catalog.product_by_code(&code("L1")).await.unwrap(), 3);

        let err = orders.check_stock(&order).await.unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientStock {
                product_code: "L1".to_string(),
                requested: 3,
                available: 2,
            }
        );
    }

    #[tokio::test]
    async fn total_cost_sums_current_prices_and_is_zero_for_empty_orders() {
        let pool = memory_pool().await;
        seed_product(&pool, "L1", "Shunter", 10, "10.00").await;
        seed_product(&pool, "R1", "Straight track", 10, "5.00").await;

        let catalog = CatalogStore::new(pool.clone());
        let orders = OrderStore::new(pool.clone());

        let empty = Order::new(CustomerId::new(1), order_date());
        assert_eq!(orders.total_cost(&empty).await.unwrap(), dec!(0));

        let mut order = Order::new(CustomerId::new(1), order_date());
        order.add_item(&catalog.product_by_code(&code("L1")).await.unwrap(), 2);
        order.add_item(&catalog.product_by_code(&code("R1")).await.unwrap(), 1);
        assert_eq!(orders.total_cost(&order).await.unwrap(), dec!(25.00));
    }

    #[tokio::test]
    async fn total_cost_reflects_price_changes_after_items_were_added() {
        let pool = memory_pool().await;
        seed_product(&pool, "L1", "Shunter", 10, "10.00").await;

        let catalog = CatalogStore::new(pool.clone());
        let orders = OrderStore::new(pool.clone());

        let mut order = Order::new(CustomerId::new(1), order_date());
        order.add_item(&catalog.product_by_code(&code("L1")).await.unwrap(), 2);

        sqlx::query("UPDATE products SET price = '12.50' WHERE code = 'L1'")
            .execute(&pool)
            .await
            .unwrap();

        // The cached snapshot in the line is ignored; the live price wins.
        assert_eq!(orders.total_cost(&order).await.unwrap(), dec!(25.00));
    }

    #[tokio::test]
    async fn status_updates_follow_the_transition_table() {
        let pool = memory_pool().await;
        seed_product(&pool, "L1", "Shunter", 5, "54.00").await;

        let catalog = CatalogStore::new(pool.clone());
        let orders = OrderStore::new(pool.clone());

        let mut order = Order::new(CustomerId::new(1), order_date());
        order.add_item(&catalog.product_by_code(&code("L1")).await.unwrap(), 1);
        let id = orders.create_order(&mut order).await.unwrap();

        assert!(orders.update_status(id, OrderStatus::Confirmed).await.unwrap());
        assert!(orders.update_status(id, OrderStatus::Fulfilled).await.unwrap());

        // Backwards transitions are rejected and change nothing.
        let err = orders
            .update_status(id, OrderStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(
            orders.order_by_id(id).await.unwrap().status,
            OrderStatus::Fulfilled
        );
    }

    #[tokio::test]
    async fn skipping_a_status_is_rejected() {
        let pool = memory_pool().await;
        seed_product(&pool, "L1", "Shunter", 5, "54.00").await;

        let catalog = CatalogStore::new(pool.clone());
        let orders = OrderStore::new(pool.clone());

        let mut order = Order::new(CustomerId::new(1), order_date());
        order.add_item(&catalog.product_by_code(&code("L1")).await.unwrap(), 1);
        let id = orders.create_order(&mut order).await.unwrap();

        let err = orders
            .update_status(id, OrderStatus::Fulfilled)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(
            orders.order_by_id(id).await.unwrap().status,
            OrderStatus::Pending
        );
    }

    #[tokio::test]
    async fn updating_an_unknown_order_is_not_found() {
        let pool = memory_pool().await;
        let orders = OrderStore::new(pool);

        let err = orders
            .update_status(OrderId::new(999), OrderStatus::Confirmed)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn orders_with_status_filters_and_hydrates() {
        let pool = memory_pool().await;
        seed_product(&pool, "L1", "Shunter", 50, "54.00").await;

        let catalog = CatalogStore::new(pool.clone());
        let orders = OrderStore::new(pool.clone());
        let product = catalog.product_by_code(&code("L1")).await.unwrap();

        let mut pending = Order::new(CustomerId::new(1), order_date());
        pending.add_item(&product, 1);
        orders.create_order(&mut pending).await.unwrap();

        let mut confirmed = Order::new(CustomerId::new(2), order_date());
        confirmed.add_item(&product, 3);
        let confirmed_id = orders.create_order(&mut confirmed).await.unwrap();
        orders
            .update_status(confirmed_id, OrderStatus::Confirmed)
            .await
            .unwrap();

        let found = orders
            .orders_with_status(&[OrderStatus::Confirmed])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id(), Some(confirmed_id));
        assert_eq!(found[0].lines().len(), 1);
        assert_eq!(found[0].lines()[0].quantity, 3);

        let both = orders
            .orders_with_status(&[OrderStatus::Pending, OrderStatus::Confirmed])
            .await
            .unwrap();
        assert_eq!(both.len(), 2);

        assert!(orders.orders_with_status(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_orders_cannot_oversell_stock() {
        let pool = memory_pool().await;
        seed_product(&pool, "L1", "Shunter", 4, "54.00").await;

        let catalog = CatalogStore::new(pool.clone());
        let orders = OrderStore::new(pool.clone());
        let product = catalog.product_by_code(&code("L1")).await.unwrap();

        // Both orders want the full remaining stock.
        let mut first = Order::new(CustomerId::new(1), order_date());
        first.add_item(&product, 4);
        let mut second = Order::new(CustomerId::new(2), order_date());
        second.add_item(&product, 4);

        let (a, b) = tokio::join!(
            orders.create_order(&mut first),
            orders.create_order(&mut second)
        );

        let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(successes, 1, "exactly one order may win the stock");

        let failure = if a.is_err() { a } else { b };
        assert!(matches!(
            failure.unwrap_err(),
            DomainError::InsufficientStock { available: 0, .. }
        ));
        assert_eq!(stock_of(&pool, "L1").await, 0);
    }

    // ----- vault -----

    fn card_request() -> NewBankDetail {
        NewBankDetail {
            card_name: "Personal Visa".to_string(),
            card_holder_name: "A Customer".to_string(),
            card_number: "4012888888881881".to_string(),
            expiry_date: NaiveDate::from_ymd_opt(2099, 12, 31).unwrap(),
            security_code: "739".to_string(),
        }
    }

    #[tokio::test]
    async fn vault_round_trips_plaintext_with_the_same_key() {
        let pool = memory_pool().await;
        let vault = VaultStore::new(pool.clone());
        let key = random_key();

        let created = vault.create(card_request(), &key).await.unwrap();
        let id = created.id().expect("created entry has an id");
        assert_eq!(created.card_number(), "4012888888881881");

        let fetched = vault.fetch_by_id(id, &key).await.unwrap();
        assert_eq!(fetched.card_number(), "4012888888881881");
        assert_eq!(fetched.security_code(), "739");
        assert_eq!(fetched.card_name, "Personal Visa");
        assert_eq!(fetched.last_four(), "1881");
    }

    #[tokio::test]
    async fn only_ciphertext_is_persisted() {
        let pool = memory_pool().await;
        let vault = VaultStore::new(pool.clone());

        vault.create(card_request(), &random_key()).await.unwrap();

        let (stored_number, stored_code): (String, String) =
            sqlx::query_as("SELECT card_number, security_code FROM bank_details")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_ne!(stored_number, "4012888888881881");
        assert!(!stored_number.contains("4012888888881881"));
        assert_ne!(stored_code, "739");
    }

    #[tokio::test]
    async fn fetching_with_the_wrong_key_is_wrong_key_not_not_found() {
        let pool = memory_pool().await;
        let vault = VaultStore::new(pool.clone());

        let created = vault.create(card_request(), &random_key()).await.unwrap();
        let err = vault
            .fetch_by_id(created.id().unwrap(), &random_key())
            .await
            .unwrap_err();
        assert_eq!(err, DomainError::WrongKey);
    }

    #[tokio::test]
    async fn fetching_an_absent_entry_is_not_found() {
        let pool = memory_pool().await;
        let vault = VaultStore::new(pool);

        let err = vault
            .fetch_by_id(BankDetailId::new(12345), &random_key())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn create_revalidates_card_fields() {
        let pool = memory_pool().await;
        let vault = VaultStore::new(pool.clone());
        let key = random_key();

        let mut bad_number = card_request();
        bad_number.card_number = "4012888888881882".to_string();
        assert!(matches!(
            vault.create(bad_number, &key).await.unwrap_err(),
            DomainError::Validation(_)
        ));

        let mut expired = card_request();
        expired.expiry_date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        assert!(matches!(
            vault.create(expired, &key).await.unwrap_err(),
            DomainError::Validation(_)
        ));

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bank_details")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(rows, 0);
    }
}
