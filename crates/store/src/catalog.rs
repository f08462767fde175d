//! Catalog store: product lookup, component resolution, boxed-set
//! expansion and stock updates.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;

use sqlx::{Row, SqlitePool};
use tracing::instrument;

use railshop_catalog::{
    BoxedSet, Component, ComponentInfo, ControlType, Curvature, Gauge, PriceBracket, Product,
};
use railshop_core::{DomainError, DomainResult, ProductCode, ProductKind};

use crate::db::{map_sqlx_error, narrow_count, parse_decimal};

/// Read/write access to the product catalog.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    pool: SqlitePool,
}

impl CatalogStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Fetch the product row for `code`.
    #[instrument(skip(self), fields(product_code = %code), err)]
    pub async fn product_by_code(&self, code: &ProductCode) -> DomainResult<Product> {
        let row = sqlx::query("SELECT code, name, stock_level, price FROM products WHERE code = ?")
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("product_by_code", e))?;

        match row {
            Some(row) => product_from_row(&row),
            None => Err(DomainError::not_found(format!("product [{code}]"))),
        }
    }

    /// All products, ordered by code (staff stock views iterate this).
    #[instrument(skip(self), err)]
    pub async fn list_products(&self) -> DomainResult<Vec<Product>> {
        let rows = sqlx::query("SELECT code, name, stock_level, price FROM products ORDER BY code")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_products", e))?;

        rows.iter().map(product_from_row).collect()
    }

    /// Resolve a product into its component variant.
    ///
    /// The product's code tag selects the variant table to join against. A
    /// product that exists without its component/variant row is corrupt
    /// data and reported as `MissingVariantRow`.
    #[instrument(skip(self, product), fields(product_code = %product.code), err)]
    pub async fn resolve_component(&self, product: &Product) -> DomainResult<Component> {
        let kind = match product.kind() {
            Some(kind) if kind.is_component() => kind,
            _ => return Err(DomainError::NotComponent(product.code.to_string())),
        };

        match kind {
            ProductKind::Locomotive => {
                let row = self
                    .component_variant_row(
                        "SELECT brand, era, gauge, price_bracket
                         FROM components
                                  LEFT OUTER JOIN locomotives ON components.code = locomotives.code
                         WHERE components.code = ?",
                        product,
                        "resolve_locomotive",
                    )
                    .await?;
                let info = component_info_from_row(&row, product)?;
                let price_bracket: PriceBracket =
                    variant_column(&row, "price_bracket", product)?.parse()?;
                Ok(Component::Locomotive {
                    info,
                    price_bracket,
                })
            }
            ProductKind::Controller => {
                let row = self
                    .component_variant_row(
                        "SELECT brand, era, gauge, control_type
                         FROM components
                                  LEFT OUTER JOIN controllers ON components.code = controllers.code
                         WHERE components.code = ?",
                        product,
                        "resolve_controller",
                    )
                    .await?;
                let info = component_info_from_row(&row, product)?;
                let control_type: ControlType =
                    variant_column(&row, "control_type", product)?.parse()?;
                Ok(Component::Controller { info, control_type })
            }
            ProductKind::Track => {
                let row = self
                    .component_variant_row(
                        "SELECT brand, era, gauge, curvature
                         FROM components
                                  LEFT OUTER JOIN tracks ON components.code = tracks.code
                         WHERE components.code = ?",
                        product,
                        "resolve_track",
                    )
                    .await?;
                let info = component_info_from_row(&row, product)?;
                let curvature: Curvature = variant_column(&row, "curvature", product)?.parse()?;
                Ok(Component::Track { info, curvature })
            }
            ProductKind::Accessory => {
                let row = self
                    .component_variant_row(
                        "SELECT brand, era, gauge FROM components WHERE code = ?",
                        product,
                        "resolve_accessory",
                    )
                    .await?;
                let info = component_info_from_row(&row, product)?;
                Ok(Component::Accessory { info })
            }
            ProductKind::TrainSet | ProductKind::TrackPack => {
                Err(DomainError::NotComponent(product.code.to_string()))
            }
        }
    }

    /// Resolve a product into its fully expanded boxed set.
    ///
    /// Expansion recursively resolves every content row into a component or
    /// a nested boxed set. A visited set over the current expansion path
    /// guards against cyclic content graphs; a repeated code fails with
    /// `CompositionCycle` instead of recursing forever.
    #[instrument(skip(self, product), fields(product_code = %product.code), err)]
    pub async fn resolve_boxed_set(&self, product: &Product) -> DomainResult<BoxedSet> {
        if !product.is_boxed_set() {
            return Err(DomainError::NotBoxedSet(product.code.to_string()));
        }

        let mut visiting = HashSet::new();
        self.expand_boxed_set(product.clone(), &mut visiting).await
    }

    /// Set the absolute stock level of a product.
    ///
    /// Returns whether a row was affected; an unknown code is `Ok(false)`,
    /// not an error.
    #[instrument(skip(self), fields(product_code = %code, new_level), err)]
    pub async fn update_stock(&self, code: &ProductCode, new_level: u32) -> DomainResult<bool> {
        let result = sqlx::query("UPDATE products SET stock_level = ? WHERE code = ?")
            .bind(i64::from(new_level))
            .bind(code.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_stock", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn component_variant_row(
        &self,
        sql: &str,
        product: &Product,
        operation: &str,
    ) -> DomainResult<sqlx::sqlite::SqliteRow> {
        let row = sqlx::query(sql)
            .bind(product.code.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;

        row.ok_or_else(|| DomainError::MissingVariantRow(product.code.to_string()))
    }

    fn expand_boxed_set<'a>(
        &'a self,
        product: Product,
        visiting: &'a mut HashSet<String>,
    ) -> Pin<Box<dyn Future<Output = DomainResult<BoxedSet>> + Send + 'a>> {
        Box::pin(async move {
            if !visiting.insert(product.code.as_str().to_string()) {
                return Err(DomainError::CompositionCycle(product.code.to_string()));
            }

            let rows = sqlx::query(
                "SELECT content_code, quantity FROM boxed_set_contents WHERE box_set_code = ?",
            )
            .bind(product.code.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("boxed_set_contents", e))?;

            let mut components = Vec::new();
            let mut boxed_sets = Vec::new();

            for row in rows {
                let content_code: String = row
                    .try_get("content_code")
                    .map_err(|e| map_sqlx_error("boxed_set_contents", e))?;
                let quantity: i64 = row
                    .try_get("quantity")
                    .map_err(|e| map_sqlx_error("boxed_set_contents", e))?;
                let quantity = narrow_count(quantity, "boxed-set quantity")?;

                let content = self
                    .product_by_code(&ProductCode::new(content_code)?)
                    .await?;
                if content.is_component() {
                    components.push((self.resolve_component(&content).await?, quantity));
                } else if content.is_boxed_set() {
                    boxed_sets.push((self.expand_boxed_set(content, visiting).await?, quantity));
                } else {
                    // Content that is neither family is corrupt catalog data.
                    return Err(DomainError::NotBoxedSet(content.code.to_string()));
                }
            }

            visiting.remove(product.code.as_str());
            Ok(BoxedSet {
                product,
                components,
                boxed_sets,
            })
        })
    }
}

fn product_from_row(row: &sqlx::sqlite::SqliteRow) -> DomainResult<Product> {
    let code: String = row
        .try_get("code")
        .map_err(|e| map_sqlx_error("product_row", e))?;
    let name: String = row
        .try_get("name")
        .map_err(|e| map_sqlx_error("product_row", e))?;
    let stock_level: i64 = row
        .try_get("stock_level")
        .map_err(|e| map_sqlx_error("product_row", e))?;
    let price: String = row
        .try_get("price")
        .map_err(|e| map_sqlx_error("product_row", e))?;

    let price = parse_decimal(&price, "price")?;
    if price.is_sign_negative() {
        return Err(DomainError::store(format!(
            "stored price for [{code}] is negative"
        )));
    }

    Ok(Product {
        code: ProductCode::new(code)?,
        name,
        stock_level: narrow_count(stock_level, "stock level")?,
        price,
    })
}

fn component_info_from_row(
    row: &sqlx::sqlite::SqliteRow,
    product: &Product,
) -> DomainResult<ComponentInfo> {
    let brand: String = row
        .try_get("brand")
        .map_err(|e| map_sqlx_error("component_row", e))?;
    let era: String = row
        .try_get("era")
        .map_err(|e| map_sqlx_error("component_row", e))?;
    let gauge: String = row
        .try_get("gauge")
        .map_err(|e| map_sqlx_error("component_row", e))?;

    Ok(ComponentInfo {
        product: product.clone(),
        brand,
        era,
        gauge: gauge.parse::<Gauge>()?,
    })
}

/// Read a variant-specific column from the joined lookup. The join is a
/// left outer join, so a product whose variant table lacks its row comes
/// back NULL here: the `MissingVariantRow` integrity case.
fn variant_column(
    row: &sqlx::sqlite::SqliteRow,
    column: &str,
    product: &Product,
) -> DomainResult<String> {
    let value: Option<String> = row
        .try_get(column)
        .map_err(|e| map_sqlx_error("component_row", e))?;

    value.ok_or_else(|| DomainError::MissingVariantRow(product.code.to_string()))
}
