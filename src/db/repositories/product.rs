use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use std::collections::HashMap;
use tracing::info;

use crate::entities::{prelude::*, product_features, product_images, products};
use crate::models::product::{FeatureInput, NewProduct, ProductChanges, ProductStatus};

/// Fixed window for the listing endpoint; there is no pagination cursor.
const LISTING_LIMIT: u64 = 20;

/// Filters for the listing endpoint. All optional, applied conjunctively.
#[derive(Debug, Clone, Default)]
pub struct ProductListQuery {
    pub author_id: Option<i32>,
    pub status: Option<ProductStatus>,
    pub city_id: Option<i32>,
}

/// Filters for the search endpoint. Only active products are searched; the
/// price range applies when both bounds are present.
#[derive(Debug, Clone, Default)]
pub struct ProductSearchQuery {
    pub name: Option<String>,
    pub city_id: Option<i32>,
    pub category_ids: Option<Vec<i32>>,
    pub min_price: Option<i32>,
    pub max_price: Option<i32>,
}

/// Search results plus the price aggregates over the filtered set, used as
/// range-slider hints by clients.
#[derive(Debug)]
pub struct ProductSearchOutcome {
    pub products: Vec<products::Model>,
    pub min_price: Option<i32>,
    pub max_price: Option<i32>,
}

pub struct ProductRepository {
    conn: DatabaseConnection,
}

impl ProductRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Create a product with its features in a single transaction. New
    /// products always start on moderation.
    pub async fn create(
        &self,
        author_id: i32,
        new: NewProduct,
        features: Vec<FeatureInput>,
    ) -> Result<products::Model> {
        let now = chrono::Utc::now().to_rfc3339();

        let txn = self.conn.begin().await?;

        let active = products::ActiveModel {
            name: Set(new.name),
            description: Set(new.description),
            price: Set(new.price),
            price_suffix: Set(new.price_suffix.as_code().to_string()),
            is_lower_bound: Set(new.is_lower_bound),
            status: Set(ProductStatus::OnModerate.as_code().to_string()),
            author_id: Set(author_id),
            category_id: Set(new.category_id),
            city_id: Set(new.city_id),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let product = active
            .insert(&txn)
            .await
            .context("Failed to insert product")?;

        for feature in features {
            let active = product_features::ActiveModel {
                product_id: Set(product.id),
                name: Set(feature.name),
                value: Set(feature.value),
                ..Default::default()
            };
            active
                .insert(&txn)
                .await
                .context("Failed to insert product feature")?;
        }

        txn.commit().await?;

        info!("Created product {} ({})", product.id, product.name);
        Ok(product)
    }

    pub async fn get(&self, id: i32) -> Result<Option<products::Model>> {
        Products::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query product")
    }

    pub async fn get_by_ids(&self, ids: &[i32]) -> Result<Vec<products::Model>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        Products::find()
            .filter(products::Column::Id.is_in(ids.iter().copied()))
            .all(&self.conn)
            .await
            .context("Failed to query products by IDs")
    }

    /// Apply field changes and, when a feature list is supplied, replace the
    /// features wholesale. Both run in one transaction so a failure cannot
    /// leave a product with its old fields but no features.
    pub async fn update(
        &self,
        id: i32,
        changes: ProductChanges,
        features: Option<Vec<FeatureInput>>,
    ) -> Result<Option<products::Model>> {
        let txn = self.conn.begin().await?;

        let Some(product) = Products::find_by_id(id).one(&txn).await? else {
            return Ok(None);
        };

        let mut active: products::ActiveModel = product.into();
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(description) = changes.description {
            active.description = Set(description);
        }
        if let Some(price) = changes.price {
            active.price = Set(price);
        }
        if let Some(price_suffix) = changes.price_suffix {
            active.price_suffix = Set(price_suffix.as_code().to_string());
        }
        if let Some(is_lower_bound) = changes.is_lower_bound {
            active.is_lower_bound = Set(is_lower_bound);
        }
        if let Some(status) = changes.status {
            active.status = Set(status.as_code().to_string());
        }
        if let Some(category_id) = changes.category_id {
            active.category_id = Set(category_id);
        }
        if let Some(city_id) = changes.city_id {
            active.city_id = Set(Some(city_id));
        }
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let updated = active
            .update(&txn)
            .await
            .context("Failed to update product")?;

        if let Some(features) = features {
            ProductFeatures::delete_many()
                .filter(product_features::Column::ProductId.eq(id))
                .exec(&txn)
                .await?;

            for feature in features {
                let active = product_features::ActiveModel {
                    product_id: Set(id),
                    name: Set(feature.name),
                    value: Set(feature.value),
                    ..Default::default()
                };
                active
                    .insert(&txn)
                    .await
                    .context("Failed to insert product feature")?;
            }
        }

        txn.commit().await?;

        Ok(Some(updated))
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let txn = self.conn.begin().await?;

        ProductFeatures::delete_many()
            .filter(product_features::Column::ProductId.eq(id))
            .exec(&txn)
            .await?;

        ProductImages::delete_many()
            .filter(product_images::Column::ProductId.eq(id))
            .exec(&txn)
            .await?;

        ProductFavorites::delete_many()
            .filter(crate::entities::product_favorites::Column::ProductId.eq(id))
            .exec(&txn)
            .await?;

        let result = Products::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;

        let removed = result.rows_affected > 0;
        if removed {
            info!("Removed product {}", id);
        }
        Ok(removed)
    }

    /// Listing window: newest first, capped at 20 rows.
    pub async fn list(&self, query: ProductListQuery) -> Result<Vec<products::Model>> {
        let mut select = Products::find();

        if let Some(author_id) = query.author_id {
            select = select.filter(products::Column::AuthorId.eq(author_id));
        }
        if let Some(status) = query.status {
            select = select.filter(products::Column::Status.eq(status.as_code()));
        }
        if let Some(city_id) = query.city_id {
            select = select.filter(products::Column::CityId.eq(city_id));
        }

        select
            .order_by_desc(products::Column::CreatedAt)
            .limit(LISTING_LIMIT)
            .all(&self.conn)
            .await
            .context("Failed to list products")
    }

    /// Conjunctive search over active products, plus min/max price over the
    /// filtered set.
    pub async fn search(&self, query: ProductSearchQuery) -> Result<ProductSearchOutcome> {
        let mut select =
            Products::find().filter(products::Column::Status.eq(ProductStatus::Active.as_code()));

        if let Some(category_ids) = &query.category_ids {
            select = select.filter(products::Column::CategoryId.is_in(category_ids.iter().copied()));
        }
        if let Some(name) = &query.name {
            select = select.filter(products::Column::Name.contains(name.as_str()));
        }
        if let Some(city_id) = query.city_id {
            select = select.filter(products::Column::CityId.eq(city_id));
        }
        if let (Some(min), Some(max)) = (query.min_price, query.max_price) {
            select = select.filter(products::Column::Price.between(min, max));
        }

        let products = select
            .all(&self.conn)
            .await
            .context("Failed to search products")?;

        let min_price = products.iter().map(|p| p.price).min();
        let max_price = products.iter().map(|p| p.price).max();

        Ok(ProductSearchOutcome {
            products,
            min_price,
            max_price,
        })
    }

    pub async fn features_for(
        &self,
        product_ids: &[i32],
    ) -> Result<HashMap<i32, Vec<product_features::Model>>> {
        if product_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = ProductFeatures::find()
            .filter(product_features::Column::ProductId.is_in(product_ids.iter().copied()))
            .all(&self.conn)
            .await
            .context("Failed to query product features")?;

        let mut grouped: HashMap<i32, Vec<product_features::Model>> = HashMap::new();
        for row in rows {
            grouped.entry(row.product_id).or_default().push(row);
        }
        Ok(grouped)
    }

    pub async fn images_for(
        &self,
        product_ids: &[i32],
    ) -> Result<HashMap<i32, Vec<product_images::Model>>> {
        if product_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = ProductImages::find()
            .filter(product_images::Column::ProductId.is_in(product_ids.iter().copied()))
            .all(&self.conn)
            .await
            .context("Failed to query product images")?;

        let mut grouped: HashMap<i32, Vec<product_images::Model>> = HashMap::new();
        for row in rows {
            grouped.entry(row.product_id).or_default().push(row);
        }
        Ok(grouped)
    }
}
