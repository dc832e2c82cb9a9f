use anyhow::{Context, Result};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::entities::{prelude::*, product_images};

pub struct ProductImageRepository {
    conn: DatabaseConnection,
}

impl ProductImageRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn add(
        &self,
        product_id: i32,
        image: &str,
        description: &str,
    ) -> Result<product_images::Model> {
        let active = product_images::ActiveModel {
            product_id: Set(product_id),
            image: Set(image.to_string()),
            description: Set(description.to_string()),
            ..Default::default()
        };

        active
            .insert(&self.conn)
            .await
            .context("Failed to insert product image")
    }

    /// Compound-key lookup: the image must belong to the given product.
    pub async fn find(
        &self,
        image_id: i32,
        product_id: i32,
    ) -> Result<Option<product_images::Model>> {
        ProductImages::find()
            .filter(product_images::Column::Id.eq(image_id))
            .filter(product_images::Column::ProductId.eq(product_id))
            .one(&self.conn)
            .await
            .context("Failed to query product image")
    }

    pub async fn delete(&self, image_id: i32) -> Result<bool> {
        let result = ProductImages::delete_by_id(image_id)
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected > 0)
    }
}
