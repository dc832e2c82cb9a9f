use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use std::collections::HashSet;

use crate::entities::{prelude::*, product_favorites};

pub struct FavoriteRepository {
    conn: DatabaseConnection,
}

impl FavoriteRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Flip membership for the (user, product) pair. Returns `true` when the
    /// pair is now favorited, `false` when the existing record was removed.
    /// The existence check and the write share one transaction.
    pub async fn toggle(&self, user_id: i32, product_id: i32) -> Result<bool> {
        let txn = self.conn.begin().await?;

        let existing = ProductFavorites::find()
            .filter(product_favorites::Column::UserId.eq(user_id))
            .filter(product_favorites::Column::ProductId.eq(product_id))
            .one(&txn)
            .await
            .context("Failed to query favorite")?;

        let favorited = match existing {
            Some(record) => {
                ProductFavorites::delete_by_id(record.id).exec(&txn).await?;
                false
            }
            None => {
                let active = product_favorites::ActiveModel {
                    user_id: Set(user_id),
                    product_id: Set(product_id),
                    ..Default::default()
                };
                active
                    .insert(&txn)
                    .await
                    .context("Failed to insert favorite")?;
                true
            }
        };

        txn.commit().await?;

        Ok(favorited)
    }

    /// Which of the given products the user has favorited.
    pub async fn favorited_among(
        &self,
        user_id: i32,
        product_ids: &[i32],
    ) -> Result<HashSet<i32>> {
        if product_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let rows = ProductFavorites::find()
            .filter(product_favorites::Column::UserId.eq(user_id))
            .filter(product_favorites::Column::ProductId.is_in(product_ids.iter().copied()))
            .all(&self.conn)
            .await
            .context("Failed to query favorites")?;

        Ok(rows.into_iter().map(|f| f.product_id).collect())
    }

    /// All product ids the user has favorited, oldest first.
    pub async fn product_ids_for_user(&self, user_id: i32) -> Result<Vec<i32>> {
        let rows = ProductFavorites::find()
            .filter(product_favorites::Column::UserId.eq(user_id))
            .order_by_asc(product_favorites::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to query user favorites")?;

        Ok(rows.into_iter().map(|f| f.product_id).collect())
    }
}
