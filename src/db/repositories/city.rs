use anyhow::{Context, Result};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use std::collections::HashMap;

use crate::entities::{cities, prelude::*};

pub struct CityRepository {
    conn: DatabaseConnection,
}

impl CityRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(&self) -> Result<Vec<cities::Model>> {
        Cities::find()
            .all(&self.conn)
            .await
            .context("Failed to list cities")
    }

    pub async fn get(&self, id: i32) -> Result<Option<cities::Model>> {
        Cities::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query city")
    }

    pub async fn get_by_ids(&self, ids: &[i32]) -> Result<HashMap<i32, cities::Model>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = Cities::find()
            .filter(cities::Column::Id.is_in(ids.iter().copied()))
            .all(&self.conn)
            .await
            .context("Failed to query cities by IDs")?;

        Ok(rows.into_iter().map(|c| (c.id, c)).collect())
    }

    pub async fn create(&self, name: &str) -> Result<cities::Model> {
        let active = cities::ActiveModel {
            name: Set(name.to_string()),
            ..Default::default()
        };

        active.insert(&self.conn).await.context("Failed to insert city")
    }
}
