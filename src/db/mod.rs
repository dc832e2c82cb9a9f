use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::entities::{categories, category_images, cities, product_features, product_images, products};
use crate::models::product::{FeatureInput, NewProduct, ProductChanges};

pub mod migrator;
pub mod repositories;

pub use repositories::product::{ProductListQuery, ProductSearchOutcome, ProductSearchQuery};
pub use repositories::user::{NewUser, User};

use crate::config::SecurityConfig;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn city_repo(&self) -> repositories::city::CityRepository {
        repositories::city::CityRepository::new(self.conn.clone())
    }

    fn category_repo(&self) -> repositories::category::CategoryRepository {
        repositories::category::CategoryRepository::new(self.conn.clone())
    }

    fn product_repo(&self) -> repositories::product::ProductRepository {
        repositories::product::ProductRepository::new(self.conn.clone())
    }

    fn favorite_repo(&self) -> repositories::favorite::FavoriteRepository {
        repositories::favorite::FavoriteRepository::new(self.conn.clone())
    }

    fn product_image_repo(&self) -> repositories::image::ProductImageRepository {
        repositories::image::ProductImageRepository::new(self.conn.clone())
    }

    // Users

    pub async fn create_user(&self, new: NewUser, security: &SecurityConfig) -> Result<User> {
        self.user_repo().create(new, security).await
    }

    pub async fn get_user(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn get_users_by_ids(&self, ids: &[i32]) -> Result<HashMap<i32, User>> {
        self.user_repo().get_by_ids(ids).await
    }

    pub async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>> {
        self.user_repo().verify_credentials(username, password).await
    }

    // Cities

    pub async fn list_cities(&self) -> Result<Vec<cities::Model>> {
        self.city_repo().list().await
    }

    pub async fn get_city(&self, id: i32) -> Result<Option<cities::Model>> {
        self.city_repo().get(id).await
    }

    pub async fn get_cities_by_ids(&self, ids: &[i32]) -> Result<HashMap<i32, cities::Model>> {
        self.city_repo().get_by_ids(ids).await
    }

    pub async fn create_city(&self, name: &str) -> Result<cities::Model> {
        self.city_repo().create(name).await
    }

    // Categories

    pub async fn list_categories(&self) -> Result<Vec<categories::Model>> {
        self.category_repo().list_all().await
    }

    pub async fn list_root_categories(&self) -> Result<Vec<categories::Model>> {
        self.category_repo().list_roots().await
    }

    pub async fn get_category(&self, id: i32) -> Result<Option<categories::Model>> {
        self.category_repo().get(id).await
    }

    pub async fn category_subtree_ids(&self, root: i32) -> Result<Option<Vec<i32>>> {
        self.category_repo().subtree_ids(root).await
    }

    pub async fn create_category(
        &self,
        name: &str,
        parent_id: Option<i32>,
        image: &str,
    ) -> Result<categories::Model> {
        self.category_repo().create(name, parent_id, image).await
    }

    pub async fn set_category_parent(&self, id: i32, parent_id: Option<i32>) -> Result<()> {
        self.category_repo().set_parent(id, parent_id).await
    }

    pub async fn category_images_for(
        &self,
        category_ids: &[i32],
    ) -> Result<HashMap<i32, Vec<category_images::Model>>> {
        self.category_repo().images_for(category_ids).await
    }

    pub async fn add_category_image(
        &self,
        category_id: i32,
        image: &str,
        description: &str,
    ) -> Result<category_images::Model> {
        self.category_repo()
            .add_image(category_id, image, description)
            .await
    }

    // Products

    pub async fn create_product(
        &self,
        author_id: i32,
        new: NewProduct,
        features: Vec<FeatureInput>,
    ) -> Result<products::Model> {
        self.product_repo().create(author_id, new, features).await
    }

    pub async fn get_product(&self, id: i32) -> Result<Option<products::Model>> {
        self.product_repo().get(id).await
    }

    pub async fn get_products_by_ids(&self, ids: &[i32]) -> Result<Vec<products::Model>> {
        self.product_repo().get_by_ids(ids).await
    }

    pub async fn update_product(
        &self,
        id: i32,
        changes: ProductChanges,
        features: Option<Vec<FeatureInput>>,
    ) -> Result<Option<products::Model>> {
        self.product_repo().update(id, changes, features).await
    }

    pub async fn delete_product(&self, id: i32) -> Result<bool> {
        self.product_repo().delete(id).await
    }

    pub async fn list_products(&self, query: ProductListQuery) -> Result<Vec<products::Model>> {
        self.product_repo().list(query).await
    }

    pub async fn search_products(&self, query: ProductSearchQuery) -> Result<ProductSearchOutcome> {
        self.product_repo().search(query).await
    }

    pub async fn product_features_for(
        &self,
        product_ids: &[i32],
    ) -> Result<HashMap<i32, Vec<product_features::Model>>> {
        self.product_repo().features_for(product_ids).await
    }

    pub async fn product_images_for(
        &self,
        product_ids: &[i32],
    ) -> Result<HashMap<i32, Vec<product_images::Model>>> {
        self.product_repo().images_for(product_ids).await
    }

    // Favorites

    pub async fn toggle_favorite(&self, user_id: i32, product_id: i32) -> Result<bool> {
        self.favorite_repo().toggle(user_id, product_id).await
    }

    pub async fn favorited_among(
        &self,
        user_id: i32,
        product_ids: &[i32],
    ) -> Result<HashSet<i32>> {
        self.favorite_repo()
            .favorited_among(user_id, product_ids)
            .await
    }

    pub async fn favorite_product_ids(&self, user_id: i32) -> Result<Vec<i32>> {
        self.favorite_repo().product_ids_for_user(user_id).await
    }

    // Product images

    pub async fn add_product_image(
        &self,
        product_id: i32,
        image: &str,
        description: &str,
    ) -> Result<product_images::Model> {
        self.product_image_repo()
            .add(product_id, image, description)
            .await
    }

    pub async fn find_product_image(
        &self,
        image_id: i32,
        product_id: i32,
    ) -> Result<Option<product_images::Model>> {
        self.product_image_repo().find(image_id, product_id).await
    }

    pub async fn delete_product_image(&self, image_id: i32) -> Result<bool> {
        self.product_image_repo().delete(image_id).await
    }
}
