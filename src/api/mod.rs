use axum::{
    Router,
    http::HeaderValue,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::services::{ImageService, TokenService};
use crate::state::SharedState;

pub mod auth;
mod categories;
mod cities;
mod error;
mod favorites;
mod images;
mod policy;
mod products;
mod types;
mod validation;

pub use error::ApiError;
pub use types::*;

use tokio::sync::RwLock;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub image_service: Arc<ImageService>,

    pub token_service: Arc<TokenService>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Arc<RwLock<Config>> {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.token_service
    }

    #[must_use]
    pub fn images(&self) -> &ImageService {
        &self.image_service
    }
}

pub async fn create_app_state(shared: Arc<SharedState>) -> Arc<AppState> {
    let config = shared.config.read().await.clone();

    let image_service = Arc::new(ImageService::new(&config.media));
    let token_service = Arc::new(TokenService::from_config(&config.auth));

    Arc::new(AppState {
        shared,
        image_service,
        token_service,
    })
}

pub async fn create_app_state_from_config(config: Config) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared).await)
}

pub async fn router(state: Arc<AppState>) -> Router {
    let (media_root, cors_origins) = {
        let config = state.config().read().await;
        (
            config.media.media_root.clone(),
            config.server.cors_allowed_origins.clone(),
        )
    };

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .route("/category/tree", get(categories::category_tree))
        .route("/category", get(categories::category_list))
        .route("/city", get(cities::city_list))
        .route(
            "/product",
            get(products::list_products).post(products::create_product),
        )
        .route("/search/", get(products::search_products))
        .route(
            "/product/{id}/",
            get(products::get_product)
                .put(products::put_product)
                .patch(products::patch_product)
                .delete(products::delete_product),
        )
        .route("/product/{id}/image", post(images::upload_product_images))
        .route(
            "/products/{product_id}/images/{image_id}/",
            delete(images::delete_product_image),
        )
        .route("/product/{id}/favorite/", post(favorites::toggle_favorite))
        .route("/api/token/", post(auth::obtain_token))
        .route("/api/token/refresh/", post(auth::refresh_token))
        .route("/api/auth/register/", post(auth::register))
        .route("/api/user/", get(auth::current_user))
        .nest_service(
            "/media",
            tower_http::services::ServeDir::new(media_root),
        )
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
