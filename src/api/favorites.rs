use axum::{
    Json,
    extract::{Path, State},
};
use std::sync::Arc;

use super::auth::AuthUser;
use super::validation::validate_id;
use super::{ApiError, ApiResponse, AppState};

/// POST /product/{id}/favorite/
/// Toggle by presence: removes an existing favorite and reports `false`,
/// otherwise creates one and reports `true`.
pub async fn toggle_favorite(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(product_id): Path<i32>,
) -> Result<Json<ApiResponse<bool>>, ApiError> {
    validate_id("product", product_id)?;

    if state.store().get_product(product_id).await?.is_none() {
        return Err(ApiError::product_not_found(product_id));
    }

    let favorited = state.store().toggle_favorite(user.id, product_id).await?;

    Ok(Json(ApiResponse::success(favorited)))
}
