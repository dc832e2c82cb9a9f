use axum::{Json, extract::State};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, CityDto};

/// GET /city
pub async fn city_list(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<CityDto>>>, ApiError> {
    let cities = state.store().list_cities().await?;

    let dtos = cities
        .into_iter()
        .map(|c| CityDto {
            id: c.id,
            name: c.name,
        })
        .collect();

    Ok(Json(ApiResponse::success(dtos)))
}
