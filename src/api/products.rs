use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::{AuthUser, MaybeUser};
use super::policy::OwnerPolicy;
use super::validation::{validate_id, validate_price, validate_price_range};
use super::{ApiError, ApiResponse, AppState, AuthorDto, FeatureDto, ImageDto, ProductDto};
use crate::db::{ProductListQuery, ProductSearchQuery};
use crate::entities::products;
use crate::models::product::{
    FeatureInput, NewProduct, PriceSuffix, ProductChanges, ProductStatus,
};

// ============================================================================
// Request types
// ============================================================================

#[derive(Deserialize)]
pub struct FeatureRequest {
    pub name: String,
    pub value: String,
}

impl From<FeatureRequest> for FeatureInput {
    fn from(req: FeatureRequest) -> Self {
        Self {
            name: req.name,
            value: req.value,
        }
    }
}

#[derive(Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: String,
    pub price: i32,
    #[serde(default)]
    pub price_suffix: Option<String>,
    #[serde(default)]
    pub is_lower_bound: bool,
    pub category: i32,
    pub city: Option<i32>,
    #[serde(default)]
    pub features: Vec<FeatureRequest>,
}

/// Shared by PUT (full) and PATCH (partial); the full update simply requires
/// the core fields to be present.
#[derive(Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i32>,
    pub price_suffix: Option<String>,
    pub is_lower_bound: Option<bool>,
    pub status: Option<String>,
    pub category: Option<i32>,
    pub city_id: Option<i32>,
    pub features: Option<Vec<FeatureRequest>>,
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub own: Option<String>,
    pub city: Option<i32>,
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub name: Option<String>,
    pub city: Option<i32>,
    pub category: Option<i32>,
    #[serde(rename = "minRange")]
    pub min_range: Option<i32>,
    #[serde(rename = "maxRange")]
    pub max_range: Option<i32>,
}

fn is_truthy(value: Option<&str>) -> bool {
    matches!(
        value.map(str::to_ascii_lowercase).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

fn parse_status(input: &str) -> Result<ProductStatus, ApiError> {
    ProductStatus::parse(input)
        .ok_or_else(|| ApiError::validation(format!("Unknown status: {input}")))
}

fn parse_price_suffix(input: &str) -> Result<PriceSuffix, ApiError> {
    PriceSuffix::parse(input)
        .ok_or_else(|| ApiError::validation(format!("Unknown price suffix: {input}")))
}

// ============================================================================
// Rendering
// ============================================================================

/// Render products with their nested data in a fixed number of batch
/// queries, never per-row lookups. `price_range` carries the aggregate
/// min/max of the surrounding result set; without one, each product falls
/// back to its own price.
pub async fn render_products(
    state: &AppState,
    products: Vec<products::Model>,
    viewer_id: Option<i32>,
    price_range: Option<(i32, i32)>,
) -> Result<Vec<ProductDto>, ApiError> {
    let product_ids: Vec<i32> = products.iter().map(|p| p.id).collect();
    let author_ids: Vec<i32> = products.iter().map(|p| p.author_id).collect();
    let city_ids: Vec<i32> = products.iter().filter_map(|p| p.city_id).collect();

    let features = state.store().product_features_for(&product_ids).await?;
    let images = state.store().product_images_for(&product_ids).await?;
    let authors = state.store().get_users_by_ids(&author_ids).await?;
    let cities = state.store().get_cities_by_ids(&city_ids).await?;

    let favorited = match viewer_id {
        Some(user_id) => state.store().favorited_among(user_id, &product_ids).await?,
        None => std::collections::HashSet::new(),
    };

    let mut dtos = Vec::with_capacity(products.len());
    for product in products {
        let author = authors
            .get(&product.author_id)
            .ok_or_else(|| ApiError::internal(format!("Author {} missing", product.author_id)))?;

        let city = product.city_id.and_then(|id| cities.get(&id));

        let (min_price, max_price) =
            price_range.unwrap_or((product.price, product.price));

        let price_suffix = PriceSuffix::parse(&product.price_suffix)
            .unwrap_or(PriceSuffix::None)
            .display()
            .to_string();

        dtos.push(ProductDto {
            id: product.id,
            images: images
                .get(&product.id)
                .map(|rows| rows.iter().map(|i| ImageDto::new(i.id, &i.image)).collect())
                .unwrap_or_default(),
            name: product.name,
            description: product.description,
            price: product.price,
            price_suffix,
            is_lower_bound: product.is_lower_bound,
            category: product.category_id,
            city_id: product.city_id,
            city_name: city.map(|c| c.name.clone()),
            min_price,
            max_price,
            features: features
                .get(&product.id)
                .map(|rows| {
                    rows.iter()
                        .map(|f| FeatureDto {
                            name: f.name.clone(),
                            value: f.value.clone(),
                        })
                        .collect()
                })
                .unwrap_or_default(),
            is_favorite: favorited.contains(&product.id),
            author: AuthorDto {
                id: author.id,
                username: author.username.clone(),
                email: author.email.clone(),
                phone: author.phone.clone(),
            },
        });
    }

    Ok(dtos)
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /product
/// Own mode (authenticated + `own`): the caller's products, any status
/// unless one is given. Public mode: active products by default, optional
/// city filter. Newest first, capped at 20.
pub async fn list_products(
    State(state): State<Arc<AppState>>,
    MaybeUser(viewer): MaybeUser,
    Query(params): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<ProductDto>>>, ApiError> {
    let status = params
        .status
        .as_deref()
        .map(parse_status)
        .transpose()?;

    let own_mode = viewer.is_some() && is_truthy(params.own.as_deref());

    let query = if own_mode {
        ProductListQuery {
            author_id: viewer.as_ref().map(|u| u.id),
            status,
            city_id: None,
        }
    } else {
        ProductListQuery {
            author_id: None,
            status: Some(status.unwrap_or(ProductStatus::Active)),
            city_id: params.city,
        }
    };

    let products = state.store().list_products(query).await?;
    let dtos = render_products(&state, products, viewer.map(|u| u.id), None).await?;

    Ok(Json(ApiResponse::success(dtos)))
}

/// POST /product
/// The authenticated caller becomes the author; new products start on
/// moderation regardless of input.
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(payload): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ProductDto>>), ApiError> {
    if payload.name.is_empty() {
        return Err(ApiError::validation("Product name is required"));
    }
    validate_price(payload.price)?;
    validate_id("category", payload.category)?;

    let category = state.store().get_category(payload.category).await?;
    if category.is_none() {
        return Err(ApiError::category_not_found(payload.category));
    }

    if let Some(city_id) = payload.city {
        validate_id("city", city_id)?;
        if state.store().get_city(city_id).await?.is_none() {
            return Err(ApiError::not_found("City", city_id));
        }
    }

    let price_suffix = match payload.price_suffix.as_deref() {
        Some(code) => parse_price_suffix(code)?,
        None => PriceSuffix::None,
    };

    let product = state
        .store()
        .create_product(
            user.id,
            NewProduct {
                name: payload.name,
                description: payload.description,
                price: payload.price,
                price_suffix,
                is_lower_bound: payload.is_lower_bound,
                category_id: payload.category,
                city_id: payload.city,
            },
            payload.features.into_iter().map(Into::into).collect(),
        )
        .await?;

    let mut dtos = render_products(&state, vec![product], Some(user.id), None).await?;
    let dto = dtos
        .pop()
        .ok_or_else(|| ApiError::internal("Created product failed to render"))?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(dto))))
}

/// GET /search/
/// Conjunctive filters over active products; category matches the whole
/// subtree. Responds with the shared min/max aggregate as slider hints.
pub async fn search_products(
    State(state): State<Arc<AppState>>,
    MaybeUser(viewer): MaybeUser,
    Query(params): Query<SearchParams>,
) -> Result<Json<ApiResponse<Vec<ProductDto>>>, ApiError> {
    validate_price_range(params.min_range, params.max_range)?;

    let category_ids = match params.category {
        Some(root) => {
            validate_id("category", root)?;
            // An unknown category simply matches nothing.
            Some(
                state
                    .store()
                    .category_subtree_ids(root)
                    .await?
                    .unwrap_or_else(|| vec![root]),
            )
        }
        None => None,
    };

    let outcome = state
        .store()
        .search_products(ProductSearchQuery {
            name: params.name.filter(|n| !n.is_empty()),
            city_id: params.city,
            category_ids,
            min_price: params.min_range,
            max_price: params.max_range,
        })
        .await?;

    let price_range = outcome.min_price.zip(outcome.max_price);
    let dtos = render_products(
        &state,
        outcome.products,
        viewer.map(|u| u.id),
        price_range,
    )
    .await?;

    Ok(Json(ApiResponse::success(dtos)))
}

/// GET /product/{id}/
/// Anonymous callers read any product; authenticated callers only their own.
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<ProductDto>>, ApiError> {
    validate_id("product", id)?;

    let product = state
        .store()
        .get_product(id)
        .await?
        .ok_or_else(|| ApiError::product_not_found(id))?;

    OwnerPolicy::require_read(product.author_id, viewer.as_ref())?;

    let viewer_id = viewer.map(|u| u.id);
    let mut dtos = render_products(&state, vec![product], viewer_id, None).await?;
    let dto = dtos
        .pop()
        .ok_or_else(|| ApiError::internal("Product failed to render"))?;

    Ok(Json(ApiResponse::success(dto)))
}

/// PUT /product/{id}/
pub async fn put_product(
    State(state): State<Arc<AppState>>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<Json<ApiResponse<ProductDto>>, ApiError> {
    if payload.name.is_none() || payload.description.is_none() || payload.price.is_none() {
        return Err(ApiError::validation(
            "name, description and price are required for a full update",
        ));
    }

    update_product(state, viewer, id, payload).await
}

/// PATCH /product/{id}/
pub async fn patch_product(
    State(state): State<Arc<AppState>>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<Json<ApiResponse<ProductDto>>, ApiError> {
    update_product(state, viewer, id, payload).await
}

async fn update_product(
    state: Arc<AppState>,
    viewer: Option<crate::db::User>,
    id: i32,
    payload: UpdateProductRequest,
) -> Result<Json<ApiResponse<ProductDto>>, ApiError> {
    validate_id("product", id)?;

    let product = state
        .store()
        .get_product(id)
        .await?
        .ok_or_else(|| ApiError::product_not_found(id))?;

    let user = OwnerPolicy::require_author(product.author_id, viewer.as_ref())?;
    let user_id = user.id;

    if let Some(price) = payload.price {
        validate_price(price)?;
    }
    if let Some(category_id) = payload.category {
        validate_id("category", category_id)?;
        if state.store().get_category(category_id).await?.is_none() {
            return Err(ApiError::category_not_found(category_id));
        }
    }
    if let Some(city_id) = payload.city_id {
        validate_id("city", city_id)?;
        if state.store().get_city(city_id).await?.is_none() {
            return Err(ApiError::not_found("City", city_id));
        }
    }

    let changes = ProductChanges {
        name: payload.name,
        description: payload.description,
        price: payload.price,
        price_suffix: payload
            .price_suffix
            .as_deref()
            .map(parse_price_suffix)
            .transpose()?,
        is_lower_bound: payload.is_lower_bound,
        status: payload.status.as_deref().map(parse_status).transpose()?,
        category_id: payload.category,
        city_id: payload.city_id,
    };

    let features = payload
        .features
        .map(|fs| fs.into_iter().map(Into::into).collect());

    let updated = state
        .store()
        .update_product(id, changes, features)
        .await?
        .ok_or_else(|| ApiError::product_not_found(id))?;

    let mut dtos = render_products(&state, vec![updated], Some(user_id), None).await?;
    let dto = dtos
        .pop()
        .ok_or_else(|| ApiError::internal("Updated product failed to render"))?;

    Ok(Json(ApiResponse::success(dto)))
}

/// DELETE /product/{id}/
pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    validate_id("product", id)?;

    let product = state
        .store()
        .get_product(id)
        .await?
        .ok_or_else(|| ApiError::product_not_found(id))?;

    OwnerPolicy::require_author(product.author_id, viewer.as_ref())?;

    state.store().delete_product(id).await?;

    Ok(StatusCode::NO_CONTENT)
}
