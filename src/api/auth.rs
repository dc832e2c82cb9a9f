use axum::{
    Json,
    extract::{FromRequestParts, State},
    http::{StatusCode, header, request::Parts},
};
use serde::Deserialize;
use std::sync::Arc;

use super::{
    AccessTokenDto, ApiError, ApiResponse, AppState, RegisteredUserDto, TokenPairDto, UserDto,
};
use crate::api::products::render_products;
use crate::api::validation::{validate_password, validate_phone, validate_username};
use crate::db::{NewUser, User};

// ============================================================================
// Extractors
// ============================================================================

/// Requires a valid bearer access token; resolves to the calling user.
pub struct AuthUser(pub User);

/// Optional identity: `None` when no Authorization header is present. A
/// present but invalid token is still rejected with 401.
pub struct MaybeUser(pub Option<User>);

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| ApiError::unauthorized("Missing bearer token"))?;

        resolve_user(state, &token).await.map(AuthUser)
    }
}

impl FromRequestParts<Arc<AppState>> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        match bearer_token(parts) {
            None => Ok(MaybeUser(None)),
            Some(token) => resolve_user(state, &token).await.map(|u| MaybeUser(Some(u))),
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    let auth_header = parts.headers.get(header::AUTHORIZATION)?;
    let auth_str = auth_header.to_str().ok()?;
    auth_str
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
}

async fn resolve_user(state: &Arc<AppState>, token: &str) -> Result<User, ApiError> {
    let user_id = state.tokens().verify_access(token)?;

    state
        .store()
        .get_user(user_id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to load user: {e}")))?
        .ok_or_else(|| ApiError::unauthorized("User no longer exists"))
}

// ============================================================================
// Request types
// ============================================================================

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub phone: String,
}

#[derive(Deserialize)]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/auth/register/
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RegisteredUserDto>>), ApiError> {
    validate_username(&payload.username)?;
    validate_password(&payload.password)?;
    let phone = validate_phone(&payload.phone)?.to_string();

    if payload.email.is_empty() || !payload.email.contains('@') {
        return Err(ApiError::validation("A valid email is required"));
    }

    let security = state.config().read().await.security.clone();

    let user = state
        .store()
        .create_user(
            NewUser {
                username: payload.username,
                email: payload.email,
                password: payload.password,
                first_name: payload.first_name,
                last_name: payload.last_name,
                phone,
            },
            &security,
        )
        .await
        .map_err(|e| {
            // The whole error chain, so the constraint name is visible
            let chain = format!("{e:#}");
            if chain.contains("UNIQUE constraint failed") {
                ApiError::validation("Username or phone is already taken")
            } else {
                ApiError::internal(format!("Failed to create user: {chain}"))
            }
        })?;

    tracing::info!("Registered user: {}", user.username);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(RegisteredUserDto {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            phone: user.phone,
        })),
    ))
}

/// POST /api/token/
/// Exchange credentials for an access/refresh token pair.
pub async fn obtain_token(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TokenRequest>,
) -> Result<Json<ApiResponse<TokenPairDto>>, ApiError> {
    if payload.username.is_empty() {
        return Err(ApiError::validation("Username is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let user = state
        .store()
        .verify_credentials(&payload.username, &payload.password)
        .await
        .map_err(|e| ApiError::internal(format!("Authentication error: {e}")))?
        .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    let pair = state.tokens().issue_pair(user.id)?;

    Ok(Json(ApiResponse::success(TokenPairDto {
        access: pair.access,
        refresh: pair.refresh,
    })))
}

/// POST /api/token/refresh/
pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<ApiResponse<AccessTokenDto>>, ApiError> {
    let access = state.tokens().refresh_access(&payload.refresh)?;

    Ok(Json(ApiResponse::success(AccessTokenDto { access })))
}

/// GET /api/user/
/// Current profile plus the caller's favorited products.
pub async fn current_user(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let favorite_ids = state.store().favorite_product_ids(user.id).await?;
    let products = state.store().get_products_by_ids(&favorite_ids).await?;
    let favorites = render_products(&state, products, Some(user.id), None).await?;

    Ok(Json(ApiResponse::success(UserDto {
        id: user.id,
        username: user.username,
        email: user.email,
        first_name: user.first_name,
        last_name: user.last_name,
        phone: user.phone,
        favorites,
    })))
}
