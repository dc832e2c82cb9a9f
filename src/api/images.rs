use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use std::sync::Arc;

use super::auth::AuthUser;
use super::policy::OwnerPolicy;
use super::validation::validate_id;
use super::{ApiError, AppState};

/// POST /product/{id}/image
/// Multipart upload; each file part becomes a separate image record.
pub async fn upload_product_images(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(product_id): Path<i32>,
    mut multipart: Multipart,
) -> Result<StatusCode, ApiError> {
    validate_id("product", product_id)?;

    let product = state
        .store()
        .get_product(product_id)
        .await?
        .ok_or_else(|| ApiError::product_not_found(product_id))?;

    OwnerPolicy::require_author(product.author_id, Some(&user))?;

    let mut uploaded = 0usize;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("images") {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::validation(format!("Failed to read upload: {e}")))?;

        if bytes.is_empty() {
            return Err(ApiError::validation("Empty file upload"));
        }

        let stored_path = state
            .images()
            .save_upload(file_name.as_deref(), content_type.as_deref(), &bytes)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to store image: {e}")))?;

        state
            .store()
            .add_product_image(product_id, &stored_path, "")
            .await?;

        uploaded += 1;
    }

    if uploaded == 0 {
        return Err(ApiError::validation("No image files supplied"));
    }

    tracing::info!("Uploaded {} image(s) for product {}", uploaded, product_id);

    Ok(StatusCode::CREATED)
}

/// DELETE /products/{product_id}/images/{image_id}/
/// Compound-key lookup; the row is authoritative, file removal is
/// best-effort.
pub async fn delete_product_image(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path((product_id, image_id)): Path<(i32, i32)>,
) -> Result<StatusCode, ApiError> {
    validate_id("product", product_id)?;
    validate_id("image", image_id)?;

    let image = state
        .store()
        .find_product_image(image_id, product_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Image", image_id))?;

    let product = state
        .store()
        .get_product(product_id)
        .await?
        .ok_or_else(|| ApiError::product_not_found(product_id))?;

    OwnerPolicy::require_author(product.author_id, Some(&user))?;

    state.store().delete_product_image(image_id).await?;
    state.images().remove_file(&image.image).await;

    Ok(StatusCode::NO_CONTENT)
}
