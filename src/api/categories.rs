use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, CategoryDto, CategoryNodeDto, ImageDto};
use crate::db::repositories::category::{ChildIndex, child_index, descendant_ids};
use crate::entities::{categories, category_images};

#[derive(Deserialize)]
pub struct TreeQuery {
    pub category: Option<i32>,
}

/// GET /category/tree
/// With `?category=<id>`: the category plus all of its descendants, each
/// rendered as a nested node, queried category last. Without: the roots.
pub async fn category_tree(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TreeQuery>,
) -> Result<Json<ApiResponse<Vec<CategoryNodeDto>>>, ApiError> {
    let all = state.store().list_categories().await?;
    let index = child_index(&all);
    let by_id: HashMap<i32, &categories::Model> = all.iter().map(|c| (c.id, c)).collect();

    let ids: Vec<i32> = match params.category {
        Some(root) => {
            if !by_id.contains_key(&root) {
                return Err(ApiError::category_not_found(root));
            }
            let mut ids = descendant_ids(root, &index);
            ids.push(root);
            ids
        }
        None => all.iter().filter(|c| c.parent_id.is_none()).map(|c| c.id).collect(),
    };

    let all_ids: Vec<i32> = all.iter().map(|c| c.id).collect();
    let images = state.store().category_images_for(&all_ids).await?;

    let nodes = ids
        .iter()
        .filter_map(|id| by_id.get(id))
        .map(|category| build_node(category, &by_id, &index, &images, &mut Vec::new()))
        .collect();

    Ok(Json(ApiResponse::success(nodes)))
}

/// GET /category
/// Root categories with their direct image path.
pub async fn category_list(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<CategoryDto>>>, ApiError> {
    let roots = state.store().list_root_categories().await?;

    let dtos = roots
        .into_iter()
        .map(|c| CategoryDto {
            id: c.id,
            name: c.name,
            image: format!("/media/{}", c.image),
        })
        .collect();

    Ok(Json(ApiResponse::success(dtos)))
}

/// `ancestors` guards against a corrupted parent chain looping the render.
fn build_node(
    category: &categories::Model,
    by_id: &HashMap<i32, &categories::Model>,
    index: &ChildIndex,
    images: &HashMap<i32, Vec<category_images::Model>>,
    ancestors: &mut Vec<i32>,
) -> CategoryNodeDto {
    ancestors.push(category.id);

    let mut children = Vec::new();
    if let Some(child_ids) = index.get(&category.id) {
        for id in child_ids {
            if ancestors.contains(id) {
                continue;
            }
            if let Some(child) = by_id.get(id) {
                children.push(build_node(child, by_id, index, images, ancestors));
            }
        }
    }

    ancestors.pop();

    let image = images
        .get(&category.id)
        .map(|rows| rows.iter().map(|i| ImageDto::new(i.id, &i.image)).collect())
        .unwrap_or_default();

    CategoryNodeDto {
        value: category.id,
        title: category.name.clone(),
        children,
        image,
    }
}
