use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct ImageDto {
    pub id: i32,
    pub img: String,
}

impl ImageDto {
    #[must_use]
    pub fn new(id: i32, stored_path: &str) -> Self {
        Self {
            id,
            img: format!("/media/{stored_path}"),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CityDto {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct CategoryDto {
    pub id: i32,
    pub name: String,
    pub image: String,
}

/// One node of the rendered category tree, children embedded recursively.
#[derive(Debug, Serialize)]
pub struct CategoryNodeDto {
    pub value: i32,
    pub title: String,
    pub children: Vec<CategoryNodeDto>,
    pub image: Vec<ImageDto>,
}

#[derive(Debug, Serialize)]
pub struct FeatureDto {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct AuthorDto {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub phone: String,
}

/// Rendered product. `min_price`/`max_price` carry the aggregate over the
/// current result set (range-slider hints), not per-item values.
#[derive(Debug, Serialize)]
pub struct ProductDto {
    pub id: i32,
    pub images: Vec<ImageDto>,
    pub name: String,
    pub description: String,
    pub price: i32,
    pub price_suffix: String,
    pub is_lower_bound: bool,
    pub category: i32,
    pub city_id: Option<i32>,
    pub city_name: Option<String>,
    pub min_price: i32,
    pub max_price: i32,
    pub features: Vec<FeatureDto>,
    pub is_favorite: bool,
    pub author: AuthorDto,
}

#[derive(Debug, Serialize)]
pub struct RegisteredUserDto {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

#[derive(Debug, Serialize)]
pub struct UserDto {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub favorites: Vec<ProductDto>,
}

#[derive(Debug, Serialize)]
pub struct TokenPairDto {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Serialize)]
pub struct AccessTokenDto {
    pub access: String,
}
