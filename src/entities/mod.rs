pub mod prelude;

pub mod categories;
pub mod category_images;
pub mod cities;
pub mod product_favorites;
pub mod product_features;
pub mod product_images;
pub mod products;
pub mod users;
