pub use super::categories::Entity as Categories;
pub use super::category_images::Entity as CategoryImages;
pub use super::cities::Entity as Cities;
pub use super::product_favorites::Entity as ProductFavorites;
pub use super::product_features::Entity as ProductFeatures;
pub use super::product_images::Entity as ProductImages;
pub use super::products::Entity as Products;
pub use super::users::Entity as Users;
