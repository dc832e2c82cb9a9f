use super::ApiError;
use crate::db::User;

/// Authorization rules for author-owned resources, applied uniformly by the
/// handlers instead of ad-hoc equality checks.
pub struct OwnerPolicy;

impl OwnerPolicy {
    /// Writes require an authenticated caller who is the author.
    pub fn require_author<'a>(
        author_id: i32,
        viewer: Option<&'a User>,
    ) -> Result<&'a User, ApiError> {
        let Some(user) = viewer else {
            return Err(ApiError::unauthorized("Authentication required"));
        };

        if user.id != author_id {
            return Err(ApiError::forbidden("You are not the author of this product"));
        }

        Ok(user)
    }

    /// Read rule for product detail: anonymous callers may read anything,
    /// authenticated callers may only read their own listings.
    pub fn require_read(author_id: i32, viewer: Option<&User>) -> Result<(), ApiError> {
        match viewer {
            None => Ok(()),
            Some(user) if user.id == author_id => Ok(()),
            Some(_) => Err(ApiError::forbidden("You are not the author of this product")),
        }
    }
}
