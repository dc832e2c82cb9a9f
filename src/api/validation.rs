use super::ApiError;

pub fn validate_id(resource: &str, id: i32) -> Result<i32, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid {} ID: {}. ID must be a positive integer",
            resource, id
        )));
    }
    Ok(id)
}

pub fn validate_price(price: i32) -> Result<i32, ApiError> {
    if price < 0 {
        return Err(ApiError::validation(format!(
            "Invalid price: {}. Price must not be negative",
            price
        )));
    }
    Ok(price)
}

pub fn validate_price_range(min: Option<i32>, max: Option<i32>) -> Result<(), ApiError> {
    if let Some(min) = min {
        validate_price(min)?;
    }
    if let Some(max) = max {
        validate_price(max)?;
    }
    if let (Some(min), Some(max)) = (min, max)
        && min > max
    {
        return Err(ApiError::validation(format!(
            "Invalid price range: {} > {}",
            min, max
        )));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<&str, ApiError> {
    if username.is_empty() {
        return Err(ApiError::validation("Username cannot be empty"));
    }

    if username.len() > 150 {
        return Err(ApiError::validation(
            "Username must be 150 characters or less",
        ));
    }

    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == '_' || c == '@' || c == '+')
    {
        return Err(ApiError::validation(
            "Username can only contain letters, numbers, and @.+-_ characters",
        ));
    }

    Ok(username)
}

pub fn validate_password(password: &str) -> Result<&str, ApiError> {
    if password.len() < 8 {
        return Err(ApiError::validation(
            "Password must be at least 8 characters",
        ));
    }
    Ok(password)
}

pub fn validate_phone(phone: &str) -> Result<&str, ApiError> {
    let trimmed = phone.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("Phone cannot be empty"));
    }

    if trimmed.len() > 30 {
        return Err(ApiError::validation("Phone must be 30 characters or less"));
    }

    if !trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || c == '+' || c == '-' || c == ' ' || c == '(' || c == ')')
    {
        return Err(ApiError::validation("Phone contains invalid characters"));
    }

    Ok(trimmed)
}
