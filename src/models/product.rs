/// Product lifecycle. Stored as the two-letter code; listings default to
/// showing only active products, new products start on moderation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductStatus {
    Active,
    Archived,
    OnModerate,
    Canceled,
}

impl ProductStatus {
    #[must_use]
    pub const fn as_code(self) -> &'static str {
        match self {
            Self::Active => "AC",
            Self::Archived => "AR",
            Self::OnModerate => "MD",
            Self::Canceled => "CN",
        }
    }

    /// Accepts either the stored code or the status name, case-insensitive.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        match input.to_ascii_uppercase().as_str() {
            "AC" | "ACTIVE" => Some(Self::Active),
            "AR" | "ARCHIVED" => Some(Self::Archived),
            "MD" | "ON_MODERATE" | "ON-MODERATE" => Some(Self::OnModerate),
            "CN" | "CANCELED" => Some(Self::Canceled),
            _ => None,
        }
    }
}

/// Display-only unit qualifier attached to a price amount. Stored as the
/// short code, rendered as the display string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceSuffix {
    None,
    Service,
    Hour,
    Unit,
    Day,
    Month,
    SquareMeter,
    Meter,
}

impl PriceSuffix {
    #[must_use]
    pub const fn as_code(self) -> &'static str {
        match self {
            Self::None => "N",
            Self::Service => "S",
            Self::Hour => "H",
            Self::Unit => "U",
            Self::Day => "D",
            Self::Month => "MT",
            Self::SquareMeter => "M2",
            Self::Meter => "M",
        }
    }

    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        match input.to_ascii_uppercase().as_str() {
            "N" => Some(Self::None),
            "S" => Some(Self::Service),
            "H" => Some(Self::Hour),
            "U" => Some(Self::Unit),
            "D" => Some(Self::Day),
            "MT" => Some(Self::Month),
            "M2" => Some(Self::SquareMeter),
            "M" => Some(Self::Meter),
            _ => None,
        }
    }

    #[must_use]
    pub const fn display(self) -> &'static str {
        match self {
            Self::None => "rub",
            Self::Service => "per service",
            Self::Hour => "per hour",
            Self::Unit => "per unit",
            Self::Day => "per day",
            Self::Month => "per month",
            Self::SquareMeter => "per m2",
            Self::Meter => "per m",
        }
    }
}

/// Input for creating a product. The author and the initial status are
/// assigned by the endpoint layer, never by the caller.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: i32,
    pub price_suffix: PriceSuffix,
    pub is_lower_bound: bool,
    pub category_id: i32,
    pub city_id: Option<i32>,
}

/// Field-wise changes applied on update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i32>,
    pub price_suffix: Option<PriceSuffix>,
    pub is_lower_bound: Option<bool>,
    pub status: Option<ProductStatus>,
    pub category_id: Option<i32>,
    pub city_id: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct FeatureInput {
    pub name: String,
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_round_trip() {
        for status in [
            ProductStatus::Active,
            ProductStatus::Archived,
            ProductStatus::OnModerate,
            ProductStatus::Canceled,
        ] {
            assert_eq!(ProductStatus::parse(status.as_code()), Some(status));
        }
    }

    #[test]
    fn test_status_parse_accepts_names() {
        assert_eq!(ProductStatus::parse("active"), Some(ProductStatus::Active));
        assert_eq!(ProductStatus::parse("ACTIVE"), Some(ProductStatus::Active));
        assert_eq!(
            ProductStatus::parse("archived"),
            Some(ProductStatus::Archived)
        );
        assert_eq!(ProductStatus::parse("bogus"), None);
    }

    #[test]
    fn test_price_suffix_round_trip() {
        for suffix in [
            PriceSuffix::None,
            PriceSuffix::Service,
            PriceSuffix::Hour,
            PriceSuffix::Unit,
            PriceSuffix::Day,
            PriceSuffix::Month,
            PriceSuffix::SquareMeter,
            PriceSuffix::Meter,
        ] {
            assert_eq!(PriceSuffix::parse(suffix.as_code()), Some(suffix));
        }
    }

    #[test]
    fn test_price_suffix_display() {
        assert_eq!(PriceSuffix::Hour.display(), "per hour");
        assert_eq!(PriceSuffix::SquareMeter.display(), "per m2");
        assert_eq!(PriceSuffix::None.display(), "rub");
    }
}
