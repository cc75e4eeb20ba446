//! Catalog and review domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bazaar_core::{CategoryId, ProductId, ReviewId, UserId, Username};

/// A product category.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: CategoryId,
    pub title: String,
}

/// A product listing.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub description: Option<String>,
    /// Image URLs supplied by the seller.
    pub images: Vec<String>,
    pub stock_quantity: i32,
    pub price: Decimal,
    /// Average review rating, absent until the first review.
    pub overall_rating: Option<f64>,
    pub category_id: CategoryId,
    pub category_title: String,
    pub seller_id: UserId,
    pub seller_username: Username,
    pub created_at: DateTime<Utc>,
}

/// Fields required to create a product.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub stock_quantity: i32,
    pub price: Decimal,
    pub category_id: CategoryId,
}

/// A partial update to a product.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub images: Option<Vec<String>>,
    pub stock_quantity: Option<i32>,
    pub price: Option<Decimal>,
}

/// Supported orderings for the product listing.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductOrder {
    #[default]
    CreatedAt,
    PriceAscending,
    PriceDescending,
    Rating,
}

impl ProductOrder {
    /// The ORDER BY clause for this ordering. A fixed set, never
    /// interpolated from user input.
    #[must_use]
    pub const fn sql(self) -> &'static str {
        match self {
            Self::CreatedAt => "p.created_at DESC",
            Self::PriceAscending => "p.price ASC",
            Self::PriceDescending => "p.price DESC",
            Self::Rating => "p.overall_rating DESC NULLS LAST",
        }
    }
}

/// Filters for the product listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    pub category_id: Option<CategoryId>,
    pub price_min: Option<Decimal>,
    pub price_max: Option<Decimal>,
    pub rating_min: Option<f64>,
    #[serde(default)]
    pub order_by: ProductOrder,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ProductFilter {
    /// Default page size for the product listing.
    pub const DEFAULT_LIMIT: i64 = 20;
    /// Hard cap on page size.
    pub const MAX_LIMIT: i64 = 100;

    /// Effective LIMIT after defaulting and clamping.
    #[must_use]
    pub fn effective_limit(&self) -> i64 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }

    /// Effective OFFSET after defaulting.
    #[must_use]
    pub fn effective_offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// A product review.
#[derive(Debug, Clone, Serialize)]
pub struct Review {
    pub id: ReviewId,
    pub body: Option<String>,
    pub rating: i32,
    pub product_id: ProductId,
    pub user_id: UserId,
    pub username: Username,
    pub created_at: DateTime<Utc>,
}

/// Fields required to create a review.
#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
    pub body: Option<String>,
    pub rating: i32,
}

impl NewReview {
    /// Inclusive rating bounds.
    pub const RATING_RANGE: std::ops::RangeInclusive<i32> = 1..=5;

    /// Whether the rating is within bounds.
    #[must_use]
    pub fn rating_in_range(&self) -> bool {
        Self::RATING_RANGE.contains(&self.rating)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_defaults_and_clamps() {
        let filter = ProductFilter::default();
        assert_eq!(filter.effective_limit(), ProductFilter::DEFAULT_LIMIT);

        let filter = ProductFilter {
            limit: Some(10_000),
            ..ProductFilter::default()
        };
        assert_eq!(filter.effective_limit(), ProductFilter::MAX_LIMIT);

        let filter = ProductFilter {
            limit: Some(0),
            ..ProductFilter::default()
        };
        assert_eq!(filter.effective_limit(), 1);
    }

    #[test]
    fn negative_offset_is_floored() {
        let filter = ProductFilter {
            offset: Some(-5),
            ..ProductFilter::default()
        };
        assert_eq!(filter.effective_offset(), 0);
    }

    #[test]
    fn rating_bounds() {
        assert!(
            NewReview {
                body: None,
                rating: 1
            }
            .rating_in_range()
        );
        assert!(
            NewReview {
                body: None,
                rating: 5
            }
            .rating_in_range()
        );
        assert!(
            !NewReview {
                body: None,
                rating: 0
            }
            .rating_in_range()
        );
        assert!(
            !NewReview {
                body: None,
                rating: 6
            }
            .rating_in_range()
        );
    }
}
