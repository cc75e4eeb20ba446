//! Review repository.
//!
//! Review writes keep the product's `overall_rating` in step: the insert or
//! delete and the rating recompute happen in one transaction.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use bazaar_core::{ProductId, ReviewId, UserId, Username};

use super::RepositoryError;
use crate::models::catalog::{NewReview, Review};

/// SELECT list for a review joined with its author's username.
const REVIEW_SELECT: &str = "SELECT r.id, r.body, r.rating, r.product_id, r.user_id, \
     u.username, r.created_at \
     FROM reviews r \
     JOIN users u ON u.id = r.user_id";

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: ReviewId,
    body: Option<String>,
    rating: i32,
    product_id: ProductId,
    user_id: UserId,
    username: Username,
    created_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Self {
            id: row.id,
            body: row.body,
            rating: row.rating,
            product_id: row.product_id,
            user_id: row.user_id,
            username: row.username,
            created_at: row.created_at,
        }
    }
}

/// Repository for review operations.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    /// Create a new review repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List reviews for a product, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<Review>, RepositoryError> {
        let rows: Vec<ReviewRow> = sqlx::query_as(&format!(
            "{REVIEW_SELECT} WHERE r.product_id = $1 ORDER BY r.created_at DESC"
        ))
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Review::from).collect())
    }

    /// Get a review by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError> {
        let row: Option<ReviewRow> = sqlx::query_as(&format!("{REVIEW_SELECT} WHERE r.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Review::from))
    }

    /// Create a review and refresh the product's overall rating.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the product doesn't exist.
    /// Returns `RepositoryError::Database` for other failures.
    pub async fn create(
        &self,
        product_id: ProductId,
        user_id: UserId,
        new_review: &NewReview,
    ) -> Result<ReviewId, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let id: ReviewId = sqlx::query_scalar(
            "INSERT INTO reviews (body, rating, product_id, user_id) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id",
        )
        .bind(new_review.body.as_ref())
        .bind(new_review.rating)
        .bind(product_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::Conflict("product does not exist".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        refresh_rating(&mut tx, product_id).await?;
        tx.commit().await?;

        Ok(id)
    }

    /// Delete a review and refresh the product's overall rating.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review doesn't exist.
    pub async fn delete(&self, id: ReviewId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let product_id: Option<ProductId> =
            sqlx::query_scalar("DELETE FROM reviews WHERE id = $1 RETURNING product_id")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(product_id) = product_id else {
            return Err(RepositoryError::NotFound);
        };

        refresh_rating(&mut tx, product_id).await?;
        tx.commit().await?;

        Ok(())
    }
}

/// Recompute a product's average rating from its remaining reviews.
async fn refresh_rating(
    tx: &mut Transaction<'_, Postgres>,
    product_id: ProductId,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "UPDATE products SET overall_rating = \
             (SELECT AVG(rating)::float8 FROM reviews WHERE product_id = $1) \
         WHERE id = $1",
    )
    .bind(product_id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
