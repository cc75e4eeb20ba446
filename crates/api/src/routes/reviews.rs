//! Review routes.
//!
//! Review authorship requires the buyer role; deletion is owner-or-admin.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use bazaar_core::{ProductId, ReviewId};

use crate::db::{ProductRepository, ReviewRepository};
use crate::error::{ApiError, Result};
use crate::middleware::{RequireBuyer, RequireUser, may_delete_owned};
use crate::models::catalog::{NewReview, Review};
use crate::routes::auth::MessageResponse;
use crate::state::AppState;

/// Review listing response body.
#[derive(Debug, Serialize)]
pub struct ReviewListing {
    pub items: Vec<Review>,
}

/// Review creation response body.
#[derive(Debug, Serialize)]
pub struct ReviewCreated {
    pub message: String,
    pub id: ReviewId,
}

/// GET /api/products/{id}/reviews - list a product's reviews, newest first.
pub async fn index(
    State(state): State<AppState>,
    Path(product_id): Path<i32>,
) -> Result<Json<ReviewListing>> {
    let product_id = ProductId::new(product_id);

    ProductRepository::new(state.pool())
        .find(product_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("product".to_owned()))?;

    let items = ReviewRepository::new(state.pool())
        .list_for_product(product_id)
        .await?;

    Ok(Json(ReviewListing { items }))
}

/// POST /api/products/{id}/reviews - create a review (buyer only).
pub async fn create(
    State(state): State<AppState>,
    RequireBuyer(buyer): RequireBuyer,
    Path(product_id): Path<i32>,
    Json(new_review): Json<NewReview>,
) -> Result<Response> {
    if !new_review.rating_in_range() {
        return Err(ApiError::Validation(
            "rating must be between 1 and 5".to_owned(),
        ));
    }

    let product_id = ProductId::new(product_id);

    ProductRepository::new(state.pool())
        .find(product_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("product".to_owned()))?;

    let id = ReviewRepository::new(state.pool())
        .create(product_id, buyer.id, &new_review)
        .await?;

    tracing::debug!(review_id = %id, product_id = %product_id, "review created");

    let body = ReviewCreated {
        message: "review created".to_owned(),
        id,
    };
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

/// DELETE /api/reviews/{id} - delete a review (owner or admin).
pub async fn delete(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(review_id): Path<i32>,
) -> Result<Json<MessageResponse>> {
    let repo = ReviewRepository::new(state.pool());
    let review_id = ReviewId::new(review_id);

    let review = repo
        .find(review_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("review".to_owned()))?;

    if !may_delete_owned(&user, review.user_id) {
        return Err(ApiError::Forbidden(
            "only the author or an admin may delete this review".to_owned(),
        ));
    }

    repo.delete(review_id).await?;

    Ok(Json(MessageResponse::new("review deleted")))
}
