//! Product routes.
//!
//! Creation requires the seller role; updates are owner-only; deletion is
//! owner-or-admin. Listing and detail are public.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde::Serialize;

use bazaar_core::ProductId;

use crate::db::{CategoryRepository, ProductRepository};
use crate::error::{ApiError, Result};
use crate::middleware::{RequireSeller, RequireUser, may_delete_owned};
use crate::models::catalog::{NewProduct, Product, ProductFilter, ProductPatch};
use crate::routes::auth::MessageResponse;
use crate::state::AppState;

/// Product listing response body.
#[derive(Debug, Serialize)]
pub struct ProductListing {
    pub items: Vec<Product>,
}

/// Product creation/update response body.
#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub message: String,
    pub product: Product,
}

/// GET /api/products - list products with filters.
pub async fn index(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<ProductListing>> {
    let items = ProductRepository::new(state.pool()).list(&filter).await?;
    Ok(Json(ProductListing { items }))
}

/// GET /api/products/{id} - product detail.
pub async fn show(
    State(state): State<AppState>,
    Path(product_id): Path<i32>,
) -> Result<Json<Product>> {
    let product = ProductRepository::new(state.pool())
        .find(ProductId::new(product_id))
        .await?
        .ok_or_else(|| ApiError::NotFound("product".to_owned()))?;

    Ok(Json(product))
}

/// POST /api/products - create a product (seller only).
pub async fn create(
    State(state): State<AppState>,
    RequireSeller(seller): RequireSeller,
    Json(new_product): Json<NewProduct>,
) -> Result<Response> {
    validate_new_product(&new_product)?;

    // Give "invalid category" a clean 400 instead of surfacing the FK error
    let category = CategoryRepository::new(state.pool())
        .find(new_product.category_id)
        .await?;
    if category.is_none() {
        return Err(ApiError::Validation("invalid category".to_owned()));
    }

    let product = ProductRepository::new(state.pool())
        .create(seller.id, &new_product)
        .await?;

    tracing::info!(product_id = %product.id, seller_id = %seller.id, "product created");

    let body = ProductResponse {
        message: "product created successfully".to_owned(),
        product,
    };
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

/// PUT /api/products/{id} - update a product (owner only).
pub async fn update(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(product_id): Path<i32>,
    Json(patch): Json<ProductPatch>,
) -> Result<Json<ProductResponse>> {
    let repo = ProductRepository::new(state.pool());
    let product_id = ProductId::new(product_id);

    let product = repo
        .find(product_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("product".to_owned()))?;

    if product.seller_id != user.id {
        return Err(ApiError::Forbidden(
            "only the owner may update this product".to_owned(),
        ));
    }

    if let Some(price) = patch.price
        && price <= Decimal::ZERO
    {
        return Err(ApiError::Validation("price must be positive".to_owned()));
    }
    if let Some(stock) = patch.stock_quantity
        && stock < 0
    {
        return Err(ApiError::Validation(
            "stock quantity cannot be negative".to_owned(),
        ));
    }

    let updated = repo.update(product_id, &patch).await?;

    Ok(Json(ProductResponse {
        message: "product updated".to_owned(),
        product: updated,
    }))
}

/// DELETE /api/products/{id} - delete a product (owner or admin).
pub async fn delete(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(product_id): Path<i32>,
) -> Result<Json<MessageResponse>> {
    let repo = ProductRepository::new(state.pool());
    let product_id = ProductId::new(product_id);

    let product = repo
        .find(product_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("product".to_owned()))?;

    if !may_delete_owned(&user, product.seller_id) {
        return Err(ApiError::Forbidden(
            "only the owner or an admin may delete this product".to_owned(),
        ));
    }

    repo.delete(product_id).await?;

    tracing::info!(product_id = %product_id, actor = %user.id, "product deleted");

    Ok(Json(MessageResponse::new("product deleted")))
}

/// Field-level checks shared by creation.
fn validate_new_product(new_product: &NewProduct) -> Result<()> {
    if new_product.title.trim().is_empty() {
        return Err(ApiError::Validation("title is required".to_owned()));
    }
    if new_product.price <= Decimal::ZERO {
        return Err(ApiError::Validation("price must be positive".to_owned()));
    }
    if new_product.stock_quantity < 0 {
        return Err(ApiError::Validation(
            "stock quantity cannot be negative".to_owned(),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bazaar_core::CategoryId;

    fn sample(price: &str, stock: i32, title: &str) -> NewProduct {
        NewProduct {
            title: title.to_owned(),
            description: None,
            images: vec![],
            stock_quantity: stock,
            price: price.parse().unwrap(),
            category_id: CategoryId::new(1),
        }
    }

    #[test]
    fn zero_or_negative_price_is_rejected() {
        assert!(validate_new_product(&sample("0", 1, "Widget")).is_err());
        assert!(validate_new_product(&sample("-3.50", 1, "Widget")).is_err());
        assert!(validate_new_product(&sample("3.50", 1, "Widget")).is_ok());
    }

    #[test]
    fn negative_stock_is_rejected() {
        assert!(validate_new_product(&sample("1.00", -1, "Widget")).is_err());
        assert!(validate_new_product(&sample("1.00", 0, "Widget")).is_ok());
    }

    #[test]
    fn blank_title_is_rejected() {
        assert!(validate_new_product(&sample("1.00", 1, "  ")).is_err());
    }
}
