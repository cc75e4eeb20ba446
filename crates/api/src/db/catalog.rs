//! Category and product repositories.
//!
//! The catalog layer is conventional CRUD over the relational store; the
//! interesting authorization rules (seller-only creation, owner-or-admin
//! deletion) are enforced in the handlers on top of these queries.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, QueryBuilder};

use bazaar_core::{CategoryId, ProductId, UserId, Username};

use super::RepositoryError;
use crate::models::catalog::{Category, NewProduct, Product, ProductFilter, ProductPatch};

/// SELECT list for a product joined with its category and seller.
const PRODUCT_SELECT: &str = "SELECT p.id, p.title, p.description, p.images, p.stock_quantity, \
     p.price, p.overall_rating, p.category_id, c.title AS category_title, \
     p.seller_id, u.username AS seller_username, p.created_at \
     FROM products p \
     JOIN categories c ON c.id = p.category_id \
     JOIN users u ON u.id = p.seller_id";

/// Joined product row; `images` is stored as JSONB.
#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    title: String,
    description: Option<String>,
    images: sqlx::types::Json<Vec<String>>,
    stock_quantity: i32,
    price: Decimal,
    overall_rating: Option<f64>,
    category_id: CategoryId,
    category_title: String,
    seller_id: UserId,
    seller_username: Username,
    created_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            images: row.images.0,
            stock_quantity: row.stock_quantity,
            price: row.price,
            overall_rating: row.overall_rating,
            category_id: row.category_id,
            category_title: row.category_title,
            seller_id: row.seller_id,
            seller_username: row.seller_username,
            created_at: row.created_at,
        }
    }
}

/// Repository for category operations.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    /// Create a new category repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List all categories.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Category>, RepositoryError> {
        let categories =
            sqlx::query_as("SELECT id, title FROM categories ORDER BY title ASC")
                .fetch_all(self.pool)
                .await?;

        Ok(categories)
    }

    /// Get a category by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let category = sqlx::query_as("SELECT id, title FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(category)
    }

    /// Create a new category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, title: &str) -> Result<Category, RepositoryError> {
        let category =
            sqlx::query_as("INSERT INTO categories (title) VALUES ($1) RETURNING id, title")
                .bind(title)
                .fetch_one(self.pool)
                .await
                .map_err(RepositoryError::from_sqlx)?;

        Ok(category)
    }
}

/// Repository for product operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List products matching a filter, with a fixed set of orderings.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let mut query: QueryBuilder<'_, sqlx::Postgres> = QueryBuilder::new(PRODUCT_SELECT);
        query.push(" WHERE TRUE");

        if let Some(category_id) = filter.category_id {
            query.push(" AND p.category_id = ").push_bind(category_id);
        }
        if let Some(price_min) = filter.price_min {
            query.push(" AND p.price >= ").push_bind(price_min);
        }
        if let Some(price_max) = filter.price_max {
            query.push(" AND p.price <= ").push_bind(price_max);
        }
        if let Some(rating_min) = filter.rating_min {
            query.push(" AND p.overall_rating >= ").push_bind(rating_min);
        }

        // ORDER BY comes from a closed enum, never from user input
        query.push(" ORDER BY ").push(filter.order_by.sql());
        query.push(" LIMIT ").push_bind(filter.effective_limit());
        query.push(" OFFSET ").push_bind(filter.effective_offset());

        let rows: Vec<ProductRow> = query.build_query_as().fetch_all(self.pool).await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> =
            sqlx::query_as(&format!("{PRODUCT_SELECT} WHERE p.id = $1"))
                .bind(id)
                .fetch_optional(self.pool)
                .await?;

        Ok(row.map(Product::from))
    }

    /// Create a product for a seller.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the category doesn't exist.
    /// Returns `RepositoryError::Database` for other failures.
    pub async fn create(
        &self,
        seller_id: UserId,
        new_product: &NewProduct,
    ) -> Result<Product, RepositoryError> {
        let id: ProductId = sqlx::query_scalar(
            "INSERT INTO products \
                 (title, description, images, stock_quantity, price, category_id, seller_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id",
        )
        .bind(&new_product.title)
        .bind(new_product.description.as_ref())
        .bind(sqlx::types::Json(&new_product.images))
        .bind(new_product.stock_quantity)
        .bind(new_product.price)
        .bind(new_product.category_id)
        .bind(seller_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::Conflict("category does not exist".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        self.find(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Apply a partial update to a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn update(
        &self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<Product, RepositoryError> {
        let updated: Option<ProductId> = sqlx::query_scalar(
            "UPDATE products SET \
                 title = COALESCE($2, title), \
                 description = COALESCE($3, description), \
                 images = COALESCE($4, images), \
                 stock_quantity = COALESCE($5, stock_quantity), \
                 price = COALESCE($6, price) \
             WHERE id = $1 \
             RETURNING id",
        )
        .bind(id)
        .bind(patch.title.as_ref())
        .bind(patch.description.as_ref())
        .bind(patch.images.as_ref().map(sqlx::types::Json))
        .bind(patch.stock_quantity)
        .bind(patch.price)
        .fetch_optional(self.pool)
        .await?;

        let Some(id) = updated else {
            return Err(RepositoryError::NotFound);
        };

        self.find(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Delete a product (cascades its reviews).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
