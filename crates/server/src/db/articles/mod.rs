//! Schema-adaptive article access.
//!
//! Articles are stored in whichever of two layouts the deployment carries:
//! the legacy `art` table (`Art_*` columns) or the modern `article` table.
//! The live layout comes from [`SchemaCache`]; queries are built from it at
//! runtime by [`sql`] and rows are decoded through [`model`] into one
//! canonical [`Article`].
//!
//! Duplicate barcodes are rejected by the unique index on the barcode column,
//! which layout detection creates when missing. Only a table that cannot take the
//! index gets a lookup before each write.

pub mod model;
pub mod schema;
pub mod sql;

use serde_json::{Map, Value};
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use atelier_core::ArticleId;

pub use model::{Article, ArticleRow, LegacyArticle, ModernArticle};
pub use schema::{ArticleSchema, SchemaCache, SchemaVariant};
pub use sql::ArticleFilter;

use super::RepositoryError;

/// Errors from the article layer.
#[derive(Debug, Error)]
pub enum ArticleError {
    /// The live table has no primary key column.
    #[error("article table has no primary key column")]
    MissingPrimaryKey,

    /// The request body named no writable column.
    #[error("no valid fields to write")]
    NoFields,

    /// The body is not a JSON object.
    #[error("request body must be a JSON object")]
    NotAnObject,

    /// Unique index on the barcode column rejected the write.
    #[error("article with this barcode already exists")]
    DuplicateBarcode,

    /// The database refused a value.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// No article with this id.
    #[error("article not found")]
    NotFound,

    /// Other rows still reference the article.
    #[error("article is referenced by other records")]
    Referenced,

    /// A row did not match the layout it was read with.
    #[error("cannot decode article row: {0}")]
    Decode(#[from] serde_json::Error),

    /// Database failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for ArticleError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// Map a write failure to the article error it stands for.
fn write_error(e: sqlx::Error) -> ArticleError {
    match RepositoryError::from_write(e, "duplicate barcode") {
        RepositoryError::Conflict(_) => ArticleError::DuplicateBarcode,
        RepositoryError::Referenced => ArticleError::Referenced,
        RepositoryError::InvalidInput(msg) => ArticleError::InvalidValue(msg),
        other => ArticleError::Repository(other),
    }
}

/// Repository over the live article table.
pub struct ArticleRepository<'a> {
    pool: &'a PgPool,
    schemas: &'a SchemaCache,
}

impl<'a> ArticleRepository<'a> {
    /// Create a new article repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool, schemas: &'a SchemaCache) -> Self {
        Self { pool, schemas }
    }

    /// The live layout.
    ///
    /// # Errors
    ///
    /// Returns an error if detecting the layout fails.
    pub async fn schema(&self) -> Result<std::sync::Arc<ArticleSchema>, ArticleError> {
        Ok(self.schemas.get(self.pool).await?)
    }

    /// List articles matching `filter`, ordered by primary key.
    ///
    /// # Errors
    ///
    /// Returns `ArticleError::MissingPrimaryKey` if the table has no key column.
    #[instrument(skip(self))]
    pub async fn list(&self, filter: &ArticleFilter) -> Result<Vec<Article>, ArticleError> {
        let schema = self.schema().await?;
        let stmt = sql::select(&schema, filter)?;

        let mut query = sqlx::query_as::<_, (Value,)>(&stmt.sql);
        for param in &stmt.params {
            query = query.bind(param.as_deref());
        }
        let docs = query.fetch_all(self.pool).await?;

        docs.into_iter()
            .map(|(doc,)| Ok(ArticleRow::decode(schema.variant, doc)?.into()))
            .collect()
    }

    /// Get one article.
    ///
    /// # Errors
    ///
    /// Returns `ArticleError::NotFound` if no row has `id`.
    #[instrument(skip(self))]
    pub async fn get(&self, id: ArticleId) -> Result<Article, ArticleError> {
        let schema = self.schema().await?;
        let text = sql::select_one(&schema)?;

        let (doc,): (Value,) = sqlx::query_as(&text)
            .bind(id.as_i32())
            .fetch_optional(self.pool)
            .await?
            .ok_or(ArticleError::NotFound)?;

        Ok(ArticleRow::decode(schema.variant, doc)?.into())
    }

    /// Insert an article from a JSON body and return it as stored.
    ///
    /// # Errors
    ///
    /// Returns `ArticleError::NoFields` if nothing in `body` is writable and
    /// `ArticleError::DuplicateBarcode` on a barcode collision.
    #[instrument(skip(self, body))]
    pub async fn create(&self, body: &Value) -> Result<Article, ArticleError> {
        let schema = self.schema().await?;
        let fields = sql::write_fields(&schema, as_object(body)?)?;
        self.ensure_barcode_free(&schema, &fields, None).await?;
        let stmt = sql::insert(&schema, &fields)?;

        let mut query = sqlx::query_as::<_, (i32,)>(&stmt.sql);
        for param in &stmt.params {
            query = query.bind(param.as_deref());
        }
        let (id,) = query.fetch_one(self.pool).await.map_err(write_error)?;

        tracing::info!(article_id = id, "Article created");
        self.get(ArticleId::new(id)).await
    }

    /// Update the supplied columns of an article.
    ///
    /// # Errors
    ///
    /// Returns `ArticleError::NotFound` if no row has `id`, plus the errors of
    /// [`ArticleRepository::create`].
    #[instrument(skip(self, body))]
    pub async fn update(&self, id: ArticleId, body: &Value) -> Result<Article, ArticleError> {
        let schema = self.schema().await?;
        let fields = sql::write_fields(&schema, as_object(body)?)?;
        self.ensure_barcode_free(&schema, &fields, Some(id)).await?;
        let stmt = sql::update(&schema, &fields)?;

        let mut query = sqlx::query(&stmt.sql);
        for param in &stmt.params {
            query = query.bind(param.as_deref());
        }
        let result = query
            .bind(id.as_i32())
            .execute(self.pool)
            .await
            .map_err(write_error)?;

        if result.rows_affected() == 0 {
            return Err(ArticleError::NotFound);
        }
        self.get(id).await
    }

    /// Look the barcode up when the table has no unique index to do it.
    async fn ensure_barcode_free(
        &self,
        schema: &ArticleSchema,
        fields: &[sql::WriteField<'_>],
        exclude: Option<ArticleId>,
    ) -> Result<(), ArticleError> {
        if schema.barcode_unique {
            return Ok(());
        }
        let Some(barcode) = sql::barcode_value(schema, fields) else {
            return Ok(());
        };

        let (taken,): (bool,) = sqlx::query_as(&sql::barcode_taken(schema)?)
            .bind(barcode)
            .bind(exclude.as_ref().map(ArticleId::as_i32))
            .fetch_one(self.pool)
            .await?;

        if taken {
            return Err(ArticleError::DuplicateBarcode);
        }
        Ok(())
    }

    /// Delete an article.
    ///
    /// # Errors
    ///
    /// Returns `ArticleError::NotFound` if no row has `id` and
    /// `ArticleError::Referenced` if other rows point at it.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ArticleId) -> Result<(), ArticleError> {
        let schema = self.schema().await?;
        let text = sql::delete(&schema)?;

        let result = sqlx::query(&text)
            .bind(id.as_i32())
            .execute(self.pool)
            .await
            .map_err(write_error)?;

        if result.rows_affected() == 0 {
            return Err(ArticleError::NotFound);
        }
        Ok(())
    }
}

fn as_object(body: &Value) -> Result<&Map<String, Value>, ArticleError> {
    body.as_object().ok_or(ArticleError::NotAnObject)
}

// =============================================================================
// Table bootstrap
// =============================================================================

/// Sample rows inserted by [`init_modern_table`]:
/// code, designation, description, price, quantity, unit, category.
const SAMPLE_ARTICLES: &[(&str, &str, &str, &str, i32, &str, &str)] = &[
    (
        "ART001",
        "Laptop Dell XPS 13",
        "13 inch ultrabook, 16 GB RAM",
        "1299.99",
        15,
        "piece",
        "electronics",
    ),
    (
        "ART002",
        "Office Chair",
        "Ergonomic chair with lumbar support",
        "249.99",
        8,
        "piece",
        "furniture",
    ),
    (
        "ART003",
        "Wireless Mouse",
        "2.4 GHz optical mouse",
        "39.99",
        30,
        "piece",
        "electronics",
    ),
    (
        "ART004",
        "Coffee Beans",
        "Arabica beans, medium roast",
        "24.99",
        5,
        "kg",
        "food",
    ),
    (
        "ART005",
        "Desk Lamp",
        "LED lamp with adjustable arm",
        "49.99",
        12,
        "piece",
        "furniture",
    ),
];

/// What [`init_modern_table`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct InitReport {
    /// Rows in `article` afterwards.
    pub article_count: i64,
    /// Sample rows inserted by this call.
    pub seeded: u64,
}

/// Create the modern `article` table if missing and seed it when empty.
///
/// Invalidates `schemas` so the next request sees the new layout.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if any statement fails.
#[instrument(skip_all)]
pub async fn init_modern_table(
    pool: &PgPool,
    schemas: &SchemaCache,
) -> Result<InitReport, RepositoryError> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS article (
            id SERIAL PRIMARY KEY,
            code VARCHAR(50),
            designation VARCHAR(255) NOT NULL,
            description TEXT,
            price NUMERIC(10, 2),
            quantity INTEGER NOT NULL DEFAULT 0,
            unit VARCHAR(50),
            category VARCHAR(100),
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE UNIQUE INDEX IF NOT EXISTS article_code_key ON article (code)")
        .execute(pool)
        .await?;

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM article")
        .fetch_one(pool)
        .await?;

    let mut seeded = 0;
    if count == 0 {
        for (code, designation, description, price, quantity, unit, category) in SAMPLE_ARTICLES {
            let result = sqlx::query(
                "INSERT INTO article (code, designation, description, price, quantity, unit, category)
                 VALUES ($1, $2, $3, CAST($4 AS numeric), $5, $6, $7)
                 ON CONFLICT (code) DO NOTHING",
            )
            .bind(code)
            .bind(designation)
            .bind(description)
            .bind(price)
            .bind(quantity)
            .bind(unit)
            .bind(category)
            .execute(pool)
            .await?;
            seeded += result.rows_affected();
        }
    }

    schemas.invalidate().await;

    let (article_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM article")
        .fetch_one(pool)
        .await?;

    tracing::info!(article_count, seeded, "Article table initialized");

    Ok(InitReport {
        article_count,
        seeded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_articles_have_unique_codes() {
        let mut codes: Vec<_> = SAMPLE_ARTICLES.iter().map(|a| a.0).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), SAMPLE_ARTICLES.len());
    }

    #[test]
    fn test_non_object_body_is_rejected() {
        assert!(matches!(
            as_object(&serde_json::json!([1, 2])),
            Err(ArticleError::NotAnObject)
        ));
    }

    #[test]
    fn test_write_error_passthrough() {
        assert!(matches!(
            write_error(sqlx::Error::RowNotFound),
            ArticleError::Repository(RepositoryError::Database(_))
        ));
    }
}
