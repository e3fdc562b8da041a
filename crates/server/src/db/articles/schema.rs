//! Detection of the live article table layout.
//!
//! Deployments carry either the legacy `art` table or the modern `article`
//! table. The layout is detected from `information_schema` and cached with a
//! 5-minute TTL (`moka`) until explicitly invalidated.
//!
//! Detection also makes sure the barcode column carries a unique index. When the
//! index cannot be created (existing duplicates, missing privilege) the schema
//! records it and writes fall back to a lookup before inserting.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use tracing::{debug, info, warn};

use crate::db::{RepositoryError, quote_ident};
use crate::db::introspect::{self, ColumnInfo};

/// Columns the legacy `art` table may carry, in select order.
pub const LEGACY_COLUMNS: &[&str] = &[
    "Art_ID",
    "Art_CodBar",
    "Categorie_ID",
    "Art_Serie",
    "Art_Desig",
    "Art_Unite",
    "Art_PuAcht",
    "Art_RemF",
    "Art_Tva",
    "Art_PURv",
    "Art_PrMinEX",
    "Art_Putv",
    "Art_Remplac",
    "Art_Fodec",
    "Art_Frs1",
    "Art_Frs2",
    "Art_Frs3",
    "Art_StkIni",
    "Art_StkMini",
    "Art_StkMaxi",
    "Societe_id",
    "Art_RefFr",
    "Art_NewField",
];

/// Columns the modern `article` table may carry, in select order.
pub const MODERN_COLUMNS: &[&str] = &[
    "id",
    "code",
    "designation",
    "description",
    "price",
    "quantity",
    "unit",
    "category",
];

/// Legacy names accepted on writes to the modern table, first match wins.
pub const MODERN_WRITE_ALIASES: &[(&str, &[&str])] = &[
    ("code", &["Art_CodBar"]),
    ("designation", &["Art_Desig"]),
    ("price", &["Art_PURv", "Art_PuAcht"]),
    ("quantity", &["Art_StkIni"]),
    ("unit", &["Art_Unite"]),
];

/// Stock level at or below which a modern article counts as low.
pub const LOW_STOCK_THRESHOLD: i32 = 5;

/// Which article table layout is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaVariant {
    /// `art` with `Art_*` columns.
    Legacy,
    /// `article` with plain English columns.
    Modern,
}

impl SchemaVariant {
    /// Pick the layout from the tables present: modern only when `article`
    /// exists and `art` does not.
    pub fn resolve<S: AsRef<str>>(table_names: &[S]) -> Self {
        let has = |name: &str| {
            table_names
                .iter()
                .any(|t| t.as_ref().eq_ignore_ascii_case(name))
        };

        if has("article") && !has("art") {
            Self::Modern
        } else {
            Self::Legacy
        }
    }

    /// Table name.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Legacy => "art",
            Self::Modern => "article",
        }
    }

    /// Known columns, in select order.
    #[must_use]
    pub const fn known_columns(self) -> &'static [&'static str] {
        match self {
            Self::Legacy => LEGACY_COLUMNS,
            Self::Modern => MODERN_COLUMNS,
        }
    }

    /// Canonical primary key column.
    #[must_use]
    pub const fn primary_key(self) -> &'static str {
        match self {
            Self::Legacy => "Art_ID",
            Self::Modern => "id",
        }
    }

    /// Canonical barcode column, the one carrying the unique index.
    #[must_use]
    pub const fn barcode(self) -> &'static str {
        match self {
            Self::Legacy => "Art_CodBar",
            Self::Modern => "code",
        }
    }

    /// Name of the unique index on [`SchemaVariant::barcode`].
    #[must_use]
    pub const fn barcode_index(self) -> &'static str {
        match self {
            Self::Legacy => "art_codbar_key",
            Self::Modern => "article_code_key",
        }
    }

    /// Columns matched by the `search` filter.
    #[must_use]
    pub const fn searchable_columns(self) -> &'static [&'static str] {
        match self {
            Self::Legacy => &["Art_CodBar", "Art_Desig", "Art_RefFr"],
            Self::Modern => &["code", "designation"],
        }
    }
}

/// A known column as it exists in the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveColumn {
    /// Name in [`SchemaVariant::known_columns`].
    pub canonical: &'static str,
    /// Name in the database, which may differ in case.
    pub actual: String,
    /// Postgres type name.
    pub udt_name: String,
}

/// The resolved layout: variant, table and the known columns that exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleSchema {
    pub variant: SchemaVariant,
    pub table: String,
    pub columns: Vec<LiveColumn>,
    /// The barcode column has a unique index, so the database rejects
    /// duplicates on its own.
    pub barcode_unique: bool,
}

impl ArticleSchema {
    /// Match catalog columns against the variant's known columns.
    ///
    /// Matching ignores ASCII case; columns outside the known list are dropped
    /// and the result follows the known-column order.
    #[must_use]
    pub fn from_columns(variant: SchemaVariant, table: String, live: Vec<ColumnInfo>) -> Self {
        let columns = variant
            .known_columns()
            .iter()
            .filter_map(|&canonical| {
                live.iter()
                    .find(|c| c.name.eq_ignore_ascii_case(canonical))
                    .map(|c| LiveColumn {
                        canonical,
                        actual: c.name.clone(),
                        udt_name: c.udt_name.clone(),
                    })
            })
            .collect();

        Self {
            variant,
            table,
            columns,
            barcode_unique: false,
        }
    }

    /// Look up a live column by canonical name.
    #[must_use]
    pub fn column(&self, canonical: &str) -> Option<&LiveColumn> {
        self.columns.iter().find(|c| c.canonical == canonical)
    }

    /// The primary key column, if the table has it.
    #[must_use]
    pub fn primary_key(&self) -> Option<&LiveColumn> {
        self.column(self.variant.primary_key())
    }

    /// The barcode column, if the table has it.
    #[must_use]
    pub fn barcode(&self) -> Option<&LiveColumn> {
        self.column(self.variant.barcode())
    }

    /// Whether the canonical column exists.
    #[must_use]
    pub fn has(&self, canonical: &str) -> bool {
        self.column(canonical).is_some()
    }
}

/// Detect the article layout from the database.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the catalog queries fail.
pub async fn detect(pool: &PgPool) -> Result<ArticleSchema, RepositoryError> {
    let tables = introspect::list_tables(pool).await?;
    let variant = SchemaVariant::resolve(&tables);

    let table = tables
        .iter()
        .find(|t| t.eq_ignore_ascii_case(variant.table()))
        .cloned()
        .unwrap_or_else(|| variant.table().to_owned());

    let live = introspect::table_columns(pool, &table).await?;
    let mut schema = ArticleSchema::from_columns(variant, table, live);

    let barcode_unique = match schema.barcode() {
        Some(barcode) => ensure_barcode_index(pool, &schema, barcode).await?,
        None => false,
    };
    schema.barcode_unique = barcode_unique;

    debug!(
        variant = ?schema.variant,
        table = %schema.table,
        columns = schema.columns.len(),
        barcode_unique = schema.barcode_unique,
        "Detected article schema"
    );

    Ok(schema)
}

/// Whether `column` of `table` has a single-column, non-partial unique index.
async fn has_unique_index(
    pool: &PgPool,
    table: &str,
    column: &str,
) -> Result<bool, RepositoryError> {
    let (exists,): (bool,) = sqlx::query_as(
        "SELECT EXISTS ( \
             SELECT 1 FROM pg_index i \
             JOIN pg_class t ON t.oid = i.indrelid \
             JOIN pg_namespace n ON n.oid = t.relnamespace \
             JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = i.indkey[0] \
             WHERE n.nspname = current_schema() AND t.relname = $1 AND a.attname = $2 \
               AND i.indisunique AND i.indnkeyatts = 1 AND i.indpred IS NULL \
         )",
    )
    .bind(table)
    .bind(column)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

/// `CREATE UNIQUE INDEX` on the barcode column.
#[must_use]
pub fn barcode_index_ddl(schema: &ArticleSchema, barcode: &LiveColumn) -> String {
    format!(
        "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {} ({})",
        quote_ident(schema.variant.barcode_index()),
        quote_ident(&schema.table),
        quote_ident(&barcode.actual)
    )
}

/// Make sure the barcode column is unique-indexed, creating the index when
/// missing. Returns whether the index is in place.
async fn ensure_barcode_index(
    pool: &PgPool,
    schema: &ArticleSchema,
    barcode: &LiveColumn,
) -> Result<bool, RepositoryError> {
    if has_unique_index(pool, &schema.table, &barcode.actual).await? {
        return Ok(true);
    }

    if let Err(e) = sqlx::query(&barcode_index_ddl(schema, barcode))
        .execute(pool)
        .await
    {
        warn!(
            table = %schema.table,
            error = %e,
            "Cannot create barcode unique index, checking duplicates before writes"
        );
        return Ok(false);
    }

    let created = has_unique_index(pool, &schema.table, &barcode.actual).await?;
    if created {
        info!(table = %schema.table, index = schema.variant.barcode_index(), "Created barcode unique index");
    }
    Ok(created)
}

/// Process-wide cache of the detected [`ArticleSchema`].
#[derive(Clone)]
pub struct SchemaCache {
    cache: Cache<(), Arc<ArticleSchema>>,
}

impl std::fmt::Debug for SchemaCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaCache")
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}

impl Default for SchemaCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaCache {
    /// Create an empty cache with a 5-minute TTL.
    #[must_use]
    pub fn new() -> Self {
        let cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self { cache }
    }

    /// The cached schema, detecting it on a miss.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if detection fails.
    pub async fn get(&self, pool: &PgPool) -> Result<Arc<ArticleSchema>, RepositoryError> {
        if let Some(schema) = self.cache.get(&()).await {
            return Ok(schema);
        }

        let schema = Arc::new(detect(pool).await?);
        self.cache.insert((), Arc::clone(&schema)).await;
        Ok(schema)
    }

    /// Drop the cached schema so the next request detects it again.
    pub async fn invalidate(&self) {
        self.cache.invalidate(&()).await;
        debug!("Article schema cache invalidated");
    }
}
