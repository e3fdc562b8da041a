//! SQL text for the article layer.
//!
//! Everything here is pure string building over an [`ArticleSchema`]; only
//! names that came out of `information_schema` are interpolated, values are
//! always bound.

use serde_json::{Map, Value};

use super::ArticleError;
use super::schema::{
    ArticleSchema, LOW_STOCK_THRESHOLD, LiveColumn, MODERN_WRITE_ALIASES, SchemaVariant,
};
use crate::db::quote_ident;

/// Filters for listing articles.
#[derive(Debug, Clone, Default)]
pub struct ArticleFilter {
    /// Case-insensitive substring over the searchable columns.
    pub search: Option<String>,
    /// Only articles at or below their minimum stock.
    pub low_stock: bool,
}

/// One column assignment of an insert or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteField<'a> {
    pub column: &'a LiveColumn,
    /// Text form of the value; `None` writes SQL `NULL`.
    pub value: Option<String>,
}

/// A statement plus its text parameters, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Option<String>>,
}

fn select_list(schema: &ArticleSchema) -> String {
    schema
        .columns
        .iter()
        .map(|c| format!("{} AS {}", quote_ident(&c.actual), quote_ident(c.canonical)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn wrap_json(inner: &str) -> String {
    format!("SELECT row_to_json(t) AS doc FROM ({inner}) t")
}

/// `SELECT` of all articles matching `filter`, one JSON document per row.
///
/// # Errors
///
/// Returns `ArticleError::MissingPrimaryKey` when the table has no primary key column.
pub fn select(schema: &ArticleSchema, filter: &ArticleFilter) -> Result<Statement, ArticleError> {
    let pk = schema.primary_key().ok_or(ArticleError::MissingPrimaryKey)?;

    let mut conditions = Vec::new();
    let mut params = Vec::new();

    if filter.low_stock {
        match schema.variant {
            SchemaVariant::Legacy => {
                if let (Some(stock), Some(min)) =
                    (schema.column("Art_StkIni"), schema.column("Art_StkMini"))
                {
                    conditions.push(format!(
                        "{} <= {}",
                        quote_ident(&stock.actual),
                        quote_ident(&min.actual)
                    ));
                }
            }
            SchemaVariant::Modern => {
                if let Some(quantity) = schema.column("quantity") {
                    conditions.push(format!(
                        "{} <= {LOW_STOCK_THRESHOLD}",
                        quote_ident(&quantity.actual)
                    ));
                }
            }
        }
    }

    if let Some(term) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let searchable: Vec<_> = schema
            .variant
            .searchable_columns()
            .iter()
            .filter_map(|name| schema.column(name))
            .collect();

        if !searchable.is_empty() {
            params.push(Some(crate::db::like_pattern(term)));
            let n = params.len();
            let ors = searchable
                .iter()
                .map(|c| format!("CAST({} AS text) ILIKE ${n}", quote_ident(&c.actual)))
                .collect::<Vec<_>>()
                .join(" OR ");
            conditions.push(format!("({ors})"));
        }
    }

    let mut inner = format!(
        "SELECT {} FROM {}",
        select_list(schema),
        quote_ident(&schema.table)
    );
    if !conditions.is_empty() {
        inner.push_str(" WHERE ");
        inner.push_str(&conditions.join(" AND "));
    }
    inner.push_str(&format!(" ORDER BY {}", quote_ident(&pk.actual)));

    Ok(Statement {
        sql: wrap_json(&inner),
        params,
    })
}

/// `SELECT` of one article by primary key (`$1`, `int4`).
///
/// # Errors
///
/// Returns `ArticleError::MissingPrimaryKey` when the table has no primary key column.
pub fn select_one(schema: &ArticleSchema) -> Result<String, ArticleError> {
    let pk = schema.primary_key().ok_or(ArticleError::MissingPrimaryKey)?;
    Ok(wrap_json(&format!(
        "SELECT {} FROM {} WHERE {} = $1",
        select_list(schema),
        quote_ident(&schema.table),
        quote_ident(&pk.actual)
    )))
}

/// Convert a JSON body value to the text bound for it.
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

/// Pick the body fields that map to live, non-key columns.
///
/// A column takes its value from the canonical key, then the actual column
/// name, then (modern layout only) the legacy aliases. Keys that match no
/// column are ignored.
///
/// # Errors
///
/// Returns `ArticleError::MissingPrimaryKey` when the table has no primary key
/// column and `ArticleError::NoFields` when nothing in `body` is writable.
pub fn write_fields<'s>(
    schema: &'s ArticleSchema,
    body: &Map<String, Value>,
) -> Result<Vec<WriteField<'s>>, ArticleError> {
    let pk = schema.primary_key().ok_or(ArticleError::MissingPrimaryKey)?;

    let fields: Vec<_> = schema
        .columns
        .iter()
        .filter(|c| c.canonical != pk.canonical)
        .filter_map(|column| {
            let aliases: &[&str] = match schema.variant {
                SchemaVariant::Modern => MODERN_WRITE_ALIASES
                    .iter()
                    .find(|(target, _)| *target == column.canonical)
                    .map_or(&[], |(_, names)| names),
                SchemaVariant::Legacy => &[],
            };

            std::iter::once(column.canonical)
                .chain(std::iter::once(column.actual.as_str()))
                .chain(aliases.iter().copied())
                .find_map(|key| body.get(key))
                .map(|value| WriteField {
                    column,
                    value: value_text(value),
                })
        })
        .collect();

    if fields.is_empty() {
        return Err(ArticleError::NoFields);
    }
    Ok(fields)
}

fn cast_param(n: usize, column: &LiveColumn) -> String {
    format!("CAST(${n} AS {})", quote_ident(&column.udt_name))
}

/// `INSERT` returning the new primary key as `int4`.
///
/// # Errors
///
/// Returns `ArticleError::MissingPrimaryKey` when the table has no primary key column.
pub fn insert(schema: &ArticleSchema, fields: &[WriteField<'_>]) -> Result<Statement, ArticleError> {
    let pk = schema.primary_key().ok_or(ArticleError::MissingPrimaryKey)?;

    let names = fields
        .iter()
        .map(|f| quote_ident(&f.column.actual))
        .collect::<Vec<_>>()
        .join(", ");
    let values = fields
        .iter()
        .enumerate()
        .map(|(i, f)| cast_param(i + 1, f.column))
        .collect::<Vec<_>>()
        .join(", ");

    Ok(Statement {
        sql: format!(
            "INSERT INTO {} ({names}) VALUES ({values}) RETURNING CAST({} AS int4)",
            quote_ident(&schema.table),
            quote_ident(&pk.actual)
        ),
        params: fields.iter().map(|f| f.value.clone()).collect(),
    })
}

/// `UPDATE` by primary key; the key is the last parameter and is bound
/// separately as `int4`.
///
/// # Errors
///
/// Returns `ArticleError::MissingPrimaryKey` when the table has no primary key column.
pub fn update(schema: &ArticleSchema, fields: &[WriteField<'_>]) -> Result<Statement, ArticleError> {
    let pk = schema.primary_key().ok_or(ArticleError::MissingPrimaryKey)?;

    let assignments = fields
        .iter()
        .enumerate()
        .map(|(i, f)| format!("{} = {}", quote_ident(&f.column.actual), cast_param(i + 1, f.column)))
        .collect::<Vec<_>>()
        .join(", ");

    Ok(Statement {
        sql: format!(
            "UPDATE {} SET {assignments} WHERE {} = ${}",
            quote_ident(&schema.table),
            quote_ident(&pk.actual),
            fields.len() + 1
        ),
        params: fields.iter().map(|f| f.value.clone()).collect(),
    })
}

/// `DELETE` by primary key (`$1`).
///
/// # Errors
///
/// Returns `ArticleError::MissingPrimaryKey` when the table has no primary key column.
pub fn delete(schema: &ArticleSchema) -> Result<String, ArticleError> {
    let pk = schema.primary_key().ok_or(ArticleError::MissingPrimaryKey)?;
    Ok(format!(
        "DELETE FROM {} WHERE {} = $1",
        quote_ident(&schema.table),
        quote_ident(&pk.actual)
    ))
}

/// The barcode being written, if `fields` set one.
#[must_use]
pub fn barcode_value<'f>(schema: &ArticleSchema, fields: &'f [WriteField<'_>]) -> Option<&'f str> {
    fields
        .iter()
        .find(|f| f.column.canonical == schema.variant.barcode())
        .and_then(|f| f.value.as_deref())
}

/// Whether another row already carries barcode `$1`; `$2` is the primary key
/// to ignore on updates, `NULL` on inserts.
///
/// # Errors
///
/// Returns `ArticleError::MissingPrimaryKey` when the table has no primary key
/// column, and `ArticleError::NoFields` when it has no barcode column.
pub fn barcode_taken(schema: &ArticleSchema) -> Result<String, ArticleError> {
    let pk = schema.primary_key().ok_or(ArticleError::MissingPrimaryKey)?;
    let barcode = schema.barcode().ok_or(ArticleError::NoFields)?;
    Ok(format!(
        "SELECT EXISTS (SELECT 1 FROM {} WHERE CAST({} AS text) = $1 \
         AND ($2::int4 IS NULL OR {} <> $2))",
        quote_ident(&schema.table),
        quote_ident(&barcode.actual),
        quote_ident(&pk.actual)
    ))
}
