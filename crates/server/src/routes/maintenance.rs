//! Back-office maintenance: table bootstrap, schema cache refresh and
//! read-only table inspection.

use axum::extract::State;
use serde_json::{Value, json};

use crate::db::articles::{SchemaVariant, init_modern_table};
use crate::db::introspect::{is_valid_table_name, list_tables, sample_rows, table_columns};
use crate::error::{AppError, Result};
use crate::extract::{Json, Path};
use crate::middleware::RequireStaff;
use crate::state::AppState;

/// Create the modern `article` table if missing and seed it when empty.
pub async fn init_db(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
) -> Result<Json<Value>> {
    let report = init_modern_table(state.pool(), state.schemas()).await?;
    tracing::info!(user_id = %user.id, seeded = report.seeded, "Article table initialized");

    let message = if report.seeded > 0 {
        "Database initialized with sample data"
    } else {
        "Database already contains data"
    };

    Ok(Json(json!({
        "status": "success",
        "message": message,
        "articlesAdded": report.seeded,
        "articleCount": report.article_count,
    })))
}

const fn variant_name(variant: SchemaVariant) -> &'static str {
    match variant {
        SchemaVariant::Legacy => "legacy",
        SchemaVariant::Modern => "modern",
    }
}

/// Forget the cached article layout and detect it again.
pub async fn refresh_schema(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
) -> Result<Json<Value>> {
    state.schemas().invalidate().await;
    let schema = state.schemas().get(state.pool()).await?;

    tracing::info!(
        user_id = %user.id,
        table = %schema.table,
        columns = schema.columns.len(),
        "Article schema refreshed"
    );

    let columns: Vec<&str> = schema.columns.iter().map(|c| c.actual.as_str()).collect();
    Ok(Json(json!({
        "status": "success",
        "variant": variant_name(schema.variant),
        "table": schema.table,
        "columns": columns,
        "barcodeUnique": schema.barcode_unique,
    })))
}

/// List the tables of the current schema.
pub async fn tables(
    State(state): State<AppState>,
    RequireStaff(_user): RequireStaff,
) -> Result<Json<Value>> {
    let tables = list_tables(state.pool()).await?;
    Ok(Json(json!({ "status": "success", "tables": tables })))
}

/// Columns and first rows of one table.
pub async fn table_rows(
    State(state): State<AppState>,
    RequireStaff(_user): RequireStaff,
    Path(table): Path<String>,
) -> Result<Json<Value>> {
    if !is_valid_table_name(&table) {
        return Err(AppError::BadRequest("Invalid table name".to_string()));
    }

    let pool = state.pool();
    if !list_tables(pool).await?.contains(&table) {
        return Err(AppError::NotFound(format!("Table {table} not found")));
    }

    let columns = table_columns(pool, &table).await?;
    let data = sample_rows(pool, &table).await?;

    Ok(Json(json!({
        "status": "success",
        "table": table,
        "columns": columns,
        "data": data,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_name() {
        assert_eq!(variant_name(SchemaVariant::Legacy), "legacy");
        assert_eq!(variant_name(SchemaVariant::Modern), "modern");
    }
}
