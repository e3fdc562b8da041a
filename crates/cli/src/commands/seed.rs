//! Sample data commands.

use atelier_server::db::SchemaCache;
use atelier_server::db::articles::init_modern_table;

use super::{CliError, connect};

/// Create the modern `article` table if missing and seed it when empty.
pub async fn articles() -> Result<(), CliError> {
    let pool = connect().await?;

    let report = init_modern_table(&pool, &SchemaCache::new()).await?;

    if report.seeded == 0 {
        tracing::info!(
            "Article table already contains {} rows, nothing seeded",
            report.article_count
        );
    } else {
        tracing::info!("Seeded {} sample articles", report.seeded);
    }
    Ok(())
}
