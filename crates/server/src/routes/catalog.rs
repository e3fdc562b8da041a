//! Public catalog.
//!
//! A read-only projection of the article table for the storefront, with
//! prices before and after tax computed by [`Price::with_tax`].

use axum::extract::State;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use atelier_core::{AmountOverflow, ArticleId, Price};

use crate::db::ArticleRepository;
use crate::db::articles::{Article, ArticleFilter};
use crate::error::{AppError, Result};
use crate::extract::{Json, Query};
use crate::state::AppState;

/// Query parameters for the catalog.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
    pub search: Option<String>,
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub id: ArticleId,
    pub name: String,
    pub unit: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub price_with_tax: Decimal,
}

impl TryFrom<&Article> for CatalogEntry {
    type Error = AmountOverflow;

    fn try_from(article: &Article) -> std::result::Result<Self, Self::Error> {
        let price: Price = article.selling_price();
        Ok(Self {
            id: article.id,
            name: article.display_name(),
            unit: article.unit.clone(),
            price: price.rounded().amount(),
            price_with_tax: price.with_tax()?.rounded().amount(),
        })
    }
}

/// List catalog entries, optionally filtered by `search`.
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<Vec<CatalogEntry>>> {
    let filter = ArticleFilter {
        search: query.search.filter(|s| !s.trim().is_empty()),
        low_stock: false,
    };
    let articles = ArticleRepository::new(state.pool(), state.schemas())
        .list(&filter)
        .await?;

    let entries = articles
        .iter()
        .map(|article| {
            CatalogEntry::try_from(article).map_err(|e| {
                AppError::Internal(format!("price of article {}: {e}", article.id))
            })
        })
        .collect::<Result<_>>()?;

    Ok(Json(entries))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::db::articles::{ArticleRow, SchemaVariant};

    #[test]
    fn test_entry_from_legacy_article() {
        let row = ArticleRow::decode(
            SchemaVariant::Legacy,
            json!({
                "Art_ID": 7,
                "Art_CodBar": "6191234567890",
                "Art_Desig": "Perceuse 500W",
                "Art_Unite": "piece",
                "Art_PuAcht": 80,
                "Art_PURv": "120.50",
            }),
        )
        .unwrap();
        let entry = CatalogEntry::try_from(&Article::from(row)).unwrap();

        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            json!({
                "id": 7,
                "name": "Perceuse 500W",
                "unit": "piece",
                "price": 120.5,
                "price_with_tax": 143.4,
            })
        );
    }
}
