//! Back-office article handlers (employer or admin).
//!
//! Bodies are free-form JSON objects: keys are matched against the live
//! article columns and anything else is ignored.

use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};

use atelier_core::ArticleId;

use crate::db::ArticleRepository;
use crate::db::articles::{Article, ArticleFilter};
use crate::error::Result;
use crate::extract::{Json, Path, Query};
use crate::middleware::RequireStaff;
use crate::state::AppState;

/// Query parameters for the article list.
#[derive(Debug, Default, Deserialize)]
pub struct ArticleQuery {
    pub search: Option<String>,
    #[serde(alias = "lowStock")]
    pub low_stock: Option<bool>,
}

impl From<ArticleQuery> for ArticleFilter {
    fn from(query: ArticleQuery) -> Self {
        Self {
            search: query.search.filter(|s| !s.trim().is_empty()),
            low_stock: query.low_stock.unwrap_or(false),
        }
    }
}

/// List articles.
pub async fn index(
    State(state): State<AppState>,
    RequireStaff(_user): RequireStaff,
    Query(query): Query<ArticleQuery>,
) -> Result<Json<Vec<Article>>> {
    let articles = ArticleRepository::new(state.pool(), state.schemas())
        .list(&query.into())
        .await?;
    Ok(Json(articles))
}

/// Get one article.
pub async fn show(
    State(state): State<AppState>,
    RequireStaff(_user): RequireStaff,
    Path(id): Path<i32>,
) -> Result<Json<Article>> {
    let article = ArticleRepository::new(state.pool(), state.schemas())
        .get(ArticleId::new(id))
        .await?;
    Ok(Json(article))
}

/// Create an article.
pub async fn create(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Article>)> {
    let article = ArticleRepository::new(state.pool(), state.schemas())
        .create(&body)
        .await?;

    tracing::info!(user_id = %user.id, article_id = %article.id, "Article created");
    Ok((StatusCode::CREATED, Json(article)))
}

/// Update the supplied fields of an article.
pub async fn update(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    Path(id): Path<i32>,
    Json(body): Json<Value>,
) -> Result<Json<Article>> {
    let article = ArticleRepository::new(state.pool(), state.schemas())
        .update(ArticleId::new(id), &body)
        .await?;

    tracing::info!(user_id = %user.id, article_id = %article.id, "Article updated");
    Ok(Json(article))
}

/// Delete an article.
pub async fn destroy(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    Path(id): Path<i32>,
) -> Result<Json<Value>> {
    ArticleRepository::new(state.pool(), state.schemas())
        .delete(ArticleId::new(id))
        .await?;

    tracing::info!(user_id = %user.id, article_id = id, "Article deleted");
    Ok(Json(json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_to_filter() {
        let filter = ArticleFilter::from(ArticleQuery {
            search: Some("  ".to_string()),
            low_stock: None,
        });
        assert_eq!(filter.search, None);
        assert!(!filter.low_stock);

        let filter = ArticleFilter::from(ArticleQuery {
            search: Some("vis".to_string()),
            low_stock: Some(true),
        });
        assert_eq!(filter.search.as_deref(), Some("vis"));
        assert!(filter.low_stock);
    }
}
