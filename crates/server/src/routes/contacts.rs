//! Client and supplier handlers (employer or admin).
//!
//! Both resources share one implementation parameterized by
//! [`ContactKind`]; [`clients`] and [`suppliers`] bind the kind for the router.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

use crate::db::contacts::ContactInput;
use crate::db::{ContactKind, ContactRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::extract::Json;
use crate::state::AppState;

/// Query parameters for contact lists.
#[derive(Debug, Default, Deserialize)]
pub struct ContactQuery {
    pub search: Option<String>,
}

fn not_found(kind: ContactKind) -> impl FnOnce(RepositoryError) -> AppError {
    move |e| match e {
        RepositoryError::NotFound => AppError::NotFound(format!("{} not found", kind.noun())),
        other => other.into(),
    }
}

async fn list(state: &AppState, kind: ContactKind, query: ContactQuery) -> Result<Response> {
    let search = query.search.filter(|s| !s.trim().is_empty());
    let contacts = ContactRepository::new(state.pool(), kind)
        .list(search.as_deref())
        .await?;
    let views: Vec<_> = contacts.iter().map(|c| c.view(kind)).collect();
    Ok(Json(views).into_response())
}

async fn get(state: &AppState, kind: ContactKind, id: i32) -> Result<Response> {
    let contact = ContactRepository::new(state.pool(), kind)
        .get(id)
        .await
        .map_err(not_found(kind))?;
    Ok(Json(contact.view(kind)).into_response())
}

async fn create(state: &AppState, kind: ContactKind, input: ContactInput) -> Result<Response> {
    let contact = ContactRepository::new(state.pool(), kind)
        .create(&input)
        .await?;
    tracing::info!(kind = kind.noun(), id = contact.id, "Contact created");
    Ok((StatusCode::CREATED, Json(contact.view(kind))).into_response())
}

async fn update(
    state: &AppState,
    kind: ContactKind,
    id: i32,
    input: ContactInput,
) -> Result<Response> {
    let contact = ContactRepository::new(state.pool(), kind)
        .update(id, &input)
        .await
        .map_err(not_found(kind))?;
    tracing::info!(kind = kind.noun(), id, "Contact updated");
    Ok(Json(contact.view(kind)).into_response())
}

async fn delete(state: &AppState, kind: ContactKind, id: i32) -> Result<Response> {
    ContactRepository::new(state.pool(), kind)
        .delete(id)
        .await
        .map_err(not_found(kind))?;
    tracing::info!(kind = kind.noun(), id, "Contact deleted");
    Ok(Json(json!({ "success": true })).into_response())
}

/// Generate the five handlers for one contact kind.
macro_rules! contact_handlers {
    ($module:ident, $kind:expr) => {
        #[doc = concat!("Handlers bound to `", stringify!($kind), "`.")]
        pub mod $module {
            use axum::{extract::State, response::Response};

            use super::ContactQuery;
            use crate::db::ContactKind;
            use crate::db::contacts::ContactInput;
            use crate::error::Result;
            use crate::extract::{Json, Path, Query};
            use crate::middleware::RequireStaff;
            use crate::state::AppState;

            const KIND: ContactKind = $kind;

            /// List, optionally filtered by `search`.
            pub async fn index(
                State(state): State<AppState>,
                RequireStaff(_user): RequireStaff,
                Query(query): Query<ContactQuery>,
            ) -> Result<Response> {
                super::list(&state, KIND, query).await
            }

            /// Get one record.
            pub async fn show(
                State(state): State<AppState>,
                RequireStaff(_user): RequireStaff,
                Path(id): Path<i32>,
            ) -> Result<Response> {
                super::get(&state, KIND, id).await
            }

            /// Create a record; `credit` defaults to 0.
            pub async fn create(
                State(state): State<AppState>,
                RequireStaff(_user): RequireStaff,
                Json(input): Json<ContactInput>,
            ) -> Result<Response> {
                super::create(&state, KIND, input).await
            }

            /// Replace a record.
            pub async fn update(
                State(state): State<AppState>,
                RequireStaff(_user): RequireStaff,
                Path(id): Path<i32>,
                Json(input): Json<ContactInput>,
            ) -> Result<Response> {
                super::update(&state, KIND, id, input).await
            }

            /// Delete a record.
            pub async fn destroy(
                State(state): State<AppState>,
                RequireStaff(_user): RequireStaff,
                Path(id): Path<i32>,
            ) -> Result<Response> {
                super::delete(&state, KIND, id).await
            }
        }
    };
}

contact_handlers!(clients, ContactKind::Client);
contact_handlers!(suppliers, ContactKind::Supplier);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_names_the_kind() {
        let err = not_found(ContactKind::Supplier)(RepositoryError::NotFound);
        assert!(matches!(err, AppError::NotFound(msg) if msg.to_lowercase().contains("supplier")));

        let err = not_found(ContactKind::Client)(RepositoryError::Referenced);
        assert!(matches!(err, AppError::Database(RepositoryError::Referenced)));
    }
}
