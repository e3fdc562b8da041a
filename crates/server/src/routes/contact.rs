//! Public contact form.

use axum::extract::State;
use serde_json::json;

use atelier_core::Email;

use crate::error::{AppError, Result};
use crate::extract::Json;
use crate::services::email::ContactMessage;
use crate::state::AppState;

fn validate(message: &ContactMessage) -> Result<()> {
    for (field, value) in [
        ("name", &message.name),
        ("email", &message.email),
        ("subject", &message.subject),
        ("message", &message.message),
    ] {
        if value.trim().is_empty() {
            return Err(AppError::BadRequest(format!("{field} is required")));
        }
    }
    Email::parse(&message.email)
        .map_err(|e| AppError::BadRequest(format!("Invalid email address: {e}")))?;
    Ok(())
}

/// Forward a contact message to the operator.
#[tracing::instrument(skip_all)]
pub async fn send(
    State(state): State<AppState>,
    Json(message): Json<ContactMessage>,
) -> Result<Json<serde_json::Value>> {
    validate(&message)?;
    state.email()?.send_contact(&message).await?;
    Ok(Json(json!({ "message": "Email sent successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(email: &str, subject: &str) -> ContactMessage {
        ContactMessage {
            name: "Yasmine".to_string(),
            email: email.to_string(),
            subject: subject.to_string(),
            message: "Bonjour, je voudrais un devis.".to_string(),
        }
    }

    #[test]
    fn test_validate() {
        assert!(validate(&message("yasmine@example.tn", "Devis")).is_ok());
        assert!(matches!(
            validate(&message("yasmine@example.tn", "  ")),
            Err(AppError::BadRequest(msg)) if msg == "subject is required"
        ));
        assert!(matches!(
            validate(&message("not-an-email", "Devis")),
            Err(AppError::BadRequest(_))
        ));
    }
}
