//! Order submission.
//!
//! The cart is client-owned and arrives whole; nothing is persisted. The
//! order is rendered and mailed to the operator.

use axum::extract::State;
use serde::{Deserialize, Serialize};

use atelier_core::{Cart, CartError, CartItem};

use crate::error::{AppError, Result};
use crate::extract::Json;
use crate::middleware::OptionalAuth;
use crate::services::email::OrderSummary;
use crate::state::AppState;

/// Name recorded for orders placed without a session.
pub const GUEST_USERNAME: &str = "Guest";

/// Order request body.
#[derive(Debug, Deserialize)]
pub struct OrderRequest {
    #[serde(default)]
    pub items: Vec<CartItem>,
}

/// Order confirmation.
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub message: &'static str,
    pub username: String,
}

fn invalid_cart(e: CartError) -> AppError {
    AppError::BadRequest(format!("Invalid cart: {e}"))
}

/// Merge lines for the same article and reject an empty order or one whose
/// totals cannot be computed.
fn build_cart(items: Vec<CartItem>) -> Result<Cart> {
    let cart = Cart::try_from(items).map_err(invalid_cart)?;
    if cart.item_count().map_err(invalid_cart)? == 0 {
        return Err(AppError::BadRequest("Cart is empty".to_string()));
    }
    cart.total_with_tax().map_err(invalid_cart)?;
    Ok(cart)
}

/// Email the order to the operator.
#[tracing::instrument(skip_all)]
pub async fn submit(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Json(order): Json<OrderRequest>,
) -> Result<Json<OrderResponse>> {
    let cart = build_cart(order.items)?;
    let username = user.map_or_else(|| GUEST_USERNAME.to_string(), |u| u.username);

    let summary = OrderSummary::new(&username, &cart).map_err(invalid_cart)?;
    state.email()?.send_order(&summary).await?;

    tracing::info!(
        username = %username,
        lines = cart.items().len(),
        total = %summary.total,
        "Order submitted"
    );

    Ok(Json(OrderResponse {
        message: "Order submitted successfully",
        username,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn items(json: serde_json::Value) -> Vec<CartItem> {
        serde_json::from_value::<OrderRequest>(json).unwrap().items
    }

    #[test]
    fn test_empty_cart_is_rejected() {
        assert!(matches!(
            build_cart(items(json!({ "items": [] }))),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            build_cart(items(json!({}))),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_duplicate_lines_merge() {
        let cart = build_cart(items(json!({
            "items": [
                { "article": { "id": 1, "name": "Vis", "price": "10" }, "quantity": 1 },
                { "article": { "id": 1, "name": "Vis", "price": "10" }, "quantity": 2 },
                { "article": { "id": 2, "nom": "Colle", "prix": "3.33" }, "quantity": 1 },
            ]
        })))
        .unwrap();

        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.item_count().unwrap(), 4);
        assert_eq!(cart.total_with_tax().unwrap().amount().to_string(), "39.66");
    }

    #[test]
    fn test_quantity_overflow_is_bad_request() {
        let merged = build_cart(items(json!({
            "items": [
                { "article": { "id": 1, "name": "Vis", "price": "1" }, "quantity": u32::MAX },
                { "article": { "id": 1, "name": "Vis", "price": "1" }, "quantity": 1 },
            ]
        })));
        assert!(matches!(merged, Err(AppError::BadRequest(msg)) if msg.contains("quantity")));

        let counted = build_cart(items(json!({
            "items": [
                { "article": { "id": 1, "name": "Vis", "price": "1" }, "quantity": u32::MAX },
                { "article": { "id": 2, "name": "Colle", "price": "1" }, "quantity": 1 },
            ]
        })));
        assert!(matches!(counted, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_amount_overflow_is_bad_request() {
        let result = build_cart(items(json!({
            "items": [
                {
                    "article": { "id": 1, "name": "Lingot", "price": "70000000000000000000000000000" },
                    "quantity": 4
                },
            ]
        })));
        assert!(matches!(result, Err(AppError::BadRequest(msg)) if msg.contains("amount")));
    }
}
