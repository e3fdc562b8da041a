//! Shopping cart.
//!
//! The cart lives on the client and is sent whole with the order. The server
//! deserializes it into [`Cart`] to compute the same totals the client showed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{AmountOverflow, ArticleId, Price};

/// A cart whose quantities or totals cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CartError {
    /// Unit count exceeds `u32`.
    #[error("quantity is too large")]
    QuantityOverflow,

    /// A line or cart total exceeds the decimal range.
    #[error(transparent)]
    Amount(#[from] AmountOverflow),
}

/// The slice of an article a cart needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartArticle {
    /// Article primary key.
    pub id: ArticleId,
    /// Display name.
    #[serde(alias = "nom")]
    pub name: String,
    /// Unit price before tax.
    #[serde(alias = "prix")]
    pub price: Price,
}

/// One cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// The article on this line.
    pub article: CartArticle,
    /// Number of units.
    pub quantity: u32,
}

impl CartItem {
    /// Unit price including tax.
    ///
    /// # Errors
    ///
    /// Returns [`AmountOverflow`] for a price too large to tax.
    pub fn unit_price_with_tax(&self) -> Result<Price, AmountOverflow> {
        self.article.price.with_tax()
    }

    /// Line total including tax, unrounded.
    ///
    /// # Errors
    ///
    /// Returns [`AmountOverflow`] if the total leaves the decimal range.
    pub fn line_total_with_tax(&self) -> Result<Price, AmountOverflow> {
        self.unit_price_with_tax()?.times(self.quantity)
    }
}

/// An ordered list of cart lines, at most one per article.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Add one unit of `article`.
    ///
    /// Bumps the quantity when the article is already in the cart, otherwise
    /// appends a new line with quantity 1.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::QuantityOverflow`] if the line is already full.
    pub fn add(&mut self, article: CartArticle) -> Result<(), CartError> {
        self.push(CartItem {
            article,
            quantity: 1,
        })
    }

    /// Append `item`, merging it into the line for the same article.
    fn push(&mut self, item: CartItem) -> Result<(), CartError> {
        match self
            .items
            .iter_mut()
            .find(|i| i.article.id == item.article.id)
        {
            Some(existing) => {
                existing.quantity = existing
                    .quantity
                    .checked_add(item.quantity)
                    .ok_or(CartError::QuantityOverflow)?;
            }
            None => self.items.push(item),
        }
        Ok(())
    }

    /// Drop the line for `id`, if any.
    pub fn remove(&mut self, id: ArticleId) {
        self.items.retain(|i| i.article.id != id);
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// `true` when the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units across all lines.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::QuantityOverflow`] if the count exceeds `u32`.
    pub fn item_count(&self) -> Result<u32, CartError> {
        self.items.iter().try_fold(0_u32, |count, item| {
            count
                .checked_add(item.quantity)
                .ok_or(CartError::QuantityOverflow)
        })
    }

    /// Sum of tax-inclusive line totals, rounded to cents.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Amount`] if a line or the sum leaves the decimal range.
    pub fn total_with_tax(&self) -> Result<Price, CartError> {
        let total = self.items.iter().try_fold(Price::ZERO, |total, item| {
            total.checked_add(item.line_total_with_tax()?)
        })?;
        Ok(total.rounded())
    }
}

impl TryFrom<Vec<CartItem>> for Cart {
    type Error = CartError;

    fn try_from(items: Vec<CartItem>) -> Result<Self, Self::Error> {
        let mut cart = Self::new();
        for item in items {
            cart.push(item)?;
        }
        Ok(cart)
    }
}
