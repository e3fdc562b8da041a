//! Article rows and the canonical [`Article`].
//!
//! Rows come back from Postgres as `row_to_json` documents keyed by canonical
//! column names. They are decoded into the variant for the live layout and
//! converted into one `Article`, which always serializes with the legacy
//! field names the front end was written against.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use atelier_core::{ArticleId, CartArticle, Price};

use super::schema::SchemaVariant;

/// A row of the legacy `art` table.
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyArticle {
    #[serde(rename = "Art_ID")]
    pub id: i32,
    #[serde(rename = "Art_CodBar", default)]
    pub barcode: Option<String>,
    #[serde(rename = "Art_Desig", default)]
    pub designation: Option<String>,
    #[serde(rename = "Art_Unite", default)]
    pub unit: Option<String>,
    #[serde(rename = "Art_PuAcht", default)]
    pub purchase_price: Option<Decimal>,
    #[serde(rename = "Art_PURv", default)]
    pub sale_price: Option<Decimal>,
    #[serde(rename = "Art_StkIni", default)]
    pub stock_quantity: Option<Decimal>,
    #[serde(rename = "Art_StkMini", default)]
    pub stock_min: Option<Decimal>,
    #[serde(rename = "Art_StkMaxi", default)]
    pub stock_max: Option<Decimal>,
    #[serde(rename = "Art_RefFr", default)]
    pub supplier_ref: Option<String>,
    /// Every other `Art_*` column, passed through untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A row of the modern `article` table.
#[derive(Debug, Clone, Deserialize)]
pub struct ModernArticle {
    pub id: i32,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub designation: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub quantity: Option<Decimal>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// A decoded row, tagged by layout.
#[derive(Debug, Clone)]
pub enum ArticleRow {
    Legacy(LegacyArticle),
    Modern(ModernArticle),
}

impl ArticleRow {
    /// Decode a `row_to_json` document for `variant`.
    ///
    /// # Errors
    ///
    /// Returns the serde error when the document does not fit the layout.
    pub fn decode(variant: SchemaVariant, doc: Value) -> Result<Self, serde_json::Error> {
        Ok(match variant {
            SchemaVariant::Legacy => Self::Legacy(serde_json::from_value(doc)?),
            SchemaVariant::Modern => Self::Modern(serde_json::from_value(doc)?),
        })
    }
}

/// An article independent of the table layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Article {
    #[serde(rename = "Art_ID")]
    pub id: ArticleId,
    #[serde(rename = "Art_CodBar", skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    #[serde(rename = "Art_Desig", skip_serializing_if = "Option::is_none")]
    pub designation: Option<String>,
    #[serde(rename = "Art_Unite", skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(
        rename = "Art_PuAcht",
        serialize_with = "number",
        skip_serializing_if = "Option::is_none"
    )]
    pub purchase_price: Option<Decimal>,
    #[serde(
        rename = "Art_PURv",
        serialize_with = "number",
        skip_serializing_if = "Option::is_none"
    )]
    pub sale_price: Option<Decimal>,
    #[serde(
        rename = "Art_StkIni",
        serialize_with = "number",
        skip_serializing_if = "Option::is_none"
    )]
    pub stock_quantity: Option<Decimal>,
    #[serde(
        rename = "Art_StkMini",
        serialize_with = "number",
        skip_serializing_if = "Option::is_none"
    )]
    pub stock_min: Option<Decimal>,
    #[serde(
        rename = "Art_StkMaxi",
        serialize_with = "number",
        skip_serializing_if = "Option::is_none"
    )]
    pub stock_max: Option<Decimal>,
    #[serde(rename = "Art_RefFr", skip_serializing_if = "Option::is_none")]
    pub supplier_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Emit a decimal as a JSON number: integral values as integers, others as floats.
#[allow(clippy::ref_option)]
fn number<S: Serializer>(value: &Option<Decimal>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(d) if d.fract().is_zero() => match d.to_i64() {
            Some(i) => serializer.serialize_i64(i),
            None => serializer.serialize_f64(d.to_f64().unwrap_or_default()),
        },
        Some(d) => serializer.serialize_f64(d.to_f64().unwrap_or_default()),
        None => serializer.serialize_none(),
    }
}

impl From<LegacyArticle> for Article {
    fn from(row: LegacyArticle) -> Self {
        Self {
            id: ArticleId::new(row.id),
            barcode: row.barcode,
            designation: row.designation,
            unit: row.unit,
            purchase_price: row.purchase_price,
            sale_price: row.sale_price,
            stock_quantity: row.stock_quantity,
            stock_min: row.stock_min,
            stock_max: row.stock_max,
            supplier_ref: row.supplier_ref,
            description: None,
            category: None,
            extra: row.extra,
        }
    }
}

impl From<ModernArticle> for Article {
    fn from(row: ModernArticle) -> Self {
        Self {
            id: ArticleId::new(row.id),
            barcode: row.code,
            designation: row.designation,
            unit: row.unit,
            // The modern table has a single price used for both.
            purchase_price: row.price,
            sale_price: row.price,
            stock_quantity: row.quantity,
            stock_min: None,
            stock_max: None,
            supplier_ref: None,
            description: row.description,
            category: row.category,
            extra: BTreeMap::new(),
        }
    }
}

impl From<ArticleRow> for Article {
    fn from(row: ArticleRow) -> Self {
        match row {
            ArticleRow::Legacy(r) => r.into(),
            ArticleRow::Modern(r) => r.into(),
        }
    }
}

impl Article {
    /// Name shown to customers: designation, else barcode, else the id.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.designation
            .clone()
            .or_else(|| self.barcode.clone())
            .unwrap_or_else(|| format!("Article {}", self.id))
    }

    /// Pre-tax selling price, falling back to the purchase price.
    #[must_use]
    pub fn selling_price(&self) -> Price {
        Price::new(
            self.sale_price
                .or(self.purchase_price)
                .unwrap_or(Decimal::ZERO),
        )
    }

    /// The slice of the article a cart holds.
    #[must_use]
    pub fn to_cart_article(&self) -> CartArticle {
        CartArticle {
            id: self.id,
            name: self.display_name(),
            price: self.selling_price(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn legacy_doc() -> Value {
        json!({
            "Art_ID": 7,
            "Art_CodBar": "6191234567890",
            "Art_Desig": "Peinture blanche 5L",
            "Art_Unite": "pot",
            "Art_PuAcht": 42.5,
            "Art_PURv": 55.9,
            "Art_StkIni": 3,
            "Art_StkMini": 5,
            "Art_StkMaxi": 40,
            "Art_RefFr": "SUP-88",
            "Art_Tva": 19,
            "Societe_id": 1,
        })
    }

    #[test]
    fn test_legacy_row_round_trips_field_names() {
        let row = ArticleRow::decode(SchemaVariant::Legacy, legacy_doc()).unwrap();
        let article = Article::from(row);

        assert_eq!(article.id, ArticleId::new(7));
        assert_eq!(article.extra.len(), 2);
        assert_eq!(serde_json::to_value(&article).unwrap(), legacy_doc());
    }

    #[test]
    fn test_modern_row_maps_to_legacy_names() {
        let doc = json!({
            "id": 1,
            "code": "ART001",
            "designation": "Laptop Dell XPS 13",
            "description": "13 inch ultrabook",
            "price": 1299.99,
            "quantity": 15,
            "unit": "piece",
            "category": "electronics",
        });
        let article = Article::from(ArticleRow::decode(SchemaVariant::Modern, doc).unwrap());

        assert_eq!(
            serde_json::to_value(&article).unwrap(),
            json!({
                "Art_ID": 1,
                "Art_CodBar": "ART001",
                "Art_Desig": "Laptop Dell XPS 13",
                "Art_Unite": "piece",
                "Art_PuAcht": 1299.99,
                "Art_PURv": 1299.99,
                "Art_StkIni": 15,
                "description": "13 inch ultrabook",
                "category": "electronics",
            })
        );
    }

    #[test]
    fn test_modern_row_with_nulls() {
        let doc = json!({ "id": 2, "code": null, "designation": null, "price": null });
        let article = Article::from(ArticleRow::decode(SchemaVariant::Modern, doc).unwrap());

        assert_eq!(serde_json::to_value(&article).unwrap(), json!({ "Art_ID": 2 }));
        assert_eq!(article.display_name(), "Article 2");
        assert_eq!(article.selling_price(), Price::ZERO);
    }

    #[test]
    fn test_wrong_variant_fails_to_decode() {
        assert!(ArticleRow::decode(SchemaVariant::Modern, legacy_doc()).is_err());
    }

    #[test]
    fn test_cart_article_prefers_sale_price() {
        let article = Article::from(ArticleRow::decode(SchemaVariant::Legacy, legacy_doc()).unwrap());
        let cart = article.to_cart_article();

        assert_eq!(cart.name, "Peinture blanche 5L");
        assert_eq!(cart.price, Price::new("55.9".parse().unwrap()));
    }
}
