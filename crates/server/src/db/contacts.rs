//! Clients and suppliers.
//!
//! Both live in tables with the same shape and differ only in the table and
//! primary key names, so one repository serves both through [`ContactKind`].

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use sqlx::PgPool;

use super::{RepositoryError, like_pattern};

/// Which contact table a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactKind {
    Client,
    Supplier,
}

impl ContactKind {
    /// Table name.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Client => "client_local",
            Self::Supplier => "fournisseur",
        }
    }

    /// Primary key column, also the id key in JSON.
    #[must_use]
    pub const fn id_column(self) -> &'static str {
        match self {
            Self::Client => "id_cl",
            Self::Supplier => "id_fr",
        }
    }

    /// Singular noun for messages.
    #[must_use]
    pub const fn noun(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Supplier => "supplier",
        }
    }
}

/// A client or supplier record.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Contact {
    pub id: i32,
    #[sqlx(rename = "nom")]
    pub last_name: String,
    #[sqlx(rename = "prenom")]
    pub first_name: Option<String>,
    pub email: Option<String>,
    #[sqlx(rename = "tlf")]
    pub phone: Option<String>,
    #[sqlx(rename = "mf")]
    pub tax_id: Option<String>,
    pub credit: Decimal,
}

impl Contact {
    /// Pair the record with its kind for serialization.
    #[must_use]
    pub const fn view(&self, kind: ContactKind) -> ContactView<'_> {
        ContactView {
            kind,
            contact: self,
        }
    }
}

/// JSON form of a [`Contact`], keyed by the table's column names.
#[derive(Debug, Clone, Copy)]
pub struct ContactView<'a> {
    kind: ContactKind,
    contact: &'a Contact,
}

impl Serialize for ContactView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let c = self.contact;
        let mut map = serializer.serialize_map(Some(7))?;
        map.serialize_entry(self.kind.id_column(), &c.id)?;
        map.serialize_entry("nom", &c.last_name)?;
        map.serialize_entry("prenom", &c.first_name)?;
        map.serialize_entry("email", &c.email)?;
        map.serialize_entry("tlf", &c.phone)?;
        map.serialize_entry("mf", &c.tax_id)?;
        map.serialize_entry("credit", &c.credit.to_f64())?;
        map.end()
    }
}

/// Request body for creating or replacing a contact.
#[derive(Debug, Clone, Deserialize)]
pub struct ContactInput {
    #[serde(rename = "nom")]
    pub last_name: String,
    #[serde(rename = "prenom", default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "tlf", default)]
    pub phone: Option<String>,
    #[serde(rename = "mf", default)]
    pub tax_id: Option<String>,
    #[serde(default)]
    pub credit: Option<Decimal>,
}

impl ContactInput {
    fn validate(&self) -> Result<(), RepositoryError> {
        if self.last_name.trim().is_empty() {
            return Err(RepositoryError::InvalidInput("nom is required".to_owned()));
        }
        Ok(())
    }
}

/// Repository for `client_local` / `fournisseur`.
pub struct ContactRepository<'a> {
    pool: &'a PgPool,
    kind: ContactKind,
}

impl<'a> ContactRepository<'a> {
    /// Create a repository over the table for `kind`.
    #[must_use]
    pub const fn new(pool: &'a PgPool, kind: ContactKind) -> Self {
        Self { pool, kind }
    }

    fn select(&self) -> String {
        format!(
            "SELECT {} AS id, nom, prenom, email, tlf, mf, COALESCE(credit, 0) AS credit FROM {}",
            self.kind.id_column(),
            self.kind.table()
        )
    }

    /// List contacts ordered by last then first name.
    ///
    /// `search` matches last name, first name, email or tax id, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, search: Option<&str>) -> Result<Vec<Contact>, RepositoryError> {
        let search = search.map(str::trim).filter(|s| !s.is_empty());

        let rows = match search {
            Some(term) => {
                sqlx::query_as::<_, Contact>(&format!(
                    "{} WHERE nom ILIKE $1 OR prenom ILIKE $1 OR email ILIKE $1 OR mf ILIKE $1 \
                     ORDER BY nom, prenom",
                    self.select()
                ))
                .bind(like_pattern(term))
                .fetch_all(self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Contact>(&format!("{} ORDER BY nom, prenom", self.select()))
                    .fetch_all(self.pool)
                    .await?
            }
        };

        Ok(rows)
    }

    /// Get one contact.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no row has `id`.
    pub async fn get(&self, id: i32) -> Result<Contact, RepositoryError> {
        sqlx::query_as::<_, Contact>(&format!(
            "{} WHERE {} = $1",
            self.select(),
            self.kind.id_column()
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Insert a contact. Missing credit defaults to zero.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidInput` if `nom` is blank or a value is
    /// rejected by the database.
    pub async fn create(&self, input: &ContactInput) -> Result<Contact, RepositoryError> {
        input.validate()?;

        sqlx::query_as::<_, Contact>(&format!(
            "INSERT INTO {} (nom, prenom, email, tlf, mf, credit) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {} AS id, nom, prenom, email, tlf, mf, COALESCE(credit, 0) AS credit",
            self.kind.table(),
            self.kind.id_column()
        ))
        .bind(input.last_name.trim())
        .bind(input.first_name.as_deref())
        .bind(input.email.as_deref())
        .bind(input.phone.as_deref())
        .bind(input.tax_id.as_deref())
        .bind(input.credit.unwrap_or(Decimal::ZERO))
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "duplicate contact"))
    }

    /// Replace every field of a contact.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no row has `id`.
    pub async fn update(&self, id: i32, input: &ContactInput) -> Result<Contact, RepositoryError> {
        input.validate()?;

        sqlx::query_as::<_, Contact>(&format!(
            "UPDATE {table} SET nom = $2, prenom = $3, email = $4, tlf = $5, mf = $6, credit = $7 \
             WHERE {pk} = $1 \
             RETURNING {pk} AS id, nom, prenom, email, tlf, mf, COALESCE(credit, 0) AS credit",
            table = self.kind.table(),
            pk = self.kind.id_column()
        ))
        .bind(id)
        .bind(input.last_name.trim())
        .bind(input.first_name.as_deref())
        .bind(input.email.as_deref())
        .bind(input.phone.as_deref())
        .bind(input.tax_id.as_deref())
        .bind(input.credit.unwrap_or(Decimal::ZERO))
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "duplicate contact"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a contact.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no row has `id`, or
    /// `RepositoryError::Referenced` if other rows point at it.
    pub async fn delete(&self, id: i32) -> Result<(), RepositoryError> {
        let result = sqlx::query(&format!(
            "DELETE FROM {} WHERE {} = $1",
            self.kind.table(),
            self.kind.id_column()
        ))
        .bind(id)
        .execute(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "duplicate contact"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn contact() -> Contact {
        Contact {
            id: 12,
            last_name: "Ben Salah".to_string(),
            first_name: Some("Amel".to_string()),
            email: None,
            phone: Some("+216 71 000 000".to_string()),
            tax_id: Some("1234567/A".to_string()),
            credit: "150.5".parse().unwrap(),
        }
    }

    #[test]
    fn test_view_uses_kind_id_key() {
        let c = contact();
        let client = serde_json::to_value(c.view(ContactKind::Client)).unwrap();
        let supplier = serde_json::to_value(c.view(ContactKind::Supplier)).unwrap();

        assert_eq!(
            client,
            json!({
                "id_cl": 12,
                "nom": "Ben Salah",
                "prenom": "Amel",
                "email": null,
                "tlf": "+216 71 000 000",
                "mf": "1234567/A",
                "credit": 150.5,
            })
        );
        assert_eq!(supplier.get("id_fr"), Some(&json!(12)));
        assert!(supplier.get("id_cl").is_none());
    }

    #[test]
    fn test_input_credit_is_optional() {
        let input: ContactInput = serde_json::from_value(json!({ "nom": "Trabelsi" })).unwrap();
        assert_eq!(input.credit, None);
        assert!(input.validate().is_ok());

        let input: ContactInput =
            serde_json::from_value(json!({ "nom": "Trabelsi", "credit": 20.25 })).unwrap();
        assert_eq!(input.credit, Some("20.25".parse().unwrap()));
    }

    #[test]
    fn test_blank_last_name_is_rejected() {
        let input: ContactInput = serde_json::from_value(json!({ "nom": "  " })).unwrap();
        assert!(matches!(
            input.validate(),
            Err(RepositoryError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_kind_tables() {
        assert_eq!(ContactKind::Client.table(), "client_local");
        assert_eq!(ContactKind::Supplier.id_column(), "id_fr");
    }
}
