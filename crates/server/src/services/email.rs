//! Email service for order and contact notifications.
//!
//! Uses SMTP via lettre for delivery with Askama templates. Both kinds of
//! message go to the operator mailbox (`ORDER_NOTIFY_ADDRESS`).

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;

use atelier_core::{CURRENCY, Cart, CartError, Price};

use crate::config::EmailConfig;

/// Subject of order notifications.
pub const ORDER_SUBJECT: &str = "Nouvelle commande";

/// One rendered order line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    pub name: String,
    pub quantity: u32,
    /// Line total including tax, formatted to two decimals.
    pub total: String,
}

/// Data shared by the HTML and text order templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSummary {
    pub username: String,
    pub lines: Vec<OrderLine>,
    /// Cart total including tax, formatted to two decimals.
    pub total: String,
    pub currency: &'static str,
}

impl OrderSummary {
    /// Summarize `cart` for `username`.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Amount` if a total leaves the decimal range.
    pub fn new(username: &str, cart: &Cart) -> Result<Self, CartError> {
        let lines = cart
            .items()
            .iter()
            .map(|item| {
                Ok(OrderLine {
                    name: item.article.name.clone(),
                    quantity: item.quantity,
                    total: amount(item.line_total_with_tax()?),
                })
            })
            .collect::<Result<_, CartError>>()?;

        Ok(Self {
            username: username.to_owned(),
            lines,
            total: amount(cart.total_with_tax()?),
            currency: CURRENCY,
        })
    }
}

fn amount(price: Price) -> String {
    format!("{:.2}", price.rounded().amount())
}

/// HTML template for the order notification.
#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderEmailHtml<'a> {
    order: &'a OrderSummary,
}

/// Plain text template for the order notification.
#[derive(Template)]
#[template(path = "email/order_confirmation.txt")]
struct OrderEmailText<'a> {
    order: &'a OrderSummary,
}

/// A message from the public contact form.
#[derive(Debug, Clone, Deserialize)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

/// Plain text template for contact form messages.
#[derive(Template)]
#[template(path = "email/contact_message.txt")]
struct ContactEmailText<'a> {
    contact: &'a ContactMessage,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP credentials are not configured.
    #[error("email is not configured (set EMAIL_USER and EMAIL_PASS)")]
    NotConfigured,

    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Render the order notification as `(text, html)`.
///
/// # Errors
///
/// Returns `EmailError::Template` if a template fails to render.
pub fn render_order(order: &OrderSummary) -> Result<(String, String), EmailError> {
    let text = OrderEmailText { order }.render()?;
    let html = OrderEmailHtml { order }.render()?;
    Ok((text, html))
}

/// Render a contact form message.
///
/// # Errors
///
/// Returns `EmailError::Template` if the template fails to render.
pub fn render_contact(contact: &ContactMessage) -> Result<String, EmailError> {
    Ok(ContactEmailText { contact }.render()?)
}

fn mailbox(address: &str) -> Result<Mailbox, EmailError> {
    address
        .parse()
        .map_err(|_| EmailError::InvalidAddress(address.to_string()))
}

/// Email service for sending notifications.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    notify_address: String,
}

impl std::fmt::Debug for EmailService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailService")
            .field("from_address", &self.from_address)
            .field("notify_address", &self.notify_address)
            .finish_non_exhaustive()
    }
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be set up.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
            notify_address: config.notify_address.clone(),
        })
    }

    /// Send an order notification to the operator.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_order(&self, order: &OrderSummary) -> Result<(), EmailError> {
        let (text, html) = render_order(order)?;

        let email = Message::builder()
            .from(mailbox(&self.from_address)?)
            .to(mailbox(&self.notify_address)?)
            .subject(ORDER_SUBJECT)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(
            username = %order.username,
            lines = order.lines.len(),
            total = %order.total,
            "Order email sent"
        );
        Ok(())
    }

    /// Forward a contact form message to the operator, replying to the sender.
    ///
    /// # Errors
    ///
    /// Returns `EmailError::InvalidAddress` if the sender address is invalid,
    /// or an error if sending fails.
    pub async fn send_contact(&self, contact: &ContactMessage) -> Result<(), EmailError> {
        let text = render_contact(contact)?;

        let email = Message::builder()
            .from(mailbox(&self.from_address)?)
            .reply_to(mailbox(&contact.email)?)
            .to(mailbox(&self.notify_address)?)
            .subject(contact.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(text)?;

        self.mailer.send(email).await?;

        tracing::info!(subject = %contact.subject, "Contact email sent");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use atelier_core::{ArticleId, CartArticle};

    use super::*;

    fn cart() -> Cart {
        let mut cart = Cart::new();
        let screws = CartArticle {
            id: ArticleId::new(1),
            name: "Vis <4mm>".to_string(),
            price: Price::new("10".parse().unwrap()),
        };
        cart.add(screws.clone()).unwrap();
        cart.add(screws).unwrap();
        cart.add(CartArticle {
            id: ArticleId::new(2),
            name: "Colle".to_string(),
            price: Price::new("3.33".parse().unwrap()),
        })
        .unwrap();
        cart
    }

    #[test]
    fn test_order_summary_totals() {
        let summary = OrderSummary::new("Guest", &cart()).unwrap();

        assert_eq!(summary.total, "27.76");
        assert_eq!(
            summary.lines,
            vec![
                OrderLine {
                    name: "Vis <4mm>".to_string(),
                    quantity: 2,
                    total: "23.80".to_string(),
                },
                OrderLine {
                    name: "Colle".to_string(),
                    quantity: 1,
                    total: "3.96".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_render_order() {
        let summary = OrderSummary::new("sami", &cart()).unwrap();
        let (text, html) = render_order(&summary).unwrap();

        assert!(text.contains("sami"));
        assert!(text.contains("Total : 27.76 TND"));
        assert!(html.contains("<h1>Confirmation de commande</h1>"));
        assert!(html.contains("Quantité: 2"));
        assert!(html.contains("27.76 TND"));
        // Article names are escaped in HTML
        assert!(html.contains("Vis &#60;4mm&#62;") || html.contains("Vis &lt;4mm&gt;"));
    }

    #[test]
    fn test_render_contact() {
        let text = render_contact(&ContactMessage {
            name: "Ines".to_string(),
            email: "ines@example.tn".to_string(),
            subject: "Devis".to_string(),
            message: "Bonjour".to_string(),
        })
        .unwrap();

        assert!(text.contains("Name: Ines"));
        assert!(text.contains("Email: ines@example.tn"));
        assert!(text.contains("Subject: Devis"));
        assert!(text.contains("Message: Bonjour"));
    }

    #[test]
    fn test_mailbox_rejects_garbage() {
        assert!(matches!(
            mailbox("not an address"),
            Err(EmailError::InvalidAddress(_))
        ));
    }
}
