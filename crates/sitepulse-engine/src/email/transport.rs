//! The email transport seam.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use sitepulse_core::config::EmailConfig;
use sitepulse_core::error::ErrorKind;
use sitepulse_core::{AppError, AppResult};

/// A fully addressed, rendered email.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundEmail {
    pub to_address: String,
    pub to_name: String,
    pub subject: String,
    pub html_body: String,
}

/// Transport seam so dispatch and retry logic can be exercised without a
/// live SMTP relay.
#[async_trait]
pub trait EmailTransport: Send + Sync + 'static {
    async fn send(&self, email: &OutboundEmail) -> AppResult<()>;
}

/// SMTP transport over STARTTLS.
pub struct SmtpEmailTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpEmailTransport {
    pub fn new(config: &EmailConfig) -> AppResult<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Configuration,
                    format!("Invalid SMTP relay '{}'", config.smtp_host),
                    e,
                )
            })?
            .port(config.smtp_port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        let from: Mailbox = format!("{} <{}>", config.from_name, config.from_address)
            .parse()
            .map_err(|_| {
                AppError::configuration(format!(
                    "Invalid sender address '{}'",
                    config.from_address
                ))
            })?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl EmailTransport for SmtpEmailTransport {
    async fn send(&self, email: &OutboundEmail) -> AppResult<()> {
        let to: Mailbox = Mailbox::new(
            Some(email.to_name.clone()),
            email
                .to_address
                .parse()
                .map_err(|_| {
                    AppError::delivery(format!("Invalid recipient address '{}'", email.to_address))
                })?,
        );

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&email.subject)
            .header(ContentType::TEXT_HTML)
            .body(email.html_body.clone())
            .map_err(|e| AppError::with_source(
                ErrorKind::Delivery,
                "Failed to build email message",
                e,
            ))?;

        self.transport.send(message).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Delivery,
                format!("SMTP send to {} failed", email.to_address),
                e,
            )
        })?;
        Ok(())
    }
}

/// Transport that drops mail on the floor, for deployments with email
/// disabled. Logs the subject so operators can see what would have gone
/// out.
#[derive(Debug, Default)]
pub struct NoopEmailTransport;

#[async_trait]
impl EmailTransport for NoopEmailTransport {
    async fn send(&self, email: &OutboundEmail) -> AppResult<()> {
        info!(
            to = %email.to_address,
            subject = %email.subject,
            "email disabled, not sending"
        );
        Ok(())
    }
}

/// Recording transport for tests and development: stores every email and
/// can be told to fail.
#[derive(Debug, Default)]
pub struct MemoryEmailTransport {
    sent: tokio::sync::Mutex<Vec<OutboundEmail>>,
    failure: tokio::sync::Mutex<Option<String>>,
}

impl MemoryEmailTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent send fail with the given message.
    pub async fn fail_with(&self, message: impl Into<String>) {
        *self.failure.lock().await = Some(message.into());
    }

    /// Let subsequent sends succeed again.
    pub async fn recover(&self) {
        *self.failure.lock().await = None;
    }

    /// Everything successfully sent so far.
    pub async fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl EmailTransport for MemoryEmailTransport {
    async fn send(&self, email: &OutboundEmail) -> AppResult<()> {
        if let Some(message) = self.failure.lock().await.clone() {
            return Err(AppError::delivery(message));
        }
        self.sent.lock().await.push(email.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email() -> OutboundEmail {
        OutboundEmail {
            to_address: "rosa@example.com".to_string(),
            to_name: "Rosa".to_string(),
            subject: "Stock low".to_string(),
            html_body: "<p>Cement below minimum</p>".to_string(),
        }
    }

    #[tokio::test]
    async fn test_memory_transport_records_and_fails_on_demand() {
        let transport = MemoryEmailTransport::new();
        transport.send(&email()).await.unwrap();
        assert_eq!(transport.sent().await.len(), 1);

        transport.fail_with("smtp: connection refused").await;
        let err = transport.send(&email()).await.unwrap_err();
        assert!(err.to_string().contains("connection refused"));
        assert_eq!(transport.sent().await.len(), 1);

        transport.recover().await;
        transport.send(&email()).await.unwrap();
        assert_eq!(transport.sent().await.len(), 2);
    }
}
