use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use std::time::Duration;
use tracing::{debug, info};

use super::config::{EmailConfig, TlsMode};
use super::message::{sender_mailbox, OutgoingEmail};
use super::EmailError;

const SMTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Something that delivers messages. The SMTP implementation is the real
/// one; tests substitute their own.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Verify the server is reachable and accepts the credentials
    async fn connect(&self) -> Result<(), EmailError>;

    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    server: String,
}

impl SmtpMailer {
    pub fn new(config: &EmailConfig) -> Result<Self, EmailError> {
        let server = format!("{}:{}", config.smtp_server, config.smtp_port);
        let connect_error = |e: lettre::transport::smtp::Error| EmailError::Connect {
            server: server.clone(),
            message: e.to_string(),
        };

        let builder = match config.tls_mode() {
            TlsMode::Implicit => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_server).map_err(connect_error)?,
            TlsMode::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_server).map_err(connect_error)?
            }
            TlsMode::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_server),
        };

        let transport = builder
            .port(config.smtp_port)
            .credentials(Credentials::new(config.email.clone(), config.password.clone()))
            .timeout(Some(SMTP_TIMEOUT))
            .build();

        Ok(Self {
            transport,
            from: sender_mailbox(&config.email, config.sender_name.as_deref())?,
            server,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn connect(&self) -> Result<(), EmailError> {
        match self.transport.test_connection().await {
            Ok(true) => {
                info!("Connected to SMTP server {}", self.server);
                Ok(())
            }
            Ok(false) => Err(EmailError::Connect {
                server: self.server.clone(),
                message: "server did not accept the connection".to_string(),
            }),
            Err(e) => Err(EmailError::Connect { server: self.server.clone(), message: e.to_string() }),
        }
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
        let message = email.to_message(&self.from)?;
        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| EmailError::Send(e.to_string()))?;
        debug!("SMTP accepted message for {}: {:?}", email.to, response.code());
        Ok(())
    }
}
