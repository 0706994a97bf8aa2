//! SMTP email service implementation

use std::time::Duration;

use async_trait::async_trait;
use clap::{ArgAction, Parser, ValueEnum};
use lettre::{
    message::{header::ContentType as ContentTypeHeader, Mailbox},
    transport::smtp::{
        authentication::{Credentials, Mechanism},
        client::{AsyncSmtpConnection, TlsParameters},
        commands::{Data, Mail, Rcpt},
        extension::ClientId,
    },
    Message as Email,
};
use tracing::{debug, warn};

use crate::domain::communication::mailer::{ContentType, Mailer, MailerError, Message};

/// How the TLS session with the relay is established
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum TlsMode {
    /// TLS from the first byte (usually port 465)
    #[default]
    Wrapper,

    /// Plain connection upgraded with STARTTLS (usually port 587)
    Starttls,
}

/// SMTP configuration
#[derive(Clone, Debug, Parser)]
pub struct SMTPConfig {
    /// The SMTP host
    #[clap(long = "smtp-host", env = "SMTP_HOST")]
    pub host: String,

    /// The SMTP port
    #[clap(long = "smtp-port", env = "SMTP_PORT", default_value_t = 465)]
    pub port: u16,

    /// The SMTP username
    #[clap(long = "smtp-user", env = "SMTP_USER")]
    pub username: String,

    /// The SMTP password
    #[clap(long = "smtp-password", env = "SMTP_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// How TLS is negotiated with the relay
    #[clap(long = "smtp-tls-mode", env = "SMTP_TLS_MODE", value_enum, default_value_t = TlsMode::Wrapper)]
    pub tls_mode: TlsMode,

    /// Verify the TLS certificate
    #[clap(long = "smtp-verify-tls", env = "SMTP_VERIFY_TLS", default_value_t = true, action = ArgAction::Set)]
    pub verify_tls: bool,

    /// Seconds a whole session may take before it is abandoned
    #[clap(long = "smtp-timeout-secs", env = "SMTP_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,
}

impl SMTPConfig {
    /// The session timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// SMTP mailer
///
/// Every call opens its own session: connect, TLS, authenticate, send, quit.
#[derive(Debug, Clone)]
pub struct SMTPMailer {
    config: SMTPConfig,
}

impl SMTPMailer {
    /// Create a new SMTP mailer
    pub fn new(config: SMTPConfig) -> Self {
        if !config.verify_tls {
            warn!(
                "TLS certificate verification is disabled for {}",
                config.host
            );
        }

        Self { config }
    }

    /// The account the mailer authenticates as
    pub fn account(&self) -> &str {
        &self.config.username
    }

    fn tls_parameters(&self) -> Result<TlsParameters, MailerError> {
        TlsParameters::builder(self.config.host.clone())
            .dangerous_accept_invalid_certs(!self.config.verify_tls)
            .build()
            .map_err(|e| MailerError::Connect(e.to_string()))
    }

    /// Connects, negotiates TLS and authenticates.
    async fn open(&self) -> Result<AsyncSmtpConnection, MailerError> {
        let hello = ClientId::default();
        let server = (self.config.host.as_str(), self.config.port);
        let timeout = Some(self.config.timeout());
        let tls = self.tls_parameters()?;

        debug!(
            "connecting to {}:{} ({:?})",
            self.config.host, self.config.port, self.config.tls_mode
        );

        let mut connection = match self.config.tls_mode {
            TlsMode::Wrapper => {
                AsyncSmtpConnection::connect_tokio1(server, timeout, &hello, Some(tls), None)
                    .await
                    .map_err(|e| MailerError::Connect(e.to_string()))?
            }
            TlsMode::Starttls => {
                let mut connection =
                    AsyncSmtpConnection::connect_tokio1(server, timeout, &hello, None, None)
                        .await
                        .map_err(|e| MailerError::Connect(e.to_string()))?;

                if !connection.can_starttls() {
                    connection.abort().await;

                    return Err(MailerError::Connect(
                        "the relay does not offer STARTTLS".to_string(),
                    ));
                }

                connection
                    .starttls(tls, &hello)
                    .await
                    .map_err(|e| MailerError::Connect(e.to_string()))?;

                connection
            }
        };

        let credentials = Credentials::new(
            self.config.username.clone(),
            self.config.password.clone(),
        );

        if let Err(e) = connection
            .auth(&[Mechanism::Plain, Mechanism::Login], &credentials)
            .await
        {
            connection.abort().await;

            return Err(MailerError::Auth(e.to_string()));
        }

        Ok(connection)
    }

    /// Issues the envelope and writes the payload on an open session.
    async fn transfer(
        connection: &mut AsyncSmtpConnection,
        email: &Email,
    ) -> Result<(), MailerError> {
        let envelope = email.envelope();

        connection
            .command(Mail::new(envelope.from().cloned(), vec![]))
            .await
            .map_err(|e| MailerError::Transmission(e.to_string()))?;

        for recipient in envelope.to() {
            connection
                .command(Rcpt::new(recipient.clone(), vec![]))
                .await
                .map_err(|e| MailerError::RecipientRejected {
                    recipient: recipient.to_string(),
                    reason: e.to_string(),
                })?;
        }

        connection
            .command(Data)
            .await
            .map_err(|e| MailerError::Transmission(e.to_string()))?;

        connection
            .message(&email.formatted())
            .await
            .map_err(|e| MailerError::Transmission(e.to_string()))?;

        Ok(())
    }

    /// Opens a session and closes it again without sending anything.
    async fn handshake(&self) -> Result<(), MailerError> {
        let mut connection = self.open().await?;

        if let Err(e) = connection.quit().await {
            debug!("relay did not acknowledge QUIT: {e}");
        }

        Ok(())
    }

    async fn session(&self, email: &Email) -> Result<(), MailerError> {
        let mut connection = self.open().await?;

        if let Err(e) = Self::transfer(&mut connection, email).await {
            connection.abort().await;

            return Err(e);
        }

        if let Err(e) = connection.quit().await {
            debug!("relay did not acknowledge QUIT: {e}");
        }

        Ok(())
    }
}

/// Builds the wire message for `message`
pub fn build_email(message: &Message) -> Result<Email, MailerError> {
    let content_type = match message.content_type {
        ContentType::Plain => ContentTypeHeader::TEXT_PLAIN,
        ContentType::Html => ContentTypeHeader::TEXT_HTML,
    };

    let mut builder = Email::builder()
        .from(message.from.as_str().parse::<Mailbox>()?)
        .subject(message.subject.clone())
        .header(content_type);

    for recipient in &message.to {
        builder = builder.to(recipient.as_str().parse::<Mailbox>()?);
    }

    Ok(builder.body(message.body.clone())?)
}

#[async_trait]
impl Mailer for SMTPMailer {
    async fn probe(&self) -> Result<(), MailerError> {
        let timeout = self.config.timeout();

        tokio::time::timeout(timeout, self.handshake())
            .await
            .map_err(|_| MailerError::Timeout(timeout))?
    }

    async fn deliver(&self, message: &Message) -> Result<(), MailerError> {
        let email = build_email(message)?;
        let timeout = self.config.timeout();

        tokio::time::timeout(timeout, self.session(&email))
            .await
            .map_err(|_| MailerError::Timeout(timeout))?
    }
}
