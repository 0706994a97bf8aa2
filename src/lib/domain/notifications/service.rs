//! Notification service

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

#[cfg(test)]
use mockall::mock;

use crate::domain::communication::{
    email_addresses::{normalize_addresses, EmailAddress},
    mailer::{ContentType, Mailer, Message},
};

use super::NotifierError;

/// Subject used for administrator notifications when the caller has none
pub const DEFAULT_ADMIN_SUBJECT: &str = "Application error, please handle as soon as possible";

const DEBUG_SUBJECT: &str = "[Debug] send_to_recipients";

/// Notification service
#[async_trait]
pub trait NotificationService: Send + Sync + 'static {
    /// Sends a notification to every administrator.
    ///
    /// The body is prefixed with a `Send To Admin` marker and the name of the
    /// sending host.
    ///
    /// # Arguments
    /// * `content` - The notification text.
    /// * `subject` - The subject line, usually [`DEFAULT_ADMIN_SUBJECT`].
    async fn send_to_admins(&self, content: &str, subject: &str) -> Result<(), NotifierError>;

    /// Sends one message naming all `recipients`.
    ///
    /// # Arguments
    /// * `recipients` - Raw recipient entries, normalized before sending.
    /// * `subject` - The subject line.
    /// * `body` - The message body.
    /// * `content_type` - Whether `body` is plain text or HTML.
    ///
    /// # Returns
    /// A [`Result`] which is [`Ok`] once the relay accepted the message, or an
    /// [`Err`] containing a [`NotifierError`] for the first failure.
    async fn send_to_recipients(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
        content_type: ContentType,
    ) -> Result<(), NotifierError>;
}

#[cfg(test)]
mock! {
    pub NotificationService {}

    #[async_trait]
    impl NotificationService for NotificationService {
        async fn send_to_admins(&self, content: &str, subject: &str) -> Result<(), NotifierError>;
        async fn send_to_recipients(
            &self,
            recipients: &[String],
            subject: &str,
            body: &str,
            content_type: ContentType,
        ) -> Result<(), NotifierError>;
    }
}

/// Builds messages and hands them to a [`Mailer`]
#[derive(Debug, Clone)]
pub struct MailDispatcher<M>
where
    M: Mailer,
{
    mailer: Arc<M>,
    sender: EmailAddress,
    admins: Vec<EmailAddress>,
    default_domain: Option<String>,
    debug: bool,
}

impl<M> MailDispatcher<M>
where
    M: Mailer,
{
    /// Creates a new dispatcher.
    ///
    /// `admins` is expected to be normalized already.
    pub fn new(
        mailer: Arc<M>,
        sender: EmailAddress,
        admins: Vec<EmailAddress>,
        default_domain: Option<String>,
        debug: bool,
    ) -> Self {
        Self {
            mailer,
            sender,
            admins,
            default_domain,
            debug,
        }
    }

    /// The sender address
    pub fn sender(&self) -> &EmailAddress {
        &self.sender
    }

    /// The administrator list
    pub fn admins(&self) -> &[EmailAddress] {
        &self.admins
    }

    /// Whether outgoing mail is redirected to the administrators
    pub fn is_debug(&self) -> bool {
        self.debug
    }

    async fn send(
        &self,
        to: Vec<EmailAddress>,
        subject: &str,
        body: &str,
        content_type: ContentType,
    ) -> Result<(), NotifierError> {
        if to.is_empty() {
            return Err(NotifierError::Validation("no mail recipients".to_string()));
        }

        if body.is_empty() {
            return Err(NotifierError::Validation("no mail content".to_string()));
        }

        if subject.is_empty() {
            return Err(NotifierError::Validation("no mail subject".to_string()));
        }

        let message = Message {
            from: self.sender.clone(),
            to,
            subject: subject.to_string(),
            body: body.to_string(),
            content_type,
        };

        self.mailer.deliver(&message).await?;

        info!(
            recipients = message.to.len(),
            "sent `{}` from {}", message.subject, message.from
        );

        Ok(())
    }
}

#[async_trait]
impl<M> NotificationService for MailDispatcher<M>
where
    M: Mailer,
{
    async fn send_to_admins(&self, content: &str, subject: &str) -> Result<(), NotifierError> {
        let body = format!("Send To Admin\nFrom:{} \n\n{content}", host_name());

        self.send(self.admins.clone(), subject, &body, ContentType::Plain)
            .await
    }

    async fn send_to_recipients(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
        content_type: ContentType,
    ) -> Result<(), NotifierError> {
        if self.debug {
            debug!("debug mode, redirecting `{subject}` to the administrators");

            let content = format!(
                "To:{}\n\nSubject:{subject}\n\nContent:{body}",
                recipients.join(",")
            );

            return self.send_to_admins(&content, DEBUG_SUBJECT).await;
        }

        let to = normalize_addresses(recipients, self.default_domain.as_deref())?;

        self.send(to, subject, body, content_type).await
    }
}

fn host_name() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}
