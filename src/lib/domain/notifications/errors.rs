//! Notifier errors

use thiserror::Error;
use tracing::debug;

use crate::domain::communication::{email_addresses::EmailAddressError, mailer::MailerError};

/// Errors that can occur when setting up the notifier or sending through it
#[derive(Debug, Error)]
pub enum NotifierError {
    /// The notifier was configured with unusable values
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The relay could not be reached with the configured credentials
    #[error("could not reach the mail relay")]
    Connectivity(#[source] MailerError),

    /// The message is missing recipients, a subject or a body
    #[error("invalid notification: {0}")]
    Validation(String),

    /// The relay failed to deliver the message
    #[error(transparent)]
    Delivery(#[from] MailerError),
}

impl From<EmailAddressError> for NotifierError {
    fn from(err: EmailAddressError) -> Self {
        debug!("EmailAddressError -> NotifierError");

        NotifierError::Validation(err.to_string())
    }
}
