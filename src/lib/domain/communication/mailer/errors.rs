//! Mailer errors

use std::time::Duration;

use thiserror::Error;
use tracing::debug;

/// Mailer errors
#[derive(Debug, Error)]
pub enum MailerError {
    /// The relay could not be reached or the TLS handshake failed
    #[error("could not connect to the mail relay: {0}")]
    Connect(String),

    /// The relay rejected the credentials
    #[error("the mail relay rejected the credentials: {0}")]
    Auth(String),

    /// The relay refused one of the recipients
    #[error("the mail relay rejected recipient {recipient}: {reason}")]
    RecipientRejected {
        /// The refused address
        recipient: String,

        /// The relay's reply
        reason: String,
    },

    /// The envelope or the payload could not be written
    #[error("an error occurred while sending the email: {0}")]
    Transmission(String),

    /// The session did not complete in time
    #[error("the mail relay did not answer within {0:?}")]
    Timeout(Duration),

    /// Invalid email address
    #[error("Invalid email address")]
    InvalidEmail,

    /// Unknown error
    #[error(transparent)]
    UnknownError(anyhow::Error),
}

impl From<anyhow::Error> for MailerError {
    fn from(err: anyhow::Error) -> Self {
        MailerError::UnknownError(err)
    }
}

impl From<lettre::address::AddressError> for MailerError {
    fn from(_err: lettre::address::AddressError) -> Self {
        debug!("AddressError -> MailerError");

        MailerError::InvalidEmail
    }
}

impl From<lettre::error::Error> for MailerError {
    fn from(err: lettre::error::Error) -> Self {
        debug!("lettre::error::Error -> MailerError");

        MailerError::UnknownError(err.into())
    }
}
