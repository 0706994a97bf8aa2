//! Mailer port

use async_trait::async_trait;

#[cfg(test)]
use mockall::mock;

mod errors;
mod message;
mod postman;

pub use errors::MailerError;
pub use message::{ContentType, Message};
pub use postman::Postman;

/// A sink that delivers messages to a relay
#[async_trait]
pub trait Mailer: Clone + Send + Sync + 'static {
    /// Opens a session with the relay, authenticates and closes it again.
    ///
    /// # Returns
    /// A [`Result`] which is [`Ok`] if the relay accepted the credentials.
    async fn probe(&self) -> Result<(), MailerError>;

    /// Delivers a message in a single session.
    ///
    /// # Arguments
    /// * `message` - The [`Message`] to deliver. Every address in its `to`
    ///   list receives the same message.
    ///
    /// # Returns
    /// A [`Result`] indicating success or the first failing protocol step.
    async fn deliver(&self, message: &Message) -> Result<(), MailerError>;
}

#[cfg(test)]
mock! {
    pub Mailer {}

    impl Clone for Mailer {
        fn clone(&self) -> Self;
    }

    #[async_trait]
    impl Mailer for Mailer {
        async fn probe(&self) -> Result<(), MailerError>;
        async fn deliver(&self, message: &Message) -> Result<(), MailerError>;
    }
}

#[cfg(test)]
pub mod tests {
    pub use super::MockMailer;
}
