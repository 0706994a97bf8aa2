//! Single-recipient delivery

use std::sync::Arc;

use tracing::debug;

use crate::domain::communication::email_addresses::EmailAddress;

use super::{Mailer, Message, MailerError};

/// Carries one [`Message`] to one recipient at a time through a [`Mailer`]
#[derive(Debug)]
pub struct Postman<M>
where
    M: Mailer,
{
    message: Message,
    post_office: Arc<M>,
}

impl<M> Postman<M>
where
    M: Mailer,
{
    /// Hires a postman for `message`, delivering through `post_office`.
    pub fn hire(message: Message, post_office: Arc<M>) -> Self {
        Self {
            message,
            post_office,
        }
    }

    /// The message this postman carries
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// Delivers a copy of the message addressed to `recipient` only.
    ///
    /// The carried message is left untouched, so the same postman can be
    /// sent out again to another recipient.
    pub async fn deliver_to(&self, recipient: EmailAddress) -> Result<(), MailerError> {
        debug!("delivering `{}` to {recipient}", self.message.subject);

        let message = Message {
            to: vec![recipient],
            ..self.message.clone()
        };

        self.post_office.deliver(&message).await
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::domain::communication::mailer::{tests::MockMailer, ContentType};

    use super::*;

    fn message() -> Message {
        Message {
            from: EmailAddress::new_unchecked("relay@example.com"),
            to: vec![EmailAddress::new_unchecked("someone@example.com")],
            subject: "Hello".to_string(),
            body: "Body".to_string(),
            content_type: ContentType::Plain,
        }
    }

    #[tokio::test]
    async fn test_deliver_to_rebinds_single_recipient() -> TestResult {
        let mut mailer = MockMailer::new();

        mailer
            .expect_deliver()
            .times(1)
            .withf(|message| {
                message.to == vec![EmailAddress::new_unchecked("ops@example.com")]
                    && message.subject == "Hello"
            })
            .returning(|_| Ok(()));

        let postman = Postman::hire(message(), Arc::new(mailer));

        postman
            .deliver_to(EmailAddress::new_unchecked("ops@example.com"))
            .await?;

        assert_eq!(
            postman.message().to,
            vec![EmailAddress::new_unchecked("someone@example.com")]
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_deliver_to_returns_transport_failure() {
        let mut mailer = MockMailer::new();

        mailer
            .expect_deliver()
            .times(1)
            .returning(|_| Err(MailerError::Connect("connection refused".to_string())));

        let postman = Postman::hire(message(), Arc::new(mailer));

        let result = postman
            .deliver_to(EmailAddress::new_unchecked("ops@example.com"))
            .await;

        assert!(matches!(result, Err(MailerError::Connect(_))));
    }
}
