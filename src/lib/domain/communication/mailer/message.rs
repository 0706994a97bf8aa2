//! Email message

use std::{fmt, str::FromStr};

use crate::domain::communication::email_addresses::EmailAddress;

/// The MIME type of a message body
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ContentType {
    /// `text/plain`
    #[default]
    Plain,

    /// `text/html`
    Html,
}

impl ContentType {
    /// The MIME type as written in the `Content-Type` header
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plain => "text/plain",
            Self::Html => "text/html",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text/plain" | "plain" => Ok(Self::Plain),
            "text/html" | "html" => Ok(Self::Html),
            other => Err(format!(
                "unsupported content type `{other}`, expected text/plain or text/html"
            )),
        }
    }
}

/// Email message
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// The sender of the email
    pub from: EmailAddress,

    /// The recipients of the email
    pub to: Vec<EmailAddress>,

    /// The subject of the email
    pub subject: String,

    /// The body of the email
    pub body: String,

    /// The MIME type of the body
    pub content_type: ContentType,
}

impl Message {
    /// Renders the header block followed by the body, with CRLF line endings
    /// between headers.
    pub fn to_rfc822(&self) -> String {
        let to = self
            .to
            .iter()
            .map(EmailAddress::as_str)
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "From: {from}\r\nTo: {to}\r\nSubject: {subject}\r\nContent-Type: {content_type}; charset=utf-8\r\n\r\n{body}",
            from = self.from,
            subject = self.subject,
            content_type = self.content_type,
            body = self.body,
        )
    }
}
