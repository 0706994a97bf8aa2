//! Addresses, messages and the mailer port

pub mod email_addresses;
pub mod mailer;
