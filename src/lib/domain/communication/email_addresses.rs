//! Email addresses module.

mod email_address;
mod normalize;

pub use email_address::{EmailAddress, EmailAddressError};
pub use normalize::normalize_addresses;
