//! Recipient list normalization

use tracing::debug;

use super::{EmailAddress, EmailAddressError};

/// Normalizes a raw list of recipients.
///
/// Each entry is trimmed and blank entries are dropped. Entries that already
/// contain an `@` are kept as they are; entries without one get
/// `@<default_domain>` appended, or are rejected with
/// [`EmailAddressError::MissingDomain`] when no default domain is configured.
///
/// Order is preserved and duplicates are kept. Normalizing an already
/// normalized list returns the same list.
///
/// # Arguments
/// * `raw` - The raw entries, possibly padded or blank.
/// * `default_domain` - The domain to complete bare local parts with.
///
/// # Returns
/// The normalized addresses, or the first [`EmailAddressError`] encountered.
pub fn normalize_addresses<S: AsRef<str>>(
    raw: &[S],
    default_domain: Option<&str>,
) -> Result<Vec<EmailAddress>, EmailAddressError> {
    let default_domain = default_domain
        .map(|domain| domain.trim().trim_start_matches('@'))
        .filter(|domain| !domain.is_empty());

    let mut addresses = Vec::with_capacity(raw.len());

    for entry in raw {
        let entry = entry.as_ref().trim();

        if entry.is_empty() {
            continue;
        }

        let address = if entry.contains('@') {
            EmailAddress::new(entry)?
        } else {
            let domain =
                default_domain.ok_or_else(|| EmailAddressError::MissingDomain(entry.to_string()))?;

            debug!("completing `{entry}` with default domain `{domain}`");

            EmailAddress::new(&format!("{entry}@{domain}"))?
        };

        addresses.push(address);
    }

    Ok(addresses)
}
