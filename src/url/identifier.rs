/// Strips the query string and fragment from a listing link
///
/// # Examples
///
/// ```
/// use listing_harvest::url::canonical_url;
///
/// let url = canonical_url("https://example.com/jobs/view/rust-dev-42?refId=abc");
/// assert_eq!(url, "https://example.com/jobs/view/rust-dev-42");
/// ```
pub fn canonical_url(href: &str) -> &str {
    href.split(['?', '#']).next().unwrap_or(href).trim()
}

/// Derives a listing identifier from its link
///
/// The query string and fragment are stripped, the remainder is split on
/// `-`, and the last segment is the identifier. The result depends on nothing but the input.
///
/// # Returns
///
/// * `Some(String)` - The identifier
/// * `None` - The derived segment is empty (e.g. the link ends with `-`)
///
/// # Examples
///
/// ```
/// use listing_harvest::url::derive_identifier;
///
/// let id = derive_identifier("https://example.com/jobs/view/senior-rust-engineer-3812345678?trk=x");
/// assert_eq!(id.as_deref(), Some("3812345678"));
/// ```
pub fn derive_identifier(href: &str) -> Option<String> {
    let canonical = canonical_url(href);
    let last = canonical.rsplit('-').next().unwrap_or(canonical);

    if last.is_empty() {
        None
    } else {
        Some(last.to_string())
    }
}
