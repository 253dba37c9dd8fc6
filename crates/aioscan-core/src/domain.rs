//! Domain input canonicalization and validation.
//!
//! [`normalize_domain`] is the single entry point: it turns loosely formatted
//! user input (`https://www.Example.com/pricing`) into the canonical key used
//! by every persisted record (`example.com`), or rejects it.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Maximum length of a full domain name in presentation form.
const MAX_DOMAIN_LEN: usize = 253;

/// Extensions that browsers and crawlers request as static files. A "domain"
/// ending in one of these is a mis-routed asset request, not a site.
const STATIC_FILE_EXTENSIONS: &[&str] = &[
    "png", "ico", "svg", "jpg", "jpeg", "gif", "webp", "txt", "xml", "json", "js", "css", "map",
    "woff", "woff2", "ttf", "eot",
];

static LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?$").expect("valid label regex")
});

static TLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]{2,63}$").expect("valid tld regex"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("invalid domain format \"{input}\": {reason}")]
    InvalidFormat { input: String, reason: &'static str },
}

/// Canonicalize and validate a domain string.
///
/// Trims, lower-cases, strips an `http://`/`https://` scheme and leading
/// `www.` labels, and truncates at the first `/`, `?` or `#`. The result must then be a
/// dotted sequence of 1-63 character alphanumeric/hyphen labels ending in an
/// alphabetic TLD of at least two characters.
///
/// Normalization is idempotent: feeding the output back in returns it
/// unchanged.
///
/// # Errors
///
/// Returns [`DomainError::InvalidFormat`] when the input cannot be turned
/// into a plausible domain.
pub fn normalize_domain(input: &str) -> Result<String, DomainError> {
    let reject = |reason: &'static str| DomainError::InvalidFormat {
        input: input.to_string(),
        reason,
    };

    let lowered = input.trim().to_lowercase();
    let without_scheme = lowered
        .strip_prefix("https://")
        .or_else(|| lowered.strip_prefix("http://"))
        .unwrap_or(&lowered);

    let host = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();

    let mut host = host;
    while let Some(rest) = host.strip_prefix("www.") {
        // `www.com` is a domain in its own right; only strip while a dot remains.
        if !rest.contains('.') {
            break;
        }
        host = rest;
    }

    if host.is_empty() {
        return Err(reject("empty domain"));
    }
    if host.contains('/') || host.contains('\\') {
        return Err(reject("contains a path separator"));
    }
    if !host.contains('.') {
        return Err(reject("missing a top-level domain"));
    }
    if host.len() > MAX_DOMAIN_LEN {
        return Err(reject("longer than 253 characters"));
    }
    if has_static_file_extension(host) {
        return Err(reject("looks like a static file request"));
    }

    let labels: Vec<&str> = host.split('.').collect();
    let Some((tld, rest)) = labels.split_last() else {
        return Err(reject("missing a top-level domain"));
    };
    if !TLD_RE.is_match(tld) {
        return Err(reject("top-level domain must be at least two letters"));
    }
    if !rest.iter().all(|label| LABEL_RE.is_match(label)) {
        return Err(reject("labels must be 1-63 letters, digits or inner hyphens"));
    }

    Ok(host.to_string())
}

fn has_static_file_extension(host: &str) -> bool {
    host.rsplit_once('.')
        .is_some_and(|(_, ext)| STATIC_FILE_EXTENSIONS.contains(&ext))
}
