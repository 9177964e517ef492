//! Escaped-comma list tokenizer.
//!
//! Several settings are comma-separated lists where `\,` stands for a
//! literal comma inside a field (basic-auth credentials, extra settings,
//! extra bind settings).
//!
//! # Grammar
//! ```text
//! list   := field ("," field)*
//! field  := (char | "\,")*
//! ```
//! A backslash not followed by a comma is kept verbatim.

use std::collections::BTreeMap;

/// Split `input` on commas that are not escaped with a backslash.
///
/// Fields are returned untrimmed and with `\,` decoded to `,`.
pub fn split_unescaped(input: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&',') => {
                chars.next();
                current.push(',');
            }
            ',' => fields.push(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }
    fields.push(current);
    fields
}

/// Split, trim, and drop empty fields.
pub fn split_settings(input: &str) -> Vec<String> {
    split_unescaped(input)
        .into_iter()
        .map(|field| field.trim().to_string())
        .filter(|field| !field.is_empty())
        .collect()
}

/// A single `user:password` entry from the basic-auth list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

/// Errors produced while parsing a credential entry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    #[error("credential `{0}` is missing the `:` separator")]
    MissingSeparator(String),

    #[error("credential `{0}` has an empty username")]
    EmptyUsername(String),
}

impl Credential {
    /// Parse one decoded field. The password is everything after the first `:`.
    pub fn parse(field: &str) -> Result<Self, CredentialError> {
        let field = field.trim();
        let (username, password) = field
            .split_once(':')
            .ok_or_else(|| CredentialError::MissingSeparator(field.to_string()))?;
        if username.is_empty() {
            return Err(CredentialError::EmptyUsername(field.to_string()));
        }
        Ok(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

/// Parse a basic-auth list such as `alice:secret,bob:pw\,2`.
///
/// Malformed entries are skipped with a warning.
pub fn parse_credentials(input: &str) -> Vec<Credential> {
    split_unescaped(input)
        .iter()
        .filter(|field| !field.trim().is_empty())
        .filter_map(|field| match Credential::parse(field) {
            Ok(credential) => Some(credential),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed basic auth entry");
                None
            }
        })
        .collect()
}

/// Parse `port:settings` pairs, e.g. `443:accept-proxy,80:name http`.
///
/// The key is the literal port token; entries without a `:` are skipped.
pub fn parse_bind_settings(input: &str) -> BTreeMap<String, String> {
    let mut settings = BTreeMap::new();
    for field in split_settings(input) {
        match field.split_once(':') {
            Some((port, value)) if !port.trim().is_empty() => {
                settings.insert(port.trim().to_string(), value.trim().to_string());
            }
            _ => tracing::warn!(entry = %field, "Skipping malformed extra bind setting"),
        }
    }
    settings
}
