//! Caller credential validation.
//!
//! A token is checked for presence and shape before any network work
//! begins. Validation has no side effects.

use std::fmt;

use thiserror::Error;

/// Authorization schemes stripped by [`credential_from_header`].
const SCHEMES: [&str; 2] = ["bearer", "token"];

/// Why a token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenRejection {
    /// The token is empty or only whitespace.
    #[error("missing credential")]
    Missing,
    /// The token contains whitespace or control characters.
    #[error("malformed credential")]
    Malformed,
}

impl TokenRejection {
    /// The message shown to the caller.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::Missing => "Missing authentication token",
            Self::Malformed => "Invalid authentication token",
        }
    }
}

/// A validated, opaque caller token.
///
/// Never persisted and never logged; `Debug` only shows its length.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Returns the raw token for attaching to upstream requests.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(<{} bytes>)", self.0.len())
    }
}

/// Validates a caller token.
///
/// Surrounding whitespace is ignored; inner whitespace or control
/// characters make the token malformed.
pub fn validate(token: &str) -> Result<Credential, TokenRejection> {
    let token = token.trim();
    if token.is_empty() {
        return Err(TokenRejection::Missing);
    }
    if token
        .chars()
        .any(|c| c.is_whitespace() || c.is_control())
    {
        return Err(TokenRejection::Malformed);
    }
    Ok(Credential(token.to_string()))
}

/// Validates the value of an `Authorization`-style header.
///
/// A leading `Bearer` or `Token` scheme is stripped (case-insensitive)
/// before validation. A bare token is accepted as-is.
pub fn credential_from_header(value: &str) -> Result<Credential, TokenRejection> {
    let value = value.trim();
    let token = match value.split_once(char::is_whitespace) {
        Some((scheme, rest))
            if SCHEMES
                .iter()
                .any(|s| scheme.eq_ignore_ascii_case(s)) =>
        {
            rest
        }
        _ if SCHEMES.iter().any(|s| value.eq_ignore_ascii_case(s)) => "",
        _ => value,
    };
    validate(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_whitespace() {
        for token in ["", " ", "\t\n", "   \r\n  "] {
            assert_eq!(validate(token), Err(TokenRejection::Missing), "{token:?}");
        }
    }

    #[test]
    fn rejection_reasons() {
        assert_eq!(TokenRejection::Missing.to_string(), "missing credential");
        assert_eq!(TokenRejection::Malformed.to_string(), "malformed credential");
        assert_eq!(
            TokenRejection::Missing.public_message(),
            "Missing authentication token"
        );
    }

    #[test]
    fn rejects_inner_whitespace_and_control_chars() {
        assert_eq!(validate("abc 123"), Err(TokenRejection::Malformed));
        assert_eq!(validate("abc\u{0}123"), Err(TokenRejection::Malformed));
    }

    #[test]
    fn accepts_and_trims_token() {
        let credential = validate("  abc123 ").unwrap();
        assert_eq!(credential.expose(), "abc123");
        assert_eq!(credential.len(), 6);
    }

    #[test]
    fn debug_redacts_token() {
        let credential = validate("s3cr3t-token").unwrap();
        let debug = format!("{:?}", credential);
        assert!(!debug.contains("s3cr3t"));
        assert!(debug.contains("12 bytes"));
    }

    #[test]
    fn strips_authorization_scheme() {
        assert_eq!(
            credential_from_header("Bearer abc123").unwrap().expose(),
            "abc123"
        );
        assert_eq!(
            credential_from_header("token   abc123").unwrap().expose(),
            "abc123"
        );
        assert_eq!(credential_from_header("abc123").unwrap().expose(), "abc123");
    }

    #[test]
    fn scheme_without_token_is_missing() {
        assert_eq!(credential_from_header("Bearer"), Err(TokenRejection::Missing));
        assert_eq!(credential_from_header("Bearer   "), Err(TokenRejection::Missing));
    }

    #[test]
    fn unknown_scheme_is_malformed() {
        assert_eq!(
            credential_from_header("Basic dXNlcjpwYXNz"),
            Err(TokenRejection::Malformed)
        );
    }
}
