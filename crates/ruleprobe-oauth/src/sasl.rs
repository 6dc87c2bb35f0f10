//! SASL authentication mechanisms used by SMTP submission.
//!
//! Implements:
//! - LOGIN (draft-murchison-sasl-login) - Username and password as separate challenges
//! - XOAUTH2 (Microsoft/Google) - Bearer token authentication

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;

/// Encodes one answer to an AUTH LOGIN `334` challenge.
///
/// The server prompts for the username and then the password; each answer
/// is sent as its own base64 line.
///
/// # Example
///
/// ```
/// use ruleprobe_oauth::sasl::login_response;
///
/// assert_eq!(login_response("jane@x.com"), "amFuZUB4LmNvbQ==");
/// ```
#[must_use]
pub fn login_response(value: &str) -> String {
    STANDARD.encode(value.as_bytes())
}

/// Generates XOAUTH2 initial response.
///
/// Format: `user=<user>\x01auth=Bearer <token>\x01\x01`
///
/// # Example
///
/// ```
/// use ruleprobe_oauth::sasl::xoauth2_response;
///
/// let response = xoauth2_response("user@example.com", "eyJ0eXAi...");
/// // Send: AUTH XOAUTH2 {response}
/// ```
#[must_use]
pub fn xoauth2_response(user: &str, token: &str) -> String {
    STANDARD.encode(format!("user={user}\x01auth=Bearer {token}\x01\x01").as_bytes())
}

/// Decodes the base64 JSON challenge a server sends when XOAUTH2 fails.
///
/// The challenge looks like `{"status":"401","schemes":"bearer","scope":"..."}`.
/// Returns `None` if it is not valid base64 or not the expected JSON.
#[must_use]
pub fn decode_xoauth2_challenge(challenge: &str) -> Option<XOAuth2Failure> {
    let raw = STANDARD.decode(challenge.trim()).ok()?;
    serde_json::from_slice(&raw).ok()
}

/// Failure details from an XOAUTH2 error challenge.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct XOAuth2Failure {
    /// HTTP-style status code.
    pub status: String,
    /// Authentication schemes supported.
    #[serde(default)]
    pub schemes: Option<String>,
    /// Scope the server expected.
    #[serde(default)]
    pub scope: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn decode(s: &str) -> String {
        String::from_utf8(STANDARD.decode(s).unwrap()).unwrap()
    }

    #[test]
    fn test_login_response() {
        assert_eq!(decode(&login_response("jane@x.com")), "jane@x.com");
        assert_eq!(login_response(""), "");
    }

    #[test]
    fn test_xoauth2_format() {
        let response = xoauth2_response("test@test.com", "abc");
        assert_eq!(decode(&response), "user=test@test.com\x01auth=Bearer abc\x01\x01");
        assert!(!response.contains("test@test.com"));
    }

    #[test]
    fn test_decode_xoauth2_challenge() {
        let challenge = STANDARD.encode(
            r#"{"status":"401","schemes":"bearer","scope":"https://outlook.office.com/SMTP.Send"}"#,
        );
        let failure = decode_xoauth2_challenge(&challenge).unwrap();
        assert_eq!(failure.status, "401");
        assert_eq!(failure.schemes.as_deref(), Some("bearer"));
        assert_eq!(
            failure.scope.as_deref(),
            Some("https://outlook.office.com/SMTP.Send")
        );
    }

    #[test]
    fn test_decode_xoauth2_challenge_rejects_garbage() {
        assert!(decode_xoauth2_challenge("not base64!").is_none());
        assert!(decode_xoauth2_challenge(&STANDARD.encode("plain text")).is_none());
    }
}
