//! SMTP connection management with type-state pattern.

mod client;
mod stream;

pub use client::{
    Authenticated, Client, Connected, Data, MailTransaction, RecipientAdded, Secured,
    SmtpConnection, Unauthenticated,
};
pub use stream::{SmtpStream, connect};

use crate::types::{AuthMechanism, Extension};
use std::collections::HashSet;

/// Server capabilities from EHLO response.
#[derive(Debug, Clone, Default)]
pub struct ServerInfo {
    /// Server hostname from greeting.
    pub hostname: String,
    /// Supported extensions.
    pub extensions: HashSet<Extension>,
}

impl ServerInfo {
    /// Checks if the server supports an extension.
    #[must_use]
    pub fn supports(&self, ext: &Extension) -> bool {
        self.extensions.contains(ext)
    }

    /// Checks if STARTTLS is supported.
    #[must_use]
    pub fn supports_starttls(&self) -> bool {
        self.supports(&Extension::StartTls)
    }

    /// Returns supported authentication mechanisms.
    #[must_use]
    pub fn auth_mechanisms(&self) -> Vec<AuthMechanism> {
        self.extensions
            .iter()
            .find_map(|ext| match ext {
                Extension::Auth(mechanisms) => Some(mechanisms.clone()),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// Checks if the server advertised a given SASL mechanism.
    ///
    /// Servers that omit the AUTH keyword entirely are treated as permissive,
    /// so the attempt is left to the server to reject.
    #[must_use]
    pub fn offers_auth(&self, mechanism: AuthMechanism) -> bool {
        let offered = self.auth_mechanisms();
        offered.is_empty() || offered.contains(&mechanism)
    }

    pub(crate) fn set_extensions<'a>(&mut self, lines: impl Iterator<Item = &'a String>) {
        self.extensions = lines.map(|line| Extension::parse(line)).collect();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn info_from(lines: &[&str]) -> ServerInfo {
        let owned: Vec<String> = lines.iter().map(ToString::to_string).collect();
        let mut info = ServerInfo::default();
        info.set_extensions(owned.iter());
        info
    }

    #[test]
    fn exchange_online_capabilities() {
        let info = info_from(&[
            "SIZE 157286400",
            "PIPELINING",
            "DSN",
            "ENHANCEDSTATUSCODES",
            "STARTTLS",
            "8BITMIME",
            "BINARYMIME",
            "CHUNKING",
            "SMTPUTF8",
        ]);
        assert!(info.supports_starttls());
        assert!(info.supports(&Extension::Size(Some(157_286_400))));
        assert!(info.auth_mechanisms().is_empty());
        assert!(info.offers_auth(AuthMechanism::XOAuth2));
    }

    #[test]
    fn auth_after_starttls() {
        let info = info_from(&["AUTH LOGIN XOAUTH2", "8BITMIME"]);
        assert!(!info.supports_starttls());
        assert!(info.offers_auth(AuthMechanism::Login));
        assert!(info.offers_auth(AuthMechanism::XOAuth2));
        assert!(!info.offers_auth(AuthMechanism::Plain));
    }
}
