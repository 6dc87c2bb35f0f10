//! `OAuth2` provider endpoints.

use crate::error::{Error, Result};
use url::Url;

/// Host of the Microsoft identity platform.
pub const MICROSOFT_LOGIN_HOST: &str = "https://login.microsoftonline.com";

/// Scope granting SMTP submission for Exchange Online.
pub const SMTP_SEND_SCOPE: &str = "https://outlook.office.com/SMTP.Send";

/// `OAuth2` provider configuration.
#[derive(Debug, Clone)]
pub struct Provider {
    /// Authority the endpoints were derived from.
    pub authority: Url,
    /// Token endpoint URL.
    pub token_url: Url,
    /// Device authorization endpoint.
    pub device_auth_url: Url,
    /// Scopes requested when the caller supplies none.
    pub default_scopes: Vec<String>,
}

impl Provider {
    /// Creates a provider from explicit endpoint URLs.
    ///
    /// # Errors
    ///
    /// Returns an error if a URL is invalid.
    pub fn new(
        authority: impl AsRef<str>,
        token_url: impl AsRef<str>,
        device_auth_url: impl AsRef<str>,
    ) -> Result<Self> {
        Ok(Self {
            authority: Url::parse(authority.as_ref())?,
            token_url: Url::parse(token_url.as_ref())?,
            device_auth_url: Url::parse(device_auth_url.as_ref())?,
            default_scopes: vec![SMTP_SEND_SCOPE.to_string()],
        })
    }

    /// Derives the v2.0 endpoints of a Microsoft identity platform authority,
    /// such as `https://login.microsoftonline.com/contoso.com`.
    ///
    /// # Errors
    ///
    /// Returns an error if the authority is not an absolute http(s) URL.
    pub fn from_authority(authority: &str) -> Result<Self> {
        let url = Url::parse(authority)?;
        if !matches!(url.scheme(), "https" | "http") {
            return Err(Error::InvalidConfig(format!(
                "authority must be an http(s) URL: {authority}"
            )));
        }

        let base = authority.trim_end_matches('/');
        Self::new(
            base,
            format!("{base}/oauth2/v2.0/token"),
            format!("{base}/oauth2/v2.0/devicecode"),
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_authority() {
        let provider = Provider::from_authority("https://login.microsoftonline.com/contoso.com/")
            .unwrap();
        assert_eq!(
            provider.token_url.as_str(),
            "https://login.microsoftonline.com/contoso.com/oauth2/v2.0/token"
        );
        assert_eq!(
            provider.device_auth_url.as_str(),
            "https://login.microsoftonline.com/contoso.com/oauth2/v2.0/devicecode"
        );
        assert_eq!(provider.default_scopes, vec![SMTP_SEND_SCOPE.to_string()]);
    }

    #[test]
    fn test_from_authority_keeps_tenant() {
        let provider =
            Provider::from_authority(&format!("{MICROSOFT_LOGIN_HOST}/organizations")).unwrap();
        assert_eq!(
            provider.authority.as_str(),
            "https://login.microsoftonline.com/organizations"
        );
    }

    #[test]
    fn test_rejects_invalid_authority() {
        assert!(Provider::from_authority("contoso.com").is_err());
        assert!(Provider::from_authority("ftp://login.example.com/t").is_err());
    }
}
