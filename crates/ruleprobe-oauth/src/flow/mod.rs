//! `OAuth2` authorization flows.

mod device;

pub use device::{DeviceAuthorization, DeviceFlow};

use crate::error::Result;
use crate::provider::Provider;
use crate::token::{ErrorResponse, Token, TokenResponse};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

/// Common `OAuth2` client configuration for a public client.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    /// Client ID registered with the provider.
    pub client_id: String,
    /// Provider configuration.
    pub provider: Provider,
    /// HTTP client.
    http_client: Client,
}

impl OAuthClient {
    /// Creates a new OAuth client.
    #[must_use]
    pub fn new(client_id: impl Into<String>, provider: Provider) -> Self {
        Self {
            client_id: client_id.into(),
            provider,
            http_client: Client::new(),
        }
    }

    /// Bounds every request to the provider by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.http_client = Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    /// Posts a form to `url` and decodes a success body as `T`.
    ///
    /// Non-success responses are decoded as an `OAuth2` error body.
    pub(crate) async fn post_form<T: DeserializeOwned>(
        &self,
        url: &Url,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let response = self
            .http_client
            .post(url.clone())
            .form(params)
            .send()
            .await?;

        if !response.status().is_success() {
            let error: ErrorResponse = response.json().await?;
            return Err(error.into_error());
        }

        response.json().await.map_err(Into::into)
    }

    /// Requests a token from the token endpoint.
    pub(crate) async fn request_token(&self, params: &[(&str, &str)]) -> Result<Token> {
        let response: TokenResponse = self.post_form(&self.provider.token_url, params).await?;
        Ok(Token::from_response(response))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_oauth_client_creation() {
        let provider = Provider::from_authority("https://login.microsoftonline.com/contoso.com").unwrap();
        let client = OAuthClient::new("test_client_id", provider);
        assert_eq!(client.client_id, "test_client_id");
        assert!(client.provider.token_url.as_str().ends_with("/token"));
    }
}
