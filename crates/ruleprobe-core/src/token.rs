//! Access token acquisition.

use async_trait::async_trait;
use ruleprobe_oauth::{DeviceAuthorization, DeviceFlow, OAuthClient, Provider};
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// A bearer token and the account it was issued to.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    /// Account username, when the provider reports one.
    pub username: Option<String>,
    /// Opaque access token.
    pub token: String,
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("username", &self.username)
            .field("token", &"****")
            .finish()
    }
}

/// Source of `OAuth2` access tokens.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Acquires a token for `client_id` from `authority` covering `scopes`.
    ///
    /// # Errors
    ///
    /// Returns an error if the identity provider does not issue a token.
    async fn acquire(
        &self,
        client_id: &str,
        authority: &str,
        scopes: &[String],
    ) -> ruleprobe_oauth::Result<AccessToken>;
}

/// Callback that shows device sign-in instructions to the operator.
pub type DevicePrompt = Box<dyn Fn(&DeviceAuthorization) + Send + Sync>;

/// Acquires tokens with the `OAuth2` device authorization grant.
///
/// The operator signs in on any browser using the code passed to the prompt.
pub struct DeviceCodeTokenProvider {
    prompt: DevicePrompt,
    timeout: Option<Duration>,
}

impl DeviceCodeTokenProvider {
    /// Creates a provider that shows sign-in instructions through `prompt`.
    #[must_use]
    pub fn new(prompt: impl Fn(&DeviceAuthorization) + Send + Sync + 'static) -> Self {
        Self {
            prompt: Box::new(prompt),
            timeout: None,
        }
    }

    /// Bounds each request to the identity provider by `timeout`.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl fmt::Debug for DeviceCodeTokenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceCodeTokenProvider")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenProvider for DeviceCodeTokenProvider {
    async fn acquire(
        &self,
        client_id: &str,
        authority: &str,
        scopes: &[String],
    ) -> ruleprobe_oauth::Result<AccessToken> {
        let provider = Provider::from_authority(authority)?;
        debug!(token_url = %provider.token_url, "Starting device authorization");

        let mut client = OAuthClient::new(client_id, provider);
        if let Some(timeout) = self.timeout {
            client = client.with_timeout(timeout)?;
        }
        let token = DeviceFlow::new(client)
            .authorize(scopes, |auth| (self.prompt)(auth))
            .await?;
        debug!(expires_at = ?token.expires_at, "Access token issued");

        Ok(AccessToken {
            username: token.account_username(),
            token: token.access_token,
        })
    }
}
