//! Device Authorization Flow implementation (RFC 8628).

use super::OAuthClient;
use crate::error::{Error, Result};
use crate::token::Token;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Floor for the polling interval; servers may send 0.
const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Scopes that make the server return an id token naming the account.
const IDENTITY_SCOPES: [&str; 2] = ["openid", "profile"];

/// Device authorization response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceAuthorization {
    /// Device code for polling.
    pub device_code: String,
    /// User code to display to the user.
    pub user_code: String,
    /// Verification URI where user should go.
    pub verification_uri: String,
    /// Complete verification URI (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_uri_complete: Option<String>,
    /// Expiration time in seconds.
    pub expires_in: u32,
    /// Polling interval in seconds.
    #[serde(default = "default_interval")]
    pub interval: u32,
    /// Ready-made instructions for the user (Microsoft extension).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

const fn default_interval() -> u32 {
    5
}

impl DeviceAuthorization {
    /// Returns the text to show the user.
    #[must_use]
    pub fn instructions(&self) -> String {
        self.message.clone().unwrap_or_else(|| {
            format!(
                "To sign in, open {} and enter the code {}",
                self.verification_uri, self.user_code
            )
        })
    }

    /// Interval to wait between token polls.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.interval)).max(MIN_POLL_INTERVAL)
    }
}

/// Device Authorization Flow for `OAuth2`.
///
/// Suited to a CLI: the user signs in on any browser while the tool polls.
#[derive(Debug)]
pub struct DeviceFlow {
    client: OAuthClient,
}

impl DeviceFlow {
    /// Creates a new device flow.
    #[must_use]
    pub const fn new(client: OAuthClient) -> Self {
        Self { client }
    }

    /// Requests device authorization from the server.
    ///
    /// `openid` and `profile` are always added so the token carries an id
    /// token. An empty `scopes` falls back to the provider defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the authorization request fails.
    pub async fn request_device_authorization(
        &self,
        scopes: &[String],
    ) -> Result<DeviceAuthorization> {
        let scope = self.scope_param(scopes);
        debug!(scope = %scope, "Requesting device authorization");

        self.client
            .post_form(
                &self.client.provider.device_auth_url,
                &[("client_id", self.client.client_id.as_str()), ("scope", scope.as_str())],
            )
            .await
    }

    /// Polls the token endpoint once, after waiting `interval`.
    ///
    /// # Errors
    ///
    /// Returns `Error::AccessDenied` if the user declined and
    /// `Error::TokenExpired` if the device code expired. The retryable codes
    /// `authorization_pending` and `slow_down` come back as `Error::OAuth`.
    pub async fn poll_for_token(&self, device_code: &str, interval: Duration) -> Result<Token> {
        tokio::time::sleep(interval).await;

        self.client
            .request_token(&[
                ("grant_type", DEVICE_CODE_GRANT),
                ("device_code", device_code),
                ("client_id", self.client.client_id.as_str()),
            ])
            .await
    }

    /// Runs the whole flow.
    ///
    /// Requests a device code, hands it to `prompt` for display, then polls
    /// until the user finishes or the code's lifetime runs out.
    ///
    /// # Errors
    ///
    /// Returns an error if authorization is declined, fails or expires.
    pub async fn authorize<F>(&self, scopes: &[String], prompt: F) -> Result<Token>
    where
        F: FnOnce(&DeviceAuthorization),
    {
        let auth = self.request_device_authorization(scopes).await?;
        prompt(&auth);

        let deadline = Instant::now() + Duration::from_secs(u64::from(auth.expires_in));
        let mut interval = auth.poll_interval();

        loop {
            if Instant::now() + interval >= deadline {
                return Err(Error::TokenExpired);
            }

            match self.poll_for_token(&auth.device_code, interval).await {
                Ok(token) => {
                    info!("Device authorization completed");
                    return Ok(token);
                }
                Err(e) if e.oauth_code() == Some("authorization_pending") => {
                    debug!("Authorization pending");
                }
                Err(e) if e.oauth_code() == Some("slow_down") => {
                    interval += Duration::from_secs(5);
                    debug!(interval_secs = interval.as_secs(), "Server asked to slow down");
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn scope_param(&self, scopes: &[String]) -> String {
        let requested = if scopes.is_empty() {
            &self.client.provider.default_scopes
        } else {
            scopes
        };

        let mut all: Vec<&str> = requested.iter().map(String::as_str).collect();
        for extra in IDENTITY_SCOPES {
            if !all.contains(&extra) {
                all.push(extra);
            }
        }
        all.join(" ")
    }
}
