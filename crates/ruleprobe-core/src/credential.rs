//! Credential material and SASL mechanism selection.

use crate::error::Result;
use crate::token::TokenProvider;
use ruleprobe_smtp::Address;
use std::fmt;
use tracing::{info, warn};

/// Credentials resolved from configuration.
///
/// Exactly one variant is produced during resolution; downstream code
/// matches on it instead of re-checking which fields were filled in.
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialMaterial {
    /// Password for AUTH LOGIN.
    Password {
        /// The password.
        secret: String,
    },
    /// `OAuth2` public client for XOAUTH2.
    OAuth {
        /// Application (client) id.
        client_id: String,
        /// Authority URL, e.g. `https://login.microsoftonline.com/<tenant>`.
        authority: String,
        /// Scopes to request.
        scopes: Vec<String>,
    },
}

impl CredentialMaterial {
    /// Label used in the operator echo.
    #[must_use]
    pub const fn auth_label(&self) -> &'static str {
        match self {
            Self::Password { .. } => "Basic",
            Self::OAuth { .. } => "OAuth2",
        }
    }
}

impl fmt::Debug for CredentialMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password { .. } => f
                .debug_struct("Password")
                .field("secret", &"****")
                .finish(),
            Self::OAuth {
                client_id,
                authority,
                scopes,
            } => f
                .debug_struct("OAuth")
                .field("client_id", client_id)
                .field("authority", authority)
                .field("scopes", scopes)
                .finish(),
        }
    }
}

/// Which authentication path a run takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialChoice {
    /// AUTH LOGIN with the sender address and password.
    UsePassword,
    /// XOAUTH2 with an access token.
    UseOAuth,
}

/// Selects the authentication path for resolved credentials.
#[must_use]
pub const fn select_credential(material: &CredentialMaterial) -> CredentialChoice {
    match material {
        CredentialMaterial::Password { .. } => CredentialChoice::UsePassword,
        CredentialMaterial::OAuth { .. } => CredentialChoice::UseOAuth,
    }
}

/// SASL mechanism with everything needed to authenticate.
#[derive(Clone, PartialEq, Eq)]
pub enum SaslMechanism {
    /// AUTH LOGIN.
    Login {
        /// Login name.
        username: String,
        /// Password.
        secret: String,
    },
    /// AUTH XOAUTH2.
    XOAuth2 {
        /// Account the token was issued to.
        username: String,
        /// Bearer access token.
        token: String,
    },
}

impl SaslMechanism {
    /// Returns the SASL mechanism name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Login { .. } => "LOGIN",
            Self::XOAuth2 { .. } => "XOAUTH2",
        }
    }

    /// Returns the username presented to the server.
    #[must_use]
    pub fn username(&self) -> &str {
        match self {
            Self::Login { username, .. } | Self::XOAuth2 { username, .. } => username,
        }
    }

    /// Turns credential material into a mechanism, acquiring a token when
    /// `OAuth2` is selected.
    ///
    /// The password path logs in as `sender`. The token path uses the
    /// account named by the token, falling back to `sender` if none is given.
    ///
    /// # Errors
    ///
    /// Returns `Error::TokenAcquisition` if the token provider fails. There is
    /// no fallback to password authentication.
    pub async fn resolve(
        material: &CredentialMaterial,
        sender: &Address,
        tokens: &dyn TokenProvider,
    ) -> Result<Self> {
        match material {
            CredentialMaterial::Password { secret } => Ok(Self::Login {
                username: sender.as_str().to_string(),
                secret: secret.clone(),
            }),
            CredentialMaterial::OAuth {
                client_id,
                authority,
                scopes,
            } => {
                info!(%authority, "Acquiring access token");
                let access = tokens.acquire(client_id, authority, scopes).await?;
                let username = access.username.unwrap_or_else(|| {
                    warn!("Token carries no account name, using {sender}");
                    sender.as_str().to_string()
                });
                Ok(Self::XOAuth2 {
                    username,
                    token: access.token,
                })
            }
        }
    }
}

impl fmt::Debug for SaslMechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(self.name())
            .field("username", &self.username())
            .finish_non_exhaustive()
    }
}
