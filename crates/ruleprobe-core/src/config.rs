//! Configuration resolution.
//!
//! Inputs arrive either as CLI values ([`CliInput`]) or as a JSON record
//! ([`FileConfig`]). Both resolve into one [`ResolvedPlan`]; every check
//! happens here so a plan that exists is ready to run.

use crate::credential::CredentialMaterial;
use crate::error::ConfigError;
use crate::message::MessageVariant;
use ruleprobe_oauth::{MICROSOFT_LOGIN_HOST, SMTP_SEND_SCOPE};
use ruleprobe_smtp::{Mailbox, SUBMISSION_PORT};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Default connect and command timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where the message is sent.
///
/// The session always upgrades with STARTTLS before authenticating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendTarget {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Limit for connecting and for each command exchange.
    pub timeout: Duration,
}

impl fmt::Display for SendTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Everything a run needs, validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPlan {
    /// Sender identity; its address is also the AUTH LOGIN username.
    pub sender: Mailbox,
    /// Single recipient.
    pub recipient: Mailbox,
    /// SMTP server.
    pub target: SendTarget,
    /// How to authenticate.
    pub credential: CredentialMaterial,
    /// Which probe message to send.
    pub variant: MessageVariant,
}

impl fmt::Display for ResolvedPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sending from {} to {} via {} with {} auth.",
            self.sender.address,
            self.recipient.address,
            self.target,
            self.credential.auth_label()
        )
    }
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct CliInput {
    /// Sender, `addr` or `Name <addr>`.
    pub from: String,
    /// Recipient, `addr` or `Name <addr>`.
    pub to: String,
    /// SMTP server hostname.
    pub server: String,
    /// SMTP port.
    pub port: Option<u16>,
    /// Password for AUTH LOGIN.
    pub password: Option<String>,
    /// `OAuth2` client id; selects XOAUTH2.
    pub client_id: Option<String>,
    /// Tenant id or authority URL.
    pub tenant_id: Option<String>,
    /// Probe message variant.
    pub variant: MessageVariant,
    /// Connect and command timeout.
    pub timeout: Option<Duration>,
}

impl CliInput {
    /// Validates the input into a plan.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` naming the first missing or invalid value.
    pub fn resolve(self) -> Result<ResolvedPlan, ConfigError> {
        let sender = parse_mailbox("sender", &self.from)?;
        let recipient = parse_mailbox("recipient", &self.to)?;
        let credential = credential_material(
            self.password.as_deref(),
            self.client_id.as_deref(),
            self.tenant_id.as_deref(),
        )?;

        Ok(ResolvedPlan {
            sender,
            recipient,
            target: send_target(&self.server, self.port, self.timeout, "server")?,
            credential,
            variant: self.variant,
        })
    }
}

/// JSON config file record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileConfig {
    /// Sender display name.
    pub user_display_name: Option<String>,
    /// Sender address.
    pub user_email_address: Option<String>,
    /// Recipient display name.
    pub recipient_display_name: Option<String>,
    /// Recipient address.
    pub recipient_email_address: Option<String>,
    /// SMTP server hostname.
    pub smtp_server: Option<String>,
    /// Password for AUTH LOGIN.
    pub password: Option<String>,
    /// `OAuth2` client id; selects XOAUTH2.
    pub client_id: Option<String>,
    /// Authority URL or bare tenant id.
    pub authority: Option<String>,
    /// SMTP port.
    pub port: Option<u16>,
    /// Probe message variant.
    pub variant: Option<MessageVariant>,
}

impl FileConfig {
    /// Validates the record into a plan.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` naming the first missing or invalid value.
    pub fn resolve(self, timeout: Option<Duration>) -> Result<ResolvedPlan, ConfigError> {
        let sender = file_mailbox(
            "sender",
            "UserEmailAddress",
            self.user_display_name.as_deref(),
            self.user_email_address.as_deref(),
        )?;
        let recipient = file_mailbox(
            "recipient",
            "RecipientEmailAddress",
            self.recipient_display_name.as_deref(),
            self.recipient_email_address.as_deref(),
        )?;
        let credential = credential_material(
            self.password.as_deref(),
            self.client_id.as_deref(),
            self.authority.as_deref(),
        )?;
        let server = self.smtp_server.unwrap_or_default();

        Ok(ResolvedPlan {
            sender,
            recipient,
            target: send_target(&server, self.port, timeout, "SmtpServer")?,
            credential,
            variant: self.variant.unwrap_or_default(),
        })
    }
}

/// Reads and parses a JSON config file.
///
/// # Errors
///
/// Returns `ConfigError::ReadFile` or `ConfigError::ParseFile`.
pub fn load_config_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "Loaded config file");

    serde_json::from_str(&raw).map_err(|source| ConfigError::ParseFile {
        path: path.to_path_buf(),
        source,
    })
}

/// Builds credential material; a client id takes precedence over a password.
fn credential_material(
    password: Option<&str>,
    client_id: Option<&str>,
    authority: Option<&str>,
) -> Result<CredentialMaterial, ConfigError> {
    if let Some(client_id) = present(client_id) {
        let authority = present(authority).ok_or(ConfigError::MissingAuthority)?;
        return Ok(CredentialMaterial::OAuth {
            client_id: client_id.to_string(),
            authority: normalize_authority(authority)?,
            scopes: vec![SMTP_SEND_SCOPE.to_string()],
        });
    }

    match password.filter(|p| !p.is_empty()) {
        Some(secret) => Ok(CredentialMaterial::Password {
            secret: secret.to_string(),
        }),
        None => Err(ConfigError::MissingCredential),
    }
}

/// Turns a tenant id into an authority URL; full URLs pass through.
fn normalize_authority(value: &str) -> Result<String, ConfigError> {
    let lower = value.to_ascii_lowercase();
    if lower.starts_with("https://") || lower.starts_with("http://") {
        return Ok(value.trim_end_matches('/').to_string());
    }

    let tenant = value.trim_matches('/');
    if tenant.is_empty() || tenant.contains(|c: char| c.is_whitespace() || c == '/') {
        return Err(ConfigError::InvalidAuthority(value.to_string()));
    }
    Ok(format!("{MICROSOFT_LOGIN_HOST}/{tenant}"))
}

fn send_target(
    server: &str,
    port: Option<u16>,
    timeout: Option<Duration>,
    field: &'static str,
) -> Result<SendTarget, ConfigError> {
    let host = present(Some(server)).ok_or(ConfigError::MissingField(field))?;
    Ok(SendTarget {
        host: host.to_string(),
        port: port.unwrap_or(SUBMISSION_PORT),
        timeout: timeout.unwrap_or(DEFAULT_TIMEOUT),
    })
}

fn parse_mailbox(field: &'static str, value: &str) -> Result<Mailbox, ConfigError> {
    Mailbox::parse(value).map_err(|source| ConfigError::InvalidAddress { field, source })
}

fn file_mailbox(
    field: &'static str,
    key: &'static str,
    name: Option<&str>,
    address: Option<&str>,
) -> Result<Mailbox, ConfigError> {
    let address = present(address).ok_or(ConfigError::MissingField(key))?;
    Mailbox::with_name(name.unwrap_or_default(), address)
        .map_err(|source| ConfigError::InvalidAddress { field, source })
}

/// Treats empty and blank strings as absent.
fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
