//! Error types for the core library.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors found while resolving configuration, before any network activity.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither a password nor a client id was given.
    #[error("Either --clientId or --password must be provided.")]
    MissingCredential,

    /// A client id was given without a tenant or authority.
    #[error("--tenantId must be provided with --clientId.")]
    MissingAuthority,

    /// The authority is neither a URL nor a usable tenant id.
    #[error("Invalid authority: {0}")]
    InvalidAuthority(String),

    /// A sender or recipient could not be parsed.
    #[error("Invalid {field} address: {source}")]
    InvalidAddress {
        /// Which identity was being parsed.
        field: &'static str,
        /// Parse failure.
        #[source]
        source: ruleprobe_smtp::Error,
    },

    /// A required field is absent or empty.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// The config file could not be read.
    #[error("Cannot read config file {}: {source}", path.display())]
    ReadFile {
        /// Path that was read.
        path: PathBuf,
        /// I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid JSON for the expected record.
    #[error("Cannot parse config file {}: {source}", path.display())]
    ParseFile {
        /// Path that was parsed.
        path: PathBuf,
        /// Deserialization failure.
        #[source]
        source: serde_json::Error,
    },
}

impl ConfigError {
    /// Returns true if the config file itself was unusable.
    #[must_use]
    pub const fn is_unusable_file(&self) -> bool {
        matches!(self, Self::ReadFile { .. } | Self::ParseFile { .. })
    }
}

/// Session step a transport failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportStep {
    /// TCP connect and greeting.
    Connect,
    /// STARTTLS negotiation.
    UpgradeSecurity,
    /// Envelope and message data.
    Submit,
}

impl fmt::Display for TransportStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connect => "connect",
            Self::UpgradeSecurity => "STARTTLS",
            Self::Submit => "submit",
        })
    }
}

/// Errors that can occur during a probe run.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The identity provider did not issue a token.
    #[error("Token acquisition failed: {0}")]
    TokenAcquisition(#[from] ruleprobe_oauth::Error),

    /// The SMTP server rejected the credentials.
    #[error("Authentication failed: {0}")]
    Authentication(#[source] ruleprobe_smtp::Error),

    /// Connecting, securing or submitting failed.
    #[error("Transport error during {step}: {source}")]
    Transport {
        /// Step that failed.
        step: TransportStep,
        /// Underlying SMTP error.
        #[source]
        source: ruleprobe_smtp::Error,
    },

    /// The probe message could not be assembled.
    #[error("Message error: {0}")]
    Message(#[from] ruleprobe_mime::Error),
}

impl Error {
    /// Returns the SMTP reply code behind this error, if any.
    #[must_use]
    pub const fn reply_code(&self) -> Option<u16> {
        match self {
            Self::Authentication(source) | Self::Transport { source, .. } => source.reply_code(),
            _ => None,
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
