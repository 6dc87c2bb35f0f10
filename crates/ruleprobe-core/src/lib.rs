//! # ruleprobe-core
//!
//! Decision logic for sending transport-rule probe messages.
//!
//! This crate provides:
//! - **Configuration resolution** from CLI values or a JSON config file
//! - **Credential selection** between AUTH LOGIN and XOAUTH2
//! - **Token acquisition** behind the [`TokenProvider`] trait
//! - **Probe messages** built from a fixed catalog of [`MessageVariant`]s
//! - **Transport sessions** behind the [`MailTransport`] trait, with the
//!   connection always released

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
pub mod credential;
mod error;
pub mod message;
mod probe;
pub mod session;
pub mod token;

pub use config::{CliInput, FileConfig, ResolvedPlan, SendTarget, load_config_file};
pub use credential::{CredentialChoice, CredentialMaterial, SaslMechanism, select_credential};
pub use error::{ConfigError, Error, Result, TransportStep};
pub use message::{BodyPartSpec, MessageVariant, OutgoingMessage};
pub use probe::run_probe;
pub use session::{MailTransport, SessionState, SmtpTransport, deliver};
pub use token::{AccessToken, DeviceCodeTokenProvider, TokenProvider};
