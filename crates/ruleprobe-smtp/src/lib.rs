//! # ruleprobe-smtp
//!
//! An async SMTP submission client (RFC 5321) used by `ruleprobe` to push a
//! single test message through a relay.
//!
//! ## Features
//!
//! - **Type-state connection management**: Compile-time enforcement of valid
//!   SMTP state transitions
//! - **Protocol support**: EHLO, STARTTLS, AUTH, MAIL FROM, RCPT TO, DATA, QUIT
//! - **TLS support**: STARTTLS upgrade of a plaintext submission connection
//! - **Authentication**: LOGIN, XOAUTH2
//! - **Mailbox parsing**: `Display Name <user@example.com>` forms
//!
//! ## Quick Start
//!
//! ```ignore
//! use ruleprobe_smtp::{Client, Address};
//! use ruleprobe_smtp::connection::connect;
//!
//! #[tokio::main]
//! async fn main() -> ruleprobe_smtp::Result<()> {
//!     let stream = connect("smtp.example.com", 587).await?;
//!     let client = Client::from_stream(stream).await?;
//!
//!     let client = client.ehlo("client.example.com").await?;
//!     let client = client.starttls("smtp.example.com", "client.example.com").await?;
//!     let client = client.auth_login("user@example.com", "password").await?;
//!
//!     let from = Address::new("sender@example.com")?;
//!     let to = Address::new("recipient@example.com")?;
//!
//!     let client = client.mail_from(from).await?;
//!     let client = client.rcpt_to(to).await?;
//!     let client = client.data().await?;
//!
//!     let message = b"Subject: Test\r\n\r\nHello, World!\r\n";
//!     let client = client.send_message(message).await?;
//!
//!     client.quit().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Connection States
//!
//! ```text
//! ┌──────────────┐                ┌───────────┐
//! │  Connected   │ ─ starttls() ─→│  Secured  │
//! └──────────────┘                └───────────┘
//!        │                              │
//!        └──────── auth_login() / auth_xoauth2() ───→ Authenticated
//!
//! Authenticated ─ mail_from() ─→ MailTransaction ─ rcpt_to() ─→ RecipientAdded
//!               ─ data() ─→ Data ─ send_message() ─→ Authenticated
//! ```
//!
//! ## Modules
//!
//! - [`command`]: SMTP command builders
//! - [`connection`]: Connection management and type-state client
//! - [`parser`]: Response parser
//! - [`types`]: Core SMTP types (addresses, extensions, replies)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use connection::{
    Authenticated, Client, Connected, Data, MailTransaction, RecipientAdded, Secured, ServerInfo,
    SmtpConnection, Unauthenticated,
};
pub use error::{Error, Result};
pub use types::{Address, AuthMechanism, Extension, Mailbox, Reply, ReplyCode};

/// Default SMTP submission port (RFC 6409).
pub const SUBMISSION_PORT: u16 = 587;
