//! # ruleprobe-oauth
//!
//! `OAuth2` support for authenticating SMTP submission with XOAUTH2.
//!
//! ## Features
//!
//! - **Provider endpoints**: Derived from a Microsoft identity platform authority
//!   (`https://login.microsoftonline.com/<tenant>`) or configured by hand
//! - **Device Flow** (RFC 8628): Suited to a CLI with no redirect listener
//! - **Account identity**: The signed-in username is read from the id token
//! - **SASL mechanisms**: LOGIN and XOAUTH2 response builders
//!
//! ## Quick Start
//!
//! ```ignore
//! use ruleprobe_oauth::{DeviceFlow, OAuthClient, Provider, SMTP_SEND_SCOPE};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = Provider::from_authority("https://login.microsoftonline.com/contoso.com")?;
//!     let flow = DeviceFlow::new(OAuthClient::new("your_client_id", provider));
//!
//!     let scopes = vec![SMTP_SEND_SCOPE.to_string()];
//!     let token = flow
//!         .authorize(&scopes, |auth| {
//!             println!("Visit {} and enter {}", auth.verification_uri, auth.user_code);
//!         })
//!         .await?;
//!
//!     println!("Signed in as {:?}", token.account_username());
//!     Ok(())
//! }
//! ```
//!
//! ### Using with SMTP
//!
//! ```ignore
//! use ruleprobe_oauth::sasl::xoauth2_response;
//!
//! let auth_string = xoauth2_response("user@contoso.com", &token.access_token);
//! // Send: AUTH XOAUTH2 {auth_string}
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
pub mod flow;
pub mod provider;
pub mod sasl;
pub mod token;

pub use error::{Error, Result};
pub use flow::{DeviceAuthorization, DeviceFlow, OAuthClient};
pub use provider::{MICROSOFT_LOGIN_HOST, Provider, SMTP_SEND_SCOPE};
pub use token::Token;
