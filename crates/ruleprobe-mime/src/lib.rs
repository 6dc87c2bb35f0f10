//! # ruleprobe-mime
//!
//! MIME message generation for email.
//!
//! ## Features
//!
//! - **Ordered headers**: Written in the order they were added
//! - **Content types**: Parameters serialize in a stable order
//! - **Multipart**: Any subtype, with a caller-chosen boundary
//! - **Declared encodings**: A part's `Content-Transfer-Encoding` is written as
//!   declared, so deliberately mislabeled parts can be produced
//! - **Encoding**: Base64 and RFC 2047 header encoding
//!
//! ## Quick Start
//!
//! ```ignore
//! use ruleprobe_mime::{ContentType, Headers, Message, Part, TransferEncoding};
//!
//! let mut headers = Headers::new();
//! headers.add("From", "sender@example.com");
//! headers.add("To", "recipient@example.com");
//! headers.add("Subject", "Test");
//!
//! let message = Message::multipart(
//!     headers,
//!     ContentType::multipart("alternative", "b1"),
//!     vec![
//!         Part::new(ContentType::text_plain(), TransferEncoding::SevenBit, "Hello"),
//!         Part::new(ContentType::text_html(), TransferEncoding::SevenBit, "<p>Hello</p>"),
//!     ],
//! )?;
//!
//! let wire: Vec<u8> = message.to_bytes();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod content_type;
mod error;
mod header;
mod message;

pub mod encoding;

pub use content_type::ContentType;
pub use error::{Error, Result};
pub use header::Headers;
pub use message::{Message, Part, TransferEncoding};
