//! MIME message structure and serialization.

use crate::content_type::ContentType;
use crate::encoding::decode_base64;
use crate::error::{Error, Result};
use crate::header::Headers;
use std::fmt;

/// Longest boundary RFC 2046 allows.
const MAX_BOUNDARY_LENGTH: usize = 70;

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    SevenBit,
    /// 8-bit text.
    EightBit,
    /// Base64 encoding.
    Base64,
}

impl TransferEncoding {
    /// Parses transfer encoding from string, defaulting to 7bit.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "8bit" => Self::EightBit,
            "base64" => Self::Base64,
            _ => Self::SevenBit,
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Base64 => write!(f, "base64"),
        }
    }
}

/// MIME message part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// Part headers.
    pub headers: Headers,
    /// Part body exactly as it goes on the wire.
    pub body: Vec<u8>,
}

impl Part {
    /// Creates a part with `Content-Type` and `Content-Transfer-Encoding` headers.
    ///
    /// The body is written verbatim: `encoding` is only declared, never
    /// applied, so a part can claim an encoding its bytes do not follow.
    #[must_use]
    pub fn new(
        content_type: ContentType,
        encoding: TransferEncoding,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        let mut headers = Headers::new();
        headers.add("Content-Type", content_type.to_string());
        headers.add("Content-Transfer-Encoding", encoding.to_string());
        Self {
            headers,
            body: body.into(),
        }
    }

    /// Gets the content type, defaulting to text/plain.
    ///
    /// # Errors
    ///
    /// Returns an error if content type header is invalid.
    pub fn content_type(&self) -> Result<ContentType> {
        self.headers
            .get("Content-Type")
            .map_or_else(|| Ok(ContentType::text_plain()), ContentType::parse)
    }

    /// Gets the declared transfer encoding.
    #[must_use]
    pub fn transfer_encoding(&self) -> TransferEncoding {
        self.headers
            .get("Content-Transfer-Encoding")
            .map_or(TransferEncoding::SevenBit, TransferEncoding::parse)
    }

    /// Decodes the body according to the declared transfer encoding.
    ///
    /// # Errors
    ///
    /// Returns an error if the body does not follow its declared encoding.
    pub fn decode_body(&self) -> Result<Vec<u8>> {
        match self.transfer_encoding() {
            TransferEncoding::Base64 => decode_base64(&String::from_utf8_lossy(&self.body)),
            TransferEncoding::SevenBit | TransferEncoding::EightBit => Ok(self.body.clone()),
        }
    }

    /// Gets the decoded body as a string.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding or UTF-8 conversion fails.
    pub fn body_text(&self) -> Result<String> {
        String::from_utf8(self.decode_body()?).map_err(Into::into)
    }
}

/// Multipart MIME message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Message headers, ending with `Content-Type`.
    pub headers: Headers,
    /// Body parts in order.
    pub parts: Vec<Part>,
    boundary: String,
}

impl Message {
    /// Creates a multipart message.
    ///
    /// `Content-Type` is set on `headers` from `content_type`.
    ///
    /// # Errors
    ///
    /// Returns an error if `content_type` is not multipart or lacks a valid
    /// boundary, if there are no parts, if a part body contains the boundary
    /// delimiter, or if a header is malformed.
    pub fn multipart(
        mut headers: Headers,
        content_type: ContentType,
        parts: Vec<Part>,
    ) -> Result<Self> {
        if !content_type.is_multipart() {
            return Err(Error::InvalidContentType(format!(
                "{} is not multipart",
                content_type.mime_type()
            )));
        }

        let boundary = content_type
            .boundary()
            .filter(|b| !b.is_empty() && b.len() <= MAX_BOUNDARY_LENGTH)
            .ok_or(Error::MissingBoundary)?
            .to_string();

        if parts.is_empty() {
            return Err(Error::InvalidMultipart("no body parts".into()));
        }

        let delimiter = format!("--{boundary}");
        if parts
            .iter()
            .any(|p| String::from_utf8_lossy(&p.body).contains(&delimiter))
        {
            return Err(Error::InvalidMultipart(format!(
                "a part body contains the boundary {boundary}"
            )));
        }

        headers.set("Content-Type", content_type.to_string());
        headers.validate()?;
        for part in &parts {
            part.headers.validate()?;
        }

        Ok(Self {
            headers,
            parts,
            boundary,
        })
    }

    /// Returns the multipart boundary.
    #[must_use]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Gets the From header.
    #[must_use]
    pub fn from(&self) -> Option<&str> {
        self.headers.get("From")
    }

    /// Gets the Subject header.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.headers.get("Subject")
    }

    /// Serializes the message with CRLF line endings.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(self.headers.to_string().as_bytes());
        out.extend_from_slice(b"\r\n");

        for part in &self.parts {
            out.extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
            out.extend_from_slice(part.headers.to_string().as_bytes());
            out.extend_from_slice(b"\r\n");
            push_crlf(&mut out, &part.body);
            out.extend_from_slice(b"\r\n");
        }

        out.extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        out
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.to_bytes()))
    }
}

/// Appends `body`, turning bare LF into CRLF and dropping a trailing line break.
fn push_crlf(out: &mut Vec<u8>, body: &[u8]) {
    let body = body
        .strip_suffix(b"\r\n")
        .or_else(|| body.strip_suffix(b"\n"))
        .unwrap_or(body);

    let mut prev = 0u8;
    for &byte in body {
        if byte == b'\n' && prev != b'\r' {
            out.push(b'\r');
        }
        out.push(byte);
        prev = byte;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_parts() -> Vec<Part> {
        vec![
            Part::new(ContentType::text_plain(), TransferEncoding::SevenBit, "Part 1"),
            Part::new(ContentType::text_html(), TransferEncoding::SevenBit, "<p>Part 2</p>"),
        ]
    }

    #[test]
    fn test_transfer_encoding_parse() {
        assert_eq!(TransferEncoding::parse("7bit"), TransferEncoding::SevenBit);
        assert_eq!(TransferEncoding::parse(" BASE64 "), TransferEncoding::Base64);
        assert_eq!(TransferEncoding::parse("x-unknown"), TransferEncoding::SevenBit);
    }

    #[test]
    fn test_part_headers() {
        let part = Part::new(ContentType::text("foo"), TransferEncoding::SevenBit, "Bad body part");
        assert_eq!(part.content_type().unwrap().mime_type(), "text/foo");
        assert_eq!(part.transfer_encoding(), TransferEncoding::SevenBit);
        assert_eq!(part.body_text().unwrap(), "Bad body part");
    }

    #[test]
    fn test_declared_base64_is_not_applied() {
        let honest = Part::new(ContentType::text_plain(), TransferEncoding::Base64, "SGk=");
        assert_eq!(honest.body_text().unwrap(), "Hi");

        let mislabeled =
            Part::new(ContentType::text_plain(), TransferEncoding::Base64, "Plain text body");
        assert_eq!(mislabeled.body, b"Plain text body");
        assert!(mislabeled.decode_body().is_err());
    }

    #[test]
    fn test_multipart_serialization() {
        let mut headers = Headers::new();
        headers.add("From", "sender@example.com");
        headers.add("Subject", "Test");

        let message = Message::multipart(
            headers,
            ContentType::multipart("alternative", "b1"),
            sample_parts(),
        )
        .unwrap();

        let expected = concat!(
            "From: sender@example.com\r\n",
            "Subject: Test\r\n",
            "Content-Type: multipart/alternative; boundary=b1\r\n",
            "\r\n",
            "--b1\r\n",
            "Content-Type: text/plain; charset=utf-8\r\n",
            "Content-Transfer-Encoding: 7bit\r\n",
            "\r\n",
            "Part 1\r\n",
            "--b1\r\n",
            "Content-Type: text/html; charset=utf-8\r\n",
            "Content-Transfer-Encoding: 7bit\r\n",
            "\r\n",
            "<p>Part 2</p>\r\n",
            "--b1--\r\n",
        );
        assert_eq!(message.to_string(), expected);
        assert_eq!(message.boundary(), "b1");
        assert_eq!(message.subject(), Some("Test"));
    }

    #[test]
    fn test_bare_lf_becomes_crlf() {
        let mut out = Vec::new();
        push_crlf(&mut out, b"a\nb\r\nc\n");
        assert_eq!(out, b"a\r\nb\r\nc");
    }

    #[test]
    fn test_multipart_rejects_bad_input() {
        let plain = Message::multipart(Headers::new(), ContentType::text_plain(), sample_parts());
        assert!(matches!(plain, Err(Error::InvalidContentType(_))));

        let no_boundary =
            Message::multipart(Headers::new(), ContentType::new("multipart", "mixed"), sample_parts());
        assert!(matches!(no_boundary, Err(Error::MissingBoundary)));

        let empty =
            Message::multipart(Headers::new(), ContentType::multipart("mixed", "b1"), Vec::new());
        assert!(matches!(empty, Err(Error::InvalidMultipart(_))));

        let clash = Message::multipart(
            Headers::new(),
            ContentType::multipart("mixed", "b1"),
            vec![Part::new(ContentType::text_plain(), TransferEncoding::SevenBit, "x\n--b1\ny")],
        );
        assert!(matches!(clash, Err(Error::InvalidMultipart(_))));
    }

    proptest! {
        #[test]
        fn serialized_bodies_have_no_bare_lf(body in "[a-z\r\n ]{0,64}") {
            let mut out = Vec::new();
            push_crlf(&mut out, body.as_bytes());
            for (i, &byte) in out.iter().enumerate() {
                if byte == b'\n' {
                    prop_assert!(i > 0 && out[i - 1] == b'\r');
                }
            }
        }
    }
}
