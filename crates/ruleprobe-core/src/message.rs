//! Probe message catalog and builder.
//!
//! Each [`MessageVariant`] is a fixed body shape chosen to exercise a
//! particular transport rule. Nothing about a shape is configurable beyond
//! picking the variant.

use crate::error::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use ruleprobe_mime::encoding::encode_rfc2047;
use ruleprobe_mime::{ContentType, Headers, Message, Part, TransferEncoding};
use ruleprobe_smtp::{Address, Mailbox};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

const HTML_BODY: &str = r#"<!DOCTYPE html><html lang="en"><body>HTML Body</body></html>"#;
const INVALID_SUBTYPE_BODY: &str = "Bad body part";
const PLAIN_BODY: &str = "Plain text body";

/// Prefix of every probe subject; a timestamp follows.
pub const SUBJECT_PREFIX: &str = "Transport rule test";

/// Named probe body shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum MessageVariant {
    /// `multipart/alternative` of `text/html` and an invalid `text/foo` part.
    #[default]
    HtmlPlusInvalidSubtype,
    /// `multipart/mixed` of `text/plain` and a copy declared base64 but sent as plain text.
    PlainPlusMislabeledBase64,
    /// Well-formed `multipart/alternative` of `text/plain` and `text/html`.
    PlainPlusHtml,
}

impl MessageVariant {
    /// All variants in catalog order.
    pub const ALL: [Self; 3] = [
        Self::HtmlPlusInvalidSubtype,
        Self::PlainPlusMislabeledBase64,
        Self::PlainPlusHtml,
    ];

    /// Returns the variant's name as used on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HtmlPlusInvalidSubtype => "html-plus-invalid-subtype",
            Self::PlainPlusMislabeledBase64 => "plain-plus-mislabeled-base64",
            Self::PlainPlusHtml => "plain-plus-html",
        }
    }

    /// Multipart subtype grouping the parts.
    #[must_use]
    pub const fn multipart_subtype(self) -> &'static str {
        match self {
            Self::HtmlPlusInvalidSubtype | Self::PlainPlusHtml => "alternative",
            Self::PlainPlusMislabeledBase64 => "mixed",
        }
    }

    /// Fixed multipart boundary.
    #[must_use]
    pub const fn boundary(self) -> &'static str {
        match self {
            Self::HtmlPlusInvalidSubtype => "=_ruleprobe_v1_alternative",
            Self::PlainPlusMislabeledBase64 => "=_ruleprobe_v2_mixed",
            Self::PlainPlusHtml => "=_ruleprobe_v3_alternative",
        }
    }

    /// Body parts in order; exactly one is primary.
    #[must_use]
    pub fn parts(self) -> Vec<BodyPartSpec> {
        match self {
            Self::HtmlPlusInvalidSubtype => vec![
                BodyPartSpec::primary(ContentType::text_html(), HTML_BODY),
                BodyPartSpec::secondary(ContentType::text("foo"), INVALID_SUBTYPE_BODY),
            ],
            Self::PlainPlusMislabeledBase64 => vec![
                BodyPartSpec::primary(ContentType::text_plain(), PLAIN_BODY),
                BodyPartSpec {
                    encoding: TransferEncoding::Base64,
                    ..BodyPartSpec::secondary(ContentType::text_plain(), PLAIN_BODY)
                },
            ],
            Self::PlainPlusHtml => vec![
                BodyPartSpec::primary(ContentType::text_plain(), PLAIN_BODY),
                BodyPartSpec::secondary(ContentType::text_html(), HTML_BODY),
            ],
        }
    }
}

impl fmt::Display for MessageVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageVariant {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown message variant: {s}"))
    }
}

/// One body part of a variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyPartSpec {
    /// Declared content type.
    pub content_type: ContentType,
    /// Declared transfer encoding; the content is never re-encoded.
    pub encoding: TransferEncoding,
    /// Raw content as sent.
    pub content: &'static str,
    /// Whether this is the part logged as the message's text.
    pub primary: bool,
}

impl BodyPartSpec {
    fn primary(content_type: ContentType, content: &'static str) -> Self {
        Self {
            content_type,
            encoding: TransferEncoding::SevenBit,
            content,
            primary: true,
        }
    }

    fn secondary(content_type: ContentType, content: &'static str) -> Self {
        Self {
            primary: false,
            ..Self::primary(content_type, content)
        }
    }

    fn to_part(&self) -> Part {
        Part::new(self.content_type.clone(), self.encoding, self.content)
    }
}

/// A built probe message with its SMTP envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    /// MAIL FROM address.
    pub envelope_from: Address,
    /// RCPT TO address.
    pub envelope_to: Address,
    /// The MIME message.
    pub mime: Message,
    /// Variant it was built from.
    pub variant: MessageVariant,
    primary: usize,
}

impl OutgoingMessage {
    /// Builds `variant` from `sender` to `recipient`, stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns an error if the MIME structure cannot be assembled.
    pub fn build(variant: MessageVariant, sender: &Mailbox, recipient: &Mailbox) -> Result<Self> {
        Self::build_at(variant, sender, recipient, Utc::now())
    }

    /// Builds `variant` stamped with `timestamp`.
    ///
    /// Identical inputs give byte-identical output.
    ///
    /// # Errors
    ///
    /// Returns an error if the MIME structure cannot be assembled.
    pub fn build_at(
        variant: MessageVariant,
        sender: &Mailbox,
        recipient: &Mailbox,
        timestamp: DateTime<Utc>,
    ) -> Result<Self> {
        let mut headers = Headers::new();
        headers.add("From", mailbox_header(sender));
        headers.add("To", mailbox_header(recipient));
        headers.add(
            "Subject",
            format!(
                "{SUBJECT_PREFIX} {}",
                timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
            ),
        );
        headers.add("Date", timestamp.to_rfc2822());
        headers.add(
            "Message-ID",
            format!(
                "<{}.{}@{}>",
                timestamp.format("%Y%m%d%H%M%S%6f"),
                variant.as_str(),
                sender.address.domain()
            ),
        );
        headers.add("MIME-Version", "1.0");

        let specs = variant.parts();
        let primary = specs.iter().position(|s| s.primary).unwrap_or_default();
        let content_type = ContentType::multipart(variant.multipart_subtype(), variant.boundary());
        let mime = Message::multipart(
            headers,
            content_type,
            specs.iter().map(BodyPartSpec::to_part).collect(),
        )?;

        Ok(Self {
            envelope_from: sender.address.clone(),
            envelope_to: recipient.address.clone(),
            mime,
            variant,
            primary,
        })
    }

    /// Serializes the message for DATA.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.mime.to_bytes()
    }

    /// Returns the primary body part.
    #[must_use]
    pub fn primary_part(&self) -> &Part {
        &self.mime.parts[self.primary]
    }

    /// Returns the Subject header.
    #[must_use]
    pub fn subject(&self) -> &str {
        self.mime.subject().unwrap_or_default()
    }
}

/// Renders a mailbox for a header, RFC 2047 encoding non-ASCII names.
fn mailbox_header(mailbox: &Mailbox) -> String {
    match &mailbox.name {
        Some(name) if !name.is_ascii() => {
            format!("{} <{}>", encode_rfc2047(name, "utf-8"), mailbox.address)
        }
        _ => mailbox.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 0).unwrap()
    }

    fn build(variant: MessageVariant) -> OutgoingMessage {
        OutgoingMessage::build_at(
            variant,
            &Mailbox::parse("Jane Doe <jane@x.com>").unwrap(),
            &Mailbox::parse("bob@y.com").unwrap(),
            fixed_time(),
        )
        .unwrap()
    }

    fn text(message: &OutgoingMessage) -> String {
        String::from_utf8(message.to_bytes()).unwrap()
    }

    #[test]
    fn test_every_variant_has_one_primary_part() {
        for variant in MessageVariant::ALL {
            let parts = variant.parts();
            assert!(!parts.is_empty());
            assert_eq!(parts.iter().filter(|p| p.primary).count(), 1, "{variant}");
        }
    }

    #[test]
    fn test_headers() {
        let message = build(MessageVariant::PlainPlusHtml);
        let wire = text(&message);

        assert!(wire.starts_with("From: Jane Doe <jane@x.com>\r\nTo: bob@y.com\r\n"));
        assert!(wire.contains("Subject: Transport rule test 2026-10-19T08:30:00.000000Z\r\n"));
        assert!(wire.contains("Date: Mon, 19 Oct 2026 08:30:00 +0000\r\n"));
        assert!(wire.contains("Message-ID: <20261019083000000000.plain-plus-html@x.com>\r\n"));
        assert!(wire.contains("MIME-Version: 1.0\r\n"));
        assert_eq!(message.envelope_from.as_str(), "jane@x.com");
        assert_eq!(message.envelope_to.as_str(), "bob@y.com");
    }

    #[test]
    fn test_invalid_subtype_variant() {
        let message = build(MessageVariant::HtmlPlusInvalidSubtype);
        let wire = text(&message);

        assert!(wire.contains(
            "Content-Type: multipart/alternative; boundary=\"=_ruleprobe_v1_alternative\"\r\n"
        ));
        assert_eq!(message.mime.parts.len(), 2);
        assert_eq!(
            message.mime.parts[1].content_type().unwrap().mime_type(),
            "text/foo"
        );
        assert_eq!(
            message.primary_part().body_text().unwrap(),
            r#"<!DOCTYPE html><html lang="en"><body>HTML Body</body></html>"#
        );
    }

    #[test]
    fn test_mislabeled_base64_variant() {
        let message = build(MessageVariant::PlainPlusMislabeledBase64);
        let wire = text(&message);
        assert!(wire.contains("multipart/mixed"));

        let second = &message.mime.parts[1];
        assert_eq!(second.transfer_encoding(), TransferEncoding::Base64);
        assert_eq!(second.body, b"Plain text body");
        assert!(second.decode_body().is_err());

        let primary = message.primary_part();
        assert_eq!(primary.transfer_encoding(), TransferEncoding::SevenBit);
        assert_eq!(primary.body_text().unwrap(), "Plain text body");
    }

    #[test]
    fn test_build_is_deterministic() {
        for variant in MessageVariant::ALL {
            assert_eq!(build(variant).to_bytes(), build(variant).to_bytes());
        }
    }

    #[test]
    fn test_only_subject_time_varies() {
        let sender = Mailbox::new("jane@x.com").unwrap();
        let recipient = Mailbox::new("bob@y.com").unwrap();
        let a = OutgoingMessage::build(MessageVariant::PlainPlusHtml, &sender, &recipient).unwrap();
        let b = OutgoingMessage::build(MessageVariant::PlainPlusHtml, &sender, &recipient).unwrap();

        assert_eq!(a.mime.parts, b.mime.parts);
        assert!(a.subject().starts_with(SUBJECT_PREFIX));
    }

    #[test]
    fn test_non_ascii_display_name_is_encoded() {
        let sender = Mailbox::with_name("Zoë", "zoe@x.com").unwrap();
        let message = OutgoingMessage::build_at(
            MessageVariant::PlainPlusHtml,
            &sender,
            &Mailbox::new("bob@y.com").unwrap(),
            fixed_time(),
        )
        .unwrap();
        assert_eq!(message.mime.from(), Some("=?utf-8?B?Wm/Dqw==?= <zoe@x.com>"));
    }

    #[test]
    fn test_variant_names() {
        for variant in MessageVariant::ALL {
            assert_eq!(variant.as_str().parse::<MessageVariant>().unwrap(), variant);
        }
        assert_eq!(MessageVariant::default(), MessageVariant::HtmlPlusInvalidSubtype);
        assert!("v4".parse::<MessageVariant>().is_err());

        let parsed: MessageVariant = serde_json::from_str("\"plain-plus-mislabeled-base64\"").unwrap();
        assert_eq!(parsed, MessageVariant::PlainPlusMislabeledBase64);
    }
}
