//! Loading plans from JSON config files.

#![allow(clippy::unwrap_used)]

use std::io::Write;
use std::time::Duration;

use ruleprobe_core::{
    ConfigError, CredentialChoice, CredentialMaterial, MessageVariant, load_config_file,
    select_credential,
};
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn password_without_client_id_uses_password() {
    let file = write_config(
        r#"{
            "UserDisplayName": "Jane Doe",
            "UserEmailAddress": "jane@x.com",
            "RecipientDisplayName": "Bob",
            "RecipientEmailAddress": "bob@y.com",
            "SmtpServer": "smtp.x.com",
            "Password": "secret"
        }"#,
    );

    let plan = load_config_file(file.path())
        .unwrap()
        .resolve(Some(Duration::from_secs(10)))
        .unwrap();

    assert_eq!(
        select_credential(&plan.credential),
        CredentialChoice::UsePassword
    );
    assert_eq!(plan.sender.name.as_deref(), Some("Jane Doe"));
    assert_eq!(plan.recipient.name.as_deref(), Some("Bob"));
    assert_eq!(plan.target.to_string(), "smtp.x.com:587");
    assert_eq!(plan.target.timeout, Duration::from_secs(10));
    assert_eq!(plan.variant, MessageVariant::HtmlPlusInvalidSubtype);
}

#[test]
fn client_id_with_authority_url_uses_oauth() {
    let file = write_config(
        r#"{
            "UserEmailAddress": "jane@x.com",
            "RecipientEmailAddress": "bob@y.com",
            "SmtpServer": "smtp.office365.com",
            "Port": 2525,
            "ClientId": "abc",
            "Authority": "https://login.microsoftonline.com/tenant1/",
            "Variant": "plain-plus-mislabeled-base64"
        }"#,
    );

    let plan = load_config_file(file.path())
        .unwrap()
        .resolve(None)
        .unwrap();

    assert_eq!(select_credential(&plan.credential), CredentialChoice::UseOAuth);
    let CredentialMaterial::OAuth {
        client_id,
        authority,
        ..
    } = &plan.credential
    else {
        panic!("expected OAuth credentials");
    };
    assert_eq!(client_id, "abc");
    assert_eq!(authority, "https://login.microsoftonline.com/tenant1");
    assert_eq!(plan.target.port, 2525);
    assert_eq!(plan.variant, MessageVariant::PlainPlusMislabeledBase64);
}

#[test]
fn unparseable_file_is_unusable() {
    let file = write_config("{ \"UserEmailAddress\": ");

    let err = load_config_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::ParseFile { .. }));
    assert!(err.is_unusable_file());
}

#[test]
fn missing_file_is_unusable() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_config_file(&dir.path().join("absent.json")).unwrap_err();

    assert!(matches!(err, ConfigError::ReadFile { .. }));
    assert!(err.is_unusable_file());
}

#[test]
fn file_without_credentials_is_a_config_error() {
    let file = write_config(
        r#"{
            "UserEmailAddress": "jane@x.com",
            "RecipientEmailAddress": "bob@y.com",
            "SmtpServer": "smtp.x.com"
        }"#,
    );

    let err = load_config_file(file.path())
        .unwrap()
        .resolve(None)
        .unwrap_err();
    assert!(matches!(err, ConfigError::MissingCredential));
    assert!(!err.is_unusable_file());
}
