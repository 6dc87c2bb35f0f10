//! Integration tests for the SMTP client.
//!
//! These tests run the client against a scripted server on a loopback socket,
//! so the whole command/reply exchange is exercised without a real relay.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use ruleprobe_smtp::connection::connect;
use ruleprobe_smtp::{Address, Client, Error, SmtpConnection};

/// One step of the scripted dialogue.
enum Step {
    /// Read one command line, then answer.
    Line(&'static str),
    /// Read message data up to the terminating dot, then answer.
    Data(&'static str),
}

/// Starts a server that sends `greeting` and then plays `steps` in order.
///
/// The join handle yields every line the client sent.
async fn scripted_server(greeting: &'static str, steps: Vec<Step>) -> (u16, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let (read_half, mut write_half) = socket.into_split();
        let mut reader = BufReader::new(read_half);
        let mut received = Vec::new();

        write_half
            .write_all(format!("{greeting}\r\n").as_bytes())
            .await
            .unwrap();

        for step in steps {
            let reply = match step {
                Step::Line(reply) => {
                    let mut line = String::new();
                    if reader.read_line(&mut line).await.unwrap() == 0 {
                        break;
                    }
                    received.push(line.trim_end().to_string());
                    reply
                }
                Step::Data(reply) => {
                    loop {
                        let mut line = String::new();
                        if reader.read_line(&mut line).await.unwrap() == 0 {
                            break;
                        }
                        let line = line.trim_end().to_string();
                        let done = line == ".";
                        received.push(line);
                        if done {
                            break;
                        }
                    }
                    reply
                }
            };
            write_half
                .write_all(format!("{reply}\r\n").as_bytes())
                .await
                .unwrap();
        }

        received
    });

    (port, handle)
}

fn b64(s: &str) -> String {
    STANDARD.encode(s)
}

#[tokio::test]
async fn login_and_submit() {
    let (port, server) = scripted_server(
        "220 smtp.x.com ESMTP ready",
        vec![
            Step::Line("250-smtp.x.com Hello\r\n250-AUTH LOGIN XOAUTH2\r\n250 8BITMIME"),
            Step::Line("334 VXNlcm5hbWU6"),
            Step::Line("334 UGFzc3dvcmQ6"),
            Step::Line("235 2.7.0 Authentication successful"),
            Step::Line("250 2.1.0 Sender OK"),
            Step::Line("250 2.1.5 Recipient OK"),
            Step::Line("354 Start mail input; end with <CRLF>.<CRLF>"),
            Step::Data("250 2.6.0 Queued mail for delivery"),
            Step::Line("221 2.0.0 Service closing transmission channel"),
        ],
    )
    .await;

    let stream = connect("127.0.0.1", port).await.unwrap();
    let client = Client::from_stream(stream).await.unwrap();
    assert_eq!(client.server_info().hostname, "smtp.x.com");

    let client = client.ehlo("probe.local").await.unwrap();
    assert!(!client.is_encrypted());

    let client = client.auth_login("jane@x.com", "secret").await.unwrap();
    let client = client
        .mail_from(Address::new("jane@x.com").unwrap())
        .await
        .unwrap();
    let client = client
        .rcpt_to(Address::new("bob@y.com").unwrap())
        .await
        .unwrap();
    let client = client.data().await.unwrap();
    let client = client
        .send_message(b"Subject: hi\r\n\r\n.leading dot\r\n")
        .await
        .unwrap();
    client.quit().await.unwrap();

    let received = server.await.unwrap();
    assert_eq!(
        received,
        vec![
            "EHLO probe.local".to_string(),
            "AUTH LOGIN".to_string(),
            b64("jane@x.com"),
            b64("secret"),
            "MAIL FROM:<jane@x.com>".to_string(),
            "RCPT TO:<bob@y.com>".to_string(),
            "DATA".to_string(),
            "Subject: hi".to_string(),
            String::new(),
            "..leading dot".to_string(),
            ".".to_string(),
            "QUIT".to_string(),
        ]
    );
}

#[tokio::test]
async fn login_rejected_password() {
    let (port, server) = scripted_server(
        "220 smtp.x.com ESMTP",
        vec![
            Step::Line("250-smtp.x.com\r\n250 AUTH LOGIN"),
            Step::Line("334 VXNlcm5hbWU6"),
            Step::Line("334 UGFzc3dvcmQ6"),
            Step::Line("535 5.7.3 Authentication unsuccessful"),
        ],
    )
    .await;

    let stream = connect("127.0.0.1", port).await.unwrap();
    let client = Client::from_stream(stream).await.unwrap();
    let client = client.ehlo("probe.local").await.unwrap();

    let err = client.auth_login("jane@x.com", "wrong").await.unwrap_err();
    assert_eq!(err.reply_code(), Some(535));
    assert!(err.is_permanent());

    server.await.unwrap();
}

#[tokio::test]
async fn xoauth2_failure_acknowledges_challenge() {
    let (port, server) = scripted_server(
        "220 smtp.x.com ESMTP",
        vec![
            Step::Line("250-smtp.x.com\r\n250 AUTH XOAUTH2"),
            Step::Line("334 eyJzdGF0dXMiOiI0MDEiLCJzY2hlbWVzIjoiYmVhcmVyIn0="),
            Step::Line("535 5.7.3 Authentication unsuccessful"),
        ],
    )
    .await;

    let stream = connect("127.0.0.1", port).await.unwrap();
    let client = Client::from_stream(stream).await.unwrap();
    let client = client.ehlo("probe.local").await.unwrap();

    let err = client
        .auth_xoauth2("jane@x.com", "expired-token")
        .await
        .unwrap_err();
    assert_eq!(err.reply_code(), Some(535));
    assert!(err.to_string().contains("token status 401"));

    let received = server.await.unwrap();
    let expected_ir = b64("user=jane@x.com\x01auth=Bearer expired-token\x01\x01");
    assert_eq!(received[1], format!("AUTH XOAUTH2 {expected_ir}"));
    assert_eq!(received[2], "");
}

#[tokio::test]
async fn starttls_required_but_not_offered() {
    let (port, server) = scripted_server(
        "220 smtp.x.com ESMTP",
        vec![Step::Line("250-smtp.x.com\r\n250 AUTH LOGIN")],
    )
    .await;

    let stream = connect("127.0.0.1", port).await.unwrap();
    let client = Client::from_stream(stream).await.unwrap();
    let client = client.ehlo("probe.local").await.unwrap();

    let err = client
        .starttls("smtp.x.com", "probe.local")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotSupported(ref ext) if ext == "STARTTLS"));

    server.await.unwrap();
}

#[tokio::test]
async fn data_rejected_by_policy() {
    let (port, server) = scripted_server(
        "220 smtp.x.com ESMTP",
        vec![
            Step::Line("250 smtp.x.com"),
            Step::Line("235 2.7.0 Authentication successful"),
            Step::Line("250 2.1.0 Sender OK"),
            Step::Line("250 2.1.5 Recipient OK"),
            Step::Line("354 Start mail input"),
            Step::Data("554 5.7.1 Message rejected by transport rule"),
        ],
    )
    .await;

    let stream = connect("127.0.0.1", port).await.unwrap();
    let client = Client::from_stream(stream).await.unwrap();
    let client = client.ehlo("probe.local").await.unwrap();
    let client = client.auth_xoauth2("jane@x.com", "token").await.unwrap();
    let client = client
        .mail_from(Address::new("jane@x.com").unwrap())
        .await
        .unwrap();
    let client = client
        .rcpt_to(Address::new("bob@y.com").unwrap())
        .await
        .unwrap();
    let client = client.data().await.unwrap();

    let err = client.send_message(b"Subject: x\r\n\r\nbody").await.unwrap_err();
    assert_eq!(err.reply_code(), Some(554));
    assert!(err.to_string().contains("5.7.1"));

    server.await.unwrap();
}

#[tokio::test]
async fn greeting_rejection() {
    let (port, server) = scripted_server("554 5.3.2 Service busy", vec![]).await;

    let stream = connect("127.0.0.1", port).await.unwrap();
    let err = Client::from_stream(stream).await.unwrap_err();
    assert_eq!(err.reply_code(), Some(554));

    server.await.unwrap();
}

#[tokio::test]
async fn server_hangs_up() {
    let (port, server) = scripted_server("220 smtp.x.com ESMTP", vec![]).await;

    let stream = connect("127.0.0.1", port).await.unwrap();
    let client = Client::from_stream(stream).await.unwrap();
    server.await.unwrap();

    let err = client.ehlo("probe.local").await.unwrap_err();
    assert!(matches!(err, Error::ConnectionClosed | Error::Io(_)));
}
