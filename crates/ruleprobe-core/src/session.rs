//! Transport session sequencing.
//!
//! [`deliver`] drives any [`MailTransport`] through
//! connect, STARTTLS, authenticate and submit, and always closes it
//! afterwards. [`SmtpTransport`] is the implementation over `ruleprobe-smtp`.

use crate::config::SendTarget;
use crate::credential::SaslMechanism;
use crate::error::{Error, Result, TransportStep};
use crate::message::OutgoingMessage;
use async_trait::async_trait;
use ruleprobe_smtp::connection::connect;
use ruleprobe_smtp::{Address, Authenticated, Client, Connected, Secured, SmtpConnection};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No connection.
    #[default]
    Disconnected,
    /// Plaintext connection, greeting and EHLO done.
    Connected,
    /// STARTTLS completed.
    SecureChannel,
    /// Authentication accepted.
    Authenticated,
    /// Message accepted by the server.
    Sent,
}

/// Capabilities a mail transport offers a session.
#[async_trait]
pub trait MailTransport: Send {
    /// Opens a plaintext connection to `target`.
    async fn connect(&mut self, target: &SendTarget) -> ruleprobe_smtp::Result<()>;

    /// Upgrades the connection in-band to TLS.
    async fn upgrade_security(&mut self) -> ruleprobe_smtp::Result<()>;

    /// Authenticates with `mechanism`.
    async fn authenticate(&mut self, mechanism: &SaslMechanism) -> ruleprobe_smtp::Result<()>;

    /// Submits `message` from `from` to the single recipient `to`.
    async fn submit(
        &mut self,
        from: &Address,
        to: &Address,
        message: &[u8],
    ) -> ruleprobe_smtp::Result<()>;

    /// Releases the connection. Never fails; problems are only logged.
    async fn close(&mut self);

    /// Returns the current state.
    fn state(&self) -> SessionState;
}

/// Sends `message` to `target` over `transport`.
///
/// The transport is closed on every path, including when a step fails.
///
/// # Errors
///
/// Returns `Error::Authentication` if the server rejects the credentials and
/// `Error::Transport` naming the failed step for anything else.
pub async fn deliver<T: MailTransport + ?Sized>(
    transport: &mut T,
    target: &SendTarget,
    mechanism: &SaslMechanism,
    message: &OutgoingMessage,
) -> Result<()> {
    let outcome = run_session(transport, target, mechanism, message).await;
    transport.close().await;

    if let Err(e) = &outcome {
        warn!("Session ended early: {e}");
    }
    outcome
}

async fn run_session<T: MailTransport + ?Sized>(
    transport: &mut T,
    target: &SendTarget,
    mechanism: &SaslMechanism,
    message: &OutgoingMessage,
) -> Result<()> {
    transport
        .connect(target)
        .await
        .map_err(|source| transport_error(TransportStep::Connect, source))?;
    debug!("Connected to {target}");

    transport
        .upgrade_security()
        .await
        .map_err(|source| transport_error(TransportStep::UpgradeSecurity, source))?;
    debug!("Channel secured");

    transport
        .authenticate(mechanism)
        .await
        .map_err(Error::Authentication)?;
    info!(
        mechanism = mechanism.name(),
        username = mechanism.username(),
        "Authenticated"
    );

    transport
        .submit(
            &message.envelope_from,
            &message.envelope_to,
            &message.to_bytes(),
        )
        .await
        .map_err(|source| transport_error(TransportStep::Submit, source))?;
    info!(variant = %message.variant, "Message accepted by {target}");

    Ok(())
}

const fn transport_error(step: TransportStep, source: ruleprobe_smtp::Error) -> Error {
    Error::Transport { step, source }
}

/// Type-state client held between trait calls.
enum Stage {
    Disconnected,
    Connected(Client<Connected>),
    Secured(Client<Secured>),
    Authenticated(Client<Authenticated>),
}

/// [`MailTransport`] over the `ruleprobe-smtp` client.
///
/// STARTTLS is mandatory and authentication is refused on a plaintext
/// channel. Every network exchange is bounded by the target's timeout.
pub struct SmtpTransport {
    stage: Stage,
    state: SessionState,
    host: String,
    client_name: String,
    timeout: Duration,
}

impl SmtpTransport {
    /// Creates a disconnected transport that introduces itself with the
    /// local hostname, or `localhost` if it is unknown.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stage: Stage::Disconnected,
            state: SessionState::Disconnected,
            host: String::new(),
            client_name: local_hostname(),
            timeout: crate::config::DEFAULT_TIMEOUT,
        }
    }

    /// Sets the name sent with EHLO.
    #[must_use]
    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }

    fn take_stage(&mut self) -> Stage {
        std::mem::replace(&mut self.stage, Stage::Disconnected)
    }

    fn out_of_order(&self, step: &str) -> ruleprobe_smtp::Error {
        ruleprobe_smtp::Error::Protocol(format!("cannot {step} in state {:?}", self.state))
    }

    fn fail<T>(&mut self, e: ruleprobe_smtp::Error) -> ruleprobe_smtp::Result<T> {
        self.state = SessionState::Disconnected;
        Err(e)
    }
}

impl Default for SmtpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MailTransport for SmtpTransport {
    async fn connect(&mut self, target: &SendTarget) -> ruleprobe_smtp::Result<()> {
        if !matches!(self.stage, Stage::Disconnected) {
            return Err(self.out_of_order("connect"));
        }
        self.host.clone_from(&target.host);
        self.timeout = target.timeout;

        let timeout = self.timeout;
        let name = self.client_name.clone();
        let result = bounded(timeout, async {
            let stream = connect(&target.host, target.port).await?;
            let client = Client::from_stream(stream).await?;
            debug!(server = %client.server_info().hostname, "Greeting received");
            client.ehlo(&name).await
        })
        .await;

        match result {
            Ok(client) => {
                self.stage = Stage::Connected(client);
                self.state = SessionState::Connected;
                Ok(())
            }
            Err(e) => self.fail(e),
        }
    }

    async fn upgrade_security(&mut self) -> ruleprobe_smtp::Result<()> {
        let client = match self.take_stage() {
            Stage::Connected(client) => client,
            other => {
                self.stage = other;
                return Err(self.out_of_order("start TLS"));
            }
        };

        let result = bounded(self.timeout, client.starttls(&self.host, &self.client_name)).await;
        match result {
            Ok(client) => {
                self.stage = Stage::Secured(client);
                self.state = SessionState::SecureChannel;
                Ok(())
            }
            Err(e) => self.fail(e),
        }
    }

    async fn authenticate(&mut self, mechanism: &SaslMechanism) -> ruleprobe_smtp::Result<()> {
        let client = match self.take_stage() {
            Stage::Secured(client) => client,
            other => {
                self.stage = other;
                return Err(self.out_of_order("authenticate"));
            }
        };

        let result = match mechanism {
            SaslMechanism::Login { username, secret } => {
                bounded(self.timeout, client.auth_login(username, secret)).await
            }
            SaslMechanism::XOAuth2 { username, token } => {
                bounded(self.timeout, client.auth_xoauth2(username, token)).await
            }
        };
        match result {
            Ok(client) => {
                self.stage = Stage::Authenticated(client);
                self.state = SessionState::Authenticated;
                Ok(())
            }
            Err(e) => self.fail(e),
        }
    }

    async fn submit(
        &mut self,
        from: &Address,
        to: &Address,
        message: &[u8],
    ) -> ruleprobe_smtp::Result<()> {
        let client = match self.take_stage() {
            Stage::Authenticated(client) => client,
            other => {
                self.stage = other;
                return Err(self.out_of_order("submit"));
            }
        };

        let result = bounded(self.timeout, async {
            let client = client.mail_from(from.clone()).await?;
            let client = client.rcpt_to(to.clone()).await?;
            let client = client.data().await?;
            client.send_message(message).await
        })
        .await;

        match result {
            Ok(client) => {
                self.stage = Stage::Authenticated(client);
                self.state = SessionState::Sent;
                Ok(())
            }
            Err(e) => self.fail(e),
        }
    }

    async fn close(&mut self) {
        let timeout = self.timeout;
        let quit = match self.take_stage() {
            Stage::Disconnected => None,
            Stage::Connected(client) => Some(bounded(timeout, client.quit()).await),
            Stage::Secured(client) => Some(bounded(timeout, client.quit()).await),
            Stage::Authenticated(client) => Some(bounded(timeout, client.quit()).await),
        };

        if let Some(Err(e)) = quit {
            warn!("QUIT failed: {e}");
        }
        self.state = SessionState::Disconnected;
        debug!("Connection closed");
    }

    fn state(&self) -> SessionState {
        self.state
    }
}

/// Runs `fut`, failing with `Error::Timeout` once `limit` elapses.
async fn bounded<T>(
    limit: Duration,
    fut: impl Future<Output = ruleprobe_smtp::Result<T>>,
) -> ruleprobe_smtp::Result<T> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| ruleprobe_smtp::Error::Timeout(limit.as_secs()))?
}

fn local_hostname() -> String {
    ["HOSTNAME", "COMPUTERNAME"]
        .into_iter()
        .filter_map(|key| std::env::var(key).ok())
        .map(|name| name.trim().to_string())
        .find(|name| {
            !name.is_empty()
                && name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
        })
        .unwrap_or_else(|| "localhost".to_string())
}
