//! End-to-end probe run.

use crate::config::ResolvedPlan;
use crate::credential::{SaslMechanism, select_credential};
use crate::error::Result;
use crate::message::OutgoingMessage;
use crate::session::{MailTransport, deliver};
use crate::token::TokenProvider;
use tracing::{debug, info};

/// Runs one probe: authenticate, build the message and deliver it.
///
/// A token is only requested when the plan carries `OAuth2` credentials.
/// Returns the message that was accepted.
///
/// # Errors
///
/// Returns the first token, message, authentication or transport error.
pub async fn run_probe(
    plan: &ResolvedPlan,
    tokens: &dyn TokenProvider,
    transport: &mut dyn MailTransport,
) -> Result<OutgoingMessage> {
    info!(
        server = %plan.target,
        variant = %plan.variant,
        auth = plan.credential.auth_label(),
        "Starting probe"
    );
    debug!(choice = ?select_credential(&plan.credential), "Credential selected");

    let mechanism = SaslMechanism::resolve(&plan.credential, &plan.sender.address, tokens).await?;
    let message = OutgoingMessage::build(plan.variant, &plan.sender, &plan.recipient)?;
    debug!(subject = message.subject(), variant = %message.variant, "Message built");

    deliver(transport, &plan.target, &mechanism, &message).await?;
    Ok(message)
}
