//! `ruleprobe` - transport rule probe
//!
//! Sends one crafted MIME message through an authenticated SMTP submission
//! server so the server's transport rules can be observed acting on it.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use ruleprobe_core::{
    CliInput, ConfigError, DeviceCodeTokenProvider, MessageVariant, OutgoingMessage,
    ResolvedPlan, SmtpTransport, load_config_file, run_probe,
};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Crates whose log output is shown by default.
const LOG_TARGETS: [&str; 4] = [
    "ruleprobe",
    "ruleprobe_core",
    "ruleprobe_smtp",
    "ruleprobe_oauth",
];

/// Exit code for configuration and usage errors.
const EXIT_CONFIG: u8 = 2;

/// Send a transport rule test message over authenticated SMTP
#[derive(Parser, Debug)]
#[command(name = "ruleprobe")]
#[command(about = "Send a transport rule test message over authenticated SMTP", long_about = None)]
#[command(version)]
struct Cli {
    /// Sender (`addr` or `Name <addr>`), or the path to a JSON config file
    /// when it is the only argument
    from: String,

    /// Recipient (`addr` or `Name <addr>`)
    to: Option<String>,

    /// SMTP submission server hostname
    server: Option<String>,

    /// SMTP port [default: 587]
    #[arg(long, requires = "to")]
    port: Option<u16>,

    /// Password for AUTH LOGIN
    #[arg(long, requires = "to")]
    password: Option<String>,

    /// OAuth2 application (client) id; selects XOAUTH2
    #[arg(long = "clientId", requires = "to")]
    client_id: Option<String>,

    /// Tenant id or authority URL used with --clientId
    #[arg(long = "tenantId", requires = "to")]
    tenant_id: Option<String>,

    /// Probe message to send [default: html-plus-invalid-subtype]
    #[arg(long, value_enum)]
    variant: Option<MessageVariant>,

    /// Connect and per-command timeout in seconds
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: u64,

    /// Print the message instead of sending it
    #[arg(long)]
    dry_run: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);
    let dry_run_only = cli.dry_run;

    let plan = match resolve_plan(cli) {
        Ok(Some(plan)) => plan,
        Ok(None) => return ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let outcome = if dry_run_only {
        dry_run(&plan)
    } else {
        send(&plan).await
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Installs the log subscriber; `RUST_LOG` overrides the default filter.
fn init_tracing(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    let default_filter = LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",");

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Builds the plan from the arguments or from the config file they name.
///
/// Returns `Ok(None)` when the config file cannot be used; the run is then a
/// no-op.
fn resolve_plan(cli: Cli) -> Result<Option<ResolvedPlan>, ConfigError> {
    let timeout = Duration::from_secs(cli.timeout);

    let Some(to) = cli.to else {
        let path = PathBuf::from(&cli.from);
        let config = match load_config_file(&path) {
            Ok(config) => config,
            Err(e) if e.is_unusable_file() => {
                warn!("{e}; nothing sent");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let mut plan = config.resolve(Some(timeout))?;
        if let Some(variant) = cli.variant {
            plan.variant = variant;
        }
        return Ok(Some(plan));
    };

    CliInput {
        from: cli.from,
        to,
        server: cli.server.unwrap_or_default(),
        port: cli.port,
        password: cli.password,
        client_id: cli.client_id,
        tenant_id: cli.tenant_id,
        variant: cli.variant.unwrap_or_default(),
        timeout: Some(timeout),
    }
    .resolve()
    .map(Some)
}

/// Prints the message that would be sent.
fn dry_run(plan: &ResolvedPlan) -> anyhow::Result<()> {
    println!("{plan}");
    let message = OutgoingMessage::build(plan.variant, &plan.sender, &plan.recipient)
        .context("Failed to build probe message")?;
    print!("{}", message.mime);
    info!(variant = %plan.variant, "Dry run complete; nothing sent");
    Ok(())
}

/// Acquires credentials and sends the probe.
async fn send(plan: &ResolvedPlan) -> anyhow::Result<()> {
    println!("{plan}");

    let tokens = DeviceCodeTokenProvider::new(|auth| eprintln!("{}", auth.instructions()))
        .with_timeout(plan.target.timeout);
    let mut transport = SmtpTransport::new();

    let message = run_probe(plan, &tokens, &mut transport)
        .await
        .with_context(|| format!("Probe via {} failed", plan.target))?;

    println!("Sent {} probe: {}", message.variant, message.subject());
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ruleprobe_core::CredentialChoice;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("ruleprobe").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_mode_password() {
        let cli = parse(&[
            "jane@x.com",
            "bob@y.com",
            "smtp.x.com",
            "--password",
            "secret",
        ]);
        let plan = resolve_plan(cli).unwrap().unwrap();

        assert_eq!(
            ruleprobe_core::select_credential(&plan.credential),
            CredentialChoice::UsePassword
        );
        assert_eq!(plan.target.to_string(), "smtp.x.com:587");
        assert_eq!(plan.target.timeout, Duration::from_secs(30));
        assert_eq!(plan.variant, MessageVariant::HtmlPlusInvalidSubtype);
    }

    #[test]
    fn test_cli_mode_oauth_flags() {
        let cli = parse(&[
            "jane@x.com",
            "bob@y.com",
            "smtp.x.com",
            "--clientId",
            "abc",
            "--tenantId",
            "tenant1",
            "--port",
            "2525",
            "--variant",
            "plain-plus-html",
            "--timeout",
            "5",
        ]);
        let plan = resolve_plan(cli).unwrap().unwrap();

        assert_eq!(plan.credential.auth_label(), "OAuth2");
        assert_eq!(plan.target.port, 2525);
        assert_eq!(plan.target.timeout, Duration::from_secs(5));
        assert_eq!(plan.variant, MessageVariant::PlainPlusHtml);
    }

    #[test]
    fn test_missing_credentials_is_config_error() {
        let cli = parse(&["jane@x.com", "bob@y.com", "smtp.x.com"]);
        assert!(matches!(
            resolve_plan(cli),
            Err(ConfigError::MissingCredential)
        ));
    }

    #[test]
    fn test_missing_server_is_config_error() {
        let cli = parse(&["jane@x.com", "bob@y.com", "--password", "secret"]);
        assert!(matches!(
            resolve_plan(cli),
            Err(ConfigError::MissingField("server"))
        ));
    }

    #[test]
    fn test_unreadable_config_file_is_noop() {
        let cli = parse(&["/nonexistent/ruleprobe.json"]);
        assert!(resolve_plan(cli).unwrap().is_none());
    }

    #[test]
    fn test_rejects_unknown_variant() {
        let result = Cli::try_parse_from([
            "ruleprobe",
            "jane@x.com",
            "bob@y.com",
            "smtp.x.com",
            "--variant",
            "v9",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let result = Cli::try_parse_from([
            "ruleprobe",
            "jane@x.com",
            "bob@y.com",
            "smtp.x.com",
            "--password",
            "secret",
            "--timeout",
            "0",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_config_file_mode_rejects_connection_flags() {
        for flags in [
            &["--port", "2525"][..],
            &["--password", "secret"],
            &["--clientId", "abc"],
            &["--tenantId", "t1"],
        ] {
            let args = ["ruleprobe", "ruleprobe.json"].iter().chain(flags);
            assert!(Cli::try_parse_from(args).is_err(), "{flags:?} accepted");
        }

        let cli = parse(&["ruleprobe.json", "--variant", "plain-plus-html", "--timeout", "5"]);
        assert_eq!(cli.variant, Some(MessageVariant::PlainPlusHtml));
    }
}
