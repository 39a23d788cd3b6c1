//! Purpose: `fabric` CLI entry point; thin shell over the `fabric_client` library.
//! Role: Binary crate root; parses args, builds a client, emits JSON on stdout.
//! Invariants: Command results are JSON on stdout; logs and errors go to stderr.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
#![allow(clippy::result_large_err)]
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum, error::ErrorKind as ClapErrorKind};
use clap_complete::aot::Shell;
use fabric_client::api::{
    Client, ClientConfig, Credential, DEFAULT_FABRIC, DEFAULT_TIMEOUT, Error, ErrorKind, Protocol,
    RetryPolicy, to_exit_code,
};
use serde_json::{Map, Value, json};
use std::error::Error as StdError;
use tracing_subscriber::EnvFilter;

mod command_dispatch;

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, Error> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to write help")
                        .with_source(io_err)
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(clap_error_summary(&err))
                    .with_hint("Try `fabric --help`."));
            }
        },
    };

    command_dispatch::dispatch_command(cli.command, &cli.connect).map_err(add_hint)
}

/// Retry warnings stay off stderr unless `RUST_LOG` asks for them.
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(io::stderr().is_terminal())
        .with_writer(io::stderr)
        .try_init();
}

#[derive(Parser)]
#[command(
    name = "fabric",
    version,
    about = "Talk to a geo-distributed data platform over its HTTP API",
    long_about = None,
    after_help = r#"EXAMPLES
  $ fabric --host demo.example.com --api-key "$KEY" whoami
  $ fabric --host demo.example.com --email me@example.com --password "$PW" collections
  $ fabric --host demo.example.com --token "$JWT" query 'FOR u IN users LIMIT 3 RETURN u'
  $ fabric --host demo.example.com --api-key "$KEY" request GET /collection/users

Every connection option can also be set through the FABRIC_* environment variables."#,
    arg_required_else_help = true
)]
struct Cli {
    #[command(flatten)]
    connect: ConnectArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct ConnectArgs {
    #[arg(long, env = "FABRIC_HOST", help = "Platform host (the `api-` prefix is added)")]
    host: Option<String>,
    #[arg(long, env = "FABRIC_PROTOCOL", value_enum, default_value = "https")]
    protocol: ProtocolArg,
    #[arg(long, env = "FABRIC_PORT", default_value_t = 443, help = "Ignored for https")]
    port: u16,
    #[arg(long, env = "FABRIC_FABRIC", default_value = DEFAULT_FABRIC)]
    fabric: String,
    #[arg(long, env = "FABRIC_EMAIL")]
    email: Option<String>,
    #[arg(long, env = "FABRIC_PASSWORD", hide_env_values = true)]
    password: Option<String>,
    #[arg(long, env = "FABRIC_TOKEN", hide_env_values = true)]
    token: Option<String>,
    #[arg(long, env = "FABRIC_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    #[arg(long, default_value_t = 5, help = "Attempts per request on connection failure")]
    retries: u32,
    #[arg(long, default_value_t = 5000)]
    retry_delay_ms: u64,
    #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_secs())]
    timeout_secs: u64,
    #[arg(long, env = "FABRIC_CA_FILE", help = "PEM bundle of trusted CA certificates")]
    tls_ca_file: Option<PathBuf>,
}

impl ConnectArgs {
    fn client(&self) -> Result<Client, Error> {
        let Some(host) = self.host.as_deref() else {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("no host configured")
                .with_hint("Pass --host or set FABRIC_HOST."));
        };
        let credential = Credential::from_parts(
            self.email.as_deref(),
            self.password.as_deref(),
            self.token.as_deref(),
            self.api_key.as_deref(),
        )?
        .ok_or_else(|| {
            Error::new(ErrorKind::Usage)
                .with_message("no credential configured")
                .with_hint("Pass --email/--password, --token, or --api-key.")
        })?;

        let mut config = ClientConfig::new(host)
            .protocol(self.protocol.into())
            .port(self.port)
            .fabric(self.fabric.clone())
            .credential(credential)
            .retry_policy(RetryPolicy::new(
                self.retries,
                Duration::from_millis(self.retry_delay_ms),
            ))
            .timeout(Duration::from_secs(self.timeout_secs));
        if let Some(path) = &self.tls_ca_file {
            config = config.tls_ca_file(path);
        }
        Client::new(config)
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ProtocolArg {
    Http,
    Https,
}

impl From<ProtocolArg> for Protocol {
    fn from(value: ProtocolArg) -> Self {
        match value {
            ProtocolArg::Http => Protocol::Http,
            ProtocolArg::Https => Protocol::Https,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Show the tenant and fabric the credential resolves to")]
    Whoami,
    #[command(about = "List fabrics")]
    Fabrics,
    #[command(about = "List collections in the current fabric")]
    Collections {
        #[arg(long, help = "Include system collections")]
        include_system: bool,
    },
    #[command(about = "Run a query and print every row")]
    Query {
        query: String,
        #[arg(long, help = "Bind variables as a JSON object")]
        bind: Option<String>,
        #[arg(long)]
        batch_size: Option<u32>,
    },
    #[command(about = "Send a raw request and print status and body without interpreting them")]
    Request {
        method: String,
        path: String,
        #[arg(long, help = "Request body (JSON)")]
        data: Option<String>,
        #[arg(long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,
    },
    #[command(about = "Generate shell completions")]
    Completion { shell: Shell },
}

fn emit_json(value: Value) {
    let json = if io::stdout().is_terminal() {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

fn emit_error(err: &Error) {
    if io::stderr().is_terminal() {
        eprintln!("{}", error_text(err));
        return;
    }

    let json = serde_json::to_string(&error_json(err)).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error",
        ErrorKind::Usage => "usage error",
        ErrorKind::Io => "i/o error",
        ErrorKind::Timeout => "request timed out",
        ErrorKind::TransportUnavailable => "platform unreachable",
        ErrorKind::AuthenticationFailed => "authentication failed",
        ErrorKind::TenantNotFound => "tenant not found",
        ErrorKind::TokenNotFound => "token not found",
        ErrorKind::IdentityResolutionFailed => "identity resolution failed",
        ErrorKind::NotFound => "not found",
        ErrorKind::Permission => "permission denied",
        ErrorKind::AlreadyExists => "already exists",
        ErrorKind::Remote => "remote error",
    }
    .to_string()
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(url) = err.url() {
        inner.insert("url".to_string(), json!(url));
    }
    if let Some(status) = err.status() {
        inner.insert("status".to_string(), json!(status));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error) -> String {
    let mut lines = vec![format!("error: {}", error_message(err))];
    if let Some(hint) = err.hint() {
        lines.push(format!("hint: {hint}"));
    }
    if let Some(url) = err.url() {
        lines.push(format!("url: {url}"));
    }
    if let Some(status) = err.status() {
        lines.push(format!("status: {status}"));
    }
    if let Some(cause) = error_causes(err).first() {
        lines.push(format!("caused by: {cause}"));
    }
    lines.join("\n")
}

fn add_hint(err: Error) -> Error {
    if err.hint().is_some() {
        return err;
    }
    match err.kind() {
        ErrorKind::AuthenticationFailed => err.with_hint("Check the email and password."),
        ErrorKind::IdentityResolutionFailed | ErrorKind::Permission => {
            err.with_hint("Check that the token or API key is valid for this host.")
        }
        ErrorKind::Timeout => err.with_hint("Raise --timeout-secs or retry later."),
        ErrorKind::Internal => err.with_hint(
            "Unexpected internal failure. Retry with RUST_LOG=debug and share the output if it persists.",
        ),
        _ => err,
    }
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}

fn parse_json_arg(flag: &str, raw: &str) -> Result<Value, Error> {
    serde_json::from_str(raw).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message(format!("{flag} must be valid JSON"))
            .with_source(err)
    })
}

fn parse_param(raw: &str) -> Result<(String, String), Error> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| {
            Error::new(ErrorKind::Usage)
                .with_message(format!("invalid --param `{raw}`"))
                .with_hint("Use --param key=value.")
        })
}
