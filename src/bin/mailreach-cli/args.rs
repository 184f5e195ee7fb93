use anyhow::{Result, bail};
use clap::{ArgAction, Args, Parser, Subcommand};
use mailreach_lib::ProbeConfig;

#[derive(Parser)]
#[command(name = "mailreach-cli", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Commands,

    /// output format: human|json
    #[arg(long, default_value = "human", global = true)]
    pub format: String,

    /// -v for debug logs, -vv for trace (RUST_LOG takes precedence)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve the mail exchangers of a domain
    Mx { domain: String },
    /// Check whether a mailbox accepts mail, without sending any
    Verify(VerifyArgs),
}

#[derive(Args)]
pub struct VerifyArgs {
    pub email: String,

    #[arg(long, default_value_t = 25)]
    pub port: u16,

    /// per-stage timeout (ms)
    #[arg(long = "timeout", default_value_t = 5_000)]
    pub timeout_ms: u64,

    /// extra attempts after the first one
    #[arg(long, default_value_t = 1)]
    pub retries: u8,

    /// delay before each retry (ms)
    #[arg(long = "backoff", default_value_t = 2_000)]
    pub backoff_ms: u64,

    /// MAIL FROM envelope (default: postmaster@<domain>)
    #[arg(long = "from")]
    pub mail_from: Option<String>,

    /// name announced in EHLO/HELO
    #[arg(long)]
    pub helo: Option<String>,

    /// fail when STARTTLS is not available
    #[arg(long)]
    pub require_tls: bool,

    /// never upgrade with STARTTLS
    #[arg(long, conflicts_with = "require_tls")]
    pub no_starttls: bool,

    /// accept invalid certificates and host names during STARTTLS
    #[arg(long)]
    pub accept_invalid_certs: bool,

    /// stop after EHLO, do not issue MAIL FROM/RCPT TO
    #[arg(long)]
    pub skip_rcpt: bool,

    /// print the SMTP transcript
    #[arg(long)]
    pub transcript: bool,
}

impl VerifyArgs {
    pub fn probe_config(&self) -> ProbeConfig {
        let mut config = ProbeConfig {
            port: self.port,
            timeout_ms: self.timeout_ms,
            retries: self.retries,
            backoff_ms: self.backoff_ms,
            sender: self.mail_from.clone(),
            tls_required: self.require_tls,
            tls_preferred: !self.no_starttls,
            accept_invalid_certs: self.accept_invalid_certs,
            verify_mailbox: !self.skip_rcpt,
            ..ProbeConfig::default()
        };
        if let Some(helo) = &self.helo {
            config.helo_name = helo.clone();
        }
        config
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Human,
    Json,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn output_format(&self) -> Result<Format> {
        match self.format.as_str() {
            "human" => Ok(Format::Human),
            "json" => Ok(Format::Json),
            other => bail!("unknown --format '{other}', use: human|json"),
        }
    }
}
