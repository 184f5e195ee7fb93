use std::sync::Arc;

use anyhow::{Context, Result};
use mailreach_lib::mx::system_resolver;
use mailreach_lib::{Prober, TranscriptSink, VerifyError, verify_with};

use crate::args::{Format, VerifyArgs};
use crate::output::{self, VerificationPayload};

/// Returns whether every check passed.
pub async fn run(args: &VerifyArgs, format: Format) -> Result<bool> {
    let config = args.probe_config();
    let resolver = system_resolver(Some(config.timeout())).context("init DNS resolver")?;
    let sink = Arc::new(TranscriptSink::new());
    let mut prober = Prober::new(config).context("init TLS connector")?;
    if args.transcript {
        prober = prober.with_sink(sink.clone());
    }

    let verification = match verify_with(&resolver, &prober, &args.email).await {
        Ok(verification) => verification,
        Err(
            err @ (VerifyError::InvalidAddress { .. } | VerifyError::InvalidDomain { .. }),
        ) => {
            println!("[INVALID] {} :: {err}", args.email);
            return Ok(false);
        }
        Err(err) => return Err(err).with_context(|| format!("verify '{}'", args.email)),
    };
    let transcript = sink.take();

    match format {
        Format::Human => {
            output::print_verification(&verification);
            if args.transcript {
                output::print_transcript(&transcript);
            }
        }
        Format::Json => output::print_json(&VerificationPayload::new(&verification, &transcript))?,
    }
    Ok(verification.is_valid())
}
