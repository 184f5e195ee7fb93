use anyhow::{Context, Result};
use mailreach_lib::{ErrorKind, VerificationResult, check_mx};

use crate::args::Format;
use crate::output;

/// Returns whether the domain has at least one usable exchanger. Lookup
/// failures other than "no exchanger" are fatal.
pub async fn run(domain: &str, format: Format) -> Result<bool> {
    let resolution = match check_mx(domain).await {
        Err(err) if err.kind() != ErrorKind::MxNotFound => {
            return Err(err).with_context(|| format!("resolve MX for '{domain}'"));
        }
        other => other,
    };

    let result = VerificationResult::mx(&resolution);
    match (format, &resolution) {
        (Format::Json, _) => output::print_json(&result)?,
        (Format::Human, Ok(outcome)) => output::print_resolution(domain, outcome),
        (Format::Human, Err(err)) => println!("[INVALID] {domain} :: {err}"),
    }
    Ok(result.valid)
}
