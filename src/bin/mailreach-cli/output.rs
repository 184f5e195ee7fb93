use anyhow::Result;
#[cfg(not(feature = "with-serde"))]
use anyhow::bail;

use mailreach_lib::{MailboxVerification, ResolutionOutcome, ResultDetails, VerificationResult};

#[cfg(feature = "with-serde")]
pub fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(not(feature = "with-serde"))]
pub fn print_json<T: ?Sized>(_value: &T) -> Result<()> {
    bail!("--format json nécessite la feature 'with-serde'")
}

pub fn print_resolution(domain: &str, outcome: &ResolutionOutcome) {
    println!("[OK]    {domain}");
    println!(
        "        mx: {}  a-fallback: {}  quality: {}/{}",
        outcome.has_mx,
        outcome.has_a,
        outcome.quality_score,
        ResolutionOutcome::MAX_QUALITY
    );
    for candidate in &outcome.candidates {
        println!("        {candidate}");
    }
}

#[cfg_attr(feature = "with-serde", derive(serde::Serialize))]
pub struct VerificationPayload<'a> {
    pub address: &'a str,
    pub valid: bool,
    pub results: &'a [VerificationResult],
    pub transcript: &'a [String],
}

impl<'a> VerificationPayload<'a> {
    pub fn new(verification: &'a MailboxVerification, transcript: &'a [String]) -> Self {
        Self {
            address: &verification.address,
            valid: verification.is_valid(),
            results: &verification.results,
            transcript,
        }
    }
}

pub fn print_verification(verification: &MailboxVerification) {
    if verification.is_valid() {
        println!("[OK]    {}", verification.address);
    } else {
        println!("[INVALID] {}", verification.address);
    }
    for result in &verification.results {
        println!("        {}", summarize(result));
    }
}

fn summarize(result: &VerificationResult) -> String {
    let status = match (&result.error, result.valid) {
        (Some(err), _) => format!("{} ({}): {}", err.code, err.severity, err.message),
        (None, true) if result.details.is_none() => "skipped".to_string(),
        (None, true) => "ok".to_string(),
        (None, false) => "invalid".to_string(),
    };
    let detail = match &result.details {
        Some(ResultDetails::Smtp(smtp)) => {
            let mut detail = format!(
                " [{}:{} tls={} reply={} {}]",
                smtp.mx_host, smtp.port, smtp.tls_used, smtp.code, smtp.message
            );
            if smtp.greylisted {
                detail.push_str(" greylisted");
            }
            detail
        }
        Some(ResultDetails::Mx(mx)) => {
            let hosts: Vec<_> = mx.candidates.iter().map(ToString::to_string).collect();
            format!(" [{}]", hosts.join(", "))
        }
        None => String::new(),
    };
    format!("{:<5} {status}{detail}", result.validator.as_str())
}

pub fn print_transcript(lines: &[String]) {
    println!("Transcript:");
    for line in lines {
        println!("  {line}");
    }
}
