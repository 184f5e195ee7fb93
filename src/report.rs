//! Result records handed to the surrounding validation pipeline.
//!
//! Each check produces one [`VerificationResult`] keyed by a [`ValidatorId`].
//! With `with-serde` the record serializes to the shape the pipeline expects:
//! `{ validator, valid, error: { code, message, severity, response }, details }`.

use std::fmt;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, Severity};
use crate::mx::{Error as MxError, ExchangeCandidate, ResolutionOutcome};
use crate::smtp_verify::{ProbeError, ProbeOutcome};

/// Which check produced a result.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "with-serde", serde(from = "String", into = "String"))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValidatorId {
    Syntax,
    Disposable,
    Typo,
    Mx,
    Smtp,
    Custom(String),
}

impl ValidatorId {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Syntax => "syntax",
            Self::Disposable => "disposable",
            Self::Typo => "typo",
            Self::Mx => "mx",
            Self::Smtp => "smtp",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for ValidatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ValidatorId {
    fn from(name: String) -> Self {
        match name.as_str() {
            "syntax" => Self::Syntax,
            "disposable" => Self::Disposable,
            "typo" => Self::Typo,
            "mx" => Self::Mx,
            "smtp" => Self::Smtp,
            _ => Self::Custom(name),
        }
    }
}

impl From<ValidatorId> for String {
    fn from(id: ValidatorId) -> Self {
        match id {
            ValidatorId::Custom(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultError {
    pub code: ErrorKind,
    pub message: String,
    pub severity: Severity,
    /// Literal server reply, when the failure came from one.
    #[cfg_attr(
        feature = "with-serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub response: Option<String>,
}

impl ResultError {
    pub fn new(code: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            severity: code.severity(),
            response: None,
        }
    }
}

#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpDetails {
    pub mx_host: String,
    pub port: u16,
    pub mailbox_exists: bool,
    pub tls_used: bool,
    pub code: u16,
    pub message: String,
    #[cfg_attr(
        feature = "with-serde",
        serde(default, skip_serializing_if = "std::ops::Not::not")
    )]
    pub greylisted: bool,
}

impl From<&ProbeOutcome> for SmtpDetails {
    fn from(outcome: &ProbeOutcome) -> Self {
        Self {
            mx_host: outcome.mx_host.clone(),
            port: outcome.port,
            mailbox_exists: outcome.mailbox_exists,
            tls_used: outcome.tls_used,
            code: outcome.response_code,
            message: outcome.response_message.clone(),
            greylisted: outcome.greylisted,
        }
    }
}

#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MxDetails {
    pub candidates: Vec<ExchangeCandidate>,
    pub has_mx: bool,
    pub has_a: bool,
    pub quality_score: u8,
}

impl From<&ResolutionOutcome> for MxDetails {
    fn from(outcome: &ResolutionOutcome) -> Self {
        Self {
            candidates: outcome.candidates.clone(),
            has_mx: outcome.has_mx,
            has_a: outcome.has_a,
            quality_score: outcome.quality_score,
        }
    }
}

#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "with-serde", serde(untagged))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultDetails {
    Smtp(SmtpDetails),
    Mx(MxDetails),
}

/// Outcome of one check for one address.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub validator: ValidatorId,
    pub valid: bool,
    #[cfg_attr(
        feature = "with-serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub error: Option<ResultError>,
    #[cfg_attr(
        feature = "with-serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub details: Option<ResultDetails>,
}

impl VerificationResult {
    /// A check that was disabled: valid, nothing to report.
    pub fn skipped(validator: ValidatorId) -> Self {
        Self {
            validator,
            valid: true,
            error: None,
            details: None,
        }
    }

    pub fn mx(resolution: &Result<ResolutionOutcome, MxError>) -> Self {
        match resolution {
            Ok(outcome) => Self {
                validator: ValidatorId::Mx,
                valid: !outcome.candidates.is_empty(),
                error: None,
                details: Some(ResultDetails::Mx(MxDetails::from(outcome))),
            },
            Err(err) => Self {
                validator: ValidatorId::Mx,
                valid: false,
                error: Some(ResultError::new(err.kind(), err.to_string())),
                details: None,
            },
        }
    }

    /// An accepted recipient, or a connection-only probe that reached EHLO,
    /// is valid; every [`ProbeError`] is not.
    pub fn smtp(probe: &Result<ProbeOutcome, ProbeError>) -> Self {
        match probe {
            Ok(outcome) => Self {
                validator: ValidatorId::Smtp,
                valid: outcome.mailbox_exists || !outcome.mailbox_checked,
                error: None,
                details: Some(ResultDetails::Smtp(SmtpDetails::from(outcome))),
            },
            Err(err) => Self {
                validator: ValidatorId::Smtp,
                valid: false,
                error: Some(ResultError {
                    response: err.response.clone(),
                    ..ResultError::new(err.kind, err.message.clone())
                }),
                details: Some(ResultDetails::Smtp(SmtpDetails::from(&err.outcome))),
            },
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|err| err.code)
    }
}
