use std::borrow::Cow;
use std::time::Duration;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

/// Configuration knobs for the [`Prober`](super::Prober).
///
/// With the `with-serde` feature the struct deserializes from the validator
/// configuration object (`enabled`, `timeout`, `retries`, `sender`,
/// `tlsRequired`, `verifyMailbox`, `port`); missing fields take their defaults.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "with-serde", serde(default, rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    pub enabled: bool,
    /// Per-stage budget in milliseconds (connect, each read/write, TLS handshake).
    #[cfg_attr(feature = "with-serde", serde(rename = "timeout"))]
    pub timeout_ms: u64,
    /// Extra attempts after the first one.
    pub retries: u8,
    /// Envelope sender for `MAIL FROM`; `postmaster@<target domain>` when unset.
    pub sender: Option<String>,
    pub tls_required: bool,
    /// Upgrade with STARTTLS whenever the server offers it.
    pub tls_preferred: bool,
    pub accept_invalid_certs: bool,
    /// Run `MAIL FROM`/`RCPT TO`; when false the probe stops after EHLO.
    pub verify_mailbox: bool,
    pub port: u16,
    /// Identity announced in `EHLO`/`HELO`.
    pub helo_name: String,
    /// Delay before each retry, in milliseconds.
    pub backoff_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: 5_000,
            retries: 1,
            sender: None,
            tls_required: false,
            tls_preferred: true,
            accept_invalid_certs: false,
            verify_mailbox: true,
            port: 25,
            helo_name: "localhost".to_string(),
            backoff_ms: 2_000,
        }
    }
}

impl ProbeConfig {
    /// Per-stage timeout. A zero value is clamped to one millisecond so that
    /// no stage can wait forever.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.max(1))
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn max_attempts(&self) -> usize {
        usize::from(self.retries) + 1
    }

    pub fn helo_name(&self) -> &str {
        let trimmed = self.helo_name.trim();
        if trimmed.is_empty() { "localhost" } else { trimmed }
    }

    pub fn wants_tls(&self) -> bool {
        self.tls_required || self.tls_preferred
    }

    /// Returns the `MAIL FROM` address. Without a configured sender a
    /// `postmaster@domain` placeholder is synthesised; with neither the null
    /// reverse-path is used.
    pub fn envelope_sender<'a>(&'a self, target_domain: &str) -> Cow<'a, str> {
        match self.sender.as_deref().map(str::trim) {
            Some(sender) if !sender.is_empty() => Cow::Borrowed(sender),
            _ if target_domain.is_empty() => Cow::Borrowed(""),
            _ => Cow::Owned(format!("postmaster@{target_domain}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ProbeConfig::default();
        assert!(config.enabled);
        assert_eq!(config.port, 25);
        assert_eq!(config.retries, 1);
        assert_eq!(config.max_attempts(), 2);
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert!(config.verify_mailbox);
        assert!(!config.tls_required);
    }

    #[test]
    fn envelope_sender_falls_back_to_postmaster() {
        let mut config = ProbeConfig::default();
        assert_eq!(config.envelope_sender("example.com"), "postmaster@example.com");
        assert_eq!(config.envelope_sender(""), "");
        config.sender = Some(" probe@verifier.test ".to_string());
        assert_eq!(config.envelope_sender("example.com"), "probe@verifier.test");
    }

    #[test]
    fn zero_timeout_is_clamped() {
        let config = ProbeConfig {
            timeout_ms: 0,
            ..ProbeConfig::default()
        };
        assert_eq!(config.timeout(), Duration::from_millis(1));
    }

    #[cfg(feature = "with-serde")]
    #[test]
    fn deserializes_validator_config_object() {
        let config: ProbeConfig = serde_json::from_str(
            r#"{"enabled":true,"timeout":1500,"retries":2,"sender":"v@check.test",
                "tlsRequired":true,"verifyMailbox":false,"port":2525}"#,
        )
        .unwrap();
        assert_eq!(config.timeout_ms, 1500);
        assert_eq!(config.retries, 2);
        assert_eq!(config.sender.as_deref(), Some("v@check.test"));
        assert!(config.tls_required);
        assert!(!config.verify_mailbox);
        assert_eq!(config.port, 2525);
        assert_eq!(config.helo_name, "localhost");
    }
}
