use std::fmt;

use thiserror::Error;

/// Upper bound on the number of lines accepted in one reply.
pub(crate) const MAX_REPLY_LINES: usize = 128;

/// A complete SMTP reply: one status code and the text of every line.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpReply {
    pub code: u16,
    pub lines: Vec<String>,
}

impl SmtpReply {
    pub fn is_positive_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }

    pub fn is_permanent_failure(&self) -> bool {
        (500..600).contains(&self.code)
    }

    /// Looks for an ESMTP keyword at the start of any line (case-insensitive).
    pub fn has_capability(&self, cap: &str) -> bool {
        self.lines.iter().any(|line| {
            line.split_whitespace()
                .next()
                .is_some_and(|token| token.eq_ignore_ascii_case(cap))
        })
    }

    /// All lines joined by a single space.
    pub fn message(&self) -> String {
        self.lines.join(" ")
    }
}

impl fmt::Display for SmtpReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.message())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplyError {
    #[error("invalid reply line: {0:?}")]
    Malformed(String),
    #[error("inconsistent reply codes: {first} vs {found}")]
    InconsistentCode { first: u16, found: u16 },
    #[error("reply longer than {MAX_REPLY_LINES} lines")]
    TooManyLines,
}

/// Accumulates reply lines until the terminal one arrives.
///
/// `250-` marks a continuation line, `250 ` (or a bare `250`) the last one.
/// Every line of a reply must carry the same code.
#[derive(Debug, Default)]
pub struct ReplyParser {
    code: Option<u16>,
    lines: Vec<String>,
}

impl ReplyParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one line (CRLF optional). Returns the reply once complete; the
    /// parser is then ready for the next reply.
    pub fn feed(&mut self, raw: &str) -> Result<Option<SmtpReply>, ReplyError> {
        let line = raw.trim_end_matches(['\r', '\n']);
        let bytes = line.as_bytes();
        if bytes.len() < 3
            || !bytes[..3].iter().all(u8::is_ascii_digit)
            || !(b'2'..=b'5').contains(&bytes[0])
        {
            return Err(ReplyError::Malformed(line.to_string()));
        }
        let code = u16::from(bytes[0] - b'0') * 100
            + u16::from(bytes[1] - b'0') * 10
            + u16::from(bytes[2] - b'0');

        let last = match bytes.get(3) {
            None | Some(b' ') => true,
            Some(b'-') => false,
            Some(_) => return Err(ReplyError::Malformed(line.to_string())),
        };

        if let Some(first) = self.code {
            if first != code {
                self.reset();
                return Err(ReplyError::InconsistentCode { first, found: code });
            }
        } else {
            self.code = Some(code);
        }

        if self.lines.len() >= MAX_REPLY_LINES {
            self.reset();
            return Err(ReplyError::TooManyLines);
        }
        self.lines.push(line.get(4..).unwrap_or_default().to_string());

        if last {
            let lines = std::mem::take(&mut self.lines);
            self.code = None;
            Ok(Some(SmtpReply { code, lines }))
        } else {
            Ok(None)
        }
    }

    fn reset(&mut self) {
        self.code = None;
        self.lines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_all(lines: &[&str]) -> Result<Vec<SmtpReply>, ReplyError> {
        let mut parser = ReplyParser::new();
        let mut out = Vec::new();
        for line in lines {
            if let Some(reply) = parser.feed(line)? {
                out.push(reply);
            }
        }
        Ok(out)
    }

    #[test]
    fn single_line_reply() {
        let replies = parse_all(&["250 2.1.5 Ok\r\n"]).unwrap();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].code, 250);
        assert_eq!(replies[0].lines, vec!["2.1.5 Ok"]);
        assert!(replies[0].is_positive_completion());
    }

    #[test]
    fn multi_line_reply_completes_on_terminal_line() {
        let mut parser = ReplyParser::new();
        assert_eq!(parser.feed("250-mx.example.com Hello").unwrap(), None);
        assert_eq!(parser.feed("250-SIZE 35882577").unwrap(), None);
        let reply = parser.feed("250 STARTTLS").unwrap().expect("complete");
        assert_eq!(reply.lines.len(), 3);
        assert!(reply.has_capability("starttls"));
        let next = parser.feed("221 Bye").unwrap().expect("fresh reply");
        assert_eq!(next.lines, vec!["Bye"]);
    }

    #[test]
    fn capability_scan_covers_continuation_lines() {
        let replies = parse_all(&["250-mx.example.com", "250-STARTTLS", "250 8BITMIME"]).unwrap();
        assert!(replies[0].has_capability("STARTTLS"));
        assert!(!replies[0].has_capability("AUTH"));
    }

    #[test]
    fn bare_code_is_terminal() {
        let replies = parse_all(&["220"]).unwrap();
        assert_eq!(replies[0].code, 220);
        assert_eq!(replies[0].lines, vec![String::new()]);
    }

    #[test]
    fn inconsistent_codes_are_rejected() {
        let err = parse_all(&["250-first", "251 second"]).unwrap_err();
        assert_eq!(err, ReplyError::InconsistentCode { first: 250, found: 251 });
    }

    #[test]
    fn malformed_lines_are_rejected() {
        assert!(matches!(parse_all(&["25"]), Err(ReplyError::Malformed(_))));
        assert!(matches!(parse_all(&["ABC ok"]), Err(ReplyError::Malformed(_))));
        assert!(matches!(parse_all(&["250+weird"]), Err(ReplyError::Malformed(_))));
        assert!(matches!(parse_all(&["999 nope"]), Err(ReplyError::Malformed(_))));
    }

    #[test]
    fn overly_long_replies_are_rejected() {
        let mut parser = ReplyParser::new();
        for _ in 0..MAX_REPLY_LINES {
            assert!(parser.feed("250-filler").unwrap().is_none());
        }
        assert_eq!(parser.feed("250 end"), Err(ReplyError::TooManyLines));
        let reply = parser.feed("221 Bye").unwrap().expect("parser recovered");
        assert_eq!(reply.code, 221);
    }

    #[test]
    fn display_uses_code_and_joined_text() {
        let reply = SmtpReply {
            code: 550,
            lines: vec!["5.1.1".into(), "User unknown".into()],
        };
        assert_eq!(reply.to_string(), "550 5.1.1 User unknown");
        assert!(reply.is_permanent_failure());
    }
}
