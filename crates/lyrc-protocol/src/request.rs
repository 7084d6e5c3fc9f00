//! Request parsing
//!
//! A request line is split on whitespace into at most three tokens:
//! directive, remote and key. Extra tokens are ignored.

use std::fmt;

use tracing::debug;

use crate::error::ProtocolError;

/// Verb of a request
///
/// Directives are matched exactly and case-sensitively. Anything that is not
/// one of the known literals is kept verbatim in [`Directive::Other`] so the
/// engine can name it in its error reply.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Directive {
    /// `LIST [remote [key]]`
    List,
    /// `SEND_ONCE remote key`
    SendOnce,
    /// `SEND_START remote key`
    SendStart,
    /// `SEND_STOP`
    SendStop,
    /// Unrecognized directive
    Other(String),
}

impl Directive {
    /// Parse a directive token
    pub fn parse(token: &str) -> Self {
        match token {
            "LIST" => Self::List,
            "SEND_ONCE" => Self::SendOnce,
            "SEND_START" => Self::SendStart,
            "SEND_STOP" => Self::SendStop,
            other => Self::Other(other.to_string()),
        }
    }

    /// Wire spelling of the directive
    pub fn as_str(&self) -> &str {
        match self {
            Self::List => "LIST",
            Self::SendOnce => "SEND_ONCE",
            Self::SendStart => "SEND_START",
            Self::SendStop => "SEND_STOP",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed request line
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Request {
    /// Requested verb
    pub directive: Directive,
    /// Remote name (empty if not given)
    pub remote: String,
    /// Key name (empty if not given)
    pub key: String,
    /// The request line as received, trailing whitespace trimmed
    raw: String,
}

impl Request {
    /// Parse a request line
    ///
    /// Returns [`ProtocolError::EmptyRequest`] for blank lines.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let raw = line.trim_end();
        let mut tokens = raw.split_whitespace();

        let directive = tokens.next().ok_or(ProtocolError::EmptyRequest)?;
        let remote = tokens.next().unwrap_or("");
        let key = tokens.next().unwrap_or("");

        let request = Self {
            directive: Directive::parse(directive),
            remote: remote.to_string(),
            key: key.to_string(),
            raw: raw.to_string(),
        };
        debug!("Parsed request {:?}", request);
        Ok(request)
    }

    /// Build a request from its parts
    pub fn new(directive: Directive, remote: impl Into<String>, key: impl Into<String>) -> Self {
        let remote = remote.into();
        let key = key.into();
        let raw = [directive.as_str(), remote.as_str(), key.as_str()]
            .iter()
            .filter(|s| !s.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            directive,
            remote,
            key,
            raw,
        }
    }

    /// The request line echoed back in replies
    pub fn raw(&self) -> &str {
        &self.raw
    }
}
