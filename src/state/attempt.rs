/// Attempt outcome definitions for the fetch state machine
///
/// Every physical HTTP attempt ends in exactly one of these states. The state
/// decides whether the endpoint is retried, and carries the status code and
/// error string that are written to the outcome row.
use serde_json::Value;
use std::fmt;

/// Maximum characters kept from an unexpected error message
pub const MAX_ERROR_MESSAGE_CHARS: usize = 200;

/// Result of one physical HTTP attempt
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    /// 2xx response whose body parsed as JSON
    Success { status: u16, payload: Value },

    /// HTTP 401/403: credentials will not become valid by retrying
    AuthRejected { status: u16 },

    /// HTTP 429, 5xx, or a network-level failure
    RetryableFailure { status: Option<u16>, error: String },

    /// Any failure that the same request would reproduce
    TerminalFailure { status: Option<u16>, error: String },
}

impl AttemptOutcome {
    /// Classifies a non-2xx HTTP status
    ///
    /// Returns `None` for 2xx statuses, which can only be classified once the
    /// body has been parsed.
    ///
    /// | Status | Outcome |
    /// |--------|---------|
    /// | 401, 403 | AuthRejected (`auth_status:<code>`) |
    /// | 429, 500-599 | RetryableFailure (`retryable_status:<code>`) |
    /// | anything else | TerminalFailure (`http_status:<code>`) |
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            200..=299 => None,
            401 | 403 => Some(Self::AuthRejected { status }),
            429 | 500..=599 => Some(Self::RetryableFailure {
                status: Some(status),
                error: format!("retryable_status:{}", status),
            }),
            _ => Some(Self::TerminalFailure {
                status: Some(status),
                error: format!("http_status:{}", status),
            }),
        }
    }

    /// Classifies a 2xx body that is not valid JSON
    pub fn parse_failure(status: u16, err: &serde_json::Error) -> Self {
        use serde_json::error::Category;

        let kind = match err.classify() {
            Category::Syntax => "syntax",
            Category::Eof => "eof",
            Category::Data => "data",
            Category::Io => "io",
        };

        Self::TerminalFailure {
            status: Some(status),
            error: format!("parse_failure:{}", kind),
        }
    }

    /// Network-level failure (timeout, connection, body transfer)
    pub fn network(status: Option<u16>, kind: &str) -> Self {
        Self::RetryableFailure {
            status,
            error: format!("network:{}", kind),
        }
    }

    /// Failure that fits no other class; the message is truncated
    pub fn unexpected(status: Option<u16>, kind: &str, message: &str) -> Self {
        let message: String = message.chars().take(MAX_ERROR_MESSAGE_CHARS).collect();
        Self::TerminalFailure {
            status,
            error: format!("unexpected:{}:{}", kind, message),
        }
    }

    /// HTTP status observed during the attempt, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Success { status, .. } | Self::AuthRejected { status } => Some(*status),
            Self::RetryableFailure { status, .. } | Self::TerminalFailure { status, .. } => *status,
        }
    }

    /// Error string recorded on the outcome row (`None` for success)
    pub fn error(&self) -> Option<String> {
        match self {
            Self::Success { .. } => None,
            Self::AuthRejected { status } => Some(format!("auth_status:{}", status)),
            Self::RetryableFailure { error, .. } | Self::TerminalFailure { error, .. } => {
                Some(error.clone())
            }
        }
    }

    /// Returns true if this outcome leads to another attempt (budget permitting)
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RetryableFailure { .. })
    }

    /// Returns true if this represents a successful completion
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Short name used in log lines
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::AuthRejected { .. } => "auth_rejected",
            Self::RetryableFailure { .. } => "retryable_failure",
            Self::TerminalFailure { .. } => "terminal_failure",
        }
    }
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.error() {
            Some(error) => write!(f, "{} ({})", self.label(), error),
            None => f.write_str(self.label()),
        }
    }
}
