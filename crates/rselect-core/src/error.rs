#![forbid(unsafe_code)]

//! Fetch failure taxonomy.
//!
//! | Failure | Source | Recovery |
//! |---------|--------|----------|
//! | [`FetchError::Network`] | transport, DNS, timeout | `retry()` |
//! | [`FetchError::Server`] | non-2xx status | `retry()`, message shown to the user |
//!
//! Stale responses and empty results are not errors. The controller reports
//! the former as a discard outcome and the latter as a terminal empty state.

use std::fmt;

/// Coarse classification of a [`FetchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Transport-level failure.
    Network,
    /// The server answered with a non-2xx status.
    Server,
}

impl ErrorKind {
    /// Stable string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Server => "server",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a page fetch failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Transport, DNS or timeout failure.
    Network {
        /// Diagnostic message from the transport.
        message: String,
        /// The collaborator gave up waiting.
        timed_out: bool,
    },
    /// Non-2xx response.
    Server {
        /// HTTP status code.
        status: u16,
        /// Message suitable for the user.
        message: String,
    },
}

impl FetchError {
    /// Transport failure.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            timed_out: false,
        }
    }

    /// Transport timeout.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            timed_out: true,
        }
    }

    /// Non-2xx response.
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }

    /// Classification.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Network { .. } => ErrorKind::Network,
            Self::Server { .. } => ErrorKind::Server,
        }
    }

    /// HTTP status, if the server answered.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Network { .. } => None,
            Self::Server { status, .. } => Some(*status),
        }
    }

    /// Whether the inline indicator should offer a retry action.
    ///
    /// Transport failures, 5xx, 408 and 429 are transient. Other 4xx
    /// answers will not change on their own, though `retry` still accepts
    /// them.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::Server { status, .. } => {
                !(*status >= 400 && *status < 500) || *status == 408 || *status == 429
            }
        }
    }

    /// Text for the inline error indicator.
    ///
    /// Server messages are surfaced as-is; transport details are replaced by
    /// a generic hint.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Network {
                timed_out: true, ..
            } => "The server took too long to respond.".to_string(),
            Self::Network { .. } => "Could not reach the server.".to_string(),
            Self::Server { message, status } if message.is_empty() => {
                format!("The server returned an error ({status}).")
            }
            Self::Server { message, .. } => message.clone(),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network {
                message,
                timed_out: true,
            } => write!(f, "network timeout: {message}"),
            Self::Network { message, .. } => write!(f, "network error: {message}"),
            Self::Server { status, message } => write!(f, "server error {status}: {message}"),
        }
    }
}

impl std::error::Error for FetchError {}
