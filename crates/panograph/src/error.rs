//! Error types for the panograph crate.

use std::fmt;

/// Result type for panograph operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure reason reported by the imagery service itself.
///
/// The engine maps each reason to a user-facing message; traversal behavior
/// does not depend on which reason occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
    /// No imagery coverage at the requested location.
    ZeroResults,
    /// The credential was rejected.
    RequestDenied,
    /// The service failed for an unspecified reason.
    UnknownError,
    /// Any other non-OK status.
    Other,
}

impl ServiceStatus {
    /// Parse a status string from a service response.
    ///
    /// `"OK"` is not a failure and returns `None`.
    #[must_use]
    pub fn from_wire(status: &str) -> Option<Self> {
        match status {
            "OK" => None,
            "ZERO_RESULTS" => Some(Self::ZeroResults),
            "REQUEST_DENIED" => Some(Self::RequestDenied),
            "UNKNOWN_ERROR" => Some(Self::UnknownError),
            _ => Some(Self::Other),
        }
    }

    /// Message suitable for showing directly to the user.
    #[must_use]
    pub fn user_message(self) -> &'static str {
        match self {
            Self::ZeroResults => "No street imagery coverage at this location.",
            Self::RequestDenied | Self::UnknownError => "Service error: check your API key.",
            Self::Other => "Could not find a road here.",
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ZeroResults => "ZERO_RESULTS",
            Self::RequestDenied => "REQUEST_DENIED",
            Self::UnknownError => "UNKNOWN_ERROR",
            Self::Other => "OTHER",
        };
        f.write_str(s)
    }
}

/// Errors that can occur in panograph operations.
#[derive(Debug)]
pub enum Error {
    /// HTTP request failed.
    Http {
        /// The URL that failed.
        url: String,
        /// The error message.
        message: String,
    },
    /// HTTP response had a non-success status code.
    HttpStatus {
        /// The URL that returned the error.
        url: String,
        /// The HTTP status code.
        status: u16,
    },
    /// JSON decoding failed.
    Json {
        /// Context for where the error occurred.
        context: &'static str,
        /// The error message.
        message: String,
    },
    /// The service answered with a non-OK status.
    Service(ServiceStatus),
    /// Cache operation failed.
    Cache {
        /// The operation that failed.
        operation: &'static str,
        /// The error message.
        message: String,
    },
}

impl Error {
    /// The service-reported failure reason, if this error carries one.
    #[must_use]
    pub fn service_status(&self) -> Option<ServiceStatus> {
        match self {
            Self::Service(status) => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Http { url, message } => {
                write!(f, "http request to {url} failed: {message}")
            }
            Error::HttpStatus { url, status } => {
                write!(f, "http request to {url} returned status {status}")
            }
            Error::Json { context, message } => {
                write!(f, "failed to decode {context}: {message}")
            }
            Error::Service(status) => write!(f, "service returned {status}"),
            Error::Cache { operation, message } => {
                write!(f, "cache {operation} failed: {message}")
            }
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_wire() {
        assert_eq!(ServiceStatus::from_wire("OK"), None);
        assert_eq!(
            ServiceStatus::from_wire("ZERO_RESULTS"),
            Some(ServiceStatus::ZeroResults)
        );
        assert_eq!(
            ServiceStatus::from_wire("REQUEST_DENIED"),
            Some(ServiceStatus::RequestDenied)
        );
        assert_eq!(
            ServiceStatus::from_wire("UNKNOWN_ERROR"),
            Some(ServiceStatus::UnknownError)
        );
        assert_eq!(
            ServiceStatus::from_wire("SOMETHING_NEW"),
            Some(ServiceStatus::Other)
        );
    }

    #[test]
    fn test_user_messages_distinguish_denied_from_no_coverage() {
        assert_ne!(
            ServiceStatus::ZeroResults.user_message(),
            ServiceStatus::RequestDenied.user_message()
        );
        // Denied and unknown share the check-your-key message.
        assert_eq!(
            ServiceStatus::RequestDenied.user_message(),
            ServiceStatus::UnknownError.user_message()
        );
    }

    #[test]
    fn test_error_display() {
        let e = Error::HttpStatus {
            url: "http://example.com/pano".to_string(),
            status: 503,
        };
        assert_eq!(
            e.to_string(),
            "http request to http://example.com/pano returned status 503"
        );

        let e = Error::Service(ServiceStatus::ZeroResults);
        assert_eq!(e.to_string(), "service returned ZERO_RESULTS");
        assert_eq!(e.service_status(), Some(ServiceStatus::ZeroResults));
    }
}
