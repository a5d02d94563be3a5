use std::io::ErrorKind;

/// Failure of a single network operation.
///
/// [`NetworkError::kind`] is the stable name shown to users in log
/// messages, the `Display` output is the detail text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetworkError {
    #[error("{0}")]
    Timeout(String),

    #[error("{0}")]
    ConnectionRefused(String),

    #[error("{0}")]
    Unreachable(String),

    #[error("{0}")]
    Resolution(String),

    #[error("{0}")]
    Http(String),

    #[error("{0}")]
    Io(String),

    #[error("{0}")]
    Interrupted(String),
}

impl NetworkError {
    pub fn kind(&self) -> &'static str {
        match self {
            NetworkError::Timeout(_) => "Timeout",
            NetworkError::ConnectionRefused(_) => "ConnectionRefused",
            NetworkError::Unreachable(_) => "Unreachable",
            NetworkError::Resolution(_) => "ResolutionFailed",
            NetworkError::Http(_) => "HttpError",
            NetworkError::Io(_) => "IoError",
            NetworkError::Interrupted(_) => "Interrupted",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, NetworkError::Timeout(_))
    }

    /// `"<Kind>: <message>"`
    pub fn describe(&self) -> String {
        format!("{}: {}", self.kind(), self)
    }
}

impl From<std::io::Error> for NetworkError {
    fn from(err: std::io::Error) -> Self {
        let message = err.to_string();
        match err.kind() {
            ErrorKind::TimedOut | ErrorKind::WouldBlock => NetworkError::Timeout(message),
            ErrorKind::ConnectionRefused => NetworkError::ConnectionRefused(message),
            ErrorKind::HostUnreachable | ErrorKind::NetworkUnreachable => {
                NetworkError::Unreachable(message)
            }
            ErrorKind::Interrupted => NetworkError::Interrupted(message),
            _ => NetworkError::Io(message),
        }
    }
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            NetworkError::Timeout(err.to_string())
        } else {
            NetworkError::Http(err.to_string())
        }
    }
}
