use std::fmt;

/// Errors surfaced by the platform clients (record store, blob store, tasks)
#[derive(Debug)]
pub enum StoreError {
    /// The request could not be sent or the response not read
    Request(reqwest::Error),
    /// The platform rejected the request
    Status { code: u16, message: String },
    /// The response body could not be decoded
    Decode(serde_json::Error),
    /// The requested record does not exist
    NotFound,
    /// The realtime channel failed to open or rejected the join
    Transport(String),
    /// The transport or feed is closed
    Closed,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Request(e) => write!(f, "Request error: {}", e),
            StoreError::Status { code, message } => {
                write!(f, "Platform returned {}: {}", code, message)
            }
            StoreError::Decode(e) => write!(f, "Failed to decode response: {}", e),
            StoreError::NotFound => write!(f, "Record not found"),
            StoreError::Transport(message) => write!(f, "Realtime channel error: {}", message),
            StoreError::Closed => write!(f, "Transport closed"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        StoreError::Request(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Decode(e)
    }
}

/// Errors surfaced by a collaborative note session
#[derive(Debug)]
pub enum SessionError {
    /// The change or presence channel could not be opened at session start.
    /// Fatal to the session; the caller decides whether to retry or degrade
    /// to a non-collaborative read.
    Subscription(StoreError),
    /// A flush or debounce-triggered write failed. The buffer stays dirty and
    /// a later flush will retry.
    Persist(StoreError),
    /// A feed closed unexpectedly after a successful start. The session does
    /// not reconnect on its own.
    TransportDrop,
    /// The session was already stopped
    Stopped,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Subscription(e) => write!(f, "Failed to open subscription: {}", e),
            SessionError::Persist(e) => write!(f, "Failed to persist buffer: {}", e),
            SessionError::TransportDrop => write!(f, "Notification channel dropped"),
            SessionError::Stopped => write!(f, "Session already stopped"),
        }
    }
}

impl std::error::Error for SessionError {}

/// Errors surfaced by the note service
#[derive(Debug)]
pub enum ServiceError {
    Store(StoreError),
    Session(SessionError),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Store(e) => write!(f, "{}", e),
            ServiceError::Session(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        ServiceError::Store(e)
    }
}

impl From<SessionError> for ServiceError {
    fn from(e: SessionError) -> Self {
        ServiceError::Session(e)
    }
}
