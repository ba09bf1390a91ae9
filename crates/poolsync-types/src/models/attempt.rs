//! Sync attempt lifecycle and the report delivered at its end.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AttemptError, SyncError};

/// Lifecycle of one synchronization attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncState {
    Pending,
    Accepted,
    Bound,
    Error,
    Unbound,
}

impl SyncState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Bound | Self::Error | Self::Unbound)
    }
}

/// The three ways an attempt can end.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TerminalState {
    /// Pool matches the desired state
    Bound,
    /// A stage failed; the report carries the cause
    Error,
    /// Pool removed, or was already absent
    Unbound,
}

impl From<TerminalState> for SyncState {
    fn from(state: TerminalState) -> Self {
        match state {
            TerminalState::Bound => Self::Bound,
            TerminalState::Error => Self::Error,
            TerminalState::Unbound => Self::Unbound,
        }
    }
}

impl fmt::Display for TerminalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Bound => write!(f, "BOUND"),
            Self::Error => write!(f, "ERROR"),
            Self::Unbound => write!(f, "UNBOUND"),
        }
    }
}

/// One run of the state machine.
///
/// Moves to exactly one terminal state; a second terminal transition is an
/// error rather than a silent overwrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncAttempt {
    id: String,
    state: SyncState,
    error: Option<SyncError>,
}

impl SyncAttempt {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), state: SyncState::Pending, error: None }
    }

    /// Attempt with a freshly generated id, for attempts nobody requested.
    pub fn generated() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn error(&self) -> Option<&SyncError> {
        self.error.as_ref()
    }

    pub fn accept(&mut self) -> Result<(), AttemptError> {
        if self.state.is_terminal() {
            return Err(AttemptError::AlreadyTerminal { id: self.id.clone(), state: self.state });
        }
        self.state = SyncState::Accepted;
        Ok(())
    }

    /// The cause is kept only for `Error`.
    pub fn finish(
        &mut self,
        terminal: TerminalState,
        cause: Option<SyncError>,
    ) -> Result<(), AttemptError> {
        if self.state.is_terminal() {
            return Err(AttemptError::AlreadyTerminal { id: self.id.clone(), state: self.state });
        }
        self.state = terminal.into();
        self.error = if terminal == TerminalState::Error { cause } else { None };
        Ok(())
    }
}

/// Authorization header value forwarded from the originating request.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credentials(String);

impl Credentials {
    pub fn from_header(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn header_value(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credentials(<redacted>)")
    }
}

/// Where an attempt came from, so its report can point back at it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    pub uri: String,
    #[serde(skip)]
    pub credentials: Option<Credentials>,
}

impl Origin {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into(), credentials: None }
    }

    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }
}

/// Terminal outcome of an attempt, as handed to the report sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub attempt_id: String,
    pub state: TerminalState,
    pub origin: Origin,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<SyncError>,
}

impl SyncReport {
    pub fn from_attempt(attempt: &SyncAttempt, origin: Origin) -> Option<Self> {
        let state = match attempt.state() {
            SyncState::Bound => TerminalState::Bound,
            SyncState::Error => TerminalState::Error,
            SyncState::Unbound => TerminalState::Unbound,
            SyncState::Pending | SyncState::Accepted => return None,
        };
        Some(Self {
            attempt_id: attempt.id().to_string(),
            state,
            origin,
            cause: attempt.error().cloned(),
        })
    }
}
