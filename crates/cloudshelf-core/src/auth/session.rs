/// Whether a credential is currently held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated)
    }
}

/// Session transitions broadcast by the credential store.
///
/// Subscribers (the UI layer) decide what to do with them, e.g. routing the
/// user back to the login prompt on `SessionInvalid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A login or registration stored a new credential.
    LoggedIn,
    /// The user logged out explicitly.
    LoggedOut,
    /// The backend rejected the credential; it has been cleared.
    SessionInvalid,
}

impl SessionEvent {
    /// State the session is in after this event.
    pub fn resulting_state(&self) -> SessionState {
        match self {
            SessionEvent::LoggedIn => SessionState::Authenticated,
            SessionEvent::LoggedOut | SessionEvent::SessionInvalid => SessionState::Anonymous,
        }
    }
}
