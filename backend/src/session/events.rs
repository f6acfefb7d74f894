use crate::session::SessionUser;

/// Session lifecycle notifications. Exactly one of these fires per
/// transition; everything downstream (loads, guard state) reacts to them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthEvent {
    /// A still-valid token was presented for a session the registry does not
    /// hold (e.g. after a restart); the session is restored without an
    /// interactive login.
    InitialSession { user: SessionUser },

    /// Interactive login just completed.
    SignedIn { user: SessionUser },

    /// A new access token was issued for an existing session.
    TokenRefreshed { user: SessionUser },

    /// The session ended. All derived state is dropped synchronously; any
    /// in-flight load for this session must land dead.
    SignedOut,
}
