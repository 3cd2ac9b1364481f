//! Session lifecycle states and the externally observable view.

use vigil_protocol::UserIdentity;

/// The lifecycle state of the session.
///
/// ```text
///                    ┌──────(warning)──────→ WarningVisible ──┐
/// Unauthenticated ──→ Active                                  ├─(confirm + refresh ok)──→ Active
///        ↑             └──────(idle)────────→ Inactive ───────┘
///        │                                       │ (grace elapses)
///        │            (expiry / cancel / logout / refresh err)
///        └──────────────── LoggedOut ←───────────┘
/// ```
///
/// This enum is the single source of truth for "is a prompt visible",
/// "is the user considered inactive", and "is the session
/// authenticated" — the view the UI consumes is derived from it, never
/// stored separately.
///
/// `LoggedOut` is terminal for the session that reached it: the logout
/// side effect runs exactly once, after which the machine collapses
/// back to `Unauthenticated` and can accept a fresh login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session. The machine is waiting for a login or a restore.
    Unauthenticated,

    /// Signed in, token alive, user present.
    Active,

    /// The expiry-driven warning fired: the extension prompt is
    /// visible, the expiry timer is still running.
    WarningVisible,

    /// The inactivity timeout elapsed: the extension prompt is visible
    /// and the grace deadline is (initially) armed.
    Inactive,

    /// The logout side effect is running. Momentary — observers see
    /// `Unauthenticated` once it completes.
    LoggedOut,
}

impl SessionState {
    /// Whether a session currently exists.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Active | Self::WarningVisible | Self::Inactive)
    }

    /// Whether the extension prompt is visible. At most one prompt
    /// exists at a time, whichever trigger fired first.
    pub fn dialog_visible(&self) -> bool {
        matches!(self, Self::WarningVisible | Self::Inactive)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "Unauthenticated"),
            Self::Active => write!(f, "Active"),
            Self::WarningVisible => write!(f, "WarningVisible"),
            Self::Inactive => write!(f, "Inactive"),
            Self::LoggedOut => write!(f, "LoggedOut"),
        }
    }
}

/// Snapshot of the session published through the `watch` channel.
///
/// `authenticated` and `dialog_visible` are derived from `state`;
/// they're included so UI bindings don't re-derive them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub state: SessionState,
    pub authenticated: bool,
    pub dialog_visible: bool,
    /// Who is signed in, when someone is.
    pub user: Option<UserIdentity>,
}

impl SessionView {
    pub(crate) fn unauthenticated() -> Self {
        Self {
            state: SessionState::Unauthenticated,
            authenticated: false,
            dialog_visible: false,
            user: None,
        }
    }
}

/// Lifecycle notifications for the UI / navigation collaborator.
///
/// Deliberately coarse: a session that ended by refresh failure and one
/// that ended by natural expiry emit the same [`Ended`](Self::Ended) —
/// the user experience is identical, so there is one notification path,
/// not two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A confirmed extension succeeded; the session is active again.
    Extended,
    /// The session ended — expiry, inactivity, refresh failure, or an
    /// explicit logout. Credentials are already cleared when this is
    /// observed.
    Ended,
}
