use crate::session::AuthSession;

/// Access requirements attached to a route group when the router is built.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RouteRequirements {
    pub require_super_admin: bool,

    /// Marks the onboarding flow itself. Exempt routes can never produce
    /// `RedirectToOnboarding`, which makes the redirect loop structurally
    /// impossible instead of relying on a path comparison.
    pub onboarding_exempt: bool,
}

impl RouteRequirements {
    #[must_use]
    pub const fn onboarding() -> Self {
        Self {
            require_super_admin: false,
            onboarding_exempt: true,
        }
    }

    #[must_use]
    pub const fn super_admin_only() -> Self {
        Self {
            require_super_admin: true,
            onboarding_exempt: false,
        }
    }
}

/// Outcome of one guard evaluation, in precedence order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteDecision {
    Loading,
    RedirectToLogin,
    PendingApproval,
    Suspended,
    RedirectToOnboarding,
    RedirectToDashboard,
    Allowed,
}

/// Evaluates the guard chain for one request. First match wins; the order
/// is a deliberate priority chain (approval gating outranks suspension,
/// which outranks onboarding, which outranks role restrictions) and must
/// not be reordered. Super-admins bypass every check past authentication.
#[must_use]
pub fn evaluate(session: Option<&AuthSession>, requirements: RouteRequirements) -> RouteDecision {
    let Some(session) = session else {
        return RouteDecision::RedirectToLogin;
    };

    if session.loading {
        return RouteDecision::Loading;
    }
    if session.user.is_none() {
        return RouteDecision::RedirectToLogin;
    }

    let super_admin = session.is_super_admin();
    if session.is_pending_approval() && !super_admin {
        return RouteDecision::PendingApproval;
    }
    if session.is_suspended() && !super_admin {
        return RouteDecision::Suspended;
    }
    if session.needs_onboarding() && !requirements.onboarding_exempt {
        return RouteDecision::RedirectToOnboarding;
    }
    if requirements.require_super_admin && !super_admin {
        return RouteDecision::RedirectToDashboard;
    }

    RouteDecision::Allowed
}
