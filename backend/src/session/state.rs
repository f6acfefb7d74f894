use serde::{Deserialize, Serialize};

use crate::db::{Profile, SignupRequest, SignupStatus, SystemRole, TenantMembership, TenantRole};
use crate::session::AuthEvent;

/// Identity attached to a session, taken from token claims.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
}

/// Handle for applying an asynchronous user-data load. A load started
/// before a sign-out carries a stale epoch and is discarded on arrival.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadTicket {
    epoch: u64,
}

/// Everything a dependent-data load produces.
#[derive(Clone, Debug, Default)]
pub struct LoadedUserData {
    pub profile: Option<Profile>,
    pub memberships: Vec<TenantMembership>,
    pub signup_request: Option<SignupRequest>,
}

/// Per-session auth state. One logical writer at a time (the registry's
/// write lock); read through cloned snapshots everywhere else.
#[derive(Clone, Debug, Default)]
pub struct AuthSession {
    pub user: Option<SessionUser>,
    pub profile: Option<Profile>,
    pub memberships: Vec<TenantMembership>,
    pub current_tenant: Option<TenantMembership>,
    pub signup_request: Option<SignupRequest>,
    pub loading: bool,
    epoch: u64,
}

/// Authorization flags derived from session state; recomputed on demand,
/// never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionFlags {
    pub is_super_admin: bool,
    pub is_company_admin: bool,
    pub is_pending_approval: bool,
    pub is_suspended: bool,
}

/// Wire shape of a session, as returned by the session endpoints.
#[derive(Debug, Serialize)]
pub struct SessionSnapshot {
    pub user: Option<SessionUser>,
    pub profile: Option<Profile>,
    pub memberships: Vec<TenantMembership>,
    pub current_tenant: Option<TenantMembership>,
    pub signup_request: Option<SignupRequest>,
    pub loading: bool,
    pub flags: SessionFlags,
}

impl AuthSession {
    /// Applies one lifecycle event. User-bearing events mark the session
    /// loading until the dependent-data load lands; sign-out clears all
    /// derived state right here, synchronously.
    pub fn handle_event(&mut self, event: AuthEvent) {
        match event {
            AuthEvent::InitialSession { user }
            | AuthEvent::SignedIn { user }
            | AuthEvent::TokenRefreshed { user } => {
                self.user = Some(user);
                self.loading = true;
            }
            AuthEvent::SignedOut => self.clear(),
        }
    }

    /// Starts a load against the current epoch.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.loading = true;
        LoadTicket { epoch: self.epoch }
    }

    /// Applies a finished load. Returns false (leaving the session
    /// untouched) when the session was reset while the load was in flight.
    pub fn apply_load(&mut self, ticket: LoadTicket, data: LoadedUserData) -> bool {
        if ticket.epoch != self.epoch {
            return false;
        }
        self.profile = data.profile;
        self.memberships = data.memberships;
        self.current_tenant = self.memberships.first().cloned();
        self.signup_request = data.signup_request;
        self.loading = false;
        true
    }

    /// Replaces the membership list while preserving the current selection
    /// when its tenant is still present (taking the refreshed entry for it).
    /// Otherwise the selection falls back to the head of the new list.
    pub fn merge_memberships(&mut self, memberships: Vec<TenantMembership>) {
        self.memberships = memberships;
        let refreshed_current = self.current_tenant.as_ref().and_then(|current| {
            self.memberships
                .iter()
                .find(|m| m.tenant_id == current.tenant_id)
                .cloned()
        });
        self.current_tenant = refreshed_current.or_else(|| self.memberships.first().cloned());
    }

    /// Pure selection update; accepts `None`.
    pub fn set_current_tenant(&mut self, membership: Option<TenantMembership>) {
        self.current_tenant = membership;
    }

    fn clear(&mut self) {
        self.user = None;
        self.profile = None;
        self.memberships = Vec::new();
        self.current_tenant = None;
        self.signup_request = None;
        self.loading = false;
        // invalidates every outstanding load ticket
        self.epoch += 1;
    }

    #[must_use]
    pub fn is_super_admin(&self) -> bool {
        match self.profile.as_ref().map(|p| p.system_role) {
            Some(SystemRole::SuperAdmin) => true,
            Some(SystemRole::RegularUser) | None => false,
        }
    }

    #[must_use]
    pub fn is_company_admin(&self) -> bool {
        if self.is_super_admin() {
            return true;
        }
        match self.current_tenant.as_ref().map(|m| m.role) {
            Some(TenantRole::CompanyAdmin) => true,
            Some(TenantRole::Manager | TenantRole::Employee) | None => false,
        }
    }

    #[must_use]
    pub fn is_pending_approval(&self) -> bool {
        let request_pending = match self.signup_request.as_ref().map(|r| r.status) {
            Some(SignupStatus::Pending) => true,
            Some(SignupStatus::Approved | SignupStatus::Rejected) | None => false,
        };
        request_pending && self.memberships.is_empty()
    }

    #[must_use]
    pub fn is_suspended(&self) -> bool {
        self.current_tenant.as_ref().is_some_and(|m| m.is_suspended)
    }

    /// A selected tenant without a job title marks the account as not yet
    /// onboarded. Company admins (and therefore super-admins) are exempt.
    #[must_use]
    pub fn needs_onboarding(&self) -> bool {
        let missing_job_title = self
            .current_tenant
            .as_ref()
            .is_some_and(|m| m.job_title.as_deref().is_none_or(str::is_empty));
        missing_job_title && !self.is_company_admin()
    }

    #[must_use]
    pub fn flags(&self) -> SessionFlags {
        SessionFlags {
            is_super_admin: self.is_super_admin(),
            is_company_admin: self.is_company_admin(),
            is_pending_approval: self.is_pending_approval(),
            is_suspended: self.is_suspended(),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            flags: self.flags(),
            user: self.user.clone(),
            profile: self.profile.clone(),
            memberships: self.memberships.clone(),
            current_tenant: self.current_tenant.clone(),
            signup_request: self.signup_request.clone(),
            loading: self.loading,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::db::TenantInfo;

    fn test_user() -> SessionUser {
        SessionUser {
            id: "user-1".to_string(),
            email: "user@example.com".to_string(),
        }
    }

    fn test_profile(system_role: SystemRole) -> Profile {
        let now = Utc::now().naive_utc();
        Profile {
            id: "user-1".to_string(),
            email: "user@example.com".to_string(),
            full_name: Some("Test User".to_string()),
            avatar_url: None,
            phone: None,
            system_role,
            created_at: now,
            updated_at: now,
        }
    }

    fn test_membership(tenant_id: &str, role: TenantRole, job_title: Option<&str>, is_suspended: bool) -> TenantMembership {
        TenantMembership {
            id: format!("m-{tenant_id}"),
            tenant_id: tenant_id.to_string(),
            role,
            department: Some("Management".to_string()),
            job_title: job_title.map(str::to_string),
            is_suspended,
            tenant: TenantInfo {
                id: tenant_id.to_string(),
                name: format!("Tenant {tenant_id}"),
                domain: None,
                logo_url: None,
            },
        }
    }

    fn test_request(status: SignupStatus) -> SignupRequest {
        let now = Utc::now().naive_utc();
        SignupRequest {
            id: "req-1".to_string(),
            user_id: "user-1".to_string(),
            company_name: "New Agency".to_string(),
            company_type: None,
            status,
            assigned_tenant_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn signed_in_session(data: LoadedUserData) -> AuthSession {
        let mut session = AuthSession::default();
        session.handle_event(AuthEvent::SignedIn { user: test_user() });
        let ticket = session.begin_load();
        assert!(session.apply_load(ticket, data));
        session
    }

    #[test]
    fn test_signed_in_sets_user_and_loading() {
        let mut session = AuthSession::default();
        session.handle_event(AuthEvent::SignedIn { user: test_user() });

        assert_eq!(session.user, Some(test_user()));
        assert!(session.loading);
    }

    #[test]
    fn test_apply_load_selects_first_membership() {
        let session = signed_in_session(LoadedUserData {
            profile: Some(test_profile(SystemRole::RegularUser)),
            memberships: vec![
                test_membership("t1", TenantRole::Employee, Some("Agent"), false),
                test_membership("t2", TenantRole::Employee, Some("Agent"), false),
            ],
            signup_request: None,
        });

        assert!(!session.loading);
        assert_eq!(session.current_tenant.as_ref().map(|m| m.tenant_id.as_str()), Some("t1"));
    }

    #[test]
    fn test_no_memberships_no_request_is_default_state() {
        let session = signed_in_session(LoadedUserData {
            profile: Some(test_profile(SystemRole::RegularUser)),
            memberships: Vec::new(),
            signup_request: None,
        });

        assert!(session.current_tenant.is_none());
        assert!(!session.is_pending_approval());
    }

    #[test]
    fn test_signed_out_clears_all_state() {
        let mut session = signed_in_session(LoadedUserData {
            profile: Some(test_profile(SystemRole::RegularUser)),
            memberships: vec![test_membership("t1", TenantRole::Employee, Some("Agent"), false)],
            signup_request: Some(test_request(SignupStatus::Pending)),
        });

        session.handle_event(AuthEvent::SignedOut);

        assert!(session.user.is_none());
        assert!(session.profile.is_none());
        assert!(session.memberships.is_empty());
        assert!(session.current_tenant.is_none());
        assert!(session.signup_request.is_none());
        assert!(!session.loading);
    }

    #[test]
    fn test_late_load_discarded_after_sign_out() {
        let mut session = AuthSession::default();
        session.handle_event(AuthEvent::SignedIn { user: test_user() });
        let ticket = session.begin_load();

        // sign-out lands while the load is still in flight
        session.handle_event(AuthEvent::SignedOut);

        let accepted = session.apply_load(ticket, LoadedUserData {
            profile: Some(test_profile(SystemRole::RegularUser)),
            memberships: vec![test_membership("t1", TenantRole::Employee, Some("Agent"), false)],
            signup_request: None,
        });

        assert!(!accepted);
        assert!(session.user.is_none());
        assert!(session.profile.is_none());
        assert!(session.memberships.is_empty());
    }

    #[test]
    fn test_load_after_new_sign_in_is_accepted() {
        let mut session = AuthSession::default();
        session.handle_event(AuthEvent::SignedOut);
        session.handle_event(AuthEvent::SignedIn { user: test_user() });
        let ticket = session.begin_load();

        let accepted = session.apply_load(ticket, LoadedUserData::default());
        assert!(accepted);
        assert!(!session.loading);
    }

    #[test]
    fn test_merge_memberships_keeps_existing_selection() {
        let mut session = signed_in_session(LoadedUserData {
            profile: Some(test_profile(SystemRole::RegularUser)),
            memberships: vec![
                test_membership("t1", TenantRole::Employee, Some("Agent"), false),
                test_membership("t2", TenantRole::Employee, Some("Agent"), false),
            ],
            signup_request: None,
        });
        session.set_current_tenant(Some(test_membership("t2", TenantRole::Employee, Some("Agent"), false)));

        session.merge_memberships(vec![
            test_membership("t1", TenantRole::Employee, Some("Agent"), false),
            test_membership("t2", TenantRole::Employee, Some("Agent"), false),
            test_membership("t3", TenantRole::Employee, Some("Agent"), false),
        ]);

        assert_eq!(session.current_tenant.as_ref().map(|m| m.tenant_id.as_str()), Some("t2"));
    }

    #[test]
    fn test_merge_memberships_is_idempotent() {
        let memberships = vec![
            test_membership("t1", TenantRole::Employee, Some("Agent"), false),
            test_membership("t2", TenantRole::Employee, Some("Agent"), false),
        ];
        let mut session = signed_in_session(LoadedUserData {
            profile: Some(test_profile(SystemRole::RegularUser)),
            memberships: memberships.clone(),
            signup_request: None,
        });

        session.merge_memberships(memberships.clone());
        let after_first = session.current_tenant.clone();
        let list_after_first: Vec<String> = session.memberships.iter().map(|m| m.id.clone()).collect();

        session.merge_memberships(memberships);
        let list_after_second: Vec<String> = session.memberships.iter().map(|m| m.id.clone()).collect();

        assert_eq!(list_after_first, list_after_second);
        assert_eq!(
            after_first.map(|m| m.tenant_id),
            session.current_tenant.map(|m| m.tenant_id)
        );
    }

    #[test]
    fn test_merge_memberships_resets_removed_selection() {
        let mut session = signed_in_session(LoadedUserData {
            profile: Some(test_profile(SystemRole::RegularUser)),
            memberships: vec![
                test_membership("t1", TenantRole::Employee, Some("Agent"), false),
                test_membership("t2", TenantRole::Employee, Some("Agent"), false),
            ],
            signup_request: None,
        });
        session.set_current_tenant(Some(test_membership("t2", TenantRole::Employee, Some("Agent"), false)));

        session.merge_memberships(vec![test_membership("t1", TenantRole::Employee, Some("Agent"), false)]);

        assert_eq!(session.current_tenant.as_ref().map(|m| m.tenant_id.as_str()), Some("t1"));
    }

    #[test]
    fn test_merge_memberships_selects_first_when_none_selected() {
        let mut session = signed_in_session(LoadedUserData {
            profile: Some(test_profile(SystemRole::RegularUser)),
            memberships: Vec::new(),
            signup_request: None,
        });
        assert!(session.current_tenant.is_none());

        session.merge_memberships(vec![test_membership("t1", TenantRole::Employee, Some("Agent"), false)]);

        assert_eq!(session.current_tenant.as_ref().map(|m| m.tenant_id.as_str()), Some("t1"));
    }

    #[test]
    fn test_super_admin_flag() {
        let session = signed_in_session(LoadedUserData {
            profile: Some(test_profile(SystemRole::SuperAdmin)),
            memberships: Vec::new(),
            signup_request: None,
        });

        assert!(session.is_super_admin());
        assert!(session.is_company_admin());
    }

    #[test]
    fn test_company_admin_via_membership_role() {
        let session = signed_in_session(LoadedUserData {
            profile: Some(test_profile(SystemRole::RegularUser)),
            memberships: vec![test_membership("t1", TenantRole::CompanyAdmin, None, false)],
            signup_request: None,
        });

        assert!(!session.is_super_admin());
        assert!(session.is_company_admin());
    }

    #[test]
    fn test_pending_approval_requires_empty_membership_list() {
        let with_membership = signed_in_session(LoadedUserData {
            profile: Some(test_profile(SystemRole::RegularUser)),
            memberships: vec![test_membership("t1", TenantRole::Employee, Some("Agent"), false)],
            signup_request: Some(test_request(SignupStatus::Pending)),
        });
        assert!(!with_membership.is_pending_approval());

        let without_membership = signed_in_session(LoadedUserData {
            profile: Some(test_profile(SystemRole::RegularUser)),
            memberships: Vec::new(),
            signup_request: Some(test_request(SignupStatus::Pending)),
        });
        assert!(without_membership.is_pending_approval());

        let rejected = signed_in_session(LoadedUserData {
            profile: Some(test_profile(SystemRole::RegularUser)),
            memberships: Vec::new(),
            signup_request: Some(test_request(SignupStatus::Rejected)),
        });
        assert!(!rejected.is_pending_approval());
    }

    #[test]
    fn test_suspended_flag_follows_current_tenant() {
        let session = signed_in_session(LoadedUserData {
            profile: Some(test_profile(SystemRole::RegularUser)),
            memberships: vec![test_membership("t1", TenantRole::Employee, Some("Agent"), true)],
            signup_request: None,
        });

        assert!(session.is_suspended());
    }

    #[test]
    fn test_needs_onboarding_on_missing_job_title() {
        let missing = signed_in_session(LoadedUserData {
            profile: Some(test_profile(SystemRole::RegularUser)),
            memberships: vec![test_membership("t1", TenantRole::Employee, None, false)],
            signup_request: None,
        });
        assert!(missing.needs_onboarding());

        let empty = signed_in_session(LoadedUserData {
            profile: Some(test_profile(SystemRole::RegularUser)),
            memberships: vec![test_membership("t1", TenantRole::Employee, Some(""), false)],
            signup_request: None,
        });
        assert!(empty.needs_onboarding());

        let onboarded = signed_in_session(LoadedUserData {
            profile: Some(test_profile(SystemRole::RegularUser)),
            memberships: vec![test_membership("t1", TenantRole::Employee, Some("Agent"), false)],
            signup_request: None,
        });
        assert!(!onboarded.needs_onboarding());
    }

    #[test]
    fn test_company_admin_exempt_from_onboarding() {
        let session = signed_in_session(LoadedUserData {
            profile: Some(test_profile(SystemRole::RegularUser)),
            memberships: vec![test_membership("t1", TenantRole::CompanyAdmin, None, false)],
            signup_request: None,
        });

        assert!(!session.needs_onboarding());
    }
}
