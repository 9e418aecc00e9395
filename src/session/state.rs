use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::{Principal, Role};

pub const MAX_NOTIFICATIONS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub level: NotificationLevel,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new<S: Into<String>>(level: NotificationLevel, message: S) -> Self {
        Self { id: Uuid::new_v4(), level, message: message.into(), created_at: Utc::now() }
    }
}

/// Snapshot of the client session.
///
/// Invariants:
/// - `!is_authenticated` ⇒ no principal, no role, no pending role selection.
/// - `needs_role_selection` ⇒ authenticated with no role.
/// - authenticated with no role ⇒ role selection is pending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub principal: Option<Principal>,
    pub role: Option<Role>,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub needs_role_selection: bool,
    pub notifications: Vec<Notification>,
}

impl Session {
    pub fn is_admin(&self) -> bool { self.role == Some(Role::Admin) }

    pub fn is_validator(&self) -> bool { matches!(self.role, Some(Role::Validator | Role::Admin)) }

    pub fn can_submit(&self) -> bool { self.is_authenticated }

    pub fn should_show_role_selection(&self) -> bool {
        self.is_authenticated && self.needs_role_selection && self.role.is_none()
    }

    /// True for the exact shape produced by logout (notifications aside).
    pub fn is_signed_out(&self) -> bool {
        self.principal.is_none() && self.role.is_none() && !self.is_authenticated && !self.needs_role_selection
    }

    pub fn holds_invariants(&self) -> bool {
        if !self.is_authenticated {
            return self.principal.is_none() && self.role.is_none() && !self.needs_role_selection;
        }
        if self.principal.is_none() {
            return false;
        }
        if self.needs_role_selection {
            return self.role.is_none();
        }
        self.role.is_some()
    }

    /// Bring an arbitrary (e.g. restored) snapshot back into a valid shape.
    pub fn normalized(mut self) -> Self {
        if !self.is_authenticated || self.principal.is_none() {
            self.is_authenticated = false;
            self.principal = None;
            self.role = None;
            self.needs_role_selection = false;
        } else if self.needs_role_selection {
            self.role = None;
        } else if self.role.is_none() {
            self.needs_role_selection = true;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authed(role: Option<Role>, needs: bool) -> Session {
        Session {
            principal: Some(Principal::anonymous()),
            role,
            is_authenticated: true,
            needs_role_selection: needs,
            ..Session::default()
        }
    }

    #[test]
    fn predicates_follow_role_only() {
        let admin = authed(Some(Role::Admin), false);
        assert!(admin.is_admin() && admin.is_validator());
        let v = authed(Some(Role::Validator), false);
        assert!(!v.is_admin() && v.is_validator());
        let u = authed(Some(Role::User), false);
        assert!(!u.is_admin() && !u.is_validator());
        // repeated calls see the same answer and change nothing
        let before = v.clone();
        for _ in 0..3 {
            assert!(v.is_validator());
        }
        assert_eq!(before, v);
    }

    #[test]
    fn role_selection_visibility() {
        assert!(authed(None, true).should_show_role_selection());
        assert!(!authed(Some(Role::User), false).should_show_role_selection());
        assert!(!Session::default().should_show_role_selection());
        assert!(!Session::default().can_submit());
        assert!(authed(None, true).can_submit());
    }

    #[test]
    fn invariants_and_normalization() {
        assert!(Session::default().holds_invariants());
        assert!(authed(None, true).holds_invariants());
        assert!(authed(Some(Role::User), false).holds_invariants());
        assert!(!authed(None, false).holds_invariants());
        assert!(!authed(Some(Role::Admin), true).holds_invariants());

        let fixed = authed(None, false).normalized();
        assert!(fixed.holds_invariants() && fixed.needs_role_selection);
        let fixed = authed(Some(Role::Admin), true).normalized();
        assert!(fixed.holds_invariants() && fixed.role.is_none());
        let ghost = Session { role: Some(Role::Admin), needs_role_selection: true, ..Session::default() }.normalized();
        assert!(ghost.is_signed_out());
    }
}
