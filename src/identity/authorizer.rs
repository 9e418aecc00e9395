use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::session::Session;

/// Privilege tier. Ordered so that a higher variant includes every lower one:
/// `Admin ⊇ Validator ⊇ User`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    User,
    Validator,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::User, Role::Validator, Role::Admin];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Validator => "Validator",
            Role::Admin => "Admin",
        }
    }

    /// True if holding `self` grants everything `other` grants.
    pub fn includes(self, other: Role) -> bool { self >= other }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Role {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "validator" => Ok(Role::Validator),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// Visibility filter keyed on the current role. Pure: no caching, no side effects.
#[derive(Debug, Clone)]
pub struct RoleGate {
    allowed: Vec<Role>,
}

impl RoleGate {
    pub fn new<I: IntoIterator<Item = Role>>(allowed: I) -> Self {
        Self { allowed: allowed.into_iter().collect() }
    }

    /// Exact membership, not privilege inclusion: a gate listing only
    /// `Validator` hides its content from `Admin`.
    pub fn permits(&self, session: &Session) -> bool {
        if !session.is_authenticated { return false; }
        match session.role {
            Some(role) => self.allowed.contains(&role),
            // An unresolved role never grants anything
            None => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Explore,
    Submit,
    Dashboard,
    Profile,
    AssignRole,
}

impl Route {
    pub const ALL: [Route; 6] = [Route::Home, Route::Explore, Route::Submit, Route::Dashboard, Route::Profile, Route::AssignRole];

    pub fn path(self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Explore => "/explore",
            Route::Submit => "/submit",
            Route::Dashboard => "/dashboard",
            Route::Profile => "/profile",
            Route::AssignRole => "/assign-role",
        }
    }

    pub fn is_public(self) -> bool { matches!(self, Route::Home | Route::Explore) }

    pub fn gate(self) -> RoleGate {
        match self {
            Route::Home | Route::Explore | Route::Submit | Route::Profile => RoleGate::new(Role::ALL),
            Route::Dashboard => RoleGate::new([Role::Validator, Role::Admin]),
            Route::AssignRole => RoleGate::new([Role::Admin]),
        }
    }
}

/// Routes to offer for the given session. Logged-out visitors get the public pages only.
pub fn visible_routes(session: &Session) -> Vec<Route> {
    Route::ALL
        .iter()
        .copied()
        .filter(|r| if session.is_authenticated { r.gate().permits(session) } else { r.is_public() })
        .collect()
}
