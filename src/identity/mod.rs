//! Caller identity: principals, the delegated-auth provider seam and role gating.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod provider;
mod keyfile;
mod authorizer;

pub use principal::Principal;
pub use provider::{AutoApprove, Identity, IdentityProvider, LoginOptions, LoginPrompt};
pub use keyfile::KeyfileProvider;
pub use authorizer::{visible_routes, Role, RoleGate, Route};
