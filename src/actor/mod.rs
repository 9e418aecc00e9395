//! Backend actor: typed remote calls, the HTTP transport and the owned actor cache.

mod contract;
mod handle;
mod http;

pub use contract::{BackendActor, DataEntry, DataStatus, Proposal, RoleTag, UserProfile, WriteResult};
pub use handle::{ActorFactory, ActorHandle};
pub use http::{HttpActor, HttpActorFactory, PRINCIPAL_HEADER};
