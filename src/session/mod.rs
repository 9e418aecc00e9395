//! Client session state: snapshot type, observable store and persistence.

mod state;
mod store;
mod persist;

pub use state::{Notification, NotificationLevel, Session, MAX_NOTIFICATIONS};
pub use store::SessionStore;
pub use persist::{JsonFilePersistence, MemoryPersistence, PersistedSession, SessionPersistence, PERSISTED_VERSION};
