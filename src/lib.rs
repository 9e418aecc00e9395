//! EcoChain client core.
//!
//! Session bootstrap and role resolution over a remote backend actor, an
//! observable session store with a persisted subset, role gating, and typed
//! data/governance calls. Presentation layers (the `ecochain` CLI here) read
//! the store and call into `bootstrap::SessionBootstrap`.

pub mod error;
pub mod config;
pub mod identity;
pub mod actor;
pub mod session;
pub mod bootstrap;
pub mod services;
pub mod cli;

pub use bootstrap::{Resolution, SessionBootstrap};
pub use error::{ClientError, ClientResult, OpResult};
