//! Core services of the taskdeck backend: authentication, authorization,
//! team/ownership management, manual referential integrity and the
//! activity log.
//!
//! Every function takes the store handle explicitly; nothing here owns
//! global state. Mutations append one activity entry before reporting
//! success, and multi-statement operations run inside one transaction.

pub mod accounts;
pub mod activity;
pub mod authn;
pub mod authz;
pub mod bots;
pub mod error;
pub mod integrity;
pub mod principal;
pub mod projects;
pub mod subtasks;
pub mod tasks;
pub mod teams;

pub use error::{Error, Result};
pub use principal::{BotPrincipal, HumanPrincipal, Principal};

// The capability model lives with the entities; re-export it as part of the
// core's public surface.
pub use taskdeck_db::entities::bot::{Capability, PermissionSet};
