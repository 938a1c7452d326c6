//! Session management for imolink.
//!
//! Maps each end-user identity to one long-lived assistant thread, keeps
//! the small amount of per-user state the engine needs (captured lead
//! name, last access), and evicts conversations that went idle.
//! Sessions are a volatile in-memory cache, not a system of record.

pub mod identity;
pub mod lifecycle;
pub mod store;

pub use identity::contact_address;
pub use lifecycle::LifecycleManager;
pub use store::{Session, SessionStore};
