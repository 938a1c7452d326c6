//! Lead capture sinks.
//!
//! A captured lead (name + contact number) is written to durable storage
//! and forwarded to the CRM inbox.  The engine only sees the [`LeadSink`]
//! trait; [`create_sink`] wires the configured implementation.

pub mod crm;
pub mod sink;
pub mod store;
pub mod trello;

pub use crm::{create_sink, CrmLeadSink, LogLeadSink};
pub use sink::{Lead, LeadSink};
pub use store::JsonlLeadStore;
pub use trello::TrelloNotifier;
