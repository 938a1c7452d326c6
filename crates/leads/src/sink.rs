//! The [`Lead`] record and the [`LeadSink`] trait the engine calls.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use imo_domain::error::Result;

/// A prospective customer captured during a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub id: Uuid,
    pub name: String,
    /// Bare contact number, without transport qualifiers.
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

impl Lead {
    pub fn new(name: &str, phone: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            phone: phone.to_owned(),
            created_at: Utc::now(),
        }
    }
}

/// Destination for captured leads.
///
/// Implementations perform both durable storage and CRM notification; a
/// failure of either surfaces as a single error.
#[async_trait]
pub trait LeadSink: Send + Sync {
    async fn create_lead(&self, name: &str, contact: &str) -> Result<()>;
}
