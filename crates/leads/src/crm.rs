//! Concrete lead sinks and the factory that picks one from config.
//!
//! [`CrmLeadSink`] stores the lead and then notifies the CRM board; a
//! failure at either step fails the capture.  [`LogLeadSink`] only logs,
//! for deployments with neither configured.

use std::sync::Arc;

use async_trait::async_trait;

use imo_domain::config::LeadsConfig;
use imo_domain::error::{Error, Result};

use crate::sink::{Lead, LeadSink};
use crate::store::JsonlLeadStore;
use crate::trello::TrelloNotifier;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Store + notify
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Persists the lead, then notifies the CRM.  Either half is optional;
/// whichever runs and fails turns the whole call into `Error::LeadSink`.
pub struct CrmLeadSink {
    store: Option<JsonlLeadStore>,
    notifier: Option<TrelloNotifier>,
}

impl CrmLeadSink {
    pub fn new(store: Option<JsonlLeadStore>, notifier: Option<TrelloNotifier>) -> Self {
        Self { store, notifier }
    }
}

#[async_trait]
impl LeadSink for CrmLeadSink {
    async fn create_lead(&self, name: &str, contact: &str) -> Result<()> {
        let lead = Lead::new(name, contact);

        if let Some(store) = &self.store {
            store
                .append(&lead)
                .await
                .map_err(|e| Error::LeadSink(format!("could not store lead: {e}")))?;
        }

        if let Some(notifier) = &self.notifier {
            notifier.create_card(&lead).await.map_err(|e| match e {
                Error::LeadSink(msg) => Error::LeadSink(format!("could not notify CRM: {msg}")),
                other => Error::LeadSink(format!("could not notify CRM: {other}")),
            })?;
        }

        tracing::info!(lead_id = %lead.id, name, phone = contact, "lead created");
        Ok(())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Log only
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Records leads in the log and nowhere else.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogLeadSink;

#[async_trait]
impl LeadSink for LogLeadSink {
    async fn create_lead(&self, name: &str, contact: &str) -> Result<()> {
        tracing::warn!(name, phone = contact, "lead captured but no lead sink is configured");
        Ok(())
    }
}

/// Build the sink described by `cfg`.
pub fn create_sink(cfg: &LeadsConfig) -> Result<Arc<dyn LeadSink>> {
    let store = cfg.store_path.as_ref().map(JsonlLeadStore::new);
    let notifier = cfg.trello.as_ref().map(TrelloNotifier::new).transpose()?;

    if store.is_none() && notifier.is_none() {
        return Ok(Arc::new(LogLeadSink));
    }
    Ok(Arc::new(CrmLeadSink::new(store, notifier)))
}
