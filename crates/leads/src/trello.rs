//! Trello CRM notifier.
//!
//! Each lead becomes a card on the configured list.  The card name is the
//! lead's name; the description carries the contact number and a local
//! creation timestamp.

use std::time::{Duration, Instant};

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use reqwest::Client;

use imo_domain::config::TrelloConfig;
use imo_domain::error::{Error, Result};

use crate::sink::Lead;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct TrelloNotifier {
    http: Client,
    base_url: String,
    api_key: String,
    token: String,
    list_id: String,
    timezone: Tz,
}

impl TrelloNotifier {
    /// Build a notifier, reading credentials from the environment
    /// variables named in the config.
    pub fn new(cfg: &TrelloConfig) -> Result<Self> {
        let api_key = cfg.api_key().ok_or_else(|| {
            Error::Config(format!("environment variable {} is not set", cfg.api_key_env))
        })?;
        let token = cfg.token().ok_or_else(|| {
            Error::Config(format!("environment variable {} is not set", cfg.token_env))
        })?;
        Self::with_credentials(cfg, api_key, token)
    }

    pub fn with_credentials(
        cfg: &TrelloConfig,
        api_key: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self> {
        let timezone: Tz = cfg
            .timezone
            .parse()
            .map_err(|e| Error::Config(format!("leads.trello.timezone: {e}")))?;
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_owned(),
            api_key: api_key.into(),
            token: token.into(),
            list_id: cfg.list_id.clone(),
            timezone,
        })
    }

    fn cards_url(&self) -> String {
        format!("{}/1/cards", self.base_url)
    }

    /// Create the card for `lead`.
    pub async fn create_card(&self, lead: &Lead) -> Result<()> {
        let desc = card_description(&lead.name, &lead.phone, lead.created_at, &self.timezone);
        let start = Instant::now();

        let resp = self
            .http
            .post(self.cards_url())
            .query(&[
                ("key", self.api_key.as_str()),
                ("token", self.token.as_str()),
                ("idList", self.list_id.as_str()),
                ("name", lead.name.as_str()),
                ("desc", desc.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::LeadSink(format!("trello: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::LeadSink(format!("trello returned {status}: {body}")));
        }

        tracing::debug!(
            lead_id = %lead.id,
            duration_ms = start.elapsed().as_millis() as u64,
            "trello card created"
        );
        Ok(())
    }
}

/// Card description: name, phone and the creation time rendered in `tz`
/// as `dd/mm/YYYY às HH:MM`.
pub fn card_description(name: &str, phone: &str, created_at: DateTime<Utc>, tz: &Tz) -> String {
    let local = tz.from_utc_datetime(&created_at.naive_utc());
    format!(
        "Nome: {name}\nTelefone: {phone}\nCriado em: {}",
        local.format("%d/%m/%Y às %H:%M")
    )
}
