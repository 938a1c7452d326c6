use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Lead capture
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Where captured leads go.  With neither `store_path` nor `trello` set,
/// leads are only logged.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LeadsConfig {
    /// JSONL file that every captured lead is appended to.
    #[serde(default)]
    pub store_path: Option<PathBuf>,

    /// Trello board used as the CRM inbox.
    #[serde(default)]
    pub trello: Option<TrelloConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrelloConfig {
    #[serde(default = "d_trello_url")]
    pub base_url: String,
    #[serde(default = "d_key_env")]
    pub api_key_env: String,
    #[serde(default = "d_token_env")]
    pub token_env: String,
    /// List ("lane") new lead cards are created in.
    pub list_id: String,
    /// IANA zone used for the card's creation timestamp.
    #[serde(default = "d_timezone")]
    pub timezone: String,
}

impl TrelloConfig {
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok()
    }

    pub fn token(&self) -> Option<String> {
        std::env::var(&self.token_env).ok()
    }
}

fn d_trello_url() -> String {
    "https://api.trello.com".into()
}
fn d_key_env() -> String {
    "TRELLO_API_KEY".into()
}
fn d_token_env() -> String {
    "TRELLO_TOKEN".into()
}
fn d_timezone() -> String {
    "America/Sao_Paulo".into()
}
