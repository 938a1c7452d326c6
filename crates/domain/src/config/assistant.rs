use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Remote assistant connection
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default = "d_base_url")]
    pub base_url: String,
    /// Environment variable holding the bearer token.
    #[serde(default = "d_api_key_env")]
    pub api_key_env: String,
    /// ID of the pre-provisioned assistant every run is started against.
    #[serde(default)]
    pub assistant_id: String,
    #[serde(default = "d_30000")]
    pub timeout_ms: u64,
    #[serde(default = "d_3")]
    pub max_retries: u32,
    /// Value sent in the `OpenAI-Beta` header.
    #[serde(default = "d_beta")]
    pub beta_header: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            base_url: d_base_url(),
            api_key_env: d_api_key_env(),
            assistant_id: String::new(),
            timeout_ms: 30_000,
            max_retries: 3,
            beta_header: d_beta(),
        }
    }
}

impl AssistantConfig {
    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn d_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn d_30000() -> u64 {
    30_000
}
fn d_3() -> u32 {
    3
}
fn d_beta() -> String {
    "assistants=v2".into()
}
