use imo_domain::config::{Config, ConfigSeverity, LogFormat};

#[test]
fn default_timeouts_and_intervals() {
    let config = Config::default();
    assert_eq!(config.sessions.idle_timeout_secs, 86_400);
    assert_eq!(config.sessions.cleanup_interval_secs, 3_600);
    assert_eq!(config.runtime.message_timeout_secs, 120);
    assert_eq!(config.runtime.poll_interval_ms, 1_000);
    assert_eq!(config.runtime.action_settle_ms, 1_000);
    assert!(config.runtime.inject_collected_name);
}

#[test]
fn default_assistant_endpoint() {
    let config = Config::default();
    assert_eq!(config.assistant.base_url, "https://api.openai.com/v1");
    assert_eq!(config.assistant.api_key_env, "OPENAI_API_KEY");
    assert_eq!(config.assistant.beta_header, "assistants=v2");
}

#[test]
fn empty_file_parses_to_defaults() {
    let config: Config = toml::from_str("").unwrap();
    assert_eq!(config.runtime.message_timeout_secs, 120);
    assert!(config.leads.store_path.is_none());
    assert!(config.leads.trello.is_none());
}

#[test]
fn partial_sections_keep_other_defaults() {
    let toml_str = r#"
[assistant]
assistant_id = "asst_123"

[runtime]
poll_interval_ms = 250

[observability]
log_format = "json"
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.assistant.assistant_id, "asst_123");
    assert_eq!(config.assistant.max_retries, 3);
    assert_eq!(config.runtime.poll_interval_ms, 250);
    assert_eq!(config.runtime.action_settle_ms, 1_000);
    assert_eq!(config.observability.log_format, LogFormat::Json);
}

#[test]
fn trello_section_defaults_timezone() {
    let toml_str = r#"
[leads]
store_path = "data/leads.jsonl"

[leads.trello]
list_id = "lane-1"
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    let trello = config.leads.trello.unwrap();
    assert_eq!(trello.list_id, "lane-1");
    assert_eq!(trello.timezone, "America/Sao_Paulo");
    assert_eq!(trello.base_url, "https://api.trello.com");
}

#[test]
fn missing_assistant_id_is_an_error() {
    let config = Config::default();
    let issues = config.validate();
    assert!(issues
        .iter()
        .any(|e| e.field == "assistant.assistant_id" && e.severity == ConfigSeverity::Error));
    assert!(!config.is_valid());
}

#[test]
fn bad_trello_timezone_is_an_error() {
    let toml_str = r#"
[assistant]
assistant_id = "asst_123"

[leads.trello]
list_id = "lane-1"
timezone = "Mars/Olympus_Mons"
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    let issues = config.validate();
    assert!(issues.iter().any(|e| e.field == "leads.trello.timezone"));
}

#[test]
fn short_idle_timeout_is_only_a_warning() {
    let toml_str = r#"
[assistant]
assistant_id = "asst_123"

[sessions]
idle_timeout_secs = 30
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    let issue = config
        .validate()
        .into_iter()
        .find(|e| e.field == "sessions.idle_timeout_secs")
        .unwrap();
    assert_eq!(issue.severity, ConfigSeverity::Warning);
    assert!(config.is_valid());
}
