pub mod chat;
pub mod config;
pub mod run;

use clap::{Parser, Subcommand};

/// imolink: a chat-to-assistant conversation engine.
#[derive(Debug, Parser)]
#[command(name = "imolink", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactive chat as a given user.
    Chat {
        /// User ID the messages are sent as.
        #[arg(long, default_value = "cli:chat")]
        user: String,
    },
    /// Send a single message and print the reply.
    Run {
        /// The message to send.
        message: String,
        /// User ID the message is sent as.
        #[arg(long, default_value = "cli:run")]
        user: String,
        /// Print the result as JSON instead of plain text.
        #[arg(long)]
        json: bool,
    },
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print the function tools to register on the remote assistant.
    Tools,
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path specified by `IMO_CONFIG` (or
/// `config.toml` by default).  Returns the parsed [`Config`] and the
/// path that was used.  A missing file yields the defaults.
///
/// [`Config`]: imo_domain::config::Config
pub fn load_config() -> anyhow::Result<(imo_domain::config::Config, String)> {
    let config_path = std::env::var("IMO_CONFIG").unwrap_or_else(|_| "config.toml".into());
    let config = load_config_from(&config_path)?;
    Ok((config, config_path))
}

pub fn load_config_from(config_path: &str) -> anyhow::Result<imo_domain::config::Config> {
    if !std::path::Path::new(config_path).exists() {
        return Ok(imo_domain::config::Config::default());
    }
    let raw = std::fs::read_to_string(config_path)
        .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
    toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))
}
