use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use imo_domain::config::{LogFormat, ObservabilityConfig};
use imo_domain::tool::FunctionTool;
use imo_gateway::cli::{Cli, Command, ConfigCommand};
use imo_gateway::runtime::lead_tool_definition;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Chat { user } => {
            let (config, _) = imo_gateway::cli::load_config()?;
            init_tracing(&config.observability);
            imo_gateway::cli::chat::chat(config, user).await
        }
        Command::Run { message, user, json } => {
            let (config, _) = imo_gateway::cli::load_config()?;
            init_tracing(&config.observability);
            imo_gateway::cli::run::run(config, message, user, json).await
        }
        Command::Config(ConfigCommand::Validate) => {
            let (config, config_path) = imo_gateway::cli::load_config()?;
            if !imo_gateway::cli::config::validate(&config, &config_path) {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Config(ConfigCommand::Show) => {
            let (config, _) = imo_gateway::cli::load_config()?;
            imo_gateway::cli::config::show(&config)
        }
        Command::Tools => {
            let tools = vec![FunctionTool::from(lead_tool_definition())];
            println!("{}", serde_json::to_string_pretty(&tools)?);
            Ok(())
        }
        Command::Version => {
            println!("imolink {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Initialize tracing on stderr so replies on stdout stay clean.
///
/// `RUST_LOG` wins over the configured default filter.
fn init_tracing(obs: &ObservabilityConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&obs.default_filter));

    match obs.log_format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Compact => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}
