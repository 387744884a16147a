use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use property_agent::coercion::coerce;
use property_agent::config::builder::build_configuration;
use property_agent::configuration::build_client;
use property_agent::observability::metrics::encode_metrics;
use property_agent::utils::config_loader;
use property_agent::utils::logging::{self, LogLevel};
use regex::Regex;
use serde_json::Value;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = "property-agent.yaml")]
    config: String,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
    /// Print the collected metrics after the command
    #[arg(long)]
    metrics: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a single property and print it
    Get {
        key: String,
        #[arg(long = "as", value_enum, default_value = "string")]
        kind: ValueKind,
        /// Used when the property is absent; parsed like a resolved value
        #[arg(long)]
        default: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ValueKind {
    String,
    Number,
    Boolean,
    Regex,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Load YAML config and logging
    // -------------------------------

    let args = Args::parse();
    let service_config = config_loader::run(&args.config)?;
    logging::run(&service_config, args.log_level)?;

    // -------------------------------
    // 2. Build and start the configuration
    // -------------------------------

    let client = build_client(service_config.settings.request_timeout_ms)?;
    let (configuration, env) = build_configuration(&service_config, client).await?;
    configuration.start(&env).await?;
    info!("configuration '{}' ready", configuration.name());

    // -------------------------------
    // 3. Run the command
    // -------------------------------

    match &args.command {
        Command::Get { key, kind, default } => {
            let raw = configuration
                .get_raw_property(key)
                .await?
                .or_else(|| default.clone())
                .ok_or_else(|| anyhow!("property '{}' is not set", key))?;
            println!("{}", render(key, &raw, *kind)?);
        }
    }

    if args.metrics {
        print!("{}", encode_metrics().await);
    }
    Ok(())
}

fn render(key: &str, raw: &str, kind: ValueKind) -> Result<String> {
    let rendered = match kind {
        ValueKind::String => raw.to_owned(),
        ValueKind::Number => coerce::<f64>(key, Some(raw), None)?.map(|n| n.to_string()).unwrap_or_default(),
        ValueKind::Boolean => coerce::<bool>(key, Some(raw), None)?.map(|b| b.to_string()).unwrap_or_default(),
        ValueKind::Regex => coerce::<Regex>(key, Some(raw), None)?.map(|r| r.as_str().to_owned()).unwrap_or_default(),
        ValueKind::Json => coerce::<Value>(key, Some(raw), None)?
            .map(|v| serde_json::to_string_pretty(&v))
            .transpose()?
            .unwrap_or_default(),
    };
    Ok(rendered)
}
