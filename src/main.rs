mod bitbucket;
mod config;
mod report;
mod review;
mod server;
mod tools;

use clap::Parser;
use rmcp::ServiceExt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::level_filters::LevelFilter;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::EnvFilter;

/// Bitbucket Cloud MCP server. Serves pull request review tools to an MCP
/// client over stdio.
#[derive(Parser, Debug)]
#[command(name = "bitbucket-mcp", version, about)]
struct Cli {
    /// Config file path (defaults to .bitbucket-mcp.toml in the current directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is not set (debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Print the tool declarations as JSON and exit
    #[arg(long)]
    list_tools: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.list_tools {
        let declarations = serde_json::Value::from(tools::declarations());
        println!("{}", serde_json::to_string_pretty(&declarations)?);
        return Ok(());
    }

    let dotenv = config::load_dotenv();

    // Display text, not the Debug form `main` would print for a returned error.
    let config = match config::Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}", err);
            std::process::exit(1);
        }
    };

    let requested = cli.log_level.as_deref().unwrap_or_else(|| config.log_level());
    let level = parse_level(requested);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::default().add_directive(LevelFilter::from(level.unwrap_or(Level::INFO)).into())
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
    if level.is_none() {
        warn!(level = requested, "unrecognized log level, falling back to info");
    }
    if let Some(path) = dotenv {
        debug!(path = %path.display(), "loaded environment file");
    }

    let settings = match config.client_settings() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("{}", err);
            std::process::exit(1);
        }
    };
    debug!(
        base_url = %settings.base_url,
        workspace = ?settings.default_workspace,
        "loaded configuration"
    );

    let client = bitbucket::BitbucketClient::new(settings)?;
    let classifier = review::BotPatterns::from_config(config.review.bot_patterns.clone());
    debug!(patterns = classifier.patterns().len(), "bot author patterns");
    let registry = tools::ToolRegistry::new(client, Arc::new(classifier));

    info!(tools = tools::TOOLS.len(), "Bitbucket Cloud MCP server running on stdio");
    let service = server::BitbucketMcpServer::new(registry)
        .serve(rmcp::transport::io::stdio())
        .await?;
    service.waiting().await?;

    Ok(())
}

/// Level names accepted by `--log-level`, `LOG_LEVEL` and `[log] level`.
fn parse_level(level: &str) -> Option<Level> {
    level.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), Some(Level::DEBUG));
        assert_eq!(parse_level("WARN"), Some(Level::WARN));
        assert_eq!(parse_level(" error "), Some(Level::ERROR));
        assert_eq!(parse_level("verbose"), None);
        assert_eq!(parse_level(""), None);
    }
}
