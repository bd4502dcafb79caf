mod initialize;
mod protocol;
mod server;
mod tools;

use std::path::PathBuf;

use anyhow::Context;
use ceangal::auth::scopes::{self, ScopeSet, GMAIL_SEND};
use ceangal::{Config, Session, ToolRegistry};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ceangal-mcp", version, about = "Google Workspace tools over the Model Context Protocol")]
struct Cli {
    /// Project root holding ceangal.json, the token and the client secret
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve tools to an MCP client on stdio (default)
    Serve,
    /// Authorize with Google and save the token
    Auth {
        /// Client secret file downloaded from the Google Cloud Console
        #[arg(long, short)]
        credentials: Option<PathBuf>,
        /// Discard any saved token and ask for consent again
        #[arg(long)]
        force: bool,
    },
    /// Print the tool catalog as JSON
    Tools,
    /// Call one tool directly and print its result
    Call {
        name: String,
        /// Tool arguments as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the protocol; logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.root).context("failed to load configuration")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let registry = ToolRegistry::new(Session::from_config(config).map_err(anyhow::Error::msg)?);
            server::serve_stdio(&registry).await
        }
        Command::Auth { credentials, force } => {
            if let Some(path) = credentials {
                let path = std::env::current_dir()?.join(path);
                config.client_secret_candidates.insert(0, path);
            }
            let session = Session::from_config(config).map_err(anyhow::Error::msg)?;
            authorize(&session, force).await
        }
        Command::Tools => {
            let registry = ToolRegistry::new(Session::from_config(config).map_err(anyhow::Error::msg)?);
            let catalog = serde_json::json!({
                "schema_version": ceangal::tools::SCHEMA_VERSION,
                "tools": registry.specs(),
            });
            println!("{}", serde_json::to_string_pretty(&catalog)?);
            Ok(())
        }
        Command::Call { name, args } => {
            let arguments: serde_json::Value =
                serde_json::from_str(&args).context("--args must be a JSON object")?;
            let registry = ToolRegistry::new(Session::from_config(config).map_err(anyhow::Error::msg)?);
            let result = registry.call(&name, arguments).await?;
            println!("{}", serde_json::to_string_pretty(&result.to_json())?);
            if !result.is_success() {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

/// Obtain a token for every tool scope, then prove it works against Gmail.
async fn authorize(session: &Session, force: bool) -> anyhow::Result<()> {
    let credentials = session.credentials();
    if force && credentials.reset().await.map_err(anyhow::Error::msg)? {
        println!("Removed existing token at {}", credentials.token_path().display());
    }

    let all: ScopeSet = scopes::ALL.into_iter().collect();
    println!("Requesting scopes:");
    for scope in all.iter() {
        println!("  - {}", scope);
    }

    let acquisition = credentials.acquire_traced(&all).await?;
    println!("Credential path: {:?}", acquisition.transitions);
    println!("Token saved to {}", credentials.token_path().display());

    let send: ScopeSet = [GMAIL_SEND].into_iter().collect();
    if !acquisition.record.scopes.covers(&send) {
        anyhow::bail!("token was granted without permission to send email");
    }

    let gmail = session.gmail(&all).await?;
    let profile = gmail.get_profile().await?;
    let address = profile
        .get("emailAddress")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown");
    println!("Authenticated as: {}", address);

    let labels: Vec<String> = gmail
        .list_labels()
        .await?
        .iter()
        .take(3)
        .filter_map(|l| l.get("name").and_then(|n| n.as_str()).map(String::from))
        .collect();
    if !labels.is_empty() {
        println!("Sample labels: {}", labels.join(", "));
    }

    println!("Ready.");
    Ok(())
}
