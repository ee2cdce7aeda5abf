//! `rcall`: issue one call through the failover client.
//!
//! ```text
//! rcall --config client.toml --key orders --path /v1/orders/42
//! rcall --url http://127.0.0.1:3000/health -X HEAD
//! rcall --config client.toml --key orders --path /v1/orders -X POST \
//!       -H 'Content-Type: application/json' --data '{"sku":"a-1"}' --stats
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{ArgGroup, Parser};

use failover_client::config::{load_config, ClientConfig};
use failover_client::observability::logging;
use failover_client::{Backend, BackendManager, CallContext, HttpClient};

#[derive(Parser)]
#[command(name = "rcall")]
#[command(about = "Call a logical service with retry and failover", long_about = None)]
#[command(group(ArgGroup::new("target").required(true).args(["key", "url"])))]
struct Cli {
    /// Client configuration file (TOML).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Request method; unknown names are sent as POST.
    #[arg(short = 'X', long, default_value = "GET")]
    method: String,

    /// Backend group to resolve.
    #[arg(short, long, requires = "path")]
    key: Option<String>,

    /// Logical path, joined onto each backend's base URL.
    #[arg(short, long)]
    path: Option<String>,

    /// Fixed absolute URL; skips backend resolution.
    #[arg(short, long, conflicts_with = "key")]
    url: Option<String>,

    /// Header as `Name: value`; repeatable.
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Context property as `name=value`; repeatable.
    #[arg(long = "ctx")]
    context: Vec<String>,

    /// Text body.
    #[arg(short, long)]
    data: Option<String>,

    /// Print backend statistics after the call.
    #[arg(long)]
    stats: bool,
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ClientConfig::default(),
    };
    logging::init(&config.observability.log_level);

    let backends = Arc::new(BackendManager::new(&config.backends));
    let client = HttpClient::configure(&config, backends.clone())?;

    let mut request = client.build(&cli.method);
    for header in &cli.headers {
        let Some((name, value)) = header.split_once(':') else {
            return Err(format!("header must be `Name: value`, got {header:?}").into());
        };
        request.set_header(name.trim(), value.trim());
    }
    if let Some(data) = &cli.data {
        request.set_text(data.clone());
    }

    let ctx: CallContext = cli
        .context
        .iter()
        .filter_map(|pair| pair.split_once('='))
        .collect();

    let outcome = match (&cli.url, &cli.key, &cli.path) {
        (Some(url), _, _) => request.execute_url(url),
        (None, Some(key), Some(path)) => request.execute(path, key, &ctx),
        _ => return Err("either --url or --key with --path is required".into()),
    };

    let code = match outcome {
        Ok(response) => {
            println!("{}", response.status());
            for (name, value) in response.headers() {
                println!("{}: {}", name, value.to_str().unwrap_or("<binary>"));
            }
            println!();
            println!("{}", response.text());
            if response.status().is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            }
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    };
    request.close();

    if cli.stats {
        for backend in backends.all_backends() {
            println!("{}", serde_json::to_string(&serde_json::json!({
                "backend": backend.id(),
                "url": backend.base_url().as_str(),
                "stats": backend.stats(),
            }))?);
        }
    }

    Ok(code)
}
