use std::io::Read;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::json;

use tool_gateway::config::DirectoryConfig;
use tool_gateway::intent::classifier::{classify_prefix, extract_method};
use tool_gateway::routing::{extract_identifier, Directory, HttpDirectory};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Operator CLI for the tool gateway", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a host the way the gateway would
    Resolve {
        /// Host, e.g. abc.tools.example.com
        host: String,

        #[arg(short, long, env = "DIRECTORY_URL", default_value = "http://127.0.0.1:8080")]
        directory_url: String,

        #[arg(short, long, default_value_t = 10)]
        timeout_secs: u64,
    },
    /// Classify a request body read from a file or stdin
    Classify {
        file: Option<PathBuf>,

        #[arg(short, long, default_value_t = 1024)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve {
            host,
            directory_url,
            timeout_secs,
        } => {
            let identifier = extract_identifier(Some(&host))?;
            let directory = HttpDirectory::new(&DirectoryConfig {
                base_url: directory_url,
                timeout_secs,
            })?;
            let route = directory.resolve(&identifier).await?;
            let out = json!({
                "identifier": identifier.as_str(),
                "targetUrl": route.target_url.as_str(),
                "requireAuth": route.require_auth,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Commands::Classify { file, limit } => {
            let body = match file {
                Some(path) => std::fs::read(path)?,
                None => {
                    let mut buf = Vec::new();
                    std::io::stdin().read_to_end(&mut buf)?;
                    buf
                }
            };
            let scanned = &body[..body.len().min(limit)];
            let intent = classify_prefix(&body, limit);
            let out = json!({
                "method": extract_method(scanned),
                "intent": intent.label(),
                "scannedBytes": scanned.len(),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }

    Ok(())
}
