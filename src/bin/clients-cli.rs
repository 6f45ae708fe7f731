use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "clients-cli")]
#[command(about = "Operator CLI for the resilient client manager", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:8081")]
    url: String,

    #[arg(short, long, env = "CLIENTS_ADMIN_KEY")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Close circuit breakers (one service, or all)
    ResetBreaker {
        /// Service name; omit to reset every breaker
        service: Option<String>,
    },
    /// Evict cached clients so they are rebuilt on next use
    Refresh {
        /// Service name; omit to evict every client
        service: Option<String>,
    },
}

impl Commands {
    fn path(&self) -> String {
        match self {
            Commands::ResetBreaker { service: Some(s) } => format!("/admin/breakers/{s}/reset"),
            Commands::ResetBreaker { service: None } => "/admin/breakers/reset".to_string(),
            Commands::Refresh { service: Some(s) } => format!("/admin/clients/{s}/refresh"),
            Commands::Refresh { service: None } => "/admin/clients/refresh".to_string(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let url = format!("{}{}", cli.url.trim_end_matches('/'), cli.command.path());
    let res = client.post(url).headers(headers).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: control plane returned status {status}");
        if let Ok(text) = res.text().await {
            eprintln!("Response: {text}");
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
