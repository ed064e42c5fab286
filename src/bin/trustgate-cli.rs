use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "trustgate-cli")]
#[command(about = "Operator CLI for the trustgate sidecar", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:7878")]
    url: String,

    #[arg(short, long, env = "TRUSTGATE_ADMIN_KEY")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show sidecar status
    Status,
    /// Print recent audit entries, newest first
    Audit {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Erase the audit trail (admin key only)
    ClearAudit,
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

    match cli.command {
        Commands::Status => {
            let res = client
                .get(format!("{}/admin/status", cli.url))
                .headers(headers)
                .send()
                .await?;
            if let Some(json) = read_json(res).await? {
                println!("{}", serde_json::to_string_pretty(&json)?);
            }
        }
        Commands::Audit { limit } => {
            let res = client
                .get(format!("{}/admin/audit", cli.url))
                .query(&[("limit", limit)])
                .headers(headers)
                .send()
                .await?;
            if let Some(json) = read_json(res).await? {
                let mut entries = match json {
                    Value::Array(entries) => entries,
                    other => vec![other],
                };
                entries.reverse();
                if entries.is_empty() {
                    println!("Audit trail is empty");
                }
                for entry in entries {
                    println!("{}", serde_json::to_string_pretty(&entry)?);
                }
            }
        }
        Commands::ClearAudit => {
            let res = client
                .delete(format!("{}/admin/audit", cli.url))
                .headers(headers)
                .send()
                .await?;
            let status = res.status();
            if status.is_success() {
                println!("Audit trail cleared");
            } else {
                report_failure(res).await;
            }
        }
    }

    Ok(())
}

async fn read_json(res: reqwest::Response) -> Result<Option<Value>, Box<dyn std::error::Error>> {
    if !res.status().is_success() {
        report_failure(res).await;
        return Ok(None);
    }
    Ok(Some(res.json().await?))
}

async fn report_failure(res: reqwest::Response) {
    eprintln!("Error: admin API returned status {}", res.status());
    if let Ok(text) = res.text().await {
        if !text.is_empty() {
            eprintln!("Response: {}", text);
        }
    }
}
