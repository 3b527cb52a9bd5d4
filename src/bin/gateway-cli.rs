use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Command-line client for db-gateway", long_about = None)]
struct Cli {
    #[arg(short, long, env = "DB_GATEWAY_URL", default_value = "http://localhost:8080")]
    url: String,

    /// Operation deadline passed as `timeout_ms`.
    #[arg(short, long)]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Gateway status and registry sizes
    Status,
    /// Cached connections and accessors
    Registry,
    /// List every document in a collection
    Find { database: String, collection: String },
    /// Insert a JSON document, or a JSON array of documents
    Insert {
        database: String,
        collection: String,
        json: String,
    },
    /// Delete a document by id
    Delete {
        database: String,
        collection: String,
        id: String,
    },
    /// Merge JSON fields into a document
    Update {
        database: String,
        collection: String,
        id: String,
        json: String,
    },
    /// Drop the cached accessor for a collection
    Evict { database: String, collection: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');
    let op = |path: String| match cli.timeout_ms {
        Some(ms) => format!("{}{}?timeout_ms={}", base, path, ms),
        None => format!("{}{}", base, path),
    };

    let res = match cli.command {
        Commands::Status => client.get(format!("{}/admin/status", base)).send().await?,
        Commands::Registry => client.get(format!("{}/admin/registry", base)).send().await?,
        Commands::Find { database, collection } => {
            client
                .get(op(format!("/find/{}/{}", database, collection)))
                .send()
                .await?
        }
        Commands::Insert {
            database,
            collection,
            json,
        } => {
            let body = match serde_json::from_str::<Value>(&json)? {
                Value::Array(documents) => serde_json::json!({ "documents": documents }),
                document => serde_json::json!({ "document": document }),
            };
            client
                .post(op(format!("/insert/{}/{}", database, collection)))
                .json(&body)
                .send()
                .await?
        }
        Commands::Delete {
            database,
            collection,
            id,
        } => {
            client
                .delete(op(format!("/delete/{}/{}/{}", database, collection, id)))
                .send()
                .await?
        }
        Commands::Update {
            database,
            collection,
            id,
            json,
        } => {
            let changes: Value = serde_json::from_str(&json)?;
            client
                .put(op(format!("/update/{}/{}/{}", database, collection, id)))
                .json(&serde_json::json!({ "update": changes }))
                .send()
                .await?
        }
        Commands::Evict {
            database,
            collection,
        } => {
            client
                .delete(format!("{}/admin/registry/{}/{}", base, database, collection))
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    let rendered = match serde_json::from_str::<Value>(&text) {
        Ok(json) => serde_json::to_string_pretty(&json)?,
        Err(_) => text,
    };

    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        eprintln!("{}", rendered);
        std::process::exit(1);
    }

    println!("{}", rendered);
    Ok(())
}
