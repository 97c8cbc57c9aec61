//! Basic usage example for the key-value store client
//!
//! Run with: STORE_URL=http://localhost:3000/kv STORE_TOKEN=<your-token> cargo run --example basic_usage

use std::env;
use std::time::Duration;

use kv_store_client::{ApiToken, Client, ClientConfig, Error};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let token = env::var("STORE_TOKEN").map_err(|_| "STORE_TOKEN environment variable must be set")?;
    let config = ClientConfig {
        base_url: env::var("STORE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string()),
        token: ApiToken::new(token),
        timeout: env::var("STORE_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis),
    };
    let client = Client::with_config(config)?;
    info!("Using store at {}", client.base_url());

    // Store a value
    info!("Storing key 'example:hello'...");
    let message = client.set("example:hello", "Hello, store!").await?;
    info!("Server says: {}", message);

    // Retrieve the value
    let value = client.get("example:hello").await?;
    info!("Retrieved: {}", value);

    // Build up a multi-line value
    client.set("example:todo", "").await?;
    for item in ["buy milk", "walk dog", "write tests"] {
        client.append("example:todo", item).await?;
    }
    info!("Todo list:\n{}", client.get("example:todo").await?);

    // Fall back to a default for empty values
    client.set("example:theme", "").await?;
    let theme = client.get_or_default("example:theme", "light").await?;
    info!("Theme: {}", theme);

    // List keys
    for key in client.list().await? {
        info!("  - {}", key);
    }

    // Delete keys
    for key in ["example:hello", "example:todo", "example:theme"] {
        let message = client.delete(key).await?;
        info!("Deleted {}: {}", key, message);
    }

    // Logical failures carry the operation name
    match client.get("example:hello").await {
        Err(err @ Error::Store { .. }) => warn!("As expected: {}", err),
        Err(err) => return Err(err.into()),
        Ok(value) => warn!("Key still present: {}", value),
    }

    info!("Example completed successfully!");
    Ok(())
}
