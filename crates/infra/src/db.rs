use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tokio::net::TcpStream;
use tokio::time::timeout;
use url::Url;

use crate::config::AppConfig;

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub endpoint: String,
    pub namespace: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl DbConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            endpoint: config.surreal_endpoint.clone(),
            namespace: config.surreal_ns.clone(),
            database: config.surreal_db.clone(),
            username: config.surreal_user.clone(),
            password: config.surreal_pass.clone(),
        }
    }
}

pub async fn connect(db_config: &DbConfig) -> anyhow::Result<Arc<Surreal<Client>>> {
    let db = Surreal::<Client>::init();
    db.connect::<Ws>(&db_config.endpoint)
        .await
        .with_context(|| format!("connect surrealdb endpoint {}", db_config.endpoint))?;
    db.signin(Root {
        username: &db_config.username,
        password: &db_config.password,
    })
    .await
    .context("surreal root signin")?;
    db.use_ns(&db_config.namespace)
        .use_db(&db_config.database)
        .await
        .context("select surrealdb namespace/database")?;
    Ok(Arc::new(db))
}

/// Cheap reachability probe for the health endpoint. Opens a TCP connection
/// to the configured endpoint without a full SurrealDB handshake.
pub async fn health_check(db_config: &DbConfig) -> Result<(), String> {
    let address = parse_socket_address(&db_config.endpoint)?;
    let connect = timeout(Duration::from_secs(2), TcpStream::connect(&address))
        .await
        .map_err(|_| "surreal endpoint connect timed out".to_string())?;
    connect.map_err(|err| format!("surreal endpoint connect failed: {err}"))?;
    tracing::debug!(
        endpoint = db_config.endpoint,
        namespace = db_config.namespace,
        database = db_config.database,
        "surreal health check succeeded"
    );
    Ok(())
}

fn parse_socket_address(endpoint: &str) -> Result<String, String> {
    let normalized = if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("ws://{endpoint}")
    };
    let parsed = Url::parse(&normalized)
        .map_err(|err| format!("invalid surreal endpoint '{endpoint}': {err}"))?;

    let scheme = parsed.scheme();
    let host = parsed
        .host_str()
        .ok_or_else(|| format!("missing surreal host in endpoint '{endpoint}'"))?;
    let port = parsed.port().unwrap_or(match scheme {
        "wss" | "https" => 443,
        _ => 8000,
    });
    Ok(format!("{host}:{port}"))
}
