use std::net::SocketAddr;
use std::sync::Arc;

use concierge_gateway::store::KvStore;
use concierge_gateway::{Gateway, GatewayConfig, GatewayHttpState, HttpUpstream};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let mut listen = "127.0.0.1:8080".to_string();
    let mut json_logs = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--listen" | "--addr" => {
                listen = args.next().ok_or("missing value for --listen/--addr")?;
            }
            "--json-logs" => {
                json_logs = true;
            }
            other => {
                return Err(format!(
                    "unknown argument {other}; usage: concierge-gateway [--listen HOST:PORT] [--json-logs]"
                )
                .into());
            }
        }
    }

    let config = GatewayConfig::from_env();

    let store: Arc<dyn KvStore> = match config.redis_url.as_deref() {
        Some(url) => {
            let store = concierge_gateway::RedisStore::new(url)?;
            store.ping().await?;
            Arc::new(store)
        }
        None => Arc::new(concierge_gateway::MemoryStore::new()),
    };

    let mut gateway = Gateway::new(config.clone(), store);
    if json_logs {
        gateway = gateway.with_json_logs();
    }
    match config.api_key.clone() {
        Some(api_key) => {
            let mut upstream = HttpUpstream::new(api_key);
            if let Some(url) = config.upstream_url.clone() {
                upstream = upstream.with_generate_url(url);
            }
            gateway = gateway.with_upstream(upstream);
        }
        None => {
            eprintln!("warning: no upstream credential configured; chat requests will return 500");
        }
    }

    let app = concierge_gateway::router(GatewayHttpState::new(gateway));
    let listener = tokio::net::TcpListener::bind(&listen).await?;
    println!("concierge-gateway listening on {listen}");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
