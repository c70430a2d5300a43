use anyhow::Result;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = asset_gateway::gateway_config();
    let snapshot = config.snapshot();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if snapshot.get("log.format") == Some("json") {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let ax = asset_gateway::build(&config).await?;

    let host = snapshot
        .get_string("http.host")
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let port = snapshot
        .get_string("http.port")
        .unwrap_or_else(|| "3000".to_string());

    let addr = format!("{host}:{port}");
    tracing::info!(target: "gallery", %addr, "starting asset gateway");

    ax.listen(addr).await?;

    Ok(())
}
