use std::sync::Arc;
use tokio::time::Duration;
use tracing_subscriber::EnvFilter;
use whitebit_connector_rs::auth::Credentials;
use whitebit_connector_rs::rest::Client;
use whitebit_connector_rs::websocket::{
    Envelope, MessageHandler, TokenSource, WebsocketClientConfig, WhitebitWsClient,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging (log records are bridged into tracing)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let market = std::env::args().nth(1).unwrap_or_else(|| "BTC_USDT".to_string());

    // Private channels only work when API credentials are present
    let token_source: Option<Arc<dyn TokenSource>> = match Credentials::from_env() {
        Some(credentials) => Some(Arc::new(Client::new(Some(credentials), None)?)),
        None => None,
    };

    let handler: MessageHandler = Arc::new(|msg: Envelope| {
        if msg.is_error() {
            tracing::warn!("Session error: {}", msg.to_value());
        } else {
            println!("{}", msg.to_value());
        }
    });

    let client =
        WhitebitWsClient::connect(WebsocketClientConfig::from_env(), token_source, handler)
            .await?;
    client.wait_until_live(Duration::from_secs(15)).await?;
    tracing::info!("Connected, state {:?}", client.state());

    client.get_deals(&market, 0, 10).await?;
    client.subscribe_deals(&[market.as_str()]).await?;
    client.subscribe_last_price(&[market.as_str()]).await?;
    if client.is_authenticated() {
        client.subscribe_spot_balance(&["USDT"]).await?;
    }

    tokio::signal::ctrl_c().await?;
    client.stop().await;
    Ok(())
}
