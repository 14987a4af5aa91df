use whitebit_connector_rs::rest::Client;
use whitebit_connector_rs::types::{KlineParams, Side};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::init();

    // Load environment variables
    dotenv::dotenv().ok();

    let client = Client::new(None, None)?;

    println!("\nFetching server time...");
    println!("{}", client.get_server_time().await?);

    println!("\nFetching BTC_USDT order book...");
    let book = client.get_orderbook("BTC_USDT", Some(5), None).await?;
    println!("  Asks: {}", book["asks"]);
    println!("  Bids: {}", book["bids"]);

    println!("\nFetching recent sells...");
    match client.get_recent_trades("BTC_USDT", Some(Side::Sell)).await {
        Ok(trades) => println!("  {} trades", trades.as_array().map_or(0, Vec::len)),
        Err(e) => eprintln!("Error fetching trades: {}", e),
    }

    println!("\nFetching hourly candles...");
    let params = KlineParams {
        interval: Some("1h".to_string()),
        limit: Some(3),
        ..Default::default()
    };
    match client.get_kline("BTC_USDT", Some(params)).await {
        Ok(candles) => println!("{}", candles),
        Err(e) => eprintln!("Error fetching candles: {}", e),
    }

    Ok(())
}
