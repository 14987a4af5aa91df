use crate::auth::{self, get_timestamp_ms, Credentials};
use crate::error::{Result, WhitebitError};
use crate::types::*;
use crate::websocket::token::TokenSource;
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client as HttpClient, Request, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

pub const MAINNET_API_URL: &str = "https://whitebit.com";
const DEFAULT_TIMEOUT_SECONDS: u64 = 10;
const USER_AGENT: &str = concat!("whitebit-connector-rs/", env!("CARGO_PKG_VERSION"));

/// A client for the WhiteBIT REST API.
///
/// Public endpoints are plain `GET` requests; private endpoints are signed
/// `POST` requests and need [`Credentials`].
///
/// # Examples
///
/// ```no_run
/// use whitebit_connector_rs::rest::Client;
///
/// #[tokio::main]
/// async fn main() {
///     let client = Client::new(None, None).expect("Failed to create client");
///     let markets = client.get_markets().await.expect("Failed to get markets");
///     println!("Markets: {:?}", markets);
/// }
/// ```
#[derive(Clone)]
pub struct Client {
    http_client: HttpClient,
    base_url: Url,
    credentials: Option<Credentials>,
}

impl Client {
    /// Creates a client for the production API.
    ///
    /// `credentials` may be `None` for public endpoints only; private calls
    /// then fail with `AuthRequired` before any request is made.
    pub fn new(credentials: Option<Credentials>, timeout_sec: Option<u64>) -> Result<Self> {
        Self::with_base_url(MAINNET_API_URL, credentials, timeout_sec)
    }

    /// Creates a client against another host, e.g. a mock server.
    pub fn with_base_url(
        base_url: &str,
        credentials: Option<Credentials>,
        timeout_sec: Option<u64>,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        let timeout_duration = Duration::from_secs(timeout_sec.unwrap_or(DEFAULT_TIMEOUT_SECONDS));
        let http_client = HttpClient::builder()
            .timeout(timeout_duration)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http_client,
            base_url,
            credentials,
        })
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.as_ref().map_or(false, Credentials::is_valid)
    }

    fn credentials(&self, path: &str) -> Result<&Credentials> {
        match self.credentials.as_ref() {
            Some(credentials) if credentials.is_valid() => Ok(credentials),
            _ => Err(WhitebitError::AuthRequired(format!(
                "{} is a private endpoint; API key and secret are required",
                path
            ))),
        }
    }

    /// Builds an unsigned `GET` with the parameters as a key-sorted query string.
    fn build_public_request<P: Serialize>(&self, path: &str, params: Option<&P>) -> Result<Request> {
        let mut url = self.base_url.join(path)?;
        if let Some(p) = params {
            let sorted: BTreeMap<String, Value> = match serde_json::to_value(p)? {
                Value::Object(map) => map.into_iter().collect(),
                _ => BTreeMap::new(),
            };
            match serde_qs::to_string(&sorted) {
                Ok(query) if !query.is_empty() => url.set_query(Some(&query)),
                Ok(_) => {}
                Err(e) => warn!("Dropping query parameters for {}: {}", path, e),
            }
        }
        Ok(self.http_client.get(url).build()?)
    }

    /// Builds a signed `POST`.
    ///
    /// The body sent is exactly the JSON that was signed.
    fn build_signed_request<B: Serialize>(&self, path: &str, body: Option<&B>) -> Result<Request> {
        let credentials = self.credentials(path)?;
        let params = match body {
            Some(b) => match serde_json::to_value(b)? {
                Value::Object(map) => map,
                Value::Null => Map::new(),
                other => {
                    return Err(WhitebitError::ParameterValueError {
                        param: "body".to_string(),
                        value: other.to_string(),
                        allowed: vec!["JSON object".to_string()],
                    })
                }
            },
            None => Map::new(),
        };

        let signed = auth::sign_request(&credentials.api_secret, path, params, get_timestamp_ms())?;
        let full_url = self.base_url.join(path)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("x-txc-apikey"),
            HeaderValue::from_str(&credentials.api_key)?,
        );
        headers.insert(
            HeaderName::from_static("x-txc-payload"),
            HeaderValue::from_str(&signed.payload)?,
        );
        headers.insert(
            HeaderName::from_static("x-txc-signature"),
            HeaderValue::from_str(&signed.signature)?,
        );
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        Ok(self
            .http_client
            .post(full_url)
            .headers(headers)
            .body(signed.body)
            .build()?)
    }

    async fn public_get<T: DeserializeOwned, P: Serialize>(
        &self,
        path: &str,
        params: Option<&P>,
    ) -> Result<T> {
        let request = self.build_public_request(path, params)?;
        self.send_request(request).await
    }

    async fn private_post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<T> {
        let request = self.build_signed_request(path, body)?;
        self.send_request(request).await
    }

    async fn send_request<T: DeserializeOwned>(&self, request: Request) -> Result<T> {
        debug!("{} {}", request.method(), request.url().path());
        let response = self.http_client.execute(request).await?;
        Self::handle_response(response).await
    }

    /// Parses a success body into `T`, or a 4xx/5xx body into
    /// `ClientError` / `ServerError`.
    async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        let headers = response.headers().clone();

        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let (code, message, errors) = match response.json::<Value>().await {
            Ok(body) => (
                body["code"].as_i64().unwrap_or(0),
                body["message"]
                    .as_str()
                    .unwrap_or("Unknown error message")
                    .to_string(),
                body.get("errors").cloned(),
            ),
            Err(_) => (
                0,
                format!(
                    "Request failed with status {} (could not parse error body)",
                    status
                ),
                None,
            ),
        };

        if status.is_client_error() {
            Err(WhitebitError::ClientError {
                status,
                code,
                message,
                errors,
                header: headers,
            })
        } else {
            Err(WhitebitError::ServerError {
                status,
                code,
                message,
                header: headers,
            })
        }
    }

    // --- Public Endpoints ---

    /// Spot and futures markets with their precision and limits.
    ///
    /// https://docs.whitebit.com/public/http-v4/#market-info
    pub async fn get_markets(&self) -> Result<Value> {
        self.public_get::<_, ()>("/api/v4/public/markets", None)
            .await
    }

    /// 24h ticker of every market, keyed by market name.
    ///
    /// https://docs.whitebit.com/public/http-v4/#market-activity
    pub async fn get_tickers(&self) -> Result<Value> {
        self.public_get::<_, ()>("/api/v4/public/ticker", None)
            .await
    }

    /// https://docs.whitebit.com/public/http-v4/#asset-status-list
    pub async fn get_assets(&self) -> Result<Value> {
        self.public_get::<_, ()>("/api/v4/public/assets", None)
            .await
    }

    /// Order book of `market`. `level` aggregates price levels (0..=5).
    ///
    /// https://docs.whitebit.com/public/http-v4/#orderbook
    pub async fn get_orderbook(
        &self,
        market: &str,
        limit: Option<u32>,
        level: Option<u8>,
    ) -> Result<Value> {
        #[derive(Serialize)]
        struct Params {
            #[serde(skip_serializing_if = "Option::is_none")]
            limit: Option<u32>,
            #[serde(skip_serializing_if = "Option::is_none")]
            level: Option<u8>,
        }
        if let Some(l) = level {
            if l > 5 {
                return Err(WhitebitError::ParameterValueError {
                    param: "level".to_string(),
                    value: l.to_string(),
                    allowed: (0..=5).map(|v: u8| v.to_string()).collect(),
                });
            }
        }
        let path = format!("/api/v4/public/orderbook/{}", market);
        self.public_get(&path, Some(&Params { limit, level })).await
    }

    /// Recent trades of `market`, optionally filtered by taker side.
    ///
    /// https://docs.whitebit.com/public/http-v4/#recent-trades
    pub async fn get_recent_trades(&self, market: &str, side: Option<Side>) -> Result<Value> {
        #[derive(Serialize)]
        struct Params {
            #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
            side: Option<Side>,
        }
        let path = format!("/api/v4/public/trades/{}", market);
        self.public_get(&path, Some(&Params { side })).await
    }

    /// Candles of `market`.
    ///
    /// https://docs.whitebit.com/public/http-v1/#kline
    pub async fn get_kline(&self, market: &str, params: Option<KlineParams>) -> Result<Value> {
        #[derive(Serialize)]
        struct Params<'a> {
            market: &'a str,
            #[serde(flatten)]
            rest: KlineParams,
        }
        let query = Params {
            market,
            rest: params.unwrap_or_default(),
        };
        self.public_get("/api/v1/public/kline", Some(&query)).await
    }

    /// Deposit and withdrawal fees per asset.
    pub async fn get_fee_list(&self) -> Result<Value> {
        self.public_get::<_, ()>("/api/v4/public/fee", None).await
    }

    /// Server time as `{"time": <seconds>}`.
    pub async fn get_server_time(&self) -> Result<Value> {
        self.public_get::<_, ()>("/api/v4/public/time", None).await
    }

    /// Markets available for collateral (margin) trading.
    pub async fn get_collateral_markets(&self) -> Result<Value> {
        self.public_get::<_, ()>("/api/v4/public/collateral/markets", None)
            .await
    }

    pub async fn get_futures_markets(&self) -> Result<Value> {
        self.public_get::<_, ()>("/api/v4/public/futures", None)
            .await
    }

    // --- Trade Account ---

    /// Trade balances of every asset.
    ///
    /// https://docs.whitebit.com/private/http-trade-v4/#trading-balance
    pub async fn get_trade_balances(&self) -> Result<TradeBalances> {
        self.private_post::<_, ()>("/api/v4/trade-account/balance", None)
            .await
    }

    /// Trade balance of a single asset.
    pub async fn get_trade_balance(&self, ticker: &str) -> Result<TradeBalanceEntry> {
        #[derive(Serialize)]
        struct Body<'a> {
            ticker: &'a str,
        }
        self.private_post("/api/v4/trade-account/balance", Some(&Body { ticker }))
            .await
    }

    /// Open orders of `market`.
    ///
    /// https://docs.whitebit.com/private/http-trade-v4/#query-unexecuted-active-orders
    pub async fn get_unexecuted_orders(
        &self,
        market: &str,
        offset: Option<u32>,
        limit: Option<u32>,
    ) -> Result<Value> {
        let params = OrderHistoryParams {
            market: Some(market.to_string()),
            offset,
            limit,
            ..Default::default()
        };
        self.private_post("/api/v4/orders", Some(&params)).await
    }

    /// Filled orders, grouped by market.
    ///
    /// https://docs.whitebit.com/private/http-trade-v4/#query-executed-orders
    pub async fn get_executed_orders(&self, params: &OrderHistoryParams) -> Result<Value> {
        self.private_post("/api/v4/trade-account/order/history", Some(params))
            .await
    }

    /// Deals that filled `order_id`.
    pub async fn get_order_deals(
        &self,
        order_id: u64,
        offset: Option<u32>,
        limit: Option<u32>,
    ) -> Result<Value> {
        let params = OrderHistoryParams {
            order_id: Some(order_id),
            offset,
            limit,
            ..Default::default()
        };
        self.private_post("/api/v4/trade-account/order", Some(&params))
            .await
    }

    /// Deals of this account, optionally narrowed to a market or client order id.
    ///
    /// https://docs.whitebit.com/private/http-trade-v4/#query-executed-order-history
    pub async fn get_executed_deals(&self, params: &OrderHistoryParams) -> Result<Value> {
        self.private_post("/api/v4/trade-account/executed-history", Some(params))
            .await
    }

    // --- Orders ---

    /// https://docs.whitebit.com/private/http-trade-v4/#create-limit-order
    pub async fn place_limit_order(&self, order: &LimitOrderRequest) -> Result<OrderResponse> {
        self.private_post("/api/v4/order/new", Some(order)).await
    }

    /// https://docs.whitebit.com/private/http-trade-v4/#create-market-order
    pub async fn place_market_order(&self, order: &MarketOrderRequest) -> Result<OrderResponse> {
        self.private_post("/api/v4/order/market", Some(order)).await
    }

    pub async fn place_stop_limit_order(
        &self,
        order: &StopLimitOrderRequest,
    ) -> Result<OrderResponse> {
        self.private_post("/api/v4/order/stop_limit", Some(order))
            .await
    }

    /// Market order whose `amount` is in the stock asset rather than money.
    ///
    /// https://docs.whitebit.com/private/http-trade-v4/#create-buy-stock-market-order
    pub async fn place_stock_market_order(
        &self,
        order: &MarketOrderRequest,
    ) -> Result<OrderResponse> {
        self.private_post("/api/v4/order/stock_market", Some(order))
            .await
    }

    /// https://docs.whitebit.com/private/http-trade-v4/#create-stop-market-order
    pub async fn place_stop_market_order(
        &self,
        order: &StopMarketOrderRequest,
    ) -> Result<OrderResponse> {
        self.private_post("/api/v4/order/stop_market", Some(order))
            .await
    }

    /// Cancels a spot or collateral order.
    ///
    /// https://docs.whitebit.com/private/http-trade-v4/#cancel-order
    pub async fn cancel_order(&self, market: &str, order_id: u64) -> Result<OrderResponse> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Body<'a> {
            market: &'a str,
            order_id: u64,
        }
        self.private_post("/api/v4/order/cancel", Some(&Body { market, order_id }))
            .await
    }

    // --- Collateral Account ---

    /// Collateral balances, or a single asset when `ticker` is given.
    ///
    /// https://docs.whitebit.com/private/http-trade-v4/#collateral-account-balance
    pub async fn get_collateral_balance(&self, ticker: Option<&str>) -> Result<Value> {
        #[derive(Serialize)]
        struct Body<'a> {
            #[serde(skip_serializing_if = "Option::is_none")]
            ticker: Option<&'a str>,
        }
        self.private_post("/api/v4/collateral-account/balance", Some(&Body { ticker }))
            .await
    }

    /// Equity, margin and leverage of the collateral account.
    pub async fn get_collateral_summary(&self) -> Result<Value> {
        self.private_post::<_, ()>("/api/v4/collateral-account/summary", None)
            .await
    }

    /// Sets the account leverage. Accepted values are 1, 2, 3, 5, 10, 20, 50 and 100.
    ///
    /// https://docs.whitebit.com/private/http-trade-v4/#change-collateral-account-leverage
    pub async fn set_collateral_leverage(&self, leverage: u32) -> Result<Value> {
        const ALLOWED: [u32; 8] = [1, 2, 3, 5, 10, 20, 50, 100];
        if !ALLOWED.contains(&leverage) {
            return Err(WhitebitError::ParameterValueError {
                param: "leverage".to_string(),
                value: leverage.to_string(),
                allowed: ALLOWED.iter().map(u32::to_string).collect(),
            });
        }
        #[derive(Serialize)]
        struct Body {
            leverage: u32,
        }
        self.private_post("/api/v4/collateral-account/leverage", Some(&Body { leverage }))
            .await
    }

    /// Open positions, optionally of a single market.
    pub async fn get_open_positions(&self, market: Option<&str>) -> Result<Value> {
        #[derive(Serialize)]
        struct Body<'a> {
            #[serde(skip_serializing_if = "Option::is_none")]
            market: Option<&'a str>,
        }
        self.private_post("/api/v4/collateral-account/positions/open", Some(&Body { market }))
            .await
    }

    /// https://docs.whitebit.com/private/http-trade-v4/#positions-history
    pub async fn get_positions_history(&self, params: &PositionHistoryParams) -> Result<Value> {
        self.private_post("/api/v4/collateral-account/positions/history", Some(params))
            .await
    }

    /// Active OCO orders of `market`.
    pub async fn get_oco_orders(
        &self,
        market: &str,
        offset: Option<u32>,
        limit: Option<u32>,
    ) -> Result<Value> {
        let params = OrderHistoryParams {
            market: Some(market.to_string()),
            offset,
            limit,
            ..Default::default()
        };
        self.private_post("/api/v4/oco-orders", Some(&params)).await
    }

    // --- Collateral Orders ---

    /// https://docs.whitebit.com/private/http-trade-v4/#collateral-limit-order
    pub async fn place_collateral_limit_order(
        &self,
        order: &LimitOrderRequest,
    ) -> Result<OrderResponse> {
        self.private_post("/api/v4/order/collateral/limit", Some(order))
            .await
    }

    /// https://docs.whitebit.com/private/http-trade-v4/#collateral-market-order
    pub async fn place_collateral_market_order(
        &self,
        order: &MarketOrderRequest,
    ) -> Result<OrderResponse> {
        self.private_post("/api/v4/order/collateral/market", Some(order))
            .await
    }

    pub async fn place_collateral_stop_limit_order(
        &self,
        order: &StopLimitOrderRequest,
    ) -> Result<OrderResponse> {
        self.private_post("/api/v4/order/collateral/stop-limit", Some(order))
            .await
    }

    pub async fn place_collateral_trigger_market_order(
        &self,
        order: &StopMarketOrderRequest,
    ) -> Result<OrderResponse> {
        self.private_post("/api/v4/order/collateral/trigger-market", Some(order))
            .await
    }

    /// Places a limit order and a stop-limit order; filling one cancels the other.
    ///
    /// https://docs.whitebit.com/private/http-trade-v4/#collateral-oco-order
    pub async fn place_collateral_oco_order(&self, order: &OcoOrderRequest) -> Result<Value> {
        self.private_post("/api/v4/order/collateral/oco", Some(order))
            .await
    }

    pub async fn cancel_oco_order(&self, market: &str, order_id: u64) -> Result<Value> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Body<'a> {
            market: &'a str,
            order_id: u64,
        }
        self.private_post("/api/v4/order/oco-cancel", Some(&Body { market, order_id }))
            .await
    }

    // --- Main Account ---

    /// Main account balances, or a single asset when `ticker` is given.
    ///
    /// https://docs.whitebit.com/private/http-main-v4/#main-balance
    pub async fn get_main_balance(&self, ticker: Option<&str>) -> Result<Value> {
        #[derive(Serialize)]
        struct Body<'a> {
            #[serde(skip_serializing_if = "Option::is_none")]
            ticker: Option<&'a str>,
        }
        self.private_post("/api/v4/main-account/balance", Some(&Body { ticker }))
            .await
    }

    /// Deposit and withdrawal fees applied to this account.
    pub async fn get_main_fee(&self) -> Result<Value> {
        self.private_post::<_, ()>("/api/v4/main-account/fee", None)
            .await
    }

    /// Deposit and withdrawal history.
    ///
    /// https://docs.whitebit.com/private/http-main-v4/#get-depositwithdraw-history
    pub async fn get_main_history(&self, params: &MainHistoryParams) -> Result<Value> {
        self.private_post("/api/v4/main-account/history", Some(params))
            .await
    }

    /// Moves funds between the main, spot and collateral balances.
    ///
    /// https://docs.whitebit.com/private/http-main-v4/#transfer-between-balances
    pub async fn transfer(&self, request: &TransferRequest) -> Result<Value> {
        if request.from == request.to {
            return Err(WhitebitError::ParameterValueError {
                param: "to".to_string(),
                value: format!("{:?}", request.to),
                allowed: vec![format!("any balance other than {:?}", request.from)],
            });
        }
        self.private_post("/api/v4/main-account/transfer", Some(request))
            .await
    }

    /// https://docs.whitebit.com/private/http-main-v4/#create-code
    pub async fn create_code(&self, request: &CreateCodeRequest) -> Result<Value> {
        self.private_post("/api/v4/main-account/codes", Some(request))
            .await
    }

    /// Redeems a WhiteBIT code onto the main balance.
    pub async fn apply_code(&self, code: &str, passphrase: Option<&str>) -> Result<Value> {
        #[derive(Serialize)]
        struct Body<'a> {
            code: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            passphrase: Option<&'a str>,
        }
        self.private_post(
            "/api/v4/main-account/codes/apply",
            Some(&Body { code, passphrase }),
        )
        .await
    }

    /// Codes created by this account.
    pub async fn get_my_codes(&self, offset: Option<u32>, limit: Option<u32>) -> Result<Value> {
        self.private_post("/api/v4/main-account/codes/my", Some(&Page { offset, limit }))
            .await
    }

    /// Codes created or applied by this account.
    pub async fn get_codes_history(
        &self,
        offset: Option<u32>,
        limit: Option<u32>,
    ) -> Result<Value> {
        self.private_post(
            "/api/v4/main-account/codes/history",
            Some(&Page { offset, limit }),
        )
        .await
    }

    // --- Profile ---

    /// Issues a WebSocket authorization token.
    ///
    /// https://docs.whitebit.com/private/websocket/#authorize
    pub async fn get_ws_token(&self) -> Result<WsTokenResponse> {
        self.private_post::<_, ()>("/api/v4/profile/websocket_token", None)
            .await
    }
}

#[derive(Serialize)]
struct Page {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
}

#[async_trait]
impl TokenSource for Client {
    async fn ws_token(&self) -> Result<String> {
        Ok(self.get_ws_token().await?.websocket_token)
    }
}
