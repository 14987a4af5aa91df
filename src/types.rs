use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// --- Enums ---

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

/// Order type filter of the `ordersExecuted` channel.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(into = "u8", try_from = "u8")]
pub enum ExecutedOrderFilter {
    All = 0,
    Limit = 1,
    Market = 2,
}

impl From<ExecutedOrderFilter> for u8 {
    fn from(filter: ExecutedOrderFilter) -> Self {
        filter as u8
    }
}

impl TryFrom<u8> for ExecutedOrderFilter {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ExecutedOrderFilter::All),
            1 => Ok(ExecutedOrderFilter::Limit),
            2 => Ok(ExecutedOrderFilter::Market),
            other => Err(format!("unknown executed order filter {}", other)),
        }
    }
}

/// `transactionMethod` filter of the main-account history.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(into = "u8", try_from = "u8")]
pub enum TransactionMethod {
    Deposit = 1,
    Withdraw = 2,
}

impl From<TransactionMethod> for u8 {
    fn from(method: TransactionMethod) -> Self {
        method as u8
    }
}

impl TryFrom<u8> for TransactionMethod {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(TransactionMethod::Deposit),
            2 => Ok(TransactionMethod::Withdraw),
            other => Err(format!("unknown transaction method {}", other)),
        }
    }
}

/// Balance a transfer moves funds from or to.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BalanceKind {
    Main,
    Spot,
    Collateral,
}

// --- Request Structs ---

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LimitOrderRequest {
    pub market: String,
    pub side: Side,
    pub amount: String,
    pub price: String,
    pub post_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_order_id: Option<String>,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MarketOrderRequest {
    pub market: String,
    pub side: Side,
    pub amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_order_id: Option<String>,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StopLimitOrderRequest {
    pub market: String,
    pub side: Side,
    pub amount: String,
    pub price: String,
    #[serde(rename = "activation_price")]
    pub activation_price: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_order_id: Option<String>,
}

/// Spot stop-market or collateral trigger-market order.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StopMarketOrderRequest {
    pub market: String,
    pub side: Side,
    pub amount: String,
    #[serde(rename = "activation_price")]
    pub activation_price: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_order_id: Option<String>,
}

/// Collateral OCO: a limit order paired with a stop-limit order.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct OcoOrderRequest {
    pub market: String,
    pub side: Side,
    pub amount: String,
    pub price: String,
    #[serde(rename = "activation_price")]
    pub activation_price: String,
    #[serde(rename = "stop_limit_price")]
    pub stop_limit_price: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_order_id: Option<String>,
}

#[derive(Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct PositionHistoryParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_id: Option<u64>,
    /// Unix seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct MainHistoryParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_method: Option<TransactionMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<String>,
    #[serde(rename = "unique_id", skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub status: Vec<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Serialize, Debug, Clone)]
pub struct TransferRequest {
    pub from: BalanceKind,
    pub to: BalanceKind,
    pub ticker: String,
    pub amount: String,
}

/// A WhiteBIT code, optionally protected by a passphrase.
#[derive(Serialize, Debug, Clone)]
pub struct CreateCodeRequest {
    pub ticker: String,
    pub amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct OrderHistoryParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Serialize, Debug, Clone, Default)]
pub struct KlineParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

// --- Response Structs ---

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct WsTokenResponse {
    pub websocket_token: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TradeBalanceEntry {
    pub available: String,
    pub freeze: String,
}

/// Trade account balances keyed by ticker.
pub type TradeBalances = HashMap<String, TradeBalanceEntry>;

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub order_id: u64,
    #[serde(default)]
    pub client_order_id: String,
    pub market: String,
    pub side: Side,
    #[serde(rename = "type")]
    pub order_type: String,
    pub timestamp: f64,
    pub deal_money: String,
    pub deal_stock: String,
    pub amount: String,
    pub taker_fee: String,
    pub maker_fee: String,
    pub left: String,
    pub deal_fee: String,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default, rename = "activation_price")]
    pub activation_price: Option<String>,
}
