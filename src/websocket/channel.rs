//! Channel table of the WebSocket API.
//!
//! Every channel exposes up to four method names following the
//! `<channel>_request`, `<channel>_subscribe`, `<channel>_update` and
//! `<channel>_unsubscribe` convention. `marketToday` is the one exception and
//! uses `_query` for its one-shot request.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    Candles,
    Depth,
    LastPrice,
    MarketStat,
    MarketStatToday,
    Trades,
    Deals,
    OrdersPending,
    OrdersExecuted,
    SpotBalance,
    MarginBalance,
}

/// Method names of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelMethods {
    pub request: &'static str,
    pub subscribe: &'static str,
    pub update: &'static str,
    pub unsubscribe: &'static str,
}

impl Channel {
    pub const ALL: [Channel; 11] = [
        Channel::Candles,
        Channel::Depth,
        Channel::LastPrice,
        Channel::MarketStat,
        Channel::MarketStatToday,
        Channel::Trades,
        Channel::Deals,
        Channel::OrdersPending,
        Channel::OrdersExecuted,
        Channel::SpotBalance,
        Channel::MarginBalance,
    ];

    pub const fn methods(self) -> ChannelMethods {
        match self {
            Channel::Candles => ChannelMethods {
                request: "candles_request",
                subscribe: "candles_subscribe",
                update: "candles_update",
                unsubscribe: "candles_unsubscribe",
            },
            Channel::Depth => ChannelMethods {
                request: "depth_request",
                subscribe: "depth_subscribe",
                update: "depth_update",
                unsubscribe: "depth_unsubscribe",
            },
            Channel::LastPrice => ChannelMethods {
                request: "lastprice_request",
                subscribe: "lastprice_subscribe",
                update: "lastprice_update",
                unsubscribe: "lastprice_unsubscribe",
            },
            Channel::MarketStat => ChannelMethods {
                request: "market_request",
                subscribe: "market_subscribe",
                update: "market_update",
                unsubscribe: "market_unsubscribe",
            },
            Channel::MarketStatToday => ChannelMethods {
                request: "marketToday_query",
                subscribe: "marketToday_subscribe",
                update: "marketToday_update",
                unsubscribe: "marketToday_unsubscribe",
            },
            Channel::Trades => ChannelMethods {
                request: "trades_request",
                subscribe: "trades_subscribe",
                update: "trades_update",
                unsubscribe: "trades_unsubscribe",
            },
            Channel::Deals => ChannelMethods {
                request: "deals_request",
                subscribe: "deals_subscribe",
                update: "deals_update",
                unsubscribe: "deals_unsubscribe",
            },
            Channel::OrdersPending => ChannelMethods {
                request: "ordersPending_request",
                subscribe: "ordersPending_subscribe",
                update: "ordersPending_update",
                unsubscribe: "ordersPending_unsubscribe",
            },
            Channel::OrdersExecuted => ChannelMethods {
                request: "ordersExecuted_request",
                subscribe: "ordersExecuted_subscribe",
                update: "ordersExecuted_update",
                unsubscribe: "ordersExecuted_unsubscribe",
            },
            Channel::SpotBalance => ChannelMethods {
                request: "balanceSpot_request",
                subscribe: "balanceSpot_subscribe",
                update: "balanceSpot_update",
                unsubscribe: "balanceSpot_unsubscribe",
            },
            Channel::MarginBalance => ChannelMethods {
                request: "balanceMargin_request",
                subscribe: "balanceMargin_subscribe",
                update: "balanceMargin_update",
                unsubscribe: "balanceMargin_unsubscribe",
            },
        }
    }

    /// Channels whose commands are refused locally without credentials.
    ///
    /// `deals` is left out: the exchange answers unauthorized deal queries
    /// itself, and the session only gates the balance and order channels.
    pub const fn is_private(self) -> bool {
        matches!(
            self,
            Channel::OrdersPending
                | Channel::OrdersExecuted
                | Channel::SpotBalance
                | Channel::MarginBalance
        )
    }

    /// Looks up the channel owning `method`, whichever of its four names it is.
    pub fn from_method(method: &str) -> Option<Channel> {
        Self::ALL.into_iter().find(|channel| {
            let m = channel.methods();
            m.request == method
                || m.subscribe == method
                || m.update == method
                || m.unsubscribe == method
        })
    }
}

/// Maps `<channel>_unsubscribe` to the `<channel>_subscribe` entry it cancels.
///
/// Channels outside the table follow the naming convention.
pub fn subscribe_method_for(unsubscribe_method: &str) -> String {
    if let Some(channel) = Channel::from_method(unsubscribe_method) {
        return channel.methods().subscribe.to_string();
    }
    match unsubscribe_method.strip_suffix("_unsubscribe") {
        Some(name) => format!("{}_subscribe", name),
        None => unsubscribe_method.to_string(),
    }
}
