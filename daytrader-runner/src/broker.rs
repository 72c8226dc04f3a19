//! Brokerage collaborators.
//!
//! `HttpBroker` talks to a REST brokerage over `reqwest::blocking`: password
//! grant authentication, quotes, intraday history and market orders.
//! `PaperBroker` fills every order locally and `ReplayMarketData` serves
//! quotes from a recorded series, for dry runs and tests.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Local};
use daytrader_core::domain::{PricePoint, PriceSeries};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::collaborators::{
    CollaboratorError, HistoryRange, MarketData, OrderExecution, OrderSide, PeriodType,
};
use crate::config::BrokerConfig;
use crate::data::parse_timestamp;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteResponse {
    last_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    prices: Vec<HistoryRow>,
}

#[derive(Debug, Deserialize)]
struct HistoryRow {
    #[serde(alias = "datetime", alias = "date")]
    timestamp: String,
    close: Option<f64>,
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    grant_type: &'static str,
    client_id: &'a str,
    client_secret: &'a str,
    username: &'a str,
    password: &'a str,
}

impl<'a> TokenRequest<'a> {
    fn password_grant(creds: &'a Credentials) -> Self {
        Self {
            grant_type: "password",
            client_id: &creds.client_id,
            client_secret: &creds.client_secret,
            username: &creds.username,
            password: &creds.password,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OrderRequest<'a> {
    symbol: &'a str,
    side: &'static str,
    quantity: u64,
    order_type: &'static str,
    time_in_force: &'static str,
}

/// Login values read from the environment variables named in `BrokerConfig`.
#[derive(Clone)]
struct Credentials {
    client_id: String,
    client_secret: String,
    username: String,
    password: String,
}

impl Credentials {
    fn from_env(config: &BrokerConfig) -> Result<Self, CollaboratorError> {
        let var = |name: &str| {
            std::env::var(name).map_err(|_| {
                CollaboratorError::Connectivity(format!("credential variable {name} is not set"))
            })
        };
        Ok(Self {
            client_id: var(&config.client_id_env)?,
            client_secret: var(&config.client_secret_env)?,
            username: var(&config.username_env)?,
            password: var(&config.password_env)?,
        })
    }
}

/// REST brokerage client.
///
/// Authenticates lazily on first use and caches the bearer token; a 401
/// drops the token so the next call logs in again.
pub struct HttpBroker {
    client: reqwest::blocking::Client,
    base_url: String,
    config: BrokerConfig,
    token: Mutex<Option<String>>,
}

impl HttpBroker {
    pub fn new(config: &BrokerConfig) -> Result<Self, CollaboratorError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("daytrader/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CollaboratorError::Connectivity(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            config: config.clone(),
            token: Mutex::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn bearer(&self) -> Result<String, CollaboratorError> {
        let mut token = self
            .token
            .lock()
            .map_err(|_| CollaboratorError::Connectivity("token cache poisoned".into()))?;
        if let Some(token) = token.as_ref() {
            return Ok(token.clone());
        }
        let fresh = self.authenticate()?;
        *token = Some(fresh.clone());
        Ok(fresh)
    }

    fn forget_token(&self) {
        if let Ok(mut token) = self.token.lock() {
            *token = None;
        }
    }

    fn authenticate(&self) -> Result<String, CollaboratorError> {
        let creds = Credentials::from_env(&self.config)?;
        let resp = self
            .client
            .post(self.url("token"))
            .json(&TokenRequest::password_grant(&creds))
            .send()
            .map_err(transport_error)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(CollaboratorError::Connectivity(format!(
                "authentication failed: HTTP {status}"
            )));
        }
        let body: TokenResponse = resp.json().map_err(|e| {
            CollaboratorError::Connectivity(format!("malformed token response: {e}"))
        })?;
        info!(base_url = %self.base_url, "authenticated with broker");
        Ok(body.access_token)
    }

    /// Map a non-success status; 401 also invalidates the cached token.
    fn check_status(&self, status: StatusCode, what: &str, order: bool) -> Result<(), CollaboratorError> {
        if status == StatusCode::UNAUTHORIZED {
            self.forget_token();
        }
        match classify_status(status, what, order) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for HttpBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBroker")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

fn transport_error(e: reqwest::Error) -> CollaboratorError {
    if e.is_timeout() {
        CollaboratorError::Connectivity(format!("request timed out: {e}"))
    } else {
        CollaboratorError::Connectivity(e.to_string())
    }
}

/// `None` for success statuses.
///
/// 401 and 5xx are connectivity problems. Other 4xx statuses reject an order;
/// for data requests 404 means an unknown symbol.
fn classify_status(status: StatusCode, what: &str, order: bool) -> Option<CollaboratorError> {
    if status.is_success() {
        return None;
    }
    let msg = format!("HTTP {status} for {what}");
    Some(if status == StatusCode::UNAUTHORIZED || status.is_server_error() {
        CollaboratorError::Connectivity(msg)
    } else if order && status.is_client_error() {
        CollaboratorError::OrderRejected(msg)
    } else if status == StatusCode::NOT_FOUND {
        CollaboratorError::NotFound(msg)
    } else {
        CollaboratorError::DataUnavailable(msg)
    })
}

fn range_days(range: &HistoryRange) -> i64 {
    let per_period = match range.period_type {
        PeriodType::Day => 1,
        PeriodType::Month => 30,
        PeriodType::Year => 365,
    };
    i64::from(range.period.max(1)) * per_period
}

fn history_to_series(symbol: &str, rows: Vec<HistoryRow>) -> Result<PriceSeries, CollaboratorError> {
    let mut points: Vec<PricePoint> = rows
        .into_iter()
        .filter_map(|row| {
            let close = row.close.filter(|c| c.is_finite() && *c > 0.0)?;
            match parse_timestamp(&row.timestamp) {
                Some(ts) => Some(PricePoint::new(ts, close)),
                None => {
                    warn!(symbol, timestamp = %row.timestamp, "dropping row with unparseable timestamp");
                    None
                }
            }
        })
        .collect();
    points.sort_by_key(|p| p.timestamp);
    PriceSeries::new(symbol, points)
        .map_err(|e| CollaboratorError::DataUnavailable(format!("history for {symbol}: {e}")))
}

impl MarketData for HttpBroker {
    fn get_quote(&self, symbol: &str) -> Result<f64, CollaboratorError> {
        let token = self.bearer()?;
        let resp = self
            .client
            .get(self.url("marketdata/quote"))
            .bearer_auth(token)
            .query(&[("symbol", symbol)])
            .send()
            .map_err(transport_error)?;
        self.check_status(resp.status(), &format!("quote {symbol}"), false)?;
        let body: QuoteResponse = resp.json().map_err(|e| {
            CollaboratorError::DataUnavailable(format!("malformed quote for {symbol}: {e}"))
        })?;
        let price = body
            .last_price
            .filter(|p| p.is_finite() && *p > 0.0)
            .ok_or_else(|| CollaboratorError::DataUnavailable(format!("no last price for {symbol}")))?;
        debug!(symbol, price, "quote");
        Ok(price)
    }

    fn get_history(&self, symbol: &str, range: HistoryRange) -> Result<PriceSeries, CollaboratorError> {
        let token = self.bearer()?;
        let end = Local::now().date_naive();
        let start = end - ChronoDuration::days(range_days(&range));
        let resp = self
            .client
            .get(self.url("marketdata/history"))
            .bearer_auth(token)
            .query(&[
                ("symbol", symbol.to_string()),
                ("startDate", start.format("%Y-%m-%d").to_string()),
                ("endDate", end.format("%Y-%m-%d").to_string()),
                ("interval", format!("{}m", range.frequency_minutes.max(1))),
            ])
            .send()
            .map_err(transport_error)?;
        self.check_status(resp.status(), &format!("history {symbol}"), false)?;
        let body: HistoryResponse = resp.json().map_err(|e| {
            CollaboratorError::DataUnavailable(format!("malformed history for {symbol}: {e}"))
        })?;
        let series = history_to_series(symbol, body.prices)?;
        info!(symbol, bars = series.len(), %start, %end, "fetched history");
        Ok(series)
    }
}

impl OrderExecution for HttpBroker {
    fn submit(&self, symbol: &str, side: OrderSide, quantity: u64) -> Result<(), CollaboratorError> {
        let token = self.bearer()?;
        let request = OrderRequest {
            symbol,
            side: match side {
                OrderSide::Buy => "buy",
                OrderSide::Sell => "sell",
            },
            quantity,
            order_type: "market",
            time_in_force: "day",
        };
        let resp = self
            .client
            .post(self.url("orders"))
            .bearer_auth(token)
            .json(&request)
            .send()
            .map_err(transport_error)?;
        self.check_status(resp.status(), &format!("{side} {quantity} {symbol}"), true)?;
        info!(symbol, %side, quantity, "order accepted");
        Ok(())
    }
}

/// An order accepted by `PaperBroker`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaperOrder {
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: u64,
}

/// Fills every order immediately and remembers it.
#[derive(Debug, Default)]
pub struct PaperBroker {
    orders: Mutex<Vec<PaperOrder>>,
    reject_all: bool,
}

impl PaperBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// A broker that refuses every order.
    pub fn rejecting() -> Self {
        Self {
            orders: Mutex::new(Vec::new()),
            reject_all: true,
        }
    }

    pub fn orders(&self) -> Vec<PaperOrder> {
        self.orders.lock().map(|o| o.clone()).unwrap_or_default()
    }
}

impl OrderExecution for PaperBroker {
    fn submit(&self, symbol: &str, side: OrderSide, quantity: u64) -> Result<(), CollaboratorError> {
        if self.reject_all {
            return Err(CollaboratorError::OrderRejected(format!(
                "paper broker rejects {side} {quantity} {symbol}"
            )));
        }
        let mut orders = self
            .orders
            .lock()
            .map_err(|_| CollaboratorError::Connectivity("paper order book poisoned".into()))?;
        orders.push(PaperOrder {
            symbol: symbol.to_string(),
            side,
            quantity,
        });
        info!(symbol, %side, quantity, "paper fill");
        Ok(())
    }
}

/// Serves quotes one by one from a recorded series.
///
/// `None` entries simulate a failed quote. After the last entry every quote
/// fails with `DataUnavailable`.
#[derive(Debug)]
pub struct ReplayMarketData {
    quotes: Mutex<std::vec::IntoIter<Option<f64>>>,
    history: Option<PriceSeries>,
}

impl ReplayMarketData {
    pub fn new(quotes: Vec<Option<f64>>) -> Self {
        Self {
            quotes: Mutex::new(quotes.into_iter()),
            history: None,
        }
    }

    /// Replay the closes of `series`.
    pub fn from_series(series: &PriceSeries) -> Self {
        Self::new(series.closes().into_iter().map(Some).collect())
    }

    /// History returned by `get_history`.
    pub fn with_history(mut self, history: PriceSeries) -> Self {
        self.history = Some(history);
        self
    }
}

impl MarketData for ReplayMarketData {
    fn get_quote(&self, symbol: &str) -> Result<f64, CollaboratorError> {
        let mut quotes = self
            .quotes
            .lock()
            .map_err(|_| CollaboratorError::Connectivity("quote feed poisoned".into()))?;
        match quotes.next() {
            Some(Some(price)) => Ok(price),
            Some(None) => Err(CollaboratorError::Connectivity(format!(
                "quote for {symbol} timed out"
            ))),
            None => Err(CollaboratorError::DataUnavailable(format!(
                "quote feed for {symbol} exhausted"
            ))),
        }
    }

    fn get_history(&self, symbol: &str, _range: HistoryRange) -> Result<PriceSeries, CollaboratorError> {
        self.history
            .clone()
            .ok_or_else(|| CollaboratorError::NotFound(format!("no recorded history for {symbol}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_request_is_a_json_password_grant() {
        let creds = Credentials {
            client_id: "id".into(),
            client_secret: "secret".into(),
            username: "user".into(),
            password: "pw".into(),
        };
        let body = serde_json::to_value(TokenRequest::password_grant(&creds)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "grant_type": "password",
                "client_id": "id",
                "client_secret": "secret",
                "username": "user",
                "password": "pw",
            })
        );
    }

    #[test]
    fn status_mapping() {
        assert_eq!(classify_status(StatusCode::OK, "q", true), None);
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, "q", true),
            Some(CollaboratorError::Connectivity(_))
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY, "q", false),
            Some(CollaboratorError::Connectivity(_))
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_REQUEST, "order", true),
            Some(CollaboratorError::OrderRejected(_))
        ));
        assert!(matches!(
            classify_status(StatusCode::NOT_FOUND, "quote", false),
            Some(CollaboratorError::NotFound(_))
        ));
        assert!(matches!(
            classify_status(StatusCode::UNPROCESSABLE_ENTITY, "quote", false),
            Some(CollaboratorError::DataUnavailable(_))
        ));
    }

    #[test]
    fn range_days_by_period_type() {
        assert_eq!(range_days(&HistoryRange::days(10, 1)), 10);
        let months = HistoryRange {
            period: 2,
            period_type: PeriodType::Month,
            frequency_minutes: 5,
        };
        assert_eq!(range_days(&months), 60);
    }

    #[test]
    fn history_rows_become_sorted_series() {
        let body: HistoryResponse = serde_json::from_str(
            r#"{"prices":[
                {"datetime":"2024-06-03 09:01:00","close":101.0},
                {"timestamp":"2024-06-03T09:00:00+09:00","close":100.0},
                {"timestamp":"garbage","close":5.0},
                {"timestamp":"2024-06-03 09:02:00","close":null}
            ]}"#,
        )
        .unwrap();
        let series = history_to_series("7203", body.prices).unwrap();
        assert_eq!(series.closes(), vec![100.0, 101.0]);
    }

    #[test]
    fn empty_history_is_data_unavailable() {
        assert!(matches!(
            history_to_series("7203", Vec::new()),
            Err(CollaboratorError::DataUnavailable(_))
        ));
    }

    #[test]
    fn order_request_shape() {
        let json = serde_json::to_value(OrderRequest {
            symbol: "7203",
            side: "buy",
            quantity: 100,
            order_type: "market",
            time_in_force: "day",
        })
        .unwrap();
        assert_eq!(json["orderType"], "market");
        assert_eq!(json["timeInForce"], "day");
        assert_eq!(json["quantity"], 100);
    }

    #[test]
    fn broker_url_joins_paths() {
        let config = BrokerConfig {
            base_url: "https://broker.test/v1/".into(),
            ..BrokerConfig::default()
        };
        let broker = HttpBroker::new(&config).unwrap();
        assert_eq!(broker.url("/orders"), "https://broker.test/v1/orders");
    }

    #[test]
    fn paper_broker_records_orders() {
        let broker = PaperBroker::new();
        broker.submit("7203", OrderSide::Buy, 100).unwrap();
        broker.submit("7203", OrderSide::Sell, 100).unwrap();
        let orders = broker.orders();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[1].side, OrderSide::Sell);
    }

    #[test]
    fn rejecting_paper_broker() {
        let broker = PaperBroker::rejecting();
        assert!(matches!(
            broker.submit("7203", OrderSide::Buy, 1),
            Err(CollaboratorError::OrderRejected(_))
        ));
        assert!(broker.orders().is_empty());
    }

    #[test]
    fn replay_serves_quotes_in_order() {
        let feed = ReplayMarketData::new(vec![Some(1.0), None, Some(2.0)]);
        assert_eq!(feed.get_quote("X"), Ok(1.0));
        assert!(matches!(feed.get_quote("X"), Err(CollaboratorError::Connectivity(_))));
        assert_eq!(feed.get_quote("X"), Ok(2.0));
        assert!(matches!(feed.get_quote("X"), Err(CollaboratorError::DataUnavailable(_))));
        assert!(matches!(
            feed.get_history("X", HistoryRange::default()),
            Err(CollaboratorError::NotFound(_))
        ));
    }
}
