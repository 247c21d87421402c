use std::{num::NonZeroU32, time::Duration};

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::Client;
use snafu::{OptionExt, ResultExt};

use crate::{
    models::bar_series::DailySeries,
    providers::{
        ClientBuildSnafu, DataProvider, DecodeSnafu, ProviderError, ProviderInitError, RateLimitSnafu,
        ReqwestSnafu, StatusSnafu,
        yahoo_chart::{
            params::{construct_params, validate_lookback, validate_symbol},
            response::{ChartResponse, into_series},
        },
    },
};

const BASE_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36";

/// Default HTTP client timeout. Callers usually wrap fetches in a shorter deadline.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

pub struct YahooChartProvider {
    client: Client,
    base_url: String,
    limiter: DefaultDirectRateLimiter,
}

impl YahooChartProvider {
    /// Creates a provider against the public endpoint, throttled to two requests per second.
    pub fn new() -> Result<Self, ProviderInitError> {
        Self::with_options(BASE_URL, nonzero!(2u32), DEFAULT_HTTP_TIMEOUT)
    }

    /// Creates a provider with an explicit endpoint, request rate and HTTP timeout.
    pub fn with_options(
        base_url: &str,
        requests_per_second: NonZeroU32,
        http_timeout: Duration,
    ) -> Result<Self, ProviderInitError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(http_timeout)
            .build()
            .context(ClientBuildSnafu)?;

        let quota = Quota::with_period(Duration::from_secs(1) / requests_per_second.get())
            .context(RateLimitSnafu {
                message: format!("{requests_per_second} requests per second"),
            })?
            .allow_burst(requests_per_second);

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            limiter: RateLimiter::direct(quota),
        })
    }

    fn chart_url(&self, symbol: &str) -> String {
        format!("{}/{symbol}", self.base_url)
    }
}

#[async_trait]
impl DataProvider for YahooChartProvider {
    async fn fetch_recent(
        &self,
        symbol: &str,
        lookback_days: u32,
    ) -> Result<DailySeries, ProviderError> {
        validate_symbol(symbol)?;
        validate_lookback(lookback_days)?;

        self.limiter.until_ready().await;
        tracing::debug!(symbol, lookback_days, "requesting daily chart");

        let response = self
            .client
            .get(self.chart_url(symbol))
            .query(&construct_params(lookback_days))
            .send()
            .await
            .context(ReqwestSnafu)?;

        let status = response.status();
        // Yahoo reports unknown symbols as 404 with a regular chart error body.
        if !status.is_success() && status != reqwest::StatusCode::NOT_FOUND {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown API error".to_string());
            return StatusSnafu {
                status: status.as_u16(),
                body,
            }
            .fail();
        }

        let body = response.text().await.context(ReqwestSnafu)?;
        let chart: ChartResponse = serde_json::from_str(&body).map_err(|e| {
            DecodeSnafu {
                message: format!("chart payload for {symbol}: {e}"),
            }
            .build()
        })?;
        into_series(symbol, chart)
    }
}
