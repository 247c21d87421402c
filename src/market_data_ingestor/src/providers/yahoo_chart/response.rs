use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use serde::Deserialize;

use crate::{
    models::{bar::DailyBar, bar_series::DailySeries},
    providers::{ApiSnafu, DecodeSnafu, ProviderError},
};

#[derive(Deserialize, Debug)]
pub struct ChartResponse {
    pub chart: ChartEnvelope,
}

#[derive(Deserialize, Debug)]
pub struct ChartEnvelope {
    pub result: Option<Vec<ChartResult>>,
    pub error: Option<ChartError>,
}

#[derive(Deserialize, Debug)]
pub struct ChartError {
    pub code: String,
    pub description: String,
}

#[derive(Deserialize, Debug)]
pub struct ChartResult {
    pub meta: ChartMeta,
    #[serde(default)]
    pub timestamp: Option<Vec<i64>>,
    pub indicators: Indicators,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ChartMeta {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub exchange_timezone_name: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct Indicators {
    #[serde(default)]
    pub quote: Vec<Quote>,
}

#[derive(Deserialize, Debug, Default)]
pub struct Quote {
    #[serde(default)]
    pub close: Vec<Option<f64>>,
    #[serde(default)]
    pub volume: Vec<Option<f64>>,
}

/// Converts a decoded chart payload into a [`DailySeries`].
///
/// - A chart-level `error` becomes [`ProviderError::Api`] with Yahoo's code and text.
/// - A result without timestamps is an empty window, not an error.
/// - Timestamps are mapped to dates in the exchange time zone (UTC if unknown).
/// - Bars with a null close are dropped; a null volume is reported as 0.
/// - If two bars land on the same date the later one wins.
pub fn into_series(symbol: &str, resp: ChartResponse) -> Result<DailySeries, ProviderError> {
    if let Some(err) = resp.chart.error {
        return ApiSnafu {
            message: format!("{}: {}", err.code, err.description),
        }
        .fail();
    }

    let data = resp
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| {
            DecodeSnafu {
                message: format!("no chart result for {symbol}"),
            }
            .build()
        })?;

    let Some(timestamps) = data.timestamp else {
        return Ok(DailySeries::empty(symbol));
    };

    let tz = exchange_tz(data.meta.exchange_timezone_name.as_deref());
    let quote = data.indicators.quote.into_iter().next().unwrap_or_default();

    let mut bars: Vec<DailyBar> = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let Some(close) = quote.close.get(i).copied().flatten() else {
            continue;
        };
        let volume = quote.volume.get(i).copied().flatten().unwrap_or(0.0);
        let date = local_date(ts, tz).ok_or_else(|| {
            DecodeSnafu {
                message: format!("invalid timestamp {ts} for {symbol}"),
            }
            .build()
        })?;

        match bars.last_mut() {
            Some(last) if last.date == date => *last = DailyBar::new(date, close, volume),
            _ => bars.push(DailyBar::new(date, close, volume)),
        }
    }

    bars.sort_by_key(|b| b.date);
    Ok(DailySeries::new(symbol, bars))
}

fn exchange_tz(name: Option<&str>) -> Tz {
    name.and_then(|n| n.parse::<Tz>().ok())
        .unwrap_or(chrono_tz::UTC)
}

fn local_date(ts: i64, tz: Tz) -> Option<NaiveDate> {
    DateTime::from_timestamp(ts, 0).map(|utc| utc.with_timezone(&tz).date_naive())
}
