//! Yahoo Finance chart API bar source.
//!
//! Fetches `lookback_days` of intraday bars in one request. Rows with a
//! null in any OHLCV column (half-formed bars mid-session) are dropped, and
//! the result is sorted and de-duplicated by timestamp so downstream
//! consumers can rely on a strictly ordered window.

use crate::domain::errors::PipelineError;
use crate::domain::market::{Bar, BarInterval};
use crate::domain::ports::BarSource;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
const USER_AGENT: &str = "Mozilla/5.0 (compatible; intracast/0.3)";

pub struct YahooBarSource {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<f64>>,
}

impl YahooBarSource {
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(base_url: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, base_url })
    }

    fn bars_from_response(symbol: &str, response: ChartResponse) -> Result<Vec<Bar>> {
        if let Some(error) = response.chart.error
            && !error.is_null()
        {
            bail!("chart API error for {}: {}", symbol, error);
        }

        let result = response
            .chart
            .result
            .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
            .ok_or(PipelineError::NoDataAvailable {
                symbol: symbol.to_string(),
            })?;

        let timestamps = result.timestamp.unwrap_or_default();
        let quote = result
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or(PipelineError::NoDataAvailable {
                symbol: symbol.to_string(),
            })?;

        let mut bars = Vec::with_capacity(timestamps.len());
        for (i, &timestamp) in timestamps.iter().enumerate() {
            let row = (
                quote.open.get(i).copied().flatten(),
                quote.high.get(i).copied().flatten(),
                quote.low.get(i).copied().flatten(),
                quote.close.get(i).copied().flatten(),
                quote.volume.get(i).copied().flatten(),
            );
            if let (Some(open), Some(high), Some(low), Some(close), Some(volume)) = row {
                bars.push(Bar {
                    timestamp,
                    open,
                    high,
                    low,
                    close,
                    volume,
                });
            }
        }

        bars.sort_by_key(|b| b.timestamp);
        bars.dedup_by_key(|b| b.timestamp);

        if bars.is_empty() {
            return Err(PipelineError::NoDataAvailable {
                symbol: symbol.to_string(),
            }
            .into());
        }
        Ok(bars)
    }
}

#[async_trait]
impl BarSource for YahooBarSource {
    async fn fetch(
        &self,
        symbol: &str,
        interval: BarInterval,
        lookback_days: u32,
    ) -> Result<Vec<Bar>> {
        let url = format!(
            "{}/v8/finance/chart/{}?interval={}&range={}d",
            self.base_url,
            symbol,
            interval.as_query_str(),
            lookback_days
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("chart request failed for {symbol}"))?
            .error_for_status()
            .with_context(|| format!("chart request rejected for {symbol}"))?
            .json::<ChartResponse>()
            .await
            .with_context(|| format!("chart response malformed for {symbol}"))?;

        let bars = Self::bars_from_response(symbol, response)?;
        debug!(symbol, bars = bars.len(), "Fetched chart window");
        Ok(bars)
    }
}
