//! Finnhub REST adapter

use crate::error::{AppError, Result};
use crate::models::Symbol;
use crate::providers::rate_limiter::RateLimiter;
use crate::providers::types::*;
use crate::providers::MarketDataProvider;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://finnhub.io/api/v1/";

/// Days of company news requested for a symbol
const COMPANY_NEWS_DAYS: i64 = 7;

/// API endpoints
#[derive(Debug, Clone, Copy)]
enum Endpoint {
    Search,
    TopStories,
    CompanyNews,
    MarketData,
    Financials,
}

impl Endpoint {
    fn path(&self) -> &'static str {
        match self {
            Endpoint::Search => "search",
            Endpoint::TopStories => "news",
            Endpoint::CompanyNews => "company-news",
            Endpoint::MarketData => "stock/candle",
            Endpoint::Financials => "stock/metric",
        }
    }
}

/// Finnhub provider implementation
pub struct FinnhubProvider {
    client: Client,
    base_url: Url,
    api_key: String,
    resolution: String,
    limiter: RateLimiter,
}

impl FinnhubProvider {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        resolution: impl Into<String>,
        requests_per_second: u32,
    ) -> Result<Self> {
        // Url::join drops the last path segment unless the base ends with '/'
        let base = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };

        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()?,
            base_url: Url::parse(&base)?,
            api_key: api_key.into(),
            resolution: resolution.into(),
            limiter: RateLimiter::new(requests_per_second),
        })
    }

    /// Build the URL for an endpoint, appending query params and the token
    fn url(&self, endpoint: Endpoint, params: &[(&str, String)]) -> Result<Url> {
        let mut url = self.base_url.join(endpoint.path())?;
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in params {
                query.append_pair(key, value);
            }
            query.append_pair("token", &self.api_key);
        }
        Ok(url)
    }

    async fn request<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        self.limiter.acquire().await;

        let path = url.path().to_string();
        debug!("GET {}", path);

        let response = self.client.get(url).send().await?.error_for_status()?;
        let body = response.bytes().await?;

        if body.is_empty() {
            return Err(AppError::NoData(format!("Empty response from {}", path)));
        }

        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl MarketDataProvider for FinnhubProvider {
    fn id(&self) -> &'static str {
        "finnhub"
    }

    async fn fetch_candles(
        &self,
        symbol: &Symbol,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<CandlesResponse> {
        let url = self.url(
            Endpoint::MarketData,
            &[
                ("symbol", symbol.to_string()),
                ("resolution", self.resolution.clone()),
                ("from", from.timestamp().to_string()),
                ("to", to.timestamp().to_string()),
            ],
        )?;

        let candles: CandlesResponse = self.request(url).await?;
        if candles.is_no_data() {
            return Err(AppError::NoData(format!("No candles for {}", symbol)));
        }
        Ok(candles)
    }

    async fn search(&self, query: &str) -> Result<SearchResponse> {
        let url = self.url(Endpoint::Search, &[("q", query.to_string())])?;
        self.request(url).await
    }

    async fn fetch_metrics(&self, symbol: &Symbol) -> Result<MetricsResponse> {
        let url = self.url(
            Endpoint::Financials,
            &[("symbol", symbol.to_string()), ("metric", "all".to_string())],
        )?;
        self.request(url).await
    }

    async fn fetch_news(&self, news_type: &NewsType) -> Result<Vec<NewsStory>> {
        let url = match news_type {
            NewsType::TopStories => {
                self.url(Endpoint::TopStories, &[("category", "general".to_string())])?
            }
            NewsType::Company(symbol) => {
                let today = Utc::now();
                let from = today - Duration::days(COMPANY_NEWS_DAYS);
                self.url(
                    Endpoint::CompanyNews,
                    &[
                        ("symbol", symbol.to_string()),
                        ("from", from.format("%Y-%m-%d").to_string()),
                        ("to", today.format("%Y-%m-%d").to_string()),
                    ],
                )?
            }
        };
        self.request(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(base: &str) -> FinnhubProvider {
        FinnhubProvider::new(base, "secret", "1", 30).unwrap()
    }

    #[test]
    fn test_url_building() {
        let p = provider(DEFAULT_BASE_URL);
        let url = p
            .url(Endpoint::MarketData, &[("symbol", "AAPL".to_string())])
            .unwrap();

        assert_eq!(url.path(), "/api/v1/stock/candle");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("symbol".to_string(), "AAPL".to_string())));
        assert!(pairs.contains(&("token".to_string(), "secret".to_string())));
    }

    #[test]
    fn test_base_without_trailing_slash() {
        let p = provider("https://finnhub.io/api/v1");
        let url = p.url(Endpoint::Search, &[]).unwrap();
        assert_eq!(url.path(), "/api/v1/search");
    }

    #[test]
    fn test_query_is_encoded() {
        let p = provider(DEFAULT_BASE_URL);
        let url = p
            .url(Endpoint::Search, &[("q", "apple & co".to_string())])
            .unwrap();
        assert!(url.as_str().contains("q=apple+%26+co"));
    }

    #[test]
    fn test_invalid_base_url() {
        let result = FinnhubProvider::new("not a url", "secret", "1", 30);
        assert!(matches!(result, Err(AppError::InvalidQuery(_))));
    }
}
