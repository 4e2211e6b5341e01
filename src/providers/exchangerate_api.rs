use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, instrument};

use crate::core::currency::{BASE_CURRENCY, LOCAL_CURRENCY, RateProvider};

/// Latest-rates endpoint of exchangerate-api.com (v6).
pub struct ExchangeRateApiProvider {
    base_url: String,
    api_key: String,
}

impl ExchangeRateApiProvider {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        ExchangeRateApiProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("/v6/{}/latest/{BASE_CURRENCY}", self.api_key)
    }
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    result: Option<String>,
    #[serde(rename = "error-type")]
    error_type: Option<String>,
    conversion_rates: Option<HashMap<String, f64>>,
}

#[async_trait]
impl RateProvider for ExchangeRateApiProvider {
    #[instrument(name = "ExchangeRateFetch", skip(self))]
    async fn fetch_rate(&self) -> Result<f64> {
        let url = format!("{}{}", self.base_url, self.endpoint());
        debug!("Requesting exchange rate from {}", self.base_url);

        let client = reqwest::Client::builder()
            .user_agent("rialsync/1.0")
            .build()?;
        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for base currency: {}", e, BASE_CURRENCY))?;

        let status = response.status();
        let text = response.text().await?;

        let data: LatestRatesResponse = match serde_json::from_str(&text) {
            Ok(data) => data,
            Err(e) if status.is_success() => {
                return Err(anyhow!("Failed to parse JSON response: {}", e));
            }
            Err(_) => return Err(anyhow!("HTTP error: {}", status)),
        };

        if data.result.as_deref() == Some("error") {
            return Err(anyhow!(
                "Provider error: {}",
                data.error_type.as_deref().unwrap_or("unknown")
            ));
        }
        if !status.is_success() {
            return Err(anyhow!("HTTP error: {}", status));
        }

        let rate = data
            .conversion_rates
            .as_ref()
            .and_then(|rates| rates.get(LOCAL_CURRENCY))
            .copied()
            .ok_or_else(|| anyhow!("No {} rate found in response", LOCAL_CURRENCY))?;

        if !rate.is_finite() || rate <= 0.0 {
            return Err(anyhow!("Invalid {} rate in response: {}", LOCAL_CURRENCY, rate));
        }

        debug!(rate, "Received exchange rate");
        Ok(rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ENDPOINT: &str = "/v6/test-key/latest/USD";

    async fn create_mock_server(status: u16, body: &str) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .expect(1)
            .mount(&mock_server)
            .await;

        mock_server
    }

    #[tokio::test]
    async fn test_successful_rate_fetch() {
        let mock_response = r#"{
            "result": "success",
            "base_code": "USD",
            "conversion_rates": {
                "USD": 1,
                "EUR": 0.9013,
                "IRR": 42075.5
            }
        }"#;

        let mock_server = create_mock_server(200, mock_response).await;
        let provider = ExchangeRateApiProvider::new(&mock_server.uri(), "test-key");

        let rate = provider.fetch_rate().await.expect("Failed to get rate");
        assert_eq!(rate, 42075.5);
    }

    #[tokio::test]
    async fn test_trailing_slash_in_base_url() {
        let mock_response = r#"{"conversion_rates": {"IRR": 50000}}"#;
        let mock_server = create_mock_server(200, mock_response).await;
        let provider =
            ExchangeRateApiProvider::new(&format!("{}/", mock_server.uri()), "test-key");

        assert_eq!(provider.fetch_rate().await.unwrap(), 50000.0);
    }

    #[tokio::test]
    async fn test_missing_target_currency() {
        let mock_response = r#"{
            "result": "success",
            "conversion_rates": {"USD": 1, "EUR": 0.9}
        }"#;
        let mock_server = create_mock_server(200, mock_response).await;
        let provider = ExchangeRateApiProvider::new(&mock_server.uri(), "test-key");

        let result = provider.fetch_rate().await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "No IRR rate found in response"
        );
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let mock_server = create_mock_server(200, "<html>maintenance</html>").await;
        let provider = ExchangeRateApiProvider::new(&mock_server.uri(), "test-key");

        let result = provider.fetch_rate().await;
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse JSON response")
        );
    }

    #[tokio::test]
    async fn test_provider_reports_error() {
        let mock_response = r#"{"result": "error", "error-type": "invalid-key"}"#;
        let mock_server = create_mock_server(403, mock_response).await;
        let provider = ExchangeRateApiProvider::new(&mock_server.uri(), "test-key");

        let result = provider.fetch_rate().await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "Provider error: invalid-key"
        );
    }

    #[tokio::test]
    async fn test_server_error_is_not_retried() {
        let mock_server = create_mock_server(500, "").await;
        let provider = ExchangeRateApiProvider::new(&mock_server.uri(), "test-key");

        let result = provider.fetch_rate().await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "HTTP error: 500 Internal Server Error"
        );
        // `expect(1)` is verified when the server drops.
    }

    #[tokio::test]
    async fn test_non_positive_rate_is_rejected() {
        let mock_response = r#"{"conversion_rates": {"IRR": 0}}"#;
        let mock_server = create_mock_server(200, mock_response).await;
        let provider = ExchangeRateApiProvider::new(&mock_server.uri(), "test-key");

        assert!(provider.fetch_rate().await.is_err());
    }

    #[tokio::test]
    async fn test_unreachable_host() {
        let provider = ExchangeRateApiProvider::new("http://127.0.0.1:9", "test-key");
        let result = provider.fetch_rate().await;
        assert!(result.unwrap_err().to_string().starts_with("Request error"));
    }
}
