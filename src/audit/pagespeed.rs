//! Google PageSpeed Insights v5 客户端
//!
//! 审计本身很慢（几十秒），超时按配置给足；HTTP 层错误取上游返回的 `error.message`，
//! 网络错误与超时单独归类。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::audit::{AuditClient, AuditReport};
use crate::config::AuditSection;
use crate::core::AuditError;

pub struct PageSpeedClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    strategy: String,
    categories: Vec<String>,
}

impl PageSpeedClient {
    pub fn new(cfg: &AuditSection) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: cfg.endpoint.clone(),
            api_key: cfg.api_key.clone().filter(|k| !k.is_empty()),
            strategy: cfg.strategy.clone(),
            categories: cfg.categories.clone(),
        }
    }

    fn query(&self, url: &str) -> Vec<(&'static str, String)> {
        let mut query = vec![("url", url.to_string())];
        if let Some(key) = &self.api_key {
            query.push(("key", key.clone()));
        }
        for category in &self.categories {
            query.push(("category", category.clone()));
        }
        query.push(("strategy", self.strategy.clone()));
        query
    }
}

#[async_trait]
impl AuditClient for PageSpeedClient {
    async fn audit(&self, url: &str) -> Result<AuditReport, AuditError> {
        tracing::info!(url, "starting PageSpeed audit");

        let response = self
            .client
            .get(&self.endpoint)
            .query(&self.query(url))
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(url, error = %e, "PageSpeed request failed");
                if e.is_timeout() {
                    AuditError::Timeout
                } else {
                    AuditError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| {
                    v.pointer("/error/message")
                        .and_then(Value::as_str)
                        .map(String::from)
                })
                .unwrap_or_else(|| "Verifique a URL".to_string());
            tracing::warn!(url, status = status.as_u16(), %message, "PageSpeed returned error");
            return Err(AuditError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let json: Value = response.json().await.map_err(|e| {
            if e.is_timeout() {
                AuditError::Timeout
            } else {
                AuditError::Parse(e.to_string())
            }
        })?;

        let report = AuditReport::from_lighthouse(&json)?;
        tracing::info!(url, score = report.score, checks = report.checks.len(), "PageSpeed audit finished");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, api_key: Option<&str>) -> PageSpeedClient {
        let cfg = AuditSection {
            endpoint: format!("{}/runPagespeed", server.uri()),
            api_key: api_key.map(String::from),
            timeout_secs: 5,
            ..AuditSection::default()
        };
        PageSpeedClient::new(&cfg)
    }

    #[tokio::test]
    async fn test_successful_audit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/runPagespeed"))
            .and(query_param("url", "https://example.com"))
            .and(query_param("key", "k-123"))
            .and(query_param("strategy", "MOBILE"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "lighthouseResult": {
                    "categories": {"seo": {"score": 0.83}},
                    "audits": {
                        "image-alt": {"title": "Image elements have [alt]", "description": "d", "score": 0.0, "scoreDisplayMode": "binary"}
                    }
                }
            })))
            .mount(&server)
            .await;

        let report = client_for(&server, Some("k-123"))
            .audit("https://example.com")
            .await
            .unwrap();
        assert!((report.score - 83.0).abs() < 1e-9);
        assert_eq!(report.checks.len(), 1);
    }

    #[tokio::test]
    async fn test_http_error_carries_upstream_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"code": 400, "message": "Lighthouse returned error: ERRORED_DOCUMENT_REQUEST"}
            })))
            .mount(&server)
            .await;

        let err = client_for(&server, None).audit("https://bad.example").await.unwrap_err();
        assert_eq!(
            err,
            AuditError::Http {
                status: 400,
                message: "Lighthouse returned error: ERRORED_DOCUMENT_REQUEST".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_http_error_without_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
            .mount(&server)
            .await;

        let err = client_for(&server, None).audit("https://example.com").await.unwrap_err();
        assert!(matches!(err, AuditError::Http { status: 500, ref message } if message == "Verifique a URL"));
    }

    #[tokio::test]
    async fn test_network_error() {
        let cfg = AuditSection {
            endpoint: "http://127.0.0.1:1/runPagespeed".to_string(),
            timeout_secs: 2,
            ..AuditSection::default()
        };
        let err = PageSpeedClient::new(&cfg).audit("https://example.com").await.unwrap_err();
        assert!(matches!(err, AuditError::Network(_) | AuditError::Timeout));
    }
}
