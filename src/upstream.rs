//! HTTP client for talking to workshop availability and booking APIs.
//! A single attempt per call, bounded by the configured timeout.
use std::time::Duration;

use thiserror::Error;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("workshop responded with HTTP {0}")]
    Status(u16),

    #[error("request to workshop failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Clone)]
pub struct WorkshopClient {
    client: reqwest::Client,
    localhost_alias: Option<String>,
}

impl WorkshopClient {
    pub fn new(timeout: Duration, localhost_alias: Option<String>) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .pool_max_idle_per_host(8)
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .user_agent(concat!("tirebook/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            localhost_alias,
        })
    }

    pub fn from_config(config: &Config) -> reqwest::Result<Self> {
        Self::new(config.workshop_timeout(), config.localhost_alias.clone())
    }

    /// Rewrite `//localhost` to `//<alias>` when an alias is configured, so
    /// workshop APIs registered as localhost stay reachable from a container.
    pub fn resolve_url(&self, url: &str) -> String {
        match &self.localhost_alias {
            Some(alias) => url.replace("//localhost", &format!("//{alias}")),
            None => url.to_string(),
        }
    }

    /// GET an availability document. Non-2xx statuses are errors.
    pub async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let resp = self.client.get(self.resolve_url(url)).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(resp.text().await?)
    }

    /// Send a booking request and hand back the raw response; status
    /// interpretation is left to the caller.
    pub async fn send(
        &self,
        method: reqwest::Method,
        url: &str,
        body: String,
    ) -> reqwest::Result<reqwest::Response> {
        self.client
            .request(method, self.resolve_url(url))
            .body(body)
            .send()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_localhost_rewrite_only_when_aliased() {
        let plain = WorkshopClient::new(Duration::from_secs(1), None).unwrap();
        assert_eq!(
            plain.resolve_url("http://localhost:9003/api"),
            "http://localhost:9003/api"
        );

        let aliased =
            WorkshopClient::new(Duration::from_secs(1), Some("host.docker.internal".into())).unwrap();
        assert_eq!(
            aliased.resolve_url("http://localhost:9003/api"),
            "http://host.docker.internal:9003/api"
        );
    }

    #[tokio::test]
    async fn test_fetch_text_rejects_non_success_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/slots"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = WorkshopClient::new(Duration::from_secs(2), None).unwrap();
        let err = client
            .fetch_text(&format!("{}/slots", mock_server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status(503)));
    }

    #[tokio::test]
    async fn test_fetch_text_times_out() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(800)))
            .mount(&mock_server)
            .await;

        let client = WorkshopClient::new(Duration::from_millis(100), None).unwrap();
        let err = client
            .fetch_text(&format!("{}/slow", mock_server.uri()))
            .await
            .unwrap_err();
        match err {
            FetchError::Transport(e) => assert!(e.is_timeout()),
            other => panic!("expected timeout, got {other:?}"),
        }
    }
}
