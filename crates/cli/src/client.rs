//! API client for the prediction service

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

/// API client for the prediction service
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            anyhow::bail!("API error ({}): {}", status, message);
        }

        response.json().await.context("Failed to parse response")
    }

    /// Query `/status`; a 404 means the service has no model yet
    pub async fn readiness(&self) -> Result<Readiness> {
        let url = self.base_url.join("status").context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        match response.status() {
            StatusCode::OK => Ok(Readiness::Ready),
            StatusCode::NOT_FOUND => Ok(Readiness::NotReady),
            status => {
                let body = response.text().await.unwrap_or_default();
                anyhow::bail!("API error ({}): {}", status, body)
            }
        }
    }

    pub async fn info(&self) -> Result<ServiceInfo> {
        self.get("").await
    }

    /// Ask the service for an LED level
    pub async fn predict(&self, request: &PredictRequest) -> Result<PredictResponse> {
        self.post("predict", request).await
    }
}

/// Model readiness reported by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    NotReady,
}

// API request and response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub service: String,
    pub status: String,
    pub model_loaded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    pub ldr: f64,
    pub motion: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub led: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_readiness() {
        let mut server = mockito::Server::new_async().await;
        let client = ApiClient::new(&server.url()).unwrap();

        let not_ready = server
            .mock("GET", "/status")
            .with_status(404)
            .with_body("not_ready")
            .create_async()
            .await;
        assert_eq!(client.readiness().await.unwrap(), Readiness::NotReady);
        not_ready.remove_async().await;

        server
            .mock("GET", "/status")
            .with_status(200)
            .with_body("ready")
            .create_async()
            .await;
        assert_eq!(client.readiness().await.unwrap(), Readiness::Ready);
    }

    #[tokio::test]
    async fn test_readiness_server_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/status")
            .with_status(503)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        assert!(client.readiness().await.is_err());
    }

    #[tokio::test]
    async fn test_predict() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/predict")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "ldr": 812.0,
                "motion": 1.0
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"led": 180}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let response = client
            .predict(&PredictRequest {
                ldr: 812.0,
                motion: 1.0,
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.led, 180);
    }

    #[tokio::test]
    async fn test_predict_surfaces_service_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/predict")
            .with_status(404)
            .with_body(r#"{"error": "Model not available"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client
            .predict(&PredictRequest {
                ldr: 1.0,
                motion: 0.0,
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Model not available"));
    }
}
