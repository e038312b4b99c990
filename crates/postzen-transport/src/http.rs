//! HTTP transport implementation using `reqwest`.

use crate::{ApiRequest, ApiResponse, HttpTransport, Method, TransportError};

/// Content type applied to requests that carry a body but did not set one.
const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// An [`HttpTransport`] that resolves request paths against a base URL
/// such as `http://localhost:8080/api`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    /// Creates a transport with a default `reqwest::Client`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Creates a transport around an already configured client (timeouts,
    /// proxies, TLS roots).
    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Joins the base URL and a request path. Absolute URLs pass through.
    fn url(&self, path: &str) -> Result<String, TransportError> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Ok(path.to_string());
        }
        if self.base_url.is_empty() {
            return Err(TransportError::InvalidUrl(format!(
                "relative path {path} with no base url"
            )));
        }
        Ok(format!(
            "{}/{}",
            self.base_url,
            path.trim_start_matches('/')
        ))
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

impl HttpTransport for ReqwestTransport {
    async fn send(
        &self,
        request: &ApiRequest,
    ) -> Result<ApiResponse, TransportError> {
        let url = self.url(&request.path)?;

        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), &url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            if request.header("content-type").is_none() {
                builder = builder.header(
                    reqwest::header::CONTENT_TYPE,
                    DEFAULT_CONTENT_TYPE,
                );
            }
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(TransportError::request)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Body(Box::new(e)))?
            .to_vec();

        tracing::debug!(
            method = %request.method,
            %url,
            status,
            "response received"
        );

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}
