use crate::backend::DataError;
use async_trait::async_trait;
use http::header::CONTENT_TYPE;
use http::{Method, StatusCode};
use reqwest::Client;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Bytes { content_type: String, data: Vec<u8> },
}

/// A fully built request against the backend. Auth headers are already attached.
#[derive(Debug, Clone)]
pub struct BackendRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl BackendRequest {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// First value of a query parameter, decoded.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }
}

#[derive(Debug, Clone)]
pub struct BackendResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

/// Sends requests to the backend. Implementations classify their own failures into
/// [`DataError`]; a returned response may still carry an error status.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: BackendRequest) -> Result<BackendResponse, DataError>;
}

/// [`Transport`] over a single long-lived `reqwest` client.
#[derive(Clone)]
pub struct HttpTransport {
    http_client: Client,
}

impl HttpTransport {
    pub fn new(request_timeout: Duration) -> Result<Self, DataError> {
        let http_client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| DataError::Configuration(format!("Cannot build HTTP client: {e}")))?;
        Ok(Self { http_client })
    }

    #[must_use]
    pub const fn from_client(http_client: Client) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: BackendRequest) -> Result<BackendResponse, DataError> {
        let mut builder = self.http_client.request(request.method, request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Bytes { content_type, data } => {
                builder.header(CONTENT_TYPE, content_type).body(data)
            }
        };

        let response = builder
            .send()
            .await
            .map_err(|e| DataError::from_transport(&e))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| DataError::from_transport(&e))?
            .to_vec();

        Ok(BackendResponse { status, body })
    }
}
