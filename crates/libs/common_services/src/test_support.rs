use crate::backend::{BackendClient, BackendRequest, BackendResponse, DataError, Transport};
use crate::retry::RetryPolicy;
use app_state::BackendSettings;
use async_trait::async_trait;
use http::StatusCode;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Responder = dyn Fn(&BackendRequest) -> Result<BackendResponse, DataError> + Send + Sync;

/// Scripted in-memory transport that records every request it receives.
pub struct FakeTransport {
    responder: Box<Responder>,
    requests: Mutex<Vec<BackendRequest>>,
}

impl FakeTransport {
    pub fn new(
        responder: impl Fn(&BackendRequest) -> Result<BackendResponse, DataError>
        + Send
        + Sync
        + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<BackendRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }

    pub fn last_request(&self) -> BackendRequest {
        self.requests()
            .pop()
            .expect("at least one request was sent")
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: BackendRequest) -> Result<BackendResponse, DataError> {
        let response = (self.responder)(&request);
        self.requests.lock().expect("requests lock").push(request);
        response
    }
}

pub fn json_response(status: u16, body: Value) -> Result<BackendResponse, DataError> {
    let body = if body.is_null() {
        Vec::new()
    } else {
        serde_json::to_vec(&body).expect("serializable body")
    };
    Ok(BackendResponse {
        status: StatusCode::from_u16(status).expect("valid status"),
        body,
    })
}

pub fn test_settings() -> BackendSettings {
    BackendSettings {
        url: "https://backend.test".to_string(),
        anon_key: "anon-key".to_string(),
        request_timeout_secs: 5,
        is_placeholder: false,
    }
}

/// Client with the production retry count but no backoff delay.
pub fn test_client(transport: Arc<FakeTransport>) -> BackendClient {
    BackendClient::new(transport, &test_settings(), RetryPolicy::new(2, Duration::ZERO))
        .expect("valid test settings")
}
