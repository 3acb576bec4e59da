use crate::backend::{
    BackendRequest, DataError, ObjectStore, TableQuery, Transport, classify_response,
};
use crate::retry::RetryPolicy;
use app_state::BackendSettings;
use common_types::Session;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Handle to the remote service. Cheap to clone; all clones share one transport.
#[derive(Clone)]
pub struct BackendClient {
    transport: Arc<dyn Transport>,
    base_url: Url,
    anon_key: String,
    access_token: Option<String>,
    retry_policy: RetryPolicy,
}

impl BackendClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        settings: &BackendSettings,
        retry_policy: RetryPolicy,
    ) -> Result<Self, DataError> {
        let base_url = Url::parse(&settings.url)?;
        if base_url.cannot_be_a_base() {
            return Err(DataError::Configuration(format!(
                "Backend URL '{}' cannot be used as a base URL",
                settings.url
            )));
        }
        Ok(Self {
            transport,
            base_url,
            anon_key: settings.anon_key.clone(),
            access_token: None,
            retry_policy,
        })
    }

    /// A client that authenticates as the session's user instead of the anonymous role.
    #[must_use]
    pub fn with_session(&self, session: &Session) -> Self {
        Self {
            access_token: Some(session.access_token.clone()),
            ..self.clone()
        }
    }

    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }

    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Start a query against one of the REST resources.
    #[must_use]
    pub const fn table(&self, table: &'static str) -> TableQuery<'_> {
        TableQuery::new(self, table)
    }

    #[must_use]
    pub fn storage(&self, bucket: impl Into<String>) -> ObjectStore<'_> {
        ObjectStore::new(self, bucket.into())
    }

    /// Build `{base}/{segments...}`, escaping every segment.
    pub(crate) fn endpoint<'s>(
        &self,
        segments: impl IntoIterator<Item = &'s str>,
    ) -> Result<Url, DataError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| DataError::Configuration("Backend URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub(crate) fn auth_headers(&self) -> Vec<(String, String)> {
        let bearer = self.access_token.as_deref().unwrap_or(&self.anon_key);
        vec![
            ("apikey".to_string(), self.anon_key.clone()),
            ("Authorization".to_string(), format!("Bearer {bearer}")),
        ]
    }

    /// Send a request and turn error statuses into a [`DataError`].
    pub(crate) async fn execute(&self, request: BackendRequest) -> Result<Vec<u8>, DataError> {
        debug!(method = %request.method, path = request.url.path(), "Backend request");
        let response = self.transport.send(request).await?;
        if response.status.is_success() {
            Ok(response.body)
        } else {
            Err(classify_response(response.status, &response.body))
        }
    }
}
