use crate::backend::{BackendClient, DataError, HttpTransport, Transport, check_health};
use crate::retry::RetryPolicy;
use app_state::{AppConstants, AppSettings};
use common_types::Session;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{info, warn};

/// Owns the connection configuration and the one long-lived client handle.
/// Build it once at startup and pass it by reference.
pub struct BackendConnector {
    client: BackendClient,
    constants: AppConstants,
    is_placeholder: bool,
}

impl BackendConnector {
    pub fn new(settings: &AppSettings) -> Result<Self, DataError> {
        let transport = HttpTransport::new(settings.backend.request_timeout())?;
        Self::with_transport(Arc::new(transport), settings)
    }

    pub fn with_transport(
        transport: Arc<dyn Transport>,
        settings: &AppSettings,
    ) -> Result<Self, DataError> {
        let retry_policy = RetryPolicy::from(&settings.constants.retry);
        let client = BackendClient::new(transport, &settings.backend, retry_policy)?;
        info!(url = %client.base_url(), "Backend connector ready");
        Ok(Self {
            client,
            constants: settings.constants.clone(),
            is_placeholder: settings.backend.is_placeholder,
        })
    }

    /// Client using the anonymous key.
    #[must_use]
    pub const fn client(&self) -> &BackendClient {
        &self.client
    }

    #[must_use]
    pub fn client_for(&self, session: &Session) -> BackendClient {
        self.client.with_session(session)
    }

    #[must_use]
    pub const fn constants(&self) -> &AppConstants {
        &self.constants
    }

    #[must_use]
    pub fn probe_policy(&self) -> RetryPolicy {
        self.client
            .retry_policy()
            .with_max_retries(self.constants.health.probe_max_retries)
    }

    pub async fn check_health(&self) -> Result<(), DataError> {
        check_health(&self.client, self.probe_policy()).await
    }

    /// Run one best-effort connectivity probe in the background, shortly after startup.
    /// Never blocks the caller and never fails it; the handle resolves to whether the
    /// backend answered.
    pub fn spawn_health_probe(&self) -> JoinHandle<bool> {
        let client = self.client.clone();
        let policy = self.probe_policy();
        let delay = self.constants.health.probe_delay();
        let is_placeholder = self.is_placeholder;

        tokio::spawn(async move {
            if is_placeholder {
                info!("Placeholder backend settings, skipping connectivity probe.");
                return false;
            }
            sleep(delay).await;
            match check_health(&client, policy).await {
                Ok(()) => {
                    info!("Backend connectivity probe succeeded.");
                    true
                }
                Err(err) => {
                    warn!("Backend connectivity probe failed: {err}");
                    false
                }
            }
        })
    }
}
