use crate::backend::{BackendClient, BackendErrorKind, DataError};
use crate::retry::{RetryPolicy, with_retry};
use serde_json::Value;
use tracing::{info, instrument};

/// Lightweight existence probe against `profiles`.
///
/// An undefined-relation error still proves the backend answered, so it counts as healthy.
#[instrument(skip(client))]
pub async fn check_health(client: &BackendClient, policy: RetryPolicy) -> Result<(), DataError> {
    let result = with_retry("health check", policy, || {
        client
            .table("profiles")
            .select("id")
            .limit(1)
            .fetch::<Value>()
    })
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(err) if err.backend_kind() == Some(BackendErrorKind::UndefinedRelation) => {
            info!("Backend reachable, 'profiles' relation is missing: {err}");
            Ok(())
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeTransport, json_response, test_client};
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn missing_relation_counts_as_healthy() {
        let transport = FakeTransport::new(|_| {
            json_response(
                404,
                json!({"code": "42P01", "message": "relation \"public.profiles\" does not exist"}),
            )
        });
        let client = test_client(transport.clone());

        check_health(&client, RetryPolicy::new(2, Duration::ZERO))
            .await
            .expect("healthy");
        assert_eq!(transport.request_count(), 1);
        assert_eq!(transport.last_request().url.path(), "/rest/v1/profiles");
    }

    #[tokio::test]
    async fn unreachable_backend_is_retried_then_reported() {
        let transport = FakeTransport::new(|_| {
            Err(DataError::TransientNetwork("error sending request: connection refused".into()))
        });
        let client = test_client(transport.clone());

        let err = check_health(&client, RetryPolicy::new(2, Duration::ZERO))
            .await
            .expect_err("unhealthy");
        assert!(matches!(err, DataError::RetriesExhausted { attempts: 3, .. }));
        assert_eq!(transport.request_count(), 3);
    }
}
