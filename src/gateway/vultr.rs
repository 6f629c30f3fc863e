//! [`SnapshotGateway`] implementation for the Vultr v2 API.

use std::time::Duration;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::{
    ApiRequest, GatewayError, GatewayFuture, Operation, SnapshotGateway, Transport,
};
use crate::model::{CreatedSnapshot, InstanceId, InstanceListing, SnapshotId, SnapshotListing};

/// Everything outside the RFC 3986 unreserved set is encoded, so an opaque
/// id always stays a single path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

const DEFAULT_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(3);

/// Bounded retry applied to transport failures.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub attempts: u32,
    /// Fixed delay between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

#[derive(Deserialize)]
struct CreateSnapshotResponse {
    snapshot: CreatedSnapshot,
}

/// Gateway speaking the Vultr v2 JSON API over a [`Transport`].
#[derive(Clone, Debug)]
pub struct VultrGateway<T> {
    transport: T,
    retry: RetryPolicy,
}

impl<T: Transport + Sync> VultrGateway<T> {
    /// Creates a gateway with the default retry policy (3 attempts, 3s apart).
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            retry: RetryPolicy::default(),
        }
    }

    /// Overrides the retry policy.
    ///
    /// This is primarily used by tests to keep retry scenarios fast.
    #[must_use]
    pub const fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Returns the underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    async fn send_with_retry(
        &self,
        operation: Operation,
        request: &ApiRequest,
    ) -> Result<String, GatewayError> {
        let attempts = self.retry.attempts.max(1);
        let mut attempt = 1;
        let response = loop {
            debug!(%operation, method = %request.method, path = %request.path, attempt, "sending request");
            match self.transport.send(request).await {
                Ok(response) => break response,
                Err(err) if attempt < attempts => {
                    warn!(
                        %operation,
                        attempt,
                        error = %err,
                        "transport failure, retrying in {:?}",
                        self.retry.delay
                    );
                    sleep(self.retry.delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    return Err(GatewayError::Transport {
                        operation,
                        attempts: attempt,
                        message: err.to_string(),
                    });
                }
            }
        };

        if response.status != operation.expected_status() {
            return Err(GatewayError::rejected(
                operation,
                response.status,
                response.body,
            ));
        }
        Ok(response.body)
    }

    fn decode<D: DeserializeOwned>(operation: Operation, body: &str) -> Result<D, GatewayError> {
        serde_json::from_str(body).map_err(|err| GatewayError::Decode {
            operation,
            message: err.to_string(),
        })
    }

    async fn fetch<D: DeserializeOwned>(
        &self,
        operation: Operation,
        request: ApiRequest,
    ) -> Result<D, GatewayError> {
        let body = self.send_with_retry(operation, &request).await?;
        Self::decode(operation, &body)
    }
}

impl<T: Transport + Send + Sync> SnapshotGateway for VultrGateway<T> {
    fn list_instances(&self) -> GatewayFuture<'_, InstanceListing, GatewayError> {
        Box::pin(self.fetch(Operation::ListInstances, ApiRequest::get("/instances")))
    }

    fn list_snapshots(&self) -> GatewayFuture<'_, SnapshotListing, GatewayError> {
        Box::pin(self.fetch(Operation::ListSnapshots, ApiRequest::get("/snapshots")))
    }

    fn create_snapshot<'a>(
        &'a self,
        instance_id: &'a InstanceId,
        description: &'a str,
    ) -> GatewayFuture<'a, CreatedSnapshot, GatewayError> {
        Box::pin(async move {
            let request = ApiRequest::post(
                "/snapshots",
                json!({ "instance_id": instance_id, "description": description }),
            );
            let response: CreateSnapshotResponse =
                self.fetch(Operation::CreateSnapshot, request).await?;
            Ok(response.snapshot)
        })
    }

    fn delete_snapshot<'a>(
        &'a self,
        snapshot_id: &'a SnapshotId,
    ) -> GatewayFuture<'a, (), GatewayError> {
        Box::pin(async move {
            let request = ApiRequest::delete(snapshot_path(snapshot_id));
            self.send_with_retry(Operation::DeleteSnapshot, &request)
                .await
                .map(|_| ())
        })
    }
}

fn snapshot_path(snapshot_id: &SnapshotId) -> String {
    format!(
        "/snapshots/{}",
        utf8_percent_encode(snapshot_id.as_str(), PATH_SEGMENT)
    )
}
