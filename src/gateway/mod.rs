//! Remote resource gateway for the Vultr instance and snapshot API.
//!
//! The gateway issues one authenticated call per operation, retrying only
//! transport-level failures. A completed HTTP exchange carrying an
//! unexpected status is terminal and surfaces as
//! [`GatewayError::Rejected`], so callers can always tell "the provider said
//! no" apart from "the provider could not be reached".

mod error;
mod transport;
mod vultr;

use std::future::Future;
use std::pin::Pin;

use crate::model::{CreatedSnapshot, InstanceId, InstanceListing, SnapshotId, SnapshotListing};

pub use error::{GatewayError, Operation, RejectionKind};
pub use transport::{
    ApiRequest, ApiResponse, DEFAULT_API_BASE_URL, Method, REQUEST_TIMEOUT, ReqwestTransport,
    Transport, TransportError,
};
pub use vultr::{RetryPolicy, VultrGateway};

/// Future returned by gateway and transport operations.
pub type GatewayFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Operations the backup workflow needs from the provider.
pub trait SnapshotGateway {
    /// Lists every instance in the account.
    fn list_instances(&self) -> GatewayFuture<'_, InstanceListing, GatewayError>;

    /// Lists every snapshot in the account together with the reported total.
    fn list_snapshots(&self) -> GatewayFuture<'_, SnapshotListing, GatewayError>;

    /// Requests a new snapshot of `instance_id`.
    fn create_snapshot<'a>(
        &'a self,
        instance_id: &'a InstanceId,
        description: &'a str,
    ) -> GatewayFuture<'a, CreatedSnapshot, GatewayError>;

    /// Deletes the snapshot identified by `snapshot_id`.
    fn delete_snapshot<'a>(
        &'a self,
        snapshot_id: &'a SnapshotId,
    ) -> GatewayFuture<'a, (), GatewayError>;
}
