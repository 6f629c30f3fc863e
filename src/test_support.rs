//! Test support utilities shared across unit and integration tests.

use std::collections::{BTreeSet, VecDeque};
use std::env;
use std::ffi::OsString;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::DateTime;
use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};

use crate::gateway::{
    ApiRequest, ApiResponse, GatewayError, GatewayFuture, Method, Operation, SnapshotGateway,
    Transport, TransportError,
};
use crate::model::{
    CreatedSnapshot, Instance, InstanceId, InstanceListing, ListMeta, Snapshot, SnapshotId,
    SnapshotListing, SnapshotStatus,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Transport that returns pre-seeded outcomes in FIFO order.
///
/// Used to drive deterministic HTTP exchanges without touching the network.
#[derive(Clone, Debug, Default)]
pub struct ScriptedTransport {
    responses: Arc<Mutex<VecDeque<Result<ApiResponse, TransportError>>>>,
    requests: Arc<Mutex<Vec<ApiRequest>>>,
}

impl ScriptedTransport {
    /// Creates a transport with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a completed exchange.
    pub fn push_response(&self, status: u16, body: impl Into<String>) {
        lock(&self.responses).push_back(Ok(ApiResponse {
            status,
            body: body.into(),
        }));
    }

    /// Queues a transport-level failure.
    pub fn push_transport_failure(&self, message: impl Into<String>) {
        lock(&self.responses).push_back(Err(TransportError::Failed {
            method: Method::Get,
            path: String::from("/scripted"),
            message: message.into(),
        }));
    }

    /// Returns a copy of every request sent so far.
    #[must_use]
    pub fn requests(&self) -> Vec<ApiRequest> {
        lock(&self.requests).clone()
    }
}

impl Transport for ScriptedTransport {
    fn send<'a>(&'a self, request: &'a ApiRequest) -> GatewayFuture<'a, ApiResponse, TransportError> {
        Box::pin(async move {
            lock(&self.requests).push(request.clone());
            lock(&self.responses)
                .pop_front()
                .unwrap_or_else(|| {
                    Err(TransportError::Failed {
                        method: request.method,
                        path: request.path.clone(),
                        message: String::from("no scripted response available"),
                    })
                })
        })
    }
}

/// Call recorded by [`FakeProvider`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ProviderCall {
    /// `list_instances`
    ListInstances,
    /// `list_snapshots`
    ListSnapshots,
    /// `create_snapshot`
    Create {
        /// Instance passed by the caller.
        instance_id: InstanceId,
        /// Description passed by the caller.
        description: String,
    },
    /// `delete_snapshot`
    Delete(SnapshotId),
}

#[derive(Debug, Default)]
struct ProviderState {
    instances: Vec<Instance>,
    snapshots: Vec<Snapshot>,
    reported_total: Option<usize>,
    failures: Vec<(Operation, GatewayError)>,
    calls: Vec<ProviderCall>,
    created: usize,
}

impl ProviderState {
    fn take_failure(&mut self, operation: Operation) -> Option<GatewayError> {
        let position = self
            .failures
            .iter()
            .position(|(failing, _)| *failing == operation)?;
        Some(self.failures.remove(position).1)
    }

    fn total(&self) -> usize {
        self.reported_total.unwrap_or(self.snapshots.len())
    }
}

/// In-memory provider implementing [`SnapshotGateway`].
///
/// Deletions and creations mutate the fake account so repeated listings
/// observe them. Failures can be injected per operation.
#[derive(Clone, Debug, Default)]
pub struct FakeProvider {
    state: Arc<Mutex<ProviderState>>,
}

impl FakeProvider {
    /// Creates an empty account.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an instance.
    #[must_use]
    pub fn with_instance(self, instance: Instance) -> Self {
        lock(&self.state).instances.push(instance);
        self
    }

    /// Adds snapshots in provider order.
    #[must_use]
    pub fn with_snapshots(self, snapshots: impl IntoIterator<Item = Snapshot>) -> Self {
        lock(&self.state).snapshots.extend(snapshots);
        self
    }

    /// Overrides the total reported by `list_snapshots`.
    #[must_use]
    pub fn with_reported_total(self, total: usize) -> Self {
        lock(&self.state).reported_total = Some(total);
        self
    }

    /// Makes the next call of `operation` fail with `error`.
    pub fn fail_next(&self, operation: Operation, error: GatewayError) {
        lock(&self.state).failures.push((operation, error));
    }

    /// Returns every call made so far.
    #[must_use]
    pub fn calls(&self) -> Vec<ProviderCall> {
        lock(&self.state).calls.clone()
    }

    /// Returns the identifiers passed to `delete_snapshot`, in order.
    #[must_use]
    pub fn deleted(&self) -> Vec<SnapshotId> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ProviderCall::Delete(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Returns how many times `create_snapshot` was called.
    #[must_use]
    pub fn create_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, ProviderCall::Create { .. }))
            .count()
    }

    /// Returns the identifiers currently held by the fake account.
    #[must_use]
    pub fn snapshot_ids(&self) -> Vec<SnapshotId> {
        lock(&self.state)
            .snapshots
            .iter()
            .map(|snapshot| snapshot.id.clone())
            .collect()
    }
}

impl SnapshotGateway for FakeProvider {
    fn list_instances(&self) -> GatewayFuture<'_, InstanceListing, GatewayError> {
        Box::pin(async move {
            let mut state = lock(&self.state);
            state.calls.push(ProviderCall::ListInstances);
            if let Some(err) = state.take_failure(Operation::ListInstances) {
                return Err(err);
            }
            Ok(InstanceListing {
                meta: ListMeta {
                    total: state.instances.len(),
                },
                instances: state.instances.clone(),
            })
        })
    }

    fn list_snapshots(&self) -> GatewayFuture<'_, SnapshotListing, GatewayError> {
        Box::pin(async move {
            let mut state = lock(&self.state);
            state.calls.push(ProviderCall::ListSnapshots);
            if let Some(err) = state.take_failure(Operation::ListSnapshots) {
                return Err(err);
            }
            Ok(SnapshotListing {
                meta: ListMeta {
                    total: state.total(),
                },
                snapshots: state.snapshots.clone(),
            })
        })
    }

    fn create_snapshot<'a>(
        &'a self,
        instance_id: &'a InstanceId,
        description: &'a str,
    ) -> GatewayFuture<'a, CreatedSnapshot, GatewayError> {
        Box::pin(async move {
            let mut state = lock(&self.state);
            state.calls.push(ProviderCall::Create {
                instance_id: instance_id.clone(),
                description: description.to_owned(),
            });
            if let Some(err) = state.take_failure(Operation::CreateSnapshot) {
                return Err(err);
            }
            state.created += 1;
            let id = SnapshotId::new(format!("created-{}", state.created));
            state.snapshots.push(Snapshot {
                id: id.clone(),
                size: 0,
                date_created: chrono::Utc::now().fixed_offset(),
                status: SnapshotStatus::Pending,
                description: description.to_owned(),
                protected: false,
            });
            if let Some(total) = state.reported_total.as_mut() {
                *total += 1;
            }
            Ok(CreatedSnapshot {
                id,
                status: SnapshotStatus::Pending,
                description: description.to_owned(),
            })
        })
    }

    fn delete_snapshot<'a>(
        &'a self,
        snapshot_id: &'a SnapshotId,
    ) -> GatewayFuture<'a, (), GatewayError> {
        Box::pin(async move {
            let mut state = lock(&self.state);
            state.calls.push(ProviderCall::Delete(snapshot_id.clone()));
            if let Some(err) = state.take_failure(Operation::DeleteSnapshot) {
                return Err(err);
            }
            let Some(position) = state
                .snapshots
                .iter()
                .position(|snapshot| snapshot.id == *snapshot_id)
            else {
                return Err(GatewayError::rejected(
                    Operation::DeleteSnapshot,
                    404,
                    r#"{"error":"snapshot not found","status":404}"#,
                ));
            };
            state.snapshots.remove(position);
            if let Some(total) = state.reported_total.as_mut() {
                *total = total.saturating_sub(1);
            }
            Ok(())
        })
    }
}

/// Builds an instance record.
#[must_use]
pub fn instance(id: &str, label: &str) -> Instance {
    Instance {
        id: InstanceId::new(id),
        label: label.to_owned(),
        ram: 1024,
        main_ip: String::from("192.0.2.10"),
    }
}

/// Builds a complete snapshot created at `date_created` (RFC 3339).
///
/// # Panics
///
/// Panics when `date_created` is not valid RFC 3339; fixtures are expected
/// to be well formed.
#[must_use]
pub fn snapshot(id: &str, date_created: &str, description: &str) -> Snapshot {
    Snapshot {
        id: SnapshotId::new(id),
        size: 25_000_000_000,
        date_created: DateTime::parse_from_rfc3339(date_created)
            .unwrap_or_else(|err| panic!("fixture timestamp {date_created}: {err}")),
        status: SnapshotStatus::Complete,
        description: description.to_owned(),
        protected: false,
    }
}

/// Builds `count` snapshots `snap-01..` created one day apart, oldest first.
#[must_use]
pub fn daily_snapshots(count: usize) -> Vec<Snapshot> {
    (1..=count)
        .map(|day| {
            snapshot(
                &format!("snap-{day:02}"),
                &format!("2024-01-{day:02}T03:00:00+00:00"),
                "nightly",
            )
        })
        .collect()
}

/// Produces a JSON payload matching `GET /instances`.
#[must_use]
pub fn json_instances(instances: &[(&str, &str)]) -> String {
    let items = instances
        .iter()
        .map(|(id, label)| {
            format!(
                "{{\"id\":\"{id}\",\"label\":\"{label}\",\"ram\":1024,\"main_ip\":\"192.0.2.10\",\"os\":\"Debian 12\"}}"
            )
        })
        .collect::<Vec<_>>()
        .join(",");
    format!(
        "{{\"instances\":[{items}],\"meta\":{{\"total\":{}}}}}",
        instances.len()
    )
}

/// Produces a JSON payload matching `GET /snapshots` from
/// `(id, date_created, description)` triples.
#[must_use]
pub fn json_snapshots(snapshots: &[(&str, &str, &str)]) -> String {
    let items = snapshots
        .iter()
        .map(|(id, date_created, description)| {
            format!(
                "{{\"id\":\"{id}\",\"size\":1000,\"date_created\":\"{date_created}\",\"status\":\"complete\",\"description\":\"{description}\"}}"
            )
        })
        .collect::<Vec<_>>()
        .join(",");
    format!(
        "{{\"snapshots\":[{items}],\"meta\":{{\"total\":{}}}}}",
        snapshots.len()
    )
}

/// Produces a JSON payload matching a `201` from `POST /snapshots`.
#[must_use]
pub fn json_created_snapshot(id: &str, description: &str) -> String {
    format!(
        "{{\"snapshot\":{{\"id\":\"{id}\",\"date_created\":\"2024-02-01T00:00:00+00:00\",\"description\":\"{description}\",\"size\":0,\"status\":\"pending\"}}}}"
    )
}

/// Global mutex used to serialise environment mutation in tests.
pub static ENV_LOCK: AsyncMutex<()> = AsyncMutex::const_new(());

/// Guard that holds the env mutex and restores variables on drop.
pub struct EnvGuard {
    previous: Vec<(String, Option<OsString>)>,
    _guard: AsyncMutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Sets multiple environment variables while holding a global mutex.
    pub async fn set_vars(pairs: &[(&str, &str)]) -> Self {
        debug_assert!(
            {
                let mut seen = BTreeSet::new();
                pairs.iter().all(|(key, _)| seen.insert(*key))
            },
            "duplicate environment variable keys passed to EnvGuard::set_vars"
        );

        let guard = ENV_LOCK.lock().await;
        let mut previous = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            let old = env::var_os(key);
            // SAFETY: Environment mutation is serialised by `ENV_LOCK`, preventing races.
            unsafe { env::set_var(key, value) };
            previous.push(((*key).to_owned(), old));
        }

        Self {
            previous,
            _guard: guard,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, old) in &self.previous {
            // SAFETY: Environment mutation is serialised by holding `_guard`.
            unsafe {
                match old {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }
    }
}
