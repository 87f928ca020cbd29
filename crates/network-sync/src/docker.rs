//! Docker API abstraction for testability.
//!
//! The [`DockerClient`] trait covers exactly the runtime operations the sync
//! engine needs. Production code uses [`BollardDockerClient`]; unit tests use
//! the in-memory `MockDockerClient`, which keeps real network/container state so
//! that concurrent operations interleave the way they do against the daemon.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐ ┌────────────┐ ┌──────────────┐ ┌──────────────┐
//! │ Provisioner │ │ Reconciler │ │  Collector   │ │ EventWatcher │
//! └──────┬──────┘ └─────┬──────┘ └──────┬───────┘ └──────┬───────┘
//!        └──────────────┴───────┬───────┴────────────────┘
//!                               ▼
//!                       ┌──────────────┐
//!                       │ DockerClient │ (trait)
//!                       └──────────────┘
//!                          │        │
//!                          ▼        ▼
//!                     ┌───────┐  ┌──────┐
//!                     │Bollard│  │ Mock │
//!                     └───┬───┘  └──────┘
//!                         ▼
//!                   Docker Daemon
//! ```
//!
//! # Object ID Validation
//!
//! Methods that take a container or network ID validate it before calling the
//! daemon:
//! - Must be 1-64 characters
//! - Container IDs: only ASCII hex digits ([0-9a-fA-F])
//! - Network IDs: ASCII alphanumerics ([0-9a-zA-Z]), since swarm-scoped
//!   networks carry base36 IDs
//!
//! # Examples
//!
//! ```ignore
//! use std::sync::Arc;
//! use dragonify_network_sync::{BollardDockerClient, DockerClient, NetworkFilter};
//!
//! let client = Arc::new(BollardDockerClient::connect_local(120)?);
//! client.ping().await?;
//! let networks = client
//!     .list_networks(&NetworkFilter::Name("apps-internal".to_owned()))
//!     .await?;
//! # Ok::<(), dragonify_network_sync::NetworkSyncError>(())
//! ```

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;

use dragonify_core::types::{ContainerInfo, NetworkInfo};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::NetworkSyncError;
use crate::event::{RuntimeEvent, RuntimeEventKind};

/// 네트워크 목록 조회 필터
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkFilter {
    /// 이름 필터 (런타임은 부분 문자열 일치로 처리합니다)
    Name(String),
    /// 레이블 키 필터
    Label(String),
}

/// 컨테이너 목록 조회 필터 (실행 중인 컨테이너만 대상)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerFilter {
    /// 레이블 키 필터
    Label(String),
    /// 컨테이너 ID 필터
    Id(String),
}

/// 네트워크 생성 요청
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkSpec {
    /// 네트워크 이름
    pub name: String,
    /// 드라이버 (`bridge`)
    pub driver: String,
    /// 외부 라우팅 차단 여부
    pub internal: bool,
    /// 네트워크 레이블
    pub labels: HashMap<String, String>,
}

/// Validates a container ID before it is placed in an API path.
fn validate_object_id(id: &str) -> Result<(), NetworkSyncError> {
    check_id_length(id)?;
    if !id.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(NetworkSyncError::DockerApi(
            "invalid object ID: contains non-hex characters".to_owned(),
        ));
    }
    Ok(())
}

/// Validates a network ID before it is placed in an API path.
///
/// Local networks use 64-char hex IDs, swarm-scoped ones 25-char base36 IDs.
fn validate_network_id(id: &str) -> Result<(), NetworkSyncError> {
    check_id_length(id)?;
    if !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(NetworkSyncError::DockerApi(
            "invalid network ID: contains non-alphanumeric characters".to_owned(),
        ));
    }
    Ok(())
}

fn check_id_length(id: &str) -> Result<(), NetworkSyncError> {
    if id.is_empty() || id.len() > 64 {
        return Err(NetworkSyncError::DockerApi(format!(
            "invalid object ID: length {} (must be 1-64)",
            id.len()
        )));
    }
    Ok(())
}

/// Trait abstracting Docker API operations.
///
/// The trait is `Send + Sync + 'static` so a single client can be shared behind
/// an `Arc` by every concurrently running handler.
///
/// # Error Handling
///
/// - **404 errors**: `ContainerNotFound` / `NetworkNotFound`
/// - **409 on create**: `NetworkAlreadyExists`
/// - **Refused connect / remove**: `ConnectRejected` / `RemoveRejected`
/// - **Transport failures**: `DockerConnection`
pub trait DockerClient: Send + Sync + 'static {
    /// Lists networks matching the filter.
    ///
    /// Name filters are substring matches on the daemon side; callers that need
    /// an exact name must filter the result themselves. Listed networks do not
    /// carry their members; use [`inspect_network`](Self::inspect_network).
    fn list_networks(
        &self,
        filter: &NetworkFilter,
    ) -> impl Future<Output = Result<Vec<NetworkInfo>, NetworkSyncError>> + Send;

    /// Inspects a network, including its connected containers.
    ///
    /// # Errors
    ///
    /// - `NetworkSyncError::NetworkNotFound`: network no longer exists (404)
    fn inspect_network(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<NetworkInfo, NetworkSyncError>> + Send;

    /// Creates a network.
    ///
    /// # Errors
    ///
    /// - `NetworkSyncError::NetworkAlreadyExists`: a network with this name exists (409)
    fn create_network(
        &self,
        spec: &NetworkSpec,
    ) -> impl Future<Output = Result<(), NetworkSyncError>> + Send;

    /// Removes a network.
    ///
    /// # Errors
    ///
    /// - `NetworkSyncError::NetworkNotFound`: already removed (404)
    /// - `NetworkSyncError::RemoveRejected`: the daemon refused, e.g. active endpoints
    fn remove_network(&self, id: &str)
    -> impl Future<Output = Result<(), NetworkSyncError>> + Send;

    /// Connects a container to a network with the given DNS aliases.
    ///
    /// # Errors
    ///
    /// - `NetworkSyncError::ConnectRejected`: the daemon refused the endpoint
    fn connect_network(
        &self,
        network_id: &str,
        container_id: &str,
        aliases: &[String],
    ) -> impl Future<Output = Result<(), NetworkSyncError>> + Send;

    /// Lists running containers matching the filter.
    fn list_containers(
        &self,
        filter: &ContainerFilter,
    ) -> impl Future<Output = Result<Vec<ContainerInfo>, NetworkSyncError>> + Send;

    /// Checks Docker daemon connectivity.
    ///
    /// # Errors
    ///
    /// Returns `NetworkSyncError::DockerConnection` if the daemon is unreachable.
    fn ping(&self) -> impl Future<Output = Result<(), NetworkSyncError>> + Send;

    /// Streams container `start`/`stop` events into `tx` until the stream ends.
    ///
    /// Returns `Ok(())` when the receiver is dropped. Loss of the runtime stream
    /// is reported as `NetworkSyncError::DockerConnection`.
    fn watch_events(
        &self,
        tx: mpsc::Sender<RuntimeEvent>,
    ) -> impl Future<Output = Result<(), NetworkSyncError>> + Send;
}

/// Production Docker client implementation using `bollard`.
///
/// Internally uses `Arc<bollard::Docker>` for safe sharing across async tasks.
pub struct BollardDockerClient {
    docker: Arc<bollard::Docker>,
}

impl BollardDockerClient {
    /// Connects to Docker using the platform's default local socket.
    ///
    /// # Errors
    ///
    /// Returns `NetworkSyncError::DockerConnection` if the client cannot be built.
    pub fn connect_local(timeout_secs: u64) -> Result<Self, NetworkSyncError> {
        let docker = bollard::Docker::connect_with_local_defaults()
            .map_err(|e| {
                NetworkSyncError::DockerConnection(format!("failed to connect to docker: {e}"))
            })?
            .with_timeout(std::time::Duration::from_secs(timeout_secs));
        Ok(Self {
            docker: Arc::new(docker),
        })
    }

    /// Connects to Docker using a specific socket path.
    ///
    /// # Errors
    ///
    /// Returns `NetworkSyncError::DockerConnection` if the client cannot be built.
    pub fn connect_with_socket(
        socket_path: &str,
        timeout_secs: u64,
    ) -> Result<Self, NetworkSyncError> {
        let docker = bollard::Docker::connect_with_socket(
            socket_path,
            timeout_secs,
            bollard::API_DEFAULT_VERSION,
        )
        .map_err(|e| {
            NetworkSyncError::DockerConnection(format!(
                "failed to connect to docker at {socket_path}: {e}"
            ))
        })?;
        Ok(Self {
            docker: Arc::new(docker),
        })
    }
}

/// HTTP status code of a daemon error response, if the error is one.
fn status_code(err: &bollard::errors::Error) -> Option<u16> {
    match err {
        bollard::errors::Error::DockerResponseServerError { status_code, .. } => {
            Some(*status_code)
        }
        _ => None,
    }
}

fn network_from_model(network: bollard::models::Network) -> NetworkInfo {
    let mut containers: Vec<String> = network
        .containers
        .map(|members| members.into_keys().collect())
        .unwrap_or_default();
    containers.sort();

    NetworkInfo {
        id: network.id.unwrap_or_default(),
        name: network.name.unwrap_or_default(),
        labels: network.labels.unwrap_or_default(),
        containers,
    }
}

fn container_from_summary(summary: bollard::models::ContainerSummary) -> ContainerInfo {
    let names = summary
        .names
        .unwrap_or_default()
        .into_iter()
        .map(|n| n.trim_start_matches('/').to_owned())
        .collect();
    let networks: BTreeSet<String> = summary
        .network_settings
        .and_then(|s| s.networks)
        .map(|n| n.into_keys().collect())
        .unwrap_or_default();
    let network_mode = summary
        .host_config
        .and_then(|h| h.network_mode)
        .unwrap_or_default();

    ContainerInfo {
        id: summary.id.unwrap_or_default(),
        names,
        labels: summary.labels.unwrap_or_default(),
        networks,
        network_mode,
    }
}

/// Converts a raw runtime event into a [`RuntimeEvent`].
///
/// Returns `None` for actions other than `start`/`stop` and for events without
/// an actor ID.
fn event_from_message(message: bollard::models::EventMessage) -> Option<RuntimeEvent> {
    let kind = RuntimeEventKind::from_action(message.action.as_deref()?)?;
    let actor = message.actor?;
    let container_id = actor.id.filter(|id| !id.is_empty())?;
    Some(RuntimeEvent::new(
        kind,
        container_id,
        actor.attributes.unwrap_or_default(),
    ))
}

impl DockerClient for BollardDockerClient {
    async fn list_networks(
        &self,
        filter: &NetworkFilter,
    ) -> Result<Vec<NetworkInfo>, NetworkSyncError> {
        use bollard::network::ListNetworksOptions;

        let (key, value) = match filter {
            NetworkFilter::Name(name) => ("name", name.clone()),
            NetworkFilter::Label(label) => ("label", label.clone()),
        };
        let options = ListNetworksOptions {
            filters: HashMap::from([(key.to_owned(), vec![value])]),
        };

        let networks = self
            .docker
            .list_networks(Some(options))
            .await
            .map_err(|e| NetworkSyncError::DockerApi(format!("list networks failed: {e}")))?;

        Ok(networks.into_iter().map(network_from_model).collect())
    }

    async fn inspect_network(&self, id: &str) -> Result<NetworkInfo, NetworkSyncError> {
        validate_network_id(id)?;

        use bollard::network::InspectNetworkOptions;

        let network = self
            .docker
            .inspect_network(id, None::<InspectNetworkOptions<String>>)
            .await
            .map_err(|e| match status_code(&e) {
                Some(404) => NetworkSyncError::NetworkNotFound(id.to_owned()),
                _ => NetworkSyncError::DockerApi(format!("inspect network failed: {e}")),
            })?;

        Ok(network_from_model(network))
    }

    async fn create_network(&self, spec: &NetworkSpec) -> Result<(), NetworkSyncError> {
        use bollard::network::CreateNetworkOptions;

        let options = CreateNetworkOptions {
            name: spec.name.clone(),
            check_duplicate: true,
            driver: spec.driver.clone(),
            internal: spec.internal,
            labels: spec.labels.clone(),
            ..Default::default()
        };

        self.docker
            .create_network(options)
            .await
            .map_err(|e| match status_code(&e) {
                Some(409) => NetworkSyncError::NetworkAlreadyExists(spec.name.clone()),
                _ => NetworkSyncError::DockerApi(format!(
                    "create network '{}' failed: {e}",
                    spec.name
                )),
            })?;
        Ok(())
    }

    async fn remove_network(&self, id: &str) -> Result<(), NetworkSyncError> {
        validate_network_id(id)?;

        self.docker
            .remove_network(id)
            .await
            .map_err(|e| match status_code(&e) {
                Some(404) => NetworkSyncError::NetworkNotFound(id.to_owned()),
                _ => NetworkSyncError::RemoveRejected {
                    network: id.to_owned(),
                    reason: e.to_string(),
                },
            })
    }

    async fn connect_network(
        &self,
        network_id: &str,
        container_id: &str,
        aliases: &[String],
    ) -> Result<(), NetworkSyncError> {
        validate_network_id(network_id)?;
        validate_object_id(container_id)?;

        use bollard::models::EndpointSettings;
        use bollard::network::ConnectNetworkOptions;

        let options = ConnectNetworkOptions {
            container: container_id.to_owned(),
            endpoint_config: EndpointSettings {
                aliases: Some(aliases.to_vec()),
                ..Default::default()
            },
        };

        self.docker
            .connect_network(network_id, options)
            .await
            .map_err(|e| NetworkSyncError::ConnectRejected {
                container_id: container_id.to_owned(),
                network: network_id.to_owned(),
                reason: e.to_string(),
            })
    }

    async fn list_containers(
        &self,
        filter: &ContainerFilter,
    ) -> Result<Vec<ContainerInfo>, NetworkSyncError> {
        use bollard::container::ListContainersOptions;

        let (key, value) = match filter {
            ContainerFilter::Label(label) => ("label", label.clone()),
            ContainerFilter::Id(id) => {
                validate_object_id(id)?;
                ("id", id.clone())
            }
        };
        let options = ListContainersOptions::<String> {
            all: false,
            filters: HashMap::from([(key.to_owned(), vec![value])]),
            ..Default::default()
        };

        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| NetworkSyncError::DockerApi(format!("list containers failed: {e}")))?;

        Ok(containers.into_iter().map(container_from_summary).collect())
    }

    async fn ping(&self) -> Result<(), NetworkSyncError> {
        self.docker
            .ping()
            .await
            .map_err(|e| NetworkSyncError::DockerConnection(format!("ping failed: {e}")))?;
        Ok(())
    }

    async fn watch_events(&self, tx: mpsc::Sender<RuntimeEvent>) -> Result<(), NetworkSyncError> {
        use bollard::system::EventsOptions;
        use futures_util::StreamExt;

        let options = EventsOptions::<String> {
            filters: HashMap::from([
                ("type".to_owned(), vec!["container".to_owned()]),
                (
                    "event".to_owned(),
                    vec!["start".to_owned(), "stop".to_owned()],
                ),
            ]),
            ..Default::default()
        };

        let mut stream = Box::pin(self.docker.events(Some(options)));
        while let Some(item) = stream.next().await {
            let message = item.map_err(|e| {
                NetworkSyncError::DockerConnection(format!("event stream failed: {e}"))
            })?;

            let Some(event) = event_from_message(message) else {
                debug!("ignoring runtime event without start/stop action or actor");
                continue;
            };

            if tx.send(event).await.is_err() {
                debug!("event receiver dropped, stopping watch");
                return Ok(());
            }
        }

        warn!("docker event stream ended");
        Err(NetworkSyncError::DockerConnection(
            "event stream ended".to_owned(),
        ))
    }
}

/// 테스트용 Mock Docker 클라이언트
///
/// 네트워크와 컨테이너 상태를 메모리에 유지합니다. 모든 호출은 먼저
/// `yield_now`로 양보하므로 동시에 실행된 핸들러가 실제로 교차 실행됩니다.
#[cfg(test)]
#[derive(Default)]
pub struct MockDockerClient {
    state: std::sync::Mutex<MockState>,
}

#[cfg(test)]
#[derive(Default)]
struct MockState {
    networks: Vec<NetworkInfo>,
    containers: Vec<ContainerInfo>,
    next_network_id: u64,
    network_creates: usize,
    /// (network name, container id, aliases)
    connects: Vec<(String, String, Vec<String>)>,
    /// removed network names
    removals: Vec<String>,
    rejected_connects: std::collections::HashSet<String>,
    fail_removals: bool,
    fail_ping: bool,
    events: Vec<RuntimeEvent>,
}

#[cfg(test)]
impl MockState {
    fn network_by_id(&self, id: &str) -> Option<&NetworkInfo> {
        self.networks.iter().find(|n| n.id == id)
    }

    fn members_of(&self, network_name: &str) -> Vec<String> {
        self.containers
            .iter()
            .filter(|c| c.is_member_of(network_name))
            .map(|c| c.id.clone())
            .collect()
    }

    fn allocate_network_id(&mut self) -> String {
        self.next_network_id += 1;
        format!("{:064x}", 0xeeee_0000_u64 + self.next_network_id)
    }
}

#[cfg(test)]
impl MockDockerClient {
    /// 빈 상태의 mock 클라이언트를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    /// 레이블 없는 (관리 대상 아닌) 네트워크를 추가합니다.
    pub fn with_network(self, name: &str) -> Self {
        self.with_labeled_network(name, HashMap::new())
    }

    /// 마커 레이블이 붙은 관리 네트워크를 추가합니다.
    pub fn with_managed_network(self, name: &str) -> Self {
        self.with_labeled_network(name, crate::labels::managed_network_labels())
    }

    /// 지정한 레이블의 네트워크를 추가합니다. 같은 이름도 허용합니다.
    pub fn with_labeled_network(self, name: &str, labels: HashMap<String, String>) -> Self {
        self.with_state(|s| {
            let id = s.allocate_network_id();
            s.networks.push(NetworkInfo {
                id,
                name: name.to_owned(),
                labels,
                containers: Vec::new(),
            });
        });
        self
    }

    /// 실행 중인 컨테이너를 추가합니다.
    pub fn with_container(self, container: ContainerInfo) -> Self {
        self.add_container(container);
        self
    }

    /// 지정한 네트워크로의 connect를 거부하도록 설정합니다.
    pub fn with_rejected_connect(self, network_name: &str) -> Self {
        self.with_state(|s| {
            s.rejected_connects.insert(network_name.to_owned());
        });
        self
    }

    /// 모든 네트워크 삭제를 거부하도록 설정합니다.
    pub fn with_failing_removals(self) -> Self {
        self.with_state(|s| s.fail_removals = true);
        self
    }

    /// ping이 실패하도록 설정합니다.
    pub fn with_failing_ping(self) -> Self {
        self.with_state(|s| s.fail_ping = true);
        self
    }

    /// watch_events가 전달할 이벤트를 설정합니다.
    pub fn with_events(self, events: Vec<RuntimeEvent>) -> Self {
        self.with_state(|s| s.events = events);
        self
    }

    /// 컨테이너를 시작합니다 (목록에 추가).
    pub fn add_container(&self, container: ContainerInfo) {
        self.with_state(|s| s.containers.push(container));
    }

    /// 컨테이너를 정지합니다. 정지된 컨테이너의 endpoint는 해제됩니다.
    pub fn stop_container(&self, id: &str) {
        self.with_state(|s| s.containers.retain(|c| c.id != id));
    }

    /// create_network 성공 횟수
    pub fn network_creates(&self) -> usize {
        self.with_state(|s| s.network_creates)
    }

    /// 성공한 connect 기록
    pub fn connects(&self) -> Vec<(String, String, Vec<String>)> {
        self.with_state(|s| s.connects.clone())
    }

    /// 삭제된 네트워크 이름
    pub fn removals(&self) -> Vec<String> {
        self.with_state(|s| s.removals.clone())
    }

    /// 현재 존재하는 네트워크 이름 (중복 포함)
    pub fn network_names(&self) -> Vec<String> {
        self.with_state(|s| s.networks.iter().map(|n| n.name.clone()).collect())
    }

    /// 이름으로 네트워크를 찾습니다 (첫 번째 일치).
    pub fn network(&self, name: &str) -> Option<NetworkInfo> {
        self.with_state(|s| s.networks.iter().find(|n| n.name == name).cloned())
    }

    /// 현재 컨테이너 상태
    pub fn container(&self, id: &str) -> Option<ContainerInfo> {
        self.with_state(|s| s.containers.iter().find(|c| c.id == id).cloned())
    }
}

#[cfg(test)]
impl DockerClient for MockDockerClient {
    async fn list_networks(
        &self,
        filter: &NetworkFilter,
    ) -> Result<Vec<NetworkInfo>, NetworkSyncError> {
        tokio::task::yield_now().await;
        Ok(self.with_state(|s| {
            s.networks
                .iter()
                .filter(|n| match filter {
                    NetworkFilter::Name(name) => n.name.contains(name.as_str()),
                    NetworkFilter::Label(label) => n.has_label(label),
                })
                .cloned()
                .collect()
        }))
    }

    async fn inspect_network(&self, id: &str) -> Result<NetworkInfo, NetworkSyncError> {
        tokio::task::yield_now().await;
        self.with_state(|s| {
            let mut network = s
                .network_by_id(id)
                .cloned()
                .ok_or_else(|| NetworkSyncError::NetworkNotFound(id.to_owned()))?;
            network.containers = s.members_of(&network.name);
            Ok(network)
        })
    }

    async fn create_network(&self, spec: &NetworkSpec) -> Result<(), NetworkSyncError> {
        tokio::task::yield_now().await;
        self.with_state(|s| {
            if s.networks.iter().any(|n| n.name == spec.name) {
                return Err(NetworkSyncError::NetworkAlreadyExists(spec.name.clone()));
            }
            let id = s.allocate_network_id();
            s.networks.push(NetworkInfo {
                id,
                name: spec.name.clone(),
                labels: spec.labels.clone(),
                containers: Vec::new(),
            });
            s.network_creates += 1;
            Ok(())
        })
    }

    async fn remove_network(&self, id: &str) -> Result<(), NetworkSyncError> {
        tokio::task::yield_now().await;
        self.with_state(|s| {
            let name = s
                .network_by_id(id)
                .map(|n| n.name.clone())
                .ok_or_else(|| NetworkSyncError::NetworkNotFound(id.to_owned()))?;
            if s.fail_removals {
                return Err(NetworkSyncError::RemoveRejected {
                    network: name,
                    reason: "mock failure".to_owned(),
                });
            }
            if !s.members_of(&name).is_empty() {
                return Err(NetworkSyncError::RemoveRejected {
                    network: name,
                    reason: "network has active endpoints".to_owned(),
                });
            }
            s.networks.retain(|n| n.id != id);
            s.removals.push(name);
            Ok(())
        })
    }

    async fn connect_network(
        &self,
        network_id: &str,
        container_id: &str,
        aliases: &[String],
    ) -> Result<(), NetworkSyncError> {
        tokio::task::yield_now().await;
        self.with_state(|s| {
            let name = s
                .network_by_id(network_id)
                .map(|n| n.name.clone())
                .ok_or_else(|| NetworkSyncError::NetworkNotFound(network_id.to_owned()))?;
            if s.rejected_connects.contains(&name) {
                return Err(NetworkSyncError::ConnectRejected {
                    container_id: container_id.to_owned(),
                    network: name,
                    reason: "mock failure".to_owned(),
                });
            }
            let container = s
                .containers
                .iter_mut()
                .find(|c| c.id == container_id)
                .ok_or_else(|| NetworkSyncError::ContainerNotFound(container_id.to_owned()))?;
            if !container.networks.insert(name.clone()) {
                return Err(NetworkSyncError::ConnectRejected {
                    container_id: container_id.to_owned(),
                    network: name,
                    reason: "endpoint already exists in network".to_owned(),
                });
            }
            s.connects
                .push((name, container_id.to_owned(), aliases.to_vec()));
            Ok(())
        })
    }

    async fn list_containers(
        &self,
        filter: &ContainerFilter,
    ) -> Result<Vec<ContainerInfo>, NetworkSyncError> {
        tokio::task::yield_now().await;
        Ok(self.with_state(|s| {
            s.containers
                .iter()
                .filter(|c| match filter {
                    ContainerFilter::Label(label) => c.labels.contains_key(label),
                    ContainerFilter::Id(id) => c.id == *id,
                })
                .cloned()
                .collect()
        }))
    }

    async fn ping(&self) -> Result<(), NetworkSyncError> {
        if self.with_state(|s| s.fail_ping) {
            return Err(NetworkSyncError::DockerConnection(
                "mock ping failure".to_owned(),
            ));
        }
        Ok(())
    }

    async fn watch_events(&self, tx: mpsc::Sender<RuntimeEvent>) -> Result<(), NetworkSyncError> {
        let events = self.with_state(|s| std::mem::take(&mut s.events));
        for event in events {
            if tx.send(event).await.is_err() {
                return Ok(());
            }
        }
        Err(NetworkSyncError::DockerConnection(
            "event stream ended".to_owned(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use bollard::models::{
        ContainerSummary, ContainerSummaryHostConfig, ContainerSummaryNetworkSettings,
        EndpointSettings, EventActor, EventMessage, Network, NetworkContainer,
    };

    fn container(id: &str) -> ContainerInfo {
        ContainerInfo {
            id: id.to_owned(),
            names: vec![format!("c-{id}")],
            network_mode: "bridge".to_owned(),
            ..Default::default()
        }
    }

    #[test]
    fn validate_object_id_accepts_hex() {
        assert!(validate_object_id("abc123DEF456").is_ok());
        assert!(validate_object_id(&"a".repeat(64)).is_ok());
    }

    #[test]
    fn validate_object_id_rejects_invalid() {
        assert!(validate_object_id("").is_err());
        assert!(validate_object_id(&"a".repeat(65)).is_err());
        assert!(validate_object_id("../networks").is_err());
        assert!(validate_object_id("apps-internal").is_err());
    }

    #[test]
    fn validate_network_id_accepts_swarm_ids() {
        // swarm overlay network, base36
        assert!(validate_network_id("4x4yvp4sruhqc5p7fo8q0qq9t").is_ok());
        assert!(validate_network_id(&"f".repeat(64)).is_ok());
        // container IDs stay hex-only
        assert!(validate_object_id("4x4yvp4sruhqc5p7fo8q0qq9t").is_err());
    }

    #[test]
    fn validate_network_id_rejects_path_characters() {
        assert!(validate_network_id("").is_err());
        assert!(validate_network_id(&"a".repeat(65)).is_err());
        assert!(validate_network_id("../containers").is_err());
        assert!(validate_network_id("apps-internal").is_err());
        assert!(validate_network_id("net%2F").is_err());
    }

    #[test]
    fn status_code_of_server_error() {
        let err = bollard::errors::Error::DockerResponseServerError {
            status_code: 409,
            message: "network with name apps-internal already exists".to_owned(),
        };
        assert_eq!(status_code(&err), Some(409));
    }

    #[test]
    fn network_model_conversion() {
        let model = Network {
            id: Some("n1".to_owned()),
            name: Some("apps-internal".to_owned()),
            labels: Some(HashMap::from([(
                "tj.horner.dragonify.networks".to_owned(),
                "true".to_owned(),
            )])),
            containers: Some(HashMap::from([
                ("c2".to_owned(), NetworkContainer::default()),
                ("c1".to_owned(), NetworkContainer::default()),
            ])),
            ..Default::default()
        };
        let info = network_from_model(model);
        assert_eq!(info.id, "n1");
        assert_eq!(info.name, "apps-internal");
        assert!(info.has_label("tj.horner.dragonify.networks"));
        assert_eq!(info.containers, vec!["c1", "c2"]);
    }

    #[test]
    fn network_model_without_members_is_empty() {
        let info = network_from_model(Network::default());
        assert!(info.is_empty());
        assert!(info.labels.is_empty());
    }

    #[test]
    fn container_summary_conversion() {
        let summary = ContainerSummary {
            id: Some("abc".to_owned()),
            names: Some(vec!["/ix-app-web-1".to_owned()]),
            labels: Some(HashMap::from([(
                "com.docker.compose.project".to_owned(),
                "ix-app".to_owned(),
            )])),
            host_config: Some(ContainerSummaryHostConfig {
                network_mode: Some("ix-app_default".to_owned()),
                ..Default::default()
            }),
            network_settings: Some(ContainerSummaryNetworkSettings {
                networks: Some(HashMap::from([(
                    "ix-app_default".to_owned(),
                    EndpointSettings::default(),
                )])),
                ..Default::default()
            }),
            ..Default::default()
        };
        let info = container_from_summary(summary);
        assert_eq!(info.id, "abc");
        assert_eq!(info.names, vec!["ix-app-web-1"]);
        assert_eq!(info.network_mode, "ix-app_default");
        assert!(info.is_member_of("ix-app_default"));
        assert_eq!(info.label("com.docker.compose.project"), Some("ix-app"));
    }

    #[test]
    fn event_message_conversion() {
        let message = EventMessage {
            action: Some("start".to_owned()),
            actor: Some(EventActor {
                id: Some("abc123".to_owned()),
                attributes: Some(HashMap::from([(
                    "com.docker.compose.project".to_owned(),
                    "ix-app".to_owned(),
                )])),
            }),
            ..Default::default()
        };
        let event = event_from_message(message).unwrap();
        assert_eq!(event.kind, RuntimeEventKind::Start);
        assert_eq!(event.container_id, "abc123");
        assert_eq!(event.project(), Some("ix-app"));
    }

    #[test]
    fn event_message_with_other_action_is_ignored() {
        let message = EventMessage {
            action: Some("die".to_owned()),
            actor: Some(EventActor {
                id: Some("abc123".to_owned()),
                attributes: None,
            }),
            ..Default::default()
        };
        assert!(event_from_message(message).is_none());
    }

    #[test]
    fn event_message_without_actor_is_ignored() {
        let message = EventMessage {
            action: Some("stop".to_owned()),
            ..Default::default()
        };
        assert!(event_from_message(message).is_none());
    }

    #[tokio::test]
    async fn mock_name_filter_is_substring() {
        let client = MockDockerClient::new()
            .with_network("net-a")
            .with_network("net-ab");
        let found = client
            .list_networks(&NetworkFilter::Name("net-a".to_owned()))
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn mock_create_duplicate_is_conflict() {
        let client = MockDockerClient::new().with_network("apps-internal");
        let spec = NetworkSpec {
            name: "apps-internal".to_owned(),
            driver: "bridge".to_owned(),
            internal: true,
            labels: HashMap::new(),
        };
        let result = client.create_network(&spec).await;
        assert!(matches!(
            result,
            Err(NetworkSyncError::NetworkAlreadyExists(_))
        ));
        assert_eq!(client.network_creates(), 0);
    }

    #[tokio::test]
    async fn mock_connect_then_inspect_shows_member() {
        let client = MockDockerClient::new()
            .with_managed_network("net-a")
            .with_container(container("c1"));
        let net = client.network("net-a").unwrap();

        client
            .connect_network(&net.id, "c1", &["web.ix-app.svc.cluster.local".to_owned()])
            .await
            .unwrap();

        let inspected = client.inspect_network(&net.id).await.unwrap();
        assert_eq!(inspected.containers, vec!["c1"]);
        assert!(client.container("c1").unwrap().is_member_of("net-a"));
    }

    #[tokio::test]
    async fn mock_second_connect_is_rejected() {
        let client = MockDockerClient::new()
            .with_managed_network("net-a")
            .with_container(container("c1"));
        let net = client.network("net-a").unwrap();

        client.connect_network(&net.id, "c1", &[]).await.unwrap();
        let second = client.connect_network(&net.id, "c1", &[]).await;
        assert!(matches!(
            second,
            Err(NetworkSyncError::ConnectRejected { .. })
        ));
        assert_eq!(client.connects().len(), 1);
    }

    #[tokio::test]
    async fn mock_remove_rejects_network_with_members() {
        let client = MockDockerClient::new()
            .with_managed_network("net-a")
            .with_container(container("c1"));
        let net = client.network("net-a").unwrap();
        client.connect_network(&net.id, "c1", &[]).await.unwrap();

        let result = client.remove_network(&net.id).await;
        assert!(matches!(
            result,
            Err(NetworkSyncError::RemoveRejected { .. })
        ));

        client.stop_container("c1");
        client.remove_network(&net.id).await.unwrap();
        assert_eq!(client.removals(), vec!["net-a"]);

        let again = client.remove_network(&net.id).await;
        assert!(matches!(again, Err(NetworkSyncError::NetworkNotFound(_))));
    }

    #[tokio::test]
    async fn mock_watch_events_ends_with_connection_error() {
        let client = MockDockerClient::new().with_events(vec![RuntimeEvent::new(
            RuntimeEventKind::Stop,
            "c1",
            HashMap::new(),
        )]);
        let (tx, mut rx) = mpsc::channel(4);
        let result = client.watch_events(tx).await;
        assert!(matches!(
            result,
            Err(NetworkSyncError::DockerConnection(_))
        ));
        assert_eq!(rx.recv().await.unwrap().container_id, "c1");
    }

    #[tokio::test]
    async fn mock_ping_failure() {
        let client = MockDockerClient::new().with_failing_ping();
        assert!(client.ping().await.is_err());
        assert!(MockDockerClient::new().ping().await.is_ok());
    }

    #[test]
    fn docker_client_impls_are_send_sync() {
        fn assert_send_sync<T: Send + Sync + 'static>() {}
        assert_send_sync::<MockDockerClient>();
        assert_send_sync::<BollardDockerClient>();
    }
}
