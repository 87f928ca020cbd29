//! 네트워크 프로비저닝 -- 이름으로 지정한 관리 네트워크의 존재를 보장합니다.
//!
//! [`NetworkProvisioner::ensure_network`]는 잠금 없이 동시에 호출될 수 있습니다.
//! 두 호출이 같은 이름을 동시에 만들려고 하면 런타임이 한쪽을 409로 거부하고,
//! 거부된 쪽은 다시 조회하여 이긴 쪽이 만든 네트워크를 반환합니다.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use dragonify_core::metrics as m;
use dragonify_core::types::NetworkInfo;

use crate::docker::{DockerClient, NetworkFilter, NetworkSpec};
use crate::error::NetworkSyncError;
use crate::labels::managed_network_labels;

/// 존재가 확인된 네트워크의 식별자
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NetworkHandle {
    /// 네트워크 ID
    pub id: String,
    /// 네트워크 이름
    pub name: String,
}

impl From<NetworkInfo> for NetworkHandle {
    fn from(network: NetworkInfo) -> Self {
        Self {
            id: network.id,
            name: network.name,
        }
    }
}

impl fmt::Display for NetworkHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id.get(..12).unwrap_or(&self.id))
    }
}

/// 네트워크 프로비저너
pub struct NetworkProvisioner<D: DockerClient> {
    docker: Arc<D>,
    driver: String,
    internal: bool,
}

impl<D: DockerClient> NetworkProvisioner<D> {
    /// 새 프로비저너를 생성합니다.
    pub fn new(docker: Arc<D>, driver: impl Into<String>, internal: bool) -> Self {
        Self {
            docker,
            driver: driver.into(),
            internal,
        }
    }

    /// 이름이 정확히 일치하는 네트워크가 존재하도록 보장하고 그 핸들을 반환합니다.
    ///
    /// # Errors
    ///
    /// - `NetworkSyncError::AmbiguousNetwork`: 같은 이름의 네트워크가 둘 이상
    /// - `NetworkSyncError::NetworkNotFound`: 생성 충돌 후 재조회에도 보이지 않음
    /// - `NetworkSyncError::DockerApi`: 그 밖의 API 실패
    pub async fn ensure_network(&self, name: &str) -> Result<NetworkHandle, NetworkSyncError> {
        if let Some(existing) = self.lookup(name).await? {
            debug!(network = %existing, "network already exists");
            return Ok(existing);
        }

        let spec = NetworkSpec {
            name: name.to_owned(),
            driver: self.driver.clone(),
            internal: self.internal,
            labels: managed_network_labels(),
        };

        match self.docker.create_network(&spec).await {
            Ok(()) => {
                metrics::counter!(m::NETWORKS_CREATED_TOTAL).increment(1);
                info!(network = name, driver = %self.driver, "network created");
            }
            Err(NetworkSyncError::NetworkAlreadyExists(_)) => {
                debug!(network = name, "network created concurrently, re-resolving");
            }
            Err(e) => return Err(e),
        }

        self.lookup(name)
            .await?
            .ok_or_else(|| NetworkSyncError::NetworkNotFound(name.to_owned()))
    }

    /// 이름이 정확히 일치하는 네트워크를 찾습니다.
    async fn lookup(&self, name: &str) -> Result<Option<NetworkHandle>, NetworkSyncError> {
        let mut matches: Vec<NetworkInfo> = self
            .docker
            .list_networks(&NetworkFilter::Name(name.to_owned()))
            .await?
            .into_iter()
            .filter(|n| n.name == name)
            .collect();

        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop().map(NetworkHandle::from)),
            count => Err(NetworkSyncError::AmbiguousNetwork {
                name: name.to_owned(),
                count,
            }),
        }
    }
}
