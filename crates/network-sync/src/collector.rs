//! 가비지 컬렉션 -- 비어 있는 관리 네트워크를 삭제합니다.
//!
//! 마커 레이블이 붙은 네트워크만 대상입니다. 스윕은 네트워크마다
//! inspect 후 멤버가 없으면 삭제를 요청합니다. inspect와 삭제 사이에
//! 컨테이너가 연결되면 런타임이 삭제를 거부하고, 그 거부는 기록만 됩니다.

use std::sync::Arc;

use tracing::{debug, info, warn};

use dragonify_core::metrics as m;

use crate::docker::{DockerClient, NetworkFilter};
use crate::error::NetworkSyncError;
use crate::labels::{MANAGED_MARKER_LABEL, is_managed_network};

/// 스윕 결과
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectReport {
    /// 삭제한 네트워크 이름
    pub removed: Vec<String>,
    /// 멤버가 남아 있어 유지한 네트워크 이름
    pub retained: Vec<String>,
    /// 삭제에 실패한 네트워크와 에러 메시지
    pub failed: Vec<(String, String)>,
}

/// 관리 네트워크 가비지 컬렉터
pub struct GarbageCollector<D: DockerClient> {
    docker: Arc<D>,
}

impl<D: DockerClient> GarbageCollector<D> {
    /// 새 컬렉터를 생성합니다.
    pub fn new(docker: Arc<D>) -> Self {
        Self { docker }
    }

    /// 관리 네트워크를 스윕하여 빈 네트워크를 삭제합니다.
    ///
    /// 개별 네트워크의 실패는 보고서에 기록되고 스윕은 계속됩니다.
    ///
    /// # Errors
    ///
    /// 관리 네트워크 목록 조회 자체가 실패한 경우에만 에러를 반환합니다.
    pub async fn collect(&self) -> Result<CollectReport, NetworkSyncError> {
        let networks = self
            .docker
            .list_networks(&NetworkFilter::Label(MANAGED_MARKER_LABEL.to_owned()))
            .await?;

        let mut report = CollectReport::default();
        let mut managed = 0_usize;

        for listed in networks.into_iter().filter(is_managed_network) {
            managed += 1;

            let network = match self.docker.inspect_network(&listed.id).await {
                Ok(network) => network,
                Err(NetworkSyncError::NetworkNotFound(_)) => {
                    debug!(network = %listed.name, "network already gone, skipping");
                    continue;
                }
                Err(e) => {
                    warn!(network = %listed.name, error = %e, "failed to inspect network");
                    report.failed.push((listed.name, e.to_string()));
                    continue;
                }
            };

            if !network.is_empty() {
                debug!(
                    network = %network.name,
                    members = network.containers.len(),
                    "network still in use, retaining"
                );
                report.retained.push(network.name);
                continue;
            }

            match self.docker.remove_network(&network.id).await {
                Ok(()) => {
                    metrics::counter!(m::NETWORKS_REMOVED_TOTAL).increment(1);
                    info!(network = %network.name, "removed empty network");
                    report.removed.push(network.name);
                }
                Err(NetworkSyncError::NetworkNotFound(_)) => {
                    debug!(network = %network.name, "network removed concurrently");
                }
                Err(e) => {
                    warn!(network = %network.name, error = %e, "network removal rejected");
                    report.failed.push((network.name, e.to_string()));
                }
            }
        }

        metrics::counter!(m::GC_SWEEPS_TOTAL).increment(1);
        metrics::gauge!(m::MANAGED_NETWORKS).set(managed as f64);

        Ok(report)
    }
}
