//! 멤버십 동기화 -- 컨테이너를 목표 네트워크에 연결합니다.
//!
//! [`MembershipReconciler`]는 컨테이너 하나에 대해 목표 네트워크 목록을 계산하고,
//! 아직 참여하지 않은 네트워크마다 다음을 수행합니다:
//!
//! 1. `ensure_network`로 네트워크 존재 보장
//! 2. 컨테이너를 다시 조회하여 그 사이 다른 핸들러가 연결했는지 확인
//! 3. DNS 별칭 하나로 connect
//!
//! 네트워크 하나의 실패는 기록만 하고 다음 네트워크로 진행합니다.
//! 이미 연결된 네트워크는 되돌리지 않습니다.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use dragonify_core::metrics as m;
use dragonify_core::types::ContainerInfo;

use crate::docker::{ContainerFilter, DockerClient};
use crate::error::NetworkSyncError;
use crate::labels::{LabelPolicy, dns_alias, is_attachable};
use crate::provisioner::NetworkProvisioner;

/// 동기화를 건너뛴 이유
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// 관리 대상 프로젝트가 아님
    OutOfScope,
    /// 네트워크 모드가 추가 연결을 허용하지 않음
    NonAttachable,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfScope => write!(f, "out_of_scope"),
            Self::NonAttachable => write!(f, "non_attachable"),
        }
    }
}

/// 컨테이너 하나에 대한 동기화 결과
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// 대상 컨테이너 ID
    pub container_id: String,
    /// 건너뛴 경우 그 이유
    pub skipped: Option<SkipReason>,
    /// 이번에 연결한 네트워크
    pub connected: Vec<String>,
    /// 이미 참여 중이던 네트워크
    pub already_member: Vec<String>,
    /// 실패한 네트워크와 에러 메시지
    pub failed: Vec<(String, String)>,
}

impl ReconcileReport {
    fn new(container_id: &str) -> Self {
        Self {
            container_id: container_id.to_owned(),
            ..Default::default()
        }
    }

    fn skipped(container_id: &str, reason: SkipReason) -> Self {
        Self {
            skipped: Some(reason),
            ..Self::new(container_id)
        }
    }

    /// 실패 없이 끝났는지 여부
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// 네트워크 하나에 대한 수렴 결과
enum Convergence {
    Connected,
    AlreadyMember,
}

/// 멤버십 동기화기
pub struct MembershipReconciler<D: DockerClient> {
    docker: Arc<D>,
    provisioner: NetworkProvisioner<D>,
    policy: LabelPolicy,
}

impl<D: DockerClient> MembershipReconciler<D> {
    /// 새 동기화기를 생성합니다.
    pub fn new(docker: Arc<D>, provisioner: NetworkProvisioner<D>, policy: LabelPolicy) -> Self {
        Self {
            docker,
            provisioner,
            policy,
        }
    }

    /// 레이블 정책
    pub fn policy(&self) -> &LabelPolicy {
        &self.policy
    }

    /// 네트워크 프로비저너
    pub fn provisioner(&self) -> &NetworkProvisioner<D> {
        &self.provisioner
    }

    /// 컨테이너 ID로 현재 상태를 조회한 뒤 동기화합니다.
    ///
    /// # Errors
    ///
    /// - `NetworkSyncError::ContainerNotFound`: 컨테이너가 더 이상 실행 중이 아님
    pub async fn reconcile_by_id(
        &self,
        container_id: &str,
    ) -> Result<ReconcileReport, NetworkSyncError> {
        let container = self.fetch_container(container_id).await?;
        self.reconcile(&container).await
    }

    /// 컨테이너의 실제 네트워크 멤버십을 목표 상태로 수렴시킵니다.
    ///
    /// # Errors
    ///
    /// - `NetworkSyncError::MissingLabel`: 별칭 계산에 필요한 레이블 누락
    /// - `NetworkSyncError::ContainerNotFound`: 처리 중 컨테이너가 사라짐
    pub async fn reconcile(
        &self,
        container: &ContainerInfo,
    ) -> Result<ReconcileReport, NetworkSyncError> {
        let started = Instant::now();
        let result = self.reconcile_inner(container).await;

        // skipped and already-converged containers count too
        metrics::counter!(m::RECONCILIATIONS_TOTAL).increment(1);
        metrics::histogram!(m::RECONCILE_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());

        result
    }

    async fn reconcile_inner(
        &self,
        container: &ContainerInfo,
    ) -> Result<ReconcileReport, NetworkSyncError> {
        if !self.policy.is_in_scope(container) {
            debug!(container_id = %container.short_id(), "container out of scope, skipping");
            return Ok(ReconcileReport::skipped(&container.id, SkipReason::OutOfScope));
        }

        if !is_attachable(&container.network_mode) {
            debug!(
                container_id = %container.short_id(),
                network_mode = %container.network_mode,
                "network mode forbids attachment, skipping"
            );
            return Ok(ReconcileReport::skipped(
                &container.id,
                SkipReason::NonAttachable,
            ));
        }

        let mut report = ReconcileReport::new(&container.id);

        let desired = self.policy.desired_networks(container);
        let (already, missing): (Vec<String>, Vec<String>) = desired
            .into_iter()
            .partition(|name| container.is_member_of(name));
        report.already_member = already;

        if missing.is_empty() {
            debug!(
                container = %container.display_names(),
                container_id = %container.short_id(),
                "container already in all desired networks"
            );
            return Ok(report);
        }

        let alias = dns_alias(container)?;
        info!(
            container = %container.display_names(),
            container_id = %container.short_id(),
            networks = %missing.join(","),
            alias = %alias,
            "connecting container to networks"
        );

        for network in missing {
            match self.converge(container, &network, &alias).await {
                Ok(Convergence::Connected) => {
                    info!(
                        container = %container.display_names(),
                        container_id = %container.short_id(),
                        network = %network,
                        alias = %alias,
                        "container connected to network"
                    );
                    report.connected.push(network);
                }
                Ok(Convergence::AlreadyMember) => {
                    debug!(
                        container_id = %container.short_id(),
                        network = %network,
                        "container joined network concurrently"
                    );
                    report.already_member.push(network);
                }
                Err(e @ NetworkSyncError::ContainerNotFound(_)) => return Err(e),
                Err(e) => {
                    warn!(
                        container = %container.display_names(),
                        container_id = %container.short_id(),
                        network = %network,
                        error = %e,
                        "failed to connect container to network"
                    );
                    report.failed.push((network, e.to_string()));
                }
            }
        }

        Ok(report)
    }

    async fn converge(
        &self,
        container: &ContainerInfo,
        network: &str,
        alias: &str,
    ) -> Result<Convergence, NetworkSyncError> {
        let handle = self.provisioner.ensure_network(network).await?;

        // membership may have changed while the network was provisioned
        let fresh = self.fetch_container(&container.id).await?;
        if fresh.is_member_of(network) {
            return Ok(Convergence::AlreadyMember);
        }

        let result = self
            .docker
            .connect_network(&handle.id, &container.id, &[alias.to_owned()])
            .await;
        let outcome = if result.is_ok() { "success" } else { "failure" };
        metrics::counter!(m::CONNECTS_TOTAL, m::LABEL_RESULT => outcome).increment(1);

        result.map(|()| Convergence::Connected)
    }

    async fn fetch_container(&self, container_id: &str) -> Result<ContainerInfo, NetworkSyncError> {
        self.docker
            .list_containers(&ContainerFilter::Id(container_id.to_owned()))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| NetworkSyncError::ContainerNotFound(container_id.to_owned()))
    }
}
