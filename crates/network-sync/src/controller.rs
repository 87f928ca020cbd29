//! 동기화 컨트롤러 -- 시작 시 전체 동기화 후 이벤트 루프를 실행합니다.
//!
//! # 상태 전이
//! ```text
//! Bootstrapping ──bootstrap()──> Steady ──channel closed──> Stopped
//! ```
//!
//! # 내부 아키텍처
//! ```text
//! RuntimeEvent ──mpsc──> SyncController::run
//!                            |
//!                       JoinSet::spawn (이벤트마다 독립 태스크)
//!                            |
//!                   EventDispatcher::dispatch
//!                     |                 |
//!               start |                 | stop
//!                     v                 v
//!         MembershipReconciler   GarbageCollector
//! ```
//!
//! 핸들러 사이에는 어떤 직렬화도 없습니다. 모든 연산이 런타임 상태를 다시
//! 읽고 멱등적으로 동작하므로 교차 실행되어도 수렴합니다.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::StreamExt;
use futures_util::stream;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use dragonify_core::metrics as m;

use crate::collector::{CollectReport, GarbageCollector};
use crate::config::NetworkSyncConfig;
use crate::docker::{ContainerFilter, DockerClient};
use crate::error::NetworkSyncError;
use crate::event::{RuntimeEvent, RuntimeEventKind};
use crate::labels::{LabelPolicy, PROJECT_LABEL};
use crate::provisioner::{NetworkHandle, NetworkProvisioner};
use crate::reconciler::{MembershipReconciler, ReconcileReport};

/// 컨트롤러 실행 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ControllerState {
    /// 시작 시 전체 동기화 단계
    Bootstrapping,
    /// 이벤트 루프 실행 중
    Steady,
    /// 이벤트 채널이 닫혀 종료됨
    Stopped,
}

/// 시작 시 전체 동기화 결과
#[derive(Debug, Clone, Default)]
pub struct BootstrapReport {
    /// 존재가 보장된 기본 네트워크
    pub base_networks: Vec<NetworkHandle>,
    /// 보장에 실패한 기본 네트워크와 에러 메시지
    pub base_failed: Vec<(String, String)>,
    /// 프로젝트 레이블이 있는 실행 중 컨테이너 수
    pub scanned: usize,
    /// 동기화한 관리 대상 컨테이너 수
    pub reconciled: usize,
    /// 새로 연결된 (컨테이너, 네트워크) 쌍의 수
    pub connected: usize,
    /// 동기화에 실패했거나 일부 네트워크가 실패한 컨테이너 수
    pub failed: usize,
}

/// 이벤트 하나를 처리한 결과
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    /// 관리 범위 밖 이벤트
    Discarded,
    /// `start` 처리 결과
    Reconciled(ReconcileReport),
    /// `stop` 처리 결과
    Collected(CollectReport),
    /// 처리 실패 (에러 메시지)
    Failed(String),
}

/// 이벤트 처리 카운터
#[derive(Debug, Default)]
struct DispatchStats {
    received: AtomicU64,
    discarded: AtomicU64,
    failed: AtomicU64,
}

/// 이벤트 디스패처 -- 이벤트 하나를 해당 핸들러로 보냅니다.
///
/// 복제 비용이 낮아 이벤트마다 독립 태스크로 옮길 수 있습니다.
pub struct EventDispatcher<D: DockerClient> {
    policy: LabelPolicy,
    reconciler: Arc<MembershipReconciler<D>>,
    collector: Arc<GarbageCollector<D>>,
    stats: Arc<DispatchStats>,
}

impl<D: DockerClient> Clone for EventDispatcher<D> {
    fn clone(&self) -> Self {
        Self {
            policy: self.policy.clone(),
            reconciler: Arc::clone(&self.reconciler),
            collector: Arc::clone(&self.collector),
            stats: Arc::clone(&self.stats),
        }
    }
}

impl<D: DockerClient> EventDispatcher<D> {
    /// 이벤트를 처리합니다.
    ///
    /// 이벤트 속성의 프로젝트 레이블이 관리 대상이 아니면 런타임 조회 없이 버립니다.
    pub async fn dispatch(&self, event: RuntimeEvent) -> DispatchOutcome {
        self.stats.received.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(m::EVENTS_RECEIVED_TOTAL, m::LABEL_EVENT => event.kind.as_str())
            .increment(1);

        let in_scope = event
            .project()
            .is_some_and(|p| self.policy.is_managed_project(p));
        if !in_scope {
            self.stats.discarded.fetch_add(1, Ordering::Relaxed);
            metrics::counter!(m::EVENTS_DISCARDED_TOTAL).increment(1);
            debug!(event_id = %event.id, event = %event, "discarding out-of-scope event");
            return DispatchOutcome::Discarded;
        }

        debug!(event_id = %event.id, event = %event, "handling runtime event");

        let outcome = match event.kind {
            RuntimeEventKind::Start => {
                match self.reconciler.reconcile_by_id(&event.container_id).await {
                    Ok(report) => DispatchOutcome::Reconciled(report),
                    Err(NetworkSyncError::ContainerNotFound(id)) => {
                        warn!(event_id = %event.id, container_id = %id, "container not found");
                        DispatchOutcome::Failed(format!("container not found: {id}"))
                    }
                    Err(e) => {
                        warn!(
                            event_id = %event.id,
                            container_id = %event.container_id,
                            error = %e,
                            "failed to reconcile started container"
                        );
                        DispatchOutcome::Failed(e.to_string())
                    }
                }
            }
            RuntimeEventKind::Stop => match self.collector.collect().await {
                Ok(report) => DispatchOutcome::Collected(report),
                Err(e) => {
                    warn!(event_id = %event.id, error = %e, "network garbage collection failed");
                    DispatchOutcome::Failed(e.to_string())
                }
            },
        };

        if matches!(outcome, DispatchOutcome::Failed(_)) {
            self.stats.failed.fetch_add(1, Ordering::Relaxed);
        }
        outcome
    }
}

/// 동기화 컨트롤러
///
/// # 사용 예시
/// ```ignore
/// use dragonify_network_sync::{EventWatcher, SyncControllerBuilder};
///
/// let mut controller = SyncControllerBuilder::new()
///     .config(config)
///     .docker_client(Arc::clone(&docker))
///     .build()?;
///
/// // 부트스트랩 중 발생한 이벤트도 놓치지 않도록 감시를 먼저 시작
/// let (rx, _watch) = EventWatcher::new(docker, 256).spawn();
/// controller.bootstrap().await?;
/// controller.run(rx).await;
/// ```
pub struct SyncController<D: DockerClient> {
    config: NetworkSyncConfig,
    state: ControllerState,
    docker: Arc<D>,
    dispatcher: EventDispatcher<D>,
}

impl<D: DockerClient> SyncController<D> {
    /// 현재 상태명을 반환합니다.
    pub fn state_name(&self) -> &str {
        match self.state {
            ControllerState::Bootstrapping => "bootstrapping",
            ControllerState::Steady => "steady",
            ControllerState::Stopped => "stopped",
        }
    }

    /// 수신한 이벤트 수
    pub fn events_received(&self) -> u64 {
        self.dispatcher.stats.received.load(Ordering::Relaxed)
    }

    /// 관리 범위 밖이라 버린 이벤트 수
    pub fn events_discarded(&self) -> u64 {
        self.dispatcher.stats.discarded.load(Ordering::Relaxed)
    }

    /// 처리에 실패한 이벤트 수
    pub fn events_failed(&self) -> u64 {
        self.dispatcher.stats.failed.load(Ordering::Relaxed)
    }

    /// 이벤트 디스패처 복제본을 반환합니다.
    pub fn dispatcher(&self) -> EventDispatcher<D> {
        self.dispatcher.clone()
    }

    /// 시작 시 전체 동기화를 수행합니다.
    ///
    /// 기본 네트워크를 보장한 뒤, 프로젝트 레이블이 있는 실행 중 컨테이너를
    /// 나열하여 관리 대상마다 동기화합니다. 동시 실행 수는
    /// `max_concurrent_reconciles`로 제한됩니다.
    ///
    /// # Errors
    ///
    /// 컨테이너 목록 조회가 실패하면 에러를 반환합니다. 개별 네트워크나
    /// 컨테이너의 실패는 보고서에 집계됩니다.
    pub async fn bootstrap(&mut self) -> Result<BootstrapReport, NetworkSyncError> {
        self.state = ControllerState::Bootstrapping;
        let reconciler = Arc::clone(&self.dispatcher.reconciler);
        let mut report = BootstrapReport::default();

        for name in reconciler.policy().base_networks() {
            info!(network = %name, "setting up base network");
            match reconciler.provisioner().ensure_network(name).await {
                Ok(handle) => report.base_networks.push(handle),
                Err(e) => {
                    error!(network = %name, error = %e, "failed to set up base network");
                    report.base_failed.push((name.clone(), e.to_string()));
                }
            }
        }

        let containers = self
            .docker
            .list_containers(&ContainerFilter::Label(PROJECT_LABEL.to_owned()))
            .await?;
        report.scanned = containers.len();

        let in_scope: Vec<_> = containers
            .into_iter()
            .filter(|c| reconciler.policy().is_in_scope(c))
            .collect();
        info!(
            scanned = report.scanned,
            in_scope = in_scope.len(),
            "connecting existing app containers to their networks"
        );

        let results: Vec<_> = stream::iter(in_scope)
            .map(|container| {
                let reconciler = Arc::clone(&reconciler);
                async move {
                    let result = reconciler.reconcile(&container).await;
                    (container, result)
                }
            })
            .buffer_unordered(self.config.max_concurrent_reconciles.max(1))
            .collect()
            .await;

        for (container, result) in results {
            report.reconciled += 1;
            match result {
                Ok(r) => {
                    report.connected += r.connected.len();
                    if !r.is_clean() {
                        report.failed += 1;
                    }
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(
                        container = %container.display_names(),
                        container_id = %container.short_id(),
                        error = %e,
                        "failed to reconcile existing container"
                    );
                }
            }
        }

        info!(
            reconciled = report.reconciled,
            connected = report.connected,
            failed = report.failed,
            "all configured app containers connected to their networks"
        );

        Ok(report)
    }

    /// 이벤트 루프를 실행합니다.
    ///
    /// 이벤트마다 독립 태스크를 띄우며, 채널이 닫히면 남은 태스크를 기다린 뒤
    /// 반환합니다.
    pub async fn run(&mut self, mut rx: mpsc::Receiver<RuntimeEvent>) {
        self.state = ControllerState::Steady;
        info!("sync controller entered steady state");

        let mut tasks = JoinSet::new();
        while let Some(event) = rx.recv().await {
            while let Some(finished) = tasks.try_join_next() {
                log_task_result(finished);
            }

            let dispatcher = self.dispatcher.clone();
            tasks.spawn(async move {
                dispatcher.dispatch(event).await;
            });
        }

        debug!(in_flight = tasks.len(), "event channel closed, awaiting handlers");
        while let Some(finished) = tasks.join_next().await {
            log_task_result(finished);
        }

        self.state = ControllerState::Stopped;
        info!(
            received = self.events_received(),
            discarded = self.events_discarded(),
            failed = self.events_failed(),
            "sync controller stopped"
        );
    }
}

fn log_task_result(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        error!(error = %e, "event handler task failed");
    }
}

/// 동기화 컨트롤러 빌더
pub struct SyncControllerBuilder<D: DockerClient> {
    config: NetworkSyncConfig,
    docker: Option<Arc<D>>,
}

impl<D: DockerClient> SyncControllerBuilder<D> {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: NetworkSyncConfig::default(),
            docker: None,
        }
    }

    /// 동기화 설정을 지정합니다.
    pub fn config(mut self, config: NetworkSyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Docker 클라이언트를 설정합니다.
    pub fn docker_client(mut self, docker: Arc<D>) -> Self {
        self.docker = Some(docker);
        self
    }

    /// 컨트롤러를 빌드합니다.
    pub fn build(self) -> Result<SyncController<D>, NetworkSyncError> {
        self.config.validate()?;

        let docker = self.docker.ok_or_else(|| NetworkSyncError::Config {
            field: "docker_client".to_owned(),
            reason: "docker client must be provided".to_owned(),
        })?;

        let policy = self.config.label_policy();
        let provisioner = NetworkProvisioner::new(
            Arc::clone(&docker),
            self.config.driver.clone(),
            self.config.internal,
        );
        let reconciler = Arc::new(MembershipReconciler::new(
            Arc::clone(&docker),
            provisioner,
            policy.clone(),
        ));
        let collector = Arc::new(GarbageCollector::new(Arc::clone(&docker)));

        Ok(SyncController {
            config: self.config,
            state: ControllerState::Bootstrapping,
            docker,
            dispatcher: EventDispatcher {
                policy,
                reconciler,
                collector,
                stats: Arc::new(DispatchStats::default()),
            },
        })
    }
}

impl<D: DockerClient> Default for SyncControllerBuilder<D> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::config::NetworkSyncConfigBuilder;
    use crate::docker::MockDockerClient;
    use crate::labels::{NETWORKS_LABEL, SERVICE_LABEL};
    use dragonify_core::types::ContainerInfo;

    fn app_container(id: &str, project: &str, networks: &str) -> ContainerInfo {
        ContainerInfo {
            id: id.to_owned(),
            names: vec![format!("{project}-{id}")],
            labels: HashMap::from([
                (PROJECT_LABEL.to_owned(), project.to_owned()),
                (SERVICE_LABEL.to_owned(), "web".to_owned()),
                (NETWORKS_LABEL.to_owned(), networks.to_owned()),
            ]),
            networks: Default::default(),
            network_mode: "bridge".to_owned(),
        }
    }

    fn event(kind: RuntimeEventKind, id: &str, project: &str) -> RuntimeEvent {
        RuntimeEvent::new(
            kind,
            id,
            HashMap::from([(PROJECT_LABEL.to_owned(), project.to_owned())]),
        )
    }

    fn controller(docker: &Arc<MockDockerClient>) -> SyncController<MockDockerClient> {
        SyncControllerBuilder::new()
            .config(
                NetworkSyncConfigBuilder::new()
                    .max_concurrent_reconciles(2)
                    .build()
                    .unwrap(),
            )
            .docker_client(Arc::clone(docker))
            .build()
            .unwrap()
    }

    #[test]
    fn builder_rejects_missing_docker_client() {
        let result = SyncControllerBuilder::<MockDockerClient>::new().build();
        assert!(matches!(result, Err(NetworkSyncError::Config { .. })));
    }

    #[test]
    fn builder_rejects_invalid_config() {
        let config = NetworkSyncConfig {
            project_prefix: String::new(),
            ..Default::default()
        };
        let result = SyncControllerBuilder::new()
            .config(config)
            .docker_client(Arc::new(MockDockerClient::new()))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn new_controller_is_bootstrapping() {
        let docker = Arc::new(MockDockerClient::new());
        assert_eq!(controller(&docker).state_name(), "bootstrapping");
    }

    #[tokio::test]
    async fn bootstrap_ensures_base_networks() {
        let docker = Arc::new(MockDockerClient::new());
        let report = controller(&docker).bootstrap().await.unwrap();

        assert_eq!(report.base_networks.len(), 1);
        assert_eq!(report.base_networks[0].name, "apps-internal");
        assert!(docker.network("apps-internal").is_some());
        assert_eq!(report.scanned, 0);
    }

    #[tokio::test]
    async fn bootstrap_reconciles_only_in_scope_containers() {
        let docker = Arc::new(
            MockDockerClient::new()
                .with_container(app_container("c1", "ix-app1", "net-a"))
                .with_container(app_container("c2", "ix-app2", "net-a,net-b"))
                .with_container(app_container("c3", "other", "net-a")),
        );

        let report = controller(&docker).bootstrap().await.unwrap();

        assert_eq!(report.scanned, 3);
        assert_eq!(report.reconciled, 2);
        assert_eq!(report.connected, 3);
        assert_eq!(report.failed, 0);
        assert!(docker.container("c1").unwrap().is_member_of("net-a"));
        assert!(docker.container("c2").unwrap().is_member_of("net-b"));
        assert!(!docker.container("c3").unwrap().is_member_of("net-a"));
        assert_eq!(
            docker
                .network_names()
                .iter()
                .filter(|n| *n == "net-a")
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn bootstrap_continues_after_base_network_failure() {
        let docker = Arc::new(
            MockDockerClient::new()
                .with_network("apps-internal")
                .with_network("apps-internal")
                .with_container(app_container("c1", "ix-app1", "net-a")),
        );
        let mut controller = SyncControllerBuilder::new()
            .config(
                NetworkSyncConfigBuilder::new()
                    .base_networks(["apps-internal", "shared"])
                    .build()
                    .unwrap(),
            )
            .docker_client(Arc::clone(&docker))
            .build()
            .unwrap();

        let report = controller.bootstrap().await.unwrap();

        assert_eq!(report.base_failed.len(), 1);
        assert_eq!(report.base_failed[0].0, "apps-internal");
        assert_eq!(report.base_networks.len(), 1);
        assert_eq!(report.base_networks[0].name, "shared");

        assert_eq!(report.reconciled, 1);
        assert_eq!(report.connected, 1);
        assert_eq!(report.failed, 0);
        assert!(docker.container("c1").unwrap().is_member_of("net-a"));
    }

    #[tokio::test]
    async fn dispatch_discards_out_of_scope_events() {
        let docker = Arc::new(MockDockerClient::new().with_managed_network("net-a"));
        let controller = controller(&docker);
        let dispatcher = controller.dispatcher();

        let outcome = dispatcher
            .dispatch(event(RuntimeEventKind::Stop, "c1", "other"))
            .await;
        assert!(matches!(outcome, DispatchOutcome::Discarded));

        let outcome = dispatcher
            .dispatch(RuntimeEvent::new(RuntimeEventKind::Stop, "c1", HashMap::new()))
            .await;
        assert!(matches!(outcome, DispatchOutcome::Discarded));

        assert!(docker.removals().is_empty());
        assert_eq!(controller.events_received(), 2);
        assert_eq!(controller.events_discarded(), 2);
    }

    #[tokio::test]
    async fn dispatch_start_reconciles_container() {
        let docker = Arc::new(
            MockDockerClient::new().with_container(app_container("c1", "ix-app", "net-a")),
        );
        let dispatcher = controller(&docker).dispatcher();

        let outcome = dispatcher
            .dispatch(event(RuntimeEventKind::Start, "c1", "ix-app"))
            .await;

        match outcome {
            DispatchOutcome::Reconciled(report) => assert_eq!(report.connected, vec!["net-a"]),
            other => panic!("expected Reconciled, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn dispatch_start_for_vanished_container_fails_softly() {
        let docker = Arc::new(MockDockerClient::new());
        let controller = controller(&docker);

        let outcome = controller
            .dispatcher()
            .dispatch(event(RuntimeEventKind::Start, "c404", "ix-app"))
            .await;

        assert!(matches!(outcome, DispatchOutcome::Failed(_)));
        assert_eq!(controller.events_failed(), 1);
    }

    #[tokio::test]
    async fn dispatch_stop_collects_empty_networks() {
        let docker = Arc::new(MockDockerClient::new().with_managed_network("net-a"));
        let outcome = controller(&docker)
            .dispatcher()
            .dispatch(event(RuntimeEventKind::Stop, "c1", "ix-app"))
            .await;

        match outcome {
            DispatchOutcome::Collected(report) => assert_eq!(report.removed, vec!["net-a"]),
            other => panic!("expected Collected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn run_processes_events_until_channel_closes() {
        let docker = Arc::new(
            MockDockerClient::new().with_container(app_container("c1", "ix-app", "net-a")),
        );
        let mut controller = controller(&docker);
        let (tx, rx) = mpsc::channel(8);

        tx.send(event(RuntimeEventKind::Start, "c1", "ix-app"))
            .await
            .unwrap();
        tx.send(event(RuntimeEventKind::Start, "c9", "other"))
            .await
            .unwrap();
        drop(tx);

        controller.run(rx).await;

        assert_eq!(controller.state_name(), "stopped");
        assert_eq!(controller.events_received(), 2);
        assert_eq!(controller.events_discarded(), 1);
        assert!(docker.container("c1").unwrap().is_member_of("net-a"));
    }
}
