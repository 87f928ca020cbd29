//! 데몬 조립 -- 설정, 런타임 연결, 동기화 엔진 수명 주기를 관리합니다.
//!
//! [`Orchestrator`]는 `dragonify-daemon`의 중앙 조정자입니다.
//!
//! # 시작 순서
//!
//! 1. 런타임 연결 확인 (`ping`, 실패 시 종료)
//! 2. 이벤트 감시 시작 (부트스트랩 중 발생한 이벤트는 채널에 쌓임)
//! 3. 부트스트랩 (기본 네트워크 보장 + 실행 중 컨테이너 동기화)
//! 4. 이벤트 루프
//!
//! # 종료 조건
//!
//! - `SIGTERM` / `SIGINT`: 정상 종료
//! - 런타임 이벤트 스트림 단절: 에러로 종료 (재시작은 서비스 관리자에 맡김)

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use dragonify_core::config::DragonifyConfig;
use dragonify_network_sync::{
    BollardDockerClient, DockerClient, EventWatcher, NetworkSyncConfig, NetworkSyncError,
    SyncControllerBuilder,
};

use crate::metrics_server;

/// 가동 시간 게이지 갱신 주기
const UPTIME_UPDATE_INTERVAL: Duration = Duration::from_secs(10);

/// The main daemon orchestrator.
pub struct Orchestrator {
    /// Loaded and validated configuration.
    config: DragonifyConfig,
    /// Shutdown broadcast sender (signals background tasks).
    shutdown_tx: broadcast::Sender<()>,
    /// Daemon start time (for uptime reporting).
    start_time: Instant,
}

impl Orchestrator {
    /// 설정 파일을 로드하여 오케스트레이터를 생성합니다.
    ///
    /// 파일이 없으면 기본값과 환경변수로 동작합니다.
    ///
    /// # Errors
    ///
    /// 설정 파일을 읽거나 파싱하지 못했거나 검증에 실패하면 에러를 반환합니다.
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = DragonifyConfig::load_or_default(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        Self::build_from_config(config).await
    }

    /// 이미 로드된 설정으로 오케스트레이터를 생성합니다.
    ///
    /// 메트릭이 활성화되어 있으면 이 시점에 Prometheus 레코더를 설치합니다.
    pub async fn build_from_config(config: DragonifyConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
            tracing::info!(port = config.metrics.port, "metrics endpoint enabled");
        }

        let (shutdown_tx, _) = broadcast::channel(16);

        Ok(Self {
            config,
            shutdown_tx,
            start_time: Instant::now(),
        })
    }

    /// Get a reference to the loaded configuration.
    pub fn config(&self) -> &DragonifyConfig {
        &self.config
    }

    /// 동기화 엔진 설정을 생성합니다.
    pub fn sync_config(&self) -> NetworkSyncConfig {
        NetworkSyncConfig::from_core(&self.config.networks)
    }

    /// 로컬 런타임에 연결하고 종료 시그널까지 동기화를 수행합니다.
    ///
    /// # Errors
    ///
    /// - 런타임 클라이언트 생성 또는 연결 확인 실패
    /// - 이벤트 스트림 단절
    /// - 시그널 핸들러 설치 실패
    pub async fn run(&mut self) -> Result<()> {
        let docker = if self.config.docker.socket.is_empty() {
            BollardDockerClient::connect_local(self.config.docker.timeout_secs)
        } else {
            BollardDockerClient::connect_with_socket(
                &self.config.docker.socket,
                self.config.docker.timeout_secs,
            )
        }
        .map_err(|e| anyhow::anyhow!("failed to create docker client: {}", e))?;

        self.run_until(Arc::new(docker), wait_for_shutdown_signal())
            .await
    }

    /// 주어진 클라이언트로 동기화를 수행하고 `shutdown`이 완료되면 반환합니다.
    ///
    /// `shutdown`은 종료 원인의 이름을 돌려줍니다.
    pub async fn run_until<D, S>(&mut self, docker: Arc<D>, shutdown: S) -> Result<()>
    where
        D: DockerClient,
        S: Future<Output = Result<&'static str>>,
    {
        docker
            .ping()
            .await
            .map_err(|e| anyhow::anyhow!("container runtime is unreachable: {}", e))?;
        tracing::info!("connected to container runtime");

        let sync_config = self.sync_config();
        let capacity = sync_config.event_channel_capacity;
        let mut controller = SyncControllerBuilder::new()
            .config(sync_config)
            .docker_client(Arc::clone(&docker))
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build sync controller: {}", e))?;

        let (rx, watch_handle) = EventWatcher::new(Arc::clone(&docker), capacity).spawn();

        match controller.bootstrap().await {
            Ok(report) => tracing::info!(
                base_networks = report.base_networks.len(),
                base_failed = report.base_failed.len(),
                scanned = report.scanned,
                connected = report.connected,
                failed = report.failed,
                "bootstrap finished"
            ),
            Err(e) => tracing::warn!(error = %e, "bootstrap scan failed, continuing with events"),
        }

        let uptime_task = if self.config.metrics.enabled {
            Some(spawn_uptime_updater(
                self.start_time,
                self.shutdown_tx.subscribe(),
            ))
        } else {
            None
        };

        tracing::info!("entering main event loop");
        let outcome = tokio::select! {
            signal = shutdown => match signal {
                Ok(signal) => {
                    tracing::info!(signal, "shutdown signal received");
                    watch_handle.abort();
                    Ok(())
                }
                Err(e) => {
                    watch_handle.abort();
                    Err(e)
                }
            },
            () = controller.run(rx) => stream_loss(watch_handle).await,
        };

        tracing::info!("broadcasting shutdown signal to background tasks");
        let _ = self.shutdown_tx.send(());
        if let Some(task) = uptime_task {
            let _ = task.await;
        }

        tracing::info!(
            state = controller.state_name(),
            received = controller.events_received(),
            discarded = controller.events_discarded(),
            failed = controller.events_failed(),
            "sync engine stopped"
        );

        outcome
    }
}

/// 이벤트 루프가 스스로 끝난 경우의 결과를 만듭니다.
///
/// 감시 태스크가 끝나야 채널이 닫히므로 어떤 경우든 에러입니다.
async fn stream_loss(handle: JoinHandle<Result<(), NetworkSyncError>>) -> Result<()> {
    match handle.await {
        Ok(Err(e)) => Err(anyhow::anyhow!("runtime event stream lost: {}", e)),
        Ok(Ok(())) => Err(anyhow::anyhow!("runtime event stream ended")),
        Err(e) => Err(anyhow::anyhow!("event watcher task failed: {}", e)),
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
///
/// # Errors
///
/// Returns an error if signal handlers cannot be installed.
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Spawn a background task that periodically updates the uptime gauge.
fn spawn_uptime_updater(
    start_time: Instant,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    use dragonify_core::metrics as m;

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(UPTIME_UPDATE_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let uptime_secs = start_time.elapsed().as_secs();
                    #[allow(clippy::cast_precision_loss)]
                    metrics::gauge!(m::DAEMON_UPTIME_SECONDS).set(uptime_secs as f64);
                }
                _ = shutdown_rx.recv() => {
                    tracing::debug!("uptime updater shutting down");
                    break;
                }
            }
        }
    })
}
