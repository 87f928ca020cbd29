//! 이벤트 감시 -- 런타임 이벤트 스트림을 채널로 전달합니다.
//!
//! [`EventWatcher`]는 백그라운드 태스크에서 [`DockerClient::watch_events`]를
//! 실행하고, 수신 측 채널을 돌려줍니다. 태스크는 런타임 스트림이 끊기면
//! 에러로 종료되며, 이 경우 채널도 닫힙니다.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::docker::DockerClient;
use crate::error::NetworkSyncError;
use crate::event::RuntimeEvent;

/// 런타임 이벤트 감시자
pub struct EventWatcher<D: DockerClient> {
    docker: Arc<D>,
    capacity: usize,
}

impl<D: DockerClient> EventWatcher<D> {
    /// 새 감시자를 생성합니다.
    pub fn new(docker: Arc<D>, capacity: usize) -> Self {
        Self { docker, capacity }
    }

    /// 감시 태스크를 시작합니다.
    ///
    /// # Returns
    /// - `mpsc::Receiver<RuntimeEvent>`: 이벤트 수신 채널
    /// - `JoinHandle`: 감시 태스크 (스트림 단절 시 `DockerConnection` 에러)
    pub fn spawn(
        self,
    ) -> (
        mpsc::Receiver<RuntimeEvent>,
        JoinHandle<Result<(), NetworkSyncError>>,
    ) {
        let (tx, rx) = mpsc::channel(self.capacity.max(1));
        let docker = self.docker;

        let handle = tokio::spawn(async move {
            info!("watching runtime container events");
            let result = docker.watch_events(tx).await;
            if let Err(ref e) = result {
                error!(error = %e, "runtime event stream lost");
            }
            result
        });

        (rx, handle)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::docker::MockDockerClient;
    use crate::event::RuntimeEventKind;

    #[tokio::test]
    async fn forwards_events_then_reports_stream_loss() {
        let docker = Arc::new(MockDockerClient::new().with_events(vec![
            RuntimeEvent::new(RuntimeEventKind::Start, "c1", HashMap::new()),
            RuntimeEvent::new(RuntimeEventKind::Stop, "c1", HashMap::new()),
        ]));

        let (mut rx, handle) = EventWatcher::new(docker, 8).spawn();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.kind, RuntimeEventKind::Start);
        assert_eq!(second.kind, RuntimeEventKind::Stop);

        // sender dropped with the task
        assert!(rx.recv().await.is_none());
        let result = handle.await.unwrap();
        assert!(matches!(result, Err(NetworkSyncError::DockerConnection(_))));
    }

    #[tokio::test]
    async fn dropped_receiver_ends_watch_cleanly() {
        let docker = Arc::new(MockDockerClient::new().with_events(vec![
            RuntimeEvent::new(RuntimeEventKind::Start, "c1", HashMap::new()),
            RuntimeEvent::new(RuntimeEventKind::Start, "c2", HashMap::new()),
        ]));

        let (rx, handle) = EventWatcher::new(docker, 1).spawn();
        drop(rx);

        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn zero_capacity_is_clamped() {
        let docker = Arc::new(MockDockerClient::new());
        let (mut rx, handle) = EventWatcher::new(docker, 0).spawn();
        assert!(rx.recv().await.is_none());
        assert!(handle.await.unwrap().is_err());
    }
}
