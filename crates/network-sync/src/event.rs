//! Runtime lifecycle events.
//!
//! [`RuntimeEvent`] is the single message type flowing from the
//! [`EventWatcher`](crate::watcher::EventWatcher) to the
//! [`SyncController`](crate::controller::SyncController). Only container
//! `start` and `stop` actions are represented; everything else the runtime
//! emits is dropped at the source.
//!
//! # Examples
//!
//! ```
//! use std::collections::HashMap;
//! use dragonify_network_sync::{RuntimeEvent, RuntimeEventKind};
//!
//! let event = RuntimeEvent::new(
//!     RuntimeEventKind::Start,
//!     "abc123def456",
//!     HashMap::from([(
//!         "com.docker.compose.project".to_owned(),
//!         "ix-app1".to_owned(),
//!     )]),
//! );
//! assert_eq!(event.project(), Some("ix-app1"));
//! ```

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::labels::PROJECT_LABEL;

/// Runtime event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEventKind {
    /// 컨테이너 시작됨 -- 해당 컨테이너 동기화
    Start,
    /// 컨테이너 정지됨 -- 빈 관리 네트워크 정리
    Stop,
}

impl RuntimeEventKind {
    /// Maps a runtime action string (`"start"`, `"stop"`) to an event kind.
    pub fn from_action(action: &str) -> Option<Self> {
        match action {
            "start" => Some(Self::Start),
            "stop" => Some(Self::Stop),
            _ => None,
        }
    }

    /// Action name as used by the runtime and in metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
        }
    }
}

impl fmt::Display for RuntimeEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Container lifecycle event as delivered by the runtime.
///
/// `attributes` mirrors the container's labels at event time, which is
/// enough to decide scope without another API round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeEvent {
    /// 이벤트 고유 ID (로그 상관관계용)
    pub id: String,
    /// 이벤트 종류
    pub kind: RuntimeEventKind,
    /// 대상 컨테이너 ID
    pub container_id: String,
    /// 이벤트 시점의 컨테이너 속성 (레이블 포함)
    pub attributes: HashMap<String, String>,
}

impl RuntimeEvent {
    /// Creates an event with a fresh correlation ID.
    pub fn new(
        kind: RuntimeEventKind,
        container_id: impl Into<String>,
        attributes: HashMap<String, String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            container_id: container_id.into(),
            attributes,
        }
    }

    /// Compose project label carried by the event, if any.
    pub fn project(&self) -> Option<&str> {
        self.attributes.get(PROJECT_LABEL).map(String::as_str)
    }
}

impl fmt::Display for RuntimeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "container.{} {} project={}",
            self.kind,
            self.container_id,
            self.project().unwrap_or("-"),
        )
    }
}
