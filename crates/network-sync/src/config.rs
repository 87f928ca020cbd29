//! 네트워크 동기화 설정
//!
//! [`NetworkSyncConfig`]는 core의 [`NetworksConfig`](dragonify_core::config::NetworksConfig)를
//! 기반으로 동기화 엔진 전용 설정을 제공합니다.
//!
//! # 사용 예시
//! ```ignore
//! use dragonify_core::config::DragonifyConfig;
//! use dragonify_network_sync::config::NetworkSyncConfig;
//!
//! let core_config = DragonifyConfig::default();
//! let config = NetworkSyncConfig::from_core(&core_config.networks);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::NetworkSyncError;
use crate::labels::LabelPolicy;

/// 설정 상한값 상수
const MAX_CONCURRENT_RECONCILES: usize = 64;
const MAX_EVENT_CHANNEL_CAPACITY: usize = 65_536;

/// 네트워크 동기화 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSyncConfig {
    /// 모든 관리 대상 컨테이너를 기본 네트워크에 연결할지 여부
    pub connect_all: bool,
    /// 기본 네트워크 목록
    pub base_networks: Vec<String>,
    /// 관리 대상 compose 프로젝트 접두어
    pub project_prefix: String,
    /// 생성할 네트워크 드라이버
    pub driver: String,
    /// 생성할 네트워크의 internal 플래그
    pub internal: bool,
    /// 시작 시 동시 동기화 최대 수
    pub max_concurrent_reconciles: usize,

    // --- 확장 설정 (core에 없는 추가 필드) ---
    /// 이벤트 채널 용량
    pub event_channel_capacity: usize,
}

impl Default for NetworkSyncConfig {
    fn default() -> Self {
        Self {
            connect_all: false,
            base_networks: vec![dragonify_core::config::DEFAULT_BASE_NETWORK.to_owned()],
            project_prefix: "ix-".to_owned(),
            driver: "bridge".to_owned(),
            internal: true,
            max_concurrent_reconciles: 4,
            event_channel_capacity: 256,
        }
    }
}

impl NetworkSyncConfig {
    /// core의 `NetworksConfig`에서 동기화 설정을 생성합니다.
    ///
    /// core 설정에 없는 확장 필드는 기본값이 적용됩니다.
    pub fn from_core(core: &dragonify_core::config::NetworksConfig) -> Self {
        Self {
            connect_all: core.connect_all,
            base_networks: core.base_networks.clone(),
            project_prefix: core.project_prefix.clone(),
            driver: core.driver.clone(),
            internal: core.internal,
            max_concurrent_reconciles: core.max_concurrent_reconciles,
            ..Self::default()
        }
    }

    /// 설정으로부터 레이블 정책을 만듭니다.
    pub fn label_policy(&self) -> LabelPolicy {
        LabelPolicy::new(
            self.project_prefix.clone(),
            self.connect_all,
            self.base_networks.clone(),
        )
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), NetworkSyncError> {
        if self.project_prefix.is_empty() {
            return Err(config_error("project_prefix", "must not be empty"));
        }

        if self.driver.is_empty() {
            return Err(config_error("driver", "must not be empty"));
        }

        if self.base_networks.iter().any(String::is_empty) {
            return Err(config_error(
                "base_networks",
                "network names must not be empty",
            ));
        }

        if self.connect_all && self.base_networks.is_empty() {
            return Err(config_error(
                "base_networks",
                "at least one base network is required when connect_all is enabled",
            ));
        }

        if self.max_concurrent_reconciles == 0
            || self.max_concurrent_reconciles > MAX_CONCURRENT_RECONCILES
        {
            return Err(NetworkSyncError::Config {
                field: "max_concurrent_reconciles".to_owned(),
                reason: format!("must be 1-{MAX_CONCURRENT_RECONCILES}"),
            });
        }

        if self.event_channel_capacity == 0
            || self.event_channel_capacity > MAX_EVENT_CHANNEL_CAPACITY
        {
            return Err(NetworkSyncError::Config {
                field: "event_channel_capacity".to_owned(),
                reason: format!("must be 1-{MAX_EVENT_CHANNEL_CAPACITY}"),
            });
        }

        Ok(())
    }
}

fn config_error(field: &str, reason: &str) -> NetworkSyncError {
    NetworkSyncError::Config {
        field: field.to_owned(),
        reason: reason.to_owned(),
    }
}

/// 네트워크 동기화 설정 빌더
#[derive(Default)]
pub struct NetworkSyncConfigBuilder {
    config: NetworkSyncConfig,
}

impl NetworkSyncConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 기본 네트워크 일괄 연결 여부를 설정합니다.
    pub fn connect_all(mut self, enabled: bool) -> Self {
        self.config.connect_all = enabled;
        self
    }

    /// 기본 네트워크 목록을 설정합니다.
    pub fn base_networks<I, S>(mut self, networks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.base_networks = networks.into_iter().map(Into::into).collect();
        self
    }

    /// 관리 대상 프로젝트 접두어를 설정합니다.
    pub fn project_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.project_prefix = prefix.into();
        self
    }

    /// 네트워크 드라이버를 설정합니다.
    pub fn driver(mut self, driver: impl Into<String>) -> Self {
        self.config.driver = driver.into();
        self
    }

    /// internal 플래그를 설정합니다.
    pub fn internal(mut self, internal: bool) -> Self {
        self.config.internal = internal;
        self
    }

    /// 시작 시 동시 동기화 최대 수를 설정합니다.
    pub fn max_concurrent_reconciles(mut self, max: usize) -> Self {
        self.config.max_concurrent_reconciles = max;
        self
    }

    /// 이벤트 채널 용량을 설정합니다.
    pub fn event_channel_capacity(mut self, capacity: usize) -> Self {
        self.config.event_channel_capacity = capacity;
        self
    }

    /// 설정을 검증하고 `NetworkSyncConfig`를 생성합니다.
    pub fn build(self) -> Result<NetworkSyncConfig, NetworkSyncError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
