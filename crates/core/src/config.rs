//! 설정 관리 -- dragonify.toml 파싱 및 런타임 설정
//!
//! [`DragonifyConfig`]는 데몬 전체 설정을 담는 최상위 구조체입니다.
//! 프로세스 시작 시 한 번 만들어지고 이후에는 변경되지 않습니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`DRAGONIFY_NETWORKS_CONNECT_ALL=true` 형식, 레거시 `CUSTOMS_NETWORKS`)
//! 3. 설정 파일 (`dragonify.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), dragonify_core::error::DragonifyError> {
//! use dragonify_core::config::DragonifyConfig;
//!
//! // 파일이 없으면 기본값 + 환경변수로 동작
//! let config = DragonifyConfig::load_or_default("/etc/dragonify/dragonify.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = DragonifyConfig::parse("[networks]\nconnect_all = true")?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ConfigError, DragonifyError};

/// 레거시 환경변수: 쉼표로 구분된 기본 네트워크 목록
pub const LEGACY_NETWORKS_ENV: &str = "CUSTOMS_NETWORKS";

/// 기본 공유 네트워크 이름
pub const DEFAULT_BASE_NETWORK: &str = "apps-internal";

/// 설정 상한값 상수
const MAX_CONCURRENT_RECONCILES: usize = 64;
const MAX_DOCKER_TIMEOUT_SECS: u64 = 600;

/// Dragonify 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DragonifyConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// Docker 연결 설정
    #[serde(default)]
    pub docker: DockerConfig,
    /// 네트워크 동기화 설정
    #[serde(default)]
    pub networks: NetworksConfig,
    /// 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// 설정의 출처
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    /// 설정 파일
    File,
    /// 파일이 없어 기본값에서 시작함
    Defaults,
}

/// 검증 전 단계의 로딩 결과
///
/// 로깅이 초기화되기 전에 로드되므로, 로그로 남길 내용은 호출자가
/// 로깅 초기화 후 [`log_summary`](Self::log_summary)로 출력합니다.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// 파일과 환경변수가 적용된 (미검증) 설정
    pub config: DragonifyConfig,
    /// 설정의 출처
    pub source: ConfigSource,
    /// 값을 파싱하지 못해 무시한 환경변수
    pub ignored_env: Vec<String>,
}

impl LoadedConfig {
    fn into_validated(self, path: &Path) -> Result<DragonifyConfig, DragonifyError> {
        self.log_summary(path);
        self.config.validate()?;
        Ok(self.config)
    }

    /// 로딩 과정에서 생긴 알림을 로그로 남깁니다.
    pub fn log_summary(&self, path: &Path) {
        if self.source == ConfigSource::Defaults {
            info!(
                path = %path.display(),
                "config file not found, using defaults and environment"
            );
        }
        for env_key in &self.ignored_env {
            warn!(env_key = %env_key, "failed to parse env var, ignoring");
        }
    }
}

impl DragonifyConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, DragonifyError> {
        let path = path.as_ref();
        let mut config = Self::from_file(path).await?;
        let ignored = config.apply_env_overrides();
        LoadedConfig {
            config,
            source: ConfigSource::File,
            ignored_env: ignored,
        }
        .into_validated(path)
    }

    /// 파일이 없으면 기본값에서 시작하는 [`load`](Self::load) 변형입니다.
    ///
    /// 환경변수만으로 운영하던 배포를 그대로 지원하기 위해 사용합니다.
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self, DragonifyError> {
        let path = path.as_ref();
        Self::load_unvalidated(path).await?.into_validated(path)
    }

    /// 파일(없으면 기본값)과 환경변수까지만 적용하고 검증은 하지 않습니다.
    ///
    /// CLI 오버라이드를 더 적용한 뒤 [`validate`](Self::validate)를 호출해야 합니다.
    ///
    /// # Errors
    ///
    /// 파일을 읽거나 파싱하지 못하면 에러를 반환합니다. 파일이 없는 것은 에러가 아닙니다.
    pub async fn load_unvalidated(path: impl AsRef<Path>) -> Result<LoadedConfig, DragonifyError> {
        let (mut config, source) = match Self::from_file(path).await {
            Ok(config) => (config, ConfigSource::File),
            Err(DragonifyError::Config(ConfigError::FileNotFound { .. })) => {
                (Self::default(), ConfigSource::Defaults)
            }
            Err(e) => return Err(e),
        };
        let ignored_env = config.apply_env_overrides();
        Ok(LoadedConfig {
            config,
            source,
            ignored_env,
        })
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, DragonifyError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DragonifyError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                DragonifyError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, DragonifyError> {
        toml::from_str(toml_str).map_err(|e| {
            DragonifyError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `DRAGONIFY_{SECTION}_{FIELD}`
    /// 레거시 `CUSTOMS_NETWORKS`는 `DRAGONIFY_NETWORKS_BASE_NETWORKS`보다 먼저 적용되어
    /// 둘 다 설정되면 후자가 이깁니다.
    ///
    /// 값을 파싱하지 못한 환경변수는 무시하고 그 이름을 반환합니다.
    pub fn apply_env_overrides(&mut self) -> Vec<String> {
        let mut ignored = Vec::new();

        // General
        override_string(&mut self.general.log_level, "DRAGONIFY_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "DRAGONIFY_GENERAL_LOG_FORMAT");

        // Docker
        override_string(&mut self.docker.socket, "DRAGONIFY_DOCKER_SOCKET");
        override_parsed(
            &mut self.docker.timeout_secs,
            "DRAGONIFY_DOCKER_TIMEOUT_SECS",
            &mut ignored,
        );

        // Networks
        override_bool(
            &mut self.networks.connect_all,
            "DRAGONIFY_NETWORKS_CONNECT_ALL",
            &mut ignored,
        );
        override_csv(&mut self.networks.base_networks, LEGACY_NETWORKS_ENV);
        override_csv(
            &mut self.networks.base_networks,
            "DRAGONIFY_NETWORKS_BASE_NETWORKS",
        );
        override_string(
            &mut self.networks.project_prefix,
            "DRAGONIFY_NETWORKS_PROJECT_PREFIX",
        );
        override_bool(
            &mut self.networks.internal,
            "DRAGONIFY_NETWORKS_INTERNAL",
            &mut ignored,
        );
        override_parsed(
            &mut self.networks.max_concurrent_reconciles,
            "DRAGONIFY_NETWORKS_MAX_CONCURRENT_RECONCILES",
            &mut ignored,
        );

        // Metrics
        override_bool(
            &mut self.metrics.enabled,
            "DRAGONIFY_METRICS_ENABLED",
            &mut ignored,
        );
        override_string(
            &mut self.metrics.listen_addr,
            "DRAGONIFY_METRICS_LISTEN_ADDR",
        );
        override_parsed(&mut self.metrics.port, "DRAGONIFY_METRICS_PORT", &mut ignored);

        ignored
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), DragonifyError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.docker.timeout_secs == 0 || self.docker.timeout_secs > MAX_DOCKER_TIMEOUT_SECS {
            return Err(invalid(
                "docker.timeout_secs",
                format!("must be 1-{MAX_DOCKER_TIMEOUT_SECS}"),
            ));
        }

        self.networks.validate()?;

        if self.metrics.enabled {
            if self.metrics.port == 0 {
                return Err(invalid("metrics.port", "must not be 0".to_owned()));
            }
            if self.metrics.endpoint != "/metrics" {
                return Err(invalid(
                    "metrics.endpoint",
                    "only '/metrics' is supported".to_owned(),
                ));
            }
        }

        Ok(())
    }
}

impl NetworksConfig {
    /// 네트워크 섹션의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), DragonifyError> {
        let mut seen = HashSet::new();
        for name in &self.base_networks {
            if name.is_empty() {
                return Err(invalid(
                    "networks.base_networks",
                    "network names must not be empty".to_owned(),
                ));
            }
            if name.contains(char::is_whitespace) || name.contains(',') {
                return Err(invalid(
                    "networks.base_networks",
                    format!("invalid network name '{name}'"),
                ));
            }
            if !seen.insert(name.as_str()) {
                return Err(invalid(
                    "networks.base_networks",
                    format!("duplicate network name '{name}'"),
                ));
            }
        }

        if self.connect_all && self.base_networks.is_empty() {
            return Err(invalid(
                "networks.base_networks",
                "at least one base network is required when connect_all is enabled".to_owned(),
            ));
        }

        if self.project_prefix.is_empty() {
            return Err(invalid(
                "networks.project_prefix",
                "must not be empty".to_owned(),
            ));
        }

        if self.driver.is_empty() {
            return Err(invalid("networks.driver", "must not be empty".to_owned()));
        }

        if self.max_concurrent_reconciles == 0
            || self.max_concurrent_reconciles > MAX_CONCURRENT_RECONCILES
        {
            return Err(invalid(
                "networks.max_concurrent_reconciles",
                format!("must be 1-{MAX_CONCURRENT_RECONCILES}"),
            ));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: String) -> DragonifyError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// Docker 연결 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerConfig {
    /// Docker 소켓 경로 (비어 있으면 `DOCKER_HOST` 또는 플랫폼 기본값 사용)
    pub socket: String,
    /// API 요청 타임아웃 (초)
    pub timeout_secs: u64,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            socket: String::new(),
            timeout_secs: 120,
        }
    }
}

/// 네트워크 동기화 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworksConfig {
    /// 모든 관리 대상 컨테이너를 기본 네트워크에 연결할지 여부
    pub connect_all: bool,
    /// 기본(공유) 네트워크 목록 -- 시작 시 항상 생성 보장
    pub base_networks: Vec<String>,
    /// 관리 대상 compose 프로젝트 이름 접두어
    pub project_prefix: String,
    /// 생성할 네트워크 드라이버
    pub driver: String,
    /// 생성할 네트워크의 internal 플래그
    pub internal: bool,
    /// 시작 시 동시에 수행할 컨테이너 동기화 최대 수
    pub max_concurrent_reconciles: usize,
}

impl Default for NetworksConfig {
    fn default() -> Self {
        Self {
            connect_all: false,
            base_networks: vec![DEFAULT_BASE_NETWORK.to_owned()],
            project_prefix: "ix-".to_owned(),
            driver: "bridge".to_owned(),
            internal: true,
            max_concurrent_reconciles: 4,
        }
    }
}

/// Prometheus 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 수신 주소
    pub listen_addr: String,
    /// 수신 포트
    pub port: u16,
    /// 스크레이프 경로
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9464,
            endpoint: "/metrics".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str, ignored: &mut Vec<String>) {
    if let Ok(val) = std::env::var(env_key) {
        match val.trim().to_ascii_lowercase().parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => ignored.push(env_key.to_owned()),
        }
    }
}

fn override_parsed<T: FromStr>(target: &mut T, env_key: &str, ignored: &mut Vec<String>) {
    if let Ok(val) = std::env::var(env_key) {
        match val.trim().parse::<T>() {
            Ok(parsed) => *target = parsed,
            Err(_) => ignored.push(env_key.to_owned()),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
    }
}
