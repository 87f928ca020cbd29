//! 네트워크 동기화 에러 타입
//!
//! [`NetworkSyncError`]는 동기화 엔진 내부에서 발생하는 모든 에러를 표현합니다.
//! `From<NetworkSyncError> for DragonifyError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use dragonify_core::error::{ConfigError, DragonifyError, RuntimeError};

/// 네트워크 동기화 도메인 에러
///
/// 대부분은 컨테이너 하나 또는 네트워크 하나에 국한된 실패이며,
/// 호출자는 로그를 남기고 다음 항목으로 진행합니다.
#[derive(Debug, thiserror::Error)]
pub enum NetworkSyncError {
    /// Docker API 호출 실패
    #[error("docker api error: {0}")]
    DockerApi(String),

    /// Docker 소켓 연결 실패 또는 이벤트 스트림 단절
    #[error("docker connection error: {0}")]
    DockerConnection(String),

    /// 컨테이너를 찾을 수 없음 (이벤트 수신 후 이미 사라진 경우 등)
    #[error("container not found: {0}")]
    ContainerNotFound(String),

    /// 네트워크를 찾을 수 없음
    #[error("network not found: {0}")]
    NetworkNotFound(String),

    /// 같은 이름의 네트워크가 이미 존재함 (생성 경쟁)
    #[error("network already exists: {0}")]
    NetworkAlreadyExists(String),

    /// 같은 이름의 네트워크가 둘 이상 존재함
    #[error("ambiguous network '{name}': {count} networks share this name")]
    AmbiguousNetwork {
        /// 네트워크 이름
        name: String,
        /// 일치한 네트워크 수
        count: usize,
    },

    /// 별칭 계산에 필요한 레이블 누락
    #[error("container '{container_id}' is missing label '{label}'")]
    MissingLabel {
        /// 대상 컨테이너 ID
        container_id: String,
        /// 누락된 레이블 키
        label: String,
    },

    /// 런타임이 connect 요청을 거부함
    #[error("connect of container '{container_id}' to network '{network}' rejected: {reason}")]
    ConnectRejected {
        /// 대상 컨테이너 ID
        container_id: String,
        /// 대상 네트워크
        network: String,
        /// 거부 사유
        reason: String,
    },

    /// 런타임이 네트워크 삭제를 거부함
    #[error("removal of network '{network}' rejected: {reason}")]
    RemoveRejected {
        /// 대상 네트워크
        network: String,
        /// 거부 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },
}

impl From<NetworkSyncError> for DragonifyError {
    fn from(err: NetworkSyncError) -> Self {
        let runtime = match err {
            NetworkSyncError::DockerApi(msg) => RuntimeError::DockerApi(msg),
            NetworkSyncError::DockerConnection(msg) => RuntimeError::Connection(msg),
            NetworkSyncError::ContainerNotFound(id) | NetworkSyncError::NetworkNotFound(id) => {
                RuntimeError::NotFound(id)
            }
            NetworkSyncError::AmbiguousNetwork { name, count } => {
                RuntimeError::AmbiguousNetwork { name, count }
            }
            NetworkSyncError::MissingLabel {
                container_id,
                label,
            } => RuntimeError::MissingLabel {
                container_id,
                label,
            },
            err @ (NetworkSyncError::ConnectRejected { .. }
            | NetworkSyncError::RemoveRejected { .. }
            | NetworkSyncError::NetworkAlreadyExists(_)) => {
                RuntimeError::Rejected(err.to_string())
            }
            NetworkSyncError::Config { field, reason } => {
                return DragonifyError::Config(ConfigError::InvalidValue { field, reason });
            }
        };
        DragonifyError::Runtime(runtime)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ambiguous_network_display() {
        let err = NetworkSyncError::AmbiguousNetwork {
            name: "net-a".to_owned(),
            count: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("net-a"));
        assert!(msg.contains('3'));
    }

    #[test]
    fn connect_rejected_display() {
        let err = NetworkSyncError::ConnectRejected {
            container_id: "abc123".to_owned(),
            network: "net-a".to_owned(),
            reason: "alias in use".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("abc123"));
        assert!(msg.contains("net-a"));
        assert!(msg.contains("alias in use"));
    }

    #[test]
    fn remove_rejected_display() {
        let err = NetworkSyncError::RemoveRejected {
            network: "net-b".to_owned(),
            reason: "has active endpoints".to_owned(),
        };
        assert!(err.to_string().contains("active endpoints"));
    }

    #[test]
    fn converts_missing_label() {
        let err = NetworkSyncError::MissingLabel {
            container_id: "abc".to_owned(),
            label: "com.docker.compose.service".to_owned(),
        };
        let top: DragonifyError = err.into();
        assert!(matches!(
            top,
            DragonifyError::Runtime(RuntimeError::MissingLabel { .. })
        ));
    }

    #[test]
    fn converts_not_found_variants() {
        let top: DragonifyError = NetworkSyncError::ContainerNotFound("c1".to_owned()).into();
        assert!(matches!(top, DragonifyError::Runtime(RuntimeError::NotFound(_))));

        let top: DragonifyError = NetworkSyncError::NetworkNotFound("n1".to_owned()).into();
        assert!(matches!(top, DragonifyError::Runtime(RuntimeError::NotFound(_))));
    }

    #[test]
    fn converts_rejections() {
        let top: DragonifyError = NetworkSyncError::RemoveRejected {
            network: "n".to_owned(),
            reason: "busy".to_owned(),
        }
        .into();
        match top {
            DragonifyError::Runtime(RuntimeError::Rejected(msg)) => assert!(msg.contains("busy")),
            other => panic!("unexpected conversion: {other:?}"),
        }
    }

    #[test]
    fn converts_connection_error() {
        let top: DragonifyError =
            NetworkSyncError::DockerConnection("socket missing".to_owned()).into();
        assert!(matches!(
            top,
            DragonifyError::Runtime(RuntimeError::Connection(_))
        ));
    }

    #[test]
    fn converts_config_error_to_config_section() {
        let top: DragonifyError = NetworkSyncError::Config {
            field: "max_concurrent_reconciles".to_owned(),
            reason: "must be 1-64".to_owned(),
        }
        .into();
        assert!(matches!(
            top,
            DragonifyError::Config(ConfigError::InvalidValue { ref field, .. })
                if field == "max_concurrent_reconciles"
        ));
    }
}
