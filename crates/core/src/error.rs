//! 에러 타입 -- 도메인별 에러 정의

/// Dragonify 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum DragonifyError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 컨테이너 런타임(Docker) 관련 에러
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 런타임 API 에러
///
/// 네트워크 동기화 크레이트의 세부 에러가 이 분류로 변환됩니다.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Docker API 호출 실패
    #[error("docker api error: {0}")]
    DockerApi(String),

    /// Docker 데몬 연결 실패
    #[error("docker connection error: {0}")]
    Connection(String),

    /// 컨테이너 또는 네트워크를 찾을 수 없음
    #[error("not found: {0}")]
    NotFound(String),

    /// 같은 이름의 네트워크가 둘 이상 존재
    #[error("ambiguous network '{name}': {count} networks share this name")]
    AmbiguousNetwork { name: String, count: usize },

    /// 필수 레이블 누락
    #[error("container '{container_id}' is missing label '{label}'")]
    MissingLabel { container_id: String, label: String },

    /// 런타임이 요청을 거부함 (connect/remove)
    #[error("runtime rejected request: {0}")]
    Rejected(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_converts_into_top_level() {
        let err: DragonifyError = ConfigError::ParseFailed {
            reason: "bad toml".to_owned(),
        }
        .into();
        assert!(matches!(err, DragonifyError::Config(_)));
        assert!(err.to_string().contains("bad toml"));
    }

    #[test]
    fn ambiguous_network_display() {
        let err = RuntimeError::AmbiguousNetwork {
            name: "apps-internal".to_owned(),
            count: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("apps-internal"));
        assert!(msg.contains('2'));
    }

    #[test]
    fn missing_label_display() {
        let err = RuntimeError::MissingLabel {
            container_id: "abc123".to_owned(),
            label: "com.docker.compose.service".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("abc123"));
        assert!(msg.contains("com.docker.compose.service"));
    }

    #[test]
    fn io_error_converts_into_top_level() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: DragonifyError = io.into();
        assert!(matches!(err, DragonifyError::Io(_)));
    }
}
