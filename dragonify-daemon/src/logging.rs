//! dragonify-daemon 로깅 초기화
//!
//! `[general]` 섹션의 `log_level` / `log_format`으로 `tracing-subscriber`를 구성합니다.
//! 동기화 엔진은 컨테이너와 네트워크마다 구조화된 필드(`container`, `container_id`,
//! `network`, `alias`)를 남기므로 운영 환경에서는 JSON 형식을 기본으로 합니다.
//!
//! `RUST_LOG`가 설정되어 있으면 설정 파일보다 우선합니다.

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use dragonify_core::config::GeneralConfig;

/// Docker API 클라이언트 하위 계층. 요청마다 debug 로그를 남기므로 warn으로 고정합니다.
const QUIET_TARGETS: [&str; 3] = ["bollard", "hyper", "hyper_util"];

/// `RUST_LOG`가 없을 때 사용할 필터 지시어를 만듭니다.
///
/// `debug` 이하로 낮춰도 이벤트 스트림 long-poll의 HTTP 로그가 섞이지 않도록
/// Docker 클라이언트 계층은 `warn`으로 둡니다.
pub fn default_directives(log_level: &str) -> String {
    let mut directives = log_level.to_owned();
    for target in QUIET_TARGETS {
        directives.push_str(&format!(",{target}=warn"));
    }
    directives
}

/// 전역 tracing subscriber를 설치합니다.
///
/// 프로세스당 한 번, 설정 검증 이후에 호출해야 합니다.
///
/// # Formats
///
/// * `"json"` - 한 줄당 JSON 이벤트 (기본값, 로그 수집기용)
/// * `"pretty"` - 로컬 실행용 사람이 읽는 형식
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.log_level)));

    match config.log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .map_err(|e| {
                    anyhow::anyhow!("failed to initialize JSON tracing subscriber: {}", e)
                })?;
        }
        "pretty" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()
                .map_err(|e| {
                    anyhow::anyhow!("failed to initialize pretty tracing subscriber: {}", e)
                })?;
        }
        other => {
            return Err(anyhow::anyhow!(
                "unknown log format '{}', expected 'json' or 'pretty'",
                other
            ));
        }
    }

    Ok(())
}
