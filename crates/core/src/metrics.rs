//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 동기화 엔진은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다. 레코더가 설치되지 않았으면
//! 매크로 호출은 아무 일도 하지 않습니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `dragonify_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

/// 런타임 이벤트 종류 레이블 키 (start, stop)
pub const LABEL_EVENT: &str = "event";

// ─── 동기화 엔진 메트릭 ─────────────────────────────────────────────

/// 수신한 런타임 이벤트 수 (counter, label: event)
pub const EVENTS_RECEIVED_TOTAL: &str = "dragonify_events_received_total";

/// 관리 범위 밖이라 버려진 이벤트 수 (counter)
pub const EVENTS_DISCARDED_TOTAL: &str = "dragonify_events_discarded_total";

/// 컨테이너 동기화 수행 수 (counter)
pub const RECONCILIATIONS_TOTAL: &str = "dragonify_reconciliations_total";

/// 컨테이너 동기화 소요 시간 (histogram, 초)
pub const RECONCILE_DURATION_SECONDS: &str = "dragonify_reconcile_duration_seconds";

/// 네트워크 연결 시도 수 (counter, label: result)
pub const CONNECTS_TOTAL: &str = "dragonify_connects_total";

/// 생성된 네트워크 수 (counter)
pub const NETWORKS_CREATED_TOTAL: &str = "dragonify_networks_created_total";

/// 삭제된 네트워크 수 (counter)
pub const NETWORKS_REMOVED_TOTAL: &str = "dragonify_networks_removed_total";

/// 가비지 컬렉션 스윕 수 (counter)
pub const GC_SWEEPS_TOTAL: &str = "dragonify_gc_sweeps_total";

/// 마지막 스윕에서 관찰된 관리 네트워크 수 (gauge)
pub const MANAGED_NETWORKS: &str = "dragonify_managed_networks";

// ─── Daemon 메트릭 ──────────────────────────────────────────────────

/// Daemon: 가동 시간 (gauge, 초)
pub const DAEMON_UPTIME_SECONDS: &str = "dragonify_daemon_uptime_seconds";

// ─── 히스토그램 버킷 정의 ────────────────────────────────────────────

/// 동기화 소요 시간 히스토그램 버킷 (초)
///
/// Docker API 왕복 몇 번이 들어가므로 1ms ~ 30s 범위
pub const RECONCILE_DURATION_BUCKETS: [f64; 9] =
    [0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0];

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    describe_counter!(
        EVENTS_RECEIVED_TOTAL,
        "Container lifecycle events received from the runtime"
    );
    describe_counter!(
        EVENTS_DISCARDED_TOTAL,
        "Events discarded because the container is outside the managed scope"
    );
    describe_counter!(
        RECONCILIATIONS_TOTAL,
        "Per-container membership reconciliations performed"
    );
    describe_histogram!(
        RECONCILE_DURATION_SECONDS,
        "Time to reconcile one container in seconds"
    );
    describe_counter!(CONNECTS_TOTAL, "Network connect attempts by result");
    describe_counter!(
        NETWORKS_CREATED_TOTAL,
        "Managed networks created by this daemon"
    );
    describe_counter!(
        NETWORKS_REMOVED_TOTAL,
        "Empty managed networks removed by garbage collection"
    );
    describe_counter!(GC_SWEEPS_TOTAL, "Garbage collection sweeps performed");
    describe_gauge!(
        MANAGED_NETWORKS,
        "Managed networks observed during the last sweep"
    );
    describe_gauge!(DAEMON_UPTIME_SECONDS, "Dragonify daemon uptime in seconds");
}
