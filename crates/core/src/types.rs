//! 도메인 타입 -- 런타임 객체의 읽기 전용 스냅샷
//!
//! Docker API 응답을 그대로 노출하지 않고, 동기화 로직이 필요로 하는
//! 필드만 담은 타입으로 변환하여 사용합니다.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

/// 컨테이너 정보
///
/// 컨테이너는 런타임이 소유하며 이 시스템은 읽기만 합니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInfo {
    /// 컨테이너 ID
    pub id: String,
    /// 표시 이름 목록 (선행 `/` 제거됨)
    pub names: Vec<String>,
    /// 레이블 맵
    pub labels: HashMap<String, String>,
    /// 현재 연결된 네트워크 이름 집합
    pub networks: BTreeSet<String>,
    /// 네트워크 모드 (`bridge`, `host`, `none`, `container:<id>` 등)
    pub network_mode: String,
}

impl ContainerInfo {
    /// 레이블 값을 조회합니다.
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    /// 지정한 이름의 네트워크에 이미 연결되어 있는지 확인합니다.
    pub fn is_member_of(&self, network: &str) -> bool {
        self.networks.contains(network)
    }

    /// 로그용 표시 이름 (`a, b`)
    pub fn display_names(&self) -> String {
        self.names.join(", ")
    }

    /// 12자리 축약 ID
    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }
}

impl fmt::Display for ContainerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) mode={} networks=[{}]",
            self.display_names(),
            self.short_id(),
            self.network_mode,
            self.networks.iter().cloned().collect::<Vec<_>>().join(","),
        )
    }
}

/// 네트워크 정보
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    /// 네트워크 ID
    pub id: String,
    /// 네트워크 이름
    pub name: String,
    /// 레이블 맵
    pub labels: HashMap<String, String>,
    /// 연결된 컨테이너 ID 목록
    ///
    /// 목록 조회 API는 멤버를 채우지 않으므로 inspect 결과에서만 신뢰할 수 있습니다.
    pub containers: Vec<String>,
}

impl NetworkInfo {
    /// 레이블 키가 존재하는지 확인합니다.
    pub fn has_label(&self, key: &str) -> bool {
        self.labels.contains_key(key)
    }

    /// 연결된 컨테이너가 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    /// 12자리 축약 ID
    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }
}

impl fmt::Display for NetworkInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) members={}",
            self.name,
            self.short_id(),
            self.containers.len(),
        )
    }
}

fn short_id(id: &str) -> &str {
    id.get(..12).unwrap_or(id)
}
