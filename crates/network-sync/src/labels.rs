//! 레이블 정책 -- 컨테이너/네트워크 레이블에서 동기화 대상을 계산합니다.
//!
//! 이 모듈의 함수는 모두 순수 함수입니다. 같은 레이블과 같은 설정이면
//! 항상 같은 결과를 내며, 이전 동기화 이력에 의존하지 않습니다.

use std::collections::HashMap;

use dragonify_core::types::{ContainerInfo, NetworkInfo};

use crate::error::NetworkSyncError;

/// compose 프로젝트 레이블
pub const PROJECT_LABEL: &str = "com.docker.compose.project";

/// compose 서비스 레이블
pub const SERVICE_LABEL: &str = "com.docker.compose.service";

/// 컨테이너가 참여할 네트워크 목록 레이블 (쉼표 구분)
pub const NETWORKS_LABEL: &str = "tj.horner.dragonify.networks";

/// 이 데몬이 만든 네트워크에 붙이는 마커 레이블
///
/// 컨테이너 쪽 네트워크 목록 레이블과 같은 키를 씁니다.
pub const MANAGED_MARKER_LABEL: &str = NETWORKS_LABEL;

/// 마커 레이블 값
pub const MANAGED_MARKER_VALUE: &str = "true";

/// DNS 별칭 접미사
pub const DNS_SUFFIX: &str = "svc.cluster.local";

/// 프로젝트 이름이 관리 대상 접두어로 시작하는지 확인합니다.
pub fn is_managed_project(project: &str, prefix: &str) -> bool {
    project.starts_with(prefix)
}

/// 네트워크 모드가 추가 네트워크 연결을 허용하는지 확인합니다.
///
/// `none`, `host`, `container:*`, `service:*` 모드는 연결할 수 없습니다.
pub fn is_attachable(network_mode: &str) -> bool {
    !(matches!(network_mode, "none" | "host")
        || network_mode.starts_with("container:")
        || network_mode.starts_with("service:"))
}

/// 쉼표로 구분된 네트워크 목록 레이블 값을 분해합니다.
///
/// 앞뒤 공백을 제거하고 빈 항목은 버립니다.
pub fn parse_network_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// 컨테이너가 참여해야 할 네트워크 이름 목록을 계산합니다.
///
/// `connect_all`이면 기본 네트워크를 먼저 넣고, 이어서 네트워크 목록 레이블의
/// 항목을 순서대로 추가합니다. 중복은 처음 나온 것만 남깁니다.
/// 연결 불가 모드의 컨테이너는 레이블과 관계없이 빈 목록입니다.
pub fn desired_networks(
    container: &ContainerInfo,
    connect_all: bool,
    base_networks: &[String],
) -> Vec<String> {
    if !is_attachable(&container.network_mode) {
        return Vec::new();
    }

    let mut desired: Vec<String> = Vec::new();
    let mut push = |name: &str| {
        if !desired.iter().any(|n| n == name) {
            desired.push(name.to_owned());
        }
    };

    if connect_all {
        base_networks.iter().for_each(|n| push(n.as_str()));
    }

    if let Some(list) = container.label(NETWORKS_LABEL) {
        parse_network_list(list).for_each(&mut push);
    }

    desired
}

/// 컨테이너의 DNS 별칭 `<service>.<project>.svc.cluster.local`을 만듭니다.
///
/// # Errors
///
/// 서비스 또는 프로젝트 레이블이 없으면 `NetworkSyncError::MissingLabel`을 반환합니다.
pub fn dns_alias(container: &ContainerInfo) -> Result<String, NetworkSyncError> {
    let required = |label: &str| {
        container
            .label(label)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| NetworkSyncError::MissingLabel {
                container_id: container.id.clone(),
                label: label.to_owned(),
            })
    };
    let service = required(SERVICE_LABEL)?;
    let project = required(PROJECT_LABEL)?;
    Ok(format!("{service}.{project}.{DNS_SUFFIX}"))
}

/// 네트워크가 이 데몬이 만든 관리 네트워크인지 확인합니다.
pub fn is_managed_network(network: &NetworkInfo) -> bool {
    network.has_label(MANAGED_MARKER_LABEL)
}

/// 새 관리 네트워크에 붙일 레이블 집합
pub fn managed_network_labels() -> HashMap<String, String> {
    HashMap::from([(
        MANAGED_MARKER_LABEL.to_owned(),
        MANAGED_MARKER_VALUE.to_owned(),
    )])
}

/// 프로세스 수명 동안 고정된 설정값과 위 함수들을 묶은 정책 객체
#[derive(Debug, Clone)]
pub struct LabelPolicy {
    project_prefix: String,
    connect_all: bool,
    base_networks: Vec<String>,
}

impl LabelPolicy {
    /// 새 정책을 생성합니다.
    pub fn new(
        project_prefix: impl Into<String>,
        connect_all: bool,
        base_networks: Vec<String>,
    ) -> Self {
        Self {
            project_prefix: project_prefix.into(),
            connect_all,
            base_networks,
        }
    }

    /// 관리 대상 프로젝트 이름인지 확인합니다.
    pub fn is_managed_project(&self, project: &str) -> bool {
        is_managed_project(project, &self.project_prefix)
    }

    /// 컨테이너가 관리 범위에 속하는지 확인합니다 (프로젝트 레이블 기준).
    pub fn is_in_scope(&self, container: &ContainerInfo) -> bool {
        container
            .label(PROJECT_LABEL)
            .is_some_and(|p| self.is_managed_project(p))
    }

    /// 컨테이너의 목표 네트워크 목록
    pub fn desired_networks(&self, container: &ContainerInfo) -> Vec<String> {
        desired_networks(container, self.connect_all, &self.base_networks)
    }

    /// 시작 시 생성을 보장할 기본 네트워크 목록
    pub fn base_networks(&self) -> &[String] {
        &self.base_networks
    }
}
