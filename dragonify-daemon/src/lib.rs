#![doc = include_str!("../README.md")]
//!
//! 프로덕션에서는 바이너리(`main.rs`)로 사용되며, 라이브러리는 통합 테스트를 위해
//! 내부 모듈을 노출합니다.

pub mod cli;
pub mod logging;
pub mod metrics_server;
pub mod orchestrator;
