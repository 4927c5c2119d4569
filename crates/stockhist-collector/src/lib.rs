//! A주/홍콩 종목 일봉 증분 수집기.
//!
//! 이 crate는 다음을 제공합니다:
//! - 종목별 재시도 조회 (`FetchWithRetry`)
//! - 실패 종목 재시도 라운드와 쿨다운 (`RoundCoordinator`, `CooldownTimer`)
//! - 증분 조회 기간 계산 (`IncrementalWindowPlanner`)
//! - 병합/저장까지의 전체 실행 (`Collector`)과 결과 요약 (`RunReport`)

pub mod config;
pub mod error;
pub mod modules;
pub mod report;

pub use config::{CollectorConfig, MarketPolicy, RoundPolicy};
pub use error::{CollectorError, Result};
pub use report::{RunReport, RunStatus};
