//! 일봉 이력 수집기의 핵심 도메인 타입.
//!
//! 이 crate는 다음을 제공합니다:
//! - 시장 구분 및 종목 식별 (`Market`, `InstrumentRef`)
//! - 일봉 레코드와 정렬된 데이터셋 (`StockRecord`, `Dataset`)
//! - 중복 제거 병합 (`DatasetMerger`)
//! - tracing 기반 로깅 초기화

pub mod domain;
pub mod error;
pub mod logging;
pub mod types;

pub use domain::*;
pub use error::{CoreError, CoreResult};
pub use types::*;
