//! 에러 타입 정의.

use stockhist_data::DataError;
use thiserror::Error;

/// Collector 에러 타입
///
/// 수집 시작 전 초기화 단계의 에러만 여기에 해당합니다.
/// 종목별 조회 실패는 에러가 아니라 `RunReport`의 실패 목록으로 남습니다.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// 설정 에러
    #[error("Configuration error: {0}")]
    Config(String),

    /// 종목 목록 로드 실패 (주 목록)
    #[error("Instrument list error: {0}")]
    InstrumentList(#[source] DataError),

    /// 데이터셋 파일 읽기/쓰기 실패
    #[error("Storage error: {0}")]
    Storage(#[source] DataError),

    /// 일반 에러
    #[error("Error: {0}")]
    Other(String),
}

impl From<std::env::VarError> for CollectorError {
    fn from(err: std::env::VarError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, CollectorError>;
