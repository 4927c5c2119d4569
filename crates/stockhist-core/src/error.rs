//! 도메인 에러 타입.

use thiserror::Error;

/// 도메인 타입 생성/파싱 에러.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// 종목코드 형식 오류 (숫자가 아니거나 자릿수 초과)
    #[error("잘못된 종목코드 '{code}' ({market})")]
    InvalidCode { code: String, market: String },

    /// 알 수 없는 시장 구분
    #[error("알 수 없는 시장 구분: {0}")]
    UnknownMarket(String),

    /// 잘못된 조회 기간
    #[error("잘못된 조회 기간: {0}")]
    InvalidWindow(String),
}

/// 도메인 작업을 위한 Result 타입.
pub type CoreResult<T> = Result<T, CoreError>;
