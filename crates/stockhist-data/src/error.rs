//! 데이터 모듈 오류 타입.

use thiserror::Error;

/// 데이터 관련 오류.
#[derive(Debug, Error)]
pub enum DataError {
    /// 외부 제공자 호출 오류
    #[error("Fetch error: {0}")]
    FetchError(String),

    /// 제공자 응답 형식이 예상과 다름
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// 파싱 오류
    #[error("Parse error: {0}")]
    ParseError(String),

    /// 종목 목록 오류
    #[error("Invalid instrument list: {0}")]
    InvalidList(String),

    /// 파일을 찾을 수 없음
    #[error("File not found: {0}")]
    NotFound(String),

    /// 파일 I/O 오류
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV 읽기/쓰기 오류
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl From<reqwest::Error> for DataError {
    fn from(err: reqwest::Error) -> Self {
        DataError::FetchError(err.to_string())
    }
}

impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        DataError::MalformedResponse(err.to_string())
    }
}

impl From<stockhist_core::CoreError> for DataError {
    fn from(err: stockhist_core::CoreError) -> Self {
        DataError::ParseError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DataError>;
