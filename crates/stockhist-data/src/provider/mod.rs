//! 일봉 데이터 제공자.
//!
//! 제공자는 한 번의 호출로 조회 기간 전체를 반환하며, 실패는
//! 에러 또는 빈 결과로 나타납니다. 재시도와 요청 간격 조절은
//! 호출하는 쪽(수집기)의 책임입니다.

pub mod eastmoney;

pub use eastmoney::EastmoneyProvider;

use crate::Result;
use async_trait::async_trait;
use stockhist_core::{DateWindow, Market};

/// 제공자 원본 행.
///
/// 제공자가 돌려준 문자열을 그대로 담습니다. 타입 변환과 컬럼 정리는
/// `SymbolAdapter`가 담당합니다.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawDailyRow {
    /// 거래일 (YYYY-MM-DD 또는 YYYYMMDD)
    pub date: String,
    /// 종목코드 (홍콩 응답에는 없음)
    pub code: Option<String>,
    pub open: String,
    pub close: String,
    pub high: String,
    pub low: String,
    pub volume: String,
    /// 거래대금
    pub turnover: String,
}

/// 일봉 데이터 제공자 trait.
#[async_trait]
pub trait DailyBarProvider: Send + Sync {
    /// 제공자 이름 (로그용).
    fn name(&self) -> &str;

    /// 한 종목의 기간 내 일봉을 조회합니다.
    ///
    /// 데이터가 없으면 빈 Vec을 반환합니다.
    async fn fetch_daily(
        &self,
        code: &str,
        market: Market,
        window: &DateWindow,
    ) -> Result<Vec<RawDailyRow>>;
}
