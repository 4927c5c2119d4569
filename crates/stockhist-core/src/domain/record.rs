//! 종목-일자 단위 일봉 레코드.

use crate::types::{InstrumentKey, Market};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 일봉 레코드.
///
/// 유일성 키는 `(date, code, market)`이며, 같은 키의 레코드는
/// 데이터셋에 하나만 존재합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    /// 거래일
    pub date: NaiveDate,
    /// 종목코드
    pub code: String,
    /// 종목명
    pub name: String,
    /// 시장
    pub market: Market,
    /// 시가
    pub open: Decimal,
    /// 종가
    pub close: Decimal,
    /// 고가
    pub high: Decimal,
    /// 저가
    pub low: Decimal,
    /// 거래량
    pub volume: i64,
    /// 거래대금
    pub turnover: Decimal,
}

/// 레코드 유일성 키.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub date: NaiveDate,
    pub code: String,
    pub market: Market,
}

impl StockRecord {
    /// 유일성 키 `(date, code, market)`.
    pub fn key(&self) -> RecordKey {
        RecordKey {
            date: self.date,
            code: self.code.clone(),
            market: self.market,
        }
    }

    /// 정렬 키 `(market, code, date)`.
    pub fn sort_key(&self) -> (Market, &str, NaiveDate) {
        (self.market, self.code.as_str(), self.date)
    }

    /// 레코드가 속한 종목 키.
    pub fn instrument_key(&self) -> InstrumentKey {
        InstrumentKey {
            code: self.code.clone(),
            market: self.market,
        }
    }
}
