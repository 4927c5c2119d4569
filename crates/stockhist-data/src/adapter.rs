//! 시장별 심볼 어댑터.
//!
//! - 요청 생성: 종목코드 → 제공자 증권 ID (`secid`)
//! - 응답 정규화: 원본 행 → `StockRecord` (컬럼 선택, 타입 변환, 시장 태깅)
//!
//! 홍콩 응답에는 종목코드가 없으므로 요청한 종목의 코드를 넣어 줍니다.

use crate::error::{DataError, Result};
use crate::provider::RawDailyRow;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;
use stockhist_core::types::instrument::normalize_code;
use stockhist_core::{InstrumentRef, Market, StockRecord};

/// 시장별 요청/응답 변환기.
pub struct SymbolAdapter;

impl SymbolAdapter {
    /// 제공자 증권 ID.
    ///
    /// - A주: `6`으로 시작하면 상해(`1.`), 그 외 심천(`0.`)
    /// - 홍콩: `116.`
    pub fn security_id(code: &str, market: Market) -> String {
        match market {
            Market::Domestic if code.starts_with('6') => format!("1.{}", code),
            Market::Domestic => format!("0.{}", code),
            Market::HongKong => format!("116.{}", code),
        }
    }

    /// 원본 행을 표준 레코드로 변환합니다.
    ///
    /// 빈 입력은 빈 결과이며 에러가 아닙니다. 형식이 맞지 않는 행이 하나라도
    /// 있으면 전체를 에러로 돌려 호출 측이 조회 실패로 처리하게 합니다.
    pub fn normalize(rows: &[RawDailyRow], instrument: &InstrumentRef) -> Result<Vec<StockRecord>> {
        rows.iter()
            .map(|row| Self::normalize_row(row, instrument))
            .collect()
    }

    fn normalize_row(row: &RawDailyRow, instrument: &InstrumentRef) -> Result<StockRecord> {
        let code = match instrument.market {
            Market::Domestic => {
                let raw = row.code.as_deref().ok_or_else(|| {
                    DataError::MalformedResponse(format!(
                        "A주 응답에 종목코드 없음: {}",
                        instrument.code
                    ))
                })?;
                let code = normalize_code(raw, Market::Domestic)?;
                if code != instrument.code {
                    return Err(DataError::MalformedResponse(format!(
                        "요청 코드 {}와 응답 코드 {} 불일치",
                        instrument.code, code
                    )));
                }
                code
            }
            Market::HongKong => instrument.code.clone(),
        };

        Ok(StockRecord {
            date: parse_date(&row.date)?,
            code,
            name: instrument.name.clone(),
            market: instrument.market,
            open: parse_decimal("open", &row.open)?,
            close: parse_decimal("close", &row.close)?,
            high: parse_decimal("high", &row.high)?,
            low: parse_decimal("low", &row.low)?,
            volume: parse_volume(&row.volume)?,
            turnover: parse_decimal("turnover", &row.turnover)?,
        })
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y%m%d"))
        .map_err(|e| DataError::MalformedResponse(format!("날짜 파싱 실패 '{}': {}", raw, e)))
}

fn parse_decimal(field: &str, raw: &str) -> Result<Decimal> {
    let raw = raw.trim();
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|e| DataError::MalformedResponse(format!("{} 파싱 실패 '{}': {}", field, raw, e)))
}

fn parse_volume(raw: &str) -> Result<i64> {
    crate::parse::volume(raw).map_err(DataError::MalformedResponse)
}
