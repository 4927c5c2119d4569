//! 종목 식별 타입.
//!
//! 종목의 식별 키는 `(code, market)`입니다. 같은 코드라도 시장이 다르면
//! 다른 종목으로 취급합니다.

use crate::error::{CoreError, CoreResult};
use crate::types::Market;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 재시도 관리를 위한 종목 식별 키.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstrumentKey {
    pub code: String,
    pub market: Market,
}

/// 수집 대상 종목.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentRef {
    /// 시장별 자릿수로 0을 채운 종목코드
    pub code: String,
    /// 종목명
    pub name: String,
    /// 상장 시장
    pub market: Market,
}

impl InstrumentRef {
    /// 새 종목을 생성합니다.
    ///
    /// 코드는 숫자만 허용되며 시장별 자릿수에 맞춰 앞쪽을 0으로 채웁니다
    /// (예: A주 `"1"` → `"000001"`, 홍콩 `"700"` → `"00700"`).
    pub fn new(
        code: impl AsRef<str>,
        name: impl Into<String>,
        market: Market,
    ) -> CoreResult<Self> {
        Ok(Self {
            code: normalize_code(code.as_ref(), market)?,
            name: name.into().trim().to_string(),
            market,
        })
    }

    /// A주 종목 생성.
    pub fn domestic(code: impl AsRef<str>, name: impl Into<String>) -> CoreResult<Self> {
        Self::new(code, name, Market::Domestic)
    }

    /// 홍콩 종목 생성.
    pub fn hong_kong(code: impl AsRef<str>, name: impl Into<String>) -> CoreResult<Self> {
        Self::new(code, name, Market::HongKong)
    }

    /// 식별 키 반환.
    pub fn key(&self) -> InstrumentKey {
        InstrumentKey {
            code: self.code.clone(),
            market: self.market,
        }
    }
}

impl fmt::Display for InstrumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} {}", self.market, self.code, self.name)
    }
}

/// 이번 라운드에서 데이터를 얻지 못한 종목.
///
/// 에러 내용은 로그로만 남기고 식별 정보만 보관합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub code: String,
    pub name: String,
    pub market: Market,
}

impl FailureRecord {
    pub fn key(&self) -> InstrumentKey {
        InstrumentKey {
            code: self.code.clone(),
            market: self.market,
        }
    }
}

impl From<&InstrumentRef> for FailureRecord {
    fn from(instrument: &InstrumentRef) -> Self {
        Self {
            code: instrument.code.clone(),
            name: instrument.name.clone(),
            market: instrument.market,
        }
    }
}

/// 종목코드를 시장 자릿수에 맞춰 정규화합니다.
pub fn normalize_code(raw: &str, market: Market) -> CoreResult<String> {
    let code = raw.trim();
    let width = market.code_width();

    if code.is_empty() || code.len() > width || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(CoreError::InvalidCode {
            code: code.to_string(),
            market: market.to_string(),
        });
    }

    Ok(format!("{:0>width$}", code, width = width))
}
